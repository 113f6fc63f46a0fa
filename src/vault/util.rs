use chrono::Local;

/// Current epoch time in milliseconds, the unit the companion application
/// stores for tag creation dates.
///
/// This is the single, canonical implementation — **do not** duplicate
/// this helper in other modules.
pub fn now_epoch_millis() -> i64 {
    Local::now().timestamp_millis()
}

/// Catalog timestamp in the `%Y-%m-%d %H:%M:%S` form the record store uses.
pub fn now_timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_millis, now_timestamp};

    #[test]
    fn timestamp_has_expected_shape() {
        let stamp = now_timestamp();
        assert_eq!(stamp.len(), 19);
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], " ");
    }

    #[test]
    fn epoch_millis_is_positive() {
        assert!(now_epoch_millis() > 0);
    }
}
