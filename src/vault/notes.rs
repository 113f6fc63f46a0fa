use crate::vault::metadata::field_str;
use serde_json::{Map, Value};

/// Promotional sentence some distributors append to card notes; stripped
/// verbatim during ingestion.
pub const PROMO_BOILERPLATE: &str =
    "Download more free character cards at aicharactercards.com.";

/// Maximum words kept when falling back to a free-text description.
const DESCRIPTION_WORD_LIMIT: usize = 100;

/// Derive catalog notes from resolved card fields.
///
/// Sources are tried in priority order; only the last-resort free-text
/// description is truncated.
pub fn derive_notes(fields: &Map<String, Value>) -> String {
    let curated = field_str(fields, "tagline")
        .or_else(|| field_str(fields, "content"))
        .or_else(|| field_str(fields, "creator_notes"));

    if let Some(note) = curated {
        return strip_boilerplate(note);
    }

    let Some(description) = field_str(fields, "description") else {
        return String::new();
    };
    truncate_to_sentence(&strip_boilerplate(description), DESCRIPTION_WORD_LIMIT)
}

/// Remove the known promo sentence; a note that *is* the sentence clears to
/// empty.
fn strip_boilerplate(note: &str) -> String {
    let trimmed = note.trim();
    if trimmed == PROMO_BOILERPLATE {
        return String::new();
    }
    match trimmed.find(PROMO_BOILERPLATE) {
        Some(at) => {
            let mut out = String::with_capacity(trimmed.len() - PROMO_BOILERPLATE.len());
            out.push_str(&trimmed[..at]);
            out.push_str(&trimmed[at + PROMO_BOILERPLATE.len()..]);
            out.trim().to_string()
        }
        None => trimmed.to_string(),
    }
}

/// Keep at most `word_limit` words, then back off to the last sentence
/// terminator at or before that boundary. Text already within the limit is
/// returned whole.
fn truncate_to_sentence(text: &str, word_limit: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= word_limit {
        return text.trim().to_string();
    }

    let clipped = words[..word_limit].join(" ");
    match clipped.rfind(['.', '!', '?']) {
        Some(at) => clipped[..=at].to_string(),
        None => clipped,
    }
}

#[cfg(test)]
mod tests {
    use super::{PROMO_BOILERPLATE, derive_notes, truncate_to_sentence};
    use crate::vault::metadata::resolve_highest_spec;
    use serde_json::json;

    #[test]
    fn tagline_wins_over_description() {
        let fields = resolve_highest_spec(&json!({
            "tagline": "A bard for hire.",
            "description": "Long free text that should not be used."
        }));
        assert_eq!(derive_notes(&fields), "A bard for hire.");
    }

    #[test]
    fn creator_notes_used_before_description() {
        let fields = resolve_highest_spec(&json!({
            "creator_notes": "Best used with the fantasy preset.",
            "description": "Long free text."
        }));
        assert_eq!(derive_notes(&fields), "Best used with the fantasy preset.");
    }

    #[test]
    fn boilerplate_only_note_becomes_empty() {
        let fields = resolve_highest_spec(&json!({ "tagline": PROMO_BOILERPLATE }));
        assert_eq!(derive_notes(&fields), "");
    }

    #[test]
    fn boilerplate_is_stripped_from_longer_note() {
        let note = format!("A bard for hire. {PROMO_BOILERPLATE}");
        let fields = resolve_highest_spec(&json!({ "tagline": note }));
        assert_eq!(derive_notes(&fields), "A bard for hire.");
    }

    #[test]
    fn long_description_truncates_at_sentence_boundary() {
        // 140 words; a sentence ends at word 97.
        let mut words = Vec::new();
        for i in 0..140 {
            if i == 96 {
                words.push("ends.".to_string());
            } else {
                words.push(format!("word{i}"));
            }
        }
        let description = words.join(" ");
        let fields = resolve_highest_spec(&json!({ "description": description }));

        let note = derive_notes(&fields);
        let kept: Vec<&str> = note.split_whitespace().collect();
        assert!(kept.len() <= 100);
        assert_eq!(kept.len(), 97);
        assert!(note.ends_with("ends."));
    }

    #[test]
    fn short_description_is_kept_whole() {
        let fields = resolve_highest_spec(&json!({ "description": "Just a short line" }));
        assert_eq!(derive_notes(&fields), "Just a short line");
    }

    #[test]
    fn truncation_without_terminator_keeps_word_prefix() {
        let text = (0..12)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let out = truncate_to_sentence(&text, 5);
        assert_eq!(out, "w0 w1 w2 w3 w4");
    }

    #[test]
    fn missing_fields_yield_empty_note() {
        let fields = resolve_highest_spec(&json!({"name": "Aria"}));
        assert_eq!(derive_notes(&fields), "");
    }
}
