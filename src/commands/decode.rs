use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::commands::CommandReport;
use crate::vault::codec::decode_card_bytes;
use crate::vault::metadata::{field_str, resolve_highest_spec};
use crate::vault::notes::derive_notes;

/// Interactive single-file decode. Codec errors propagate directly so the
/// user sees exactly which stage rejected the card.
pub fn run(file: &Path) -> Result<CommandReport> {
    let bytes = fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let metadata = decode_card_bytes(&bytes)
        .with_context(|| format!("failed to decode {}", file.display()))?;
    let fields = resolve_highest_spec(&metadata);

    let mut report = CommandReport::new("decode");
    report.detail(format!("file={}", file.display()));
    report.detail(format!("fields={}", fields.len()));
    if let Some(name) = field_str(&fields, "name") {
        report.detail(format!("name={name}"));
    } else {
        report.issue("decoded metadata carries no name field");
    }

    let notes = derive_notes(&fields);
    if !notes.is_empty() {
        report.detail(format!("notes={notes}"));
    }

    Ok(report)
}
