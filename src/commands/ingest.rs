use anyhow::Result;

use crate::commands::CommandReport;
use crate::vault::config::{load_config, required_companion_root};
use crate::vault::ingest::IngestEvent;
use crate::vault::paths::{companion_paths, resolve_paths};
use crate::vault::worker::spawn_ingest;

pub fn run() -> Result<CommandReport> {
    let cfg = load_config()?;
    let root = required_companion_root(&cfg)?;
    let companion = companion_paths(&root);
    let paths = resolve_paths()?;

    let mut report = CommandReport::new("ingest");

    let (handle, rx) = spawn_ingest(paths, companion);
    for event in rx {
        match event {
            IngestEvent::PassStarted { cards_dir, files } => {
                report.detail(format!("scanning {} ({files} card files)", cards_dir.display()));
            }
            IngestEvent::CardProcessed { file, action } => {
                let name = file
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("<card>")
                    .to_string();
                report.detail(format!("{} {name}", action.as_str()));
            }
            IngestEvent::PassFinished { outcome } => {
                report.detail(format!(
                    "cards scanned={} inserted={} skipped={} fallbacks={} failed={}",
                    outcome.scanned,
                    outcome.inserted,
                    outcome.skipped,
                    outcome.fallbacks,
                    outcome.failed
                ));
                report.detail(format!(
                    "lorebooks scanned={} added={}",
                    outcome.lorebooks_scanned, outcome.lorebooks_added
                ));
                report.detail(format!(
                    "tag store present={} tagged_cards={}",
                    outcome.store_present, outcome.tagged_cards
                ));
                if outcome.failed > 0 {
                    report.issue(format!("{} card file(s) failed this pass", outcome.failed));
                }
            }
            IngestEvent::PassFailed { error } => {
                report.issue(error);
            }
        }
    }

    handle
        .join()
        .map_err(|_| anyhow::anyhow!("ingest worker panicked"))?;

    Ok(report)
}
