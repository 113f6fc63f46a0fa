use anyhow::Result;
use std::path::Path;

use crate::aicc::client::fetch_card;
use crate::commands::CommandReport;
use crate::vault::config::load_config;

pub fn run(card_id: &str, target: &Path) -> Result<CommandReport> {
    let cfg = load_config()?;
    let details = fetch_card(&cfg.aicc.base_url, cfg.aicc.timeout_secs, card_id, target)?;

    let mut report = CommandReport::new("fetch");
    report.detail(format!("saved {}", target.display()));
    if let Some(name) = details.name.as_deref() {
        report.detail(format!("name={name}"));
    }
    if let Some(author) = details.author.as_deref() {
        report.detail(format!("author={author}"));
    }
    Ok(report)
}
