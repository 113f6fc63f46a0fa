use anyhow::Result;

use crate::commands::CommandReport;
use crate::vault::catalog::Catalog;
use crate::vault::config::{load_config, required_companion_root};
use crate::vault::paths::{companion_paths, resolve_paths};

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let cfg = load_config()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("vault_home={}", paths.vault_home.display()));
    report.detail(format!("catalog_db={}", paths.catalog_db.display()));

    match required_companion_root(&cfg) {
        Ok(root) => {
            let companion = companion_paths(&root);
            report.detail(format!("companion_root={}", companion.root.display()));
            if !companion.cards_dir.is_dir() {
                report.issue(format!(
                    "missing companion cards dir ({})",
                    companion.cards_dir.display()
                ));
            }
            if !companion.worlds_dir.is_dir() {
                report.issue(format!(
                    "missing companion worlds dir ({})",
                    companion.worlds_dir.display()
                ));
            }
            if !companion.settings_file.is_file() {
                report.issue(format!(
                    "missing companion settings document ({})",
                    companion.settings_file.display()
                ));
            }
        }
        Err(err) => report.issue(err.to_string()),
    }

    if paths.catalog_db.exists() {
        let catalog = Catalog::open(&paths.catalog_db)?;
        report.detail(format!("characters={}", catalog.character_count()?));
        report.detail(format!("lorebooks={}", catalog.lorebook_count()?));
    } else {
        report.detail("catalog not created yet; run `cardvault ingest`".to_string());
    }

    Ok(report)
}
