use anyhow::Result;

use crate::commands::CommandReport;
use crate::error::VaultError;
use crate::vault::config::{load_config, required_companion_root};
use crate::vault::paths::companion_paths;
use crate::vault::tags::TagStore;

fn open_store() -> Result<TagStore> {
    let cfg = load_config()?;
    let root = required_companion_root(&cfg)?;
    Ok(TagStore::new(companion_paths(&root).settings_file))
}

pub fn run_add(name: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("tag-add");
    let mut store = open_store()?;
    store.load()?;

    let before = store.tags.len();
    let id = store.add_tag(name);
    if store.tags.len() == before {
        report.detail(format!("tag `{name}` already exists (id={id})"));
        return Ok(report);
    }

    store.save()?;
    report.detail(format!("created tag `{name}` (id={id})"));
    Ok(report)
}

pub fn run_remove(name: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("tag-remove");
    let mut store = open_store()?;
    store.load()?;

    if !store.remove_tag(name) {
        report.issue(format!("no tag named `{name}`"));
        return Ok(report);
    }

    store.save()?;
    report.detail(format!("removed tag `{name}`"));
    Ok(report)
}

pub fn run_assign(name: &str, card: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("tag-assign");
    let mut store = open_store()?;
    store.load()?;

    store.assign_tag(name, card);
    store.save()?;
    report.detail(format!("assigned `{name}` to {card}"));
    Ok(report)
}

pub fn run_unassign(name: &str, card: &str) -> Result<CommandReport> {
    let mut report = CommandReport::new("tag-unassign");
    let mut store = open_store()?;
    store.load()?;

    if store.unassign_tag(name, card) {
        store.save()?;
        report.detail(format!("unassigned `{name}` from {card}"));
    } else {
        report.detail(format!("`{name}` was not assigned to {card}; nothing to do"));
    }
    Ok(report)
}

pub fn run_list() -> Result<CommandReport> {
    let mut report = CommandReport::new("tag-list");
    let mut store = open_store()?;
    let outcome = store.load()?;

    if !outcome.store_present {
        report.issue(
            VaultError::ExternalStoreMissing(store.settings_file().clone()).to_string(),
        );
        return Ok(report);
    }

    report.detail(format!(
        "tags={} mapped_cards={}",
        outcome.tags, outcome.mapped_cards
    ));
    for tag in &store.tags {
        let cards = store
            .tag_map
            .values()
            .filter(|ids| ids.contains(&tag.id))
            .count();
        report.detail(format!("{} ({cards} cards)", tag.name));
    }
    Ok(report)
}
