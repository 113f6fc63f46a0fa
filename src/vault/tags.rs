use crate::vault::util::now_epoch_millis;
use crate::vault::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

/// One tag definition as the companion application stores it. The folder,
/// filter, ordering, and color fields are display hints carried through
/// untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub name: String,
    #[serde(default = "default_folder_type")]
    pub folder_type: String,
    #[serde(default = "default_filter_state")]
    pub filter_state: String,
    #[serde(default)]
    pub sort_order: Option<u64>,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub color2: String,
    #[serde(default)]
    pub create_date: i64,
}

fn default_folder_type() -> String {
    "NONE".to_string()
}

fn default_filter_state() -> String {
    "UNDEFINED".to_string()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TagLoadOutcome {
    pub store_present: bool,
    pub tags: usize,
    pub mapped_cards: usize,
    pub rewritten_keys: usize,
}

/// In-memory owner of the two tag keys inside the companion application's
/// settings document. All other top-level keys in that document belong to
/// the companion app and survive every save untouched.
///
/// The document is never locked; callers `load()` before reads that must
/// see the companion's latest writes and `save()` after mutations.
/// Last-writer-wins.
#[derive(Debug)]
pub struct TagStore {
    settings_file: PathBuf,
    pub tags: Vec<Tag>,
    pub tag_map: BTreeMap<String, Vec<String>>,
}

/// Card identifiers are keyed by their `.png` filename, canonically
/// composed so byte-distinct but visually identical names collide.
pub fn normalize_card_key(card: &str) -> String {
    let with_ext = if card.ends_with(".png") {
        card.to_string()
    } else {
        format!("{card}.png")
    };
    with_ext.nfc().collect()
}

impl TagStore {
    pub fn new(settings_file: PathBuf) -> Self {
        Self {
            settings_file,
            tags: Vec::new(),
            tag_map: BTreeMap::new(),
        }
    }

    pub fn settings_file(&self) -> &PathBuf {
        &self.settings_file
    }

    /// Read both owned structures from the settings document.
    ///
    /// A missing document is non-fatal: the store loads empty and the
    /// outcome reports the condition so the caller can decide. Every
    /// `tag_map` key is rewritten through NFC normalization; keys that
    /// collide after rewriting merge set-wise, and entries with empty
    /// lists are dropped.
    pub fn load(&mut self) -> Result<TagLoadOutcome> {
        self.tags.clear();
        self.tag_map.clear();

        if !self.settings_file.exists() {
            warn::emit(WarnEvent {
                code: "TAG_STORE_MISSING",
                stage: "tags",
                action: "load",
                card: "",
                source: &self.settings_file.display().to_string(),
                reason: "settings-document-absent",
                err: "",
            });
            return Ok(TagLoadOutcome::default());
        }

        let raw = fs::read_to_string(&self.settings_file)
            .with_context(|| format!("failed to read {}", self.settings_file.display()))?;
        let document: Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", self.settings_file.display()))?;

        if let Some(tags) = document.get("tags") {
            self.tags = serde_json::from_value(tags.clone())
                .with_context(|| format!("malformed tags in {}", self.settings_file.display()))?;
        }

        let mut rewritten_keys = 0usize;
        if let Some(map) = document.get("tag_map") {
            let parsed: BTreeMap<String, Vec<String>> = serde_json::from_value(map.clone())
                .with_context(|| {
                    format!("malformed tag_map in {}", self.settings_file.display())
                })?;
            for (key, ids) in parsed {
                if ids.is_empty() {
                    continue;
                }
                let normalized: String = key.nfc().collect();
                if normalized != key {
                    rewritten_keys += 1;
                }
                let entry = self.tag_map.entry(normalized).or_default();
                for id in ids {
                    if !entry.contains(&id) {
                        entry.push(id);
                    }
                }
            }
        }

        Ok(TagLoadOutcome {
            store_present: true,
            tags: self.tags.len(),
            mapped_cards: self.tag_map.len(),
            rewritten_keys,
        })
    }

    /// Write the owned structures back.
    ///
    /// The document is re-read first so keys the companion application
    /// wrote since our load are preserved; only `tags` and `tag_map` are
    /// overwritten, and the whole document lands in one atomic rename.
    pub fn save(&self) -> Result<()> {
        let mut document = match fs::read_to_string(&self.settings_file) {
            Ok(raw) => serde_json::from_str::<Value>(&raw)
                .with_context(|| format!("failed to parse {}", self.settings_file.display()))?
                .as_object()
                .cloned()
                .unwrap_or_default(),
            Err(_) => Map::new(),
        };

        document.insert("tags".to_string(), serde_json::to_value(&self.tags)?);
        document.insert("tag_map".to_string(), serde_json::to_value(&self.tag_map)?);

        let parent = self
            .settings_file
            .parent()
            .context("settings file has no parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let rendered = serde_json::to_string_pretty(&Value::Object(document))?;
        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("failed to stage write under {}", parent.display()))?;
        tmp.write_all(rendered.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.settings_file)
            .with_context(|| format!("failed to write {}", self.settings_file.display()))?;
        Ok(())
    }

    /// Create a tag definition unless one with exactly this name exists.
    /// Returns the id of the new or existing tag.
    pub fn add_tag(&mut self, name: &str) -> String {
        if let Some(existing) = self.tags.iter().find(|t| t.name == name) {
            return existing.id.clone();
        }

        let sort_order = self
            .tags
            .iter()
            .filter_map(|t| t.sort_order)
            .max()
            .unwrap_or(0)
            + 1;
        let tag = Tag {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            folder_type: default_folder_type(),
            filter_state: default_filter_state(),
            sort_order: Some(sort_order),
            color: String::new(),
            color2: String::new(),
            create_date: now_epoch_millis(),
        };
        let id = tag.id.clone();
        self.tags.push(tag);
        id
    }

    /// Delete a tag definition and strip its id from every card entry.
    /// Card entries whose list empties are deleted outright.
    pub fn remove_tag(&mut self, name: &str) -> bool {
        let removed_ids: Vec<String> = self
            .tags
            .iter()
            .filter(|t| t.name == name)
            .map(|t| t.id.clone())
            .collect();
        if removed_ids.is_empty() {
            return false;
        }

        self.tags.retain(|t| t.name != name);
        for ids in self.tag_map.values_mut() {
            ids.retain(|id| !removed_ids.contains(id));
        }
        self.tag_map.retain(|_, ids| !ids.is_empty());
        true
    }

    /// Associate a tag with a card, creating the tag on first use. The
    /// card's id list keeps set semantics.
    pub fn assign_tag(&mut self, name: &str, card: &str) {
        let tag_id = self.add_tag(name);
        let key = normalize_card_key(card);
        let ids = self.tag_map.entry(key).or_default();
        if !ids.contains(&tag_id) {
            ids.push(tag_id);
        }
    }

    /// Drop a tag from a card; the card's entry disappears with its last
    /// tag. An untracked card is a warned no-op.
    pub fn unassign_tag(&mut self, name: &str, card: &str) -> bool {
        let Some(tag_id) = self.tags.iter().find(|t| t.name == name).map(|t| t.id.clone())
        else {
            return false;
        };
        let key = normalize_card_key(card);

        let Some(ids) = self.tag_map.get_mut(&key) else {
            warn::emit(WarnEvent {
                code: "CARD_UNTRACKED",
                stage: "tags",
                action: "unassign",
                card: &key,
                source: &self.settings_file.display().to_string(),
                reason: "card-not-in-tag-map",
                err: "",
            });
            return false;
        };

        let before = ids.len();
        ids.retain(|id| id != &tag_id);
        let changed = ids.len() != before;
        if ids.is_empty() {
            self.tag_map.remove(&key);
        }
        changed
    }

    pub fn get_tag_by_id(&self, id: &str) -> Option<&Tag> {
        self.tags.iter().find(|t| t.id == id)
    }

    /// Display names of every tag assigned to a card; ids with no surviving
    /// definition are skipped.
    pub fn tag_names_for_card(&self, card: &str) -> Vec<String> {
        let key = normalize_card_key(card);
        self.tag_map
            .get(&key)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.get_tag_by_id(id))
                    .map(|t| t.name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
