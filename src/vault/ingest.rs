use crate::error::VaultError;
use crate::vault::catalog::Catalog;
use crate::vault::codec::decode_card_bytes;
use crate::vault::metadata::{field_str, resolve_highest_spec};
use crate::vault::notes::derive_notes;
use crate::vault::paths::{CompanionPaths, VaultPaths};
use crate::vault::tags::TagStore;
use crate::vault::util::now_timestamp;
use crate::vault::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardAction {
    Inserted,
    Skipped,
    Fallback,
    Failed,
}

impl CardAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Skipped => "skipped",
            Self::Fallback => "fallback",
            Self::Failed => "failed",
        }
    }
}

/// Progress messages handed to the caller over a channel; the pass never
/// mutates caller-owned state directly.
#[derive(Debug, Clone)]
pub enum IngestEvent {
    PassStarted { cards_dir: PathBuf, files: usize },
    CardProcessed { file: PathBuf, action: CardAction },
    PassFinished { outcome: IngestOutcome },
    PassFailed { error: String },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOutcome {
    pub scanned: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub fallbacks: usize,
    pub failed: usize,
    pub lorebooks_scanned: usize,
    pub lorebooks_added: usize,
    pub store_present: bool,
    pub tagged_cards: usize,
}

fn send_event(events: Option<&Sender<IngestEvent>>, event: IngestEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}

fn files_with_extension(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let read_dir = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in read_dir {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) == Some(extension) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn file_stem_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("card")
        .to_string()
}

/// Handle one card file. Decode failures degrade to a filename-derived
/// record; only catalog/filesystem errors bubble to the per-file catch.
fn process_card(catalog: &Catalog, path: &Path) -> Result<CardAction> {
    let source = path.display().to_string();
    if catalog.lookup_by_source_path(&source)?.is_some() {
        return Ok(CardAction::Skipped);
    }

    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let stem = file_stem_name(path);

    let (name, notes, action) = match decode_card_bytes(&bytes) {
        Ok(metadata) => {
            let fields = resolve_highest_spec(&metadata);
            let name = field_str(&fields, "name")
                .map(str::to_string)
                .unwrap_or_else(|| stem.clone());
            (name, derive_notes(&fields), CardAction::Inserted)
        }
        Err(err) => {
            warn::emit(WarnEvent {
                code: "CARD_DECODE_FAILED",
                stage: "ingest",
                action: "decode",
                card: &stem,
                source: &source,
                reason: "fallback-to-filename",
                err: &err.to_string(),
            });
            (stem, String::new(), CardAction::Fallback)
        }
    };

    let stamp = now_timestamp();
    catalog.insert_character(&name, &source, &notes, &stamp, &stamp)?;
    Ok(action)
}

fn sync_lorebooks(
    catalog: &Catalog,
    worlds_dir: &Path,
    outcome: &mut IngestOutcome,
) -> Result<()> {
    if !worlds_dir.is_dir() {
        warn::emit(WarnEvent {
            code: "WORLDS_DIR_MISSING",
            stage: "ingest",
            action: "lorebook-sync",
            card: "",
            source: &worlds_dir.display().to_string(),
            reason: "sub-pass-skipped",
            err: "",
        });
        return Ok(());
    }

    for path in files_with_extension(worlds_dir, "json")? {
        outcome.lorebooks_scanned += 1;
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if catalog.lorebook_exists(filename)? {
            continue;
        }
        catalog.insert_lorebook(filename, &now_timestamp())?;
        outcome.lorebooks_added += 1;
    }
    Ok(())
}

/// Run one full ingestion pass: scan, dedup, decode-or-fallback, insert,
/// lorebook sub-pass, then tag refresh. The pass is sequential and runs to
/// completion; each insert is atomic on its own and no insert happens
/// before the source directory checks succeed.
pub fn run_pass(
    paths: &VaultPaths,
    companion: &CompanionPaths,
    events: Option<&Sender<IngestEvent>>,
) -> Result<IngestOutcome> {
    if !companion.cards_dir.is_dir() {
        return Err(VaultError::DirectoryMissing(companion.cards_dir.clone()).into());
    }

    fs::create_dir_all(&paths.vault_home)
        .with_context(|| format!("failed to create {}", paths.vault_home.display()))?;
    let lock = fs::File::create(&paths.lock_file)
        .with_context(|| format!("failed to open {}", paths.lock_file.display()))?;
    lock.try_lock_exclusive()
        .with_context(|| "another ingestion pass is already running".to_string())?;

    let files = files_with_extension(&companion.cards_dir, "png")?;
    send_event(
        events,
        IngestEvent::PassStarted {
            cards_dir: companion.cards_dir.clone(),
            files: files.len(),
        },
    );

    let catalog = Catalog::open(&paths.catalog_db)?;
    let mut outcome = IngestOutcome::default();

    for path in files {
        outcome.scanned += 1;
        let action = match process_card(&catalog, &path) {
            Ok(action) => action,
            Err(err) => {
                warn::emit(WarnEvent {
                    code: "CARD_FAILED",
                    stage: "ingest",
                    action: "process-card",
                    card: &file_stem_name(&path),
                    source: &path.display().to_string(),
                    reason: "card-skipped-this-pass",
                    err: &format!("{err:#}"),
                });
                CardAction::Failed
            }
        };
        match action {
            CardAction::Inserted => outcome.inserted += 1,
            CardAction::Skipped => outcome.skipped += 1,
            CardAction::Fallback => {
                outcome.inserted += 1;
                outcome.fallbacks += 1;
            }
            CardAction::Failed => outcome.failed += 1,
        }
        send_event(events, IngestEvent::CardProcessed { file: path, action });
    }

    sync_lorebooks(&catalog, &companion.worlds_dir, &mut outcome)?;

    let mut store = TagStore::new(companion.settings_file.clone());
    let load = store.load()?;
    outcome.store_present = load.store_present;
    for record in catalog.list_characters()? {
        let card_file = Path::new(&record.main_file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&record.main_file)
            .to_string();
        if !store.tag_names_for_card(&card_file).is_empty() {
            outcome.tagged_cards += 1;
        }
    }

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{CardAction, IngestEvent, run_pass};
    use crate::error::VaultError;
    use crate::vault::codec::{encode_card, encode_chunk, encode_text_chunk};
    use crate::vault::paths::{VaultPaths, companion_paths};
    use serde_json::json;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn card_bytes(metadata: &serde_json::Value) -> Vec<u8> {
        encode_card(&[
            encode_chunk(b"IHDR", &[0u8; 13]),
            encode_text_chunk("chara", metadata),
            encode_chunk(b"IEND", &[]),
        ])
    }

    fn vault_paths(root: &std::path::Path) -> VaultPaths {
        VaultPaths {
            vault_home: root.join("vault"),
            catalog_db: root.join("vault/catalog.db"),
            lock_file: root.join("vault/ingest.lock"),
        }
    }

    #[test]
    fn second_pass_inserts_nothing() {
        let tmp = tempdir().expect("tempdir");
        let companion = companion_paths(&tmp.path().join("tavern"));
        fs::create_dir_all(&companion.cards_dir).expect("mkdir cards");
        fs::write(
            companion.cards_dir.join("aria.png"),
            card_bytes(&json!({"name": "Aria", "description": "a wandering bard."})),
        )
        .expect("write card");

        let paths = vault_paths(tmp.path());
        let first = run_pass(&paths, &companion, None).expect("first pass");
        assert_eq!(first.inserted, 1);
        assert_eq!(first.skipped, 0);

        let second = run_pass(&paths, &companion, None).expect("second pass");
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn corrupt_card_falls_back_to_filename() {
        let tmp = tempdir().expect("tempdir");
        let companion = companion_paths(&tmp.path().join("tavern"));
        fs::create_dir_all(&companion.cards_dir).expect("mkdir cards");

        let mut corrupted = card_bytes(&json!({"name": "Aria"}));
        corrupted[20] ^= 0x01;
        fs::write(companion.cards_dir.join("mystery card.png"), corrupted).expect("write card");

        let paths = vault_paths(tmp.path());
        let (tx, rx) = mpsc::channel();
        let outcome = run_pass(&paths, &companion, Some(&tx)).expect("pass");
        assert_eq!(outcome.inserted, 1);
        assert_eq!(outcome.fallbacks, 1);
        assert_eq!(outcome.failed, 0);

        let actions: Vec<CardAction> = rx
            .try_iter()
            .filter_map(|event| match event {
                IngestEvent::CardProcessed { action, .. } => Some(action),
                _ => None,
            })
            .collect();
        assert_eq!(actions, vec![CardAction::Fallback]);

        let catalog = crate::vault::catalog::Catalog::open(&paths.catalog_db).expect("catalog");
        let record = catalog
            .lookup_by_source_path(
                &companion.cards_dir.join("mystery card.png").display().to_string(),
            )
            .expect("lookup")
            .expect("record");
        assert_eq!(record.name, "mystery card");
        assert_eq!(record.notes, "");
    }

    #[test]
    fn missing_cards_dir_aborts_before_any_work() {
        let tmp = tempdir().expect("tempdir");
        let companion = companion_paths(&tmp.path().join("tavern"));
        let paths = vault_paths(tmp.path());

        let err = run_pass(&paths, &companion, None).expect_err("missing dir");
        assert!(matches!(
            err.downcast_ref::<VaultError>(),
            Some(VaultError::DirectoryMissing(_))
        ));
        assert!(!paths.catalog_db.exists());
    }

    #[test]
    fn lorebooks_sync_once() {
        let tmp = tempdir().expect("tempdir");
        let companion = companion_paths(&tmp.path().join("tavern"));
        fs::create_dir_all(&companion.cards_dir).expect("mkdir cards");
        fs::create_dir_all(&companion.worlds_dir).expect("mkdir worlds");
        fs::write(companion.worlds_dir.join("eldoria.json"), "{}").expect("write world");

        let paths = vault_paths(tmp.path());
        let first = run_pass(&paths, &companion, None).expect("first pass");
        assert_eq!(first.lorebooks_added, 1);

        let second = run_pass(&paths, &companion, None).expect("second pass");
        assert_eq!(second.lorebooks_scanned, 1);
        assert_eq!(second.lorebooks_added, 0);
    }

    #[test]
    fn tag_refresh_tolerates_missing_settings_and_untracked_cards() {
        let tmp = tempdir().expect("tempdir");
        let companion = companion_paths(&tmp.path().join("tavern"));
        fs::create_dir_all(&companion.cards_dir).expect("mkdir cards");
        fs::write(
            companion.cards_dir.join("aria.png"),
            card_bytes(&json!({"name": "Aria"})),
        )
        .expect("write card");

        let paths = vault_paths(tmp.path());
        let outcome = run_pass(&paths, &companion, None).expect("pass");
        assert!(!outcome.store_present);
        assert_eq!(outcome.tagged_cards, 0);

        fs::create_dir_all(&companion.root).expect("mkdir root");
        fs::write(
            &companion.settings_file,
            json!({
                "tags": [{"id": "t1", "name": "villain"}],
                "tag_map": {"aria.png": ["t1"]}
            })
            .to_string(),
        )
        .expect("write settings");

        let tagged = run_pass(&paths, &companion, None).expect("tagged pass");
        assert!(tagged.store_present);
        assert_eq!(tagged.tagged_cards, 1);
    }
}
