use anyhow::Result;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct VaultPaths {
    pub vault_home: PathBuf,
    pub catalog_db: PathBuf,
    pub lock_file: PathBuf,
}

/// Directories and files owned by the companion chat application, derived
/// from its configured root.
#[derive(Debug, Clone)]
pub struct CompanionPaths {
    pub root: PathBuf,
    pub cards_dir: PathBuf,
    pub worlds_dir: PathBuf,
    pub settings_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<VaultPaths> {
    let home = required_home_dir()?;
    let vault_home = env_or_default_path("CARD_VAULT_HOME", home.join(".cardvault"));

    let catalog_db = env_or_default_path("CARD_VAULT_DB", vault_home.join("catalog.db"));
    let lock_file = env_or_default_path("CARD_VAULT_LOCK", vault_home.join("ingest.lock"));

    Ok(VaultPaths {
        vault_home,
        catalog_db,
        lock_file,
    })
}

pub fn companion_paths(root: &Path) -> CompanionPaths {
    CompanionPaths {
        root: root.to_path_buf(),
        cards_dir: root.join("characters"),
        worlds_dir: root.join("worlds"),
        settings_file: root.join("settings.json"),
    }
}
