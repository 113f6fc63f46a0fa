use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompanionConfig {
    /// Root of the companion chat application's data directory, the one
    /// holding `characters/`, `worlds/`, and `settings.json`.
    pub root_dir: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiccConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for AiccConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aicharactercards.com/wp-json/pngapi/v1/details".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VaultConfig {
    pub companion: CompanionConfig,
    pub aicc: AiccConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialVaultConfig {
    companion: Option<CompanionConfig>,
    aicc: Option<AiccConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_u64(var: &str, fallback: u64) -> u64 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u64>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn validate(cfg: &VaultConfig) -> Result<()> {
    if cfg.aicc.base_url.trim().is_empty() {
        return Err(anyhow!("invalid aicc base url: cannot be empty"));
    }
    if cfg.aicc.timeout_secs == 0 {
        return Err(anyhow!("invalid aicc timeout: must be >= 1 second"));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("CARD_VAULT_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    if let Ok(home) = env::var("CARD_VAULT_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed).join("vault.toml"));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".cardvault").join("vault.toml"))
}

fn merge_file_config(base: &mut VaultConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialVaultConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse vault config {}: {err}", path.display()))?;
    if let Some(companion) = parsed.companion {
        base.companion = companion;
    }
    if let Some(aicc) = parsed.aicc {
        base.aicc = aicc;
    }
    Ok(())
}

pub fn load_config() -> Result<VaultConfig> {
    let mut cfg = VaultConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.companion.root_dir = env_or_string("CARD_VAULT_COMPANION_DIR", &cfg.companion.root_dir);
    cfg.aicc.base_url = env_or_string("CARD_VAULT_AICC_BASE_URL", &cfg.aicc.base_url);
    cfg.aicc.timeout_secs = env_or_u64("CARD_VAULT_AICC_TIMEOUT_SECS", cfg.aicc.timeout_secs);

    validate(&cfg)?;
    Ok(cfg)
}

/// Companion root as a path, or an error naming the setting when it is
/// still unconfigured.
pub fn required_companion_root(cfg: &VaultConfig) -> Result<PathBuf> {
    let trimmed = cfg.companion.root_dir.trim();
    if trimmed.is_empty() {
        return Err(anyhow!(
            "companion root is not configured; set [companion] root_dir in vault.toml or CARD_VAULT_COMPANION_DIR"
        ));
    }
    Ok(PathBuf::from(trimmed))
}

#[cfg(test)]
mod tests {
    use super::{AiccConfig, VaultConfig, required_companion_root, validate};

    #[test]
    fn default_config_validates() {
        assert!(validate(&VaultConfig::default()).is_ok());
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let cfg = VaultConfig {
            aicc: AiccConfig {
                timeout_secs: 0,
                ..AiccConfig::default()
            },
            ..VaultConfig::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn unset_companion_root_is_an_error() {
        let cfg = VaultConfig::default();
        assert!(required_companion_root(&cfg).is_err());
    }

    #[test]
    fn companion_root_trims_whitespace() {
        let cfg = VaultConfig {
            companion: super::CompanionConfig {
                root_dir: "  /srv/tavern  ".to_string(),
            },
            ..VaultConfig::default()
        };
        let root = required_companion_root(&cfg).expect("root");
        assert_eq!(root, std::path::PathBuf::from("/srv/tavern"));
    }
}
