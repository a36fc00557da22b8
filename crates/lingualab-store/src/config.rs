//! Configuration loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lingualab_core::ingest::DEFAULT_MAX_UPLOAD_BYTES;
use lingualab_core::TrainingConfig;

/// The `[training]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSettings {
    /// Options per question, correct answer included.
    #[serde(default = "default_option_count")]
    pub option_count: usize,
    /// Recently answered words kept out of the next pick.
    #[serde(default = "default_recent_window")]
    pub recent_window: usize,
    /// Base tie-break seed. When absent the host picks one at startup.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_option_count() -> usize {
    4
}
fn default_recent_window() -> usize {
    3
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            option_count: default_option_count(),
            recent_window: default_recent_window(),
            seed: None,
        }
    }
}

impl TrainingSettings {
    /// Engine configuration, using `fallback_seed` when no seed is configured.
    pub fn engine_config(&self, fallback_seed: u64) -> TrainingConfig {
        TrainingConfig {
            option_count: self.option_count,
            recent_window: self.recent_window,
            seed: self.seed.unwrap_or(fallback_seed),
        }
    }
}

/// Top-level lingualab configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinguaLabConfig {
    /// Chat ids allowed to upload dictionaries. Empty means everyone.
    #[serde(default)]
    pub moderators: Vec<i64>,
    /// Largest accepted upload in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    /// JSON data file.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,
    #[serde(default)]
    pub training: TrainingSettings,
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}
fn default_data_file() -> PathBuf {
    PathBuf::from("./lingualab-data.json")
}

impl Default for LinguaLabConfig {
    fn default() -> Self {
        Self {
            moderators: Vec::new(),
            max_upload_bytes: default_max_upload_bytes(),
            data_file: default_data_file(),
            training: TrainingSettings::default(),
        }
    }
}

impl LinguaLabConfig {
    /// Reject settings the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            self.training.option_count >= 2,
            "training.option_count must be at least 2"
        );
        anyhow::ensure!(self.max_upload_bytes > 0, "max_upload_bytes must be positive");
        Ok(())
    }
}

/// Resolve `${VAR_NAME}` references in `s` through `lookup`.
///
/// Inserted values are not scanned again. Unknown variables become empty.
fn resolve_env_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        result.push_str(&lookup(&rest[start + 2..start + end]).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

/// Parse a comma-separated list of chat ids.
fn parse_moderators(list: &str) -> Result<Vec<i64>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>()
                .with_context(|| format!("invalid moderator id: {s}"))
        })
        .collect()
}

/// Apply `LINGUALAB_MODERATORS` and `LINGUALAB_DATA_FILE` through `lookup`.
fn apply_env_overrides(
    config: &mut LinguaLabConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(list) = lookup("LINGUALAB_MODERATORS") {
        config.moderators = parse_moderators(&list)?;
    }
    if let Some(path) = lookup("LINGUALAB_DATA_FILE") {
        config.data_file = PathBuf::from(path);
    }
    Ok(())
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `lingualab.toml` in the current directory
/// 2. `~/.config/lingualab/config.toml`
///
/// Environment variable overrides: `LINGUALAB_MODERATORS`, `LINGUALAB_DATA_FILE`.
pub fn load_config() -> Result<LinguaLabConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LinguaLabConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("lingualab.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<LinguaLabConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LinguaLabConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    let data_file = resolve_env_vars(&config.data_file.to_string_lossy(), |key| {
        std::env::var(key).ok()
    });
    config.data_file = PathBuf::from(data_file);

    config.validate()?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("lingualab"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: &str) -> Option<String> {
        match key {
            "LINGUALAB_HOME" => Some("hello".to_string()),
            "SELF_REF" => Some("${SELF_REF}".to_string()),
            _ => None,
        }
    }

    #[test]
    fn resolve_env_vars_basic() {
        assert_eq!(resolve_env_vars("${LINGUALAB_HOME}", lookup), "hello");
        assert_eq!(
            resolve_env_vars("/data/${LINGUALAB_HOME}/store.json", lookup),
            "/data/hello/store.json"
        );
        assert_eq!(resolve_env_vars("/data/${MISSING}.json", lookup), "/data/.json");
        assert_eq!(resolve_env_vars("/data/${open", lookup), "/data/${open");
    }

    #[test]
    fn resolved_values_are_not_expanded_again() {
        assert_eq!(
            resolve_env_vars("${SELF_REF}/${LINGUALAB_HOME}", lookup),
            "${SELF_REF}/hello"
        );
    }

    #[test]
    fn default_config() {
        let config = LinguaLabConfig::default();
        assert!(config.moderators.is_empty());
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.training.option_count, 4);
        assert_eq!(config.training.recent_window, 3);
        assert!(config.training.seed.is_none());
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
moderators = [111, 222]
max_upload_bytes = 2048
data_file = "/var/lib/lingualab/data.json"

[training]
option_count = 6
recent_window = 5
seed = 42
"#;
        let config: LinguaLabConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.moderators, vec![111, 222]);
        assert_eq!(config.max_upload_bytes, 2048);
        assert_eq!(config.training.option_count, 6);

        let engine = config.training.engine_config(7);
        assert_eq!(engine.seed, 42);
        assert_eq!(engine.recent_window, 5);
    }

    #[test]
    fn fallback_seed_used_when_unset() {
        let settings = TrainingSettings::default();
        assert_eq!(settings.engine_config(99).seed, 99);
    }

    #[test]
    fn env_overrides_replace_moderators_and_data_file() {
        let mut config = LinguaLabConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            "LINGUALAB_MODERATORS" => Some(" 1, 2 ,3,".to_string()),
            "LINGUALAB_DATA_FILE" => Some("/tmp/other.json".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.moderators, vec![1, 2, 3]);
        assert_eq!(config.data_file, PathBuf::from("/tmp/other.json"));
    }

    #[test]
    fn invalid_moderator_id_is_an_error() {
        let mut config = LinguaLabConfig::default();
        let err = apply_env_overrides(&mut config, |key| {
            (key == "LINGUALAB_MODERATORS").then(|| "12,abc".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("invalid moderator id: abc"));
    }

    #[test]
    fn validate_rejects_single_option() {
        let mut config = LinguaLabConfig::default();
        config.training.option_count = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_fails() {
        let err = load_config_from(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }
}
