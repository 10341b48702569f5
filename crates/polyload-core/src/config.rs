//! Process-level configuration

use std::path::PathBuf;

/// Extension recognised for binary locations when an artifact sets none
pub const DEFAULT_EXTENSION: &str = "plugin";

/// Environment overrides read by [`PolyloadConfig::from_env`]
pub const ENV_BASE_DIR: &str = "POLYLOAD_BASE_DIR";
pub const ENV_TEMP_ROOT: &str = "POLYLOAD_TEMP_ROOT";
pub const ENV_EXTENSION: &str = "POLYLOAD_EXTENSION";

/// Polyload configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolyloadConfig {
    /// Directory that artifact paths are resolved against
    pub base_dir: PathBuf,
    /// Root for extracted archive entries
    pub temp_root: PathBuf,
    /// Extension filter used when an artifact sets none
    pub default_extension: String,
}

impl Default for PolyloadConfig {
    fn default() -> Self {
        PolyloadConfig {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            temp_root: std::env::temp_dir().join("polyload"),
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }
}

impl PolyloadConfig {
    /// Defaults overridden by `POLYLOAD_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = PolyloadConfig::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = set(ENV_BASE_DIR) {
            config.base_dir = PathBuf::from(dir);
        }
        if let Some(dir) = set(ENV_TEMP_ROOT) {
            config.temp_root = PathBuf::from(dir);
        }
        if let Some(ext) = set(ENV_EXTENSION) {
            config.default_extension = ext.trim_start_matches('.').to_string();
        }

        tracing::debug!(
            base_dir = %config.base_dir.display(),
            temp_root = %config.temp_root.display(),
            extension = %config.default_extension,
            "polyload configuration loaded"
        );
        config
    }
}
