use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default = "default_max_rows")]
    pub max_rows_preview: usize,
    #[serde(default)]
    pub column_width: Option<u16>, // falls back to 18 when None
}

fn default_theme() -> String {
    "dark".into()
}
fn default_max_rows() -> usize {
    500
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            max_rows_preview: default_max_rows(),
            column_width: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub store_path: Option<String>,
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_history_capacity() -> usize {
    50
}
fn default_debounce_ms() -> u64 {
    250
}
fn default_parallel_threshold() -> usize {
    10_000
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            debounce_ms: default_debounce_ms(),
            store_path: None,
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl FilterConfig {
    /// Location of the saved-filter / search-history store.
    pub fn store_path(&self) -> PathBuf {
        match &self.store_path {
            Some(p) => PathBuf::from(p),
            None => dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("facet-lens")
                .join("filters.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("facet-lens")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        let path = if let Ok(env_path) = std::env::var("FACET_LENS_CONFIG") {
            PathBuf::from(env_path) // $FACET_LENS_CONFIG overrides default config path
        } else {
            Self::config_path()
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| crate::FacetLensError::Config(e.to_string()))
    }

    pub fn save(&self) -> crate::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::FacetLensError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg.filter.history_capacity, 50);
        assert_eq!(cfg.filter.debounce_ms, 250);
        assert_eq!(cfg.display.theme, "dark");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filter]\nhistory_capacity = 5\n").unwrap();
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.filter.history_capacity, 5);
        assert_eq!(cfg.filter.parallel_threshold, 10_000);
        assert_eq!(cfg.display.max_rows_preview, 500);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("config.toml");
        let mut cfg = Config::default();
        cfg.display.theme = "nord".into();
        cfg.filter.store_path = Some("/tmp/x.json".into());
        cfg.save_to(&path).unwrap();
        let back = Config::load_from(&path).unwrap();
        assert_eq!(back.display.theme, "nord");
        assert_eq!(back.filter.store_path(), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn bad_toml_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[filter\nbroken").unwrap();
        assert!(matches!(Config::load_from(&path), Err(crate::FacetLensError::Config(_))));
    }
}
