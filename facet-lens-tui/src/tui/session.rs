use facet_lens_core::{ColumnSelections, FilterCondition};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize)]
pub struct Session {
    pub input_path: String,
    pub tool_id: String,
    pub selected_col: usize,
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub conditions: Vec<FilterCondition>,
    #[serde(default)]
    pub selections: ColumnSelections,
    #[serde(default)]
    pub active_set: Option<String>,
}

impl Session {
    pub fn cache_path() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("facet-lens")
            .join("session.json")
    }
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::cache_path();
        if let Some(parent) = path.parent() { std::fs::create_dir_all(parent)?; }
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
    pub fn load() -> Option<Self> {
        let path = Self::cache_path();
        serde_json::from_str(&std::fs::read_to_string(&path).ok()?).ok()
    }
}
