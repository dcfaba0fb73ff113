use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::io::Write;
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use facet_lens_common::Result;

use crate::condition::{FilterableField, SavedFilterSet};

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub text: String,
    pub tool_id: String,
    pub result_count: usize,
    pub searched_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryState {
    #[serde(default)]
    fields: BTreeMap<String, Vec<FilterableField>>,
    #[serde(default)]
    filter_sets: Vec<SavedFilterSet>,
    #[serde(default)]
    search_history: Vec<SearchHistoryEntry>, // most recent first
}

/// Field declarations, saved filter sets and search history shared by every tool.
///
/// Construct one per process and hand it out (usually behind an `Arc`). Store
/// failures are logged and never surface to callers except through [`FilterRegistry::flush`].
pub struct FilterRegistry {
    state: RwLock<RegistryState>,
    path: Option<PathBuf>,
    history_capacity: usize,
    flush_lock: Mutex<()>, // one store write at a time
}

impl FilterRegistry {
    pub fn in_memory(history_capacity: usize) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            path: None,
            history_capacity,
            flush_lock: Mutex::new(()),
        }
    }

    /// Load the JSON store at `path`. A missing, unreadable or corrupt store
    /// starts empty.
    pub fn open(path: impl Into<PathBuf>, history_capacity: usize) -> Self {
        let path = path.into();
        let mut state = load_state(&path);
        state.search_history.truncate(history_capacity);
        Self {
            state: RwLock::new(state),
            path: Some(path),
            history_capacity,
            flush_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn history_capacity(&self) -> usize {
        self.history_capacity
    }

    fn read(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the store to disk. No-op for in-memory registries.
    ///
    /// The snapshot goes to a temporary file in the store's directory and is
    /// renamed over the store, so readers never see a half-written file.
    pub fn flush(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.flush_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let content = serde_json::to_string_pretty(&*self.read())?;
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(e) = self.flush() {
            warn!("could not write filter store {}: {e}", self.path_display());
        }
    }

    fn path_display(&self) -> String {
        self.path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<memory>".into())
    }

    pub fn register_fields(&self, tool_id: &str, fields: Vec<FilterableField>) {
        debug!("registering {} fields for {tool_id}", fields.len());
        self.write().fields.insert(tool_id.to_string(), fields);
        self.persist();
    }

    pub fn get_fields(&self, tool_id: &str) -> Vec<FilterableField> {
        self.read().fields.get(tool_id).cloned().unwrap_or_default()
    }

    /// Save `set`, replacing any set with the same tool and name.
    pub fn save_filter_set(&self, set: SavedFilterSet) {
        {
            let mut state = self.write();
            let existing = state
                .filter_sets
                .iter()
                .position(|s| s.tool_id == set.tool_id && s.name == set.name);
            match existing {
                Some(i) => state.filter_sets[i] = set,
                None => state.filter_sets.push(set),
            }
        }
        self.persist();
    }

    /// Sets owned by `tool_id` plus every global set.
    pub fn get_filter_sets(&self, tool_id: &str) -> Vec<SavedFilterSet> {
        self.read()
            .filter_sets
            .iter()
            .filter(|s| s.tool_id == tool_id || s.is_global)
            .cloned()
            .collect()
    }

    pub fn find_filter_set(&self, tool_id: &str, name: &str) -> Option<SavedFilterSet> {
        let state = self.read();
        let visible = |s: &&SavedFilterSet| s.name == name && (s.tool_id == tool_id || s.is_global);
        // a tool's own set wins over a global one of the same name
        state
            .filter_sets
            .iter()
            .filter(visible)
            .find(|s| s.tool_id == tool_id)
            .or_else(|| state.filter_sets.iter().find(visible))
            .cloned()
    }

    pub fn delete_filter_set(&self, tool_id: &str, name: &str) -> bool {
        let removed = {
            let mut state = self.write();
            let before = state.filter_sets.len();
            state.filter_sets.retain(|s| !(s.tool_id == tool_id && s.name == name));
            before != state.filter_sets.len()
        };
        if removed {
            self.persist();
        }
        removed
    }

    /// Record a free-text search. Re-running a search moves it to the front
    /// instead of duplicating it; the oldest entries fall off past capacity.
    pub fn add_search_history(&self, text: &str, tool_id: &str, result_count: usize) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        {
            let mut state = self.write();
            state
                .search_history
                .retain(|e| !(e.text == text && e.tool_id == tool_id));
            state.search_history.insert(
                0,
                SearchHistoryEntry {
                    text: text.to_string(),
                    tool_id: tool_id.to_string(),
                    result_count,
                    searched_at: Utc::now(),
                },
            );
            state.search_history.truncate(self.history_capacity);
        }
        self.persist();
    }

    /// Most recent first.
    pub fn search_history(&self, tool_id: &str) -> Vec<SearchHistoryEntry> {
        self.read()
            .search_history
            .iter()
            .filter(|e| e.tool_id == tool_id)
            .cloned()
            .collect()
    }

    pub fn clear_search_history(&self, tool_id: &str) {
        self.write().search_history.retain(|e| e.tool_id != tool_id);
        self.persist();
    }
}

fn load_state(path: &Path) -> RegistryState {
    if !path.exists() {
        return RegistryState::default();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("could not read filter store {}: {e}", path.display());
            return RegistryState::default();
        }
    };
    match serde_json::from_str(&content) {
        Ok(state) => state,
        Err(e) => {
            warn!("ignoring corrupt filter store {}: {e}", path.display());
            RegistryState::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{FieldKind, FilterCondition, Operator};

    #[test]
    fn history_dedups_and_orders_recent_first() {
        let reg = FilterRegistry::in_memory(10);
        reg.add_search_history("crash", "tickets", 3);
        reg.add_search_history("login", "tickets", 1);
        reg.add_search_history("crash ", "tickets", 5);
        reg.add_search_history("crash", "prs", 2);
        let h = reg.search_history("tickets");
        assert_eq!(h.len(), 2);
        assert_eq!(h[0].text, "crash");
        assert_eq!(h[0].result_count, 5);
        assert_eq!(h[1].text, "login");
        assert_eq!(reg.search_history("prs").len(), 1);
    }

    #[test]
    fn history_evicts_oldest_past_capacity() {
        let reg = FilterRegistry::in_memory(3);
        for q in ["a", "b", "c", "d"] {
            reg.add_search_history(q, "t", 0);
        }
        let texts: Vec<_> = reg.search_history("t").into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["d", "c", "b"]);
    }

    #[test]
    fn blank_searches_are_ignored() {
        let reg = FilterRegistry::in_memory(3);
        reg.add_search_history("   ", "t", 0);
        assert!(reg.search_history("t").is_empty());
    }

    #[test]
    fn global_sets_visible_to_every_tool() {
        let reg = FilterRegistry::in_memory(3);
        let c = vec![FilterCondition::new("state", Operator::Equals, "Active")];
        reg.save_filter_set(SavedFilterSet::new("active", "tickets", c.clone()));
        reg.save_filter_set(SavedFilterSet::new("open", "prs", c.clone()).global());
        reg.save_filter_set(SavedFilterSet::new("mine", "prs", c.clone()));
        let names: Vec<_> = reg.get_filter_sets("tickets").into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["active", "open"]);
        assert!(reg.find_filter_set("tickets", "open").is_some());
        assert!(reg.find_filter_set("tickets", "mine").is_none());
    }

    #[test]
    fn saving_same_name_replaces() {
        let reg = FilterRegistry::in_memory(3);
        reg.save_filter_set(SavedFilterSet::new("s", "t", vec![]));
        let c = vec![FilterCondition::is_null("owner")];
        reg.save_filter_set(SavedFilterSet::new("s", "t", c.clone()));
        let sets = reg.get_filter_sets("t");
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].conditions, c);
        assert!(reg.delete_filter_set("t", "s"));
        assert!(!reg.delete_filter_set("t", "s"));
    }

    #[test]
    fn fields_per_tool() {
        let reg = FilterRegistry::in_memory(3);
        reg.register_fields("t", vec![FilterableField::new("title", "Title", FieldKind::Text)]);
        assert_eq!(reg.get_fields("t").len(), 1);
        assert!(reg.get_fields("other").is_empty());
    }
}
