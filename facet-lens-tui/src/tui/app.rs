use crate::tui::session::Session;
use crate::tui::theme::Theme;
use facet_lens_common::Config;
use facet_lens_core::{
    describe_chain, evaluate, infer_fields, matches_text, parse_conditions, select_indices, ColumnFilter,
    ColumnSelections, FilterCondition, FilterRegistry, FilterableField, Resolve, SavedFilterSet,
    SearchHistoryEntry, SelectAll,
};
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};

const FIELD_SAMPLE: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Records,
    Help,
    ConditionInput,
    ColumnFilter,
    SavedSets,
    SaveSetInput,
    History,
}

pub struct App {
    pub input_path: String,
    pub tool_id: String,
    pub records: Vec<serde_json::Value>,
    pub fields: Vec<FilterableField>,
    pub visible: Vec<usize>, // indices into records that pass every filter
    pub conditions: Vec<FilterCondition>,
    pub condition_input: String,
    pub selections: ColumnSelections,
    pub column_filter: Option<ColumnFilter>, // at most one open session
    pub column_filter_cursor: usize,
    pub search: String,
    pub searching: bool,
    pub refresh_due: Option<Instant>, // debounced re-filter while typing
    pub selected_row: usize,
    pub selected_col: usize,
    pub view: View,
    pub saved_sets: Vec<SavedFilterSet>,
    pub sets_selected: usize,
    pub set_name_input: String,
    pub set_global: bool,
    pub active_set: Option<String>,
    pub history: Vec<SearchHistoryEntry>,
    pub history_selected: usize,
    pub help_scroll: usize,
    pub status_msg: String,
    pub should_quit: bool,
    pub config: Config,
    pub theme: Theme,
    pub registry: Arc<FilterRegistry>,
}

impl App {
    pub fn new(
        input_path: String,
        tool_id: String,
        records: Vec<serde_json::Value>,
        config: Config,
        registry: Arc<FilterRegistry>,
    ) -> Self {
        let mut fields = registry.get_fields(&tool_id);
        if fields.is_empty() {
            fields = infer_fields(&records, FIELD_SAMPLE);
            registry.register_fields(&tool_id, fields.clone());
        }
        let visible = (0..records.len()).collect();
        Self {
            input_path,
            tool_id,
            records,
            fields,
            visible,
            conditions: Vec::new(),
            condition_input: String::new(),
            selections: ColumnSelections::new(),
            column_filter: None,
            column_filter_cursor: 0,
            search: String::new(),
            searching: false,
            refresh_due: None,
            selected_row: 0,
            selected_col: 0,
            view: View::Records,
            saved_sets: Vec::new(),
            sets_selected: 0,
            set_name_input: String::new(),
            set_global: false,
            active_set: None,
            history: Vec::new(),
            history_selected: 0,
            help_scroll: 0,
            status_msg: String::from("Loading..."),
            should_quit: false,
            theme: Theme::from_name(&config.display.theme),
            config,
            registry,
        }
    }

    pub fn selected_field(&self) -> Option<&FilterableField> {
        self.fields.get(self.selected_col)
    }

    pub fn selected_record(&self) -> Option<&serde_json::Value> {
        self.visible.get(self.selected_row).map(|&i| &self.records[i])
    }

    pub fn cell(&self, record: &serde_json::Value, field: &FilterableField) -> String {
        record.resolve(&field.name).to_string()
    }

    pub fn refresh(&mut self) {
        let started = Instant::now();
        let (conditions, selections) = (&self.conditions, &self.selections);
        let (fields, search) = (&self.fields, self.search.as_str());
        self.visible = select_indices(&self.records, self.config.filter.parallel_threshold, |r| {
            evaluate(r, conditions) && selections.accepts(r) && matches_text(r, fields, search)
        });
        self.refresh_due = None;
        if self.selected_row >= self.visible.len() {
            self.selected_row = self.visible.len().saturating_sub(1);
        }
        debug!(
            "filtered {} of {} records in {:?}",
            self.visible.len(),
            self.records.len(),
            started.elapsed()
        );
        self.status_msg = format!("{} of {} records", self.visible.len(), self.records.len());
    }

    pub fn schedule_refresh(&mut self) {
        self.refresh_due = Some(Instant::now() + Duration::from_millis(self.config.filter.debounce_ms));
    }

    /// Run a pending debounced refresh once its deadline has passed.
    pub fn tick(&mut self) {
        if self.refresh_due.is_some_and(|due| Instant::now() >= due) {
            self.refresh();
        }
    }

    pub fn commit_search(&mut self) {
        self.searching = false;
        self.refresh();
        self.registry
            .add_search_history(&self.search, &self.tool_id, self.visible.len());
    }

    pub fn clear_search(&mut self) {
        self.searching = false;
        self.search.clear();
        self.refresh();
    }

    /// Rows past `max_rows_preview` stay filtered but are not browsable.
    pub fn browsable_rows(&self) -> usize {
        self.visible.len().min(self.config.display.max_rows_preview)
    }

    pub fn row_down(&mut self, n: usize) {
        let max = self.browsable_rows().saturating_sub(1);
        self.selected_row = (self.selected_row + n).min(max);
    }

    pub fn row_up(&mut self, n: usize) {
        self.selected_row = self.selected_row.saturating_sub(n);
    }

    pub fn col_right(&mut self) {
        if self.selected_col + 1 < self.fields.len() {
            self.selected_col += 1;
        }
    }

    pub fn col_left(&mut self) {
        self.selected_col = self.selected_col.saturating_sub(1);
    }

    // --- column filter session ---

    pub fn open_column_filter(&mut self) {
        if let Some(mut open) = self.column_filter.take() {
            open.cancel();
        }
        let Some(name) = self.selected_field().map(|f| f.name.clone()) else {
            return;
        };
        let filter = ColumnFilter::from_records(&name, &self.records, self.selections.get(&name));
        debug!("column filter on {name}: {} distinct values", filter.len());
        self.column_filter = Some(filter);
        self.column_filter_cursor = 0;
        self.view = View::ColumnFilter;
    }

    pub fn commit_column_filter(&mut self) {
        if let Some(mut filter) = self.column_filter.take() {
            let selection = filter.commit();
            let column = filter.column().to_string();
            let kept = selection.len();
            self.selections.apply(&column, selection, filter.len());
            self.refresh();
            if self.selections.is_filtered(&column) {
                self.status_msg = format!("{column}: {kept} of {} values | {}", filter.len(), self.status_msg);
            }
        }
        self.view = View::Records;
    }

    pub fn cancel_column_filter(&mut self) {
        if let Some(mut filter) = self.column_filter.take() {
            filter.cancel();
        }
        self.view = View::Records;
    }

    pub fn clear_column_restriction(&mut self) {
        if let Some(name) = self.selected_field().map(|f| f.name.clone()) {
            if self.selections.clear(&name) {
                self.refresh();
            }
        }
    }

    pub fn filter_cursor_down(&mut self) {
        let len = self.column_filter.as_ref().map(|f| f.visible_len()).unwrap_or(0);
        if self.column_filter_cursor + 1 < len {
            self.column_filter_cursor += 1;
        }
    }

    pub fn filter_cursor_up(&mut self) {
        self.column_filter_cursor = self.column_filter_cursor.saturating_sub(1);
    }

    pub fn filter_toggle_current(&mut self) {
        if let Some(f) = self.column_filter.as_mut() {
            f.toggle(self.column_filter_cursor);
        }
    }

    pub fn filter_toggle_all(&mut self) {
        if let Some(f) = self.column_filter.as_mut() {
            let select = f.select_all_state() != SelectAll::Checked;
            f.toggle_select_all(select);
        }
    }

    pub fn filter_edit_query(&mut self, edit: impl FnOnce(&mut String)) {
        if let Some(f) = self.column_filter.as_mut() {
            let mut q = f.query().to_string();
            edit(&mut q);
            f.apply_substring_filter(&q);
            self.column_filter_cursor = 0;
        }
    }

    // --- condition chain ---

    pub fn begin_condition_edit(&mut self) {
        self.condition_input = describe_chain(&self.conditions);
        self.view = View::ConditionInput;
    }

    pub fn apply_condition_input(&mut self) {
        match parse_conditions(&self.condition_input) {
            Ok(chain) => {
                self.conditions = chain;
                self.active_set = None;
                self.view = View::Records;
                self.refresh();
            }
            Err(e) => {
                self.status_msg = format!("{e}");
            }
        }
    }

    pub fn clear_conditions(&mut self) {
        self.conditions.clear();
        self.active_set = None;
        self.refresh();
    }

    pub fn clear_all_filters(&mut self) {
        self.conditions.clear();
        self.selections.clear_all();
        self.search.clear();
        self.active_set = None;
        self.refresh();
    }

    // --- saved sets ---

    pub fn open_saved_sets(&mut self) {
        self.saved_sets = self.registry.get_filter_sets(&self.tool_id);
        self.sets_selected = 0;
        self.view = View::SavedSets;
    }

    pub fn load_set(&mut self, set: &SavedFilterSet) {
        info!("loading filter set '{}' ({} conditions)", set.name, set.conditions.len());
        self.conditions = set.conditions.clone();
        self.active_set = Some(set.name.clone());
        self.refresh();
    }

    pub fn load_set_by_name(&mut self, name: &str) -> bool {
        match self.registry.find_filter_set(&self.tool_id, name) {
            Some(set) => {
                self.load_set(&set);
                true
            }
            None => false,
        }
    }

    pub fn load_selected_set(&mut self) {
        if let Some(set) = self.saved_sets.get(self.sets_selected).cloned() {
            self.load_set(&set);
        }
        self.view = View::Records;
    }

    pub fn delete_selected_set(&mut self) {
        let Some(set) = self.saved_sets.get(self.sets_selected).cloned() else {
            return;
        };
        if self.registry.delete_filter_set(&set.tool_id, &set.name) {
            self.status_msg = format!("deleted '{}'", set.name);
            if self.active_set.as_deref() == Some(set.name.as_str()) {
                self.active_set = None;
            }
        } else {
            self.status_msg = format!("'{}' belongs to {}", set.name, set.tool_id);
        }
        self.saved_sets = self.registry.get_filter_sets(&self.tool_id);
        self.sets_selected = self.sets_selected.min(self.saved_sets.len().saturating_sub(1));
    }

    pub fn begin_save_set(&mut self) {
        self.set_name_input = self.active_set.clone().unwrap_or_default();
        self.set_global = false;
        self.view = View::SaveSetInput;
    }

    pub fn save_current_set(&mut self) {
        let name = self.set_name_input.trim().to_string();
        if name.is_empty() {
            self.status_msg = "name required".into();
            return;
        }
        let mut set = SavedFilterSet::new(name.clone(), self.tool_id.clone(), self.conditions.clone());
        if self.set_global {
            set = set.global();
        }
        self.registry.save_filter_set(set);
        self.active_set = Some(name.clone());
        self.status_msg = format!("saved '{name}'");
        self.view = View::Records;
    }

    // --- search history ---

    pub fn open_history(&mut self) {
        self.history = self.registry.search_history(&self.tool_id);
        self.history_selected = 0;
        self.view = View::History;
    }

    pub fn reuse_selected_history(&mut self) {
        if let Some(entry) = self.history.get(self.history_selected) {
            self.search = entry.text.clone();
            self.commit_search();
        }
        self.view = View::Records;
    }

    pub fn clear_history(&mut self) {
        self.registry.clear_search_history(&self.tool_id);
        self.history.clear();
        self.history_selected = 0;
    }

    pub fn to_session(&self) -> Session {
        Session {
            input_path: self.input_path.clone(),
            tool_id: self.tool_id.clone(),
            selected_col: self.selected_col,
            search: self.search.clone(),
            conditions: self.conditions.clone(),
            selections: self.selections.clone(),
            active_set: self.active_set.clone(),
        }
    }

    pub fn restore_from_session(&mut self, s: &Session) {
        if s.input_path != self.input_path || s.tool_id != self.tool_id {
            return;
        }
        self.selected_col = s.selected_col.min(self.fields.len().saturating_sub(1));
        self.search = s.search.clone();
        self.conditions = s.conditions.clone();
        self.selections = s.selections.clone();
        self.active_set = s.active_set.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app() -> App {
        let records = vec![
            json!({"state": "Active", "priority": 3, "title": "crash on start"}),
            json!({"state": "Closed", "priority": 1, "title": "typo"}),
            json!({"state": "Active", "priority": 1, "title": "slow login"}),
        ];
        App::new(
            "records.json".into(),
            "tickets".into(),
            records,
            Config::default(),
            Arc::new(FilterRegistry::in_memory(10)),
        )
    }

    #[test]
    fn refresh_agrees_above_parallel_threshold() {
        let mut serial = app();
        let mut parallel = app();
        parallel.config.filter.parallel_threshold = 1;
        for a in [&mut serial, &mut parallel] {
            a.condition_input = "priority = 1 or title contains crash".into();
            a.apply_condition_input();
            a.search = "a".into();
            a.refresh();
        }
        assert_eq!(serial.visible, vec![0, 2]);
        assert_eq!(parallel.visible, serial.visible);
    }

    #[test]
    fn registers_inferred_fields() {
        let a = app();
        assert_eq!(a.registry.get_fields("tickets").len(), a.fields.len());
        assert_eq!(a.visible.len(), 3);
    }

    #[test]
    fn condition_input_filters_rows() {
        let mut a = app();
        a.condition_input = "state = active and priority >= 2".into();
        a.apply_condition_input();
        assert_eq!(a.visible, vec![0]);
        a.begin_condition_edit();
        assert_eq!(a.condition_input, "state = 'active' and priority >= 2");
        a.condition_input = "state ==".into();
        a.apply_condition_input();
        assert_eq!(a.view, View::ConditionInput);
        assert_eq!(a.visible, vec![0]);
    }

    #[test]
    fn column_filter_session_commits_into_selections() {
        let mut a = app();
        a.selected_col = a.fields.iter().position(|f| f.name == "state").unwrap();
        a.open_column_filter();
        a.filter_edit_query(|q| q.push_str("clo"));
        a.filter_toggle_all();
        a.commit_column_filter();
        assert_eq!(a.visible, vec![0, 2]);
        assert!(a.selections.is_filtered("state"));

        a.open_column_filter();
        a.filter_toggle_all(); // indeterminate -> select all
        a.commit_column_filter();
        assert!(!a.selections.is_filtered("state"));
        assert_eq!(a.visible.len(), 3);
    }

    #[test]
    fn committed_search_lands_in_history() {
        let mut a = app();
        a.search = "login".into();
        a.commit_search();
        assert_eq!(a.visible, vec![2]);
        let h = a.registry.search_history("tickets");
        assert_eq!(h[0].text, "login");
        assert_eq!(h[0].result_count, 1);
    }

    #[test]
    fn save_and_reload_set() {
        let mut a = app();
        a.condition_input = "priority = 1".into();
        a.apply_condition_input();
        a.set_name_input = "low".into();
        a.save_current_set();
        a.clear_all_filters();
        assert_eq!(a.visible.len(), 3);
        assert!(a.load_set_by_name("low"));
        assert_eq!(a.visible, vec![1, 2]);
        assert_eq!(a.active_set.as_deref(), Some("low"));
    }
}
