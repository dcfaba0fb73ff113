use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::path::Resolve;
use crate::value::Value;

/// Display string shared by null and empty values.
pub const BLANK_LABEL: &str = "(blank)";

/// Grouping key for a value: its display string, with blanks folded together.
pub fn display_key(v: &Value) -> String {
    let s = v.to_string();
    if s.is_empty() {
        BLANK_LABEL.to_string()
    } else {
        s
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub display: String,
    pub raw: Value, // first value seen with this display string
    pub count: usize,
    pub included: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectAll {
    Checked,
    Unchecked,
    Indeterminate,
}

/// Set of raw values, keyed by display string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    values: BTreeMap<String, Value>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, v: Value) {
        self.values.entry(display_key(&v)).or_insert(v);
    }
    pub fn contains(&self, v: &Value) -> bool {
        self.values.contains_key(&display_key(v))
    }
    pub fn contains_display(&self, display: &str) -> bool {
        self.values.contains_key(display)
    }
    pub fn len(&self) -> usize {
        self.values.len()
    }
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values()
    }
    /// A selection covering the whole catalog places no restriction.
    pub fn is_unrestricted(&self, catalog_len: usize) -> bool {
        self.len() >= catalog_len
    }
}

impl FromIterator<Value> for Selection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        let mut s = Selection::new();
        for v in iter {
            s.insert(v);
        }
        s
    }
}

/// Spreadsheet-style column filter session over one column's values.
///
/// Edits stay local until [`ColumnFilter::commit`]; [`ColumnFilter::cancel`]
/// rolls inclusion flags back to the last commit.
#[derive(Debug, Clone)]
pub struct ColumnFilter {
    column: String,
    entries: Vec<CatalogEntry>,
    baseline: Vec<bool>,
    query: String,
    visible: Vec<usize>,
}

impl ColumnFilter {
    pub fn initialize<I>(column: impl Into<String>, population: I, prior: Option<&Selection>) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut entries: Vec<CatalogEntry> = Vec::new();
        for value in population {
            let key = display_key(&value);
            match index.get(&key) {
                Some(&i) => entries[i].count += 1,
                None => {
                    index.insert(key.clone(), entries.len());
                    entries.push(CatalogEntry { display: key, raw: value, count: 1, included: true });
                }
            }
        }
        entries.sort_by(|a, b| {
            a.display
                .to_lowercase()
                .cmp(&b.display.to_lowercase())
                .then_with(|| a.display.cmp(&b.display))
        });
        if let Some(prior) = prior {
            for e in &mut entries {
                e.included = prior.contains_display(&e.display);
            }
        }
        let baseline = entries.iter().map(|e| e.included).collect();
        let visible = (0..entries.len()).collect();
        Self { column: column.into(), entries, baseline, query: String::new(), visible }
    }

    /// Build the catalog from one column of a record collection.
    pub fn from_records<'a, R, I>(column: &str, records: I, prior: Option<&Selection>) -> Self
    where
        R: Resolve + ?Sized + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        Self::initialize(column, records.into_iter().map(|r| r.resolve(column)), prior)
    }

    pub fn column(&self) -> &str {
        &self.column
    }
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn query(&self) -> &str {
        &self.query
    }
    pub fn entry(&self, display: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.display == display)
    }

    pub fn visible(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.visible.iter().map(|&i| &self.entries[i])
    }
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Narrow the visible entries to those whose display contains `text`
    /// (case-insensitive). Inclusion flags are untouched.
    pub fn apply_substring_filter(&mut self, text: &str) {
        self.query = text.to_string();
        let needle = text.to_lowercase();
        self.visible = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| needle.is_empty() || e.display.to_lowercase().contains(&needle))
            .map(|(i, _)| i)
            .collect();
    }

    /// Set inclusion for every visible entry; hidden entries keep their flag.
    pub fn toggle_select_all(&mut self, included: bool) {
        for &i in &self.visible {
            self.entries[i].included = included;
        }
    }

    /// Flip the visible entry at `visible_index`, returning its new flag.
    pub fn toggle(&mut self, visible_index: usize) -> Option<bool> {
        let &i = self.visible.get(visible_index)?;
        let e = &mut self.entries[i];
        e.included = !e.included;
        Some(e.included)
    }

    pub fn set_included(&mut self, display: &str, included: bool) -> bool {
        match self.entries.iter_mut().find(|e| e.display == display) {
            Some(e) => {
                e.included = included;
                true
            }
            None => false,
        }
    }

    /// Tri-state over the visible entries.
    pub fn select_all_state(&self) -> SelectAll {
        let included = self.visible().filter(|e| e.included).count();
        if included == 0 {
            SelectAll::Unchecked
        } else if included == self.visible.len() {
            SelectAll::Checked
        } else {
            SelectAll::Indeterminate
        }
    }

    pub fn included_count(&self) -> usize {
        self.entries.iter().filter(|e| e.included).count()
    }

    pub fn is_dirty(&self) -> bool {
        self.entries.iter().zip(&self.baseline).any(|(e, &b)| e.included != b)
    }

    /// Included raw values across the whole catalog, visible or not. The
    /// current flags become the new rollback point.
    pub fn commit(&mut self) -> Selection {
        self.baseline = self.entries.iter().map(|e| e.included).collect();
        self.entries
            .iter()
            .filter(|e| e.included)
            .map(|e| e.raw.clone())
            .collect()
    }

    pub fn cancel(&mut self) {
        for (e, &b) in self.entries.iter_mut().zip(&self.baseline) {
            e.included = b;
        }
        self.apply_substring_filter("");
    }
}

/// Committed column restrictions for one list surface, keyed by field path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSelections {
    columns: BTreeMap<String, Selection>,
}

impl ColumnSelections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: impl Into<String>, selection: Selection) {
        self.columns.insert(column.into(), selection);
    }

    /// Store a committed selection, dropping the restriction when it covers the full catalog.
    pub fn apply(&mut self, column: &str, selection: Selection, catalog_len: usize) {
        if selection.is_unrestricted(catalog_len) {
            self.columns.remove(column);
        } else {
            self.columns.insert(column.to_string(), selection);
        }
    }

    pub fn clear(&mut self, column: &str) -> bool {
        self.columns.remove(column).is_some()
    }

    pub fn clear_all(&mut self) {
        self.columns.clear();
    }

    pub fn get(&self, column: &str) -> Option<&Selection> {
        self.columns.get(column)
    }

    pub fn is_filtered(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn accepts<R: Resolve + ?Sized>(&self, record: &R) -> bool {
        self.columns
            .iter()
            .all(|(column, sel)| sel.contains(&record.resolve(column)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn xxy() -> ColumnFilter {
        ColumnFilter::initialize("c", ["x", "x", "y"].map(Value::from), None)
    }

    #[test]
    fn groups_by_display_with_counts() {
        let f = xxy();
        assert_eq!(f.len(), 2);
        let x = f.entry("x").unwrap();
        let y = f.entry("y").unwrap();
        assert_eq!((x.count, y.count), (2, 1));
        assert!(x.included && y.included);
        assert_eq!(f.select_all_state(), SelectAll::Checked);
    }

    #[test]
    fn display_equal_values_share_an_entry() {
        let pop = vec![Value::Number(1.0), Value::from("1"), Value::Null, Value::from("")];
        let f = ColumnFilter::initialize("c", pop, None);
        assert_eq!(f.len(), 2);
        let one = f.entry("1").unwrap();
        assert_eq!(one.count, 2);
        assert_eq!(one.raw, Value::Number(1.0));
        assert_eq!(f.entry(BLANK_LABEL).unwrap().count, 2);
    }

    #[test]
    fn narrowed_select_all_leaves_hidden_entries() {
        let mut f = xxy();
        f.apply_substring_filter("X");
        assert_eq!(f.visible_len(), 1);
        f.toggle_select_all(false);
        assert!(!f.entry("x").unwrap().included);
        assert!(f.entry("y").unwrap().included);
        assert_eq!(f.select_all_state(), SelectAll::Unchecked);
        f.apply_substring_filter("");
        assert_eq!(f.select_all_state(), SelectAll::Indeterminate);
    }

    #[test]
    fn commit_without_edits_is_everything() {
        let mut f = xxy();
        let sel = f.commit();
        assert_eq!(sel.len(), 2);
        assert!(sel.contains(&Value::from("x")) && sel.contains(&Value::from("y")));
        assert!(sel.is_unrestricted(f.len()));
    }

    #[test]
    fn commit_covers_hidden_entries() {
        let mut f = xxy();
        f.apply_substring_filter("y");
        f.toggle(0);
        let sel = f.commit();
        assert!(sel.contains(&Value::from("x")));
        assert!(!sel.contains(&Value::from("y")));
    }

    #[test]
    fn cancel_restores_last_commit() {
        let mut f = xxy();
        f.set_included("x", false);
        f.commit();
        f.set_included("y", false);
        assert!(f.is_dirty());
        f.apply_substring_filter("q");
        f.cancel();
        assert!(!f.is_dirty());
        assert!(!f.entry("x").unwrap().included);
        assert!(f.entry("y").unwrap().included);
        assert_eq!(f.visible_len(), 2);
    }

    #[test]
    fn prior_selection_sets_initial_flags() {
        let prior: Selection = [Value::from("y")].into_iter().collect();
        let f = ColumnFilter::initialize("c", ["x", "x", "y"].map(Value::from), Some(&prior));
        assert!(!f.entry("x").unwrap().included);
        assert!(f.entry("y").unwrap().included);
        assert_eq!(f.select_all_state(), SelectAll::Indeterminate);
    }

    #[test]
    fn empty_visible_subset_reads_unchecked() {
        let mut f = xxy();
        f.apply_substring_filter("zzz");
        assert_eq!(f.select_all_state(), SelectAll::Unchecked);
        f.toggle_select_all(false);
        assert_eq!(f.included_count(), 2);
    }

    #[test]
    fn selections_restrict_records() {
        let records = vec![
            json!({"state": "Active", "prio": 1}),
            json!({"state": "Closed", "prio": 2}),
            json!({"state": "Active", "prio": 2}),
        ];
        let mut f = ColumnFilter::from_records("state", &records, None);
        f.set_included("Closed", false);
        let sel = f.commit();
        let mut cols = ColumnSelections::new();
        cols.apply("state", sel, f.len());
        let kept: Vec<_> = records.iter().filter(|r| cols.accepts(*r)).collect();
        assert_eq!(kept.len(), 2);

        let mut all = ColumnFilter::from_records("prio", &records, None);
        cols.apply("prio", all.commit(), all.len());
        assert!(!cols.is_filtered("prio"));
        assert_eq!(cols.len(), 1);
    }
}
