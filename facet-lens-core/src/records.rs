use facet_lens_common::{FacetLensError, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::condition::{FieldKind, FilterableField};
use crate::value::parse_date;

const ENUM_MAX_DISTINCT: usize = 12;

/// Read a record collection: a JSON array of objects, or one object per line.
pub fn load_records(path: &Path) -> Result<Vec<serde_json::Value>> {
    let content = std::fs::read_to_string(path)?;
    parse_records(&content)
}

pub fn parse_records(content: &str) -> Result<Vec<serde_json::Value>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    let mut records = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let v: serde_json::Value = serde_json::from_str(line)
            .map_err(|e| FacetLensError::Other(format!("line {}: {e}", i + 1)))?;
        records.push(v);
    }
    Ok(records)
}

#[derive(Default)]
struct FieldStats {
    numbers: usize,
    bools: usize,
    dates: usize,
    strings: usize,
    other: usize,
    distinct: BTreeSet<String>,
}

impl FieldStats {
    fn non_null(&self) -> usize {
        self.numbers + self.bools + self.strings + self.other
    }

    fn kind(&self) -> FieldKind {
        let n = self.non_null();
        if n == 0 || self.other > 0 {
            FieldKind::Text
        } else if self.numbers == n {
            FieldKind::Number
        } else if self.bools == n {
            FieldKind::Boolean
        } else if self.strings == n && self.dates == n {
            FieldKind::Date
        } else if self.strings == n
            && self.distinct.len() <= ENUM_MAX_DISTINCT
            && n >= self.distinct.len() * 2
        {
            FieldKind::Enumerated
        } else {
            FieldKind::Text
        }
    }
}

fn collect(prefix: &str, v: &serde_json::Value, order: &mut Vec<String>, stats: &mut HashMap<String, FieldStats>) {
    let Some(obj) = v.as_object() else { return };
    for (key, child) in obj {
        let path = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
        if child.is_object() {
            collect(&path, child, order, stats);
            continue;
        }
        let s = stats.entry(path.clone()).or_insert_with(|| {
            order.push(path.clone());
            FieldStats::default()
        });
        match child {
            serde_json::Value::Null => {}
            serde_json::Value::Number(_) => s.numbers += 1,
            serde_json::Value::Bool(_) => s.bools += 1,
            serde_json::Value::String(text) => {
                s.strings += 1;
                if parse_date(text).is_some() {
                    s.dates += 1;
                }
                if s.distinct.len() <= ENUM_MAX_DISTINCT {
                    s.distinct.insert(text.clone());
                }
            }
            _ => s.other += 1,
        }
    }
}

fn label_for(path: &str) -> String {
    let last = path.rsplit('.').next().unwrap_or(path).replace('_', " ");
    let mut chars = last.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derive filterable fields from the first `sample` records. Nested objects
/// become dot paths; short string vocabularies become enumerated fields.
pub fn infer_fields(records: &[serde_json::Value], sample: usize) -> Vec<FilterableField> {
    let mut order = Vec::new();
    let mut stats: HashMap<String, FieldStats> = HashMap::new();
    for r in records.iter().take(sample) {
        collect("", r, &mut order, &mut stats);
    }
    order
        .into_iter()
        .map(|path| {
            let s = &stats[&path];
            let kind = s.kind();
            let field = FilterableField::new(path.clone(), label_for(&path), kind);
            if kind == FieldKind::Enumerated {
                field.with_values(s.distinct.iter().cloned().collect())
            } else {
                field
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_array_and_json_lines() {
        let a = parse_records(r#"[{"a":1},{"a":2}]"#).unwrap();
        assert_eq!(a.len(), 2);
        let l = parse_records("{\"a\":1}\n\n{\"a\":2}\n").unwrap();
        assert_eq!(l.len(), 2);
        assert!(parse_records("{\"a\":1}\nnope").is_err());
    }

    #[test]
    fn infers_kinds_and_nested_paths() {
        let records: Vec<_> = (0..6)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("ticket {i}"),
                    "state": if i % 2 == 0 { "Active" } else { "Closed" },
                    "created": "2024-02-01",
                    "flag": i > 2,
                    "assignee": {"name": "Ada"},
                    "labels": ["x"]
                })
            })
            .collect();
        let fields = infer_fields(&records, 100);
        let kind = |name: &str| fields.iter().find(|f| f.name == name).map(|f| f.kind);
        assert_eq!(kind("id"), Some(FieldKind::Number));
        assert_eq!(kind("title"), Some(FieldKind::Text));
        assert_eq!(kind("state"), Some(FieldKind::Enumerated));
        assert_eq!(kind("created"), Some(FieldKind::Date));
        assert_eq!(kind("flag"), Some(FieldKind::Boolean));
        assert_eq!(kind("assignee.name"), Some(FieldKind::Enumerated));
        assert_eq!(kind("labels"), Some(FieldKind::Text));
        let state = fields.iter().find(|f| f.name == "state").unwrap();
        assert_eq!(state.values.as_deref(), Some(&["Active".to_string(), "Closed".to_string()][..]));
        assert_eq!(state.label, "State");
    }

    #[test]
    fn label_from_last_segment() {
        assert_eq!(label_for("assignee.display_name"), "Display name");
    }
}
