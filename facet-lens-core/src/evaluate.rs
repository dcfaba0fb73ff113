use rayon::prelude::*;
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::condition::{Connector, FilterCondition, FilterableField, Operator};
use crate::path::Resolve;
use crate::value::Value;

pub const DEFAULT_PARALLEL_THRESHOLD: usize = 10_000;

/// Evaluate a condition chain against one record.
///
/// Results fold strictly left to right: the connector on condition `i`
/// combines the running result with condition `i + 1`, and the connector on the
/// last condition is never read. `[A or, B and, C]` is `(A || B) && C`.
/// An empty chain accepts every record.
pub fn evaluate<R: Resolve + ?Sized>(record: &R, conditions: &[FilterCondition]) -> bool {
    let mut iter = conditions.iter();
    let Some(first) = iter.next() else {
        return true;
    };
    let mut result = evaluate_condition(record, first);
    let mut connector = first.connector;
    for cond in iter {
        result = match connector {
            Connector::And => result && evaluate_condition(record, cond),
            Connector::Or => result || evaluate_condition(record, cond),
        };
        connector = cond.connector;
    }
    result
}

pub fn evaluate_condition<R: Resolve + ?Sized>(record: &R, cond: &FilterCondition) -> bool {
    let actual = record.resolve(&cond.field);
    matches_value(&actual, cond)
}

/// Apply one condition's operator to an already resolved value. Anything
/// that cannot be compared reads as `false`.
pub fn matches_value(actual: &Value, cond: &FilterCondition) -> bool {
    match cond.operator {
        Operator::IsNull => actual.is_null(),
        Operator::IsNotNull => !actual.is_null(),
        _ if actual.is_null() => false,
        Operator::Contains => text_test(actual, &cond.value, |a, e| a.contains(e)),
        Operator::StartsWith => text_test(actual, &cond.value, |a, e| a.starts_with(e)),
        Operator::EndsWith => text_test(actual, &cond.value, |a, e| a.ends_with(e)),
        Operator::Equals => equals(actual, &cond.value).unwrap_or(false),
        Operator::NotEquals => equals(actual, &cond.value).map(|eq| !eq).unwrap_or(false),
        Operator::GreaterThan => ordering(actual, &cond.value).is_some_and(Ordering::is_gt),
        Operator::LessThan => ordering(actual, &cond.value).is_some_and(Ordering::is_lt),
        Operator::GreaterOrEqual => ordering(actual, &cond.value).is_some_and(Ordering::is_ge),
        Operator::LessOrEqual => ordering(actual, &cond.value).is_some_and(Ordering::is_le),
        Operator::Between => match &cond.value2 {
            Some(hi) => {
                ordering(actual, &cond.value).is_some_and(Ordering::is_ge)
                    && ordering(actual, hi).is_some_and(Ordering::is_le)
            }
            None => false,
        },
        Operator::In => is_member(actual, &cond.value),
        Operator::NotIn => !is_member(actual, &cond.value),
    }
}

// lists are compared through their display string
fn comparable(actual: &Value) -> Cow<'_, Value> {
    match actual {
        Value::List(_) => Cow::Owned(Value::Text(actual.to_string())),
        other => Cow::Borrowed(other),
    }
}

fn text_test(actual: &Value, expected: &Value, test: impl Fn(&str, &str) -> bool) -> bool {
    if actual.is_null() || expected.is_null() {
        return false;
    }
    let a = actual.to_string().to_lowercase();
    let e = expected.to_string().to_lowercase();
    test(&a, &e)
}

fn ordering(actual: &Value, expected: &Value) -> Option<Ordering> {
    let actual = comparable(actual);
    let expected = expected.coerce_to(actual.kind())?;
    actual.compare(&expected)
}

fn equals(actual: &Value, expected: &Value) -> Option<bool> {
    ordering(actual, expected).map(Ordering::is_eq)
}

fn members(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Null => Vec::new(),
        Value::Text(s) => s
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(Value::from)
            .collect(),
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn is_member(actual: &Value, expected: &Value) -> bool {
    members(expected)
        .iter()
        .any(|m| equals(actual, m).unwrap_or(false))
}

/// Keep the records the chain accepts, in input order. Large inputs are split
/// across the rayon pool.
pub fn filter_records<'a, R: Resolve + Sync>(
    records: &'a [R],
    conditions: &[FilterCondition],
    parallel_threshold: usize,
) -> Vec<&'a R> {
    if conditions.is_empty() {
        return records.iter().collect();
    }
    if records.len() >= parallel_threshold {
        records
            .par_iter()
            .filter(|r| evaluate(*r, conditions))
            .collect()
    } else {
        records.iter().filter(|r| evaluate(*r, conditions)).collect()
    }
}

/// Indices of the records `accept` keeps, in input order. Same parallel split
/// as [`filter_records`], for callers combining the chain with other tests.
pub fn select_indices<R, F>(records: &[R], parallel_threshold: usize, accept: F) -> Vec<usize>
where
    R: Sync,
    F: Fn(&R) -> bool + Sync,
{
    if records.len() >= parallel_threshold {
        records
            .par_iter()
            .enumerate()
            .filter(|(_, r)| accept(*r))
            .map(|(i, _)| i)
            .collect()
    } else {
        records
            .iter()
            .enumerate()
            .filter(|(_, r)| accept(*r))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Free-text search across the declared fields. Blank queries match everything.
pub fn matches_text<R: Resolve + ?Sized>(record: &R, fields: &[FilterableField], query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    fields.iter().any(|f| {
        let v = record.resolve(&f.name);
        !v.is_null() && v.to_string().to_lowercase().contains(&q)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::FieldKind;
    use serde_json::json;

    fn cond(field: &str, op: Operator, v: impl Into<Value>) -> FilterCondition {
        FilterCondition::new(field, op, v)
    }

    #[test]
    fn empty_chain_accepts() {
        assert!(evaluate(&json!({}), &[]));
        assert!(evaluate(&json!(null), &[]));
    }

    #[test]
    fn missing_path_fails_everything_but_null_checks() {
        let r = json!({"assignee": {"name": "Ada"}});
        for op in Operator::ALL {
            let c = cond("reviewer.name", op, "x").with_value2("y");
            let expected = matches!(op, Operator::IsNull);
            assert_eq!(evaluate(&r, &[c]), expected, "{op:?}");
        }
    }

    #[test]
    fn string_ops_ignore_case() {
        let r = json!({"title": "Crash On Startup"});
        assert!(evaluate(&r, &[cond("title", Operator::Contains, "on sta")]));
        assert!(evaluate(&r, &[cond("title", Operator::StartsWith, "crash")]));
        assert!(evaluate(&r, &[cond("title", Operator::EndsWith, "STARTUP")]));
        assert!(!evaluate(&r, &[cond("title", Operator::Contains, Value::Null)]));
    }

    #[test]
    fn equals_coerces_expected_to_actual_kind() {
        let r = json!({"priority": 3, "state": "Active", "done": false, "due": "2024-05-01"});
        assert!(evaluate(&r, &[cond("priority", Operator::Equals, "3")]));
        assert!(evaluate(&r, &[cond("state", Operator::Equals, "active")]));
        assert!(evaluate(&r, &[cond("done", Operator::Equals, "false")]));
        assert!(!evaluate(&r, &[cond("priority", Operator::Equals, "three")]));
        assert!(!evaluate(&r, &[cond("priority", Operator::NotEquals, "three")]));
        assert!(evaluate(&r, &[cond("priority", Operator::NotEquals, 4)]));
    }

    #[test]
    fn comparisons_on_numbers_and_dates() {
        let due = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let r = crate::path::Accessors::<()>::new().with("due", move |_| Value::from(due));
        let rec = r.bind(&());
        assert!(evaluate(&rec, &[cond("due", Operator::GreaterThan, "2024-04-30")]));
        assert!(evaluate(&rec, &[cond("due", Operator::LessOrEqual, "2024-05-01")]));
        assert!(!evaluate(&rec, &[cond("due", Operator::LessThan, "garbage")]));

        let j = json!({"n": 10});
        assert!(evaluate(&j, &[cond("n", Operator::GreaterOrEqual, 10)]));
        assert!(!evaluate(&j, &[cond("n", Operator::GreaterThan, 10)]));
    }

    #[test]
    fn between_is_inclusive_and_never_reorders() {
        let r = json!({"n": 5});
        assert!(evaluate(&r, &[FilterCondition::between("n", 5, 9)]));
        assert!(evaluate(&r, &[FilterCondition::between("n", 1, 5)]));
        assert!(!evaluate(&r, &[FilterCondition::between("n", 6, 9)]));
        for v in 0..12 {
            let r = json!({ "n": v });
            assert!(!evaluate(&r, &[FilterCondition::between("n", 9, 1)]));
        }
        assert!(!evaluate(&r, &[cond("n", Operator::Between, 1)]));
    }

    #[test]
    fn chain_folds_left_to_right() {
        let a = |b: bool| cond("a", Operator::Equals, b);
        let r = json!({"a": true});
        // [A or, B and, C] with A=true, B=false, C=false
        // (A || B) && C = false, whereas A || (B && C) would be true
        let chain = vec![
            a(true).or(),
            a(false).and(),
            a(false),
        ];
        assert!(!evaluate(&r, &chain));

        let chain = vec![a(false).and(), a(true).or(), a(true)];
        // (false && true) || true
        assert!(evaluate(&r, &chain));
    }

    #[test]
    fn last_connector_is_ignored() {
        let r = json!({"a": 1});
        let chain = vec![cond("a", Operator::Equals, 1).or()];
        assert!(evaluate(&r, &chain));
        let chain = vec![cond("a", Operator::Equals, 2).or()];
        assert!(!evaluate(&r, &chain));
    }

    #[test]
    fn in_and_not_in() {
        let r = json!({"tag": "B", "n": 2});
        assert!(evaluate(&r, &[cond("tag", Operator::In, "a, b, c")]));
        assert!(!evaluate(&r, &[cond("tag", Operator::NotIn, "a, b, c")]));
        assert!(evaluate(&r, &[cond("tag", Operator::NotIn, "x,,y")]));
        assert!(evaluate(&r, &[cond("n", Operator::In, vec![Value::from("1"), Value::from("2")])]));
        assert!(evaluate(&r, &[cond("n", Operator::In, 2)]));
        assert!(!evaluate(&r, &[cond("n", Operator::In, Value::Null)]));
    }

    #[test]
    fn list_values_compare_as_text() {
        let r = json!({"labels": ["ui", "bug"]});
        assert!(evaluate(&r, &[cond("labels", Operator::Contains, "bug")]));
        assert!(evaluate(&r, &[cond("labels", Operator::Equals, "ui, bug")]));
    }

    #[test]
    fn filter_records_keeps_order_both_paths() {
        let records: Vec<_> = (0..50).map(|i| json!({"i": i})).collect();
        let chain = vec![cond("i", Operator::GreaterOrEqual, 45)];
        let serial: Vec<_> = filter_records(&records, &chain, usize::MAX);
        let parallel: Vec<_> = filter_records(&records, &chain, 1);
        assert_eq!(serial, parallel);
        assert_eq!(serial.len(), 5);
        assert_eq!(serial[0]["i"], 45);
    }

    #[test]
    fn select_indices_matches_across_threshold() {
        let records: Vec<_> = (0..40).map(|i| json!({"i": i})).collect();
        let chain = vec![cond("i", Operator::LessThan, 3).or(), cond("i", Operator::GreaterThan, 37)];
        let accept = |r: &serde_json::Value| evaluate(r, &chain);
        let serial = select_indices(&records, usize::MAX, accept);
        let parallel = select_indices(&records, 1, accept);
        assert_eq!(serial, vec![0, 1, 2, 38, 39]);
        assert_eq!(serial, parallel);
    }

    #[test]
    fn free_text_search_over_declared_fields() {
        let fields = vec![
            FilterableField::new("title", "Title", FieldKind::Text),
            FilterableField::new("owner.name", "Owner", FieldKind::Text),
        ];
        let r = json!({"title": "Login fails", "owner": {"name": "Grace"}, "secret": "hidden"});
        assert!(matches_text(&r, &fields, "grace"));
        assert!(matches_text(&r, &fields, "  "));
        assert!(!matches_text(&r, &fields, "hidden"));
    }
}
