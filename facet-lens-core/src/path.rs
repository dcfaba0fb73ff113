//! Dot-path field lookup.
//!
//! Records expose their fields through [`FieldSource`] (one segment at a time,
//! for nested shapes such as JSON) or through an [`Accessors`] map (full path
//! to getter, for typed records). The evaluator only sees [`Resolve`].

use std::collections::HashMap;

use crate::value::Value;

/// Result of looking up one path segment.
pub enum Field<'a> {
    Value(Value),
    Nested(&'a dyn FieldSource),
}

/// A record that can be walked one named segment at a time.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Field<'_>>;

    /// Value used when a path ends on this source rather than on a leaf.
    fn value(&self) -> Value {
        Value::Null
    }
}

/// Resolve a full dot path to a value. Never fails: anything unresolvable is `Null`.
pub trait Resolve {
    fn resolve(&self, path: &str) -> Value;
}

/// Walk `path` segment by segment. A missing segment, or a leaf value where a
/// nested source was needed, short-circuits to `Null`.
pub fn resolve_path<S: FieldSource + ?Sized>(source: &S, path: &str) -> Value {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Value::Null;
    };
    let Some(mut current) = source.field(first) else {
        return Value::Null;
    };
    for segment in segments {
        let next = match current {
            Field::Nested(inner) => inner.field(segment),
            Field::Value(_) => None,
        };
        match next {
            Some(f) => current = f,
            None => return Value::Null,
        }
    }
    match current {
        Field::Value(v) => v,
        Field::Nested(inner) => inner.value(),
    }
}

impl FieldSource for serde_json::Value {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        self.as_object()?.field(name)
    }

    fn value(&self) -> Value {
        Value::from(self)
    }
}

impl FieldSource for serde_json::Map<String, serde_json::Value> {
    fn field(&self, name: &str) -> Option<Field<'_>> {
        let child = self.get(name)?;
        Some(match child {
            serde_json::Value::Object(_) => Field::Nested(child),
            other => Field::Value(Value::from(other)),
        })
    }

    fn value(&self) -> Value {
        Value::Text(serde_json::Value::Object(self.clone()).to_string())
    }
}

impl Resolve for serde_json::Value {
    fn resolve(&self, path: &str) -> Value {
        resolve_path(self, path)
    }
}

impl Resolve for serde_json::Map<String, serde_json::Value> {
    fn resolve(&self, path: &str) -> Value {
        resolve_path(self, path)
    }
}

impl<'a> Resolve for dyn FieldSource + 'a {
    fn resolve(&self, path: &str) -> Value {
        resolve_path(self, path)
    }
}

impl<R: Resolve + ?Sized> Resolve for &R {
    fn resolve(&self, path: &str) -> Value {
        (**self).resolve(path)
    }
}

type Getter<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;

/// Per-tool accessor map for typed records, keyed by full field path.
pub struct Accessors<T> {
    getters: HashMap<String, Getter<T>>,
}

impl<T> Accessors<T> {
    pub fn new() -> Self {
        Self { getters: HashMap::new() }
    }

    pub fn with<F>(mut self, path: &str, getter: F) -> Self
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.insert(path, getter);
        self
    }

    pub fn insert<F>(&mut self, path: &str, getter: F)
    where
        F: Fn(&T) -> Value + Send + Sync + 'static,
    {
        self.getters.insert(path.to_string(), Box::new(getter));
    }

    pub fn contains(&self, path: &str) -> bool {
        self.getters.contains_key(path)
    }

    pub fn get(&self, record: &T, path: &str) -> Value {
        self.getters.get(path).map(|g| g(record)).unwrap_or(Value::Null)
    }

    pub fn bind<'a>(&'a self, record: &'a T) -> Bound<'a, T> {
        Bound { accessors: self, record }
    }
}

impl<T> Default for Accessors<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A typed record paired with its accessor map.
pub struct Bound<'a, T> {
    accessors: &'a Accessors<T>,
    record: &'a T,
}

impl<T> Resolve for Bound<'_, T> {
    fn resolve(&self, path: &str) -> Value {
        self.accessors.get(self.record, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_json_path() {
        let r = json!({"assignee": {"name": "Ada", "team": {"id": 4}}});
        assert_eq!(r.resolve("assignee.name"), Value::from("Ada"));
        assert_eq!(r.resolve("assignee.team.id"), Value::Number(4.0));
    }

    #[test]
    fn missing_or_null_intermediate_is_null() {
        let r = json!({"assignee": null, "state": "Active"});
        assert_eq!(r.resolve("assignee.name"), Value::Null);
        assert_eq!(r.resolve("reviewer.name"), Value::Null);
        assert_eq!(r.resolve("state.length"), Value::Null);
        assert_eq!(r.resolve(""), Value::Null);
    }

    #[test]
    fn path_ending_on_object_yields_text() {
        let r = json!({"a": {"b": 1}});
        assert_eq!(r.resolve("a"), Value::Text("{\"b\":1}".into()));
    }

    #[test]
    fn non_object_root_is_null() {
        assert_eq!(json!([1, 2]).resolve("0"), Value::Null);
    }

    struct Ticket {
        title: String,
        owner: Option<String>,
    }

    #[test]
    fn accessor_map() {
        let acc = Accessors::<Ticket>::new()
            .with("title", |t| Value::from(&t.title))
            .with("owner.name", |t| Value::from(t.owner.clone()));
        let t = Ticket { title: "Crash".into(), owner: None };
        let bound = acc.bind(&t);
        assert_eq!(bound.resolve("title"), Value::from("Crash"));
        assert_eq!(bound.resolve("owner.name"), Value::Null);
        assert_eq!(bound.resolve("nope"), Value::Null);
    }
}
