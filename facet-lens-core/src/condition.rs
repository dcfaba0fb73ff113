use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Contains,
    Equals,
    NotEquals,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    GreaterOrEqual,
    LessOrEqual,
    Between,
    IsNull,
    IsNotNull,
    In,
    NotIn,
}

impl Operator {
    pub const ALL: [Operator; 14] = [
        Operator::Contains,
        Operator::Equals,
        Operator::NotEquals,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::GreaterThan,
        Operator::LessThan,
        Operator::GreaterOrEqual,
        Operator::LessOrEqual,
        Operator::Between,
        Operator::IsNull,
        Operator::IsNotNull,
        Operator::In,
        Operator::NotIn,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::Equals => "equals",
            Operator::NotEquals => "does not equal",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::GreaterThan => "greater than",
            Operator::LessThan => "less than",
            Operator::GreaterOrEqual => "greater or equal",
            Operator::LessOrEqual => "less or equal",
            Operator::Between => "between",
            Operator::IsNull => "is empty",
            Operator::IsNotNull => "is not empty",
            Operator::In => "is one of",
            Operator::NotIn => "is none of",
        }
    }

    /// Spelling understood by [`crate::parse::parse_conditions`].
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Contains => "contains",
            Operator::Equals => "=",
            Operator::NotEquals => "!=",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
            Operator::GreaterThan => ">",
            Operator::LessThan => "<",
            Operator::GreaterOrEqual => ">=",
            Operator::LessOrEqual => "<=",
            Operator::Between => "between",
            Operator::IsNull => "is null",
            Operator::IsNotNull => "is not null",
            Operator::In => "in",
            Operator::NotIn => "not in",
        }
    }

    pub fn takes_value(self) -> bool {
        !matches!(self, Operator::IsNull | Operator::IsNotNull)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Connector {
    #[default]
    And,
    Or,
}

impl fmt::Display for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Connector::And => "and",
            Connector::Or => "or",
        })
    }
}

/// One rule in a chain. `connector` joins this rule with the one after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<Value>,
    #[serde(default)]
    pub connector: Connector,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
            value2: None,
            connector: Connector::And,
        }
    }

    pub fn between(field: impl Into<String>, lo: impl Into<Value>, hi: impl Into<Value>) -> Self {
        Self::new(field, Operator::Between, lo).with_value2(hi)
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNull, Value::Null)
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, Operator::IsNotNull, Value::Null)
    }

    pub fn with_value2(mut self, value2: impl Into<Value>) -> Self {
        self.value2 = Some(value2.into());
        self
    }

    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connector = connector;
        self
    }

    pub fn or(self) -> Self {
        self.with_connector(Connector::Or)
    }

    pub fn and(self) -> Self {
        self.with_connector(Connector::And)
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, v: &Value) -> fmt::Result {
    match v {
        Value::Null => f.write_str("null"),
        Value::Number(_) | Value::Bool(_) => write!(f, "{v}"),
        Value::List(items) => {
            f.write_str("(")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_literal(f, item)?;
            }
            f.write_str(")")
        }
        other => write!(f, "'{}'", other.to_string().replace('\'', "''")),
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator)?;
        match self.operator {
            Operator::IsNull | Operator::IsNotNull => Ok(()),
            Operator::Between => {
                f.write_str(" ")?;
                write_literal(f, &self.value)?;
                f.write_str(" and ")?;
                write_literal(f, self.value2.as_ref().unwrap_or(&Value::Null))
            }
            _ => {
                f.write_str(" ")?;
                write_literal(f, &self.value)
            }
        }
    }
}

/// Render a chain in the text syntax, connectors included.
pub fn describe_chain(conditions: &[FilterCondition]) -> String {
    let mut out = String::new();
    for (i, c) in conditions.iter().enumerate() {
        if i > 0 {
            out.push_str(&format!(" {} ", conditions[i - 1].connector));
        }
        out.push_str(&c.to_string());
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Number,
    Date,
    Boolean,
    Enumerated,
}

impl FieldKind {
    pub fn default_operators(self) -> Vec<Operator> {
        use Operator::*;
        match self {
            FieldKind::Text => vec![Contains, Equals, NotEquals, StartsWith, EndsWith, In, NotIn, IsNull, IsNotNull],
            FieldKind::Number | FieldKind::Date => vec![
                Equals, NotEquals, GreaterThan, LessThan, GreaterOrEqual, LessOrEqual, Between, IsNull, IsNotNull,
            ],
            FieldKind::Enumerated => vec![Equals, NotEquals, In, NotIn, IsNull, IsNotNull],
            FieldKind::Boolean => vec![Equals, NotEquals, IsNull, IsNotNull],
        }
    }
}

/// A field a tool declares as filterable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterableField {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub operators: Vec<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

impl FilterableField {
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            operators: kind.default_operators(),
            values: None,
        }
    }

    pub fn with_values(mut self, values: Vec<String>) -> Self {
        self.values = Some(values);
        self
    }

    pub fn allows(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFilterSet {
    pub name: String,
    pub tool_id: String,
    #[serde(default)]
    pub is_global: bool,
    pub conditions: Vec<FilterCondition>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl SavedFilterSet {
    pub fn new(name: impl Into<String>, tool_id: impl Into<String>, conditions: Vec<FilterCondition>) -> Self {
        Self {
            name: name.into(),
            tool_id: tool_id.into(),
            is_global: false,
            conditions,
            created_at: Utc::now(),
        }
    }

    pub fn global(mut self) -> Self {
        self.is_global = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_uses_previous_connector() {
        let chain = vec![
            FilterCondition::new("state", Operator::Equals, "Active").or(),
            FilterCondition::new("priority", Operator::GreaterOrEqual, 2),
            FilterCondition::is_null("owner"),
        ];
        assert_eq!(
            describe_chain(&chain),
            "state = 'Active' or priority >= 2 and owner is null"
        );
    }

    #[test]
    fn describe_between_and_in() {
        let b = FilterCondition::between("age", 1, 5);
        assert_eq!(b.to_string(), "age between 1 and 5");
        let i = FilterCondition::new("tag", Operator::In, "a, b");
        assert_eq!(i.to_string(), "tag in 'a, b'");
        let l = FilterCondition::new("tag", Operator::NotIn, vec![Value::from("x"), Value::Number(2.0)]);
        assert_eq!(l.to_string(), "tag not in ('x', 2)");
    }

    #[test]
    fn field_allows_only_declared_ops() {
        let f = FilterableField::new("created", "Created", FieldKind::Date);
        assert!(f.allows(Operator::Between));
        assert!(!f.allows(Operator::Contains));
    }

    #[test]
    fn saved_set_roundtrips_through_json() {
        let set = SavedFilterSet::new("mine", "tickets", vec![FilterCondition::new("a", Operator::Equals, 1)]).global();
        let back: SavedFilterSet = serde_json::from_str(&serde_json::to_string(&set).unwrap()).unwrap();
        assert_eq!(back, set);
    }
}
