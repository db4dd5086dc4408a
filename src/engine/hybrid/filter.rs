//! Filter expressions and their translation into single predicates
//!
//! Callers hand over an arbitrary boolean tree. The key-value side can only
//! evaluate one comparison at a time, so [`translate`] accepts a bare leaf
//! and rejects every compound node.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::engine::error::{BridgeError, Result};

/// Filter operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl FilterOp {
    /// Whether the operator compares against at least one value
    pub fn requires_operands(&self) -> bool {
        !matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }
}

/// A single field/operator/values comparison. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPredicate")]
pub struct Predicate {
    field: String,
    op: FilterOp,
    values: Vec<Value>,
}

/// Wire form of [`Predicate`], validated on the way in
#[derive(Deserialize)]
struct RawPredicate {
    field: String,
    op: FilterOp,
    #[serde(default)]
    values: Vec<Value>,
}

impl TryFrom<RawPredicate> for Predicate {
    type Error = BridgeError;

    fn try_from(raw: RawPredicate) -> Result<Self> {
        Predicate::new(&raw.field, raw.op, raw.values)
    }
}

impl Predicate {
    pub fn new(field: &str, op: FilterOp, values: Vec<Value>) -> Result<Self> {
        if op.requires_operands() && values.is_empty() {
            return Err(BridgeError::UnsupportedOperation(format!(
                "{:?} on {} requires at least one value",
                op, field
            )));
        }
        Ok(Self {
            field: field.to_string(),
            op,
            values,
        })
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op: FilterOp::Eq,
            values: vec![value.into()],
        }
    }

    /// `field IN [values]`; `values` must not be empty
    pub fn in_list<I, V>(field: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(field, FilterOp::In, values.into_iter().map(Into::into).collect())
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn op(&self) -> FilterOp {
        self.op
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Values rendered as plain strings (JSON strings lose their quotes)
    pub fn string_values(&self) -> Vec<String> {
        self.values.iter().map(value_as_string).collect()
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:?} [{}]", self.field, self.op, self.string_values().join(", "))
    }
}

/// Render a comparison value the way key-value keys spell it
pub fn value_as_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A caller-supplied filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterExpression {
    Predicate(Predicate),
    And(Box<FilterExpression>, Box<FilterExpression>),
    Or(Box<FilterExpression>, Box<FilterExpression>),
    Not(Box<FilterExpression>),
}

impl FilterExpression {
    pub fn and(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: FilterExpression, right: FilterExpression) -> Self {
        FilterExpression::Or(Box::new(left), Box::new(right))
    }

    pub fn not(inner: FilterExpression) -> Self {
        FilterExpression::Not(Box::new(inner))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FilterExpression::Predicate(_) => "predicate",
            FilterExpression::And(..) => "and",
            FilterExpression::Or(..) => "or",
            FilterExpression::Not(_) => "not",
        }
    }
}

impl From<Predicate> for FilterExpression {
    fn from(predicate: Predicate) -> Self {
        FilterExpression::Predicate(predicate)
    }
}

/// Reduce a filter tree to the single predicate it must consist of
pub fn translate(expr: &FilterExpression) -> Result<Predicate> {
    match expr {
        FilterExpression::Predicate(predicate) => Ok(predicate.clone()),
        FilterExpression::And(..) | FilterExpression::Or(..) | FilterExpression::Not(_) => {
            Err(BridgeError::UnsupportedFilterShape(expr.kind()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_translate_leaf() {
        let leaf = FilterExpression::from(Predicate::in_list("user_id", ["A1"]).unwrap());
        let predicate = translate(&leaf).unwrap();
        assert_eq!(predicate.field(), "user_id");
        assert_eq!(predicate.op(), FilterOp::In);
        assert_eq!(predicate.values(), &[json!("A1")]);
    }

    #[test]
    fn test_translate_rejects_compound_shapes() {
        let a = FilterExpression::from(Predicate::eq("user_id", "A1"));
        let b = FilterExpression::from(Predicate::eq("id", "r1"));

        let shapes = vec![
            FilterExpression::and(a.clone(), b.clone()),
            FilterExpression::or(a.clone(), b.clone()),
            FilterExpression::not(a.clone()),
            FilterExpression::not(FilterExpression::not(b)),
        ];

        for shape in shapes {
            let err = translate(&shape).unwrap_err();
            assert!(matches!(err, BridgeError::UnsupportedFilterShape(kind) if kind == shape.kind()));
        }
    }

    #[test]
    fn test_predicate_requires_values() {
        assert!(Predicate::new("user_id", FilterOp::Eq, vec![]).is_err());
        assert!(Predicate::new("user_id", FilterOp::IsNull, vec![]).is_ok());
    }

    #[test]
    fn test_string_values_strip_json_quotes() {
        let predicate = Predicate::in_list("user_id", vec![json!("A1"), json!(42)]).unwrap();
        assert_eq!(predicate.string_values(), vec!["A1".to_string(), "42".to_string()]);
        assert_eq!(predicate.to_string(), "user_id In [A1, 42]");
    }

    #[test]
    fn test_filter_expression_json() {
        let expr: FilterExpression = serde_json::from_value(json!({
            "predicate": { "field": "user_id", "op": "in", "values": ["A2"] }
        }))
        .unwrap();
        assert_eq!(translate(&expr).unwrap(), Predicate::in_list("user_id", ["A2"]).unwrap());
    }

    #[test]
    fn test_empty_in_list_rejected() {
        let err = Predicate::in_list("user_id", Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedOperation(_)));
    }

    #[test]
    fn test_deserialize_validates_values() {
        let empty_eq = serde_json::from_str::<FilterExpression>(
            r#"{"predicate":{"field":"user_id","op":"eq","values":[]}}"#,
        );
        assert!(empty_eq.is_err());

        let missing = serde_json::from_value::<Predicate>(json!({ "field": "user_id", "op": "in" }));
        assert!(missing.is_err());

        let is_null: Predicate = serde_json::from_value(json!({ "field": "user_id", "op": "is_null" })).unwrap();
        assert_eq!(is_null.op(), FilterOp::IsNull);
        assert!(is_null.values().is_empty());
    }
}
