//! Query predicates
//!
//! A [`Filter`] is a conjunction of per-field conditions: every clause must
//! pass for a record to match. Fields are addressed with dotted paths
//! ([`FieldPath`]); conditions are equality, range comparisons, or set
//! membership.
//!
//! Filters can be built programmatically or parsed from the JSON shape
//! accepted by [`Filter::from_json`]:
//!
//! ```json
//! { "status": "open", "score": { "$gte": 5 }, "kind": { "$in": ["a", "b"] } }
//! ```
//!
//! A field mapped to a literal is an equality test. A field mapped to an
//! object containing `$`-prefixed keys is an operator object; every operator
//! in it must pass. An object value with no `$` keys is an equality test
//! against that object.
//!
//! Range comparisons order values within a kind only: numbers numerically,
//! strings lexicographically, booleans with `false < true`. Comparing across
//! kinds fails the condition. A path that does not resolve on a record never
//! matches any condition.

use crate::error::{FolioError, FolioResult};
use crate::path::FieldPath;
use serde_json::Value;
use std::cmp::Ordering;

/// A single condition applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    /// Field equals the value (deep equality; numbers compare numerically).
    Eq(Value),
    /// Field is strictly greater than the bound.
    Gt(Value),
    /// Field is greater than or equal to the bound.
    Gte(Value),
    /// Field is strictly less than the bound.
    Lt(Value),
    /// Field is less than or equal to the bound.
    Lte(Value),
    /// Field equals one of the listed values.
    In(Vec<Value>),
}

impl Cond {
    /// Whether `actual` satisfies this condition.
    pub fn matches(&self, actual: &Value) -> bool {
        match self {
            Cond::Eq(expected) => values_equal(actual, expected),
            Cond::Gt(bound) => matches!(compare_values(actual, bound), Some(Ordering::Greater)),
            Cond::Gte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Cond::Lt(bound) => matches!(compare_values(actual, bound), Some(Ordering::Less)),
            Cond::Lte(bound) => matches!(
                compare_values(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Cond::In(options) => options.iter().any(|option| values_equal(actual, option)),
        }
    }
}

/// A conjunction of field conditions.
///
/// The empty filter matches every record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(FieldPath, Cond)>,
}

impl Filter {
    /// An empty filter (matches everything).
    pub fn new() -> Self {
        Filter::default()
    }

    /// Number of clauses.
    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    /// Whether the filter has no clauses.
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// The clauses in evaluation order.
    pub fn clauses(&self) -> &[(FieldPath, Cond)] {
        &self.clauses
    }

    /// Add an equality clause.
    pub fn eq(mut self, path: impl Into<FieldPath>, value: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), Cond::Eq(value.into())));
        self
    }

    /// Add a strictly-greater-than clause.
    pub fn gt(mut self, path: impl Into<FieldPath>, bound: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), Cond::Gt(bound.into())));
        self
    }

    /// Add a greater-or-equal clause.
    pub fn gte(mut self, path: impl Into<FieldPath>, bound: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), Cond::Gte(bound.into())));
        self
    }

    /// Add a strictly-less-than clause.
    pub fn lt(mut self, path: impl Into<FieldPath>, bound: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), Cond::Lt(bound.into())));
        self
    }

    /// Add a less-or-equal clause.
    pub fn lte(mut self, path: impl Into<FieldPath>, bound: impl Into<Value>) -> Self {
        self.clauses.push((path.into(), Cond::Lte(bound.into())));
        self
    }

    /// Add a set-membership clause.
    pub fn is_in(
        mut self,
        path: impl Into<FieldPath>,
        options: impl IntoIterator<Item = Value>,
    ) -> Self {
        self.clauses
            .push((path.into(), Cond::In(options.into_iter().collect())));
        self
    }

    /// Parse a filter from its JSON object shape.
    ///
    /// Each key is a dotted field path. Each value is either a literal
    /// (equality) or an operator object combining `$gt`, `$gte`, `$lt`,
    /// `$lte`, and `$in`.
    ///
    /// # Errors
    ///
    /// Returns [`FolioError::InvalidFilter`] when the spec is not an object,
    /// an unknown `$` operator appears, `$in` is given a non-array, or an
    /// operator object mixes `$` and plain keys.
    pub fn from_json(spec: &Value) -> FolioResult<Self> {
        let fields = spec
            .as_object()
            .ok_or_else(|| FolioError::invalid_filter("filter must be a JSON object"))?;

        let mut clauses = Vec::with_capacity(fields.len());
        for (raw_path, term) in fields {
            let path = FieldPath::parse(raw_path);
            match term {
                Value::Object(ops) if ops.keys().any(|k| k.starts_with('$')) => {
                    for (op, operand) in ops {
                        clauses.push((path.clone(), parse_operator(raw_path, op, operand)?));
                    }
                }
                literal => clauses.push((path, Cond::Eq(literal.clone()))),
            }
        }
        Ok(Filter { clauses })
    }

    /// Whether `record` satisfies every clause.
    ///
    /// A clause whose path does not resolve on the record fails, regardless
    /// of the condition.
    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|(path, cond)| {
            path.resolve(record)
                .map(|actual| cond.matches(actual))
                .unwrap_or(false)
        })
    }
}

fn parse_operator(raw_path: &str, op: &str, operand: &Value) -> FolioResult<Cond> {
    match op {
        "$gt" => Ok(Cond::Gt(operand.clone())),
        "$gte" => Ok(Cond::Gte(operand.clone())),
        "$lt" => Ok(Cond::Lt(operand.clone())),
        "$lte" => Ok(Cond::Lte(operand.clone())),
        "$in" => match operand.as_array() {
            Some(options) => Ok(Cond::In(options.clone())),
            None => Err(FolioError::invalid_filter(format!(
                "$in for field '{}' requires an array",
                raw_path
            ))),
        },
        other if other.starts_with('$') => Err(FolioError::invalid_filter(format!(
            "unknown operator '{}' for field '{}'",
            other, raw_path
        ))),
        other => Err(FolioError::invalid_filter(format!(
            "cannot mix operator and literal key '{}' for field '{}'",
            other, raw_path
        ))),
    }
}

/// Equality with numeric awareness: `5` and `5.0` denote the same number.
/// Everything else is serde's deep equality.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => compare_values(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

/// Order two values of the same kind; `None` for mixed or unordered kinds.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(x), Some(y)) = (x.as_i64(), y.as_i64()) {
                Some(x.cmp(&y))
            } else if let (Some(x), Some(y)) = (x.as_u64(), y.as_u64()) {
                Some(x.cmp(&y))
            } else {
                x.as_f64()?.partial_cmp(&y.as_f64()?)
            }
        }
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
