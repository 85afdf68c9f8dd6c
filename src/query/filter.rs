//! Filter predicates and the parsing of `field[op]` query keys.

use std::collections::BTreeMap;

use serde::Serialize;

use super::QueryError;

/// Comparison operator carried by a `field[op]` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonOp {
    Gte,
    Gt,
    Lte,
    Lt,
}

impl ComparisonOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gte" => Some(Self::Gte),
            "gt" => Some(Self::Gt),
            "lte" => Some(Self::Lte),
            "lt" => Some(Self::Lt),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gte => "gte",
            Self::Gt => "gt",
            Self::Lte => "lte",
            Self::Lt => "lt",
        }
    }

    /// The SQL spelling of the operator.
    pub fn sql(self) -> &'static str {
        match self {
            Self::Gte => ">=",
            Self::Gt => ">",
            Self::Lte => "<=",
            Self::Lt => "<",
        }
    }
}

/// A query key split into its bare field name and optional operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedKey<'a> {
    pub field: &'a str,
    pub op: Option<ComparisonOp>,
}

/// Splits `price[gte]` into (`price`, `Gte`).
///
/// Anything that is not exactly `<non-empty field>[<known op>]` comes back as
/// a bare field equal to the whole key, so `price[ne]` stays `price[ne]` and
/// fails the allow-list check instead of being read as `price`.
pub fn parse_key(key: &str) -> ParsedKey<'_> {
    let bare = ParsedKey {
        field: key,
        op: None,
    };

    let Some(inner) = key.strip_suffix(']') else {
        return bare;
    };
    let Some((field, op)) = inner.rsplit_once('[') else {
        return bare;
    };
    match ComparisonOp::parse(op) {
        Some(op) if !field.is_empty() && !field.contains(['[', ']']) => ParsedKey {
            field,
            op: Some(op),
        },
        _ => bare,
    }
}

/// A single operand, coerced from its query-string text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Numeric-looking text becomes a number, everything else (dates
    /// included) stays text for the store to interpret.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(number) if number.is_finite() && !raw.trim().is_empty() => Self::Number(number),
            _ => Self::Text(raw.to_string()),
        }
    }
}

/// Lower and upper bounds on one field. Absent bounds are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RangeBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<FilterValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<FilterValue>,
}

impl RangeBounds {
    pub fn set(&mut self, op: ComparisonOp, value: FilterValue) {
        let slot = match op {
            ComparisonOp::Gte => &mut self.gte,
            ComparisonOp::Gt => &mut self.gt,
            ComparisonOp::Lte => &mut self.lte,
            ComparisonOp::Lt => &mut self.lt,
        };
        *slot = Some(value);
    }

    /// Bounds that are present, in a fixed `gte, gt, lte, lt` order.
    pub fn iter(&self) -> impl Iterator<Item = (ComparisonOp, &FilterValue)> {
        [
            (ComparisonOp::Gte, &self.gte),
            (ComparisonOp::Gt, &self.gt),
            (ComparisonOp::Lte, &self.lte),
            (ComparisonOp::Lt, &self.lt),
        ]
        .into_iter()
        .filter_map(|(op, value)| value.as_ref().map(|v| (op, v)))
    }
}

/// The condition placed on one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldPredicate {
    /// Exact equality with a literal.
    Equals(FilterValue),
    /// Whole-string, case-insensitive match against any of the alternatives.
    AnyOf(Vec<String>),
    /// Conjunction of comparison bounds.
    Range(RangeBounds),
}

/// Conjunction of per-field predicates. Empty means "match everything".
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FilterPredicate {
    conditions: BTreeMap<String, FieldPredicate>,
}

impl FilterPredicate {
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn get(&self, field: &str) -> Option<&FieldPredicate> {
        self.conditions.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldPredicate)> {
        self.conditions
            .iter()
            .map(|(field, predicate)| (field.as_str(), predicate))
    }

    pub(crate) fn add_equals(
        &mut self,
        key: &str,
        field: &str,
        value: FilterValue,
    ) -> Result<(), QueryError> {
        if self.conditions.contains_key(field) {
            return Err(conflict(key, field));
        }
        self.conditions
            .insert(field.to_string(), FieldPredicate::Equals(value));
        Ok(())
    }

    pub(crate) fn add_any_of(
        &mut self,
        key: &str,
        field: &str,
        alternatives: Vec<String>,
    ) -> Result<(), QueryError> {
        match self.conditions.get_mut(field) {
            None => {
                self.conditions
                    .insert(field.to_string(), FieldPredicate::AnyOf(alternatives));
                Ok(())
            }
            Some(FieldPredicate::AnyOf(existing)) => {
                existing.extend(alternatives);
                Ok(())
            }
            Some(_) => Err(conflict(key, field)),
        }
    }

    pub(crate) fn add_bound(
        &mut self,
        key: &str,
        field: &str,
        op: ComparisonOp,
        value: FilterValue,
    ) -> Result<(), QueryError> {
        let predicate = self
            .conditions
            .entry(field.to_string())
            .or_insert_with(|| FieldPredicate::Range(RangeBounds::default()));
        match predicate {
            FieldPredicate::Range(bounds) => {
                bounds.set(op, value);
                Ok(())
            }
            _ => Err(conflict(key, field)),
        }
    }
}

fn conflict(key: &str, field: &str) -> QueryError {
    QueryError::invalid_parameter(
        key,
        format!("conflicts with another condition on `{field}`"),
    )
}
