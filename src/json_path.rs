//! Compiled predicate queries.
//!
//! A [`JsonPathPredicate`] is a filter anchored at a document path. It renders to the
//! JsonPath dialect (`$.applicant.address[?(@.city == "Seattle")]`) and can be matched
//! directly against a `serde_json::Value` without going through the string form.

use crate::path::Path;
use crate::value::format_double;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

/// JsonPath filter comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Nin,
    AnyOf,
    NoneOf,
    SubsetOf,
}

impl FilterOp {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::In => "in",
            FilterOp::Nin => "nin",
            FilterOp::AnyOf => "anyof",
            FilterOp::NoneOf => "noneof",
            FilterOp::SubsetOf => "subsetof",
        }
    }
}

/// A literal inside a filter.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterLiteral {
    Long(i64),
    Double(f64),
    /// Rendered double-quoted.
    String(String),
    /// Rendered single-quoted; used for enumerated names such as service area states.
    Name(String),
    List(Vec<FilterLiteral>),
}

impl FilterLiteral {
    pub fn to_json(&self) -> Value {
        match self {
            FilterLiteral::Long(n) => Value::from(*n),
            FilterLiteral::Double(n) => Value::from(*n),
            FilterLiteral::String(s) | FilterLiteral::Name(s) => Value::String(s.clone()),
            FilterLiteral::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for FilterLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterLiteral::Long(n) => write!(f, "{}", n),
            FilterLiteral::Double(n) => f.write_str(&format_double(*n)),
            FilterLiteral::String(s) => write!(f, "\"{}\"", s),
            FilterLiteral::Name(s) => write!(f, "'{}'", s),
            FilterLiteral::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// One side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// `@.name`: a field of the node under test.
    Field(String),
    Literal(FilterLiteral),
}

impl Operand {
    pub fn field(name: impl Into<String>) -> Self {
        Operand::Field(name.into())
    }

    fn resolve(&self, node: &Value) -> Option<Value> {
        match self {
            Operand::Field(name) => node.get(name.as_str()).cloned(),
            Operand::Literal(literal) => Some(literal.to_json()),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Field(name) => write!(f, "@.{}", name),
            Operand::Literal(literal) => write!(f, "{}", literal),
        }
    }
}

/// Boolean filter expression inside `[?( ... )]`.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    Compare {
        lhs: Operand,
        op: FilterOp,
        rhs: Operand,
    },
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
    Grouped(Box<FilterExpr>),
}

impl FilterExpr {
    pub fn compare(lhs: Operand, op: FilterOp, rhs: Operand) -> Self {
        FilterExpr::Compare { lhs, op, rhs }
    }

    pub fn and(self, other: FilterExpr) -> Self {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> Self {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }

    pub fn grouped(self) -> Self {
        FilterExpr::Grouped(Box::new(self))
    }

    /// Tests a single node. Comparisons that reference a missing field never match.
    pub fn matches(&self, node: &Value) -> bool {
        match self {
            FilterExpr::Compare { lhs, op, rhs } => match (lhs.resolve(node), rhs.resolve(node)) {
                (Some(l), Some(r)) => compare(&l, *op, &r),
                _ => false,
            },
            FilterExpr::And(l, r) => l.matches(node) && r.matches(node),
            FilterExpr::Or(l, r) => l.matches(node) || r.matches(node),
            FilterExpr::Grouped(inner) => inner.matches(node),
        }
    }
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterExpr::Compare { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op.as_str(), rhs),
            FilterExpr::And(l, r) => write!(f, "{} && {}", l, r),
            FilterExpr::Or(l, r) => write!(f, "{} || {}", l, r),
            FilterExpr::Grouped(inner) => write!(f, "({})", inner),
        }
    }
}

/// A compiled leaf predicate: `base[?(filter)]`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonPathPredicate {
    base: Path,
    filter: FilterExpr,
}

impl JsonPathPredicate {
    pub fn new(base: Path, filter: FilterExpr) -> Self {
        Self { base, filter }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn filter(&self) -> &FilterExpr {
        &self.filter
    }

    /// The JsonPath query string.
    pub fn path_predicate(&self) -> String {
        self.to_string()
    }

    /// Applies the filter to the node found at the base path. Arrays match when any
    /// element matches; any other node is tested directly.
    pub fn matches_node(&self, node: &Value) -> bool {
        match node {
            Value::Array(items) => items.iter().any(|item| self.filter.matches(item)),
            other => self.filter.matches(other),
        }
    }
}

impl fmt::Display for JsonPathPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[?({})]", self.base.predicate_format(), self.filter)
    }
}

fn compare(lhs: &Value, op: FilterOp, rhs: &Value) -> bool {
    match op {
        FilterOp::Eq => loose_eq(lhs, rhs),
        FilterOp::Ne => !loose_eq(lhs, rhs),
        FilterOp::Lt => order(lhs, rhs) == Some(Ordering::Less),
        FilterOp::Le => matches!(order(lhs, rhs), Some(Ordering::Less | Ordering::Equal)),
        FilterOp::Gt => order(lhs, rhs) == Some(Ordering::Greater),
        FilterOp::Ge => matches!(order(lhs, rhs), Some(Ordering::Greater | Ordering::Equal)),
        FilterOp::In => rhs.as_array().is_some_and(|list| contains(list, lhs)),
        FilterOp::Nin => rhs.as_array().is_some_and(|list| !contains(list, lhs)),
        FilterOp::AnyOf => match rhs.as_array() {
            Some(list) => as_items(lhs).iter().any(|item| contains(list, item)),
            None => false,
        },
        FilterOp::NoneOf => match rhs.as_array() {
            Some(list) => !as_items(lhs).iter().any(|item| contains(list, item)),
            None => false,
        },
        FilterOp::SubsetOf => match rhs.as_array() {
            Some(list) => as_items(lhs).iter().all(|item| contains(list, item)),
            None => false,
        },
    }
}

/// A scalar answer on the left of a list operator is treated as a one element list.
fn as_items(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn contains(list: &[Value], needle: &Value) -> bool {
    list.iter().any(|item| loose_eq(item, needle))
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality where a numeric string equals the same number; multi-option ids are
/// stored as numbers but compared against quoted ids.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => x.as_f64() == y.as_f64(),
        },
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            match (as_number(a), as_number(b)) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            }
        }
        _ => a == b,
    }
}

fn order(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        _ => None,
    }
}
