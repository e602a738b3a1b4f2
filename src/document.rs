//! The applicant data document.
//!
//! The engine only reads through [`DataDocument`]; [`ApplicantData`] is the
//! `serde_json` backed implementation used by the binary and the tests.

use crate::date::{date_from_epoch_millis, epoch_millis, parse_date};
use crate::json_path::JsonPathPredicate;
use crate::operator::Scalar;
use crate::path::{split_array_suffix, Path};
use chrono::NaiveDate;
use serde_json::{Map, Value};
use thiserror::Error;

/// Read contract the evaluator relies on.
pub trait DataDocument {
    fn has_path(&self, path: &Path) -> bool;

    /// The value at `path`, if present.
    fn read_scalar(&self, path: &Path) -> Option<&Value>;

    /// True if the query matches any data. Absent paths never match.
    fn eval_predicate(&self, predicate: &JsonPathPredicate) -> bool;
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("invalid applicant JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot write to {path}: segment '{segment}' has no array index")]
    UnresolvedArrayIndex { path: String, segment: String },
    #[error("cannot write to {path}: '{segment}' is not an object")]
    NotAnObject { path: String, segment: String },
    #[error("'{value}' is not a yyyy-MM-dd date")]
    InvalidDate { value: String },
    #[error("'{value}' is not a dollar amount")]
    InvalidCurrency { value: String },
}

/// One applicant's answers, rooted at `{"applicant": {}}`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantData {
    root: Value,
}

impl Default for ApplicantData {
    fn default() -> Self {
        let mut root = Map::new();
        root.insert("applicant".to_string(), Value::Object(Map::new()));
        Self {
            root: Value::Object(root),
        }
    }
}

impl ApplicantData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, DocumentError> {
        Ok(Self::from_value(serde_json::from_str(json)?))
    }

    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    pub fn as_value(&self) -> &Value {
        &self.root
    }

    pub fn as_json_string(&self) -> String {
        self.root.to_string()
    }

    fn resolve(&self, path: &Path) -> Option<&Value> {
        path.segments().iter().try_fold(&self.root, |node, segment| {
            match split_array_suffix(segment) {
                Some((name, Some(index))) => node.get(name)?.get(index),
                Some((_, None)) => None,
                None => node.get(segment.as_str()),
            }
        })
    }

    pub fn read_string(&self, path: &Path) -> Option<String> {
        self.resolve(path)?.as_str().map(str::to_string)
    }

    /// Reads an integer; decimals are truncated.
    pub fn read_long(&self, path: &Path) -> Option<i64> {
        let value = self.resolve(path)?;
        value.as_i64().or_else(|| value.as_f64().map(|n| n as i64))
    }

    pub fn read_double(&self, path: &Path) -> Option<f64> {
        self.resolve(path)?.as_f64()
    }

    pub fn read_date(&self, path: &Path) -> Option<NaiveDate> {
        self.read_long(path).and_then(date_from_epoch_millis)
    }

    pub fn read_list_of_longs(&self, path: &Path) -> Option<Vec<i64>> {
        self.resolve(path)?
            .as_array()?
            .iter()
            .map(Value::as_i64)
            .collect()
    }

    /// Names of the repeated entities under an enumerator path such as
    /// `applicant.household_members[]`. Empty if there are none.
    pub fn read_repeated_entities(&self, path: &Path) -> Vec<String> {
        let mut names = Vec::new();
        while let Some(entity) = path.at_index(names.len()) {
            if !self.has_path(&entity) {
                break;
            }
            let name = self
                .read_string(&entity.join(Scalar::EntityName.name()))
                .unwrap_or_default();
            names.push(name);
        }
        names
    }

    pub fn put_string(&mut self, path: &Path, value: &str) -> Result<(), DocumentError> {
        self.put(path, Value::String(value.to_string()))
    }

    pub fn put_long(&mut self, path: &Path, value: i64) -> Result<(), DocumentError> {
        self.put(path, Value::from(value))
    }

    pub fn put_double(&mut self, path: &Path, value: f64) -> Result<(), DocumentError> {
        self.put(path, Value::from(value))
    }

    pub fn put_list_of_longs(&mut self, path: &Path, values: &[i64]) -> Result<(), DocumentError> {
        self.put(path, Value::from(values.to_vec()))
    }

    /// Stores a `yyyy-MM-dd` date as epoch milliseconds. An empty string stores null.
    pub fn put_date(&mut self, path: &Path, date: &str) -> Result<(), DocumentError> {
        if date.is_empty() {
            return self.put(path, Value::Null);
        }
        let parsed = parse_date(date).map_err(|_| DocumentError::InvalidDate {
            value: date.to_string(),
        })?;
        self.put(path, Value::from(epoch_millis(parsed)))
    }

    /// Stores a dollar amount such as `1,234.50` as cents.
    pub fn put_currency_dollars(&mut self, path: &Path, dollars: &str) -> Result<(), DocumentError> {
        if dollars.is_empty() {
            return self.put(path, Value::Null);
        }
        let amount: f64 = dollars
            .replace(',', "")
            .parse()
            .map_err(|_| DocumentError::InvalidCurrency {
                value: dollars.to_string(),
            })?;
        self.put(path, Value::from((amount * 100.0).round() as i64))
    }

    /// Writes one entity per name under an enumerator path (`...household_members[]`).
    pub fn put_repeated_entities(
        &mut self,
        path: &Path,
        names: &[&str],
    ) -> Result<(), DocumentError> {
        let array_path = path.as_array_element();
        for (index, name) in names.iter().enumerate() {
            let entity =
                array_path
                    .at_index(index)
                    .ok_or_else(|| DocumentError::UnresolvedArrayIndex {
                        path: array_path.to_string(),
                        segment: array_path.key_name().to_string(),
                    })?;
            self.put_string(&entity.join(Scalar::EntityName.name()), name)?;
        }
        Ok(())
    }

    /// Writes `value` at `path`, creating intermediate objects and array slots.
    pub fn put(&mut self, path: &Path, value: Value) -> Result<(), DocumentError> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            let not_an_object = || DocumentError::NotAnObject {
                path: path.to_string(),
                segment: segment.clone(),
            };
            if node.is_null() {
                *node = Value::Object(Map::new());
            }
            match split_array_suffix(segment) {
                Some((_, None)) => {
                    return Err(DocumentError::UnresolvedArrayIndex {
                        path: path.to_string(),
                        segment: segment.clone(),
                    })
                }
                Some((name, Some(index))) => {
                    let object = node.as_object_mut().ok_or_else(not_an_object)?;
                    let slot = object
                        .entry(name.to_string())
                        .or_insert_with(|| Value::Array(Vec::new()));
                    let items = slot.as_array_mut().ok_or_else(not_an_object)?;
                    while items.len() <= index {
                        items.push(Value::Object(Map::new()));
                    }
                    node = &mut items[index];
                }
                None => {
                    let object = node.as_object_mut().ok_or_else(not_an_object)?;
                    node = object.entry(segment.clone()).or_insert(Value::Null);
                }
            }
        }
        *node = value;
        Ok(())
    }
}

impl DataDocument for ApplicantData {
    fn has_path(&self, path: &Path) -> bool {
        self.resolve(path).is_some()
    }

    fn read_scalar(&self, path: &Path) -> Option<&Value> {
        self.resolve(path)
    }

    fn eval_predicate(&self, predicate: &JsonPathPredicate) -> bool {
        match self.resolve(predicate.base()) {
            Some(node) => predicate.matches_node(node),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json_path::{FilterExpr, FilterLiteral, FilterOp, Operand};
    use pretty_assertions::assert_eq;

    fn city_is(city: &str) -> JsonPathPredicate {
        JsonPathPredicate::new(
            Path::parse("applicant.address"),
            FilterExpr::compare(
                Operand::field("city"),
                FilterOp::Eq,
                Operand::Literal(FilterLiteral::String(city.to_string())),
            ),
        )
    }

    #[test]
    fn test_put_and_read() {
        let mut data = ApplicantData::new();
        data.put_string(&Path::parse("applicant.address.city"), "Seattle").unwrap();
        data.put_long(&Path::parse("applicant.juggling.number"), 5).unwrap();
        data.put_date(&Path::parse("applicant.birth.date"), "2022-05-20").unwrap();

        assert_eq!(
            data.read_string(&Path::parse("applicant.address.city")),
            Some("Seattle".to_string())
        );
        assert_eq!(data.read_long(&Path::parse("applicant.juggling.number")), Some(5));
        assert_eq!(
            data.read_long(&Path::parse("applicant.birth.date")),
            Some(1_653_004_800_000)
        );
        assert_eq!(
            data.read_date(&Path::parse("applicant.birth.date")),
            NaiveDate::from_ymd_opt(2022, 5, 20)
        );
        assert!(data.has_path(&Path::parse("applicant.address")));
        assert!(!data.has_path(&Path::parse("applicant.phone")));
    }

    #[test]
    fn test_eval_predicate() {
        let mut data = ApplicantData::new();
        data.put_string(&Path::parse("applicant.address.city"), "Seattle").unwrap();
        assert!(data.eval_predicate(&city_is("Seattle")));
        assert!(!data.eval_predicate(&city_is("Chicago")));
    }

    #[test]
    fn test_eval_predicate_on_missing_path() {
        let data = ApplicantData::new();
        assert!(!data.eval_predicate(&city_is("Seattle")));
    }

    #[test]
    fn test_repeated_entities() {
        let mut data = ApplicantData::new();
        let members = Path::parse("applicant.household_members[]");
        data.put_repeated_entities(&members, &["Bernard", "Alice"]).unwrap();
        assert_eq!(data.read_repeated_entities(&members), vec!["Bernard", "Alice"]);
        assert_eq!(
            data.read_string(&Path::parse("applicant.household_members[1].entity_name")),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_write_errors() {
        let mut data = ApplicantData::new();
        let unresolved = data.put_string(&Path::parse("applicant.members[].name"), "x");
        assert!(matches!(unresolved, Err(DocumentError::UnresolvedArrayIndex { .. })));

        data.put_string(&Path::parse("applicant.name"), "Ada").unwrap();
        let through_scalar = data.put_string(&Path::parse("applicant.name.first"), "Ada");
        assert!(matches!(through_scalar, Err(DocumentError::NotAnObject { .. })));
    }

    #[test]
    fn test_currency_and_lists() {
        let mut data = ApplicantData::new();
        data.put_currency_dollars(&Path::parse("applicant.ice_cream.currency_cents"), "5.50")
            .unwrap();
        data.put_list_of_longs(&Path::parse("applicant.colors.selections"), &[1, 3])
            .unwrap();
        assert_eq!(
            data.read_long(&Path::parse("applicant.ice_cream.currency_cents")),
            Some(550)
        );
        assert_eq!(
            data.read_list_of_longs(&Path::parse("applicant.colors.selections")),
            Some(vec![1, 3])
        );
        assert!(data.put_currency_dollars(&Path::parse("applicant.x"), "lots").is_err());
    }

    #[test]
    fn test_from_json_str() {
        let data = ApplicantData::from_json_str(r#"{"applicant": {"name": {"first_name": "Ada"}}}"#)
            .unwrap();
        assert_eq!(
            data.read_scalar(&Path::parse("applicant.name.first_name")),
            Some(&Value::String("Ada".into()))
        );
        assert!(ApplicantData::from_json_str("not json").is_err());
    }
}
