//! Comparison operators and the answer scalars they compare against.

use crate::json_path::FilterOp;
use crate::value::ValueType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An operator of a leaf predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    In,
    NotIn,
    AnyOf,
    NoneOf,
    SubsetOf,
    Between,
    AgeBetween,
    AgeOlderThan,
    AgeYoungerThan,
    InServiceArea,
    NotInServiceArea,
}

impl Operator {
    pub const ALL: [Operator; 17] = [
        Operator::EqualTo,
        Operator::NotEqualTo,
        Operator::LessThan,
        Operator::LessThanOrEqualTo,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqualTo,
        Operator::In,
        Operator::NotIn,
        Operator::AnyOf,
        Operator::NoneOf,
        Operator::SubsetOf,
        Operator::Between,
        Operator::AgeBetween,
        Operator::AgeOlderThan,
        Operator::AgeYoungerThan,
        Operator::InServiceArea,
        Operator::NotInServiceArea,
    ];

    /// The single JsonPath comparison this operator renders to. `None` for operators
    /// that expand into a compound filter (ranges and service areas).
    pub fn json_path_operator(self) -> Option<FilterOp> {
        match self {
            Operator::EqualTo => Some(FilterOp::Eq),
            Operator::NotEqualTo => Some(FilterOp::Ne),
            Operator::LessThan => Some(FilterOp::Lt),
            Operator::LessThanOrEqualTo => Some(FilterOp::Le),
            Operator::GreaterThan => Some(FilterOp::Gt),
            Operator::GreaterThanOrEqualTo => Some(FilterOp::Ge),
            Operator::In => Some(FilterOp::In),
            Operator::NotIn => Some(FilterOp::Nin),
            Operator::AnyOf => Some(FilterOp::AnyOf),
            Operator::NoneOf => Some(FilterOp::NoneOf),
            Operator::SubsetOf => Some(FilterOp::SubsetOf),
            // The age timestamp sits on the left: `ts >= @.date` means born on or before ts.
            Operator::AgeOlderThan => Some(FilterOp::Ge),
            Operator::AgeYoungerThan => Some(FilterOp::Lt),
            Operator::Between
            | Operator::AgeBetween
            | Operator::InServiceArea
            | Operator::NotInServiceArea => None,
        }
    }

    pub fn is_age_operator(self) -> bool {
        matches!(
            self,
            Operator::AgeBetween | Operator::AgeOlderThan | Operator::AgeYoungerThan
        )
    }

    pub fn is_service_area_operator(self) -> bool {
        matches!(self, Operator::InServiceArea | Operator::NotInServiceArea)
    }

    /// Whether a compared value of the given type is meaningful for this operator.
    pub fn accepts(self, value_type: ValueType) -> bool {
        use ValueType as T;
        match self {
            Operator::EqualTo | Operator::NotEqualTo => {
                matches!(value_type, T::String | T::Long | T::Double | T::Date)
            }
            Operator::LessThan
            | Operator::LessThanOrEqualTo
            | Operator::GreaterThan
            | Operator::GreaterThanOrEqualTo => matches!(value_type, T::Long | T::Double | T::Date),
            Operator::In
            | Operator::NotIn
            | Operator::AnyOf
            | Operator::NoneOf
            | Operator::SubsetOf => matches!(value_type, T::ListOfStrings | T::ListOfLongs),
            Operator::Between => matches!(value_type, T::PairOfLongs | T::PairOfDates),
            Operator::AgeBetween => matches!(value_type, T::PairOfLongs | T::ListOfLongs),
            Operator::AgeOlderThan | Operator::AgeYoungerThan => {
                matches!(value_type, T::Long | T::Double)
            }
            Operator::InServiceArea | Operator::NotInServiceArea => {
                matches!(value_type, T::ServiceArea)
            }
        }
    }

    /// Keyword used by the textual predicate format.
    pub fn keyword(self) -> &'static str {
        match self {
            Operator::EqualTo => "==",
            Operator::NotEqualTo => "!=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqualTo => "<=",
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqualTo => ">=",
            Operator::In => "IN",
            Operator::NotIn => "NOT_IN",
            Operator::AnyOf => "ANY_OF",
            Operator::NoneOf => "NONE_OF",
            Operator::SubsetOf => "SUBSET_OF",
            Operator::Between => "BETWEEN",
            Operator::AgeBetween => "AGE_BETWEEN",
            Operator::AgeOlderThan => "AGE_OLDER_THAN",
            Operator::AgeYoungerThan => "AGE_YOUNGER_THAN",
            Operator::InServiceArea => "IN_SERVICE_AREA",
            Operator::NotInServiceArea => "NOT_IN_SERVICE_AREA",
        }
    }

    /// Human readable phrase, e.g. "is greater than".
    pub fn to_display_string(self) -> &'static str {
        match self {
            Operator::EqualTo => "is equal to",
            Operator::NotEqualTo => "is not equal to",
            Operator::LessThan => "is less than",
            Operator::LessThanOrEqualTo => "is less than or equal to",
            Operator::GreaterThan => "is greater than",
            Operator::GreaterThanOrEqualTo => "is greater than or equal to",
            Operator::In => "is one of",
            Operator::NotIn => "is not one of",
            Operator::AnyOf => "contains any of",
            Operator::NoneOf => "contains none of",
            Operator::SubsetOf => "is a subset of",
            Operator::Between => "is between",
            Operator::AgeBetween => "age is between",
            Operator::AgeOlderThan => "age is older than",
            Operator::AgeYoungerThan => "age is younger than",
            Operator::InServiceArea => "is in service area",
            Operator::NotInServiceArea => "is not in service area",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// The storage type of a scalar, which drives how raw admin input is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    String,
    Long,
    Double,
    Date,
    CurrencyCents,
    ListOfStrings,
}

/// A named field of a question's answer, e.g. the city of an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Scalar {
    FirstName,
    MiddleName,
    LastName,
    NameSuffix,
    Street,
    Line2,
    City,
    State,
    Zip,
    ServiceAreas,
    Date,
    Number,
    Text,
    Email,
    PhoneNumber,
    CountryCode,
    CurrencyCents,
    Selection,
    Selections,
    Id,
    EntityName,
}

impl Scalar {
    pub const ALL: [Scalar; 21] = [
        Scalar::FirstName,
        Scalar::MiddleName,
        Scalar::LastName,
        Scalar::NameSuffix,
        Scalar::Street,
        Scalar::Line2,
        Scalar::City,
        Scalar::State,
        Scalar::Zip,
        Scalar::ServiceAreas,
        Scalar::Date,
        Scalar::Number,
        Scalar::Text,
        Scalar::Email,
        Scalar::PhoneNumber,
        Scalar::CountryCode,
        Scalar::CurrencyCents,
        Scalar::Selection,
        Scalar::Selections,
        Scalar::Id,
        Scalar::EntityName,
    ];

    /// Key of this scalar under a question's answer object.
    pub fn name(self) -> &'static str {
        match self {
            Scalar::FirstName => "first_name",
            Scalar::MiddleName => "middle_name",
            Scalar::LastName => "last_name",
            Scalar::NameSuffix => "name_suffix",
            Scalar::Street => "street",
            Scalar::Line2 => "line2",
            Scalar::City => "city",
            Scalar::State => "state",
            Scalar::Zip => "zip",
            Scalar::ServiceAreas => "service_areas",
            Scalar::Date => "date",
            Scalar::Number => "number",
            Scalar::Text => "text",
            Scalar::Email => "email",
            Scalar::PhoneNumber => "phone_number",
            Scalar::CountryCode => "country_code",
            Scalar::CurrencyCents => "currency_cents",
            Scalar::Selection => "selection",
            Scalar::Selections => "selections",
            Scalar::Id => "id",
            Scalar::EntityName => "entity_name",
        }
    }

    pub fn from_name(name: &str) -> Option<Scalar> {
        Scalar::ALL
            .into_iter()
            .find(|scalar| scalar.name().eq_ignore_ascii_case(name))
    }

    pub fn scalar_type(self) -> ScalarType {
        match self {
            Scalar::Date => ScalarType::Date,
            Scalar::Number => ScalarType::Long,
            Scalar::CurrencyCents => ScalarType::CurrencyCents,
            Scalar::Selections => ScalarType::ListOfStrings,
            Scalar::ServiceAreas => ScalarType::ListOfStrings,
            _ => ScalarType::String,
        }
    }

    /// Lowercase, space separated name for display.
    pub fn to_display_string(self) -> String {
        self.name().replace('_', " ")
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
