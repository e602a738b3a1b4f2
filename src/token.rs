//! The token definition for the textual predicate format.

use crate::operator::Operator;

/// A token is a single unit of the language, with a specific kind and location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: Span,
}

/// The kind of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind<'a> {
    // Keywords
    And,   // "AND"
    Or,    // "OR"
    True,  // "TRUE"
    False, // "FALSE"

    // Word operators
    In,               // "IN"
    NotIn,            // "NOT_IN"
    AnyOf,            // "ANY_OF"
    NoneOf,           // "NONE_OF"
    SubsetOf,         // "SUBSET_OF"
    Between,          // "BETWEEN"
    AgeBetween,       // "AGE_BETWEEN"
    AgeOlderThan,     // "AGE_OLDER_THAN"
    AgeYoungerThan,   // "AGE_YOUNGER_THAN"
    InServiceArea,    // "IN_SERVICE_AREA"
    NotInServiceArea, // "NOT_IN_SERVICE_AREA"

    // Literals
    Identifier(&'a str),
    String(&'a str), // Without the surrounding quotes
    Number(i64),
    Decimal(f64),
    Date(&'a str), // yyyy-mm-dd

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Dot,      // .
    Dash,     // -

    // Symbol operators
    Eq,    // == or =
    NotEq, // !=
    Gt,    // >
    Lt,    // <
    Gte,   // >=
    Lte,   // <=

    // Special
    Illegal, // An illegal/unknown character, or an unterminated string
}

impl TokenKind<'_> {
    /// The leaf operator this token spells, if any.
    pub fn operator(&self) -> Option<Operator> {
        let operator = match self {
            TokenKind::Eq => Operator::EqualTo,
            TokenKind::NotEq => Operator::NotEqualTo,
            TokenKind::Lt => Operator::LessThan,
            TokenKind::Lte => Operator::LessThanOrEqualTo,
            TokenKind::Gt => Operator::GreaterThan,
            TokenKind::Gte => Operator::GreaterThanOrEqualTo,
            TokenKind::In => Operator::In,
            TokenKind::NotIn => Operator::NotIn,
            TokenKind::AnyOf => Operator::AnyOf,
            TokenKind::NoneOf => Operator::NoneOf,
            TokenKind::SubsetOf => Operator::SubsetOf,
            TokenKind::Between => Operator::Between,
            TokenKind::AgeBetween => Operator::AgeBetween,
            TokenKind::AgeOlderThan => Operator::AgeOlderThan,
            TokenKind::AgeYoungerThan => Operator::AgeYoungerThan,
            TokenKind::InServiceArea => Operator::InServiceArea,
            TokenKind::NotInServiceArea => Operator::NotInServiceArea,
            _ => return None,
        };
        Some(operator)
    }
}

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}
