//! Predicate evaluation for conditional form blocks.
//!
//! A [`PredicateExpressionNode`] tree references questions by id. The
//! [`JsonPathPredicateGenerator`] resolves each leaf to a query anchored at the
//! question's path in the applicant's answers, and the [`PredicateEvaluator`] runs
//! those queries against a [`DataDocument`] and folds the results.
//!
//! ```
//! use predicate_engine::{
//!     parse_predicate, ApplicantData, DateConverter, JsonPathPredicateGenerator, Path,
//!     PredicateEvaluator, QuestionDefinition, QuestionType,
//! };
//!
//! let questions = [QuestionDefinition::new(1, "home address", QuestionType::Address)];
//! let generator = JsonPathPredicateGenerator::new(DateConverter::default(), &questions, None);
//!
//! let mut data = ApplicantData::new();
//! data.put_string(&Path::parse("applicant.home_address.city"), "Seattle").unwrap();
//!
//! let tree = parse_predicate(r#"1.city == "Seattle" OR 42.city == "Chicago""#).unwrap();
//! assert!(PredicateEvaluator::new(&data, &generator).evaluate(&tree));
//! ```

pub mod ast;
pub mod catalog;
pub mod config;
pub mod date;
pub mod document;
pub mod evaluator;
pub mod generator;
pub mod json_path;
pub mod lexer;
pub mod operator;
pub mod parser;
pub mod path;
pub mod token;
pub mod value;
pub mod visibility;

pub use ast::{LeafAddressServiceAreaExpressionNode, LeafOperationExpressionNode, PredicateExpressionNode};
pub use catalog::{QuestionDefinition, QuestionType, RepeatedEntity};
pub use config::{BlockConfig, ConfigError, ProgramConfig};
pub use date::{Clock, DateConverter};
pub use document::{ApplicantData, DataDocument, DocumentError};
pub use evaluator::{LeafTrace, PredicateEvaluator};
pub use generator::{InvalidPredicateError, JsonPathPredicateGenerator};
pub use json_path::JsonPathPredicate;
pub use operator::{Operator, Scalar};
pub use parser::{parse_predicate, ParseError};
pub use path::Path;
pub use value::{parse_predicate_value, PredicateValue, ValueParseError};
pub use visibility::{PredicateAction, PredicateDefinition, PredicateFormat};
