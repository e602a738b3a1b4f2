//! Compiles leaf predicates into [`JsonPathPredicate`]s for the current applicant.

use crate::ast::{LeafAddressServiceAreaExpressionNode, LeafOperationExpressionNode};
use crate::catalog::{QuestionDefinition, RepeatedEntity};
use crate::date::DateConverter;
use crate::json_path::{FilterExpr, FilterLiteral, FilterOp, JsonPathPredicate, Operand};
use crate::operator::{Operator, Scalar};
use crate::path::Path;
use crate::value::{PredicateValue, ValueType};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const SERVICE_AREA_STATE: &str = "state";
const SERVICE_AREA_ID: &str = "serviceAreaId";
const IN_AREA: &str = "IN_AREA";
const NOT_IN_AREA: &str = "NOT_IN_AREA";
const FAILED: &str = "FAILED";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidPredicateError {
    #[error("Tried to apply a predicate based on question {question_id}, which is not found in this program.")]
    QuestionNotFound { question_id: u64 },
    #[error("Enumerator {enumerator_id} is not an ancestor of the current repeated context")]
    EnumeratorNotAncestor { enumerator_id: u64 },
    #[error("operator {operator} cannot compare against a {value_type:?} value")]
    IncompatibleValue {
        operator: Operator,
        value_type: ValueType,
    },
    #[error("operator {operator} expects exactly two values, got {count}")]
    MalformedRange { operator: Operator, count: usize },
}

/// Generates [`JsonPathPredicate`]s based on the program the applicant is filling out.
///
/// Built from question definitions rather than resolved answers: a repeated question
/// shares one id across all of its entities, so the current block's repeated context
/// decides which entity a predicate points at.
#[derive(Debug, Clone)]
pub struct JsonPathPredicateGenerator {
    date_converter: DateConverter,
    questions_by_id: HashMap<u64, QuestionDefinition>,
    current_repeated_context: Option<RepeatedEntity>,
}

impl JsonPathPredicateGenerator {
    /// The first definition wins when `program_questions` repeats an id.
    pub fn new(
        date_converter: DateConverter,
        program_questions: &[QuestionDefinition],
        current_repeated_context: Option<RepeatedEntity>,
    ) -> Self {
        let mut questions_by_id = HashMap::with_capacity(program_questions.len());
        for question in program_questions {
            questions_by_id
                .entry(question.id)
                .or_insert_with(|| question.clone());
        }
        Self {
            date_converter,
            questions_by_id,
            current_repeated_context,
        }
    }

    pub fn has_question(&self, question_id: u64) -> bool {
        self.questions_by_id.contains_key(&question_id)
    }

    pub fn current_repeated_context(&self) -> Option<&RepeatedEntity> {
        self.current_repeated_context.as_ref()
    }

    /// Formats a leaf as `path[?(expression)]`, e.g.
    /// `$.applicant.name[?(@.last_name in ["Smith", "Lee"])]`.
    pub fn from_leaf_node(
        &self,
        node: &LeafOperationExpressionNode,
    ) -> Result<JsonPathPredicate, InvalidPredicateError> {
        let value_type = node.compared_value.value_type();
        if !node.operator.accepts(value_type) {
            return Err(InvalidPredicateError::IncompatibleValue {
                operator: node.operator,
                value_type,
            });
        }

        let path = self.get_path(node.question_id)?;
        let field = node.scalar.name();
        let filter = match node.operator {
            Operator::AgeBetween => self.age_between_filter(node, field)?,
            Operator::AgeOlderThan | Operator::AgeYoungerThan => {
                self.age_comparison_filter(node, field)
            }
            Operator::Between => between_filter(node, field)?,
            Operator::InServiceArea | Operator::NotInServiceArea => {
                let service_area_id = match &node.compared_value {
                    PredicateValue::ServiceArea(id) => id.as_str(),
                    _ => "",
                };
                let predicate = service_area_predicate(&path, node.operator, service_area_id);
                debug!(question_id = node.question_id, query = %predicate, "compiled leaf");
                return Ok(predicate);
            }
            operator => FilterExpr::compare(
                Operand::field(field),
                json_path_op(operator),
                Operand::Literal(node.compared_value.to_filter_literal()),
            ),
        };

        let predicate = JsonPathPredicate::new(path, filter);
        debug!(question_id = node.question_id, query = %predicate, "compiled leaf");
        Ok(predicate)
    }

    /// Formats a service area leaf, e.g.
    /// `$.applicant.address.service_areas[?((@.state == 'IN_AREA' || @.state == 'FAILED') && @.serviceAreaId == 'Seattle')]`.
    ///
    /// A failed service area lookup counts as matching either operator.
    pub fn from_leaf_address_service_area_node(
        &self,
        node: &LeafAddressServiceAreaExpressionNode,
    ) -> Result<JsonPathPredicate, InvalidPredicateError> {
        if !node.operator.is_service_area_operator() {
            return Err(InvalidPredicateError::IncompatibleValue {
                operator: node.operator,
                value_type: ValueType::ServiceArea,
            });
        }
        let path = self.get_path(node.question_id)?;
        let predicate = service_area_predicate(&path, node.operator, &node.service_area_id);
        debug!(question_id = node.question_id, query = %predicate, "compiled service area leaf");
        Ok(predicate)
    }

    /// Birth-date timestamps sit on the left of the comparison:
    /// `ts >= @.date` holds for anyone born on or before `ts`.
    fn age_comparison_filter(&self, node: &LeafOperationExpressionNode, field: &str) -> FilterExpr {
        let age = match node.compared_value {
            PredicateValue::Long(n) => n as f64,
            PredicateValue::Double(n) => n,
            _ => 0.0,
        };
        FilterExpr::compare(
            Operand::Literal(FilterLiteral::Long(
                self.date_converter.date_timestamp_from_age(age),
            )),
            json_path_op(node.operator),
            Operand::field(field),
        )
    }

    fn age_between_filter(
        &self,
        node: &LeafOperationExpressionNode,
        field: &str,
    ) -> Result<FilterExpr, InvalidPredicateError> {
        let (youngest, oldest) = sorted_pair(node)?;
        let youngest_birth = self.date_converter.date_timestamp_from_age(youngest as f64);
        let oldest_birth = self.date_converter.date_timestamp_from_age(oldest as f64);
        Ok(FilterExpr::compare(
            Operand::Literal(FilterLiteral::Long(youngest_birth)),
            FilterOp::Ge,
            Operand::field(field),
        )
        .and(FilterExpr::compare(
            Operand::Literal(FilterLiteral::Long(oldest_birth)),
            FilterOp::Le,
            Operand::field(field),
        )))
    }

    fn get_path(&self, question_id: u64) -> Result<Path, InvalidPredicateError> {
        // A miss means the predicate depends on a question that is not in this program.
        let target = self
            .questions_by_id
            .get(&question_id)
            .ok_or(InvalidPredicateError::QuestionNotFound { question_id })?;

        let context = match target.enumerator_id {
            None => None,
            Some(enumerator_id) => Some(self.target_context(enumerator_id)?),
        };

        let path = target.contextualized_path(context, &Path::applicant());
        if path.is_array_element() && target.is_enumerator() {
            return Ok(path.without_array_reference());
        }
        Ok(path)
    }

    /// Walks up from the current repeated context to the entity of `enumerator_id`.
    fn target_context(&self, enumerator_id: u64) -> Result<&RepeatedEntity, InvalidPredicateError> {
        let mut context = self.current_repeated_context.as_ref();
        while let Some(entity) = context {
            if entity.enumerator_question().id == enumerator_id {
                return Ok(entity);
            }
            context = entity.parent();
        }
        Err(InvalidPredicateError::EnumeratorNotAncestor { enumerator_id })
    }
}

fn json_path_op(operator: Operator) -> FilterOp {
    // Only operators without a single JsonPath rendering are handled before this.
    operator.json_path_operator().unwrap_or(FilterOp::Eq)
}

fn sorted_pair(node: &LeafOperationExpressionNode) -> Result<(i64, i64), InvalidPredicateError> {
    let mut bounds = node.compared_value.range_bounds().unwrap_or_default();
    bounds.sort_unstable();
    match bounds[..] {
        [lo, hi] => Ok((lo, hi)),
        _ => Err(InvalidPredicateError::MalformedRange {
            operator: node.operator,
            count: bounds.len(),
        }),
    }
}

fn between_filter(
    node: &LeafOperationExpressionNode,
    field: &str,
) -> Result<FilterExpr, InvalidPredicateError> {
    let (lo, hi) = sorted_pair(node)?;
    Ok(FilterExpr::compare(
        Operand::Literal(FilterLiteral::Long(lo)),
        FilterOp::Le,
        Operand::field(field),
    )
    .and(FilterExpr::compare(
        Operand::field(field),
        FilterOp::Le,
        Operand::Literal(FilterLiteral::Long(hi)),
    )))
}

fn service_area_predicate(path: &Path, operator: Operator, service_area_id: &str) -> JsonPathPredicate {
    let state = if operator == Operator::InServiceArea {
        IN_AREA
    } else {
        NOT_IN_AREA
    };
    let state_is = |name: &str| {
        FilterExpr::compare(
            Operand::field(SERVICE_AREA_STATE),
            FilterOp::Eq,
            Operand::Literal(FilterLiteral::Name(name.to_string())),
        )
    };
    let filter = state_is(state)
        .or(state_is(FAILED))
        .grouped()
        .and(FilterExpr::compare(
            Operand::field(SERVICE_AREA_ID),
            FilterOp::Eq,
            Operand::Literal(FilterLiteral::Name(service_area_id.to_string())),
        ));
    JsonPathPredicate::new(path.join(Scalar::ServiceAreas.name()), filter)
}
