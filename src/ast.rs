//! Predicate expression trees.

use crate::catalog::QuestionDefinition;
use crate::operator::{Operator, Scalar};
use crate::value::PredicateValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single comparison of one scalar of a question's answer against a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafOperationExpressionNode {
    pub question_id: u64,
    pub scalar: Scalar,
    pub operator: Operator,
    pub compared_value: PredicateValue,
}

impl LeafOperationExpressionNode {
    pub fn new(
        question_id: u64,
        scalar: Scalar,
        operator: Operator,
        compared_value: PredicateValue,
    ) -> Self {
        Self {
            question_id,
            scalar,
            operator,
            compared_value,
        }
    }
}

/// Whether an address answer was found inside (or outside) a service area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafAddressServiceAreaExpressionNode {
    pub question_id: u64,
    pub service_area_id: String,
    pub operator: Operator,
}

/// A boolean composition of leaf predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateExpressionNode {
    LeafOperation(LeafOperationExpressionNode),
    LeafAddressServiceArea(LeafAddressServiceAreaExpressionNode),
    And { children: Vec<PredicateExpressionNode> },
    Or { children: Vec<PredicateExpressionNode> },
    Constant { value: bool },
}

impl PredicateExpressionNode {
    pub fn leaf(
        question_id: u64,
        scalar: Scalar,
        operator: Operator,
        compared_value: PredicateValue,
    ) -> Self {
        PredicateExpressionNode::LeafOperation(LeafOperationExpressionNode::new(
            question_id,
            scalar,
            operator,
            compared_value,
        ))
    }

    pub fn service_area(question_id: u64, operator: Operator, service_area_id: &str) -> Self {
        PredicateExpressionNode::LeafAddressServiceArea(LeafAddressServiceAreaExpressionNode {
            question_id,
            service_area_id: service_area_id.to_string(),
            operator,
        })
    }

    pub fn and(children: Vec<PredicateExpressionNode>) -> Self {
        PredicateExpressionNode::And { children }
    }

    pub fn or(children: Vec<PredicateExpressionNode>) -> Self {
        PredicateExpressionNode::Or { children }
    }

    pub fn constant(value: bool) -> Self {
        PredicateExpressionNode::Constant { value }
    }

    /// Referenced question ids, in first-seen order.
    pub fn question_ids(&self) -> Vec<u64> {
        let mut ids = Vec::new();
        self.collect_question_ids(&mut ids);
        ids
    }

    fn collect_question_ids(&self, ids: &mut Vec<u64>) {
        match self {
            PredicateExpressionNode::LeafOperation(leaf) => push_unique(ids, leaf.question_id),
            PredicateExpressionNode::LeafAddressServiceArea(leaf) => {
                push_unique(ids, leaf.question_id)
            }
            PredicateExpressionNode::And { children } | PredicateExpressionNode::Or { children } => {
                for child in children {
                    child.collect_question_ids(ids);
                }
            }
            PredicateExpressionNode::Constant { .. } => {}
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            PredicateExpressionNode::LeafOperation(_)
            | PredicateExpressionNode::LeafAddressServiceArea(_) => 1,
            PredicateExpressionNode::And { children } | PredicateExpressionNode::Or { children } => {
                children.iter().map(Self::leaf_count).sum()
            }
            PredicateExpressionNode::Constant { .. } => 0,
        }
    }

    /// Readable sentence naming questions by their admin name, e.g.
    /// `"home address" city is equal to "Seattle" or ...`.
    pub fn to_display_string(&self, questions: &[QuestionDefinition]) -> String {
        let question_name = |id: u64| {
            questions
                .iter()
                .find(|q| q.id == id)
                .map(|q| format!("\"{}\"", q.name))
                .unwrap_or_else(|| format!("question {}", id))
        };
        match self {
            PredicateExpressionNode::LeafOperation(leaf) => format!(
                "{} {} {} {}",
                question_name(leaf.question_id),
                leaf.scalar.to_display_string(),
                leaf.operator.to_display_string(),
                leaf.compared_value.to_display_string(leaf.scalar)
            ),
            PredicateExpressionNode::LeafAddressServiceArea(leaf) => format!(
                "{} {} \"{}\"",
                question_name(leaf.question_id),
                leaf.operator.to_display_string(),
                leaf.service_area_id
            ),
            PredicateExpressionNode::And { children } => join_display(children, questions, " and "),
            PredicateExpressionNode::Or { children } => join_display(children, questions, " or "),
            PredicateExpressionNode::Constant { value } => value.to_string(),
        }
    }
}

fn push_unique(ids: &mut Vec<u64>, id: u64) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}

fn join_display(
    children: &[PredicateExpressionNode],
    questions: &[QuestionDefinition],
    separator: &str,
) -> String {
    children
        .iter()
        .map(|child| match child {
            PredicateExpressionNode::And { .. } | PredicateExpressionNode::Or { .. } => {
                format!("({})", child.to_display_string(questions))
            }
            _ => child.to_display_string(questions),
        })
        .collect::<Vec<_>>()
        .join(separator)
}

/// Writes the textual predicate format accepted by [`crate::parser::parse_predicate`].
///
/// Empty `AND`/`OR` nodes print as their identity constant (`TRUE`/`FALSE`).
impl fmt::Display for PredicateExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PredicateExpressionNode::LeafOperation(leaf) => write!(
                f,
                "{}.{} {} {}",
                leaf.question_id, leaf.scalar, leaf.operator, leaf.compared_value
            ),
            PredicateExpressionNode::LeafAddressServiceArea(leaf) => write!(
                f,
                "{} {} \"{}\"",
                leaf.question_id, leaf.operator, leaf.service_area_id
            ),
            PredicateExpressionNode::And { children } if children.is_empty() => f.write_str("TRUE"),
            PredicateExpressionNode::Or { children } if children.is_empty() => f.write_str("FALSE"),
            PredicateExpressionNode::And { children } => {
                write_children(f, children, " AND ", |child| {
                    matches!(
                        child,
                        PredicateExpressionNode::And { .. } | PredicateExpressionNode::Or { .. }
                    )
                })
            }
            PredicateExpressionNode::Or { children } => {
                write_children(f, children, " OR ", |child| {
                    matches!(child, PredicateExpressionNode::Or { .. })
                })
            }
            PredicateExpressionNode::Constant { value } => {
                f.write_str(if *value { "TRUE" } else { "FALSE" })
            }
        }
    }
}

fn write_children(
    f: &mut fmt::Formatter<'_>,
    children: &[PredicateExpressionNode],
    separator: &str,
    needs_parens: impl Fn(&PredicateExpressionNode) -> bool,
) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        if needs_parens(child) {
            write!(f, "({})", child)?;
        } else {
            write!(f, "{}", child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QuestionType;
    use pretty_assertions::assert_eq;

    fn city_leaf(question_id: u64, city: &str) -> PredicateExpressionNode {
        PredicateExpressionNode::leaf(
            question_id,
            Scalar::City,
            Operator::EqualTo,
            PredicateValue::string(city),
        )
    }

    #[test]
    fn test_question_ids_in_first_seen_order() {
        let tree = PredicateExpressionNode::or(vec![
            PredicateExpressionNode::and(vec![city_leaf(3, "a"), city_leaf(1, "b")]),
            city_leaf(3, "c"),
            PredicateExpressionNode::service_area(7, Operator::InServiceArea, "Seattle"),
        ]);
        assert_eq!(tree.question_ids(), vec![3, 1, 7]);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn test_text_format() {
        let tree = PredicateExpressionNode::or(vec![
            PredicateExpressionNode::and(vec![
                city_leaf(1, "Seattle"),
                PredicateExpressionNode::leaf(
                    2,
                    Scalar::Number,
                    Operator::Between,
                    PredicateValue::PairOfLongs(0, 20),
                ),
            ]),
            PredicateExpressionNode::or(vec![
                PredicateExpressionNode::constant(false),
                PredicateExpressionNode::service_area(3, Operator::NotInServiceArea, "Tacoma"),
            ]),
        ]);
        assert_eq!(
            tree.to_string(),
            "1.city == \"Seattle\" AND 2.number BETWEEN [0, 20] OR (FALSE OR 3 NOT_IN_SERVICE_AREA \"Tacoma\")"
        );
        assert_eq!(PredicateExpressionNode::and(vec![]).to_string(), "TRUE");
    }

    #[test]
    fn test_display_string() {
        let questions = vec![QuestionDefinition::new(1, "home address", QuestionType::Address)];
        let tree = PredicateExpressionNode::and(vec![city_leaf(1, "Seattle"), city_leaf(9, "Tacoma")]);
        assert_eq!(
            tree.to_display_string(&questions),
            "\"home address\" city is equal to \"Seattle\" and question 9 city is equal to \"Tacoma\""
        );
    }

    #[test]
    fn test_serde_shape() {
        let tree = PredicateExpressionNode::and(vec![city_leaf(1, "Seattle")]);
        let json = serde_json::to_value(&tree).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "node_type": "AND",
                "children": [{
                    "node_type": "LEAF_OPERATION",
                    "question_id": 1,
                    "scalar": "CITY",
                    "operator": "EQUAL_TO",
                    "compared_value": {"type": "STRING", "value": "Seattle"}
                }]
            })
        );
        let back: PredicateExpressionNode = serde_json::from_value(json).unwrap();
        assert_eq!(back, tree);
    }
}
