//! Block visibility and eligibility gating.

use crate::ast::PredicateExpressionNode;
use crate::document::DataDocument;
use crate::evaluator::PredicateEvaluator;
use serde::{Deserialize, Serialize};

/// What happens to a block when its predicate evaluates to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateAction {
    HideBlock,
    ShowBlock,
    EligibleBlock,
}

/// Shape of the tree, which decides how an admin edits it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PredicateFormat {
    /// A single leaf.
    SingleQuestion,
    /// `OR` of `AND`s of leaves.
    OrOfSingleLayerAnds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredicateDefinition {
    pub root_node: PredicateExpressionNode,
    pub action: PredicateAction,
    pub format: PredicateFormat,
}

impl PredicateDefinition {
    pub fn new(
        root_node: PredicateExpressionNode,
        action: PredicateAction,
        format: PredicateFormat,
    ) -> Self {
        Self {
            root_node,
            action,
            format,
        }
    }

    /// Builds a definition from groups of leaves: the groups are OR-ed and the
    /// leaves of each group AND-ed. A single leaf stays a single-question predicate.
    pub fn from_leaf_groups(
        groups: Vec<Vec<PredicateExpressionNode>>,
        action: PredicateAction,
    ) -> Self {
        if let [group] = groups.as_slice() {
            if let [leaf] = group.as_slice() {
                return Self::new(leaf.clone(), action, PredicateFormat::SingleQuestion);
            }
        }
        let root_node = PredicateExpressionNode::or(
            groups
                .into_iter()
                .map(PredicateExpressionNode::and)
                .collect(),
        );
        Self::new(root_node, action, PredicateFormat::OrOfSingleLayerAnds)
    }

    /// Question ids referenced by the predicate, in first-seen order.
    pub fn question_ids(&self) -> Vec<u64> {
        self.root_node.question_ids()
    }
}

impl<'a, D: DataDocument + ?Sized> PredicateEvaluator<'a, D> {
    /// Whether a block with this visibility predicate is shown.
    pub fn evaluate_visibility(&self, predicate: &PredicateDefinition) -> bool {
        let evaluation = self.evaluate(&predicate.root_node);
        match predicate.action {
            PredicateAction::HideBlock => !evaluation,
            PredicateAction::ShowBlock => evaluation,
            PredicateAction::EligibleBlock => true,
        }
    }

    /// A block is hidden if any predicate inherited from its enclosing repeated
    /// blocks hides it; otherwise its own predicate decides. No predicate means shown.
    pub fn is_visible(
        &self,
        visibility: Option<&PredicateDefinition>,
        nested_visibility: &[PredicateDefinition],
    ) -> bool {
        if nested_visibility
            .iter()
            .any(|predicate| !self.evaluate_visibility(predicate))
        {
            return false;
        }
        visibility.map_or(true, |predicate| self.evaluate_visibility(predicate))
    }

    /// No eligibility criteria means eligible.
    pub fn is_eligible(&self, eligibility: Option<&PredicateDefinition>) -> bool {
        eligibility.map_or(true, |predicate| self.evaluate(&predicate.root_node))
    }

    /// A question only counts against eligibility if the block is ineligible and the
    /// question takes part in the eligibility condition.
    pub fn is_question_eligible(
        &self,
        eligibility: Option<&PredicateDefinition>,
        question_id: u64,
    ) -> bool {
        match eligibility {
            None => true,
            Some(predicate) => {
                self.evaluate(&predicate.root_node)
                    || !predicate.question_ids().contains(&question_id)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{QuestionDefinition, QuestionType};
    use crate::date::DateConverter;
    use crate::document::ApplicantData;
    use crate::generator::JsonPathPredicateGenerator;
    use crate::operator::{Operator, Scalar};
    use crate::path::Path;
    use crate::value::PredicateValue;
    use pretty_assertions::assert_eq;

    fn kids_over(n: i64) -> PredicateExpressionNode {
        PredicateExpressionNode::leaf(1, Scalar::Number, Operator::GreaterThan, PredicateValue::Long(n))
    }

    fn fixture() -> (ApplicantData, JsonPathPredicateGenerator) {
        let mut data = ApplicantData::new();
        data.put_long(&Path::parse("applicant.kids.number"), 3).unwrap();
        let generator = JsonPathPredicateGenerator::new(
            DateConverter::default(),
            &[QuestionDefinition::new(1, "kids", QuestionType::Number)],
            None,
        );
        (data, generator)
    }

    #[test]
    fn test_from_leaf_groups() {
        let single = PredicateDefinition::from_leaf_groups(vec![vec![kids_over(1)]], PredicateAction::ShowBlock);
        assert_eq!(single.format, PredicateFormat::SingleQuestion);
        assert_eq!(single.root_node, kids_over(1));

        let grouped = PredicateDefinition::from_leaf_groups(
            vec![vec![kids_over(1), kids_over(2)], vec![kids_over(5)]],
            PredicateAction::HideBlock,
        );
        assert_eq!(grouped.format, PredicateFormat::OrOfSingleLayerAnds);
        assert_eq!(
            grouped.root_node,
            PredicateExpressionNode::or(vec![
                PredicateExpressionNode::and(vec![kids_over(1), kids_over(2)]),
                PredicateExpressionNode::and(vec![kids_over(5)]),
            ])
        );
        assert_eq!(grouped.question_ids(), vec![1]);
    }

    #[test]
    fn test_visibility_actions() {
        let (data, generator) = fixture();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        let show = PredicateDefinition::new(kids_over(2), PredicateAction::ShowBlock, PredicateFormat::SingleQuestion);
        let hide = PredicateDefinition::new(kids_over(2), PredicateAction::HideBlock, PredicateFormat::SingleQuestion);
        let eligible =
            PredicateDefinition::new(kids_over(5), PredicateAction::EligibleBlock, PredicateFormat::SingleQuestion);

        assert!(evaluator.evaluate_visibility(&show));
        assert!(!evaluator.evaluate_visibility(&hide));
        assert!(evaluator.evaluate_visibility(&eligible));
        assert!(evaluator.is_visible(None, &[]));
    }

    #[test]
    fn test_nested_visibility_hides() {
        let (data, generator) = fixture();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        let parent_hidden =
            PredicateDefinition::new(kids_over(2), PredicateAction::HideBlock, PredicateFormat::SingleQuestion);
        let shown = PredicateDefinition::new(kids_over(0), PredicateAction::ShowBlock, PredicateFormat::SingleQuestion);
        assert!(evaluator.is_visible(Some(&shown), &[]));
        assert!(!evaluator.is_visible(Some(&shown), &[parent_hidden]));
    }

    #[test]
    fn test_eligibility() {
        let (data, generator) = fixture();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        let needs_five =
            PredicateDefinition::new(kids_over(5), PredicateAction::EligibleBlock, PredicateFormat::SingleQuestion);
        assert!(evaluator.is_eligible(None));
        assert!(!evaluator.is_eligible(Some(&needs_five)));
        assert!(!evaluator.is_question_eligible(Some(&needs_five), 1));
        assert!(evaluator.is_question_eligible(Some(&needs_five), 7));
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::json!({
            "root_node": {"node_type": "CONSTANT", "value": true},
            "action": "HIDE_BLOCK",
            "format": "SINGLE_QUESTION"
        });
        let definition: PredicateDefinition = serde_json::from_value(json).unwrap();
        assert_eq!(definition.action, PredicateAction::HideBlock);
        assert_eq!(definition.root_node, PredicateExpressionNode::constant(true));
    }
}
