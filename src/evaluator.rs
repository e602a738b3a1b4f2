//! Folds a predicate tree into a single boolean for one applicant.

use crate::ast::PredicateExpressionNode;
use crate::document::DataDocument;
use crate::generator::{InvalidPredicateError, JsonPathPredicateGenerator};
use crate::json_path::JsonPathPredicate;
use tracing::{debug, warn};

/// Outcome of one leaf, as recorded by [`PredicateEvaluator::evaluate_with_trace`].
#[derive(Debug, Clone, PartialEq)]
pub struct LeafTrace {
    pub question_id: u64,
    /// The compiled query, or the reason compilation failed.
    pub query: Result<String, InvalidPredicateError>,
    pub result: bool,
}

/// Evaluates predicate trees against a single applicant's data.
///
/// Holds no mutable state; one evaluator may be reused for any number of trees.
pub struct PredicateEvaluator<'a, D: DataDocument + ?Sized> {
    applicant_data: &'a D,
    generator: &'a JsonPathPredicateGenerator,
}

impl<'a, D: DataDocument + ?Sized> PredicateEvaluator<'a, D> {
    pub fn new(applicant_data: &'a D, generator: &'a JsonPathPredicateGenerator) -> Self {
        Self {
            applicant_data,
            generator,
        }
    }

    /// Evaluates the tree. Leaves whose query cannot be built are false.
    #[tracing::instrument(skip_all, level = "debug")]
    pub fn evaluate(&self, node: &PredicateExpressionNode) -> bool {
        self.fold(node, &mut |_: LeafTrace| {})
    }

    /// Like [`evaluate`](Self::evaluate), also returning the outcome of every leaf
    /// that was visited. `AND`/`OR` stop at the first deciding child.
    pub fn evaluate_with_trace(&self, node: &PredicateExpressionNode) -> (bool, Vec<LeafTrace>) {
        let mut trace: Vec<LeafTrace> = Vec::new();
        let result = self.fold(node, &mut |leaf: LeafTrace| trace.push(leaf));
        (result, trace)
    }

    fn fold(&self, node: &PredicateExpressionNode, record: &mut dyn FnMut(LeafTrace)) -> bool {
        match node {
            PredicateExpressionNode::LeafOperation(leaf) => {
                let compiled = self.generator.from_leaf_node(leaf);
                self.run_leaf(leaf.question_id, compiled, record)
            }
            PredicateExpressionNode::LeafAddressServiceArea(leaf) => {
                let compiled = self.generator.from_leaf_address_service_area_node(leaf);
                self.run_leaf(leaf.question_id, compiled, record)
            }
            PredicateExpressionNode::And { children } => {
                children.iter().all(|child| self.fold(child, record))
            }
            PredicateExpressionNode::Or { children } => {
                children.iter().any(|child| self.fold(child, record))
            }
            PredicateExpressionNode::Constant { value } => *value,
        }
    }

    fn run_leaf(
        &self,
        question_id: u64,
        compiled: Result<JsonPathPredicate, InvalidPredicateError>,
        record: &mut dyn FnMut(LeafTrace),
    ) -> bool {
        match compiled {
            Ok(predicate) => {
                let result = self.applicant_data.eval_predicate(&predicate);
                debug!(question_id, query = %predicate, result, "evaluated leaf");
                record(LeafTrace {
                    question_id,
                    query: Ok(predicate.path_predicate()),
                    result,
                });
                result
            }
            Err(err) => {
                warn!(question_id, error = %err, "predicate leaf is false");
                record(LeafTrace {
                    question_id,
                    query: Err(err),
                    result: false,
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{QuestionDefinition, QuestionType, RepeatedEntity};
    use crate::date::DateConverter;
    use crate::document::ApplicantData;
    use crate::operator::{Operator, Scalar};
    use crate::path::Path;
    use crate::value::PredicateValue;
    use chrono::NaiveDate;
    use serde_json::json;

    fn questions() -> Vec<QuestionDefinition> {
        vec![
            QuestionDefinition::new(1, "applicant address", QuestionType::Address),
            QuestionDefinition::new(2, "applicant birth date", QuestionType::Date),
            QuestionDefinition::new(3, "number of kids", QuestionType::Number),
            QuestionDefinition::new(4, "favorite colors", QuestionType::Checkbox),
        ]
    }

    fn generator() -> JsonPathPredicateGenerator {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        JsonPathPredicateGenerator::new(DateConverter::fixed(today), &questions(), None)
    }

    fn applicant() -> ApplicantData {
        let mut data = ApplicantData::new();
        data.put_string(&Path::parse("applicant.applicant_address.city"), "Seattle")
            .unwrap();
        data.put_date(&Path::parse("applicant.applicant_birth_date.date"), "2000-06-15")
            .unwrap();
        data.put_long(&Path::parse("applicant.number_of_kids.number"), 2)
            .unwrap();
        data.put_list_of_longs(&Path::parse("applicant.favorite_colors.selections"), &[1, 3])
            .unwrap();
        data
    }

    fn city_is(city: &str) -> PredicateExpressionNode {
        PredicateExpressionNode::leaf(1, Scalar::City, Operator::EqualTo, PredicateValue::string(city))
    }

    fn evaluate(node: &PredicateExpressionNode) -> bool {
        let data = applicant();
        let generator = generator();
        PredicateEvaluator::new(&data, &generator).evaluate(node)
    }

    #[test]
    fn test_leaf_against_document() {
        assert!(evaluate(&city_is("Seattle")));
        assert!(!evaluate(&city_is("Chicago")));
    }

    #[test]
    fn test_question_not_in_program_is_false() {
        let node =
            PredicateExpressionNode::leaf(42, Scalar::City, Operator::EqualTo, PredicateValue::string("Chicago"));
        assert!(!evaluate(&node));
        // Negation does not turn an unresolvable leaf into true.
        let negated = PredicateExpressionNode::leaf(
            42,
            Scalar::City,
            Operator::NotEqualTo,
            PredicateValue::string("Chicago"),
        );
        assert!(!evaluate(&negated));
    }

    #[test]
    fn test_and_or() {
        let t = city_is("Seattle");
        let f = city_is("Chicago");
        assert!(evaluate(&PredicateExpressionNode::and(vec![t.clone(), t.clone()])));
        assert!(!evaluate(&PredicateExpressionNode::and(vec![t.clone(), f.clone()])));
        assert!(!evaluate(&PredicateExpressionNode::or(vec![f.clone(), f.clone()])));
        assert!(evaluate(&PredicateExpressionNode::or(vec![f.clone(), t.clone()])));
    }

    #[test]
    fn test_nested_tree() {
        // OR(AND(A=true, B=false), C=true)
        let tree = PredicateExpressionNode::or(vec![
            PredicateExpressionNode::and(vec![city_is("Seattle"), city_is("Chicago")]),
            PredicateExpressionNode::leaf(3, Scalar::Number, Operator::EqualTo, PredicateValue::Long(2)),
        ]);
        assert!(evaluate(&tree));
    }

    #[test]
    fn test_empty_and_constants() {
        assert!(evaluate(&PredicateExpressionNode::and(vec![])));
        assert!(!evaluate(&PredicateExpressionNode::or(vec![])));
        assert!(evaluate(&PredicateExpressionNode::constant(true)));
        assert!(!evaluate(&PredicateExpressionNode::constant(false)));
    }

    #[test]
    fn test_idempotent() {
        let tree = PredicateExpressionNode::or(vec![city_is("Chicago"), city_is("Seattle")]);
        let data = applicant();
        let generator = generator();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        assert_eq!(evaluator.evaluate(&tree), evaluator.evaluate(&tree));
    }

    #[test]
    fn test_missing_answer_is_false() {
        let data = ApplicantData::new();
        let generator = generator();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        assert!(!evaluator.evaluate(&city_is("Seattle")));
        let not_chicago = PredicateExpressionNode::leaf(
            1,
            Scalar::City,
            Operator::NotEqualTo,
            PredicateValue::string("Chicago"),
        );
        assert!(!evaluator.evaluate(&not_chicago));
    }

    #[test]
    fn test_age_and_ranges() {
        // born 2000-06-15, today 2030-01-01: 29 years old
        let older = PredicateExpressionNode::leaf(2, Scalar::Date, Operator::AgeOlderThan, PredicateValue::Long(18));
        let younger =
            PredicateExpressionNode::leaf(2, Scalar::Date, Operator::AgeYoungerThan, PredicateValue::Long(18));
        let between =
            PredicateExpressionNode::leaf(2, Scalar::Date, Operator::AgeBetween, PredicateValue::PairOfLongs(25, 30));
        let kids =
            PredicateExpressionNode::leaf(3, Scalar::Number, Operator::Between, PredicateValue::PairOfLongs(0, 1));
        assert!(evaluate(&older));
        assert!(!evaluate(&younger));
        assert!(evaluate(&between));
        assert!(!evaluate(&kids));
    }

    #[test]
    fn test_multi_option_selections() {
        let any_of = PredicateExpressionNode::leaf(
            4,
            Scalar::Selections,
            Operator::AnyOf,
            PredicateValue::list_of_strings(["3", "5"]),
        );
        let subset_of = PredicateExpressionNode::leaf(
            4,
            Scalar::Selections,
            Operator::SubsetOf,
            PredicateValue::list_of_strings(["1", "3", "5"]),
        );
        let none_of = PredicateExpressionNode::leaf(
            4,
            Scalar::Selections,
            Operator::NoneOf,
            PredicateValue::list_of_strings(["1"]),
        );
        assert!(evaluate(&any_of));
        assert!(evaluate(&subset_of));
        assert!(!evaluate(&none_of));
    }

    #[test]
    fn test_incompatible_value_is_false() {
        let node = PredicateExpressionNode::leaf(1, Scalar::City, Operator::In, PredicateValue::string("Seattle"));
        assert!(!evaluate(&node));
    }

    #[test]
    fn test_service_area() {
        let data = ApplicantData::from_value(json!({
            "applicant": {
                "applicant_address": {
                    "city": "Seattle",
                    "service_areas": [
                        {"serviceAreaId": "Seattle", "state": "IN_AREA", "timestamp": 1},
                        {"serviceAreaId": "Tacoma", "state": "FAILED", "timestamp": 1}
                    ]
                }
            }
        }));
        let generator = generator();
        let evaluator = PredicateEvaluator::new(&data, &generator);
        let in_area = |id| PredicateExpressionNode::service_area(1, Operator::InServiceArea, id);
        let not_in_area = |id| PredicateExpressionNode::service_area(1, Operator::NotInServiceArea, id);
        assert!(evaluator.evaluate(&in_area("Seattle")));
        assert!(!evaluator.evaluate(&not_in_area("Seattle")));
        assert!(evaluator.evaluate(&in_area("Tacoma")));
        assert!(evaluator.evaluate(&not_in_area("Tacoma")));
        assert!(!evaluator.evaluate(&in_area("Portland")));
    }

    #[test]
    fn test_repeated_context() {
        let members =
            QuestionDefinition::new(10, "household members", QuestionType::Enumerator);
        let member_income =
            QuestionDefinition::new(11, "member income", QuestionType::Number).repeated_under(10);
        let mut data = ApplicantData::new();
        data.put_repeated_entities(&Path::parse("applicant.household_members[]"), &["Ann", "Bo"])
            .unwrap();
        data.put_long(&Path::parse("applicant.household_members[0].member_income.number"), 10)
            .unwrap();
        data.put_long(&Path::parse("applicant.household_members[1].member_income.number"), 500)
            .unwrap();

        let income_over_100 =
            PredicateExpressionNode::leaf(11, Scalar::Number, Operator::GreaterThan, PredicateValue::Long(100));
        let results: Vec<bool> = RepeatedEntity::create_repeated_entities(&members, None, &data)
            .into_iter()
            .map(|entity| {
                let generator = JsonPathPredicateGenerator::new(
                    DateConverter::default(),
                    &[members.clone(), member_income.clone()],
                    Some(entity),
                );
                PredicateEvaluator::new(&data, &generator).evaluate(&income_over_100)
            })
            .collect();
        assert_eq!(results, vec![false, true]);

        let entity_named_bo = PredicateExpressionNode::leaf(
            10,
            Scalar::EntityName,
            Operator::EqualTo,
            PredicateValue::string("Bo"),
        );
        let generator =
            JsonPathPredicateGenerator::new(DateConverter::default(), &[members.clone()], None);
        assert!(PredicateEvaluator::new(&data, &generator).evaluate(&entity_named_bo));
    }

    #[test]
    fn test_trace() {
        let tree = PredicateExpressionNode::or(vec![
            PredicateExpressionNode::leaf(42, Scalar::City, Operator::EqualTo, PredicateValue::string("x")),
            city_is("Seattle"),
        ]);
        let data = applicant();
        let generator = generator();
        let (result, trace) = PredicateEvaluator::new(&data, &generator).evaluate_with_trace(&tree);
        assert!(result);
        assert_eq!(trace.len(), 2);
        assert_eq!(
            trace[0].query,
            Err(InvalidPredicateError::QuestionNotFound { question_id: 42 })
        );
        assert_eq!(
            trace[1].query.as_deref(),
            Ok("$.applicant.applicant_address[?(@.city == \"Seattle\")]")
        );
        assert!(trace[1].result);
    }

    #[test]
    fn test_trait_object_document() {
        let data = applicant();
        let document: &dyn DataDocument = &data;
        let generator = generator();
        assert!(PredicateEvaluator::new(document, &generator).evaluate(&city_is("Seattle")));
    }
}
