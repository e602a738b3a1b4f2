//! In-scope question definitions and repeated-entity contexts.

use crate::document::ApplicantData;
use crate::operator::Scalar;
use crate::path::Path;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Address,
    Checkbox,
    Currency,
    Date,
    Dropdown,
    Email,
    Enumerator,
    FileUpload,
    Id,
    Name,
    Number,
    Phone,
    RadioButton,
    Static,
    Text,
}

impl QuestionType {
    /// Scalars an admin may reference in a predicate on this question type.
    pub fn scalars(self) -> &'static [Scalar] {
        match self {
            QuestionType::Address => &[
                Scalar::Street,
                Scalar::Line2,
                Scalar::City,
                Scalar::State,
                Scalar::Zip,
                Scalar::ServiceAreas,
            ],
            QuestionType::Checkbox => &[Scalar::Selections],
            QuestionType::Currency => &[Scalar::CurrencyCents],
            QuestionType::Date => &[Scalar::Date],
            QuestionType::Dropdown | QuestionType::RadioButton => &[Scalar::Selection],
            QuestionType::Email => &[Scalar::Email],
            QuestionType::Enumerator => &[Scalar::EntityName],
            QuestionType::Id => &[Scalar::Id],
            QuestionType::Name => &[
                Scalar::FirstName,
                Scalar::MiddleName,
                Scalar::LastName,
                Scalar::NameSuffix,
            ],
            QuestionType::Number => &[Scalar::Number],
            QuestionType::Phone => &[Scalar::PhoneNumber, Scalar::CountryCode],
            QuestionType::Text => &[Scalar::Text],
            QuestionType::FileUpload | QuestionType::Static => &[],
        }
    }

    pub fn is_multi_option(self) -> bool {
        matches!(
            self,
            QuestionType::Checkbox | QuestionType::Dropdown | QuestionType::RadioButton
        )
    }
}

/// The parts of a question definition the engine needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDefinition {
    pub id: u64,
    pub name: String,
    pub question_type: QuestionType,
    /// Set when this question is repeated once per entity of an enumerator question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enumerator_id: Option<u64>,
}

impl QuestionDefinition {
    pub fn new(id: u64, name: impl Into<String>, question_type: QuestionType) -> Self {
        Self {
            id,
            name: name.into(),
            question_type,
            enumerator_id: None,
        }
    }

    pub fn repeated_under(mut self, enumerator_id: u64) -> Self {
        self.enumerator_id = Some(enumerator_id);
        self
    }

    pub fn is_enumerator(&self) -> bool {
        self.question_type == QuestionType::Enumerator
    }

    pub fn is_repeated(&self) -> bool {
        self.enumerator_id.is_some()
    }

    /// The question name with everything but ASCII letters and spaces dropped, and
    /// whitespace turned into underscores.
    pub fn question_name_key(&self) -> String {
        self.name
            .chars()
            .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
            .map(|c| if c == ' ' { '_' } else { c })
            .collect()
    }

    /// The path segment this question's answer lives under. Enumerators are arrays.
    pub fn question_path_segment(&self) -> String {
        let key = self.question_name_key();
        if self.is_enumerator() {
            format!("{}{}", key, Path::ARRAY_SUFFIX)
        } else {
            key
        }
    }

    /// The path of this question's answer within a repeated context, or under
    /// `default_root` when there is none.
    pub fn contextualized_path(
        &self,
        repeated_entity: Option<&RepeatedEntity>,
        default_root: &Path,
    ) -> Path {
        let root = match repeated_entity {
            Some(entity) => entity.contextualized_path(),
            None => default_root.clone(),
        };
        root.join(&self.question_path_segment())
    }
}

/// One entity of an enumerator question, e.g. the second household member.
#[derive(Debug, Clone, PartialEq)]
pub struct RepeatedEntity {
    enumerator: QuestionDefinition,
    index: usize,
    entity_name: String,
    parent: Option<Arc<RepeatedEntity>>,
}

impl RepeatedEntity {
    pub fn new(
        enumerator: QuestionDefinition,
        index: usize,
        entity_name: impl Into<String>,
        parent: Option<Arc<RepeatedEntity>>,
    ) -> Self {
        Self {
            enumerator,
            index,
            entity_name: entity_name.into(),
            parent,
        }
    }

    /// One entity per name stored under the enumerator's path.
    pub fn create_repeated_entities(
        enumerator: &QuestionDefinition,
        parent: Option<Arc<RepeatedEntity>>,
        data: &ApplicantData,
    ) -> Vec<RepeatedEntity> {
        let path = enumerator.contextualized_path(parent.as_deref(), &Path::applicant());
        data.read_repeated_entities(&path)
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                RepeatedEntity::new(enumerator.clone(), index, name, parent.clone())
            })
            .collect()
    }

    pub fn enumerator_question(&self) -> &QuestionDefinition {
        &self.enumerator
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    pub fn parent(&self) -> Option<&RepeatedEntity> {
        self.parent.as_deref()
    }

    /// e.g. `applicant.household_members[1]`
    pub fn contextualized_path(&self) -> Path {
        let enumerator_path = self
            .enumerator
            .contextualized_path(self.parent(), &Path::applicant());
        enumerator_path
            .at_index(self.index)
            .unwrap_or(enumerator_path)
    }
}
