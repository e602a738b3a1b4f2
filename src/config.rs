//! 配置模块，负责加载程序定义的JSON文件

use crate::ast::PredicateExpressionNode;
use crate::catalog::{QuestionDefinition, QuestionType};
use crate::date::DateConverter;
use crate::operator::{Operator, Scalar};
use crate::value::PredicateValue;
use crate::visibility::{PredicateAction, PredicateDefinition, PredicateFormat};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },
    #[error("cannot read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 一个区块及其可见性/资格谓词
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<PredicateDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<PredicateDefinition>,
}

/// 程序配置：可引用的问题、区块谓词，以及可选的固定 "今天"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramConfig {
    pub questions: Vec<QuestionDefinition>,
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
    /// 固定年龄谓词使用的日期；缺省时使用系统时钟
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub today: Option<NaiveDate>,
}

impl ProgramConfig {
    /// 从JSON文件加载程序配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound {
                path: path_ref.to_path_buf(),
            });
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_ref.to_path_buf(),
            source,
        })?;

        // 解析JSON
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    pub fn date_converter(&self) -> DateConverter {
        self.today
            .map_or_else(DateConverter::default, DateConverter::fixed)
    }

    pub fn question(&self, id: u64) -> Option<&QuestionDefinition> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// 创建示例配置（用于测试或fallback）
    pub fn sample() -> Self {
        let questions = vec![
            QuestionDefinition::new(1, "applicant address", QuestionType::Address),
            QuestionDefinition::new(2, "applicant birth date", QuestionType::Date),
            QuestionDefinition::new(3, "household size", QuestionType::Number),
            QuestionDefinition::new(4, "monthly income", QuestionType::Currency),
            QuestionDefinition::new(5, "current benefits", QuestionType::Checkbox),
        ];

        let household_over_one = PredicateExpressionNode::leaf(
            3,
            Scalar::Number,
            Operator::GreaterThan,
            PredicateValue::Long(1),
        );
        let income_under_limit = PredicateExpressionNode::leaf(
            4,
            Scalar::CurrencyCents,
            Operator::LessThan,
            PredicateValue::Long(300_000),
        );
        let in_seattle =
            PredicateExpressionNode::service_area(1, Operator::InServiceArea, "Seattle");

        let blocks = vec![
            BlockConfig {
                name: "household details".to_string(),
                visibility: Some(PredicateDefinition::new(
                    household_over_one,
                    PredicateAction::ShowBlock,
                    PredicateFormat::SingleQuestion,
                )),
                eligibility: None,
            },
            BlockConfig {
                name: "income".to_string(),
                visibility: None,
                eligibility: Some(PredicateDefinition::from_leaf_groups(
                    vec![vec![income_under_limit, in_seattle]],
                    PredicateAction::EligibleBlock,
                )),
            },
        ];

        Self {
            questions,
            blocks,
            today: None,
        }
    }
}
