use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Comparison applied by a single [`MetadataFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "nin")]
    Nin,
    #[serde(rename = "any")]
    Any,
    #[serde(rename = "all")]
    All,
    #[serde(rename = "text_match")]
    TextMatch,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "is_empty")]
    IsEmpty,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "==",
            FilterOperator::Ne => "!=",
            FilterOperator::Gt => ">",
            FilterOperator::Lt => "<",
            FilterOperator::Gte => ">=",
            FilterOperator::Lte => "<=",
            FilterOperator::In => "in",
            FilterOperator::Nin => "nin",
            FilterOperator::Any => "any",
            FilterOperator::All => "all",
            FilterOperator::TextMatch => "text_match",
            FilterOperator::Contains => "contains",
            FilterOperator::IsEmpty => "is_empty",
        }
    }
}

impl std::fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boolean combinator joining the filters of a [`MetadataFilters`] group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterCondition {
    And,
    Or,
    Not,
}

impl FilterCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterCondition::And => "and",
            FilterCondition::Or => "or",
            FilterCondition::Not => "not",
        }
    }
}

impl std::fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Predicate over one metadata key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub key: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
}

impl MetadataFilter {
    pub fn new(key: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(key, FilterOperator::Eq, value)
    }
}

/// Flat group of filters joined by a single condition. Nested groups are not
/// supported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilters {
    #[serde(default)]
    pub filters: Vec<MetadataFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<FilterCondition>,
}

impl MetadataFilters {
    pub fn new(filters: Vec<MetadataFilter>) -> Self {
        Self {
            filters,
            condition: None,
        }
    }

    pub fn with_condition(mut self, condition: FilterCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Validate a membership operand: an array of strings or numbers.
pub fn parse_array_value(value: &Value) -> Result<Vec<Value>, DomainError> {
    match value {
        Value::Array(items) if items.iter().all(|v| v.is_string() || v.is_number()) => {
            Ok(items.clone())
        }
        _ => Err(DomainError::invalid_input(
            "Value must be an array of strings or numbers",
        )),
    }
}
