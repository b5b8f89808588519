//! Translation of [`MetadataFilters`] into Data API filter documents.

use serde_json::{Map, Value};

use super::data_api::JsonDocument;
use crate::domain::{
    parse_array_value, DomainError, FilterCondition, FilterOperator, MetadataFilter,
    MetadataFilters,
};

/// Build the Data API filter for a filter group. An absent or empty group
/// yields `{}`, which matches every document.
pub fn to_astra_filter(filters: Option<&MetadataFilters>) -> Result<JsonDocument, DomainError> {
    let filters = match filters {
        Some(filters) if !filters.is_empty() => filters,
        _ => return Ok(Map::new()),
    };

    let combinator = match filters.condition.unwrap_or(FilterCondition::And) {
        FilterCondition::And => "$and",
        FilterCondition::Or => "$or",
        other => return Err(DomainError::unsupported_condition(other.as_str())),
    };

    let items = filters
        .filters
        .iter()
        .map(|filter| build_filter_item(filter).map(Value::Object))
        .collect::<Result<Vec<_>, _>>()?;

    let mut filter = Map::new();
    filter.insert(combinator.to_string(), Value::Array(items));
    Ok(filter)
}

fn build_filter_item(filter: &MetadataFilter) -> Result<JsonDocument, DomainError> {
    let MetadataFilter {
        key,
        operator,
        value,
    } = filter;

    let condition = match operator {
        FilterOperator::Eq => value.clone(),
        FilterOperator::Ne => field_operator("$ne", value.clone()),
        FilterOperator::Gt => field_operator("$gt", value.clone()),
        FilterOperator::Lt => field_operator("$lt", value.clone()),
        FilterOperator::Gte => field_operator("$gte", value.clone()),
        FilterOperator::Lte => field_operator("$lte", value.clone()),
        FilterOperator::In => field_operator("$in", Value::Array(parse_array_value(value)?)),
        FilterOperator::Nin => field_operator("$nin", Value::Array(parse_array_value(value)?)),
        FilterOperator::IsEmpty => field_operator("$size", Value::from(0)),
        other => return Err(DomainError::unsupported_operator(other.as_str())),
    };

    let mut item = Map::new();
    item.insert(key.clone(), condition);
    Ok(item)
}

fn field_operator(operator: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(operator.to_string(), value);
    Value::Object(map)
}
