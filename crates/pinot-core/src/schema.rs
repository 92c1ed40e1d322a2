use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A Pinot schema: the dimension, metric and time columns of a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaDocument {
    pub schema_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_column_based_null_handling: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dimension_field_specs: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metric_field_specs: Vec<FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_time_field_specs: Vec<DateTimeFieldSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_value_field: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_null_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeFieldSpec {
    pub name: String,
    pub data_type: String,
    pub format: String,
    pub granularity: String,
}

impl SchemaDocument {
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
