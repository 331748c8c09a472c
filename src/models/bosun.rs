use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag set identifying one result. Ordered, so iteration is by key.
pub type Group = BTreeMap<String, String>;

/// Envelope of `/api/expr`. `Results` is decoded according to `Type`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExprResponse {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(rename = "Results", default)]
    pub results: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeriesResult {
    #[serde(rename = "Group", default)]
    pub group: Group,
    /// Unix seconds (as string keys) → value, in the order bosun sent them.
    #[serde(rename = "Value", default)]
    pub value: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NumberResult {
    #[serde(rename = "Group", default)]
    pub group: Group,
    #[serde(rename = "Value", default)]
    pub value: serde_json::Value,
}

/// A stored annotation as returned by `/api/annotation/query`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnotationRecord {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// RFC 3339; parsed per record so one bad date only loses that record.
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub creation_user: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}
