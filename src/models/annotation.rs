use serde::{Deserialize, Serialize};

use super::query::TimeRange;

/// Annotation definition configured in the host. Only the bosun filter
/// fields are interpreted; everything else is carried back untouched on
/// each event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnotationFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AnnotationFilter {
    /// Query parameters for `/api/annotation/query`, in bosun's order.
    /// Empty fields are left out.
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        [
            ("Source", &self.source),
            ("Host", &self.host),
            ("CreationUser", &self.creation_user),
            ("Owner", &self.owner),
            ("Category", &self.category),
            ("Url", &self.url),
            ("Message", &self.message),
        ]
        .into_iter()
        .filter_map(|(key, value)| match value.as_deref() {
            Some(v) if !v.is_empty() => Some((key, v)),
            _ => None,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationQueryOptions {
    pub range: TimeRange,
    #[serde(default)]
    pub annotation: AnnotationFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnotationEvent {
    pub annotation: AnnotationFilter,
    /// Unix milliseconds.
    pub time: i64,
    pub title: Option<String>,
    /// `<br>`-joined HTML lines.
    pub text: String,
}
