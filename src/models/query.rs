use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One panel-level query as the host submits it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    /// Bosun expression, may contain template variables plus `$start` / `$ds`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub expr: String,
    /// Legend template; `$tag_<key>` resolves to the series' tag values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub hide: bool,
}

/// Hosts send explicit `null` for unset fields; treat it like a missing one.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Target {
    pub fn is_active(&self) -> bool {
        !self.hide && !self.expr.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    /// Width of the range in whole seconds, truncated toward zero.
    pub fn seconds(&self) -> i64 {
        (self.to - self.from).num_seconds()
    }
}

/// A template variable visible to substitution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedVar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ScopedVar {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            text: None,
            value: serde_json::Value::String(value.into()),
        }
    }

    /// Value rendered the way it is spliced into a template: lists are
    /// comma-joined, null renders empty.
    pub fn render(&self) -> String {
        render_value(&self.value)
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    }
}

pub type ScopedVars = BTreeMap<String, ScopedVar>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOptions {
    pub range: TimeRange,
    #[serde(default)]
    pub scoped_vars: ScopedVars,
    /// Requested resolution, e.g. `1m`; spliced into `$ds`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub interval: String,
    #[serde(default)]
    pub targets: Vec<Target>,
}
