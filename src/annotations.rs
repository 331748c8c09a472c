//! Annotation query encoding and bosun annotation → host event mapping.

use chrono::DateTime;

use crate::models::annotation::{AnnotationEvent, AnnotationFilter, AnnotationQueryOptions};
use crate::models::bosun::AnnotationRecord;

const URL_TEXT_LEN: usize = 50;

/// Query string for `/api/annotation/query`: the range in unix seconds,
/// then the non-empty filter fields.
pub fn query_string(options: &AnnotationQueryOptions) -> String {
    let start = options.range.from.timestamp().to_string();
    let end = options.range.to.timestamp().to_string();

    let mut params: Vec<(&str, &str)> =
        vec![("StartDate", start.as_str()), ("EndDate", end.as_str())];
    params.extend(options.annotation.params());

    params
        .into_iter()
        .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Form encoding: percent-encoding with spaces as `+`.
fn form_encode(s: &str) -> String {
    urlencoding::encode(s).replace("%20", "+")
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Map one stored annotation to a host event. Records without a usable
/// start date cannot be placed on the time axis and yield `None`.
pub fn to_event(
    record: &AnnotationRecord,
    filter: &AnnotationFilter,
    annotate_url: &str,
) -> Option<AnnotationEvent> {
    let Some(raw_start) = present(&record.start_date) else {
        tracing::warn!(id = ?record.id, "annotation without StartDate dropped");
        return None;
    };
    let start = match DateTime::parse_from_rfc3339(raw_start) {
        Ok(start) => start,
        Err(e) => {
            tracing::warn!(
                id = ?record.id,
                start_date = raw_start,
                "annotation with bad StartDate dropped: {e}"
            );
            return None;
        }
    };

    let mut lines = Vec::new();
    if let Some(source) = present(&record.source) {
        lines.push(format!("Source: {source}"));
    }
    if let Some(host) = present(&record.host) {
        lines.push(format!("Host: {host}"));
    }
    if let Some(user) = present(&record.creation_user) {
        lines.push(format!("User: {user}"));
    }
    if let Some(owner) = present(&record.owner) {
        lines.push(format!("Owner: {owner}"));
    }
    if let Some(url) = present(&record.url) {
        let shown: String = url.chars().take(URL_TEXT_LEN).collect();
        lines.push(format!(r#"<a href="{url}">{shown}</a>"#));
    }
    if let Some(message) = present(&record.message) {
        lines.push(message.to_string());
    }
    lines.push(format!(
        r#"<a href="{annotate_url}/annotation?id={}" target="_blank">Edit this annotation</a>"#,
        urlencoding::encode(record.id.as_deref().unwrap_or_default())
    ));

    Some(AnnotationEvent {
        annotation: filter.clone(),
        time: start.timestamp() * 1000,
        title: record.category.clone(),
        text: lines.join("<br>"),
    })
}
