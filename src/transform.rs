//! Bosun result → host data model.

use crate::models::bosun::{NumberResult, SeriesResult};
use crate::models::frame::{Cell, Column, Table, TimeSeries};
use crate::models::query::{QueryOptions, ScopedVar, Target};
use crate::template::TemplateSrv;

/// Scalar results as one table: sorted tag columns taken from the first
/// result, then `value`.
pub fn make_table(results: &[NumberResult]) -> Table {
    let Some(first) = results.first() else {
        return Table::empty();
    };

    // Group is a BTreeMap, so its keys are already sorted.
    let tag_keys: Vec<&String> = first.group.keys().collect();

    let mut table = Table::empty();
    table.columns = tag_keys
        .iter()
        .map(|key| Column::new(key.as_str()))
        .chain(std::iter::once(Column::new("value")))
        .collect();

    table.rows = results
        .iter()
        .map(|res| {
            tag_keys
                .iter()
                .map(|key| match res.group.get(*key) {
                    Some(v) => Cell::Tag(v.clone()),
                    None => Cell::Absent,
                })
                .chain(std::iter::once(Cell::Value(res.value.clone())))
                .collect()
        })
        .collect();

    table
}

/// Label a series and convert its `Value` map into `[value, ms]` pairs.
pub fn transform_metric_data(
    templates: &dyn TemplateSrv,
    result: &SeriesResult,
    target: &Target,
    options: &QueryOptions,
) -> TimeSeries {
    let label = match target.alias.as_deref() {
        Some(alias) if !alias.is_empty() => {
            let mut scoped_vars = options.scoped_vars.clone();
            for (key, value) in &result.group {
                scoped_vars.insert(format!("tag_{key}"), ScopedVar::new(value.clone()));
            }
            templates.replace(alias, &scoped_vars)
        }
        _ => series_label(result),
    };

    let datapoints = result
        .value
        .iter()
        .filter_map(|(ts, v)| {
            match ts.parse::<i64>().ok().and_then(|secs| secs.checked_mul(1000)) {
                Some(ms) => Some((v.clone(), ms)),
                None => {
                    tracing::debug!(timestamp = %ts, "skipping datapoint with unusable timestamp");
                    None
                }
            }
        })
        .collect();

    TimeSeries {
        target: label,
        datapoints,
    }
}

/// `{k1=v1, k2=v2}` in key order.
fn series_label(result: &SeriesResult) -> String {
    let tags: Vec<String> = result
        .group
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    format!("{{{}}}", tags.join(", "))
}
