use futures_util::future::try_join_all;
use std::sync::Arc;

use crate::annotations;
use crate::backend::{BackendRequest, BackendSrv};
use crate::error::{DatasourceError, Result};
use crate::models::annotation::{AnnotationEvent, AnnotationQueryOptions};
use crate::models::bosun::{AnnotationRecord, ExprResponse, NumberResult, SeriesResult};
use crate::models::frame::{DataItem, DatasourceStatus, QueryResponse, Table, TimeSeries};
use crate::models::query::{QueryOptions, Target};
use crate::template::TemplateSrv;
use crate::transform;

/// Instance settings the host hands the datasource.
#[derive(Debug, Clone, Default)]
pub struct DatasourceSettings {
    pub name: String,
    pub kind: String,
    /// Bosun API base, e.g. `http://bosun:8070`.
    pub url: String,
    /// Bosun UI base used for "Edit this annotation" links.
    pub annotate_url: String,
}

pub struct BosunDatasource {
    settings: DatasourceSettings,
    backend: Arc<dyn BackendSrv>,
    templates: Arc<dyn TemplateSrv>,
}

impl BosunDatasource {
    pub fn new(
        settings: DatasourceSettings,
        backend: Arc<dyn BackendSrv>,
        templates: Arc<dyn TemplateSrv>,
    ) -> Self {
        Self {
            settings,
            backend,
            templates,
        }
    }

    pub fn settings(&self) -> &DatasourceSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.settings.url.trim_end_matches('/'))
    }

    /// Resolve every active target to the expression sent to bosun, keeping
    /// each paired with its target.
    pub fn build_queries<'a>(&self, options: &'a QueryOptions) -> Vec<(String, &'a Target)> {
        // Bosun evaluates relative to `time`, i.e. range.to, so $start is
        // the range width back from there.
        let seconds_ago = format!("{}s", options.range.seconds());

        options
            .targets
            .iter()
            .filter(|target| target.is_active())
            .map(|target| {
                let query = self
                    .templates
                    .replace(&target.expr, &options.scoped_vars)
                    .replace("$start", &seconds_ago)
                    .replace("$ds", &options.interval);
                (query, target)
            })
            .collect()
    }

    pub async fn query(&self, options: &QueryOptions) -> Result<QueryResponse> {
        let queries = self.build_queries(options);

        // Nothing to ask bosun, skip the round trip.
        if queries.is_empty() {
            return Ok(QueryResponse::default());
        }

        tracing::debug!(count = queries.len(), "running bosun expressions");

        let responses = try_join_all(
            queries
                .into_iter()
                .map(|(query, target)| self.perform_time_series_query(query, target, options)),
        )
        .await?;

        Ok(QueryResponse {
            data: responses.into_iter().flatten().collect(),
        })
    }

    async fn perform_time_series_query(
        &self,
        query: String,
        target: &Target,
        options: &QueryOptions,
    ) -> Result<Vec<DataItem>> {
        let to = options.range.to;
        let url = format!(
            "{}?date={}&time={}",
            self.endpoint("/api/expr"),
            urlencoding::encode(&to.format("%Y-%m-%d").to_string()),
            urlencoding::encode(&to.format("%H:%M:%S").to_string()),
        );

        let response = self
            .backend
            .datasource_request(BackendRequest::post(url.clone(), query))
            .await?;
        if !response.is_ok() {
            return Err(DatasourceError::UnexpectedStatus {
                status: response.status,
                url,
            });
        }

        let expr: ExprResponse = serde_json::from_value(response.data)?;
        let items = match expr.kind.as_str() {
            "series" => {
                let results: Vec<SeriesResult> = decode_results(expr.results)?;
                results
                    .iter()
                    .map(|r| DataItem::Series(self.transform_metric_data(r, target, options)))
                    .collect()
            }
            "number" => {
                let results: Vec<NumberResult> = decode_results(expr.results)?;
                vec![DataItem::Table(self.make_table(&results))]
            }
            other => {
                tracing::warn!(
                    ref_id = ?target.ref_id,
                    result_type = other,
                    "unsupported bosun result type, no data returned"
                );
                Vec::new()
            }
        };
        Ok(items)
    }

    pub fn make_table(&self, results: &[NumberResult]) -> Table {
        transform::make_table(results)
    }

    pub fn transform_metric_data(
        &self,
        result: &SeriesResult,
        target: &Target,
        options: &QueryOptions,
    ) -> TimeSeries {
        transform::transform_metric_data(self.templates.as_ref(), result, target, options)
    }

    pub async fn annotation_query(
        &self,
        options: &AnnotationQueryOptions,
    ) -> Result<Vec<AnnotationEvent>> {
        let url = format!(
            "{}?{}",
            self.endpoint("/api/annotation/query"),
            annotations::query_string(options)
        );

        let response = self
            .backend
            .datasource_request(BackendRequest::get(url.clone()))
            .await?;
        if !response.is_ok() {
            return Err(DatasourceError::UnexpectedStatus {
                status: response.status,
                url,
            });
        }

        let records: Vec<AnnotationRecord> = decode_results(response.data)?;
        let annotate_url = self.settings.annotate_url.trim_end_matches('/');
        Ok(records
            .iter()
            .filter_map(|r| annotations::to_event(r, &options.annotation, annotate_url))
            .collect())
    }

    pub async fn test_datasource(&self) -> Result<DatasourceStatus> {
        let url = self.endpoint("/");
        let response = self
            .backend
            .datasource_request(BackendRequest::get(url.clone()))
            .await?;
        if response.is_ok() {
            Ok(DatasourceStatus::success())
        } else {
            Err(DatasourceError::UnexpectedStatus {
                status: response.status,
                url,
            })
        }
    }
}

/// Bosun sends `null` for an empty result list.
fn decode_results<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<Vec<T>> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResponse, Method};
    use crate::models::annotation::AnnotationFilter;
    use crate::models::frame::{Cell, Column};
    use crate::template::VariableTemplate;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Canned bosun. POSTs are answered by body, GETs by path.
    #[derive(Default)]
    struct FakeBackend {
        routes: HashMap<String, (u16, Value, u64)>,
        requests: Mutex<Vec<BackendRequest>>,
    }

    impl FakeBackend {
        fn route(mut self, key: &str, status: u16, data: Value) -> Self {
            self.routes.insert(key.to_string(), (status, data, 0));
            self
        }

        fn slow_route(mut self, key: &str, delay_ms: u64, data: Value) -> Self {
            self.routes.insert(key.to_string(), (200, data, delay_ms));
            self
        }

        fn requests(&self) -> Vec<BackendRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BackendSrv for FakeBackend {
        async fn datasource_request(&self, request: BackendRequest) -> Result<BackendResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let key = match request.method {
                Method::Post => request.body.clone().unwrap_or_default(),
                Method::Get => request
                    .url
                    .split('?')
                    .next()
                    .unwrap_or_default()
                    .trim_start_matches("http://bosun")
                    .to_string(),
            };
            let (status, data, delay) = self
                .routes
                .get(&key)
                .cloned()
                .unwrap_or((404, Value::Null, 0));
            if delay > 0 {
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
            Ok(BackendResponse { status, data })
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl BackendSrv for FailingBackend {
        async fn datasource_request(&self, request: BackendRequest) -> Result<BackendResponse> {
            Err(DatasourceError::Transport {
                url: request.url,
                message: "connection refused".into(),
            })
        }
    }

    fn settings() -> DatasourceSettings {
        DatasourceSettings {
            name: "bosun".into(),
            kind: "bosun-datasource".into(),
            url: "http://bosun".into(),
            annotate_url: "http://bosun-ui/".into(),
        }
    }

    fn datasource(backend: Arc<dyn BackendSrv>) -> BosunDatasource {
        BosunDatasource::new(settings(), backend, Arc::new(VariableTemplate::default()))
    }

    fn options(targets: Value) -> QueryOptions {
        serde_json::from_value(json!({
            "range": { "from": "2024-03-01T10:00:00Z", "to": "2024-03-01T10:02:00Z" },
            "interval": "1m",
            "scopedVars": { "host": { "value": "web01" } },
            "targets": targets
        }))
        .unwrap()
    }

    fn series(host: &str, ts: &str, v: i64) -> Value {
        let mut values = serde_json::Map::new();
        values.insert(ts.to_string(), json!(v));
        json!({
            "Type": "series",
            "Results": [{ "Group": { "host": host }, "Value": values }]
        })
    }

    #[test]
    fn build_queries_substitutes_variables() {
        let ds = datasource(Arc::new(FakeBackend::default()));
        let opts = options(json!([
            { "refId": "A", "expr": "q(\"avg:os.cpu{host=$host}\", \"$start\", \"\") $ds" }
        ]));
        let queries = ds.build_queries(&opts);
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].0, "q(\"avg:os.cpu{host=web01}\", \"120s\", \"\") 1m");
        assert_eq!(queries[0].1.ref_id.as_deref(), Some("A"));
    }

    #[test]
    fn build_queries_replaces_every_occurrence() {
        let ds = datasource(Arc::new(FakeBackend::default()));
        let opts = options(json!([{ "expr": "$start $start $ds $ds" }]));
        assert_eq!(ds.build_queries(&opts)[0].0, "120s 120s 1m 1m");
    }

    #[tokio::test]
    async fn no_active_targets_skips_backend() {
        let backend = Arc::new(FakeBackend::default());
        let ds = datasource(backend.clone());

        let resp = ds
            .query(&options(json!([{ "expr": "x", "hide": true }, { "expr": "" }])))
            .await
            .unwrap();
        assert!(resp.data.is_empty());

        let resp = ds.query(&options(json!([]))).await.unwrap();
        assert!(resp.data.is_empty());
        assert!(backend.requests().is_empty());
    }

    #[tokio::test]
    async fn one_post_per_active_target() {
        let backend = Arc::new(
            FakeBackend::default()
                .route("a", 200, series("h1", "1", 1))
                .route("c", 200, series("h3", "3", 3)),
        );
        let ds = datasource(backend.clone());
        ds.query(&options(json!([
            { "expr": "a" },
            { "expr": "b", "hide": true },
            { "expr": "c" }
        ])))
        .await
        .unwrap();

        let requests = backend.requests();
        assert_eq!(requests.len(), 2);
        for req in &requests {
            assert_eq!(req.method, Method::Post);
            assert_eq!(
                req.url,
                "http://bosun/api/expr?date=2024-03-01&time=10%3A02%3A00"
            );
        }
        let mut bodies: Vec<_> = requests.iter().filter_map(|r| r.body.clone()).collect();
        bodies.sort();
        assert_eq!(bodies, vec!["a", "c"]);
    }

    #[tokio::test]
    async fn results_follow_target_order() {
        let backend = Arc::new(
            FakeBackend::default()
                .slow_route("first", 80, series("h1", "1", 1))
                .slow_route("second", 0, series("h2", "2", 2)),
        );
        let ds = datasource(backend);
        let resp = ds
            .query(&options(json!([{ "expr": "first" }, { "expr": "second" }])))
            .await
            .unwrap();

        let labels: Vec<&str> = resp
            .data
            .iter()
            .map(|d| match d {
                DataItem::Series(s) => s.target.as_str(),
                DataItem::Table(_) => panic!("expected series"),
            })
            .collect();
        assert_eq!(labels, vec!["{host=h1}", "{host=h2}"]);
    }

    #[tokio::test]
    async fn hidden_target_does_not_shift_aliases() {
        let backend = Arc::new(FakeBackend::default().route("b", 200, series("h2", "2", 2)));
        let ds = datasource(backend);
        let resp = ds
            .query(&options(json!([
                { "expr": "a", "hide": true, "alias": "wrong $tag_host" },
                { "expr": "b", "alias": "right $tag_host" }
            ])))
            .await
            .unwrap();
        match &resp.data[0] {
            DataItem::Series(s) => {
                assert_eq!(s.target, "right h2");
                assert_eq!(s.datapoints, vec![(json!(2), 2000)]);
            }
            DataItem::Table(_) => panic!("expected series"),
        }
    }

    #[tokio::test]
    async fn number_results_become_one_table() {
        let backend = Arc::new(FakeBackend::default().route(
            "n",
            200,
            json!({
                "Type": "number",
                "Results": [
                    { "Group": { "a": "1", "b": "2" }, "Value": 5 },
                    { "Group": { "a": "3" }, "Value": 6 }
                ],
                "Queries": {}
            }),
        ));
        let ds = datasource(backend);
        let resp = ds.query(&options(json!([{ "expr": "n" }]))).await.unwrap();
        assert_eq!(resp.data.len(), 1);
        match &resp.data[0] {
            DataItem::Table(t) => {
                assert_eq!(
                    t.columns,
                    vec![Column::new("a"), Column::new("b"), Column::new("value")]
                );
                assert_eq!(t.rows[1][1], Cell::Absent);
            }
            DataItem::Series(_) => panic!("expected table"),
        }
    }

    #[tokio::test]
    async fn null_results_and_unknown_types_yield_no_series() {
        let backend = Arc::new(
            FakeBackend::default()
                .route("empty", 200, json!({ "Type": "series", "Results": null }))
                .route("odd", 200, json!({ "Type": "string", "Results": ["x"] })),
        );
        let ds = datasource(backend);
        let resp = ds
            .query(&options(json!([{ "expr": "empty" }, { "expr": "odd" }])))
            .await
            .unwrap();
        assert!(resp.data.is_empty());
    }

    #[tokio::test]
    async fn any_failed_target_fails_the_query() {
        let backend = Arc::new(
            FakeBackend::default()
                .route("ok", 200, series("h1", "1", 1))
                .route("bad", 500, json!({ "error": "parse error" })),
        );
        let ds = datasource(backend);
        let err = ds
            .query(&options(json!([{ "expr": "ok" }, { "expr": "bad" }])))
            .await
            .unwrap_err();
        assert!(matches!(err, DatasourceError::UnexpectedStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn malformed_expr_response_is_a_decode_error() {
        let backend = Arc::new(FakeBackend::default().route(
            "x",
            200,
            json!({ "Type": "number", "Results": "nope" }),
        ));
        let ds = datasource(backend);
        let err = ds.query(&options(json!([{ "expr": "x" }]))).await.unwrap_err();
        assert!(matches!(err, DatasourceError::Decode(_)));
    }

    #[tokio::test]
    async fn annotation_query_maps_records() {
        let backend = Arc::new(FakeBackend::default().route(
            "/api/annotation/query",
            200,
            json!([
                {
                    "Id": "a1",
                    "Host": "web01",
                    "Category": "deploy",
                    "StartDate": "2024-03-01T10:01:00Z"
                },
                { "Id": "a2" }
            ]),
        ));
        let ds = datasource(backend.clone());
        let filter = AnnotationFilter {
            host: Some("web01".into()),
            ..Default::default()
        };
        let events = ds
            .annotation_query(&AnnotationQueryOptions {
                range: options(json!([])).range,
                annotation: filter.clone(),
            })
            .await
            .unwrap();

        assert_eq!(
            backend.requests()[0].url,
            "http://bosun/api/annotation/query?StartDate=1709287200&EndDate=1709287320&Host=web01"
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, 1_709_287_260_000);
        assert_eq!(events[0].annotation, filter);
        assert_eq!(
            events[0].text,
            "Host: web01<br><a href=\"http://bosun-ui/annotation?id=a1\" target=\"_blank\">Edit this annotation</a>"
        );
    }

    #[tokio::test]
    async fn bad_annotation_record_does_not_sink_the_batch() {
        let backend = Arc::new(FakeBackend::default().route(
            "/api/annotation/query",
            200,
            json!([
                { "Id": "a", "StartDate": "not a date", "EndDate": "" },
                { "Id": "b", "StartDate": "2024-03-01T10:01:00Z", "EndDate": "" }
            ]),
        ));
        let ds = datasource(backend);
        let events = ds
            .annotation_query(&AnnotationQueryOptions {
                range: options(json!([])).range,
                annotation: AnnotationFilter::default(),
            })
            .await
            .unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].text.contains("annotation?id=b"));
    }

    #[tokio::test]
    async fn annotation_query_surfaces_status() {
        let ds = datasource(Arc::new(FakeBackend::default()));
        let err = ds
            .annotation_query(&AnnotationQueryOptions {
                range: options(json!([])).range,
                annotation: AnnotationFilter::default(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DatasourceError::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_datasource_success_and_failure() {
        let ok = datasource(Arc::new(FakeBackend::default().route(
            "/",
            200,
            json!("<html></html>"),
        )));
        assert_eq!(ok.test_datasource().await.unwrap(), DatasourceStatus::success());

        let down = datasource(Arc::new(FailingBackend));
        let err = down.test_datasource().await.unwrap_err();
        assert!(matches!(err, DatasourceError::Transport { .. }));
    }
}
