use async_trait::async_trait;
use std::time::Duration;

use crate::error::{DatasourceError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<String>,
}

impl BackendRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body.into()),
        }
    }
}

/// Completed exchange. `data` is the JSON body, or the raw text as a JSON
/// string when the body is not JSON (bosun's index page is HTML).
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub data: serde_json::Value,
}

impl BackendResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// HTTP executor the datasource sends every bosun request through.
#[async_trait]
pub trait BackendSrv: Send + Sync {
    async fn datasource_request(&self, request: BackendRequest) -> Result<BackendResponse>;
}

/// `BackendSrv` over a shared reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestBackend {
    client: reqwest::Client,
}

impl ReqwestBackend {
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| DatasourceError::Transport {
            url: String::new(),
            message: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl BackendSrv for ReqwestBackend {
    async fn datasource_request(&self, request: BackendRequest) -> Result<BackendResponse> {
        let url = reqwest::Url::parse(&request.url)
            .map_err(|e| DatasourceError::InvalidRequest(format!("bad url '{}': {e}", request.url)))?;

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };
        let builder = match request.body {
            Some(body) => builder.body(body),
            None => builder,
        };

        let transport_err = |e: reqwest::Error| DatasourceError::Transport {
            url: request.url.clone(),
            message: e.to_string(),
        };
        let resp = builder.send().await.map_err(transport_err)?;
        let status = resp.status().as_u16();
        let text = resp.text().await.map_err(transport_err)?;

        let data = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text))
        };

        tracing::debug!(method = ?request.method, url = %request.url, status, "bosun request done");
        Ok(BackendResponse { status, data })
    }
}
