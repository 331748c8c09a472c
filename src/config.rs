use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::datasource::DatasourceSettings;

/// Top-level config loaded from `bosun-datasource.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(rename = "type", default = "default_type")]
    pub kind: String,
    /// Bosun API base URL.
    #[serde(default = "default_url")]
    pub url: String,
    /// Bosun UI base URL for annotation edit links. Defaults to `url`.
    #[serde(default)]
    pub annotate_url: Option<String>,
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
    /// HTTP timeout for bosun requests. 0 = no timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Instance-level template variables, visible to every query.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
}

fn default_name() -> String {
    "bosun".to_string()
}

fn default_type() -> String {
    "bosun-datasource".to_string()
}

fn default_url() -> String {
    "http://localhost:8070".to_string()
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3001))
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            kind: default_type(),
            url: default_url(),
            annotate_url: None,
            listen_addr: default_listen_addr(),
            timeout_secs: default_timeout_secs(),
            variables: BTreeMap::new(),
        }
    }
}

impl DatasourceConfig {
    /// Load config from a TOML file. Returns defaults if the file doesn't exist.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("config file not found at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        let config = Self::parse(&contents)?;
        tracing::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `BOSUN_URL`, `BOSUN_ANNOTATE_URL` and `BOSUN_DATASOURCE_LISTEN`.
    pub fn apply_env(mut self) -> anyhow::Result<Self> {
        self.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(url) = lookup("BOSUN_URL") {
            self.url = url;
        }
        if let Some(url) = lookup("BOSUN_ANNOTATE_URL") {
            self.annotate_url = Some(url);
        }
        if let Some(addr) = lookup("BOSUN_DATASOURCE_LISTEN") {
            self.listen_addr = addr
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid BOSUN_DATASOURCE_LISTEN '{addr}': {e}"))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }

    pub fn settings(&self) -> DatasourceSettings {
        DatasourceSettings {
            name: self.name.clone(),
            kind: self.kind.clone(),
            url: self.url.clone(),
            annotate_url: self.annotate_url.clone().unwrap_or_else(|| self.url.clone()),
        }
    }
}
