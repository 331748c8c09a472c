use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bosun_datasource::backend::ReqwestBackend;
use bosun_datasource::config::DatasourceConfig;
use bosun_datasource::datasource::BosunDatasource;
use bosun_datasource::template::VariableTemplate;
use bosun_datasource::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("bosun_datasource=debug,tower_http=debug")
        }))
        .init();

    let config_path = std::env::var("BOSUN_DATASOURCE_CONFIG")
        .unwrap_or_else(|_| "./bosun-datasource.toml".to_string());
    let config = DatasourceConfig::load(&config_path)?.apply_env()?;

    let backend = ReqwestBackend::new(config.timeout())?;
    let templates = VariableTemplate::new(config.variables.clone());
    let datasource = BosunDatasource::new(config.settings(), Arc::new(backend), Arc::new(templates));
    tracing::info!(
        name = %datasource.settings().name,
        bosun = %datasource.settings().url,
        "datasource configured"
    );

    let app = router(AppState {
        datasource: Arc::new(datasource),
    });

    let addr = config.listen_addr;
    tracing::info!("bosun-datasource listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
