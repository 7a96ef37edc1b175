//! 主应用程序入口
//!
//! 加载配置，组装基础设施和用例服务，启动 Axum Web API 服务。

use std::sync::Arc;

use application::{profile_rules_from_config, SystemClock};
use config::AppConfig;
use infrastructure::{Infrastructure, InfrastructureConfig};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志，默认 info 级别
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load_validated()?;

    let infra = Infrastructure::build(InfrastructureConfig::from(&config)).await?;
    let state = AppState::new(
        &infra,
        profile_rules_from_config(&config.profile),
        Arc::new(SystemClock),
    );

    let app = router(state);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!("GameTogether 服务启动在 http://{}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
