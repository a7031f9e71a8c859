use std::sync::Arc;

use anyhow::Context;

use docflow_infra::OrchestratorConfig;
use docflow_infra::workers::{ContinuationPump, PumpSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e).context("failed to load .env");
        }
    }
    docflow_observability::init();

    let config = OrchestratorConfig::from_env().context("invalid orchestrator configuration")?;
    tracing::info!(
        max_checks = config.poll.max_checks,
        retry_budget = config.poll.retry_budget,
        input_prefix = %config.input_prefix,
        "orchestrator configured"
    );

    let services = Arc::new(docflow_api::app::services::build_services(config).await?);

    let pump = ContinuationPump::new(
        services.orchestrator.clone(),
        services.scheduler.clone(),
        PumpSettings::default(),
    )
    .spawn("continuation-pump")
    .context("failed to spawn continuation pump")?;

    let app = docflow_api::app::build_app(services);

    let bind_addr =
        std::env::var("DOCFLOW_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tokio::task::spawn_blocking(move || pump.shutdown()).await?;
    Ok(())
}
