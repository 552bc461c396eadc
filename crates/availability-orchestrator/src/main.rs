use anyhow::{Context, Result};
use availability_orchestrator::config::HostConfig;
use availability_orchestrator::host::{HttpActivityExecutor, SystemClock};
use availability_orchestrator::scenario::default_scenarios;
use availability_orchestrator::{
    availability_test_orchestration, AvailabilityTestConfig, ReplayHost,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "availability_orchestrator=info,availability_worker=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("availability-worker starting...");

    let config = AvailabilityTestConfig::from_env();
    config.validate().context("invalid availability test configuration")?;
    let host_config = HostConfig::from_env();

    let scenarios = default_scenarios(&config);
    tracing::info!(
        url = %config.url_to_scan,
        environment = %config.environment_definition,
        scenarios = scenarios.len(),
        executor = %host_config.activity_executor_url,
        "Configuration loaded"
    );

    let executor = HttpActivityExecutor::from_config(&host_config);
    let host = ReplayHost::with_config(executor, SystemClock, host_config);

    let instance_id = Uuid::now_v7().to_string();
    let run = host
        .run(&instance_id, |ctx| {
            availability_test_orchestration(ctx, &config, &scenarios)
        })
        .await?;

    let summary = run.output?;
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if summary.succeeded() {
        tracing::info!(%instance_id, "Availability test passed");
    } else {
        tracing::warn!(%instance_id, "Availability test reported failures");
    }

    Ok(())
}
