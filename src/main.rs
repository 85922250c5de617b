use anyhow::Context;
use clinic_queue::config::Config;
use clinic_queue::server::{self, AppState};
use clinic_queue::FirebaseApp;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,tower_http=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let config = Config::from_env()?;
    config.log_summary();

    let app = FirebaseApp::from_file(&config.service_account_path)
        .await
        .with_context(|| {
            format!(
                "loading service account from {}",
                config.service_account_path.display()
            )
        })?;
    info!(project_id = app.project_id(), "Firebase initialized");

    let state = AppState::from_firebase(&app, &config)?;
    server::run(config, state).await?;

    Ok(())
}
