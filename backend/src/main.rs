use std::{error::Error, sync::Arc};

use roadtrip::{AppState, config::AppConfig, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roadtrip=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().inspect_err(|err| {
        tracing::error!("configuration error: {err}");
    })?;
    tracing::debug!(?config, "loaded configuration");

    let planner = config.build_planner()?;
    if !planner.enrichment_enabled() {
        tracing::info!("OPENAI_API_KEY not set, place descriptions disabled");
    }

    let state = AppState {
        planner: Arc::new(planner),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("starting trip planner on http://{}", config.bind_addr);
    tracing::info!("  GET  /ping");
    tracing::info!("  POST /plan-trip");
    axum::serve(listener, app).await?;
    Ok(())
}
