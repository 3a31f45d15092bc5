//! Relay HTTP service: message API, health, stats, and the liveness pinger.

use anon_relay::app::{HttpStatusProbe, LivenessPinger, MessageService};
use anon_relay::infra::{init_tracing, Settings};
use anon_relay::storage;
use anon_relay::transport::http::{create_router, ApiDoc, AppState, SharedSecret};
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let mut settings = Settings::load()?;
    tracing::info!(?settings, "configuration loaded");

    // --- Storage ---
    let store = storage::connect(&settings.database_url)?;
    let messages = Arc::new(MessageService::new(store, settings.max_messages));
    match messages.initialize(settings.seed_examples).await {
        Ok(seeded) => tracing::info!(seeded, max_messages = settings.max_messages, "message store ready"),
        // The pool is lazy, so a database that comes up later is still picked up.
        Err(e) => tracing::error!(error = %e, "message store initialization failed, serving anyway"),
    }

    // --- Auth ---
    let api_key = SharedSecret::new(settings.api_key.take());
    if !api_key.is_configured() {
        tracing::warn!("API_KEY is not set, /bot/messages and /stats will reject every request");
    }
    let app_state = AppState::new(messages, api_key);

    // --- Liveness pinger ---
    let pinger = if settings.ping_enabled {
        let probe = HttpStatusProbe::new(&settings.public_base_url())?;
        tracing::info!(url = probe.url(), "liveness pinger target");
        let pinger = Arc::new(LivenessPinger::new(
            Arc::new(probe),
            Duration::from_secs(settings.ping_initial_delay_secs),
            Duration::from_secs(settings.ping_interval_secs),
        ));
        let handle = pinger.clone().start();
        Some((pinger, handle))
    } else {
        tracing::info!("liveness pinger disabled");
        None
    };

    // --- API server ---
    let app = create_router(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http());
    let listener = tokio::net::TcpListener::bind(settings.bind_addr()).await?;
    tracing::info!(addr = %settings.bind_addr(), "relay listening (Swagger UI at /swagger-ui)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some((pinger, handle)) = pinger {
        pinger.shutdown();
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "liveness pinger task failed");
        }
    }
    tracing::info!("graceful shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
