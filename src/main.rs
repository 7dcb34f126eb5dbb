use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use gluco_sahayak::config::AppConfig;
use gluco_sahayak::onboarding::{
    AnswerInterpreter, AnthropicInterpreter, OnboardingManager, OnboardingRouteState,
    onboarding_routes,
};
use gluco_sahayak::store::LibSqlBackend;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;

    // Initialize tracing: stdout always, plus a daily rolling file when configured.
    let (file_layer, _log_guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "gluco-sahayak.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    eprintln!("🩺 Gluco Sahayak v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());
    eprintln!(
        "   Onboarding API: http://0.0.0.0:{}/api/onboarding/messages",
        config.port
    );

    // ── Database ─────────────────────────────────────────────────────────
    let db = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("failed to open database at {}", config.db_path.display()))?,
    );

    // ── Answer interpreter (optional) ────────────────────────────────────
    let interpreter: Option<Arc<dyn AnswerInterpreter>> = match &config.interpreter {
        Some(interpreter_config) => {
            tracing::info!(model = %interpreter_config.model, "Answer interpreter enabled");
            Some(Arc::new(AnthropicInterpreter::new(interpreter_config)))
        }
        None => {
            tracing::info!("ANTHROPIC_API_KEY not set, answers are parsed by rules only");
            None
        }
    };

    let manager = Arc::new(OnboardingManager::new(
        db.clone(),
        db,
        interpreter,
        config.onboarding.clone(),
    ));

    let app = onboarding_routes(OnboardingRouteState { manager }).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!(port = config.port, "Onboarding server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}
