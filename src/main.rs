mod config;
mod dto;
mod grammar;
mod handlers;
mod markdown;
mod models;
mod repository;
mod service;

use std::{sync::Arc, time::Duration};

use handlers::rest::{self, AppState};
use repository::{MemoryNoteRepository, NoteRepository, PgNoteRepository};

use axum::http::StatusCode;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use grammar::{GrammarEngine, GrammarService, LanguageToolEngine, RuleEngine};
use markdown::CommonMarkRenderer;
use service::NoteService;

#[tokio::main]
async fn main() {
    // Log setup
    tracing_subscriber::fmt::init();

    // Load config
    let cfg = config::load_config().unwrap_or_else(|e| {
        tracing::error!("Failed to load config: {e}");
        panic!("failed to locate or load config: {e}");
    });
    tracing::info!("Successfully loaded notes server config");

    // Repository creation and migration
    let repo: Arc<dyn NoteRepository> = match &cfg.database_dsn {
        Some(dsn) => {
            let mut repo = PgNoteRepository::new(dsn).await.unwrap_or_else(|e| {
                tracing::error!("Failed to establish database connection: {e}");
                panic!("failed to establish database connection: {e}");
            });

            repo.migrate().await.unwrap_or_else(|e| {
                tracing::error!("Failed to migrate database: {e}");
                panic!("failed to migrate database: {e}");
            });

            Arc::new(repo)
        }
        None => {
            tracing::warn!("No database configured, notes are kept in memory only");
            Arc::new(MemoryNoteRepository::new())
        }
    };

    // Grammar engine selection
    let engine: Arc<dyn GrammarEngine> = match &cfg.grammar.languagetool_url {
        Some(url) => {
            tracing::info!("Using LanguageTool at {} for grammar checks", url);
            let engine = LanguageToolEngine::new(
                url,
                &cfg.grammar.language,
                Duration::from_secs(cfg.grammar.timeout_secs),
            )
            .unwrap_or_else(|e| {
                tracing::error!("Failed to build LanguageTool client: {e}");
                panic!("failed to build LanguageTool client: {e}");
            });
            Arc::new(engine)
        }
        None => {
            tracing::warn!(
                "No LanguageTool server configured, grammar checks use the small built-in rule set"
            );
            Arc::new(RuleEngine::new().unwrap_or_else(|e| {
                tracing::error!("Failed to compile grammar rules: {e}");
                panic!("failed to compile grammar rules: {e}");
            }))
        }
    };

    // Service creation
    let state = AppState {
        notes: Arc::new(NoteService::new(repo)),
        markdown: Arc::new(CommonMarkRenderer),
        grammar: Arc::new(GrammarService::new(engine)),
        max_upload_bytes: cfg.max_upload_bytes,
    };

    // Router config
    let router = rest::router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(cfg.request_timeout_secs),
        ))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", cfg.port))
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind to port {}: {e}", cfg.port);
            panic!("failed to bind to port {}: {e}", cfg.port);
        });

    match listener.local_addr() {
        Ok(addr) => tracing::info!("REST server starting, listening on {}", addr),
        Err(e) => tracing::warn!("REST server starting, local address unknown: {e}"),
    }

    if let Err(e) = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("HTTP server error: {e}");
        panic!("failed to start HTTP server: {e}");
    }

    tracing::info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
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
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
