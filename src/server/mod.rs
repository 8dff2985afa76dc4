// ============================================================================
// Module : server
// ============================================================================
// Serveur HTTP axum : routes, état partagé, CORS et démarrage
//
// CONCEPT : Serveur sans état
// - AppState ne contient que des valeurs immuables (config, style, client)
// - Chaque requête construit ses propres données et les libère à la fin
// - On peut lancer plusieurs instances derrière un load balancer
// ============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::api::{QuoteSource, YahooClient};
use crate::chart::ChartRenderer;
use crate::config::Config;

pub mod error;    // ApiError -> réponse JSON
pub mod handlers; // Un handler par route

pub use error::ApiError;

/// État partagé entre toutes les requêtes
///
/// CONCEPT RUST : Arc<dyn Trait>
/// - Le clone d'un AppState ne copie que des pointeurs
/// - `dyn QuoteSource` permet de brancher une source en mémoire dans les tests
#[derive(Clone)]
pub struct AppState {
    pub quotes: Arc<dyn QuoteSource>,
    pub renderer: Arc<ChartRenderer>,
    pub debug: bool,
}

impl AppState {
    pub fn new(quotes: Arc<dyn QuoteSource>, renderer: ChartRenderer, debug: bool) -> Self {
        Self {
            quotes,
            renderer: Arc::new(renderer),
            debug,
        }
    }
}

/// Construit le routeur avec toutes les routes et les middlewares
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route("/chart", get(handlers::chart))
        .route("/info", get(handlers::info))
        .fallback(handlers::not_found)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Démarre le serveur et attend Ctrl-C
pub async fn serve(config: &Config) -> Result<()> {
    let quotes = YahooClient::new(config.yahoo_base_url.clone(), config.fetch_timeout)?;
    let state = AppState::new(Arc::new(quotes), ChartRenderer::default(), config.debug);

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Impossible d'écouter sur {}", addr))?;

    info!(%addr, "Stock Chart API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Erreur du serveur HTTP")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            error!(error = %e, "Cannot listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// Tests du routeur (sans réseau)
// ============================================================================
