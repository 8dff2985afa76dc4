// ============================================================================
// Stock Chart API - Point d'entrée
// ============================================================================
// Charge la configuration, initialise les logs puis lance le serveur axum
//
// CONCEPTS RUST CLÉS :
// 1. #[tokio::main] : runtime async multi-thread pour le serveur
// 2. anyhow::Result : toute erreur de démarrage remonte jusqu'ici
// ============================================================================

use anyhow::{Context, Result};
use tracing::info;

use stockchart::config::Config;
use stockchart::server;

// ============================================================================
// Initialisation du logging
// ============================================================================

/// Initialise le système de logging
///
/// CONCEPT RUST : Tracing subscriber
/// - Registry : point central des logs
/// - Layer : transforme et route les logs (stdout, et fichier si LOG_DIR)
/// - EnvFilter : filtre par niveau (RUST_LOG env var)
/// - RollingFileAppender : rotation quotidienne
///
/// # Utilisation
/// ```bash
/// # Contrôler le niveau de log
/// RUST_LOG=debug cargo run
/// RUST_LOG=stockchart=trace cargo run
///
/// # Logs fichier en plus de la sortie standard
/// LOG_DIR=./logs cargo run
/// ```
fn init_logging(config: &Config) -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let file_layer = match &config.log_dir {
        Some(log_dir) => {
            std::fs::create_dir_all(log_dir)
                .context("Échec de la création du répertoire de logs")?;

            let file_appender =
                RollingFileAppender::new(Rotation::DAILY, log_dir, "stockchart.log");

            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file_appender)
                    .with_ansi(false) // Pas de codes couleur dans le fichier
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(file_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.default_log_filter().into()),
        )
        .try_init()
        .context("Échec de l'initialisation du logging")?;

    info!(log_dir = ?config.log_dir, "Logging initialisé");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Un fichier .env est optionnel
    dotenv::dotenv().ok();

    let config = Config::from_env()?;

    init_logging(&config).unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!(port = config.port, "Starting Stock Chart API");
    info!(debug = config.debug, "Debug mode");

    server::serve(&config).await
}
