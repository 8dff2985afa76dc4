// ============================================================================
// StockChart - Library
// ============================================================================
// Service HTTP qui récupère l'historique d'un ticker sur Yahoo Finance et le
// rend en graphique en chandeliers (PNG) ou en résumé JSON du dernier prix
// ============================================================================

pub mod api;    // Client Yahoo Finance + trait QuoteSource
pub mod chart;  // Rendu PNG (plotters)
pub mod config; // Variables d'environnement
pub mod models; // Structures de données
pub mod server; // Routes HTTP (axum)
