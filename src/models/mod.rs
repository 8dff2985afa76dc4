// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données du service
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod chart_request; // Paramètres validés de /chart
pub mod ohlc;          // Bar et PriceSeries
pub mod stock_info;    // Résumé du dernier prix (/info)

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use stockchart::models::ohlc::PriceSeries;
// On peut faire : use stockchart::models::PriceSeries;
pub use chart_request::{ChartRequest, RequestError};
pub use ohlc::{Bar, PriceSeries};
pub use stock_info::{summarize, StockInfo, SummaryError};
