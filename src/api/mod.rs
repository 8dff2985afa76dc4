// ============================================================================
// Module : api
// ============================================================================
// Clients des APIs externes qui fournissent les cotations (Yahoo Finance)
// et le trait commun utilisé par le serveur HTTP
// ============================================================================

use async_trait::async_trait;
use thiserror::Error;

use crate::models::PriceSeries;

pub mod yahoo; // Client API Yahoo Finance

// Re-export du client principal
pub use yahoo::YahooClient;

/// Erreurs de récupération des cotations
///
/// CONCEPT : Deux familles d'erreurs bien distinctes
/// - NoData : le fournisseur a répondu, mais aucune chandelle exploitable (404)
/// - Upstream : réseau, timeout, statut HTTP ou JSON inattendu (500)
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("No data available for {ticker}")]
    NoData { ticker: String },

    #[error("quote provider error: {0:#}")]
    Upstream(#[from] anyhow::Error),
}

/// Source de cotations historiques
///
/// Le serveur ne dépend que de ce trait : en production c'est `YahooClient`,
/// dans les tests une source en mémoire.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Récupère la série d'un ticker pour une période et un intervalle Yahoo
    async fn fetch(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> Result<PriceSeries, QuoteError>;
}
