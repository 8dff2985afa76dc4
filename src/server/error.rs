// ============================================================================
// ApiError - Traduction des erreurs en réponses HTTP
// ============================================================================
// Chaque route renvoie un corps JSON en cas d'erreur :
// - 400 : paramètre manquant ou invalide  { error, example }
// - 404 : aucune donnée pour le ticker    { error, ticker }
// - 500 : tout le reste                   { error, message? }
//
// Le détail d'une erreur 500 n'est renvoyé au client qu'en mode DEBUG ;
// il est toujours journalisé côté serveur.
// ============================================================================

use axum::{
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api::QuoteError;
use crate::chart::RenderError;
use crate::models::{RequestError, SummaryError};

/// Erreur d'un handler HTTP
#[derive(Debug, Error)]
pub enum ApiError {
    /// Paramètre de requête manquant ou mal formé
    #[error("{message}")]
    Validation {
        message: String,
        example: &'static str,
    },

    /// Le fournisseur a répondu mais aucune donnée exploitable
    #[error("{message}")]
    NotFound { message: String, ticker: String },

    /// Réseau, timeout, statut HTTP ou JSON inattendu côté fournisseur
    #[error("{0:#}")]
    Upstream(anyhow::Error),

    /// Échec du rendu de l'image
    #[error(transparent)]
    Render(RenderError),

    /// Toute autre erreur inattendue
    #[error("{0:#}")]
    Internal(anyhow::Error),
}

impl ApiError {
    /// Erreur de validation des paramètres, avec un exemple d'usage
    pub fn from_request(err: RequestError, example: &'static str) -> Self {
        let example = match err {
            RequestError::MissingTicker | RequestError::InvalidTicker(_) => example,
            RequestError::InvalidMovingAverages(_) => "ma=20,50,200",
        };
        ApiError::Validation {
            message: err.to_string(),
            example,
        }
    }

    /// Query string impossible à décoder
    pub fn from_query(rejection: QueryRejection, example: &'static str) -> Self {
        ApiError::Validation {
            message: rejection.body_text(),
            example,
        }
    }

    /// Échec du rendu ; une série vide est traitée comme une absence de données
    pub fn from_render(err: RenderError, ticker: &str) -> Self {
        match err {
            RenderError::EmptySeries => ApiError::NotFound {
                message: format!("No data available for {}", ticker),
                ticker: ticker.to_string(),
            },
            other => ApiError::Render(other),
        }
    }

    /// Code HTTP correspondant
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Render(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Construit la réponse ; `expose_detail` ajoute le message des erreurs 500
    pub fn into_response_with_detail(self, expose_detail: bool) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Validation { message, example } => json!({
                "error": message,
                "example": example,
            }),
            ApiError::NotFound { message, ticker } => json!({
                "error": message,
                "ticker": ticker,
            }),
            _ if expose_detail => json!({
                "error": "Internal server error",
                "message": self.to_string(),
            }),
            _ => json!({ "error": "Internal server error" }),
        };

        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with_detail(false)
    }
}

impl From<QuoteError> for ApiError {
    fn from(err: QuoteError) -> Self {
        match err {
            QuoteError::NoData { ref ticker } => ApiError::NotFound {
                ticker: ticker.clone(),
                message: err.to_string(),
            },
            QuoteError::Upstream(source) => ApiError::Upstream(source),
        }
    }
}

impl From<SummaryError> for ApiError {
    fn from(err: SummaryError) -> Self {
        match err {
            SummaryError::EmptySeries(ref ticker) => ApiError::NotFound {
                ticker: ticker.clone(),
                message: err.to_string(),
            },
            SummaryError::NonFinite { .. } => ApiError::Internal(err.into()),
        }
    }
}
