// ============================================================================
// Handlers HTTP
// ============================================================================
// Un handler par route. Chaque handler valide ses paramètres avant tout
// appel réseau, puis traduit les erreurs en réponses JSON (voir ApiError).
// ============================================================================

use anyhow::anyhow;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};

use crate::models::chart_request::normalize_ticker;
use crate::models::{summarize, ChartRequest, StockInfo};
use crate::server::error::ApiError;
use crate::server::AppState;

/// Routes listées par le descripteur et par la réponse 404
pub const AVAILABLE_ENDPOINTS: [&str; 4] = ["/", "/chart", "/info", "/health"];

const CHART_EXAMPLE: &str = "/chart?ticker=TSLA";
const INFO_EXAMPLE: &str = "/info?ticker=TSLA";

/// /info utilise les 5 dernières séances journalières
const INFO_PERIOD: &str = "5d";
const INFO_INTERVAL: &str = "1d";

/// Paramètres de /chart (tous optionnels au niveau de l'extraction)
#[derive(Debug, Deserialize)]
pub struct ChartParams {
    pub ticker: Option<String>,
    pub period: Option<String>,
    pub interval: Option<String>,
    pub ma: Option<String>,
    pub volume: Option<String>,
}

/// Paramètres de /info
#[derive(Debug, Deserialize)]
pub struct InfoParams {
    pub ticker: Option<String>,
}

/// GET / : description du service
pub async fn home() -> Json<Value> {
    Json(json!({
        "service": "Stock Chart API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "/chart": "Generate stock chart (GET)",
            "/info": "Get stock information (GET)",
            "/health": "Health check (GET)"
        },
        "parameters": {
            "ticker": "Stock symbol (required)",
            "period": "Time period (optional, default: 6mo)",
            "interval": "Data interval (optional, default: 1d)",
            "ma": "Moving averages (optional, e.g., 20,50,200)",
            "volume": "Show volume pane (optional, true/false, default: true)"
        },
        "example": "/chart?ticker=TSLA&period=3mo&ma=20,50"
    }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Local::now().to_rfc3339(),
    }))
}

/// GET /chart : image PNG du graphique en chandeliers
pub async fn chart(
    State(state): State<AppState>,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Response {
    match generate_chart(&state, query).await {
        Ok(response) => response,
        Err(err) => err.into_response_with_detail(state.debug),
    }
}

/// GET /info : dernier prix et variation
pub async fn info(
    State(state): State<AppState>,
    query: Result<Query<InfoParams>, QueryRejection>,
) -> Response {
    match stock_info(&state, query).await {
        Ok(info) => Json(info).into_response(),
        Err(err) => err.into_response_with_detail(state.debug),
    }
}

/// Toute route inconnue
pub async fn not_found() -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Endpoint not found",
            "available_endpoints": AVAILABLE_ENDPOINTS,
        })),
    )
}

#[instrument(name = "chart", skip_all)]
async fn generate_chart(
    state: &AppState,
    query: Result<Query<ChartParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = query.map_err(|rejection| {
        warn!(error = %rejection, "Rejected chart query string");
        ApiError::from_query(rejection, CHART_EXAMPLE)
    })?;

    let request = ChartRequest::from_params(
        params.ticker.as_deref(),
        params.period.as_deref(),
        params.interval.as_deref(),
        params.ma.as_deref(),
        params.volume.as_deref(),
    )
    .map_err(|err| {
        warn!(error = %err, ?params, "Rejected chart request");
        ApiError::from_request(err, CHART_EXAMPLE)
    })?;

    info!(
        ticker = %request.ticker,
        period = %request.period,
        interval = %request.interval,
        "Generating chart"
    );

    let series = state
        .quotes
        .fetch(&request.ticker, &request.period, &request.interval)
        .await
        .map_err(|err| {
            error!(ticker = %request.ticker, error = %err, "Failed to fetch chart data");
            ApiError::from(err)
        })?;

    // Le rendu est CPU-bound : il ne doit pas bloquer les workers tokio
    let renderer = state.renderer.clone();
    let title = request.title();
    let ticker = request.ticker.clone();
    let png = tokio::task::spawn_blocking(move || {
        renderer.render(
            &series,
            &title,
            &request.moving_averages,
            request.show_volume,
        )
    })
    .await
    .map_err(|err| ApiError::Internal(anyhow!(err)))?
    .map_err(|err| {
        error!(ticker = %ticker, error = %err, "Failed to render chart");
        ApiError::from_render(err, &ticker)
    })?;

    info!(ticker = %ticker, bytes = png.len(), "Chart generated");

    let headers = [
        (header::CONTENT_TYPE, "image/png".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("inline; filename=\"{}_chart.png\"", ticker),
        ),
    ];
    Ok((headers, png).into_response())
}

#[instrument(name = "info", skip_all)]
async fn stock_info(
    state: &AppState,
    query: Result<Query<InfoParams>, QueryRejection>,
) -> Result<StockInfo, ApiError> {
    let Query(params) = query.map_err(|rejection| {
        warn!(error = %rejection, "Rejected info query string");
        ApiError::from_query(rejection, INFO_EXAMPLE)
    })?;

    let ticker = normalize_ticker(params.ticker.as_deref().unwrap_or_default()).map_err(|err| {
        warn!(error = %err, ?params, "Rejected info request");
        ApiError::from_request(err, INFO_EXAMPLE)
    })?;

    info!(ticker = %ticker, "Getting info");

    let series = state
        .quotes
        .fetch(&ticker, INFO_PERIOD, INFO_INTERVAL)
        .await
        .map_err(|err| {
            error!(ticker = %ticker, error = %err, "Failed to fetch info data");
            ApiError::from(err)
        })?;

    summarize(&series).map_err(|err| {
        error!(ticker = %ticker, error = %err, "Failed to summarize price data");
        ApiError::from(err)
    })
}
