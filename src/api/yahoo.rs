// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Récupère l'historique OHLCV d'un ticker depuis l'endpoint chart de Yahoo
//
// CONCEPTS RUST AVANCÉS :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : erreurs typées (NoData vs Upstream) + contexte anyhow
// 3. Serde : désérialisation JSON typée, échoue dès qu'une clé manque
// ============================================================================

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::api::{QuoteError, QuoteSource};
use crate::models::{Bar, PriceSeries};

/// URL de base de l'API Yahoo Finance
pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Délai maximum d'un appel à Yahoo
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Yahoo rejette souvent le User-Agent par défaut de reqwest
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";

/// Code d'erreur renvoyé par Yahoo pour un symbole inconnu ou délisté
const NOT_FOUND_CODE: &str = "Not Found";

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================
// On ne garde que ce dont on a besoin : chart.result[0].timestamp et
// chart.result[0].indicators.quote[0].{open,high,low,close,volume}
//
// CONCEPT RUST : #[serde(default)]
// - Yahoo omet les tableaux quand il n'y a aucune donnée sur la période
// - Un tableau absent devient un Vec vide, donc une série vide (NoData)
// - En revanche, `chart`, `indicators` et `quote` sont obligatoires
// ============================================================================

/// Réponse complète de l'API Yahoo Finance
#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

/// Données OHLCV (Open, High, Low, Close, Volume), tableaux parallèles
#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client HTTP vers l'endpoint chart de Yahoo Finance
///
/// CONCEPT RUST : Clone bon marché
/// - reqwest::Client contient un Arc vers son pool de connexions
/// - Le même client est partagé par toutes les requêtes du serveur
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: Url,
}

impl YahooClient {
    /// Crée un client avec une URL de base et un timeout donnés
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .with_context(|| format!("URL Yahoo invalide : {:?}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("URL Yahoo invalide : {}", base_url));
        }

        debug!("Creating HTTP client");
        let http = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self { http, base_url })
    }

    /// Récupère les chandelles d'un ticker
    ///
    /// # Arguments
    /// * `ticker` - Symbole (ex: "aapl ", normalisé en "AAPL")
    /// * `period` - Range Yahoo transmis tel quel (1d, 5d, 1mo, 6mo, 1y, max...)
    /// * `interval` - Granularité transmise telle quelle (1m, 5m, 1h, 1d, 1wk...)
    ///
    /// # Erreurs
    /// * `QuoteError::NoData` - la requête a réussi mais aucune chandelle complète
    /// * `QuoteError::Upstream` - réseau, timeout, statut HTTP, JSON inattendu
    ///
    /// CONCEPT RUST : #[instrument]
    /// - Tous les logs à l'intérieur auront le contexte ticker + period + interval
    #[instrument(skip(self))]
    pub async fn fetch_price_series(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> Result<PriceSeries, QuoteError> {
        let symbol = ticker.trim().to_uppercase();
        let url = self.chart_url(&symbol)?;
        debug!(url = %url, "Built Yahoo Finance API URL");

        debug!("Sending HTTP request to Yahoo Finance");
        let response = self
            .http
            .get(url)
            .query(&build_query(period, interval))
            .send()
            .await
            .context("Échec de la requête HTTP vers Yahoo Finance")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            // Un symbole inconnu donne un 404 avec un corps JSON chart.error
            if status == StatusCode::NOT_FOUND {
                let body = response.text().await.unwrap_or_default();
                if is_unknown_symbol(&body) {
                    warn!(ticker = %symbol, "Yahoo Finance does not know this symbol");
                    return Err(QuoteError::NoData { ticker: symbol });
                }
            }

            error!(status = %status, "Yahoo Finance returned error status");
            return Err(anyhow!("Yahoo Finance a retourné une erreur : HTTP {}", status).into());
        }

        debug!("Parsing JSON response");
        let yahoo_response: YahooResponse = response
            .json()
            .await
            .context("Échec du parsing JSON de la réponse Yahoo")?;

        let series = parse_yahoo_response(yahoo_response, &symbol)?;

        info!(bars = series.len(), "Successfully fetched ticker data");
        Ok(series)
    }

    /// URL de l'endpoint chart pour un symbole déjà normalisé
    ///
    /// Le symbole est un seul segment de chemin, encodé : un `/`, `?` ou `#`
    /// ne peut pas modifier le chemin ni la query string.
    fn chart_url(&self, symbol: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("URL Yahoo invalide : {}", self.base_url))?
            .pop_if_empty()
            .extend(["v8", "finance", "chart", symbol]);
        Ok(url)
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    async fn fetch(
        &self,
        ticker: &str,
        period: &str,
        interval: &str,
    ) -> Result<PriceSeries, QuoteError> {
        self.fetch_price_series(ticker, period, interval).await
    }
}

/// Paramètres de la query string Yahoo
fn build_query<'a>(period: &'a str, interval: &'a str) -> [(&'static str, &'a str); 5] {
    [
        ("range", period),
        ("interval", interval),
        ("includePrePost", "false"),
        ("useYfid", "true"),
        ("includeAdjustedClose", "true"),
    ]
}

/// Vrai si le corps d'un 404 est l'erreur "Not Found" de Yahoo
fn is_unknown_symbol(body: &str) -> bool {
    serde_json::from_str::<YahooResponse>(body)
        .ok()
        .and_then(|r| r.chart.error)
        .map(|e| e.code == NOT_FOUND_CODE)
        .unwrap_or(false)
}

/// Yahoo envoie parfois le volume en flottant (1500.0) : on tronque,
/// une valeur négative ou non finie compte comme absente
fn volume_to_u64(volume: f64) -> Option<u64> {
    (volume.is_finite() && volume >= 0.0).then(|| volume as u64)
}

/// Convertit la réponse Yahoo en PriceSeries
///
/// CONCEPT RUST : Ownership
/// - yahoo_response est "moved", on consomme ses Vec sans copie
/// - Une chandelle est ignorée dès qu'un des 5 champs est null ou absent
fn parse_yahoo_response(
    yahoo_response: YahooResponse,
    symbol: &str,
) -> Result<PriceSeries, QuoteError> {
    let chart = yahoo_response.chart;

    // Pas de résultat : symbole sans données, ou erreur explicite de Yahoo
    let result = match chart.result.and_then(|r| r.into_iter().next()) {
        Some(result) => result,
        None => {
            return match chart.error {
                Some(err) if err.code != NOT_FOUND_CODE => Err(anyhow!(
                    "Yahoo Finance a retourné une erreur : {} ({})",
                    err.code,
                    err.description.unwrap_or_default()
                )
                .into()),
                _ => {
                    error!(ticker = %symbol, "No result in Yahoo response");
                    Err(QuoteError::NoData {
                        ticker: symbol.to_string(),
                    })
                }
            };
        }
    };

    let timestamps = result.timestamp.unwrap_or_default();
    debug!(timestamp_count = timestamps.len(), "Received timestamps from Yahoo");

    let quote = result
        .indicators
        .quote
        .into_iter()
        .next()
        .context("Pas de données OHLC dans la réponse")?;

    let mut bars = Vec::with_capacity(timestamps.len());
    let mut skipped_count = 0;

    for (i, &timestamp) in timestamps.iter().enumerate() {
        let fields = (
            quote.open.get(i).copied().flatten(),
            quote.high.get(i).copied().flatten(),
            quote.low.get(i).copied().flatten(),
            quote.close.get(i).copied().flatten(),
            quote.volume.get(i).copied().flatten().and_then(volume_to_u64),
        );

        let (Some(open), Some(high), Some(low), Some(close), Some(volume)) = fields else {
            skipped_count += 1;
            continue;
        };

        // Convertit le timestamp Unix en heure locale
        let datetime = DateTime::from_timestamp(timestamp, 0)
            .context("Timestamp invalide")?
            .with_timezone(&Local);

        bars.push(Bar::new(datetime, open, high, low, close, volume));
    }

    if skipped_count > 0 {
        warn!(
            skipped = skipped_count,
            total = timestamps.len(),
            "Skipped bars with missing data"
        );
    }

    let series = PriceSeries::from_bars(symbol, bars);

    debug!(
        parsed = series.len(),
        total = timestamps.len(),
        skipped = skipped_count,
        "Finished parsing OHLC data"
    );

    if series.is_empty() {
        error!(ticker = %symbol, "No valid OHLC data found");
        return Err(QuoteError::NoData {
            ticker: symbol.to_string(),
        });
    }

    Ok(series)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use axum::{
        extract::{Path, Query},
        http::{header, HeaderMap, StatusCode as AxumStatus},
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    fn parse(value: serde_json::Value) -> Result<PriceSeries, QuoteError> {
        let response: YahooResponse = serde_json::from_value(value).map_err(anyhow::Error::from)?;
        parse_yahoo_response(response, "AAPL")
    }

    fn sample_body() -> serde_json::Value {
        json!({
            "chart": {
                "result": [{
                    "meta": { "symbol": "AAPL" },
                    "timestamp": [1700000000, 1700086400, 1700172800, 1700259200],
                    "indicators": {
                        "quote": [{
                            "open":   [10.0, 11.0, null, 13.0],
                            "high":   [10.5, 11.5, 12.5, 13.5],
                            "low":    [9.5, 10.5, 11.5, 12.5],
                            "close":  [10.2, 11.2, 12.2, 13.2],
                            "volume": [100, null, 300, 400]
                        }],
                        "adjclose": [{ "adjclose": [10.2, 11.2, 12.2, 13.2] }]
                    }
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_parse_drops_incomplete_bars() {
        let series = parse(sample_body()).unwrap();

        // Index 1 (volume null) et 2 (open null) sont ignorés
        assert_eq!(series.len(), 2);
        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.bars()[0].close, 10.2);
        assert_eq!(series.bars()[1].volume, 400);
        assert!(series.bars()[0].timestamp < series.bars()[1].timestamp);
        assert_eq!(series.bars()[0].timestamp.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_parse_accepts_float_volume() {
        let body = json!({
            "chart": { "result": [{
                "timestamp": [1700000000, 1700086400],
                "indicators": { "quote": [{
                    "open": [1.0, 2.0], "high": [1.0, 2.0], "low": [1.0, 2.0],
                    "close": [1.0, 2.0], "volume": [1500.0, -1.0]
                }]}
            }], "error": null }
        });

        let series = parse(body).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.bars()[0].volume, 1500);
    }

    #[test]
    fn test_chart_url_encodes_symbol() {
        let client = YahooClient::new("http://localhost:9000/", DEFAULT_TIMEOUT).unwrap();
        let url = client.chart_url("AAPL?RANGE=MAX&X=").unwrap();
        assert_eq!(url.path(), "/v8/finance/chart/AAPL%3FRANGE=MAX&X=");
        assert_eq!(url.query(), None);

        let url = client.chart_url("BRK/B").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/v8/finance/chart/BRK%2FB");

        let client = YahooClient::new("http://localhost:9000/proxy", DEFAULT_TIMEOUT).unwrap();
        let url = client.chart_url("AAPL").unwrap();
        assert_eq!(url.as_str(), "http://localhost:9000/proxy/v8/finance/chart/AAPL");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(YahooClient::new("not a url", DEFAULT_TIMEOUT).is_err());
        assert!(YahooClient::new("mailto:yahoo@example.com", DEFAULT_TIMEOUT).is_err());
    }

    #[test]
    fn test_parse_sorts_out_of_order_timestamps() {
        let body = json!({
            "chart": { "result": [{
                "timestamp": [1700086400, 1700000000],
                "indicators": { "quote": [{
                    "open": [2.0, 1.0], "high": [2.0, 1.0], "low": [2.0, 1.0],
                    "close": [2.0, 1.0], "volume": [2, 1]
                }]}
            }], "error": null }
        });

        let series = parse(body).unwrap();
        assert_eq!(series.bars()[0].close, 1.0);
        assert_eq!(series.bars()[1].close, 2.0);
    }

    #[test]
    fn test_parse_empty_result_is_no_data() {
        let body = json!({ "chart": { "result": [], "error": null } });
        assert!(matches!(parse(body), Err(QuoteError::NoData { .. })));

        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });
        assert!(matches!(parse(body), Err(QuoteError::NoData { .. })));
    }

    #[test]
    fn test_parse_missing_arrays_is_no_data() {
        // Yahoo renvoie un quote vide quand la période ne contient aucune séance
        let body = json!({
            "chart": { "result": [{ "indicators": { "quote": [{}] } }], "error": null }
        });
        assert!(matches!(parse(body), Err(QuoteError::NoData { .. })));
    }

    #[test]
    fn test_parse_all_null_is_no_data() {
        let body = json!({
            "chart": { "result": [{
                "timestamp": [1700000000],
                "indicators": { "quote": [{
                    "open": [null], "high": [null], "low": [null], "close": [null], "volume": [null]
                }]}
            }], "error": null }
        });
        assert!(matches!(parse(body), Err(QuoteError::NoData { .. })));
    }

    #[test]
    fn test_parse_provider_error_is_upstream() {
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Bad Request", "description": "Invalid input - interval=7m is not supported" }
            }
        });
        assert!(matches!(parse(body), Err(QuoteError::Upstream(_))));
    }

    #[test]
    fn test_missing_keys_fail_decoding() {
        // Pas de "indicators" : la structure a changé, on échoue proprement
        let body = json!({ "chart": { "result": [{ "timestamp": [1] }], "error": null } });
        assert!(matches!(parse(body), Err(QuoteError::Upstream(_))));

        // Pas de quote[0]
        let body = json!({
            "chart": { "result": [{ "timestamp": [1], "indicators": { "quote": [] } }], "error": null }
        });
        assert!(matches!(parse(body), Err(QuoteError::Upstream(_))));

        assert!(serde_json::from_value::<YahooResponse>(json!({ "foo": 1 })).is_err());
    }

    #[test]
    fn test_is_unknown_symbol() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        assert!(is_unknown_symbol(body));
        assert!(!is_unknown_symbol("<html>not found</html>"));
    }

    #[test]
    fn test_build_query() {
        let query = build_query("6mo", "1d");
        assert!(query.contains(&("range", "6mo")));
        assert!(query.contains(&("interval", "1d")));
        assert!(query.contains(&("includePrePost", "false")));
        assert!(query.contains(&("useYfid", "true")));
        assert!(query.contains(&("includeAdjustedClose", "true")));
    }

    // ------------------------------------------------------------------------
    // Faux serveur Yahoo sur 127.0.0.1 pour tester le client de bout en bout
    // ------------------------------------------------------------------------

    async fn fake_chart(
        Path(ticker): Path<String>,
        Query(params): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> Response {
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !user_agent.starts_with("Mozilla/5.0") {
            return AxumStatus::FORBIDDEN.into_response();
        }

        match ticker.as_str() {
            // Le symbole arrive décodé, en un seul segment de chemin
            "AAPL" | "BRK/B" | "AAPL?RANGE=MAX&X=" => {
                let expected = [
                    ("range", "5d"),
                    ("interval", "1d"),
                    ("includePrePost", "false"),
                    ("useYfid", "true"),
                    ("includeAdjustedClose", "true"),
                ];
                if params.len() != expected.len()
                    || expected
                        .iter()
                        .any(|(k, v)| params.get(*k).map(String::as_str) != Some(*v))
                {
                    return AxumStatus::BAD_REQUEST.into_response();
                }
                Json(sample_body()).into_response()
            }
            "ZZZZ" => (
                AxumStatus::NOT_FOUND,
                Json(json!({
                    "chart": {
                        "result": null,
                        "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
                    }
                })),
            )
                .into_response(),
            "BROKEN" => Json(json!({ "unexpected": true })).into_response(),
            "SLOW" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(sample_body()).into_response()
            }
            _ => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
        }
    }

    async fn spawn_fake_yahoo() -> String {
        let app = Router::new().route("/v8/finance/chart/{ticker}", get(fake_chart));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    async fn client() -> YahooClient {
        let base_url = spawn_fake_yahoo().await;
        YahooClient::new(base_url, Duration::from_millis(500)).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_normalizes_ticker_and_sends_query() {
        let client = client().await;
        let series = client.fetch(" aapl ", "5d", "1d").await.unwrap();

        assert_eq!(series.symbol, "AAPL");
        assert_eq!(series.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_keeps_symbol_in_one_path_segment() {
        let client = client().await;

        let series = client.fetch("brk/b", "5d", "1d").await.unwrap();
        assert_eq!(series.symbol, "BRK/B");

        // Le "?" ne doit pas injecter de paramètres dans la query string
        let series = client.fetch("AAPL?RANGE=MAX&X=", "5d", "1d").await.unwrap();
        assert_eq!(series.symbol, "AAPL?RANGE=MAX&X=");
    }

    #[tokio::test]
    async fn test_fetch_unknown_symbol_is_no_data() {
        let client = client().await;
        let err = client.fetch("zzzz", "5d", "1d").await.unwrap_err();
        match err {
            QuoteError::NoData { ticker } => assert_eq!(ticker, "ZZZZ"),
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_upstream_failures() {
        let client = client().await;

        // Statut 500
        let err = client.fetch("OTHER", "5d", "1d").await.unwrap_err();
        assert!(matches!(err, QuoteError::Upstream(_)));

        // JSON qui ne ressemble plus à la réponse Yahoo
        let err = client.fetch("BROKEN", "5d", "1d").await.unwrap_err();
        assert!(matches!(err, QuoteError::Upstream(_)));

        // Timeout
        let err = client.fetch("SLOW", "5d", "1d").await.unwrap_err();
        assert!(matches!(err, QuoteError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused_is_upstream() {
        // Port fermé : on réserve un port puis on libère le listener
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = YahooClient::new(format!("http://{}", addr), Duration::from_millis(500)).unwrap();
        let err = client.fetch("AAPL", "5d", "1d").await.unwrap_err();
        assert!(matches!(err, QuoteError::Upstream(_)));
    }
}
