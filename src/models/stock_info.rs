// ============================================================================
// Structure : StockInfo
// ============================================================================
// Résumé du dernier prix d'un ticker, calculé à partir des deux dernières
// chandelles d'une PriceSeries (réponse de l'endpoint /info)
// ============================================================================

use serde::Serialize;
use thiserror::Error;

use crate::models::PriceSeries;

/// Format de la date exposée dans le JSON
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Erreurs possibles lors du calcul du résumé
#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    /// Aucune chandelle dans la série
    #[error("No data available for {0}")]
    EmptySeries(String),

    /// La variation en pourcentage n'est pas un nombre fini (clôture précédente à 0)
    #[error("Invalid price data for {ticker}: previous close is {previous_close}")]
    NonFinite { ticker: String, previous_close: f64 },
}

/// Dernier prix et variation d'un ticker
///
/// Les noms des champs sont ceux du JSON renvoyé par l'API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StockInfo {
    pub ticker: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub date: String,
}

impl StockInfo {
    /// Calcule le résumé depuis la dernière chandelle et celle d'avant
    ///
    /// Avec une seule chandelle, il n'y a pas de référence :
    /// la variation vaut 0, même si la clôture est à 0.
    pub fn from_series(series: &PriceSeries) -> Result<Self, SummaryError> {
        let latest = series
            .last()
            .ok_or_else(|| SummaryError::EmptySeries(series.symbol.clone()))?;

        let (change, change_percent) = match series.previous() {
            Some(previous) => {
                let change = latest.close - previous.close;
                let change_percent = change / previous.close * 100.0;

                if !change_percent.is_finite() {
                    return Err(SummaryError::NonFinite {
                        ticker: series.symbol.clone(),
                        previous_close: previous.close,
                    });
                }
                (change, change_percent)
            }
            None => (0.0, 0.0),
        };

        Ok(Self {
            ticker: series.symbol.clone(),
            price: round2(latest.close),
            change: round2(change),
            change_percent: round2(change_percent),
            volume: latest.volume,
            high: round2(latest.high),
            low: round2(latest.low),
            open: round2(latest.open),
            date: latest.timestamp.format(DATE_FORMAT).to_string(),
        })
    }
}

/// Résume une série (voir `StockInfo::from_series`)
pub fn summarize(series: &PriceSeries) -> Result<StockInfo, SummaryError> {
    StockInfo::from_series(series)
}

/// Arrondit à 2 décimales
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bar;
    use chrono::{Duration, Local, TimeZone};

    fn series(closes: &[f64]) -> PriceSeries {
        let start = Local.timestamp_opt(1_700_000_000, 0).unwrap();
        let bars = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Bar::new(
                    start + Duration::days(i as i64),
                    c - 0.5,
                    c + 1.234,
                    c - 2.0,
                    c,
                    5_000 + i as u64,
                )
            })
            .collect();
        PriceSeries::from_bars("TSLA", bars)
    }

    #[test]
    fn test_change_against_previous_close() {
        let info = summarize(&series(&[100.0, 110.0])).unwrap();

        assert_eq!(info.ticker, "TSLA");
        assert_eq!(info.price, 110.0);
        assert_eq!(info.change, 10.0);
        assert_eq!(info.change_percent, 10.0);
        assert_eq!(info.volume, 5_001);
        assert_eq!(info.high, 111.23);
        assert_eq!(info.low, 108.0);
        assert_eq!(info.open, 109.5);
    }

    #[test]
    fn test_single_bar_has_no_change() {
        let info = summarize(&series(&[42.0])).unwrap();
        assert_eq!(info.change, 0.0);
        assert_eq!(info.change_percent, 0.0);
        assert_eq!(info.price, 42.0);

        // Clôture à 0 sur une chandelle unique : toujours aucune variation
        let info = summarize(&series(&[0.0])).unwrap();
        assert_eq!(info.change, 0.0);
        assert_eq!(info.change_percent, 0.0);
    }

    #[test]
    fn test_uses_last_two_bars_only() {
        let info = summarize(&series(&[1.0, 50.0, 200.0, 150.0])).unwrap();
        assert_eq!(info.change, -50.0);
        assert_eq!(info.change_percent, -25.0);
    }

    #[test]
    fn test_rounding() {
        let info = summarize(&series(&[3.0, 4.0])).unwrap();
        assert_eq!(info.change_percent, 33.33);
    }

    #[test]
    fn test_zero_previous_close_is_an_error() {
        let err = summarize(&series(&[0.0, 5.0])).unwrap_err();
        assert!(matches!(err, SummaryError::NonFinite { .. }));
    }

    #[test]
    fn test_empty_series_is_an_error() {
        let empty = PriceSeries::from_bars("TSLA", Vec::new());
        assert_eq!(
            summarize(&empty).unwrap_err(),
            SummaryError::EmptySeries("TSLA".to_string())
        );
    }

    #[test]
    fn test_date_format_and_json_keys() {
        let info = summarize(&series(&[100.0, 110.0])).unwrap();
        assert_eq!(info.date.len(), "2023-11-15 22:13:20".len());

        let json = serde_json::to_value(&info).unwrap();
        for key in [
            "ticker",
            "price",
            "change",
            "change_percent",
            "volume",
            "high",
            "low",
            "open",
            "date",
        ] {
            assert!(json.get(key).is_some(), "missing key {}", key);
        }
    }
}
