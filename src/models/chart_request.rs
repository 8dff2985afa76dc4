// ============================================================================
// Structure : ChartRequest
// ============================================================================
// Paramètres d'une demande de graphique, construits depuis la query string
// de /chart. La validation a lieu ici, avant tout appel à Yahoo Finance.
// ============================================================================

use thiserror::Error;

/// Période par défaut (range Yahoo)
pub const DEFAULT_PERIOD: &str = "6mo";

/// Intervalle par défaut entre deux chandelles
pub const DEFAULT_INTERVAL: &str = "1d";

/// Moyennes mobiles par défaut
pub const DEFAULT_MOVING_AVERAGES: &str = "20,50";

/// Erreurs de validation des paramètres
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Missing required parameter 'ticker'")]
    MissingTicker,

    #[error("Invalid ticker symbol")]
    InvalidTicker(String),

    #[error("Invalid moving averages format")]
    InvalidMovingAverages(String),
}

/// Demande de graphique validée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartRequest {
    /// Symbole en majuscules, sans espaces autour
    pub ticker: String,

    /// Code de période transmis tel quel à Yahoo (1d, 5d, 1mo, 6mo, 1y, max...)
    pub period: String,

    /// Code d'intervalle transmis tel quel à Yahoo (1m, 5m, 1h, 1d, 1wk...)
    pub interval: String,

    /// Longueurs des moyennes mobiles, dans l'ordre demandé
    pub moving_averages: Vec<usize>,

    /// Affiche le panneau de volume sous les prix
    pub show_volume: bool,
}

impl ChartRequest {
    /// Valide les paramètres bruts de la query string
    ///
    /// - `ticker` : obligatoire, non vide après trim, caractères de symbole uniquement
    /// - `period` / `interval` : valeurs par défaut si absents
    /// - `ma` : liste d'entiers positifs séparés par des virgules, vide = aucune
    /// - `volume` : vrai seulement pour "true" (insensible à la casse)
    pub fn from_params(
        ticker: Option<&str>,
        period: Option<&str>,
        interval: Option<&str>,
        ma: Option<&str>,
        volume: Option<&str>,
    ) -> Result<Self, RequestError> {
        let ticker = normalize_ticker(ticker.unwrap_or_default())?;

        let moving_averages =
            parse_moving_averages(ma.unwrap_or(DEFAULT_MOVING_AVERAGES))?;

        let show_volume = volume
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(true);

        Ok(Self {
            ticker,
            period: period.unwrap_or(DEFAULT_PERIOD).to_string(),
            interval: interval.unwrap_or(DEFAULT_INTERVAL).to_string(),
            moving_averages,
            show_volume,
        })
    }

    /// Titre du graphique : "TSLA | 6mo | 1d | MA20, MA50"
    pub fn title(&self) -> String {
        let mut title = format!("{} | {} | {}", self.ticker, self.period, self.interval);

        if !self.moving_averages.is_empty() {
            let mas: Vec<String> = self
                .moving_averages
                .iter()
                .map(|n| format!("MA{}", n))
                .collect();
            title.push_str(" | ");
            title.push_str(&mas.join(", "));
        }

        title
    }
}

/// Trim + majuscules, puis vérifie les caractères du symbole
///
/// Symboles Yahoo acceptés : lettres, chiffres et `.^=-`
/// (BRK.B, ^GSPC, EURUSD=X, BTC-USD). Le symbole finit dans l'URL Yahoo
/// et dans l'en-tête Content-Disposition, rien d'autre n'est accepté.
pub fn normalize_ticker(raw: &str) -> Result<String, RequestError> {
    let ticker = raw.trim().to_uppercase();
    if ticker.is_empty() {
        return Err(RequestError::MissingTicker);
    }

    let valid = ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-'));
    if !valid {
        return Err(RequestError::InvalidTicker(ticker));
    }

    Ok(ticker)
}

/// Parse "20, 50,200" en [20, 50, 200]
///
/// Une chaîne vide signifie "pas de moyenne mobile". Un élément non entier
/// ou nul rend toute la liste invalide.
pub fn parse_moving_averages(raw: &str) -> Result<Vec<usize>, RequestError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    raw.split(',')
        .map(|item| {
            let item = item.trim();
            match item.parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(RequestError::InvalidMovingAverages(item.to_string())),
            }
        })
        .collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let req = ChartRequest::from_params(Some(" tsla "), None, None, None, None).unwrap();
        assert_eq!(req.ticker, "TSLA");
        assert_eq!(req.period, "6mo");
        assert_eq!(req.interval, "1d");
        assert_eq!(req.moving_averages, vec![20, 50]);
        assert!(req.show_volume);
    }

    #[test]
    fn test_missing_ticker() {
        assert_eq!(
            ChartRequest::from_params(None, None, None, None, None),
            Err(RequestError::MissingTicker)
        );
        assert_eq!(
            ChartRequest::from_params(Some("   "), None, None, None, None),
            Err(RequestError::MissingTicker)
        );
    }

    #[test]
    fn test_ticker_characters() {
        assert_eq!(normalize_ticker(" brk.b "), Ok("BRK.B".to_string()));
        assert_eq!(normalize_ticker("^gspc"), Ok("^GSPC".to_string()));
        assert_eq!(normalize_ticker("eurusd=x"), Ok("EURUSD=X".to_string()));
        assert_eq!(normalize_ticker("btc-usd"), Ok("BTC-USD".to_string()));

        for raw in ["A\u{1}B", "A\"B", "BRK/B", "AAPL?range=max", "A B", "ÉDF"] {
            assert!(
                matches!(normalize_ticker(raw), Err(RequestError::InvalidTicker(_))),
                "{:?} should be rejected",
                raw
            );
        }

        assert_eq!(
            ChartRequest::from_params(Some("a;b"), None, None, None, None),
            Err(RequestError::InvalidTicker("A;B".to_string()))
        );
    }

    #[test]
    fn test_volume_flag() {
        let req = ChartRequest::from_params(Some("A"), None, None, None, Some("TRUE")).unwrap();
        assert!(req.show_volume);
        let req = ChartRequest::from_params(Some("A"), None, None, None, Some("false")).unwrap();
        assert!(!req.show_volume);
        let req = ChartRequest::from_params(Some("A"), None, None, None, Some("yes")).unwrap();
        assert!(!req.show_volume);
    }

    #[test]
    fn test_parse_moving_averages() {
        assert_eq!(parse_moving_averages("20, 50 ,200"), Ok(vec![20, 50, 200]));
        assert_eq!(parse_moving_averages(""), Ok(vec![]));
        assert_eq!(
            parse_moving_averages("20,abc"),
            Err(RequestError::InvalidMovingAverages("abc".to_string()))
        );
        assert!(parse_moving_averages("20,,50").is_err());
        assert!(parse_moving_averages("0").is_err());
        assert!(parse_moving_averages("-5").is_err());
    }

    #[test]
    fn test_title() {
        let req = ChartRequest::from_params(Some("aapl"), Some("3mo"), None, Some("20,50"), None)
            .unwrap();
        assert_eq!(req.title(), "AAPL | 3mo | 1d | MA20, MA50");

        let req = ChartRequest::from_params(Some("aapl"), None, Some("1wk"), Some(""), None)
            .unwrap();
        assert_eq!(req.title(), "AAPL | 6mo | 1wk");
    }
}
