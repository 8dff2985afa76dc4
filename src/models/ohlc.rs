// ============================================================================
// Structure : Bar / PriceSeries (Open, High, Low, Close, Volume)
// ============================================================================
// Représente les chandelles japonaises (candlesticks) d'un ticker
//
// CONCEPTS RUST :
// 1. DateTime<Local> : type de chrono pour dates dans le fuseau local
// 2. f64 : floating point 64 bits pour les prix (précision suffisante)
// 3. u64 : unsigned 64 bits pour le volume (toujours positif)
// 4. Encapsulation : le Vec de PriceSeries est privé pour garder l'ordre
// ============================================================================

use chrono::{DateTime, Local};

/// Une chandelle japonaise (candlestick) sur un intervalle fixe
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    /// Début de l'intervalle, en heure locale
    pub timestamp: DateTime<Local>,

    /// Prix d'ouverture (Open)
    pub open: f64,

    /// Prix le plus haut (High)
    pub high: f64,

    /// Prix le plus bas (Low)
    pub low: f64,

    /// Prix de clôture (Close)
    pub close: f64,

    /// Volume échangé
    pub volume: u64,
}

impl Bar {
    /// Constructeur : crée une nouvelle chandelle
    pub fn new(
        timestamp: DateTime<Local>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Chandelle haussière : close >= open (une doji compte comme haussière)
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }

    /// Haut du corps de la chandelle
    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Bas du corps de la chandelle
    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }
}

/// Série de chandelles pour un ticker, triée par timestamp croissant
///
/// CONCEPT RUST : Invariant protégé par le constructeur
/// - `bars` n'est pas public : la seule façon de construire une série est
///   `from_bars`, qui trie et supprime les timestamps en double
/// - Une fois construite, la série n'est plus modifiable
#[derive(Debug, Clone)]
pub struct PriceSeries {
    /// Symbole du ticker (normalisé en majuscules)
    pub symbol: String,

    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Construit une série à partir de chandelles dans un ordre quelconque
    ///
    /// Le tri est stable : en cas de timestamp dupliqué, la première
    /// chandelle reçue est conservée.
    pub fn from_bars(symbol: impl Into<String>, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.timestamp);
        bars.dedup_by_key(|bar| bar.timestamp);

        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Toutes les chandelles, de la plus ancienne à la plus récente
    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Retourne le nombre de chandelles
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Vérifie si la série est vide
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Retourne la chandelle la plus récente
    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Retourne l'avant-dernière chandelle
    pub fn previous(&self) -> Option<&Bar> {
        self.bars.len().checked_sub(2).map(|i| &self.bars[i])
    }

    /// Prix minimum (low) sur toute la période
    pub fn min_low(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.low).reduce(f64::min)
    }

    /// Prix maximum (high) sur toute la période
    pub fn max_high(&self) -> Option<f64> {
        self.bars.iter().map(|b| b.high).reduce(f64::max)
    }

    /// Volume maximum sur toute la période
    pub fn max_volume(&self) -> Option<u64> {
        self.bars.iter().map(|b| b.volume).max()
    }

    /// Moyenne mobile simple (SMA) des clôtures sur `window` chandelles
    ///
    /// Le résultat a la même longueur que la série. Les positions qui n'ont
    /// pas encore `window` chandelles derrière elles valent `None`.
    ///
    /// CONCEPT : Fenêtre glissante
    /// - On maintient la somme courante au lieu de resommer chaque fenêtre
    /// - Ajout de la nouvelle clôture, retrait de celle qui sort
    pub fn simple_moving_average(&self, window: usize) -> Vec<Option<f64>> {
        let mut out = Vec::with_capacity(self.bars.len());
        if window == 0 {
            out.resize(self.bars.len(), None);
            return out;
        }

        let mut sum = 0.0;
        for (i, bar) in self.bars.iter().enumerate() {
            sum += bar.close;
            if i >= window {
                sum -= self.bars[i - window].close;
            }

            if i + 1 >= window {
                out.push(Some(sum / window as f64));
            } else {
                out.push(None);
            }
        }
        out
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
