// ============================================================================
// Configuration du service
// ============================================================================
// Lue depuis les variables d'environnement (après chargement optionnel d'un
// fichier .env par dotenv dans main) :
//
// - PORT               : port d'écoute (défaut 5000)
// - DEBUG              : "true" active le mode verbeux (défaut false)
// - HOST               : adresse d'écoute (défaut 0.0.0.0)
// - YAHOO_BASE_URL     : URL de l'API Yahoo Finance
// - FETCH_TIMEOUT_SECS : timeout des appels à Yahoo (défaut 10)
// - LOG_DIR            : si défini, logs fichier avec rotation quotidienne
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::api::yahoo::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};

/// Port par défaut
pub const DEFAULT_PORT: u16 = 5000;

/// Configuration complète du serveur
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub debug: bool,
    pub yahoo_base_url: String,
    pub fetch_timeout: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            debug: false,
            yahoo_base_url: DEFAULT_BASE_URL.to_string(),
            fetch_timeout: DEFAULT_TIMEOUT,
            log_dir: None,
        }
    }
}

impl Config {
    /// Lit la configuration depuis l'environnement du process
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Lit la configuration via une fonction de lookup
    ///
    /// CONCEPT RUST : Closure en paramètre
    /// - En production : std::env::var
    /// - En test : une HashMap, sans toucher à l'environnement global
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match var("PORT") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("PORT invalide : {:?}", v))?,
            None => defaults.port,
        };

        let host = match var("HOST") {
            Some(v) => v
                .trim()
                .parse()
                .with_context(|| format!("HOST invalide : {:?}", v))?,
            None => defaults.host,
        };

        let debug = var("DEBUG")
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(defaults.debug);

        let fetch_timeout = match var("FETCH_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .with_context(|| format!("FETCH_TIMEOUT_SECS invalide : {:?}", v))?,
            ),
            None => defaults.fetch_timeout,
        };

        Ok(Self {
            host,
            port,
            debug,
            yahoo_base_url: var("YAHOO_BASE_URL").unwrap_or(defaults.yahoo_base_url),
            fetch_timeout,
            log_dir: var("LOG_DIR").map(PathBuf::from),
        })
    }

    /// Adresse d'écoute du serveur
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Filtre de logs quand RUST_LOG n'est pas défini
    pub fn default_log_filter(&self) -> &'static str {
        if self.debug {
            "stockchart=debug,tower_http=debug,info"
        } else {
            "stockchart=info,tower_http=info,warn"
        }
    }
}
