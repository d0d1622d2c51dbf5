// src/config.rs
use std::path::{Path, PathBuf};
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "PRICEWATCH_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/pricewatch.toml";

/// Env var holding the book-store session cookie when the config file says
/// `session_cookie = "ENV"`. Secrets never live in the file itself.
pub const ENV_LITRES_SESSION: &str = "LITRES_SESSION_ID";

fn default_max_items() -> usize {
    24
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_results() -> usize {
    20
}
fn default_currency() -> String {
    "RUB".to_string()
}
fn default_steam_base_url() -> String {
    "https://store.steampowered.com/api".to_string()
}
fn default_steam_store_url() -> String {
    "https://store.steampowered.com".to_string()
}
fn default_steam_country() -> String {
    "ru".to_string()
}
fn default_steam_language() -> String {
    "russian".to_string()
}
fn default_litres_base_url() -> String {
    "https://api.litres.ru/foundation".to_string()
}
fn default_litres_site_url() -> String {
    "https://www.litres.ru".to_string()
}
fn default_env_sentinel() -> String {
    "ENV".to_string()
}
fn default_rates_base_url() -> String {
    "https://www.cbr.ru".to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub aggregator: AggregatorConfig,
    #[serde(default)]
    pub steam: SteamConfig,
    #[serde(default)]
    pub litres: LitresConfig,
    #[serde(default)]
    pub rates: RatesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    /// Result cap per response; bounds render cost.
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SteamConfig {
    #[serde(default = "default_steam_base_url")]
    pub base_url: String,
    /// Public store pages; item detail URLs point here.
    #[serde(default = "default_steam_store_url")]
    pub store_url: String,
    #[serde(default = "default_steam_country")]
    pub country: String,
    #[serde(default = "default_steam_language")]
    pub language: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on stubs taken from one listing response (and thus on
    /// per-item detail calls issued for it).
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SteamConfig {
    fn default() -> Self {
        Self {
            base_url: default_steam_base_url(),
            store_url: default_steam_store_url(),
            country: default_steam_country(),
            language: default_steam_language(),
            currency: default_currency(),
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LitresConfig {
    #[serde(default = "default_litres_base_url")]
    pub base_url: String,
    /// Public site; item detail URLs point here.
    #[serde(default = "default_litres_site_url")]
    pub site_url: String,
    /// `"ENV"` resolves from `LITRES_SESSION_ID` at load time; any other
    /// value is used literally; empty disables the cookie header.
    #[serde(default = "default_env_sentinel")]
    pub session_cookie: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for LitresConfig {
    fn default() -> Self {
        Self {
            base_url: default_litres_base_url(),
            site_url: default_litres_site_url(),
            session_cookie: default_env_sentinel(),
            currency: default_currency(),
            timeout_secs: default_timeout_secs(),
            max_results: default_max_results(),
        }
    }
}

impl LitresConfig {
    /// Cookie value to send, if any. Empty means anonymous access.
    pub fn session_cookie(&self) -> Option<&str> {
        let v = self.session_cookie.trim();
        (!v.is_empty()).then_some(v)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "default_rates_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RatesConfig {
    fn default() -> Self {
        Self {
            base_url: default_rates_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut cfg: AppConfig = toml::from_str(&content)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        cfg.resolve_secrets();
        Ok(cfg)
    }

    /// Load using env var + fallbacks:
    /// 1) $PRICEWATCH_CONFIG_PATH (must exist when set)
    /// 2) config/pricewatch.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        let mut cfg = AppConfig::default();
        cfg.resolve_secrets();
        Ok(cfg)
    }

    /// Replace `"ENV"` sentinels with the corresponding environment values.
    /// A missing env var resolves to empty (the feature is simply disabled);
    /// secrets are never required for the service to boot.
    fn resolve_secrets(&mut self) {
        if self.litres.session_cookie.trim().eq_ignore_ascii_case("env") {
            self.litres.session_cookie = env::var(ENV_LITRES_SESSION).unwrap_or_default();
        }
    }
}
