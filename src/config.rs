use crate::{
    auth::{TelegramVerifier, DEFAULT_AUTH_MAX_AGE_SECS},
    catalog::SeedCatalog,
};

use serde::Deserialize;
use std::{env, fs, path::Path, sync::Arc};
use anyhow::{bail, Context, Result};
use tracing::warn;

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    #[default]
    Remote,
    Seed,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,          // env TELEGRAM_BOT_TOKEN wins
    pub auth_max_age_secs: u64,             // ex 3600
    pub api_base: String,                   // ex https://api.telegram.org
    pub placeholder_path: String,           // ex public/placeholder-user.svg
    pub backup_hosts: Vec<String>,          // empty = any http(s) host
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token:         None,
            auth_max_age_secs: DEFAULT_AUTH_MAX_AGE_SECS,
            api_base:          "https://api.telegram.org".into(),
            placeholder_path:  "public/placeholder-user.svg".into(),
            backup_hosts:      Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub source: CatalogSource,              // "remote" | "seed"
    pub remote_url: String,
    pub seed_path: String,                  // ex config/seed_catalog.json
    pub hot_ids: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source:     CatalogSource::Remote,
            remote_url: "https://portal.murapay.id/api/custom/Produk/parseProduk/voucher_game".into(),
            seed_path:  "config/seed_catalog.json".into(),
            hot_ids:    [
                "mobile-legends", "free-fire", "pubg-mobile",
                "genshin-impact", "honor-of-kings", "roblox",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub api_url: String,                    // ex http://localhost:5050
    pub api_key: Option<String>,
    pub timeout_ms: u64,                    // ex 5000
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            api_url:    "http://localhost:5050".into(),
            api_key:    None,
            timeout_ms: 5000,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_url: Option<String>,       // ex https://shop.example/api/auth/google/callback
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id:     None,
            client_secret: None,
            redirect_url:  None,
            auth_url:      "https://accounts.google.com/o/oauth2/v2/auth".into(),
            token_url:     "https://oauth2.googleapis.com/token".into(),
            userinfo_url:  "https://openidconnect.googleapis.com/v1/userinfo".into(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    pub listen: String,                     // ex 0.0.0.0:8080
    pub public_dir: String,                 // ex public
    pub https_cert: Option<String>,         // both set -> TLS
    pub https_key: Option<String>,
    pub session_secret: Option<String>,     // env SESSION_SECRET wins
    pub session_ttl_secs: u64,              // ex 604800
    pub telegram: TelegramConfig,
    pub catalog: CatalogConfig,
    pub validation: ValidationConfig,
    pub google: GoogleConfig,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            listen:           "0.0.0.0:8080".into(),
            public_dir:       "public".into(),
            https_cert:       None,
            https_key:        None,
            session_secret:   None,
            session_ttl_secs: 7 * 24 * 3600,
            telegram:         TelegramConfig::default(),
            catalog:          CatalogConfig::default(),
            validation:       ValidationConfig::default(),
            google:           GoogleConfig::default(),
        }
    }
}

impl StorefrontConfig {
    pub fn load(path: &str) -> Result<Self> {
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config file `{}`", path))?;
        let mut cfg = Self::parse(&s)
            .with_context(|| format!("parsing `{}` as TOML", path))?;
        cfg.apply_env(|k| env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn parse(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Secrets live in the environment in production; a set variable
    /// replaces whatever the file says.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| var(k).filter(|v| !v.is_empty());

        if let Some(v) = var("TELEGRAM_BOT_TOKEN")   { self.telegram.bot_token = Some(v); }
        if let Some(v) = var("SESSION_SECRET")       { self.session_secret = Some(v); }
        if let Some(v) = var("GOOGLE_CLIENT_ID")     { self.google.client_id = Some(v); }
        if let Some(v) = var("GOOGLE_CLIENT_SECRET") { self.google.client_secret = Some(v); }
        if let Some(v) = var("API_SYNC_USER_URL")    { self.validation.api_url = v; }
        if let Some(v) = var("API_SYNC_USER_KEY")    { self.validation.api_key = Some(v); }
        if let Some(v) = var("API_SYNC_USER_TIMEOUT") {
            self.validation.timeout_ms = v
                .trim()
                .parse()
                .with_context(|| format!("API_SYNC_USER_TIMEOUT `{}` is not milliseconds", v))?;
        }
        Ok(())
    }

    pub fn tls_paths(&self) -> Option<(&str, &str)> {
        match (self.https_cert.as_deref(), self.https_key.as_deref()) {
            (Some(c), Some(k)) if !c.is_empty() && !k.is_empty() => Some((c, k)),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub store_path: String,                 // ex data/transactions.json
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { store_path: "data/transactions.json".into() }
    }
}

impl HistoryConfig {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Ok(Self::default());
        }
        let s = fs::read_to_string(path)
            .with_context(|| format!("reading config file `{}`", path))?;
        toml::from_str(&s).with_context(|| format!("parsing `{}` as TOML", path))
    }
}

#[derive(Clone)]
pub struct AppState { // everything a handler may touch, cloned per request
    pub cfg:      Arc<StorefrontConfig>,
    pub http:     reqwest::Client,
    pub seed:     Arc<SeedCatalog>,
    pub verifier: TelegramVerifier,
}

impl AppState {
    pub fn new(cfg: StorefrontConfig) -> Result<Self> {
        let seed = match SeedCatalog::load(Path::new(&cfg.catalog.seed_path)) {
            Ok(seed) => seed,
            Err(e) if cfg.catalog.source == CatalogSource::Seed => {
                return Err(e.context("catalog.source is `seed` but the seed file is unusable"));
            }
            Err(e) => {
                warn!(error = %format!("{e:#}"), "seed catalog unavailable; hot games and payment methods will be empty");
                SeedCatalog::default()
            }
        };

        if cfg.session_secret.as_deref().is_none_or(str::is_empty) {
            warn!("session_secret is not set; every sign-in will be refused");
        }
        if cfg.telegram.bot_token.as_deref().is_none_or(str::is_empty) {
            warn!("telegram bot token is not set; telegram sign-in and avatars are disabled");
        }
        if cfg.https_cert.is_some() != cfg.https_key.is_some() {
            bail!("https_cert and https_key must be set together");
        }

        let http = reqwest::Client::builder()
            .build()
            .context("building http client")?;

        let verifier = TelegramVerifier::new(
            cfg.telegram.bot_token.clone(),
            cfg.telegram.auth_max_age_secs,
        );

        Ok(Self {
            cfg: Arc::new(cfg),
            http,
            seed: Arc::new(seed),
            verifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = StorefrontConfig::parse("").unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:8080");
        assert_eq!(cfg.session_ttl_secs, 604_800);
        assert_eq!(cfg.telegram.auth_max_age_secs, 3600);
        assert_eq!(cfg.validation.timeout_ms, 5000);
        assert_eq!(cfg.catalog.source, CatalogSource::Remote);
        assert!(cfg.tls_paths().is_none());
    }

    #[test]
    fn sections_parse() {
        let cfg = StorefrontConfig::parse(
            r#"
            listen = "127.0.0.1:9000"
            https_cert = "a.crt"
            https_key = "a.key"

            [telegram]
            auth_max_age_secs = 120
            backup_hosts = ["t.me"]

            [catalog]
            source = "seed"
            "#,
        ).unwrap();
        assert_eq!(cfg.listen, "127.0.0.1:9000");
        assert_eq!(cfg.telegram.auth_max_age_secs, 120);
        assert_eq!(cfg.telegram.api_base, "https://api.telegram.org");
        assert_eq!(cfg.catalog.source, CatalogSource::Seed);
        assert_eq!(cfg.tls_paths(), Some(("a.crt", "a.key")));
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(StorefrontConfig::parse("[catalog]\nsource = \"ftp\"").is_err());
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TELEGRAM_BOT_TOKEN", "1:abc"),
            ("SESSION_SECRET", "s3cret"),
            ("API_SYNC_USER_URL", "http://sync:5050"),
            ("API_SYNC_USER_TIMEOUT", "750"),
            ("API_SYNC_USER_KEY", ""),
        ].into();
        let mut cfg = StorefrontConfig::parse("session_secret = \"from-file\"").unwrap();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.telegram.bot_token.as_deref(), Some("1:abc"));
        assert_eq!(cfg.session_secret.as_deref(), Some("s3cret"));
        assert_eq!(cfg.validation.api_url, "http://sync:5050");
        assert_eq!(cfg.validation.timeout_ms, 750);
        assert_eq!(cfg.validation.api_key, None);

        let mut cfg = StorefrontConfig::default();
        assert!(cfg.apply_env(|k| (k == "API_SYNC_USER_TIMEOUT").then(|| "soon".into())).is_err());
    }

    #[test]
    fn seed_source_requires_the_seed_file() {
        let mut cfg = StorefrontConfig::default();
        cfg.catalog.source = CatalogSource::Seed;
        cfg.catalog.seed_path = "does/not/exist.json".into();
        assert!(AppState::new(cfg.clone()).is_err());

        cfg.catalog.source = CatalogSource::Remote;
        let state = AppState::new(cfg).unwrap();
        assert!(state.seed.games.is_empty());
    }

    #[test]
    fn half_tls_config_is_rejected() {
        let cfg = StorefrontConfig {
            https_cert: Some("a.crt".into()),
            ..StorefrontConfig::default()
        };
        assert!(AppState::new(cfg).is_err());
    }
}
