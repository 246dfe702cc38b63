pub mod config;         // loads storefront.toml / history.toml, shared AppState
pub mod crypto;         // HMAC-SHA256 data-check signing, transaction code key
pub mod auth;           // login-widget credential verifier
pub mod session;        // HS256 session tokens and OAuth state
pub mod google;         // Google OAuth2 code exchange
pub mod catalog;        // supplier catalog normalizer, seed catalog
pub mod avatar;         // Bot API / backup / placeholder avatar lookup
pub mod validation;     // player + server ID checks, sync-user relay
pub mod storage;        // local JSON transaction history
pub mod utils;          // misc helpers (errors, TLS files, number formatting)
pub mod mode;           // per-binary orchestration logic
pub mod handlers;       // handlers for Axum API
