use crate::{
    config::{AppState, StorefrontConfig},
    handlers::{
        auth_google::{google_callback_handler, google_login_handler},
        auth_telegram::{telegram_callback_handler, telegram_login_handler},
        games::{get_game_handler, hot_games_handler, list_games_handler},
        orders::create_order_handler,
        payment_methods::payment_methods_handler,
        session::session_handler,
        telegram_image::telegram_image_handler,
        validate_user::{game_titles_handler, validate_user_handler},
    },
    utils::{load_certs, load_key},
};

use std::{net::SocketAddr, sync::Arc, time::Duration};
use anyhow::Context;
use axum::{
    Json, Router,
    http::{header::{AUTHORIZATION, CONTENT_TYPE}, Method},
    routing::{get, post},
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use rustls::ServerConfig as RustlsServerConfig;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::{cors::{Any, CorsLayer}, services::ServeDir};
use tracing::info;

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    let static_files = ServeDir::new(&state.cfg.public_dir);

    Router::new()
        .route("/api/games",                  get(list_games_handler))
        .route("/api/games/hot",              get(hot_games_handler))
        .route("/api/games/{id}",             get(get_game_handler))
        .route("/api/payment-methods",        get(payment_methods_handler))
        .route("/api/auth/telegram",          post(telegram_login_handler))
        .route("/api/auth/telegram/callback", get(telegram_callback_handler))
        .route("/api/auth/google",            get(google_login_handler))
        .route("/api/auth/google/callback",   get(google_callback_handler))
        .route("/api/session",                get(session_handler))
        .route("/api/telegram-image",         get(telegram_image_handler))
        .route("/api/validate-user",          post(validate_user_handler))
        .route("/api/game-titles",            get(game_titles_handler))
        .route("/api/orders",                 post(create_order_handler))
        .route("/health",                     get(health_handler))
        .fallback_service(static_files)
        .layer(cors)
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

pub async fn run(cfg: StorefrontConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = cfg.listen
        .parse()
        .context("invalid listen address")?;

    let tls_config = match cfg.tls_paths() {
        Some((cert, key)) => {
            let cert_chain = load_certs(cert).context("reading server certificate")?;
            let priv_key   = load_key(key).context("reading server private key")?;
            let srv_cfg    = RustlsServerConfig::builder()
                .with_no_client_auth()
                .with_single_cert(cert_chain, priv_key)
                .context("invalid TLS cert/key combo")?;
            Some(RustlsConfig::from_config(Arc::new(srv_cfg)))
        }
        None => None,
    };

    let state = AppState::new(cfg)?;
    let app = router(state);

    match tls_config {
        Some(tls_config) => {
            let handle = Handle::new();
            let shutdown = handle.clone();
            tokio::spawn(async move {
                shutdown_signal().await;
                shutdown.graceful_shutdown(Some(Duration::from_secs(10)));
            });

            info!(%addr, "storefront listening (https)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding {addr}"))?;
            info!(%addr, "storefront listening (http)");
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}
