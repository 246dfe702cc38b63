use crate::{
    config::GoogleConfig,
    session::{SessionUser, PROVIDER_GOOGLE},
};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

pub const SCOPES: &str = "openid email profile";

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct GoogleProfile {
    pub sub:     String,
    #[serde(default)]
    pub name:    Option<String>,
    #[serde(default)]
    pub email:   Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleProfile {
    pub fn into_session_user(self) -> SessionUser {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .or(self.email)
            .unwrap_or_else(|| self.sub.clone());
        SessionUser {
            id:       self.sub,
            name,
            image:    self.picture,
            provider: PROVIDER_GOOGLE.into(),
        }
    }
}

fn client_credentials(cfg: &GoogleConfig) -> Result<(&str, &str, &str)> {
    match (
        cfg.client_id.as_deref().filter(|s| !s.is_empty()),
        cfg.client_secret.as_deref().filter(|s| !s.is_empty()),
        cfg.redirect_url.as_deref().filter(|s| !s.is_empty()),
    ) {
        (Some(id), Some(secret), Some(redirect)) => Ok((id, secret, redirect)),
        _ => bail!("google sign-in is not configured"),
    }
}

pub fn authorize_url(cfg: &GoogleConfig, state: &str) -> Result<String> {
    let (client_id, _, redirect) = client_credentials(cfg)?;
    let url = Url::parse_with_params(
        &cfg.auth_url,
        &[
            ("client_id",     client_id),
            ("redirect_uri",  redirect),
            ("response_type", "code"),
            ("scope",         SCOPES),
            ("state",         state),
            ("prompt",        "select_account"),
        ],
    )
    .context("google auth_url")?;
    Ok(url.into())
}

/// Trades the callback `code` for the user's profile.
pub async fn exchange_code(http: &Client, cfg: &GoogleConfig, code: &str) -> Result<GoogleProfile> {
    let (client_id, client_secret, redirect) = client_credentials(cfg)?;

    let resp = http
        .post(&cfg.token_url)
        .form(&[
            ("code",          code),
            ("client_id",     client_id),
            ("client_secret", client_secret),
            ("redirect_uri",  redirect),
            ("grant_type",    "authorization_code"),
        ])
        .send()
        .await
        .map_err(|e| anyhow!("token request failed: {}", e.without_url()))?;
    if !resp.status().is_success() {
        bail!("token endpoint returned {}", resp.status());
    }
    let token: TokenResponse = resp.json().await.context("token response")?;

    let resp = http
        .get(&cfg.userinfo_url)
        .bearer_auth(&token.access_token)
        .send()
        .await
        .map_err(|e| anyhow!("userinfo request failed: {}", e.without_url()))?;
    if !resp.status().is_success() {
        bail!("userinfo endpoint returned {}", resp.status());
    }
    resp.json().await.context("userinfo response")
}
