use crate::config::TelegramConfig;
use anyhow::{anyhow, bail, Context, Result};
use reqwest::{header, Client};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};
use url::Url;

pub const CACHE_CONTROL: &str = "public, max-age=86400, s-maxage=86400";
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AvatarSource {
    BotApi,
    Backup,
    Placeholder,
}

#[derive(Clone, Debug)]
pub struct AvatarImage {
    pub bytes:        Vec<u8>,
    pub content_type: String,
    pub source:       AvatarSource,
}

#[derive(Deserialize)]
struct BotResponse<T> {
    ok:     bool,
    result: Option<T>,
}

#[derive(Deserialize)]
struct UserProfilePhotos {
    #[serde(default)]
    total_count: u64,
    #[serde(default)]
    photos:      Vec<Vec<PhotoSize>>,
}

#[derive(Deserialize)]
struct PhotoSize {
    file_id: String,
}

#[derive(Deserialize)]
struct BotFile {
    file_path: Option<String>,
}

async fn bot_call<T: for<'de> Deserialize<'de>>(http: &Client, url: &str) -> Result<T> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| anyhow!("bot api request failed: {}", e.without_url()))?;
    let body: BotResponse<T> = resp
        .json()
        .await
        .map_err(|e| anyhow!("bot api body: {}", e.without_url()))?;
    match (body.ok, body.result) {
        (true, Some(r)) => Ok(r),
        _ => Err(anyhow!("bot api returned ok=false")),
    }
}

async fn download(http: &Client, url: &str) -> Result<(Vec<u8>, String)> {
    let resp = http
        .get(url)
        .header(header::USER_AGENT, BROWSER_UA)
        .send()
        .await
        .map_err(|e| anyhow!("image request failed: {}", e.without_url()))?;
    if !resp.status().is_success() {
        return Err(anyhow!("image request returned {}", resp.status()));
    }
    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("image/jpeg")
        .to_string();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| anyhow!("image body: {}", e.without_url()))?;
    Ok((bytes.to_vec(), content_type))
}

pub async fn fetch_from_bot_api(
    http: &Client,
    api_base: &str,
    bot_token: &str,
    user_id: &str,
) -> Result<(Vec<u8>, String)> {
    let base = api_base.trim_end_matches('/');

    let mut photos_url = Url::parse(&format!("{base}/bot{bot_token}/getUserProfilePhotos"))
        .context("bot api base url")?;
    photos_url
        .query_pairs_mut()
        .append_pair("user_id", user_id)
        .append_pair("limit", "1");
    let photos: UserProfilePhotos = bot_call(http, photos_url.as_str()).await?;

    if photos.total_count == 0 {
        bail!("user has no profile photos");
    }
    let file_id = photos
        .photos
        .first()
        .and_then(|sizes| sizes.first())
        .map(|p| p.file_id.clone())
        .ok_or_else(|| anyhow!("user has no profile photos"))?;

    let mut file_url = Url::parse(&format!("{base}/bot{bot_token}/getFile"))
        .context("bot api base url")?;
    file_url.query_pairs_mut().append_pair("file_id", &file_id);
    let file: BotFile = bot_call(http, file_url.as_str()).await?;
    let path = file.file_path.ok_or_else(|| anyhow!("getFile returned no file_path"))?;

    download(http, &format!("{base}/file/bot{bot_token}/{path}")).await
}

pub fn backup_allowed(url: &str, hosts: &[String]) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if hosts.is_empty() {
        return true;
    }
    parsed
        .host_str()
        .is_some_and(|h| hosts.iter().any(|allowed| allowed.eq_ignore_ascii_case(h)))
}

pub fn placeholder_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("svg")          => "image/svg+xml",
        Some("png")          => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("webp")         => "image/webp",
        Some("gif")          => "image/gif",
        _                    => "application/octet-stream",
    }
}

// bot api, then photo_url; None when both fail
pub async fn resolve_avatar(
    http: &Client,
    cfg: &TelegramConfig,
    user_id: &str,
    backup_url: Option<&str>,
) -> Option<AvatarImage> {
    if let Some(token) = cfg.bot_token.as_deref().filter(|t| !t.is_empty()) {
        match fetch_from_bot_api(http, &cfg.api_base, token, user_id).await {
            Ok((bytes, content_type)) => {
                debug!(user_id, "avatar from bot api");
                return Some(AvatarImage { bytes, content_type, source: AvatarSource::BotApi });
            }
            Err(e) => debug!(user_id, error = %e, "bot api avatar unavailable"),
        }
    }

    if let Some(url) = backup_url.filter(|u| !u.is_empty()) {
        if backup_allowed(url, &cfg.backup_hosts) {
            match download(http, url).await {
                Ok((bytes, content_type)) => {
                    debug!(user_id, "avatar from backup url");
                    return Some(AvatarImage { bytes, content_type, source: AvatarSource::Backup });
                }
                Err(e) => debug!(user_id, error = %e, "backup avatar unavailable"),
            }
        } else {
            warn!(user_id, "backup avatar url rejected");
        }
    }

    let path = Path::new(&cfg.placeholder_path);
    match tokio::fs::read(path).await {
        Ok(bytes) => Some(AvatarImage {
            bytes,
            content_type: placeholder_content_type(path).into(),
            source: AvatarSource::Placeholder,
        }),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "placeholder avatar missing");
            None
        }
    }
}
