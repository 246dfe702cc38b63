use crate::{
    crypto::{data_check_string, telegram_secret, verify_data_check},
    utils::opt_string_or_number,
};
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AUTH_MAX_AGE_SECS: u64 = 3600;

// everything optional: a missing field must end in the same rejection as a
// forged one, not in a deserializer error
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct TelegramPayload {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub id:         Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name:  Option<String>,
    #[serde(default)]
    pub username:   Option<String>,
    #[serde(default)]
    pub photo_url:  Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub auth_date:  Option<String>,
    #[serde(default)]
    pub hash:       Option<String>,
}

impl TelegramPayload {
    pub fn signed_fields(&self) -> [(&str, Option<&str>); 6] {
        [
            ("id",         self.id.as_deref()),
            ("first_name", self.first_name.as_deref()),
            ("last_name",  self.last_name.as_deref()),
            ("username",   self.username.as_deref()),
            ("photo_url",  self.photo_url.as_deref()),
            ("auth_date",  self.auth_date.as_deref()),
        ]
    }

    pub fn data_check_string(&self) -> String {
        data_check_string(self.signed_fields())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramIdentity {
    pub id:    String,
    pub name:  String,
    pub image: String,
}

#[derive(Clone, Debug)]
pub struct TelegramVerifier {
    bot_token:    Option<String>,
    max_age_secs: i64,
}

impl TelegramVerifier {
    pub fn new(bot_token: Option<String>, max_age_secs: u64) -> Self {
        Self {
            bot_token: bot_token.filter(|t| !t.is_empty()),
            max_age_secs: i64::try_from(max_age_secs).unwrap_or(i64::MAX),
        }
    }

    // error text is for the log only
    pub fn verify(&self, payload: &TelegramPayload, now: i64) -> Result<TelegramIdentity> {
        let id = non_empty(&payload.id).ok_or_else(|| anyhow!("missing id"))?;
        let hash = non_empty(&payload.hash).ok_or_else(|| anyhow!("missing hash"))?;
        let bot_token = self.bot_token
            .as_deref()
            .ok_or_else(|| anyhow!("bot token not configured"))?;

        let secret = telegram_secret(bot_token);
        verify_data_check(&secret, &payload.data_check_string(), hash)
            .context("hash verification failed")?;

        let auth_date: i64 = non_empty(&payload.auth_date)
            .ok_or_else(|| anyhow!("missing auth_date"))?
            .trim()
            .parse()
            .context("auth_date is not a unix timestamp")?;
        let age = now.saturating_sub(auth_date);
        if age > self.max_age_secs {
            bail!("auth_date is too old ({age}s > {}s)", self.max_age_secs);
        }

        Ok(TelegramIdentity {
            id:    id.to_string(),
            name:  display_name(payload, id),
            image: avatar_proxy_path(id, non_empty(&payload.photo_url)),
        })
    }
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().filter(|s| !s.is_empty())
}

fn display_name(payload: &TelegramPayload, id: &str) -> String {
    let full = format!(
        "{} {}",
        payload.first_name.as_deref().unwrap_or(""),
        payload.last_name.as_deref().unwrap_or(""),
    );
    let full = full.trim();
    if !full.is_empty() {
        return full.to_string();
    }
    non_empty(&payload.username).unwrap_or(id).to_string()
}

// file URLs embed the bot token; the browser only sees the proxy path
pub fn avatar_proxy_path(id: &str, photo_url: Option<&str>) -> String {
    let mut q = url::form_urlencoded::Serializer::new(String::new());
    q.append_pair("id", id);
    if let Some(u) = photo_url {
        q.append_pair("url", u);
    }
    format!("/api/telegram-image?{}", q.finish())
}
