use anyhow::{anyhow, Context, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

type HmacSha256 = Hmac<Sha256>;

/// Keys of a login-widget payload that take part in the signature.
pub const TELEGRAM_SIGNED_FIELDS: &[&str] = &[
    "auth_date", "first_name", "id", "last_name", "photo_url", "username",
];

/// Sorted `key=value` lines joined by `\n`. Keys outside the whitelist and
/// empty values are skipped.
pub fn data_check_string<'a, I>(fields: I) -> String
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let kept: BTreeMap<&str, &str> = fields
        .into_iter()
        .filter(|(k, _)| TELEGRAM_SIGNED_FIELDS.contains(k))
        .filter_map(|(k, v)| v.filter(|v| !v.is_empty()).map(|v| (k, v)))
        .collect();

    kept.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

// the widget secret is the raw sha256 of the bot token, not its hex form
pub fn telegram_secret(bot_token: &str) -> [u8; 32] {
    Sha256::digest(bot_token.as_bytes()).into()
}

pub fn sign_data_check(secret: &[u8], data_check: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| anyhow!("hmac key"))?;
    mac.update(data_check.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature over `data_check`.
pub fn verify_data_check(secret: &[u8], data_check: &str, hash_hex: &str) -> Result<()> {
    let expected = hex::decode(hash_hex.trim())
        .context("signature is not hex")?;
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|_| anyhow!("hmac key"))?;
    mac.update(data_check.as_bytes());
    mac.verify_slice(&expected)
        .map_err(|_| anyhow!("bad signature"))
}

/// First 16 hex chars of sha256(input), upper-cased.
pub fn code_key_digest(input: &str) -> String {
    let digest = hex::encode(Sha256::digest(input.as_bytes()));
    digest[..16].to_ascii_uppercase()
}
