use rustls_pemfile::{read_one, Item, certs};
use anyhow::{Context, Result};
use axum::{http::StatusCode, Json};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::{fs::File, io::BufReader};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};

// error shape every JSON handler returns
pub type HttpError = (StatusCode, Json<Value>);

pub fn http_err(status: StatusCode, msg: impl Into<String>) -> HttpError {
    (status, Json(json!({ "error": msg.into() })))
}

// same body for every sign-in failure, whatever the reason
pub fn auth_failed() -> HttpError {
    http_err(StatusCode::UNAUTHORIZED, "authentication failed")
}

// reads a cert file and gives back all x509 certs in it (PEM -> rustls::Certificate)
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .with_context(|| format!("opening certificate file `{}`", path))?;
    let mut rd = BufReader::new(file);

    let raw_certs = certs(&mut rd)
        .collect::<std::result::Result<_, _>>()
        .context("reading certificates from PEM")?;

    Ok(raw_certs)
}

// first private key of a PEM file, pkcs8 / sec1 / pkcs1
pub fn load_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let mut rd = BufReader::new(File::open(path)
        .with_context(|| format!("opening key file `{}`", path))?);

    loop {
        match read_one(&mut rd)
            .context("reading PEM block")?
        {
            Some(Item::Pkcs8Key(key)) => return Ok(PrivateKeyDer::from(key)),
            Some(Item::Sec1Key(key))  => return Ok(PrivateKeyDer::from(key)),
            Some(Item::Pkcs1Key(key)) => return Ok(PrivateKeyDer::from(key)),
            Some(_)                   => continue,
            None                      => break,
        }
    }
    anyhow::bail!("no private key found in `{}`", path);
}

/// Accepts `"123"` as well as `123`; the login widget and the supplier API
/// are not consistent about which one they send.
pub fn string_or_number<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(de)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(
            format!("expected string or number, got {other}"),
        )),
    }
}

pub fn opt_string_or_number<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(de)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s))   => Ok(Some(s)),
        Some(Value::Number(n))   => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(
            format!("expected string or number, got {other}"),
        )),
    }
}

// id-ID grouping: 1500000 -> "1.500.000"
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

/// Leading-integer parse: surrounding junk after the digits is ignored,
/// no digits at all is `None`.
pub fn parse_leading_int(s: &str) -> Option<i64> {
    let t = s.trim_start();
    let (neg, rest) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _          => (false, t),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let v: i64 = rest[..end].parse().ok()?;
    Some(if neg { -v } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1.000");
        assert_eq!(format_thousands(50000), "50.000");
        assert_eq!(format_thousands(1500000), "1.500.000");
    }

    #[test]
    fn leading_int_behaves_like_parse_int() {
        assert_eq!(parse_leading_int("15000"), Some(15000));
        assert_eq!(parse_leading_int("  15000 "), Some(15000));
        assert_eq!(parse_leading_int("15.000"), Some(15));
        assert_eq!(parse_leading_int("-5x"), Some(-5));
        assert_eq!(parse_leading_int("abc"), None);
        assert_eq!(parse_leading_int(""), None);
        assert_eq!(parse_leading_int("-"), None);
    }

    #[derive(Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "string_or_number")]
        id: String,
        #[serde(default, deserialize_with = "opt_string_or_number")]
        date: Option<String>,
    }

    #[test]
    fn numbers_and_strings_both_land_as_text() {
        let p: Probe = serde_json::from_str(r#"{"id": 42, "date": "17"}"#).unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(p.date.as_deref(), Some("17"));

        let p: Probe = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(p.date, None);

        assert!(serde_json::from_str::<Probe>(r#"{"id": true}"#).is_err());
    }
}
