use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const PROVIDER_TELEGRAM: &str = "telegram";
pub const PROVIDER_GOOGLE: &str = "google";

// what the storefront front end gets to see about the signed-in user
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id:       String,
    pub name:     String,
    pub image:    Option<String>,
    pub provider: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub:      String,
    pub name:     String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture:  Option<String>,
    pub provider: String,
    pub iat:      i64,
    pub exp:      i64,
}

impl From<SessionClaims> for SessionUser {
    fn from(c: SessionClaims) -> Self {
        SessionUser {
            id:       c.sub,
            name:     c.name,
            image:    c.picture,
            provider: c.provider,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OAuthState {
    purpose: String,
    nonce:   String,
    exp:     i64,
}

const OAUTH_STATE_PURPOSE: &str = "google-oauth-state";

fn secret_bytes(secret: Option<&str>) -> Result<&[u8]> {
    secret
        .filter(|s| !s.is_empty())
        .map(str::as_bytes)
        .ok_or_else(|| anyhow!("session secret not configured"))
}

pub fn issue_session(secret: Option<&str>, user: &SessionUser, ttl_secs: u64, now: i64) -> Result<String> {
    let key = EncodingKey::from_secret(secret_bytes(secret)?);
    let claims = SessionClaims {
        sub:      user.id.clone(),
        name:     user.name.clone(),
        picture:  user.image.clone(),
        provider: user.provider.clone(),
        iat:      now,
        exp:      now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
    };
    encode(&Header::new(Algorithm::HS256), &claims, &key)
        .context("signing session token")
}

pub fn decode_session(secret: Option<&str>, token: &str) -> Result<SessionClaims> {
    let key = DecodingKey::from_secret(secret_bytes(secret)?);
    let data = decode::<SessionClaims>(token, &key, &Validation::new(Algorithm::HS256))
        .context("decoding session token")?;
    Ok(data.claims)
}

/// Short-lived signed `state` for the OAuth redirect; nothing is kept on
/// the server between the redirect and the callback.
pub fn issue_oauth_state(secret: Option<&str>, ttl_secs: i64, now: i64) -> Result<String> {
    let key = EncodingKey::from_secret(secret_bytes(secret)?);
    let nonce: String = {
        use rand::{distributions::Alphanumeric, Rng};
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(24)
            .map(char::from)
            .collect()
    };
    let state = OAuthState {
        purpose: OAUTH_STATE_PURPOSE.into(),
        nonce,
        exp: now + ttl_secs,
    };
    encode(&Header::new(Algorithm::HS256), &state, &key)
        .context("signing oauth state")
}

pub fn check_oauth_state(secret: Option<&str>, state: &str) -> Result<()> {
    let key = DecodingKey::from_secret(secret_bytes(secret)?);
    let data = decode::<OAuthState>(state, &key, &Validation::new(Algorithm::HS256))
        .context("decoding oauth state")?;
    if data.claims.purpose != OAUTH_STATE_PURPOSE {
        anyhow::bail!("state token has the wrong purpose");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: Option<&str> = Some("unit-test-session-secret");

    fn user() -> SessionUser {
        SessionUser {
            id:       "424242".into(),
            name:     "Budi Santoso".into(),
            image:    Some("/api/telegram-image?id=424242".into()),
            provider: PROVIDER_TELEGRAM.into(),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    #[test]
    fn issued_session_decodes_back() {
        let token = issue_session(SECRET, &user(), 600, now()).unwrap();
        let claims = decode_session(SECRET, &token).unwrap();
        assert_eq!(SessionUser::from(claims), user());
    }

    #[test]
    fn wrong_secret_or_expired_token_fails() {
        let token = issue_session(SECRET, &user(), 600, now()).unwrap();
        assert!(decode_session(Some("another-secret"), &token).is_err());

        let old = issue_session(SECRET, &user(), 10, now() - 10_000).unwrap();
        assert!(decode_session(SECRET, &old).is_err());
    }

    #[test]
    fn missing_secret_is_an_error() {
        assert!(issue_session(None, &user(), 600, now()).is_err());
        assert!(issue_session(Some(""), &user(), 600, now()).is_err());
    }

    #[test]
    fn oauth_state_round_trip_and_confusion() {
        let state = issue_oauth_state(SECRET, 600, now()).unwrap();
        assert!(check_oauth_state(SECRET, &state).is_ok());
        assert!(check_oauth_state(Some("x"), &state).is_err());

        // a session token is not a valid state
        let token = issue_session(SECRET, &user(), 600, now()).unwrap();
        assert!(check_oauth_state(SECRET, &token).is_err());
    }
}
