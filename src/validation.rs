use crate::config::ValidationConfig;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};

pub const EXPECTED_SUCCESS_MESSAGE: &str = "Berhasil melakukan check";

const GAME_TITLES: &[(&str, &str)] = &[
    ("MOBILELEGEND",   "Mobile Legends"),
    ("FREEFIRE",       "Free Fire"),
    ("AOV",            "Arena of Valor"),
    ("TOMANDJERRY",    "Tom & Jerry"),
    ("CALLOFDUTY",     "Call of Duty"),
    ("LORDSMOBILE",    "Lords Mobile"),
    ("MARVELSUPERWAR", "Marvel Super War"),
];

// "Mobile Legend" -> "MOBILELEGEND"
pub fn format_game_title(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

pub fn is_valid_game_title(title: &str) -> bool {
    GAME_TITLES.iter().any(|(v, _)| *v == title)
}

pub fn valid_game_titles() -> Vec<&'static str> {
    GAME_TITLES.iter().map(|(v, _)| *v).collect()
}

pub fn game_title_display(title: &str) -> &str {
    GAME_TITLES
        .iter()
        .find(|(v, _)| *v == title)
        .map_or(title, |(_, label)| *label)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GameTitleOption {
    pub value: &'static str,
    pub label: &'static str,
}

pub fn game_title_options() -> Vec<GameTitleOption> {
    GAME_TITLES
        .iter()
        .map(|&(value, label)| GameTitleOption { value, label })
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field:   String,
    pub message: String,
}

fn is_id_charset(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

pub fn validate_id_pelanggan(value: &str) -> Option<String> {
    let len = value.chars().count();
    if value.trim().is_empty() {
        Some("ID pelanggan belum diisi".into())
    } else if len < 3 {
        Some("ID Pelanggan minimal 3 karakter".into())
    } else if len > 50 {
        Some("ID Pelanggan maksimal 50 karakter".into())
    } else if !is_id_charset(value) {
        Some("ID Pelanggan hanya boleh alphanumeric, underscore, dan dash".into())
    } else {
        None
    }
}

pub fn validate_id_server(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        Some("ID server belum diisi".into())
    } else if value.chars().count() > 50 {
        Some("ID Server maksimal 50 karakter".into())
    } else if !is_id_charset(value) {
        Some("ID Server hanya boleh alphanumeric, underscore, dan dash".into())
    } else {
        None
    }
}

pub fn field_errors(id_pelanggan: &str, id_server: &str) -> Vec<FieldError> {
    [
        ("idPelanggan", validate_id_pelanggan(id_pelanggan)),
        ("idServer",    validate_id_server(id_server)),
    ]
    .into_iter()
    .filter_map(|(field, msg)| msg.map(|message| FieldError { field: field.into(), message }))
    .collect()
}

// what the browser posts
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCheck {
    #[serde(default)]
    pub id_pelanggan: String,
    #[serde(default)]
    pub id_server:    String,
    #[serde(default)]
    pub game_title:   String,
}

// what the sync-user service expects
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRequest {
    pub id_pelanggan: String,
    pub id_server:    String,
    pub game_title:   String,
    pub game_title_x: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub status:  u16,
    pub code:    String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors:  Option<Value>,
}

impl ValidationError {
    fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status:  status.as_u16(),
            code:    code.into(),
            message: message.into(),
            errors:  None,
        }
    }
}

pub fn prepare_request(check: &UserCheck) -> Result<ValidationRequest, ValidationError> {
    let game_title = format_game_title(&check.game_title);
    if !is_valid_game_title(&game_title) {
        let labels: Vec<&str> = GAME_TITLES.iter().map(|(_, l)| *l).collect();
        return Err(ValidationError::new(
            StatusCode::BAD_REQUEST,
            "INVALID_GAME_TITLE",
            format!("Game Title tidak valid. Pilih dari: {}", labels.join(", ")),
        ));
    }

    let errors = field_errors(&check.id_pelanggan, &check.id_server);
    if !errors.is_empty() {
        return Err(ValidationError {
            errors: Some(json!(errors)),
            ..ValidationError::new(StatusCode::BAD_REQUEST, "INVALID_FIELD", "Data tidak valid")
        });
    }

    Ok(ValidationRequest {
        id_pelanggan: check.id_pelanggan.clone(),
        id_server:    check.id_server.clone(),
        game_title,
        game_title_x: valid_game_titles().join(","),
    })
}

// POST <api_url>/api/check
pub async fn validate_user_and_server(
    http: &Client,
    cfg: &ValidationConfig,
    req: &ValidationRequest,
) -> Result<Value, ValidationError> {
    let url = format!("{}/api/check", cfg.api_url.trim_end_matches('/'));
    debug!(%url, game_title = %req.game_title, "checking player id");

    let mut builder = http
        .post(&url)
        .timeout(Duration::from_millis(cfg.timeout_ms))
        .json(req);
    if let Some(key) = cfg.api_key.as_deref() {
        builder = builder.header("x-api-key", key);
    }

    let resp = builder.send().await.map_err(|e| {
        if e.is_timeout() {
            warn!(%url, "validation request timed out");
            ValidationError::new(
                StatusCode::REQUEST_TIMEOUT,
                "TIMEOUT",
                "Request timeout. Pastikan server api-sync-user sedang berjalan.",
            )
        } else {
            warn!(%url, error = %e, "validation request failed");
            ValidationError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "NETWORK_ERROR",
                format!("Gagal terhubung ke server validasi: {}", e.without_url()),
            )
        }
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.json::<Value>().await.ok();
        return Err(upstream_failure(status, body.as_ref()));
    }

    let body = resp.json::<Value>().await.map_err(|e| {
        if e.is_timeout() {
            return ValidationError::new(
                StatusCode::REQUEST_TIMEOUT,
                "TIMEOUT",
                "Request timeout. Pastikan server api-sync-user sedang berjalan.",
            );
        }
        warn!(error = %e.without_url(), "validation response is not JSON");
        ValidationError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "Terjadi kesalahan yang tidak diketahui",
        )
    })?;

    check_success_body(body)
}

// empty strings count as absent, like the front end's `||` fallbacks
fn text_field<'a>(body: &'a Value, key: &str) -> Option<&'a str> {
    body.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn upstream_failure(status: StatusCode, body: Option<&Value>) -> ValidationError {
    ValidationError {
        status:  status.as_u16(),
        code:    body
            .and_then(|b| text_field(b, "code"))
            .unwrap_or("UNKNOWN_ERROR")
            .into(),
        message: body
            .and_then(|b| text_field(b, "message"))
            .unwrap_or("Terjadi kesalahan saat validasi")
            .into(),
        errors:  body.and_then(|b| b.get("errors")).cloned(),
    }
}

// a 2xx body goes back to the caller untouched once status and message check out
fn check_success_body(body: Value) -> Result<Value, ValidationError> {
    if body.get("status").and_then(Value::as_str) != Some("success") {
        return Err(ValidationError {
            errors: body.get("errors").cloned(),
            ..ValidationError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                text_field(&body, "code").unwrap_or("VALIDATION_FAILED"),
                text_field(&body, "message").unwrap_or("Validasi gagal"),
            )
        });
    }
    if body.get("message").and_then(Value::as_str) != Some(EXPECTED_SUCCESS_MESSAGE) {
        return Err(ValidationError::new(
            StatusCode::BAD_GATEWAY,
            "UNEXPECTED_RESPONSE",
            "Response tidak sesuai dengan yang diharapkan",
        ));
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_titles() {
        assert_eq!(format_game_title("Mobile Legend"), "MOBILELEGEND");
        assert_eq!(format_game_title(" free  fire "), "FREEFIRE");
        assert!(is_valid_game_title("AOV"));
        assert!(!is_valid_game_title("aov"));
        assert_eq!(game_title_display("TOMANDJERRY"), "Tom & Jerry");
        assert_eq!(game_title_display("UNKNOWN"), "UNKNOWN");
        assert_eq!(valid_game_titles().len(), 7);
        assert_eq!(game_title_options()[0].label, "Mobile Legends");
    }

    #[test]
    fn id_pelanggan_rules() {
        assert_eq!(validate_id_pelanggan(""), Some("ID pelanggan belum diisi".into()));
        assert_eq!(validate_id_pelanggan("ab"), Some("ID Pelanggan minimal 3 karakter".into()));
        assert_eq!(
            validate_id_pelanggan(&"a".repeat(51)),
            Some("ID Pelanggan maksimal 50 karakter".into())
        );
        assert!(validate_id_pelanggan("abc def").is_some());
        assert_eq!(validate_id_pelanggan("user_01-x"), None);
    }

    #[test]
    fn id_server_rules() {
        assert_eq!(validate_id_server("  "), Some("ID server belum diisi".into()));
        assert_eq!(validate_id_server("1"), None);
        assert!(validate_id_server("20/01").is_some());
        assert!(validate_id_server(&"9".repeat(51)).is_some());
    }

    #[test]
    fn prepare_rejects_bad_title_then_bad_fields() {
        let err = prepare_request(&UserCheck {
            id_pelanggan: "x".into(),
            id_server:    "".into(),
            game_title:   "Minecraft".into(),
        }).unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "INVALID_GAME_TITLE");

        let err = prepare_request(&UserCheck {
            id_pelanggan: "x".into(),
            id_server:    "".into(),
            game_title:   "free fire".into(),
        }).unwrap_err();
        assert_eq!(err.code, "INVALID_FIELD");
        assert_eq!(err.errors.as_ref().and_then(Value::as_array).map(Vec::len), Some(2));
    }

    #[test]
    fn prepare_builds_the_wire_request() {
        let req = prepare_request(&UserCheck {
            id_pelanggan: "12345678".into(),
            id_server:    "2001".into(),
            game_title:   "Mobile Legend".into(),
        }).unwrap();
        assert_eq!(req.game_title, "MOBILELEGEND");
        assert_eq!(
            req.game_title_x,
            "MOBILELEGEND,FREEFIRE,AOV,TOMANDJERRY,CALLOFDUTY,LORDSMOBILE,MARVELSUPERWAR"
        );
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("gameTitleX").is_some());
        assert!(v.get("idPelanggan").is_some());
    }

    #[test]
    fn upstream_failure_keeps_code_and_message_without_status() {
        let body = json!({ "code": "BAD_ID", "message": "ID tidak ditemukan" });
        let err = upstream_failure(StatusCode::BAD_REQUEST, Some(&body));
        assert_eq!(err.status, 400);
        assert_eq!(err.code, "BAD_ID");
        assert_eq!(err.message, "ID tidak ditemukan");

        let err = upstream_failure(StatusCode::SERVICE_UNAVAILABLE, None);
        assert_eq!(err.code, "UNKNOWN_ERROR");
        assert_eq!(err.message, "Terjadi kesalahan saat validasi");

        let body = json!({ "code": "", "message": "", "errors": [{ "field": "idServer" }] });
        let err = upstream_failure(StatusCode::BAD_REQUEST, Some(&body));
        assert_eq!(err.code, "UNKNOWN_ERROR");
        assert_eq!(err.errors, Some(json!([{ "field": "idServer" }])));
    }

    #[test]
    fn success_body_passes_through_whatever_data_holds() {
        let body = json!({
            "status": "success",
            "message": EXPECTED_SUCCESS_MESSAGE,
            "data": { "idPelanggan": "partialdata", "username": "Budi", "level": 42 }
        });
        assert_eq!(check_success_body(body.clone()), Ok(body));

        let err = check_success_body(json!({ "status": "error", "errors": "bad" })).unwrap_err();
        assert_eq!((err.status, err.code.as_str(), err.message.as_str()), (422, "VALIDATION_FAILED", "Validasi gagal"));
        assert_eq!(err.errors, Some(json!("bad")));

        let err = check_success_body(json!({ "status": "success", "message": 7 })).unwrap_err();
        assert_eq!(err.code, "UNEXPECTED_RESPONSE");
    }
}
