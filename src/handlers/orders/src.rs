use crate::{
    catalog::format_price,
    config::AppState,
    storage::{new_transaction_id, TransactionDraft},
    utils::{http_err, HttpError},
    validation::field_errors,
};
use super::models::{OrderReq, OrderResp};
use axum::{
    Json,
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;

fn parse_amount(field: &str, raw: &str) -> Result<u64, HttpError> {
    raw.trim()
        .parse()
        .map_err(|_| http_err(StatusCode::BAD_REQUEST, format!("`{field}` must be a whole number")))
}

/// Builds the order the client keeps locally. Nothing is stored here.
pub async fn create_order_handler(
    State(state): State<AppState>,
    req: Result<Json<OrderReq>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderResp>), HttpError> {
    let Json(req) = req.map_err(|e| http_err(StatusCode::BAD_REQUEST, e.body_text()))?;

    let errors = field_errors(&req.id_pelanggan, &req.id_server);
    if !errors.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "status":  "error",
                "code":    "INVALID_FIELD",
                "message": "Data tidak valid",
                "errors":  errors,
            })),
        ));
    }
    if req.kode_produk.trim().is_empty() {
        return Err(http_err(StatusCode::BAD_REQUEST, "`kodeProduk` is required"));
    }
    let nominal = parse_amount("nominal", &req.nominal)?;
    let harga = parse_amount("harga", &req.harga)?;

    let method = state
        .seed
        .payment_method(&req.pembayaran)
        .ok_or_else(|| http_err(StatusCode::BAD_REQUEST, "unknown payment method"))?;

    let transaction = TransactionDraft {
        id_pelanggan:   req.id_pelanggan,
        id_server:      req.id_server,
        id_sv:          req.id_sv,
        kode_produk:    req.kode_produk,
        nominal,
        harga,
        pembayaran:     method.name.clone(),
        const_trx:      req.const_trx,
        transaction_id: new_transaction_id(),
        timestamp:      Utc::now().timestamp_millis(),
    }
    .seal();

    info!(
        transaction_id = %transaction.transaction_id,
        code_key = %transaction.code_key,
        pembayaran = %transaction.pembayaran,
        "order drafted"
    );

    let qr_data = format!("PAYMENT-{}-{}", transaction.transaction_id, transaction.harga);
    Ok((
        StatusCode::CREATED,
        Json(OrderResp {
            formatted_price: format_price(transaction.harga),
            qr_data,
            transaction,
        }),
    ))
}
