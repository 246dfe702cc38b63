use crate::{catalog::PaymentMethod, config::AppState};
use axum::{Json, extract::State};

pub async fn payment_methods_handler(State(state): State<AppState>) -> Json<Vec<PaymentMethod>> {
    Json(state.seed.payment_methods.clone())
}
