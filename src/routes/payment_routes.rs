use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use uuid::Uuid;

use crate::controllers::payment_controller::PaymentController;
use crate::dto::payment_dto::{
    CallbackQuery, CallbackResponse, InitiatePaymentRequest, InitiatePaymentResponse,
    PaymentStatusResponse,
};
use crate::routes::source_ip;
use crate::state::AppState;
use crate::utils::errors::AppError;

/// Cabecera con la firma HMAC-SHA512 del cuerpo crudo del webhook.
const SIGNATURE_HEADER: &str = "x-paystack-signature";

pub fn create_payment_router() -> Router<AppState> {
    Router::new()
        .route("/initiate", post(initiate_payment))
        .route("/callback", get(payment_callback))
        .route("/webhook", post(payment_webhook))
        .route("/:booking_id/status", get(payment_status))
}

async fn initiate_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<Json<InitiatePaymentResponse>, AppError> {
    let controller = PaymentController::new(&state);
    let ip = source_ip(&headers);
    let response = controller.initiate(request, ip.as_deref()).await?;
    Ok(Json(response))
}

/// Canal de redirección del navegador tras la página de pago alojada.
async fn payment_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, AppError> {
    let controller = PaymentController::new(&state);
    let ip = source_ip(&headers);
    let response = controller.callback(&query.reference, ip.as_deref()).await?;
    Ok(Json(response))
}

/// Canal server-to-server. El cuerpo se toma como bytes crudos: la firma
/// se calcula sobre ellos exactamente, antes de deserializar nada.
async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    let controller = PaymentController::new(&state);
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let ip = source_ip(&headers);

    let ack = controller
        .webhook(&body, signature, ip.as_deref())
        .await?;

    Ok(Json(json!({
        "status": if ack.processed { "processed" } else { "ignored" }
    })))
}

async fn payment_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>, AppError> {
    let controller = PaymentController::new(&state);
    let response = controller.status_for_booking(booking_id).await?;
    Ok(Json(response))
}
