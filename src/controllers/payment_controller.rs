use uuid::Uuid;
use validator::Validate;

use crate::dto::payment_dto::{
    CallbackResponse, InitiatePaymentRequest, InitiatePaymentResponse, PaymentStatusResponse,
};
use crate::repositories::payment_repository::PaymentRepository;
use crate::services::payment_service::{PaymentService, WebhookAck};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub struct PaymentController {
    service: PaymentService,
    repository: PaymentRepository,
}

impl PaymentController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: PaymentService::new(
                state.pool.clone(),
                state.gateway.clone(),
                state.config.paystack.clone(),
            ),
            repository: PaymentRepository::new(state.pool.clone()),
        }
    }

    pub async fn initiate(
        &self,
        request: InitiatePaymentRequest,
        source_ip: Option<&str>,
    ) -> Result<InitiatePaymentResponse, AppError> {
        request.validate()?;

        self.service
            .initiate(request.booking_id, &request.customer_email, source_ip)
            .await
    }

    pub async fn callback(
        &self,
        reference: &str,
        source_ip: Option<&str>,
    ) -> Result<CallbackResponse, AppError> {
        self.service.handle_callback(reference, source_ip).await
    }

    pub async fn webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        source_ip: Option<&str>,
    ) -> Result<WebhookAck, AppError> {
        self.service
            .handle_webhook(raw_body, signature, source_ip)
            .await
    }

    pub async fn status_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<PaymentStatusResponse, AppError> {
        let payment = self
            .repository
            .find_latest_for_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("No payment for this booking".to_string()))?;

        Ok(PaymentStatusResponse::from_payment(payment))
    }
}
