use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::payment::{Payment, PaymentStatus};

#[derive(Debug, Deserialize, Validate)]
pub struct InitiatePaymentRequest {
    pub booking_id: Uuid,

    #[validate(email)]
    pub customer_email: String,
}

#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub authorization_url: String,
    pub reference: String,
}

/// Query del canal de redirección del navegador.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub reference: String,
}

/// Resultado de la conciliación por el canal de callback.
#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub outcome: String,
    pub redirect_target: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentStatusResponse {
    pub booking_id: Uuid,
    pub reference: String,
    pub status: PaymentStatus,
    pub amount: String,
}

impl PaymentStatusResponse {
    pub fn from_payment(payment: Payment) -> Self {
        Self {
            booking_id: payment.booking_id,
            reference: payment.reference,
            status: payment.status,
            amount: payment.amount.to_string(),
        }
    }
}

/// Sobre del webhook de la pasarela. Solo se deserializa después de
/// autenticar la firma sobre los bytes crudos. El `data` se mantiene
/// crudo hasta conocer el tipo de evento: los eventos no reconocidos se
/// reconocen sin inspeccionar su cuerpo.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl WebhookEnvelope {
    /// Interpreta el `data` como evento de cargo (charge.success /
    /// charge.failed).
    pub fn charge_data(&self) -> Result<WebhookChargeData, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChargeData {
    pub reference: String,
    /// Importe pagado en unidades menores (kobo/céntimos).
    pub amount: i64,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_charge_success_event() {
        let raw = r#"{
            "event": "charge.success",
            "data": {
                "id": 302961,
                "reference": "RNT-a1b2c3d4-1700000000-4821",
                "amount": 1500000,
                "status": "success",
                "currency": "NGN"
            }
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_str(raw).expect("valid payload");
        assert_eq!(envelope.event, "charge.success");

        let data = envelope.charge_data().expect("charge data");
        assert_eq!(data.amount, 1_500_000);
        assert_eq!(data.reference, "RNT-a1b2c3d4-1700000000-4821");
    }

    #[test]
    fn parses_charge_data_without_optional_fields() {
        let raw = r#"{"event":"charge.failed","data":{"reference":"RNT-x","amount":100}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(raw).expect("valid payload");
        let data = envelope.charge_data().expect("charge data");
        assert!(data.id.is_none());
        assert!(data.status.is_none());
    }

    #[test]
    fn unrecognized_event_parses_without_charge_shape() {
        // Un evento desconocido puede traer cualquier data (o ninguna):
        // el sobre se parsea igualmente para poder reconocerlo.
        let raw = r#"{"event":"transfer.success","data":{"recipient":"x"}}"#;
        let envelope: WebhookEnvelope = serde_json::from_str(raw).expect("valid payload");
        assert_eq!(envelope.event, "transfer.success");
        assert!(envelope.charge_data().is_err());
    }
}
