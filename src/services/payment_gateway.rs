//! Cliente de la pasarela de pagos
//!
//! Integración con la API de Paystack: creación de transacciones de
//! página de pago alojada y verificación autoritativa por referencia.
//! El trait permite sustituir la pasarela por un stub en tests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::config::rental::PaystackConfig;
use crate::utils::errors::AppError;

/// Datos para iniciar una transacción en la pasarela.
#[derive(Debug, Clone)]
pub struct InitializeTransaction {
    pub email: String,
    /// Importe en unidades menores (kobo/céntimos).
    pub amount_minor: i64,
    pub reference: String,
    pub callback_url: String,
}

/// Respuesta de inicialización: URL de la página de pago alojada.
#[derive(Debug, Clone)]
pub struct AuthorizationDetails {
    pub authorization_url: String,
    pub access_code: Option<String>,
    pub reference: String,
}

/// Resultado de la consulta autoritativa de verificación.
#[derive(Debug, Clone)]
pub struct GatewayVerification {
    pub success: bool,
    pub paid_amount_minor: i64,
    pub gateway_reference: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initialize(
        &self,
        request: InitializeTransaction,
    ) -> Result<AuthorizationDetails, AppError>;

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, AppError>;
}

// --- Modelos de la API de Paystack ---

#[derive(Debug, Deserialize)]
struct PaystackEnvelope<T> {
    status: bool,
    message: String,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct InitializeData {
    authorization_url: String,
    #[serde(default)]
    access_code: Option<String>,
    reference: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    amount: i64,
    #[serde(default)]
    id: Option<i64>,
}

pub struct PaystackClient {
    secret_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl PaystackClient {
    pub fn new(config: &PaystackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            secret_key: config.secret_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackClient {
    async fn initialize(
        &self,
        request: InitializeTransaction,
    ) -> Result<AuthorizationDetails, AppError> {
        log::info!("💳 Initializing gateway transaction {}", request.reference);

        let body = json!({
            "email": request.email,
            "amount": request.amount_minor,
            "reference": request.reference,
            "callback_url": request.callback_url,
        });

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .bearer_auth(&self.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Gateway unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Gateway initialize failed with {}: {}", status, error_text);
            return Err(AppError::ExternalApi(format!(
                "Gateway initialize returned {}",
                status
            )));
        }

        let envelope: PaystackEnvelope<InitializeData> = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Invalid gateway response: {}", e)))?;

        if !envelope.status {
            return Err(AppError::ExternalApi(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| AppError::ExternalApi("Gateway response missing data".to_string()))?;

        Ok(AuthorizationDetails {
            authorization_url: data.authorization_url,
            access_code: data.access_code,
            reference: data.reference,
        })
    }

    async fn verify(&self, reference: &str) -> Result<GatewayVerification, AppError> {
        log::info!("🔍 Verifying gateway transaction {}", reference);

        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, reference))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Gateway unreachable: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            log::error!("❌ Gateway verify failed with {}: {}", status, error_text);
            return Err(AppError::ExternalApi(format!(
                "Gateway verify returned {}",
                status
            )));
        }

        let envelope: PaystackEnvelope<VerifyData> = response
            .json()
            .await
            .map_err(|e| AppError::ExternalApi(format!("Invalid gateway response: {}", e)))?;

        if !envelope.status {
            return Err(AppError::ExternalApi(envelope.message));
        }

        let data = envelope
            .data
            .ok_or_else(|| AppError::ExternalApi("Gateway response missing data".to_string()))?;

        Ok(GatewayVerification {
            success: data.status == "success",
            paid_amount_minor: data.amount,
            gateway_reference: data.id.map(|id| id.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_initialize_envelope() {
        let raw = r#"{
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": "https://checkout.paystack.com/abc123",
                "access_code": "abc123",
                "reference": "RNT-a1b2c3d4-1700000000-4821"
            }
        }"#;

        let envelope: PaystackEnvelope<InitializeData> =
            serde_json::from_str(raw).expect("valid envelope");
        assert!(envelope.status);
        let data = envelope.data.expect("data present");
        assert_eq!(
            data.authorization_url,
            "https://checkout.paystack.com/abc123"
        );
    }

    #[test]
    fn parses_verify_envelope_with_extra_fields() {
        let raw = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "id": 302961,
                "status": "success",
                "amount": 1500000,
                "currency": "NGN",
                "channel": "card"
            }
        }"#;

        let envelope: PaystackEnvelope<VerifyData> =
            serde_json::from_str(raw).expect("valid envelope");
        let data = envelope.data.expect("data present");
        assert_eq!(data.status, "success");
        assert_eq!(data.amount, 1_500_000);
        assert_eq!(data.id, Some(302_961));
    }

    #[test]
    fn parses_failed_envelope_without_data() {
        let raw = r#"{"status": false, "message": "Transaction reference not found"}"#;
        let envelope: PaystackEnvelope<VerifyData> =
            serde_json::from_str(raw).expect("valid envelope");
        assert!(!envelope.status);
        assert!(envelope.data.is_none());
    }
}
