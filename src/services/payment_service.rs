//! Iniciación y conciliación de pagos
//!
//! Dos canales independientes (el callback de redirección del navegador
//! y el webhook server-to-server) pueden reportar el mismo resultado,
//! en cualquier orden y cualquier número de veces. Ambos convergen al
//! mismo estado final mediante la barrera de idempotencia sobre la
//! referencia única del pago.

use std::sync::Arc;

use num_traits::ToPrimitive;
use rand::Rng;
use rust_decimal::Decimal;
use serde_json::json;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::rental::PaystackConfig;
use crate::dto::payment_dto::{CallbackResponse, InitiatePaymentResponse, WebhookEnvelope};
use crate::models::audit_log::AuditEvent;
use crate::models::booking::{Booking, BookingStatus};
use crate::models::payment::{Payment, PaymentStatus};
use crate::repositories::audit_log_repository as audit;
use crate::services::payment_gateway::{InitializeTransaction, PaymentGateway};
use crate::services::vehicle_status::sync_vehicle_status;
use crate::utils::errors::AppError;
use crate::utils::signature::verify_webhook_signature;

/// Resultado de aplicar una confirmación sobre el estado actual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Primera confirmación: pago paid, reserva confirmed.
    Confirmed,
    /// Barrera de idempotencia: ya estaba paid, nada que hacer.
    AlreadyProcessed,
    /// El importe pagado no coincide con el esperado. Terminal.
    AmountMismatch,
    /// El pago ya había fallado antes; no se revive.
    AlreadyFailed,
}

/// Respuesta del canal webhook una vez autenticado y procesado.
#[derive(Debug, Clone, Copy)]
pub struct WebhookAck {
    pub processed: bool,
}

pub struct PaymentService {
    pool: PgPool,
    gateway: Arc<dyn PaymentGateway>,
    config: PaystackConfig,
}

impl PaymentService {
    pub fn new(pool: PgPool, gateway: Arc<dyn PaymentGateway>, config: PaystackConfig) -> Self {
        Self {
            pool,
            gateway,
            config,
        }
    }

    /// Inicia el pago de una reserva pending: crea el Payment con su
    /// referencia única, registra `initiated` y arranca la transacción
    /// en la pasarela devolviendo la URL de pago.
    ///
    /// Si la pasarela falla, el Payment queda pending con su referencia
    /// fresca; un reintento genera un pago nuevo y no hay nada corrupto
    /// que limpiar. El error se propaga para que el llamante no redirija
    /// a una URL rota.
    pub async fn initiate(
        &self,
        booking_id: Uuid,
        customer_email: &str,
        source_ip: Option<&str>,
    ) -> Result<InitiatePaymentResponse, AppError> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.status != BookingStatus::Pending {
            return Err(AppError::Conflict(
                "Only pending bookings can be paid".to_string(),
            ));
        }

        let (already_paid,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE booking_id = $1 AND status = 'paid')",
        )
        .bind(booking.id)
        .fetch_one(&self.pool)
        .await?;

        if already_paid {
            return Err(AppError::Conflict(
                "Booking already has a completed payment".to_string(),
            ));
        }

        let reference = generate_reference(&booking.id);
        let amount_minor = to_minor_units(booking.total_price)?;

        let payment = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (id, booking_id, amount, method, status, reference)
            VALUES ($1, $2, $3, 'gateway', 'pending', $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(booking.id)
        .bind(booking.total_price)
        .bind(&reference)
        .fetch_one(&self.pool)
        .await?;

        audit::record(
            &self.pool,
            Some(payment.id),
            AuditEvent::Initiated,
            Some(json!({
                "reference": reference,
                "booking_id": booking.id,
                "amount_minor": amount_minor,
            })),
            source_ip,
        )
        .await?;

        let authorization = self
            .gateway
            .initialize(InitializeTransaction {
                email: customer_email.to_string(),
                amount_minor,
                reference: reference.clone(),
                callback_url: self.config.callback_url.clone(),
            })
            .await?;

        info!("Payment {} initiated for booking {}", reference, booking.id);

        Ok(InitiatePaymentResponse {
            authorization_url: authorization.authorization_url,
            reference,
        })
    }

    /// Canal de redirección del navegador.
    ///
    /// La redirección no es de fiar: el resultado se re-verifica siempre
    /// contra el endpoint autoritativo de la pasarela antes de mutar nada.
    pub async fn handle_callback(
        &self,
        reference: &str,
        source_ip: Option<&str>,
    ) -> Result<CallbackResponse, AppError> {
        let payment = self.find_payment(reference).await?;

        // Barrera de idempotencia: reprocesar es seguro y barato.
        match payment.status {
            PaymentStatus::Paid => {
                return Ok(self.callback_response("already_confirmed", true));
            }
            PaymentStatus::Failed => {
                return Ok(self.callback_response("failed", false));
            }
            PaymentStatus::Pending => {}
        }

        let verification = self.gateway.verify(reference).await?;

        if !verification.success {
            self.mark_failed(
                payment.id,
                AuditEvent::Failed,
                json!({ "channel": "callback", "reference": reference }),
                source_ip,
            )
            .await?;
            return Ok(self.callback_response("failed", false));
        }

        let outcome = self
            .apply_confirmation(
                reference,
                verification.paid_amount_minor,
                verification.gateway_reference.as_deref(),
                "callback",
                source_ip,
            )
            .await?;

        match outcome {
            ReconcileOutcome::Confirmed => Ok(self.callback_response("confirmed", true)),
            ReconcileOutcome::AlreadyProcessed => {
                Ok(self.callback_response("already_confirmed", true))
            }
            // Mensaje genérico: los importes esperado/real no se exponen
            // al usuario final, solo al registro de auditoría.
            ReconcileOutcome::AmountMismatch | ReconcileOutcome::AlreadyFailed => {
                Ok(self.callback_response("failed", false))
            }
        }
    }

    /// Canal webhook server-to-server.
    ///
    /// La firma HMAC-SHA512 sobre los bytes crudos es una barrera previa:
    /// sin firma válida no se resuelve ningún pago. Un payload
    /// autenticado sí es de fiar y no se re-consulta a la pasarela.
    pub async fn handle_webhook(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
        source_ip: Option<&str>,
    ) -> Result<WebhookAck, AppError> {
        let signature_valid = signature
            .map(|s| verify_webhook_signature(&self.config.secret_key, raw_body, s))
            .unwrap_or(false);

        if !signature_valid {
            let reason = if signature.is_none() {
                "missing signature header"
            } else {
                "signature mismatch"
            };
            audit::record(
                &self.pool,
                None,
                AuditEvent::InvalidSignature,
                Some(json!({ "reason": reason })),
                source_ip,
            )
            .await?;
            return Err(AppError::Unauthorized(
                "Invalid webhook signature".to_string(),
            ));
        }

        let envelope: WebhookEnvelope = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::BadRequest(format!("Malformed webhook payload: {}", e)))?;

        match envelope.event.as_str() {
            "charge.success" => {
                let data = envelope.charge_data().map_err(|e| {
                    AppError::BadRequest(format!("Malformed charge payload: {}", e))
                })?;

                let payment = self.find_payment(&data.reference).await?;

                audit::record(
                    &self.pool,
                    Some(payment.id),
                    AuditEvent::WebhookReceived,
                    Some(json!({
                        "event": envelope.event,
                        "reference": data.reference,
                        "amount_minor": data.amount,
                    })),
                    source_ip,
                )
                .await?;

                let gateway_reference = data.id.map(|id| id.to_string());
                let outcome = self
                    .apply_confirmation(
                        &data.reference,
                        data.amount,
                        gateway_reference.as_deref(),
                        "webhook",
                        source_ip,
                    )
                    .await?;

                match outcome {
                    ReconcileOutcome::Confirmed | ReconcileOutcome::AlreadyProcessed => {
                        Ok(WebhookAck { processed: true })
                    }
                    ReconcileOutcome::AmountMismatch => Err(AppError::BadRequest(
                        "Payment could not be reconciled".to_string(),
                    )),
                    // Ack para frenar los reintentos del emisor; el pago
                    // sigue fallido.
                    ReconcileOutcome::AlreadyFailed => Ok(WebhookAck { processed: false }),
                }
            }
            "charge.failed" => {
                let data = envelope.charge_data().map_err(|e| {
                    AppError::BadRequest(format!("Malformed charge payload: {}", e))
                })?;

                let payment = self.find_payment(&data.reference).await?;

                audit::record(
                    &self.pool,
                    Some(payment.id),
                    AuditEvent::WebhookReceived,
                    Some(json!({
                        "event": envelope.event,
                        "reference": data.reference,
                    })),
                    source_ip,
                )
                .await?;

                if payment.status == PaymentStatus::Pending {
                    self.mark_failed(
                        payment.id,
                        AuditEvent::Failed,
                        json!({ "channel": "webhook", "reference": data.reference }),
                        source_ip,
                    )
                    .await?;
                }

                Ok(WebhookAck { processed: true })
            }
            // Tipos de evento desconocidos se reconocen sin procesar para
            // no provocar reintentos del emisor.
            other => {
                info!("Ignoring unrecognized webhook event '{}'", other);
                Ok(WebhookAck { processed: false })
            }
        }
    }

    /// Algoritmo compartido de confirmación, pasos 1-5 tras verificar.
    ///
    /// La transacción re-adquiere el pago con `FOR UPDATE` y re-evalúa la
    /// barrera de idempotencia bajo el lock, de modo que dos canales
    /// concurrentes no puedan confirmar dos veces. La verificación con la
    /// pasarela ya ocurrió fuera: ningún lock abarca I/O de red.
    async fn apply_confirmation(
        &self,
        reference: &str,
        paid_amount_minor: i64,
        gateway_reference: Option<&str>,
        channel: &str,
        source_ip: Option<&str>,
    ) -> Result<ReconcileOutcome, AppError> {
        let mut tx = self.pool.begin().await?;

        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1 FOR UPDATE")
                .bind(reference)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    warn!("Unknown payment reference '{}' on {}", reference, channel);
                    AppError::NotFound("Payment reference not found".to_string())
                })?;

        match payment.status {
            PaymentStatus::Paid => return Ok(ReconcileOutcome::AlreadyProcessed),
            PaymentStatus::Failed => return Ok(ReconcileOutcome::AlreadyFailed),
            PaymentStatus::Pending => {}
        }

        // El lock de la reserva serializa confirmaciones concurrentes de
        // pagos distintos (reintentos de iniciación) de la misma reserva.
        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(payment.booking_id)
                .fetch_one(&mut *tx)
                .await?;

        let (sibling_paid,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE booking_id = $1 AND id <> $2 AND status = 'paid')",
        )
        .bind(payment.booking_id)
        .bind(payment.id)
        .fetch_one(&mut *tx)
        .await?;

        if sibling_paid {
            // Una iniciación anterior de esta reserva ya llegó a paid:
            // este cargo no puede ser el segundo en hacerlo. Queda failed
            // con su contexto en la auditoría para disputa o reembolso.
            sqlx::query("UPDATE payments SET status = 'failed', updated_at = now() WHERE id = $1")
                .bind(payment.id)
                .execute(&mut *tx)
                .await?;

            audit::record(
                &mut *tx,
                Some(payment.id),
                AuditEvent::Failed,
                Some(json!({
                    "channel": channel,
                    "reference": reference,
                    "reason": "booking already paid by another payment",
                })),
                source_ip,
            )
            .await?;

            tx.commit().await?;

            warn!(
                "Booking {} already paid; duplicate charge {} recorded for dispute",
                payment.booking_id, reference
            );

            return Ok(ReconcileOutcome::AlreadyProcessed);
        }

        let expected_minor = to_minor_units(payment.amount)?;
        if paid_amount_minor != expected_minor {
            sqlx::query("UPDATE payments SET status = 'failed', updated_at = now() WHERE id = $1")
                .bind(payment.id)
                .execute(&mut *tx)
                .await?;

            audit::record(
                &mut *tx,
                Some(payment.id),
                AuditEvent::AmountMismatch,
                Some(json!({
                    "channel": channel,
                    "reference": reference,
                    "expected_minor": expected_minor,
                    "paid_minor": paid_amount_minor,
                })),
                source_ip,
            )
            .await?;

            tx.commit().await?;

            warn!(
                "Amount mismatch for payment {}: expected {} got {}",
                reference, expected_minor, paid_amount_minor
            );

            return Ok(ReconcileOutcome::AmountMismatch);
        }

        sqlx::query(
            r#"
            UPDATE payments
            SET status = 'paid',
                gateway_reference = COALESCE($2, gateway_reference),
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(payment.id)
        .bind(gateway_reference)
        .execute(&mut *tx)
        .await?;

        // La reserva se confirma en la misma transacción que el pago: un
        // estado a medias (paid sin confirmed) es un bug de corrección.
        let booking_confirmed = booking.status == BookingStatus::Pending;
        if booking_confirmed {
            sqlx::query("UPDATE bookings SET status = 'confirmed' WHERE id = $1")
                .bind(booking.id)
                .execute(&mut *tx)
                .await?;

            sync_vehicle_status(
                &mut tx,
                booking.vehicle_id,
                booking.id,
                BookingStatus::Confirmed,
            )
            .await?;
        } else {
            // La reserva dejó de estar pending (p. ej. cancelada)
            // mientras el pago seguía en vuelo. El dinero se movió: el
            // pago queda paid y la auditoría conserva el contexto para
            // la disputa.
            warn!(
                "Booking {} no longer pending while confirming payment {}",
                payment.booking_id, reference
            );
        }

        audit::record(
            &mut *tx,
            Some(payment.id),
            AuditEvent::Verified,
            Some(json!({
                "channel": channel,
                "reference": reference,
                "amount_minor": paid_amount_minor,
                "booking_confirmed": booking_confirmed,
            })),
            source_ip,
        )
        .await?;

        tx.commit().await?;

        info!("Payment {} verified via {}", reference, channel);

        Ok(ReconcileOutcome::Confirmed)
    }

    async fn find_payment(&self, reference: &str) -> Result<Payment, AppError> {
        sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                warn!("Unknown payment reference '{}'", reference);
                AppError::NotFound("Payment reference not found".to_string())
            })
    }

    /// Marca un pago pending como failed sin tocar la reserva: queda
    /// elegible para reintentarse con una iniciación nueva.
    async fn mark_failed(
        &self,
        payment_id: Uuid,
        event: AuditEvent,
        detail: serde_json::Value,
        source_ip: Option<&str>,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let status: PaymentStatus =
            sqlx::query_scalar("SELECT status FROM payments WHERE id = $1 FOR UPDATE")
                .bind(payment_id)
                .fetch_one(&mut *tx)
                .await?;

        // paid nunca se revierte.
        if status == PaymentStatus::Pending {
            sqlx::query("UPDATE payments SET status = 'failed', updated_at = now() WHERE id = $1")
                .bind(payment_id)
                .execute(&mut *tx)
                .await?;

            audit::record(&mut *tx, Some(payment_id), event, Some(detail), source_ip).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    fn callback_response(&self, outcome: &str, success: bool) -> CallbackResponse {
        CallbackResponse {
            outcome: outcome.to_string(),
            redirect_target: if success {
                self.config.success_redirect.clone()
            } else {
                self.config.failure_redirect.clone()
            },
        }
    }
}

/// Referencia única de transacción, usable como clave de idempotencia:
/// prefijo de la reserva + timestamp + sufijo aleatorio.
fn generate_reference(booking_id: &Uuid) -> String {
    let booking_prefix = &booking_id.to_string()[..8];
    let suffix: u16 = rand::thread_rng().gen_range(1000..10000);
    format!(
        "RNT-{}-{}-{}",
        booking_prefix,
        chrono::Utc::now().timestamp(),
        suffix
    )
}

/// Conversión a unidades menores (céntimos/kobo) para comparar contra lo
/// que reporta la pasarela.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AppError> {
    (amount * Decimal::from(100))
        .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(|| AppError::Internal(format!("Amount out of range: {}", amount)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn reference_carries_booking_prefix() {
        let booking_id = Uuid::new_v4();
        let reference = generate_reference(&booking_id);

        assert!(reference.starts_with("RNT-"));
        assert!(reference.contains(&booking_id.to_string()[..8]));
        assert_eq!(reference.split('-').count(), 4);
    }

    #[test]
    fn references_do_not_collide_for_same_booking() {
        let booking_id = Uuid::new_v4();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..50 {
            seen.insert(generate_reference(&booking_id));
        }
        // El sufijo aleatorio distingue reintentos dentro del mismo
        // segundo; 50 muestras con colisión total es astronómicamente
        // improbable.
        assert!(seen.len() > 1);
    }

    #[test]
    fn minor_units_conversion_is_exact() {
        assert_eq!(to_minor_units(dec("150.00")).unwrap(), 15_000);
        assert_eq!(to_minor_units(dec("0.01")).unwrap(), 1);
        assert_eq!(to_minor_units(dec("12050.50")).unwrap(), 1_205_050);
        assert_eq!(to_minor_units(dec("0")).unwrap(), 0);
    }
}
