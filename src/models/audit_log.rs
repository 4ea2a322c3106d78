//! Registro de auditoría de pagos
//!
//! Filas write-once, append-only. Nunca se actualizan ni se borran:
//! existen para reconstruir disputas de pago.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Eventos relevantes para la conciliación.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Initiated,
    WebhookReceived,
    Verified,
    Failed,
    AmountMismatch,
    InvalidSignature,
}

impl AuditEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEvent::Initiated => "initiated",
            AuditEvent::WebhookReceived => "webhook_received",
            AuditEvent::Verified => "verified",
            AuditEvent::Failed => "failed",
            AuditEvent::AmountMismatch => "amount_mismatch",
            AuditEvent::InvalidSignature => "invalid_signature",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub payment_id: Option<Uuid>,
    pub event: AuditEvent,
    pub detail: Option<serde_json::Value>,
    pub source_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}
