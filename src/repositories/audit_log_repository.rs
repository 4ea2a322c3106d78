//! Escritura del registro de auditoría de pagos.
//!
//! Solo INSERT. Acepta cualquier executor para poder escribir dentro de
//! la misma transacción que el cambio de estado que documenta.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::audit_log::{AuditEvent, AuditLogEntry};
use crate::utils::errors::AppError;

pub async fn record(
    executor: impl PgExecutor<'_>,
    payment_id: Option<Uuid>,
    event: AuditEvent,
    detail: Option<serde_json::Value>,
    source_ip: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO payment_audit_log (id, payment_id, event, detail, source_ip)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payment_id)
    .bind(event)
    .bind(detail)
    .bind(source_ip)
    .execute(executor)
    .await?;

    Ok(())
}

pub async fn list_for_payment(
    executor: impl PgExecutor<'_>,
    payment_id: Uuid,
) -> Result<Vec<AuditLogEntry>, AppError> {
    let entries = sqlx::query_as::<_, AuditLogEntry>(
        "SELECT * FROM payment_audit_log WHERE payment_id = $1 ORDER BY created_at",
    )
    .bind(payment_id)
    .fetch_all(executor)
    .await?;

    Ok(entries)
}
