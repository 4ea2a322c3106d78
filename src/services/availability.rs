//! Chequeo de disponibilidad de vehículos
//!
//! Determina si un vehículo está libre para una ventana solicitada,
//! expandida por el buffer de turnaround (limpieza e inspección).
//!
//! Fuera de un lock este chequeo es solo orientativo (falla rápido antes
//! de pedir los datos de pago); la decisión con garantías se toma
//! re-ejecutándolo dentro de la sección crítica del Booking Transaction
//! Manager.

use chrono::{DateTime, Duration, Utc};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::models::vehicle::{Vehicle, VehicleStatus};
use crate::utils::errors::AppError;

/// Test de intersección de intervalos semiabiertos [a1, a2) y [b1, b2).
/// Extremos que solo se tocan (a2 == b1) no cuentan como solapamiento.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// Expande la ventana solicitada simétricamente por el buffer de
/// turnaround.
pub fn expand_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    buffer_minutes: i64,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let buffer = Duration::minutes(buffer_minutes);
    (start - buffer, end + buffer)
}

/// ¿Está el vehículo libre para [start, end)?
///
/// Falla cerrado: un vehículo en mantenimiento nunca está disponible,
/// independientemente del calendario. En otro caso busca reservas no
/// canceladas del vehículo que intersequen la ventana expandida,
/// excluyendo opcionalmente una reserva (flujos de edición).
///
/// El executor permite ejecutar la consulta contra el pool (chequeo
/// orientativo) o contra la transacción que mantiene el lock del vehículo
/// (chequeo con autoridad).
pub async fn is_available(
    executor: impl PgExecutor<'_>,
    vehicle: &Vehicle,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_booking_id: Option<Uuid>,
    buffer_minutes: i64,
) -> Result<bool, AppError> {
    if vehicle.status == VehicleStatus::Maintenance {
        return Ok(false);
    }

    let (search_start, search_end) = expand_window(start, end, buffer_minutes);

    let (conflict,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM bookings
            WHERE vehicle_id = $1
              AND status <> 'cancelled'
              AND ($2::uuid IS NULL OR id <> $2)
              AND start_date < $3
              AND end_date > $4
        )
        "#,
    )
    .bind(vehicle.id)
    .bind(exclude_booking_id)
    .bind(search_end)
    .bind(search_start)
    .fetch_one(executor)
    .await?;

    Ok(!conflict)
}

/// Variante de conveniencia para el borde HTTP: resuelve el vehículo y
/// delega en [`is_available`].
pub async fn check_availability(
    pool: &PgPool,
    vehicle_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    exclude_booking_id: Option<Uuid>,
    buffer_minutes: i64,
) -> Result<bool, AppError> {
    let vehicle = sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = $1")
        .bind(vehicle_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

    is_available(pool, &vehicle, start, end, exclude_booking_id, buffer_minutes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid test timestamp")
            .with_timezone(&Utc)
    }

    #[test]
    fn detects_plain_overlap() {
        assert!(overlaps(
            ts("2024-01-10T00:00:00Z"),
            ts("2024-01-12T00:00:00Z"),
            ts("2024-01-11T00:00:00Z"),
            ts("2024-01-13T00:00:00Z"),
        ));
    }

    #[test]
    fn containment_is_overlap() {
        assert!(overlaps(
            ts("2024-01-10T00:00:00Z"),
            ts("2024-01-20T00:00:00Z"),
            ts("2024-01-12T00:00:00Z"),
            ts("2024-01-13T00:00:00Z"),
        ));
    }

    #[test]
    fn touching_endpoints_do_not_overlap() {
        // [10, 12) y [12, 14): a2 == b1.
        assert!(!overlaps(
            ts("2024-01-10T00:00:00Z"),
            ts("2024-01-12T00:00:00Z"),
            ts("2024-01-12T00:00:00Z"),
            ts("2024-01-14T00:00:00Z"),
        ));
    }

    #[test]
    fn disjoint_windows_do_not_overlap() {
        assert!(!overlaps(
            ts("2024-01-10T00:00:00Z"),
            ts("2024-01-11T00:00:00Z"),
            ts("2024-01-15T00:00:00Z"),
            ts("2024-01-16T00:00:00Z"),
        ));
    }

    #[test]
    fn expand_window_pads_both_sides() {
        let (search_start, search_end) =
            expand_window(ts("2024-01-12T10:30:00Z"), ts("2024-01-14T10:00:00Z"), 60);
        assert_eq!(search_start, ts("2024-01-12T09:30:00Z"));
        assert_eq!(search_end, ts("2024-01-14T11:00:00Z"));
    }

    /// Escenario de referencia: reserva existente 10/01 10:00 – 12/01
    /// 10:00 con buffer de 60 minutos.
    #[test]
    fn buffer_scenario_rejects_request_inside_buffer() {
        let existing_start = ts("2024-01-10T10:00:00Z");
        let existing_end = ts("2024-01-12T10:00:00Z");

        // Petición 12/01 10:30: la ventana expandida empieza 09:30,
        // dentro del turnaround de la reserva existente.
        let (search_start, search_end) =
            expand_window(ts("2024-01-12T10:30:00Z"), ts("2024-01-14T10:00:00Z"), 60);
        assert!(overlaps(existing_start, existing_end, search_start, search_end));
    }

    #[test]
    fn buffer_scenario_accepts_request_past_buffer() {
        let existing_start = ts("2024-01-10T10:00:00Z");
        let existing_end = ts("2024-01-12T10:00:00Z");

        let (search_start, search_end) =
            expand_window(ts("2024-01-12T11:01:00Z"), ts("2024-01-14T10:00:00Z"), 60);
        assert!(!overlaps(existing_start, existing_end, search_start, search_end));
    }

    #[test]
    fn buffer_boundary_touching_is_free() {
        // Con buffer de 60, una petición que empieza exactamente 60
        // minutos después del fin existente toca sin solaparse.
        let existing_start = ts("2024-01-10T10:00:00Z");
        let existing_end = ts("2024-01-12T10:00:00Z");

        let (search_start, search_end) =
            expand_window(ts("2024-01-12T11:00:00Z"), ts("2024-01-14T10:00:00Z"), 60);
        assert_eq!(search_start, existing_end);
        assert!(!overlaps(existing_start, existing_end, search_start, search_end));
    }
}
