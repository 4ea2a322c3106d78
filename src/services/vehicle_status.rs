//! Sincronizador de estado de vehículo
//!
//! Mantiene el estado grueso del vehículo (available/booked/maintenance)
//! consistente con sus reservas activas. Es una llamada explícita desde
//! cada ruta que muta reservas, dentro de la misma transacción, para que
//! los dashboards y el fast-path de mantenimiento del chequeo de
//! disponibilidad lo vean fresco.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::models::booking::BookingStatus;
use crate::models::vehicle::VehicleStatus;
use crate::utils::errors::AppError;

/// Proyección pura del nuevo estado del vehículo a partir del cambio de
/// estado de una reserva. `None` significa dejar el estado como está.
///
/// - confirmed/active ocupan el vehículo.
/// - completed/cancelled lo liberan solo si ninguna otra reserva
///   confirmed/active lo retiene (reservas futuras encadenadas).
/// - pending no ocupa el vehículo.
/// - maintenance pertenece al personal de flota y nunca se sobreescribe.
pub fn project_vehicle_status(
    current: VehicleStatus,
    booking_status: BookingStatus,
    other_active_bookings: bool,
) -> Option<VehicleStatus> {
    if current == VehicleStatus::Maintenance {
        return None;
    }

    match booking_status {
        BookingStatus::Confirmed | BookingStatus::Active => {
            (current != VehicleStatus::Booked).then_some(VehicleStatus::Booked)
        }
        BookingStatus::Completed | BookingStatus::Cancelled => {
            if other_active_bookings || current == VehicleStatus::Available {
                None
            } else {
                Some(VehicleStatus::Available)
            }
        }
        BookingStatus::Pending => None,
    }
}

/// Aplica la proyección dentro de la transacción del llamante.
///
/// Escribe únicamente si el estado calculado difiere del almacenado.
pub async fn sync_vehicle_status(
    conn: &mut PgConnection,
    vehicle_id: Uuid,
    changed_booking_id: Uuid,
    booking_status: BookingStatus,
) -> Result<(), AppError> {
    let current: VehicleStatus =
        sqlx::query_scalar("SELECT status FROM vehicles WHERE id = $1")
            .bind(vehicle_id)
            .fetch_one(&mut *conn)
            .await?;

    let other_active_bookings = if matches!(
        booking_status,
        BookingStatus::Completed | BookingStatus::Cancelled
    ) {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM bookings
                WHERE vehicle_id = $1
                  AND id <> $2
                  AND status IN ('confirmed', 'active')
            )
            "#,
        )
        .bind(vehicle_id)
        .bind(changed_booking_id)
        .fetch_one(&mut *conn)
        .await?;
        exists
    } else {
        false
    };

    if let Some(next) = project_vehicle_status(current, booking_status, other_active_bookings) {
        sqlx::query("UPDATE vehicles SET status = $2 WHERE id = $1")
            .bind(vehicle_id)
            .bind(next)
            .execute(&mut *conn)
            .await?;

        tracing::debug!(
            "Vehicle {} status {} -> {} (booking {} now {})",
            vehicle_id,
            current.as_str(),
            next.as_str(),
            changed_booking_id,
            booking_status.as_str()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;
    use VehicleStatus::*;

    #[test]
    fn confirmed_booking_marks_vehicle_booked() {
        assert_eq!(project_vehicle_status(Available, Confirmed, false), Some(Booked));
        assert_eq!(project_vehicle_status(Available, Active, false), Some(Booked));
    }

    #[test]
    fn already_booked_vehicle_is_not_rewritten() {
        assert_eq!(project_vehicle_status(Booked, Confirmed, false), None);
        assert_eq!(project_vehicle_status(Booked, Active, false), None);
    }

    #[test]
    fn completion_releases_vehicle_when_no_other_active_booking() {
        assert_eq!(project_vehicle_status(Booked, Completed, false), Some(Available));
        assert_eq!(project_vehicle_status(Booked, Cancelled, false), Some(Available));
    }

    #[test]
    fn completion_keeps_vehicle_booked_when_another_booking_holds_it() {
        // Reservas futuras encadenadas: otra reserva confirmed/active
        // sigue reteniendo el vehículo.
        assert_eq!(project_vehicle_status(Booked, Completed, true), None);
        assert_eq!(project_vehicle_status(Booked, Cancelled, true), None);
    }

    #[test]
    fn already_available_vehicle_is_not_rewritten() {
        assert_eq!(project_vehicle_status(Available, Cancelled, false), None);
    }

    #[test]
    fn pending_bookings_never_touch_the_vehicle() {
        assert_eq!(project_vehicle_status(Available, Pending, false), None);
        assert_eq!(project_vehicle_status(Booked, Pending, false), None);
    }

    #[test]
    fn maintenance_is_never_overridden() {
        assert_eq!(project_vehicle_status(Maintenance, Confirmed, false), None);
        assert_eq!(project_vehicle_status(Maintenance, Completed, false), None);
        assert_eq!(project_vehicle_status(Maintenance, Cancelled, true), None);
    }
}
