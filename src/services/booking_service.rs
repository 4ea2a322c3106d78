//! Booking Transaction Manager
//!
//! Núcleo concurrente de reservas: garantiza el invariante de
//! no-solapamiento por vehículo incluso bajo peticiones simultáneas.
//!
//! El chequeo de disponibilidad es un predicado de rango sobre varias
//! filas, así que un compare-and-swap optimista sobre una fila no puede
//! detectar el insert conflictivo de otra transacción. En su lugar se
//! serializa por vehículo con un lock pesimista de fila (`FOR UPDATE`):
//! la contención por vehículo es baja en este dominio y la transacción
//! es corta.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::config::rental::RentalConfig;
use crate::models::booking::{Booking, BookingStatus};
use crate::repositories::vehicle_repository::lock_vehicle;
use crate::services::availability::{self, is_available};
use crate::services::pricing;
use crate::services::vehicle_status::sync_vehicle_status;
use crate::utils::errors::AppError;
use crate::utils::validation::validate_booking_window;

pub struct BookingService {
    pool: PgPool,
    config: RentalConfig,
}

impl BookingService {
    pub fn new(pool: PgPool, config: RentalConfig) -> Self {
        Self { pool, config }
    }

    /// Chequeo orientativo previo al pago. Sin lock: puede quedarse
    /// obsoleto en cuanto responde; la decisión definitiva la toma
    /// [`create_booking`](Self::create_booking) bajo el lock.
    pub async fn check_availability(
        &self,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_booking_id: Option<Uuid>,
    ) -> Result<bool, AppError> {
        availability::check_availability(
            &self.pool,
            vehicle_id,
            start,
            end,
            exclude_booking_id,
            self.config.buffer_minutes,
        )
        .await
    }

    /// Crea una reserva en estado `pending` garantizando el invariante de
    /// no-solapamiento:
    ///
    /// 1. Abre transacción.
    /// 2. Lock exclusivo de la fila del vehículo.
    /// 3. Re-chequea disponibilidad bajo el lock (obligatorio aunque el
    ///    llamante ya lo hiciera fuera).
    /// 4. No disponible → rollback y error de negocio, sin estado parcial.
    /// 5. Disponible → precio, INSERT pending, sincronización de estado y
    ///    commit (libera el lock).
    pub async fn create_booking(
        &self,
        customer_id: Uuid,
        vehicle_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        notes: Option<String>,
    ) -> Result<Booking, AppError> {
        validate_booking_window(start, end, self.config.min_rental_hours)?;

        let mut tx = self.pool.begin().await?;

        let vehicle = lock_vehicle(&mut tx, vehicle_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Vehicle not found".to_string()))?;

        let available = is_available(
            &mut *tx,
            &vehicle,
            start,
            end,
            None,
            self.config.buffer_minutes,
        )
        .await?;

        if !available {
            // Perdedor de la carrera o ventana ya tomada: soltar la
            // transacción revierte todo.
            return Err(AppError::VehicleUnavailable);
        }

        let total_price = pricing::rental_total(vehicle.daily_rate, start, end);

        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (id, vehicle_id, customer_id, start_date, end_date, total_price, status, notes)
            VALUES ($1, $2, $3, $4, $5, $6, 'pending', $7)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(vehicle.id)
        .bind(customer_id)
        .bind(start)
        .bind(end)
        .bind(total_price)
        .bind(notes)
        .fetch_one(&mut *tx)
        .await?;

        sync_vehicle_status(&mut tx, vehicle.id, booking.id, BookingStatus::Pending).await?;

        tx.commit().await?;

        info!(
            "Booking {} created for vehicle {} ({} - {}), total {}",
            booking.id, vehicle.id, start, end, total_price
        );

        Ok(booking)
    }

    /// Cancelación por el cliente. Solo reservas pending o confirmed; la
    /// sincronización del vehículo corre en la misma transacción.
    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if booking.customer_id != customer_id {
            return Err(AppError::Forbidden(
                "Booking does not belong to this customer".to_string(),
            ));
        }

        match booking.status {
            BookingStatus::Pending | BookingStatus::Confirmed => {}
            BookingStatus::Active => {
                return Err(AppError::Conflict(
                    "An active rental cannot be cancelled".to_string(),
                ));
            }
            BookingStatus::Completed | BookingStatus::Cancelled => {
                return Err(AppError::Conflict(
                    "Booking is already finalized".to_string(),
                ));
            }
        }

        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = 'cancelled' WHERE id = $1 RETURNING *",
        )
        .bind(booking_id)
        .fetch_one(&mut *tx)
        .await?;

        sync_vehicle_status(&mut tx, booking.vehicle_id, booking.id, BookingStatus::Cancelled)
            .await?;

        tx.commit().await?;

        info!("Booking {} cancelled by customer {}", booking.id, customer_id);

        Ok(booking)
    }

    /// Transiciones de personal: recogida (confirmed → active) y
    /// devolución (active → completed). La confirmación no pasa por aquí,
    /// solo por la verificación de pago.
    pub async fn update_status(
        &self,
        booking_id: Uuid,
        new_status: BookingStatus,
    ) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await?;

        let booking =
            sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1 FOR UPDATE")
                .bind(booking_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        if !staff_transition_allowed(booking.status, new_status) {
            return Err(AppError::Conflict(format!(
                "Cannot transition booking from {} to {}",
                booking.status.as_str(),
                new_status.as_str()
            )));
        }

        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = $2 WHERE id = $1 RETURNING *",
        )
        .bind(booking_id)
        .bind(new_status)
        .fetch_one(&mut *tx)
        .await?;

        sync_vehicle_status(&mut tx, booking.vehicle_id, booking.id, new_status).await?;

        tx.commit().await?;

        info!(
            "Booking {} transitioned to {}",
            booking.id,
            new_status.as_str()
        );

        Ok(booking)
    }
}

/// Transiciones permitidas al personal de mostrador.
fn staff_transition_allowed(from: BookingStatus, to: BookingStatus) -> bool {
    matches!(
        (from, to),
        (BookingStatus::Confirmed, BookingStatus::Active)
            | (BookingStatus::Active, BookingStatus::Completed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn staff_can_run_pickup_and_return() {
        assert!(staff_transition_allowed(Confirmed, Active));
        assert!(staff_transition_allowed(Active, Completed));
    }

    #[test]
    fn staff_cannot_confirm_or_resurrect() {
        // Confirmar es trabajo exclusivo de la conciliación de pagos.
        assert!(!staff_transition_allowed(Pending, Confirmed));
        assert!(!staff_transition_allowed(Pending, Active));
        assert!(!staff_transition_allowed(Cancelled, Active));
        assert!(!staff_transition_allowed(Completed, Active));
        assert!(!staff_transition_allowed(Confirmed, Completed));
    }
}
