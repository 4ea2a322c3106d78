use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::booking::{Booking, BookingStatus};

/// Request para crear una reserva.
///
/// `customer_id` viene del colaborador de identidad; este núcleo lo
/// acepta tal cual sin autenticarlo.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookingRequest {
    pub customer_id: Uuid,
    pub vehicle_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,

    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Query para el chequeo de disponibilidad previo al pago.
/// `exclude_booking_id` soporta flujos de edición.
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub vehicle_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub exclude_booking_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub vehicle_id: Uuid,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct CancelBookingRequest {
    pub customer_id: Uuid,
}

/// Transiciones de personal: recogida y devolución.
#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Deserialize)]
pub struct ListBookingsQuery {
    pub customer_id: Uuid,
}

/// Response de reserva para la API
#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub vehicle_id: Uuid,
    pub customer_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_price: String,
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            vehicle_id: booking.vehicle_id,
            customer_id: booking.customer_id,
            start_date: booking.start_date,
            end_date: booking.end_date,
            total_price: booking.total_price.to_string(),
            status: booking.status,
            notes: booking.notes,
            created_at: booking.created_at,
        }
    }
}
