//! Utilidades de validación
//!
//! Este módulo contiene funciones helper para validación de datos.

use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::ValidationError;

use crate::utils::errors::AppError;

/// Validar y convertir string a UUID
pub fn validate_uuid(value: &str) -> Result<Uuid, ValidationError> {
    Uuid::parse_str(value).map_err(|_| {
        let mut error = ValidationError::new("uuid");
        error.add_param("value".into(), &value.to_string());
        error
    })
}

/// Valida la ventana temporal de una reserva antes de entrar al núcleo
/// transaccional: fin posterior al inicio y duración mínima configurada.
///
/// La duración mínima se valida aquí, en el borde HTTP; el chequeo de
/// disponibilidad bajo lock no la re-valida.
pub fn validate_booking_window(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_rental_hours: i64,
) -> Result<(), AppError> {
    if end <= start {
        return Err(AppError::BadRequest(
            "end_date must be after start_date".to_string(),
        ));
    }

    if (end - start) < chrono::Duration::hours(min_rental_hours) {
        return Err(AppError::BadRequest(format!(
            "The minimum rental duration is {} hours",
            min_rental_hours
        )));
    }

    Ok(())
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
    fn rejects_inverted_window() {
        let start = ts("2024-01-12T10:00:00Z");
        let end = ts("2024-01-10T10:00:00Z");
        assert!(validate_booking_window(start, end, 24).is_err());
    }

    #[test]
    fn rejects_window_under_minimum() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-10T20:00:00Z");
        assert!(validate_booking_window(start, end, 24).is_err());
    }

    #[test]
    fn accepts_window_at_exact_minimum() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-11T10:00:00Z");
        assert!(validate_booking_window(start, end, 24).is_ok());
    }
}
