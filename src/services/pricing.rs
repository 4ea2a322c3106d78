//! Cálculo de precios de alquiler
//!
//! Función pura: tarifa diaria × días completos, con mínimo de un día.
//! El redondeo a 2 decimales es half-up (MidpointAwayFromZero) en todo el
//! sistema; la conciliación de importes depende de que sea consistente.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

/// Días facturables entre dos instantes: días completos transcurridos,
/// redondeados hacia abajo, nunca menos de 1. Una reserva de menos de
/// 24 horas paga un día entero.
///
/// Precondición del llamante: `end > start`.
pub fn rental_days(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    (end - start).num_days().max(1)
}

/// Precio total del alquiler redondeado a 2 decimales.
pub fn rental_total(daily_rate: Decimal, start: DateTime<Utc>, end: DateTime<Utc>) -> Decimal {
    let days = Decimal::from(rental_days(start, end));
    (daily_rate * days).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s)
            .expect("valid test timestamp")
            .with_timezone(&Utc)
    }

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal")
    }

    #[test]
    fn spans_under_a_day_bill_one_day() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-10T18:30:00Z");
        assert_eq!(rental_days(start, end), 1);
    }

    #[test]
    fn exact_multiples_of_24h_bill_exactly() {
        let start = ts("2024-01-10T10:00:00Z");
        assert_eq!(rental_days(start, ts("2024-01-11T10:00:00Z")), 1);
        assert_eq!(rental_days(start, ts("2024-01-13T10:00:00Z")), 3);
        assert_eq!(rental_days(start, ts("2024-01-17T10:00:00Z")), 7);
    }

    #[test]
    fn partial_extra_day_is_floored() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-12T21:59:00Z");
        assert_eq!(rental_days(start, end), 2);
    }

    #[test]
    fn total_is_rate_times_days() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-13T10:00:00Z");
        let total = rental_total(dec("150.00"), start, end);
        assert_eq!(total, dec("450.00"));
    }

    #[test]
    fn rounding_is_half_up() {
        let start = ts("2024-01-10T10:00:00Z");
        let end = ts("2024-01-10T12:00:00Z");
        // 33.335 × 1 día: el medio céntimo redondea hacia arriba.
        assert_eq!(rental_total(dec("33.335"), start, end), dec("33.34"));
        assert_eq!(rental_total(dec("33.334"), start, end), dec("33.33"));
    }

    #[test]
    fn total_is_deterministic() {
        let start = ts("2024-03-01T09:00:00Z");
        let end = ts("2024-03-05T09:00:00Z");
        let first = rental_total(dec("87.65"), start, end);
        for _ in 0..10 {
            assert_eq!(rental_total(dec("87.65"), start, end), first);
        }
    }
}
