//! Configuración del dominio de alquiler
//!
//! Estos structs se inyectan explícitamente en los servicios del núcleo
//! para mantenerlos testeables sin preparar el entorno.

use std::env;

/// Parámetros de negocio para reservas.
#[derive(Debug, Clone)]
pub struct RentalConfig {
    /// Minutos de margen alrededor de cada reserva para limpieza e
    /// inspección. Expande la ventana buscada en ambos sentidos.
    pub buffer_minutes: i64,
    /// Duración mínima de un alquiler, validada en el borde HTTP.
    pub min_rental_hours: i64,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self {
            buffer_minutes: 60,
            min_rental_hours: 24,
        }
    }
}

impl RentalConfig {
    /// Leer overrides opcionales del entorno, con los defaults de dominio.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            buffer_minutes: env::var("BOOKING_BUFFER_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.buffer_minutes),
            min_rental_hours: env::var("MIN_RENTAL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_rental_hours),
        }
    }
}

/// Credenciales y URLs de la pasarela de pagos.
#[derive(Debug, Clone)]
pub struct PaystackConfig {
    pub secret_key: String,
    pub base_url: String,
    /// URL a la que la pasarela redirige al navegador tras el pago.
    pub callback_url: String,
    /// Destinos de redirección que devolvemos al frontend tras conciliar.
    pub success_redirect: String,
    pub failure_redirect: String,
}

impl PaystackConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: env::var("PAYSTACK_SECRET_KEY")
                .expect("PAYSTACK_SECRET_KEY must be set"),
            base_url: env::var("PAYSTACK_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            callback_url: env::var("PAYMENT_CALLBACK_URL")
                .expect("PAYMENT_CALLBACK_URL must be set"),
            success_redirect: env::var("PAYMENT_SUCCESS_REDIRECT")
                .unwrap_or_else(|_| "/payment/success".to_string()),
            failure_redirect: env::var("PAYMENT_FAILURE_REDIRECT")
                .unwrap_or_else(|_| "/payment/failure".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_buffer_is_one_hour() {
        let config = RentalConfig::default();
        assert_eq!(config.buffer_minutes, 60);
        assert_eq!(config.min_rental_hours, 24);
    }
}
