//! Modelo de Vehicle
//!
//! Este módulo contiene el struct Vehicle y su estado. El estado del
//! vehículo es una proyección derivada de las reservas activas: la fuente
//! de verdad para disponibilidad es siempre el chequeo de solapamiento.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use uuid::Uuid;

/// Estado grueso del vehículo.
///
/// `Maintenance` lo gestiona el personal de flota; el sincronizador de
/// estado nunca lo sobreescribe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VehicleStatus {
    Available,
    Booked,
    Maintenance,
}

impl VehicleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VehicleStatus::Available => "available",
            VehicleStatus::Booked => "booked",
            VehicleStatus::Maintenance => "maintenance",
        }
    }
}

/// Vehicle principal - mapea exactamente a la tabla vehicles
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Vehicle {
    pub id: Uuid,
    pub make: String,
    pub model: String,
    pub license_plate: String,
    pub daily_rate: Decimal,
    pub status: VehicleStatus,
    pub created_at: DateTime<Utc>,
}
