//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL con las convenciones estándar.

pub mod audit_log;
pub mod booking;
pub mod payment;
pub mod vehicle;

pub use audit_log::*;
pub use booking::*;
pub use payment::*;
pub use vehicle::*;
