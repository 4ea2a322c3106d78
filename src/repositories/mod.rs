//! Repositorios de acceso a datos
//!
//! Consultas por agregado. Las operaciones que deben ejecutarse dentro de
//! la sección crítica de una transacción aceptan un executor explícito en
//! lugar de usar el pool.

pub mod audit_log_repository;
pub mod booking_repository;
pub mod payment_repository;
pub mod vehicle_repository;
