pub mod booking_routes;
pub mod payment_routes;
pub mod vehicle_routes;

use axum::http::HeaderMap;

/// IP de origen reportada por el proxy, para el registro de auditoría.
pub(crate) fn source_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}
