use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use dotenvy::dotenv;
use serde_json::json;
use tokio::signal;
use tracing::{error, info};

use vehicle_rental::config::environment::EnvironmentConfig;
use vehicle_rental::database::DatabaseConnection;
use vehicle_rental::middleware::cors::cors_middleware;
use vehicle_rental::routes;
use vehicle_rental::services::payment_gateway::PaystackClient;
use vehicle_rental::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🚗 Vehicle Rental - Booking & Payments API");
    info!("==========================================");

    let config = EnvironmentConfig::from_env();

    // Inicializar base de datos
    let db_connection = match DatabaseConnection::new_default().await {
        Ok(conn) => conn,
        Err(e) => {
            error!("❌ Error conectando a la base de datos: {}", e);
            return Err(anyhow::anyhow!("Error de base de datos: {}", e));
        }
    };

    db_connection.run_migrations().await?;
    let pool = db_connection.pool().clone();

    // Cliente de la pasarela de pagos
    let gateway = Arc::new(PaystackClient::new(&config.paystack));

    let app_state = AppState::new(pool, config.clone(), gateway);

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/vehicle", routes::vehicle_routes::create_vehicle_router())
        .nest("/api/booking", routes::booking_routes::create_booking_router())
        .nest("/api/payment", routes::payment_routes::create_payment_router())
        .layer(cors_middleware())
        .with_state(app_state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health - Health check");
    info!("🚗 Vehicle:");
    info!("   GET  /api/vehicle - Listar flota");
    info!("   GET  /api/vehicle/:id - Obtener vehículo");
    info!("   PUT  /api/vehicle/:id/status - Mantenimiento / vuelta a servicio");
    info!("📅 Booking:");
    info!("   GET  /api/booking/availability - Chequeo de disponibilidad");
    info!("   POST /api/booking - Crear reserva (pending)");
    info!("   GET  /api/booking/:id - Obtener reserva");
    info!("   POST /api/booking/:id/cancel - Cancelar reserva");
    info!("   PUT  /api/booking/:id/status - Recogida / devolución");
    info!("💳 Payment:");
    info!("   POST /api/payment/initiate - Iniciar pago");
    info!("   GET  /api/payment/callback - Callback de la pasarela");
    info!("   POST /api/payment/webhook - Webhook firmado de la pasarela");
    info!("   GET  /api/payment/:booking_id/status - Estado del pago");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Servidor terminado");
    Ok(())
}

/// Endpoint de health check
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "vehicle-rental",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
