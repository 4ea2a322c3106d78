use sqlx::PgPool;
use uuid::Uuid;

use crate::models::payment::Payment;
use crate::utils::errors::AppError;

pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_reference(&self, reference: &str) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE reference = $1")
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        Ok(payment)
    }

    pub async fn find_latest_for_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<Payment>, AppError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM payments WHERE booking_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    /// Una reserva solo admite un pago que llegue a `paid`.
    pub async fn booking_has_paid_payment(&self, booking_id: Uuid) -> Result<bool, AppError> {
        let result: (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE booking_id = $1 AND status = 'paid')",
        )
        .bind(booking_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(result.0)
    }
}
