use uuid::Uuid;
use validator::Validate;

use crate::config::rental::RentalConfig;
use crate::dto::booking_dto::{
    AvailabilityQuery, AvailabilityResponse, BookingResponse, CreateBookingRequest,
    UpdateBookingStatusRequest,
};
use crate::dto::ApiResponse;
use crate::repositories::booking_repository::BookingRepository;
use crate::services::booking_service::BookingService;
use crate::utils::errors::AppError;

pub struct BookingController {
    service: BookingService,
    repository: BookingRepository,
}

impl BookingController {
    pub fn new(pool: sqlx::PgPool, config: RentalConfig) -> Self {
        Self {
            service: BookingService::new(pool.clone(), config),
            repository: BookingRepository::new(pool),
        }
    }

    /// Chequeo orientativo de disponibilidad para la UI. El resultado no
    /// garantiza nada: la decisión final se toma al crear la reserva.
    pub async fn check_availability(
        &self,
        query: AvailabilityQuery,
    ) -> Result<AvailabilityResponse, AppError> {
        let available = self
            .service
            .check_availability(
                query.vehicle_id,
                query.start_date,
                query.end_date,
                query.exclude_booking_id,
            )
            .await?;

        Ok(AvailabilityResponse {
            vehicle_id: query.vehicle_id,
            available,
        })
    }

    pub async fn create(
        &self,
        request: CreateBookingRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        request.validate()?;

        let booking = self
            .service
            .create_booking(
                request.customer_id,
                request.vehicle_id,
                request.start_date,
                request.end_date,
                request.notes,
            )
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking created. Complete the payment to confirm it.".to_string(),
        ))
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<BookingResponse, AppError> {
        let booking = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        Ok(booking.into())
    }

    pub async fn list_by_customer(
        &self,
        customer_id: Uuid,
    ) -> Result<Vec<BookingResponse>, AppError> {
        let bookings = self.repository.list_by_customer(customer_id).await?;
        Ok(bookings.into_iter().map(BookingResponse::from).collect())
    }

    pub async fn cancel(
        &self,
        booking_id: Uuid,
        customer_id: Uuid,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self.service.cancel_booking(booking_id, customer_id).await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking cancelled".to_string(),
        ))
    }

    pub async fn update_status(
        &self,
        booking_id: Uuid,
        request: UpdateBookingStatusRequest,
    ) -> Result<ApiResponse<BookingResponse>, AppError> {
        let booking = self
            .service
            .update_status(booking_id, request.status)
            .await?;

        Ok(ApiResponse::success_with_message(
            booking.into(),
            "Booking status updated".to_string(),
        ))
    }
}
