use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, create_booking, delete_booking, get_booking_by_id, list_bookings, update_booking,
};

/// Creates the API router with all booking endpoints
///
/// - POST /bookings - Create a booking
/// - GET /bookings - List all bookings
/// - GET /bookings/:id - Get booking details
/// - PATCH /bookings/:id - Partially update a booking
/// - DELETE /bookings/:id - Delete a booking
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        .route("/bookings", post(create_booking).get(list_bookings))
        .route(
            "/bookings/:id",
            get(get_booking_by_id)
                .patch(update_booking)
                .delete(delete_booking),
        )
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
