use crate::application::booking::BookingApplicationError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(BookingApplicationError);

impl From<BookingApplicationError> for ApiError {
    fn from(err: BookingApplicationError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self.0 {
            // 400 Bad Request - 入力値・区間の不正
            BookingApplicationError::Validation(ref e) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string())
            }

            // 409 Conflict - 同じ予約者・日付に重なる予約がある
            ref e @ BookingApplicationError::Conflict => {
                (StatusCode::CONFLICT, "BOOKING_CONFLICT", e.to_string())
            }

            // 404 Not Found - リクエストされた予約が存在しない
            BookingApplicationError::NotFound => (
                StatusCode::NOT_FOUND,
                "BOOKING_NOT_FOUND",
                "Booking not found".to_string(),
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ref e @ BookingApplicationError::Unresolved(_) => {
                tracing::error!("Update could not be resolved: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
            BookingApplicationError::RepositoryError(ref e) => {
                tracing::error!("Booking repository error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
