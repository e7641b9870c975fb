use crate::application::booking::{
    ServiceDependencies, create_booking as execute_create_booking,
    delete_booking as execute_delete_booking, get_booking as execute_get_booking,
    list_bookings as execute_list_bookings, update_booking as execute_update_booking,
};
use crate::domain::value_objects::BookingId;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{BookingDeletedResponse, BookingResponse, CreateBookingRequest, UpdateBookingRequest},
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Command handlers
// ============================================================================

/// POST /bookings - 新しい予約を作成
///
/// 強制されるビジネスルール:
/// - 予約者・日付・時刻がすべて指定され、形式が正しいこと
/// - 終了時刻が開始時刻より後であること
/// - 同じ予約者・同じ日付の予約と時間帯が重ならないこと
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), ApiError> {
    let booking = execute_create_booking(&state.service_deps, req.to_command()).await?;

    Ok((StatusCode::CREATED, Json(BookingResponse::from(booking))))
}

/// PATCH /bookings/:id - 予約を部分更新
///
/// 強制されるビジネスルール:
/// - 少なくとも1つのフィールドが指定されていること
/// - 予約が存在すること
/// - 更新後の区間で終了時刻が開始時刻より後であること
/// - 自分以外の予約と時間帯が重ならないこと
pub async fn update_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = execute_update_booking(
        &state.service_deps,
        BookingId::from_uuid(id),
        req.to_command(),
    )
    .await?;

    Ok(Json(BookingResponse::from(booking)))
}

/// DELETE /bookings/:id - 予約を削除
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDeletedResponse>, ApiError> {
    let deleted = execute_delete_booking(&state.service_deps, BookingId::from_uuid(id)).await?;

    Ok(Json(BookingDeletedResponse {
        message: "Booking deleted successfully".to_string(),
        deleted_booking: BookingResponse::from(deleted),
    }))
}

// ============================================================================
// Query handlers (GET)
// ============================================================================

/// GET /bookings/:id - 予約詳細をIDで取得
pub async fn get_booking_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking = execute_get_booking(&state.service_deps, BookingId::from_uuid(id)).await?;

    Ok(Json(BookingResponse::from(booking)))
}

/// GET /bookings - 全予約を日付・開始時刻順で取得
pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookingResponse>>, ApiError> {
    let bookings = execute_list_bookings(&state.service_deps).await?;

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}
