use crate::domain::{UpdateField, UpdatePlanError, ValidationError};
use thiserror::Error;

/// 予約管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum BookingApplicationError {
    /// 入力値または区間が不正
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// 同じ予約者・日付に重なる予約がある
    #[error("Booking conflict: The selected time slot overlaps with an existing booking.")]
    Conflict,

    /// 予約が見つからない
    #[error("Booking not found")]
    NotFound,

    /// 重複確認に必要な値を解決できなかった
    #[error("Unable to resolve \"{}\" for the overlap check", .0.as_str())]
    Unresolved(UpdateField),

    /// リポジトリのエラー
    #[error("Booking repository error")]
    RepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 呼び出し側が区別するエラー種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Internal,
}

impl BookingApplicationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingApplicationError::Validation(_) => ErrorKind::Validation,
            BookingApplicationError::Conflict => ErrorKind::Conflict,
            BookingApplicationError::NotFound => ErrorKind::NotFound,
            BookingApplicationError::Unresolved(_)
            | BookingApplicationError::RepositoryError(_) => ErrorKind::Internal,
        }
    }
}

impl From<UpdatePlanError> for BookingApplicationError {
    fn from(err: UpdatePlanError) -> Self {
        match err {
            UpdatePlanError::Invalid(e) => BookingApplicationError::Validation(e),
            UpdatePlanError::Unresolved(field) => BookingApplicationError::Unresolved(field),
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, BookingApplicationError>;
