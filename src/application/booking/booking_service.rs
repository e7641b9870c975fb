use crate::domain::{
    self,
    booking::{Booking, UpdateFields},
    commands::{CreateBooking, UpdateBooking},
    value_objects::BookingId,
};
use crate::ports::{BookingRepository, WriteOutcome};
use std::sync::Arc;

use super::errors::{BookingApplicationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// ストアは明示的なハンドルとして渡され、テストではインメモリ実装に差し替えられる。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub booking_repository: Arc<dyn BookingRepository>,
}

/// 条件付き書き込みの結果をアプリケーションの結果に変換する
fn into_saved(outcome: WriteOutcome) -> Result<Booking> {
    match outcome {
        WriteOutcome::Saved(booking) => Ok(booking),
        WriteOutcome::Conflict(existing) => {
            tracing::warn!(
                conflicting_id = %existing.id,
                "Booking write rejected by overlap re-check"
            );
            Err(BookingApplicationError::Conflict)
        }
        WriteOutcome::NotFound => Err(BookingApplicationError::NotFound),
        WriteOutcome::Rejected(e) => Err(e.into()),
    }
}

/// 予約を作成する（純粋な関数）
///
/// 処理フロー：
/// 1. 予約者・日付・時刻を解釈し、区間を検証（ドメイン層）
/// 2. 同じ予約者・日付の重複を確認
/// 3. 重複がなければ保存（保存時にも同じ条件で再確認される）
///
/// いずれかの段階で失敗した場合、何も永続化されない。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `cmd` - 作成コマンド
///
/// # 戻り値
/// 保存された予約
pub async fn create_booking(deps: &ServiceDependencies, cmd: CreateBooking) -> Result<Booking> {
    // 1. 解釈と区間検証
    let (booking, guard) = domain::booking::create_booking(&cmd, chrono::Utc::now())?;

    // 2. 重複確認
    let conflict = deps
        .booking_repository
        .find_overlapping(&guard)
        .await
        .map_err(BookingApplicationError::RepositoryError)?;

    if let Some(existing) = conflict {
        tracing::debug!(
            owner = %guard.owner,
            date = %guard.date,
            conflicting_id = %existing.id,
            "Booking overlaps an existing booking"
        );
        return Err(BookingApplicationError::Conflict);
    }

    // 3. 保存
    let outcome = deps
        .booking_repository
        .insert(booking, &guard)
        .await
        .map_err(BookingApplicationError::RepositoryError)?;

    let saved = into_saved(outcome)?;
    tracing::info!(booking_id = %saved.id, owner = %saved.owner, "Booking created");
    Ok(saved)
}

/// 予約を部分更新する（純粋な関数）
///
/// ビジネスルール：
/// - 少なくとも1つのフィールドが指定されていること
/// - 未指定のフィールドがある場合は現在の予約を取得して補う（存在しなければNotFound）
/// - 実効区間（指定値または現在値）で区間検証と重複確認を行う
/// - 自分自身は重複確認の対象外
/// - 永続化するのは指定されたフィールドのみ
///
/// 書き込み時にリポジトリがロック下で予約を読み直し、検証と重複確認をやり直す。
/// ここでの検証と重複確認は書き込み前の早期判定。
///
/// # 引数
/// * `deps` - サービスの依存関係
/// * `id` - 予約ID
/// * `cmd` - 更新コマンド
///
/// # 戻り値
/// 更新後の予約
pub async fn update_booking(
    deps: &ServiceDependencies,
    id: BookingId,
    cmd: UpdateBooking,
) -> Result<Booking> {
    // 1. 指定フィールドの解釈
    let fields = UpdateFields::try_from(&cmd)?;

    // 2. 必要なら現在の予約を取得
    let current = if fields.requires_current() {
        let booking = deps
            .booking_repository
            .find_by_id(id)
            .await
            .map_err(BookingApplicationError::RepositoryError)?
            .ok_or(BookingApplicationError::NotFound)?;
        Some(booking)
    } else {
        None
    };

    // 3. 実効区間の検証
    let plan = domain::booking::plan_update(id, fields.clone(), current.as_ref())?;

    // 4. 重複確認（自分自身を除く）
    // 予約の存在を確認できていない場合は書き込み時の判定に任せる
    if current.is_some() {
        let conflict = deps
            .booking_repository
            .find_overlapping(&plan.guard)
            .await
            .map_err(BookingApplicationError::RepositoryError)?;

        if let Some(existing) = conflict {
            tracing::debug!(
                booking_id = %id,
                conflicting_id = %existing.id,
                "Updated interval overlaps an existing booking"
            );
            return Err(BookingApplicationError::Conflict);
        }
    }

    // 5. 指定されたフィールドだけを保存（ロック下で再検証）
    let outcome = deps
        .booking_repository
        .update_fields(id, &fields)
        .await
        .map_err(BookingApplicationError::RepositoryError)?;

    let updated = into_saved(outcome)?;
    tracing::info!(booking_id = %id, "Booking updated");
    Ok(updated)
}

/// IDで予約を取得する
pub async fn get_booking(deps: &ServiceDependencies, id: BookingId) -> Result<Booking> {
    deps.booking_repository
        .find_by_id(id)
        .await
        .map_err(BookingApplicationError::RepositoryError)?
        .ok_or(BookingApplicationError::NotFound)
}

/// すべての予約を取得する
pub async fn list_bookings(deps: &ServiceDependencies) -> Result<Vec<Booking>> {
    deps.booking_repository
        .list_all()
        .await
        .map_err(BookingApplicationError::RepositoryError)
}

/// 予約を削除する
///
/// # 戻り値
/// 削除された予約
pub async fn delete_booking(deps: &ServiceDependencies, id: BookingId) -> Result<Booking> {
    let deleted = deps
        .booking_repository
        .delete(id)
        .await
        .map_err(BookingApplicationError::RepositoryError)?
        .ok_or(BookingApplicationError::NotFound)?;

    tracing::info!(booking_id = %id, "Booking deleted");
    Ok(deleted)
}
