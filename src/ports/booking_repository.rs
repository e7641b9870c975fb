use crate::domain::{
    UpdatePlanError,
    booking::{Booking, OverlapQuery, UpdateFields},
    value_objects::BookingId,
};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 条件付き書き込みの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// 書き込み成功。保存後の予約を返す
    Saved(Booking),
    /// 書き込み直前の再確認で重複が見つかった。何も書き込まれていない
    Conflict(Booking),
    /// 更新対象の予約が存在しない
    NotFound,
    /// ロック下で読んだ予約に対して更新内容が成り立たない。何も書き込まれていない
    Rejected(UpdatePlanError),
}

/// 予約リポジトリポート
///
/// 予約の永続化と検索を抽象化する。
///
/// 書き込み系（`insert`, `update_fields`）は同じ予約者・日付に対する書き込みを
/// 直列化したうえで重複を再確認してから書き込む。
/// `update_fields`は重複条件もロック下で読んだ予約から組み立てる。
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// 新しい予約を保存する
    ///
    /// `guard`に衝突する予約があれば`WriteOutcome::Conflict`を返し、保存しない。
    async fn insert(&self, booking: Booking, guard: &OverlapQuery) -> Result<WriteOutcome>;

    /// IDで予約を取得する
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>>;

    /// 予約の指定フィールドだけを更新する
    ///
    /// 対象の予約をロックして読み直し、その値に対して`plan_update`で
    /// 実効区間の検証と重複条件の組み立てをやり直してから書き込む。
    /// 指定されなかったフィールドは変更しない。
    ///
    /// 対象が存在しなければ`NotFound`、実効区間が不正なら`Rejected`、
    /// 衝突する予約があれば`Conflict`。
    async fn update_fields(&self, id: BookingId, fields: &UpdateFields) -> Result<WriteOutcome>;

    /// 重複する予約を1件検索する
    ///
    /// 同じ予約者・同じ日付の予約のうち、半開区間が重なるものを返す。
    /// `exclude_id`の予約は対象外。
    async fn find_overlapping(&self, query: &OverlapQuery) -> Result<Option<Booking>>;

    /// すべての予約を日付・開始時刻順で取得する
    async fn list_all(&self) -> Result<Vec<Booking>>;

    /// 予約を削除し、削除した予約を返す
    async fn delete(&self, id: BookingId) -> Result<Option<Booking>>;
}
