use crate::domain::{
    booking::{Booking, OverlapQuery, UpdateFields, plan_update},
    value_objects::{BookingId, OwnerId},
};
use crate::ports::booking_repository::{
    BookingRepository as BookingRepositoryTrait, Result, WriteOutcome,
};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};

/// PostgreSQLの行データをBookingに変換する
///
/// ownerは空でないことをドメインの値オブジェクトで再確認する。
fn map_row_to_booking(row: &PgRow) -> Result<Booking> {
    let owner: String = row.get("owner");
    let owner = OwnerId::parse(&owner).map_err(|e| {
        Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            e.to_string(),
        )) as Box<dyn std::error::Error + Send + Sync>
    })?;

    Ok(Booking {
        id: BookingId::from_uuid(row.get("id")),
        owner,
        date: row.get("booking_date"),
        start: row.get("start_time"),
        end: row.get("end_time"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

/// 予約者・日付ごとのトランザクションロックを取得する
///
/// 同じ予約者・日付への書き込みはコミットまで直列化される。
async fn lock_owner_date(
    tx: &mut sqlx::Transaction<'_, Postgres>,
    guard: &OverlapQuery,
) -> Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1 || '/' || $2, 0))")
        .bind(guard.owner.as_str())
        .bind(guard.date.to_string())
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// 重複する予約を1件検索する
///
/// プールからもトランザクション内からも呼べるように実行器を受け取る。
async fn select_overlapping<'e, E>(executor: E, query: &OverlapQuery) -> Result<Option<Booking>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        r#"
        SELECT
            id,
            owner,
            booking_date,
            start_time,
            end_time,
            created_at,
            updated_at
        FROM bookings
        WHERE owner = $1
          AND booking_date = $2
          AND start_time < $4
          AND end_time > $3
          AND ($5::uuid IS NULL OR id <> $5)
        ORDER BY start_time ASC
        LIMIT 1
        "#,
    )
    .bind(query.owner.as_str())
    .bind(query.date)
    .bind(query.start)
    .bind(query.end)
    .bind(query.exclude_id.map(|id| id.value()))
    .fetch_optional(executor)
    .await?;

    row.as_ref().map(map_row_to_booking).transpose()
}

/// BookingRepositoryのPostgreSQL実装
///
/// 書き込みは1件ごとにトランザクションを張り、予約者・日付単位の
/// アドバイザリロックを取ってから重複を再確認する。
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// PostgreSQLコネクションプールから新しいBookingRepositoryを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepositoryTrait for BookingRepository {
    /// 予約を保存（重複再確認つき）
    async fn insert(&self, booking: Booking, guard: &OverlapQuery) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;
        lock_owner_date(&mut tx, guard).await?;

        if let Some(existing) = select_overlapping(&mut *tx, guard).await? {
            tx.rollback().await?;
            return Ok(WriteOutcome::Conflict(existing));
        }

        let row = sqlx::query(
            r#"
            INSERT INTO bookings (
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            "#,
        )
        .bind(booking.id.value())
        .bind(booking.owner.as_str())
        .bind(booking.date)
        .bind(booking.start)
        .bind(booking.end)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        // 保存された値（マイクロ秒精度）を返す
        let saved = map_row_to_booking(&row)?;
        tx.commit().await?;
        Ok(WriteOutcome::Saved(saved))
    }

    /// IDで予約を取得
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            FROM bookings
            WHERE id = $1
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    /// 指定フィールドのみ更新（重複再確認つき）
    ///
    /// 行ロックを取って現在の予約を読み直し、その値で更新計画を立ててから
    /// 計画の予約者・日付でアドバイザリロックを取る。
    /// COALESCEでパッチに含まれないカラムを元の値のまま残す。
    async fn update_fields(&self, id: BookingId, fields: &UpdateFields) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            SELECT
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            FROM bookings
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id.value())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.rollback().await?;
            return Ok(WriteOutcome::NotFound);
        };
        let current = map_row_to_booking(&row)?;

        let plan = match plan_update(id, fields.clone(), Some(&current)) {
            Ok(plan) => plan,
            Err(e) => {
                tx.rollback().await?;
                return Ok(WriteOutcome::Rejected(e));
            }
        };

        lock_owner_date(&mut tx, &plan.guard).await?;

        if let Some(existing) = select_overlapping(&mut *tx, &plan.guard).await? {
            tx.rollback().await?;
            return Ok(WriteOutcome::Conflict(existing));
        }

        let row = sqlx::query(
            r#"
            UPDATE bookings
            SET
                owner = COALESCE($2, owner),
                booking_date = COALESCE($3, booking_date),
                start_time = COALESCE($4, start_time),
                end_time = COALESCE($5, end_time),
                updated_at = $6
            WHERE id = $1
            RETURNING
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            "#,
        )
        .bind(id.value())
        .bind(plan.patch.owner.as_ref().map(OwnerId::as_str))
        .bind(plan.patch.date)
        .bind(plan.patch.start)
        .bind(plan.patch.end)
        .bind(chrono::Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let updated = map_row_to_booking(&row)?;
        tx.commit().await?;
        Ok(WriteOutcome::Saved(updated))
    }

    /// 重複する予約を検索
    ///
    /// (owner, booking_date)のインデックスで絞り込んでから区間を比較する。
    async fn find_overlapping(&self, query: &OverlapQuery) -> Result<Option<Booking>> {
        select_overlapping(&self.pool, query).await
    }

    /// 全予約を日付・開始時刻順で取得
    async fn list_all(&self) -> Result<Vec<Booking>> {
        sqlx::query(
            r#"
            SELECT
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            FROM bookings
            ORDER BY booking_date ASC, start_time ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|row| row.map_err(Into::into).and_then(|row| map_row_to_booking(&row)))
        .try_collect()
        .await
    }

    /// 予約を削除
    async fn delete(&self, id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            DELETE FROM bookings
            WHERE id = $1
            RETURNING
                id,
                owner,
                booking_date,
                start_time,
                end_time,
                created_at,
                updated_at
            "#,
        )
        .bind(id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }
}
