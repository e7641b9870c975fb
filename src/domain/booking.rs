use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    BookingId, IntervalContext, OwnerId, TimeField, UpdateField, UpdatePlanError,
    ValidationError,
    commands::{CreateBooking, UpdateBooking},
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

// ============================================================================
// 集約
// ============================================================================

/// Booking集約 - 予約者1人の1つの時間帯の予約
///
/// 不変条件：
/// - endはstartより厳密に後
/// - 同じ予約者・同じ日付の予約同士は半開区間[start, end)で重ならない
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    // 識別子
    pub id: BookingId,

    // 他の集約への参照（IDのみ）
    pub owner: OwnerId,

    // 予約の責務
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// 日付・時刻の解釈
// ============================================================================

/// `pattern` の `d` を数字、それ以外を同じ文字として厳密に照合する
fn matches_shape(value: &str, pattern: &str) -> bool {
    value.len() == pattern.len()
        && value
            .bytes()
            .zip(pattern.bytes())
            .all(|(v, p)| if p == b'd' { v.is_ascii_digit() } else { v == p })
}

/// 純粋関数：YYYY-MM-DD 形式の日付を解釈する
pub fn parse_date(value: &str) -> Result<NaiveDate, ValidationError> {
    if !matches_shape(value, "dddd-dd-dd") {
        return Err(ValidationError::InvalidDate(value.to_string()));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(value.to_string()))
}

/// 純粋関数：HH:mm 形式の時刻を解釈する
pub fn parse_time(field: TimeField, value: &str) -> Result<NaiveTime, ValidationError> {
    let invalid = || ValidationError::InvalidTime {
        field,
        value: value.to_string(),
    };
    if !matches_shape(value, "dd:dd") {
        return Err(invalid());
    }
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|_| invalid())
}

/// 純粋関数：日付と時刻を結合してタイムスタンプにする
///
/// 入力はUTCとして扱い、タイムゾーン変換は行わない。
pub fn combine(date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
    date.and_time(time).and_utc()
}

// ============================================================================
// 区間検証・重複判定
// ============================================================================

/// 純粋関数：区間の検証
///
/// endがstartより厳密に後であることを確認する。同時刻も不正とする。
pub fn validate_interval(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    context: IntervalContext,
) -> Result<(), ValidationError> {
    if end <= start {
        return Err(ValidationError::EndNotAfterStart(context));
    }
    Ok(())
}

/// 純粋関数：半開区間[s1, e1)と[s2, e2)が重なるか
///
/// 端点が接しているだけの区間は重ならない。
pub fn overlaps(
    s1: DateTime<Utc>,
    e1: DateTime<Utc>,
    s2: DateTime<Utc>,
    e2: DateTime<Utc>,
) -> bool {
    s1 < e2 && e1 > s2
}

/// 重複検索の条件
///
/// ストアへの問い合わせ形そのもの：予約者と日付で絞り込んでから
/// 区間の重なりを判定する。`exclude_id`の予約は対象外。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapQuery {
    pub owner: OwnerId,
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub exclude_id: Option<BookingId>,
}

impl OverlapQuery {
    /// 既存の予約がこの条件と衝突するか
    pub fn conflicts_with(&self, existing: &Booking) -> bool {
        if self.exclude_id == Some(existing.id) {
            return false;
        }
        existing.owner == self.owner
            && existing.date == self.date
            && overlaps(self.start, self.end, existing.start, existing.end)
    }

    /// 候補の中から最初に衝突する予約を探す
    pub fn find_conflict<'a, I>(&self, candidates: I) -> Option<&'a Booking>
    where
        I: IntoIterator<Item = &'a Booking>,
    {
        candidates.into_iter().find(|b| self.conflicts_with(b))
    }
}

// ============================================================================
// 作成
// ============================================================================

/// 純粋関数：予約を作成する
///
/// 1. 予約者・日付・時刻を解釈
/// 2. 区間を検証
/// 3. 新しいBookingと、書き込み前に確認すべき重複条件を返す
///
/// 副作用なし。重複確認と永続化は呼び出し側の責務。
pub fn create_booking(
    cmd: &CreateBooking,
    now: DateTime<Utc>,
) -> Result<(Booking, OverlapQuery), ValidationError> {
    let owner = OwnerId::parse(&cmd.owner)?;
    let date = parse_date(&cmd.date)?;
    let start = combine(date, parse_time(TimeField::Start, &cmd.start_time)?);
    let end = combine(date, parse_time(TimeField::End, &cmd.end_time)?);

    validate_interval(start, end, IntervalContext::Create)?;

    let booking = Booking {
        id: BookingId::new(),
        owner: owner.clone(),
        date,
        start,
        end,
        created_at: now,
        updated_at: now,
    };

    let guard = OverlapQuery {
        owner,
        date,
        start,
        end,
        exclude_id: None,
    };

    Ok((booking, guard))
}

// ============================================================================
// 更新
// ============================================================================

/// 解釈済みの更新内容
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateFields {
    pub owner: Option<OwnerId>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
}

impl TryFrom<&UpdateBooking> for UpdateFields {
    type Error = ValidationError;

    fn try_from(cmd: &UpdateBooking) -> Result<Self, Self::Error> {
        if cmd.is_empty() {
            return Err(ValidationError::EmptyUpdate);
        }
        Ok(Self {
            owner: cmd.owner.as_deref().map(OwnerId::parse).transpose()?,
            date: cmd.date.as_deref().map(parse_date).transpose()?,
            start_time: cmd
                .start_time
                .as_deref()
                .map(|v| parse_time(TimeField::Start, v))
                .transpose()?,
            end_time: cmd
                .end_time
                .as_deref()
                .map(|v| parse_time(TimeField::End, v))
                .transpose()?,
        })
    }
}

impl UpdateFields {
    /// 検証に現在の予約が必要か
    ///
    /// 未指定のフィールドは現在の予約から補う必要がある。
    pub fn requires_current(&self) -> bool {
        self.owner.is_none()
            || self.date.is_none()
            || self.start_time.is_none()
            || self.end_time.is_none()
    }
}

/// 永続化する差分
///
/// 指定されたフィールドだけを持つ。未指定のフィールドはストア上で変更しない。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookingPatch {
    pub owner: Option<OwnerId>,
    pub date: Option<NaiveDate>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl BookingPatch {
    /// 差分を予約に適用した結果を返す
    pub fn apply_to(&self, booking: &Booking, updated_at: DateTime<Utc>) -> Booking {
        Booking {
            owner: self.owner.clone().unwrap_or_else(|| booking.owner.clone()),
            date: self.date.unwrap_or(booking.date),
            start: self.start.unwrap_or(booking.start),
            end: self.end.unwrap_or(booking.end),
            updated_at,
            ..booking.clone()
        }
    }
}

/// 更新計画：検証用の実効区間による重複条件と、永続化する差分
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePlan {
    pub guard: OverlapQuery,
    pub patch: BookingPatch,
}

/// 純粋関数：予約の更新計画を立てる
///
/// ビジネスルール：
/// - 実効日付は指定された日付、なければ現在の日付
/// - 指定された時刻だけを実効日付と結合する
/// - 指定されなかった時刻は現在のタイムスタンプをそのまま使う（再結合しない）
/// - 実効区間を検証し、自分自身を除外した重複条件を作る
/// - 永続化するのは指定された差分のみ
///
/// 副作用なし。
///
/// # エラー
/// - `Invalid`: 実効区間が不正
/// - `Unresolved`: 値が指定されず、現在の予約もない
pub fn plan_update(
    id: BookingId,
    fields: UpdateFields,
    current: Option<&Booking>,
) -> Result<UpdatePlan, UpdatePlanError> {
    let date = fields
        .date
        .or(current.map(|b| b.date))
        .ok_or(UpdatePlanError::Unresolved(UpdateField::Date))?;

    let new_start = fields.start_time.map(|t| combine(date, t));
    let new_end = fields.end_time.map(|t| combine(date, t));

    let start = new_start
        .or(current.map(|b| b.start))
        .ok_or(UpdatePlanError::Unresolved(UpdateField::StartTime))?;
    let end = new_end
        .or(current.map(|b| b.end))
        .ok_or(UpdatePlanError::Unresolved(UpdateField::EndTime))?;

    validate_interval(start, end, IntervalContext::Update)?;

    let owner = fields
        .owner
        .clone()
        .or_else(|| current.map(|b| b.owner.clone()))
        .ok_or(UpdatePlanError::Unresolved(UpdateField::Owner))?;

    let guard = OverlapQuery {
        owner,
        date,
        start,
        end,
        exclude_id: Some(id),
    };

    let patch = BookingPatch {
        owner: fields.owner,
        date: fields.date,
        start: new_start,
        end: new_end,
    };

    Ok(UpdatePlan { guard, patch })
}
