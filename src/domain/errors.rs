use std::fmt;

/// 時刻フィールドの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    Start,
    End,
}

impl TimeField {
    /// リクエスト上のフィールド名
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeField::Start => "startTime",
            TimeField::End => "endTime",
        }
    }
}

/// 区間検証がどの操作から呼ばれたか
///
/// 作成と更新で利用者に返すメッセージが異なるため区別する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalContext {
    Create,
    Update,
}

/// 入力値・区間の検証エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 予約者が空
    EmptyOwner,
    /// 日付が YYYY-MM-DD 形式でない、または存在しない日付
    InvalidDate(String),
    /// 時刻が HH:mm 形式でない、または存在しない時刻
    InvalidTime { field: TimeField, value: String },
    /// 終了時刻が開始時刻より後になっていない（同時刻も不可）
    EndNotAfterStart(IntervalContext),
    /// 更新項目が1つも指定されていない
    EmptyUpdate,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyOwner => f.write_str("\"user\" cannot be an empty field"),
            ValidationError::InvalidDate(_) => {
                f.write_str("\"date\" must be in the format YYYY-MM-DD")
            }
            ValidationError::InvalidTime { field, .. } => {
                write!(f, "\"{}\" must be in the format HH:mm", field.as_str())
            }
            ValidationError::EndNotAfterStart(IntervalContext::Create) => {
                f.write_str("End time must be greater than start time")
            }
            ValidationError::EndNotAfterStart(IntervalContext::Update) => {
                f.write_str("\"endTime\" must be greater than \"startTime\".")
            }
            ValidationError::EmptyUpdate => {
                f.write_str("At least one field must be provided for update")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// 更新対象のフィールド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateField {
    Owner,
    Date,
    StartTime,
    EndTime,
}

impl UpdateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateField::Owner => "user",
            UpdateField::Date => "date",
            UpdateField::StartTime => "startTime",
            UpdateField::EndTime => "endTime",
        }
    }
}

/// 更新計画の組み立てエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdatePlanError {
    /// 合成後の区間が不正
    Invalid(ValidationError),
    /// 指定されず、現在の予約からも補えなかったフィールド
    Unresolved(UpdateField),
}

impl From<ValidationError> for UpdatePlanError {
    fn from(err: ValidationError) -> Self {
        UpdatePlanError::Invalid(err)
    }
}
