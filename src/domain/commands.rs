use serde::{Deserialize, Serialize};

/// コマンド：予約を作成する
///
/// 値はスキーマ検証済みの文字列のまま受け取り、日付・時刻の解釈は
/// ドメイン層で行う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBooking {
    pub owner: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

/// コマンド：予約を部分更新する
///
/// 指定されたフィールドだけが置き換えられる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBooking {
    pub owner: Option<String>,
    pub date: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl UpdateBooking {
    /// 1つもフィールドが指定されていないか
    pub fn is_empty(&self) -> bool {
        self.owner.is_none()
            && self.date.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }
}
