use crate::domain::{
    booking::{Booking, OverlapQuery, UpdateFields, plan_update},
    value_objects::BookingId,
};
use crate::ports::booking_repository::{
    BookingRepository as BookingRepositoryTrait, Result, WriteOutcome,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// BookingRepositoryのインメモリ実装
///
/// 重複の再確認と書き込みを同じロック内で行うため、条件付き書き込みは原子的。
/// テスト用にストア障害を模擬できる。
pub struct BookingRepository {
    bookings: Mutex<HashMap<BookingId, Booking>>,
    unavailable: AtomicBool,
}

impl BookingRepository {
    pub fn new() -> Self {
        Self {
            bookings: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// テスト用に予約を直接登録する（検証なし）
    pub fn seed(&self, booking: Booking) {
        self.lock().insert(booking.id, booking);
    }

    /// テスト用にストア障害を模擬する
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<BookingId, Booking>> {
        self.bookings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err("booking store unavailable".into());
        }
        Ok(())
    }
}

impl Default for BookingRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookingRepositoryTrait for BookingRepository {
    async fn insert(&self, booking: Booking, guard: &OverlapQuery) -> Result<WriteOutcome> {
        self.check_available()?;
        let mut bookings = self.lock();

        if let Some(existing) = guard.find_conflict(bookings.values()) {
            return Ok(WriteOutcome::Conflict(existing.clone()));
        }

        bookings.insert(booking.id, booking.clone());
        Ok(WriteOutcome::Saved(booking))
    }

    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>> {
        self.check_available()?;
        Ok(self.lock().get(&id).cloned())
    }

    async fn update_fields(&self, id: BookingId, fields: &UpdateFields) -> Result<WriteOutcome> {
        self.check_available()?;
        let mut bookings = self.lock();

        let Some(current) = bookings.get(&id) else {
            return Ok(WriteOutcome::NotFound);
        };

        let plan = match plan_update(id, fields.clone(), Some(current)) {
            Ok(plan) => plan,
            Err(e) => return Ok(WriteOutcome::Rejected(e)),
        };
        let updated = plan.patch.apply_to(current, chrono::Utc::now());

        if let Some(existing) = plan.guard.find_conflict(bookings.values()) {
            return Ok(WriteOutcome::Conflict(existing.clone()));
        }

        bookings.insert(id, updated.clone());
        Ok(WriteOutcome::Saved(updated))
    }

    async fn find_overlapping(&self, query: &OverlapQuery) -> Result<Option<Booking>> {
        self.check_available()?;
        Ok(query.find_conflict(self.lock().values()).cloned())
    }

    async fn list_all(&self) -> Result<Vec<Booking>> {
        self.check_available()?;
        let mut all: Vec<Booking> = self.lock().values().cloned().collect();
        all.sort_by_key(|b| (b.date, b.start));
        Ok(all)
    }

    async fn delete(&self, id: BookingId) -> Result<Option<Booking>> {
        self.check_available()?;
        Ok(self.lock().remove(&id))
    }
}
