mod common;

use booking_reservation::adapters::postgres::PostgresBookingRepository;
use booking_reservation::domain::booking::{Booking, OverlapQuery, UpdateFields};
use booking_reservation::domain::{IntervalContext, UpdatePlanError, ValidationError};
use booking_reservation::domain::value_objects::{BookingId, OwnerId};
use booking_reservation::ports::booking_repository::{BookingRepository, WriteOutcome};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serial_test::serial;

// これらのテストはPostgreSQLを必要とする:
//   DATABASE_URL=... cargo test --test postgres_booking_repository_test -- --ignored

/// PostgreSQLの時刻精度（マイクロ秒）に合わせて丸める
fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).expect("Invalid timestamp")
}

fn at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<Utc> {
    date.and_hms_opt(hour, minute, 0).unwrap().and_utc()
}

fn booking(owner: &str, date: NaiveDate, start: (u32, u32), end: (u32, u32)) -> Booking {
    let now = truncate_to_micros(Utc::now());
    Booking {
        id: BookingId::new(),
        owner: OwnerId::parse(owner).unwrap(),
        date,
        start: at(date, start.0, start.1),
        end: at(date, end.0, end.1),
        created_at: now,
        updated_at: now,
    }
}

fn guard_for(booking: &Booking, exclude_id: Option<BookingId>) -> OverlapQuery {
    OverlapQuery {
        owner: booking.owner.clone(),
        date: booking.date,
        start: booking.start,
        end: booking.end,
        exclude_id,
    }
}

fn dec(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, day).unwrap()
}

async fn setup() -> PostgresBookingRepository {
    let pool = common::create_test_pool().await;
    common::truncate_bookings(&pool).await;
    PostgresBookingRepository::new(pool)
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_and_find_by_id() {
    let repository = setup().await;
    let booking = booking("u1", dec(15), (14, 30), (16, 0));

    let outcome = repository
        .insert(booking.clone(), &guard_for(&booking, None))
        .await
        .expect("Failed to insert booking");
    assert_eq!(outcome, WriteOutcome::Saved(booking.clone()));

    let found = repository.find_by_id(booking.id).await.unwrap();
    assert_eq!(found, Some(booking));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_reports_conflict_without_writing() {
    let repository = setup().await;
    let existing = booking("u1", dec(15), (14, 30), (16, 0));
    repository
        .insert(existing.clone(), &guard_for(&existing, None))
        .await
        .unwrap();

    let candidate = booking("u1", dec(15), (15, 0), (15, 30));
    let outcome = repository
        .insert(candidate.clone(), &guard_for(&candidate, None))
        .await
        .unwrap();

    assert_eq!(outcome, WriteOutcome::Conflict(existing));
    assert_eq!(repository.find_by_id(candidate.id).await.unwrap(), None);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_find_overlapping_filters_by_owner_date_and_excluded_id() {
    let repository = setup().await;
    let existing = booking("u1", dec(15), (14, 30), (16, 0));
    repository
        .insert(existing.clone(), &guard_for(&existing, None))
        .await
        .unwrap();

    let overlapping = guard_for(&booking("u1", dec(15), (15, 0), (17, 0)), None);
    let touching = guard_for(&booking("u1", dec(15), (16, 0), (17, 0)), None);
    let other_owner = guard_for(&booking("u2", dec(15), (15, 0), (17, 0)), None);
    let other_date = guard_for(&booking("u1", dec(16), (15, 0), (17, 0)), None);
    let itself = guard_for(&existing, Some(existing.id));

    assert_eq!(
        repository.find_overlapping(&overlapping).await.unwrap(),
        Some(existing)
    );
    assert_eq!(repository.find_overlapping(&touching).await.unwrap(), None);
    assert_eq!(repository.find_overlapping(&other_owner).await.unwrap(), None);
    assert_eq!(repository.find_overlapping(&other_date).await.unwrap(), None);
    assert_eq!(repository.find_overlapping(&itself).await.unwrap(), None);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_returns_stored_timestamps() {
    let repository = setup().await;
    // ナノ秒を含む時刻はマイクロ秒に丸めて保存される
    let now = DateTime::from_timestamp(1_734_270_000, 123_456_789).unwrap();
    let booking = Booking {
        created_at: now,
        updated_at: now,
        ..booking("u1", dec(15), (14, 30), (16, 0))
    };

    let outcome = repository
        .insert(booking.clone(), &guard_for(&booking, None))
        .await
        .unwrap();

    let WriteOutcome::Saved(saved) = outcome else {
        panic!("expected Saved, got {outcome:?}");
    };
    assert_eq!(saved.created_at, truncate_to_micros(now));
    assert_eq!(repository.find_by_id(booking.id).await.unwrap(), Some(saved));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_update_fields_only_writes_supplied_columns() {
    let repository = setup().await;
    let existing = booking("u1", dec(15), (14, 30), (16, 0));
    repository
        .insert(existing.clone(), &guard_for(&existing, None))
        .await
        .unwrap();

    // 日付だけを変更：タイムスタンプは元のまま残る
    let fields = UpdateFields {
        date: Some(dec(21)),
        ..UpdateFields::default()
    };

    let outcome = repository
        .update_fields(existing.id, &fields)
        .await
        .unwrap();

    let WriteOutcome::Saved(updated) = outcome else {
        panic!("expected Saved, got {outcome:?}");
    };
    assert_eq!(updated.date, dec(21));
    assert_eq!(updated.start, existing.start);
    assert_eq!(updated.end, existing.end);
    assert_eq!(updated.owner, existing.owner);
    assert_eq!(updated.created_at, existing.created_at);
    assert!(updated.updated_at >= existing.updated_at);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_update_fields_conflict_and_not_found() {
    let repository = setup().await;
    let first = booking("u1", dec(15), (10, 0), (11, 0));
    let second = booking("u1", dec(15), (12, 0), (13, 0));
    for b in [&first, &second] {
        repository
            .insert(b.clone(), &guard_for(b, None))
            .await
            .unwrap();
    }

    let fields = UpdateFields {
        start_time: NaiveTime::from_hms_opt(10, 30, 0),
        ..UpdateFields::default()
    };

    let outcome = repository
        .update_fields(second.id, &fields)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::Conflict(first));
    assert_eq!(
        repository.find_by_id(second.id).await.unwrap(),
        Some(second.clone())
    );

    let outcome = repository
        .update_fields(BookingId::new(), &fields)
        .await
        .unwrap();
    assert_eq!(outcome, WriteOutcome::NotFound);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_update_fields_validates_against_stored_row() {
    let repository = setup().await;
    let existing = booking("u1", dec(20), (10, 0), (10, 30));
    repository
        .insert(existing.clone(), &guard_for(&existing, None))
        .await
        .unwrap();

    // 保存済みの終了時刻10:30より後の開始時刻
    let fields = UpdateFields {
        start_time: NaiveTime::from_hms_opt(11, 15, 0),
        ..UpdateFields::default()
    };

    let outcome = repository
        .update_fields(existing.id, &fields)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        WriteOutcome::Rejected(UpdatePlanError::Invalid(ValidationError::EndNotAfterStart(
            IntervalContext::Update
        )))
    );
    assert_eq!(
        repository.find_by_id(existing.id).await.unwrap(),
        Some(existing)
    );
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_list_all_orders_by_date_then_start() {
    let repository = setup().await;
    let late = booking("u1", dec(16), (9, 0), (10, 0));
    let afternoon = booking("u2", dec(15), (14, 0), (15, 0));
    let morning = booking("u1", dec(15), (9, 0), (10, 0));
    for b in [&late, &afternoon, &morning] {
        repository
            .insert(b.clone(), &guard_for(b, None))
            .await
            .unwrap();
    }

    let all = repository.list_all().await.unwrap();

    assert_eq!(all, vec![morning, afternoon, late]);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_delete_returns_removed_booking() {
    let repository = setup().await;
    let existing = booking("u1", dec(15), (14, 30), (16, 0));
    repository
        .insert(existing.clone(), &guard_for(&existing, None))
        .await
        .unwrap();

    assert_eq!(
        repository.delete(existing.id).await.unwrap(),
        Some(existing.clone())
    );
    assert_eq!(repository.delete(existing.id).await.unwrap(), None);
    assert_eq!(repository.find_by_id(existing.id).await.unwrap(), None);
}
