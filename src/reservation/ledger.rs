//! Inventory ledger: atomic seat check-and-decrement / increment.
//!
//! All operations take a live connection so the coordinator can run them
//! inside its transaction. Availability is gated by conditional UPDATEs whose
//! affected-row count decides the outcome; no interleaving of two callers can
//! act on a stale count. When a conditional update matches nothing, a
//! follow-up read picks the precise error to surface.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::warn;

use super::ReservationError;
use crate::db::models::{occupancy, FareClass, Train};

/// Train-level seat counters after a ledger mutation.
#[derive(Debug, Clone)]
pub struct SeatSnapshot {
    pub train_id: String,
    pub available_seats: i64,
    pub total_seats: i64,
}

impl SeatSnapshot {
    pub fn occupancy_percentage(&self) -> f64 {
        occupancy(self.total_seats, self.available_seats)
    }
}

/// Reserve `count` seats on a train, and on one of its fare classes when a
/// class is specified. Both counters move in the caller's transaction, so a
/// later abort restores them together.
pub async fn reserve(
    conn: &mut SqliteConnection,
    train_id: &str,
    fare_class: Option<&str>,
    count: i64,
) -> Result<SeatSnapshot, ReservationError> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE trains
        SET available_seats = available_seats - ?, version = version + 1, updated_at = ?
        WHERE id = ? AND status = 'active' AND departure_time > ? AND available_seats >= ?
        "#,
    )
    .bind(count)
    .bind(&now)
    .bind(train_id)
    .bind(&now)
    .bind(count)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(diagnose_reserve_failure(conn, train_id, count).await?);
    }

    if let Some(class_type) = fare_class {
        let result = sqlx::query(
            r#"
            UPDATE fare_classes
            SET available_seats = available_seats - ?
            WHERE train_id = ? AND class_type = ? AND available_seats >= ?
            "#,
        )
        .bind(count)
        .bind(train_id)
        .bind(class_type)
        .bind(count)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(diagnose_class_failure(conn, train_id, class_type, count).await?);
        }
    }

    snapshot(conn, train_id).await
}

/// Restore `count` seats. Counters never exceed `total_seats`: a release that
/// would overshoot means the paired reserve is unaccounted for, so the value
/// is clamped and the inconsistency logged.
pub async fn release(
    conn: &mut SqliteConnection,
    train_id: &str,
    fare_class: Option<&str>,
    count: i64,
) -> Result<SeatSnapshot, ReservationError> {
    let now = Utc::now().to_rfc3339();

    let result = sqlx::query(
        r#"
        UPDATE trains
        SET available_seats = available_seats + ?, version = version + 1, updated_at = ?
        WHERE id = ? AND available_seats + ? <= total_seats
        "#,
    )
    .bind(count)
    .bind(&now)
    .bind(train_id)
    .bind(count)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(train_id)
            .fetch_optional(&mut *conn)
            .await?;
        let train = train.ok_or(ReservationError::TrainNotFound)?;

        warn!(
            train_id,
            count,
            available = train.available_seats,
            total = train.total_seats,
            "seat release exceeds train capacity, clamping to total"
        );
        sqlx::query(
            "UPDATE trains SET available_seats = total_seats, version = version + 1, updated_at = ? WHERE id = ?",
        )
        .bind(&now)
        .bind(train_id)
        .execute(&mut *conn)
        .await?;
    }

    if let Some(class_type) = fare_class {
        let result = sqlx::query(
            r#"
            UPDATE fare_classes
            SET available_seats = available_seats + ?
            WHERE train_id = ? AND class_type = ? AND available_seats + ? <= total_seats
            "#,
        )
        .bind(count)
        .bind(train_id)
        .bind(class_type)
        .bind(count)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let class: Option<FareClass> = sqlx::query_as(
                "SELECT * FROM fare_classes WHERE train_id = ? AND class_type = ?",
            )
            .bind(train_id)
            .bind(class_type)
            .fetch_optional(&mut *conn)
            .await?;

            match class {
                Some(class) => {
                    warn!(
                        train_id,
                        class_type,
                        count,
                        available = class.available_seats,
                        total = class.total_seats,
                        "seat release exceeds class capacity, clamping to total"
                    );
                    sqlx::query(
                        "UPDATE fare_classes SET available_seats = total_seats WHERE id = ?",
                    )
                    .bind(&class.id)
                    .execute(&mut *conn)
                    .await?;
                }
                None => {
                    warn!(
                        train_id,
                        class_type, "fare class missing on seat release, skipping class counter"
                    );
                }
            }
        }
    }

    snapshot(conn, train_id).await
}

async fn snapshot(
    conn: &mut SqliteConnection,
    train_id: &str,
) -> Result<SeatSnapshot, ReservationError> {
    let row: (i64, i64) =
        sqlx::query_as("SELECT available_seats, total_seats FROM trains WHERE id = ?")
            .bind(train_id)
            .fetch_one(&mut *conn)
            .await?;

    Ok(SeatSnapshot {
        train_id: train_id.to_string(),
        available_seats: row.0,
        total_seats: row.1,
    })
}

async fn diagnose_reserve_failure(
    conn: &mut SqliteConnection,
    train_id: &str,
    count: i64,
) -> Result<ReservationError, ReservationError> {
    let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
        .bind(train_id)
        .fetch_optional(&mut *conn)
        .await?;

    let train = match train {
        Some(train) => train,
        None => return Ok(ReservationError::TrainNotFound),
    };

    if train.status != "active" {
        return Ok(ReservationError::TrainNotBookable);
    }
    match train.departure() {
        Some(dep) if dep > Utc::now() => {}
        _ => return Ok(ReservationError::DepartureInPast),
    }

    Ok(ReservationError::InsufficientSeats {
        requested: count,
        available: train.available_seats,
    })
}

async fn diagnose_class_failure(
    conn: &mut SqliteConnection,
    train_id: &str,
    class_type: &str,
    count: i64,
) -> Result<ReservationError, ReservationError> {
    let class: Option<FareClass> =
        sqlx::query_as("SELECT * FROM fare_classes WHERE train_id = ? AND class_type = ?")
            .bind(train_id)
            .bind(class_type)
            .fetch_optional(&mut *conn)
            .await?;

    match class {
        Some(class) => Ok(ReservationError::InsufficientSeats {
            requested: count,
            available: class.available_seats,
        }),
        None => Ok(ReservationError::FareClassUnavailable),
    }
}
