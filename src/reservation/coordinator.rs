//! Reservation transaction coordinator.
//!
//! Booking creation and cancellation run as one transaction spanning the
//! ledger counters and the bookings table. Any failure on the way to commit
//! rolls the whole unit back; the seat-change event fires only after commit.

use chrono::{Duration, Utc};
use tokio::time::sleep;
use tracing::warn;

use super::events::{SeatAction, SeatEventBus, SeatUpdate};
use super::ledger::{self, SeatSnapshot};
use super::{map_insert_error, ReservationError};
use crate::config::BookingConfig;
use crate::db::models::{generate_booking_reference, Booking, BookingStatus, Passenger, Train};
use crate::db::DbPool;

/// Payment sub-record attached to a booking created through reconciliation.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: Option<String>,
    pub paid_at: Option<String>,
}

/// How a booking enters the system: directly confirmed, or carrying a
/// verified payment from the reconciliation adapter.
#[derive(Debug, Clone)]
pub enum BookingFlow {
    Direct,
    PaymentGated(PaymentRecord),
}

#[derive(Debug, Clone)]
pub struct ReservationCoordinator {
    db: DbPool,
    events: SeatEventBus,
    max_passengers: usize,
    cancellation_cutoff_hours: i64,
    transaction_attempts: u32,
}

impl ReservationCoordinator {
    pub fn new(db: DbPool, events: SeatEventBus, config: &BookingConfig) -> Self {
        Self {
            db,
            events,
            max_passengers: config.max_passengers,
            cancellation_cutoff_hours: config.cancellation_cutoff_hours,
            transaction_attempts: config.transaction_attempts.max(1),
        }
    }

    /// Create a booking: reserve seats and persist the booking in one
    /// transaction. Transient storage contention is retried with a fresh
    /// transaction and a fresh booking reference.
    pub async fn create_booking(
        &self,
        user_id: &str,
        train_id: &str,
        passengers: &[Passenger],
        fare_class: Option<&str>,
        flow: BookingFlow,
    ) -> Result<Booking, ReservationError> {
        self.validate_passengers(passengers)?;
        let passengers_json = serde_json::to_string(passengers)
            .map_err(|e| ReservationError::Validation(format!("invalid passenger list: {e}")))?;
        let seat_count = passengers.len() as i64;

        let mut attempt = 0;
        let (booking, snapshot) = loop {
            attempt += 1;
            match self
                .try_create(user_id, train_id, &passengers_json, seat_count, fare_class, &flow)
                .await
            {
                Ok(result) => break result,
                Err(err) if err.is_transient() && attempt < self.transaction_attempts => {
                    warn!(train_id, attempt, error = %err, "reservation transaction contended, retrying");
                    sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(err) => return Err(err),
            }
        };

        self.events
            .publish(SeatUpdate::new(&snapshot, SeatAction::Booking));
        Ok(booking)
    }

    async fn try_create(
        &self,
        user_id: &str,
        train_id: &str,
        passengers_json: &str,
        seat_count: i64,
        fare_class: Option<&str>,
        flow: &BookingFlow,
    ) -> Result<(Booking, SeatSnapshot), ReservationError> {
        let mut tx = self.db.begin().await?;

        let snapshot = ledger::reserve(&mut tx, train_id, fare_class, seat_count).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let reference = generate_booking_reference();
        let now = Utc::now().to_rfc3339();

        match flow {
            BookingFlow::Direct => {
                sqlx::query(
                    r#"
                    INSERT INTO bookings
                    (id, user_id, train_id, fare_class, passengers, seat_count, status,
                     booking_reference, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, 'confirmed', ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(user_id)
                .bind(train_id)
                .bind(fare_class)
                .bind(passengers_json)
                .bind(seat_count)
                .bind(&reference)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(map_insert_error)?;
            }
            BookingFlow::PaymentGated(payment) => {
                sqlx::query(
                    r#"
                    INSERT INTO bookings
                    (id, user_id, train_id, fare_class, passengers, seat_count, status,
                     booking_reference, payment_order_id, payment_id, payment_signature,
                     payment_amount, payment_currency, payment_status, payment_method,
                     paid_at, created_at, updated_at)
                    VALUES (?, ?, ?, ?, ?, ?, 'confirmed', ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&id)
                .bind(user_id)
                .bind(train_id)
                .bind(fare_class)
                .bind(passengers_json)
                .bind(seat_count)
                .bind(&reference)
                .bind(&payment.order_id)
                .bind(&payment.payment_id)
                .bind(&payment.signature)
                .bind(payment.amount)
                .bind(&payment.currency)
                .bind(&payment.status)
                .bind(&payment.method)
                .bind(&payment.paid_at)
                .bind(&now)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(map_insert_error)?;
            }
        }

        let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(&id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok((booking, snapshot))
    }

    /// Cancel a booking and restore its seats, all-or-nothing. Rejected when
    /// the booking is not confirmed or departure is closer than the cutoff.
    pub async fn cancel_booking(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> Result<Booking, ReservationError> {
        let mut attempt = 0;
        let (booking, snapshot) = loop {
            attempt += 1;
            match self.try_cancel(booking_id, user_id).await {
                Ok(result) => break result,
                Err(err) if err.is_transient() && attempt < self.transaction_attempts => {
                    warn!(booking_id, attempt, error = %err, "cancellation transaction contended, retrying");
                    sleep(std::time::Duration::from_millis(50 * attempt as u64)).await;
                }
                Err(err) => return Err(err),
            }
        };

        self.events
            .publish(SeatUpdate::new(&snapshot, SeatAction::Cancellation));
        Ok(booking)
    }

    async fn try_cancel(
        &self,
        booking_id: &str,
        user_id: &str,
    ) -> Result<(Booking, SeatSnapshot), ReservationError> {
        let mut tx = self.db.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET status = 'cancelled', cancelled_at = ?, updated_at = ?
            WHERE id = ? AND user_id = ? AND status = 'confirmed'
            "#,
        )
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .bind(booking_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let existing: Option<Booking> =
                sqlx::query_as("SELECT * FROM bookings WHERE id = ? AND user_id = ?")
                    .bind(booking_id)
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            return Err(match existing.as_ref().map(Booking::booking_status) {
                None => ReservationError::BookingNotFound,
                Some(BookingStatus::Completed) => ReservationError::CancelCompleted,
                Some(_) => ReservationError::AlreadyCancelled,
            });
        }

        let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_one(&mut *tx)
            .await?;

        let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(&booking.train_id)
            .fetch_optional(&mut *tx)
            .await?;
        let train = train.ok_or(ReservationError::TrainNotFound)?;
        let departure = train.departure().ok_or_else(|| {
            ReservationError::Validation("train has an invalid departure time".to_string())
        })?;

        // Everything so far rolls back if the cutoff rejects the cancellation
        if departure - now < Duration::hours(self.cancellation_cutoff_hours) {
            return Err(ReservationError::CancellationWindowClosed(
                self.cancellation_cutoff_hours,
            ));
        }

        let snapshot = ledger::release(
            &mut tx,
            &booking.train_id,
            booking.fare_class.as_deref(),
            booking.seat_count,
        )
        .await?;

        tx.commit().await?;
        Ok((booking, snapshot))
    }

    /// Mark a confirmed booking completed after the journey. Seat counters
    /// are untouched; the train has already departed.
    pub async fn complete_booking(&self, booking_id: &str) -> Result<Booking, ReservationError> {
        let result = sqlx::query(
            "UPDATE bookings SET status = 'completed', updated_at = ? WHERE id = ? AND status = 'confirmed'",
        )
        .bind(Utc::now().to_rfc3339())
        .bind(booking_id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<(String,)> =
                sqlx::query_as("SELECT id FROM bookings WHERE id = ?")
                    .bind(booking_id)
                    .fetch_optional(&self.db)
                    .await?;
            return Err(match exists {
                None => ReservationError::BookingNotFound,
                Some(_) => ReservationError::CompletionRejected,
            });
        }

        let booking: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(booking_id)
            .fetch_one(&self.db)
            .await?;
        Ok(booking)
    }

    fn validate_passengers(&self, passengers: &[Passenger]) -> Result<(), ReservationError> {
        if passengers.is_empty() {
            return Err(ReservationError::Validation(
                "At least one passenger is required".to_string(),
            ));
        }
        if passengers.len() > self.max_passengers {
            return Err(ReservationError::Validation(format!(
                "A booking may include at most {} passengers",
                self.max_passengers
            )));
        }
        for passenger in passengers {
            if !(1..=120).contains(&passenger.age) {
                return Err(ReservationError::Validation(
                    "Passenger age must be between 1 and 120".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().unwrap();
        let pool = crate::db::init(dir.path()).await.unwrap();
        (dir, pool)
    }

    fn test_coordinator(pool: &DbPool) -> ReservationCoordinator {
        ReservationCoordinator::new(
            pool.clone(),
            SeatEventBus::default(),
            &BookingConfig::default(),
        )
    }

    async fn insert_user(pool: &DbPool) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, mobile, password_hash, verified, role, created_at, updated_at)
            VALUES (?, 'Test Rider', ?, ?, 'x', 1, 'user', ?, ?)
            "#,
        )
        .bind(&id)
        .bind(format!("{id}@example.com"))
        .bind(format!("+91{}", &id[..10]))
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn insert_train(pool: &DbPool, seats: i64, departs_in: Duration) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let departure = now + departs_in;
        let arrival = departure + Duration::hours(8);
        sqlx::query(
            r#"
            INSERT INTO trains
            (id, train_name, train_number, origin, destination, departure_time, arrival_time,
             total_seats, available_seats, status, amenities, version, created_at, updated_at)
            VALUES (?, 'Test Express', ?, 'Pune', 'Goa', ?, ?, ?, ?, 'active', NULL, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(format!("TST{}", &id[..5]))
        .bind(departure.to_rfc3339())
        .bind(arrival.to_rfc3339())
        .bind(seats)
        .bind(seats)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        id
    }

    async fn insert_class(
        pool: &DbPool,
        train_id: &str,
        class_type: &str,
        seats: i64,
        multiplier: f64,
    ) {
        sqlx::query(
            r#"
            INSERT INTO fare_classes (id, train_id, class_type, total_seats, available_seats, price_multiplier)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(train_id)
        .bind(class_type)
        .bind(seats)
        .bind(seats)
        .bind(multiplier)
        .execute(pool)
        .await
        .unwrap();
    }

    fn passengers(count: usize) -> Vec<Passenger> {
        (0..count)
            .map(|i| Passenger {
                name: format!("Passenger {i}"),
                age: 30,
            })
            .collect()
    }

    async fn train_row(pool: &DbPool, train_id: &str) -> Train {
        sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(train_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn class_available(pool: &DbPool, train_id: &str, class_type: &str) -> i64 {
        let (available,): (i64,) = sqlx::query_as(
            "SELECT available_seats FROM fare_classes WHERE train_id = ? AND class_type = ?",
        )
        .bind(train_id)
        .bind(class_type)
        .fetch_one(pool)
        .await
        .unwrap();
        available
    }

    #[tokio::test]
    async fn test_create_booking_decrements_seats() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 100, Duration::days(3)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(3), None, BookingFlow::Direct)
            .await
            .unwrap();

        assert_eq!(booking.status, "confirmed");
        assert_eq!(booking.seat_count, 3);
        assert!(booking.booking_reference.starts_with("TRB"));

        let row = train_row(&pool, &train).await;
        assert_eq!(row.available_seats, 97);
        assert_eq!(row.version, 1);
    }

    #[tokio::test]
    async fn test_concurrent_bookings_never_oversell() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(2)).await;
        let coordinator = test_coordinator(&pool);

        let mut tasks = Vec::new();
        for _ in 0..14 {
            let coordinator = coordinator.clone();
            let user = user.clone();
            let train = train.clone();
            tasks.push(tokio::spawn(async move {
                coordinator
                    .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
                    .await
            }));
        }

        let mut confirmed = 0;
        let mut rejected = 0;
        for result in futures::future::join_all(tasks).await {
            match result.unwrap() {
                Ok(_) => confirmed += 1,
                Err(ReservationError::InsufficientSeats { .. }) => rejected += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(confirmed, 10);
        assert_eq!(rejected, 4);
        assert_eq!(train_row(&pool, &train).await.available_seats, 0);
    }

    #[tokio::test]
    async fn test_insufficient_seats_reports_availability() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 3, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, &train, &passengers(5), None, BookingFlow::Direct)
            .await
            .unwrap_err();

        match err {
            ReservationError::InsufficientSeats {
                requested,
                available,
            } => {
                assert_eq!(requested, 5);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // A failed attempt leaves the counters untouched
        assert_eq!(train_row(&pool, &train).await.available_seats, 3);
    }

    #[tokio::test]
    async fn test_booking_rejects_unknown_train() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, "missing", &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::TrainNotFound));
    }

    #[tokio::test]
    async fn test_booking_rejects_inactive_train() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        sqlx::query("UPDATE trains SET status = 'cancelled' WHERE id = ?")
            .bind(&train)
            .execute(&pool)
            .await
            .unwrap();
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::TrainNotBookable));
    }

    #[tokio::test]
    async fn test_booking_rejects_departed_train() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::hours(-1)).await;
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::DepartureInPast));
    }

    #[tokio::test]
    async fn test_booking_rejects_unknown_fare_class() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        insert_class(&pool, &train, "AC", 4, 1.5).await;
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, &train, &passengers(1), Some("Luxury"), BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::FareClassUnavailable));

        // The train-level hold must have been rolled back with the class miss
        assert_eq!(train_row(&pool, &train).await.available_seats, 10);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_seat_hold() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let payment = PaymentRecord {
            order_id: "order_1".to_string(),
            payment_id: "pay_1".to_string(),
            signature: "sig".to_string(),
            amount: 500,
            currency: "INR".to_string(),
            status: "completed".to_string(),
            method: None,
            paid_at: None,
        };
        coordinator
            .create_booking(
                &user,
                &train,
                &passengers(2),
                None,
                BookingFlow::PaymentGated(payment.clone()),
            )
            .await
            .unwrap();
        assert_eq!(train_row(&pool, &train).await.available_seats, 8);

        // Same payment id again: the insert fails after the seats were
        // already held inside the transaction, and the rollback returns them
        let replay = PaymentRecord {
            order_id: "order_2".to_string(),
            ..payment
        };
        let err = coordinator
            .create_booking(
                &user,
                &train,
                &passengers(2),
                None,
                BookingFlow::PaymentGated(replay),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::PaymentAlreadyReconciled));

        assert_eq!(train_row(&pool, &train).await.available_seats, 8);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_cancel_restores_capacity() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(4), None, BookingFlow::Direct)
            .await
            .unwrap();
        assert_eq!(train_row(&pool, &train).await.available_seats, 6);

        let cancelled = coordinator.cancel_booking(&booking.id, &user).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert!(cancelled.cancelled_at.is_some());
        assert_eq!(train_row(&pool, &train).await.available_seats, 10);

        // A second cancellation is a conflict and must not release again
        let err = coordinator
            .cancel_booking(&booking.id, &user)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::AlreadyCancelled));
        assert_eq!(train_row(&pool, &train).await.available_seats, 10);
    }

    #[tokio::test]
    async fn test_cancel_requires_owner() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let other = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap();

        let err = coordinator
            .cancel_booking(&booking.id, &other)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::BookingNotFound));
        assert_eq!(train_row(&pool, &train).await.available_seats, 9);
    }

    #[tokio::test]
    async fn test_cancellation_window_enforced() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::minutes(90)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap();

        let err = coordinator
            .cancel_booking(&booking.id, &user)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CancellationWindowClosed(2)));

        // The rejected cancellation rolls back the status flip too
        let row: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(&booking.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(row.status, "confirmed");
        assert_eq!(train_row(&pool, &train).await.available_seats, 9);
    }

    #[tokio::test]
    async fn test_cancellation_allowed_outside_window() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::minutes(130)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap();

        let cancelled = coordinator.cancel_booking(&booking.id, &user).await.unwrap();
        assert_eq!(cancelled.status, "cancelled");
        assert_eq!(train_row(&pool, &train).await.available_seats, 10);
    }

    #[tokio::test]
    async fn test_class_sellout_and_reopen() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        insert_class(&pool, &train, "AC", 2, 1.5).await;
        insert_class(&pool, &train, "Sleeper", 8, 1.0).await;
        let coordinator = test_coordinator(&pool);

        let first = coordinator
            .create_booking(&user, &train, &passengers(2), Some("AC"), BookingFlow::Direct)
            .await
            .unwrap();
        assert_eq!(class_available(&pool, &train, "AC").await, 0);
        assert_eq!(train_row(&pool, &train).await.available_seats, 8);

        let err = coordinator
            .create_booking(&user, &train, &passengers(1), Some("AC"), BookingFlow::Direct)
            .await
            .unwrap_err();
        match err {
            ReservationError::InsufficientSeats {
                requested,
                available,
            } => {
                assert_eq!(requested, 1);
                assert_eq!(available, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        // The train-level hold from the failed attempt must be rolled back
        assert_eq!(train_row(&pool, &train).await.available_seats, 8);

        // Sleeper is unaffected by the AC sellout
        coordinator
            .create_booking(&user, &train, &passengers(1), Some("Sleeper"), BookingFlow::Direct)
            .await
            .unwrap();

        // Cancelling the AC booking reopens the class
        coordinator.cancel_booking(&first.id, &user).await.unwrap();
        assert_eq!(class_available(&pool, &train, "AC").await, 2);
        coordinator
            .create_booking(&user, &train, &passengers(1), Some("AC"), BookingFlow::Direct)
            .await
            .unwrap();
        assert_eq!(class_available(&pool, &train, "AC").await, 1);
    }

    #[tokio::test]
    async fn test_complete_booking_lifecycle() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(2), None, BookingFlow::Direct)
            .await
            .unwrap();

        let completed = coordinator.complete_booking(&booking.id).await.unwrap();
        assert_eq!(completed.status, "completed");
        // Completion never touches the counters
        assert_eq!(train_row(&pool, &train).await.available_seats, 8);

        let err = coordinator
            .cancel_booking(&booking.id, &user)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::CancelCompleted));

        let err = coordinator.complete_booking(&booking.id).await.unwrap_err();
        assert!(matches!(err, ReservationError::CompletionRejected));

        let err = coordinator.complete_booking("missing").await.unwrap_err();
        assert!(matches!(err, ReservationError::BookingNotFound));
    }

    #[tokio::test]
    async fn test_passenger_list_validated() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 100, Duration::days(1)).await;
        let coordinator = test_coordinator(&pool);

        let err = coordinator
            .create_booking(&user, &train, &[], None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));

        let err = coordinator
            .create_booking(&user, &train, &passengers(11), None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));

        let infant = vec![Passenger {
            name: "Unnamed".to_string(),
            age: 0,
        }];
        let err = coordinator
            .create_booking(&user, &train, &infant, None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));

        assert_eq!(train_row(&pool, &train).await.available_seats, 100);
    }

    #[tokio::test]
    async fn test_seat_events_follow_ledger_changes() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 10, Duration::days(1)).await;
        let events = SeatEventBus::default();
        let mut rx = events.subscribe();
        let coordinator =
            ReservationCoordinator::new(pool.clone(), events, &BookingConfig::default());

        let booking = coordinator
            .create_booking(&user, &train, &passengers(3), None, BookingFlow::Direct)
            .await
            .unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.train_id, train);
        assert_eq!(update.available_seats, 7);
        assert_eq!(update.action, SeatAction::Booking);

        coordinator.cancel_booking(&booking.id, &user).await.unwrap();
        let update = rx.recv().await.unwrap();
        assert_eq!(update.available_seats, 10);
        assert_eq!(update.action, SeatAction::Cancellation);

        // A rejected reservation publishes nothing
        coordinator
            .create_booking(&user, &train, &passengers(7), None, BookingFlow::Direct)
            .await
            .unwrap();
        rx.recv().await.unwrap();
        let err = coordinator
            .create_booking(&user, &train, &passengers(5), None, BookingFlow::Direct)
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InsufficientSeats { .. }));
        assert!(rx.try_recv().is_err());
    }
}
