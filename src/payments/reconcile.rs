//! Payment reconciliation: order creation before payment, and turning a
//! verified payment into a confirmed booking exactly once.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::http::HttpGateway;
use super::{GatewayPayment, GatewayRefund, PaymentError, PaymentGateway};
use crate::config::PaymentConfig;
use crate::db::models::{
    generate_booking_reference, Booking, FareClass, Passenger, PaymentOrder, PaymentStatus, Train,
};
use crate::db::DbPool;
use crate::reservation::{BookingFlow, PaymentRecord, ReservationCoordinator, ReservationError};

#[derive(Debug, Serialize)]
pub struct CreateOrderOutcome {
    pub order_id: String,
    pub amount: i64,
    pub price_per_ticket: i64,
    pub class_type: String,
    pub passenger_count: i64,
    pub currency: String,
    pub receipt: String,
    pub key_id: String,
}

#[derive(Debug, Serialize)]
pub struct RefundOutcome {
    pub refund: GatewayRefund,
    pub booking_id: String,
    pub booking_reference: String,
    pub payment_status: String,
}

#[derive(Clone)]
pub struct PaymentService {
    db: DbPool,
    gateway: Arc<dyn PaymentGateway>,
    coordinator: ReservationCoordinator,
    key_id: String,
    currency: String,
}

impl PaymentService {
    pub fn new(
        db: DbPool,
        gateway: Arc<dyn PaymentGateway>,
        coordinator: ReservationCoordinator,
        key_id: String,
        currency: String,
    ) -> Self {
        Self {
            db,
            gateway,
            coordinator,
            key_id,
            currency,
        }
    }

    /// Build the service from configuration. Returns None when payment
    /// processing is disabled.
    pub fn from_config(
        config: &PaymentConfig,
        db: DbPool,
        coordinator: ReservationCoordinator,
    ) -> Result<Option<Self>> {
        if !config.enabled {
            info!("Payment processing disabled; payment endpoints will refuse requests");
            return Ok(None);
        }

        let key_id = config
            .key_id
            .clone()
            .context("payment.key_id is required when payment is enabled")?;
        let key_secret = config
            .key_secret
            .clone()
            .context("payment.key_secret is required when payment is enabled")?;

        let gateway = Arc::new(HttpGateway::new(config, key_id.clone(), key_secret)?);
        Ok(Some(Self::new(
            db,
            gateway,
            coordinator,
            key_id,
            config.currency.clone(),
        )))
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Quote a class fare and register an order with the gateway. The order
    /// context is persisted so verification does not trust the client for
    /// train, class, or amount.
    pub async fn create_order(
        &self,
        user_id: &str,
        train_id: &str,
        class_type: &str,
        passengers: &[Passenger],
    ) -> Result<CreateOrderOutcome, PaymentError> {
        if passengers.is_empty() {
            return Err(PaymentError::NoPassengers);
        }

        let train: Option<Train> = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(train_id)
            .fetch_optional(&self.db)
            .await?;
        let train = train.ok_or(ReservationError::TrainNotFound)?;

        let class: Option<FareClass> =
            sqlx::query_as("SELECT * FROM fare_classes WHERE train_id = ? AND class_type = ?")
                .bind(train_id)
                .bind(class_type)
                .fetch_optional(&self.db)
                .await?;
        let class = class.ok_or(ReservationError::FareClassUnavailable)?;

        let requested = passengers.len() as i64;
        if class.available_seats < requested {
            return Err(ReservationError::InsufficientSeats {
                requested,
                available: class.available_seats,
            }
            .into());
        }

        let price_per_ticket = train.class_price(class.price_multiplier);
        let amount = price_per_ticket * requested;
        let receipt = generate_booking_reference();

        let order = self
            .gateway
            .create_order(amount, &self.currency, &receipt)
            .await?;

        let passengers_json = serde_json::to_string(passengers).map_err(|e| {
            PaymentError::Reservation(ReservationError::Validation(format!(
                "invalid passenger list: {e}"
            )))
        })?;
        sqlx::query(
            r#"
            INSERT INTO payment_orders
            (id, user_id, train_id, fare_class, passengers, amount, currency, receipt, status, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'created', ?)
            "#,
        )
        .bind(&order.id)
        .bind(user_id)
        .bind(train_id)
        .bind(class_type)
        .bind(&passengers_json)
        .bind(amount)
        .bind(&self.currency)
        .bind(&receipt)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await?;

        Ok(CreateOrderOutcome {
            order_id: order.id,
            amount,
            price_per_ticket,
            class_type: class_type.to_string(),
            passenger_count: requested,
            currency: self.currency.clone(),
            receipt,
            key_id: self.key_id.clone(),
        })
    }

    /// Reconcile a completed payment into a confirmed booking. Availability
    /// is re-checked inside the reservation transaction; a payment already
    /// attached to a booking is rejected rather than booked twice.
    pub async fn verify_payment(
        &self,
        user_id: &str,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<Booking, PaymentError> {
        let order: Option<PaymentOrder> =
            sqlx::query_as("SELECT * FROM payment_orders WHERE id = ? AND user_id = ?")
                .bind(order_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        let order = order.ok_or(PaymentError::OrderNotFound)?;

        let reconciled: Option<(String,)> = sqlx::query_as(
            "SELECT id FROM bookings WHERE payment_order_id = ? OR payment_id = ?",
        )
        .bind(order_id)
        .bind(payment_id)
        .fetch_optional(&self.db)
        .await?;
        if reconciled.is_some() {
            return Err(ReservationError::PaymentAlreadyReconciled.into());
        }

        if !self.gateway.verify_signature(order_id, payment_id, signature) {
            return Err(PaymentError::InvalidSignature);
        }

        let payment = self.gateway.fetch_payment(payment_id).await?;
        if !payment.is_successful() {
            return Err(PaymentError::NotCaptured);
        }

        let record = PaymentRecord {
            order_id: order_id.to_string(),
            payment_id: payment_id.to_string(),
            signature: signature.to_string(),
            amount: order.amount,
            currency: payment.currency.clone(),
            status: PaymentStatus::Completed.to_string(),
            method: payment.method.clone(),
            paid_at: DateTime::from_timestamp(payment.created_at, 0).map(|dt| dt.to_rfc3339()),
        };

        let passengers = order.passenger_list();
        let booking = self
            .coordinator
            .create_booking(
                user_id,
                &order.train_id,
                &passengers,
                order.fare_class.as_deref(),
                BookingFlow::PaymentGated(record),
            )
            .await?;

        if let Err(err) = sqlx::query("UPDATE payment_orders SET status = 'paid' WHERE id = ?")
            .bind(order_id)
            .execute(&self.db)
            .await
        {
            warn!(order_id, error = %err, "failed to mark payment order as paid");
        }

        Ok(booking)
    }

    pub async fn payment_status(&self, payment_id: &str) -> Result<GatewayPayment, PaymentError> {
        self.gateway
            .fetch_payment(payment_id)
            .await
            .map_err(|_| PaymentError::PaymentNotFound)
    }

    /// Refund a cancelled booking's payment, once.
    pub async fn refund(
        &self,
        user_id: &str,
        booking_id: &str,
    ) -> Result<RefundOutcome, PaymentError> {
        let booking: Option<Booking> =
            sqlx::query_as("SELECT * FROM bookings WHERE id = ? AND user_id = ?")
                .bind(booking_id)
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        let booking = booking.ok_or(ReservationError::BookingNotFound)?;

        if booking.status != "cancelled" {
            return Err(PaymentError::NotRefundable);
        }
        let refunded = PaymentStatus::Refunded.to_string();
        if booking.payment_status.as_deref() == Some(refunded.as_str()) {
            return Err(PaymentError::AlreadyRefunded);
        }
        let payment_id = booking.payment_id.clone().ok_or(PaymentError::NoPayment)?;
        let amount = booking.payment_amount.ok_or(PaymentError::NoPayment)?;

        let refund = self.gateway.refund(&payment_id, amount).await?;

        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET payment_status = ?, refund_id = ?, updated_at = ?
            WHERE id = ? AND payment_status != ?
            "#,
        )
        .bind(&refunded)
        .bind(&refund.id)
        .bind(Utc::now().to_rfc3339())
        .bind(booking_id)
        .bind(&refunded)
        .execute(&self.db)
        .await?;
        if result.rows_affected() == 0 {
            return Err(PaymentError::AlreadyRefunded);
        }

        Ok(RefundOutcome {
            refund,
            booking_id: booking.id,
            booking_reference: booking.booking_reference,
            payment_status: refunded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BookingConfig;
    use crate::payments::GatewayOrder;
    use crate::reservation::SeatEventBus;
    use async_trait::async_trait;

    /// Gateway double with deterministic signatures; payments come back in
    /// whatever status the test constructs it with.
    struct MockGateway {
        payment_status: String,
    }

    impl MockGateway {
        fn captured() -> Arc<Self> {
            Arc::new(Self {
                payment_status: "captured".to_string(),
            })
        }

        fn failed() -> Arc<Self> {
            Arc::new(Self {
                payment_status: "failed".to_string(),
            })
        }

        fn signature_for(order_id: &str, payment_id: &str) -> String {
            format!("sig:{order_id}|{payment_id}")
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_order(
            &self,
            amount: i64,
            currency: &str,
            receipt: &str,
        ) -> Result<GatewayOrder> {
            Ok(GatewayOrder {
                id: format!("order_{}", uuid::Uuid::new_v4().simple()),
                amount: amount * 100,
                currency: currency.to_string(),
                receipt: receipt.to_string(),
                status: "created".to_string(),
            })
        }

        fn verify_signature(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
            signature == Self::signature_for(order_id, payment_id)
        }

        async fn fetch_payment(&self, payment_id: &str) -> Result<GatewayPayment> {
            Ok(GatewayPayment {
                id: payment_id.to_string(),
                status: self.payment_status.clone(),
                amount: 0,
                currency: "INR".to_string(),
                method: Some("card".to_string()),
                created_at: Utc::now().timestamp(),
            })
        }

        async fn refund(&self, payment_id: &str, amount: i64) -> Result<GatewayRefund> {
            Ok(GatewayRefund {
                id: format!("rfnd_{}", uuid::Uuid::new_v4().simple()),
                payment_id: payment_id.to_string(),
                amount: amount * 100,
                status: "processed".to_string(),
            })
        }
    }

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

    fn test_service(pool: &DbPool, gateway: Arc<dyn PaymentGateway>) -> PaymentService {
        PaymentService::new(
            pool.clone(),
            gateway,
            test_coordinator(pool),
            "key_test".to_string(),
            "INR".to_string(),
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

    async fn insert_train(pool: &DbPool, seats: i64) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let departure = now + chrono::Duration::days(2);
        let arrival = departure + chrono::Duration::hours(8);
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

    async fn booking_count(pool: &DbPool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM bookings")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_create_order_quotes_class_fare() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 100).await;
        insert_class(&pool, &train, "AC", 20, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let outcome = service
            .create_order(&user, &train, "AC", &passengers(2))
            .await
            .unwrap();

        let row: Train = sqlx::query_as("SELECT * FROM trains WHERE id = ?")
            .bind(&train)
            .fetch_one(&pool)
            .await
            .unwrap();
        let expected = row.class_price(1.5);
        assert_eq!(outcome.price_per_ticket, expected);
        assert_eq!(outcome.amount, expected * 2);
        assert_eq!(outcome.passenger_count, 2);
        assert_eq!(outcome.currency, "INR");
        assert_eq!(outcome.key_id, "key_test");

        // The order context is persisted for verification
        let order: PaymentOrder = sqlx::query_as("SELECT * FROM payment_orders WHERE id = ?")
            .bind(&outcome.order_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(order.status, "created");
        assert_eq!(order.train_id, train);
        assert_eq!(order.fare_class.as_deref(), Some("AC"));
        assert_eq!(order.amount, outcome.amount);

        // Creating an order holds no seats
        assert_eq!(class_available(&pool, &train, "AC").await, 20);
    }

    #[tokio::test]
    async fn test_create_order_validates_inputs() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 100).await;
        insert_class(&pool, &train, "AC", 2, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let err = service
            .create_order(&user, &train, "AC", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NoPassengers));

        let err = service
            .create_order(&user, "missing", "AC", &passengers(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Reservation(ReservationError::TrainNotFound)
        ));

        let err = service
            .create_order(&user, &train, "Luxury", &passengers(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Reservation(ReservationError::FareClassUnavailable)
        ));

        let err = service
            .create_order(&user, &train, "AC", &passengers(3))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Reservation(ReservationError::InsufficientSeats { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_payment_confirms_booking_once() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "Sleeper", 30, 1.0).await;
        let service = test_service(&pool, MockGateway::captured());

        let order = service
            .create_order(&user, &train, "Sleeper", &passengers(2))
            .await
            .unwrap();
        let signature = MockGateway::signature_for(&order.order_id, "pay_1");

        let booking = service
            .verify_payment(&user, &order.order_id, "pay_1", &signature)
            .await
            .unwrap();

        assert_eq!(booking.status, "confirmed");
        assert_eq!(
            booking.payment_order_id.as_deref(),
            Some(order.order_id.as_str())
        );
        assert_eq!(booking.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(booking.payment_status.as_deref(), Some("completed"));
        assert_eq!(booking.payment_amount, Some(order.amount));
        assert_eq!(class_available(&pool, &train, "Sleeper").await, 28);

        // Replaying the callback must not book twice or move the counters
        let err = service
            .verify_payment(&user, &order.order_id, "pay_1", &signature)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Reservation(ReservationError::PaymentAlreadyReconciled)
        ));
        assert_eq!(booking_count(&pool).await, 1);
        assert_eq!(class_available(&pool, &train, "Sleeper").await, 28);

        let order_row: PaymentOrder = sqlx::query_as("SELECT * FROM payment_orders WHERE id = ?")
            .bind(&order.order_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(order_row.status, "paid");
    }

    #[tokio::test]
    async fn test_verify_rejects_invalid_signature() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "AC", 10, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let order = service
            .create_order(&user, &train, "AC", &passengers(1))
            .await
            .unwrap();

        let err = service
            .verify_payment(&user, &order.order_id, "pay_1", "forged")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature));
        assert_eq!(booking_count(&pool).await, 0);
        assert_eq!(class_available(&pool, &train, "AC").await, 10);
    }

    #[tokio::test]
    async fn test_verify_rejects_uncaptured_payment() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "AC", 10, 1.5).await;
        let service = test_service(&pool, MockGateway::failed());

        let order = service
            .create_order(&user, &train, "AC", &passengers(1))
            .await
            .unwrap();
        let signature = MockGateway::signature_for(&order.order_id, "pay_1");

        let err = service
            .verify_payment(&user, &order.order_id, "pay_1", &signature)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::NotCaptured));
        assert_eq!(booking_count(&pool).await, 0);
    }

    #[tokio::test]
    async fn test_verify_requires_matching_order_owner() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let stranger = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "AC", 10, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let err = service
            .verify_payment(&user, "order_missing", "pay_1", "sig")
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::OrderNotFound));

        let order = service
            .create_order(&user, &train, "AC", &passengers(1))
            .await
            .unwrap();
        let signature = MockGateway::signature_for(&order.order_id, "pay_1");
        let err = service
            .verify_payment(&stranger, &order.order_id, "pay_1", &signature)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::OrderNotFound));
    }

    #[tokio::test]
    async fn test_order_holds_no_seats_until_verified() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let rival = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "AC", 2, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let order = service
            .create_order(&user, &train, "AC", &passengers(2))
            .await
            .unwrap();

        // Someone else books the last AC seats while the payment is pending
        test_coordinator(&pool)
            .create_booking(
                &rival,
                &train,
                &passengers(2),
                Some("AC"),
                BookingFlow::Direct,
            )
            .await
            .unwrap();

        let signature = MockGateway::signature_for(&order.order_id, "pay_9");
        let err = service
            .verify_payment(&user, &order.order_id, "pay_9", &signature)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PaymentError::Reservation(ReservationError::InsufficientSeats { .. })
        ));
        assert_eq!(booking_count(&pool).await, 1);
    }

    #[tokio::test]
    async fn test_refund_requires_cancellation() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        insert_class(&pool, &train, "AC", 10, 1.5).await;
        let service = test_service(&pool, MockGateway::captured());

        let order = service
            .create_order(&user, &train, "AC", &passengers(1))
            .await
            .unwrap();
        let signature = MockGateway::signature_for(&order.order_id, "pay_1");
        let booking = service
            .verify_payment(&user, &order.order_id, "pay_1", &signature)
            .await
            .unwrap();

        let err = service.refund(&user, &booking.id).await.unwrap_err();
        assert!(matches!(err, PaymentError::NotRefundable));

        test_coordinator(&pool)
            .cancel_booking(&booking.id, &user)
            .await
            .unwrap();

        let outcome = service.refund(&user, &booking.id).await.unwrap();
        assert_eq!(outcome.payment_status, "refunded");
        assert_eq!(outcome.refund.payment_id, "pay_1");
        assert_eq!(outcome.booking_reference, booking.booking_reference);

        let refreshed: Booking = sqlx::query_as("SELECT * FROM bookings WHERE id = ?")
            .bind(&booking.id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(refreshed.payment_status.as_deref(), Some("refunded"));
        assert!(refreshed.refund_id.is_some());

        let err = service.refund(&user, &booking.id).await.unwrap_err();
        assert!(matches!(err, PaymentError::AlreadyRefunded));
    }

    #[tokio::test]
    async fn test_refund_requires_payment() {
        let (_dir, pool) = test_pool().await;
        let user = insert_user(&pool).await;
        let train = insert_train(&pool, 50).await;
        let service = test_service(&pool, MockGateway::captured());
        let coordinator = test_coordinator(&pool);

        let booking = coordinator
            .create_booking(&user, &train, &passengers(1), None, BookingFlow::Direct)
            .await
            .unwrap();
        coordinator.cancel_booking(&booking.id, &user).await.unwrap();

        let err = service.refund(&user, &booking.id).await.unwrap_err();
        assert!(matches!(err, PaymentError::NoPayment));
    }
}
