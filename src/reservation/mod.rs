//! Seat-inventory reservation core.
//!
//! The ledger owns the authoritative seat counters, the coordinator wraps
//! ledger mutations and booking writes in a single transaction, and the event
//! bus fans seat changes out to subscribers after commit. Seat counters are
//! mutated nowhere else.

pub mod coordinator;
pub mod events;
pub mod ledger;

pub use coordinator::{BookingFlow, PaymentRecord, ReservationCoordinator};
pub use events::{SeatAction, SeatEventBus, SeatUpdate};
pub use ledger::SeatSnapshot;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("{0}")]
    Validation(String),

    #[error("Train not found.")]
    TrainNotFound,

    #[error("Train is not available for booking")]
    TrainNotBookable,

    #[error("Cannot book past or ongoing trains")]
    DepartureInPast,

    #[error("Selected class is not available on this train")]
    FareClassUnavailable,

    #[error("Insufficient seats available.")]
    InsufficientSeats { requested: i64, available: i64 },

    #[error("Booking not found")]
    BookingNotFound,

    #[error("Booking is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel completed booking")]
    CancelCompleted,

    #[error("Cannot cancel booking within {0} hours of departure")]
    CancellationWindowClosed(i64),

    #[error("Booking cannot be completed in its current state")]
    CompletionRejected,

    #[error("Payment has already been processed for this order")]
    PaymentAlreadyReconciled,

    #[error("booking reference collision")]
    ReferenceCollision,

    #[error(transparent)]
    Storage(#[from] sqlx::Error),
}

impl ReservationError {
    /// Whether a fresh attempt with a new transaction could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ReferenceCollision => true,
            Self::Storage(err) => storage_is_transient(err),
            _ => false,
        }
    }
}

/// SQLite reports writer contention as busy/locked; both clear on retry.
fn storage_is_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            let msg = db.message();
            msg.contains("database is locked") || msg.contains("database table is locked")
        }
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Map a booking INSERT failure onto the reservation taxonomy. The unique
/// indexes on payment columns are what makes reconciliation exactly-once.
pub(crate) fn map_insert_error(err: sqlx::Error) -> ReservationError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let msg = db.message();
            if msg.contains("payment_order_id") || msg.contains("payment_id") {
                return ReservationError::PaymentAlreadyReconciled;
            }
            if msg.contains("booking_reference") {
                return ReservationError::ReferenceCollision;
            }
        }
    }
    ReservationError::Storage(err)
}
