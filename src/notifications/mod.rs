//! Outbound notifications: booking emails and OTP delivery.
//!
//! API handlers never send anything directly. They queue a job on the
//! notification channel and move on; a worker spawned at startup drains
//! the channel and performs the sends. Delivery is best-effort and a
//! failed send never affects the booking that produced it.

pub mod email;
pub mod sms;

pub use email::Mailer;
pub use sms::SmsSender;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::tickets::TicketDocument;

/// A queued delivery. Jobs carry owned data so the worker never reads
/// back rows that may have changed since the triggering request.
#[derive(Debug, Clone)]
pub enum NotificationJob {
    BookingConfirmed {
        email: String,
        name: String,
        ticket: TicketDocument,
    },
    BookingCancelled {
        email: String,
        name: String,
        reference: String,
        train_name: String,
    },
    Otp {
        email: String,
        mobile: String,
        name: String,
        code: String,
    },
}

pub struct NotificationWorker {
    mailer: Arc<Mailer>,
    sms: Arc<SmsSender>,
    otp_ttl_minutes: i64,
    rx: mpsc::Receiver<NotificationJob>,
}

impl NotificationWorker {
    pub fn new(config: &Config, rx: mpsc::Receiver<NotificationJob>) -> Result<Self> {
        Ok(Self {
            mailer: Arc::new(Mailer::new(config.email.clone())),
            sms: Arc::new(SmsSender::new(&config.sms)?),
            otp_ttl_minutes: config.auth.otp_ttl_minutes,
            rx,
        })
    }

    pub async fn run(mut self) {
        tracing::info!("Notification worker started");

        while let Some(job) = self.rx.recv().await {
            let mailer = self.mailer.clone();
            let sms = self.sms.clone();
            let otp_ttl_minutes = self.otp_ttl_minutes;

            tokio::spawn(async move {
                if let Err(e) = deliver(&mailer, &sms, otp_ttl_minutes, job).await {
                    tracing::warn!(error = %e, "Notification delivery failed");
                }
            });
        }

        tracing::info!("Notification worker stopped");
    }
}

async fn deliver(
    mailer: &Mailer,
    sms: &SmsSender,
    otp_ttl_minutes: i64,
    job: NotificationJob,
) -> Result<()> {
    match job {
        NotificationJob::BookingConfirmed {
            email,
            name,
            ticket,
        } => mailer.send_booking_confirmation(&email, &name, &ticket).await,
        NotificationJob::BookingCancelled {
            email,
            name,
            reference,
            train_name,
        } => {
            mailer
                .send_cancellation(&email, &name, &reference, &train_name)
                .await
        }
        NotificationJob::Otp {
            email,
            mobile,
            name,
            code,
        } => {
            // The email and SMS legs fail independently; a dead SMTP host
            // must not keep the text message from going out.
            if let Err(e) = mailer.send_otp(&email, &name, &code, otp_ttl_minutes).await {
                tracing::warn!(error = %e, email = %email, "OTP email failed");
            }
            sms.send_otp(&mobile, &name, &code, otp_ttl_minutes).await
        }
    }
}
