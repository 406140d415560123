//! Transactional email over SMTP: booking confirmations with the ticket
//! attached, cancellation notices, and OTP codes.

use anyhow::Result;
use chrono::DateTime;
use lettre::{
    message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::EmailConfig;
use crate::tickets::TicketDocument;

pub struct Mailer {
    config: EmailConfig,
}

impl Mailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Send the booking confirmation with the e-ticket attached as JSON.
    pub async fn send_booking_confirmation(
        &self,
        to_email: &str,
        name: &str,
        ticket: &TicketDocument,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!(
                "Email not configured, skipping booking confirmation to {}",
                to_email
            );
            return Ok(());
        }

        let subject = format!("Booking Confirmation - {}", ticket.train.train_name);
        let html_body = render_confirmation_html(name, ticket);
        let text_body = render_confirmation_text(name, ticket);

        let attachment = Attachment::new(ticket.filename())
            .body(ticket.to_bytes()?, ContentType::parse("application/json")?);

        let body = MultiPart::mixed()
            .multipart(alternative(text_body, html_body))
            .singlepart(attachment);

        self.send(to_email, &subject, body).await
    }

    /// Confirm a cancellation back to the passenger.
    pub async fn send_cancellation(
        &self,
        to_email: &str,
        name: &str,
        reference: &str,
        train_name: &str,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!(
                "Email not configured, skipping cancellation notice to {}",
                to_email
            );
            return Ok(());
        }

        let subject = format!("Booking Cancelled - {}", reference);
        let html_body = render_cancellation_html(name, reference, train_name);
        let text_body = render_cancellation_text(name, reference, train_name);

        self.send(to_email, &subject, alternative(text_body, html_body))
            .await
    }

    pub async fn send_otp(
        &self,
        to_email: &str,
        name: &str,
        code: &str,
        ttl_minutes: i64,
    ) -> Result<()> {
        if !self.is_enabled() {
            tracing::warn!("Email not configured, skipping OTP email to {}", to_email);
            return Ok(());
        }

        let subject = "Your OTP for Railbook";
        let html_body = render_otp_html(name, code, ttl_minutes);
        let text_body = render_otp_text(name, code, ttl_minutes);

        self.send(to_email, subject, alternative(text_body, html_body))
            .await
    }

    async fn send(&self, to_email: &str, subject: &str, body: MultiPart) -> Result<()> {
        // Build the from mailbox with name
        let from_mailbox = format!("{} <{}>", self.config.from_name, self.config.from_address);
        let from: Mailbox = from_mailbox.parse()?;
        let to: Mailbox = to_email.parse()?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(body)?;

        // Build SMTP transport
        let mailer = if self.config.use_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        }
        .port(self.config.smtp_port);

        let mailer = if let (Some(username), Some(password)) =
            (&self.config.smtp_username, &self.config.smtp_password)
        {
            mailer.credentials(Credentials::new(username.clone(), password.clone()))
        } else {
            mailer
        };

        mailer.build().send(email).await?;

        tracing::info!(
            to = %to_email,
            subject = %subject,
            "Email sent successfully"
        );

        Ok(())
    }
}

fn alternative(text_body: String, html_body: String) -> MultiPart {
    MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(text_body),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html_body),
        )
}

fn render_confirmation_html(name: &str, ticket: &TicketDocument) -> String {
    let passengers_html: String = ticket
        .passengers
        .iter()
        .map(|p| format!("<li>{} (Age: {})</li>", html_escape(&p.name), p.age))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #27ae60;">Booking Confirmed!</h2>
    <p>Hello {name},</p>

    <div style="background-color: #f8f9fa; padding: 20px; border-radius: 5px; margin: 20px 0;">
        <h3>Booking Details</h3>
        <p><strong>Booking Reference:</strong> {reference}</p>
        <p><strong>Train:</strong> {train_name} ({train_number})</p>
        <p><strong>Route:</strong> {origin} to {destination}</p>
        <p><strong>Departure:</strong> {departure}</p>
        <p><strong>Arrival:</strong> {arrival}</p>
        <p><strong>Seats Booked:</strong> {seats}</p>
    </div>

    <div style="background-color: #e8f5e8; padding: 20px; border-radius: 5px; margin: 20px 0;">
        <h3>Passengers</h3>
        <ul>{passengers}</ul>
    </div>

    <div style="background-color: #fff3cd; padding: 15px; border-left: 4px solid #ffc107; margin: 20px 0;">
        <p style="margin: 0;"><strong>Your e-ticket is attached to this email.</strong></p>
        <p style="margin: 10px 0 0 0; font-size: 14px;">Keep it handy for your journey. The digital ticket or its QR code can be shown for verification.</p>
    </div>

    <p><strong>Important:</strong></p>
    <ul>
        <li>Arrive at the station at least 30 minutes before departure</li>
        <li>Carry a valid ID proof along with this ticket</li>
    </ul>

    <p>Have a safe journey!</p>

    <hr>
    <p style="color: #7f8c8d; font-size: 12px;">Railbook</p>
</body>
</html>"#,
        name = html_escape(name),
        reference = html_escape(&ticket.reference),
        train_name = html_escape(&ticket.train.train_name),
        train_number = html_escape(&ticket.train.train_number),
        origin = html_escape(&ticket.train.origin),
        destination = html_escape(&ticket.train.destination),
        departure = format_time(&ticket.train.departure_time),
        arrival = format_time(&ticket.train.arrival_time),
        seats = ticket.passengers.len(),
        passengers = passengers_html,
    )
}

fn render_confirmation_text(name: &str, ticket: &TicketDocument) -> String {
    let passengers: String = ticket
        .passengers
        .iter()
        .map(|p| format!("  - {} (Age: {})\n", p.name, p.age))
        .collect();

    format!(
        r#"Booking Confirmed!

Hello {name},

Booking Reference: {reference}
Train: {train_name} ({train_number})
Route: {origin} to {destination}
Departure: {departure}
Arrival: {arrival}
Seats Booked: {seats}

Passengers:
{passengers}
Your e-ticket is attached to this email. The digital ticket or its QR
code can be shown for verification.

Arrive at the station at least 30 minutes before departure and carry a
valid ID proof along with this ticket.

Have a safe journey!

---
Railbook"#,
        name = name,
        reference = ticket.reference,
        train_name = ticket.train.train_name,
        train_number = ticket.train.train_number,
        origin = ticket.train.origin,
        destination = ticket.train.destination,
        departure = format_time(&ticket.train.departure_time),
        arrival = format_time(&ticket.train.arrival_time),
        seats = ticket.passengers.len(),
        passengers = passengers,
    )
}

fn render_cancellation_html(name: &str, reference: &str, train_name: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #e74c3c;">Booking Cancelled</h2>
    <p>Hello {name},</p>
    <p>Your booking <strong>{reference}</strong> on <strong>{train_name}</strong> has been cancelled and the seats have been released.</p>
    <p>If you paid online, any refund will be processed to the original payment method.</p>
    <hr>
    <p style="color: #7f8c8d; font-size: 12px;">Railbook</p>
</body>
</html>"#,
        name = html_escape(name),
        reference = html_escape(reference),
        train_name = html_escape(train_name),
    )
}

fn render_cancellation_text(name: &str, reference: &str, train_name: &str) -> String {
    format!(
        r#"Booking Cancelled

Hello {name},

Your booking {reference} on {train_name} has been cancelled and the
seats have been released.

If you paid online, any refund will be processed to the original
payment method.

---
Railbook"#,
        name = name,
        reference = reference,
        train_name = train_name,
    )
}

fn render_otp_html(name: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #2c3e50;">OTP Verification</h2>
    <p>Hello {name},</p>
    <p>Your OTP for verification is:</p>
    <div style="background-color: #f8f9fa; padding: 20px; text-align: center; font-size: 24px; font-weight: bold; color: #2c3e50; border-radius: 5px;">
        {code}
    </div>
    <p>This OTP will expire in {ttl_minutes} minutes.</p>
    <p>If you didn't request this, please ignore this email.</p>
    <hr>
    <p style="color: #7f8c8d; font-size: 12px;">Railbook</p>
</body>
</html>"#,
        name = html_escape(name),
        code = html_escape(code),
        ttl_minutes = ttl_minutes,
    )
}

fn render_otp_text(name: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        r#"OTP Verification

Hello {name},

Your OTP for verification is: {code}

This OTP will expire in {ttl_minutes} minutes.

If you didn't request this, please ignore this email.

---
Railbook"#,
        name = name,
        code = code,
        ttl_minutes = ttl_minutes,
    )
}

/// Render an RFC 3339 timestamp for display, falling back to the raw
/// string when it does not parse.
fn format_time(rfc3339: &str) -> String {
    DateTime::parse_from_rfc3339(rfc3339)
        .map(|dt| dt.format("%d %b %Y, %H:%M").to_string())
        .unwrap_or_else(|_| rfc3339.to_string())
}

/// Escape HTML special characters
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Passenger, TrainSummary};

    fn sample_ticket() -> TicketDocument {
        TicketDocument {
            booking_id: "b-1".to_string(),
            reference: "TRBABC123XY".to_string(),
            train: TrainSummary {
                id: "t-1".to_string(),
                train_name: "Rajdhani Express".to_string(),
                train_number: "RAJ001".to_string(),
                origin: "New Delhi".to_string(),
                destination: "Mumbai Central".to_string(),
                departure_time: "2025-03-10T08:00:00+00:00".to_string(),
                arrival_time: "2025-03-10T20:30:00+00:00".to_string(),
                duration: "12h 30m".to_string(),
            },
            passengers: vec![
                Passenger {
                    name: "Asha Rao".to_string(),
                    age: 34,
                },
                Passenger {
                    name: "Ravi Rao".to_string(),
                    age: 36,
                },
            ],
            seat_count: 2,
            fare_class: Some("AC".to_string()),
            qr: r#"{"reference":"TRBABC123XY"}"#.to_string(),
            issued_at: "2025-03-01T10:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_format_time() {
        assert_eq!(
            format_time("2025-03-10T08:00:00+00:00"),
            "10 Mar 2025, 08:00"
        );
        assert_eq!(format_time("not a date"), "not a date");
    }

    #[test]
    fn test_render_confirmation_text() {
        let text = render_confirmation_text("Asha", &sample_ticket());
        assert!(text.contains("TRBABC123XY"));
        assert!(text.contains("Rajdhani Express"));
        assert!(text.contains("New Delhi to Mumbai Central"));
        assert!(text.contains("Asha Rao (Age: 34)"));
        assert!(text.contains("Seats Booked: 2"));
    }

    #[test]
    fn test_render_confirmation_html_escapes_names() {
        let mut ticket = sample_ticket();
        ticket.passengers[0].name = "A <b>bold</b> name".to_string();
        let html = render_confirmation_html("Asha", &ticket);
        assert!(html.contains("A &lt;b&gt;bold&lt;/b&gt; name"));
        assert!(!html.contains("<b>bold</b>"));
    }

    #[test]
    fn test_render_otp_bodies() {
        let html = render_otp_html("Asha", "482913", 10);
        assert!(html.contains("482913"));
        assert!(html.contains("10 minutes"));

        let text = render_otp_text("Asha", "482913", 10);
        assert!(text.contains("482913"));
        assert!(text.contains("10 minutes"));
    }

    #[test]
    fn test_render_cancellation_text() {
        let text = render_cancellation_text("Asha", "TRBABC123XY", "Rajdhani Express");
        assert!(text.contains("TRBABC123XY"));
        assert!(text.contains("Rajdhani Express"));
        assert!(text.contains("cancelled"));
    }
}
