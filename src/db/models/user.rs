//! User, session, and profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password_hash: String,
    pub verified: i64,
    pub role: String,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<String>,
    pub reset_token: Option<String>,
    pub reset_expires_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }

    pub fn is_verified(&self) -> bool {
        self.verified != 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub verified: bool,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            mobile: user.mobile,
            verified: user.verified != 0,
            role: user.role,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        DateTime::parse_from_rfc3339(&self.expires_at)
            .map(|t| t.with_timezone(&Utc) <= Utc::now())
            .unwrap_or(true)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SavedPassenger {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub age: i64,
    pub relation: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FavoriteRoute {
    pub id: String,
    pub user_id: String,
    pub origin: String,
    pub destination: String,
    pub added_at: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub mobile: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub mobile: String,
    pub password: String,
}

/// Login and signup both answer with an OTP challenge, never a token.
#[derive(Debug, Serialize)]
pub struct OtpChallengeResponse {
    pub message: String,
    pub mobile: String,
    pub otp_required: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub mobile: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub mobile: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Booking counts shown alongside the profile.
#[derive(Debug, Serialize)]
pub struct BookingStats {
    pub total_bookings: i64,
    pub active_bookings: i64,
    pub completed_bookings: i64,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserResponse,
    pub stats: BookingStats,
}

#[derive(Debug, Deserialize)]
pub struct SavePassengerRequest {
    pub name: String,
    pub age: i64,
    #[serde(default = "default_relation")]
    pub relation: String,
}

fn default_relation() -> String {
    "Other".to_string()
}

#[derive(Debug, Deserialize)]
pub struct SaveRouteRequest {
    pub origin: String,
    pub destination: String,
}
