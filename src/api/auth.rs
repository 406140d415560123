use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use subtle::ConstantTimeEq;

use crate::api::error::{ApiError, ValidationErrorBuilder};
use crate::api::validation;
use crate::config::AuthConfig;
use crate::db::{
    DbPool, LoginRequest, LoginResponse, OtpChallengeResponse, ResendOtpRequest, Session,
    SignupRequest, User, VerifyOtpRequest,
};
use crate::notifications::NotificationJob;
use crate::AppState;

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage and lookup
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generate a six digit OTP code
fn generate_otp() -> String {
    let mut rng = rand::rng();
    format!("{:06}", rng.random_range(0..1_000_000))
}

fn otp_matches(stored: &str, provided: &str) -> bool {
    let a = stored.as_bytes();
    let b = provided.as_bytes();
    a.len() == b.len() && a.ct_eq(b).unwrap_u8() == 1
}

/// Create a session row and return the raw token. Only the hash is stored.
async fn create_session(db: &DbPool, auth: &AuthConfig, user_id: &str) -> Result<String, ApiError> {
    let token = generate_token();
    let token_hash = hash_token(&token);
    let now = Utc::now();
    let expires_at = now + Duration::days(auth.session_ttl_days);

    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&token_hash)
    .bind(expires_at.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(db)
    .await?;

    Ok(token)
}

async fn queue_otp(state: &AppState, email: &str, mobile: &str, name: &str, code: String) {
    let job = NotificationJob::Otp {
        email: email.to_string(),
        mobile: mobile.to_string(),
        name: name.to_string(),
        code,
    };
    if state.notify_tx.send(job).await.is_err() {
        tracing::warn!(mobile = %mobile, "Notification channel closed, OTP not queued");
    }
}

/// Store a fresh OTP on the user and queue its delivery.
async fn issue_otp(state: &AppState, user: &User) -> Result<(), ApiError> {
    let code = generate_otp();
    let now = Utc::now();
    let expires_at = (now + Duration::minutes(state.config.auth.otp_ttl_minutes)).to_rfc3339();

    sqlx::query("UPDATE users SET otp_code = ?, otp_expires_at = ?, updated_at = ? WHERE id = ?")
        .bind(&code)
        .bind(&expires_at)
        .bind(now.to_rfc3339())
        .bind(&user.id)
        .execute(&state.db)
        .await?;

    queue_otp(state, &user.email, &user.mobile, &user.name, code).await;
    Ok(())
}

async fn find_user_by_mobile(db: &DbPool, mobile: &str) -> Result<Option<User>, ApiError> {
    let user = sqlx::query_as("SELECT * FROM users WHERE mobile = ?")
        .bind(mobile)
        .fetch_optional(db)
        .await?;
    Ok(user)
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_name(&req.name) {
        errors.add("name", e);
    }
    if let Err(e) = validation::validate_email(&req.email) {
        errors.add("email", e);
    }
    if let Err(e) = validation::validate_mobile(&req.mobile) {
        errors.add("mobile", e);
    }
    if let Err(e) = validation::validate_password(&req.password) {
        errors.add("password", e);
    }
    errors.finish()?;

    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = ? OR mobile = ?")
            .bind(&req.email)
            .bind(&req.mobile)
            .fetch_optional(&state.db)
            .await?;
    if existing.is_some() {
        return Err(ApiError::conflict(
            "User already exists with this email or mobile",
        ));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    let now = Utc::now();
    let code = generate_otp();
    let otp_expires = (now + Duration::minutes(state.config.auth.otp_ttl_minutes)).to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, mobile, password_hash, verified, role, otp_code, otp_expires_at, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 0, 'user', ?, ?, ?, ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.mobile)
    .bind(&password_hash)
    .bind(&code)
    .bind(&otp_expires)
    .bind(now.to_rfc3339())
    .bind(now.to_rfc3339())
    .execute(&state.db)
    .await
    .map_err(|e| match &e {
        // Concurrent signup with the same email or mobile loses here
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            ApiError::conflict("User already exists with this email or mobile")
        }
        _ => ApiError::from(e),
    })?;

    queue_otp(&state, &req.email, &req.mobile, &req.name, code).await;

    Ok((
        StatusCode::CREATED,
        Json(OtpChallengeResponse {
            message: "User created successfully. Please verify your mobile number.".to_string(),
            mobile: req.mobile,
            otp_required: true,
        }),
    ))
}

/// POST /api/auth/verify-otp
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_mobile(&req.mobile) {
        errors.add("mobile", e);
    }
    if let Err(e) = validation::validate_otp(&req.otp) {
        errors.add("otp", e);
    }
    errors.finish()?;

    let user = find_user_by_mobile(&state.db, &req.mobile)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    // A missing code counts as expired, same as one past its window
    let live = match (&user.otp_code, &user.otp_expires_at) {
        (Some(_), Some(expires)) => DateTime::parse_from_rfc3339(expires)
            .map(|t| t.with_timezone(&Utc) > Utc::now())
            .unwrap_or(false),
        _ => false,
    };
    if !live {
        return Err(ApiError::bad_request("OTP has expired."));
    }

    let stored = user.otp_code.as_deref().unwrap_or_default();
    if !otp_matches(stored, &req.otp) {
        return Err(ApiError::bad_request("Invalid OTP."));
    }

    sqlx::query(
        "UPDATE users SET verified = 1, otp_code = NULL, otp_expires_at = NULL, updated_at = ? WHERE id = ?",
    )
    .bind(Utc::now().to_rfc3339())
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    let token = create_session(&state.db, &state.config.auth, &user.id).await?;

    let mut user = user;
    user.verified = 1;

    Ok(Json(LoginResponse {
        message: "Mobile number verified successfully.".to_string(),
        token,
        user: user.into(),
    }))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<OtpChallengeResponse>, ApiError> {
    let mut errors = ValidationErrorBuilder::new();
    if let Err(e) = validation::validate_mobile(&req.mobile) {
        errors.add("mobile", e);
    }
    if req.password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.finish()?;

    // Same answer for an unknown mobile and a wrong password
    let user = find_user_by_mobile(&state.db, &req.mobile)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials."))?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials."));
    }

    issue_otp(&state, &user).await?;

    Ok(Json(OtpChallengeResponse {
        message: "OTP sent successfully.".to_string(),
        mobile: user.mobile,
        otp_required: true,
    }))
}

/// POST /api/auth/resend-otp
pub async fn resend_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ResendOtpRequest>,
) -> Result<Json<OtpChallengeResponse>, ApiError> {
    if req.mobile.is_empty() {
        return Err(ApiError::validation_field(
            "mobile",
            "Mobile number is required",
        ));
    }

    let user = find_user_by_mobile(&state.db, &req.mobile)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    issue_otp(&state, &user).await?;

    Ok(Json(OtpChallengeResponse {
        message: "OTP sent successfully".to_string(),
        mobile: user.mobile,
        otp_required: true,
    }))
}

/// Look up the user behind a session token. Shared by the HTTP middleware
/// and the WebSocket handshake.
pub async fn get_current_user(db: &DbPool, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);

    let session: Option<Session> = sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ?")
        .bind(&token_hash)
        .fetch_optional(db)
        .await?;
    let session =
        session.ok_or_else(|| ApiError::unauthorized("Invalid token. User not found."))?;

    if session.is_expired() {
        return Err(ApiError::unauthorized("Token has expired."));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(&session.user_id)
        .fetch_optional(db)
        .await?;
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid token. User not found."))?;

    if !user.is_verified() {
        return Err(ApiError::unauthorized(
            "Account not verified. Please verify your mobile number.",
        ));
    }

    Ok(user)
}

fn extract_token(request: &Request<Body>) -> Option<String> {
    let auth_header = request.headers().get("Authorization")?;
    let value = auth_header.to_str().ok()?;
    value.strip_prefix("Bearer ").map(|t| t.to_string())
}

/// Middleware requiring a valid session on a verified account.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(&request)
        .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided."))?;

    let user = get_current_user(&state.db, &token).await?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Middleware requiring the admin role. Runs after `auth_middleware`.
pub async fn require_admin(request: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let is_admin = request
        .extensions()
        .get::<User>()
        .map(|u| u.is_admin())
        .unwrap_or(false);

    if !is_admin {
        return Err(ApiError::forbidden(
            "Access denied. Admin privileges required.",
        ));
    }

    Ok(next.run(request).await)
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<User>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Access denied. No token provided.").into_response())
    }
}

/// Create the admin account on first start. The password is printed once
/// so a generated one is not lost.
pub async fn ensure_admin_user(db: &DbPool, auth: &AuthConfig) -> anyhow::Result<()> {
    let existing: Option<(String,)> =
        sqlx::query_as("SELECT id FROM users WHERE role = 'admin' LIMIT 1")
            .fetch_optional(db)
            .await?;
    if existing.is_some() {
        return Ok(());
    }

    let password_hash = hash_password(&auth.admin_password)
        .map_err(|e| anyhow::anyhow!("Failed to hash admin password: {}", e))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, mobile, password_hash, verified, role, created_at, updated_at)
        VALUES (?, 'Administrator', ?, ?, ?, 1, 'admin', ?, ?)
        "#,
    )
    .bind(uuid::Uuid::new_v4().to_string())
    .bind(&auth.admin_email)
    .bind(&auth.admin_mobile)
    .bind(&password_hash)
    .bind(&now)
    .bind(&now)
    .execute(db)
    .await?;

    tracing::info!(
        "Admin user created: {} (password: {})",
        auth.admin_email,
        auth.admin_password
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("secret123").unwrap();
        assert!(verify_password("secret123", &hash));
        assert!(!verify_password("secret124", &hash));
    }

    #[test]
    fn test_verify_password_rejects_garbage_hash() {
        assert!(!verify_password("secret123", "not-a-phc-string"));
    }

    #[test]
    fn test_generate_token_is_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_hash_token_is_stable() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_generate_otp_format() {
        for _ in 0..50 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_otp_matches() {
        assert!(otp_matches("123456", "123456"));
        assert!(!otp_matches("123456", "123457"));
        assert!(!otp_matches("123456", "12345"));
    }
}
