use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use rand_core::OsRng;
use tracing::{info, warn};
use uuid::Uuid;

use dishcovery_db::Database;
use dishcovery_db::models::NewUserOutcome;
use dishcovery_types::api::{AuthResponse, Claims, LoginRequest, RegisterRequest, SessionUser};

use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::images::ImageStore;
use crate::run_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub images: ImageStore,
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();

    // Validate input
    if !email.contains('@') {
        return Err(ApiError::validation("A valid email is required"));
    }
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Err(ApiError::validation("Username must be 3-32 characters"));
    }
    if req.password.len() < 6 {
        return Err(ApiError::validation("Password must be at least 6 characters"));
    }

    let user_id = Uuid::new_v4();
    let password = req.password;
    let (uid, stored_username) = (user_id.to_string(), username.clone());
    let outcome = run_db(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        db.create_user(&uid, &email, &stored_username, &password_hash)
    })
    .await?;

    match outcome {
        NewUserOutcome::Created => {}
        NewUserOutcome::EmailTaken => return Err(ApiError::Conflict("User already exists with this email")),
        NewUserOutcome::UsernameTaken => return Err(ApiError::Conflict("Username already taken")),
    }

    let token = create_token(&state.jwt_secret, user_id, false, state.token_ttl)?;
    info!("User {} registered ({})", username, user_id);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            msg: "User registered successfully".into(),
            token,
            user: SessionUser {
                id: user_id,
                username,
                admin: false,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    let user = run_db(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.id, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    if user.is_disabled {
        warn!("Login refused for disabled account {}", user.username);
        return Err(ApiError::Forbidden("Account is disabled"));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, user_id, user.admin, state.token_ttl)?;

    Ok(Json(AuthResponse {
        msg: "Login successful".into(),
        token,
        user: SessionUser {
            id: user_id,
            username: user.username,
            admin: user.admin,
        },
    }))
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    admin: bool,
    ttl: chrono::Duration,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        admin,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
