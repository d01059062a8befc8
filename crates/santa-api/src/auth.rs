use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use santa_db::Database;
use santa_db::models::{JoinOutcome, NewMember, RegisterOutcome};
use santa_engine::{Clock, EngineError};
use santa_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use santa_types::models::Role;

use crate::error::{ApiError, run_blocking};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub clock: Arc<dyn Clock + Send + Sync>,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.trim().to_string();
    if username.chars().count() < 3 || username.chars().count() > 32 {
        return Err(ApiError::BadRequest("username must be 3 to 32 characters".into()));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters".into()));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    let db_state = state.clone();
    let name = username.clone();
    run_blocking(move || {
        let db = &db_state.db;

        let event = match req.event_code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Some(db.get_event_by_code(code)?.ok_or(EngineError::NotFound)?),
            None => None,
        };
        let participant_id = Uuid::new_v4().to_string();
        let member = event.as_ref().map(|event| NewMember {
            event_id: &event.id,
            participant_id: &participant_id,
            alias: req.alias.as_deref().map(str::trim).unwrap_or_default(),
            wishlist: req.wishlist.as_deref().map(str::trim).unwrap_or_default(),
        });

        // Account and membership commit together, so a failed join leaves
        // no account behind.
        match db.register_user(&user_id.to_string(), &name, &password_hash, member.as_ref())? {
            RegisterOutcome::Registered => Ok(()),
            RegisterOutcome::UsernameTaken => Err(ApiError::Conflict("username is taken".into())),
            RegisterOutcome::NotJoined(JoinOutcome::InOtherEvent(code)) => {
                Err(ApiError::Conflict(format!("already part of event {}", code)))
            }
            RegisterOutcome::NotJoined(_) => {
                Err(ApiError::Conflict("event is locked, nobody can join".into()))
            }
        }
    })
    .await?;

    info!("User {} registered", username);

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id, &username, Role::User)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let db_state = state.clone();
    let username = req.username.trim().to_string();
    let user = run_blocking(move || Ok(db_state.db.get_user_by_username(&username)?))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash for {} is unreadable: {}", user.username, e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {}", user.id, e))?;
    let role: Role = user
        .role
        .parse()
        .map_err(|e| anyhow::anyhow!("user {}: {}", user.id, e))?;

    let token = create_token(&state.jwt_secret, state.token_ttl_days, user_id, &user.username, role)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        role,
        token,
    }))
}

/// Hash a password with Argon2id.
pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

pub fn create_token(
    secret: &str,
    ttl_days: i64,
    user_id: Uuid,
    username: &str,
    role: Role,
) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        role,
        exp: (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
