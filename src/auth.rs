use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use futures_util::future::LocalBoxFuture;
use rand::{distributions::Alphanumeric, Rng};

use crate::config::AppConfig;
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::models::{Session, User};

pub const SESSION_COOKIE_NAME: &str = "azbp_session";
const SESSION_TOKEN_LEN: usize = 32;

// ============================================================================
// PASSWORDS & TOKENS
// ============================================================================

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::PasswordHash(err.to_string()))
}

/// A malformed stored hash verifies as `false`.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            log::error!("Stored password hash is unreadable: {err}");
            false
        }
    }
}

pub fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

// ============================================================================
// SESSIONS & COOKIES
// ============================================================================

pub async fn start_session(db: &Database, config: &AppConfig, user: &User) -> Result<Session> {
    let now = Utc::now();
    let expires_at = now + Duration::days(config.session_ttl_days);
    db.create_session(&user.id, &generate_session_token(), expires_at, now)
        .await
}

pub fn session_cookie(token: &str, config: &AppConfig) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, token.to_string())
        .path("/")
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::days(config.session_ttl_days))
        .finish()
}

/// Expired, empty cookie that makes the browser drop the session.
pub fn cleared_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE_NAME, "")
        .path("/")
        .http_only(true)
        .secure(config.production)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::ZERO)
        .finish()
}

pub fn session_token(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

pub fn require_admin(user: &User) -> Result<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

// ============================================================================
// EXTRACTORS
// ============================================================================

/// Caller resolved from the session cookie, if any.
pub struct MaybeUser(pub Option<User>);

/// Caller resolved from the session cookie; rejects with 401 otherwise.
pub struct CurrentUser(pub User);

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let db = req.app_data::<web::Data<Database>>().cloned();
        let token = session_token(req);

        Box::pin(async move {
            let db = db.ok_or_else(|| AppError::Config("database is not registered".into()))?;
            match token {
                Some(token) => db.find_user_by_session(&token, Utc::now()).await.map(MaybeUser),
                None => Ok(MaybeUser(None)),
            }
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = MaybeUser::from_request(req, payload);
        Box::pin(async move {
            match user.await? {
                MaybeUser(Some(user)) => Ok(CurrentUser(user)),
                MaybeUser(None) => Err(AppError::Unauthorized),
            }
        })
    }
}
