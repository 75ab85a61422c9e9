use actix_web::{get, post, put, web, HttpRequest, HttpResponse};
use chrono::Utc;
use validator::Validate;

use crate::auth::{
    cleared_session_cookie, hash_password, session_cookie, session_token, start_session,
    verify_password, CurrentUser,
};
use crate::config::AppConfig;
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::models::{
    ApiResponse, AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest,
    UpdateProfileRequest,
};

#[post("/auth/register")]
pub async fn register(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    body.validate()?;

    let email = body.email.trim().to_lowercase();
    let password_hash = hash_password(&body.password)?;
    let user = db
        .create_user(&email, Some(&password_hash), body.name.trim(), Utc::now())
        .await?;
    let session = start_session(&db, &config, &user).await?;

    log::info!("User {} registered", user.id);
    Ok(HttpResponse::Created()
        .cookie(session_cookie(&session.token, &config))
        .json(ApiResponse::success(AuthResponse {
            user,
            expires_at: session.expires_at,
        })))
}

#[post("/auth/login")]
pub async fn login(
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    body.validate()?;

    let user = db
        .find_user_by_email(body.email.trim())
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let verified = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&body.password, hash));
    if !verified {
        return Err(AppError::InvalidCredentials);
    }

    let session = start_session(&db, &config, &user).await?;
    Ok(HttpResponse::Ok()
        .cookie(session_cookie(&session.token, &config))
        .json(ApiResponse::success(AuthResponse {
            user,
            expires_at: session.expires_at,
        })))
}

#[post("/auth/logout")]
pub async fn logout(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
) -> Result<HttpResponse> {
    if let Some(token) = session_token(&req) {
        db.delete_session(&token).await?;
    }

    Ok(HttpResponse::Ok()
        .cookie(cleared_session_cookie(&config))
        .json(ApiResponse::success(serde_json::json!({ "logged_out": true }))))
}

#[get("/auth/me")]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok().json(ApiResponse::success(user)))
}

#[put("/auth/profile")]
pub async fn update_profile(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    body.validate()?;

    let updated = db.update_user_name(&user.id, body.name.trim()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[put("/auth/password")]
pub async fn change_password(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse> {
    let body = payload.into_inner();
    body.validate()?;

    let Some(current_hash) = user.password_hash.as_deref() else {
        return Err(AppError::validation(
            "Cannot change password for this account",
        ));
    };
    if !verify_password(&body.current_password, current_hash) {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let new_hash = hash_password(&body.new_password)?;
    db.update_password_hash(&user.id, &new_hash).await?;

    log::info!("User {} changed their password", user.id);
    Ok(HttpResponse::Ok().json(ApiResponse::success(serde_json::json!({ "updated": true }))))
}
