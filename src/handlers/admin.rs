use actix_web::{get, patch, web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::analytics::{parse_period, DashboardWindow};
use crate::auth::{require_admin, CurrentUser};
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::lifecycle;
use crate::models::{ApiResponse, FlagUpdateRequest, StatusUpdateRequest};

#[derive(Debug, Deserialize)]
pub struct DashboardParams {
    pub period: Option<String>,
}

#[get("/admin/businesses/{business_id}")]
pub async fn get_business(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
) -> Result<HttpResponse> {
    require_admin(&user)?;
    let view = db
        .find_admin_business(&business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business not found"))?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(view)))
}

#[patch("/admin/businesses/{business_id}/status")]
pub async fn update_business_status(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
    payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse> {
    let updated =
        lifecycle::transition_status(&db, &user, &business_id, &payload.status).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[patch("/admin/businesses/{business_id}")]
pub async fn update_business_flags(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
    payload: web::Json<FlagUpdateRequest>,
) -> Result<HttpResponse> {
    let updated = lifecycle::update_flags(&db, &user, &business_id, &payload).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[get("/admin/analytics")]
pub async fn analytics_dashboard(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    params: web::Query<DashboardParams>,
) -> Result<HttpResponse> {
    require_admin(&user)?;
    let period_days = parse_period(params.period.as_deref())?;
    let window = DashboardWindow::new(Utc::now().date_naive(), period_days);

    let dashboard = db.analytics_dashboard(window).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(dashboard)))
}
