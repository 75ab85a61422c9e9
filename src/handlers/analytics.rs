use actix_web::{http::header, post, web, HttpRequest, HttpResponse};
use chrono::Utc;

use crate::analytics::{build_event, client_ip, hash_ip, record_event, EventContext};
use crate::auth::MaybeUser;
use crate::config::AppConfig;
use crate::database::Database;
use crate::error::Result;
use crate::models::{ApiResponse, TrackEventRequest, TrackedEvent};

/// Records a client event. Storage problems are swallowed and reported as
/// `recorded: false`; only a bad event type is rejected.
#[post("/analytics/track")]
pub async fn track_event(
    req: HttpRequest,
    db: web::Data<Database>,
    config: web::Data<AppConfig>,
    MaybeUser(viewer): MaybeUser,
    payload: web::Json<TrackEventRequest>,
) -> Result<HttpResponse> {
    let context = EventContext {
        user_id: viewer.map(|user| user.id),
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ip_hash: client_ip(&req).map(|ip| hash_ip(&ip, &config.analytics_salt)),
    };

    let event = build_event(payload.into_inner(), context, Utc::now())?;
    let recorded = record_event(&db, &event).await;

    Ok(HttpResponse::Ok().json(ApiResponse::success(TrackedEvent { recorded })))
}
