use actix_web::{error, get, web, HttpResponse, Responder};

use crate::error::AppError;

pub mod admin;
pub mod analytics;
pub mod auth;
pub mod businesses;
pub mod categories;

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "azbp-directory-service",
        "timestamp": chrono::Utc::now()
    }))
}

/// Every route of the service, mounted under `/api/v1` by the caller.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| reject_payload(err.to_string())),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| reject_payload(err.to_string())),
    )
    .service(health_check)
    // Auth
    .service(auth::register)
    .service(auth::login)
    .service(auth::logout)
    .service(auth::me)
    .service(auth::update_profile)
    .service(auth::change_password)
    // Businesses; fixed paths before `{slug}`
    .service(businesses::search_businesses)
    .service(businesses::map_businesses)
    .service(businesses::list_businesses)
    .service(businesses::create_business)
    .service(businesses::update_business)
    .service(businesses::add_business_image)
    .service(businesses::replace_business_socials)
    .service(businesses::get_business)
    // Categories
    .service(categories::list_categories)
    // Admin
    .service(admin::get_business)
    .service(admin::update_business_status)
    .service(admin::update_business_flags)
    .service(admin::analytics_dashboard)
    // Analytics
    .service(analytics::track_event);
}

fn reject_payload(message: String) -> error::Error {
    AppError::validation(format!("Invalid request: {message}")).into()
}
