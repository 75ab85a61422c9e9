use actix_web::{get, web, HttpResponse};

use crate::database::Database;
use crate::error::Result;
use crate::models::ApiResponse;

#[get("/categories")]
pub async fn list_categories(db: web::Data<Database>) -> Result<HttpResponse> {
    let categories = db.list_categories().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(categories)))
}
