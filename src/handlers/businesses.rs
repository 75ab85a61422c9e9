use actix_web::{get, post, put, web, HttpResponse};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::auth::{CurrentUser, MaybeUser};
use crate::database::Database;
use crate::error::Result;
use crate::lifecycle;
use crate::models::{
    AddImageRequest, ApiResponse, BusinessPage, BusinessSearchResults, CreateBusinessRequest,
    NewSearchLog, Pagination, ReplaceSocialsRequest, UpdateBusinessRequest,
};
use crate::query::{ListingParams, ListingQuery, SearchParams, SearchQuery};

// ============================================================================
// DIRECTORY READS
// ============================================================================

#[get("/businesses")]
pub async fn list_businesses(
    db: web::Data<Database>,
    MaybeUser(viewer): MaybeUser,
    params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
    let query = ListingQuery::resolve(&params, viewer.as_ref())?;
    let page = load_page(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

#[get("/businesses/map")]
pub async fn map_businesses(
    db: web::Data<Database>,
    MaybeUser(viewer): MaybeUser,
    params: web::Query<ListingParams>,
) -> Result<HttpResponse> {
    let query = ListingQuery::resolve(&params, viewer.as_ref())?.for_map();
    let page = load_page(&db, &query).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(page)))
}

async fn load_page(db: &Database, query: &ListingQuery) -> Result<BusinessPage> {
    let (businesses, total) = db.list_businesses(query).await?;
    Ok(BusinessPage {
        businesses,
        pagination: Pagination::new(query.page, query.limit, total),
    })
}

#[get("/businesses/search")]
pub async fn search_businesses(
    db: web::Data<Database>,
    MaybeUser(viewer): MaybeUser,
    params: web::Query<SearchParams>,
) -> Result<HttpResponse> {
    let Some(search) = SearchQuery::resolve(&params) else {
        return Ok(HttpResponse::Ok().json(ApiResponse::success(BusinessSearchResults::default())));
    };

    let businesses = db.search_businesses(&search).await?;

    let entry = NewSearchLog {
        query: params.q.as_deref().map(str::trim).map(str::to_string),
        category: search.category.clone(),
        city: search.city.clone(),
        results_count: businesses.len() as i64,
        user_id: viewer.map(|user| user.id),
    };
    if let Err(err) = db.log_search(&entry).await {
        log::warn!("Failed to log search: {err}");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(BusinessSearchResults { businesses })))
}

#[get("/businesses/{slug}")]
pub async fn get_business(
    db: web::Data<Database>,
    MaybeUser(viewer): MaybeUser,
    slug: web::Path<String>,
) -> Result<HttpResponse> {
    let detail = lifecycle::business_detail(&db, viewer.as_ref(), &slug).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(detail)))
}

// ============================================================================
// OWNER WRITES
// ============================================================================

#[post("/businesses")]
pub async fn create_business(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    payload: web::Json<CreateBusinessRequest>,
) -> Result<HttpResponse> {
    let mut rng = StdRng::from_entropy();
    let created = lifecycle::create_listing(&db, &user, payload.into_inner(), &mut rng).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(created)))
}

#[put("/businesses/{business_id}")]
pub async fn update_business(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
    payload: web::Json<UpdateBusinessRequest>,
) -> Result<HttpResponse> {
    let mut rng = StdRng::from_entropy();
    let updated =
        lifecycle::update_listing(&db, &user, &business_id, payload.into_inner(), &mut rng)
            .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(updated)))
}

#[post("/businesses/{business_id}/images")]
pub async fn add_business_image(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
    payload: web::Json<AddImageRequest>,
) -> Result<HttpResponse> {
    let image = lifecycle::add_image(&db, &user, &business_id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ApiResponse::success(image)))
}

#[put("/businesses/{business_id}/socials")]
pub async fn replace_business_socials(
    db: web::Data<Database>,
    CurrentUser(user): CurrentUser,
    business_id: web::Path<String>,
    payload: web::Json<ReplaceSocialsRequest>,
) -> Result<HttpResponse> {
    let socials =
        lifecycle::replace_socials(&db, &user, &business_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(socials)))
}
