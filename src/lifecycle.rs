//! Listing creation, owner edits and moderation.

use chrono::Utc;
use rand::Rng;
use serde_json::Value;
use validator::Validate;

use crate::auth::require_admin;
use crate::database::Database;
use crate::error::{AppError, Result};
use crate::geo::resolve_coordinates;
use crate::models::{
    AddImageRequest, Business, BusinessDetail, BusinessImage, BusinessSocial, BusinessStatus,
    BusinessTier, CreateBusinessRequest, CreatedBusiness, FlagChanges, FlagUpdateRequest,
    NewBusiness, ReplaceSocialsRequest, UpdateBusinessRequest, User,
};
use crate::slug::{slugify, with_random_suffix};

const DEFAULT_STATE: &str = "AZ";
const MAX_SLUG_ATTEMPTS: usize = 5;

// ===== CREATION =====

/// Creates a `pending` listing owned by `owner`.
///
/// The slug comes from the name; when taken, a random suffix is appended
/// and the insert retried. Missing coordinates are placed near the city.
pub async fn create_listing<R: Rng + ?Sized>(
    db: &Database,
    owner: &User,
    request: CreateBusinessRequest,
    rng: &mut R,
) -> Result<CreatedBusiness> {
    let request = request.normalized();
    request.validate()?;

    let coordinates = resolve_coordinates(&request.city, request.latitude, request.longitude, rng);
    let base_slug = slugify(&request.name);

    let mut slug = if db.slug_exists(&base_slug).await? {
        with_random_suffix(&base_slug, rng)
    } else {
        base_slug.clone()
    };

    let mut business = NewBusiness {
        id: uuid::Uuid::new_v4().to_string(),
        owner_id: owner.id.clone(),
        name: request.name,
        slug: String::new(),
        description: request.description,
        short_description: request.short_description,
        email: request.email,
        phone: request.phone,
        website: request.website,
        address_line1: request.address_line1,
        address_line2: request.address_line2,
        city: request.city,
        state: request.state.unwrap_or_else(|| DEFAULT_STATE.to_string()),
        zip_code: request.zip_code,
        latitude: coordinates.latitude,
        longitude: coordinates.longitude,
        year_established: request.year_established,
        employee_count: request.employee_count,
        hours_json: request.hours_json,
        category_ids: dedup_preserving_order(request.category_ids),
        created_at: Utc::now(),
    };

    for _ in 0..MAX_SLUG_ATTEMPTS {
        business.slug = slug.clone();
        match db.create_business(&business).await {
            Ok(created) => {
                log::info!(
                    "Business {} ({}) submitted by {}",
                    created.id,
                    created.slug,
                    owner.id
                );
                return Ok(CreatedBusiness {
                    id: created.id,
                    slug: created.slug,
                    status: created.status,
                });
            }
            Err(err) if err.is_unique_violation() => {
                log::warn!("Slug {slug} already taken, retrying with a new suffix");
                slug = with_random_suffix(&base_slug, rng);
            }
            Err(err) => return Err(err),
        }
    }

    Err(AppError::Conflict(
        "Could not allocate a unique slug for this business".into(),
    ))
}

fn dedup_preserving_order(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

// ===== OWNER EDITS =====

/// Strangers get `Forbidden` only for approved listings; any other status
/// answers `NotFound`, the same as a missing id.
fn ensure_can_manage(actor: &User, business: &Business) -> Result<()> {
    if actor.is_admin() || business.owner_id == actor.id {
        Ok(())
    } else if business.status == BusinessStatus::Approved {
        Err(AppError::Forbidden)
    } else {
        Err(AppError::not_found("Business not found"))
    }
}

async fn load_managed(db: &Database, actor: &User, business_id: &str) -> Result<Business> {
    let business = db
        .find_business_by_id(business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business not found"))?;
    ensure_can_manage(actor, &business)?;
    Ok(business)
}

/// Edits text and contact fields. Status, flags and slug stay unchanged.
///
/// Moving to another city without new coordinates places the listing near
/// the new city, like at creation.
pub async fn update_listing<R: Rng + ?Sized>(
    db: &Database,
    actor: &User,
    business_id: &str,
    request: UpdateBusinessRequest,
    rng: &mut R,
) -> Result<Business> {
    let request = request.normalized();
    request.validate()?;
    let current = load_managed(db, actor, business_id).await?;

    let mut changes = request.into_changes();
    if let Some(ids) = changes.category_ids.take() {
        changes.category_ids = Some(dedup_preserving_order(ids));
    }

    let moved_city = changes
        .city
        .as_deref()
        .filter(|city| !city.eq_ignore_ascii_case(&current.city));
    if let Some(city) = moved_city {
        if changes.latitude.is_none() || changes.longitude.is_none() {
            let coordinates =
                resolve_coordinates(city, changes.latitude, changes.longitude, rng);
            changes.latitude = Some(coordinates.latitude);
            changes.longitude = Some(coordinates.longitude);
        }
    }

    db.update_business(business_id, changes, Utc::now()).await
}

pub async fn add_image(
    db: &Database,
    actor: &User,
    business_id: &str,
    request: AddImageRequest,
) -> Result<BusinessImage> {
    request.validate()?;
    load_managed(db, actor, business_id).await?;
    db.add_business_image(business_id, &request).await
}

pub async fn replace_socials(
    db: &Database,
    actor: &User,
    business_id: &str,
    request: ReplaceSocialsRequest,
) -> Result<Vec<BusinessSocial>> {
    request.validate()?;
    load_managed(db, actor, business_id).await?;
    db.replace_business_socials(business_id, &request.socials)
        .await
}

// ===== MODERATION =====

pub fn parse_status(raw: &str) -> Result<BusinessStatus> {
    raw.trim().parse().map_err(|_| {
        AppError::validation("Invalid status. Must be: pending, approved, rejected, suspended")
    })
}

/// `pending -> approved | rejected`, `approved -> suspended`,
/// `rejected | suspended -> approved`.
pub fn is_legal_transition(from: BusinessStatus, to: BusinessStatus) -> bool {
    use BusinessStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Rejected)
            | (Approved, Suspended)
            | (Rejected, Approved)
            | (Suspended, Approved)
    )
}

pub fn check_transition(from: BusinessStatus, to: BusinessStatus) -> Result<()> {
    if from == to {
        return Err(AppError::validation(format!("Business is already {to}")));
    }
    if !is_legal_transition(from, to) {
        return Err(AppError::validation(format!(
            "Cannot change status from {from} to {to}"
        )));
    }
    Ok(())
}

/// Admin-only. Order of checks: role, status value, existence, legality.
pub async fn transition_status(
    db: &Database,
    actor: &User,
    business_id: &str,
    raw_status: &str,
) -> Result<Business> {
    require_admin(actor)?;
    let target = parse_status(raw_status)?;

    let current = db
        .find_business_by_id(business_id)
        .await?
        .ok_or_else(|| AppError::not_found("Business not found"))?;
    check_transition(current.status, target)?;

    let updated = db
        .update_business_status(business_id, target, Utc::now())
        .await?;
    log::info!(
        "Business {} moved from {} to {} by {}",
        business_id,
        current.status,
        target,
        actor.id
    );
    Ok(updated)
}

/// Accepts booleans, numbers (non-zero is true) and "true"/"false"/"1"/"0".
fn parse_flag(field: &str, value: Option<&Value>) -> Result<Option<bool>> {
    let invalid = || AppError::validation(format!("{field} must be a boolean"));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(|n| Some(n != 0.0))
            .ok_or_else(invalid),
        Some(Value::String(text)) => match text.trim() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(invalid()),
        },
        Some(_) => Err(invalid()),
    }
}

pub fn parse_flag_changes(request: &FlagUpdateRequest) -> Result<FlagChanges> {
    let tier = match request.tier.as_deref().map(str::trim) {
        None => None,
        Some(raw) => Some(raw.parse::<BusinessTier>().map_err(|_| {
            AppError::validation("Invalid tier. Must be: free, basic, premium, enterprise")
        })?),
    };

    let changes = FlagChanges {
        is_featured: parse_flag("is_featured", request.is_featured.as_ref())?,
        is_verified: parse_flag("is_verified", request.is_verified.as_ref())?,
        tier,
    };

    if changes.is_empty() {
        return Err(AppError::validation("No valid fields to update"));
    }
    Ok(changes)
}

pub async fn update_flags(
    db: &Database,
    actor: &User,
    business_id: &str,
    request: &FlagUpdateRequest,
) -> Result<Business> {
    require_admin(actor)?;
    let changes = parse_flag_changes(request)?;
    let updated = db
        .update_business_flags(business_id, &changes, Utc::now())
        .await?;
    log::info!("Business {business_id} flags updated by {}: {changes:?}", actor.id);
    Ok(updated)
}

// ===== READS =====

/// Approved listings are public; anything else only to its owner or an admin.
pub fn is_visible_to(business: &Business, viewer: Option<&User>) -> bool {
    business.status == BusinessStatus::Approved
        || viewer.is_some_and(|user| user.is_admin() || user.id == business.owner_id)
}

pub async fn business_detail(
    db: &Database,
    viewer: Option<&User>,
    slug: &str,
) -> Result<BusinessDetail> {
    let listing = db
        .find_listing_by_slug(slug)
        .await?
        .filter(|listing| is_visible_to(&listing.business, viewer))
        .ok_or_else(|| AppError::not_found("Business not found"))?;

    let business_id = listing.business.id.clone();
    let (images, socials, categories) = futures_util::try_join!(
        db.business_images(&business_id),
        db.business_socials(&business_id),
        db.business_categories(&business_id),
    )?;

    Ok(BusinessDetail {
        listing,
        images,
        socials,
        categories,
    })
}
