use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use validator::Validate;

use crate::validation::{
    validate_clearable_email, validate_clearable_web_url, validate_non_blank, validate_web_url,
};

// ============================================================================
// ENUMS
// ============================================================================

/// Account role, stored as TEXT
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    BusinessOwner,
    Admin,
}

/// Moderation status of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessStatus {
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl BusinessStatus {
    pub const ALL: [BusinessStatus; 4] = [
        BusinessStatus::Pending,
        BusinessStatus::Approved,
        BusinessStatus::Rejected,
        BusinessStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessStatus::Pending => "pending",
            BusinessStatus::Approved => "approved",
            BusinessStatus::Rejected => "rejected",
            BusinessStatus::Suspended => "suspended",
        }
    }
}

impl fmt::Display for BusinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        BusinessStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| format!("unknown business status '{value}'"))
    }
}

/// Listing tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BusinessTier {
    Free,
    Basic,
    Premium,
    Enterprise,
}

impl BusinessTier {
    pub const ALL: [BusinessTier; 4] = [
        BusinessTier::Free,
        BusinessTier::Basic,
        BusinessTier::Premium,
        BusinessTier::Enterprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BusinessTier::Free => "free",
            BusinessTier::Basic => "basic",
            BusinessTier::Premium => "premium",
            BusinessTier::Enterprise => "enterprise",
        }
    }
}

impl FromStr for BusinessTier {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        BusinessTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == value)
            .ok_or_else(|| format!("unknown tier '{value}'"))
    }
}

/// Tracked client event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    PageView,
    BusinessView,
    WebsiteClick,
    PhoneClick,
    EmailClick,
    Search,
    MapView,
}

impl EventType {
    pub const ALL: [EventType; 7] = [
        EventType::PageView,
        EventType::BusinessView,
        EventType::WebsiteClick,
        EventType::PhoneClick,
        EventType::EmailClick,
        EventType::Search,
        EventType::MapView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::PageView => "page_view",
            EventType::BusinessView => "business_view",
            EventType::WebsiteClick => "website_click",
            EventType::PhoneClick => "phone_click",
            EventType::EmailClick => "email_click",
            EventType::Search => "search",
            EventType::MapView => "map_view",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .into_iter()
            .find(|event| event.as_str() == value)
            .ok_or_else(|| format!("unknown event type '{value}'"))
    }
}

/// Social network a listing links to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SocialPlatform {
    Facebook,
    Instagram,
    Twitter,
    Linkedin,
}

/// Icon shown for a category
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(rename_all = "PascalCase")]
#[serde(rename_all = "PascalCase")]
pub enum CategoryIcon {
    Utensils,
    Sparkles,
    Briefcase,
    ShoppingBag,
    HeartPulse,
    Home,
    Car,
    Music,
    GraduationCap,
    Building,
    Landmark,
    Laptop,
    Palette,
    HeartHandshake,
}

// ============================================================================
// USERS & SESSIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub name: String,
    pub role: UserRole,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    #[serde(skip_serializing)]
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(min = 2, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank", message = "Name is required"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "New password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: User,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// BUSINESSES
// ============================================================================

/// Listing row as stored
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Business {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub year_established: Option<i64>,
    pub employee_count: Option<String>,
    pub hours_json: Option<Json<Value>>,
    pub status: BusinessStatus,
    pub is_verified: bool,
    pub is_featured: bool,
    pub tier: BusinessTier,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Listing row with the derived projections used by directory views
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BusinessListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub business: Business,
    pub owner_name: Option<String>,
    pub category_names: Option<String>,
    pub primary_category_slug: Option<String>,
    pub logo_url: Option<String>,
}

/// Helper struct used when inserting a new listing
#[derive(Debug, Clone)]
pub struct NewBusiness {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub zip_code: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub year_established: Option<i64>,
    pub employee_count: Option<String>,
    pub hours_json: Option<Value>,
    pub category_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Field changes applied by an owner edit. `None` leaves the column
/// untouched; `Some(None)` on an optional column clears it.
#[derive(Debug, Clone, Default)]
pub struct BusinessChanges {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub short_description: Option<Option<String>>,
    pub email: Option<Option<String>>,
    pub phone: Option<Option<String>>,
    pub website: Option<Option<String>>,
    pub address_line1: Option<Option<String>>,
    pub address_line2: Option<Option<String>>,
    pub city: Option<String>,
    pub zip_code: Option<Option<String>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hours_json: Option<Value>,
    pub category_ids: Option<Vec<String>>,
}

/// Moderation flags applied by an admin in one call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlagChanges {
    pub is_featured: Option<bool>,
    pub is_verified: Option<bool>,
    pub tier: Option<BusinessTier>,
}

impl FlagChanges {
    pub fn is_empty(&self) -> bool {
        self.is_featured.is_none() && self.is_verified.is_none() && self.tier.is_none()
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BusinessImage {
    pub id: String,
    pub business_id: String,
    pub url: String,
    pub alt_text: Option<String>,
    pub is_logo: bool,
    pub is_cover: bool,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BusinessSocial {
    pub id: String,
    pub business_id: String,
    pub platform: SocialPlatform,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Public detail payload
#[derive(Debug, Clone, Serialize)]
pub struct BusinessDetail {
    #[serde(flatten)]
    pub listing: BusinessListing,
    pub images: Vec<BusinessImage>,
    pub socials: Vec<BusinessSocial>,
    pub categories: Vec<Category>,
}

/// Admin detail payload
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AdminBusinessView {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub listing: BusinessListing,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 { (total + limit - 1) / limit } else { 0 };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessPage {
    pub businesses: Vec<BusinessListing>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BusinessSearchResults {
    pub businesses: Vec<BusinessListing>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatedBusiness {
    pub id: String,
    pub slug: String,
    pub status: BusinessStatus,
}

/// Payload sent by an authenticated user to list a business
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CreateBusinessRequest {
    #[serde(default)]
    #[validate(
        custom(function = "validate_non_blank", message = "Name is required"),
        length(max = 160)
    )]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub short_description: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_web_url"))]
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "validate_non_blank", message = "City is required"))]
    pub city: String,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[validate(range(min = 1800, max = 2100))]
    pub year_established: Option<i64>,
    pub employee_count: Option<String>,
    pub hours_json: Option<Value>,
    #[serde(default)]
    pub category_ids: Vec<String>,
}

impl CreateBusinessRequest {
    /// Trims text fields and turns empty optional strings into `None`.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.city = self.city.trim().to_string();
        for field in [
            &mut self.description,
            &mut self.short_description,
            &mut self.email,
            &mut self.phone,
            &mut self.website,
            &mut self.address_line1,
            &mut self.address_line2,
            &mut self.state,
            &mut self.zip_code,
            &mut self.employee_count,
        ] {
            normalize_optional(field);
        }
        self
    }
}

/// Owner edit of an existing listing. An empty string clears an optional
/// field.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateBusinessRequest {
    #[validate(
        custom(function = "validate_non_blank", message = "Name cannot be empty"),
        length(max = 160)
    )]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 300))]
    pub short_description: Option<String>,
    #[validate(custom(function = "validate_clearable_email", message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(custom(function = "validate_clearable_web_url"))]
    pub website: Option<String>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    #[validate(custom(function = "validate_non_blank", message = "City cannot be empty"))]
    pub city: Option<String>,
    pub zip_code: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    pub hours_json: Option<Value>,
    pub category_ids: Option<Vec<String>>,
}

impl UpdateBusinessRequest {
    /// Trims every text field. Blank optional fields become `Some("")`,
    /// which [`into_changes`](Self::into_changes) turns into a clear.
    pub fn normalized(mut self) -> Self {
        for field in [
            &mut self.name,
            &mut self.city,
            &mut self.description,
            &mut self.short_description,
            &mut self.email,
            &mut self.phone,
            &mut self.website,
            &mut self.address_line1,
            &mut self.address_line2,
            &mut self.zip_code,
        ] {
            if let Some(value) = field {
                *value = value.trim().to_string();
            }
        }
        self
    }

    pub fn into_changes(self) -> BusinessChanges {
        BusinessChanges {
            name: self.name,
            description: clearable(self.description),
            short_description: clearable(self.short_description),
            email: clearable(self.email),
            phone: clearable(self.phone),
            website: clearable(self.website),
            address_line1: clearable(self.address_line1),
            address_line2: clearable(self.address_line2),
            city: self.city,
            zip_code: clearable(self.zip_code),
            latitude: self.latitude,
            longitude: self.longitude,
            hours_json: self.hours_json,
            category_ids: self.category_ids,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    #[serde(default)]
    pub status: String,
}

/// Admin flag payload. Values stay loosely typed so `1`/`0` work like booleans.
#[derive(Debug, Default, Deserialize)]
pub struct FlagUpdateRequest {
    pub is_featured: Option<Value>,
    pub is_verified: Option<Value>,
    pub tier: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddImageRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_web_url"))]
    pub url: String,
    #[validate(length(max = 200))]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub is_logo: bool,
    #[serde(default)]
    pub is_cover: bool,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SocialLinkInput {
    pub platform: SocialPlatform,
    #[validate(custom(function = "validate_web_url"))]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReplaceSocialsRequest {
    #[serde(default)]
    #[validate(nested)]
    pub socials: Vec<SocialLinkInput>,
}

fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|value| Some(value).filter(|value| !value.is_empty()))
}

fn normalize_optional(field: &mut Option<String>) {
    if let Some(value) = field.take() {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            *field = Some(trimmed.to_string());
        }
    }
}

// ============================================================================
// CATEGORIES
// ============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<String>,
    pub icon: Option<CategoryIcon>,
    pub description: Option<String>,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub category: Category,
    pub business_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    pub icon: Option<CategoryIcon>,
    pub description: Option<String>,
    pub display_order: i64,
}

// ============================================================================
// ANALYTICS
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrackEventRequest {
    #[serde(default)]
    pub event_type: String,
    pub page_path: Option<String>,
    pub business_id: Option<String>,
    pub session_id: Option<String>,
    pub referrer: Option<String>,
    pub metadata: Option<Value>,
}

/// Event ready to be appended to the raw log
#[derive(Debug, Clone)]
pub struct NewAnalyticsEvent {
    pub event_type: EventType,
    pub page_path: Option<String>,
    pub business_id: Option<String>,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
    pub ip_hash: Option<String>,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackedEvent {
    pub recorded: bool,
}

/// Append-only search audit row
#[derive(Debug, Clone)]
pub struct NewSearchLog {
    pub query: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub results_count: i64,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopBusiness {
    pub business_id: String,
    pub name: String,
    pub slug: String,
    pub city: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopSearch {
    pub query: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CityViews {
    pub city: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryViews {
    pub category: String,
    pub views: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RecentActivity {
    pub event_type: EventType,
    pub page_path: Option<String>,
    pub business_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardKpis {
    pub page_views: i64,
    pub unique_visitors: i64,
    pub business_views: i64,
    pub searches: i64,
    pub total_businesses: i64,
    pub total_users: i64,
}

/// Period-over-period change in percent; `None` when the previous period is empty
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardGrowth {
    pub page_views: Option<i64>,
    pub unique_visitors: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardCharts {
    pub daily_page_views: Vec<DailyPoint>,
    pub daily_visitors: Vec<DailyPoint>,
    pub daily_business_views: Vec<DailyPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsDashboard {
    pub period_days: i64,
    pub kpis: DashboardKpis,
    pub growth: DashboardGrowth,
    pub charts: DashboardCharts,
    pub top_businesses: Vec<TopBusiness>,
    pub top_searches: Vec<TopSearch>,
    pub views_by_city: Vec<CityViews>,
    pub views_by_category: Vec<CategoryViews>,
    pub recent_activity: Vec<RecentActivity>,
}

// ============================================================================
// API RESPONSES
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
