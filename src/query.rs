//! Turns raw query-string parameters into a listing or search query,
//! applying the visibility rules for the calling user.

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{BusinessStatus, User};

pub const DEFAULT_PAGE_SIZE: i64 = 12;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_SEARCH_LIMIT: i64 = 20;

/// Query string of `GET /businesses` and `GET /businesses/map`.
///
/// Numbers stay strings here so malformed values fall back to defaults
/// instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub status: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub owner: Option<String>,
    pub featured: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Featured first, then most recent
    #[default]
    Newest,
    Oldest,
    Name,
}

impl SortOrder {
    /// Unknown values fall back to `Newest`.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("oldest") => SortOrder::Oldest,
            Some("name") => SortOrder::Name,
            _ => SortOrder::Newest,
        }
    }
}

/// Status requested by the caller, before the visibility gate is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    Unspecified,
    All,
    Only(BusinessStatus),
}

impl StatusFilter {
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
            None => Ok(StatusFilter::Unspecified),
            Some("all") => Ok(StatusFilter::All),
            Some(raw) => raw.parse().map(StatusFilter::Only).map_err(|_| {
                AppError::validation(
                    "Invalid status. Must be: pending, approved, rejected, suspended, all",
                )
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingFilter {
    pub status: Option<BusinessStatus>,
    pub owner_id: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub featured_only: bool,
    pub with_coordinates: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingQuery {
    pub filter: ListingFilter,
    pub sort: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl ListingQuery {
    /// Builds the query for `viewer`:
    ///
    /// * `owner=me` scopes to the caller's own listings in every status
    ///   (an explicit status still narrows it) and needs a session;
    /// * admins get the status they ask for, `approved` by default and no
    ///   status predicate for `status=all`;
    /// * everyone else only ever sees `approved`.
    pub fn resolve(params: &ListingParams, viewer: Option<&User>) -> Result<Self> {
        let owner_scope = params.owner.as_deref().map(str::trim) == Some("me");
        let is_admin = viewer.is_some_and(User::is_admin);

        let (status, owner_id) = if owner_scope {
            let user = viewer.ok_or(AppError::Unauthorized)?;
            let status = match StatusFilter::parse(params.status.as_deref())? {
                StatusFilter::Only(status) => Some(status),
                StatusFilter::Unspecified | StatusFilter::All => None,
            };
            (status, Some(user.id.clone()))
        } else if is_admin {
            let status = match StatusFilter::parse(params.status.as_deref())? {
                StatusFilter::Unspecified => Some(BusinessStatus::Approved),
                StatusFilter::All => None,
                StatusFilter::Only(status) => Some(status),
            };
            (status, None)
        } else {
            (Some(BusinessStatus::Approved), None)
        };

        let featured_only = matches!(
            params.featured.as_deref().map(str::trim),
            Some("true") | Some("1")
        );

        Ok(Self {
            filter: ListingFilter {
                status,
                owner_id,
                category: non_blank(params.category.as_deref()),
                city: non_blank(params.city.as_deref()),
                featured_only,
                with_coordinates: false,
            },
            sort: SortOrder::parse(params.sort.as_deref()),
            page: parse_number(params.page.as_deref(), 1, 1, i64::MAX),
            limit: parse_number(params.limit.as_deref(), DEFAULT_PAGE_SIZE, 1, MAX_PAGE_SIZE),
        })
    }

    /// Same listing restricted to rows that can be placed on a map.
    pub fn for_map(mut self) -> Self {
        self.filter.with_coordinates = true;
        self
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub match_expression: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub limit: i64,
}

impl SearchQuery {
    /// `None` means there is nothing to search for and the result is empty.
    pub fn resolve(params: &SearchParams) -> Option<Self> {
        let match_expression = params.q.as_deref().and_then(fts_match_expression);
        let category = non_blank(params.category.as_deref());
        let city = non_blank(params.city.as_deref());

        if match_expression.is_none() && category.is_none() && city.is_none() {
            return None;
        }

        Some(Self {
            match_expression,
            category,
            city,
            limit: parse_number(
                params.limit.as_deref(),
                DEFAULT_SEARCH_LIMIT,
                1,
                MAX_PAGE_SIZE,
            ),
        })
    }
}

/// FTS5 expression for free text: each alphanumeric word becomes a quoted
/// prefix term, so user input can never inject query syntax.
pub fn fts_match_expression(q: &str) -> Option<String> {
    let terms: Vec<String> = q
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| format!("\"{}\"*", word.to_lowercase()))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn parse_number(raw: Option<&str>, default: i64, min: i64, max: i64) -> i64 {
    raw.and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}
