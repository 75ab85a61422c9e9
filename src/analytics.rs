//! Event classification, visitor hashing and dashboard window math.
//!
//! Storage lives in `database::analytics`; this module decides *what* gets
//! written and how the dashboard periods line up.

use actix_web::HttpRequest;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sha2::{Digest, Sha256};

use crate::database::Database;
use crate::error::{AppError, Result};
use crate::models::{EventType, NewAnalyticsEvent, TrackEventRequest};

pub const PAGE_VIEWS: &str = "page_views";
pub const BUSINESS_VIEWS: &str = "business_views";
pub const UNIQUE_VISITORS: &str = "unique_visitors";
pub const UNIQUE_SESSIONS: &str = "unique_sessions";

pub const BUSINESS_DIMENSION: &str = "business_id";
pub const SESSION_DIMENSION: &str = "session";

/// Empty dimension marks a daily total.
pub const NO_DIMENSION: &str = "";

pub const DEFAULT_PERIOD_DAYS: i64 = 30;
pub const MAX_PERIOD_DAYS: i64 = 365;

const IP_HASH_LEN: usize = 16;

/// One `analytics_daily` row to bump by one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterKey {
    pub metric: &'static str,
    pub dimension: &'static str,
    pub dimension_value: String,
}

impl CounterKey {
    pub fn total(metric: &'static str) -> Self {
        Self {
            metric,
            dimension: NO_DIMENSION,
            dimension_value: String::new(),
        }
    }

    pub fn by(metric: &'static str, dimension: &'static str, value: impl Into<String>) -> Self {
        Self {
            metric,
            dimension,
            dimension_value: value.into(),
        }
    }
}

/// Counters an event increments unconditionally. Unique visitors are
/// handled separately since they depend on whether the session is new.
pub fn counters_for(event: &NewAnalyticsEvent) -> Vec<CounterKey> {
    match (event.event_type, event.business_id.as_deref()) {
        (EventType::PageView, _) => vec![CounterKey::total(PAGE_VIEWS)],
        (EventType::BusinessView, Some(business_id)) => vec![
            CounterKey::by(BUSINESS_VIEWS, BUSINESS_DIMENSION, business_id),
            CounterKey::total(BUSINESS_VIEWS),
        ],
        _ => Vec::new(),
    }
}

/// First 16 hex chars of SHA-256(ip ‖ salt).
pub fn hash_ip(ip: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(salt.as_bytes());
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(IP_HASH_LEN);
    digest
}

pub fn client_ip(req: &HttpRequest) -> Option<String> {
    let header = |name: &str| {
        req.headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    if let Some(forwarded) = header("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').map(str::trim).find(|ip| !ip.is_empty()) {
            return Some(first.to_string());
        }
    }

    if let Some(real_ip) = header("x-real-ip") {
        let real_ip = real_ip.trim();
        if !real_ip.is_empty() {
            return Some(real_ip.to_string());
        }
    }

    req.peer_addr().map(|addr| addr.ip().to_string())
}

/// Request context attached to a tracked event.
#[derive(Debug, Clone, Default)]
pub struct EventContext {
    pub user_id: Option<String>,
    pub user_agent: Option<String>,
    pub ip_hash: Option<String>,
}

pub fn build_event(
    request: TrackEventRequest,
    context: EventContext,
    now: DateTime<Utc>,
) -> Result<NewAnalyticsEvent> {
    let event_type = request
        .event_type
        .trim()
        .parse::<EventType>()
        .map_err(|_| AppError::validation("Invalid event type"))?;

    Ok(NewAnalyticsEvent {
        event_type,
        page_path: non_blank(request.page_path),
        business_id: non_blank(request.business_id),
        session_id: non_blank(request.session_id),
        user_id: context.user_id,
        referrer: non_blank(request.referrer),
        user_agent: context.user_agent,
        ip_hash: context.ip_hash,
        metadata: request.metadata,
        created_at: now,
    })
}

/// Stores the event and its counters. Failures are logged and reported as
/// `false`; they never reach the caller as errors.
pub async fn record_event(db: &Database, event: &NewAnalyticsEvent) -> bool {
    match db.record_event(event, &counters_for(event)).await {
        Ok(()) => true,
        Err(err) => {
            log::warn!(
                "Failed to record analytics event {}: {err}",
                event.event_type.as_str()
            );
            false
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ===== DASHBOARD WINDOWS =====

/// Current window is the `period` days ending with `today`, the previous one
/// the `period` days before it. Ranges are handed out half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DashboardWindow {
    pub today: NaiveDate,
    pub period_days: i64,
}

impl DashboardWindow {
    pub fn new(today: NaiveDate, period_days: i64) -> Self {
        Self { today, period_days }
    }

    pub fn start(&self) -> NaiveDate {
        self.today - Duration::days(self.period_days - 1)
    }

    pub fn previous_start(&self) -> NaiveDate {
        self.start() - Duration::days(self.period_days)
    }

    /// `[start, today + 1)`
    pub fn current(&self) -> (NaiveDate, NaiveDate) {
        (self.start(), self.today + Duration::days(1))
    }

    /// `[previous_start, start)`
    pub fn previous(&self) -> (NaiveDate, NaiveDate) {
        (self.previous_start(), self.start())
    }
}

pub fn parse_period(raw: Option<&str>) -> Result<i64> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(DEFAULT_PERIOD_DAYS);
    };

    match raw.parse::<i64>() {
        Ok(days) if (1..=MAX_PERIOD_DAYS).contains(&days) => Ok(days),
        _ => Err(AppError::validation(format!(
            "Period must be between 1 and {MAX_PERIOD_DAYS} days"
        ))),
    }
}

/// Rounded percent change, `None` when there is nothing to compare against.
pub fn growth_percent(current: i64, previous: i64) -> Option<i64> {
    if previous <= 0 {
        return None;
    }
    let change = (current - previous) as f64 / previous as f64 * 100.0;
    Some(change.round() as i64)
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    fn event(event_type: EventType, business_id: Option<&str>) -> NewAnalyticsEvent {
        build_event(
            TrackEventRequest {
                event_type: event_type.as_str().to_string(),
                page_path: Some("/".into()),
                business_id: business_id.map(str::to_string),
                session_id: None,
                referrer: None,
                metadata: None,
            },
            EventContext::default(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn page_views_bump_the_total_only() {
        let counters = counters_for(&event(EventType::PageView, None));
        assert_eq!(counters, vec![CounterKey::total(PAGE_VIEWS)]);
    }

    #[test]
    fn business_views_bump_dimension_and_total() {
        let counters = counters_for(&event(EventType::BusinessView, Some("b1")));
        assert_eq!(
            counters,
            vec![
                CounterKey::by(BUSINESS_VIEWS, BUSINESS_DIMENSION, "b1"),
                CounterKey::total(BUSINESS_VIEWS),
            ]
        );
        assert!(counters_for(&event(EventType::BusinessView, None)).is_empty());
        assert!(counters_for(&event(EventType::PhoneClick, Some("b1"))).is_empty());
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let err = build_event(
            TrackEventRequest {
                event_type: "scroll".into(),
                page_path: None,
                business_id: None,
                session_id: None,
                referrer: None,
                metadata: None,
            },
            EventContext::default(),
            Utc::now(),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn ip_hash_is_salted_and_truncated() {
        let a = hash_ip("203.0.113.7", "salt");
        assert_eq!(a.len(), 16);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(a, hash_ip("203.0.113.7", "salt"));
        assert_ne!(a, hash_ip("203.0.113.7", "pepper"));
    }

    #[test]
    fn forwarded_for_wins_over_real_ip() {
        let req = TestRequest::default()
            .insert_header(("X-Forwarded-For", "198.51.100.1, 10.0.0.1"))
            .insert_header(("X-Real-IP", "192.0.2.9"))
            .to_http_request();
        assert_eq!(client_ip(&req).as_deref(), Some("198.51.100.1"));

        let req = TestRequest::default()
            .insert_header(("X-Real-IP", "192.0.2.9"))
            .to_http_request();
        assert_eq!(client_ip(&req).as_deref(), Some("192.0.2.9"));
    }

    #[test]
    fn windows_are_adjacent_and_equally_long() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();
        let window = DashboardWindow::new(today, 30);
        assert_eq!(window.start(), NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(window.previous().1, window.current().0);
        assert_eq!(window.current().1, NaiveDate::from_ymd_opt(2025, 4, 1).unwrap());
        assert_eq!(window.previous().0, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());

        for period in [1, 7, 30, 365] {
            let window = DashboardWindow::new(today, period);
            let (from, until) = window.current();
            let (prev_from, prev_until) = window.previous();
            assert_eq!((until - from).num_days(), period);
            assert_eq!((prev_until - prev_from).num_days(), period);
        }

        let single = DashboardWindow::new(today, 1);
        assert_eq!(single.current(), (today, today + Duration::days(1)));
    }

    #[test]
    fn growth_needs_a_previous_period() {
        assert_eq!(growth_percent(10, 0), None);
        assert_eq!(growth_percent(15, 10), Some(50));
        assert_eq!(growth_percent(5, 10), Some(-50));
        assert_eq!(growth_percent(2, 3), Some(-33));
    }

    #[test]
    fn period_bounds() {
        assert_eq!(parse_period(None).unwrap(), 30);
        assert_eq!(parse_period(Some("7")).unwrap(), 7);
        assert!(parse_period(Some("0")).is_err());
        assert!(parse_period(Some("366")).is_err());
        assert!(parse_period(Some("week")).is_err());
    }
}
