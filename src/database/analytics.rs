use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{types::Json, SqliteConnection};

use super::{new_id, Database};
use crate::analytics::{
    growth_percent, CounterKey, DashboardWindow, BUSINESS_DIMENSION, BUSINESS_VIEWS,
    NO_DIMENSION, PAGE_VIEWS, SESSION_DIMENSION, UNIQUE_SESSIONS, UNIQUE_VISITORS,
};
use crate::error::Result;
use crate::models::{
    AnalyticsDashboard, CategoryViews, CityViews, DailyPoint, DashboardCharts,
    DashboardGrowth, DashboardKpis, NewAnalyticsEvent, RecentActivity, TopBusiness, TopSearch,
};

const TOP_LIMIT: i64 = 10;
const RECENT_LIMIT: i64 = 20;

impl Database {
    /// Appends the raw event and applies its counters in one transaction.
    /// A session seen for the first time that day also counts a unique visitor.
    pub async fn record_event(
        &self,
        event: &NewAnalyticsEvent,
        counters: &[CounterKey],
    ) -> Result<()> {
        let day = event.created_at.date_naive();
        let mut tx = self.begin_write().await?;

        sqlx::query(
            r#"
            INSERT INTO analytics_events (
                id, event_type, page_path, business_id, session_id, user_id,
                referrer, user_agent, ip_hash, metadata, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(event.event_type)
        .bind(&event.page_path)
        .bind(&event.business_id)
        .bind(&event.session_id)
        .bind(&event.user_id)
        .bind(&event.referrer)
        .bind(&event.user_agent)
        .bind(&event.ip_hash)
        .bind(event.metadata.clone().map(Json))
        .bind(event.created_at)
        .execute(&mut *tx)
        .await?;

        for counter in counters {
            increment(&mut *tx, day, counter).await?;
        }

        if let Some(session_id) = &event.session_id {
            let first_seen = sqlx::query(
                r#"
                INSERT INTO analytics_daily (id, date, metric, dimension, dimension_value, value)
                VALUES (?, ?, ?, ?, ?, 1)
                ON CONFLICT(date, metric, dimension, dimension_value) DO NOTHING
                "#,
            )
            .bind(new_id())
            .bind(day)
            .bind(UNIQUE_SESSIONS)
            .bind(SESSION_DIMENSION)
            .bind(session_id)
            .execute(&mut *tx)
            .await?
            .rows_affected()
                == 1;

            if first_seen {
                increment(&mut *tx, day, &CounterKey::total(UNIQUE_VISITORS)).await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn daily_value(&self, day: NaiveDate, counter: &CounterKey) -> Result<i64> {
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(value), 0) FROM analytics_daily
            WHERE date = ? AND metric = ? AND dimension = ? AND dimension_value = ?
            "#,
        )
        .bind(day)
        .bind(counter.metric)
        .bind(counter.dimension)
        .bind(&counter.dimension_value)
        .fetch_one(&self.pool)
        .await?;
        Ok(value)
    }

    // ===== DASHBOARD =====

    pub async fn analytics_dashboard(&self, window: DashboardWindow) -> Result<AnalyticsDashboard> {
        let current = window.current();
        let previous = window.previous();

        let (page_views, unique_visitors, business_views, searches) = futures_util::try_join!(
            self.metric_total(PAGE_VIEWS, current),
            self.metric_total(UNIQUE_VISITORS, current),
            self.metric_total(BUSINESS_VIEWS, current),
            self.search_count(current),
        )?;

        let (prev_page_views, prev_unique_visitors, total_businesses, total_users) =
            futures_util::try_join!(
                self.metric_total(PAGE_VIEWS, previous),
                self.metric_total(UNIQUE_VISITORS, previous),
                self.count_approved_businesses(),
                self.count_users(),
            )?;

        let (daily_page_views, daily_visitors, daily_business_views) = futures_util::try_join!(
            self.daily_series(PAGE_VIEWS, current),
            self.daily_series(UNIQUE_VISITORS, current),
            self.daily_series(BUSINESS_VIEWS, current),
        )?;

        let (top_businesses, top_searches, views_by_city, views_by_category, recent_activity) =
            futures_util::try_join!(
                self.top_businesses(current),
                self.top_searches(current),
                self.views_by_city(current),
                self.views_by_category(current),
                self.recent_activity(),
            )?;

        Ok(AnalyticsDashboard {
            period_days: window.period_days,
            kpis: DashboardKpis {
                page_views,
                unique_visitors,
                business_views,
                searches,
                total_businesses,
                total_users,
            },
            growth: DashboardGrowth {
                page_views: growth_percent(page_views, prev_page_views),
                unique_visitors: growth_percent(unique_visitors, prev_unique_visitors),
            },
            charts: DashboardCharts {
                daily_page_views,
                daily_visitors,
                daily_business_views,
            },
            top_businesses,
            top_searches,
            views_by_city,
            views_by_category,
            recent_activity,
        })
    }

    async fn metric_total(
        &self,
        metric: &str,
        (from, until): (NaiveDate, NaiveDate),
    ) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(value), 0) FROM analytics_daily
            WHERE metric = ? AND dimension = ? AND date >= ? AND date < ?
            "#,
        )
        .bind(metric)
        .bind(NO_DIMENSION)
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn search_count(&self, range: (NaiveDate, NaiveDate)) -> Result<i64> {
        let (from, until) = timestamp_range(range);
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM search_logs WHERE created_at >= ? AND created_at < ?",
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn daily_series(
        &self,
        metric: &str,
        (from, until): (NaiveDate, NaiveDate),
    ) -> Result<Vec<DailyPoint>> {
        let points = sqlx::query_as::<_, DailyPoint>(
            r#"
            SELECT date, COALESCE(SUM(value), 0) AS value
            FROM analytics_daily
            WHERE metric = ? AND dimension = ? AND date >= ? AND date < ?
            GROUP BY date
            ORDER BY date ASC
            "#,
        )
        .bind(metric)
        .bind(NO_DIMENSION)
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }

    async fn top_businesses(
        &self,
        (from, until): (NaiveDate, NaiveDate),
    ) -> Result<Vec<TopBusiness>> {
        let rows = sqlx::query_as::<_, TopBusiness>(
            r#"
            SELECT ad.dimension_value AS business_id, b.name, b.slug, b.city,
                   COALESCE(SUM(ad.value), 0) AS views
            FROM analytics_daily ad
            JOIN businesses b ON b.id = ad.dimension_value
            WHERE ad.metric = ? AND ad.dimension = ? AND ad.date >= ? AND ad.date < ?
            GROUP BY ad.dimension_value
            ORDER BY views DESC, b.name ASC
            LIMIT ?
            "#,
        )
        .bind(BUSINESS_VIEWS)
        .bind(BUSINESS_DIMENSION)
        .bind(from)
        .bind(until)
        .bind(TOP_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn top_searches(&self, range: (NaiveDate, NaiveDate)) -> Result<Vec<TopSearch>> {
        let (from, until) = timestamp_range(range);
        let rows = sqlx::query_as::<_, TopSearch>(
            r#"
            SELECT query, COUNT(*) AS count
            FROM search_logs
            WHERE query IS NOT NULL AND query != '' AND created_at >= ? AND created_at < ?
            GROUP BY query
            ORDER BY count DESC, query ASC
            LIMIT ?
            "#,
        )
        .bind(from)
        .bind(until)
        .bind(TOP_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn views_by_city(
        &self,
        (from, until): (NaiveDate, NaiveDate),
    ) -> Result<Vec<CityViews>> {
        let rows = sqlx::query_as::<_, CityViews>(
            r#"
            SELECT b.city, COALESCE(SUM(ad.value), 0) AS views
            FROM analytics_daily ad
            JOIN businesses b ON b.id = ad.dimension_value
            WHERE ad.metric = ? AND ad.dimension = ? AND ad.date >= ? AND ad.date < ?
            GROUP BY b.city
            ORDER BY views DESC, b.city ASC
            LIMIT ?
            "#,
        )
        .bind(BUSINESS_VIEWS)
        .bind(BUSINESS_DIMENSION)
        .bind(from)
        .bind(until)
        .bind(TOP_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn views_by_category(
        &self,
        (from, until): (NaiveDate, NaiveDate),
    ) -> Result<Vec<CategoryViews>> {
        let rows = sqlx::query_as::<_, CategoryViews>(
            r#"
            SELECT c.name AS category, COALESCE(SUM(ad.value), 0) AS views
            FROM analytics_daily ad
            JOIN businesses b ON b.id = ad.dimension_value
            JOIN business_categories bc ON bc.business_id = b.id AND bc.is_primary = 1
            JOIN categories c ON c.id = bc.category_id
            WHERE ad.metric = ? AND ad.dimension = ? AND ad.date >= ? AND ad.date < ?
            GROUP BY c.id
            ORDER BY views DESC, c.name ASC
            LIMIT ?
            "#,
        )
        .bind(BUSINESS_VIEWS)
        .bind(BUSINESS_DIMENSION)
        .bind(from)
        .bind(until)
        .bind(TOP_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn recent_activity(&self) -> Result<Vec<RecentActivity>> {
        let rows = sqlx::query_as::<_, RecentActivity>(
            r#"
            SELECT event_type, page_path, business_id, created_at
            FROM analytics_events
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(RECENT_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

async fn increment(
    conn: &mut SqliteConnection,
    day: NaiveDate,
    counter: &CounterKey,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO analytics_daily (id, date, metric, dimension, dimension_value, value)
        VALUES (?, ?, ?, ?, ?, 1)
        ON CONFLICT(date, metric, dimension, dimension_value) DO UPDATE SET value = value + 1
        "#,
    )
    .bind(new_id())
    .bind(day)
    .bind(counter.metric)
    .bind(counter.dimension)
    .bind(&counter.dimension_value)
    .execute(conn)
    .await?;
    Ok(())
}

/// Midnight UTC bounds for the `created_at` columns of raw logs.
fn timestamp_range((from, until): (NaiveDate, NaiveDate)) -> (DateTime<Utc>, DateTime<Utc>) {
    let midnight = |day: NaiveDate| day.and_time(NaiveTime::MIN).and_utc();
    (midnight(from), midnight(until))
}
