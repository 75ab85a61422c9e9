use sqlx::{QueryBuilder, Sqlite};

use super::Database;
use crate::error::Result;
use crate::models::{BusinessListing, BusinessStatus, NewSearchLog};
use crate::query::{ListingFilter, ListingQuery, SearchQuery, SortOrder};

/// Listing row plus its derived projections. Pair with [`LISTING_FROM`].
pub(super) const LISTING_COLUMNS: &str = r#"
    b.*,
    u.name AS owner_name,
    (SELECT GROUP_CONCAT(c.name, ', ')
     FROM business_categories bc
     JOIN categories c ON bc.category_id = c.id
     WHERE bc.business_id = b.id) AS category_names,
    (SELECT c.slug
     FROM business_categories bc
     JOIN categories c ON bc.category_id = c.id
     WHERE bc.business_id = b.id AND bc.is_primary = 1
     LIMIT 1) AS primary_category_slug,
    (SELECT url FROM business_images
     WHERE business_id = b.id AND is_logo = 1
     ORDER BY display_order
     LIMIT 1) AS logo_url"#;

pub(super) const LISTING_FROM: &str = r#"
    FROM businesses b
    LEFT JOIN users u ON u.id = b.owner_id"#;

impl Database {
    /// One page of listings and the total row count for the same filter.
    pub async fn list_businesses(
        &self,
        query: &ListingQuery,
    ) -> Result<(Vec<BusinessListing>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM businesses b");
        push_filters(&mut count, &query.filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut page = QueryBuilder::<Sqlite>::new(format!("SELECT {LISTING_COLUMNS}{LISTING_FROM}"));
        push_filters(&mut page, &query.filter);
        page.push(order_by(query.sort));
        page.push(" LIMIT ").push_bind(query.limit);
        page.push(" OFFSET ").push_bind(query.offset());

        let businesses = page
            .build_query_as::<BusinessListing>()
            .fetch_all(&self.pool)
            .await?;

        Ok((businesses, total))
    }

    /// Approved listings matching the search index and/or filters,
    /// featured first then by name.
    pub async fn search_businesses(&self, search: &SearchQuery) -> Result<Vec<BusinessListing>> {
        let mut builder =
            QueryBuilder::<Sqlite>::new(format!("SELECT {LISTING_COLUMNS}{LISTING_FROM}"));

        let filter = ListingFilter {
            status: Some(BusinessStatus::Approved),
            category: search.category.clone(),
            city: search.city.clone(),
            ..Default::default()
        };
        push_filters(&mut builder, &filter);

        if let Some(expression) = &search.match_expression {
            builder
                .push(" AND b.row_id IN (SELECT rowid FROM businesses_fts WHERE businesses_fts MATCH ")
                .push_bind(expression.clone())
                .push(")");
        }

        builder.push(" ORDER BY b.is_featured DESC, b.name ASC LIMIT ");
        builder.push_bind(search.limit);

        let businesses = builder
            .build_query_as::<BusinessListing>()
            .fetch_all(&self.pool)
            .await?;

        Ok(businesses)
    }

    pub async fn log_search(&self, entry: &NewSearchLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO search_logs (id, query, category, city, results_count, user_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(super::new_id())
        .bind(&entry.query)
        .bind(&entry.category)
        .bind(&entry.city)
        .bind(entry.results_count)
        .bind(&entry.user_id)
        .bind(chrono::Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// WHERE clause shared by the page query and the count query.
fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &ListingFilter) {
    builder.push(" WHERE 1 = 1");

    if let Some(status) = filter.status {
        builder.push(" AND b.status = ").push_bind(status);
    }

    if let Some(owner_id) = &filter.owner_id {
        builder.push(" AND b.owner_id = ").push_bind(owner_id.clone());
    }

    if let Some(category) = &filter.category {
        builder
            .push(
                " AND b.id IN (SELECT bc.business_id FROM business_categories bc \
                 JOIN categories c ON bc.category_id = c.id WHERE c.slug = ",
            )
            .push_bind(category.clone())
            .push(")");
    }

    if let Some(city) = &filter.city {
        builder
            .push(" AND b.city = ")
            .push_bind(city.clone())
            .push(" COLLATE NOCASE");
    }

    if filter.featured_only {
        builder.push(" AND b.is_featured = 1");
    }

    if filter.with_coordinates {
        builder.push(" AND b.latitude IS NOT NULL AND b.longitude IS NOT NULL");
    }
}

fn order_by(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::Newest => " ORDER BY b.is_featured DESC, b.created_at DESC, b.row_id DESC",
        SortOrder::Oldest => " ORDER BY b.created_at ASC, b.row_id ASC",
        SortOrder::Name => " ORDER BY b.name ASC, b.row_id ASC",
    }
}
