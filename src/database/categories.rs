use chrono::Utc;
use sqlx::SqliteConnection;

use super::{new_id, Database};
use crate::error::{AppError, Result};
use crate::models::{BusinessStatus, Category, CategoryWithCount, NewCategory};

const CATEGORY_COLUMNS: &str =
    "c.id, c.name, c.slug, c.parent_id, c.icon, c.description, c.display_order, c.created_at";

impl Database {
    /// Categories in display order, each with its number of approved listings.
    pub async fn list_categories(&self) -> Result<Vec<CategoryWithCount>> {
        let categories = sqlx::query_as::<_, CategoryWithCount>(&format!(
            r#"
            SELECT {CATEGORY_COLUMNS},
                (SELECT COUNT(*)
                 FROM business_categories bc
                 JOIN businesses b ON b.id = bc.business_id
                 WHERE bc.category_id = c.id AND b.status = ?) AS business_count
            FROM categories c
            ORDER BY c.display_order ASC, c.name ASC
            "#
        ))
        .bind(BusinessStatus::Approved)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    pub async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories c WHERE c.slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Idempotent on slug; returns whether a row was written.
    pub async fn insert_category(&self, category: &NewCategory) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO categories (id, name, slug, icon, description, display_order, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new_id())
        .bind(&category.name)
        .bind(&category.slug)
        .bind(category.icon)
        .bind(&category.description)
        .bind(category.display_order)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

/// Fails with a validation error naming the first id that has no category row.
pub(super) async fn ensure_categories_exist(
    conn: &mut SqliteConnection,
    category_ids: &[String],
) -> Result<()> {
    for category_id in category_ids {
        let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM categories WHERE id = ?")
            .bind(category_id)
            .fetch_one(&mut *conn)
            .await?;

        if found == 0 {
            return Err(AppError::validation(format!(
                "Unknown category id '{category_id}'"
            )));
        }
    }
    Ok(())
}

/// Replaces the category links of a listing; the first id becomes primary.
pub(super) async fn link_categories(
    conn: &mut SqliteConnection,
    business_id: &str,
    category_ids: &[String],
) -> Result<()> {
    sqlx::query("DELETE FROM business_categories WHERE business_id = ?")
        .bind(business_id)
        .execute(&mut *conn)
        .await?;

    for (index, category_id) in category_ids.iter().enumerate() {
        sqlx::query(
            "INSERT INTO business_categories (business_id, category_id, is_primary) VALUES (?, ?, ?)",
        )
        .bind(business_id)
        .bind(category_id)
        .bind(index == 0)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
