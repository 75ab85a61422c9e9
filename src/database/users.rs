use chrono::{DateTime, Utc};

use super::{new_id, Database};
use crate::error::{AppError, Result};
use crate::models::{User, UserRole};

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, email_verified, created_at, updated_at";

impl Database {
    /// Inserts a verified `user`-role account. Duplicate emails are a conflict.
    pub async fn create_user(
        &self,
        email: &str,
        password_hash: Option<&str>,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new_id())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(UserRole::User)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(user) => Ok(user),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                AppError::Conflict("An account with this email already exists".into()),
            ),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_user_by_id(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn update_user_name(&self, user_id: &str, name: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = ?, updated_at = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(Utc::now())
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn update_password_hash(&self, user_id: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now())
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Admin accounts are created by the seed tool; registration never grants them.
    pub async fn upsert_admin(&self, email: &str, password_hash: &str, name: &str) -> Result<User> {
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, email_verified, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 1, ?, ?)
            ON CONFLICT(email) DO UPDATE SET role = excluded.role, updated_at = excluded.updated_at
            "#,
        )
        .bind(new_id())
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(UserRole::Admin)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::not_found("Admin user not found after upsert"))
    }

    pub async fn count_users(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support;

    #[actix_web::test]
    async fn duplicate_email_is_a_conflict() {
        let db = test_support::database().await;
        db.create_user("a@example.com", Some("h"), "A", Utc::now())
            .await
            .unwrap();
        let err = db
            .create_user("a@example.com", Some("h"), "A again", Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[actix_web::test]
    async fn lookups_are_case_insensitive_on_email() {
        let db = test_support::database().await;
        let user = db
            .create_user("Owner@Example.com", None, "Owner", Utc::now())
            .await
            .unwrap();
        assert_eq!(user.role, UserRole::User);
        assert!(user.password_hash.is_none());

        let found = db.find_user_by_email("owner@example.com").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
    }
}
