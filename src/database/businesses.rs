use chrono::{DateTime, Utc};
use sqlx::{types::Json, QueryBuilder, Sqlite};

use super::categories::{ensure_categories_exist, link_categories};
use super::listings::{LISTING_COLUMNS, LISTING_FROM};
use super::{new_id, Database};
use crate::error::{AppError, Result};
use crate::models::{
    AddImageRequest, AdminBusinessView, Business, BusinessChanges, BusinessImage,
    BusinessListing, BusinessSocial, BusinessStatus, Category, FlagChanges, NewBusiness,
    SocialLinkInput, UserRole,
};

impl Database {
    // ===== WRITES =====

    /// Inserts a listing in `pending` with its category links. In the same
    /// transaction the owner is promoted from `user` to `business_owner`;
    /// other roles (admins in particular) are left as they are.
    ///
    /// A taken slug surfaces as a unique violation so the caller can retry
    /// with a new suffix.
    pub async fn create_business(&self, business: &NewBusiness) -> Result<Business> {
        let mut tx = self.begin_write().await?;

        ensure_categories_exist(&mut *tx, &business.category_ids).await?;

        let created = sqlx::query_as::<_, Business>(
            r#"
            INSERT INTO businesses (
                id, owner_id, name, slug, description, short_description,
                email, phone, website, address_line1, address_line2,
                city, state, zip_code, latitude, longitude,
                year_established, employee_count, hours_json, status,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&business.id)
        .bind(&business.owner_id)
        .bind(&business.name)
        .bind(&business.slug)
        .bind(&business.description)
        .bind(&business.short_description)
        .bind(&business.email)
        .bind(&business.phone)
        .bind(&business.website)
        .bind(&business.address_line1)
        .bind(&business.address_line2)
        .bind(&business.city)
        .bind(&business.state)
        .bind(&business.zip_code)
        .bind(business.latitude)
        .bind(business.longitude)
        .bind(business.year_established)
        .bind(&business.employee_count)
        .bind(business.hours_json.clone().map(Json))
        .bind(BusinessStatus::Pending)
        .bind(business.created_at)
        .bind(business.created_at)
        .fetch_one(&mut *tx)
        .await?;

        link_categories(&mut *tx, &created.id, &business.category_ids).await?;

        sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ? AND role = ?")
            .bind(UserRole::BusinessOwner)
            .bind(business.created_at)
            .bind(&business.owner_id)
            .bind(UserRole::User)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(created)
    }

    /// Applies owner edits. Status and flags are never touched here; the
    /// search index follows through the update trigger.
    pub async fn update_business(
        &self,
        business_id: &str,
        changes: BusinessChanges,
        now: DateTime<Utc>,
    ) -> Result<Business> {
        let mut tx = self.begin_write().await?;

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE businesses SET updated_at = ");
        builder.push_bind(now);
        push_set(&mut builder, "name", changes.name);
        push_set(&mut builder, "description", changes.description);
        push_set(&mut builder, "short_description", changes.short_description);
        push_set(&mut builder, "email", changes.email);
        push_set(&mut builder, "phone", changes.phone);
        push_set(&mut builder, "website", changes.website);
        push_set(&mut builder, "address_line1", changes.address_line1);
        push_set(&mut builder, "address_line2", changes.address_line2);
        push_set(&mut builder, "city", changes.city);
        push_set(&mut builder, "zip_code", changes.zip_code);
        push_set(&mut builder, "latitude", changes.latitude);
        push_set(&mut builder, "longitude", changes.longitude);
        push_set(&mut builder, "hours_json", changes.hours_json.map(Json));
        builder.push(" WHERE id = ").push_bind(business_id.to_string());
        builder.push(" RETURNING *");

        let updated = builder
            .build_query_as::<Business>()
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Business not found"))?;

        if let Some(category_ids) = changes.category_ids {
            ensure_categories_exist(&mut *tx, &category_ids).await?;
            link_categories(&mut *tx, business_id, &category_ids).await?;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn update_business_status(
        &self,
        business_id: &str,
        status: BusinessStatus,
        now: DateTime<Utc>,
    ) -> Result<Business> {
        let updated = sqlx::query_as::<_, Business>(
            "UPDATE businesses SET status = ?, updated_at = ? WHERE id = ? RETURNING *",
        )
        .bind(status)
        .bind(now)
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or_else(|| AppError::not_found("Business not found"))
    }

    pub async fn update_business_flags(
        &self,
        business_id: &str,
        flags: &FlagChanges,
        now: DateTime<Utc>,
    ) -> Result<Business> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE businesses SET updated_at = ");
        builder.push_bind(now);
        push_set(&mut builder, "is_featured", flags.is_featured);
        push_set(&mut builder, "is_verified", flags.is_verified);
        push_set(&mut builder, "tier", flags.tier);
        builder.push(" WHERE id = ").push_bind(business_id.to_string());
        builder.push(" RETURNING *");

        builder
            .build_query_as::<Business>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Business not found"))
    }

    /// Appends an image. Marking it as logo (or cover) clears the flag on
    /// the listing's other images.
    pub async fn add_business_image(
        &self,
        business_id: &str,
        image: &AddImageRequest,
    ) -> Result<BusinessImage> {
        let mut tx = self.begin_write().await?;

        if image.is_logo {
            sqlx::query("UPDATE business_images SET is_logo = 0 WHERE business_id = ?")
                .bind(business_id)
                .execute(&mut *tx)
                .await?;
        }
        if image.is_cover {
            sqlx::query("UPDATE business_images SET is_cover = 0 WHERE business_id = ?")
                .bind(business_id)
                .execute(&mut *tx)
                .await?;
        }

        let display_order = match image.display_order {
            Some(order) => order,
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT COALESCE(MAX(display_order) + 1, 0) FROM business_images WHERE business_id = ?",
                )
                .bind(business_id)
                .fetch_one(&mut *tx)
                .await?
            }
        };

        let created = sqlx::query_as::<_, BusinessImage>(
            r#"
            INSERT INTO business_images (id, business_id, url, alt_text, is_logo, is_cover, display_order, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, business_id, url, alt_text, is_logo, is_cover, display_order, created_at
            "#,
        )
        .bind(new_id())
        .bind(business_id)
        .bind(image.url.trim())
        .bind(&image.alt_text)
        .bind(image.is_logo)
        .bind(image.is_cover)
        .bind(display_order)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    pub async fn replace_business_socials(
        &self,
        business_id: &str,
        socials: &[SocialLinkInput],
    ) -> Result<Vec<BusinessSocial>> {
        let mut tx = self.begin_write().await?;

        sqlx::query("DELETE FROM business_socials WHERE business_id = ?")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        let now = Utc::now();
        let mut saved = Vec::with_capacity(socials.len());
        for social in socials {
            let row = sqlx::query_as::<_, BusinessSocial>(
                r#"
                INSERT INTO business_socials (id, business_id, platform, url, created_at)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id, business_id, platform, url, created_at
                "#,
            )
            .bind(new_id())
            .bind(business_id)
            .bind(social.platform)
            .bind(social.url.trim())
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }

    // ===== READS =====

    pub async fn slug_exists(&self, slug: &str) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses WHERE slug = ?")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn find_business_by_id(&self, business_id: &str) -> Result<Option<Business>> {
        let business = sqlx::query_as::<_, Business>("SELECT * FROM businesses WHERE id = ?")
            .bind(business_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(business)
    }

    /// Listing by slug regardless of status; visibility is decided by the caller.
    pub async fn find_listing_by_slug(&self, slug: &str) -> Result<Option<BusinessListing>> {
        let listing = sqlx::query_as::<_, BusinessListing>(&format!(
            "SELECT {LISTING_COLUMNS}{LISTING_FROM} WHERE b.slug = ?"
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(listing)
    }

    pub async fn find_admin_business(&self, business_id: &str) -> Result<Option<AdminBusinessView>> {
        let view = sqlx::query_as::<_, AdminBusinessView>(&format!(
            "SELECT {LISTING_COLUMNS}, u.email AS owner_email{LISTING_FROM} WHERE b.id = ?"
        ))
        .bind(business_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(view)
    }

    pub async fn business_images(&self, business_id: &str) -> Result<Vec<BusinessImage>> {
        let images = sqlx::query_as::<_, BusinessImage>(
            r#"
            SELECT id, business_id, url, alt_text, is_logo, is_cover, display_order, created_at
            FROM business_images
            WHERE business_id = ?
            ORDER BY display_order ASC, created_at ASC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    pub async fn business_socials(&self, business_id: &str) -> Result<Vec<BusinessSocial>> {
        let socials = sqlx::query_as::<_, BusinessSocial>(
            r#"
            SELECT id, business_id, platform, url, created_at
            FROM business_socials
            WHERE business_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(socials)
    }

    /// Linked categories, primary first.
    pub async fn business_categories(&self, business_id: &str) -> Result<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.id, c.name, c.slug, c.parent_id, c.icon, c.description, c.display_order, c.created_at
            FROM categories c
            JOIN business_categories bc ON bc.category_id = c.id
            WHERE bc.business_id = ?
            ORDER BY bc.is_primary DESC, c.display_order ASC
            "#,
        )
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    pub async fn count_approved_businesses(&self) -> Result<i64> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM businesses WHERE status = ?")
            .bind(BusinessStatus::Approved)
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

fn push_set<'args, T>(builder: &mut QueryBuilder<'args, Sqlite>, column: &str, value: Option<T>)
where
    T: 'args + sqlx::Encode<'args, Sqlite> + sqlx::Type<Sqlite>,
{
    if let Some(value) = value {
        builder.push(", ").push(column).push(" = ").push_bind(value);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::test_support;
    use crate::models::{BusinessTier, CategoryIcon, NewCategory, SocialPlatform};

    pub fn new_business(owner_id: &str, name: &str, slug: &str, city: &str) -> NewBusiness {
        NewBusiness {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: name.to_string(),
            slug: slug.to_string(),
            description: Some(format!("{name} serving {city}")),
            short_description: None,
            email: None,
            phone: None,
            website: None,
            address_line1: None,
            address_line2: None,
            city: city.to_string(),
            state: "AZ".to_string(),
            zip_code: None,
            latitude: 33.45,
            longitude: -112.07,
            year_established: None,
            employee_count: None,
            hours_json: None,
            category_ids: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[actix_web::test]
    async fn creation_promotes_plain_users_only() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "owner@example.com", UserRole::User).await;
        let admin = test_support::user(&db, "admin@example.com", UserRole::Admin).await;

        let created = db
            .create_business(&new_business(&user.id, "Joe's Cafe", "joes-cafe", "Phoenix"))
            .await
            .unwrap();
        assert_eq!(created.status, BusinessStatus::Pending);
        assert_eq!(created.tier, BusinessTier::Free);

        db.create_business(&new_business(&admin.id, "Admin Shop", "admin-shop", "Mesa"))
            .await
            .unwrap();

        let owner = db.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(owner.role, UserRole::BusinessOwner);
        let admin = db.find_user_by_id(&admin.id).await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
    }

    #[actix_web::test]
    async fn duplicate_slug_is_a_unique_violation() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "dup@example.com", UserRole::User).await;
        db.create_business(&new_business(&user.id, "Dup", "dup", "Tempe"))
            .await
            .unwrap();

        let err = db
            .create_business(&new_business(&user.id, "Dup", "dup", "Tempe"))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[actix_web::test]
    async fn unknown_category_rolls_back_everything() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "cat@example.com", UserRole::User).await;
        let mut business = new_business(&user.id, "Orphan", "orphan", "Tempe");
        business.category_ids = vec!["missing".into()];

        let err = db.create_business(&business).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(!db.slug_exists("orphan").await.unwrap());
        let user = db.find_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(user.role, UserRole::User);
    }

    #[actix_web::test]
    async fn first_category_is_primary() {
        let db = test_support::database().await;
        for (slug, order) in [("food", 1), ("retail", 2)] {
            db.insert_category(&NewCategory {
                name: slug.into(),
                slug: slug.into(),
                icon: Some(CategoryIcon::ShoppingBag),
                description: None,
                display_order: order,
            })
            .await
            .unwrap();
        }
        let retail = db.find_category_by_slug("retail").await.unwrap().unwrap();
        let food = db.find_category_by_slug("food").await.unwrap().unwrap();

        let user = test_support::user(&db, "c@example.com", UserRole::User).await;
        let mut business = new_business(&user.id, "Two Cats", "two-cats", "Tucson");
        business.category_ids = vec![retail.id.clone(), food.id.clone()];
        let created = db.create_business(&business).await.unwrap();

        let listing = db.find_listing_by_slug("two-cats").await.unwrap().unwrap();
        assert_eq!(listing.primary_category_slug.as_deref(), Some("retail"));
        let linked = db.business_categories(&created.id).await.unwrap();
        assert_eq!(linked[0].slug, "retail");
        assert_eq!(linked.len(), 2);
    }

    #[actix_web::test]
    async fn edits_leave_status_alone() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "e@example.com", UserRole::User).await;
        let created = db
            .create_business(&new_business(&user.id, "Before", "before", "Mesa"))
            .await
            .unwrap();
        db.update_business_status(&created.id, BusinessStatus::Approved, Utc::now())
            .await
            .unwrap();

        let changes = BusinessChanges {
            name: Some("After".into()),
            phone: Some(Some("555-0100".into())),
            ..Default::default()
        };
        let updated = db.update_business(&created.id, changes, Utc::now()).await.unwrap();
        assert_eq!(updated.name, "After");
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));
        assert_eq!(updated.status, BusinessStatus::Approved);
        assert_eq!(updated.slug, "before");
    }

    #[actix_web::test]
    async fn missing_business_is_not_found() {
        let db = test_support::database().await;
        let err = db
            .update_business_status("nope", BusinessStatus::Approved, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[actix_web::test]
    async fn new_logo_replaces_old_and_socials_are_replaced() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "i@example.com", UserRole::User).await;
        let created = db
            .create_business(&new_business(&user.id, "Pics", "pics", "Sedona"))
            .await
            .unwrap();

        for url in ["https://cdn.example.com/a.png", "https://cdn.example.com/b.png"] {
            db.add_business_image(
                &created.id,
                &AddImageRequest {
                    url: url.into(),
                    alt_text: None,
                    is_logo: true,
                    is_cover: false,
                    display_order: None,
                },
            )
            .await
            .unwrap();
        }
        let images = db.business_images(&created.id).await.unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images.iter().filter(|i| i.is_logo).count(), 1);
        assert_eq!(images[1].display_order, 1);

        let listing = db.find_listing_by_slug("pics").await.unwrap().unwrap();
        assert_eq!(listing.logo_url.as_deref(), Some("https://cdn.example.com/b.png"));

        let link = |platform, url: &str| SocialLinkInput {
            platform,
            url: url.into(),
        };
        db.replace_business_socials(
            &created.id,
            &[link(SocialPlatform::Facebook, "https://facebook.com/pics")],
        )
        .await
        .unwrap();
        let saved = db
            .replace_business_socials(
                &created.id,
                &[link(SocialPlatform::Instagram, "https://instagram.com/pics")],
            )
            .await
            .unwrap();
        assert_eq!(saved.len(), 1);
        let socials = db.business_socials(&created.id).await.unwrap();
        assert_eq!(socials.len(), 1);
        assert_eq!(socials[0].platform, SocialPlatform::Instagram);
    }

    #[actix_web::test]
    async fn admin_view_carries_owner_email() {
        let db = test_support::database().await;
        let user = test_support::user(&db, "admin-view@example.com", UserRole::User).await;
        let created = db
            .create_business(&new_business(&user.id, "Viewed", "viewed", "Prescott"))
            .await
            .unwrap();

        let view = db.find_admin_business(&created.id).await.unwrap().unwrap();
        assert_eq!(view.owner_email.as_deref(), Some("admin-view@example.com"));
        assert_eq!(view.listing.owner_name.as_deref(), Some("Test User"));
        assert_eq!(view.listing.business.status, BusinessStatus::Pending);

        assert!(db.find_admin_business("missing").await.unwrap().is_none());
    }
}

