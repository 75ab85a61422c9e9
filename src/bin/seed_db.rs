use chrono::Utc;

use azbp_directory::auth::hash_password;
use azbp_directory::config::AppConfig;
use azbp_directory::database::Database;
use azbp_directory::models::{
    BusinessStatus, CategoryIcon, FlagChanges, NewBusiness, NewCategory,
};
use azbp_directory::slug::slugify;

const CATEGORIES: &[(&str, &str, CategoryIcon, &str)] = &[
    ("Restaurants & Food", "restaurants", CategoryIcon::Utensils, "Dining, catering, food trucks, bakeries, and more"),
    ("Beauty & Wellness", "beauty-wellness", CategoryIcon::Sparkles, "Salons, spas, barbershops, wellness centers"),
    ("Professional Services", "professional-services", CategoryIcon::Briefcase, "Legal, consulting, accounting, marketing"),
    ("Retail & Shopping", "retail", CategoryIcon::ShoppingBag, "Clothing, gifts, specialty shops, boutiques"),
    ("Health & Medical", "health-medical", CategoryIcon::HeartPulse, "Doctors, dentists, clinics, therapists"),
    ("Home Services", "home-services", CategoryIcon::Home, "Cleaning, repairs, landscaping, contractors"),
    ("Automotive", "automotive", CategoryIcon::Car, "Repair shops, detailing, dealerships"),
    ("Entertainment", "entertainment", CategoryIcon::Music, "Events, music, arts, recreation"),
    ("Education & Training", "education", CategoryIcon::GraduationCap, "Tutoring, schools, coaching, workshops"),
    ("Real Estate", "real-estate", CategoryIcon::Building, "Agents, property management, development"),
    ("Financial Services", "financial", CategoryIcon::Landmark, "Banking, insurance, investments, tax prep"),
    ("Technology", "technology", CategoryIcon::Laptop, "IT services, software, web development"),
    ("Arts & Culture", "arts-culture", CategoryIcon::Palette, "Galleries, artists, cultural organizations"),
    ("Nonprofit & Community", "nonprofit", CategoryIcon::HeartHandshake, "Charities, community organizations, advocacy"),
];

struct SampleBusiness {
    name: &'static str,
    short_description: &'static str,
    description: &'static str,
    city: &'static str,
    zip_code: &'static str,
    latitude: f64,
    longitude: f64,
    category: &'static str,
    phone: &'static str,
    website: Option<&'static str>,
    featured: bool,
    verified: bool,
}

const SAMPLE_BUSINESSES: &[SampleBusiness] = &[
    SampleBusiness {
        name: "Soul Food Kitchen",
        short_description: "Authentic Southern soul food with a modern twist",
        description: "Authentic Southern soul food with a modern twist. Family recipes passed down through generations.",
        city: "Phoenix",
        zip_code: "85003",
        latitude: 33.4484,
        longitude: -112.0740,
        category: "restaurants",
        phone: "(602) 555-0123",
        website: Some("https://soulfoodkitchen.com"),
        featured: true,
        verified: true,
    },
    SampleBusiness {
        name: "Crown & Glory Barbershop",
        short_description: "Premium barbershop experience with expert fades",
        description: "Premium barbershop experience. Expert fades, beard grooming, and a welcoming atmosphere.",
        city: "Phoenix",
        zip_code: "85004",
        latitude: 33.4505,
        longitude: -112.0683,
        category: "beauty-wellness",
        phone: "(602) 555-0234",
        website: None,
        featured: true,
        verified: true,
    },
    SampleBusiness {
        name: "Heritage Law Group",
        short_description: "Full-service law firm for business and family",
        description: "Full-service law firm specializing in business law, real estate, and family matters.",
        city: "Scottsdale",
        zip_code: "85251",
        latitude: 33.4942,
        longitude: -111.9261,
        category: "professional-services",
        phone: "(480) 555-0345",
        website: Some("https://heritagelawgroup.com"),
        featured: true,
        verified: false,
    },
    SampleBusiness {
        name: "African Threads Boutique",
        short_description: "African-inspired fashion and accessories",
        description: "Celebrating African fashion and culture. Unique clothing, accessories, and home decor.",
        city: "Tempe",
        zip_code: "85281",
        latitude: 33.4255,
        longitude: -111.9400,
        category: "retail",
        phone: "(480) 555-0456",
        website: None,
        featured: false,
        verified: true,
    },
    SampleBusiness {
        name: "Wellness Within Clinic",
        short_description: "Holistic health and integrative medicine",
        description: "Holistic health and wellness center specializing in integrative medicine and preventive care.",
        city: "Chandler",
        zip_code: "85224",
        latitude: 33.3062,
        longitude: -111.8413,
        category: "health-medical",
        phone: "(480) 555-0567",
        website: None,
        featured: true,
        verified: true,
    },
    SampleBusiness {
        name: "Elite Home Solutions",
        short_description: "Professional home improvement services",
        description: "Professional home improvement and repair services, from small fixes to complete renovations.",
        city: "Mesa",
        zip_code: "85201",
        latitude: 33.4152,
        longitude: -111.8315,
        category: "home-services",
        phone: "(480) 555-0678",
        website: None,
        featured: false,
        verified: false,
    },
    SampleBusiness {
        name: "Precision Auto Care",
        short_description: "Complete auto repair by ASE-certified mechanics",
        description: "Complete auto repair and maintenance. ASE-certified mechanics and honest service.",
        city: "Glendale",
        zip_code: "85301",
        latitude: 33.5387,
        longitude: -112.1860,
        category: "automotive",
        phone: "(623) 555-0789",
        website: None,
        featured: false,
        verified: true,
    },
    SampleBusiness {
        name: "Rhythm & Roots Events",
        short_description: "Full-service event planning and entertainment",
        description: "Full-service event planning and entertainment. Weddings, corporate events, concerts, and more.",
        city: "Phoenix",
        zip_code: "85008",
        latitude: 33.4533,
        longitude: -112.0259,
        category: "entertainment",
        phone: "(602) 555-0890",
        website: Some("https://rhythmroots.com"),
        featured: true,
        verified: false,
    },
    SampleBusiness {
        name: "Excel Learning Center",
        short_description: "Academic tutoring and test preparation",
        description: "Academic tutoring and test preparation for students of all ages.",
        city: "Gilbert",
        zip_code: "85234",
        latitude: 33.3528,
        longitude: -111.7890,
        category: "education",
        phone: "(480) 555-0901",
        website: None,
        featured: false,
        verified: false,
    },
    SampleBusiness {
        name: "Keys to the City Realty",
        short_description: "Full-service real estate for home and investment",
        description: "Full-service real estate agency helping families and investors across Arizona.",
        city: "Scottsdale",
        zip_code: "85254",
        latitude: 33.5387,
        longitude: -111.9261,
        category: "real-estate",
        phone: "(480) 555-1012",
        website: Some("https://keystothecityrealty.com"),
        featured: false,
        verified: true,
    },
    SampleBusiness {
        name: "Prosperity Financial Group",
        short_description: "Financial planning and wealth management",
        description: "Comprehensive financial planning and wealth management with personalized guidance.",
        city: "Phoenix",
        zip_code: "85012",
        latitude: 33.5094,
        longitude: -112.0703,
        category: "financial",
        phone: "(602) 555-1123",
        website: None,
        featured: true,
        verified: false,
    },
    SampleBusiness {
        name: "TechBridge Solutions",
        short_description: "IT consulting and software development",
        description: "IT consulting and software development for growing businesses.",
        city: "Tempe",
        zip_code: "85281",
        latitude: 33.4255,
        longitude: -111.9400,
        category: "technology",
        phone: "(480) 555-1234",
        website: Some("https://techbridge.io"),
        featured: false,
        verified: true,
    },
    SampleBusiness {
        name: "Sankofa Art Gallery",
        short_description: "Contemporary African and African-American art",
        description: "Contemporary African and African-American art gallery with cultural events and workshops.",
        city: "Phoenix",
        zip_code: "85004",
        latitude: 33.4539,
        longitude: -112.0739,
        category: "arts-culture",
        phone: "(602) 555-1345",
        website: Some("https://sankofaart.com"),
        featured: true,
        verified: true,
    },
    SampleBusiness {
        name: "Community Uplift Foundation",
        short_description: "Youth development and community empowerment",
        description: "Nonprofit dedicated to youth development, education equity, and community empowerment.",
        city: "Phoenix",
        zip_code: "85007",
        latitude: 33.4372,
        longitude: -112.0917,
        category: "nonprofit",
        phone: "(602) 555-1456",
        website: Some("https://communityuplift.org"),
        featured: false,
        verified: true,
    },
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env()?;
    log::info!("Seeding {}", config.database_url);
    let db = Database::connect(&config.database_url, 1).await?;

    let admin_email =
        std::env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@azbp.com".into());
    let admin_password =
        std::env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".into());
    let admin = db
        .upsert_admin(&admin_email, &hash_password(&admin_password)?, "Admin")
        .await?;
    log::info!("Admin account ready: {}", admin.email);

    let mut inserted = 0;
    for (order, (name, slug, icon, description)) in CATEGORIES.iter().enumerate() {
        let category = NewCategory {
            name: (*name).to_string(),
            slug: (*slug).to_string(),
            icon: Some(*icon),
            description: Some((*description).to_string()),
            display_order: order as i64 + 1,
        };
        if db.insert_category(&category).await? {
            inserted += 1;
        }
    }
    log::info!("Categories: {inserted} inserted, {} already present", CATEGORIES.len() - inserted);

    for sample in SAMPLE_BUSINESSES {
        let slug = slugify(sample.name);
        if db.slug_exists(&slug).await? {
            log::info!("Skipping {}: already seeded", sample.name);
            continue;
        }

        let Some(category) = db.find_category_by_slug(sample.category).await? else {
            log::warn!("Skipping {}: category '{}' missing", sample.name, sample.category);
            continue;
        };

        let now = Utc::now();
        let created = db
            .create_business(&NewBusiness {
                id: uuid::Uuid::new_v4().to_string(),
                owner_id: admin.id.clone(),
                name: sample.name.to_string(),
                slug,
                description: Some(sample.description.to_string()),
                short_description: Some(sample.short_description.to_string()),
                email: None,
                phone: Some(sample.phone.to_string()),
                website: sample.website.map(str::to_string),
                address_line1: None,
                address_line2: None,
                city: sample.city.to_string(),
                state: "AZ".to_string(),
                zip_code: Some(sample.zip_code.to_string()),
                latitude: sample.latitude,
                longitude: sample.longitude,
                year_established: None,
                employee_count: None,
                hours_json: None,
                category_ids: vec![category.id],
                created_at: now,
            })
            .await?;

        db.update_business_status(&created.id, BusinessStatus::Approved, now)
            .await?;
        let flags = FlagChanges {
            is_featured: Some(sample.featured),
            is_verified: Some(sample.verified),
            tier: None,
        };
        db.update_business_flags(&created.id, &flags, now).await?;

        log::info!("Seeded {} ({})", created.name, created.city);
    }

    log::info!(
        "Seed complete: {} approved businesses, {} users",
        db.count_approved_businesses().await?,
        db.count_users().await?
    );
    db.close().await;
    Ok(())
}
