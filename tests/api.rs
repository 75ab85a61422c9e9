use actix_web::cookie::Cookie;
use actix_web::{http::StatusCode, test, web, App};
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::{json, Value};

use azbp_directory::analytics::{
    CounterKey, BUSINESS_DIMENSION, BUSINESS_VIEWS, PAGE_VIEWS, UNIQUE_VISITORS,
};
use azbp_directory::auth::{hash_password, SESSION_COOKIE_NAME};
use azbp_directory::config::AppConfig;
use azbp_directory::database::Database;
use azbp_directory::handlers::configure_routes;

macro_rules! service {
    ($db:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($db.clone()))
                .app_data(web::Data::new(
                    AppConfig::from_lookup(|_| None).expect("default config"),
                ))
                .service(web::scope("/api/v1").configure(configure_routes)),
        )
        .await
    };
}

macro_rules! call {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let cookie = resp
            .response()
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
            .map(|cookie| cookie.into_owned());
        let body: Value = test::read_body_json(resp).await;
        (status, body, cookie)
    }};
}

async fn database() -> Database {
    Database::connect_in_memory().await.expect("in-memory database")
}

fn joes_cafe() -> Value {
    json!({
        "name": "Joe's Cafe",
        "city": "Phoenix",
        "description": "Coffee and pastries downtown",
        "website": "https://joescafe.example"
    })
}

fn register(email: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({ "name": "Joe Owner", "email": email, "password": "correct-horse" }))
}

#[actix_rt::test]
async fn listing_goes_live_only_after_approval() {
    let db = database().await;
    let app = service!(db);

    let (status, body, cookie) = call!(app, register("Joe@Example.com"));
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["user"]["email"], "joe@example.com");
    let owner_cookie: Cookie<'static> = cookie.expect("session cookie");
    assert!(owner_cookie.http_only().unwrap_or(false));

    let (status, body, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/businesses")
            .cookie(owner_cookie.clone())
            .set_json(joes_cafe())
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "joes-cafe");
    assert_eq!(body["data"]["status"], "pending");
    let business_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body, _) = call!(app, test::TestRequest::get().uri("/api/v1/businesses?city=Phoenix"));
    assert_eq!(body["data"]["pagination"]["total"], 0);

    // Owners still see their own pending listing.
    let (_, body, _) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/businesses?owner=me")
            .cookie(owner_cookie.clone())
    );
    assert_eq!(body["data"]["businesses"][0]["id"], business_id.as_str());

    let (status, body, _) = call!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/businesses/{business_id}/status"))
            .cookie(owner_cookie.clone())
            .set_json(json!({ "status": "approved" }))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);

    let admin_hash = hash_password("admin-password").unwrap();
    db.upsert_admin("admin@example.com", &admin_hash, "Admin")
        .await
        .unwrap();
    let (status, _, admin_cookie) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "admin@example.com", "password": "admin-password" }))
    );
    assert_eq!(status, StatusCode::OK);
    let admin_cookie = admin_cookie.expect("admin session cookie");

    let (status, body, _) = call!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/businesses/{business_id}/status"))
            .cookie(admin_cookie.clone())
            .set_json(json!({ "status": "approved" }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");

    let (status, body, _) = call!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/businesses/{business_id}/status"))
            .cookie(admin_cookie)
            .set_json(json!({ "status": "approved" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Business is already approved");

    let (_, body, _) = call!(app, test::TestRequest::get().uri("/api/v1/businesses?city=phoenix"));
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["businesses"][0]["slug"], "joes-cafe");

    let (status, body, _) = call!(app, test::TestRequest::get().uri("/api/v1/businesses/joes-cafe"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner_name"], "Joe Owner");

    let (_, body, _) = call!(app, test::TestRequest::get().uri("/api/v1/businesses/search?q=pastr"));
    assert_eq!(body["data"]["businesses"][0]["slug"], "joes-cafe");
}

#[actix_rt::test]
async fn anonymous_writes_are_rejected() {
    let db = database().await;
    let app = service!(db);

    let (status, body, _) = call!(
        app,
        test::TestRequest::post().uri("/api/v1/businesses").set_json(joes_cafe())
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _, _) = call!(app, test::TestRequest::get().uri("/api/v1/auth/me"));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn script_urls_are_rejected() {
    let db = database().await;
    let app = service!(db);
    let (_, _, cookie) = call!(app, register("owner@example.com"));

    let mut listing = joes_cafe();
    listing["website"] = json!("javascript:alert(1)");
    let (status, body, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/businesses")
            .cookie(cookie.unwrap())
            .set_json(listing)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn wrong_password_and_logout() {
    let db = database().await;
    let app = service!(db);
    let (_, _, cookie) = call!(app, register("owner@example.com"));
    let cookie = cookie.unwrap();

    let (status, body, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "owner@example.com", "password": "wrong-password" }))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid email or password");

    let (status, _, cleared) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/logout")
            .cookie(cookie.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared.unwrap().value(), "");

    let (status, _, _) = call!(app, test::TestRequest::get().uri("/api/v1/auth/me").cookie(cookie));
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

async fn count_concurrent_views(db: &Database) {
    let app = service!(db);

    let requests = (0..25).map(|i| {
        let req = test::TestRequest::post()
            .uri("/api/v1/analytics/track")
            .insert_header(("X-Forwarded-For", format!("10.0.0.{i}, 172.16.0.1")))
            .set_json(json!({ "event_type": "business_view", "business_id": "biz-1" }))
            .to_request();
        test::call_service(&app, req)
    });
    for resp in join_all(requests).await {
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let today = Utc::now().date_naive();
    let per_business = CounterKey::by(BUSINESS_VIEWS, BUSINESS_DIMENSION, "biz-1");
    assert_eq!(db.daily_value(today, &per_business).await.unwrap(), 25);
    assert_eq!(
        db.daily_value(today, &CounterKey::total(BUSINESS_VIEWS)).await.unwrap(),
        25
    );
}

#[actix_rt::test]
async fn concurrent_views_are_all_counted() {
    count_concurrent_views(&database().await).await;
}

#[actix_rt::test]
async fn concurrent_views_are_all_counted_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("azbp.db").display());
    let db = Database::connect(&url, 8).await.expect("file database");
    count_concurrent_views(&db).await;
    db.close().await;
}

#[actix_rt::test]
async fn strangers_see_not_found_until_listing_is_live() {
    let db = database().await;
    let app = service!(db);
    let (_, _, owner_cookie) = call!(app, register("owner@example.com"));
    let (_, _, stranger_cookie) = call!(app, register("stranger@example.com"));
    let stranger_cookie = stranger_cookie.unwrap();

    let (_, body, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/businesses")
            .cookie(owner_cookie.unwrap())
            .set_json(joes_cafe())
    );
    let business_id = body["data"]["id"].as_str().unwrap().to_string();
    let edit = || {
        test::TestRequest::put()
            .uri(&format!("/api/v1/businesses/{business_id}"))
            .cookie(stranger_cookie.clone())
            .set_json(json!({ "phone": "555-0000" }))
    };

    let (status, pending, _) = call!(app, edit());
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, missing, _) = call!(
        app,
        test::TestRequest::put()
            .uri("/api/v1/businesses/no-such-id")
            .cookie(stranger_cookie.clone())
            .set_json(json!({ "phone": "555-0000" }))
    );
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(pending["error"], missing["error"]);

    let hash = hash_password("admin-password").unwrap();
    db.upsert_admin("admin@example.com", &hash, "Admin").await.unwrap();
    let (_, _, admin_cookie) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "admin@example.com", "password": "admin-password" }))
    );
    let (status, _, _) = call!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/api/v1/admin/businesses/{business_id}/status"))
            .cookie(admin_cookie.unwrap())
            .set_json(json!({ "status": "approved" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call!(app, edit());
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[actix_rt::test]
async fn repeat_sessions_count_one_visitor() {
    let db = database().await;
    let app = service!(db);

    for _ in 0..3 {
        let (status, body, _) = call!(
            app,
            test::TestRequest::post()
                .uri("/api/v1/analytics/track")
                .set_json(json!({ "event_type": "page_view", "page_path": "/", "session_id": "s-1" }))
        );
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["recorded"], true);
    }

    let today = Utc::now().date_naive();
    assert_eq!(db.daily_value(today, &CounterKey::total(PAGE_VIEWS)).await.unwrap(), 3);
    assert_eq!(
        db.daily_value(today, &CounterKey::total(UNIQUE_VISITORS)).await.unwrap(),
        1
    );

    let (status, _, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/analytics/track")
            .set_json(json!({ "event_type": "teleport" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let hash = hash_password("admin-password").unwrap();
    db.upsert_admin("admin@example.com", &hash, "Admin").await.unwrap();
    let (_, _, admin_cookie) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "admin@example.com", "password": "admin-password" }))
    );
    let admin_cookie = admin_cookie.unwrap();

    let (status, body, _) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/admin/analytics?period=7")
            .cookie(admin_cookie.clone())
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kpis"]["page_views"], 3);
    assert_eq!(body["data"]["kpis"]["unique_visitors"], 1);
    assert!(body["data"]["growth"]["page_views"].is_null());

    let (status, _, _) = call!(
        app,
        test::TestRequest::get()
            .uri("/api/v1/admin/analytics?period=0")
            .cookie(admin_cookie)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn pages_cover_every_listing_once() {
    let db = database().await;
    let app = service!(db);

    let hash = hash_password("admin-password").unwrap();
    db.upsert_admin("admin@example.com", &hash, "Admin").await.unwrap();
    let (_, _, admin_cookie) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "admin@example.com", "password": "admin-password" }))
    );
    let admin_cookie = admin_cookie.unwrap();

    for i in 0..7 {
        let (status, body, _) = call!(
            app,
            test::TestRequest::post()
                .uri("/api/v1/businesses")
                .cookie(admin_cookie.clone())
                .set_json(json!({ "name": format!("Shop {i}"), "city": "Tempe" }))
        );
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        let (status, _, _) = call!(
            app,
            test::TestRequest::patch()
                .uri(&format!("/api/v1/admin/businesses/{id}/status"))
                .cookie(admin_cookie.clone())
                .set_json(json!({ "status": "approved" }))
        );
        assert_eq!(status, StatusCode::OK);
    }

    let mut seen = Vec::new();
    for page in 1..=3 {
        let (_, body, _) = call!(
            app,
            test::TestRequest::get().uri(&format!("/api/v1/businesses?limit=3&page={page}"))
        );
        assert_eq!(body["data"]["pagination"]["total"], 7);
        assert_eq!(body["data"]["pagination"]["total_pages"], 3);
        for listing in body["data"]["businesses"].as_array().unwrap() {
            seen.push(listing["id"].as_str().unwrap().to_string());
        }
    }
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 7);

    let (_, body, _) = call!(app, test::TestRequest::get().uri("/api/v1/businesses?limit=abc"));
    assert_eq!(body["data"]["pagination"]["limit"], 12);
}

#[actix_rt::test]
async fn profile_and_password_changes() {
    let db = database().await;
    let app = service!(db);
    let (_, _, cookie) = call!(app, register("owner@example.com"));
    let cookie = cookie.unwrap();

    let (status, body, _) = call!(
        app,
        test::TestRequest::put()
            .uri("/api/v1/auth/profile")
            .cookie(cookie.clone())
            .set_json(json!({ "name": "  Joanna Owner " }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Joanna Owner");

    let (status, body, _) = call!(
        app,
        test::TestRequest::put()
            .uri("/api/v1/auth/password")
            .cookie(cookie.clone())
            .set_json(json!({ "current_password": "not-it", "new_password": "battery-staple" }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Current password is incorrect");

    let (status, _, _) = call!(
        app,
        test::TestRequest::put()
            .uri("/api/v1/auth/password")
            .cookie(cookie)
            .set_json(json!({ "current_password": "correct-horse", "new_password": "battery-staple" }))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = call!(
        app,
        test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(json!({ "email": "owner@example.com", "password": "battery-staple" }))
    );
    assert_eq!(status, StatusCode::OK);
}
