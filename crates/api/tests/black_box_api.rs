use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use devcamper_api::app::{build_app, services::AppServices};
use devcamper_auth::{JwtClaims, UserAccount};
use devcamper_core::geo::GeoPoint;
use devcamper_core::{Collection, Document, Filter, Resource, ResourceId, UserId};
use devcamper_infra::geocoder::GeocodedAddress;
use devcamper_infra::mailer::RecordingMailer;
use devcamper_infra::{AppConfig, StaticGeocoder};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{Value, json};

const BOSTON_ADDRESS: &str = "233 Bay State Rd Boston MA 02215";
const BOSTON_ZIP: &str = "02118";
const LOWELL_ADDRESS: &str = "220 Pawtucket St, Lowell, MA 01854";
const PROVIDENCE_ADDRESS: &str = "45 Upper College Rd Kingston RI 02881";

struct TestServer {
    base_url: String,
    services: Arc<AppServices>,
    mailer: Arc<RecordingMailer>,
    upload_dir: PathBuf,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(RecordingMailer::new()).await
    }

    async fn spawn_with(mailer: RecordingMailer) -> Self {
        let upload_dir = std::env::temp_dir().join(format!("devcamper-uploads-{}", ResourceId::new()));
        let mut config = AppConfig::default();
        config.uploads.dir = upload_dir.clone();

        let mailer = Arc::new(mailer);
        let geocoder = StaticGeocoder::new()
            .with(BOSTON_ADDRESS, located(-71.1043, 42.3505))
            .with(BOSTON_ZIP, located(-71.0727, 42.3388))
            .with(LOWELL_ADDRESS, located(-71.3242, 42.6497))
            .with(PROVIDENCE_ADDRESS, located(-71.5260, 41.4807));
        let services = Arc::new(
            AppServices::in_memory(config)
                .with_mailer(mailer.clone())
                .with_geocoder(Arc::new(geocoder)),
        );

        // Same router as prod, bound to an ephemeral port.
        let app = build_app(services.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/v1", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            services,
            mailer,
            upload_dir,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Insert a user straight into the store and return a valid token for it.
    async fn user_with_role(&self, email: &str, role: &str) -> String {
        let fields = json!({
            "name": email,
            "email": email,
            "password": "123456",
            "role": role,
        });
        let account = UserAccount::from_input(fields.as_object().cloned().unwrap()).unwrap();
        let doc = self
            .services
            .store
            .insert(Collection::Users, Document::new(account.to_fields().unwrap(), Utc::now()))
            .await
            .unwrap();
        mint_jwt(&self.services.config.auth.jwt_secret, doc.id().into())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

fn located(lng: f64, lat: f64) -> GeocodedAddress {
    GeocodedAddress {
        point: GeoPoint::new(lng, lat),
        formatted_address: None,
        street: None,
        city: None,
        state: None,
        zipcode: None,
        country: None,
    }
}

fn mint_jwt(jwt_secret: &str, user: UserId) -> String {
    let claims = JwtClaims::new(user, Utc::now(), ChronoDuration::minutes(10));
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn bootcamp_body(name: &str, address: &str) -> Value {
    json!({
        "name": name,
        "description": "Full stack web development bootcamp",
        "website": "https://devworks.com",
        "address": address,
        "careers": ["Web Development", "UI/UX"],
    })
}

fn course_body(title: &str, tuition: u32) -> Value {
    json!({
        "title": title,
        "description": "Front end and back end",
        "weeks": "8",
        "tuition": tuition,
        "minimumSkill": "beginner",
    })
}

async fn create_bootcamp(client: &reqwest::Client, srv: &TestServer, token: &str, name: &str, address: &str) -> String {
    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(token)
        .json(&bootcamp_body(name, address))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn register(client: &reqwest::Client, srv: &TestServer, email: &str, role: &str) -> reqwest::Response {
    client
        .post(srv.url("/auth/register"))
        .json(&json!({ "name": "Test User", "email": email, "password": "123456", "role": role }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_served_outside_the_api_prefix() {
    let srv = TestServer::spawn().await;
    let root = srv.base_url.trim_end_matches("/api/v1");
    let res = reqwest::get(format!("{root}/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_a_session() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/bootcamps"))
        .json(&bootcamp_body("Devworks", BOSTON_ADDRESS))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Not authorized to access this route" }));

    let res = client
        .get(srv.url("/auth/me"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_sets_cookie_that_authenticates_later_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "john@gmail.com", "publisher").await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap();

    let res = client
        .get(srv.url("/auth/me"))
        .header("cookie", format!("token={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["email"], "john@gmail.com");
    assert_eq!(body["data"]["role"], "publisher");
    assert!(body["data"].get("password").is_none());
}

#[tokio::test]
async fn registration_rejects_admin_role_and_duplicate_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = register(&client, &srv, "root@gmail.com", "admin").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(register(&client, &srv, "jane@gmail.com", "user").await.status(), StatusCode::OK);
    let res = register(&client, &srv, "jane@gmail.com", "user").await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Duplicate field value entered");
}

#[tokio::test]
async fn login_checks_credentials() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@gmail.com", "user").await;

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "jane@gmail.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "jane@gmail.com", "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "jane@gmail.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn logout_overwrites_the_session_cookie() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = srv.user_with_role("jane@gmail.com", "user").await;

    let res = client
        .get(srv.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = res.headers().get("set-cookie").and_then(|v| v.to_str().ok()).unwrap();
    assert!(cookie.starts_with("token=none"));

    // The cleared cookie is not a session.
    let res = client
        .get(srv.url("/auth/me"))
        .header("cookie", "token=none")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn bootcamp_create_read_and_ownership() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner = srv.user_with_role("owner@gmail.com", "publisher").await;
    let other = srv.user_with_role("other@gmail.com", "publisher").await;
    let reader = srv.user_with_role("reader@gmail.com", "user").await;
    let admin = srv.user_with_role("admin@gmail.com", "admin").await;

    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(&reader)
        .json(&bootcamp_body("Devworks Bootcamp", BOSTON_ADDRESS))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let id = create_bootcamp(&client, &srv, &owner, "Devworks Bootcamp", BOSTON_ADDRESS).await;

    let res = client.get(srv.url(&format!("/bootcamps/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["slug"], "devworks-bootcamp");
    assert_eq!(body["data"]["location"]["coordinates"][0], -71.1043);
    assert_eq!(body["data"]["courses"], json!([]));

    // One bootcamp per publisher.
    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(&owner)
        .json(&bootcamp_body("Second Bootcamp", BOSTON_ADDRESS))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().ends_with("has already published a bootcamp"));

    let res = client
        .put(srv.url(&format!("/bootcamps/{id}")))
        .bearer_auth(&other)
        .json(&json!({ "housing": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url(&format!("/bootcamps/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Devworks Academy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["slug"], "devworks-academy");
}

#[tokio::test]
async fn bad_and_unknown_ids_are_not_found() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/bootcamps/5d713995b721c3bb38c1f5d0")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Resource not found with id of 5d713995b721c3bb38c1f5d0");

    let missing = ResourceId::new();
    let res = client.get(srv.url(&format!("/bootcamps/{missing}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], format!("Bootcamp not found with id of {missing}"));
}

#[tokio::test]
async fn list_envelope_paginates_over_the_whole_collection() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.user_with_role("admin@gmail.com", "admin").await;
    for name in ["Alpha Camp", "Bravo Camp", "Charlie Camp"] {
        create_bootcamp(&client, &srv, &admin, name, BOSTON_ADDRESS).await;
    }

    let res = client
        .get(srv.url("/bootcamps?limit=2&sort=name&select=name"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 2);
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 1.5);
    assert_eq!(body["pagination"], json!({ "next": { "page": 2, "limit": 2 } }));
    assert_eq!(body["data"][0]["name"], "Alpha Camp");
    assert!(body["data"][0].get("description").is_none());

    let res = client
        .get(srv.url("/bootcamps?limit=2&page=2&sort=name"))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["pagination"], json!({ "prev": { "page": 1, "limit": 2 } }));
    assert_eq!(body["data"][0]["name"], "Charlie Camp");

    // Totals describe the whole collection even when the filter matches nothing.
    let res = client
        .get(srv.url("/bootcamps?averageCost[gt]=999999&limit=2"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["total"], 3);
    assert_eq!(body["totalPages"], 1.5);

    let res = client.get(srv.url("/bootcamps?color=red")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn rejected_writes_leave_the_store_unchanged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner = srv.user_with_role("owner@gmail.com", "publisher").await;
    let other = srv.user_with_role("other@gmail.com", "publisher").await;

    let sent = bootcamp_body("Devworks Bootcamp", BOSTON_ADDRESS);
    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(&owner)
        .json(&sent)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Value = res.json().await.unwrap();
    let created = created["data"].clone();
    let id = created["id"].as_str().unwrap().to_string();
    for field in ["name", "description", "website", "careers"] {
        assert_eq!(created[field], sent[field], "{field}");
    }

    let read = |client: reqwest::Client, url: String| async move {
        let res = client.get(url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        body["data"].clone()
    };
    let stored = read(client.clone(), srv.url(&format!("/bootcamps/{id}"))).await;
    for (field, value) in created.as_object().unwrap() {
        assert_eq!(&stored[field], value, "{field}");
    }

    let res = client
        .put(srv.url(&format!("/bootcamps/{id}")))
        .bearer_auth(&other)
        .json(&json!({ "name": "Hijacked", "housing": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/bootcamps/{id}")))
        .bearer_auth(&other)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(read(client.clone(), srv.url(&format!("/bootcamps/{id}"))).await, stored);

    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(&owner)
        .json(&bootcamp_body("Second Bootcamp", LOWELL_ADDRESS))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let total = srv
        .services
        .store
        .count(Collection::Bootcamps, &Filter::new())
        .await
        .unwrap();
    assert_eq!(total, 1);
}

#[tokio::test]
async fn courses_follow_their_bootcamp() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner = srv.user_with_role("owner@gmail.com", "publisher").await;
    let other = srv.user_with_role("other@gmail.com", "publisher").await;
    let bootcamp = create_bootcamp(&client, &srv, &owner, "Devworks Bootcamp", BOSTON_ADDRESS).await;

    let res = client
        .post(srv.url(&format!("/bootcamps/{bootcamp}/courses")))
        .bearer_auth(&other)
        .json(&course_body("Front End Web Development", 8000))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url(&format!("/bootcamps/{bootcamp}/courses")))
        .bearer_auth(&owner)
        .json(&course_body("Front End Web Development", 8000))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let course = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url(&format!("/bootcamps/{bootcamp}/courses")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);

    let res = client.get(srv.url(&format!("/courses/{course}"))).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["bootcamp"]["name"], "Devworks Bootcamp");

    let res = client
        .put(srv.url(&format!("/courses/{course}")))
        .bearer_auth(&other)
        .json(&json!({ "tuition": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .delete(srv.url(&format!("/bootcamps/{bootcamp}")))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client.get(srv.url(&format!("/courses/{course}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn one_review_per_user_and_bootcamp() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let publisher = srv.user_with_role("owner@gmail.com", "publisher").await;
    let reviewer = srv.user_with_role("reviewer@gmail.com", "user").await;
    let stranger = srv.user_with_role("stranger@gmail.com", "user").await;
    let bootcamp = create_bootcamp(&client, &srv, &publisher, "Devworks Bootcamp", BOSTON_ADDRESS).await;
    let review = json!({ "title": "Learned a ton!", "text": "Great bootcamp", "rating": 8 });

    let res = client
        .post(srv.url(&format!("/bootcamps/{bootcamp}/reviews")))
        .bearer_auth(&publisher)
        .json(&review)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url(&format!("/bootcamps/{bootcamp}/reviews")))
        .bearer_auth(&reviewer)
        .json(&review)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/bootcamps/{bootcamp}/reviews")))
        .bearer_auth(&reviewer)
        .json(&review)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .put(srv.url(&format!("/reviews/{id}")))
        .bearer_auth(&stranger)
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .put(srv.url(&format!("/reviews/{id}")))
        .bearer_auth(&reviewer)
        .json(&json!({ "rating": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn radius_search_returns_nearby_bootcamps() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.user_with_role("admin@gmail.com", "admin").await;
    create_bootcamp(&client, &srv, &admin, "Boston Camp", BOSTON_ADDRESS).await;
    create_bootcamp(&client, &srv, &admin, "Lowell Camp", LOWELL_ADDRESS).await;
    create_bootcamp(&client, &srv, &admin, "Kingston Camp", PROVIDENCE_ADDRESS).await;

    let res = client
        .get(srv.url(&format!("/bootcamps/radius/{BOSTON_ZIP}/10")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["name"], "Boston Camp");

    let res = client
        .get(srv.url(&format!("/bootcamps/radius/{BOSTON_ZIP}/40")))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 2);

    let res = client
        .get(srv.url(&format!("/bootcamps/radius/{BOSTON_ZIP}/far")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn photo_upload_validates_before_writing() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let owner = srv.user_with_role("owner@gmail.com", "publisher").await;
    let id = create_bootcamp(&client, &srv, &owner, "Devworks Bootcamp", BOSTON_ADDRESS).await;

    let text = reqwest::multipart::Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let res = client
        .put(srv.url(&format!("/bootcamps/{id}/photo")))
        .bearer_auth(&owner)
        .multipart(reqwest::multipart::Form::new().part("file", text))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(!srv.upload_dir.exists() || std::fs::read_dir(&srv.upload_dir).unwrap().next().is_none());

    let image = reqwest::multipart::Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("camp.png")
        .mime_str("image/png")
        .unwrap();
    let res = client
        .put(srv.url(&format!("/bootcamps/{id}/photo")))
        .bearer_auth(&owner)
        .multipart(reqwest::multipart::Form::new().part("file", image))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"], format!("photo-{id}.png"));
    assert!(srv.upload_dir.join(format!("photo-{id}.png")).exists());

    let res = client.get(srv.url(&format!("/bootcamps/{id}"))).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["photo"], format!("photo-{id}.png"));

    // A replacement with another extension removes the old file.
    let jpeg = reqwest::multipart::Part::bytes(vec![0xFF, 0xD8, 0xFF])
        .file_name("camp.jpg")
        .mime_str("image/jpeg")
        .unwrap();
    let res = client
        .put(srv.url(&format!("/bootcamps/{id}/photo")))
        .bearer_auth(&owner)
        .multipart(reqwest::multipart::Form::new().part("file", jpeg))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let files: Vec<String> = std::fs::read_dir(&srv.upload_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec![format!("photo-{id}.jpg")]);
}

#[tokio::test]
async fn password_reset_round_trip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@gmail.com", "user").await;

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "nobody@gmail.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "jane@gmail.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"], "Email sent");

    let sent = srv.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@gmail.com");
    let token = sent[0]
        .body
        .split("/auth/reset-password/")
        .nth(1)
        .unwrap()
        .trim()
        .to_string();

    let res = client
        .put(srv.url(&format!("/auth/reset-password/{token}")))
        .json(&json!({ "password": "brand-new" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "jane@gmail.com", "password": "brand-new" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The token is spent.
    let res = client
        .put(srv.url(&format!("/auth/reset-password/{token}")))
        .json(&json!({ "password": "another-one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid token");
}

#[tokio::test]
async fn failed_reset_email_clears_the_token() {
    let srv = TestServer::spawn_with(RecordingMailer::failing()).await;
    let client = reqwest::Client::new();
    register(&client, &srv, "jane@gmail.com", "user").await;

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "jane@gmail.com" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Email could not be sent");

    let user = srv
        .services
        .store
        .find_one(Collection::Users, Filter::new().eq("email", "jane@gmail.com"))
        .await
        .unwrap()
        .unwrap();
    assert!(user.get("resetPasswordToken").is_none());
    assert!(user.get("resetPasswordExpire").is_none());
}

#[tokio::test]
async fn user_management_is_admin_only() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let publisher = srv.user_with_role("owner@gmail.com", "publisher").await;
    let admin = srv.user_with_role("admin@gmail.com", "admin").await;

    let res = client.get(srv.url("/users")).bearer_auth(&publisher).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(srv.url("/users"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Kevin", "email": "kevin@gmail.com", "password": "123456" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["data"]["role"], "user");
    assert!(body["data"].get("password").is_none());

    let res = client.get(srv.url("/users")).bearer_auth(&admin).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["count"], 3);
    assert!(body["data"].as_array().unwrap().iter().all(|u| u.get("password").is_none()));
}

#[tokio::test]
async fn role_changes_apply_to_existing_sessions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let admin = srv.user_with_role("admin@gmail.com", "admin").await;

    let res = register(&client, &srv, "jane@gmail.com", "user").await;
    let body: Value = res.json().await.unwrap();
    let token = body["token"].as_str().unwrap().to_string();

    let res = client.get(srv.url("/auth/me")).bearer_auth(&token).send().await.unwrap();
    let body: Value = res.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let res = client
        .put(srv.url(&format!("/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "publisher" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .post(srv.url("/bootcamps"))
        .bearer_auth(&token)
        .json(&bootcamp_body("Jane's Camp", BOSTON_ADDRESS))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
}
