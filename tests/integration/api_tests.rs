//! API integration tests
//!
//! Each test boots the full router on an ephemeral port with in-memory
//! storage and locally signed tokens.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use equipment_lending_server::{
    api,
    config::AppConfig,
    models::user::Role,
    repository::Repository,
    services::{auth::JwtVerifier, Services},
    AppState,
};

const SECRET: &str = "integration-secret";

struct TestServer {
    base_url: String,
    tokens: JwtVerifier,
    client: Client,
}

impl TestServer {
    async fn start() -> Self {
        let services = Services::with_verifier(
            Repository::in_memory(),
            Arc::new(JwtVerifier::new(SECRET, 1)),
        );
        let state = AppState {
            config: Arc::new(AppConfig::default()),
            services: Arc::new(services),
        };
        let app = api::create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Server error");
        });

        Self {
            base_url: format!("http://{}/api/v1", addr),
            tokens: JwtVerifier::new(SECRET, 1),
            client: Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self, subject: &str, role: Role) -> String {
        self.tokens.issue(subject, role).expect("Failed to issue token")
    }

    async fn create_equipment(&self, name: &str, quantity: i32) -> Value {
        let response = self
            .client
            .post(self.url("/equipment"))
            .bearer_auth(self.token("admin@campus.edu", Role::Admin))
            .json(&json!({
                "name": name,
                "category": "Cameras",
                "description": "Mirrorless body with kit lens",
                "quantity": quantity
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    async fn submit_request(&self, token: &str, equipment_id: i64) -> Value {
        let response = self
            .client
            .post(self.url("/requests"))
            .bearer_auth(token)
            .json(&json!({
                "equipment_id": equipment_id,
                "request_date": "2026-03-01",
                "return_date": "2026-03-08",
                "notes": "Film project"
            }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), StatusCode::CREATED);
        response.json().await.expect("Failed to parse response")
    }

    async fn get_json(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.expect("Failed to send request");
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        (status, body)
    }
}

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await;

    let (status, body) = server.get_json("/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = server.get_json("/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_equipment_reads_are_public() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 2).await;
    server.create_equipment("Tripod", 1).await;

    let (status, body) = server.get_json("/equipment", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let path = format!("/equipment/{}", camera["id"]);
    let (status, body) = server.get_json(&path, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Camera");
    assert_eq!(body["available"], 2);

    let (status, body) = server.get_json("/equipment/search?q=MIRRORLESS", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));

    let (status, body) = server.get_json("/equipment/search?q=tri&category=cameras", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], "Tripod");

    let (status, _) = server.get_json("/equipment/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_equipment_writes_require_admin() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 1).await;
    let path = format!("/equipment/{}", camera["id"]);

    let response = server
        .client
        .delete(server.url(&path))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = server
        .client
        .delete(server.url(&path))
        .bearer_auth(server.token("staff@campus.edu", Role::Staff))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .delete(server.url(&path))
        .bearer_auth(server.token("admin@campus.edu", Role::Admin))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Equipment deleted successfully");
}

#[tokio::test]
async fn test_invalid_equipment_is_rejected() {
    let server = TestServer::start().await;

    let response = server
        .client
        .post(server.url("/equipment"))
        .bearer_auth(server.token("admin@campus.edu", Role::Admin))
        .json(&json!({ "name": "", "quantity": 1 }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_requests_require_authentication() {
    let server = TestServer::start().await;

    let (status, body) = server.get_json("/requests", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = server.get_json("/requests", Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_student_cannot_change_status() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 1).await;
    let student = server.token("s1@campus.edu", Role::Student);

    let created = server.submit_request(&student, camera["id"].as_i64().unwrap_or_default()).await;
    assert_eq!(created["status"], "PENDING");
    assert_eq!(created["requester_id"], "s1@campus.edu");

    let response = server
        .client
        .patch(server.url(&format!("/requests/{}/status", created["id"])))
        .bearer_auth(&student)
        .json(&json!({ "status": "APPROVED" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let path = format!("/equipment/{}", camera["id"]);
    let (_, body) = server.get_json(&path, None).await;
    assert_eq!(body["available"], 1);
}

#[tokio::test]
async fn test_lending_scenario() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 1).await;
    let equipment_id = camera["id"].as_i64().unwrap_or_default();
    let equipment_path = format!("/equipment/{}", equipment_id);

    let alice = server.token("alice@campus.edu", Role::Student);
    let bob = server.token("bob@campus.edu", Role::Student);
    let staff = server.token("staff@campus.edu", Role::Staff);

    let first = server.submit_request(&alice, equipment_id).await;
    let second = server.submit_request(&bob, equipment_id).await;

    // Alice sees only her own requests
    let (status, body) = server.get_json("/requests", Some(&alice)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], first["id"]);

    let (status, _) = server
        .get_json("/requests?requesterId=bob@campus.edu", Some(&alice))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = server
        .get_json("/requests?requester_id=bob@campus.edu", Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], second["id"]);

    // Approve the first request through the approvals endpoint
    let response = server
        .client
        .post(server.url(&format!("/approvals/{}/approve", first["id"])))
        .bearer_auth(&staff)
        .json(&json!({ "notes": "Pick up at the front desk" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let approved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["reviewed_by"], "staff@campus.edu");
    assert_eq!(approved["notes"], "Pick up at the front desk");
    assert_eq!(approved["request_notes"], "Film project");

    let (_, body) = server.get_json(&equipment_path, None).await;
    assert_eq!(body["available"], 0);

    // No unit left for the second request
    let response = server
        .client
        .patch(server.url(&format!("/requests/{}/status", second["id"])))
        .bearer_auth(&staff)
        .json(&json!({ "status": "APPROVED" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 8);

    // Second request is still pending and can be rejected
    let response = server
        .client
        .post(server.url(&format!("/approvals/{}/reject", second["id"])))
        .bearer_auth(&staff)
        .json(&json!({ "reason": "No units left this week" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let rejected: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(rejected["status"], "REJECTED");
    assert_eq!(rejected["reason"], "No units left this week");

    // Bob cannot return Alice's loan, Alice can
    let return_path = format!("/requests/{}/return", first["id"]);
    let response = server
        .client
        .post(server.url(&return_path))
        .bearer_auth(&bob)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .post(server.url(&return_path))
        .bearer_auth(&alice)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let returned: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(returned["status"], "RETURNED");

    let (_, body) = server.get_json(&equipment_path, None).await;
    assert_eq!(body["available"], 1);

    // Returned is terminal
    let response = server
        .client
        .patch(server.url(&format!("/requests/{}/status", first["id"])))
        .bearer_auth(&staff)
        .json(&json!({ "status": "OVERDUE" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["code"], 7);

    // Reviewer projection folds RETURNED into APPROVED
    let (status, body) = server.get_json("/approvals?status=approved", Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["id"], first["id"]);
    assert_eq!(body[0]["status"], "APPROVED");

    let (status, body) = server.get_json("/approvals", Some(&staff)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn test_unknown_status_is_bad_request() {
    let server = TestServer::start().await;
    let staff = server.token("staff@campus.edu", Role::Staff);

    let (status, _) = server.get_json("/approvals?status=LOST", Some(&staff)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let camera = server.create_equipment("Camera", 1).await;
    let student = server.token("s1@campus.edu", Role::Student);
    let created = server.submit_request(&student, camera["id"].as_i64().unwrap_or_default()).await;

    let response = server
        .client
        .patch(server.url(&format!("/requests/{}/status", created["id"])))
        .bearer_auth(&staff)
        .json(&json!({ "status": "LOST" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_for_unknown_equipment() {
    let server = TestServer::start().await;
    let student = server.token("s1@campus.edu", Role::Student);

    let response = server
        .client
        .post(server.url("/requests"))
        .bearer_auth(&student)
        .json(&json!({
            "equipment_id": 42,
            "request_date": "2026-03-01",
            "return_date": "2026-03-08"
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_is_bad_value() {
    let server = TestServer::start().await;
    let admin = server.token("admin@campus.edu", Role::Admin);

    let response = server
        .client
        .post(server.url("/equipment"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "x", "quantity": "two" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");
    assert_eq!(body["code"], 6);

    let response = server
        .client
        .post(server.url("/requests"))
        .bearer_auth(server.token("s1@campus.edu", Role::Student))
        .header("content-type", "application/json")
        .body("{\"equipment_id\": ")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");
}

#[tokio::test]
async fn test_reject_with_unreadable_body_changes_nothing() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 1).await;
    let student = server.token("s1@campus.edu", Role::Student);
    let staff = server.token("staff@campus.edu", Role::Staff);
    let created = server.submit_request(&student, camera["id"].as_i64().unwrap_or_default()).await;
    let reject_path = format!("/approvals/{}/reject", created["id"]);

    let response = server
        .client
        .post(server.url(&reject_path))
        .bearer_auth(&staff)
        .header("content-type", "text/plain")
        .body(r#"{"reason":"broken"}"#)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["error"], "BadValue");

    let response = server
        .client
        .post(server.url(&reject_path))
        .bearer_auth(&staff)
        .header("content-type", "application/json")
        .body(r#"{"reason": "#)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = server
        .get_json(&format!("/requests/{}", created["id"]), Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "PENDING");
}

#[tokio::test]
async fn test_approve_body_is_optional_but_checked() {
    let server = TestServer::start().await;
    let camera = server.create_equipment("Camera", 1).await;
    let student = server.token("s1@campus.edu", Role::Student);
    let staff = server.token("staff@campus.edu", Role::Staff);
    let created = server.submit_request(&student, camera["id"].as_i64().unwrap_or_default()).await;
    let approve_path = format!("/approvals/{}/approve", created["id"]);

    // A body that is present must parse
    let response = server
        .client
        .post(server.url(&approve_path))
        .bearer_auth(&staff)
        .header("content-type", "text/plain")
        .body("ok")
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (_, body) = server
        .get_json(&format!("/equipment/{}", camera["id"]), None)
        .await;
    assert_eq!(body["available"], 1);

    // No body at all is fine
    let response = server
        .client
        .post(server.url(&approve_path))
        .bearer_auth(&staff)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), StatusCode::OK);
    let approved: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(approved["status"], "APPROVED");
    assert_eq!(approved["notes"], Value::Null);
}
