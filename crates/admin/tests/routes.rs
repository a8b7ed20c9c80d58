//! Route tests: the admin router driven with `oneshot` against a stub user
//! service served on an ephemeral port.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use bazaar_admin::{app, config::AdminConfig, state::AppState};

// =============================================================================
// Stub backend
// =============================================================================

#[derive(Default)]
struct StubData {
    users: BTreeMap<i64, Value>,
    next_id: i64,
    deletes: Vec<i64>,
}

type Stub = Arc<Mutex<StubData>>;

fn seed() -> StubData {
    let mut users = BTreeMap::new();
    users.insert(
        1,
        json!({ "id": 1, "name": "Root Admin", "email": "root@example.com", "role": "admin" }),
    );
    for id in 2..=13 {
        users.insert(
            id,
            json!({ "id": id, "name": format!("Customer {id:02}"),
                    "email": format!("c{id}@shop.example"), "role": "customer" }),
        );
    }
    StubData {
        users,
        next_id: 100,
        deletes: Vec::new(),
    }
}

async fn create_user(State(stub): State<Stub>, Json(mut body): Json<Value>) -> Response {
    let mut data = stub.lock().unwrap();
    if data.users.values().any(|u| u["email"] == body["email"]) {
        return (StatusCode::CONFLICT, Json(json!({ "message": "Email already in use" })))
            .into_response();
    }
    if body.get("password").is_none() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "message": "password missing" })))
            .into_response();
    }
    data.next_id += 1;
    let id = data.next_id;
    body["id"] = json!(id);
    body.as_object_mut().unwrap().remove("password");
    data.users.insert(id, body.clone());
    Json(body).into_response()
}

async fn update_user(
    State(stub): State<Stub>,
    Path(id): Path<i64>,
    Json(mut body): Json<Value>,
) -> Response {
    let mut data = stub.lock().unwrap();
    if !data.users.contains_key(&id) {
        return StatusCode::NOT_FOUND.into_response();
    }
    body["id"] = json!(id);
    body["passwordChanged"] = json!(body.get("password").is_some());
    body.as_object_mut().unwrap().remove("password");
    data.users.insert(id, body.clone());
    Json(body).into_response()
}

async fn delete_user(State(stub): State<Stub>, Path(id): Path<i64>) -> StatusCode {
    let mut data = stub.lock().unwrap();
    data.deletes.push(id);
    if data.users.remove(&id).is_some() {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

fn stub_router(stub: Stub) -> Router {
    Router::new()
        .route(
            "/api/user/admin/users",
            get(|State(stub): State<Stub>| async move {
                Json(stub.lock().unwrap().users.values().cloned().collect::<Vec<_>>())
            })
            .post(create_user),
        )
        .route(
            "/api/user/admin/users/{id}",
            get(|State(stub): State<Stub>, Path(id): Path<i64>| async move {
                stub.lock().unwrap().users.get(&id).cloned().map_or_else(
                    || StatusCode::NOT_FOUND.into_response(),
                    |u| Json(u).into_response(),
                )
            })
            .put(update_user)
            .delete(delete_user),
        )
        .route(
            "/api/user/login",
            post(|Json(body): Json<Value>| async move {
                match (body["email"].as_str(), body["password"].as_str()) {
                    (Some("root@example.com"), Some("admin-pass")) => Json(json!({
                        "id": 1, "name": "Root Admin", "email": "root@example.com", "role": "admin"
                    }))
                    .into_response(),
                    (Some("c2@shop.example"), Some("customer-pass")) => Json(json!({
                        "id": 2, "name": "Customer 02", "email": "c2@shop.example", "role": "customer"
                    }))
                    .into_response(),
                    _ => (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid credentials" })))
                        .into_response(),
                }
            }),
        )
        .with_state(stub)
}

async fn spawn_stub() -> (Stub, String) {
    let stub: Stub = Arc::new(Mutex::new(seed()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = stub_router(Arc::clone(&stub));
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (stub, format!("http://{addr}/api"))
}

// =============================================================================
// Helpers
// =============================================================================

async fn admin_app() -> (Router, Stub) {
    let (stub, backend_url) = spawn_stub().await;
    let env: HashMap<&str, String> = [
        ("ADMIN_BASE_URL", "http://localhost:3001".to_string()),
        ("ADMIN_BACKEND_API_URL", backend_url),
    ]
    .into_iter()
    .collect();
    let config = AdminConfig::from_lookup(move |key: &str| env.get(key).cloned()).unwrap();
    (app(AppState::new(config).unwrap()), stub)
}

/// A browser-ish client that keeps the session cookie between requests.
struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    async fn send(&mut self, request: axum::http::request::Builder, body: Body) -> Response {
        let request = match &self.cookie {
            Some(cookie) => request.header(header::COOKIE, cookie),
            None => request,
        };
        let response = self
            .app
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri), Body::empty()).await
    }

    async fn post(&mut self, uri: &str, form: &str) -> Response {
        let request = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        self.send(request, Body::from(form.to_string())).await
    }

    /// Sign in as the seeded admin (user 1).
    async fn sign_in(&mut self) {
        let response = self
            .post("/auth/login", "email=root%40example.com&password=admin-pass")
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), "/users");
    }
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (app, _) = admin_app().await;
    let response = Browser::new(app).get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_users_requires_login() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);

    let response = browser.get("/users").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login");

    let response = browser.post("/users/2/delete", "").await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_root_redirects_to_users() {
    let (app, _) = admin_app().await;
    let response = Browser::new(app).get("/").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
}

#[tokio::test]
async fn test_bad_password_is_rejected() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    let response = browser
        .post("/auth/login", "email=root%40example.com&password=nope")
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(body_text(response).await.contains("Invalid email or password"));
}

#[tokio::test]
async fn test_customer_cannot_sign_in() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    let response = browser
        .post("/auth/login", "email=c2%40shop.example&password=customer-pass")
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_text(response).await.contains("does not have admin access"));

    let response = browser.get("/users").await;
    assert_eq!(location(&response), "/auth/login");
}

#[tokio::test]
async fn test_user_list_is_paginated() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let html = body_text(browser.get("/users").await).await;
    assert!(html.contains("Signed in as Root Admin"));
    assert!(html.contains("Customer 09"));
    assert!(!html.contains("Customer 11"));
    assert!(html.contains("1-10 of 13"));
    assert!(html.contains("href=\"/users?page=2\""));

    let html = body_text(browser.get("/users?page=2").await).await;
    assert!(html.contains("Customer 13"));
    assert!(html.contains("11-13 of 13"));
}

#[tokio::test]
async fn test_user_list_filters() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let html = body_text(browser.get("/users?q=C12%40SHOP").await).await;
    assert!(html.contains("Customer 12"));
    assert!(!html.contains("Customer 03"));

    let html = body_text(browser.get("/users?role=admin").await).await;
    assert!(html.contains("root@example.com"));
    assert!(!html.contains("Customer 02"));

    let html = body_text(browser.get("/users?q=nobody").await).await;
    assert!(html.contains("No users match."));
}

#[tokio::test]
async fn test_create_user() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post(
            "/users",
            "name=New+Person&email=new%40shop.example&role=customer&phone=&password=long-enough",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users");
    assert!(
        stub.lock()
            .unwrap()
            .users
            .values()
            .any(|u| u["email"] == "new@shop.example")
    );

    let html = body_text(browser.get("/users?q=new").await).await;
    assert!(html.contains("Added New Person"));
    assert!(html.contains("New Person"));
}

#[tokio::test]
async fn test_create_user_shows_validation_errors() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post("/users", "name=&email=bad&role=customer&password=")
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Name is required"));
    assert!(html.contains("Password is required"));
    assert_eq!(stub.lock().unwrap().next_id, 100);
}

#[tokio::test]
async fn test_create_duplicate_email_shows_backend_message() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post(
            "/users",
            "name=Dup&email=c3%40shop.example&role=customer&password=long-enough",
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("Email already in use"));
}

#[tokio::test]
async fn test_edit_form_is_prefilled() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser.get("/users/3/edit").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("value=\"c3@shop.example\""));
    assert!(html.contains("Leave blank to keep the current password."));

    let response = browser.get("/users/999/edit").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_with_blank_password_keeps_it() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post(
            "/users/3",
            "name=Renamed&email=c3%40shop.example&role=admin&phone=555&password=",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let data = stub.lock().unwrap();
    let user = &data.users[&3];
    assert_eq!(user["name"], "Renamed");
    assert_eq!(user["role"], "admin");
    assert_eq!(user["passwordChanged"], false);
}

#[tokio::test]
async fn test_update_with_blank_phone_clears_it() {
    let (app, stub) = admin_app().await;
    stub.lock().unwrap().users.get_mut(&3).unwrap()["phone"] = json!("555-0100");
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let html = body_text(browser.get("/users/3/edit").await).await;
    assert!(html.contains("value=\"555-0100\""));

    let response = browser
        .post(
            "/users/3",
            "name=Customer+03&email=c3%40shop.example&role=customer&phone=&password=",
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(stub.lock().unwrap().users[&3]["phone"], Value::Null);
}

#[tokio::test]
async fn test_admin_cannot_demote_self() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post(
            "/users/1",
            "name=Root+Admin&email=root%40example.com&role=customer&password=",
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(stub.lock().unwrap().users[&1]["role"], "admin");
}

#[tokio::test]
async fn test_delete_user() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser.post("/users/4/delete", "").await;
    assert_eq!(location(&response), "/users");
    assert!(!stub.lock().unwrap().users.contains_key(&4));

    let html = body_text(browser.get("/users").await).await;
    assert!(html.contains("User deleted"));
}

#[tokio::test]
async fn test_cannot_delete_self() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    browser.post("/users/1/delete", "").await;
    assert!(stub.lock().unwrap().deletes.is_empty());

    let html = body_text(browser.get("/users").await).await;
    assert!(html.contains("You cannot delete your own account"));
}

#[tokio::test]
async fn test_bulk_delete_skips_self_and_duplicates() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser
        .post("/users/bulk-delete", "ids=5&ids=6&ids=5&ids=1")
        .await;
    assert_eq!(location(&response), "/users");
    assert_eq!(stub.lock().unwrap().deletes, vec![5, 6]);

    let html = body_text(browser.get("/users").await).await;
    assert!(html.contains("Deleted 2 users, your own account was skipped"));
}

#[tokio::test]
async fn test_bulk_delete_with_nothing_selected() {
    let (app, stub) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    browser.post("/users/bulk-delete", "").await;
    assert!(stub.lock().unwrap().deletes.is_empty());
    let html = body_text(browser.get("/users").await).await;
    assert!(html.contains("No users selected"));
}

#[tokio::test]
async fn test_logout_ends_session() {
    let (app, _) = admin_app().await;
    let mut browser = Browser::new(app);
    browser.sign_in().await;

    let response = browser.post("/auth/logout", "").await;
    assert_eq!(location(&response), "/auth/login");

    let response = browser.get("/users").await;
    assert_eq!(location(&response), "/auth/login");
}
