#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use realty_desk::client::ApiClient;
use realty_desk::config::ApiConfig;
use realty_desk::session::{MemorySessionStore, SessionStore, ACCESS_KEY, REFRESH_KEY};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub query: Option<String>,
    pub body: Option<Value>,
}

/// In-process stand-in for the listing backend. Tokens are plain strings the
/// test registers up front; every request is recorded.
#[derive(Default)]
pub struct MockBackend {
    calls: Mutex<Vec<Call>>,
    valid_access: Mutex<HashSet<String>>,
    refresh_tokens: Mutex<HashMap<String, String>>,
    accounts: Mutex<HashMap<String, String>>,
    rotate_refresh: AtomicBool,
    refresh_delay_ms: AtomicU64,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn accept_access(&self, token: &str) {
        self.valid_access.lock().unwrap().insert(token.to_string());
    }

    pub fn revoke_access(&self, token: &str) {
        self.valid_access.lock().unwrap().remove(token);
    }

    /// `refresh` will mint `access`, which is also registered as valid.
    pub fn accept_refresh(&self, refresh: &str, access: &str) {
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh.to_string(), access.to_string());
    }

    /// `refresh` mints `access` but the backend keeps rejecting it.
    pub fn accept_refresh_minting_rejected(&self, refresh: &str, access: &str) {
        self.accept_refresh(refresh, access);
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(format!("{refresh}#reject"), access.to_string());
    }

    pub fn rotate_refresh_tokens(&self) {
        self.rotate_refresh.store(true, Ordering::SeqCst);
    }

    pub fn delay_refresh(&self, delay: Duration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.path == path)
            .collect()
    }

    fn record(
        &self,
        method: &'static str,
        path: &str,
        headers: &HeaderMap,
        query: Option<String>,
        body: Option<Value>,
    ) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.calls.lock().unwrap().push(Call {
            method,
            path: path.to_string(),
            authorization,
            query,
            body,
        });
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(token) = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.valid_access.lock().unwrap().contains(token)
    }
}

type Shared = Arc<MockBackend>;

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "Given token not valid for any token type" })),
    )
        .into_response()
}

fn listing(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "address": "Lenina 12",
        "deal_type": "sale",
        "status": "active",
        "district": "Central",
        "rooms": 2,
        "area": "54.50",
        "price": "7500000.00",
        "realtor": 9,
        "realtor_name": "Anna",
        "created_at": "2025-03-01T10:00:00Z"
    })
}

async fn login(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/login", &headers, None, Some(body.clone()));
    if body["email"] == "outage@example.com" {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "detail": "Authentication backend unavailable." })),
        )
            .into_response();
    }
    let seeded = (body["email"] == "user@example.com" || body["username"] == "user")
        && body["password"] == "secret";
    let registered = body["email"]
        .as_str()
        .and_then(|email| state.accounts.lock().unwrap().get(email).cloned())
        .is_some_and(|password| body["password"] == password.as_str());
    if seeded || registered {
        state.accept_access("A1");
        return Json(json!({ "access": "A1", "refresh": "R1" })).into_response();
    }
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "detail": "No active account found with the given credentials" })),
    )
        .into_response()
}

async fn refresh(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/refresh", &headers, None, Some(body.clone()));

    let delay = state.refresh_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let presented = body["refresh"].as_str().unwrap_or_default().to_string();
    let (minted, rejected) = {
        let mut tokens = state.refresh_tokens.lock().unwrap();
        let Some(minted) = tokens.get(&presented).cloned() else {
            return unauthorized();
        };
        let rejected = tokens.contains_key(&format!("{presented}#reject"));
        if state.rotate_refresh.load(Ordering::SeqCst) {
            tokens.remove(&presented);
            tokens.insert(format!("{presented}-next"), minted.clone());
        }
        (minted, rejected)
    };
    if !rejected {
        state.accept_access(&minted);
    }

    if state.rotate_refresh.load(Ordering::SeqCst) {
        Json(json!({ "access": minted, "refresh": format!("{presented}-next") })).into_response()
    } else {
        Json(json!({ "access": minted })).into_response()
    }
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    state.record("GET", "/auth/me", &headers, None, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({ "id": 9, "username": "user", "email": "user@example.com", "role": "realtor" }))
        .into_response()
}

async fn verify(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/register/verify", &headers, None, Some(body.clone()));
    if body["code"] == "123456" {
        state.accept_access("A-verified");
        return Json(json!({ "access": "A-verified", "refresh": "R-verified" })).into_response();
    }
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "code": ["Invalid or expired code."] })),
    )
        .into_response()
}

/// Accounts under `pending.` register fine but cannot sign in until verified.
async fn register(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/register", &headers, None, Some(body.clone()));
    let email = body["email"].as_str().unwrap_or_default().to_string();
    if email == "user@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "email": ["User with this email already exists."] })),
        )
            .into_response();
    }
    if !email.starts_with("pending.") {
        let password = body["password"].as_str().unwrap_or_default().to_string();
        state.accounts.lock().unwrap().insert(email.clone(), password);
    }
    (
        StatusCode::CREATED,
        Json(json!({ "id": 40, "username": body["username"].clone(), "email": email })),
    )
        .into_response()
}

async fn resend(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/register/resend", &headers, None, Some(body));
    Json(json!({ "detail": "Code sent." })).into_response()
}

async fn password_forgot(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/auth/password/forgot", &headers, None, Some(body));
    Json(json!({ "detail": "If the account exists, a code was sent." })).into_response()
}

async fn password_reset(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/auth/password/reset", &headers, None, Some(body.clone()));
    if body["code"] != "654321" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "code": ["Invalid or expired code."] })),
        )
            .into_response();
    }
    if let (Some(email), Some(password)) = (body["email"].as_str(), body["new_password"].as_str()) {
        state
            .accounts
            .lock()
            .unwrap()
            .insert(email.to_string(), password.to_string());
    }
    Json(json!({ "detail": "Password updated." })).into_response()
}

async fn property_images(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    state.record("GET", &format!("/properties/{id}/images/"), &headers, None, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!([
        { "id": 1, "image": format!("http://backend/media/properties/{id}/front.jpg"), "created_at": "2025-03-01T10:05:00Z" },
        { "id": 2, "image": format!("http://backend/media/properties/{id}/kitchen.jpg") }
    ]))
    .into_response()
}

async fn list_properties(
    State(state): State<Shared>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    state.record("GET", "/properties/", &headers, query, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "count": 2,
        "next": "http://backend/properties/?page=2",
        "previous": null,
        "results": [listing(1, "Two-room flat"), listing(2, "Loft")]
    }))
    .into_response()
}

async fn create_property(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/properties/", &headers, None, Some(body.clone()));
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if body["title"] == "Duplicate" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "title": ["Listing with this title already exists."] })),
        )
            .into_response();
    }
    let mut created = listing(31, body["title"].as_str().unwrap_or_default());
    created["price"] = body["price"].clone();
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn get_property(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    state.record("GET", &format!("/properties/{id}/"), &headers, None, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if id == 404 {
        return (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response();
    }
    Json(listing(id, "Two-room flat")).into_response()
}

async fn patch_property(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    state.record("PATCH", &format!("/properties/{id}/"), &headers, None, Some(body.clone()));
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut updated = listing(id, "Two-room flat");
    if let Some(status) = body.get("status") {
        updated["status"] = status.clone();
    }
    Json(updated).into_response()
}

async fn delete_property(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    state.record("DELETE", &format!("/properties/{id}/"), &headers, None, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    StatusCode::NO_CONTENT.into_response()
}

async fn list_showings(
    State(state): State<Shared>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Response {
    state.record("GET", "/showings/", &headers, query, None);
    if !state.authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{
            "id": 5,
            "property": 1,
            "starts_at": "2030-01-10T12:00:00Z",
            "client_name": "Irina",
            "client_phone": "+7 900 000 00 00",
            "status": "planned"
        }]
    }))
    .into_response()
}

async fn create_showing(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.record("POST", "/showings/", &headers, None, Some(body.clone()));
    if !state.authorized(&headers) {
        return unauthorized();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "id": 6,
            "property_id": body["property_id"].clone(),
            "datetime": body["datetime"].clone(),
            "client_name": body.get("client_name").cloned().unwrap_or(Value::Null),
            "status": "planned"
        })),
    )
        .into_response()
}

pub fn router(state: Shared) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(me))
        .route("/auth/register", post(register))
        .route("/auth/register/verify", post(verify))
        .route("/auth/register/resend", post(resend))
        .route("/auth/password/forgot", post(password_forgot))
        .route("/auth/password/reset", post(password_reset))
        .route("/properties/", get(list_properties).post(create_property))
        .route(
            "/properties/:id/",
            get(get_property)
                .patch(patch_property)
                .delete(delete_property),
        )
        .route("/properties/:id/images/", get(property_images))
        .route("/showings/", get(list_showings).post(create_showing))
        .with_state(state)
}

/// Serves the mock on an ephemeral port and returns its base URL.
pub async fn spawn(backend: Shared) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let app = router(backend);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend serves");
    });
    format!("http://{addr}/")
}

pub struct Harness {
    pub backend: Shared,
    pub store: Arc<MemorySessionStore>,
    pub client: ApiClient,
}

impl Harness {
    pub async fn start() -> Self {
        let backend = MockBackend::new();
        let base_url = spawn(backend.clone()).await;
        let store = Arc::new(MemorySessionStore::new());
        let api = ApiConfig::new(&base_url).expect("valid base url");
        let client = ApiClient::new(api, store.clone()).expect("client builds");
        Self {
            backend,
            store,
            client,
        }
    }

    pub fn with_tokens(&self, access: Option<&str>, refresh: Option<&str>) {
        if let Some(access) = access {
            self.store.set(ACCESS_KEY, access).unwrap();
        }
        if let Some(refresh) = refresh {
            self.store.set(REFRESH_KEY, refresh).unwrap();
        }
    }

    pub fn stored(&self, key: &str) -> Option<String> {
        self.store.get(key)
    }
}

/// Unsigned JWT carrying only `exp`.
pub fn jwt_expiring_at(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"token_type":"access","exp":{exp}}}"#));
    format!("{header}.{payload}.sig")
}
