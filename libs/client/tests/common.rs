//! An in-process stand in for the clinic backend, plus a recorder for the
//! alerts and navigations the client produces.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use afiya_client::{
    AfiyaClient, AfiyaClientBuilder, Alert, AlertLevel, Navigator, Notifier,
};
use afiya_proto::v1::{
    Client, ClientCreate, ClientUpdate, DoctorRegistration, EnrollRequest, LoginRequest, Program,
    ProgramCreate,
};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

pub const TEST_CSRF_TOKEN: &str = "testcsrftoken123";
pub const TEST_AUTH_TOKEN: &str = "goodtoken";
pub const TEST_USERNAME: &str = "juma";
pub const TEST_PASSWORD: &str = "correct horse";

#[derive(Default)]
pub struct Recorder {
    pub alerts: Mutex<Vec<Alert>>,
    pub navigations: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().expect("poisoned").clone()
    }

    pub fn alerts_at(&self, level: AlertLevel) -> Vec<String> {
        self.alerts()
            .into_iter()
            .filter(|a| a.level == level)
            .map(|a| a.message)
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().expect("poisoned").clone()
    }
}

impl Notifier for Recorder {
    fn notify(&self, alert: Alert) {
        self.alerts.lock().expect("poisoned").push(alert);
    }
}

impl Navigator for Recorder {
    fn navigate(&self, target: &str) {
        self.navigations
            .lock()
            .expect("poisoned")
            .push(target.to_string());
    }
}

#[derive(Default)]
pub struct Backend {
    pub programs: Vec<Program>,
    pub clients: Vec<Client>,
    pub doctors: Vec<String>,
    /// Delay the program list, to check joined fetches fail fast.
    pub slow_programs: bool,
    pub logout_fails: bool,
}

impl Backend {
    fn seeded() -> Self {
        let tb = Program {
            id: 1,
            name: "Tuberculosis".to_string(),
        };
        let hiv = Program {
            id: 2,
            name: "HIV Care".to_string(),
        };
        Backend {
            clients: vec![
                Client {
                    id: 1,
                    name: "Amina Otieno".to_string(),
                    date_of_birth: "1990-02-11".to_string(),
                    contact_info: Some("0712 000 111".to_string()),
                    enrolled_programs: vec![tb.clone()],
                },
                Client {
                    id: 2,
                    name: "Baraka Mwangi".to_string(),
                    date_of_birth: "1985-07-30".to_string(),
                    contact_info: None,
                    enrolled_programs: Vec::new(),
                },
            ],
            programs: vec![tb, hiv],
            doctors: vec![TEST_USERNAME.to_string()],
            ..Default::default()
        }
    }

    fn next_program_id(&self) -> u64 {
        self.programs.iter().map(|p| p.id).max().unwrap_or(0) + 1
    }

    fn next_client_id(&self) -> u64 {
        self.clients.iter().map(|c| c.id).max().unwrap_or(0) + 1
    }
}

pub type SharedBackend = Arc<Mutex<Backend>>;

pub struct TestEnv {
    pub client: AfiyaClient,
    pub recorder: Arc<Recorder>,
    pub backend: SharedBackend,
    pub addr: String,
}

fn not_authenticated() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"detail": "Authentication credentials were not provided."})),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))).into_response()
}

fn check_auth(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Token {}", TEST_AUTH_TOKEN);
    match headers.get(header::AUTHORIZATION) {
        Some(v) if v.as_bytes() == expected.as_bytes() => Ok(()),
        _ => Err(not_authenticated()),
    }
}

/// Field errors in a fixed order, the way the backend's serializers emit them.
fn field_errors(pairs: &[(&str, &str)]) -> Value {
    let mut map = Map::new();
    for (field, msg) in pairs {
        map.insert(field.to_string(), json!([msg]));
    }
    Value::Object(map)
}

async fn login_page() -> Response {
    (
        [(
            header::SET_COOKIE,
            format!("{}={}; Path=/", "csrftoken", TEST_CSRF_TOKEN),
        )],
        "<html><body>login</body></html>",
    )
        .into_response()
}

async fn login(headers: HeaderMap, Json(req): Json<LoginRequest>) -> Response {
    // Token authentication runs before the view, so any token that is sent
    // must still be valid, even here.
    if headers.contains_key(header::AUTHORIZATION) && check_auth(&headers).is_err() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid token."})),
        )
            .into_response();
    }
    if req.username == TEST_USERNAME && req.password == TEST_PASSWORD {
        Json(json!({
            "token": TEST_AUTH_TOKEN,
            "user_id": 7,
            "username": TEST_USERNAME,
            "email": "juma@afiya.health",
            "first_name": "Juma",
            "last_name": "Samwel"
        }))
        .into_response()
    } else {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"non_field_errors": ["Unable to log in with provided credentials."]})),
        )
            .into_response()
    }
}

async fn register(
    State(backend): State<SharedBackend>,
    Json(req): Json<DoctorRegistration>,
) -> Response {
    let mut backend = backend.lock().expect("poisoned");
    if backend.doctors.contains(&req.username) {
        return (
            StatusCode::BAD_REQUEST,
            Json(field_errors(&[(
                "username",
                "A user with that username already exists.",
            )])),
        )
            .into_response();
    }
    backend.doctors.push(req.username);
    (
        StatusCode::CREATED,
        Json(json!({"message": "Doctor registered successfully."})),
    )
        .into_response()
}

async fn logout(State(backend): State<SharedBackend>) -> Response {
    if backend.lock().expect("poisoned").logout_fails {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    } else {
        StatusCode::OK.into_response()
    }
}

async fn profile(headers: HeaderMap) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    Json(json!({
        "id": 7,
        "username": TEST_USERNAME,
        "first_name": "Juma",
        "last_name": "Samwel",
        "email": "juma@afiya.health"
    }))
    .into_response()
}

async fn program_list(State(backend): State<SharedBackend>, headers: HeaderMap) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let (slow, programs) = {
        let backend = backend.lock().expect("poisoned");
        (backend.slow_programs, backend.programs.clone())
    };
    if slow {
        tokio::time::sleep(Duration::from_secs(30)).await;
    }
    Json(programs).into_response()
}

async fn program_create(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(req): Json<ProgramCreate>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let mut backend = backend.lock().expect("poisoned");
    if backend.programs.iter().any(|p| p.name == req.name) {
        return (
            StatusCode::BAD_REQUEST,
            Json(field_errors(&[("name", "program with this name already exists.")])),
        )
            .into_response();
    }
    let program = Program {
        id: backend.next_program_id(),
        name: req.name,
    };
    backend.programs.push(program.clone());
    (StatusCode::CREATED, Json(program)).into_response()
}

async fn program_get(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let backend = backend.lock().expect("poisoned");
    match backend.programs.iter().find(|p| p.id == id) {
        Some(p) => Json(p.clone()).into_response(),
        None => not_found(),
    }
}

async fn client_list(State(backend): State<SharedBackend>, headers: HeaderMap) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let backend = backend.lock().expect("poisoned");
    Json(backend.clients.clone()).into_response()
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
}

async fn client_search(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let needle = params.q.to_lowercase();
    let backend = backend.lock().expect("poisoned");
    let found: Vec<Client> = backend
        .clients
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .cloned()
        .collect();
    Json(found).into_response()
}

fn validate_client(name: &str, date_of_birth: &str) -> Result<(), Response> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(("name", "This field may not be blank."));
    }
    if date_of_birth.len() != 10 {
        errors.push((
            "date_of_birth",
            "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.",
        ));
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err((StatusCode::BAD_REQUEST, Json(field_errors(&errors))).into_response())
    }
}

async fn client_create(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Json(req): Json<ClientCreate>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    if let Err(r) = validate_client(&req.name, &req.date_of_birth) {
        return r;
    }
    let mut backend = backend.lock().expect("poisoned");
    let client = Client {
        id: backend.next_client_id(),
        name: req.name,
        date_of_birth: req.date_of_birth,
        contact_info: req.contact_info,
        enrolled_programs: Vec::new(),
    };
    backend.clients.push(client.clone());
    (StatusCode::CREATED, Json(client)).into_response()
}

async fn client_get(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let backend = backend.lock().expect("poisoned");
    match backend.clients.iter().find(|c| c.id == id) {
        Some(c) => Json(c.clone()).into_response(),
        None => not_found(),
    }
}

async fn client_update(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(req): Json<ClientUpdate>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    if let Err(r) = validate_client(&req.name, &req.date_of_birth) {
        return r;
    }
    let mut backend = backend.lock().expect("poisoned");
    match backend.clients.iter_mut().find(|c| c.id == id) {
        Some(c) => {
            c.name = req.name;
            c.date_of_birth = req.date_of_birth;
            c.contact_info = req.contact_info;
            Json(c.clone()).into_response()
        }
        None => not_found(),
    }
}

async fn client_enroll(
    State(backend): State<SharedBackend>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(req): Json<EnrollRequest>,
) -> Response {
    if let Err(r) = check_auth(&headers) {
        return r;
    }
    let mut backend = backend.lock().expect("poisoned");
    let program = match backend.programs.iter().find(|p| p.id == req.program_id) {
        Some(p) => p.clone(),
        None => {
            return (
                StatusCode::BAD_REQUEST,
                Json(field_errors(&[(
                    "program_id",
                    "Invalid pk - object does not exist.",
                )])),
            )
                .into_response()
        }
    };
    match backend.clients.iter_mut().find(|c| c.id == id) {
        Some(c) => {
            if c.enrolled_programs.iter().any(|p| p.id == program.id) {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"non_field_errors": ["Client is already enrolled in this program."]})),
                )
                    .into_response();
            }
            c.enrolled_programs.push(program);
            Json(c.clone()).into_response()
        }
        None => not_found(),
    }
}

/* ===== routes that exercise the gateway directly ===== */

async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let mut map = Map::new();
    for (name, value) in headers.iter() {
        map.insert(
            name.as_str().to_string(),
            Value::String(String::from_utf8_lossy(value.as_bytes()).to_string()),
        );
    }
    Json(Value::Object(map))
}

async fn echo_body(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn no_content() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn not_json() -> &'static str {
    "this is not json"
}

async fn error_detail() -> Response {
    not_found()
}

async fn error_non_field() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"non_field_errors": ["a", "b"]})),
    )
        .into_response()
}

async fn error_fields() -> Response {
    let mut map = Map::new();
    map.insert("field1".to_string(), json!(["e1"]));
    map.insert("field2".to_string(), json!("e2"));
    (StatusCode::BAD_REQUEST, Json(Value::Object(map))).into_response()
}

async fn error_not_json() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Server Error (500)</h1>").into_response()
}

async fn status_only(Path(code): Path<u16>) -> Response {
    StatusCode::from_u16(code)
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        .into_response()
}

async fn forbidden_detail() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"detail": "Not authenticated"})),
    )
        .into_response()
}

pub fn router(backend: SharedBackend) -> Router {
    Router::new()
        .route("/login", get(login_page))
        .route("/afiya/login/", post(login))
        .route("/afiya/doctors/register/", post(register))
        .route("/api-auth/logout/", post(logout))
        .route("/afiya/user/profile/", get(profile))
        .route("/afiya/programs/", get(program_list).post(program_create))
        .route("/afiya/programs/:id/", get(program_get))
        .route("/afiya/clients/", get(client_list).post(client_create))
        .route("/afiya/clients/search/", get(client_search))
        .route("/afiya/clients/:id/", get(client_get).patch(client_update))
        .route("/afiya/clients/:id/enroll/", post(client_enroll))
        .route("/test/echo-headers", get(echo_headers).post(echo_headers))
        .route("/test/echo-body", post(echo_body))
        .route("/test/no-content", get(no_content).post(no_content))
        .route("/test/not-json", get(not_json))
        .route("/test/detail", get(error_detail))
        .route("/test/non-field", get(error_non_field))
        .route("/test/fields", get(error_fields))
        .route("/test/not-json-error", get(error_not_json))
        .route("/test/status/:code", get(status_only))
        .route("/test/forbidden", get(forbidden_detail).post(forbidden_detail))
        .with_state(backend)
}

/// Start a backend on an ephemeral port and a client pointed at it.
pub async fn setup_test_with(
    configure: impl FnOnce(AfiyaClientBuilder) -> AfiyaClientBuilder,
) -> TestEnv {
    let backend: SharedBackend = Arc::new(Mutex::new(Backend::seeded()));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let port = listener
        .local_addr()
        .expect("no local address")
        .port();
    let app = router(backend.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("test backend failed: {:?}", e);
        }
    });

    let addr = format!("http://127.0.0.1:{}", port);
    let recorder = Arc::new(Recorder::default());
    let builder = AfiyaClientBuilder::new()
        .address(addr.clone())
        .no_proxy()
        .notifier(recorder.clone())
        .navigator(recorder.clone())
        .redirect_delay(Duration::from_millis(100));

    let client = configure(builder)
        .build()
        .expect("failed to build test client");

    TestEnv {
        client,
        recorder,
        backend,
        addr,
    }
}

pub async fn setup_test() -> TestEnv {
    setup_test_with(|b| b).await
}

/// A client that has fetched the anti-forgery cookie and logged in.
pub async fn setup_logged_in() -> TestEnv {
    let env = setup_test().await;
    env.client
        .prime_csrf_cookie()
        .await
        .expect("failed to prime csrf cookie");
    env.client
        .login(TEST_USERNAME, TEST_PASSWORD)
        .await
        .expect("failed to login");
    env
}
