//!
//! issuedesk HTTP server
//! ---------------------
//! Axum-based JSON API mounting the portal screens. Every handler is a thin
//! consumer of the service layer: the session cookie resolves an identity,
//! the route guard admits or denies, and the admitted call goes straight to
//! the lifecycle/profile/provisioning services.
//!
//! Responsibilities:
//! - Session cookie + CSRF token model for browser clients.
//! - Login/logout/signup endpoints backed by the auth provider.
//! - Citizen complaint intake and listing, admin triage endpoints.
//! - Provisioning endpoint gated by the out-of-band service key.

use std::{collections::HashMap, net::SocketAddr, sync::Arc, time::Duration};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::complaints::{ComplaintService, NewComplaint};
use crate::error::PortalError;
use crate::identity::{
    admit, login_target, AuthProvider, Identity, LocalAuthProvider, RedirectTarget, RoleResolver,
    ScreenPolicy, Session, SessionManager, SignInRequest, SignUpRequest,
};
use crate::profile::{ProfileService, ProfileUpdate};
use crate::provisioning::{AdminProvisioner, AdminRegistration};
use crate::storage::MemoryBackend;

const SESSION_COOKIE: &str = "issuedesk_session";
const PROVISION_KEY_HEADER: &str = "x-provision-key";
const CSRF_HEADER: &str = "x-csrf-token";

/// Shared server state injected into all handlers.
///
/// Holds the auth provider, the single role resolver every handler consults,
/// the services, and the per-session CSRF token map.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<LocalAuthProvider>,
    pub sessions: SessionManager,
    pub roles: RoleResolver,
    pub complaints: ComplaintService,
    pub profiles: ProfileService,
    pub provisioner: Arc<AdminProvisioner>,
    /// Session token -> CSRF token mapping
    pub csrf_tokens: Arc<RwLock<HashMap<String, String>>>,
    /// Shared secret for the provisioning endpoint; None disables the route.
    pub provision_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
    pub session_ttl: Duration,
    pub provision_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { http_port: 7880, session_ttl: Duration::from_secs(60 * 60), provision_key: None }
    }
}

/// Wire the service graph over a backend. Exposed so tests and embedders can
/// assemble the same state the binary runs with.
pub fn build_state(backend: Arc<MemoryBackend>, config: &ServerConfig) -> AppState {
    let sessions = SessionManager::new(config.session_ttl);
    let roles = RoleResolver::new(backend.clone());
    let auth = Arc::new(LocalAuthProvider::new(
        backend.clone(),
        backend.clone(),
        sessions.clone(),
    ));
    let complaints = ComplaintService::new(backend.clone(), roles.clone());
    let profiles = ProfileService::new(backend.clone());
    let provisioner = Arc::new(AdminProvisioner::new(
        backend.clone(),
        backend.clone(),
        backend,
    ));
    AppState {
        auth,
        sessions,
        roles,
        complaints,
        profiles,
        provisioner,
        csrf_tokens: Arc::new(RwLock::new(HashMap::new())),
        provision_key: config.provision_key.clone(),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { "issuedesk ok" }))
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/admin/login", post(admin_login))
        .route("/auth/logout", post(logout))
        .route("/auth/csrf", get(get_csrf))
        .route("/profile", get(profile_get).post(profile_update))
        .route("/complaints", get(complaints_own).post(complaints_submit))
        .route("/admin/complaints", get(admin_complaints))
        .route("/admin/complaints/stats", get(admin_stats))
        .route("/admin/complaints/{id}/status", post(admin_update_status))
        .route("/admin/register", post(admin_register))
        .with_state(state)
}

/// Start the portal bound to the configured port.
pub async fn run_with_config(config: ServerConfig) -> anyhow::Result<()> {
    info!(
        http_port = config.http_port,
        session_ttl_secs = config.session_ttl.as_secs(),
        provisioning_enabled = config.provision_key.is_some(),
        "issuedesk starting"
    );
    let backend = Arc::new(MemoryBackend::new());
    let state = build_state(backend, &config);
    let app = router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Convenience entry point using defaults.
pub async fn run() -> anyhow::Result<()> {
    run_with_config(ServerConfig::default()).await
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct SignupPayload {
    email: String,
    password: String,
    aadhaar_number: String,
    full_name: String,
    phone: String,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie = headers.get("cookie").or_else(|| headers.get("Cookie"))?;
    let s = cookie.to_str().ok()?;
    for part in s.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

fn session_token(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, SESSION_COOKIE)
}

/// Re-read the session store on every request; never reuse a prior answer.
fn current_identity(state: &AppState, headers: &HeaderMap) -> Option<Identity> {
    let token = session_token(headers)?;
    state.sessions.current(&token)
}

async fn validate_csrf(state: &AppState, headers: &HeaderMap) -> bool {
    let Some(token) = session_token(headers) else {
        return false;
    };
    let Some(provided) = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let cmap = state.csrf_tokens.read().await;
    match cmap.get(&token) {
        Some(expected) => expected == provided,
        None => false,
    }
}

fn gen_csrf() -> String {
    let mut bytes = [0u8; 32];
    let _ = getrandom::getrandom(&mut bytes);
    let mut out = String::with_capacity(64);
    use std::fmt::Write as _;
    for b in &bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn set_session_cookie(token: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE, token
    ))
    .ok()
}

fn clear_session_cookie() -> Option<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/",
        SESSION_COOKIE
    ))
    .ok()
}

fn error_body(err: &PortalError) -> serde_json::Value {
    let mut body = json!({
        "status": "error",
        "code": err.code_str(),
        "message": err.message(),
    });
    if !err.fields().is_empty() {
        body["fields"] = json!(err.fields());
    }
    body
}

fn error_response(err: &PortalError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error_body(err))).into_response()
}

fn error_response_with_redirect(err: &PortalError, redirect: &str) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut body = error_body(err);
    body["redirect"] = json!(redirect);
    (status, Json(body)).into_response()
}

/// Admit the request against a screen policy, or produce the denial response
/// carrying the screen-specific login redirect.
fn admit_request(
    state: &AppState,
    headers: &HeaderMap,
    policy: ScreenPolicy,
) -> Result<Identity, Response> {
    let identity = current_identity(state, headers);
    admit(policy, identity, &state.roles).map_err(|err| {
        let redirect = match &err {
            // Under-privileged sessions are bounced to the citizen login.
            PortalError::Forbidden { .. } => RedirectTarget::CitizenLogin.path(),
            _ => login_target(policy).path(),
        };
        error_response_with_redirect(&err, redirect)
    })
}

async fn establish_session(state: &AppState, session: &Session) -> Response {
    let csrf = gen_csrf();
    {
        let mut cmap = state.csrf_tokens.write().await;
        cmap.insert(session.token.clone(), csrf.clone());
    }
    let mut headers = HeaderMap::new();
    if let Some(v) = set_session_cookie(&session.token) {
        headers.insert("Set-Cookie", v);
    }
    (
        StatusCode::OK,
        headers,
        Json(json!({
            "status": "ok",
            "user": { "id": session.identity.user_id, "email": session.identity.email },
            "csrf": csrf,
        })),
    )
        .into_response()
}

async fn signup(State(state): State<AppState>, Json(payload): Json<SignupPayload>) -> Response {
    let req = SignUpRequest {
        email: payload.email,
        password: payload.password,
        aadhaar_number: payload.aadhaar_number,
        full_name: payload.full_name,
        phone: payload.phone,
    };
    match state.auth.sign_up(&req) {
        Ok(session) => establish_session(&state, &session).await,
        Err(e) => error_response(&e),
    }
}

async fn login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let req = SignInRequest { email: payload.email, password: payload.password };
    match state.auth.sign_in(&req) {
        Ok(session) => establish_session(&state, &session).await,
        Err(e) => error_response(&e),
    }
}

/// Admin sign-in: real credentials first, then the capability point lookup.
/// A valid citizen credential without the admin row is signed out again and
/// denied with the generic notice — the session never survives the check.
async fn admin_login(State(state): State<AppState>, Json(payload): Json<LoginPayload>) -> Response {
    let req = SignInRequest { email: payload.email, password: payload.password };
    let session = match state.auth.sign_in(&req) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    if !state.roles.is_admin(&session.identity) {
        state.sessions.sign_out(&session.token);
        warn!(user = %session.identity.email, "admin login denied");
        return error_response_with_redirect(
            &PortalError::access_denied(),
            RedirectTarget::CitizenLogin.path(),
        );
    }
    establish_session(&state, &session).await
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if !validate_csrf(&state, &headers).await {
        return error_response(&PortalError::csrf("invalid_csrf", "invalid csrf token"));
    }
    if let Some(token) = session_token(&headers) {
        state.sessions.sign_out(&token);
        let mut cmap = state.csrf_tokens.write().await;
        cmap.remove(&token);
    }
    let mut h = HeaderMap::new();
    if let Some(v) = clear_session_cookie() {
        h.insert("Set-Cookie", v);
    }
    (StatusCode::OK, h, Json(json!({"status": "ok"}))).into_response()
}

async fn get_csrf(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if current_identity(&state, &headers).is_none() {
        return error_response(&PortalError::auth("auth_required", "sign in to continue"));
    }
    let Some(token) = session_token(&headers) else {
        return error_response(&PortalError::auth("auth_required", "sign in to continue"));
    };
    let cmap = state.csrf_tokens.read().await;
    match cmap.get(&token) {
        Some(csrf) => {
            (StatusCode::OK, Json(json!({"status": "ok", "csrf": csrf}))).into_response()
        }
        None => error_response(&PortalError::internal("csrf_missing", "csrf not available")),
    }
}

async fn profile_get(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Citizen) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    match state.profiles.fetch(&identity) {
        Ok(profile) => {
            (StatusCode::OK, Json(json!({"status": "ok", "profile": profile}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn profile_update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ProfileUpdate>,
) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Citizen) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return error_response(&PortalError::csrf("invalid_csrf", "invalid csrf token"));
    }
    match state.profiles.update(&identity, &payload) {
        Ok(profile) => {
            (StatusCode::OK, Json(json!({"status": "ok", "profile": profile}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn complaints_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewComplaint>,
) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Citizen) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return error_response(&PortalError::csrf("invalid_csrf", "invalid csrf token"));
    }
    match state.complaints.submit(&identity, &payload) {
        Ok(complaint) => {
            (StatusCode::OK, Json(json!({"status": "ok", "complaint": complaint}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn complaints_own(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Citizen) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    match state.complaints.list_own(&identity) {
        Ok(rows) => {
            (StatusCode::OK, Json(json!({"status": "ok", "complaints": rows}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn admin_complaints(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Admin) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    match state.complaints.list_all(&identity) {
        Ok(rows) => {
            (StatusCode::OK, Json(json!({"status": "ok", "complaints": rows}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn admin_stats(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Admin) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    match state.complaints.stats(&identity) {
        Ok(stats) => {
            (StatusCode::OK, Json(json!({"status": "ok", "stats": stats}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

async fn admin_update_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<uuid::Uuid>,
    Json(payload): Json<StatusPayload>,
) -> Response {
    let identity = match admit_request(&state, &headers, ScreenPolicy::Admin) {
        Ok(i) => i,
        Err(resp) => return resp,
    };
    if !validate_csrf(&state, &headers).await {
        return error_response(&PortalError::csrf("invalid_csrf", "invalid csrf token"));
    }
    match state.complaints.update_status(&identity, id, &payload.status) {
        Ok(complaint) => {
            (StatusCode::OK, Json(json!({"status": "ok", "complaint": complaint}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Provisioning surface for the privileged collaborator. Authenticated by the
/// shared service key, never by a browser session.
async fn admin_register(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AdminRegistration>,
) -> Response {
    let Some(expected) = state.provision_key.as_deref() else {
        return error_response(&PortalError::access_denied());
    };
    let provided = headers.get(PROVISION_KEY_HEADER).and_then(|v| v.to_str().ok());
    if provided != Some(expected) {
        warn!("provisioning request with missing or wrong service key");
        return error_response(&PortalError::access_denied());
    }
    match state.provisioner.register(&payload) {
        Ok(user_id) => {
            (StatusCode::OK, Json(json!({"status": "ok", "user_id": user_id}))).into_response()
        }
        Err(e) => error_response(&e),
    }
}
