use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;
use axum::{
    routing::get,
    Router,
    extract::{ State, Path },
    response::{ Html, IntoResponse, Response },
    http::{ header, HeaderMap, HeaderValue, StatusCode },
    Json,
};
use serde::{ Deserialize, Serialize };
use tower_http::cors::{ Any, CorsLayer };
use log::{ info, warn, error };
use uuid::Uuid;
use crate::config::{
    provider::{ DEFAULT_SCRIPT_SRC, STYLESHEET, STYLE_PATH, WIDGET_SCRIPT },
    ConfigurationProvider,
    NonceAge,
    NonceIssuer,
    SettingsError,
    SettingsStore,
    WidgetSettings,
    WIDGET_NONCE_ACTION,
};

pub const SESSION_COOKIE: &str = "lcw_session";
pub const ADMIN_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<SettingsStore>,
    pub nonces: Arc<NonceIssuer>,
    pub admin_api_key: Option<String>,
    pub script_src: String,
}

#[derive(Deserialize)]
pub struct VerifyNonceRequest {
    pub nonce: String,
}

#[derive(Serialize)]
struct VerifyNonceResponse {
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<&'static str>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    message: String,
}

fn error_response(code: StatusCode, message: impl Into<String>) -> Response {
    (code, Json(ErrorResponse { success: false, message: message.into() })).into_response()
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home_handler))
        .route("/pages/{slug}", get(page_handler))
        .route(STYLE_PATH, get(style_handler))
        .route(DEFAULT_SCRIPT_SRC, get(script_handler))
        .route("/admin/settings", get(get_settings_handler).post(update_settings_handler))
        .route("/admin/nonce/verify", axum::routing::post(verify_nonce_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_http_server(
    addr: SocketAddr,
    state: AppState,
    tls: Option<(String, String)>,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = build_router(state);

    match tls {
        Some((cert_path, key_path)) => {
            info!(
                "TLS enabled. Loading certificate from '{}' and key from '{}'",
                cert_path,
                key_path
            );
            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;
            info!("Starting HTTPS server on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
                error!("Failed to bind HTTP server to {}: {}. Try a different port.", addr, e);
                e
            })?;
            info!("Starting HTTP server on: http://{}", addr);
            axum::serve(listener, app.into_make_service()).await?;
        }
    }

    Ok(())
}

fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let mut kv = pair.trim().splitn(2, '=');
            match (kv.next(), kv.next()) {
                (Some(SESSION_COOKIE), Some(value)) if !value.is_empty() => Some(value.to_string()),
                _ => None,
            }
        })
        .next()
}

async fn render_page(state: &AppState, slug: &str, headers: &HeaderMap) -> Response {
    let (session, is_new) = match session_from_headers(headers) {
        Some(session) => (session, false),
        None => (Uuid::new_v4().to_string(), true),
    };

    let provider = ConfigurationProvider::new(
        state.settings.get().await,
        state.nonces.clone(),
        state.script_src.clone()
    );
    let html = match provider.render_page(slug, &session) {
        Ok(html) => html,
        Err(e) => {
            error!("Failed to render page '{}': {}", slug, e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Page render failed");
        }
    };

    let mut response = Html(html).into_response();
    if is_new {
        let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, session);
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

async fn home_handler(State(state): State<AppState>, headers: HeaderMap) -> Response {
    render_page(&state, "", &headers).await
}

async fn page_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Response {
    render_page(&state, &slug, &headers).await
}

async fn style_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLESHEET)
}

async fn script_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], WIDGET_SCRIPT)
}

fn is_admin(state: &AppState, headers: &HeaderMap) -> bool {
    match &state.admin_api_key {
        None => true,
        Some(required) => {
            headers
                .get(ADMIN_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
                == Some(required.as_str())
        }
    }
}

async fn get_settings_handler(State(state): State<AppState>) -> Json<WidgetSettings> {
    Json(state.settings.get().await)
}

async fn update_settings_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(settings): Json<WidgetSettings>,
) -> Response {
    if !is_admin(&state, &headers) {
        warn!("Rejected settings update: bad or missing API key");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match state.settings.update(settings).await {
        Ok(saved) => Json(saved).into_response(),
        Err(e @ SettingsError::InvalidApiUrl { .. }) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            error!("Failed to save settings to {}: {}", state.settings.path().display(), e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save settings")
        }
    }
}

async fn verify_nonce_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<VerifyNonceRequest>,
) -> Json<VerifyNonceResponse> {
    let session = session_from_headers(&headers).unwrap_or_default();
    let age = state.nonces.verify(&req.nonce, WIDGET_NONCE_ACTION, &session).ok();
    Json(VerifyNonceResponse {
        valid: age.is_some(),
        age: age.map(|a| match a {
            NonceAge::Current => "current",
            NonceAge::Previous => "previous",
        }),
    })
}
