use axum::{
    extract::State,
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{authenticate, AuthUser};
use crate::config::AuthConfig;
use crate::errors::AppError;
use crate::state::AppState;
use crate::validation::QueryParams;

/// Carries the login `state` value from `/login` to `/callback`.
const STATE_COOKIE: &str = "oauth_state";
const STATE_COOKIE_PATH: &str = "/api/auth";
/// How long a started login may take before its callback is refused.
const LOGIN_STATE_TTL_SECS: i64 = 600;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

fn session_cookie(config: &AuthConfig, name: &str, value: String) -> Cookie<'static> {
    Cookie::build((name.to_string(), value))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), String::new()))
        .path("/")
        .build()
}

/// `{random}.{issued_at}`; the timestamp lets the callback refuse stale logins.
fn new_login_state(now: DateTime<Utc>) -> String {
    format!("{}.{}", Uuid::new_v4().simple(), now.timestamp())
}

/// The callback's `state` must echo the cookie set by `/login`, and be recent.
fn login_state_valid(cookie: Option<&str>, param: Option<&str>, now: DateTime<Utc>) -> bool {
    let (Some(cookie), Some(param)) = (cookie, param) else {
        return false;
    };
    if cookie.is_empty() || cookie != param {
        return false;
    }
    cookie
        .rsplit_once('.')
        .and_then(|(_, issued)| issued.parse::<i64>().ok())
        .map_or(false, |issued| {
            let age = now.timestamp() - issued;
            (0..=LOGIN_STATE_TTL_SECS).contains(&age)
        })
}

/// GET /api/auth/login
///
/// Starts the hosted-login flow with a fresh `state`, remembered in an HttpOnly cookie.
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), AppError> {
    let config = &state.config.auth;
    let login_state = new_login_state(Utc::now());
    let url = reqwest::Url::parse_with_params(
        &config.authorize_url,
        &[
            ("response_type", "code"),
            ("client_id", config.client_id.as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("scope", "openid email profile"),
            ("state", login_state.as_str()),
        ],
    )
    .map_err(|e| anyhow::anyhow!("Invalid AUTH_AUTHORIZE_URL: {e}"))?;

    let cookie = Cookie::build((STATE_COOKIE, login_state))
        .path(STATE_COOKIE_PATH)
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build();
    Ok((jar.add(cookie), Redirect::to(url.as_str())))
}

/// GET /api/auth/callback
///
/// Completes the hosted-login redirect: checks `state` against the login cookie,
/// exchanges the code, verifies the returned tokens, syncs the user row and stores
/// both tokens in HttpOnly cookies.
pub async fn handle_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    QueryParams(query): QueryParams<CallbackQuery>,
) -> Result<(CookieJar, Redirect), AppError> {
    let expected = jar.get(STATE_COOKIE).map(|c| c.value());
    if !login_state_valid(expected, query.state.as_deref(), Utc::now()) {
        warn!("Rejected auth callback with missing, stale or mismatched state");
        return Err(AppError::Unauthorized);
    }
    if let Some(error) = query.error {
        warn!("Identity provider returned error on callback: {error}");
        return Err(AppError::Unauthorized);
    }
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let tokens = state.identity.exchange_code(&code).await?;
    let user = authenticate(
        state.identity.as_ref(),
        Some(&tokens.access_token),
        Some(&tokens.id_token),
    )
    .await?;
    state.store.upsert_user(&user).await?;
    info!("User {} signed in", user.id);

    let config = &state.config.auth;
    let jar = jar
        .remove(Cookie::build(STATE_COOKIE).path(STATE_COOKIE_PATH).build())
        .add(session_cookie(config, &config.access_cookie, tokens.access_token))
        .add(session_cookie(config, &config.id_cookie, tokens.id_token));

    Ok((jar, Redirect::to(&config.post_login_redirect)))
}

/// POST /api/auth/logout
pub async fn handle_logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let config = &state.config.auth;
    let jar = jar
        .remove(removal_cookie(&config.access_cookie))
        .remove(removal_cookie(&config.id_cookie));
    (jar, Json(json!({ "success": true })))
}

/// GET /api/auth/me
pub async fn handle_me(user: AuthUser) -> Json<Value> {
    Json(json!({ "success": true, "user": user }))
}
