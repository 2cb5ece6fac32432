//! Account routes: password signup/login, session-backed profile, OAuth
//! redirects and callbacks.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

use super::AppState;
use super::extract::JsonBody;
use crate::auth::oauth::{self, OAuthError, OAuthProvider, ProviderUser};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{Cookie, generate_id, read_cookie};
use crate::auth::{PublicUser, StoreError, User, ValidatedSession};
use crate::error::AppError;

const OAUTH_COOKIE_MAX_AGE: i64 = 60;
const GITHUB_STATE_COOKIE: &str = "github_oauth_state";
const GOOGLE_STATE_COOKIE: &str = "google_oauth_state";
const GOOGLE_VERIFIER_COOKIE: &str = "google_code_verifier";

pub fn router(production: bool) -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/profile", get(profile).patch(update_profile))
        .route("/github/login", get(github_login))
        .route("/github/callback", get(github_callback))
        .route("/google/login", get(google_login))
        .route("/google/callback", get(google_callback));

    if production {
        router
    } else {
        router.route("/dev-create-session", post(dev_create_session))
    }
}

fn set_cookie(cookie: &Cookie) -> AppendHeaders<[(header::HeaderName, String); 1]> {
    AppendHeaders([(header::SET_COOKIE, cookie.serialize())])
}

fn valid_name(name: &str) -> bool {
    name.chars().count() >= 2
}

fn valid_email(email: &str) -> bool {
    email.contains('@')
}

async fn require_session(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<ValidatedSession, AppError> {
    let session_id = state
        .sessions
        .read_session_cookie(headers)
        .ok_or(AppError::Unauthorized)?;
    state
        .sessions
        .validate_session(&session_id)
        .await?
        .ok_or(AppError::Unauthorized)
}

async fn start_session(state: &AppState, user_id: &str) -> Result<Cookie, AppError> {
    let session = state.sessions.create_session(user_id).await?;
    Ok(state.sessions.session_cookie(&session))
}

async fn signup(
    State(state): State<Arc<AppState>>,
    body: JsonBody,
) -> Result<Response, AppError> {
    let name = body
        .str_field("name")
        .filter(|n| valid_name(n))
        .ok_or_else(|| AppError::InvalidInput("Name must be at least 2 characters long".into()))?;
    let password = body
        .str_field("password")
        .filter(|p| p.chars().count() >= 6)
        .ok_or_else(|| {
            AppError::InvalidInput("Password must be at least 6 characters long".into())
        })?;
    let email = body
        .str_field("email")
        .filter(|e| valid_email(e))
        .ok_or_else(|| AppError::InvalidInput("Please provide a valid email".into()))?;

    let store = state.sessions.store();
    if store.find_user_by_email(email).await?.is_some() {
        return Err(AppError::InvalidInput(
            "An account with this email already exists".into(),
        ));
    }

    let local_part = email.split('@').next().unwrap_or_default();
    let user = User {
        id: generate_id(15),
        username: format!("{}{}", local_part, generate_id(4)),
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        password_hash: Some(hash_password(password)?),
        github_id: None,
        google_id: None,
    };
    let user_id = user.id.clone();
    store.create_user(user).await.map_err(|e| match e {
        StoreError::Duplicate { field: "email" } => {
            AppError::InvalidInput("An account with this email already exists".into())
        }
        other => other.into(),
    })?;
    tracing::info!(%user_id, "User signed up");

    let cookie = start_session(&state, &user_id).await?;
    Ok((
        StatusCode::CREATED,
        set_cookie(&cookie),
        Json(json!({ "ok": true, "message": "User created successfully" })),
    )
        .into_response())
}

async fn login(State(state): State<Arc<AppState>>, body: JsonBody) -> Result<Response, AppError> {
    let (Some(email), Some(password)) = (
        body.str_field("email").filter(|e| !e.is_empty()),
        body.str_field("password").filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::InvalidInput(
            "Email and password are required".into(),
        ));
    };

    let incorrect = || AppError::InvalidInput("Incorrect email or password".into());
    let user = state
        .sessions
        .store()
        .find_user_by_email(email)
        .await?
        .ok_or_else(incorrect)?;
    let hash = user.password_hash.as_deref().ok_or_else(incorrect)?;
    if !verify_password(password, hash) {
        return Err(incorrect());
    }

    let cookie = start_session(&state, &user.id).await?;
    Ok((
        set_cookie(&cookie),
        Json(json!({ "ok": true, "message": "Logged in successfully" })),
    )
        .into_response())
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session_id = state
        .sessions
        .read_session_cookie(&headers)
        .ok_or(AppError::Unauthorized)?;

    state.sessions.invalidate_session(&session_id).await?;

    let cookie = state.sessions.blank_session_cookie();
    Ok((
        set_cookie(&cookie),
        Json(json!({ "ok": true, "message": "Logged out successfully" })),
    )
        .into_response())
}

async fn profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let validated = require_session(&state, &headers).await?;
    let body = Json(json!({ "ok": true, "user": PublicUser::from(&validated.user) }));

    if validated.fresh {
        let cookie = state.sessions.session_cookie(&validated.session);
        Ok((set_cookie(&cookie), body).into_response())
    } else {
        Ok(body.into_response())
    }
}

/// `Ok(None)` when absent, `Err` when present but not a string passing `check`.
fn optional_field(
    body: &JsonBody,
    key: &str,
    check: fn(&str) -> bool,
    message: &str,
) -> Result<Option<String>, AppError> {
    match body.0.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if check(s) => Ok(Some(s.clone())),
        Some(_) => Err(AppError::InvalidInput(message.to_string())),
    }
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: JsonBody,
) -> Result<Response, AppError> {
    let validated = require_session(&state, &headers).await?;
    let user = validated.user;

    let name = optional_field(
        &body,
        "name",
        valid_name,
        "Name must be at least 2 characters long",
    )?;
    let email = optional_field(&body, "email", valid_email, "Please provide a valid email")?;

    let in_use = || AppError::InvalidInput("Email is already in use".into());
    let store = state.sessions.store();
    if let Some(email) = email.as_deref().filter(|e| Some(*e) != user.email.as_deref()) {
        if let Some(existing) = store.find_user_by_email(email).await? {
            if existing.id != user.id {
                return Err(in_use());
            }
        }
    }

    let updated = store
        .update_profile(&user.id, name, email)
        .await
        .map_err(|e| match e {
            StoreError::Duplicate { .. } => in_use(),
            other => {
                tracing::error!("Profile update failed: {}", other);
                AppError::Internal("An unknown error occurred during profile update.".into())
            }
        })?;

    Ok(Json(json!({
        "ok": true,
        "user": PublicUser::from(&updated),
        "message": "Profile updated successfully"
    }))
    .into_response())
}

fn oauth_redirect(
    provider: &dyn OAuthProvider,
    state_cookie: &str,
    code_verifier: Option<(&str, String)>,
    scopes: &[&str],
    secure: bool,
) -> Result<Response, AppError> {
    let oauth_state = oauth::generate_state();
    let url = provider
        .authorization_url(
            &oauth_state,
            code_verifier.as_ref().map(|(_, v)| v.as_str()),
            scopes,
        )
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut cookies = vec![(
        header::SET_COOKIE,
        Cookie::new(state_cookie, &oauth_state, secure)
            .with_max_age(OAUTH_COOKIE_MAX_AGE)
            .serialize(),
    )];
    if let Some((name, verifier)) = &code_verifier {
        cookies.push((
            header::SET_COOKIE,
            Cookie::new(name, verifier, secure)
                .with_max_age(OAUTH_COOKIE_MAX_AGE)
                .serialize(),
        ));
    }

    Ok((AppendHeaders(cookies), Redirect::to(url.as_str())).into_response())
}

async fn github_login(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    oauth_redirect(
        state.oauth.github.as_ref(),
        GITHUB_STATE_COOKIE,
        None,
        &["user:email"],
        state.sessions.secure_cookies(),
    )
}

async fn google_login(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    oauth_redirect(
        state.oauth.google.as_ref(),
        GOOGLE_STATE_COOKIE,
        Some((GOOGLE_VERIFIER_COOKIE, oauth::generate_code_verifier())),
        &["profile", "email"],
        state.sessions.secure_cookies(),
    )
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
    state: Option<String>,
    code: Option<String>,
}

fn invalid_callback() -> Response {
    (StatusCode::BAD_REQUEST, "Invalid state or code").into_response()
}

fn unknown_failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "An unknown error occurred").into_response()
}

#[derive(Clone, Copy)]
enum ProviderKind {
    GitHub,
    Google,
}

/// Signs in the provider identity, creating a local user on first sight.
async fn complete_oauth(
    state: &AppState,
    kind: ProviderKind,
    identity: ProviderUser,
) -> Result<Response, StoreError> {
    let store = state.sessions.store();
    let existing = match kind {
        ProviderKind::GitHub => store.find_user_by_github_id(&identity.provider_id).await?,
        ProviderKind::Google => store.find_user_by_google_id(&identity.provider_id).await?,
    };

    let user_id = match existing {
        Some(user) => user.id,
        None => {
            let (github_id, google_id) = match kind {
                ProviderKind::GitHub => (Some(identity.provider_id), None),
                ProviderKind::Google => (None, Some(identity.provider_id)),
            };
            let user = User {
                id: generate_id(15),
                username: identity.username,
                name: identity.name,
                email: identity.email,
                password_hash: None,
                github_id,
                google_id,
            };
            let id = user.id.clone();
            store.create_user(user).await?;
            id
        }
    };

    let session = match state.sessions.create_session(&user_id).await {
        Ok(session) => session,
        Err(crate::auth::AuthError::Store(e)) => return Err(e),
        Err(e) => return Err(StoreError::Unavailable(e.to_string())),
    };
    let cookie = state.sessions.session_cookie(&session);
    Ok((set_cookie(&cookie), Redirect::to("/")).into_response())
}

async fn github_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let stored_state = read_cookie(&headers, GITHUB_STATE_COOKIE);
    let (Some(stored), Some(given), Some(code)) = (stored_state, params.state, params.code) else {
        return invalid_callback();
    };
    if stored != given {
        return invalid_callback();
    }

    let identity = match state.oauth.github.validate_authorization_code(&code, None).await {
        Ok(identity) => identity,
        Err(OAuthError::Request(reason)) => {
            tracing::warn!("GitHub rejected authorization code: {}", reason);
            return (StatusCode::BAD_REQUEST, "Invalid authorization code").into_response();
        }
        Err(e) => {
            tracing::error!("GitHub OAuth error: {}", e);
            return unknown_failure();
        }
    };

    match complete_oauth(&state, ProviderKind::GitHub, identity).await {
        Ok(response) => response,
        Err(StoreError::Duplicate { .. }) => (
            StatusCode::BAD_REQUEST,
            "A user with this GitHub account already exists.",
        )
            .into_response(),
        Err(e) => {
            tracing::error!("GitHub OAuth error: {}", e);
            unknown_failure()
        }
    }
}

async fn google_callback(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let stored_state = read_cookie(&headers, GOOGLE_STATE_COOKIE);
    let verifier = read_cookie(&headers, GOOGLE_VERIFIER_COOKIE);
    let (Some(stored), Some(verifier), Some(given), Some(code)) =
        (stored_state, verifier, params.state, params.code)
    else {
        return invalid_callback();
    };
    if stored != given {
        return invalid_callback();
    }

    let result = match state
        .oauth
        .google
        .validate_authorization_code(&code, Some(&verifier))
        .await
    {
        Ok(identity) => complete_oauth(&state, ProviderKind::Google, identity)
            .await
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    result.unwrap_or_else(|e| {
        tracing::error!("Google OAuth error: {}", e);
        unknown_failure()
    })
}

async fn dev_create_session(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let user = state
        .sessions
        .store()
        .first_user()
        .await?
        .ok_or_else(|| AppError::NotFound("No users".into()))?;

    let session = state.sessions.create_session(&user.id).await?;
    let cookie = state.sessions.session_cookie(&session);
    Ok((
        set_cookie(&cookie),
        Json(json!({ "ok": true, "userId": user.id, "sessionId": session.id })),
    )
        .into_response())
}
