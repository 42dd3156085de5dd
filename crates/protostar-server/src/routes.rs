//! HTTP routes and handlers

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use protostar_classifiers::HateAssessment;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::accounts::{self, validate_email, validate_registration};
use crate::state::AppState;
use crate::store::{NewUser, Post, StoreError, User, UserUpdate};

pub fn create_router(state: AppState) -> Router {
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/account", get(account).put(update_account))
        .route("/score", post(score))
        .route("/posts", get(list_posts).post(create_post))
        .route("/posts/:id", get(get_post))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(body_limit)),
        )
        .with_state(state)
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics_handle.render()
}

/// Public view of an account; never includes the password hash
#[derive(Debug, Serialize)]
struct UserView {
    id: u64,
    username: String,
    email: String,
    image_file: String,
    hate_level: f64,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            image_file: user.image_file,
            hate_level: user.hate_level,
        }
    }
}

#[derive(Debug, Serialize)]
struct PostView {
    id: u64,
    date_posted: chrono::DateTime<chrono::Utc>,
    content: String,
    hate_level: f64,
    user_id: u64,
    author: String,
}

impl PostView {
    fn new(post: Post, state: &AppState) -> Self {
        let author = state
            .store
            .user(post.user_id)
            .map(|u| u.username)
            .unwrap_or_default();

        Self {
            id: post.id,
            date_posted: post.date_posted,
            content: post.content,
            hate_level: post.hate_level,
            user_id: post.user_id,
            author,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
    confirm_password: String,
}

async fn register(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;
    metrics::counter!("protostar_requests_total", "endpoint" => "register").increment(1);

    if current_user(&state, &headers).is_some() {
        return Err(AppError::InvalidRequest("Already logged in".to_string()));
    }
    validate_registration(&req.username, &req.email, &req.password, &req.confirm_password)
        .map_err(AppError::InvalidRequest)?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || accounts::hash_password(&password))
        .await?
        .map_err(AppError::Internal)?;

    let user = state.store.create_user(NewUser {
        username: req.username,
        email: req.email,
        password_hash,
    })?;
    info!(user_id = user.id, "Account created for {}", user.username);

    Ok((StatusCode::CREATED, Json(UserView::from(user))).into_response())
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
    #[serde(default)]
    remember: bool,
}

#[derive(Debug, Serialize)]
struct LoginResponse {
    token: String,
    user: UserView,
}

async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(req) = payload?;
    metrics::counter!("protostar_requests_total", "endpoint" => "login").increment(1);

    let failed =
        || AppError::Unauthorized("Login unsuccessful. Please check username and password".into());

    let user = state.store.user_by_username(&req.username);
    let stored_hash = user.as_ref().map(|u| u.password.clone());
    let password = req.password;
    let verified = tokio::task::spawn_blocking(move || match stored_hash {
        Some(hash) => accounts::verify_password(&password, &hash),
        None => accounts::verify_unknown_user(&password),
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!("Failed login for {}", req.username);
            return Err(failed());
        }
    };

    let token = state.sessions.create(user.id, req.remember);
    debug!(user_id = user.id, remember = req.remember, "Session started");

    Ok(Json(LoginResponse {
        token,
        user: user.into(),
    }))
}

async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Missing bearer token".to_string()))?;

    if !state.sessions.revoke(token) {
        return Err(AppError::Unauthorized("Unknown session".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn account(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UserView>, AppError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(user.into()))
}

#[derive(Debug, Deserialize)]
struct AccountUpdateRequest {
    #[serde(default)]
    hate_level: Option<f64>,
    #[serde(default)]
    email: Option<String>,
}

async fn update_account(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AccountUpdateRequest>, JsonRejection>,
) -> Result<Json<UserView>, AppError> {
    let user = require_user(&state, &headers)?;
    let Json(req) = payload?;

    if let Some(level) = req.hate_level {
        if !level.is_finite() || !(0.0..=100.0).contains(&level) {
            return Err(AppError::InvalidRequest(
                "hate_level must be between 0 and 100".to_string(),
            ));
        }
    }
    if let Some(email) = &req.email {
        validate_email(email).map_err(AppError::InvalidRequest)?;
    }

    let updated = state.store.update_user(
        user.id,
        UserUpdate {
            email: req.email,
            hate_level: req.hate_level,
        },
    )?;
    info!(user_id = updated.id, hate_level = updated.hate_level, "Account updated");

    Ok(Json(updated.into()))
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    post: String,
}

#[derive(Debug, Serialize)]
struct ScoreResponse {
    /// Probability of the hateful class
    prediction: f64,
    hate_score: f64,
    label: &'static str,
    flagged_terms: Vec<(String, f64)>,
}

async fn score(
    State(state): State<AppState>,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<ScoreResponse>, AppError> {
    let Json(req) = payload?;
    metrics::counter!("protostar_requests_total", "endpoint" => "score").increment(1);

    let assessment = run_scoring(&state, req.post).await?;

    Ok(Json(ScoreResponse {
        prediction: assessment.probability,
        hate_score: assessment.hate_score,
        label: assessment.label,
        flagged_terms: assessment.flagged_terms,
    }))
}

#[derive(Debug, Deserialize)]
struct CreatePostRequest {
    content: String,
}

async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    metrics::counter!("protostar_requests_total", "endpoint" => "create_post").increment(1);

    let user = require_user(&state, &headers)?;
    let Json(req) = payload?;

    if req.content.trim().is_empty() {
        return Err(AppError::InvalidRequest("Post content is required".to_string()));
    }
    let max_chars = state.config.max_post_chars;
    if req.content.chars().count() > max_chars {
        return Err(AppError::InvalidRequest(format!(
            "Post content must be at most {max_chars} characters"
        )));
    }

    let assessment = run_scoring(&state, req.content.clone()).await?;
    let post = state
        .store
        .add_post(user.id, req.content, assessment.hate_score)?;

    metrics::counter!("protostar_posts_total", "label" => assessment.label).increment(1);
    info!(
        post_id = post.id,
        user_id = user.id,
        hate_level = post.hate_level,
        "Post created"
    );

    Ok((StatusCode::CREATED, Json(PostView::new(post, &state))).into_response())
}

#[derive(Debug, Deserialize)]
struct FeedQuery {
    #[serde(default)]
    limit: Option<usize>,
}

async fn list_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<FeedQuery>, QueryRejection>,
) -> Result<Json<Vec<PostView>>, AppError> {
    let Query(query) = query?;
    metrics::counter!("protostar_requests_total", "endpoint" => "list_posts").increment(1);

    let max_hate_level = current_user(&state, &headers).map(|u| u.hate_level);
    let limit = query
        .limit
        .unwrap_or(state.config.feed_limit)
        .min(state.config.feed_limit);

    let posts = state
        .store
        .posts(max_hate_level, limit)
        .into_iter()
        .map(|p| PostView::new(p, &state))
        .collect();

    Ok(Json(posts))
}

async fn get_post(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<PostView>, AppError> {
    let Path(id) = id?;
    let post = state
        .store
        .post(id)
        .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))?;
    Ok(Json(PostView::new(post, &state)))
}

async fn fallback() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// Score text off the async runtime and record scoring metrics
async fn run_scoring(state: &AppState, text: String) -> Result<HateAssessment, AppError> {
    let pipeline = state.pipeline.clone();
    let assessment = tokio::task::spawn_blocking(move || pipeline.score(&text)).await??;

    metrics::histogram!("protostar_scoring_latency_us").record(assessment.latency_us as f64);
    metrics::histogram!("protostar_hate_score").record(assessment.hate_score);
    Ok(assessment)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The logged-in user, if the request carries a live session token.
///
/// A token that no longer resolves is treated as unauthenticated.
fn current_user(state: &AppState, headers: &HeaderMap) -> Option<User> {
    let user_id = bearer_token(headers).and_then(|t| state.sessions.resolve(t))?;
    state.store.user(user_id)
}

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    current_user(state, headers)
        .ok_or_else(|| AppError::Unauthorized("Please log in to access this page.".to_string()))
}

/// Error handling
#[derive(Debug)]
pub enum AppError {
    InvalidRequest(String),
    Unauthorized(String),
    Conflict(String),
    NotFound(String),
    Scoring(protostar_core::Error),
    Internal(String),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            StoreError::NotFound(msg) => AppError::NotFound(format!("{msg} not found")),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidRequest(rejection.body_text())
    }
}

impl From<protostar_core::Error> for AppError {
    fn from(err: protostar_core::Error) -> Self {
        AppError::Scoring(err)
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, "invalid_request_error", msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "authentication_error", msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "conflict_error", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found_error", msg),
            AppError::Scoring(err) => {
                let kind = if err.is_feature_mismatch() {
                    "feature_mismatch"
                } else {
                    "scoring_error"
                };
                error!("Scoring failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, kind, err.to_string())
            }
            AppError::Internal(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };
        metrics::counter!("protostar_errors_total", "type" => kind).increment(1);

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
