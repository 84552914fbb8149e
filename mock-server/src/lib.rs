//! In-memory stand-in for the Solvr API.
//!
//! Speaks the same envelope contract as the real service: successes are
//! `{"data": ..., "meta": ...}`, failures are
//! `{"error": {"code", "message", "details"}}`. Writes require a bearer token;
//! any non-empty token is accepted. `/v1/unstable` always fails with a plain
//! text 502 and `/v1/garbled` with a non-UTF-8 500, so clients can exercise
//! their unstructured-error path.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub post_type: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub status: String,
    pub vote_score: i64,
}

#[derive(Deserialize)]
pub struct CreatePost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdatePost {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Deserialize)]
pub struct VoteRequest {
    #[serde(default)]
    pub direction: String,
}

/// Filters and pagination shared by list-style endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    #[serde(rename = "type")]
    pub post_type: Option<String>,
    pub status: Option<String>,
    pub tags: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub type Db = Arc<RwLock<Vec<Post>>>;

const DEFAULT_LIMIT: usize = 20;

pub const GARBLED_BODY: &[u8] = b"\xff\xfe bad gateway";

/// A handler failure rendered as an error envelope.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    Unauthorized,
    Validation { message: String, details: Value },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "authentication required".to_string(),
                None,
            ),
            AppError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                message,
                Some(details),
            ),
        };
        let mut error = json!({ "code": code, "message": message });
        if let Some(details) = details {
            error["details"] = details;
        }
        (status, Json(json!({ "error": error }))).into_response()
    }
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Vec::new()));
    Router::new()
        .route("/v1/posts", get(list_posts).post(create_post))
        .route(
            "/v1/posts/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/v1/posts/{id}/vote", axum::routing::post(vote))
        .route("/v1/search", get(search))
        .route("/v1/me", get(me))
        .route("/v1/unstable", get(unstable))
        .route("/v1/garbled", get(garbled))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn require_token(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or(AppError::Unauthorized)
}

fn post_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("post {raw} not found")))
}

fn split_tags(tags: Option<&str>) -> Vec<String> {
    tags.map(|t| {
        t.split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn page(posts: Vec<Post>, query: &ListQuery) -> Json<Value> {
    let total = posts.len();
    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    let items: Vec<Post> = posts.into_iter().skip(offset).take(limit).collect();
    let has_more = offset + items.len() < total;
    Json(json!({
        "data": items,
        "meta": { "total": total, "per_page": limit, "has_more": has_more },
    }))
}

fn matches_filters(post: &Post, query: &ListQuery) -> bool {
    let wanted_tags = split_tags(query.tags.as_deref());
    query.post_type.as_ref().is_none_or(|t| &post.post_type == t)
        && query.status.as_ref().is_none_or(|s| &post.status == s)
        && wanted_tags.iter().all(|t| post.tags.contains(t))
}

async fn list_posts(State(db): State<Db>, Query(query): Query<ListQuery>) -> Json<Value> {
    let posts = db.read().await;
    let filtered = posts
        .iter()
        .filter(|p| matches_filters(p, &query))
        .cloned()
        .collect();
    page(filtered, &query)
}

async fn search(
    State(db): State<Db>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, AppError> {
    let needle = query
        .q
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation {
            message: "q is required".to_string(),
            details: json!({ "field": "q" }),
        })?
        .to_lowercase();
    let posts = db.read().await;
    let hits = posts
        .iter()
        .filter(|p| matches_filters(p, &query))
        .filter(|p| {
            p.title.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        })
        .cloned()
        .collect();
    Ok(page(hits, &query))
}

async fn create_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
    Json(input): Json<CreatePost>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_token(&headers)?;
    if input.title.trim().is_empty() {
        return Err(AppError::Validation {
            message: "title is required".to_string(),
            details: json!({ "field": "title" }),
        });
    }
    let post = Post {
        id: Uuid::new_v4(),
        post_type: input
            .post_type
            .or(query.post_type)
            .unwrap_or_else(|| "question".to_string()),
        title: input.title,
        description: input.description,
        tags: split_tags(query.tags.as_deref()),
        status: "open".to_string(),
        vote_score: 0,
    };
    debug!(id = %post.id, "created post");
    db.write().await.push(post.clone());
    Ok((StatusCode::CREATED, Json(json!({ "data": post }))))
}

async fn get_post(State(db): State<Db>, Path(id): Path<String>) -> Result<Json<Value>, AppError> {
    let id = post_id(&id)?;
    let posts = db.read().await;
    posts
        .iter()
        .find(|p| p.id == id)
        .map(|p| Json(json!({ "data": p })))
        .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))
}

async fn update_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<UpdatePost>,
) -> Result<Json<Value>, AppError> {
    require_token(&headers)?;
    let id = post_id(&id)?;
    let mut posts = db.write().await;
    let post = posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))?;
    if let Some(title) = input.title {
        post.title = title;
    }
    if let Some(description) = input.description {
        post.description = description;
    }
    if let Some(status) = input.status {
        post.status = status;
    }
    Ok(Json(json!({ "data": post })))
}

async fn delete_post(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_token(&headers)?;
    let id = post_id(&id)?;
    let mut posts = db.write().await;
    let before = posts.len();
    posts.retain(|p| p.id != id);
    if posts.len() == before {
        return Err(AppError::NotFound(format!("post {id} not found")));
    }
    debug!(%id, "deleted post");
    Ok(StatusCode::NO_CONTENT)
}

async fn vote(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(input): Json<VoteRequest>,
) -> Result<Json<Value>, AppError> {
    require_token(&headers)?;
    let delta = match input.direction.as_str() {
        "up" => 1,
        "down" => -1,
        other => {
            return Err(AppError::Validation {
                message: "direction must be 'up' or 'down'".to_string(),
                details: json!({ "field": "direction", "value": other }),
            })
        }
    };
    let id = post_id(&id)?;
    let mut posts = db.write().await;
    let post = posts
        .iter_mut()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("post {id} not found")))?;
    post.vote_score += delta;
    Ok(Json(json!({ "data": { "vote_score": post.vote_score } })))
}

async fn me(headers: HeaderMap) -> Result<Json<Value>, AppError> {
    let token = require_token(&headers)?;
    let kind = if token.starts_with("solvr_") { "agent" } else { "human" };
    Ok(Json(json!({ "data": { "type": kind } })))
}

async fn unstable() -> (StatusCode, &'static str) {
    (StatusCode::BAD_GATEWAY, "upstream unavailable")
}

/// A 500 whose body is not valid UTF-8.
async fn garbled() -> (StatusCode, &'static [u8]) {
    (StatusCode::INTERNAL_SERVER_ERROR, GARBLED_BODY)
}
