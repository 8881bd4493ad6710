use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

/// The only bearer token the server accepts.
pub const VALID_TOKEN: &str = "valid-token";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "ID")]
    pub id: u64,
    pub username: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Post {
    #[serde(rename = "ID")]
    pub id: Uuid,
    pub site_id: u64,
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct NewPost {
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub number: Option<usize>,
}

pub type Db = Arc<RwLock<HashMap<u64, Vec<Post>>>>;

type ApiError = (StatusCode, Json<Value>);

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/rest/{version}/me", get(me))
        .route("/rest/{version}/sites/{site}/posts", get(list_posts))
        .route("/rest/{version}/sites/{site}/posts/new", post(create_post))
        .route("/rest/{version}/echo", post(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock REST API listening");
    }
    axum::serve(listener, app()).await
}

/// Check the bearer token: missing → 401, unknown → 403.
fn authorize(headers: &HeaderMap) -> Result<(), ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    match token {
        Some(VALID_TOKEN) => Ok(()),
        Some(_) => Err((
            StatusCode::FORBIDDEN,
            Json(json!({"error": "invalid_token", "message": "The OAuth2 token is invalid."})),
        )),
        None => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "authorization_required",
                "message": "An active access token must be used.",
            })),
        )),
    }
}

async fn me(Path(version): Path<String>, headers: HeaderMap) -> Result<Json<User>, ApiError> {
    debug!(%version, "GET /me");
    authorize(&headers)?;
    Ok(Json(User {
        id: 1,
        username: "plutonem".to_string(),
    }))
}

async fn list_posts(
    State(db): State<Db>,
    Path((_version, site)): Path<(String, u64)>,
    Query(query): Query<ListQuery>,
) -> Json<Value> {
    let posts = db.read().await;
    let all = posts.get(&site).map(Vec::as_slice).unwrap_or_default();
    let number = query.number.unwrap_or(all.len());
    let page: Vec<&Post> = all.iter().take(number).collect();
    Json(json!({"found": all.len(), "posts": page}))
}

async fn create_post(
    State(db): State<Db>,
    Path((_version, site)): Path<(String, u64)>,
    headers: HeaderMap,
    Form(input): Form<NewPost>,
) -> Result<Json<Post>, ApiError> {
    authorize(&headers)?;
    let post = Post {
        id: Uuid::new_v4(),
        site_id: site,
        title: input.title,
        content: input.content,
    };
    db.write().await.entry(site).or_default().push(post.clone());
    Ok(Json(post))
}

async fn echo(
    Path(version): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    Json(json!({"version": version, "user_agent": user_agent, "body": body}))
}
