//! In-memory store server used to exercise the client end to end.
//!
//! Serves the resource wire protocol with one seeded API client and one
//! seeded user. Logins mint bearer tokens; every other endpoint requires
//! one, and writes additionally require a user session.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;
use uuid::Uuid;

pub const SEED_CLIENT_ID: u64 = 1;
pub const SEED_CLIENT_SECRET: &str = "abc";
pub const SEED_USERNAME: &str = "alice";
pub const SEED_PASSWORD: &str = "secret";
pub const SEED_USER_ID: u64 = 42;

pub type JsonObject = Map<String, Value>;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(rename = "clientID")]
    pub client_id: u64,
    #[serde(rename = "clientSecret")]
    pub client_secret: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub resource: String,
    #[serde(default)]
    pub parameters: JsonObject,
}

#[derive(Clone, Debug)]
struct SessionRecord {
    user_id: Option<u64>,
}

/// Everything the server remembers, reset per [`app`] instance.
#[derive(Default)]
pub struct Store {
    sessions: HashMap<String, SessionRecord>,
    resources: HashMap<(String, u64), JsonObject>,
    next_id: u64,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/login", post(login))
        .route("/search", post(search))
        .route("/{resource}", post(create_resource))
        .route(
            "/{resource}/{id}",
            get(get_resource).put(edit_resource).delete(delete_resource),
        )
        .route("/{resource}/{id}/{function}", post(perform_function))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": message})))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn authenticate(
    db: &Db,
    headers: &HeaderMap,
) -> Result<SessionRecord, (StatusCode, Json<Value>)> {
    let token = bearer_token(headers)
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "missing bearer token"))?;
    let store = db.read().await;
    store
        .sessions
        .get(token)
        .cloned()
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "unknown session token"))
}

fn require_user(session: &SessionRecord) -> Result<(), (StatusCode, Json<Value>)> {
    if session.user_id.is_some() {
        Ok(())
    } else {
        Err(error_response(
            StatusCode::FORBIDDEN,
            "a user session is required for writes",
        ))
    }
}

async fn login(
    State(db): State<Db>,
    Json(input): Json<LoginRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if input.client_id != SEED_CLIENT_ID || input.client_secret != SEED_CLIENT_SECRET {
        return Err(error_response(StatusCode::UNAUTHORIZED, "unknown client"));
    }
    let user_id = match (&input.username, &input.password) {
        (None, None) => None,
        (Some(username), Some(password))
            if username.as_str() == SEED_USERNAME && password.as_str() == SEED_PASSWORD =>
        {
            Some(SEED_USER_ID)
        }
        _ => return Err(error_response(StatusCode::UNAUTHORIZED, "bad user credentials")),
    };
    let token = Uuid::new_v4().to_string();
    db.write()
        .await
        .sessions
        .insert(token.clone(), SessionRecord { user_id });
    debug!(user = ?user_id, "session issued");
    let mut body = json!({"token": token});
    if let Some(id) = user_id {
        body["userID"] = json!(id);
    }
    Ok(Json(body))
}

async fn search(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<SearchRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    authenticate(&db, &headers).await?;
    let store = db.read().await;
    let mut ids: Vec<u64> = store
        .resources
        .iter()
        .filter(|((name, _), values)| {
            *name == input.resource
                && input
                    .parameters
                    .iter()
                    .all(|(key, expected)| values.get(key) == Some(expected))
        })
        .map(|((_, id), _)| *id)
        .collect();
    ids.sort_unstable();
    Ok(Json(json!(ids)))
}

async fn create_resource(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(resource): Path<String>,
    Json(values): Json<JsonObject>,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let session = authenticate(&db, &headers).await?;
    require_user(&session)?;
    let mut store = db.write().await;
    store.next_id += 1;
    let id = store.next_id;
    store.resources.insert((resource.clone(), id), values);
    debug!(%resource, id, "resource created");
    Ok((StatusCode::CREATED, Json(json!({"id": id}))))
}

async fn get_resource(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<Json<JsonObject>, (StatusCode, Json<Value>)> {
    authenticate(&db, &headers).await?;
    let store = db.read().await;
    store
        .resources
        .get(&(resource, id))
        .cloned()
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "no such resource"))
}

async fn edit_resource(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, u64)>,
    Json(changes): Json<JsonObject>,
) -> Result<Json<JsonObject>, (StatusCode, Json<Value>)> {
    let session = authenticate(&db, &headers).await?;
    require_user(&session)?;
    let mut store = db.write().await;
    let values = store
        .resources
        .get_mut(&(resource, id))
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "no such resource"))?;
    for (key, value) in changes {
        values.insert(key, value);
    }
    Ok(Json(values.clone()))
}

async fn delete_resource(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((resource, id)): Path<(String, u64)>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let session = authenticate(&db, &headers).await?;
    require_user(&session)?;
    let mut store = db.write().await;
    store
        .resources
        .remove(&(resource, id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "no such resource"))
}

async fn perform_function(
    State(db): State<Db>,
    headers: HeaderMap,
    Path((resource, id, function)): Path<(String, u64, String)>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<Value>)> {
    let session = authenticate(&db, &headers).await?;
    let payload: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).map_err(|_| {
            error_response(StatusCode::BAD_REQUEST, "function payload is not valid JSON")
        })?
    };
    let mut store = db.write().await;
    if !store.resources.contains_key(&(resource.clone(), id)) {
        return Err(error_response(StatusCode::NOT_FOUND, "no such resource"));
    }
    match function.as_str() {
        "publish" => {
            require_user(&session)?;
            if let Some(values) = store.resources.get_mut(&(resource, id)) {
                values.insert("published".to_string(), json!(true));
            }
            Ok((StatusCode::OK, Json(json!({"published": true}))))
        }
        "echo" => Ok((StatusCode::OK, Json(json!({"echo": payload})))),
        "teapot" => Ok((
            StatusCode::IM_A_TEAPOT,
            Json(json!({"error": "short and stout"})),
        )),
        _ => Err(error_response(StatusCode::NOT_FOUND, "no such function")),
    }
}
