use axum::http::{self, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use mock_server::{app, SEED_USER_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

const USER_LOGIN: &str =
    r#"{"clientID":1,"clientSecret":"abc","username":"alice","password":"secret"}"#;
const CLIENT_LOGIN: &str = r#"{"clientID":1,"clientSecret":"abc"}"#;

async fn send(app: &Router, request: Request<String>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<String> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(body.to_string()).unwrap()
}

fn bare_request(method: &str, uri: &str, token: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(http::header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(String::new()).unwrap()
}

async fn login(app: &Router, body: &str) -> String {
    let resp = send(app, json_request("POST", "/login", None, body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let value = body_json(resp).await;
    value["token"].as_str().unwrap().to_string()
}

async fn create_post(app: &Router, token: &str, body: &str) -> u64 {
    let resp = send(app, json_request("POST", "/Post", Some(token), body)).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await["id"].as_u64().unwrap()
}

// --- login ---

#[tokio::test]
async fn login_with_user_credentials_names_the_user() {
    let app = app();
    let resp = send(&app, json_request("POST", "/login", None, USER_LOGIN)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let value = body_json(resp).await;
    assert!(!value["token"].as_str().unwrap().is_empty());
    assert_eq!(value["userID"], json!(SEED_USER_ID));
}

#[tokio::test]
async fn client_only_login_omits_the_user_id() {
    let app = app();
    let resp = send(&app, json_request("POST", "/login", None, CLIENT_LOGIN)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let value = body_json(resp).await;
    assert!(!value["token"].as_str().unwrap().is_empty());
    assert!(value.get("userID").is_none());
}

#[tokio::test]
async fn login_rejects_a_wrong_client_secret() {
    let app = app();
    let body = r#"{"clientID":1,"clientSecret":"nope"}"#;
    let resp = send(&app, json_request("POST", "/login", None, body)).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(resp).await, json!({"error": "unknown client"}));
}

#[tokio::test]
async fn login_rejects_a_wrong_password() {
    let app = app();
    let body = r#"{"clientID":1,"clientSecret":"abc","username":"alice","password":"nope"}"#;
    let resp = send(&app, json_request("POST", "/login", None, body)).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_rejects_malformed_bodies() {
    let app = app();
    let resp = send(&app, json_request("POST", "/login", None, r#"{"clientSecret":"abc"}"#)).await;

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- authentication ---

#[tokio::test]
async fn requests_without_a_token_are_unauthorized() {
    let app = app();
    let resp = send(&app, bare_request("GET", "/Post/1", None)).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unknown_tokens_are_unauthorized() {
    let app = app();
    let resp = send(&app, bare_request("GET", "/Post/1", Some("not-a-token"))).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn client_only_sessions_cannot_write() {
    let app = app();
    let token = login(&app, CLIENT_LOGIN).await;

    let resp = send(&app, json_request("POST", "/Post", Some(&token), r#"{"content":"x"}"#)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = send(&app, bare_request("DELETE", "/Post/1", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

// --- resources ---

#[tokio::test]
async fn crud_lifecycle() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;

    // create
    let id = create_post(&app, &token, r#"{"content":"hello","author":"alice"}"#).await;

    // get
    let resp = send(&app, bare_request("GET", &format!("/Post/{id}"), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"content": "hello", "author": "alice"})
    );

    // edit merges changes into the stored values
    let resp = send(
        &app,
        json_request(
            "PUT",
            &format!("/Post/{id}"),
            Some(&token),
            r#"{"content":"updated"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        body_json(resp).await,
        json!({"content": "updated", "author": "alice"})
    );

    // delete
    let resp = send(&app, bare_request("DELETE", &format!("/Post/{id}"), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // gone
    let resp = send(&app, bare_request("GET", &format!("/Post/{id}"), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // deleting again stays 404
    let resp = send(&app, bare_request("DELETE", &format!("/Post/{id}"), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn resources_are_partitioned_by_entity() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &token, r#"{"content":"hello"}"#).await;

    let resp = send(&app, bare_request("GET", &format!("/Comment/{id}"), Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- search ---

#[tokio::test]
async fn search_filters_on_equality_and_sorts_ids() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let first = create_post(&app, &token, r#"{"content":"a","author":"alice"}"#).await;
    let _second = create_post(&app, &token, r#"{"content":"b","author":"bob"}"#).await;
    let third = create_post(&app, &token, r#"{"content":"c","author":"alice"}"#).await;

    let body = r#"{"resource":"Post","parameters":{"author":"alice"}}"#;
    let resp = send(&app, json_request("POST", "/search", Some(&token), body)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([first, third]));

    let resp = send(
        &app,
        json_request("POST", "/search", Some(&token), r#"{"resource":"Post"}"#),
    )
    .await;
    assert_eq!(body_json(resp).await.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn search_requires_a_token() {
    let app = app();
    let resp = send(
        &app,
        json_request("POST", "/search", None, r#"{"resource":"Post"}"#),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- functions ---

#[tokio::test]
async fn publish_marks_the_resource() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &token, r#"{"content":"draft"}"#).await;

    let resp = send(
        &app,
        bare_request("POST", &format!("/Post/{id}/publish"), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"published": true}));

    let resp = send(&app, bare_request("GET", &format!("/Post/{id}"), Some(&token))).await;
    assert_eq!(
        body_json(resp).await,
        json!({"content": "draft", "published": true})
    );
}

#[tokio::test]
async fn publish_requires_a_user_session() {
    let app = app();
    let user_token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &user_token, r#"{"content":"draft"}"#).await;
    let client_token = login(&app, CLIENT_LOGIN).await;

    let resp = send(
        &app,
        bare_request("POST", &format!("/Post/{id}/publish"), Some(&client_token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn echo_returns_the_payload() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &token, r#"{"content":"x"}"#).await;

    let resp = send(
        &app,
        json_request(
            "POST",
            &format!("/Post/{id}/echo"),
            Some(&token),
            r#"{"hello":"world"}"#,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"echo": {"hello": "world"}}));

    let resp = send(&app, bare_request("POST", &format!("/Post/{id}/echo"), Some(&token))).await;
    assert_eq!(body_json(resp).await, json!({"echo": null}));
}

#[tokio::test]
async fn teapot_reports_its_own_status() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &token, r#"{"content":"x"}"#).await;

    let resp = send(
        &app,
        bare_request("POST", &format!("/Post/{id}/teapot"), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_json(resp).await, json!({"error": "short and stout"}));
}

#[tokio::test]
async fn unknown_functions_are_not_found() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;
    let id = create_post(&app, &token, r#"{"content":"x"}"#).await;

    let resp = send(
        &app,
        bare_request("POST", &format!("/Post/{id}/frobnicate"), Some(&token)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "no such function"}));
}

#[tokio::test]
async fn functions_require_an_existing_resource() {
    let app = app();
    let token = login(&app, USER_LOGIN).await;

    let resp = send(&app, bare_request("POST", "/Post/999/echo", Some(&token))).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
