use axum::http::{self, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use http_body_util::BodyExt;
use mock_server::{app, MOCK_API_KEY, MOCK_ORGANIZATION_ID};
use serde_json::{json, Value};
use tower::ServiceExt;

fn auth(key: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{key}:")))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, auth(MOCK_API_KEY))
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.map(|b| b.to_string()).unwrap_or_default())
        .unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(request(method, uri, body)).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

async fn new_project(app: &Router) -> String {
    let (status, project) = send(
        app,
        "POST",
        &format!("/v1/organizations/{MOCK_ORGANIZATION_ID}/projects"),
        Some(json!({"name": "Clinic"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    project["id"].as_str().unwrap().to_string()
}

// --- auth ---

#[tokio::test]
async fn missing_credentials_are_unauthorized() {
    let resp = app()
        .oneshot(Request::builder().uri("/v1/projects").body(String::new()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn wrong_key_is_unauthorized() {
    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/v1/projects")
                .header(http::header::AUTHORIZATION, auth("other-key"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- projects ---

#[tokio::test]
async fn seeded_organization_is_listed() {
    let app = app();
    let (status, body) = send(&app, "GET", "/v1/organizations", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["id"], MOCK_ORGANIZATION_ID);
    assert_eq!(body["truncated"], false);
}

#[tokio::test]
async fn project_is_addressable_after_creation() {
    let app = app();
    let pid = new_project(&app).await;

    let (status, project) = send(&app, "GET", &format!("/v1/projects/{pid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(project["name"], "Clinic");
    assert_eq!(project["organization_id"], MOCK_ORGANIZATION_ID);

    let (_, listed) = send(
        &app,
        "GET",
        &format!("/v1/organizations/{MOCK_ORGANIZATION_ID}/projects"),
        None,
    )
    .await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

// --- contacts ---

#[tokio::test]
async fn contact_crud_and_filters() {
    let app = app();
    let pid = new_project(&app).await;
    let contacts = format!("/v1/projects/{pid}/contacts");

    let (_, ana) = send(
        &app,
        "POST",
        &contacts,
        Some(json!({"phone_number": "+15550001", "name": "Ana", "vars": {"city": "Lima"}})),
    )
    .await;
    send(&app, "POST", &contacts, Some(json!({"phone_number": "+15550002", "name": "Bea"}))).await;
    let cid = ana["id"].as_str().unwrap();

    let (_, filtered) = send(&app, "GET", &format!("{contacts}?name%5Bprefix%5D=A"), None).await;
    assert_eq!(filtered["data"].as_array().unwrap().len(), 1);
    let (_, by_var) = send(&app, "GET", &format!("{contacts}?vars%5Bcity%5D=Lima"), None).await;
    assert_eq!(by_var["data"][0]["id"], cid);
    let (_, count) = send(&app, "GET", &format!("{contacts}?count=1"), None).await;
    assert_eq!(count, json!({"count": 2}));

    let (status, updated) = send(
        &app,
        "POST",
        &format!("{contacts}/{cid}"),
        Some(json!({"name": "Ana Maria", "vars": {"city": null}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ana Maria");
    assert_eq!(updated["vars"], json!({}));

    let (status, _) = send(&app, "DELETE", &format!("{contacts}/{cid}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, "GET", &format!("{contacts}/{cid}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn group_membership_round_trip() {
    let app = app();
    let pid = new_project(&app).await;
    let (_, group) = send(
        &app,
        "POST",
        &format!("/v1/projects/{pid}/groups"),
        Some(json!({"name": "Staff"})),
    )
    .await;
    let (_, contact) = send(
        &app,
        "POST",
        &format!("/v1/projects/{pid}/contacts"),
        Some(json!({"phone_number": "+15550001"})),
    )
    .await;
    let gid = group["id"].as_str().unwrap();
    let cid = contact["id"].as_str().unwrap();
    let member = format!("/v1/projects/{pid}/groups/{gid}/contacts/{cid}");

    let (status, _) = send(&app, "PUT", &member, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, members) = send(&app, "GET", &format!("/v1/projects/{pid}/groups/{gid}/contacts"), None).await;
    assert_eq!(members["data"][0]["id"], cid);
    let (_, contact) = send(&app, "GET", &format!("/v1/projects/{pid}/contacts/{cid}"), None).await;
    assert_eq!(contact["group_ids"], json!([gid]));

    send(&app, "DELETE", &member, None).await;
    let (_, members) = send(&app, "GET", &format!("/v1/projects/{pid}/groups/{gid}/contacts"), None).await;
    assert!(members["data"].as_array().unwrap().is_empty());
}

// --- errors ---

#[tokio::test]
async fn invalid_param_envelope_names_param() {
    let app = app();
    let pid = new_project(&app).await;
    let (status, body) = send(
        &app,
        "POST",
        &format!("/v1/projects/{pid}/messages/send"),
        Some(json!({"content": "hi"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "invalid_param");
    assert_eq!(body["error"]["param"], "to_number");

    let (status, body) = send(&app, "GET", &format!("/v1/projects/{pid}/contacts?page_size=999"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["param"], "page_size");
}

#[tokio::test]
async fn malformed_body_is_rejected() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/v1/organizations/{MOCK_ORGANIZATION_ID}/projects"))
                .header(http::header::AUTHORIZATION, auth(MOCK_API_KEY))
                .body("[1, 2]".to_string())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"]["param"], "body");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = app();
    let (status, body) = send(&app, "GET", "/v1/widgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

// --- actions ---

#[tokio::test]
async fn cancel_marks_message_cancelled() {
    let app = app();
    let pid = new_project(&app).await;
    let (_, message) = send(
        &app,
        "POST",
        &format!("/v1/projects/{pid}/messages/send"),
        Some(json!({"to_number": "+15550001", "content": "hi"})),
    )
    .await;
    assert_eq!(message["status"], "queued");
    let mid = message["id"].as_str().unwrap();

    let (status, cancelled) = send(
        &app,
        "POST",
        &format!("/v1/projects/{pid}/messages/{mid}/cancel"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");
}
