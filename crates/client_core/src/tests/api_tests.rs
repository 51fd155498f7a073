use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::error::ErrorKind;

#[derive(Clone, Default)]
struct StubState {
    created: Arc<Mutex<Vec<CreatePostRequest>>>,
    updated: Arc<Mutex<Vec<(i64, String)>>>,
    deleted: Arc<Mutex<Vec<i64>>>,
}

#[derive(Deserialize)]
struct CredentialsBody {
    username: String,
    password: String,
}

fn has_session(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.split(';').any(|pair| pair.trim() == "session=alice"))
}

async fn stub_login(Json(body): Json<CredentialsBody>) -> Response {
    if body.username == "alice" && body.password == "secret" {
        (
            StatusCode::OK,
            [(header::SET_COOKIE, "session=alice; Path=/")],
            Json(json!({ "message": "Login successful" })),
        )
            .into_response()
    } else if body.username == "legacy" {
        // Older backends answered 200 with a failure message.
        Json(json!({ "message": "Invalid username or password" })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid username or password" })),
        )
            .into_response()
    }
}

async fn stub_register(Json(body): Json<CredentialsBody>) -> Response {
    if body.username == "taken" {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Username already exists" })),
        )
            .into_response()
    } else {
        Json(json!({ "message": "User registered successfully" })).into_response()
    }
}

async fn stub_logout() -> Response {
    (
        StatusCode::OK,
        [(header::SET_COOKIE, "session=; Path=/; Max-Age=0")],
    )
        .into_response()
}

async fn stub_check_session(headers: HeaderMap) -> Json<serde_json::Value> {
    Json(json!({ "logged_in": has_session(&headers) }))
}

async fn stub_list_posts(headers: HeaderMap) -> Json<serde_json::Value> {
    let mine = has_session(&headers);
    Json(json!([
        {
            "id": 1,
            "content": "first",
            "author": "bob",
            "created_at": "Mon, 01 Jan 2024 10:00:00 GMT"
        },
        {
            "id": 2,
            "content": "second",
            "author": "alice",
            "created_at": "2024-01-02T11:30:00",
            "can_delete": mine,
            "can_edit": mine
        }
    ]))
}

async fn stub_fetch_post(Path(id): Path<i64>) -> Response {
    if id == 1 {
        Json(json!({
            "id": 1,
            "content": "first",
            "author": "bob",
            "created_at": "2024-01-01T10:00:00Z"
        }))
        .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Blog post not found" })),
        )
            .into_response()
    }
}

async fn stub_create_post(
    State(state): State<StubState>,
    Json(body): Json<CreatePostRequest>,
) -> Response {
    state.created.lock().await.push(body);
    (StatusCode::CREATED, Json(json!({ "id": 7 }))).into_response()
}

async fn stub_update_post(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> Json<serde_json::Value> {
    state.updated.lock().await.push((id, body.content));
    Json(json!({ "message": "Blog post updated" }))
}

async fn stub_delete_post(State(state): State<StubState>, Path(id): Path<i64>) -> Response {
    state.deleted.lock().await.push(id);
    Json(json!({ "message": "Blog post deleted" })).into_response()
}

async fn stub_plain_update(
    State(state): State<StubState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdatePostRequest>,
) -> &'static str {
    state.updated.lock().await.push((id, body.content));
    "updated"
}

async fn stub_plain_delete(State(state): State<StubState>, Path(id): Path<i64>) -> &'static str {
    state.deleted.lock().await.push(id);
    "deleted"
}

async fn stub_broken() -> &'static str {
    "<html>Internal Server Error</html>"
}

async fn spawn_stub_server() -> (String, StubState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = StubState::default();
    let app = Router::new()
        .route("/login", post(stub_login))
        .route("/register", post(stub_register))
        .route("/logout", post(stub_logout))
        .route("/api/check-session", get(stub_check_session))
        .route("/api/blog", get(stub_list_posts).post(stub_create_post))
        .route(
            "/api/blog/:id",
            patch(stub_update_post)
                .get(stub_fetch_post)
                .delete(stub_delete_post),
        )
        .route("/broken/api/check-session", get(stub_broken))
        .route("/broken/api/blog", get(stub_broken))
        .route(
            "/plain/api/blog/:id",
            patch(stub_plain_update).delete(stub_plain_delete),
        )
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn api_for(server_url: &str) -> HttpBlogApi {
    let settings = ClientSettings {
        server_url: server_url.to_string(),
        ..ClientSettings::default()
    };
    HttpBlogApi::new(&settings).expect("client")
}

#[tokio::test]
async fn login_cookie_carries_session_until_logout() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&server_url);

    assert_eq!(
        api.check_session().await.expect("anonymous check"),
        SessionState::Anonymous
    );

    let message = api
        .login(&Credentials::new("alice", "secret"))
        .await
        .expect("login");
    assert_eq!(message, LOGIN_SUCCESS_MESSAGE);
    assert_eq!(
        api.check_session().await.expect("authed check"),
        SessionState::Authenticated
    );

    api.logout().await.expect("logout");
    assert_eq!(
        api.check_session().await.expect("after logout"),
        SessionState::Anonymous
    );
}

#[tokio::test]
async fn bad_credentials_surface_backend_message() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&server_url);

    let err = api
        .login(&Credentials::new("alice", "wrong"))
        .await
        .expect_err("401");
    assert_eq!(err.kind(), ErrorKind::Auth);
    assert_eq!(err.user_message(), "Invalid username or password");

    let err = api
        .login(&Credentials::new("legacy", "whatever"))
        .await
        .expect_err("200 with failure message");
    match err {
        ClientError::Rejected(rejection) => {
            assert_eq!(rejection.status, 200);
            assert_eq!(rejection.message, "Invalid username or password");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn register_reads_message_or_error_field() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&server_url);

    assert_eq!(
        api.register(&Credentials::new("new", "pw"))
            .await
            .expect("register"),
        REGISTER_SUCCESS_MESSAGE
    );

    let err = api
        .register(&Credentials::new("taken", "pw"))
        .await
        .expect_err("taken");
    match err {
        ClientError::Rejected(rejection) => {
            assert_eq!(rejection.code, ErrorCode::Validation);
            assert_eq!(rejection.message, "Username already exists");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn post_list_keeps_order_and_capabilities() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&server_url);

    let anonymous = api.list_posts().await.expect("list");
    assert_eq!(
        anonymous.iter().map(|post| post.id).collect::<Vec<_>>(),
        vec![PostId(1), PostId(2)]
    );
    assert!(anonymous.iter().all(|post| !post.can_delete));

    api.login(&Credentials::new("alice", "secret"))
        .await
        .expect("login");
    let authed = api.list_posts().await.expect("list");
    assert!(!authed[0].can_delete);
    assert!(authed[1].can_delete);
    assert!(authed[1].can_edit);
}

#[tokio::test]
async fn single_post_lookup_maps_not_found() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&server_url);

    assert_eq!(api.fetch_post(PostId(1)).await.expect("post").author, "bob");

    let err = api.fetch_post(PostId(5)).await.expect_err("404");
    assert_eq!(err.user_message(), "Blog post not found");
    assert_eq!(err.kind(), ErrorKind::Rejected);
}

#[tokio::test]
async fn mutations_hit_expected_routes() {
    let (server_url, state) = spawn_stub_server().await;
    let api = api_for(&server_url);

    let created = api
        .create_post(&CreatePostRequest {
            content: "hello".into(),
            author: None,
        })
        .await
        .expect("create");
    assert_eq!(created.id, Some(PostId(7)));
    assert_eq!(created.message, None);

    let updated = api
        .update_post(
            PostId(2),
            &UpdatePostRequest {
                content: "edited".into(),
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.text(), Some("Blog post updated"));

    let deleted = api.delete_post(PostId(2)).await.expect("delete");
    assert_eq!(deleted.text(), Some("Blog post deleted"));

    let created = state.created.lock().await.clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].content, "hello");
    assert_eq!(created[0].author, None);
    assert_eq!(
        state.updated.lock().await.clone(),
        vec![(2, "edited".to_string())]
    );
    assert_eq!(state.deleted.lock().await.clone(), vec![2]);
}

#[tokio::test]
async fn plain_text_success_still_counts_for_mutations() {
    let (server_url, state) = spawn_stub_server().await;
    let api = api_for(&format!("{server_url}/plain"));

    let updated = api
        .update_post(
            PostId(3),
            &UpdatePostRequest {
                content: "edited".into(),
            },
        )
        .await
        .expect("2xx update");
    assert_eq!(updated.text(), None);

    let deleted = api.delete_post(PostId(3)).await.expect("2xx delete");
    assert_eq!(deleted.text(), None);

    assert_eq!(
        state.updated.lock().await.clone(),
        vec![(3, "edited".to_string())]
    );
    assert_eq!(state.deleted.lock().await.clone(), vec![3]);
}

#[tokio::test]
async fn unparsable_body_is_malformed_and_prefix_is_kept() {
    let (server_url, _) = spawn_stub_server().await;
    let api = api_for(&format!("{server_url}/broken"));

    let err = api.check_session().await.expect_err("html body");
    assert_eq!(err.kind(), ErrorKind::Malformed);
    assert!(err.to_string().contains("/api/check-session"));

    let err = api.list_posts().await.expect_err("html body");
    assert_eq!(err.kind(), ErrorKind::Malformed);
}

#[tokio::test]
async fn unreachable_server_is_network_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");

    let api = api_for(&format!("http://{addr}"));
    let err = api.check_session().await.expect_err("refused");
    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(api.logout().await.is_err());
}
