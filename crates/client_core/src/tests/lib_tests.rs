use crate::*;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use shared::error::ErrorCode;

#[derive(Debug, serde::Deserialize)]
struct StubUserQuery {
    user_id: i64,
}

fn sample_task(task_id: i64, user_id: i64, title: &str, completed: bool) -> TaskPayload {
    TaskPayload {
        task_id: TaskId(task_id),
        user_id: UserId(user_id),
        title: title.to_string(),
        completed,
        created_at: "2024-05-01T12:00:00Z".parse().expect("timestamp"),
        updated_at: "2024-05-01T12:00:00Z".parse().expect("timestamp"),
    }
}

fn stub_router() -> Router {
    Router::new()
        .route(
            "/signup",
            post(|Json(req): Json<SignupRequest>| async move {
                if req.username == "taken" {
                    return Err((
                        StatusCode::CONFLICT,
                        Json(ApiError::new(ErrorCode::Conflict, "username is taken")),
                    ));
                }
                Ok(Json(SignupResponse { user_id: UserId(7) }))
            }),
        )
        .route(
            "/login",
            post(|Json(req): Json<LoginRequest>| async move {
                if req.password != "long enough" {
                    return Err((
                        StatusCode::UNAUTHORIZED,
                        Json(ApiError::new(
                            ErrorCode::Unauthorized,
                            "invalid username or password",
                        )),
                    ));
                }
                Ok(Json(LoginResponse {
                    user_id: UserId(7),
                    username: req.username,
                }))
            }),
        )
        .route(
            "/tasks",
            get(|Query(q): Query<StubUserQuery>| async move {
                Json(vec![sample_task(1, q.user_id, "Buy milk", false)])
            }),
        )
        .route(
            "/tasks/:task_id",
            put(
                |Path(task_id): Path<i64>,
                 Query(q): Query<StubUserQuery>,
                 Json(req): Json<UpdateTaskRequest>| async move {
                    Json(sample_task(task_id, q.user_id, &req.title, req.completed))
                },
            ),
        )
}

async fn spawn_stub_server() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, stub_router()).await.expect("serve");
    });
    format!("http://{addr}")
}

#[test]
fn derives_ws_url_from_http_and_https() {
    let ws = ws_events_url("http://127.0.0.1:8780", UserId(3)).expect("url");
    assert_eq!(ws.as_str(), "ws://127.0.0.1:8780/ws?user_id=3");

    let wss = ws_events_url("https://tasks.example.com", UserId(3)).expect("url");
    assert_eq!(wss.as_str(), "wss://tasks.example.com/ws?user_id=3");
}

#[tokio::test]
async fn task_operations_require_login_first() {
    let client = TaskClient::new("http://127.0.0.1:9");
    let err = client.list_tasks().await.expect_err("should fail");
    assert!(matches!(err, ClientError::NotLoggedIn));
}

#[tokio::test]
async fn signup_decodes_conflict_bodies() {
    let server_url = spawn_stub_server().await;
    let client = TaskClient::new(&server_url);

    let ok = client
        .signup("fresh", "fresh@example.com", "long enough")
        .await
        .expect("signup");
    assert_eq!(ok, UserId(7));

    let err = client
        .signup("taken", "taken@example.com", "long enough")
        .await
        .expect_err("conflict");
    let api = err.api_error().expect("api error");
    assert_eq!(api.code, ErrorCode::Conflict);
    assert_eq!(api.message, "username is taken");
}

#[tokio::test]
async fn login_then_list_uses_the_session_user() {
    let server_url = spawn_stub_server().await;
    let mut client = TaskClient::new(&server_url);

    let user = client.login("alice", "long enough").await.expect("login");
    assert_eq!(user, UserId(7));
    assert_eq!(client.user_id(), Some(UserId(7)));

    let tasks = client.list_tasks().await.expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].user_id, UserId(7));
    assert_eq!(tasks[0].title, "Buy milk");
}

#[tokio::test]
async fn rejected_login_surfaces_the_api_error() {
    let server_url = spawn_stub_server().await;
    let mut client = TaskClient::new(&server_url);

    let err = client
        .login("alice", "wrong password")
        .await
        .expect_err("unauthorized");
    let api = err.api_error().expect("api error");
    assert_eq!(api.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn update_round_trips_title_and_completed() {
    let server_url = spawn_stub_server().await;
    let mut client = TaskClient::new(&server_url);
    client.login("alice", "long enough").await.expect("login");

    let task = client
        .update_task(TaskId(4), "Buy oat milk", true)
        .await
        .expect("update");
    assert_eq!(task.task_id, TaskId(4));
    assert_eq!(task.title, "Buy oat milk");
    assert!(task.completed);
}
