use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use server_api::ApiContext;
use shared::{
    domain::{TaskId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{
        CreateTaskRequest, LoginRequest, LoginResponse, ServerEvent, SignupRequest,
        SignupResponse, TaskPayload, UpdateTaskRequest,
    },
};
use storage::Storage;
use tokio::sync::broadcast;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod config;

use config::{load_settings, prepare_database_url};

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(Clone)]
struct AppState {
    api: ApiContext,
    events: broadcast::Sender<ServerEvent>,
}

#[derive(Debug, Deserialize)]
struct UserQuery {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    user_id: i64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext { storage };
    let (events, _) = broadcast::channel(256);

    let state = AppState { api, events };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/signup", post(http_signup))
        .route("/login", post(http_login))
        .route("/tasks", get(http_list_tasks).post(http_create_task))
        .route(
            "/tasks/:task_id",
            put(http_update_task).delete(http_delete_task),
        )
        .route("/ws", get(ws_handler))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<SignupResponse>, (StatusCode, Json<ApiError>)> {
    let user_id = server_api::signup(&state.api, &req.username, &req.email, &req.password)
        .await
        .map_err(reject)?;
    Ok(Json(SignupResponse { user_id }))
}

async fn http_login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<ApiError>)> {
    let user_id = server_api::login(&state.api, &req.username, &req.password)
        .await
        .map_err(reject)?;
    Ok(Json(LoginResponse {
        user_id,
        username: req.username.trim().to_string(),
    }))
}

async fn http_list_tasks(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<TaskPayload>>, (StatusCode, Json<ApiError>)> {
    let tasks = server_api::list_tasks(&state.api, UserId(q.user_id))
        .await
        .map_err(reject)?;
    Ok(Json(tasks))
}

async fn http_create_task(
    State(state): State<Arc<AppState>>,
    Query(q): Query<UserQuery>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<TaskPayload>, (StatusCode, Json<ApiError>)> {
    let event = server_api::create_task(&state.api, UserId(q.user_id), &req.title)
        .await
        .map_err(reject)?;
    respond_with_task(&state, event)
}

async fn http_update_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Query(q): Query<UserQuery>,
    Json(req): Json<UpdateTaskRequest>,
) -> Result<Json<TaskPayload>, (StatusCode, Json<ApiError>)> {
    let event = server_api::update_task(
        &state.api,
        UserId(q.user_id),
        TaskId(task_id),
        &req.title,
        req.completed,
    )
    .await
    .map_err(reject)?;
    respond_with_task(&state, event)
}

async fn http_delete_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Query(q): Query<UserQuery>,
) -> Result<StatusCode, (StatusCode, Json<ApiError>)> {
    let event = server_api::delete_task(&state.api, UserId(q.user_id), TaskId(task_id))
        .await
        .map_err(reject)?;
    let _ = state.events.send(event);
    Ok(StatusCode::NO_CONTENT)
}

fn respond_with_task(
    state: &AppState,
    event: ServerEvent,
) -> Result<Json<TaskPayload>, (StatusCode, Json<ApiError>)> {
    let task = match &event {
        ServerEvent::TaskCreated { task } | ServerEvent::TaskUpdated { task } => task.clone(),
        _ => {
            return Err(reject(ApiError::new(
                ErrorCode::Internal,
                "unexpected event shape for task mutation",
            )))
        }
    };
    let _ = state.events.send(event);
    Ok(Json(task))
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(q): Query<WsQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket, UserId(q.user_id)))
}

async fn ws_connection(
    state: Arc<AppState>,
    socket: axum::extract::ws::WebSocket,
    user_id: UserId,
) {
    use axum::extract::ws::Message;
    use futures::{SinkExt, StreamExt};

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let send_task = tokio::spawn(async move {
        while let Ok(event) = events_rx.recv().await {
            if event.user_id() != Some(user_id) {
                continue;
            }
            let text = match serde_json::to_string(&event) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(_msg)) = receiver.next().await {}

    send_task.abort();
}
