use futures::StreamExt;
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::{
    domain::{TaskId, UserId},
    error::ApiError,
    protocol::{
        CreateTaskRequest, LoginRequest, LoginResponse, ServerEvent, SignupRequest,
        SignupResponse, TaskPayload, UpdateTaskRequest,
    },
};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::warn;
use url::Url;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server rejected request: {}", .0.message)]
    Api(ApiError),
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("websocket failure: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid server url: {0}")]
    InvalidServerUrl(#[from] url::ParseError),
    #[error("not logged in")]
    NotLoggedIn,
}

impl ClientError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    Server(ServerEvent),
    Error(String),
}

/// HTTP + websocket client for the taskboard server.
///
/// The HTTP client and server URL are injected at construction; nothing in
/// here reaches for ambient global state.
pub struct TaskClient {
    http: Client,
    server_url: String,
    user_id: Option<UserId>,
    events: broadcast::Sender<ClientEvent>,
    ws_task: Option<tokio::task::JoinHandle<()>>,
}

impl TaskClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_http(Client::new(), server_url)
    }

    pub fn with_http(http: Client, server_url: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            http,
            server_url: server_url.into(),
            user_id: None,
            events,
            ws_task: None,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<UserId, ClientError> {
        let res = self
            .http
            .post(format!("{}/signup", self.server_url))
            .json(&SignupRequest {
                username: username.to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: SignupResponse = decode(res).await?;
        Ok(body.user_id)
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<UserId, ClientError> {
        let res = self
            .http
            .post(format!("{}/login", self.server_url))
            .json(&LoginRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        let body: LoginResponse = decode(res).await?;
        self.user_id = Some(body.user_id);
        Ok(body.user_id)
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskPayload>, ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        let res = self
            .http
            .get(format!("{}/tasks", self.server_url))
            .query(&[("user_id", user_id.0)])
            .send()
            .await?;
        decode(res).await
    }

    pub async fn create_task(&self, title: &str) -> Result<TaskPayload, ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        let res = self
            .http
            .post(format!("{}/tasks", self.server_url))
            .query(&[("user_id", user_id.0)])
            .json(&CreateTaskRequest {
                title: title.to_string(),
            })
            .send()
            .await?;
        decode(res).await
    }

    pub async fn update_task(
        &self,
        task_id: TaskId,
        title: &str,
        completed: bool,
    ) -> Result<TaskPayload, ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        let res = self
            .http
            .put(format!("{}/tasks/{}", self.server_url, task_id.0))
            .query(&[("user_id", user_id.0)])
            .json(&UpdateTaskRequest {
                title: title.to_string(),
                completed,
            })
            .send()
            .await?;
        decode(res).await
    }

    pub async fn delete_task(&self, task_id: TaskId) -> Result<(), ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        let res = self
            .http
            .delete(format!("{}/tasks/{}", self.server_url, task_id.0))
            .query(&[("user_id", user_id.0)])
            .send()
            .await?;
        if res.status().is_success() {
            return Ok(());
        }
        Err(decode_error(res).await)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Opens (or re-opens) the websocket event stream for the logged-in
    /// user and forwards server events to subscribers.
    pub async fn connect_events(&mut self) -> Result<(), ClientError> {
        let user_id = self.user_id.ok_or(ClientError::NotLoggedIn)?;
        let ws_url = ws_events_url(&self.server_url, user_id)?;

        if let Some(task) = self.ws_task.take() {
            task.abort();
        }

        let (stream, _) = connect_async(ws_url.as_str()).await?;
        let events = self.events.clone();
        self.ws_task = Some(tokio::spawn(async move {
            let (_, mut read) = stream.split();
            while let Some(message) = read.next().await {
                let text = match message {
                    Ok(Message::Text(text)) => text,
                    Ok(_) => continue,
                    Err(err) => {
                        warn!(%err, "event stream read failed");
                        let _ = events.send(ClientEvent::Error(format!(
                            "event stream read failed: {err}"
                        )));
                        break;
                    }
                };
                match serde_json::from_str::<ServerEvent>(&text) {
                    Ok(event) => {
                        let _ = events.send(ClientEvent::Server(event));
                    }
                    Err(err) => {
                        warn!(%err, "dropping undecodable server event");
                    }
                }
            }
        }));
        Ok(())
    }
}

fn ws_events_url(server_url: &str, user_id: UserId) -> Result<Url, ClientError> {
    let mut url = Url::parse(server_url)?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    // Url::set_scheme rejects some cross-scheme moves; rebuild instead.
    let rebuilt = format!(
        "{scheme}://{}{}/ws",
        url.host_str().unwrap_or("127.0.0.1"),
        url.port().map(|p| format!(":{p}")).unwrap_or_default()
    );
    url = Url::parse(&rebuilt)?;
    url.query_pairs_mut()
        .append_pair("user_id", &user_id.0.to_string());
    Ok(url)
}

async fn decode<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ClientError> {
    if !res.status().is_success() {
        return Err(decode_error(res).await);
    }
    Ok(res.json::<T>().await?)
}

async fn decode_error(res: reqwest::Response) -> ClientError {
    match res.json::<ApiError>().await {
        Ok(api) => ClientError::Api(api),
        Err(err) => ClientError::Transport(err),
    }
}

#[cfg(test)]
mod tests;
