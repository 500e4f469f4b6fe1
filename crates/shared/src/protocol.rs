use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    domain::{TaskId, UserId},
    error::ApiError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupResponse {
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: String,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    TaskCreated { task: TaskPayload },
    TaskUpdated { task: TaskPayload },
    TaskDeleted { user_id: UserId, task_id: TaskId },
    Error(ApiError),
}

impl ServerEvent {
    /// Owner of the task this event concerns, used for per-user fan-out.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::TaskCreated { task } | Self::TaskUpdated { task } => Some(task.user_id),
            Self::TaskDeleted { user_id, .. } => Some(*user_id),
            Self::Error(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_events_round_trip_as_tagged_json() {
        let event = ServerEvent::TaskDeleted {
            user_id: UserId(7),
            task_id: TaskId(12),
        };
        let encoded = serde_json::to_string(&event).expect("encode");
        assert!(encoded.contains("\"type\":\"task_deleted\""));
        let decoded: ServerEvent = serde_json::from_str(&encoded).expect("decode");
        assert_eq!(decoded.user_id(), Some(UserId(7)));
    }

    #[test]
    fn error_events_have_no_owner() {
        let event = ServerEvent::Error(ApiError::new(
            crate::error::ErrorCode::Internal,
            "broadcast failure",
        ));
        assert_eq!(event.user_id(), None);
    }
}
