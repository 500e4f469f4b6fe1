//! UI/backend events and error modeling for the desktop GUI controller.

use shared::protocol::{ServerEvent, TaskPayload};
use shared::domain::UserId;

pub enum UiEvent {
    SignupOk,
    LoginOk { user_id: UserId, username: String },
    TasksLoaded(Vec<TaskPayload>),
    Server(ServerEvent),
    Info(String),
    Error(UiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorCategory {
    Auth,
    Transport,
    Validation,
    Conflict,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiErrorContext {
    BackendStartup,
    Signup,
    Login,
    SaveTask,
    General,
}

pub fn classify_login_failure(message: &str) -> String {
    let lower = message.to_ascii_lowercase();
    if lower.contains("backend worker startup failure") || lower.contains("failed to build backend runtime")
    {
        "Backend worker startup failure; verify local app environment and retry.".to_string()
    } else if lower.contains("failed to connect")
        || lower.contains("connection refused")
        || lower.contains("dns")
        || lower.contains("timed out")
    {
        "Server unreachable; check URL/network and retry sign-in.".to_string()
    } else {
        format!("Login error: {message}")
    }
}

pub fn classify_signup_failure(err: &UiError) -> String {
    match err.category() {
        UiErrorCategory::Transport | UiErrorCategory::Unknown => {
            "An error occurred. Please try again.".to_string()
        }
        _ => err.message().to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct UiError {
    category: UiErrorCategory,
    context: UiErrorContext,
    message: String,
}

impl UiError {
    pub fn from_message(context: UiErrorContext, message: impl Into<String>) -> Self {
        let message = message.into();
        let message_lower = message.to_ascii_lowercase();
        let category = if message_lower.contains("401")
            || message_lower.contains("403")
            || message_lower.contains("unauthorized")
            || message_lower.contains("forbidden")
            || message_lower.contains("not logged in")
            || message_lower.contains("invalid username or password")
            || message_lower.contains("unknown user")
        {
            UiErrorCategory::Auth
        } else if message_lower.contains("taken") || message_lower.contains("registered") {
            UiErrorCategory::Conflict
        } else if message_lower.contains("invalid")
            || message_lower.contains("required")
            || message_lower.contains("exceeds")
            || message_lower.contains("must be at least")
            || message_lower.contains("malformed")
        {
            UiErrorCategory::Validation
        } else if message_lower.contains("timeout")
            || message_lower.contains("timed out")
            || message_lower.contains("connection")
            || message_lower.contains("network")
            || message_lower.contains("transport")
            || message_lower.contains("unavailable")
            || message_lower.contains("disconnect")
            || message_lower.contains("dns")
        {
            UiErrorCategory::Transport
        } else {
            UiErrorCategory::Unknown
        };

        Self {
            category,
            context,
            message,
        }
    }

    pub fn requires_reauth(&self) -> bool {
        self.category == UiErrorCategory::Auth
            && !matches!(self.context, UiErrorContext::Signup | UiErrorContext::Login)
    }

    pub fn category(&self) -> UiErrorCategory {
        self.category
    }

    pub fn context(&self) -> UiErrorContext {
        self.context
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

pub fn err_label(category: UiErrorCategory) -> &'static str {
    match category {
        UiErrorCategory::Auth => "Authentication",
        UiErrorCategory::Transport => "Transport",
        UiErrorCategory::Validation => "Validation",
        UiErrorCategory::Conflict => "Conflict",
        UiErrorCategory::Unknown => "Unexpected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rejected_credentials_as_auth() {
        let err = UiError::from_message(
            UiErrorContext::Login,
            "server rejected request: invalid username or password",
        );
        assert_eq!(err.category(), UiErrorCategory::Auth);
        assert!(!err.requires_reauth());
    }

    #[test]
    fn auth_failures_outside_the_forms_force_reauth() {
        let err = UiError::from_message(UiErrorContext::SaveTask, "401 unauthorized");
        assert!(err.requires_reauth());
    }

    #[test]
    fn classifies_queue_disconnect_as_transport() {
        let err = UiError::from_message(
            UiErrorContext::General,
            "Backend command processor disconnected (possible startup/runtime failure)",
        );
        assert_eq!(err.category(), UiErrorCategory::Transport);
        assert!(!err.requires_reauth());
    }

    #[test]
    fn signup_transport_failures_get_the_generic_retry_message() {
        let err = UiError::from_message(UiErrorContext::Signup, "connection refused");
        assert_eq!(classify_signup_failure(&err), "An error occurred. Please try again.");
    }

    #[test]
    fn signup_conflicts_surface_the_backend_message() {
        let err =
            UiError::from_message(UiErrorContext::Signup, "server rejected request: username is taken");
        assert_eq!(err.category(), UiErrorCategory::Conflict);
        assert_eq!(
            classify_signup_failure(&err),
            "server rejected request: username is taken"
        );
    }

    #[test]
    fn unreachable_server_shapes_the_login_status() {
        let shaped = classify_login_failure("error sending request: connection refused");
        assert!(shaped.contains("Server unreachable"));
    }
}
