use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};
use shared::{
    domain::{TaskId, UserId},
    error::{ApiError, ErrorCode},
    protocol::{ServerEvent, TaskPayload},
};
use storage::{Storage, StoredTask};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

const MAX_USERNAME_CHARS: usize = 32;
const MIN_PASSWORD_CHARS: usize = 8;
const MAX_TITLE_CHARS: usize = 500;

pub async fn signup(
    ctx: &ApiContext,
    username: &str,
    email: &str,
    password: &str,
) -> Result<UserId, ApiError> {
    let username = username.trim();
    let email = email.trim();
    validate_username(username)?;
    validate_email(email)?;
    validate_password(password)?;

    if ctx
        .storage
        .user_by_username(username)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(ApiError::new(ErrorCode::Conflict, "username is taken"));
    }
    if ctx
        .storage
        .user_by_email(email)
        .await
        .map_err(internal)?
        .is_some()
    {
        return Err(ApiError::new(ErrorCode::Conflict, "email is registered"));
    }

    let salt = Uuid::new_v4().simple().to_string();
    let digest = password_digest(&salt, password);
    let user_id = ctx
        .storage
        .create_user(username, email, &digest, &salt)
        .await
        .map_err(internal)?;
    tracing::info!(user_id = user_id.0, "user registered");
    Ok(user_id)
}

pub async fn login(ctx: &ApiContext, username: &str, password: &str) -> Result<UserId, ApiError> {
    let invalid = || ApiError::new(ErrorCode::Unauthorized, "invalid username or password");

    let user = ctx
        .storage
        .user_by_username(username.trim())
        .await
        .map_err(internal)?
        .ok_or_else(invalid)?;

    if password_digest(&user.password_salt, password) != user.password_hash {
        return Err(invalid());
    }
    Ok(user.user_id)
}

pub async fn list_tasks(ctx: &ApiContext, user_id: UserId) -> Result<Vec<TaskPayload>, ApiError> {
    ensure_known_user(ctx, user_id).await?;
    let tasks = ctx
        .storage
        .list_tasks_for_user(user_id)
        .await
        .map_err(internal)?;
    Ok(tasks.into_iter().map(payload_from).collect())
}

pub async fn create_task(
    ctx: &ApiContext,
    user_id: UserId,
    title: &str,
) -> Result<ServerEvent, ApiError> {
    ensure_known_user(ctx, user_id).await?;
    let title = validate_title(title)?;
    let task = ctx
        .storage
        .create_task(user_id, title)
        .await
        .map_err(internal)?;
    Ok(ServerEvent::TaskCreated {
        task: payload_from(task),
    })
}

pub async fn update_task(
    ctx: &ApiContext,
    user_id: UserId,
    task_id: TaskId,
    title: &str,
    completed: bool,
) -> Result<ServerEvent, ApiError> {
    let title = validate_title(title)?;
    ensure_task_ownership(ctx, task_id, user_id).await?;

    let task = ctx
        .storage
        .update_task(task_id, title, completed)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "task not found"))?;
    Ok(ServerEvent::TaskUpdated {
        task: payload_from(task),
    })
}

pub async fn delete_task(
    ctx: &ApiContext,
    user_id: UserId,
    task_id: TaskId,
) -> Result<ServerEvent, ApiError> {
    ensure_task_ownership(ctx, task_id, user_id).await?;
    let removed = ctx.storage.delete_task(task_id).await.map_err(internal)?;
    if !removed {
        return Err(ApiError::new(ErrorCode::NotFound, "task not found"));
    }
    Ok(ServerEvent::TaskDeleted { user_id, task_id })
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    if username.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "username is required"));
    }
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("username exceeds {MAX_USERNAME_CHARS} characters"),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    // Deliverability is the mail server's problem; only the shape is checked.
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, host)| !local.is_empty() && host.contains('.'));
    if !well_formed {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "email address is not valid",
        ));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("password must be at least {MIN_PASSWORD_CHARS} characters"),
        ));
    }
    Ok(())
}

fn validate_title(title: &str) -> Result<&str, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::new(ErrorCode::Validation, "title is required"));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::new(
            ErrorCode::Validation,
            format!("title exceeds {MAX_TITLE_CHARS} characters"),
        ));
    }
    Ok(title)
}

fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    STANDARD.encode(hasher.finalize())
}

async fn ensure_known_user(ctx: &ApiContext, user_id: UserId) -> Result<(), ApiError> {
    ctx.storage
        .username_for_user(user_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "unknown user"))?;
    Ok(())
}

async fn ensure_task_ownership(
    ctx: &ApiContext,
    task_id: TaskId,
    user_id: UserId,
) -> Result<(), ApiError> {
    let task = ctx
        .storage
        .task_by_id(task_id)
        .await
        .map_err(internal)?
        .ok_or_else(|| ApiError::new(ErrorCode::NotFound, "task not found"))?;
    if task.user_id != user_id {
        return Err(ApiError::new(
            ErrorCode::Forbidden,
            "task belongs to another user",
        ));
    }
    Ok(())
}

fn payload_from(task: StoredTask) -> TaskPayload {
    TaskPayload {
        task_id: task.task_id,
        user_id: task.user_id,
        title: task.title,
        completed: task.completed,
        created_at: task.created_at,
        updated_at: task.updated_at,
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn setup() -> (ApiContext, UserId) {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        let ctx = ApiContext { storage };
        let user = signup(&ctx, "alice", "alice@example.com", "correct horse")
            .await
            .expect("signup");
        (ctx, user)
    }

    #[tokio::test]
    async fn signup_rejects_malformed_input() {
        let storage = Storage::new("sqlite::memory:").await.expect("db");
        let ctx = ApiContext { storage };

        let blank = signup(&ctx, "  ", "a@b.io", "long enough").await;
        assert!(matches!(blank, Err(e) if e.code == ErrorCode::Validation));

        let bad_email = signup(&ctx, "alice", "not-an-email", "long enough").await;
        assert!(matches!(bad_email, Err(e) if e.code == ErrorCode::Validation));

        let short_password = signup(&ctx, "alice", "a@b.io", "short").await;
        assert!(matches!(short_password, Err(e) if e.code == ErrorCode::Validation));
    }

    #[tokio::test]
    async fn signup_reports_conflicts_for_taken_identities() {
        let (ctx, _user) = setup().await;

        let same_name = signup(&ctx, "alice", "fresh@example.com", "long enough").await;
        assert!(matches!(same_name, Err(e) if e.code == ErrorCode::Conflict));

        let same_email = signup(&ctx, "fresh", "alice@example.com", "long enough").await;
        assert!(matches!(same_email, Err(e) if e.code == ErrorCode::Conflict));
    }

    #[tokio::test]
    async fn login_verifies_the_stored_digest() {
        let (ctx, user) = setup().await;

        let ok = login(&ctx, "alice", "correct horse").await.expect("login");
        assert_eq!(ok, user);

        let wrong = login(&ctx, "alice", "battery staple").await;
        assert!(matches!(wrong, Err(e) if e.code == ErrorCode::Unauthorized));

        let unknown = login(&ctx, "mallory", "correct horse").await;
        assert!(matches!(unknown, Err(e) if e.code == ErrorCode::Unauthorized));
    }

    #[tokio::test]
    async fn create_and_list_round_trips_a_task() {
        let (ctx, user) = setup().await;

        let event = create_task(&ctx, user, "  Buy milk  ").await.expect("task");
        let ServerEvent::TaskCreated { task } = event else {
            panic!("expected TaskCreated");
        };
        assert_eq!(task.title, "Buy milk");

        let tasks = list_tasks(&ctx, user).await.expect("tasks");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_id, task.task_id);
    }

    #[tokio::test]
    async fn update_rejects_foreign_tasks() {
        let (ctx, alice) = setup().await;
        let bob = signup(&ctx, "bob", "bob@example.com", "long enough")
            .await
            .expect("signup");
        let event = create_task(&ctx, alice, "hers").await.expect("task");
        let ServerEvent::TaskCreated { task } = event else {
            panic!("expected TaskCreated");
        };

        let stolen = update_task(&ctx, bob, task.task_id, "his now", false).await;
        assert!(matches!(stolen, Err(e) if e.code == ErrorCode::Forbidden));
    }

    #[tokio::test]
    async fn update_of_missing_task_is_not_found() {
        let (ctx, user) = setup().await;
        let missing = update_task(&ctx, user, TaskId(99), "ghost", false).await;
        assert!(matches!(missing, Err(e) if e.code == ErrorCode::NotFound));
    }

    #[tokio::test]
    async fn delete_emits_a_deletion_event() {
        let (ctx, user) = setup().await;
        let event = create_task(&ctx, user, "done soon").await.expect("task");
        let ServerEvent::TaskCreated { task } = event else {
            panic!("expected TaskCreated");
        };

        let deleted = delete_task(&ctx, user, task.task_id).await.expect("delete");
        assert!(matches!(deleted, ServerEvent::TaskDeleted { task_id, .. } if task_id == task.task_id));
        assert!(list_tasks(&ctx, user).await.expect("tasks").is_empty());
    }
}
