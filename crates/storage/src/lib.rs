use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{fs, path::Path, str::FromStr};

use shared::domain::{TaskId, UserId};

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub user_id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct StoredTask {
    pub task_id: TaskId,
    pub user_id: UserId,
    pub title: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        password_salt: &str,
    ) -> Result<UserId> {
        let rec = sqlx::query(
            "INSERT INTO users (username, email, password_hash, password_salt)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(password_salt)
        .fetch_one(&self.pool)
        .await?;
        Ok(UserId(rec.get::<i64, _>(0)))
    }

    pub async fn user_by_username(&self, username: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, password_salt, created_at
             FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<StoredUser>> {
        let row = sqlx::query(
            "SELECT id, username, email, password_hash, password_salt, created_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        row.map(user_from_row).transpose()
    }

    pub async fn username_for_user(&self, user_id: UserId) -> Result<Option<String>> {
        let row = sqlx::query("SELECT username FROM users WHERE id = ?")
            .bind(user_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    pub async fn create_task(&self, user_id: UserId, title: &str) -> Result<StoredTask> {
        let row = sqlx::query(
            "INSERT INTO tasks (user_id, title) VALUES (?, ?)
             RETURNING id, user_id, title, completed, created_at, updated_at",
        )
        .bind(user_id.0)
        .bind(title)
        .fetch_one(&self.pool)
        .await?;
        task_from_row(row)
    }

    /// Tasks in insertion order; display order for the client list.
    pub async fn list_tasks_for_user(&self, user_id: UserId) -> Result<Vec<StoredTask>> {
        let rows = sqlx::query(
            "SELECT id, user_id, title, completed, created_at, updated_at
             FROM tasks WHERE user_id = ? ORDER BY id ASC",
        )
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(task_from_row).collect()
    }

    pub async fn task_by_id(&self, task_id: TaskId) -> Result<Option<StoredTask>> {
        let row = sqlx::query(
            "SELECT id, user_id, title, completed, created_at, updated_at
             FROM tasks WHERE id = ?",
        )
        .bind(task_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(task_from_row).transpose()
    }

    pub async fn update_task(
        &self,
        task_id: TaskId,
        title: &str,
        completed: bool,
    ) -> Result<Option<StoredTask>> {
        let row = sqlx::query(
            "UPDATE tasks
             SET title = ?, completed = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?
             RETURNING id, user_id, title, completed, created_at, updated_at",
        )
        .bind(title)
        .bind(completed)
        .bind(task_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(task_from_row).transpose()
    }

    pub async fn delete_task(&self, task_id: TaskId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(task_id.0)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn user_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredUser> {
    Ok(StoredUser {
        user_id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        password_salt: row.try_get("password_salt")?,
        created_at: row.try_get("created_at")?,
    })
}

fn task_from_row(row: sqlx::sqlite::SqliteRow) -> Result<StoredTask> {
    Ok(StoredTask {
        task_id: TaskId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        title: row.try_get("title")?,
        completed: row.try_get("completed")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return Ok(());
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();
    if path.is_empty() {
        return Ok(());
    }

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!(
                    "failed to create parent directory '{}' for database url '{database_url}'",
                    parent.display()
                )
            })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests;
