//! User directory persistence

use sanctum_common::models::{User, UserRecord};
use sanctum_common::time::{from_storage, to_storage};
use sanctum_common::{Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::parse_uuid;

fn row_to_record(row: &SqliteRow) -> Result<UserRecord> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(UserRecord {
        user: User {
            id: parse_uuid(&id)?,
            username: row.get("username"),
            created_at: from_storage(&created_at)?,
            updated_at: from_storage(&updated_at)?,
        },
        password_hash: row.get("password_hash"),
    })
}

/// Insert a new user; `username` must already be normalized
///
/// A duplicate username (including one that races in between a caller's
/// pre-check and this insert) is reported as [`Error::Conflict`].
pub async fn insert_user(pool: &SqlitePool, username: &str, password_hash: &str) -> Result<User> {
    let now = chrono::Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: username.to_string(),
        created_at: now,
        updated_at: now,
    };
    let stamp = to_storage(now);

    let result = sqlx::query(
        r#"
        INSERT INTO users (id, username, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id.to_string())
    .bind(&user.username)
    .bind(password_hash)
    .bind(&stamp)
    .bind(&stamp)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(user),
        Err(e) => {
            let err = Error::from(e);
            if err.is_unique_violation() {
                Err(Error::Conflict("Username already exists".to_string()))
            } else {
                Err(err)
            }
        }
    }
}

pub async fn username_exists(pool: &SqlitePool, username: &str) -> Result<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
        .bind(username)
        .fetch_one(pool)
        .await?;
    Ok(exists)
}

/// Look up a user with its password hash for login
pub async fn find_by_username(pool: &SqlitePool, username: &str) -> Result<Option<UserRecord>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, created_at, updated_at FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(row_to_record).transpose()
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query(
        "SELECT id, username, password_hash, created_at, updated_at FROM users WHERE id = ?",
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_record).transpose()?.map(|r| r.user))
}

/// Remove a user; owned tracks, environments and section rows go with it
pub async fn delete_user(pool: &SqlitePool, id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("User {}", id)));
    }
    Ok(())
}
