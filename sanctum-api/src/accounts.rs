//! User directory: registration, login and session re-hydration
//!
//! Sits between the HTTP layer and [`crate::db::users`], applying the
//! username/password policy and issuing session tokens.

use sanctum_common::auth::{normalize_username, validate_password, PasswordService, TokenService};
use sanctum_common::models::User;
use sanctum_common::{Error, Result};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::users;

/// An authenticated user plus a freshly issued token
#[derive(Debug, Clone)]
pub struct Session {
    pub user: User,
    pub token: String,
}

/// Create an account and log it in
pub async fn register(
    pool: &SqlitePool,
    passwords: &PasswordService,
    tokens: &TokenService,
    username: &str,
    password: &str,
) -> Result<Session> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }
    let username = normalize_username(username)?;
    validate_password(password)?;

    if users::username_exists(pool, &username).await? {
        return Err(Error::Conflict("Username already exists".to_string()));
    }

    let hash = passwords.hash_password_blocking(password.to_string()).await?;
    let user = users::insert_user(pool, &username, &hash).await?;
    let token = tokens.issue_token(user.id, &user.username)?;

    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(Session { user, token })
}

/// Check credentials; `Ok(None)` means the username or password is wrong
///
/// Unknown usernames still pay for one hash verification.
pub async fn login(
    pool: &SqlitePool,
    passwords: &PasswordService,
    tokens: &TokenService,
    username: &str,
    password: &str,
) -> Result<Option<Session>> {
    if username.trim().is_empty() || password.is_empty() {
        return Err(Error::InvalidInput(
            "Username and password are required".to_string(),
        ));
    }

    let record = match normalize_username(username) {
        Ok(username) => users::find_by_username(pool, &username).await?,
        Err(_) => None,
    };

    let Some(record) = record else {
        passwords.verify_dummy(password.to_string()).await;
        return Ok(None);
    };

    let valid = passwords
        .verify_password_blocking(password.to_string(), record.password_hash.clone())
        .await;
    if !valid {
        return Ok(None);
    }

    let token = tokens.issue_token(record.user.id, &record.user.username)?;
    Ok(Some(Session {
        user: record.user,
        token,
    }))
}

/// Load the user behind a verified token
pub async fn find_user(pool: &SqlitePool, user_id: Uuid) -> Result<Option<User>> {
    users::find_by_id(pool, user_id).await
}

/// Administrative deletion by username; cascades to everything the user owns
pub async fn delete_user_by_username(pool: &SqlitePool, username: &str) -> Result<User> {
    let username = normalize_username(username)?;
    let record = users::find_by_username(pool, &username)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User '{}'", username)))?;

    users::delete_user(pool, record.user.id).await?;
    info!(user_id = %record.user.id, username = %record.user.username, "User deleted");
    Ok(record.user)
}
