//! Authentication Context Module
//!
//! Resolves bearer session tokens to caller identities. Signup, login, and
//! password handling live in the upstream identity service; this module only
//! reads and mirrors the `users` and `sessions` tables it shares with it.
//! All data stored in SQLite database at <data_dir>/users.sqlite

pub mod middleware;

use std::collections::HashMap;

use anyhow::Result;
use axum::{extract::FromRequestParts, http::request::Parts};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error;

/// Public user info mirrored from the upstream identity service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Session token for authenticated requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Identity of the authenticated caller, injected by the auth middleware.
#[derive(Clone, Debug)]
pub struct Ctx {
    user_id: String,
}

impl Ctx {
    pub fn new(user_id: String) -> Self {
        Self { user_id }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl<S> FromRequestParts<S> for Ctx
where
    S: Send + Sync,
{
    type Rejection = error::Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> error::Result<Self> {
        parts
            .extensions
            .get::<Ctx>()
            .cloned()
            .ok_or(error::Error::AuthFailCtxNotInRequestExt)
    }
}

/// Lifetime of sessions minted by `issue_session`
const SESSION_TTL_DAYS: i64 = 30;

/// Auth manager handles session validation and identity mirroring
pub struct AuthManager {
    db_path: std::path::PathBuf,
    /// In-memory session cache
    sessions: RwLock<HashMap<String, Session>>,
}

impl AuthManager {
    /// Create new auth manager
    pub async fn new(base_dir: &std::path::Path) -> Result<Self> {
        let db_path = base_dir.join("users.sqlite");

        let manager = Self {
            db_path,
            sessions: RwLock::new(HashMap::new()),
        };

        // Initialize database
        manager.init_db().await?;

        info!("[Auth] Initialized at {:?}", manager.db_path);

        Ok(manager)
    }

    /// Initialize SQLite database
    async fn init_db(&self) -> Result<()> {
        let pool = self.get_pool().await?;

        // Create users table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE NOT NULL,
                username TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        // Create sessions table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    /// Get database connection
    async fn get_pool(&self) -> Result<sqlx::SqlitePool> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str(&format!(
            "sqlite://{}",
            self.db_path.to_string_lossy().replace('\\', "/")
        ))?
        .create_if_missing(true);
        Ok(SqlitePoolOptions::new().connect_with(options).await?)
    }

    /// Mirror an upstream identity into the local users table.
    /// Returns the existing record when the email is already known.
    pub async fn ensure_user(&self, email: &str, username: &str) -> Result<UserInfo> {
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, String)> =
            sqlx::query_as("SELECT id, email, username, created_at FROM users WHERE email = ?")
                .bind(email)
                .fetch_optional(&pool)
                .await?;

        if let Some((id, email, username, created_at)) = row {
            pool.close().await;
            return Ok(UserInfo {
                id,
                email,
                username,
                created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            });
        }

        let user = UserInfo {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            username: username.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query("INSERT INTO users (id, email, username, created_at) VALUES (?, ?, ?, ?)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(user.created_at.to_rfc3339())
            .execute(&pool)
            .await?;

        pool.close().await;

        info!("[Auth] User mirrored: {} ({})", user.username, user.email);

        Ok(user)
    }

    /// Mint a bearer session for an already-authenticated user.
    /// Login flows live upstream; this is only the storage side of issuance.
    pub async fn issue_session(&self, user_id: &str) -> Result<Session> {
        let pool = self.get_pool().await?;

        let existing: Option<(String,)> = sqlx::query_as("SELECT id FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&pool)
            .await?;

        if existing.is_none() {
            pool.close().await;
            return Err(anyhow::anyhow!("User not found"));
        }

        let session = Session {
            token: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS),
        };

        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&session.token)
        .bind(&session.user_id)
        .bind(session.created_at.to_rfc3339())
        .bind(session.expires_at.to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;

        // Cache session
        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        info!("[Auth] Session issued for user {}", user_id);

        Ok(session)
    }

    /// Validate session token
    pub async fn validate_session(&self, token: &str) -> Result<UserInfo> {
        // Check cache first
        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(token) {
                if session.expires_at > Utc::now() {
                    // Get user info
                    let pool = self.get_pool().await?;
                    let row: Option<(String, String, String, String)> = sqlx::query_as(
                        "SELECT id, email, username, created_at FROM users WHERE id = ?",
                    )
                    .bind(&session.user_id)
                    .fetch_optional(&pool)
                    .await?;
                    pool.close().await;

                    if let Some((id, email, username, created_at)) = row {
                        return Ok(UserInfo {
                            id,
                            email,
                            username,
                            created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
                        });
                    }
                }
            }
        }

        // Check database
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, String, String)> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.username, u.created_at, s.expires_at
            FROM users u
            JOIN sessions s ON u.id = s.user_id
            WHERE s.token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        if let Some((id, email, username, created_at, expires_at)) = row {
            let expires: DateTime<Utc> = expires_at
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid date"))?;
            if expires > Utc::now() {
                return Ok(UserInfo {
                    id,
                    email,
                    username,
                    created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
                });
            }
        }

        Err(anyhow::anyhow!("Invalid or expired session"))
    }

    /// Get user by ID
    pub async fn get_user(&self, user_id: &str) -> Result<UserInfo> {
        let pool = self.get_pool().await?;

        let row: Option<(String, String, String, String)> =
            sqlx::query_as("SELECT id, email, username, created_at FROM users WHERE id = ?")
                .bind(user_id)
                .fetch_optional(&pool)
                .await?;

        pool.close().await;

        if let Some((id, email, username, created_at)) = row {
            Ok(UserInfo {
                id,
                email,
                username,
                created_at: created_at.parse().unwrap_or_else(|_| Utc::now()),
            })
        } else {
            Err(anyhow::anyhow!("User not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_ensure_user_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let auth = AuthManager::new(dir.path()).await.unwrap();

        let first = auth.ensure_user("ada@example.com", "ada").await.unwrap();
        let second = auth.ensure_user("ada@example.com", "ada").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.email, "ada@example.com");
        assert_eq!(second.username, "ada");
    }

    #[tokio::test]
    async fn test_session_round_trip() {
        let dir = TempDir::new().unwrap();
        let auth = AuthManager::new(dir.path()).await.unwrap();

        let user = auth.ensure_user("ada@example.com", "ada").await.unwrap();
        let session = auth.issue_session(&user.id).await.unwrap();

        let validated = auth.validate_session(&session.token).await.unwrap();
        assert_eq!(validated.id, user.id);
        assert_eq!(validated.email, "ada@example.com");
    }

    #[tokio::test]
    async fn test_unknown_token_rejected() {
        let dir = TempDir::new().unwrap();
        let auth = AuthManager::new(dir.path()).await.unwrap();

        assert!(auth.validate_session("no-such-token").await.is_err());
    }

    #[tokio::test]
    async fn test_expired_session_rejected() {
        let dir = TempDir::new().unwrap();
        let auth = AuthManager::new(dir.path()).await.unwrap();

        let user = auth.ensure_user("ada@example.com", "ada").await.unwrap();

        // Write an already-expired session straight into the table so it
        // never enters the in-memory cache.
        let pool = auth.get_pool().await.unwrap();
        sqlx::query(
            "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind("expired-token")
        .bind(&user.id)
        .bind((Utc::now() - chrono::Duration::days(2)).to_rfc3339())
        .bind((Utc::now() - chrono::Duration::days(1)).to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        assert!(auth.validate_session("expired-token").await.is_err());
    }

    #[tokio::test]
    async fn test_issue_session_requires_known_user() {
        let dir = TempDir::new().unwrap();
        let auth = AuthManager::new(dir.path()).await.unwrap();

        assert!(auth.issue_session("ghost").await.is_err());
    }

    #[tokio::test]
    async fn test_validate_survives_cache_miss() {
        let dir = TempDir::new().unwrap();

        // Issue with one manager instance, validate with a fresh one whose
        // cache is empty, forcing the database join path.
        let (user_id, token) = {
            let auth = AuthManager::new(dir.path()).await.unwrap();
            let user = auth.ensure_user("ada@example.com", "ada").await.unwrap();
            let session = auth.issue_session(&user.id).await.unwrap();
            (user.id, session.token)
        };

        let auth = AuthManager::new(dir.path()).await.unwrap();
        let validated = auth.validate_session(&token).await.unwrap();
        assert_eq!(validated.id, user_id);
    }
}
