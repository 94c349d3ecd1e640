//! Profile Record Store
//!
//! Owns the `customer_profiles` table, one row per user, kept in the same
//! SQLite database as auth (users.sqlite). Images are never stored here;
//! the table holds only their media-store paths.

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::models::{Profile, ProfileChanges, ProfileRow};
use crate::auth::UserInfo;

/// Joined row for responses that embed the profile owner
#[derive(Debug, sqlx::FromRow)]
struct ProfileWithOwnerRow {
    #[sqlx(flatten)]
    profile: ProfileRow,
    owner_email: String,
    owner_username: String,
    owner_created_at: String,
}

/// Profile manager handles all profile record operations
pub struct ProfileManager {
    db_path: std::path::PathBuf,
}

impl ProfileManager {
    /// Create new profile manager
    pub async fn new(base_dir: &Path) -> Result<Self> {
        let db_path = base_dir.join("users.sqlite");

        let manager = Self { db_path };
        manager.init_db().await?;

        info!("[Profile] Initialized");
        Ok(manager)
    }

    /// Get database connection
    async fn get_pool(&self) -> Result<sqlx::SqlitePool> {
        use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
        use std::str::FromStr;

        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{}", self.db_path.display()))?
                .create_if_missing(true);
        Ok(SqlitePoolOptions::new().connect_with(options).await?)
    }

    /// Initialize database tables
    async fn init_db(&self) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customer_profiles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL UNIQUE,
                phone_number TEXT,
                address TEXT,
                city TEXT,
                state TEXT,
                postal_code TEXT,
                profile_image TEXT,
                bio TEXT,
                preferences TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id)
            )
            "#,
        )
        .execute(&pool)
        .await?;

        pool.close().await;
        Ok(())
    }

    /// Whether a profile exists for this user
    pub async fn exists_for_owner(&self, user_id: &str) -> Result<bool> {
        let pool = self.get_pool().await?;

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT id FROM customer_profiles WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&pool)
                .await?;

        pool.close().await;

        Ok(existing.is_some())
    }

    /// Fetch a user's profile
    pub async fn find_by_owner(&self, user_id: &str) -> Result<Option<Profile>> {
        let pool = self.get_pool().await?;

        let row: Option<ProfileRow> = sqlx::query_as(
            "SELECT id, user_id, phone_number, address, city, state, postal_code,
                    profile_image, bio, preferences, created_at, updated_at
             FROM customer_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        Ok(row.map(Profile::from))
    }

    /// Fetch a user's profile together with its owner record
    pub async fn load_with_owner(&self, user_id: &str) -> Result<Option<(Profile, UserInfo)>> {
        let pool = self.get_pool().await?;

        let row: Option<ProfileWithOwnerRow> = sqlx::query_as(
            r#"
            SELECT
                p.id, p.user_id, p.phone_number, p.address, p.city, p.state,
                p.postal_code, p.profile_image, p.bio, p.preferences,
                p.created_at, p.updated_at,
                u.email AS owner_email,
                u.username AS owner_username,
                u.created_at AS owner_created_at
            FROM customer_profiles p
            JOIN users u ON p.user_id = u.id
            WHERE p.user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&pool)
        .await?;

        pool.close().await;

        Ok(row.map(|row| {
            let user = UserInfo {
                id: row.profile.user_id.clone(),
                email: row.owner_email,
                username: row.owner_username,
                created_at: row.owner_created_at.parse().unwrap_or_else(|_| Utc::now()),
            };
            (Profile::from(row.profile), user)
        }))
    }

    /// Create a profile for a user. Fails if one already exists (the
    /// UNIQUE constraint on user_id backstops concurrent creates).
    pub async fn create(&self, user_id: &str, fields: &ProfileChanges) -> Result<Profile> {
        let pool = self.get_pool().await?;

        let now = Utc::now();
        let phone_number = normalized(&fields.phone_number);
        let address = normalized(&fields.address);
        let city = normalized(&fields.city);
        let state = normalized(&fields.state);
        let postal_code = normalized(&fields.postal_code);
        let bio = normalized(&fields.bio);
        let preferences = normalized(&fields.preferences);
        let profile_image = normalized(&fields.profile_image);

        let profile = Profile {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            phone_number: phone_number.clone(),
            address: address.clone(),
            city: city.clone(),
            state: state.clone(),
            postal_code: postal_code.clone(),
            profile_image: profile_image.clone(),
            bio: bio.clone(),
            preferences: preferences
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO customer_profiles
                 (id, user_id, phone_number, address, city, state, postal_code,
                  profile_image, bio, preferences, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(&phone_number)
        .bind(&address)
        .bind(&city)
        .bind(&state)
        .bind(&postal_code)
        .bind(&profile_image)
        .bind(&bio)
        .bind(&preferences)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&pool)
        .await?;

        pool.close().await;

        info!("[Profile] Created profile {} for user {}", profile.id, user_id);

        Ok(profile)
    }

    /// Apply a sparse write-set to a user's profile. Absent fields are left
    /// untouched; empty strings clear the stored value. A no-op write-set
    /// does not touch the row at all.
    pub async fn update_fields(&self, user_id: &str, changes: &ProfileChanges) -> Result<()> {
        if !changes.has_updates() {
            return Ok(());
        }

        let pool = self.get_pool().await?;

        if let Some(value) = &changes.phone_number {
            sqlx::query("UPDATE customer_profiles SET phone_number = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.address {
            sqlx::query("UPDATE customer_profiles SET address = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.city {
            sqlx::query("UPDATE customer_profiles SET city = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.state {
            sqlx::query("UPDATE customer_profiles SET state = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.postal_code {
            sqlx::query("UPDATE customer_profiles SET postal_code = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.bio {
            sqlx::query("UPDATE customer_profiles SET bio = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.preferences {
            sqlx::query("UPDATE customer_profiles SET preferences = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        if let Some(value) = &changes.profile_image {
            sqlx::query("UPDATE customer_profiles SET profile_image = ? WHERE user_id = ?")
                .bind(non_empty(value))
                .bind(user_id)
                .execute(&pool)
                .await?;
        }

        sqlx::query("UPDATE customer_profiles SET updated_at = ? WHERE user_id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(user_id)
            .execute(&pool)
            .await?;

        pool.close().await;

        info!("[Profile] Updated profile fields for user {}", user_id);

        Ok(())
    }

    /// Delete a user's profile record
    pub async fn delete_by_owner(&self, user_id: &str) -> Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query("DELETE FROM customer_profiles WHERE user_id = ?")
            .bind(user_id)
            .execute(&pool)
            .await?;

        pool.close().await;

        info!("[Profile] Deleted profile for user {}", user_id);

        Ok(())
    }
}

/// Empty strings persist as NULL: a field sent empty clears its value
fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn normalized(field: &Option<String>) -> Option<String> {
    field.as_deref().and_then(non_empty).map(String::from)
}
