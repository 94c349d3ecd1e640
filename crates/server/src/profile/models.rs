//! Customer profile data model and wire types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::auth::UserInfo;

/// Profile record, one per owning user
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `customer_profiles` row: TEXT timestamps, preferences as stored JSON
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: String,
    pub user_id: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            phone_number: row.phone_number,
            address: row.address,
            city: row.city,
            state: row.state,
            postal_code: row.postal_code,
            profile_image: row.profile_image,
            bio: row.bio,
            preferences: row
                .preferences
                .as_deref()
                .and_then(|s| serde_json::from_str(s).ok()),
            created_at: row.created_at.parse().unwrap_or_else(|_| Utc::now()),
            updated_at: row.updated_at.parse().unwrap_or_else(|_| Utc::now()),
        }
    }
}

/// An image uploaded as a multipart file part
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

/// Decoded request payload for create/update.
///
/// `None` means the field was absent from the request; `Some("")` means it
/// was sent empty, which clears the stored value.
#[derive(Debug, Default)]
pub struct ProfileInput {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<String>,
    pub image: Option<ImageUpload>,
}

impl ProfileInput {
    /// Convert into the store write-set. The image path is filled in by the
    /// handler once the artifact has been persisted.
    pub fn into_changes(self) -> ProfileChanges {
        ProfileChanges {
            phone_number: self.phone_number,
            address: self.address,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            bio: self.bio,
            preferences: self.preferences,
            profile_image: None,
        }
    }
}

/// Sparse write-set handed to the store: only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<String>,
    pub profile_image: Option<String>,
}

impl ProfileChanges {
    /// Whether any field is present in the write-set
    pub fn has_updates(&self) -> bool {
        self.phone_number.is_some()
            || self.address.is_some()
            || self.city.is_some()
            || self.state.is_some()
            || self.postal_code.is_some()
            || self.bio.is_some()
            || self.preferences.is_some()
            || self.profile_image.is_some()
    }
}

/// Response payload: the profile with its owner embedded
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub id: String,
    pub user_id: String,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub profile_image: Option<String>,
    pub bio: Option<String>,
    pub preferences: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserInfo,
}

impl ProfileResponse {
    pub fn new(profile: Profile, user: UserInfo) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            phone_number: profile.phone_number,
            address: profile.address,
            city: profile.city,
            state: profile.state,
            postal_code: profile.postal_code,
            profile_image: profile.profile_image,
            bio: profile.bio,
            preferences: profile.preferences,
            created_at: profile.created_at,
            updated_at: profile.updated_at,
            user,
        }
    }
}
