//! Handlers for the customer profile resource.
//!
//! All four operations act on the caller's own profile; the target row is
//! always the one owned by the authenticated user, never a path parameter.

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, HeaderValue, StatusCode},
    Form, Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::models::{ImageUpload, ProfileInput, ProfileResponse};
use super::validate::{sniff_image_ext, validate_input};
use crate::auth::Ctx;
use crate::config::AppState;
use crate::error::{Error, Result};

/// Namespace inside the media store for profile images
const IMAGE_NAMESPACE: &str = "profile_images";

/// GET /customer-profile
pub async fn show(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Value>> {
    info!("GET /customer-profile - {}", ctx.user_id());

    let (profile, user) = state
        .profiles
        .load_with_owner(ctx.user_id())
        .await?
        .ok_or(Error::ProfileNotFound)?;

    Ok(Json(json!({
        "profile": ProfileResponse::new(profile, user),
    })))
}

/// POST /customer-profile
pub async fn store(
    State(state): State<AppState>,
    ctx: Ctx,
    req: Request,
) -> Result<(StatusCode, Json<Value>)> {
    info!("POST /customer-profile - {}", ctx.user_id());

    let mut input = read_input(req, &state).await?;

    // The existence check runs before validation: a duplicate create is
    // reported as a conflict even when the payload is invalid.
    if state.profiles.exists_for_owner(ctx.user_id()).await? {
        return Err(Error::ProfileAlreadyExists);
    }

    validate_input(&input, state.config.max_image_kib).map_err(Error::Validation)?;

    let image = input.image.take();
    let mut changes = input.into_changes();

    if let Some(image) = &image {
        changes.profile_image = Some(store_image(&state, image).await?);
    }

    let profile = match state.profiles.create(ctx.user_id(), &changes).await {
        Ok(profile) => profile,
        Err(e) => {
            // The record never landed; don't leave the artifact behind.
            if let Some(path) = &changes.profile_image {
                if let Err(del) = state.media.delete(path).await {
                    warn!("[Profile] Orphan cleanup failed for {}: {}", path, del);
                }
            }
            return Err(e.into());
        }
    };

    let user = state.auth.get_user(ctx.user_id()).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Profile created successfully",
            "profile": ProfileResponse::new(profile, user),
        })),
    ))
}

/// PUT /customer-profile
pub async fn update(
    State(state): State<AppState>,
    ctx: Ctx,
    req: Request,
) -> Result<Json<Value>> {
    info!("PUT /customer-profile - {}", ctx.user_id());

    let mut input = read_input(req, &state).await?;

    // Missing profile wins over an invalid payload.
    let existing = state
        .profiles
        .find_by_owner(ctx.user_id())
        .await?
        .ok_or(Error::ProfileNotFound)?;

    validate_input(&input, state.config.max_image_kib).map_err(Error::Validation)?;

    let image = input.image.take();
    let mut changes = input.into_changes();

    if let Some(image) = &image {
        // Replacement drops the old artifact first, then stores the new one.
        if let Some(old) = &existing.profile_image {
            state.media.delete(old).await?;
        }
        changes.profile_image = Some(store_image(&state, image).await?);
    }

    state.profiles.update_fields(ctx.user_id(), &changes).await?;

    let (profile, user) = state
        .profiles
        .load_with_owner(ctx.user_id())
        .await?
        .ok_or(Error::ProfileNotFound)?;

    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": ProfileResponse::new(profile, user),
    })))
}

/// DELETE /customer-profile
pub async fn destroy(State(state): State<AppState>, ctx: Ctx) -> Result<Json<Value>> {
    info!("DELETE /customer-profile - {}", ctx.user_id());

    let profile = state
        .profiles
        .find_by_owner(ctx.user_id())
        .await?
        .ok_or(Error::ProfileNotFound)?;

    if let Some(path) = &profile.profile_image {
        state.media.delete(path).await?;
    }

    state.profiles.delete_by_owner(ctx.user_id()).await?;

    Ok(Json(json!({
        "message": "Profile deleted successfully",
    })))
}

/// Persist an uploaded image and return its storage-relative path.
async fn store_image(state: &AppState, image: &ImageUpload) -> Result<String> {
    let ext = sniff_image_ext(&image.data)
        .ok_or_else(|| Error::BadRequest("Unrecognized image format".to_string()))?;
    Ok(state.media.store(IMAGE_NAMESPACE, ext, &image.data).await?)
}

/// Decode a create/update payload from the request body.
///
/// Multipart is the normal shape (required for image parts); urlencoded
/// forms work for text-only payloads; a request without a body counts as
/// an empty payload. Anything else is rejected.
async fn read_input(req: Request, state: &AppState) -> Result<ProfileInput> {
    // Media types compare case-insensitively
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| Error::BadRequest(format!("Malformed multipart body: {}", e)))?;
        read_multipart(multipart).await
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        // Form re-validates the content type itself, case-sensitively
        let mut req = req;
        req.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );
        let Form(form) = Form::<ProfileForm>::from_request(req, state)
            .await
            .map_err(|e| Error::BadRequest(format!("Malformed form body: {}", e)))?;
        Ok(form.into_input())
    } else if content_type.is_empty() {
        Ok(ProfileInput::default())
    } else {
        Err(Error::UnsupportedMediaType)
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<ProfileInput> {
    let mut input = ProfileInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Malformed multipart field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "phone_number" => input.phone_number = Some(read_text(field).await?),
            "address" => input.address = Some(read_text(field).await?),
            "city" => input.city = Some(read_text(field).await?),
            "state" => input.state = Some(read_text(field).await?),
            "postal_code" => input.postal_code = Some(read_text(field).await?),
            "bio" => input.bio = Some(read_text(field).await?),
            "preferences" => input.preferences = Some(read_text(field).await?),
            "profile_image" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    Error::BadRequest(format!("Failed to read profile_image: {}", e))
                })?;
                // A file input left blank arrives as an empty part.
                if !data.is_empty() {
                    input.image = Some(ImageUpload {
                        filename,
                        content_type,
                        data,
                    });
                }
            }
            // Unknown fields are ignored
            _ => {}
        }
    }

    Ok(input)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| Error::BadRequest(format!("Malformed multipart field: {}", e)))
}

/// Urlencoded rendition of the payload. Files cannot travel this way; a
/// non-empty `profile_image` value is carried as raw bytes so it fails
/// image validation the same way a non-image upload would.
#[derive(Debug, Default, Deserialize)]
struct ProfileForm {
    phone_number: Option<String>,
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    bio: Option<String>,
    preferences: Option<String>,
    profile_image: Option<String>,
}

impl ProfileForm {
    fn into_input(self) -> ProfileInput {
        let image = self
            .profile_image
            .filter(|s| !s.is_empty())
            .map(|s| ImageUpload {
                filename: String::new(),
                content_type: None,
                data: Bytes::from(s.into_bytes()),
            });

        ProfileInput {
            phone_number: self.phone_number,
            address: self.address,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            bio: self.bio,
            preferences: self.preferences,
            image,
        }
    }
}
