use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;

use crate::entities::image;
use crate::error::{ApiError, UploadErrors, UploadValues};
use crate::records::{self, NewImage};
use crate::state::AppState;
use crate::storage;

const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024; // 5MB

const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

#[derive(Debug)]
pub(crate) struct UploadedFile {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

#[derive(Debug, Default)]
pub(crate) struct UploadForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file: Option<UploadedFile>,
}

/// A submission that passed validation.
pub(crate) struct ValidUpload {
    pub title: String,
    pub description: Option<String>,
    pub file: UploadedFile,
}

/// Pull the `title`, `description` and `image` fields out of a multipart
/// body. Unknown fields are skipped; an empty description collapses to none.
pub(crate) async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();
        match field_name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
                form.title = Some(text);
            }
            "description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
                if !text.is_empty() {
                    form.description = Some(text);
                }
            }
            "image" => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Read error: {e}")))?;
                form.file = Some(UploadedFile {
                    original_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Check an upload, accumulating field errors rather than stopping at the
/// first. Later `image` checks overwrite earlier ones.
pub(crate) fn validate_upload(form: UploadForm) -> Result<ValidUpload, ApiError> {
    let mut errors = UploadErrors::default();

    let title = form.title.unwrap_or_default();
    if title.trim().is_empty() {
        errors.title = Some("Title must not be empty".to_string());
    }

    match &form.file {
        None => {
            errors.image = Some("Please choose an image to upload".to_string());
        }
        Some(file) => {
            if file.bytes.is_empty() {
                errors.image = Some("Please choose an image to upload".to_string());
            }
            if !ALLOWED_IMAGE_TYPES.contains(&file.content_type.as_str()) {
                errors.image =
                    Some("Only JPG, PNG, GIF and WebP images are supported".to_string());
            }
            if file.bytes.len() > MAX_IMAGE_SIZE {
                errors.image = Some("Image must be 5MB or smaller".to_string());
            }
        }
    }

    if !errors.is_empty() {
        return Err(ApiError::Validation {
            errors,
            values: UploadValues {
                title,
                description: form.description,
            },
        });
    }

    Ok(ValidUpload {
        title,
        description: form.description,
        // Unwrap is safe: a missing file produced an `image` error above.
        file: form.file.expect("validated upload has a file"),
    })
}

/// Store the binary, then the record. A failed insert after a successful
/// put leaves an orphaned object behind; there is no compensating cleanup.
pub(crate) async fn store_image(
    state: &AppState,
    upload: ValidUpload,
) -> Result<image::Model, ApiError> {
    let key = storage::generate_object_key(&upload.file.original_name);
    let file_name = key.strip_prefix("images/").unwrap_or(&key).to_string();
    let content_type = storage::resolve_content_type(&file_name);

    state.store.put(&key, upload.file.bytes, content_type).await?;

    let record = records::create(
        &state.db,
        NewImage {
            title: upload.title,
            description: upload.description,
            file_key: key,
            file_url: format!("/api/images/file/{file_name}"),
        },
    )
    .await?;

    Ok(record)
}

/// Delete the stored object (best-effort) and then the record. `Ok` carries
/// whether a row was actually removed.
pub(crate) async fn remove_image(state: &AppState, id: &str) -> Result<bool, ApiError> {
    let record = records::get_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Image not found"))?;

    if !state.store.delete(&record.file_key).await {
        tracing::warn!(
            "object {} could not be removed; deleting the record anyway",
            record.file_key
        );
    }

    Ok(records::delete(&state.db, id).await?)
}

/// GET / and GET /api/images
pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<image::Model>>, ApiError> {
    Ok(Json(records::list_all(&state.db).await?))
}

/// GET /images/:id and GET /api/images/:id
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<image::Model>, ApiError> {
    records::get_by_id(&state.db, &id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("Image not found"))
}

/// POST /api/images
pub async fn create_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<image::Model>), ApiError> {
    let form = parse_upload(multipart).await?;
    let upload = validate_upload(form)?;
    let record = store_image(&state, upload).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/images/:id
pub async fn delete_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let success = remove_image(&state, &id).await?;
    Ok(Json(serde_json::json!({ "success": success })))
}
