use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use marina_core::{ImageUpload, SiteContent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::middleware::AdminUser;
use crate::state::AppState;

// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetValueRequest {
    pub path: String,
    pub value: Value,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub content: SiteContent,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/content/{section}", get(get_content))
}

pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/v1/admin/content/{section}",
            put(replace_content).patch(set_content_value),
        )
        .route(
            "/v1/admin/content/{section}/images",
            post(upload_image)
                .layer(DefaultBodyLimit::max(state.max_upload_bytes + MULTIPART_OVERHEAD)),
        )
}

/// GET /v1/content/{section}?path=
async fn get_content(
    State(state): State<AppState>,
    WithRejection(Path(section), _): WithRejection<Path<String>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<PathQuery>, AppError>,
) -> Result<Json<Value>, AppError> {
    let value = match query.path.as_deref() {
        Some(path) => state.content.value_at(&section, path).await?,
        None => state.content.document(&section).await?,
    };
    Ok(Json(value))
}

/// PUT /v1/admin/content/{section}
async fn replace_content(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    WithRejection(Path(section), _): WithRejection<Path<String>, AppError>,
    WithRejection(Json(doc), _): WithRejection<Json<Value>, AppError>,
) -> Result<Json<SiteContent>, AppError> {
    let saved = state.content.replace(&section, doc, admin.user_id).await?;
    Ok(Json(saved))
}

/// PATCH /v1/admin/content/{section}
async fn set_content_value(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    WithRejection(Path(section), _): WithRejection<Path<String>, AppError>,
    WithRejection(Json(req), _): WithRejection<Json<SetValueRequest>, AppError>,
) -> Result<Json<SiteContent>, AppError> {
    let saved = state
        .content
        .set_value(&section, &req.path, req.value, admin.user_id)
        .await?;
    Ok(Json(saved))
}

/// POST /v1/admin/content/{section}/images?path=
async fn upload_image(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminUser>,
    WithRejection(Path(section), _): WithRejection<Path<String>, AppError>,
    WithRejection(Query(query), _): WithRejection<Query<PathQuery>, AppError>,
    WithRejection(mut multipart, _): WithRejection<Multipart, AppError>,
) -> Result<Json<UploadResponse>, AppError> {
    let path = query
        .path
        .ok_or_else(|| AppError::ValidationError("Missing 'path' query parameter".to_string()))?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await?;
        upload = Some(ImageUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
        break;
    }

    let upload =
        upload.ok_or_else(|| AppError::ValidationError("Missing 'file' field".to_string()))?;
    let (stored, content) = state
        .content
        .upload_image(&section, &path, upload, admin.user_id)
        .await?;

    Ok(Json(UploadResponse {
        url: stored.public_url,
        key: stored.key,
        content,
    }))
}
