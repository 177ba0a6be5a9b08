//! Media upload endpoints.

use axum::{
    Router,
    extract::{Multipart, State},
    routing::post,
};
use athlo_common::{AppError, AppResult};
use athlo_core::MediaUpload;
use serde::Serialize;

use crate::{extractors::AuthProfile, middleware::AppState, response::ApiResponse};

/// Uploaded media response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaFileResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Upload 1..=5 media files via multipart form.
///
/// Either every file is stored (ordered URLs returned) or none is: a
/// failure partway through deletes the files uploaded before it.
async fn upload(
    AuthProfile(me): AuthProfile,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<Vec<MediaFileResponse>>> {
    let mut uploads: Vec<MediaUpload> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(ToString::to_string)
            .unwrap_or_else(|| "upload".to_string());
        let content_type = field
            .content_type()
            .map(ToString::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
            .to_vec();

        uploads.push(MediaUpload {
            file_name,
            content_type,
            data,
        });
    }

    let files = state.media_service.upload_batch(&me.id, &uploads).await?;

    Ok(ApiResponse::ok(
        files
            .into_iter()
            .map(|f| MediaFileResponse {
                url: f.url,
                width: f.width,
                height: f.height,
            })
            .collect(),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(upload))
}
