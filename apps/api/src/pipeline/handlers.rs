use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    Json,
};
use tracing::debug;

use crate::errors::AppError;
use crate::models::analysis::AnalysisResponse;
use crate::models::upload::{MediaType, UploadedFile};
use crate::state::AppState;

/// POST /analyze
///
/// Multipart fields: `user_id` (required), `query` (optional), and one or more
/// `files` parts (`file` is accepted as an alias). Intake rejections come back
/// as 400 with the full response body; everything else is 200.
pub async fn handle_analyze(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AnalysisResponse>), AppError> {
    let mut user_id: Option<String> = None;
    let mut query: Option<String> = None;
    let mut files: Vec<UploadedFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => user_id = Some(field.text().await.map_err(multipart_error)?),
            Some("query") => query = Some(field.text().await.map_err(multipart_error)?),
            Some("files") | Some("file") => {
                if let Some(file) = read_file(field, files.len()).await? {
                    files.push(file);
                }
            }
            other => debug!("Ignoring multipart field {other:?}"),
        }
    }

    let user_id = user_id
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::Validation("user_id is required".into()))?;

    let response = state
        .pipeline
        .process(&user_id, query.as_deref(), files)
        .await;

    let status = match &response.error {
        Some(err) if err.kind.is_intake_rejection() => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    Ok((status, Json(response)))
}

/// Reads one file part. Parts with neither a file name nor content are
/// browser artefacts from an empty file input and are skipped.
async fn read_file(field: Field<'_>, index: usize) -> Result<Option<UploadedFile>, AppError> {
    let file_name = field.file_name().map(sanitize_file_name).unwrap_or_default();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(multipart_error)?;

    if file_name.is_empty() && bytes.is_empty() {
        return Ok(None);
    }
    let file_name = if file_name.is_empty() {
        format!("upload-{}", index + 1)
    } else {
        file_name
    };

    let media_type = MediaType::detect(content_type.as_deref(), &file_name);
    Ok(Some(UploadedFile::new(file_name, media_type, bytes)))
}

/// Keeps only the last path component of a client-supplied file name.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn multipart_error(err: axum::extract::multipart::MultipartError) -> AppError {
    AppError::Validation(format!("Invalid multipart body: {}", err.body_text()))
}
