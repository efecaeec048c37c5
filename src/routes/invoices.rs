use std::time::Duration;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::models::{AppState, PresignedUrlResponse, UploadPayload};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/invoices", post(upload_invoice))
        .route("/api/archive/{*key}", get(archive_url))
        .with_state(state)
}

/// Where an upload lands in the archive. The random prefix keeps repeated
/// uploads of the same filename from overwriting each other.
fn archive_key(filename: &str) -> String {
    format!("invoices/{}-{}", Uuid::new_v4(), filename)
}

/// Accepts one multipart upload under the `file` field, runs it through
/// the worker pool and answers with the extracted invoice.
///
/// The call is synchronous end to end: when every worker is busy and the
/// queue is full, the request waits here instead of failing.
async fn upload_invoice(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let mut payload: Option<UploadPayload> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };

        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .unwrap_or_else(|| "upload.bin".to_string());
        let content_type = field.content_type().map(str::to_string).unwrap_or_else(|| {
            mime_guess::from_path(&filename)
                .first_or_octet_stream()
                .to_string()
        });

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return (StatusCode::BAD_REQUEST, e.to_string()).into_response(),
        };

        payload = Some(UploadPayload::new(data, content_type, filename));
        break;
    }

    let Some(payload) = payload else {
        return (
            StatusCode::BAD_REQUEST,
            "missing multipart field: file".to_string(),
        )
            .into_response();
    };

    let key = archive_key(&payload.filename);
    info!(filename = %payload.filename, %key, "dispatching upload");

    match state.dispatcher.dispatch(payload, key).await {
        Ok(output) => {
            let mut response = (StatusCode::CREATED, Json(output.invoice)).into_response();
            if let Some(warning) = output.archive_warning {
                if let Ok(value) = HeaderValue::from_str(&warning) {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static("x-archive-warning"), value);
                }
            }
            response
        }
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}

#[derive(Deserialize)]
struct ArchiveUrlQuery {
    expires_secs: Option<u64>,
}

/// Hands out a presigned download link for an archived original.
async fn archive_url(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(query): Query<ArchiveUrlQuery>,
) -> Result<Json<PresignedUrlResponse>, (StatusCode, String)> {
    let expires = Duration::from_secs(query.expires_secs.unwrap_or(0));

    let url = state
        .store
        .presigned_get_url(&key, expires)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(PresignedUrlResponse { url }))
}
