use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::storage::BoxReader;
use futures::TryStreamExt;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::instrument;
use uuid::Uuid;

use crate::dedup::IngestOutcome;
use crate::error::{AppError, ErrorBody};
use crate::models::file::{FileListResponse, FileResponse, ListFilesParams};
use crate::record::{FileRecord, RecordFilter};
use crate::savings::SavingsReport;
use crate::state::AppState;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[utoipa::path(
    post,
    path = "/files",
    tag = "Files",
    operation_id = "uploadFile",
    summary = "Upload a file",
    description = "Uploads the `file` multipart field. Content already stored is not written \
        again: the existing record's reference count goes up and it is returned with 200. \
        New content is stored and returned with 201.",
    request_body(content_type = "multipart/form-data", description = "File upload"),
    responses(
        (status = 201, description = "New content stored", body = FileResponse),
        (status = 200, description = "Content already stored (dedup hit)", body = FileResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, multipart), fields(filename))]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut outcome: Option<IngestOutcome> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        tracing::Span::current().record("filename", filename.as_str());
        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                mime_guess::from_path(&filename)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string());

        let source: BoxReader<'_> = Box::new(StreamReader::new(Box::pin(
            field.map_err(std::io::Error::other),
        )));
        outcome = Some(
            state
                .coordinator
                .ingest(Some(source), &filename, &content_type)
                .await?,
        );
        break;
    }

    let outcome = outcome.ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(FileResponse::from(outcome.record))))
}

#[utoipa::path(
    get,
    path = "/files",
    tag = "Files",
    operation_id = "listFiles",
    summary = "List stored files",
    description = "Returns one entry per unique content, newest first. All filters are optional \
        and combine with AND. Inverted date bounds are swapped.",
    params(ListFilesParams),
    responses(
        (status = 200, description = "Matching files", body = FileListResponse),
        (status = 400, description = "Invalid filter (VALIDATION_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn list_files(
    State(state): State<AppState>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<FileListResponse>, AppError> {
    let filter = RecordFilter::try_from(params)?;
    let records = state.repository().list(&filter).await?;

    let files: Vec<FileResponse> = records.into_iter().map(FileResponse::from).collect();
    let total = files.len() as u64;
    Ok(Json(FileListResponse { files, total }))
}

#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "Files",
    operation_id = "getFile",
    summary = "Get file metadata",
    params(("id" = String, Path, description = "File record ID (UUID)")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, AppError> {
    let record = find_record(&state, &id).await?;
    Ok(Json(FileResponse::from(record)))
}

#[utoipa::path(
    get,
    path = "/files/{id}/download",
    tag = "Files",
    operation_id = "downloadFile",
    summary = "Download file content",
    description = "Streams the stored bytes under the first uploader's filename. \
        Supports ETag-based caching via If-None-Match.",
    params(("id" = String, Path, description = "File record ID (UUID)")),
    responses(
        (status = 200, description = "File content"),
        (status = 304, description = "Not Modified (ETag match)"),
        (status = 400, description = "Invalid ID (VALIDATION_ERROR)", body = ErrorBody),
        (status = 404, description = "File not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, headers))]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let record = find_record(&state, &id).await?;
    build_blob_response(&state, &record, &headers).await
}

#[utoipa::path(
    get,
    path = "/files/storage-savings",
    tag = "Files",
    operation_id = "getStorageSavings",
    summary = "Report deduplication savings",
    description = "Computed from current records on every call.",
    responses(
        (status = 200, description = "Savings report", body = SavingsReport),
        (status = 500, description = "Repository failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn storage_savings(
    State(state): State<AppState>,
) -> Result<Json<SavingsReport>, AppError> {
    Ok(Json(state.accountant.report().await?))
}

async fn find_record(state: &AppState, id: &str) -> Result<FileRecord, AppError> {
    let uuid =
        Uuid::parse_str(id).map_err(|_| AppError::Validation("Invalid file ID".into()))?;
    state
        .repository()
        .get(uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".into()))
}

/// Build a streaming blob response for a record.
async fn build_blob_response(
    state: &AppState,
    record: &FileRecord,
    headers: &HeaderMap,
) -> Result<Response, AppError> {
    let etag_value = format!("\"{}\"", record.content_hash);
    if let Some(if_none_match) = headers.get(header::IF_NONE_MATCH)
        && let Ok(val) = if_none_match.to_str()
        && (val == etag_value || val == "*")
    {
        return Ok(StatusCode::NOT_MODIFIED.into_response());
    }

    let reader = state.blob_store().get_stream(&record.blob_handle).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, record.content_type.as_str())
        .header(header::CONTENT_LENGTH, record.size_bytes.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_value(&record.original_filename),
        )
        .header(header::ETAG, &etag_value)
        .header(header::CACHE_CONTROL, "private, max-age=3600")
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))
}

/// Build a `Content-Disposition` header value that survives any filename.
fn content_disposition_value(filename: &str) -> String {
    let ascii_safe: String = filename
        .chars()
        .filter(|c| c.is_ascii_graphic() && !matches!(c, '"' | ';' | '\\'))
        .collect();
    let ascii_name = if ascii_safe.is_empty() {
        "download".to_string()
    } else {
        ascii_safe
    };

    // RFC 5987 percent-encoding for filename*.
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'!'
            | b'#'
            | b'$'
            | b'&'
            | b'+'
            | b'-'
            | b'.'
            | b'^'
            | b'_'
            | b'`'
            | b'|'
            | b'~' => String::from(b as char),
            _ => format!("%{b:02X}"),
        })
        .collect();

    format!("attachment; filename=\"{ascii_name}\"; filename*=UTF-8''{encoded}")
}
