use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::record::{FileRecord, RecordFilter};

/// Response DTO for a single stored file.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileResponse {
    /// File record ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Filename given by the first uploader of this content.
    #[schema(example = "report.pdf")]
    pub original_filename: String,
    /// MIME type declared by the first uploader.
    #[schema(example = "application/pdf")]
    pub file_type: String,
    /// Content size in bytes.
    #[schema(example = 142857)]
    pub size: u64,
    /// SHA-256 content hash.
    #[schema(example = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")]
    pub file_hash: String,
    /// Number of uploads that resolved to this content.
    #[schema(example = 2)]
    pub reference_count: u64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponse {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id.to_string(),
            original_filename: record.original_filename,
            file_type: record.content_type,
            size: record.size_bytes,
            file_hash: record.content_hash.to_hex(),
            reference_count: record.reference_count,
            uploaded_at: record.created_at,
        }
    }
}

/// Response DTO for listing files.
#[derive(Serialize, utoipa::ToSchema)]
pub struct FileListResponse {
    pub files: Vec<FileResponse>,
    pub total: u64,
}

/// Query parameters for listing files.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ListFilesParams {
    /// Case-insensitive substring of the original filename.
    #[param(example = "report")]
    pub search: Option<String>,
    /// Exact MIME type.
    #[param(example = "application/pdf")]
    pub file_type: Option<String>,
    /// Minimum size in bytes (inclusive).
    pub min_size: Option<u64>,
    /// Maximum size in bytes (inclusive).
    pub max_size: Option<u64>,
    /// Earliest upload time, RFC 3339 or `YYYY-MM-DD` (inclusive).
    #[param(example = "2025-01-01")]
    pub start_date: Option<String>,
    /// Latest upload time, RFC 3339 or `YYYY-MM-DD` (inclusive, whole day).
    #[param(example = "2025-12-31")]
    pub end_date: Option<String>,
}

/// Which end of a day a bare date stands for.
#[derive(Clone, Copy)]
enum DayBound {
    Start,
    End,
}

fn parse_date_param(name: &str, value: &str, bound: DayBound) -> Result<DateTime<Utc>, AppError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        AppError::Validation(format!(
            "{name} must be an RFC 3339 timestamp or YYYY-MM-DD date"
        ))
    })?;
    let time = match bound {
        DayBound::Start => NaiveTime::MIN,
        DayBound::End => NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN),
    };
    Ok(date.and_time(time).and_utc())
}

impl TryFrom<ListFilesParams> for RecordFilter {
    type Error = AppError;

    fn try_from(params: ListFilesParams) -> Result<Self, Self::Error> {
        if let (Some(min), Some(max)) = (params.min_size, params.max_size)
            && min > max
        {
            return Err(AppError::Validation(
                "min_size must not exceed max_size".into(),
            ));
        }

        let non_blank = |s: Option<String>| s.filter(|v| !v.trim().is_empty());

        let start_date = non_blank(params.start_date)
            .map(|v| parse_date_param("start_date", &v, DayBound::Start))
            .transpose()?;
        let end_date = non_blank(params.end_date)
            .map(|v| parse_date_param("end_date", &v, DayBound::End))
            .transpose()?;

        Ok(RecordFilter {
            search: non_blank(params.search),
            file_type: non_blank(params.file_type),
            min_size: params.min_size,
            max_size: params.max_size,
            start_date,
            end_date,
        }
        .normalized())
    }
}
