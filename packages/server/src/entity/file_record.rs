use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "file_record")]
pub struct Model {
    /// SHA-256 content hash, lowercase hex. One row per unique content.
    #[sea_orm(primary_key, auto_increment = false)]
    pub content_hash: String,

    /// UUIDv7 public identifier.
    #[sea_orm(unique)]
    pub id: Uuid,

    /// Filename supplied by the first uploader.
    pub original_filename: String,

    /// MIME type supplied by the first uploader.
    pub content_type: String,

    pub size_bytes: i64,

    pub reference_count: i64,

    /// Opaque blob store handle.
    pub blob_handle: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
