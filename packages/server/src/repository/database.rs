use async_trait::async_trait;
use common::storage::{BlobHandle, ContentHash};
use sea_orm::sea_query::{Expr, ExprTrait, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
};
use uuid::Uuid;

use super::{AggregateSizes, FileRecordRepository, RepositoryError};
use crate::entity::file_record;
use crate::record::{FileRecord, NewFileRecord, RecordFilter};

/// Repository backed by the `file_record` table.
///
/// The content hash is the primary key, so the database itself arbitrates
/// concurrent inserts of the same digest.
#[derive(Clone)]
pub struct DatabaseRepository {
    db: DatabaseConnection,
}

impl DatabaseRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

impl TryFrom<file_record::Model> for FileRecord {
    type Error = RepositoryError;

    fn try_from(model: file_record::Model) -> Result<Self, Self::Error> {
        let corrupt = |field: &str, detail: String| {
            RepositoryError::Corrupt(format!("{}: {field}: {detail}", model.content_hash))
        };
        Ok(Self {
            id: model.id,
            content_hash: ContentHash::from_hex(&model.content_hash)
                .map_err(|e| corrupt("content_hash", e.to_string()))?,
            size_bytes: u64::try_from(model.size_bytes)
                .map_err(|e| corrupt("size_bytes", e.to_string()))?,
            reference_count: u64::try_from(model.reference_count)
                .map_err(|e| corrupt("reference_count", e.to_string()))?,
            blob_handle: BlobHandle::parse(&model.blob_handle)
                .map_err(|e| corrupt("blob_handle", e.to_string()))?,
            created_at: model.created_at,
            original_filename: model.original_filename,
            content_type: model.content_type,
        })
    }
}

fn clamp_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Select the row for one digest. `Entity::find_by_id` targets the unique
/// `id` column, not the primary key.
fn by_digest(digest: &ContentHash) -> sea_orm::Select<file_record::Entity> {
    file_record::Entity::find().filter(file_record::Column::ContentHash.eq(digest.to_hex()))
}

#[async_trait]
impl FileRecordRepository for DatabaseRepository {
    async fn find_by_digest(
        &self,
        digest: &ContentHash,
    ) -> Result<Option<FileRecord>, RepositoryError> {
        by_digest(digest)
            .one(&self.db)
            .await?
            .map(FileRecord::try_from)
            .transpose()
    }

    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, RepositoryError> {
        let record = record.into_record();
        let model = file_record::ActiveModel {
            content_hash: Set(record.content_hash.to_hex()),
            id: Set(record.id),
            original_filename: Set(record.original_filename.clone()),
            content_type: Set(record.content_type.clone()),
            size_bytes: Set(clamp_i64(record.size_bytes)),
            reference_count: Set(clamp_i64(record.reference_count)),
            blob_handle: Set(record.blob_handle.to_string()),
            created_at: Set(record.created_at),
        };

        let inserted = file_record::Entity::insert(model)
            .on_conflict(
                OnConflict::column(file_record::Column::ContentHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        if inserted == 0 {
            return Err(RepositoryError::DuplicateDigest(record.content_hash));
        }
        Ok(record)
    }

    async fn increment_reference(
        &self,
        digest: &ContentHash,
    ) -> Result<FileRecord, RepositoryError> {
        let txn = self.db.begin().await?;

        // The row stays locked until commit, so the re-read sees exactly our increment.
        let updated = file_record::Entity::update_many()
            .col_expr(
                file_record::Column::ReferenceCount,
                Expr::col(file_record::Column::ReferenceCount).add(1),
            )
            .filter(file_record::Column::ContentHash.eq(digest.to_hex()))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            return Err(RepositoryError::NotFound(*digest));
        }

        let model = by_digest(digest)
            .one(&txn)
            .await?
            .ok_or(RepositoryError::NotFound(*digest))?;
        txn.commit().await?;

        FileRecord::try_from(model)
    }

    async fn aggregate_sizes(&self) -> Result<AggregateSizes, RepositoryError> {
        let rows: Vec<(i64, i64)> = file_record::Entity::find()
            .select_only()
            .column(file_record::Column::SizeBytes)
            .column(file_record::Column::ReferenceCount)
            .into_tuple()
            .all(&self.db)
            .await?;

        let mut sizes = AggregateSizes::default();
        for (size_bytes, reference_count) in rows {
            let non_negative = |field: &str, value: i64| {
                u64::try_from(value)
                    .map_err(|_| RepositoryError::Corrupt(format!("negative {field}: {value}")))
            };
            sizes.add(
                non_negative("size_bytes", size_bytes)?,
                non_negative("reference_count", reference_count)?,
            );
        }
        Ok(sizes)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>, RepositoryError> {
        file_record::Entity::find()
            .filter(file_record::Column::Id.eq(id))
            .one(&self.db)
            .await?
            .map(FileRecord::try_from)
            .transpose()
    }

    async fn list(&self, filter: &RecordFilter) -> Result<Vec<FileRecord>, RepositoryError> {
        let mut query = file_record::Entity::find();

        if let Some(file_type) = &filter.file_type {
            query = query.filter(file_record::Column::ContentType.eq(file_type.as_str()));
        }
        if let Some(min) = filter.min_size {
            query = query.filter(file_record::Column::SizeBytes.gte(clamp_i64(min)));
        }
        if let Some(max) = filter.max_size {
            query = query.filter(file_record::Column::SizeBytes.lte(clamp_i64(max)));
        }
        if let Some(start) = filter.start_date {
            query = query.filter(file_record::Column::CreatedAt.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(file_record::Column::CreatedAt.lte(end));
        }

        let models = query
            .order_by_desc(file_record::Column::CreatedAt)
            .order_by_desc(file_record::Column::Id)
            .all(&self.db)
            .await?;

        // Filename search is case-insensitive across backends, so it runs here.
        let mut records = Vec::with_capacity(models.len());
        for model in models {
            let record = FileRecord::try_from(model)?;
            if filter.matches(&record) {
                records.push(record);
            }
        }
        Ok(records)
    }
}
