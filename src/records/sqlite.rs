//! SQLite-backed [`RecordStore`].

use std::path::{Path, PathBuf};

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::{debug, info, instrument};

use super::error::RecordStoreError;
use super::model::{MappingRow, NewRecord, NewVectorMapping, Record, RecordRow, VectorMapping};
use super::store::RecordStore;

const RECORD_COLUMNS: &str =
    "id, name, image_url, recognition_accuracy, create_time, update_time";
const MAPPING_COLUMNS: &str =
    "id, plant_id, vector_id, similarity_threshold, create_time, update_time";

#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, RecordStoreError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| RecordStoreError::CreateDirectory {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        info!(path = %path.display(), "Opening record database");

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|source| RecordStoreError::Connect {
                path: PathBuf::from(path),
                source,
            })?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<(), RecordStoreError> {
        sqlx::migrate!("src/records/migrations")
            .run(&self.pool)
            .await?;
        debug!("Record database migrations completed");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

impl RecordStore for SqliteRecordStore {
    #[instrument(skip(self, record), fields(label = %record.label))]
    async fn insert(&self, record: NewRecord) -> Result<Record, RecordStoreError> {
        let now = Utc::now();
        let row: RecordRow = sqlx::query_as(&format!(
            "INSERT INTO records (name, image_url, recognition_accuracy, create_time, update_time) \
             VALUES (?, ?, ?, ?, ?) RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&record.label)
        .bind(&record.image_ref)
        .bind(record.confidence.map(f64::from))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(RecordStoreError::query("insert record"))?;

        debug!(record_id = row.id, "Record saved");
        Ok(row.into())
    }

    async fn get(&self, id: i64) -> Result<Option<Record>, RecordStoreError> {
        let row: Option<RecordRow> =
            sqlx::query_as(&format!("SELECT {RECORD_COLUMNS} FROM records WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(RecordStoreError::query("get record"))?;

        Ok(row.map(Record::from))
    }

    async fn attach_image(
        &self,
        id: i64,
        image_ref: &str,
    ) -> Result<Option<Record>, RecordStoreError> {
        let row: Option<RecordRow> = sqlx::query_as(&format!(
            "UPDATE records SET image_url = ?, update_time = ? WHERE id = ? \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(image_ref)
        .bind(Utc::now())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RecordStoreError::query("attach image"))?;

        Ok(row.map(Record::from))
    }

    async fn recent(&self, limit: u32) -> Result<Vec<Record>, RecordStoreError> {
        let rows: Vec<RecordRow> = sqlx::query_as(&format!(
            "SELECT {RECORD_COLUMNS} FROM records ORDER BY create_time DESC, id DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(RecordStoreError::query("list recent records"))?;

        Ok(rows.into_iter().map(Record::from).collect())
    }

    async fn save_mapping(
        &self,
        mapping: NewVectorMapping,
    ) -> Result<VectorMapping, RecordStoreError> {
        let now = Utc::now();
        let row: MappingRow = sqlx::query_as(&format!(
            "INSERT INTO record_vectors \
             (plant_id, vector_id, similarity_threshold, create_time, update_time) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT (vector_id) DO UPDATE SET \
             plant_id = excluded.plant_id, \
             similarity_threshold = excluded.similarity_threshold, \
             update_time = excluded.update_time \
             RETURNING {MAPPING_COLUMNS}"
        ))
        .bind(mapping.record_id)
        .bind(&mapping.vector_id)
        .bind(f64::from(mapping.similarity_threshold))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(RecordStoreError::query("save vector mapping"))?;

        Ok(row.into())
    }

    async fn mapping_by_vector_id(
        &self,
        vector_id: &str,
    ) -> Result<Option<VectorMapping>, RecordStoreError> {
        let row: Option<MappingRow> = sqlx::query_as(&format!(
            "SELECT {MAPPING_COLUMNS} FROM record_vectors WHERE vector_id = ?"
        ))
        .bind(vector_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RecordStoreError::query("find vector mapping"))?;

        Ok(row.map(VectorMapping::from))
    }
}
