use bytes::Bytes;
use chrono::Utc;
use tracing::{info, warn};

use crate::database::DatabaseManager;
use crate::domain::{ColumnProfile, DatasetRecord, DatasetStatus, Page};
use crate::error::ServiceError;
use crate::models::{NewColumn, NewDataset};
use crate::storage::DatasetStorage;
use crate::tabular::{self, TableSlice};

/// Ingestion and profiling over uploaded datasets: raw bytes land in the
/// object store, metadata in Postgres.
pub struct DatasetManager {
    storage: DatasetStorage,
    database: DatabaseManager,
}

impl DatasetManager {
    pub fn new(storage: DatasetStorage, database: DatabaseManager) -> Self {
        Self { storage, database }
    }

    /// Persists the uploaded bytes and records the dataset in state
    /// `uploading` with its coarse shape. Profiling happens separately via
    /// [`process_dataset`](Self::process_dataset).
    pub async fn upload_dataset(
        &self,
        name: &str,
        description: Option<&str>,
        file_bytes: Bytes,
        file_name: &str,
    ) -> Result<DatasetRecord, ServiceError> {
        if name.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "dataset name must not be empty".to_string(),
            });
        }

        let locator = DatasetStorage::derive_locator(file_name);
        let file_size = file_bytes.len() as i64;

        let content = String::from_utf8_lossy(&file_bytes).into_owned();
        self.storage.put_file(&locator, file_bytes).await?;

        let (columns_count, rows_count) = tabular::compute_shape(&content);

        let record = self
            .database
            .insert_dataset(NewDataset {
                name,
                description,
                file_path: &locator,
                file_size,
                columns_count,
                rows_count,
                status: DatasetStatus::Uploading.as_str(),
                uploaded_at: Utc::now(),
            })
            .await?;

        info!(
            "Uploaded dataset {} ('{}'): {} bytes, {} columns, {} rows",
            record.id, record.name, file_size, columns_count, rows_count
        );
        Ok(record)
    }

    /// Profiles a dataset: infers per-column types and candidate roles,
    /// captures a bounded row sample, and promotes the dataset to `ready`.
    /// Only `uploading` and `error` datasets may be processed.
    pub async fn process_dataset(&self, dataset_id: i32) -> Result<DatasetRecord, ServiceError> {
        let record = self
            .database
            .get_dataset(dataset_id)
            .await?
            .ok_or(ServiceError::DatasetNotFound { dataset_id })?;

        if !record.status.is_processable() {
            return Err(ServiceError::InvalidState {
                message: format!(
                    "dataset {} is {}; only uploading or error datasets can be processed",
                    dataset_id, record.status
                ),
            });
        }

        // Visible to concurrent readers before any file work begins.
        self.database
            .set_dataset_status(dataset_id, DatasetStatus::Processing)
            .await?;

        match self.profile_dataset(&record).await {
            Ok(updated) => Ok(updated),
            Err(e) => {
                if let Err(status_err) = self
                    .database
                    .set_dataset_status(dataset_id, DatasetStatus::Error)
                    .await
                {
                    warn!(
                        "Failed to mark dataset {} as error: {}",
                        dataset_id, status_err
                    );
                }
                Err(e)
            }
        }
    }

    async fn profile_dataset(
        &self,
        record: &DatasetRecord,
    ) -> Result<DatasetRecord, ServiceError> {
        // An unreadable file is a soft failure: the dataset still reaches
        // `ready`, with prior counts and no inferred columns.
        let table: Option<TableSlice> = match self.storage.read_file(&record.file_path).await {
            Ok(bytes) => Some(tabular::parse_table(&String::from_utf8_lossy(&bytes))),
            Err(e) => {
                warn!(
                    "Could not read stored file {} for dataset {}: {}",
                    record.file_path, record.id, e
                );
                None
            }
        };

        match table {
            Some(table) => {
                let inferred = tabular::profile_columns(&table);
                let new_columns = inferred
                    .into_iter()
                    .map(|col| NewColumn {
                        dataset_id: record.id,
                        name: col.name,
                        data_type: col.data_type.as_str().to_string(),
                        null_count: col.null_count,
                        unique_count: col.unique_count,
                        sample_values: Some(col.sample_values),
                        is_potential_target: col.is_potential_target,
                        is_potential_treatment: col.is_potential_treatment,
                    })
                    .collect();

                let sample_rows = serde_json::to_value(table.sample_rows())?;

                self.database
                    .finish_profiling(
                        record.id,
                        table.header.len() as i32,
                        table.rows.len() as i32,
                        Some(sample_rows),
                        new_columns,
                    )
                    .await
            }
            None => {
                self.database
                    .finish_profiling(
                        record.id,
                        record.columns_count,
                        record.rows_count,
                        None,
                        Vec::new(),
                    )
                    .await
            }
        }
    }

    pub async fn list_datasets(&self, page: Page) -> Result<Vec<DatasetRecord>, ServiceError> {
        self.database.list_datasets(page).await
    }

    pub async fn get_dataset_with_columns(
        &self,
        dataset_id: i32,
    ) -> Result<(DatasetRecord, Vec<ColumnProfile>), ServiceError> {
        let record = self
            .database
            .get_dataset(dataset_id)
            .await?
            .ok_or(ServiceError::DatasetNotFound { dataset_id })?;

        let columns = self.database.list_columns(dataset_id).await?;
        Ok((record, columns))
    }
}
