use bytes::Bytes;
use chrono::Utc;
use object_store::{local::LocalFileSystem, path::Path as ObjectPath, ObjectStore, PutPayload};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::ServiceError;

/// Durable home for uploaded dataset files. Backed by the local filesystem;
/// the `ObjectStore` seam means an object-storage bucket is a constructor
/// swap away.
#[derive(Debug)]
pub struct DatasetStorage {
    store: Arc<dyn ObjectStore>,
}

impl DatasetStorage {
    pub fn new_local(root: &Path) -> Result<Self, ServiceError> {
        info!("Initializing local dataset storage under {:?}", root);

        std::fs::create_dir_all(root).map_err(|e| ServiceError::StorageError {
            message: format!("Failed to create storage root {:?}: {}", root, e),
        })?;

        let store = LocalFileSystem::new_with_prefix(root).map_err(|e| {
            ServiceError::StorageError {
                message: format!("Failed to open storage root {:?}: {}", root, e),
            }
        })?;

        Ok(Self {
            store: Arc::new(store),
        })
    }

    pub fn with_store(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Timestamp-prefixed locator so repeated uploads of the same file name
    /// never collide. The locator is persisted on the dataset row and is the
    /// authoritative path back to the bytes.
    pub fn derive_locator(file_name: &str) -> String {
        format!(
            "uploads/{}_{}",
            Utc::now().format("%Y%m%d%H%M%S%3f"),
            file_name
        )
    }

    pub async fn put_file(&self, locator: &str, data: Bytes) -> Result<(), ServiceError> {
        let path = ObjectPath::from(locator);
        let byte_count = data.len();

        self.store
            .put(&path, PutPayload::from(data))
            .await
            .map_err(|e| ServiceError::StorageError {
                message: format!("Failed to write {}: {}", locator, e),
            })?;

        info!("Stored {} bytes at {}", byte_count, locator);
        Ok(())
    }

    pub async fn read_file(&self, locator: &str) -> Result<Bytes, ServiceError> {
        let path = ObjectPath::from(locator);

        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| ServiceError::StorageError {
                message: format!("Failed to open {}: {}", locator, e),
            })?;

        result
            .bytes()
            .await
            .map_err(|e| ServiceError::StorageError {
                message: format!("Failed to read {}: {}", locator, e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locators_are_timestamp_prefixed() {
        let locator = DatasetStorage::derive_locator("trials.csv");
        assert!(locator.starts_with("uploads/"));
        assert!(locator.ends_with("_trials.csv"));
        // uploads/ + yyyymmddhhmmssmmm + _ + name
        assert!(locator.len() > "uploads/_trials.csv".len() + 16);
    }

    #[tokio::test]
    async fn put_then_read_round_trips() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DatasetStorage::new_local(dir.path()).expect("storage");

        let locator = DatasetStorage::derive_locator("sample.csv");
        let payload = Bytes::from_static(b"a,b\n1,2\n");
        storage.put_file(&locator, payload.clone()).await.unwrap();

        let read_back = storage.read_file(&locator).await.unwrap();
        assert_eq!(read_back, payload);
    }

    #[tokio::test]
    async fn any_object_store_backend_fits_the_seam() {
        let storage =
            DatasetStorage::with_store(Arc::new(object_store::memory::InMemory::new()));

        let locator = DatasetStorage::derive_locator("in_memory.csv");
        let payload = Bytes::from_static(b"k,v\nx,1\n");
        storage.put_file(&locator, payload.clone()).await.unwrap();

        assert_eq!(storage.read_file(&locator).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn reading_a_missing_locator_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = DatasetStorage::new_local(dir.path()).expect("storage");

        let err = storage
            .read_file("uploads/19700101000000000_absent.csv")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::StorageError { .. }));
    }
}
