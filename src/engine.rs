use bytes::Bytes;
use std::path::Path;
use tracing::info;

use crate::analysis_manager::AnalysisManager;
use crate::database::DatabaseManager;
use crate::dataset_manager::DatasetManager;
use crate::domain::{AnalysisRecord, ColumnProfile, DatasetRecord, Page};
use crate::error::ServiceError;
use crate::storage::DatasetStorage;

/// Facade over the dataset and analysis managers; one instance serves the
/// whole process.
pub struct CausalEngine {
    datasets: DatasetManager,
    analyses: AnalysisManager,
    database: DatabaseManager,
}

impl CausalEngine {
    pub async fn new(data_dir: &Path, database_url: &str) -> Result<Self, ServiceError> {
        info!("Initializing causal engine");

        let database = DatabaseManager::new(database_url).await?;
        let storage = DatasetStorage::new_local(data_dir)?;

        let datasets = DatasetManager::new(storage, database.clone());
        let analyses = AnalysisManager::new(database.clone());

        info!("Causal engine initialized successfully");

        Ok(Self {
            datasets,
            analyses,
            database,
        })
    }

    pub async fn upload_dataset(
        &self,
        name: &str,
        description: Option<&str>,
        file_bytes: Bytes,
        file_name: &str,
    ) -> Result<DatasetRecord, ServiceError> {
        self.datasets
            .upload_dataset(name, description, file_bytes, file_name)
            .await
    }

    pub async fn process_dataset(&self, dataset_id: i32) -> Result<DatasetRecord, ServiceError> {
        self.datasets.process_dataset(dataset_id).await
    }

    pub async fn list_datasets(&self, page: Page) -> Result<Vec<DatasetRecord>, ServiceError> {
        self.datasets.list_datasets(page).await
    }

    pub async fn get_dataset_with_columns(
        &self,
        dataset_id: i32,
    ) -> Result<(DatasetRecord, Vec<ColumnProfile>), ServiceError> {
        self.datasets.get_dataset_with_columns(dataset_id).await
    }

    pub async fn create_analysis(
        &self,
        dataset_id: i32,
        name: &str,
        target_variable: &str,
        treatment_variables: Vec<String>,
        control_variables: Vec<String>,
        method: &str,
    ) -> Result<AnalysisRecord, ServiceError> {
        self.analyses
            .create_analysis(
                dataset_id,
                name,
                target_variable,
                treatment_variables,
                control_variables,
                method,
            )
            .await
    }

    pub async fn run_analysis(&self, analysis_id: i32) -> Result<AnalysisRecord, ServiceError> {
        self.analyses.run_analysis(analysis_id).await
    }

    pub async fn list_analyses(
        &self,
        dataset_filter: Option<i32>,
        page: Page,
    ) -> Result<Vec<AnalysisRecord>, ServiceError> {
        self.analyses.list_analyses(dataset_filter, page).await
    }

    pub async fn get_analysis(&self, analysis_id: i32) -> Result<AnalysisRecord, ServiceError> {
        self.analyses.get_analysis(analysis_id).await
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        self.database.ping().await
    }
}
