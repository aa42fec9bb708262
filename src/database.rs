use diesel::prelude::*;
use diesel_async::{
    pooled_connection::{
        deadpool::{Object, Pool},
        AsyncDieselConnectionManager,
    },
    AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing::info;

use crate::domain::{AnalysisRecord, AnalysisStatus, ColumnProfile, DatasetRecord, DatasetStatus, Page};
use crate::error::ServiceError;
use crate::models::{AnalysisRow, ColumnRow, DatasetRow, NewAnalysis, NewColumn, NewDataset};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(Clone)]
pub struct DatabaseManager {
    pool: Pool<AsyncPgConnection>,
}

impl DatabaseManager {
    pub async fn new(database_url: &str) -> Result<Self, ServiceError> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(config)
            .build()
            .map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to create database pool: {}", e),
            })?;

        let manager = Self { pool };
        manager.run_migrations(database_url)?;

        Ok(manager)
    }

    fn run_migrations(&self, database_url: &str) -> Result<(), ServiceError> {
        use diesel::Connection;
        use diesel::PgConnection;

        // diesel_migrations has no async harness yet, so migrations run over
        // a one-off synchronous connection at startup.
        let mut connection =
            PgConnection::establish(database_url).map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to establish connection for migrations: {}", e),
            })?;

        connection
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| ServiceError::ConfigError {
                message: format!("Failed to run migrations: {}", e),
            })?;

        Ok(())
    }

    async fn conn(&self) -> Result<Object<AsyncPgConnection>, ServiceError> {
        self.pool
            .get()
            .await
            .map_err(|e| ServiceError::DatabaseError {
                message: format!("Failed to get database connection: {}", e),
            })
    }

    pub async fn ping(&self) -> Result<(), ServiceError> {
        let mut conn = self.conn().await?;
        diesel::sql_query("SELECT 1").execute(&mut conn).await?;
        Ok(())
    }

    pub async fn insert_dataset(
        &self,
        new_dataset: NewDataset<'_>,
    ) -> Result<DatasetRecord, ServiceError> {
        use crate::schema::datasets::dsl::*;
        info!("Inserting dataset '{}'", new_dataset.name);

        let mut conn = self.conn().await?;
        let row: DatasetRow = diesel::insert_into(datasets)
            .values(&new_dataset)
            .get_result(&mut conn)
            .await?;

        Ok(row.into())
    }

    pub async fn get_dataset(
        &self,
        dataset_id: i32,
    ) -> Result<Option<DatasetRecord>, ServiceError> {
        use crate::schema::datasets::dsl::*;

        let mut conn = self.conn().await?;
        let row = datasets
            .filter(id.eq(dataset_id))
            .get_result::<DatasetRow>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(|r| r.into()))
    }

    /// Datasets, most recently uploaded first.
    pub async fn list_datasets(&self, page: Page) -> Result<Vec<DatasetRecord>, ServiceError> {
        use crate::schema::datasets::dsl::*;

        let mut conn = self.conn().await?;
        let rows = datasets
            .order(uploaded_at.desc())
            .limit(page.limit)
            .offset(page.offset)
            .get_results::<DatasetRow>(&mut conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub async fn set_dataset_status(
        &self,
        dataset_id: i32,
        new_status: DatasetStatus,
    ) -> Result<(), ServiceError> {
        use crate::schema::datasets::dsl::*;

        let mut conn = self.conn().await?;
        diesel::update(datasets.filter(id.eq(dataset_id)))
            .set(status.eq(new_status.as_str()))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    /// Atomically replaces a dataset's column profiles and promotes it to
    /// `ready`. Prior ColumnInfo rows are deleted, not accumulated.
    pub async fn finish_profiling(
        &self,
        target_id: i32,
        new_columns_count: i32,
        new_rows_count: i32,
        new_sample_rows: Option<serde_json::Value>,
        columns: Vec<NewColumn>,
    ) -> Result<DatasetRecord, ServiceError> {
        use crate::schema::{dataset_columns, datasets};

        let mut conn = self.conn().await?;
        let row = conn
            .transaction::<DatasetRow, ServiceError, _>(|conn| {
                Box::pin(async move {
                    diesel::delete(
                        dataset_columns::table
                            .filter(dataset_columns::dataset_id.eq(target_id)),
                    )
                    .execute(conn)
                    .await?;

                    if !columns.is_empty() {
                        diesel::insert_into(dataset_columns::table)
                            .values(&columns)
                            .execute(conn)
                            .await?;
                    }

                    let row: DatasetRow = diesel::update(
                        datasets::table.filter(datasets::id.eq(target_id)),
                    )
                    .set((
                        datasets::columns_count.eq(new_columns_count),
                        datasets::rows_count.eq(new_rows_count),
                        datasets::sample_rows.eq(new_sample_rows),
                        datasets::status.eq(DatasetStatus::Ready.as_str()),
                        datasets::processed_at.eq(Some(chrono::Utc::now())),
                    ))
                    .get_result(conn)
                    .await?;

                    Ok(row)
                })
            })
            .await?;

        info!(
            "Dataset {} profiled: {} columns, {} rows",
            target_id, new_columns_count, new_rows_count
        );
        Ok(row.into())
    }

    pub async fn list_columns(&self, target_id: i32) -> Result<Vec<ColumnProfile>, ServiceError> {
        use crate::schema::dataset_columns::dsl::*;

        let mut conn = self.conn().await?;
        let rows = dataset_columns
            .filter(dataset_id.eq(target_id))
            .order(id.asc())
            .get_results::<ColumnRow>(&mut conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    pub async fn insert_analysis(
        &self,
        new_analysis: NewAnalysis<'_>,
    ) -> Result<AnalysisRecord, ServiceError> {
        use crate::schema::analyses::dsl::*;
        info!(
            "Inserting analysis '{}' for dataset {}",
            new_analysis.name, new_analysis.dataset_id
        );

        let mut conn = self.conn().await?;
        let row: AnalysisRow = diesel::insert_into(analyses)
            .values(&new_analysis)
            .get_result(&mut conn)
            .await?;

        Ok(row.into())
    }

    pub async fn get_analysis(
        &self,
        analysis_id: i32,
    ) -> Result<Option<AnalysisRecord>, ServiceError> {
        use crate::schema::analyses::dsl::*;

        let mut conn = self.conn().await?;
        let row = analyses
            .filter(id.eq(analysis_id))
            .get_result::<AnalysisRow>(&mut conn)
            .await
            .optional()?;

        Ok(row.map(|r| r.into()))
    }

    pub async fn list_analyses(
        &self,
        dataset_filter: Option<i32>,
        page: Page,
    ) -> Result<Vec<AnalysisRecord>, ServiceError> {
        use crate::schema::analyses::dsl::*;

        let mut conn = self.conn().await?;
        let mut query = analyses.into_boxed();
        if let Some(target_id) = dataset_filter {
            query = query.filter(dataset_id.eq(target_id));
        }

        let rows = query
            .order(id.asc())
            .limit(page.limit)
            .offset(page.offset)
            .get_results::<AnalysisRow>(&mut conn)
            .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    /// Conditional pending/failed -> running transition. Returns false when
    /// another caller won the race (zero rows matched the status filter).
    pub async fn try_mark_analysis_running(
        &self,
        analysis_id: i32,
    ) -> Result<bool, ServiceError> {
        use crate::schema::analyses::dsl::*;

        let mut conn = self.conn().await?;
        let affected = diesel::update(
            analyses.filter(id.eq(analysis_id)).filter(status.eq_any([
                AnalysisStatus::Pending.as_str(),
                AnalysisStatus::Failed.as_str(),
            ])),
        )
        .set(status.eq(AnalysisStatus::Running.as_str()))
        .execute(&mut conn)
        .await?;

        Ok(affected > 0)
    }

    pub async fn complete_analysis(
        &self,
        analysis_id: i32,
        analysis_results: serde_json::Value,
        explanation: &str,
    ) -> Result<AnalysisRecord, ServiceError> {
        use crate::schema::analyses::dsl::*;

        let mut conn = self.conn().await?;
        let row: AnalysisRow = diesel::update(analyses.filter(id.eq(analysis_id)))
            .set((
                status.eq(AnalysisStatus::Completed.as_str()),
                results.eq(Some(analysis_results)),
                simple_explanation.eq(Some(explanation)),
                completed_at.eq(Some(chrono::Utc::now())),
            ))
            .get_result(&mut conn)
            .await?;

        Ok(row.into())
    }

    pub async fn set_analysis_status(
        &self,
        analysis_id: i32,
        new_status: AnalysisStatus,
    ) -> Result<(), ServiceError> {
        use crate::schema::analyses::dsl::*;

        let mut conn = self.conn().await?;
        diesel::update(analyses.filter(id.eq(analysis_id)))
            .set(status.eq(new_status.as_str()))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}
