use chrono::{DateTime, Utc};
use diesel::prelude::*;

use crate::domain::{
    AnalysisMethod, AnalysisRecord, AnalysisStatus, ColumnDataType, ColumnProfile, DatasetRecord,
    DatasetStatus,
};
use crate::schema::{analyses, dataset_columns, datasets};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = datasets)]
#[diesel(primary_key(id))]
pub struct DatasetRow {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub columns_count: i32,
    pub rows_count: i32,
    pub status: String,
    pub sample_rows: Option<serde_json::Value>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = datasets)]
pub struct NewDataset<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub file_path: &'a str,
    pub file_size: i64,
    pub columns_count: i32,
    pub rows_count: i32,
    pub status: &'a str,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = dataset_columns)]
#[diesel(belongs_to(DatasetRow, foreign_key = dataset_id))]
#[diesel(primary_key(id))]
pub struct ColumnRow {
    pub id: i32,
    pub dataset_id: i32,
    pub name: String,
    pub data_type: String,
    pub null_count: i32,
    pub unique_count: i32,
    pub sample_values: Option<Vec<String>>,
    pub is_potential_target: bool,
    pub is_potential_treatment: bool,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = dataset_columns)]
pub struct NewColumn {
    pub dataset_id: i32,
    pub name: String,
    pub data_type: String,
    pub null_count: i32,
    pub unique_count: i32,
    pub sample_values: Option<Vec<String>>,
    pub is_potential_target: bool,
    pub is_potential_treatment: bool,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone)]
#[diesel(table_name = analyses)]
#[diesel(belongs_to(DatasetRow, foreign_key = dataset_id))]
#[diesel(primary_key(id))]
pub struct AnalysisRow {
    pub id: i32,
    pub dataset_id: i32,
    pub name: String,
    pub target_variable: String,
    pub treatment_variables: Vec<String>,
    pub control_variables: Vec<String>,
    pub method: String,
    pub status: String,
    pub results: Option<serde_json::Value>,
    pub simple_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Insertable)]
#[diesel(table_name = analyses)]
pub struct NewAnalysis<'a> {
    pub dataset_id: i32,
    pub name: &'a str,
    pub target_variable: &'a str,
    pub treatment_variables: &'a Vec<String>,
    pub control_variables: &'a Vec<String>,
    pub method: &'a str,
    pub status: &'a str,
    pub created_at: DateTime<Utc>,
}

impl From<DatasetRow> for DatasetRecord {
    fn from(row: DatasetRow) -> Self {
        let status = DatasetStatus::parse(&row.status).unwrap_or(DatasetStatus::Error);
        let sample_rows = row
            .sample_rows
            .map(|value| serde_json::from_value(value).unwrap_or_default());

        DatasetRecord {
            id: row.id,
            name: row.name,
            description: row.description,
            file_path: row.file_path,
            file_size: row.file_size,
            columns_count: row.columns_count,
            rows_count: row.rows_count,
            status,
            sample_rows,
            uploaded_at: row.uploaded_at,
            processed_at: row.processed_at,
        }
    }
}

impl From<ColumnRow> for ColumnProfile {
    fn from(row: ColumnRow) -> Self {
        let data_type = ColumnDataType::parse(&row.data_type).unwrap_or(ColumnDataType::Text);

        ColumnProfile {
            id: row.id,
            dataset_id: row.dataset_id,
            name: row.name,
            data_type,
            null_count: row.null_count,
            unique_count: row.unique_count,
            sample_values: row.sample_values,
            is_potential_target: row.is_potential_target,
            is_potential_treatment: row.is_potential_treatment,
        }
    }
}

impl From<AnalysisRow> for AnalysisRecord {
    fn from(row: AnalysisRow) -> Self {
        let status = AnalysisStatus::parse(&row.status).unwrap_or(AnalysisStatus::Failed);
        let method = AnalysisMethod::parse(&row.method).unwrap_or(AnalysisMethod::DoubleMl);

        AnalysisRecord {
            id: row.id,
            dataset_id: row.dataset_id,
            name: row.name,
            target_variable: row.target_variable,
            treatment_variables: row.treatment_variables,
            control_variables: row.control_variables,
            method,
            status,
            results: row.results,
            simple_explanation: row.simple_explanation,
            created_at: row.created_at,
            completed_at: row.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_in_row_degrades_to_error() {
        let row = DatasetRow {
            id: 1,
            name: "orders".to_string(),
            description: None,
            file_path: "uploads/20260101000000000_orders.csv".to_string(),
            file_size: 12,
            columns_count: 2,
            rows_count: 1,
            status: "corrupted".to_string(),
            sample_rows: Some(serde_json::json!([["1", "2"]])),
            uploaded_at: Utc::now(),
            processed_at: None,
        };

        let record = DatasetRecord::from(row);
        assert_eq!(record.status, DatasetStatus::Error);
        assert_eq!(
            record.sample_rows,
            Some(vec![vec!["1".to_string(), "2".to_string()]])
        );
    }
}
