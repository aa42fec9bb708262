use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::proto::causal;

/// Dataset lifecycle. Forward-only except that a failed dataset may be
/// reprocessed (error -> processing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatasetStatus {
    #[serde(rename = "uploading")]
    Uploading,
    #[serde(rename = "processing")]
    Processing,
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "error")]
    Error,
}

impl DatasetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetStatus::Uploading => "uploading",
            DatasetStatus::Processing => "processing",
            DatasetStatus::Ready => "ready",
            DatasetStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploading" => Some(DatasetStatus::Uploading),
            "processing" => Some(DatasetStatus::Processing),
            "ready" => Some(DatasetStatus::Ready),
            "error" => Some(DatasetStatus::Error),
            _ => None,
        }
    }

    /// Only freshly uploaded or failed datasets may enter profiling.
    pub fn is_processable(&self) -> bool {
        matches!(self, DatasetStatus::Uploading | DatasetStatus::Error)
    }
}

impl std::fmt::Display for DatasetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "running")]
    Running,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "failed")]
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Running => "running",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AnalysisStatus::Pending),
            "running" => Some(AnalysisStatus::Running),
            "completed" => Some(AnalysisStatus::Completed),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }

    /// States from which the run operation may start executing.
    pub fn is_runnable(&self) -> bool {
        matches!(self, AnalysisStatus::Pending | AnalysisStatus::Failed)
    }
}

impl std::fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Inferred column type. `Datetime` is part of the vocabulary but the
/// sampling heuristic currently only produces the other four.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnDataType {
    #[serde(rename = "numeric")]
    Numeric,
    #[serde(rename = "categorical")]
    Categorical,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "datetime")]
    Datetime,
    #[serde(rename = "text")]
    Text,
}

impl ColumnDataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnDataType::Numeric => "numeric",
            ColumnDataType::Categorical => "categorical",
            ColumnDataType::Boolean => "boolean",
            ColumnDataType::Datetime => "datetime",
            ColumnDataType::Text => "text",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "numeric" => Some(ColumnDataType::Numeric),
            "categorical" => Some(ColumnDataType::Categorical),
            "boolean" => Some(ColumnDataType::Boolean),
            "datetime" => Some(ColumnDataType::Datetime),
            "text" => Some(ColumnDataType::Text),
            _ => None,
        }
    }
}

/// Opaque estimator labels. The placeholder estimator treats them all the
/// same; they are validated at analysis creation and echoed in results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisMethod {
    #[serde(rename = "doubleml")]
    DoubleMl,
    #[serde(rename = "causalml")]
    CausalMl,
    #[serde(rename = "econml")]
    EconMl,
    #[serde(rename = "pywhy")]
    PyWhy,
}

impl AnalysisMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMethod::DoubleMl => "doubleml",
            AnalysisMethod::CausalMl => "causalml",
            AnalysisMethod::EconMl => "econml",
            AnalysisMethod::PyWhy => "pywhy",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "doubleml" => Some(AnalysisMethod::DoubleMl),
            "causalml" => Some(AnalysisMethod::CausalMl),
            "econml" => Some(AnalysisMethod::EconMl),
            "pywhy" => Some(AnalysisMethod::PyWhy),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnalysisMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub file_path: String,
    pub file_size: i64,
    pub columns_count: i32,
    pub rows_count: i32,
    pub status: DatasetStatus,
    pub sample_rows: Option<Vec<Vec<String>>>,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub id: i32,
    pub dataset_id: i32,
    pub name: String,
    pub data_type: ColumnDataType,
    pub null_count: i32,
    pub unique_count: i32,
    pub sample_values: Option<Vec<String>>,
    pub is_potential_target: bool,
    pub is_potential_treatment: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: i32,
    pub dataset_id: i32,
    pub name: String,
    pub target_variable: String,
    pub treatment_variables: Vec<String>,
    pub control_variables: Vec<String>,
    pub method: AnalysisMethod,
    pub status: AnalysisStatus,
    pub results: Option<serde_json::Value>,
    pub simple_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fixed-shape payload produced by an estimator run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CausalResults {
    pub effect_estimate: f64,
    pub confidence_interval_lower: f64,
    pub confidence_interval_upper: f64,
    pub p_value: f64,
    pub standard_error: f64,
    pub method: String,
}

/// Pagination window with defaults applied at the read boundary.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

pub const DEFAULT_PAGE_LIMIT: i64 = 50;

impl Default for Page {
    fn default() -> Self {
        Page {
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Wire values are advisory; non-positive limits fall back to the
    /// default and negative offsets clamp to zero.
    pub fn from_request(limit: i32, offset: i32) -> Self {
        Page {
            limit: if limit > 0 {
                limit as i64
            } else {
                DEFAULT_PAGE_LIMIT
            },
            offset: offset.max(0) as i64,
        }
    }
}

fn results_to_wire(results: &serde_json::Value) -> HashMap<String, String> {
    match results {
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| {
                let rendered = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), rendered)
            })
            .collect(),
        _ => HashMap::new(),
    }
}

impl From<DatasetRecord> for causal::Dataset {
    fn from(record: DatasetRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            description: record.description.unwrap_or_default(),
            file_path: record.file_path,
            file_size: record.file_size,
            columns_count: record.columns_count,
            rows_count: record.rows_count,
            status: record.status.as_str().to_string(),
            sample_rows: record
                .sample_rows
                .unwrap_or_default()
                .into_iter()
                .map(|values| causal::SampleRow { values })
                .collect(),
            uploaded_at: record.uploaded_at.to_rfc3339(),
            processed_at: record
                .processed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

impl From<ColumnProfile> for causal::ColumnInfo {
    fn from(profile: ColumnProfile) -> Self {
        Self {
            id: profile.id,
            dataset_id: profile.dataset_id,
            name: profile.name,
            data_type: profile.data_type.as_str().to_string(),
            null_count: profile.null_count,
            unique_count: profile.unique_count,
            sample_values: profile.sample_values.unwrap_or_default(),
            is_potential_target: profile.is_potential_target,
            is_potential_treatment: profile.is_potential_treatment,
        }
    }
}

impl From<AnalysisRecord> for causal::Analysis {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            dataset_id: record.dataset_id,
            name: record.name,
            target_variable: record.target_variable,
            treatment_variables: record.treatment_variables,
            control_variables: record.control_variables,
            method: record.method.as_str().to_string(),
            status: record.status.as_str().to_string(),
            results: record
                .results
                .as_ref()
                .map(results_to_wire)
                .unwrap_or_default(),
            simple_explanation: record.simple_explanation.unwrap_or_default(),
            created_at: record.created_at.to_rfc3339(),
            completed_at: record
                .completed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            DatasetStatus::Uploading,
            DatasetStatus::Processing,
            DatasetStatus::Ready,
            DatasetStatus::Error,
        ] {
            assert_eq!(DatasetStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(DatasetStatus::parse("archived"), None);
    }

    #[test]
    fn only_uploading_and_error_are_processable() {
        assert!(DatasetStatus::Uploading.is_processable());
        assert!(DatasetStatus::Error.is_processable());
        assert!(!DatasetStatus::Processing.is_processable());
        assert!(!DatasetStatus::Ready.is_processable());
    }

    #[test]
    fn only_pending_and_failed_are_runnable() {
        assert!(AnalysisStatus::Pending.is_runnable());
        assert!(AnalysisStatus::Failed.is_runnable());
        assert!(!AnalysisStatus::Running.is_runnable());
        assert!(!AnalysisStatus::Completed.is_runnable());
    }

    #[test]
    fn page_defaults_apply_at_the_boundary() {
        let page = Page::from_request(0, -3);
        assert_eq!(page.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(page.offset, 0);

        let page = Page::from_request(10, 20);
        assert_eq!(page.limit, 10);
        assert_eq!(page.offset, 20);
    }

    #[test]
    fn wire_results_render_numbers_bare_and_strings_unquoted() {
        let results = serde_json::json!({
            "effect_estimate": 0.25,
            "method": "doubleml",
        });
        let wire = results_to_wire(&results);
        assert_eq!(wire.get("effect_estimate").map(String::as_str), Some("0.25"));
        assert_eq!(wire.get("method").map(String::as_str), Some("doubleml"));
    }

    #[test]
    fn null_timestamps_serialize_as_empty_strings() {
        let record = AnalysisRecord {
            id: 1,
            dataset_id: 2,
            name: "test".to_string(),
            target_variable: "outcome".to_string(),
            treatment_variables: vec!["treated".to_string()],
            control_variables: vec![],
            method: AnalysisMethod::DoubleMl,
            status: AnalysisStatus::Pending,
            results: None,
            simple_explanation: None,
            created_at: chrono::Utc::now(),
            completed_at: None,
        };

        let wire: causal::Analysis = record.into();
        assert!(wire.completed_at.is_empty());
        assert!(wire.results.is_empty());
        assert!(wire.simple_explanation.is_empty());
    }
}
