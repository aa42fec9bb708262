use chrono::Utc;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::DatabaseManager;
use crate::domain::{
    AnalysisMethod, AnalysisRecord, AnalysisStatus, CausalResults, DatasetStatus, Page,
};
use crate::error::ServiceError;
use crate::models::NewAnalysis;

/// Computation seam of the run operation. A real causal estimator plugs in
/// here; the shipped implementation is a labeled placeholder.
pub trait Estimator: Send + Sync {
    fn estimate(&self, analysis: &AnalysisRecord) -> Result<(CausalResults, String), ServiceError>;
}

/// Deterministic stand-in estimator. Derives a fixed-shape result from the
/// analysis inputs so repeated runs of the same configuration agree, and
/// renders a plain-language sentence naming the treatment and target
/// variables. The numbers carry no statistical meaning.
pub struct PlaceholderEstimator;

impl Estimator for PlaceholderEstimator {
    fn estimate(&self, analysis: &AnalysisRecord) -> Result<(CausalResults, String), ServiceError> {
        let mut hasher = DefaultHasher::new();
        analysis.target_variable.hash(&mut hasher);
        analysis.treatment_variables.hash(&mut hasher);
        analysis.control_variables.hash(&mut hasher);
        analysis.method.as_str().hash(&mut hasher);
        let seed = hasher.finish();

        let effect_estimate = (seed % 2001) as f64 / 1000.0 - 1.0;
        let standard_error = 0.01 + ((seed >> 16) % 200) as f64 / 1000.0;
        let confidence_interval_lower = effect_estimate - 1.96 * standard_error;
        let confidence_interval_upper = effect_estimate + 1.96 * standard_error;
        let p_value = (1.0 / (1.0 + (effect_estimate / standard_error).abs())).clamp(0.001, 0.999);

        let results = CausalResults {
            effect_estimate,
            confidence_interval_lower,
            confidence_interval_upper,
            p_value,
            standard_error,
            method: analysis.method.as_str().to_string(),
        };

        let direction = if effect_estimate >= 0.0 {
            "increases"
        } else {
            "decreases"
        };
        let explanation = format!(
            "Changing {} {} {} by an estimated {:.3} units ({} method, 95% CI {:.3} to {:.3}, p = {:.3}).",
            analysis.treatment_variables.join(", "),
            direction,
            analysis.target_variable,
            effect_estimate.abs(),
            analysis.method,
            confidence_interval_lower,
            confidence_interval_upper,
            p_value,
        );

        Ok((results, explanation))
    }
}

/// Creates analyses and drives them through the
/// pending -> running -> completed/failed state machine.
pub struct AnalysisManager {
    database: DatabaseManager,
    estimator: Arc<dyn Estimator>,
}

impl AnalysisManager {
    pub fn new(database: DatabaseManager) -> Self {
        Self::with_estimator(database, Arc::new(PlaceholderEstimator))
    }

    pub fn with_estimator(database: DatabaseManager, estimator: Arc<dyn Estimator>) -> Self {
        Self {
            database,
            estimator,
        }
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
        if name.trim().is_empty() {
            return Err(ServiceError::Validation {
                message: "analysis name must not be empty".to_string(),
            });
        }
        if treatment_variables.is_empty() {
            return Err(ServiceError::Validation {
                message: "at least one treatment variable is required".to_string(),
            });
        }
        let method = AnalysisMethod::parse(method).ok_or_else(|| ServiceError::Validation {
            message: format!(
                "unknown method '{}'; expected doubleml, causalml, econml or pywhy",
                method
            ),
        })?;

        // Variable names are deliberately not checked against the profiled
        // columns; the dataset itself must exist.
        self.database
            .get_dataset(dataset_id)
            .await?
            .ok_or(ServiceError::DatasetNotFound { dataset_id })?;

        self.database
            .insert_analysis(NewAnalysis {
                dataset_id,
                name,
                target_variable,
                treatment_variables: &treatment_variables,
                control_variables: &control_variables,
                method: method.as_str(),
                status: AnalysisStatus::Pending.as_str(),
                created_at: Utc::now(),
            })
            .await
    }

    /// The run state machine. Completed analyses short-circuit unchanged;
    /// running ones conflict; pending and failed ones execute, ending in
    /// `completed` or `failed`.
    pub async fn run_analysis(&self, analysis_id: i32) -> Result<AnalysisRecord, ServiceError> {
        let record = self
            .database
            .get_analysis(analysis_id)
            .await?
            .ok_or(ServiceError::AnalysisNotFound { analysis_id })?;

        if record.status == AnalysisStatus::Completed {
            info!("Analysis {} already completed; returning as-is", analysis_id);
            return Ok(record);
        }
        if !record.status.is_runnable() {
            return Err(ServiceError::Conflict {
                message: format!("analysis {} is already running", analysis_id),
            });
        }

        let dataset_ready = self
            .database
            .get_dataset(record.dataset_id)
            .await?
            .map(|d| d.status == DatasetStatus::Ready)
            .unwrap_or(false);
        if !dataset_ready {
            self.mark_failed(analysis_id).await;
            return Err(ServiceError::FailedPrecondition {
                message: format!(
                    "dataset {} is not ready; process it before running analysis {}",
                    record.dataset_id, analysis_id
                ),
            });
        }

        if !self.database.try_mark_analysis_running(analysis_id).await? {
            return Err(ServiceError::Conflict {
                message: format!("analysis {} is already running", analysis_id),
            });
        }

        let outcome = self.estimator.estimate(&record);
        let (results, explanation) = match outcome {
            Ok(parts) => parts,
            Err(e) => {
                self.mark_failed(analysis_id).await;
                return Err(e);
            }
        };

        let results_value = match serde_json::to_value(&results) {
            Ok(value) => value,
            Err(e) => {
                self.mark_failed(analysis_id).await;
                return Err(e.into());
            }
        };

        match self
            .database
            .complete_analysis(analysis_id, results_value, &explanation)
            .await
        {
            Ok(completed) => {
                info!("Analysis {} completed", analysis_id);
                Ok(completed)
            }
            Err(e) => {
                self.mark_failed(analysis_id).await;
                Err(e)
            }
        }
    }

    async fn mark_failed(&self, analysis_id: i32) {
        if let Err(e) = self
            .database
            .set_analysis_status(analysis_id, AnalysisStatus::Failed)
            .await
        {
            warn!("Failed to mark analysis {} as failed: {}", analysis_id, e);
        }
    }

    pub async fn list_analyses(
        &self,
        dataset_filter: Option<i32>,
        page: Page,
    ) -> Result<Vec<AnalysisRecord>, ServiceError> {
        self.database.list_analyses(dataset_filter, page).await
    }

    pub async fn get_analysis(&self, analysis_id: i32) -> Result<AnalysisRecord, ServiceError> {
        self.database
            .get_analysis(analysis_id)
            .await?
            .ok_or(ServiceError::AnalysisNotFound { analysis_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AnalysisMethod;

    fn sample_analysis() -> AnalysisRecord {
        AnalysisRecord {
            id: 7,
            dataset_id: 3,
            name: "promo lift".to_string(),
            target_variable: "revenue".to_string(),
            treatment_variables: vec!["discount".to_string(), "email".to_string()],
            control_variables: vec!["region".to_string()],
            method: AnalysisMethod::DoubleMl,
            status: AnalysisStatus::Pending,
            results: None,
            simple_explanation: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn placeholder_estimator_is_deterministic() {
        let analysis = sample_analysis();
        let (first, _) = PlaceholderEstimator.estimate(&analysis).unwrap();
        let (second, _) = PlaceholderEstimator.estimate(&analysis).unwrap();
        assert_eq!(first.effect_estimate, second.effect_estimate);
        assert_eq!(first.p_value, second.p_value);
    }

    #[test]
    fn placeholder_results_have_a_sane_shape() {
        let (results, _) = PlaceholderEstimator.estimate(&sample_analysis()).unwrap();
        assert!(results.confidence_interval_lower <= results.effect_estimate);
        assert!(results.effect_estimate <= results.confidence_interval_upper);
        assert!(results.standard_error > 0.0);
        assert!(results.p_value > 0.0 && results.p_value < 1.0);
        assert_eq!(results.method, "doubleml");
    }

    #[test]
    fn explanation_names_treatments_and_target() {
        let analysis = sample_analysis();
        let (_, explanation) = PlaceholderEstimator.estimate(&analysis).unwrap();
        assert!(explanation.contains("discount"));
        assert!(explanation.contains("email"));
        assert!(explanation.contains("revenue"));
        assert!(explanation.contains("doubleml"));
    }

    #[test]
    fn results_serialize_to_a_flat_object() {
        let (results, _) = PlaceholderEstimator.estimate(&sample_analysis()).unwrap();
        let value = serde_json::to_value(&results).unwrap();
        let object = value.as_object().unwrap();
        for key in [
            "effect_estimate",
            "confidence_interval_lower",
            "confidence_interval_upper",
            "p_value",
            "standard_error",
            "method",
        ] {
            assert!(object.contains_key(key), "missing {}", key);
        }
    }
}
