use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Dataset not found: {dataset_id}")]
    DatasetNotFound { dataset_id: i32 },

    #[error("Analysis not found: {analysis_id}")]
    AnalysisNotFound { analysis_id: i32 },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Precondition failed: {message}")]
    FailedPrecondition { message: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Storage error: {message}")]
    StorageError { message: String },

    #[error("Database error: {message}")]
    DatabaseError { message: String },

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("gRPC transport error: {0}")]
    GrpcError(#[from] tonic::transport::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::IoError {
            message: err.to_string(),
        }
    }
}

impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        ServiceError::DatabaseError {
            message: err.to_string(),
        }
    }
}

impl From<object_store::Error> for ServiceError {
    fn from(err: object_store::Error) -> Self {
        ServiceError::StorageError {
            message: err.to_string(),
        }
    }
}

impl From<ServiceError> for tonic::Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { .. } => tonic::Status::invalid_argument(err.to_string()),
            ServiceError::DatasetNotFound { .. } | ServiceError::AnalysisNotFound { .. } => {
                tonic::Status::not_found(err.to_string())
            }
            ServiceError::InvalidState { .. } | ServiceError::FailedPrecondition { .. } => {
                tonic::Status::failed_precondition(err.to_string())
            }
            ServiceError::Conflict { .. } => tonic::Status::aborted(err.to_string()),
            ServiceError::ConfigError { .. } => tonic::Status::invalid_argument(err.to_string()),
            _ => tonic::Status::internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_grpc_not_found() {
        let status = tonic::Status::from(ServiceError::DatasetNotFound { dataset_id: 42 });
        assert_eq!(status.code(), tonic::Code::NotFound);
        assert!(status.message().contains("42"));
    }

    #[test]
    fn conflict_maps_to_aborted() {
        let status = tonic::Status::from(ServiceError::Conflict {
            message: "analysis is already running".to_string(),
        });
        assert_eq!(status.code(), tonic::Code::Aborted);
    }

    #[test]
    fn state_errors_map_to_failed_precondition() {
        for err in [
            ServiceError::InvalidState {
                message: "dataset is ready".to_string(),
            },
            ServiceError::FailedPrecondition {
                message: "dataset not ready".to_string(),
            },
        ] {
            assert_eq!(
                tonic::Status::from(err).code(),
                tonic::Code::FailedPrecondition
            );
        }
    }
}
