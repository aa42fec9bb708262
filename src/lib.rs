pub mod proto {
    pub mod causal {
        tonic::include_proto!("causal");
    }
}

pub mod analysis_manager;
pub mod database;
pub mod dataset_manager;
pub mod domain;
pub mod engine;
pub mod error;
pub mod grpc_server;
pub mod models;
pub mod schema;
pub mod storage;
pub mod tabular;

pub use engine::CausalEngine;
pub use error::ServiceError;
pub use grpc_server::GrpcServer;
