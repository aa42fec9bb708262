use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::{transport::Server, Request, Response, Status};
use tracing::{error, info};

use crate::domain::Page;
use crate::engine::CausalEngine;
use crate::error::ServiceError;
use crate::proto::causal::{
    causal_analysis_service_server::{CausalAnalysisService, CausalAnalysisServiceServer},
    AnalysisResponse, CreateAnalysisRequest, DatasetResponse, GetAnalysesRequest,
    GetAnalysesResponse, GetAnalysisResultsRequest, GetDatasetRequest, GetDatasetResponse,
    GetDatasetsRequest, GetDatasetsResponse, HealthCheckRequest, HealthCheckResponse,
    ProcessDatasetRequest, RunCausalAnalysisRequest, UploadDatasetRequest,
};

pub struct GrpcServer {
    engine: Arc<CausalEngine>,
}

impl GrpcServer {
    pub fn new(engine: Arc<CausalEngine>) -> Self {
        Self { engine }
    }

    pub async fn start(&self, addr: SocketAddr) -> Result<(), ServiceError> {
        info!("Starting gRPC server on {}", addr);

        let service = CausalAnalysisServiceImpl {
            engine: self.engine.clone(),
        };

        Server::builder()
            .add_service(CausalAnalysisServiceServer::new(service))
            .serve(addr)
            .await?;

        Ok(())
    }
}

struct CausalAnalysisServiceImpl {
    engine: Arc<CausalEngine>,
}

#[tonic::async_trait]
impl CausalAnalysisService for CausalAnalysisServiceImpl {
    async fn upload_dataset(
        &self,
        request: Request<UploadDatasetRequest>,
    ) -> Result<Response<DatasetResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received upload_dataset request for '{}' ({} bytes)",
            req.name,
            req.file_data.len()
        );

        let description = if req.description.is_empty() {
            None
        } else {
            Some(req.description.as_str())
        };

        match self
            .engine
            .upload_dataset(
                &req.name,
                description,
                Bytes::from(req.file_data),
                &req.file_name,
            )
            .await
        {
            Ok(dataset) => Ok(Response::new(DatasetResponse {
                dataset: Some(dataset.into()),
            })),
            Err(e) => {
                error!("gRPC: Failed to upload dataset '{}': {}", req.name, e);
                Err(Status::from(e))
            }
        }
    }

    async fn get_datasets(
        &self,
        request: Request<GetDatasetsRequest>,
    ) -> Result<Response<GetDatasetsResponse>, Status> {
        let req = request.into_inner();
        info!("gRPC: Received get_datasets request");

        let page = Page::from_request(req.limit, req.offset);
        let datasets = self
            .engine
            .list_datasets(page)
            .await
            .map_err(Status::from)?;

        info!("gRPC: Returning {} datasets", datasets.len());
        Ok(Response::new(GetDatasetsResponse {
            datasets: datasets.into_iter().map(|d| d.into()).collect(),
        }))
    }

    async fn get_dataset(
        &self,
        request: Request<GetDatasetRequest>,
    ) -> Result<Response<GetDatasetResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received get_dataset request for dataset {}",
            req.dataset_id
        );

        match self.engine.get_dataset_with_columns(req.dataset_id).await {
            Ok((dataset, columns)) => Ok(Response::new(GetDatasetResponse {
                dataset: Some(dataset.into()),
                columns: columns.into_iter().map(|c| c.into()).collect(),
            })),
            Err(e) => {
                error!("gRPC: Failed to get dataset {}: {}", req.dataset_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn process_dataset(
        &self,
        request: Request<ProcessDatasetRequest>,
    ) -> Result<Response<DatasetResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received process_dataset request for dataset {}",
            req.dataset_id
        );

        match self.engine.process_dataset(req.dataset_id).await {
            Ok(dataset) => {
                info!("gRPC: Dataset {} processed", req.dataset_id);
                Ok(Response::new(DatasetResponse {
                    dataset: Some(dataset.into()),
                }))
            }
            Err(e) => {
                error!("gRPC: Failed to process dataset {}: {}", req.dataset_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn create_analysis(
        &self,
        request: Request<CreateAnalysisRequest>,
    ) -> Result<Response<AnalysisResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received create_analysis request '{}' for dataset {}",
            req.name, req.dataset_id
        );

        match self
            .engine
            .create_analysis(
                req.dataset_id,
                &req.name,
                &req.target_variable,
                req.treatment_variables,
                req.control_variables,
                &req.method,
            )
            .await
        {
            Ok(analysis) => Ok(Response::new(AnalysisResponse {
                analysis: Some(analysis.into()),
            })),
            Err(e) => {
                error!(
                    "gRPC: Failed to create analysis for dataset {}: {}",
                    req.dataset_id, e
                );
                Err(Status::from(e))
            }
        }
    }

    async fn get_analyses(
        &self,
        request: Request<GetAnalysesRequest>,
    ) -> Result<Response<GetAnalysesResponse>, Status> {
        let req = request.into_inner();
        info!("gRPC: Received get_analyses request");

        let dataset_filter = if req.dataset_id > 0 {
            Some(req.dataset_id)
        } else {
            None
        };
        let page = Page::from_request(req.limit, req.offset);

        let analyses = self
            .engine
            .list_analyses(dataset_filter, page)
            .await
            .map_err(Status::from)?;

        info!("gRPC: Returning {} analyses", analyses.len());
        Ok(Response::new(GetAnalysesResponse {
            analyses: analyses.into_iter().map(|a| a.into()).collect(),
        }))
    }

    async fn get_analysis_results(
        &self,
        request: Request<GetAnalysisResultsRequest>,
    ) -> Result<Response<AnalysisResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received get_analysis_results request for analysis {}",
            req.analysis_id
        );

        match self.engine.get_analysis(req.analysis_id).await {
            Ok(analysis) => Ok(Response::new(AnalysisResponse {
                analysis: Some(analysis.into()),
            })),
            Err(e) => {
                error!("gRPC: Failed to get analysis {}: {}", req.analysis_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn run_causal_analysis(
        &self,
        request: Request<RunCausalAnalysisRequest>,
    ) -> Result<Response<AnalysisResponse>, Status> {
        let req = request.into_inner();
        info!(
            "gRPC: Received run_causal_analysis request for analysis {}",
            req.analysis_id
        );

        match self.engine.run_analysis(req.analysis_id).await {
            Ok(analysis) => {
                info!(
                    "gRPC: Analysis {} finished with status {}",
                    req.analysis_id, analysis.status
                );
                Ok(Response::new(AnalysisResponse {
                    analysis: Some(analysis.into()),
                }))
            }
            Err(e) => {
                error!("gRPC: Failed to run analysis {}: {}", req.analysis_id, e);
                Err(Status::from(e))
            }
        }
    }

    async fn health_check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        info!("gRPC: Received health_check request");

        match self.engine.health_check().await {
            Ok(_) => Ok(Response::new(HealthCheckResponse {
                status: "healthy".to_string(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            })),
            Err(e) => {
                error!("gRPC: Health check failed: {}", e);
                Err(Status::internal("Health check failed"))
            }
        }
    }
}
