use prost_types::field_descriptor_proto::{Label, Type};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet, MessageOptions,
    MethodDescriptorProto, ServiceDescriptorProto,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let builder = tonic_prost_build::configure()
        .type_attribute(".", "#[derive(serde::Serialize, serde::Deserialize)]");

    if protoc_available() {
        builder.compile_protos(&["proto/causal.proto"], &["proto"])?;
    } else {
        // No protoc on this machine: feed the codegen a hand-transcribed
        // descriptor set equivalent to proto/causal.proto. Keep it in sync
        // with the .proto file.
        builder.compile_fds(file_descriptor_set())?;
    }

    // Tell cargo to rerun if proto files change
    println!("cargo:rerun-if-changed=proto/causal.proto");

    Ok(())
}

fn protoc_available() -> bool {
    let protoc = std::env::var_os("PROTOC").unwrap_or_else(|| "protoc".into());
    std::process::Command::new(protoc)
        .arg("--version")
        .output()
        .is_ok()
}

fn field(name: &str, number: i32, label: Label, r#type: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(r#type as i32),
        ..Default::default()
    }
}

fn message_field(name: &str, number: i32, label: Label, type_name: &str) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, label, Type::Message)
    }
}

fn message(name: &str, fields: Vec<FieldDescriptorProto>) -> DescriptorProto {
    DescriptorProto {
        name: Some(name.to_owned()),
        field: fields,
        ..Default::default()
    }
}

fn string_map_entry(name: &str) -> DescriptorProto {
    DescriptorProto {
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..message(
            name,
            vec![
                field("key", 1, Label::Optional, Type::String),
                field("value", 2, Label::Optional, Type::String),
            ],
        )
    }
}

fn method(name: &str, input: &str, output: &str) -> MethodDescriptorProto {
    MethodDescriptorProto {
        name: Some(name.to_owned()),
        input_type: Some(format!(".causal.{input}")),
        output_type: Some(format!(".causal.{output}")),
        ..Default::default()
    }
}

fn file_descriptor_set() -> FileDescriptorSet {
    use Label::{Optional, Repeated};

    let dataset = message(
        "Dataset",
        vec![
            field("id", 1, Optional, Type::Int32),
            field("name", 2, Optional, Type::String),
            field("description", 3, Optional, Type::String),
            field("file_path", 4, Optional, Type::String),
            field("file_size", 5, Optional, Type::Int64),
            field("columns_count", 6, Optional, Type::Int32),
            field("rows_count", 7, Optional, Type::Int32),
            field("status", 8, Optional, Type::String),
            message_field("sample_rows", 9, Repeated, ".causal.SampleRow"),
            field("uploaded_at", 10, Optional, Type::String),
            field("processed_at", 11, Optional, Type::String),
        ],
    );

    let sample_row = message(
        "SampleRow",
        vec![field("values", 1, Repeated, Type::String)],
    );

    let column_info = message(
        "ColumnInfo",
        vec![
            field("id", 1, Optional, Type::Int32),
            field("dataset_id", 2, Optional, Type::Int32),
            field("name", 3, Optional, Type::String),
            field("data_type", 4, Optional, Type::String),
            field("null_count", 5, Optional, Type::Int32),
            field("unique_count", 6, Optional, Type::Int32),
            field("sample_values", 7, Repeated, Type::String),
            field("is_potential_target", 8, Optional, Type::Bool),
            field("is_potential_treatment", 9, Optional, Type::Bool),
        ],
    );

    let analysis = DescriptorProto {
        nested_type: vec![string_map_entry("ResultsEntry")],
        ..message(
            "Analysis",
            vec![
                field("id", 1, Optional, Type::Int32),
                field("dataset_id", 2, Optional, Type::Int32),
                field("name", 3, Optional, Type::String),
                field("target_variable", 4, Optional, Type::String),
                field("treatment_variables", 5, Repeated, Type::String),
                field("control_variables", 6, Repeated, Type::String),
                field("method", 7, Optional, Type::String),
                field("status", 8, Optional, Type::String),
                message_field("results", 9, Repeated, ".causal.Analysis.ResultsEntry"),
                field("simple_explanation", 10, Optional, Type::String),
                field("created_at", 11, Optional, Type::String),
                field("completed_at", 12, Optional, Type::String),
            ],
        )
    };

    let upload_dataset_request = message(
        "UploadDatasetRequest",
        vec![
            field("name", 1, Optional, Type::String),
            field("description", 2, Optional, Type::String),
            field("file_data", 3, Optional, Type::Bytes),
            field("file_name", 4, Optional, Type::String),
        ],
    );

    let dataset_response = message(
        "DatasetResponse",
        vec![message_field("dataset", 1, Optional, ".causal.Dataset")],
    );

    let get_datasets_request = message(
        "GetDatasetsRequest",
        vec![
            field("limit", 1, Optional, Type::Int32),
            field("offset", 2, Optional, Type::Int32),
        ],
    );

    let get_datasets_response = message(
        "GetDatasetsResponse",
        vec![message_field("datasets", 1, Repeated, ".causal.Dataset")],
    );

    let get_dataset_request = message(
        "GetDatasetRequest",
        vec![field("dataset_id", 1, Optional, Type::Int32)],
    );

    let get_dataset_response = message(
        "GetDatasetResponse",
        vec![
            message_field("dataset", 1, Optional, ".causal.Dataset"),
            message_field("columns", 2, Repeated, ".causal.ColumnInfo"),
        ],
    );

    let process_dataset_request = message(
        "ProcessDatasetRequest",
        vec![field("dataset_id", 1, Optional, Type::Int32)],
    );

    let create_analysis_request = message(
        "CreateAnalysisRequest",
        vec![
            field("dataset_id", 1, Optional, Type::Int32),
            field("name", 2, Optional, Type::String),
            field("target_variable", 3, Optional, Type::String),
            field("treatment_variables", 4, Repeated, Type::String),
            field("control_variables", 5, Repeated, Type::String),
            field("method", 6, Optional, Type::String),
        ],
    );

    let analysis_response = message(
        "AnalysisResponse",
        vec![message_field("analysis", 1, Optional, ".causal.Analysis")],
    );

    let get_analyses_request = message(
        "GetAnalysesRequest",
        vec![
            field("dataset_id", 1, Optional, Type::Int32),
            field("limit", 2, Optional, Type::Int32),
            field("offset", 3, Optional, Type::Int32),
        ],
    );

    let get_analyses_response = message(
        "GetAnalysesResponse",
        vec![message_field("analyses", 1, Repeated, ".causal.Analysis")],
    );

    let get_analysis_results_request = message(
        "GetAnalysisResultsRequest",
        vec![field("analysis_id", 1, Optional, Type::Int32)],
    );

    let run_causal_analysis_request = message(
        "RunCausalAnalysisRequest",
        vec![field("analysis_id", 1, Optional, Type::Int32)],
    );

    let health_check_request = message("HealthCheckRequest", vec![]);

    let health_check_response = message(
        "HealthCheckResponse",
        vec![
            field("status", 1, Optional, Type::String),
            field("timestamp", 2, Optional, Type::String),
        ],
    );

    let service = ServiceDescriptorProto {
        name: Some("CausalAnalysisService".to_owned()),
        method: vec![
            method("UploadDataset", "UploadDatasetRequest", "DatasetResponse"),
            method("GetDatasets", "GetDatasetsRequest", "GetDatasetsResponse"),
            method("GetDataset", "GetDatasetRequest", "GetDatasetResponse"),
            method("ProcessDataset", "ProcessDatasetRequest", "DatasetResponse"),
            method("CreateAnalysis", "CreateAnalysisRequest", "AnalysisResponse"),
            method("GetAnalyses", "GetAnalysesRequest", "GetAnalysesResponse"),
            method(
                "GetAnalysisResults",
                "GetAnalysisResultsRequest",
                "AnalysisResponse",
            ),
            method(
                "RunCausalAnalysis",
                "RunCausalAnalysisRequest",
                "AnalysisResponse",
            ),
            method("HealthCheck", "HealthCheckRequest", "HealthCheckResponse"),
        ],
        ..Default::default()
    };

    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("causal.proto".to_owned()),
            package: Some("causal".to_owned()),
            syntax: Some("proto3".to_owned()),
            message_type: vec![
                dataset,
                sample_row,
                column_info,
                analysis,
                upload_dataset_request,
                dataset_response,
                get_datasets_request,
                get_datasets_response,
                get_dataset_request,
                get_dataset_response,
                process_dataset_request,
                create_analysis_request,
                analysis_response,
                get_analyses_request,
                get_analyses_response,
                get_analysis_results_request,
                run_causal_analysis_request,
                health_check_request,
                health_check_response,
            ],
            service: vec![service],
            ..Default::default()
        }],
    }
}
