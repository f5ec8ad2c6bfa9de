//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the batch-dl REST API using utoipa for
//! compile-time spec generation. Served at `/api/v1/openapi.json`.

use utoipa::OpenApi;

/// OpenAPI documentation for the batch-dl REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "batch-dl REST API",
        version = "0.1.0",
        description = "Submit batches of URLs for concurrent download and track their progress",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development server")
    ),
    paths(
        // Tasks
        crate::api::routes::create_task,
        crate::api::routes::get_task,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::FileStatus,
        crate::types::FileState,
        crate::types::TaskInfo,

        // API request/response types from routes
        crate::api::routes::CreateTaskRequest,
        crate::api::routes::CreateTaskResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "tasks", description = "Task management - Submit URL batches and poll their status"),
        (name = "system", description = "System endpoints - Health checks and OpenAPI spec"),
    )
)]
pub struct ApiDoc;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_has_task_paths() {
        let spec = ApiDoc::openapi();
        let json = serde_json::to_value(&spec).expect("Should serialize to JSON");

        assert!(json["paths"]["/api/v1/tasks"]["post"].is_object());
        assert!(json["paths"]["/api/v1/tasks/{id}"]["get"].is_object());
        assert!(json["paths"]["/api/v1/health"]["get"].is_object());
    }

    #[test]
    fn test_openapi_spec_has_schemas_and_tags() {
        let spec = ApiDoc::openapi();

        let components = spec.components.expect("components should be defined");
        for schema in ["TaskInfo", "FileState", "CreateTaskRequest", "ApiError"] {
            assert!(
                components.schemas.contains_key(schema),
                "missing schema {schema}"
            );
        }

        let tags = spec.tags.expect("tags should be defined");
        let tag_names: Vec<&str> = tags.iter().map(|t| t.name.as_str()).collect();
        assert!(tag_names.contains(&"tasks"));
        assert!(tag_names.contains(&"system"));
    }

    #[test]
    fn test_openapi_spec_info() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "batch-dl REST API");

        let json = serde_json::to_value(&spec).unwrap();
        let version = json["openapi"].as_str().unwrap();
        assert!(version.starts_with("3."), "Should use OpenAPI 3.x version");
    }
}
