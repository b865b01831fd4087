//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{approvals, equipment, health, requests};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Equipment Lending API",
        version = "1.0.0",
        description = "Campus equipment lending REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Equipment
        equipment::list_equipment,
        equipment::get_equipment,
        equipment::search_equipment,
        equipment::create_equipment,
        equipment::update_equipment,
        equipment::delete_equipment,
        // Requests
        requests::list_requests,
        requests::get_request,
        requests::create_request,
        requests::update_status,
        requests::return_request,
        // Approvals
        approvals::list_approvals,
        approvals::approve,
        approvals::reject,
    ),
    components(
        schemas(
            crate::models::equipment::Equipment,
            crate::models::equipment::EquipmentInput,
            equipment::DeleteResponse,
            crate::models::request::RequestStatus,
            crate::models::request::ApprovalStatus,
            crate::models::request::CreateBorrowRequest,
            crate::models::request::RequestView,
            crate::models::request::ApprovalView,
            requests::StatusUpdate,
            approvals::ApprovalDecision,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "equipment", description = "Equipment inventory"),
        (name = "requests", description = "Borrow requests"),
        (name = "approvals", description = "Request review for staff")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
