//! Approval endpoints for STAFF and ADMIN reviewers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{error::AppResult, models::request::ApprovalView};

use super::{AppJson, AuthenticatedUser, OptionalJson};

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct ApprovalQuery {
    /// PENDING, APPROVED or REJECTED
    pub status: Option<String>,
}

/// Reviewer decision payload
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ApprovalDecision {
    /// Rejection reason
    pub reason: Option<String>,
    /// Older clients send the rejection reason in this field
    pub status: Option<String>,
    pub notes: Option<String>,
}

/// List requests from the reviewer's point of view
#[utoipa::path(
    get,
    path = "/approvals",
    tag = "approvals",
    security(("bearer_auth" = [])),
    params(ApprovalQuery),
    responses(
        (status = 200, description = "Approval queue", body = Vec<ApprovalView>),
        (status = 400, description = "Unknown status")
    )
)]
pub async fn list_approvals(
    State(state): State<crate::AppState>,
    Query(query): Query<ApprovalQuery>,
) -> AppResult<Json<Vec<ApprovalView>>> {
    let requests = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(status) => state.services.approvals.list_by_status(status).await?,
        None => state.services.approvals.list_all().await?,
    };
    Ok(Json(requests.into_iter().map(ApprovalView::from).collect()))
}

/// Approve a pending request
#[utoipa::path(
    post,
    path = "/approvals/{id}/approve",
    tag = "approvals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body(content = ApprovalDecision, description = "Optional reviewer notes, the body may be empty"),
    responses(
        (status = 200, description = "Request approved", body = ApprovalView),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Not pending or no unit available")
    )
)]
pub async fn approve(
    State(state): State<crate::AppState>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(id): Path<i32>,
    OptionalJson(decision): OptionalJson<ApprovalDecision>,
) -> AppResult<Json<ApprovalView>> {
    let decision = decision.unwrap_or_default();
    let request = state
        .services
        .approvals
        .approve(&reviewer, id, decision.notes)
        .await?;
    Ok(Json(request.into()))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/approvals/{id}/reject",
    tag = "approvals",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body = ApprovalDecision,
    responses(
        (status = 200, description = "Request rejected", body = ApprovalView),
        (status = 400, description = "Missing or malformed body"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Request is not pending")
    )
)]
pub async fn reject(
    State(state): State<crate::AppState>,
    AuthenticatedUser(reviewer): AuthenticatedUser,
    Path(id): Path<i32>,
    AppJson(decision): AppJson<ApprovalDecision>,
) -> AppResult<Json<ApprovalView>> {
    let reason = decision.reason.or(decision.status);
    let request = state
        .services
        .approvals
        .reject(&reviewer, id, reason, decision.notes)
        .await?;
    Ok(Json(request.into()))
}
