//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::{AppError, AppResult},
    models::request::{CreateBorrowRequest, RequestStatus, RequestView},
};

use super::{AppJson, AuthenticatedUser};

/// Request listing parameters
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct RequestQuery {
    /// Defaults to the caller; other requesters need STAFF or ADMIN
    #[serde(alias = "requesterId")]
    pub requester_id: Option<String>,
}

/// Status update payload
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusUpdate {
    /// PENDING, APPROVED, REJECTED, RETURNED or OVERDUE
    pub status: String,
}

/// List borrow requests of a requester
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestQuery),
    responses(
        (status = 200, description = "Requests of the requester", body = Vec<RequestView>),
        (status = 403, description = "Not allowed to read another user's requests")
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Query(query): Query<RequestQuery>,
) -> AppResult<Json<Vec<RequestView>>> {
    let requests = state
        .services
        .requests
        .list_by_requester(&caller, query.requester_id.as_deref())
        .await?;
    Ok(Json(requests.into_iter().map(RequestView::from).collect()))
}

/// Get one borrow request
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request details", body = RequestView),
        (status = 404, description = "Request not found")
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RequestView>> {
    let request = state.services.requests.get(&caller, id).await?;
    Ok(Json(request.into()))
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created as PENDING", body = RequestView),
        (status = 404, description = "Equipment not found")
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    AppJson(data): AppJson<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<RequestView>)> {
    let request = state.services.requests.create(&caller, data).await?;
    Ok((StatusCode::CREATED, Json(request.into())))
}

/// Change the status of a request
#[utoipa::path(
    patch,
    path = "/requests/{id}/status",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    request_body = StatusUpdate,
    responses(
        (status = 200, description = "Status updated", body = RequestView),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Transition not allowed or no unit available")
    )
)]
pub async fn update_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i32>,
    AppJson(update): AppJson<StatusUpdate>,
) -> AppResult<Json<RequestView>> {
    let status: RequestStatus = update.status.parse().map_err(AppError::Validation)?;
    let request = state
        .services
        .requests
        .update_status(&caller, id, status)
        .await?;
    Ok(Json(request.into()))
}

/// Return a borrowed item
#[utoipa::path(
    post,
    path = "/requests/{id}/return",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = i32, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request returned", body = RequestView),
        (status = 403, description = "Not the borrower"),
        (status = 409, description = "Request is not approved")
    )
)]
pub async fn return_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(caller): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<RequestView>> {
    let request = state.services.requests.return_request(&caller, id).await?;
    Ok(Json(request.into()))
}
