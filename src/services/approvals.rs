//! Reviewer decisions on borrow requests

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        request::{ApprovalStatus, BorrowRequest, RequestStatus, Review, Transition},
        user::Identity,
    },
    repository::Repository,
};

use super::requests::RequestService;

#[derive(Clone)]
pub struct ApprovalService {
    repository: Repository,
    requests: RequestService,
}

impl ApprovalService {
    pub fn new(repository: Repository, requests: RequestService) -> Self {
        Self {
            repository,
            requests,
        }
    }

    pub async fn list_all(&self) -> AppResult<Vec<BorrowRequest>> {
        self.repository.requests.list().await
    }

    /// List requests whose reviewer-facing status matches `status`
    pub async fn list_by_status(&self, status: &str) -> AppResult<Vec<BorrowRequest>> {
        let status: ApprovalStatus = status.parse().map_err(AppError::Validation)?;
        self.repository
            .requests
            .list_by_statuses(status.request_statuses())
            .await
    }

    /// PENDING -> APPROVED, reserving one unit
    pub async fn approve(
        &self,
        reviewer: &Identity,
        id: i32,
        notes: Option<String>,
    ) -> AppResult<BorrowRequest> {
        self.decide(reviewer, id, RequestStatus::Approved, None, notes)
            .await
    }

    /// PENDING -> REJECTED
    pub async fn reject(
        &self,
        reviewer: &Identity,
        id: i32,
        reason: Option<String>,
        notes: Option<String>,
    ) -> AppResult<BorrowRequest> {
        self.decide(reviewer, id, RequestStatus::Rejected, reason, notes)
            .await
    }

    async fn decide(
        &self,
        reviewer: &Identity,
        id: i32,
        to: RequestStatus,
        reason: Option<String>,
        notes: Option<String>,
    ) -> AppResult<BorrowRequest> {
        let request = self.repository.requests.get_by_id(id).await?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::InvalidTransition(format!(
                "Request {} is already {}",
                id, request.status
            )));
        }

        let transition = Transition::new(&request, to)?.with_review(Review {
            reviewer: reviewer.subject.clone(),
            reason,
            notes,
            at: Utc::now(),
        });
        self.requests.apply(transition).await
    }
}
