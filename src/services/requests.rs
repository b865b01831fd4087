//! Borrow request lifecycle service
//!
//! Requests are created PENDING without touching inventory. A unit is
//! reserved only when a request is approved and released when it is returned.

use chrono::Utc;

use crate::{
    error::{AppError, AppResult},
    models::{
        request::{BorrowRequest, CreateBorrowRequest, NewBorrowRequest, RequestStatus, Review, Transition},
        user::Identity,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct RequestService {
    repository: Repository,
}

impl RequestService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a PENDING request on behalf of the caller (or, for privileged
    /// callers, on behalf of `data.requester_id`)
    pub async fn create(&self, caller: &Identity, data: CreateBorrowRequest) -> AppResult<BorrowRequest> {
        let requester_id = match data.requester_id {
            Some(id) if !id.is_empty() => id,
            _ => caller.subject.clone(),
        };
        if !caller.can_act_for(&requester_id) {
            return Err(AppError::Authorization(
                "Cannot create requests for another user".to_string(),
            ));
        }

        // availability is deliberately not checked here
        let equipment = self.repository.equipment.get_by_id(data.equipment_id).await?;

        let request = self
            .repository
            .requests
            .create(NewBorrowRequest {
                requester_id,
                requester_name: data.requester_name,
                equipment_id: equipment.id,
                equipment_name: equipment.name,
                request_date: data.request_date,
                return_date: data.return_date,
                notes: data.notes,
                created_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            request_id = request.id,
            equipment_id = request.equipment_id,
            requester = %request.requester_id,
            "Borrow request created"
        );
        Ok(request)
    }

    pub async fn get(&self, caller: &Identity, id: i32) -> AppResult<BorrowRequest> {
        let request = self.repository.requests.get_by_id(id).await?;
        if !caller.can_act_for(&request.requester_id) {
            return Err(AppError::Authorization(
                "Cannot read another user's request".to_string(),
            ));
        }
        Ok(request)
    }

    /// Requests of one requester, defaulting to the caller
    pub async fn list_by_requester(
        &self,
        caller: &Identity,
        requester_id: Option<&str>,
    ) -> AppResult<Vec<BorrowRequest>> {
        let requester_id = requester_id
            .filter(|id| !id.is_empty())
            .unwrap_or(caller.subject.as_str());
        if !caller.can_act_for(requester_id) {
            return Err(AppError::Authorization(
                "Cannot list another user's requests".to_string(),
            ));
        }
        self.repository.requests.list_by_requester(requester_id).await
    }

    /// Move a request to `status`, applying the inventory effect of the
    /// transition in the same unit of work
    pub async fn update_status(
        &self,
        reviewer: &Identity,
        id: i32,
        status: RequestStatus,
    ) -> AppResult<BorrowRequest> {
        let request = self.repository.requests.get_by_id(id).await?;
        let mut transition = Transition::new(&request, status)?;
        if matches!(status, RequestStatus::Approved | RequestStatus::Rejected) {
            transition = transition.with_review(Review {
                reviewer: reviewer.subject.clone(),
                reason: None,
                notes: None,
                at: Utc::now(),
            });
        }
        self.apply(transition).await
    }

    /// Return an approved loan; allowed for the borrower and privileged callers
    pub async fn return_request(&self, caller: &Identity, id: i32) -> AppResult<BorrowRequest> {
        let request = self.repository.requests.get_by_id(id).await?;
        if !caller.can_act_for(&request.requester_id) {
            return Err(AppError::Authorization(
                "Only the borrower or staff can return this request".to_string(),
            ));
        }
        let transition = Transition::new(&request, RequestStatus::Returned)?;
        self.apply(transition).await
    }

    pub(crate) async fn apply(&self, transition: Transition) -> AppResult<BorrowRequest> {
        match self.repository.requests.apply_transition(&transition).await {
            Ok(updated) => {
                tracing::info!(
                    request_id = updated.id,
                    equipment_id = updated.equipment_id,
                    from = %transition.from,
                    to = %transition.to,
                    "Request status changed"
                );
                Ok(updated)
            }
            Err(e) => {
                tracing::debug!(
                    request_id = transition.request_id,
                    from = %transition.from,
                    to = %transition.to,
                    error = %e,
                    "Request transition refused"
                );
                Err(e)
            }
        }
    }
}
