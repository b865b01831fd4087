//! Borrow request model and its lifecycle
//!
//! A borrow request and the reviewer's decision on it are a single record.
//! Borrowers read it through [`RequestView`], reviewers through
//! [`ApprovalView`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
    Overdue,
}

/// Change to equipment availability tied to a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryEffect {
    None,
    /// Take one unit out of `available`
    Reserve,
    /// Put one unit back, never above `quantity`
    Release,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Returned,
        RequestStatus::Overdue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Returned => "RETURNED",
            RequestStatus::Overdue => "OVERDUE",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Returned | RequestStatus::Overdue
        )
    }

    /// Check `self -> next` against the transition table and return the
    /// inventory effect the transition carries.
    ///
    /// ```text
    /// PENDING  -> APPROVED  reserve
    /// PENDING  -> REJECTED  none
    /// APPROVED -> RETURNED  release
    /// APPROVED -> OVERDUE   none
    /// ```
    pub fn transition_to(self, next: RequestStatus) -> AppResult<InventoryEffect> {
        use RequestStatus::*;
        match (self, next) {
            (Pending, Approved) => Ok(InventoryEffect::Reserve),
            (Pending, Rejected) => Ok(InventoryEffect::None),
            (Approved, Returned) => Ok(InventoryEffect::Release),
            (Approved, Overdue) => Ok(InventoryEffect::None),
            (from, to) => Err(AppError::InvalidTransition(format!(
                "Cannot move request from {} to {}",
                from, to
            ))),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "RETURNED" => Ok(RequestStatus::Returned),
            "OVERDUE" => Ok(RequestStatus::Overdue),
            _ => Err(format!("Invalid request status: {}", s)),
        }
    }
}

// SQLx conversion for RequestStatus (stored as TEXT)
impl sqlx::Type<Postgres> for RequestStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for RequestStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for RequestStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Reviewer-facing status. Anything past approval still reads as approved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    /// Request statuses shown under this approval status
    pub fn request_statuses(&self) -> &'static [RequestStatus] {
        match self {
            ApprovalStatus::Pending => &[RequestStatus::Pending],
            ApprovalStatus::Approved => &[
                RequestStatus::Approved,
                RequestStatus::Returned,
                RequestStatus::Overdue,
            ],
            ApprovalStatus::Rejected => &[RequestStatus::Rejected],
        }
    }
}

impl From<RequestStatus> for ApprovalStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::Pending => ApprovalStatus::Pending,
            RequestStatus::Rejected => ApprovalStatus::Rejected,
            RequestStatus::Approved | RequestStatus::Returned | RequestStatus::Overdue => {
                ApprovalStatus::Approved
            }
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            _ => Err(format!("Invalid approval status: {}", s)),
        }
    }
}

/// Borrow request as stored
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowRequest {
    pub id: i32,
    pub requester_id: String,
    pub requester_name: Option<String>,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub request_date: NaiveDate,
    pub return_date: NaiveDate,
    /// Borrower's notes
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_reason: Option<String>,
    pub review_notes: Option<String>,
}

impl BorrowRequest {
    pub fn new(id: i32, data: NewBorrowRequest) -> Self {
        Self {
            id,
            requester_id: data.requester_id,
            requester_name: data.requester_name,
            equipment_id: data.equipment_id,
            equipment_name: data.equipment_name,
            request_date: data.request_date,
            return_date: data.return_date,
            notes: data.notes,
            status: RequestStatus::Pending,
            created_at: data.created_at,
            reviewed_by: None,
            reviewed_at: None,
            review_reason: None,
            review_notes: None,
        }
    }

    /// Write the target status and reviewer stamp of a transition
    pub fn apply(&mut self, transition: &Transition) {
        self.status = transition.to;
        if let Some(review) = &transition.review {
            self.reviewed_by = Some(review.reviewer.clone());
            self.reviewed_at = Some(review.at);
            if review.reason.is_some() {
                self.review_reason = review.reason.clone();
            }
            if review.notes.is_some() {
                self.review_notes = review.notes.clone();
            }
        }
    }
}

/// Data for a request about to be stored (always PENDING)
#[derive(Debug, Clone)]
pub struct NewBorrowRequest {
    pub requester_id: String,
    pub requester_name: Option<String>,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub request_date: NaiveDate,
    pub return_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reviewer decision attached to a transition
#[derive(Debug, Clone)]
pub struct Review {
    pub reviewer: String,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub at: DateTime<Utc>,
}

/// A checked status change, applied by the repository as one unit together
/// with its inventory effect. `from` is re-checked under lock.
#[derive(Debug, Clone)]
pub struct Transition {
    pub request_id: i32,
    pub from: RequestStatus,
    pub to: RequestStatus,
    pub effect: InventoryEffect,
    pub review: Option<Review>,
}

impl Transition {
    pub fn new(request: &BorrowRequest, to: RequestStatus) -> AppResult<Self> {
        let effect = request.status.transition_to(to)?;
        Ok(Self {
            request_id: request.id,
            from: request.status,
            to,
            effect,
            review: None,
        })
    }

    pub fn with_review(mut self, review: Review) -> Self {
        self.review = Some(review);
        self
    }
}

/// Create borrow request payload
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBorrowRequest {
    /// Defaults to the caller
    pub requester_id: Option<String>,
    pub requester_name: Option<String>,
    pub equipment_id: i32,
    pub request_date: NaiveDate,
    pub return_date: NaiveDate,
    pub notes: Option<String>,
}

/// Borrower's view of a request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RequestView {
    pub id: i32,
    pub requester_id: String,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub request_date: NaiveDate,
    pub return_date: NaiveDate,
    pub notes: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
}

impl From<BorrowRequest> for RequestView {
    fn from(r: BorrowRequest) -> Self {
        Self {
            id: r.id,
            requester_id: r.requester_id,
            equipment_id: r.equipment_id,
            equipment_name: r.equipment_name,
            request_date: r.request_date,
            return_date: r.return_date,
            notes: r.notes,
            status: r.status,
            created_at: r.created_at,
        }
    }
}

/// Reviewer's view of a request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApprovalView {
    pub id: i32,
    pub requester_id: String,
    pub requester_name: String,
    pub equipment_id: i32,
    pub equipment_name: String,
    pub request_date: NaiveDate,
    pub return_date: NaiveDate,
    /// Rejection reason
    pub reason: Option<String>,
    /// Reviewer notes
    pub notes: Option<String>,
    /// Borrower notes
    pub request_notes: Option<String>,
    pub status: ApprovalStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<BorrowRequest> for ApprovalView {
    fn from(r: BorrowRequest) -> Self {
        let requester_name = r
            .requester_name
            .unwrap_or_else(|| r.requester_id.clone());
        Self {
            id: r.id,
            requester_id: r.requester_id,
            requester_name,
            equipment_id: r.equipment_id,
            equipment_name: r.equipment_name,
            request_date: r.request_date,
            return_date: r.return_date,
            reason: r.review_reason,
            notes: r.review_notes,
            request_notes: r.notes,
            status: r.status.into(),
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at,
            created_at: r.created_at,
        }
    }
}
