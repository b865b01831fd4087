//! Borrow requests repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use super::{
    equipment::{release_unit_on, reserve_unit_on},
    RequestRepository,
};
use crate::{
    error::{AppError, AppResult},
    models::request::{BorrowRequest, InventoryEffect, NewBorrowRequest, RequestStatus, Transition},
};

#[derive(Clone)]
pub struct PgRequestRepository {
    pool: Pool<Postgres>,
}

impl PgRequestRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Request {} not found", id))
}

#[async_trait]
impl RequestRepository for PgRequestRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn create(&self, data: NewBorrowRequest) -> AppResult<BorrowRequest> {
        let row = sqlx::query_as::<_, BorrowRequest>(
            r#"
            INSERT INTO borrow_requests (
                requester_id, requester_name, equipment_id, equipment_name,
                request_date, return_date, notes, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&data.requester_id)
        .bind(&data.requester_name)
        .bind(data.equipment_id)
        .bind(&data.equipment_name)
        .bind(data.request_date)
        .bind(data.return_date)
        .bind(&data.notes)
        .bind(RequestStatus::Pending)
        .bind(data.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list(&self) -> AppResult<Vec<BorrowRequest>> {
        let rows = sqlx::query_as::<_, BorrowRequest>("SELECT * FROM borrow_requests ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn list_by_requester(&self, requester_id: &str) -> AppResult<Vec<BorrowRequest>> {
        let rows = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE requester_id = $1 ORDER BY id",
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_by_statuses(&self, statuses: &[RequestStatus]) -> AppResult<Vec<BorrowRequest>> {
        let tokens: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
        let rows = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE status = ANY($1) ORDER BY id",
        )
        .bind(tokens)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest> {
        let id = transition.request_id;

        // Dropping `tx` on any early return rolls everything back
        let mut tx = self.pool.begin().await?;

        let mut request = sqlx::query_as::<_, BorrowRequest>(
            "SELECT * FROM borrow_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| not_found(id))?;

        if request.status != transition.from {
            return Err(AppError::InvalidTransition(format!(
                "Request {} is {}, expected {}",
                id, request.status, transition.from
            )));
        }

        match transition.effect {
            InventoryEffect::Reserve => {
                reserve_unit_on(&mut tx, request.equipment_id).await?;
            }
            InventoryEffect::Release => {
                release_unit_on(&mut tx, request.equipment_id).await?;
            }
            InventoryEffect::None => {}
        }

        request.apply(transition);

        let updated = sqlx::query_as::<_, BorrowRequest>(
            r#"
            UPDATE borrow_requests SET
                status = $2, reviewed_by = $3, reviewed_at = $4,
                review_reason = $5, review_notes = $6
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(request.status)
        .bind(&request.reviewed_by)
        .bind(request.reviewed_at)
        .bind(&request.review_reason)
        .bind(&request.review_notes)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(updated)
    }
}
