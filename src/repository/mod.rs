//! Repository layer for equipment and borrow requests
//!
//! Services depend on the two traits below. `Repository::postgres` backs them
//! with sqlx, `Repository::in_memory` with a process-local store.

pub mod equipment;
pub mod memory;
pub mod requests;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        equipment::{Equipment, EquipmentInput, EquipmentSearch},
        request::{BorrowRequest, NewBorrowRequest, RequestStatus, Transition},
    },
};

/// Equipment records and their availability counters
#[async_trait]
pub trait EquipmentRepository: Send + Sync {
    async fn list(&self) -> AppResult<Vec<Equipment>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Equipment>;

    async fn search(&self, filter: &EquipmentSearch) -> AppResult<Vec<Equipment>>;

    async fn create(&self, data: &EquipmentInput) -> AppResult<Equipment>;

    async fn update(&self, id: i32, data: &EquipmentInput) -> AppResult<Equipment>;

    async fn delete(&self, id: i32) -> AppResult<()>;

    /// Atomically take one unit if any is available
    async fn reserve_unit(&self, id: i32) -> AppResult<Equipment>;

    /// Atomically give one unit back, capped at `quantity`
    async fn release_unit(&self, id: i32) -> AppResult<Equipment>;
}

/// Borrow requests
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest>;

    async fn create(&self, data: NewBorrowRequest) -> AppResult<BorrowRequest>;

    async fn list(&self) -> AppResult<Vec<BorrowRequest>>;

    async fn list_by_requester(&self, requester_id: &str) -> AppResult<Vec<BorrowRequest>>;

    async fn list_by_statuses(&self, statuses: &[RequestStatus]) -> AppResult<Vec<BorrowRequest>>;

    /// Apply a status change and its inventory effect as one unit.
    ///
    /// Fails with `InvalidTransition` when the stored status no longer equals
    /// `transition.from`; nothing is written in that case or when the
    /// inventory effect fails.
    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest>;
}

/// Main repository struct handed to the services
#[derive(Clone)]
pub struct Repository {
    pub equipment: Arc<dyn EquipmentRepository>,
    pub requests: Arc<dyn RequestRepository>,
    pool: Option<Pool<Postgres>>,
}

impl Repository {
    /// Create a repository backed by PostgreSQL
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            equipment: Arc::new(equipment::PgEquipmentRepository::new(pool.clone())),
            requests: Arc::new(requests::PgRequestRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }

    /// Create a repository that keeps everything in process memory
    pub fn in_memory() -> Self {
        let store = memory::MemoryStore::new();
        Self {
            equipment: Arc::new(store.clone()),
            requests: Arc::new(store),
            pool: None,
        }
    }

    /// Check that the storage backend answers
    pub async fn ping(&self) -> AppResult<()> {
        if let Some(pool) = &self.pool {
            sqlx::query("SELECT 1").execute(pool).await?;
        }
        Ok(())
    }
}
