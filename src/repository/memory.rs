//! In-memory storage backend
//!
//! Every operation runs under one mutex, so a transition and its inventory
//! effect are observed together or not at all.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{EquipmentRepository, RequestRepository};
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{Equipment, EquipmentInput, EquipmentSearch},
        request::{BorrowRequest, InventoryEffect, NewBorrowRequest, RequestStatus, Transition},
    },
};

#[derive(Default)]
struct MemoryState {
    equipment: BTreeMap<i32, Equipment>,
    requests: BTreeMap<i32, BorrowRequest>,
    last_equipment_id: i32,
    last_request_id: i32,
}

impl MemoryState {
    fn equipment_mut(&mut self, id: i32) -> AppResult<&mut Equipment> {
        self.equipment
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    fn reserve(&mut self, id: i32) -> AppResult<Equipment> {
        let equipment = self.equipment_mut(id)?;
        if equipment.available <= 0 {
            return Err(AppError::InsufficientAvailability(format!(
                "No units of equipment {} available",
                id
            )));
        }
        equipment.available -= 1;
        equipment.updated_at = Utc::now();
        Ok(equipment.clone())
    }

    fn release(&mut self, id: i32) -> AppResult<Equipment> {
        let equipment = self.equipment_mut(id)?;
        equipment.available = (equipment.available + 1).min(equipment.quantity);
        equipment.updated_at = Utc::now();
        Ok(equipment.clone())
    }

    fn sorted_equipment<'a>(items: impl Iterator<Item = &'a Equipment>) -> Vec<Equipment> {
        let mut rows: Vec<Equipment> = items.cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        rows
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EquipmentRepository for MemoryStore {
    async fn list(&self) -> AppResult<Vec<Equipment>> {
        let state = self.state.lock().await;
        Ok(MemoryState::sorted_equipment(state.equipment.values()))
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        let mut state = self.state.lock().await;
        state.equipment_mut(id).map(|e| e.clone())
    }

    async fn search(&self, filter: &EquipmentSearch) -> AppResult<Vec<Equipment>> {
        let state = self.state.lock().await;
        Ok(MemoryState::sorted_equipment(
            state.equipment.values().filter(|e| e.matches(filter)),
        ))
    }

    async fn create(&self, data: &EquipmentInput) -> AppResult<Equipment> {
        let mut state = self.state.lock().await;
        state.last_equipment_id += 1;
        let equipment = Equipment::from_input(state.last_equipment_id, data, Utc::now());
        state.equipment.insert(equipment.id, equipment.clone());
        Ok(equipment)
    }

    async fn update(&self, id: i32, data: &EquipmentInput) -> AppResult<Equipment> {
        let mut state = self.state.lock().await;
        let equipment = state.equipment_mut(id)?;
        equipment.apply_input(data, Utc::now());
        Ok(equipment.clone())
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state
            .equipment
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    async fn reserve_unit(&self, id: i32) -> AppResult<Equipment> {
        self.state.lock().await.reserve(id)
    }

    async fn release_unit(&self, id: i32) -> AppResult<Equipment> {
        self.state.lock().await.release(id)
    }
}

#[async_trait]
impl RequestRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<BorrowRequest> {
        let state = self.state.lock().await;
        state
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))
    }

    async fn create(&self, data: NewBorrowRequest) -> AppResult<BorrowRequest> {
        let mut state = self.state.lock().await;
        state.last_request_id += 1;
        let request = BorrowRequest::new(state.last_request_id, data);
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn list(&self) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state.lock().await;
        Ok(state.requests.values().cloned().collect())
    }

    async fn list_by_requester(&self, requester_id: &str) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| r.requester_id == requester_id)
            .cloned()
            .collect())
    }

    async fn list_by_statuses(&self, statuses: &[RequestStatus]) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state.lock().await;
        Ok(state
            .requests
            .values()
            .filter(|r| statuses.contains(&r.status))
            .cloned()
            .collect())
    }

    async fn apply_transition(&self, transition: &Transition) -> AppResult<BorrowRequest> {
        let id = transition.request_id;
        let mut state = self.state.lock().await;

        let mut request = state
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        if request.status != transition.from {
            return Err(AppError::InvalidTransition(format!(
                "Request {} is {}, expected {}",
                id, request.status, transition.from
            )));
        }

        // The inventory effect is the only step that can fail, so it runs
        // before the request is touched.
        match transition.effect {
            InventoryEffect::Reserve => {
                state.reserve(request.equipment_id)?;
            }
            InventoryEffect::Release => {
                state.release(request.equipment_id)?;
            }
            InventoryEffect::None => {}
        }

        request.apply(transition);
        state.requests.insert(id, request.clone());
        Ok(request)
    }
}
