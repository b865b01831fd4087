//! Equipment inventory service

use validator::Validate;

use crate::{
    error::AppResult,
    models::equipment::{Equipment, EquipmentInput, EquipmentSearch},
    repository::Repository,
};

#[derive(Clone)]
pub struct EquipmentService {
    repository: Repository,
}

impl EquipmentService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn list(&self) -> AppResult<Vec<Equipment>> {
        self.repository.equipment.list().await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.get_by_id(id).await
    }

    /// Filter by name/description substring and exact category; blank filters match all
    pub async fn search(&self, filter: &EquipmentSearch) -> AppResult<Vec<Equipment>> {
        if filter.query().is_none() && filter.category().is_none() {
            return self.list().await;
        }
        self.repository.equipment.search(filter).await
    }

    pub async fn create(&self, data: &EquipmentInput) -> AppResult<Equipment> {
        data.validate()?;
        let equipment = self.repository.equipment.create(data).await?;
        tracing::info!(equipment_id = equipment.id, quantity = equipment.quantity, "Equipment created");
        Ok(equipment)
    }

    /// Replace all fields; `available` is reset to the new quantity
    pub async fn update(&self, id: i32, data: &EquipmentInput) -> AppResult<Equipment> {
        data.validate()?;
        let equipment = self.repository.equipment.update(id, data).await?;
        tracing::info!(equipment_id = id, quantity = equipment.quantity, "Equipment updated");
        Ok(equipment)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.equipment.delete(id).await?;
        tracing::info!(equipment_id = id, "Equipment deleted");
        Ok(())
    }

    /// Take one unit outside of any request transition. Approvals reserve
    /// through `RequestRepository::apply_transition` so the status write and
    /// the count change commit together.
    pub async fn reserve_unit(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.reserve_unit(id).await
    }

    /// Give one unit back outside of any request transition, capped at quantity
    pub async fn release_unit(&self, id: i32) -> AppResult<Equipment> {
        self.repository.equipment.release_unit(id).await
    }
}
