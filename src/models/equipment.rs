//! Equipment model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Equipment record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Equipment {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    /// Units owned
    pub quantity: i32,
    /// Units not currently on loan, `0 <= available <= quantity`
    pub available: i32,
    pub specifications: Vec<String>,
    pub usage_instructions: Option<String>,
    pub restrictions: Option<String>,
    pub last_maintenance: Option<NaiveDate>,
    /// Days between required maintenance
    pub maintenance_interval: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Build a fresh record from input; every unit starts available
    pub fn from_input(id: i32, data: &EquipmentInput, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: data.name.clone(),
            category: data.category.clone(),
            description: data.description.clone(),
            condition: data.condition.clone(),
            location: data.location.clone(),
            quantity: data.quantity,
            available: data.quantity,
            specifications: data.specifications.clone(),
            usage_instructions: data.usage_instructions.clone(),
            restrictions: data.restrictions.clone(),
            last_maintenance: Some(data.last_maintenance.unwrap_or_else(|| now.date_naive())),
            maintenance_interval: data.maintenance_interval,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace every mutable field. `available` is reset to the new quantity,
    /// so loans still outstanding are no longer reflected in the count.
    /// `last_maintenance` is the exception: an omitted date keeps the
    /// recorded one.
    pub fn apply_input(&mut self, data: &EquipmentInput, now: DateTime<Utc>) {
        self.name = data.name.clone();
        self.category = data.category.clone();
        self.description = data.description.clone();
        self.condition = data.condition.clone();
        self.location = data.location.clone();
        self.quantity = data.quantity;
        self.available = data.quantity;
        self.specifications = data.specifications.clone();
        self.usage_instructions = data.usage_instructions.clone();
        self.restrictions = data.restrictions.clone();
        if let Some(date) = data.last_maintenance {
            self.last_maintenance = Some(date);
        }
        self.maintenance_interval = data.maintenance_interval;
        self.updated_at = now;
    }

    pub fn matches(&self, filter: &EquipmentSearch) -> bool {
        if let Some(q) = filter.query() {
            let q = q.to_lowercase();
            let in_name = self.name.to_lowercase().contains(&q);
            let in_description = self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&q))
                .unwrap_or(false);
            if !in_name && !in_description {
                return false;
            }
        }
        if let Some(category) = filter.category() {
            if self.category.to_lowercase() != category.to_lowercase() {
                return false;
            }
        }
        true
    }
}

/// Create / update equipment request (updates replace every field)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EquipmentInput {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub description: Option<String>,
    pub condition: Option<String>,
    pub location: Option<String>,
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: i32,
    #[serde(default)]
    pub specifications: Vec<String>,
    pub usage_instructions: Option<String>,
    pub restrictions: Option<String>,
    pub last_maintenance: Option<NaiveDate>,
    #[validate(range(min = 0, message = "Maintenance interval must not be negative"))]
    pub maintenance_interval: Option<i32>,
}

/// Equipment search parameters; blank values are ignored
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct EquipmentSearch {
    /// Case-insensitive substring of name or description
    pub q: Option<String>,
    /// Exact category, case-insensitive
    pub category: Option<String>,
}

impl EquipmentSearch {
    pub fn query(&self) -> Option<&str> {
        self.q.as_deref().filter(|s| !s.is_empty())
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref().filter(|s| !s.is_empty())
    }
}
