//! Equipment repository for database operations

use async_trait::async_trait;
use sqlx::{PgConnection, Pool, Postgres};

use super::EquipmentRepository;
use crate::{
    error::{AppError, AppResult},
    models::equipment::{Equipment, EquipmentInput, EquipmentSearch},
};

#[derive(Clone)]
pub struct PgEquipmentRepository {
    pool: Pool<Postgres>,
}

impl PgEquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn not_found(id: i32) -> AppError {
    AppError::NotFound(format!("Equipment {} not found", id))
}

/// Escape LIKE wildcards so user input only matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Take one unit with a single conditional UPDATE.
///
/// Runs on whatever connection it is given so a status transition can call it
/// inside its own transaction.
pub(super) async fn reserve_unit_on(conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
    let reserved = sqlx::query_as::<_, Equipment>(
        r#"
        UPDATE equipment
        SET available = available - 1, updated_at = NOW()
        WHERE id = $1 AND available > 0
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(equipment) = reserved {
        return Ok(equipment);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM equipment WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    if exists {
        Err(AppError::InsufficientAvailability(format!(
            "No units of equipment {} available",
            id
        )))
    } else {
        Err(not_found(id))
    }
}

/// Give one unit back, never above `quantity`
pub(super) async fn release_unit_on(conn: &mut PgConnection, id: i32) -> AppResult<Equipment> {
    sqlx::query_as::<_, Equipment>(
        r#"
        UPDATE equipment
        SET available = LEAST(available + 1, quantity), updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| not_found(id))
}

#[async_trait]
impl EquipmentRepository for PgEquipmentRepository {
    async fn list(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>("SELECT * FROM equipment ORDER BY name, id")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| not_found(id))
    }

    async fn search(&self, filter: &EquipmentSearch) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE ($1::TEXT IS NULL OR name ILIKE $1 OR description ILIKE $1)
              AND ($2::TEXT IS NULL OR LOWER(category) = LOWER($2))
            ORDER BY name, id
            "#,
        )
        .bind(filter.query().map(like_pattern))
        .bind(filter.category())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn create(&self, data: &EquipmentInput) -> AppResult<Equipment> {
        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (
                name, category, description, condition, location, quantity, available,
                specifications, usage_instructions, restrictions, last_maintenance,
                maintenance_interval
            )
            VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9, COALESCE($10, CURRENT_DATE), $11)
            RETURNING *
            "#,
        )
        .bind(&data.name)
        .bind(&data.category)
        .bind(&data.description)
        .bind(&data.condition)
        .bind(&data.location)
        .bind(data.quantity)
        .bind(data.specifications.clone())
        .bind(&data.usage_instructions)
        .bind(&data.restrictions)
        .bind(data.last_maintenance)
        .bind(data.maintenance_interval)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i32, data: &EquipmentInput) -> AppResult<Equipment> {
        // available follows the new quantity, outstanding loans are not subtracted
        sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment SET
                name = $2, category = $3, description = $4, condition = $5, location = $6,
                quantity = $7, available = $7, specifications = $8, usage_instructions = $9,
                restrictions = $10, last_maintenance = COALESCE($11, last_maintenance),
                maintenance_interval = $12, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.category)
        .bind(&data.description)
        .bind(&data.condition)
        .bind(&data.location)
        .bind(data.quantity)
        .bind(data.specifications.clone())
        .bind(&data.usage_instructions)
        .bind(&data.restrictions)
        .bind(data.last_maintenance)
        .bind(data.maintenance_interval)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| not_found(id))
    }

    async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM equipment WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    async fn reserve_unit(&self, id: i32) -> AppResult<Equipment> {
        let mut conn = self.pool.acquire().await?;
        reserve_unit_on(&mut conn, id).await
    }

    async fn release_unit(&self, id: i32) -> AppResult<Equipment> {
        let mut conn = self.pool.acquire().await?;
        release_unit_on(&mut conn, id).await
    }
}
