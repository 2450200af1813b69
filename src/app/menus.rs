use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::delivery::MealSlot;
use crate::domain::menu::MenuEntry;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct MenuService {
    db: Db,
}

pub struct MenuUpsert {
    pub weekday: i16,
    pub meal_slot: MealSlot,
    pub items: String,
}

impl MenuService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn week(&self, mess_id: Uuid) -> Result<Vec<MenuEntry>> {
        let rows = sqlx::query(
            "SELECT id, mess_id, weekday, meal_slot, items, updated_at \
             FROM menu_entries WHERE mess_id = $1 \
             ORDER BY weekday, meal_slot",
        )
        .bind(mess_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let slot: String = row.get("meal_slot");
            let Some(meal_slot) = MealSlot::from_db(&slot) else {
                continue;
            };
            entries.push(MenuEntry {
                id: row.get("id"),
                mess_id: row.get("mess_id"),
                weekday: row.get("weekday"),
                meal_slot,
                items: row.get("items"),
                updated_at: row.get("updated_at"),
            });
        }

        Ok(entries)
    }

    /// Replaces the given cells of the weekly grid in one transaction.
    pub async fn upsert_week(&self, mess_id: Uuid, entries: Vec<MenuUpsert>) -> Result<usize> {
        let mut tx = self.db.pool().begin().await?;
        let count = entries.len();

        for entry in entries {
            sqlx::query(
                "INSERT INTO menu_entries (mess_id, weekday, meal_slot, items) \
                 VALUES ($1, $2, $3, $4) \
                 ON CONFLICT (mess_id, weekday, meal_slot) \
                 DO UPDATE SET items = EXCLUDED.items, updated_at = now()",
            )
            .bind(mess_id)
            .bind(entry.weekday)
            .bind(entry.meal_slot.as_db())
            .bind(entry.items)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(count)
    }
}
