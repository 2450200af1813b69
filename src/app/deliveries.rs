use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::Date;
use uuid::Uuid;

use crate::domain::delivery::{Delivery, DeliveryStatus, MealSlot};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct DeliveryService {
    db: Db,
}

const DELIVERY_COLUMNS: &str = "id, subscription_id, mess_id, customer_id, date, meal_slot, \
     status, skip_reason, skip_requested_at, delivered_at, notes";

impl DeliveryService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_for_subscription(&self, subscription_id: Uuid) -> Result<Vec<Delivery>> {
        let rows = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries \
             WHERE subscription_id = $1 ORDER BY date, meal_slot"
        ))
        .bind(subscription_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(delivery_from_row).collect()
    }

    /// A mess's roster for one day, the owner dashboard view.
    pub async fn list_for_mess_on(&self, mess_id: Uuid, date: Date) -> Result<Vec<Delivery>> {
        let rows = sqlx::query(&format!(
            "SELECT {DELIVERY_COLUMNS} FROM deliveries \
             WHERE mess_id = $1 AND date = $2 ORDER BY meal_slot, customer_id"
        ))
        .bind(mess_id)
        .bind(date)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(delivery_from_row).collect()
    }

    /// The delivery together with the owning user of its mess, used to
    /// authorize owner-side actions.
    pub async fn get_with_owner(&self, delivery_id: Uuid) -> Result<Option<(Delivery, Uuid)>> {
        let row = sqlx::query(
            "SELECT d.id, d.subscription_id, d.mess_id, d.customer_id, d.date, d.meal_slot, \
                    d.status, d.skip_reason, d.skip_requested_at, d.delivered_at, d.notes, \
                    m.owner_id AS mess_owner_id \
             FROM deliveries d JOIN messes m ON m.id = d.mess_id \
             WHERE d.id = $1",
        )
        .bind(delivery_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| {
            let delivery = delivery_from_row(&row)?;
            let owner_id: Uuid = row.get("mess_owner_id");
            Ok((delivery, owner_id))
        })
        .transpose()
    }

    pub async fn mark_delivered(&self, delivery_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE deliveries SET status = 'delivered', delivered_at = now() \
             WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(delivery_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

pub(crate) fn delivery_from_row(row: &PgRow) -> Result<Delivery> {
    let slot: String = row.get("meal_slot");
    let status: String = row.get("status");

    Ok(Delivery {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        mess_id: row.get("mess_id"),
        customer_id: row.get("customer_id"),
        date: row.get("date"),
        meal_slot: MealSlot::from_db(&slot).ok_or_else(|| anyhow!("unknown meal slot: {}", slot))?,
        status: DeliveryStatus::from_db(&status)
            .ok_or_else(|| anyhow!("unknown delivery status: {}", status))?,
        skip_reason: row.get("skip_reason"),
        skip_requested_at: row.get("skip_requested_at"),
        delivered_at: row.get("delivered_at"),
        notes: row.get("notes"),
    })
}
