use anyhow::{anyhow, Result};
use sqlx::postgres::PgRow;
use sqlx::Row;
use time::Date;
use uuid::Uuid;

use crate::domain::delivery::MealSlot;
use crate::domain::mess::Mess;
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SubscriptionService {
    db: Db,
}

/// Price of a plan: one day's worth of the selected slot rates, times the
/// number of days in the range (inclusive of both endpoints).
pub fn plan_price(mess: &Mess, slots: &[MealSlot], start: Date, end: Date) -> i64 {
    let days = (end - start).whole_days() + 1;
    let per_day: i64 = slots.iter().map(|slot| mess.rate_for(*slot) as i64).sum();
    days * per_day
}

impl SubscriptionService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Creates the subscription and provisions one scheduled delivery per
    /// (date, slot) in the same transaction.
    pub async fn create(
        &self,
        customer_id: Uuid,
        mess: &Mess,
        slots: Vec<MealSlot>,
        start_date: Date,
        end_date: Date,
    ) -> Result<Subscription> {
        if slots.is_empty() {
            return Err(anyhow!("at least one meal slot is required"));
        }
        if end_date < start_date {
            return Err(anyhow!("end date precedes start date"));
        }

        let total_price = plan_price(mess, &slots, start_date, end_date);
        let slot_labels: Vec<&str> = slots.iter().map(|slot| slot.as_db()).collect();

        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query(
            "INSERT INTO subscriptions \
             (customer_id, mess_id, meal_slots, start_date, end_date, total_price) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, customer_id, mess_id, meal_slots, start_date, end_date, \
                       total_price, status, created_at",
        )
        .bind(customer_id)
        .bind(mess.id)
        .bind(&slot_labels)
        .bind(start_date)
        .bind(end_date)
        .bind(total_price)
        .fetch_one(&mut *tx)
        .await?;
        let subscription = subscription_from_row(&row)?;

        let mut date = start_date;
        loop {
            for slot in &slots {
                sqlx::query(
                    "INSERT INTO deliveries \
                     (subscription_id, mess_id, customer_id, date, meal_slot) \
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(subscription.id)
                .bind(mess.id)
                .bind(customer_id)
                .bind(date)
                .bind(slot.as_db())
                .execute(&mut *tx)
                .await?;
            }
            if date == end_date {
                break;
            }
            date = date.next_day().ok_or_else(|| anyhow!("date out of range"))?;
        }

        tx.commit().await?;
        Ok(subscription)
    }

    pub async fn get(&self, subscription_id: Uuid) -> Result<Option<Subscription>> {
        let row = sqlx::query(
            "SELECT id, customer_id, mess_id, meal_slots, start_date, end_date, \
                    total_price, status, created_at \
             FROM subscriptions WHERE id = $1",
        )
        .bind(subscription_id)
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| subscription_from_row(&row)).transpose()
    }

    pub async fn list_for_customer(&self, customer_id: Uuid) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, mess_id, meal_slots, start_date, end_date, \
                    total_price, status, created_at \
             FROM subscriptions WHERE customer_id = $1 \
             ORDER BY created_at DESC",
        )
        .bind(customer_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    pub async fn list_for_mess(&self, mess_id: Uuid) -> Result<Vec<Subscription>> {
        let rows = sqlx::query(
            "SELECT id, customer_id, mess_id, meal_slots, start_date, end_date, \
                    total_price, status, created_at \
             FROM subscriptions WHERE mess_id = $1 AND status = 'active' \
             ORDER BY created_at DESC",
        )
        .bind(mess_id)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(subscription_from_row).collect()
    }

    /// Cancels the subscription and every future scheduled delivery on it.
    pub async fn cancel(&self, subscription_id: Uuid, customer_id: Uuid, from: Date) -> Result<bool> {
        let mut tx = self.db.pool().begin().await?;

        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'cancelled' \
             WHERE id = $1 AND customer_id = $2 AND status = 'active'",
        )
        .bind(subscription_id)
        .bind(customer_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE deliveries SET status = 'cancelled' \
             WHERE subscription_id = $1 AND date >= $2 AND status = 'scheduled'",
        )
        .bind(subscription_id)
        .bind(from)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription> {
    let labels: Vec<String> = row.get("meal_slots");
    let meal_slots = labels
        .iter()
        .map(|label| {
            MealSlot::from_db(label).ok_or_else(|| anyhow!("unknown meal slot: {}", label))
        })
        .collect::<Result<Vec<_>>>()?;
    let status: String = row.get("status");

    Ok(Subscription {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        mess_id: row.get("mess_id"),
        meal_slots,
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        total_price: row.get("total_price"),
        status: SubscriptionStatus::from_db(&status)
            .ok_or_else(|| anyhow!("unknown subscription status: {}", status))?,
        created_at: row.get("created_at"),
    })
}
