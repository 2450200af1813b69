use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::Row;
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use crate::app::deliveries::delivery_from_row;
use crate::domain::delivery::{is_eligible_to_skip, MealSlot, SkippedDelivery};
use crate::domain::serde_date;
use crate::infra::db::Db;

pub const MESS_CUT_TITLE: &str = "Mess Cut Request";
pub const ACK_NOTE: &str = "Acknowledged by mess owner";

/// The store operations the mess-cut workflow needs: an update targeted
/// by the (subscription, date, slot) triple, the post-update read joined
/// with the mess, and the note update used by acknowledge.
#[async_trait]
pub trait MessCutStore: Send + Sync {
    async fn mark_skipped(
        &self,
        subscription_id: Uuid,
        date: Date,
        slot: MealSlot,
        reason: Option<&str>,
        requested_at: OffsetDateTime,
    ) -> Result<u64>;

    async fn fetch_skipped(
        &self,
        subscription_id: Uuid,
        date: Date,
        slot: MealSlot,
    ) -> Result<Option<SkippedDelivery>>;

    async fn set_note(&self, delivery_id: Uuid, note: &str) -> Result<u64>;
}

/// Persists a notification and attempts a push alert. Both side effects
/// are best-effort from the caller's point of view; implementations log
/// their own failures and never surface them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: Uuid, title: &str, message: &str, payload: Value);
}

#[derive(Debug, thiserror::Error)]
pub enum MessCutError {
    #[error("mess cut window has closed for this meal")]
    IneligibleSkipWindow,
    #[error("no matching delivery")]
    DeliveryNotFound,
    /// The post-update join failed. The delivery has already been marked
    /// skipped at this point and is deliberately left that way.
    #[error("delivery records are inconsistent: {0}")]
    Integrity(#[source] anyhow::Error),
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct MessCutService<S, N> {
    store: S,
    notifier: N,
    tz: UtcOffset,
}

impl<S: MessCutStore, N: Notifier> MessCutService<S, N> {
    pub fn new(store: S, notifier: N, tz: UtcOffset) -> Self {
        Self { store, notifier, tz }
    }

    /// Whether a skip could still be requested right now. Exposed so the
    /// client can disable the action before any request is made.
    pub fn eligibility(&self, date: Date, slot: MealSlot, now: OffsetDateTime) -> bool {
        is_eligible_to_skip(date, slot.as_db(), self.tz, now)
    }

    /// Marks one scheduled meal as skipped and notifies the mess owner.
    ///
    /// Eligibility is re-checked here with the request-time clock, not
    /// just at UI-gate time. The update and the follow-up join are two
    /// independent round trips, not one transaction: if the join fails
    /// the delivery stays skipped and the owner gets no notification.
    pub async fn request_skip(
        &self,
        subscription_id: Uuid,
        date: Date,
        slot: MealSlot,
        reason: Option<String>,
        now: OffsetDateTime,
    ) -> Result<SkippedDelivery, MessCutError> {
        if !is_eligible_to_skip(date, slot.as_db(), self.tz, now) {
            return Err(MessCutError::IneligibleSkipWindow);
        }

        let updated = self
            .store
            .mark_skipped(subscription_id, date, slot, reason.as_deref(), now)
            .await?;
        if updated == 0 {
            return Err(MessCutError::DeliveryNotFound);
        }

        let skipped = self
            .store
            .fetch_skipped(subscription_id, date, slot)
            .await
            .map_err(MessCutError::Integrity)?
            .ok_or_else(|| {
                MessCutError::Integrity(anyhow!("skipped delivery vanished after update"))
            })?;

        let date_label = date
            .format(&serde_date::FORMAT)
            .unwrap_or_else(|_| date.to_string());
        let message = format!(
            "{} on {} has been cut for {}",
            slot.as_db(),
            date_label,
            skipped.mess_name
        );
        let payload = json!({
            "type": "mess_cut",
            "delivery_id": skipped.delivery.id,
            "date": date_label,
            "meal_slot": slot.as_db(),
            "reason": skipped.delivery.skip_reason,
        });
        self.notifier
            .notify(skipped.mess_owner_id, MESS_CUT_TITLE, &message, payload)
            .await;

        Ok(skipped)
    }

    /// Owner-side acknowledgement; just stamps a note on the row.
    pub async fn acknowledge(&self, delivery_id: Uuid) -> Result<(), MessCutError> {
        let updated = self.store.set_note(delivery_id, ACK_NOTE).await?;
        if updated == 0 {
            return Err(MessCutError::DeliveryNotFound);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgMessCutStore {
    db: Db,
}

impl PgMessCutStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessCutStore for PgMessCutStore {
    async fn mark_skipped(
        &self,
        subscription_id: Uuid,
        date: Date,
        slot: MealSlot,
        reason: Option<&str>,
        requested_at: OffsetDateTime,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE deliveries \
             SET status = 'skipped', skip_reason = $4, skip_requested_at = $5 \
             WHERE subscription_id = $1 AND date = $2 AND meal_slot = $3 \
               AND status = 'scheduled'",
        )
        .bind(subscription_id)
        .bind(date)
        .bind(slot.as_db())
        .bind(reason)
        .bind(requested_at)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected())
    }

    async fn fetch_skipped(
        &self,
        subscription_id: Uuid,
        date: Date,
        slot: MealSlot,
    ) -> Result<Option<SkippedDelivery>> {
        let row = sqlx::query(
            "SELECT d.id, d.subscription_id, d.mess_id, d.customer_id, d.date, d.meal_slot, \
                    d.status, d.skip_reason, d.skip_requested_at, d.delivered_at, d.notes, \
                    m.name AS mess_name, m.owner_id AS mess_owner_id \
             FROM deliveries d \
             JOIN subscriptions s ON s.id = d.subscription_id \
             JOIN messes m ON m.id = s.mess_id \
             WHERE d.subscription_id = $1 AND d.date = $2 AND d.meal_slot = $3",
        )
        .bind(subscription_id)
        .bind(date)
        .bind(slot.as_db())
        .fetch_optional(self.db.pool())
        .await?;

        row.map(|row| {
            let delivery = delivery_from_row(&row)?;
            Ok(SkippedDelivery {
                delivery,
                mess_name: row.get("mess_name"),
                mess_owner_id: row.get("mess_owner_id"),
            })
        })
        .transpose()
    }

    async fn set_note(&self, delivery_id: Uuid, note: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE deliveries SET notes = $2 WHERE id = $1")
            .bind(delivery_id)
            .bind(note)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
