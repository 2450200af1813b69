use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::delivery::MealSlot;

/// One cell of a mess's weekly menu grid. Weekday 0 is Monday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuEntry {
    pub id: Uuid,
    pub mess_id: Uuid,
    pub weekday: i16,
    pub meal_slot: MealSlot,
    pub items: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
