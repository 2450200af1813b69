use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::delivery::MealSlot;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mess {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Daily rates in whole rupees, one per meal slot.
    pub rate_breakfast: i32,
    pub rate_lunch: i32,
    pub rate_dinner: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Mess {
    pub fn rate_for(&self, slot: MealSlot) -> i32 {
        match slot {
            MealSlot::Breakfast => self.rate_breakfast,
            MealSlot::Lunch => self.rate_lunch,
            MealSlot::Dinner => self.rate_dinner,
        }
    }
}

/// A mess in a listing response, with the distance from the caller's
/// position when one was supplied.
#[derive(Debug, Clone, Serialize)]
pub struct MessListing {
    #[serde(flatten)]
    pub mess: Mess,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}
