use serde::{Deserialize, Serialize};
use time::macros::time;
use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};
use uuid::Uuid;

use crate::domain::serde_date;

/// Minimum advance notice for a mess cut, measured against the meal's
/// slot cutoff on its scheduled date.
pub const SKIP_NOTICE: Duration = Duration::hours(12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MealSlot {
    Breakfast,
    Lunch,
    Dinner,
}

impl MealSlot {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "breakfast" => Some(Self::Breakfast),
            "lunch" => Some(Self::Lunch),
            "dinner" => Some(Self::Dinner),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }

    pub fn cutoff(&self) -> Time {
        slot_cutoff(self.as_db())
    }
}

/// Time-of-day cutoff for a meal slot label. Labels that are not one of
/// the three known slots fall back to noon.
pub fn slot_cutoff(slot: &str) -> Time {
    match slot {
        "breakfast" => time!(08:00),
        "lunch" => time!(13:00),
        "dinner" => time!(20:00),
        _ => time!(12:00),
    }
}

/// Whether a mess cut may still be requested for the given meal.
///
/// The meal is scheduled at `date` + the slot's cutoff in the zone `tz`;
/// the request is eligible while at least [`SKIP_NOTICE`] remains before
/// that instant. Exactly 12h out is still eligible. Pure, so the UI can
/// gray out the action before any request is made.
pub fn is_eligible_to_skip(date: Date, slot: &str, tz: UtcOffset, now: OffsetDateTime) -> bool {
    let scheduled = date.with_time(slot_cutoff(slot)).assume_offset(tz);
    scheduled - now >= SKIP_NOTICE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    Skipped,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(Self::Scheduled),
            "skipped" => Some(Self::Skipped),
            "delivered" => Some(Self::Delivered),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Skipped => "skipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }
}

/// One concrete meal instance for one subscription on one date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub mess_id: Uuid,
    pub customer_id: Uuid,
    #[serde(with = "serde_date")]
    pub date: Date,
    pub meal_slot: MealSlot,
    pub status: DeliveryStatus,
    pub skip_reason: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub skip_requested_at: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub delivered_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
}

/// A skipped delivery joined with the mess details needed to address the
/// owner notification.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedDelivery {
    #[serde(flatten)]
    pub delivery: Delivery,
    pub mess_name: String,
    pub mess_owner_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn slot_cutoffs() {
        assert_eq!(slot_cutoff("breakfast"), time!(08:00));
        assert_eq!(slot_cutoff("lunch"), time!(13:00));
        assert_eq!(slot_cutoff("dinner"), time!(20:00));
    }

    #[test]
    fn unknown_slot_falls_back_to_noon() {
        assert_eq!(slot_cutoff("brunch"), time!(12:00));
        assert_eq!(slot_cutoff(""), time!(12:00));
    }

    #[test]
    fn eligible_at_exactly_twelve_hours() {
        // lunch cutoff 13:00, so 01:00 same day is exactly 12h out
        let now = datetime!(2025-03-10 01:00 UTC);
        assert!(is_eligible_to_skip(
            date!(2025 - 03 - 10),
            "lunch",
            UtcOffset::UTC,
            now
        ));
    }

    #[test]
    fn ineligible_one_second_inside_the_window() {
        let now = datetime!(2025-03-10 01:00:01 UTC);
        assert!(!is_eligible_to_skip(
            date!(2025 - 03 - 10),
            "lunch",
            UtcOffset::UTC,
            now
        ));
    }

    #[test]
    fn ineligible_for_past_meals() {
        let now = datetime!(2025-03-10 15:00 UTC);
        assert!(!is_eligible_to_skip(
            date!(2025 - 03 - 10),
            "lunch",
            UtcOffset::UTC,
            now
        ));
        assert!(!is_eligible_to_skip(
            date!(2025 - 03 - 01),
            "dinner",
            UtcOffset::UTC,
            now
        ));
    }

    #[test]
    fn tomorrow_lunch_half_past_midnight_is_eligible() {
        // 12.5h ahead of the 13:00 cutoff
        let now = datetime!(2025-03-11 00:30 UTC);
        assert!(is_eligible_to_skip(
            date!(2025 - 03 - 11),
            "lunch",
            UtcOffset::UTC,
            now
        ));
    }

    #[test]
    fn tonight_dinner_at_nine_is_not_eligible() {
        // 10h59m ahead of the 20:00 cutoff
        let now = datetime!(2025-03-10 09:01 UTC);
        assert!(!is_eligible_to_skip(
            date!(2025 - 03 - 10),
            "dinner",
            UtcOffset::UTC,
            now
        ));
    }

    #[test]
    fn eligibility_respects_the_mess_zone() {
        // 13:00 at +05:30 is 07:30 UTC; 19:00 UTC the previous day is
        // 12.5h out, 20:00 UTC is only 11.5h out.
        let tz = UtcOffset::from_hms(5, 30, 0).unwrap();
        let d = date!(2025 - 03 - 11);
        assert!(is_eligible_to_skip(d, "lunch", tz, datetime!(2025-03-10 19:00 UTC)));
        assert!(!is_eligible_to_skip(d, "lunch", tz, datetime!(2025-03-10 20:00 UTC)));
    }

    #[test]
    fn slot_round_trips_through_db_labels() {
        for slot in [MealSlot::Breakfast, MealSlot::Lunch, MealSlot::Dinner] {
            assert_eq!(MealSlot::from_db(slot.as_db()), Some(slot));
        }
        assert_eq!(MealSlot::from_db("supper"), None);
    }
}
