pub mod delivery;
pub mod menu;
pub mod mess;
pub mod notification;
pub mod subscription;
pub mod user;

/// `YYYY-MM-DD` (de)serialization for `time::Date` fields.
pub mod serde_date {
    use serde::{Deserialize, Deserializer, Serializer};
    use time::format_description::FormatItem;
    use time::macros::format_description;
    use time::Date;

    pub const FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

    pub fn serialize<S: Serializer>(date: &Date, serializer: S) -> Result<S::Ok, S::Error> {
        let formatted = date.format(&FORMAT).map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Date, D::Error> {
        let value = String::deserialize(deserializer)?;
        Date::parse(&value, &FORMAT).map_err(serde::de::Error::custom)
    }

    #[cfg(test)]
    mod tests {
        use serde::{Deserialize, Serialize};
        use time::macros::date;

        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "super")]
            date: time::Date,
        }

        #[test]
        fn round_trip() {
            let json = serde_json::to_string(&Wrapper {
                date: date!(2025 - 03 - 10),
            })
            .unwrap();
            assert_eq!(json, r#"{"date":"2025-03-10"}"#);
            let back: Wrapper = serde_json::from_str(&json).unwrap();
            assert_eq!(back.date, date!(2025 - 03 - 10));
        }

        #[test]
        fn rejects_garbage() {
            assert!(serde_json::from_str::<Wrapper>(r#"{"date":"10/03/2025"}"#).is_err());
        }
    }
}
