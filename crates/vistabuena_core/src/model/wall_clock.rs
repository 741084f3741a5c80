//! Serde adapters for `HH:MM` wall-clock times.
//!
//! Times are written as `HH:MM`; `HH:MM:SS` is accepted on read. Only
//! whole-minute values survive a write unchanged, see `is_whole_minute`.

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serializer};

const WRITE_FORMAT: &str = "%H:%M";
const READ_FORMATS: [&str; 2] = ["%H:%M", "%H:%M:%S"];

/// Parses one wall-clock value.
pub fn parse(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    READ_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Whether `time` is representable in the `HH:MM` write format.
pub fn is_whole_minute(time: NaiveTime) -> bool {
    time.second() == 0 && time.nanosecond() == 0
}

pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&time.format(WRITE_FORMAT))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).ok_or_else(|| {
        serde::de::Error::custom(format!("invalid wall-clock time `{raw}`; expected HH:MM"))
    })
}

/// Same format for optional patch fields.
pub mod option {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => super::serialize(time, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => super::parse(&raw).map(Some).ok_or_else(|| {
                serde::de::Error::custom(format!("invalid wall-clock time `{raw}`; expected HH:MM"))
            }),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{is_whole_minute, parse};
    use chrono::NaiveTime;

    #[test]
    fn parse_accepts_minutes_and_seconds_forms() {
        let expected = NaiveTime::from_hms_opt(10, 30, 0).unwrap();
        assert_eq!(parse("10:30"), Some(expected));
        assert_eq!(parse(" 10:30:00 "), Some(expected));
    }

    #[test]
    fn seconds_and_fractions_are_not_whole_minutes() {
        assert!(is_whole_minute(NaiveTime::from_hms_opt(10, 30, 0).unwrap()));
        assert!(!is_whole_minute(NaiveTime::from_hms_opt(10, 30, 1).unwrap()));
        assert!(!is_whole_minute(
            NaiveTime::from_hms_milli_opt(10, 30, 0, 500).unwrap()
        ));
    }

    #[test]
    fn parse_rejects_out_of_range_values() {
        assert_eq!(parse("25:00"), None);
        assert_eq!(parse("10h30"), None);
    }
}
