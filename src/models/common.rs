use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Seat limit of a club or event. Stored as `"unlimited"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capacity {
    #[default]
    Unlimited,
    Limited(u32),
}

impl Serialize for Capacity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Capacity::Unlimited => serializer.serialize_str("unlimited"),
            Capacity::Limited(n) => serializer.serialize_u32(*n),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCapacity {
    Number(u64),
    Float(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Capacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // null is what older clients stored for a non-numeric capacity
        match Option::<RawCapacity>::deserialize(deserializer)? {
            None => Ok(Capacity::Unlimited),
            Some(RawCapacity::Number(n)) => u32::try_from(n)
                .map(Capacity::Limited)
                .map_err(|_| serde::de::Error::custom("capacity out of range")),
            Some(RawCapacity::Float(f)) => {
                if f.is_finite() && f >= 0.0 && f <= f64::from(u32::MAX) {
                    Ok(Capacity::Limited(f as u32))
                } else {
                    Ok(Capacity::Unlimited)
                }
            }
            Some(RawCapacity::Text(text)) => {
                let text = text.trim();
                if text.is_empty() || text.eq_ignore_ascii_case("unlimited") {
                    Ok(Capacity::Unlimited)
                } else {
                    text.parse::<u32>().map(Capacity::Limited).map_err(|_| {
                        serde::de::Error::custom(format!("invalid capacity: {}", text))
                    })
                }
            }
        }
    }
}

/// Event times: RFC 3339, `YYYY-MM-DDTHH:MM[:SS]` or a bare date.
/// Stored as local `YYYY-MM-DDTHH:MM:SS`.
pub mod event_time {
    use super::*;

    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.naive_utc());
        }
        for fmt in [
            "%Y-%m-%dT%H:%M:%S",
            "%Y-%m-%dT%H:%M:%S%.f",
            "%Y-%m-%dT%H:%M",
            "%Y-%m-%d %H:%M:%S",
            "%Y-%m-%d %H:%M",
        ] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format("%Y-%m-%dT%H:%M:%S").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }

    /// Stored event dates. Older documents may lack them, hold `null`, or
    /// hold text no parser accepts; all of those load as `None`.
    pub mod stored {
        use chrono::NaiveDateTime;
        use serde::{Deserialize, Deserializer, Serializer};

        use super::parse;

        pub fn serialize<S: Serializer>(
            value: &Option<NaiveDateTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => super::serialize(dt, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveDateTime>, D::Error> {
            let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
            Ok(match raw {
                Some(serde_json::Value::String(text)) => parse(&text),
                _ => None,
            })
        }
    }
}

/// Username and id sets inside stored documents.
///
/// Entries are trimmed and deduplicated in order; `null`, empty strings and
/// other non-string values are dropped, numbers are kept as their text.
pub mod string_set {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut out: Vec<String> = Vec::with_capacity(raw.len());
        for value in raw {
            let entry = match value {
                Value::String(text) => text.trim().to_string(),
                Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if !entry.is_empty() && !out.contains(&entry) {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn capacity_accepts_legacy_shapes() {
        let parse = |v| serde_json::from_value::<Capacity>(v).unwrap();
        assert_eq!(parse(json!("unlimited")), Capacity::Unlimited);
        assert_eq!(parse(json!("")), Capacity::Unlimited);
        assert_eq!(parse(json!("25")), Capacity::Limited(25));
        assert_eq!(parse(json!(40)), Capacity::Limited(40));
        assert!(serde_json::from_value::<Capacity>(json!("lots")).is_err());
        assert_eq!(parse(json!(null)), Capacity::Unlimited);
        assert_eq!(parse(json!(12.0)), Capacity::Limited(12));

        assert_eq!(serde_json::to_value(Capacity::Unlimited).unwrap(), json!("unlimited"));
        assert_eq!(serde_json::to_value(Capacity::Limited(8)).unwrap(), json!(8));
    }

    #[test]
    fn event_times_from_form_inputs() {
        let minute = event_time::parse("2025-05-01T10:30").unwrap();
        assert_eq!(minute.format("%H:%M:%S").to_string(), "10:30:00");

        let zoned = event_time::parse("2025-05-01T10:30:00+02:00").unwrap();
        assert_eq!(zoned.format("%H:%M").to_string(), "08:30");

        assert!(event_time::parse("2025-05-01").is_some());
        assert!(event_time::parse("next tuesday").is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Roster {
        #[serde(default, deserialize_with = "string_set::deserialize")]
        members: Vec<String>,
        #[serde(default, with = "event_time::stored")]
        start: Option<NaiveDateTime>,
    }

    #[test]
    fn legacy_rosters_drop_null_entries() {
        let roster: Roster =
            serde_json::from_value(json!({ "members": [null, "ana", " ana ", 7, {}, ""] })).unwrap();
        assert_eq!(roster.members, vec!["ana", "7"]);
        assert!(roster.start.is_none());

        let roster: Roster = serde_json::from_value(json!({ "members": null, "start": null })).unwrap();
        assert!(roster.members.is_empty());
        assert!(roster.start.is_none());
    }

    #[test]
    fn stored_dates_tolerate_garbage() {
        let roster: Roster = serde_json::from_value(json!({ "start": "sometime" })).unwrap();
        assert!(roster.start.is_none());

        let roster: Roster = serde_json::from_value(json!({ "start": "2025-05-01T18:00" })).unwrap();
        assert_eq!(
            roster.start.map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string()),
            Some("2025-05-01T18:00:00".to_string())
        );
    }
}
