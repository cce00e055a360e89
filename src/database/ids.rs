use std::str::FromStr;

use super::Record;

/// How new club/event ids are derived from the current collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdPolicy {
    /// `last element's id + 1`, the historical behavior. Follows insertion
    /// order rather than the largest id, so a collection whose last record
    /// does not hold the largest id can be handed a duplicate.
    LastElement,
    /// `largest numeric id + 1`.
    MaxPlusOne,
}

impl FromStr for IdPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last-element" | "last" => Ok(IdPolicy::LastElement),
            "max" | "max-plus-one" => Ok(IdPolicy::MaxPlusOne),
            other => Err(format!("Invalid id policy: {}. Supported: last-element, max", other)),
        }
    }
}

pub fn next_id<T: Record>(records: &[T], policy: IdPolicy) -> String {
    let next = match policy {
        IdPolicy::LastElement => match records.last() {
            None => 1,
            Some(last) => match last.key().trim().parse::<u64>() {
                Ok(n) => n + 1,
                // non-numeric tail: fall back rather than emit a bogus id
                Err(_) => max_numeric(records) + 1,
            },
        },
        IdPolicy::MaxPlusOne => max_numeric(records) + 1,
    };
    next.to_string()
}

fn max_numeric<T: Record>(records: &[T]) -> u64 {
    records
        .iter()
        .filter_map(|r| r.key().trim().parse::<u64>().ok())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Club;

    fn clubs(ids: &[&str]) -> Vec<Club> {
        ids.iter()
            .map(|id| Club::new(id.to_string(), "c".into(), "cat".into(), "ana"))
            .collect()
    }

    #[test]
    fn first_id_is_one() {
        assert_eq!(next_id::<Club>(&[], IdPolicy::LastElement), "1");
        assert_eq!(next_id::<Club>(&[], IdPolicy::MaxPlusOne), "1");
    }

    #[test]
    fn last_element_policy_ignores_larger_ids_earlier_in_the_list() {
        // pins the historical behavior: "5" is reissued
        let records = clubs(&["5", "2", "4"]);
        assert_eq!(next_id(&records, IdPolicy::LastElement), "5");
        assert_eq!(next_id(&records, IdPolicy::MaxPlusOne), "6");
    }

    #[test]
    fn non_numeric_last_id_falls_back_to_maximum() {
        let records = clubs(&["3", "legacy"]);
        assert_eq!(next_id(&records, IdPolicy::LastElement), "4");
    }

    #[test]
    fn policy_parses() {
        assert_eq!("max".parse::<IdPolicy>().unwrap(), IdPolicy::MaxPlusOne);
        assert_eq!("last-element".parse::<IdPolicy>().unwrap(), IdPolicy::LastElement);
        assert!("uuid".parse::<IdPolicy>().is_err());
    }
}
