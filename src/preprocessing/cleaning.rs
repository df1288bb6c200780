//! Null imputation and value fixups

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{CleanedRecord, RawRecord};

/// Frozen most-frequent replacement values for the three nullable columns.
/// Computed once over the training corpus and carried inside the persisted
/// pipeline, so later records are cleaned with the same statistics instead
/// of recomputing them per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImputerState {
    pub city: String,
    pub multiple: i64,
    pub kid_hostage: i64,
}

impl ImputerState {
    pub fn fit(records: &[RawRecord]) -> Result<Self, PipelineError> {
        if records.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let city = most_frequent(records.iter().filter_map(|r| r.city.as_deref()))
            .unwrap_or("Unknown")
            .to_string();
        let multiple = most_frequent_int(records.iter().filter_map(|r| r.multiple)).unwrap_or(0);
        let kid_hostage =
            most_frequent_int(records.iter().filter_map(|r| r.kid_hostage)).unwrap_or(0);

        Ok(Self {
            city,
            multiple,
            kid_hostage,
        })
    }
}

/// Produces the cleaned table: nulls filled from the frozen statistics, the
/// hostage sentinel -9 collapsed into 0 (fixed business rule), flags kept as
/// integers. Never mutates the raw slice.
pub fn clean(records: &[RawRecord], imputer: &ImputerState) -> Vec<CleanedRecord> {
    records
        .iter()
        .map(|r| {
            let kid_hostage = match r.kid_hostage.unwrap_or(imputer.kid_hostage) {
                -9 => 0,
                value => value,
            };
            CleanedRecord {
                country: r.country.clone(),
                region: r.region.clone(),
                duration: r.duration,
                city: r.city.clone().unwrap_or_else(|| imputer.city.clone()),
                multiple: r.multiple.unwrap_or(imputer.multiple),
                attack_type: r.attack_type.clone(),
                target_type: r.target_type.clone(),
                weapon: r.weapon.clone(),
                kid_hostage,
                group: r.group.clone(),
                success: r.success,
            }
        })
        .collect()
}

/// Mode with a deterministic tie-break (highest count, then smallest value),
/// so refitting on the same corpus always freezes the same statistics.
fn most_frequent<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(a.0)))
        .map(|(value, _)| value)
}

fn most_frequent_int(values: impl Iterator<Item = i64>) -> Option<i64> {
    let mut counts: HashMap<i64, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(b.0.cmp(&a.0)))
        .map(|(value, _)| value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(city: Option<&str>, multiple: Option<i64>, kid: Option<i64>) -> RawRecord {
        RawRecord {
            year: 2014,
            month: 6,
            day: 1,
            country: "Iraq".to_string(),
            region: "Middle East & North Africa".to_string(),
            duration: 0,
            city: city.map(str::to_string),
            multiple,
            attack_type: "Bombing/Explosion".to_string(),
            target_type: "Private Citizens & Property".to_string(),
            weapon: "Explosives".to_string(),
            kid_hostage: kid,
            group: "Unknown".to_string(),
            success: Some(1),
        }
    }

    #[test]
    fn imputer_freezes_most_frequent_values() {
        let records = vec![
            record(Some("Baghdad"), Some(0), Some(0)),
            record(Some("Baghdad"), Some(0), Some(1)),
            record(Some("Mosul"), Some(1), Some(0)),
            record(None, None, None),
        ];
        let imputer = ImputerState::fit(&records).unwrap();
        assert_eq!(imputer.city, "Baghdad");
        assert_eq!(imputer.multiple, 0);
        assert_eq!(imputer.kid_hostage, 0);
    }

    #[test]
    fn tied_counts_freeze_the_smallest_value() {
        // two-way ties in every nullable column
        let records = vec![
            record(Some("Baghdad"), Some(1), Some(1)),
            record(Some("Mosul"), Some(0), Some(0)),
        ];
        let imputer = ImputerState::fit(&records).unwrap();
        assert_eq!(imputer.city, "Baghdad");
        assert_eq!(imputer.multiple, 0);
        assert_eq!(imputer.kid_hostage, 0);
    }

    #[test]
    fn clean_leaves_no_nulls() {
        let records = vec![
            record(Some("Baghdad"), Some(0), Some(0)),
            record(None, None, None),
        ];
        let imputer = ImputerState::fit(&records).unwrap();
        let cleaned = clean(&records, &imputer);
        assert_eq!(cleaned[1].city, "Baghdad");
        assert_eq!(cleaned[1].multiple, 0);
        assert_eq!(cleaned[1].kid_hostage, 0);
    }

    #[test]
    fn hostage_sentinel_is_remapped() {
        let records = vec![
            record(Some("Baghdad"), Some(0), Some(-9)),
            record(Some("Baghdad"), Some(0), Some(1)),
        ];
        let imputer = ImputerState::fit(&records).unwrap();
        let cleaned = clean(&records, &imputer);
        assert!(cleaned.iter().all(|r| r.kid_hostage == 0 || r.kid_hostage == 1));
        assert_eq!(cleaned[0].kid_hostage, 0);
    }

    #[test]
    fn clean_does_not_mutate_input() {
        let records = vec![record(None, None, Some(-9))];
        let snapshot = format!("{records:?}");
        let imputer = ImputerState::fit(&records).unwrap();
        let _ = clean(&records, &imputer);
        assert_eq!(snapshot, format!("{records:?}"));
    }
}
