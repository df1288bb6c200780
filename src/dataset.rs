//! Raw table loading and splitting

#![allow(non_snake_case)]

use std::io::Read;

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::RawRecord;

/// Source-column names for the 14 consumed columns of the raw table. The
/// defaults match the Global Terrorism Database export; tests load synthetic
/// tables by substituting their own names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub year: String,
    pub month: String,
    pub day: String,
    pub country: String,
    pub region: String,
    pub duration: String,
    pub city: String,
    pub multiple: String,
    pub attack_type: String,
    pub target_type: String,
    pub weapon: String,
    pub kid_hostage: String,
    pub group: String,
    pub success: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            year: "iyear".to_string(),
            month: "imonth".to_string(),
            day: "iday".to_string(),
            country: "country_txt".to_string(),
            region: "region_txt".to_string(),
            duration: "extended".to_string(),
            city: "city".to_string(),
            multiple: "multiple".to_string(),
            attack_type: "attacktype1_txt".to_string(),
            target_type: "targtype1_txt".to_string(),
            weapon: "weaptype1_txt".to_string(),
            kid_hostage: "ishostkid".to_string(),
            group: "gname".to_string(),
            success: "success".to_string(),
        }
    }
}

struct ColumnIndices {
    year: usize,
    month: usize,
    day: usize,
    country: usize,
    region: usize,
    duration: usize,
    city: usize,
    multiple: usize,
    attack_type: usize,
    target_type: usize,
    weapon: usize,
    kid_hostage: usize,
    group: usize,
    success: usize,
}

impl ColumnIndices {
    fn resolve(headers: &csv::StringRecord, mapping: &ColumnMapping) -> Result<Self, PipelineError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| PipelineError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            year: find(&mapping.year)?,
            month: find(&mapping.month)?,
            day: find(&mapping.day)?,
            country: find(&mapping.country)?,
            region: find(&mapping.region)?,
            duration: find(&mapping.duration)?,
            city: find(&mapping.city)?,
            multiple: find(&mapping.multiple)?,
            attack_type: find(&mapping.attack_type)?,
            target_type: find(&mapping.target_type)?,
            weapon: find(&mapping.weapon)?,
            kid_hostage: find(&mapping.kid_hostage)?,
            group: find(&mapping.group)?,
            success: find(&mapping.success)?,
        })
    }
}

/// Loads the raw table, consuming only the mapped columns. A missing column
/// is fatal; empty cells in nullable columns become `None` for the imputer.
pub fn load_csv<R: Read>(
    reader: R,
    mapping: &ColumnMapping,
) -> Result<Vec<RawRecord>, PipelineError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let idx = ColumnIndices::resolve(&headers, mapping)?;

    let mut records = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        records.push(RawRecord {
            year: int_cell(&record, idx.year, row)? as i32,
            month: int_cell(&record, idx.month, row)? as i32,
            day: int_cell(&record, idx.day, row)? as i32,
            country: text_cell(&record, idx.country),
            region: text_cell(&record, idx.region),
            duration: int_cell(&record, idx.duration, row)?,
            city: opt_text_cell(&record, idx.city),
            multiple: opt_int_cell(&record, idx.multiple, row)?,
            attack_type: text_cell(&record, idx.attack_type),
            target_type: text_cell(&record, idx.target_type),
            weapon: text_cell(&record, idx.weapon),
            kid_hostage: opt_int_cell(&record, idx.kid_hostage, row)?,
            group: text_cell(&record, idx.group),
            success: opt_int_cell(&record, idx.success, row)?,
        });
    }

    if records.is_empty() {
        return Err(PipelineError::EmptyDataset);
    }
    Ok(records)
}

fn text_cell(record: &csv::StringRecord, idx: usize) -> String {
    record.get(idx).unwrap_or("").trim().to_string()
}

fn opt_text_cell(record: &csv::StringRecord, idx: usize) -> Option<String> {
    let value = record.get(idx).unwrap_or("").trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Integer cell that tolerates float formatting ("1.0"), since the source
/// export stores the nullable flags as floats. Fractional values are invalid.
fn parse_int(value: &str, row: usize) -> Result<i64, PipelineError> {
    let parsed: f64 = value.parse().map_err(|_| PipelineError::MalformedRow {
        row,
        message: format!("expected numeric cell, got '{value}'"),
    })?;
    if parsed.fract() != 0.0 {
        return Err(PipelineError::MalformedRow {
            row,
            message: format!("expected integer cell, got '{value}'"),
        });
    }
    Ok(parsed as i64)
}

fn int_cell(record: &csv::StringRecord, idx: usize, row: usize) -> Result<i64, PipelineError> {
    parse_int(record.get(idx).unwrap_or("").trim(), row)
}

fn opt_int_cell(
    record: &csv::StringRecord,
    idx: usize,
    row: usize,
) -> Result<Option<i64>, PipelineError> {
    let value = record.get(idx).unwrap_or("").trim();
    if value.is_empty() {
        return Ok(None);
    }
    parse_int(value, row).map(Some)
}

/// Seeded random sample of the loaded records, without replacement. The
/// source corpus trains on a 50% sample of the full table.
pub fn sample_records(records: &[RawRecord], fraction: f64, seed: u64) -> Vec<RawRecord> {
    if fraction >= 1.0 {
        return records.to_vec();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..records.len()).collect();
    indices.shuffle(&mut rng);
    let keep = ((records.len() as f64) * fraction).round() as usize;
    indices
        .into_iter()
        .take(keep.max(1))
        .map(|i| records[i].clone())
        .collect()
}

/// Seeded shuffle split into train and test halves. Rebalancing only ever
/// touches the train side; the test side stays as drawn.
pub fn train_test_split(
    X: &Array2<f64>,
    y: &Array1<f64>,
    test_size: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array1<f64>, Array2<f64>, Array1<f64>), PipelineError> {
    let n = X.nrows();
    // both sides of the split must be non-empty
    if n < 2 || n != y.len() {
        return Err(PipelineError::EmptyDataset);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_size).round() as usize;
    let n_test = n_test.clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(n_test);

    let take = |idx: &[usize]| {
        let mut matrix = Array2::zeros((idx.len(), X.ncols()));
        let mut labels = Array1::zeros(idx.len());
        for (out, &i) in idx.iter().enumerate() {
            matrix.index_axis_mut(Axis(0), out).assign(&X.index_axis(Axis(0), i));
            labels[out] = y[i];
        }
        (matrix, labels)
    };

    let (X_train, y_train) = take(train_idx);
    let (X_test, y_test) = take(test_idx);
    Ok((X_train, y_train, X_test, y_test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn mapping() -> ColumnMapping {
        ColumnMapping::default()
    }

    const HEADER: &str = "eventid,iyear,imonth,iday,country_txt,region_txt,extended,city,multiple,success,attacktype1_txt,targtype1_txt,weaptype1_txt,ishostkid,gname";

    #[test]
    fn loads_mapped_columns() {
        let csv = format!(
            "{HEADER}\n1,2014,6,1,Iraq,Middle East & North Africa,0,Baghdad,0,1,Bombing/Explosion,Private Citizens & Property,Explosives,0.0,Unknown\n"
        );
        let records = load_csv(csv.as_bytes(), &mapping()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].country, "Iraq");
        assert_eq!(records[0].kid_hostage, Some(0));
        assert_eq!(records[0].success, Some(1));
    }

    #[test]
    fn empty_cells_become_none() {
        let csv = format!(
            "{HEADER}\n1,2014,6,1,Iraq,Middle East & North Africa,0,,,1,Bombing/Explosion,Private Citizens & Property,Explosives,,Unknown\n"
        );
        let records = load_csv(csv.as_bytes(), &mapping()).unwrap();
        assert_eq!(records[0].city, None);
        assert_eq!(records[0].multiple, None);
        assert_eq!(records[0].kid_hostage, None);
    }

    #[test]
    fn missing_column_is_fatal() {
        let csv = "iyear,imonth\n2014,6\n";
        let err = load_csv(csv.as_bytes(), &mapping()).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingColumn(ref name) if name == "iday"
        ));
    }

    #[test]
    fn single_row_table_cannot_be_split() {
        let X = array![[1.0, 2.0]];
        let y = array![1.0];
        let err = train_test_split(&X, &y, 0.2, 7).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDataset));
    }

    #[test]
    fn split_preserves_row_label_pairing() {
        let X = array![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [4.0, 4.0]];
        let y = array![0.0, 1.0, 2.0, 3.0, 4.0];
        let (X_train, y_train, X_test, y_test) = train_test_split(&X, &y, 0.4, 7).unwrap();

        assert_eq!(X_train.nrows() + X_test.nrows(), 5);
        for (row, label) in X_train.rows().into_iter().zip(y_train.iter()) {
            assert_eq!(row[0], *label);
        }
        for (row, label) in X_test.rows().into_iter().zip(y_test.iter()) {
            assert_eq!(row[0], *label);
        }
    }
}
