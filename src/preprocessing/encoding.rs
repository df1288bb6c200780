//! Base-2 positional encoding for the nominal columns

use std::collections::HashMap;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::types::{CategoricalField, FeatureVector};

/// Fitted codebook for one nominal column. Ranks are 1-based in first-seen
/// order; rank 0 is the explicit unknown bucket, so a category never seen at
/// fit time encodes as the all-zero code instead of an undefined one. The
/// bit width is fixed at fit time and never changes afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnCodebook {
    field: CategoricalField,
    ranks: HashMap<String, u32>,
    bits: usize,
}

impl ColumnCodebook {
    fn rank(&self, category: &str) -> u32 {
        self.ranks.get(category).copied().unwrap_or(0)
    }
}

/// Base-2 categorical encoder over the seven nominal columns. Fit once on
/// the training corpus, then applied unchanged at inference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryEncoder {
    columns: Vec<ColumnCodebook>,
}

impl BinaryEncoder {
    pub fn fit(features: &[FeatureVector]) -> Result<Self, PipelineError> {
        if features.is_empty() {
            return Err(PipelineError::EmptyDataset);
        }

        let mut columns = Vec::with_capacity(CategoricalField::ALL.len());
        for field in CategoricalField::ALL {
            let mut ranks: HashMap<String, u32> = HashMap::new();
            for feature in features {
                let category = feature.categorical(field);
                if !ranks.contains_key(category) {
                    let next = ranks.len() as u32 + 1;
                    ranks.insert(category.to_string(), next);
                }
            }
            let bits = bits_for(ranks.len() as u32);
            columns.push(ColumnCodebook { field, ranks, bits });
        }
        Ok(Self { columns })
    }

    /// Total width of an encoded row: the bit columns plus the three flags.
    pub fn width(&self) -> usize {
        self.columns.iter().map(|c| c.bits).sum::<usize>() + 3
    }

    pub fn bits(&self, field: CategoricalField) -> usize {
        self.columns
            .iter()
            .find(|c| c.field == field)
            .map(|c| c.bits)
            .unwrap_or(0)
    }

    /// Encodes one feature vector, preserving the fixed field order: each
    /// nominal column expands to its bit columns in place, flags pass through.
    pub fn transform(&self, features: &FeatureVector) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());
        self.push_bits(&mut row, CategoricalField::Country, &features.country);
        self.push_bits(&mut row, CategoricalField::Region, &features.region);
        row.push(features.duration as f64);
        self.push_bits(&mut row, CategoricalField::City, &features.city);
        row.push(features.multiple as f64);
        self.push_bits(&mut row, CategoricalField::AttackType, &features.attack_type);
        self.push_bits(&mut row, CategoricalField::TargetType, &features.target_type);
        self.push_bits(&mut row, CategoricalField::Weapon, &features.weapon);
        row.push(features.kid_hostage as f64);
        self.push_bits(&mut row, CategoricalField::Group, &features.group);
        row
    }

    pub fn transform_batch(&self, features: &[FeatureVector]) -> Array2<f64> {
        let width = self.width();
        let mut matrix = Array2::zeros((features.len(), width));
        for (i, feature) in features.iter().enumerate() {
            for (j, value) in self.transform(feature).into_iter().enumerate() {
                matrix[[i, j]] = value;
            }
        }
        matrix
    }

    fn push_bits(&self, row: &mut Vec<f64>, field: CategoricalField, category: &str) {
        // Codebooks are built for every field in ALL, so the lookup always hits.
        if let Some(codebook) = self.columns.iter().find(|c| c.field == field) {
            let rank = codebook.rank(category);
            for i in (0..codebook.bits).rev() {
                row.push(((rank >> i) & 1) as f64);
            }
        }
    }
}

/// Smallest number of binary digits able to represent `n` ranks.
fn bits_for(n: u32) -> usize {
    (32 - n.leading_zeros()).max(1) as usize
}
