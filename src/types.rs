//! Data model for the attack-outcome pipeline

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// One historical attack as read from the raw table. Nullable columns stay
/// `Option` until imputation; the outcome label is present for training rows
/// and absent for inference requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawRecord {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub country: String,
    pub region: String,
    /// Attack duration exceeded 24 hours (0/1).
    pub duration: i64,
    pub city: Option<String>,
    /// Part of a coordinated multiple attack (0/1).
    pub multiple: Option<i64>,
    pub attack_type: String,
    pub target_type: String,
    pub weapon: String,
    /// Raw hostage code: -9 unknown, 0 no, 1 yes.
    pub kid_hostage: Option<i64>,
    pub group: String,
    pub success: Option<i64>,
}

/// RawRecord after imputation and fixups: no nulls remain in the columns used
/// downstream, the hostage code is collapsed to {0, 1}, flags are integers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub country: String,
    pub region: String,
    pub duration: i64,
    pub city: String,
    pub multiple: i64,
    pub attack_type: String,
    pub target_type: String,
    pub weapon: String,
    pub kid_hostage: i64,
    pub group: String,
    pub success: Option<i64>,
}

impl CleanedRecord {
    pub fn features(&self) -> FeatureVector {
        FeatureVector {
            country: self.country.clone(),
            region: self.region.clone(),
            duration: self.duration,
            city: self.city.clone(),
            multiple: self.multiple,
            attack_type: self.attack_type.clone(),
            target_type: self.target_type.clone(),
            weapon: self.weapon.clone(),
            kid_hostage: self.kid_hostage,
            group: self.group.clone(),
        }
    }
}

/// The seven nominal columns, in feature-vector order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoricalField {
    Country,
    Region,
    City,
    AttackType,
    TargetType,
    Weapon,
    Group,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 7] = [
        CategoricalField::Country,
        CategoricalField::Region,
        CategoricalField::City,
        CategoricalField::AttackType,
        CategoricalField::TargetType,
        CategoricalField::Weapon,
        CategoricalField::Group,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CategoricalField::Country => "country",
            CategoricalField::Region => "region",
            CategoricalField::City => "city",
            CategoricalField::AttackType => "attack_type",
            CategoricalField::TargetType => "target_type",
            CategoricalField::Weapon => "weapon",
            CategoricalField::Group => "group",
        }
    }
}

/// The ten independent variables, in the fixed order shared by training and
/// inference: country, region, duration, city, multiple, attack_type,
/// target_type, weapon, kid_hostage, group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureVector {
    pub country: String,
    pub region: String,
    pub duration: i64,
    pub city: String,
    pub multiple: i64,
    pub attack_type: String,
    pub target_type: String,
    pub weapon: String,
    pub kid_hostage: i64,
    pub group: String,
}

impl FeatureVector {
    pub fn categorical(&self, field: CategoricalField) -> &str {
        match field {
            CategoricalField::Country => &self.country,
            CategoricalField::Region => &self.region,
            CategoricalField::City => &self.city,
            CategoricalField::AttackType => &self.attack_type,
            CategoricalField::TargetType => &self.target_type,
            CategoricalField::Weapon => &self.weapon,
            CategoricalField::Group => &self.group,
        }
    }
}

/// One inference request: the ten fields as submitted, all strings. Arrives
/// either as an HTML form or as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
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
}

impl PredictRequest {
    /// Validates every field and assembles the feature vector. Empty fields
    /// and non-flag values fail here, before anything reaches the encoder;
    /// the hostage code gets the same -9 -> 0 remap applied at training time.
    pub fn validate(&self) -> Result<FeatureVector, PipelineError> {
        let country = required_text("country", &self.country)?;
        let region = required_text("region", &self.region)?;
        let city = required_text("city", &self.city)?;
        let attack_type = required_text("attack_type", &self.attack_type)?;
        let target_type = required_text("target_type", &self.target_type)?;
        let weapon = required_text("weapon", &self.weapon)?;
        let group = required_text("group", &self.group)?;

        let duration = parse_flag("duration", &self.duration)?;
        let multiple = parse_flag("multiple", &self.multiple)?;
        let kid_hostage = parse_hostage_code("kid_hostage", &self.kid_hostage)?;

        Ok(FeatureVector {
            country,
            region,
            duration,
            city,
            multiple,
            attack_type,
            target_type,
            weapon,
            kid_hostage,
            group,
        })
    }
}

fn required_text(field: &str, value: &str) -> Result<String, PipelineError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::Validation {
            field: field.to_string(),
            message: "must not be empty".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

fn parse_flag(field: &str, value: &str) -> Result<i64, PipelineError> {
    match value.trim() {
        "0" => Ok(0),
        "1" => Ok(1),
        other => Err(PipelineError::Validation {
            field: field.to_string(),
            message: format!("expected 0 or 1, got '{other}'"),
        }),
    }
}

fn parse_hostage_code(field: &str, value: &str) -> Result<i64, PipelineError> {
    match value.trim() {
        // -9 is the raw unknown sentinel, collapsed into "no" as in training
        "-9" => Ok(0),
        "0" => Ok(0),
        "1" => Ok(1),
        other => Err(PipelineError::Validation {
            field: field.to_string(),
            message: format!("expected -9, 0 or 1, got '{other}'"),
        }),
    }
}

/// Binary outcome of an attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Unsuccessful,
    Successful,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Successful => "Successful",
            Outcome::Unsuccessful => "Unsuccessful",
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            Outcome::Successful => 1,
            Outcome::Unsuccessful => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PredictRequest {
        PredictRequest {
            country: "Iraq".to_string(),
            region: "Middle East & North Africa".to_string(),
            duration: "0".to_string(),
            city: "Baghdad".to_string(),
            multiple: "0".to_string(),
            attack_type: "Bombing/Explosion".to_string(),
            target_type: "Private Citizens & Property".to_string(),
            weapon: "Explosives".to_string(),
            kid_hostage: "0".to_string(),
            group: "Unknown".to_string(),
        }
    }

    #[test]
    fn valid_request_builds_feature_vector() {
        let features = request().validate().unwrap();
        assert_eq!(features.country, "Iraq");
        assert_eq!(features.duration, 0);
        assert_eq!(features.kid_hostage, 0);
    }

    #[test]
    fn empty_field_is_rejected() {
        let mut req = request();
        req.city = "   ".to_string();
        let err = req.validate().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation { ref field, .. } if field == "city"
        ));
    }

    #[test]
    fn non_flag_value_is_rejected() {
        let mut req = request();
        req.multiple = "yes".to_string();
        assert!(req.validate().is_err());
    }

    #[test]
    fn hostage_sentinel_collapses_to_no() {
        let mut req = request();
        req.kid_hostage = "-9".to_string();
        let features = req.validate().unwrap();
        assert_eq!(features.kid_hostage, 0);
    }
}
