//! The persisted artifact: frozen statistics, encoder and classifier

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::aview1;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::models::GradientBoostedTrees;
use crate::preprocessing::{BinaryEncoder, ImputerState};
use crate::types::{Outcome, PredictRequest};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub trained_at: DateTime<Utc>,
    pub training_rows: usize,
    pub encoded_width: usize,
}

/// Everything inference needs, built once by training and immutable after:
/// the frozen imputation statistics, the fitted encoder codebooks and the
/// fitted tree ensemble. The serving shell loads it read-only at start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedPipeline {
    metadata: PipelineMetadata,
    imputer: ImputerState,
    encoder: BinaryEncoder,
    model: GradientBoostedTrees,
}

impl TrainedPipeline {
    pub fn new(
        imputer: ImputerState,
        encoder: BinaryEncoder,
        model: GradientBoostedTrees,
        training_rows: usize,
    ) -> Self {
        let encoded_width = encoder.width();
        Self {
            metadata: PipelineMetadata {
                trained_at: Utc::now(),
                training_rows,
                encoded_width,
            },
            imputer,
            encoder,
            model,
        }
    }

    pub fn metadata(&self) -> &PipelineMetadata {
        &self.metadata
    }

    pub fn imputer(&self) -> &ImputerState {
        &self.imputer
    }

    /// Runs a raw request through the identical validation, cleanup and
    /// encoding used at training time. Unknown categories fall into the
    /// encoder's zero bucket; malformed fields fail here.
    pub fn prepare_features(&self, request: &PredictRequest) -> Result<Vec<f64>, PipelineError> {
        let features = request.validate()?;
        Ok(self.encoder.transform(&features))
    }

    /// Maps the classifier output onto the binary outcome. Anything outside
    /// {0, 1} is an internal defect and surfaces as an error.
    pub fn predict(&self, features: &[f64]) -> Result<Outcome, PipelineError> {
        let label = self.model.predict(&aview1(features))?;
        match label {
            0 => Ok(Outcome::Unsuccessful),
            1 => Ok(Outcome::Successful),
            other => Err(PipelineError::InvalidPrediction(other as i64)),
        }
    }

    pub fn predict_request(&self, request: &PredictRequest) -> Result<Outcome, PipelineError> {
        let features = self.prepare_features(request)?;
        self.predict(&features)
    }

    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let file = File::open(path)?;
        let pipeline = serde_json::from_reader(BufReader::new(file))?;
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoostingParams;
    use crate::preprocessing::clean;
    use crate::types::RawRecord;
    use ndarray::Array1;

    fn raw(country: &str, city: &str, success: i64) -> RawRecord {
        RawRecord {
            year: 2014,
            month: 6,
            day: 1,
            country: country.to_string(),
            region: "Middle East & North Africa".to_string(),
            duration: 0,
            city: Some(city.to_string()),
            multiple: Some(0),
            attack_type: "Bombing/Explosion".to_string(),
            target_type: "Private Citizens & Property".to_string(),
            weapon: "Explosives".to_string(),
            kid_hostage: Some(0),
            group: "Unknown".to_string(),
            success: Some(success),
        }
    }

    fn tiny_pipeline() -> TrainedPipeline {
        let mut records = Vec::new();
        for i in 0..30 {
            let success = (i % 2) as i64;
            let country = if success == 1 { "Iraq" } else { "Norway" };
            let city = if success == 1 { "Baghdad" } else { "Oslo" };
            records.push(raw(country, city, success));
        }

        let imputer = ImputerState::fit(&records).unwrap();
        let cleaned = clean(&records, &imputer);
        let features: Vec<_> = cleaned.iter().map(|r| r.features()).collect();
        let encoder = BinaryEncoder::fit(&features).unwrap();

        let x = encoder.transform_batch(&features);
        let y = Array1::from_iter(
            cleaned
                .iter()
                .map(|r| r.success.unwrap_or_default() as f64),
        );

        let params = BoostingParams {
            n_estimators: 15,
            max_depth: 3,
            min_samples_split: 2,
            ..BoostingParams::default()
        };
        let mut model = GradientBoostedTrees::new(params);
        model.fit(&x, &y).unwrap();

        TrainedPipeline::new(imputer, encoder, model, records.len())
    }

    fn request(country: &str, city: &str) -> PredictRequest {
        PredictRequest {
            country: country.to_string(),
            region: "Middle East & North Africa".to_string(),
            duration: "0".to_string(),
            city: city.to_string(),
            multiple: "0".to_string(),
            attack_type: "Bombing/Explosion".to_string(),
            target_type: "Private Citizens & Property".to_string(),
            weapon: "Explosives".to_string(),
            kid_hostage: "0".to_string(),
            group: "Unknown".to_string(),
        }
    }

    #[test]
    fn end_to_end_prediction_yields_a_mapped_label() {
        let pipeline = tiny_pipeline();
        let outcome = pipeline.predict_request(&request("Iraq", "Baghdad")).unwrap();
        assert!(matches!(outcome, Outcome::Successful | Outcome::Unsuccessful));
        assert!(outcome.label() == "Successful" || outcome.label() == "Unsuccessful");
    }

    #[test]
    fn unknown_country_still_predicts() {
        let pipeline = tiny_pipeline();
        let outcome = pipeline
            .predict_request(&request("Atlantis", "Baghdad"))
            .unwrap();
        assert!(matches!(outcome, Outcome::Successful | Outcome::Unsuccessful));
    }

    #[test]
    fn malformed_request_fails_validation() {
        let pipeline = tiny_pipeline();
        let mut req = request("Iraq", "Baghdad");
        req.duration = String::new();
        assert!(matches!(
            pipeline.predict_request(&req),
            Err(PipelineError::Validation { .. })
        ));
    }

    #[test]
    fn reloaded_pipeline_predicts_identically() {
        let pipeline = tiny_pipeline();
        let path = std::env::temp_dir().join(format!("gtd-ml-pipeline-{}.json", std::process::id()));
        pipeline.save(&path).unwrap();
        let reloaded = TrainedPipeline::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let samples = [
            request("Iraq", "Baghdad"),
            request("Norway", "Oslo"),
            request("Atlantis", "Nowhere"),
        ];
        for sample in &samples {
            let a = pipeline.predict_request(sample).unwrap();
            let b = reloaded.predict_request(sample).unwrap();
            assert_eq!(a, b);
        }
    }
}
