/// Offline training job: raw CSV in, persisted pipeline out

use std::fs::File;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use ndarray::Array1;

use gtd_ml::dataset::{load_csv, sample_records, train_test_split, ColumnMapping};
use gtd_ml::models::metrics::{roc_auc, ClassificationReport};
use gtd_ml::preprocessing::clean;
use gtd_ml::{
    BinaryEncoder, BoostingParams, GradientBoostedTrees, ImputerState, LogisticBaseline,
    RandomOversampler, TrainedPipeline,
};

struct TrainArgs {
    csv_path: PathBuf,
    output_path: PathBuf,
    rebalance: bool,
    /// Fraction of the table to train on; the source corpus uses 0.5.
    sample_fraction: f64,
}

fn parse_args() -> Result<TrainArgs> {
    let mut args = std::env::args().skip(1);
    let csv_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: train <csv> <output> [--rebalance] [--sample FRACTION]")?;
    let output_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: train <csv> <output> [--rebalance] [--sample FRACTION]")?;

    let mut rebalance = false;
    let mut sample_fraction = 0.5;
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--rebalance" => rebalance = true,
            "--sample" => {
                let value = args.next().context("--sample needs a value")?;
                sample_fraction = value
                    .parse()
                    .with_context(|| format!("invalid sample fraction '{value}'"))?;
                if !(0.0..=1.0).contains(&sample_fraction) || sample_fraction == 0.0 {
                    bail!("sample fraction must be in (0, 1]");
                }
            }
            other => bail!("unknown flag '{other}'"),
        }
    }

    Ok(TrainArgs {
        csv_path,
        output_path,
        rebalance,
        sample_fraction,
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = parse_args()?;

    // 1. Load the raw table
    let file = File::open(&args.csv_path)
        .with_context(|| format!("cannot open {}", args.csv_path.display()))?;
    let records = load_csv(file, &ColumnMapping::default())?;
    tracing::info!("Loaded {} rows", records.len());

    let records = sample_records(&records, args.sample_fraction, 42);
    tracing::info!("Training on a sample of {} rows", records.len());

    // 2. Freeze imputation statistics and clean
    let imputer = ImputerState::fit(&records)?;
    let cleaned = clean(&records, &imputer);

    let labelled: Vec<_> = cleaned.iter().filter(|r| r.success.is_some()).collect();
    let skipped = cleaned.len() - labelled.len();
    if skipped > 0 {
        tracing::warn!("Skipping {skipped} rows without an outcome label");
    }
    if labelled.is_empty() {
        bail!("no labelled rows in the training table");
    }

    // 3. Fit the encoder and assemble the training matrix
    let features: Vec<_> = labelled.iter().map(|r| r.features()).collect();
    let encoder = BinaryEncoder::fit(&features)?;
    let x = encoder.transform_batch(&features);
    let y = Array1::from_iter(labelled.iter().map(|r| {
        match r.success {
            Some(value) => value as f64,
            None => 0.0, // filtered above
        }
    }));
    tracing::info!("Encoded {} rows into width {}", x.nrows(), encoder.width());

    // 4. Held-out split; the test side stays untouched from here on
    let (mut x_train, mut y_train, x_test, y_test) = train_test_split(&x, &y, 0.2, 42)?;

    if args.rebalance {
        let before = class_ratio(&y_train);
        let sampler = RandomOversampler::default();
        (x_train, y_train) = sampler.rebalance(&x_train, &y_train)?;
        tracing::info!(
            "Rebalanced training set from {:.0}:{:.0} to {} rows",
            before.0 * 100.0,
            before.1 * 100.0,
            y_train.len()
        );
    }

    // 5. Fit the booster and the baseline, report both on the held-out split
    let mut model = GradientBoostedTrees::new(BoostingParams::default());
    model.fit(&x_train, &y_train)?;

    let probs = model.predict_proba_batch(&x_test)?;
    let preds = probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
    let report = ClassificationReport::from_predictions(&y_test, &preds);
    tracing::info!(
        "Boosted trees: {report} auc={:.4}",
        roc_auc(&y_test, &probs)
    );

    let mut baseline = LogisticBaseline::default();
    baseline.fit(&x_train, &y_train)?;
    let base_probs = baseline.predict_proba_batch(&x_test)?;
    let base_preds = base_probs.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });
    let base_report = ClassificationReport::from_predictions(&y_test, &base_preds);
    tracing::info!(
        "Logistic baseline: {base_report} auc={:.4}",
        roc_auc(&y_test, &base_probs)
    );

    // 6. Persist the pipeline
    let pipeline = TrainedPipeline::new(imputer, encoder, model, y_train.len());
    pipeline.save(&args.output_path)?;
    tracing::info!("Pipeline saved to {}", args.output_path.display());

    Ok(())
}

fn class_ratio(y: &Array1<f64>) -> (f64, f64) {
    let positives = y.iter().filter(|&&v| v >= 0.5).count() as f64;
    let total = y.len() as f64;
    (positives / total, (total - positives) / total)
}
