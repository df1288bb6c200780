//! Held-out evaluation metrics

use std::fmt;

use ndarray::Array1;

/// Confusion counts and the derived scores for the positive (success) class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationReport {
    pub true_positive: usize,
    pub false_positive: usize,
    pub true_negative: usize,
    pub false_negative: usize,
}

impl ClassificationReport {
    pub fn from_predictions(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let mut report = Self {
            true_positive: 0,
            false_positive: 0,
            true_negative: 0,
            false_negative: 0,
        };
        for (&truth, &pred) in y_true.iter().zip(y_pred.iter()) {
            match (truth >= 0.5, pred >= 0.5) {
                (true, true) => report.true_positive += 1,
                (false, true) => report.false_positive += 1,
                (false, false) => report.true_negative += 1,
                (true, false) => report.false_negative += 1,
            }
        }
        report
    }

    pub fn accuracy(&self) -> f64 {
        let correct = self.true_positive + self.true_negative;
        let total = correct + self.false_positive + self.false_negative;
        if total == 0 {
            return 0.0;
        }
        correct as f64 / total as f64
    }

    pub fn precision(&self) -> f64 {
        let predicted = self.true_positive + self.false_positive;
        if predicted == 0 {
            return 0.0;
        }
        self.true_positive as f64 / predicted as f64
    }

    pub fn recall(&self) -> f64 {
        let actual = self.true_positive + self.false_negative;
        if actual == 0 {
            return 0.0;
        }
        self.true_positive as f64 / actual as f64
    }

    pub fn f1(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            return 0.0;
        }
        2.0 * p * r / (p + r)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} f1={:.4}",
            self.accuracy(),
            self.precision(),
            self.recall(),
            self.f1()
        )
    }
}

/// Rank-based ROC-AUC (Mann-Whitney statistic, average ranks on ties).
/// Returns 0.5 when one class is absent.
pub fn roc_auc(y_true: &Array1<f64>, scores: &Array1<f64>) -> f64 {
    let n = y_true.len();
    let n_pos = y_true.iter().filter(|&&v| v >= 0.5).count();
    let n_neg = n - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    // average rank within tied score groups
    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let avg_rank = ((i + 1 + j + 1) as f64) / 2.0;
        for k in i..=j {
            ranks[order[k]] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = (0..n).filter(|&i| y_true[i] >= 0.5).map(|i| ranks[i]).sum();
    let u = pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0;
    u / (n_pos * n_neg) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn report_counts_and_scores() {
        let y_true = array![1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = array![1.0, 0.0, 0.0, 1.0, 1.0];
        let report = ClassificationReport::from_predictions(&y_true, &y_pred);
        assert_eq!(report.true_positive, 2);
        assert_eq!(report.false_negative, 1);
        assert_eq!(report.false_positive, 1);
        assert_eq!(report.true_negative, 1);
        assert!((report.accuracy() - 0.6).abs() < 1e-12);
        assert!((report.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn perfect_ranking_has_unit_auc() {
        let y_true = array![0.0, 0.0, 1.0, 1.0];
        let scores = array![0.1, 0.2, 0.8, 0.9];
        assert!((roc_auc(&y_true, &scores) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn random_ranking_has_half_auc() {
        let y_true = array![0.0, 1.0, 0.0, 1.0];
        let scores = array![0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y_true, &scores) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn single_class_degenerates_to_half() {
        let y_true = array![1.0, 1.0];
        let scores = array![0.3, 0.9];
        assert_eq!(roc_auc(&y_true, &scores), 0.5);
    }
}
