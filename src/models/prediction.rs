// file: src/models/prediction.rs
// description: classification outcome model shared by online and batch prediction
// reference: internal data structures

use serde::{Deserialize, Serialize};

/// One label with its model confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// Pair up the parallel label/confidence arrays the prediction API returns.
/// Extra entries on either side are dropped.
pub fn zip_classifications(labels: &[String], confidences: &[f64]) -> Vec<Classification> {
    labels
        .iter()
        .zip(confidences.iter())
        .map(|(label, confidence)| Classification::new(label.clone(), *confidence))
        .collect()
}

/// Confidence of a specific label within the parallel arrays, if present.
pub fn confidence_for(labels: &[String], confidences: &[f64], target: &str) -> Option<f64> {
    labels
        .iter()
        .position(|label| label == target)
        .and_then(|idx| confidences.get(idx).copied())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_zip_classifications() {
        let pairs = zip_classifications(&labels(&["arch_diagram", "other"]), &[0.97, 0.03]);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], Classification::new("arch_diagram", 0.97));
    }

    #[test]
    fn test_zip_drops_unmatched_tail() {
        let pairs = zip_classifications(&labels(&["arch_diagram"]), &[0.97, 0.03]);
        assert_eq!(pairs.len(), 1);
    }

    #[test]
    fn test_confidence_for_any_position() {
        let names = labels(&["other", "arch_diagram"]);
        assert_eq!(confidence_for(&names, &[0.2, 0.8], "arch_diagram"), Some(0.8));
        assert_eq!(confidence_for(&names, &[0.2, 0.8], "other"), Some(0.2));
    }

    #[test]
    fn test_confidence_for_missing_label() {
        let names = labels(&["other"]);
        assert_eq!(confidence_for(&names, &[1.0], "arch_diagram"), None);
    }
}
