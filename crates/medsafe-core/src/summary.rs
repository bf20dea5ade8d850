//! Evaluation summary as written by the evaluation collaborator.
//!
//! Every numeric field is optional: a field absent from the artifact (or
//! written as `null`, as the evaluator does for recall when no case was
//! safe) stays `None` and is reported as missing, never as zero.

use serde::{Deserialize, Serialize};

/// Hard safety failure counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyCounts {
    pub missed_escalations: Option<u64>,
    pub overconfident_wrong: Option<u64>,
    pub unsafe_reassurance: Option<u64>,
}

/// Diagnostic recall over the cases without a safety failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Effectiveness {
    pub top1_recall: Option<f64>,
    pub top3_recall: Option<f64>,
}

/// Metrics that do not affect the safety verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Informational {
    pub overdiagnosis: Option<u64>,
}

/// One model's evaluation artifact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSummary {
    pub model: Option<String>,
    pub version: Option<String>,
    pub prompt_variant: Option<String>,

    /// Validly scored attempts.
    pub cases: Option<u64>,
    pub total_attempted: Option<u64>,
    pub format_failures: Option<u64>,

    /// Share of scored cases with no safety failure.
    pub safety_pass_rate: Option<f64>,
    pub safety: SafetyCounts,
    pub effectiveness: Effectiveness,
    pub informational: Informational,
}

impl EvaluationSummary {
    /// Parse an evaluation artifact. Unknown fields are ignored.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_artifact() {
        let raw = json!({
            "model": "acme/model-a",
            "version": "baseline",
            "cases": 9,
            "total_attempted": 10,
            "safety_pass_rate": 0.75,
            "safety": {
                "missed_escalations": 1,
                "overconfident_wrong": 0,
                "unsafe_reassurance": 2
            },
            "effectiveness": { "top1_recall": 0.5, "top3_recall": 0.8 },
            "informational": { "overdiagnosis": 3 },
            "format_failures": 1,
            "format_failure_details": [{ "case_id": "c1", "error": "bad json" }],
            "prompt_variant": "baseline"
        });

        let summary = EvaluationSummary::from_slice(raw.to_string().as_bytes()).unwrap();
        assert_eq!(summary.cases, Some(9));
        assert_eq!(summary.total_attempted, Some(10));
        assert_eq!(summary.format_failures, Some(1));
        assert_eq!(summary.safety.missed_escalations, Some(1));
        assert_eq!(summary.safety.unsafe_reassurance, Some(2));
        assert_eq!(summary.effectiveness.top1_recall, Some(0.5));
        assert_eq!(summary.effectiveness.top3_recall, Some(0.8));
        assert_eq!(summary.informational.overdiagnosis, Some(3));
        assert_eq!(summary.prompt_variant.as_deref(), Some("baseline"));
    }

    #[test]
    fn test_null_recall_stays_missing() {
        let raw = json!({
            "cases": 0,
            "total_attempted": 4,
            "format_failures": 4,
            "safety": {
                "missed_escalations": 0,
                "overconfident_wrong": 0,
                "unsafe_reassurance": 0
            },
            "effectiveness": { "top1_recall": null, "top3_recall": null }
        });

        let summary = EvaluationSummary::from_slice(raw.to_string().as_bytes()).unwrap();
        assert_eq!(summary.effectiveness.top1_recall, None);
        assert_eq!(summary.effectiveness.top3_recall, None);
        assert_eq!(summary.safety_pass_rate, None);
    }

    #[test]
    fn test_absent_sections_are_not_zero() {
        let summary = EvaluationSummary::from_slice(b"{}").unwrap();
        assert_eq!(summary.cases, None);
        assert_eq!(summary.safety.missed_escalations, None);
        assert_eq!(summary.effectiveness.top3_recall, None);
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(EvaluationSummary::from_slice(b"not json").is_err());
        assert!(EvaluationSummary::from_slice(b"[1, 2]").is_err());
    }
}
