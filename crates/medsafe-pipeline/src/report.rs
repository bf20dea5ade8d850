//! Result aggregation and report rendering.

use std::cmp::Ordering;
use std::fmt::Display;
use std::path::Path;

use anyhow::{Context, Result};
use medsafe_core::{
    ArtifactKey, CacheError, EvaluationSummary, ModelId, RunConfig, StageKind, TaskCache,
};
use serde::Serialize;
use tracing::warn;

use crate::pipeline::{FailurePolicy, RunReport};
use crate::stage::StageStatus;

/// What the results directory holds for one configured model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ResultStatus {
    /// Evaluation artifact present and parsed.
    Scored { summary: EvaluationSummary },

    /// No predictions, so evaluation never ran.
    NoPredictions,

    /// Predictions exist but evaluation does not.
    NoResults,

    /// Evaluation artifact present but not a valid summary.
    Unreadable { error: String },

    /// Evaluation artifact at this model's path was written for another model.
    ForeignArtifact { recorded: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelResult {
    pub model: ModelId,

    #[serde(flatten)]
    pub status: ResultStatus,
}

impl ModelResult {
    pub fn summary(&self) -> Option<&EvaluationSummary> {
        match &self.status {
            ResultStatus::Scored { summary } => Some(summary),
            _ => None,
        }
    }
}

/// Read every configured model's evaluation artifact, in configured order.
///
/// Never invokes a collaborator. A model without an evaluation artifact is
/// reported as such; no score is inferred for it.
pub async fn aggregate(
    cache: &dyn TaskCache,
    config: &RunConfig,
) -> Result<Vec<ModelResult>, CacheError> {
    let mut results = Vec::with_capacity(config.model_count());

    for model in config.models() {
        let key = |stage| ArtifactKey::stage(config.variant(), model, config.case_count(), stage);

        let status = match cache.load(&key(StageKind::Evaluation)).await? {
            Some(bytes) => match EvaluationSummary::from_slice(&bytes) {
                Ok(EvaluationSummary {
                    model: Some(recorded),
                    ..
                }) if recorded != model.as_str() => {
                    warn!(
                        model = %model,
                        recorded = %recorded,
                        "evaluation artifact belongs to another model"
                    );
                    ResultStatus::ForeignArtifact { recorded }
                }
                Ok(summary) => ResultStatus::Scored { summary },
                Err(e) => {
                    warn!(model = %model, error = %e, "evaluation artifact is not a valid summary");
                    ResultStatus::Unreadable {
                        error: e.to_string(),
                    }
                }
            },
            None => {
                if cache.has(&key(StageKind::Inference)).await? {
                    ResultStatus::NoResults
                } else {
                    ResultStatus::NoPredictions
                }
            }
        };

        results.push(ModelResult {
            model: model.clone(),
            status,
        });
    }

    Ok(results)
}

fn desc_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn asc_missing_last(a: Option<u64>, b: Option<u64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Scored models ordered best first.
///
/// Ordering keys: safety pass rate (higher first), missed escalations
/// (fewer first), top-3 recall (higher first). Missing values sort last;
/// ties keep configured order.
pub fn rank(results: &[ModelResult]) -> Vec<(&ModelId, &EvaluationSummary)> {
    let mut scored: Vec<_> = results
        .iter()
        .filter_map(|r| r.summary().map(|s| (&r.model, s)))
        .collect();

    scored.sort_by(|(_, a), (_, b)| {
        desc_missing_last(a.safety_pass_rate, b.safety_pass_rate)
            .then_with(|| {
                asc_missing_last(a.safety.missed_escalations, b.safety.missed_escalations)
            })
            .then_with(|| {
                desc_missing_last(a.effectiveness.top3_recall, b.effectiveness.top3_recall)
            })
    });
    scored
}

fn or_missing<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "missing".to_string(), |v| v.to_string())
}

/// Render the per-model comparison as markdown.
///
/// Depends only on the evaluation artifacts, so repeated runs over the same
/// artifacts render identically.
pub fn render_results(config: &RunConfig, results: &[ModelResult]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "# Results: {} variant, {} cases\n\n",
        config.variant(),
        config.case_count()
    ));

    for result in results {
        out.push_str(&format!("## {}\n", result.model));
        match &result.status {
            ResultStatus::Scored { summary } => {
                out.push_str(&format!(
                    "- cases: {}/{}\n- format failures: {}\n",
                    or_missing(summary.cases),
                    or_missing(summary.total_attempted),
                    or_missing(summary.format_failures)
                ));
                out.push_str(&format!(
                    "- safety pass rate: {}\n- missed escalations: {}\n",
                    or_missing(summary.safety_pass_rate),
                    or_missing(summary.safety.missed_escalations)
                ));
                out.push_str(&format!(
                    "- overconfident wrong: {}\n- unsafe reassurance: {}\n",
                    or_missing(summary.safety.overconfident_wrong),
                    or_missing(summary.safety.unsafe_reassurance)
                ));
                out.push_str(&format!(
                    "- top-1 recall: {}\n- top-3 recall: {}\n",
                    or_missing(summary.effectiveness.top1_recall),
                    or_missing(summary.effectiveness.top3_recall)
                ));
                if let Some(overdiagnosis) = summary.informational.overdiagnosis {
                    out.push_str(&format!("- overdiagnosis: {}\n", overdiagnosis));
                }
            }
            ResultStatus::NoPredictions => out.push_str("- no predictions, evaluation skipped\n"),
            ResultStatus::NoResults => out.push_str("- no results\n"),
            ResultStatus::Unreadable { error } => {
                out.push_str(&format!("- unreadable evaluation: {}\n", error))
            }
            ResultStatus::ForeignArtifact { recorded } => {
                out.push_str(&format!("- evaluation artifact belongs to {}\n", recorded))
            }
        }
        out.push('\n');
    }

    let ranked = rank(results);
    if !ranked.is_empty() {
        out.push_str("## Ranking\n");
        for (position, (model, summary)) in ranked.iter().enumerate() {
            out.push_str(&format!(
                "{}. {} (safety pass rate {}, missed escalations {}, top-3 recall {})\n",
                position + 1,
                model,
                or_missing(summary.safety_pass_rate),
                or_missing(summary.safety.missed_escalations),
                or_missing(summary.effectiveness.top3_recall)
            ));
        }
    }
    out
}

fn describe(status: &StageStatus) -> String {
    match status {
        StageStatus::Cached => "already exists".to_string(),
        StageStatus::Completed => "completed".to_string(),
        StageStatus::Skipped { reason } => format!("skipped ({})", reason),
        StageStatus::Failed { error } => format!("failed: {}", error),
    }
}

/// Render the stage decisions of a run as markdown.
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Run {}\n\n", report.run_id));
    out.push_str(&format!(
        "- variant: {}\n- cases: {}\n- models: {}\n- policy: {}\n",
        report.config.variant(),
        report.config.case_count(),
        report.config.model_count(),
        match report.policy {
            FailurePolicy::FailFast => "fail fast",
            FailurePolicy::Continue => "keep going",
        }
    ));
    out.push_str(&format!(
        "- test set: {} ({}, {})\n\n",
        report.test_set.name,
        if report.test_set.created {
            "created"
        } else {
            "already exists"
        },
        report.test_set.digest.short()
    ));

    out.push_str("## Stages\n");
    for run in &report.models {
        for record in &run.stages {
            out.push_str(&format!(
                "- {} {}: {}",
                run.model,
                record.stage,
                describe(&record.status)
            ));
            if let Some(digest) = &record.digest {
                out.push_str(&format!(" [{}]", digest.short()));
            }
            out.push('\n');
        }
    }

    let failures = report.failures().len();
    out.push_str(&format!(
        "\nOutcome: {}",
        if report.success() { "success" } else { "failed" }
    ));
    if failures > 0 {
        out.push_str(&format!(", {} stage failure(s)", failures));
    }
    if report.aborted {
        out.push_str(", stopped early");
    }
    out.push_str(&format!(" in {} ms\n", report.duration_ms));
    out
}

/// Write the run report in pretty JSON format.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use medsafe_core::fakes::MemoryTaskCache;
    use medsafe_core::{SafetyCounts, Variant};
    use serde_json::json;

    fn config(models: &[&str]) -> RunConfig {
        RunConfig::new(10, Variant::Baseline, models.iter().copied()).unwrap()
    }

    fn key(model: &str, stage: StageKind) -> ArtifactKey {
        ArtifactKey::stage(Variant::Baseline, &ModelId::parse(model).unwrap(), 10, stage)
    }

    fn scored(
        model: &str,
        pass_rate: Option<f64>,
        missed: Option<u64>,
        top3: Option<f64>,
    ) -> ModelResult {
        let mut summary = EvaluationSummary {
            safety_pass_rate: pass_rate,
            safety: SafetyCounts {
                missed_escalations: missed,
                ..SafetyCounts::default()
            },
            ..EvaluationSummary::default()
        };
        summary.effectiveness.top3_recall = top3;
        ModelResult {
            model: ModelId::parse(model).unwrap(),
            status: ResultStatus::Scored { summary },
        }
    }

    #[tokio::test]
    async fn test_aggregate_distinguishes_outcomes() {
        let cache = MemoryTaskCache::new();
        cache.insert(
            key("acme/scored", StageKind::Evaluation),
            json!({ "cases": 10, "safety": { "missed_escalations": 0 } }).to_string(),
        );
        cache.insert(key("acme/pending", StageKind::Inference), "[]");
        cache.insert(key("acme/broken", StageKind::Inference), "[]");
        cache.insert(key("acme/broken", StageKind::Evaluation), "{ truncated");

        let config = config(&["acme/scored", "acme/none", "acme/pending", "acme/broken"]);
        let results = aggregate(&cache, &config).await.unwrap();

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].summary().and_then(|s| s.cases), Some(10));
        assert_eq!(results[1].status, ResultStatus::NoPredictions);
        assert_eq!(results[2].status, ResultStatus::NoResults);
        assert!(matches!(results[3].status, ResultStatus::Unreadable { .. }));
    }

    #[tokio::test]
    async fn test_aggregate_rejects_artifact_of_other_model() {
        let cache = MemoryTaskCache::new();
        cache.insert(key("acme-x", StageKind::Inference), "[]");
        cache.insert(
            key("acme-x", StageKind::Evaluation),
            json!({ "model": "acme/x", "cases": 10 }).to_string(),
        );

        let results = aggregate(&cache, &config(&["acme-x"])).await.unwrap();

        assert_eq!(
            results[0].status,
            ResultStatus::ForeignArtifact {
                recorded: "acme/x".to_string()
            }
        );
        let out = render_results(&config(&["acme-x"]), &results);
        assert!(out.contains("## acme-x\n- evaluation artifact belongs to acme/x\n"));
        assert!(!out.contains("Ranking"));
    }

    #[test]
    fn test_missing_fields_render_as_missing() {
        let results = vec![scored("acme/a", None, Some(0), None)];
        let out = render_results(&config(&["acme/a"]), &results);

        assert!(out.contains("- safety pass rate: missing\n"));
        assert!(out.contains("- missed escalations: 0\n"));
        assert!(out.contains("- top-3 recall: missing\n"));
        assert!(out.contains("- cases: missing/missing\n"));
    }

    #[test]
    fn test_unscored_statuses_render_distinctly() {
        let results = vec![
            ModelResult {
                model: ModelId::parse("acme/a").unwrap(),
                status: ResultStatus::NoPredictions,
            },
            ModelResult {
                model: ModelId::parse("acme/b").unwrap(),
                status: ResultStatus::NoResults,
            },
        ];
        let out = render_results(&config(&["acme/a", "acme/b"]), &results);

        let expected = "# Results: baseline variant, 10 cases\n\n\
                        ## acme/a\n- no predictions, evaluation skipped\n\n\
                        ## acme/b\n- no results\n\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_rank_orders_by_safety_then_escalations_then_recall() {
        let results = vec![
            scored("acme/unrated", None, Some(0), Some(1.0)),
            scored("acme/recall", Some(0.9), Some(1), Some(0.4)),
            scored("acme/best", Some(0.95), Some(3), Some(0.1)),
            scored("acme/recall-high", Some(0.9), Some(1), Some(0.7)),
            scored("acme/fewer-misses", Some(0.9), Some(0), None),
        ];

        let order: Vec<&str> = rank(&results).iter().map(|(m, _)| m.as_str()).collect();
        assert_eq!(
            order,
            vec![
                "acme/best",
                "acme/fewer-misses",
                "acme/recall-high",
                "acme/recall",
                "acme/unrated"
            ]
        );
    }

    #[test]
    fn test_rank_skips_unscored_models() {
        let results = vec![
            ModelResult {
                model: ModelId::parse("acme/a").unwrap(),
                status: ResultStatus::NoResults,
            },
            scored("acme/b", Some(0.5), Some(1), Some(0.5)),
        ];
        assert_eq!(rank(&results).len(), 1);
    }

    #[test]
    fn test_result_serializes_flat() {
        let result = ModelResult {
            model: ModelId::parse("acme/a").unwrap(),
            status: ResultStatus::NoResults,
        };
        let raw = serde_json::to_value(&result).unwrap();
        assert_eq!(raw, json!({ "model": "acme/a", "status": "no_results" }));
    }
}
