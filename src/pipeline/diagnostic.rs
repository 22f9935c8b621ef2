//! Per-run diagnostics.
//!
//! Everything the pipeline noticed but did not fail on: per-line classifier
//! decisions, discarded amounts, unclaimed prices, and the fate of every
//! orchestrator stage. Built fresh for each request and returned next to the
//! `MenuResult`; nothing here is process-wide.

use serde::Serialize;
use uuid::Uuid;

use super::classify::ClassifiedLine;
use super::orchestrator::ExtractionState;
use super::types::{LineClass, PriceGroup};

/// Diagnostics for one menu-processing request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Derived from the input text, so identical input gets the same id.
    pub run_id: Uuid,
    pub lines: Vec<LineDiagnostic>,
    pub stages: Vec<StageRecord>,
    pub warnings: Vec<String>,
}

/// Classifier decision for one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineDiagnostic {
    pub line_index: usize,
    pub text: String,
    pub class: LineClass,
    pub reason: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prices: Vec<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discarded_amounts: Vec<f64>,
}

/// What happened in one orchestrator state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub state: ExtractionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    pub outcome: StageOutcome,
    pub dish_count: usize,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum StageOutcome {
    Accepted,
    Escalated { reason: EscalationReason },
    Failed { error: String },
    Skipped { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    NoText,
    NoDishes,
    TooFewDishes,
    LowConfidence,
    ContextMismatch,
}

impl Diagnostics {
    pub fn new(input: &str) -> Self {
        Self::for_bytes(input.as_bytes())
    }

    /// Diagnostics keyed on raw input bytes, such as an image.
    pub fn for_bytes(input: &[u8]) -> Self {
        Self {
            run_id: Uuid::new_v5(&Uuid::NAMESPACE_OID, input),
            lines: Vec::new(),
            stages: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Record classifier decisions. Replaces lines from an earlier pass.
    pub fn record_lines(&mut self, lines: &[ClassifiedLine]) {
        self.lines = lines
            .iter()
            .map(|line| {
                let prices = line
                    .scan
                    .matched
                    .as_ref()
                    .map(|m| m.prices.iter().map(|p| p.amount).collect())
                    .unwrap_or_default();
                for amount in &line.scan.rejected {
                    self.warnings.push(format!(
                        "line {}: amount {amount} outside plausible band, discarded",
                        line.classification.line_index
                    ));
                }
                LineDiagnostic {
                    line_index: line.classification.line_index,
                    text: line.text.clone(),
                    class: line.classification.class,
                    reason: line.classification.reason.clone(),
                    prices,
                    discarded_amounts: line.scan.rejected.clone(),
                }
            })
            .collect();
    }

    pub fn record_unused_groups(&mut self, groups: &[PriceGroup]) {
        for group in groups {
            let amounts: Vec<String> = group.tokens.iter().map(|t| t.amount.to_string()).collect();
            self.warnings.push(format!(
                "line {}: price {} not associated with any dish",
                group.line_index,
                amounts.join("/")
            ));
        }
    }

    pub fn record_stage(&mut self, record: StageRecord) {
        self.stages.push(record);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::classify::classify_lines;
    use crate::pipeline::sanitize::split_raw_lines;
    use crate::pipeline::types::{Currency, PriceOrigin, PriceToken};
    use crate::pipeline_config::PipelineConfig;

    #[test]
    fn run_id_is_deterministic_per_input() {
        let a = Diagnostics::new("Pad Thai 120");
        let b = Diagnostics::new("Pad Thai 120");
        let c = Diagnostics::new("Pad Thai 130");
        assert_eq!(a.run_id, b.run_id);
        assert_ne!(a.run_id, c.run_id);
    }

    #[test]
    fn lines_record_class_prices_and_discards() {
        let config = PipelineConfig::default();
        let lines = classify_lines(&split_raw_lines("Fried Rice 70 baht\nGolden Steak 99999"), &config);
        let mut diag = Diagnostics::new("x");
        diag.record_lines(&lines);

        assert_eq!(diag.lines.len(), 2);
        assert_eq!(diag.lines[0].class, LineClass::DishCandidate);
        assert_eq!(diag.lines[0].prices, vec![70.0]);
        assert_eq!(diag.lines[1].discarded_amounts, vec![99999.0]);
        assert_eq!(diag.warnings.len(), 1);
        assert!(diag.warnings[0].contains("99999"));
    }

    #[test]
    fn unused_groups_become_warnings() {
        let mut diag = Diagnostics::new("x");
        diag.record_unused_groups(&[PriceGroup {
            line_index: 2,
            tokens: vec![PriceToken {
                amount: 110.0,
                max_amount: None,
                currency: Currency::Baht,
                size: None,
                multi_size: false,
            }],
            origin: PriceOrigin::Bare,
        }]);
        assert_eq!(diag.warnings, vec!["line 2: price 110 not associated with any dish"]);
    }

    #[test]
    fn stage_outcome_serializes_with_kind_tag() {
        let record = StageRecord {
            state: ExtractionState::PrimaryExtraction,
            engine: None,
            outcome: StageOutcome::Escalated {
                reason: EscalationReason::TooFewDishes,
            },
            dish_count: 1,
            confidence: 0.95,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains(r#""kind":"escalated""#), "got {json}");
        assert!(json.contains(r#""reason":"too_few_dishes""#), "got {json}");
        assert!(json.contains(r#""state":"primary_extraction""#), "got {json}");
    }
}
