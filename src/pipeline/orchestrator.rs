//! Fallback orchestrator.
//!
//! Drives one request through `PrimaryExtraction`, then `SecondaryExtraction`
//! when the primary result is insufficient, then `TertiaryRawReturn` when
//! nothing structured survives. Every path ends in a `MenuResult`; stage
//! errors are recorded in `Diagnostics` and never returned to the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::diagnostic::{Diagnostics, EscalationReason, StageOutcome, StageRecord};
use super::engine::{call_with_budget, GenerativeEngine, TextAcquisition};
use super::language_detect::detect_language;
use super::parser::parse_generative_response;
use super::processor::{run_generative_stage, run_heuristic_stage, StageOutput};
use super::types::{ExtractionEngine, GenerativeDish, MenuResult};
use super::MenuError;
use crate::pipeline_config::PipelineConfig;

/// Engine name recorded when the caller supplied structured dishes directly.
const SUPPLIED_DISHES: &str = "supplied";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    PrimaryExtraction,
    SecondaryExtraction,
    TertiaryRawReturn,
    Done,
}

impl ExtractionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PrimaryExtraction => "primary_extraction",
            Self::SecondaryExtraction => "secondary_extraction",
            Self::TertiaryRawReturn => "tertiary_raw_return",
            Self::Done => "done",
        }
    }
}

/// Input for one menu-processing request.
#[derive(Debug, Clone, Default)]
pub struct MenuRequest {
    /// Recognized text, when OCR already ran upstream.
    pub text: Option<String>,
    /// Menu image for the primary and secondary engines.
    pub image: Option<Arc<[u8]>>,
    /// Structured dishes from a generative engine the caller already invoked.
    pub generative_dishes: Option<Vec<GenerativeDish>>,
}

impl MenuRequest {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_image(image: impl Into<Arc<[u8]>>) -> Self {
        Self {
            image: Some(image.into()),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<Arc<[u8]>>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_generative_dishes(mut self, dishes: Vec<GenerativeDish>) -> Self {
        self.generative_dishes = Some(dishes);
        self
    }

    fn diagnostics(&self) -> Diagnostics {
        match (&self.text, &self.image) {
            (Some(text), _) => Diagnostics::new(text),
            (None, Some(image)) => Diagnostics::for_bytes(image),
            (None, None) => Diagnostics::new(""),
        }
    }
}

/// Result plus the diagnostics gathered while producing it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MenuOutcome {
    pub result: MenuResult,
    pub diagnostics: Diagnostics,
}

/// Owns escalation between extraction engines.
///
/// Holds no per-request state, so one instance can serve concurrent requests.
pub struct MenuOrchestrator {
    config: PipelineConfig,
    primary: Option<Arc<dyn TextAcquisition>>,
    secondary: Option<Arc<dyn GenerativeEngine>>,
}

/// Per-request working state. Dropped when the request completes.
struct Run {
    diag: Diagnostics,
    recognized: Option<String>,
    language: String,
    /// Sparse primary output, returned only when no secondary source exists.
    sparse_primary: Option<StageOutput>,
    accepted: Option<(StageOutput, ExtractionEngine)>,
}

impl MenuOrchestrator {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            primary: None,
            secondary: None,
        }
    }

    pub fn with_primary(mut self, engine: Arc<dyn TextAcquisition>) -> Self {
        self.primary = Some(engine);
        self
    }

    pub fn with_secondary(mut self, engine: Arc<dyn GenerativeEngine>) -> Self {
        self.secondary = Some(engine);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn stage_budget(&self) -> Duration {
        Duration::from_millis(self.config.stage_timeout_ms)
    }

    /// Process one request. Always returns a result, degraded if necessary.
    pub fn process(&self, request: MenuRequest) -> MenuOutcome {
        let started = Instant::now();
        let mut run = Run {
            diag: request.diagnostics(),
            recognized: request.text.clone(),
            language: "und".to_string(),
            sparse_primary: None,
            accepted: None,
        };

        tracing::info!(
            run_id = %run.diag.run_id,
            has_text = request.text.is_some(),
            has_image = request.image.is_some(),
            "Processing menu"
        );

        let mut state = ExtractionState::PrimaryExtraction;
        while state != ExtractionState::Done {
            let _span = tracing::info_span!("menu_stage", stage = state.as_str()).entered();
            state = match state {
                ExtractionState::PrimaryExtraction => self.primary_step(&request, &mut run),
                ExtractionState::SecondaryExtraction => self.secondary_step(&request, &mut run),
                ExtractionState::TertiaryRawReturn => tertiary_step(&mut run),
                ExtractionState::Done => ExtractionState::Done,
            };
        }

        let processing_time_ms = started.elapsed().as_millis() as u64;
        let result = match run.accepted {
            Some((output, engine)) => MenuResult {
                dishes: output.dishes,
                language: output.language,
                confidence: output.confidence,
                processing_time_ms,
                engine,
                raw_text: None,
            },
            None => raw_result(run.recognized.unwrap_or_default(), processing_time_ms),
        };

        tracing::info!(
            run_id = %run.diag.run_id,
            engine = ?result.engine,
            dish_count = result.dishes.len(),
            confidence = result.confidence,
            processing_time_ms,
            "Menu processed"
        );

        MenuOutcome {
            result,
            diagnostics: run.diag,
        }
    }

    // ──────────────────────────────────────────────
    // Primary: heuristic pipeline over recognized text
    // ──────────────────────────────────────────────

    fn primary_step(&self, request: &MenuRequest, run: &mut Run) -> ExtractionState {
        let state = ExtractionState::PrimaryExtraction;
        let mut engine_name = None;

        if run.recognized.is_none() {
            match (&self.primary, &request.image) {
                (Some(engine), Some(image)) => {
                    engine_name = Some(engine.name().to_string());
                    let worker = Arc::clone(engine);
                    let image = Arc::clone(image);
                    match call_with_budget(self.stage_budget(), move || worker.acquire(&image)) {
                        Ok(acquired) => {
                            tracing::debug!(
                                engine = engine.name(),
                                chars = acquired.text.len(),
                                ocr_confidence = acquired.confidence,
                                "Text acquired"
                            );
                            run.recognized = Some(acquired.text);
                        }
                        Err(e) => {
                            tracing::warn!(engine = engine.name(), error = %e, "Primary acquisition failed");
                            run.diag.record_stage(failed(state, engine_name, e.to_string()));
                            return ExtractionState::SecondaryExtraction;
                        }
                    }
                }
                _ => {
                    run.diag.record_stage(skipped(state, "no recognized text or primary engine"));
                    return ExtractionState::SecondaryExtraction;
                }
            }
        }

        let text = run.recognized.as_deref().unwrap_or_default();
        run.language = detect_language(text);

        match run_heuristic_stage(text, &self.config, &mut run.diag) {
            Ok(output) => {
                let reason = if output.dishes.len() < self.config.min_dish_count {
                    Some(EscalationReason::TooFewDishes)
                } else if output.confidence < self.config.min_overall_confidence {
                    Some(EscalationReason::LowConfidence)
                } else {
                    None
                };
                let record = StageRecord {
                    state,
                    engine: engine_name,
                    outcome: match reason {
                        Some(reason) => StageOutcome::Escalated { reason },
                        None => StageOutcome::Accepted,
                    },
                    dish_count: output.dishes.len(),
                    confidence: output.confidence,
                };
                run.diag.record_stage(record);

                match reason {
                    None => {
                        run.accepted = Some((output, ExtractionEngine::Heuristic));
                        ExtractionState::Done
                    }
                    Some(reason) => {
                        tracing::info!(
                            ?reason,
                            dish_count = output.dishes.len(),
                            confidence = output.confidence,
                            "Sparse primary result, escalating"
                        );
                        run.sparse_primary = Some(output);
                        ExtractionState::SecondaryExtraction
                    }
                }
            }
            Err(e) => {
                run.diag.record_stage(stage_error(state, engine_name, &e));
                ExtractionState::SecondaryExtraction
            }
        }
    }

    // ──────────────────────────────────────────────
    // Secondary: generative engine, called at most once
    // ──────────────────────────────────────────────

    fn secondary_step(&self, request: &MenuRequest, run: &mut Run) -> ExtractionState {
        let state = ExtractionState::SecondaryExtraction;

        let (engine_name, dishes) = match (&request.generative_dishes, &self.secondary, &request.image) {
            (Some(dishes), _, _) => (SUPPLIED_DISHES.to_string(), dishes.clone()),
            (None, Some(engine), Some(image)) => {
                let name = engine.name().to_string();
                let worker = Arc::clone(engine);
                let image = Arc::clone(image);
                let parsed = call_with_budget(self.stage_budget(), move || worker.extract_dishes(&image))
                    .map_err(MenuError::from)
                    .and_then(|response| parse_generative_response(&response));
                match parsed {
                    Ok(dishes) => (name, dishes),
                    Err(e) => {
                        run.diag.record_stage(stage_error(state, Some(name), &e));
                        return ExtractionState::TertiaryRawReturn;
                    }
                }
            }
            _ => {
                run.diag.record_stage(skipped(state, "no secondary source available"));
                return match run.sparse_primary.take() {
                    Some(output) => {
                        tracing::info!(
                            dish_count = output.dishes.len(),
                            "No secondary source, keeping primary result"
                        );
                        run.accepted = Some((output, ExtractionEngine::Heuristic));
                        ExtractionState::Done
                    }
                    None => ExtractionState::TertiaryRawReturn,
                };
            }
        };

        // Superseded by this stage whatever its outcome
        run.sparse_primary = None;

        match run_generative_stage(&dishes, &run.language, &self.config, &mut run.diag) {
            Ok(output) => {
                run.diag.record_stage(StageRecord {
                    state,
                    engine: Some(engine_name),
                    outcome: StageOutcome::Accepted,
                    dish_count: output.dishes.len(),
                    confidence: output.confidence,
                });
                run.accepted = Some((output, ExtractionEngine::Generative));
                ExtractionState::Done
            }
            Err(e) => {
                run.diag.record_stage(stage_error(state, Some(engine_name), &e));
                ExtractionState::TertiaryRawReturn
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tertiary: raw text, no dishes
// ──────────────────────────────────────────────

fn tertiary_step(run: &mut Run) -> ExtractionState {
    tracing::warn!(error = %MenuError::AllEnginesExhausted, "Returning raw text");
    run.diag.warn(MenuError::AllEnginesExhausted.to_string());
    run.diag.record_stage(StageRecord {
        state: ExtractionState::TertiaryRawReturn,
        engine: None,
        outcome: StageOutcome::Accepted,
        dish_count: 0,
        confidence: 0.0,
    });
    ExtractionState::Done
}

fn raw_result(text: String, processing_time_ms: u64) -> MenuResult {
    MenuResult {
        dishes: Vec::new(),
        language: detect_language(&text),
        confidence: 0.0,
        processing_time_ms,
        engine: ExtractionEngine::RawText,
        raw_text: Some(text),
    }
}

fn skipped(state: ExtractionState, reason: &str) -> StageRecord {
    StageRecord {
        state,
        engine: None,
        outcome: StageOutcome::Skipped {
            reason: reason.to_string(),
        },
        dish_count: 0,
        confidence: 0.0,
    }
}

fn failed(state: ExtractionState, engine: Option<String>, error: String) -> StageRecord {
    StageRecord {
        state,
        engine,
        outcome: StageOutcome::Failed { error },
        dish_count: 0,
        confidence: 0.0,
    }
}

/// Map a stage error to its record. Mismatch is logged apart from sparse results.
fn stage_error(state: ExtractionState, engine: Option<String>, error: &MenuError) -> StageRecord {
    let reason = match error {
        MenuError::NoTextDetected => Some(EscalationReason::NoText),
        MenuError::NoDishesAfterValidation => Some(EscalationReason::NoDishes),
        MenuError::MenuContextMismatch { anchor, conflicting } => {
            tracing::warn!(
                stage = state.as_str(),
                anchor = anchor.as_str(),
                conflicting = conflicting.as_str(),
                "Menu context mismatch, source likely misread"
            );
            Some(EscalationReason::ContextMismatch)
        }
        _ => None,
    };

    match reason {
        Some(reason) => {
            tracing::info!(stage = state.as_str(), ?reason, "Stage produced no usable dishes");
            StageRecord {
                state,
                engine,
                outcome: StageOutcome::Escalated { reason },
                dish_count: 0,
                confidence: 0.0,
            }
        }
        None => {
            tracing::warn!(stage = state.as_str(), error = %error, "Stage failed");
            failed(state, engine, error.to_string())
        }
    }
}

/// Run `process` on the blocking pool so independent requests proceed in parallel.
pub async fn process_async(orchestrator: Arc<MenuOrchestrator>, request: MenuRequest) -> MenuOutcome {
    let started = Instant::now();
    let text = request.text.clone();
    let mut diag = request.diagnostics();

    match tokio::task::spawn_blocking(move || orchestrator.process(request)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(error = %e, "Menu processing task aborted");
            diag.warn(format!("processing task aborted: {e}"));
            MenuOutcome {
                result: raw_result(text.unwrap_or_default(), started.elapsed().as_millis() as u64),
                diagnostics: diag,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::engine::{EngineError, MockGenerativeEngine, MockTextAcquisition};

    const THAI_MENU: &str = "Pad Thai 120\nTom Yum Goong 150\nGreen Curry 90";
    const GENERATIVE_MENU: &str = r#"[
        {"name": "Pad Thai", "price": 120, "confidence": 0.9},
        {"name": "Tom Yum Goong", "price": 150, "confidence": 0.9},
        {"name": "Green Curry", "price": 90, "confidence": 0.8}
    ]"#;

    fn image() -> Arc<[u8]> {
        Arc::from(&b"\x89PNG menu"[..])
    }

    fn outcomes(outcome: &MenuOutcome) -> Vec<(ExtractionState, StageOutcome)> {
        outcome
            .diagnostics
            .stages
            .iter()
            .map(|s| (s.state, s.outcome.clone()))
            .collect()
    }

    #[test]
    fn sufficient_primary_is_accepted_without_secondary() {
        let secondary = Arc::new(MockGenerativeEngine::new(GENERATIVE_MENU));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_secondary(secondary.clone());

        let outcome = orchestrator.process(MenuRequest::from_text(THAI_MENU).with_image(image()));

        assert_eq!(outcome.result.engine, ExtractionEngine::Heuristic);
        assert_eq!(outcome.result.dishes.len(), 3);
        assert_eq!(outcome.result.confidence, 0.95);
        assert_eq!(secondary.calls(), 0, "secondary must not run");
        assert_eq!(
            outcomes(&outcome),
            vec![(ExtractionState::PrimaryExtraction, StageOutcome::Accepted)]
        );
    }

    #[test]
    fn sparse_primary_calls_secondary_once() {
        let secondary = Arc::new(MockGenerativeEngine::new(GENERATIVE_MENU));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_secondary(secondary.clone());

        let outcome = orchestrator.process(MenuRequest::from_text("Pad Thai 120").with_image(image()));

        assert_eq!(secondary.calls(), 1);
        assert_eq!(outcome.result.engine, ExtractionEngine::Generative);
        let names: Vec<_> = outcome.result.dishes.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Pad Thai", "Tom Yum Goong", "Green Curry"]);
        assert_eq!(
            outcome.diagnostics.stages[0].outcome,
            StageOutcome::Escalated {
                reason: EscalationReason::TooFewDishes
            }
        );
        assert_eq!(outcome.diagnostics.stages[1].engine.as_deref(), Some("mock-generative"));
    }

    #[test]
    fn supplied_generative_dishes_skip_the_engine() {
        let secondary = Arc::new(MockGenerativeEngine::new("[]"));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_secondary(secondary.clone());
        let dishes = parse_generative_response(GENERATIVE_MENU).unwrap();

        let outcome = orchestrator.process(
            MenuRequest::from_text("menu")
                .with_image(image())
                .with_generative_dishes(dishes),
        );

        assert_eq!(secondary.calls(), 0);
        assert_eq!(outcome.result.engine, ExtractionEngine::Generative);
        assert_eq!(outcome.result.dishes.len(), 3);
        assert_eq!(outcome.diagnostics.stages[1].engine.as_deref(), Some(SUPPLIED_DISHES));
    }

    #[test]
    fn sparse_primary_kept_when_no_secondary_source() {
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default());

        let outcome = orchestrator.process(MenuRequest::from_text("Pad Thai 120"));

        assert_eq!(outcome.result.engine, ExtractionEngine::Heuristic);
        assert_eq!(outcome.result.dishes.len(), 1);
        assert!(matches!(
            outcome.diagnostics.stages[1].outcome,
            StageOutcome::Skipped { .. }
        ));
    }

    #[test]
    fn failed_secondary_falls_back_to_raw_text() {
        let secondary = Arc::new(MockGenerativeEngine::failing(EngineError::Connection(
            "http://localhost:11434".into(),
        )));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_secondary(secondary.clone());

        let outcome = orchestrator.process(MenuRequest::from_text("Pad Thai 120").with_image(image()));

        assert_eq!(secondary.calls(), 1);
        assert_eq!(outcome.result.engine, ExtractionEngine::RawText);
        assert!(outcome.result.dishes.is_empty(), "no partial primary dishes leak");
        assert_eq!(outcome.result.confidence, 0.0);
        assert_eq!(outcome.result.raw_text.as_deref(), Some("Pad Thai 120"));
        assert!(matches!(
            outcome.diagnostics.stages[1].outcome,
            StageOutcome::Failed { .. }
        ));
        assert_eq!(outcome.diagnostics.stages[2].state, ExtractionState::TertiaryRawReturn);
    }

    #[test]
    fn malformed_generative_output_is_not_repaired() {
        let secondary = Arc::new(MockGenerativeEngine::new(r#"[{"name": "Pad Thai", "price": 12"#));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_secondary(secondary);

        let outcome = orchestrator.process(MenuRequest::from_text("MENU").with_image(image()));

        assert_eq!(outcome.result.engine, ExtractionEngine::RawText);
        assert!(outcome
            .diagnostics
            .warnings
            .iter()
            .any(|w| w.contains("exhausted")));
    }

    #[test]
    fn slow_secondary_is_abandoned_at_budget() {
        let secondary = Arc::new(
            MockGenerativeEngine::new(GENERATIVE_MENU).with_delay(Duration::from_millis(500)),
        );
        let config = PipelineConfig {
            stage_timeout_ms: 20,
            ..PipelineConfig::default()
        };
        let orchestrator = MenuOrchestrator::new(config).with_secondary(secondary.clone());

        let outcome = orchestrator.process(MenuRequest::from_text("Pad Thai 120").with_image(image()));

        assert_eq!(secondary.calls(), 1, "no retry after timeout");
        assert_eq!(outcome.result.engine, ExtractionEngine::RawText);
        match &outcome.diagnostics.stages[1].outcome {
            StageOutcome::Failed { error } => assert!(error.contains("20 ms"), "got {error}"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn primary_engine_reads_image_when_no_text() {
        let primary = Arc::new(MockTextAcquisition::new(THAI_MENU, 0.9));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default()).with_primary(primary.clone());

        let outcome = orchestrator.process(MenuRequest::from_image(image()));

        assert_eq!(primary.calls(), 1);
        assert_eq!(outcome.result.engine, ExtractionEngine::Heuristic);
        assert_eq!(outcome.result.dishes.len(), 3);
        assert_eq!(outcome.diagnostics.stages[0].engine.as_deref(), Some("mock-ocr"));
    }

    #[test]
    fn primary_acquisition_failure_escalates() {
        let primary = Arc::new(MockTextAcquisition::failing(EngineError::Unavailable("no tesseract".into())));
        let secondary = Arc::new(MockGenerativeEngine::new(GENERATIVE_MENU));
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default())
            .with_primary(primary)
            .with_secondary(secondary.clone());

        let outcome = orchestrator.process(MenuRequest::from_image(image()));

        assert_eq!(secondary.calls(), 1);
        assert_eq!(outcome.result.engine, ExtractionEngine::Generative);
        assert_eq!(outcome.result.language, "en");
    }

    #[test]
    fn context_mismatch_escalates_with_distinct_reason() {
        let orchestrator = MenuOrchestrator::new(PipelineConfig::default());
        let text = "Tom Yum Goong 150\nPad Thai 120\nMargherita Pizza 300\nSpaghetti Carbonara 280";

        let outcome = orchestrator.process(MenuRequest::from_text(text));

        assert_eq!(
            outcome.diagnostics.stages[0].outcome,
            StageOutcome::Escalated {
                reason: EscalationReason::ContextMismatch
            }
        );
        assert_eq!(outcome.result.engine, ExtractionEngine::RawText);
        assert_eq!(outcome.result.raw_text.as_deref(), Some(text));
    }

    #[test]
    fn empty_request_still_returns_a_result() {
        let outcome = MenuOrchestrator::new(PipelineConfig::default()).process(MenuRequest::default());

        assert_eq!(outcome.result.engine, ExtractionEngine::RawText);
        assert_eq!(outcome.result.raw_text.as_deref(), Some(""));
        assert_eq!(outcome.result.language, "und");
        let states: Vec<_> = outcome.diagnostics.stages.iter().map(|s| s.state).collect();
        assert_eq!(
            states,
            vec![
                ExtractionState::PrimaryExtraction,
                ExtractionState::SecondaryExtraction,
                ExtractionState::TertiaryRawReturn
            ]
        );
    }
}
