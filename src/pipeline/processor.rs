//! Stage runners.
//!
//! `run_heuristic_stage` takes recognized text through classification, price
//! extraction, association, deduplication, validation and aggregation.
//! `run_generative_stage` takes already-structured dishes from a generative
//! engine through normalization, deduplication, validation and aggregation.
//! Both return `MenuError` for outcomes the orchestrator escalates on.

use serde::Serialize;

use super::associate::{associate, categorize, collect_candidates};
use super::category::DishCategory;
use super::classify::{classify_lines, clean_dish_name};
use super::confidence::{aggregate_confidence, round2, thresholds};
use super::dedup::deduplicate_dishes;
use super::diagnostic::Diagnostics;
use super::language_detect::detect_language;
use super::ocr_correction::correct_ocr_artifacts;
use super::price::{dominant_currency, dominant_of, resolve_currency, PriceBand};
use super::sanitize::split_raw_lines;
use super::types::{Currency, Dish, GenerativeDish, PriceStatus, PriceToken, RawLine};
use super::validation::validate_dishes;
use super::MenuError;
use crate::pipeline_config::PipelineConfig;

/// Accepted output of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutput {
    pub dishes: Vec<Dish>,
    pub confidence: f32,
    pub language: String,
}

/// Run the heuristic pipeline over recognized menu text.
pub fn run_heuristic_stage(
    text: &str,
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) -> Result<StageOutput, MenuError> {
    let raw_lines = split_raw_lines(text);
    if raw_lines.is_empty() {
        return Err(MenuError::NoTextDetected);
    }

    let lines: Vec<RawLine> = raw_lines
        .iter()
        .map(|l| RawLine::new(l.index, correct_ocr_artifacts(&l.text)))
        .collect();
    let joined = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n");
    let language = detect_language(&joined);

    let classified = classify_lines(&lines, config);
    diag.record_lines(&classified);

    let dominant = dominant_currency(classified.iter().map(|c| &c.scan));
    let fallback = resolve_currency(dominant, config.default_currency, &language);

    let (candidates, groups) = collect_candidates(&classified, fallback);
    tracing::debug!(
        lines = lines.len(),
        candidates = candidates.len(),
        price_groups = groups.len(),
        currency = fallback.as_str(),
        "Lines classified"
    );

    let association = associate(candidates, groups, config.association_window);
    diag.record_unused_groups(&association.unused_groups);

    finish(association.dishes, language, config, diag)
}

/// Run validation over dishes already structured by a generative engine.
pub fn run_generative_stage(
    dishes: &[GenerativeDish],
    language_hint: &str,
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) -> Result<StageOutput, MenuError> {
    let names = dishes.iter().map(|d| d.name.as_str()).collect::<Vec<_>>().join("\n");
    let language = match detect_language(&names).as_str() {
        "und" => language_hint.to_string(),
        detected => detected.to_string(),
    };

    let dominant = dominant_of(
        dishes
            .iter()
            .filter_map(|d| d.currency.as_deref().and_then(Currency::from_marker)),
    );
    let fallback = resolve_currency(dominant, config.default_currency, &language);
    let band = PriceBand::primary(config);

    let converted: Vec<Dish> = dishes
        .iter()
        .map(|d| convert_generative(d, fallback, &band))
        .collect();

    finish(converted, language, config, diag)
}

fn convert_generative(dish: &GenerativeDish, fallback: Currency, band: &PriceBand) -> Dish {
    let name = clean_dish_name(&dish.name);
    let category = dish
        .category
        .as_deref()
        .and_then(DishCategory::from_label)
        .unwrap_or_else(|| categorize(&name, None));
    let confidence = round2(dish.confidence.unwrap_or(thresholds::GENERATIVE_DEFAULT));

    match dish.price {
        Some(amount) if band.contains(amount) => {
            let currency = dish
                .currency
                .as_deref()
                .and_then(Currency::from_marker)
                .unwrap_or(fallback);
            let token = PriceToken {
                amount,
                max_amount: None,
                currency,
                size: None,
                multi_size: false,
            };
            Dish::priced(name, vec![token], category, confidence, None)
        }
        Some(_) => Dish::unpriced(name, PriceStatus::OutOfBand, category, confidence, None),
        None => Dish::unpriced(name, PriceStatus::NotDetected, category, confidence, None),
    }
}

/// Shared tail: dedup, validation, aggregation.
fn finish(
    dishes: Vec<Dish>,
    language: String,
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) -> Result<StageOutput, MenuError> {
    let deduped = deduplicate_dishes(dishes, config.similarity_threshold);
    if deduped.merged > 0 {
        diag.warn(format!("{} near-duplicate dishes merged", deduped.merged));
    }

    let validated = validate_dishes(deduped.dishes, config);
    for rejected in &validated.rejected {
        diag.warn(format!("dish {:?} rejected: {:?}", rejected.name, rejected.reason));
    }

    if let Some(mismatch) = validated.mismatch {
        return Err(MenuError::MenuContextMismatch {
            anchor: mismatch.anchor,
            conflicting: mismatch.conflicting,
        });
    }
    if validated.dishes.is_empty() {
        return Err(MenuError::NoDishesAfterValidation);
    }

    let confidence = aggregate_confidence(&validated.dishes);
    Ok(StageOutput {
        dishes: validated.dishes,
        confidence,
        language,
    })
}
