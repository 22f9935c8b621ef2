// Post-extraction validation for dishes from either engine.
// Removes structurally implausible names, hallucinated lettered variants and
// out-of-band prices, then checks that the survivors read as one coherent menu.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::category::{cuisine_signals, Cuisine};
use super::dedup::normalize_name;
use super::types::{Dish, PriceStatus};
use crate::pipeline_config::PipelineConfig;

static ARTIFACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:(?:menu\s+)?(?:item|dish|product|entry)(?:\s*#?\s*\d+|\s+[a-z])|n/?a|unknown(?:\s+dish)?|none|null|undefined|tbd|example(?:\s+dish)?|sample(?:\s+dish)?|lorem ipsum.*|dish name|name)$",
    )
    .unwrap()
});

/// Why a dish was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    NameTooShort,
    NameTooLong,
    RepeatedCharacters,
    RepeatedTokens,
    ArtifactName,
    LetteredVariant,
    PriceOutOfBand,
    OverCap,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedDish {
    pub name: String,
    pub reason: RejectionReason,
}

/// Two mutually exclusive cuisines each anchored by enough dishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ContextMismatch {
    pub anchor: Cuisine,
    pub conflicting: Cuisine,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub dishes: Vec<Dish>,
    pub rejected: Vec<RejectedDish>,
    /// Set when the accepted set mixes exclusive cuisines; the whole result
    /// is then invalid even though `dishes` is filled.
    pub mismatch: Option<ContextMismatch>,
}

/// Validate dishes: per-dish filters, hallucinated variants, menu context, cap.
pub fn validate_dishes(dishes: Vec<Dish>, config: &PipelineConfig) -> ValidationResult {
    let mut rejected = Vec::new();

    // 1. Structural name checks and price bounds
    let mut kept: Vec<Dish> = Vec::with_capacity(dishes.len());
    for dish in dishes {
        let reason = structural_rejection(&dish.name, config).or_else(|| price_rejection(&dish, config));
        match reason {
            Some(reason) => {
                tracing::debug!(dish = %dish.name, reason = ?reason, "Dish rejected");
                rejected.push(RejectedDish { name: dish.name, reason });
            }
            None => kept.push(dish),
        }
    }

    // 2. Generative lettered variants of an accepted base name
    let variants = lettered_variants(&kept, config.min_variant_siblings);
    if !variants.is_empty() {
        let mut survivors = Vec::with_capacity(kept.len());
        for (i, dish) in kept.into_iter().enumerate() {
            if variants.contains(&i) {
                tracing::debug!(dish = %dish.name, "Lettered variant rejected");
                rejected.push(RejectedDish {
                    name: dish.name,
                    reason: RejectionReason::LetteredVariant,
                });
            } else {
                survivors.push(dish);
            }
        }
        kept = survivors;
    }

    // 3. Menu-context consistency
    let mismatch = check_menu_context(&kept, config.min_cuisine_anchors);

    // 4. Cap, dropping lowest confidence and keeping order
    let kept = cap_dishes(kept, config.max_dishes, &mut rejected);

    if !rejected.is_empty() {
        tracing::info!(
            kept = kept.len(),
            rejected = rejected.len(),
            "Dish validation removed entries"
        );
    }

    ValidationResult {
        dishes: kept,
        rejected,
        mismatch,
    }
}

fn structural_rejection(name: &str, config: &PipelineConfig) -> Option<RejectionReason> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < config.min_name_chars {
        return Some(RejectionReason::NameTooShort);
    }
    if len > config.max_name_chars {
        return Some(RejectionReason::NameTooLong);
    }
    if longest_char_run(trimmed) > config.max_char_run {
        return Some(RejectionReason::RepeatedCharacters);
    }
    if has_repeated_tokens(trimmed) {
        return Some(RejectionReason::RepeatedTokens);
    }
    if ARTIFACT_NAME.is_match(trimmed) || trimmed.contains(['{', '}', '[', ']', '<', '>']) {
        return Some(RejectionReason::ArtifactName);
    }
    None
}

fn price_rejection(dish: &Dish, config: &PipelineConfig) -> Option<RejectionReason> {
    if dish.price_status == PriceStatus::OutOfBand {
        return Some(RejectionReason::PriceOutOfBand);
    }
    let out_of_band = dish.prices.iter().any(|p| {
        p.amount <= 0.0
            || p.amount > config.max_price
            || p.max_amount.is_some_and(|m| m <= 0.0 || m > config.max_price)
    });
    out_of_band.then_some(RejectionReason::PriceOutOfBand)
}

/// Longest run of one repeated non-space character.
fn longest_char_run(name: &str) -> usize {
    let mut longest = 0usize;
    let mut run = 0usize;
    let mut prev: Option<char> = None;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            run = 0;
            prev = None;
            continue;
        }
        if Some(c) == prev {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        longest = longest.max(run);
    }
    longest
}

/// "Pad Pad Thai", "Soup Soup": the same word twice in a row.
fn has_repeated_tokens(name: &str) -> bool {
    let words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    words.windows(2).any(|w| w[0] == w[1] && w[0].chars().any(char::is_alphabetic))
}

/// Indices of dishes that are lettered variants of another accepted dish.
///
/// A name `Base <suffix>` is a variant when `Base` is itself accepted and the
/// suffix holds a standalone single capital letter or digit ("A", "2"). A base
/// needs at least `min_siblings` such variants before any are rejected.
fn lettered_variants(dishes: &[Dish], min_siblings: usize) -> Vec<usize> {
    let normalized: Vec<String> = dishes.iter().map(|d| normalize_name(&d.name)).collect();
    let mut by_word_count: Vec<(usize, usize)> = normalized
        .iter()
        .enumerate()
        .map(|(i, n)| (n.split(' ').count(), i))
        .collect();
    by_word_count.sort_unstable();

    let mut siblings: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (i, dish) in dishes.iter().enumerate() {
        let name = &normalized[i];
        // Shortest accepted name this one extends.
        let base = by_word_count.iter().find(|(_, b)| {
            *b != i && {
                let base_name = &normalized[*b];
                name.len() > base_name.len()
                    && name.starts_with(base_name.as_str())
                    && name[base_name.len()..].starts_with(' ')
            }
        });
        let Some(&(base_words, base_idx)) = base else {
            continue;
        };
        let has_letter_token = dish
            .name
            .split_whitespace()
            .skip(base_words)
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
            .any(is_variant_token);
        if has_letter_token {
            siblings.entry(base_idx).or_default().push(i);
        }
    }

    let mut out: Vec<usize> = siblings
        .into_values()
        .filter(|v| v.len() >= min_siblings)
        .flatten()
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}

fn is_variant_token(token: &str) -> bool {
    let mut chars = token.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(c), None) if c.is_ascii_uppercase() || c.is_ascii_digit()
    )
}

/// Detect two mutually exclusive cuisines anchoring the same dish list.
///
/// Each cuisine must be signalled by at least `min_anchors` dishes. The
/// strongest cuisine is the anchor; ties go to declaration order.
pub fn check_menu_context(dishes: &[Dish], min_anchors: usize) -> Option<ContextMismatch> {
    let mut counts: HashMap<Cuisine, usize> = HashMap::new();
    for dish in dishes {
        for cuisine in cuisine_signals(&dish.name) {
            *counts.entry(cuisine).or_insert(0) += 1;
        }
    }

    let mut strong: Vec<(Cuisine, usize)> = counts
        .into_iter()
        .filter(|(_, n)| *n >= min_anchors.max(1))
        .collect();
    strong.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let (anchor, _) = *strong.first()?;
    strong
        .iter()
        .find(|(c, _)| c.is_exclusive_with(&anchor))
        .map(|(conflicting, _)| ContextMismatch {
            anchor,
            conflicting: *conflicting,
        })
}

fn cap_dishes(dishes: Vec<Dish>, max: usize, rejected: &mut Vec<RejectedDish>) -> Vec<Dish> {
    if dishes.len() <= max {
        return dishes;
    }
    let mut ranked: Vec<usize> = (0..dishes.len()).collect();
    ranked.sort_by(|&a, &b| {
        dishes[b]
            .confidence
            .total_cmp(&dishes[a].confidence)
            .then(a.cmp(&b))
    });
    let mut keep = vec![false; dishes.len()];
    for &i in ranked.iter().take(max) {
        keep[i] = true;
    }

    tracing::warn!(
        total = dishes.len(),
        cap = max,
        "Excessive dish count capped"
    );

    let mut out = Vec::with_capacity(max);
    for (dish, keep) in dishes.into_iter().zip(keep) {
        if keep {
            out.push(dish);
        } else {
            rejected.push(RejectedDish {
                name: dish.name,
                reason: RejectionReason::OverCap,
            });
        }
    }
    out
}
