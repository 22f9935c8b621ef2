//! Dish–price association.
//!
//! Dish names and their prices are often split across lines by OCR. Every
//! candidate without a price on its own line is paired with the nearest
//! price-only group inside the window. Pairs are ranked globally by
//! (distance, group-before-candidate, candidate order) and assigned greedily,
//! so each price group serves at most one dish.

use serde::Serialize;

use super::category::{infer_category, DishCategory};
use super::classify::ClassifiedLine;
use super::confidence::{association_confidence, thresholds};
use super::price::resolve_group;
use super::types::{Currency, Dish, DishCandidate, LineClass, PriceGroup, PriceStatus};

/// Dishes built from candidates, plus the price-only groups nobody claimed.
#[derive(Debug, Clone, Serialize)]
pub struct Association {
    pub dishes: Vec<Dish>,
    pub unused_groups: Vec<PriceGroup>,
}

/// Split classified lines into dish candidates and free-standing price groups.
pub fn collect_candidates(
    lines: &[ClassifiedLine],
    fallback: Currency,
) -> (Vec<DishCandidate>, Vec<PriceGroup>) {
    let mut candidates = Vec::new();
    let mut groups = Vec::new();

    for line in lines {
        let index = line.classification.line_index;
        match line.classification.class {
            LineClass::DishCandidate => {
                let Some(name) = line.name.clone() else {
                    continue;
                };
                let own_prices = match (&line.scan.matched, line.scan.origin()) {
                    (Some(matched), Some(origin)) => {
                        Some(resolve_group(matched, index, origin, fallback))
                    }
                    _ => None,
                };
                candidates.push(DishCandidate {
                    name,
                    line_index: index,
                    rejected_price: own_prices.is_none() && !line.scan.rejected.is_empty(),
                    own_prices,
                    section: line.section,
                });
            }
            LineClass::PriceOnly => {
                if let (Some(matched), Some(origin)) = (&line.scan.matched, line.scan.origin()) {
                    groups.push(resolve_group(matched, index, origin, fallback));
                }
            }
            LineClass::Header | LineClass::Description => {}
        }
    }

    (candidates, groups)
}

/// Pair candidates with prices and build dishes in candidate order.
pub fn associate(candidates: Vec<DishCandidate>, groups: Vec<PriceGroup>, window: usize) -> Association {
    // (distance, before, candidate, group)
    let mut pairs: Vec<(usize, bool, usize, usize)> = Vec::new();
    for (ci, candidate) in candidates.iter().enumerate() {
        if candidate.own_prices.is_some() || candidate.rejected_price {
            continue;
        }
        for (gi, group) in groups.iter().enumerate() {
            let distance = candidate.line_index.abs_diff(group.line_index);
            if distance == 0 || distance > window {
                continue;
            }
            let before = group.line_index < candidate.line_index;
            pairs.push((distance, before, ci, gi));
        }
    }
    pairs.sort_unstable();

    let mut assigned: Vec<Option<(usize, usize)>> = vec![None; candidates.len()];
    let mut used = vec![false; groups.len()];
    for (distance, _, ci, gi) in pairs {
        if assigned[ci].is_some() || used[gi] {
            continue;
        }
        assigned[ci] = Some((gi, distance));
        used[gi] = true;
    }

    let dishes: Vec<Dish> = candidates
        .into_iter()
        .zip(assigned)
        .map(|(candidate, assignment)| build_dish(candidate, assignment.map(|(gi, d)| (&groups[gi], d))))
        .collect();

    let unused_groups: Vec<PriceGroup> = groups
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(g, _)| g.clone())
        .collect();

    Association { dishes, unused_groups }
}

fn build_dish(candidate: DishCandidate, nearby: Option<(&PriceGroup, usize)>) -> Dish {
    let category = categorize(&candidate.name, candidate.section);
    let line = Some(candidate.line_index);

    if let Some(own) = candidate.own_prices {
        let confidence = association_confidence(own.origin, 0);
        return Dish::priced(candidate.name, own.tokens, category, confidence, line);
    }
    if candidate.rejected_price {
        return Dish::unpriced(candidate.name, PriceStatus::OutOfBand, category, thresholds::UNPRICED, line);
    }
    match nearby {
        Some((group, distance)) => {
            let confidence = association_confidence(group.origin, distance);
            tracing::debug!(
                dish = %candidate.name,
                price_line = group.line_index,
                distance,
                confidence,
                "Price recovered from nearby line"
            );
            Dish::priced(candidate.name, group.tokens.clone(), category, confidence, line)
        }
        None => Dish::unpriced(candidate.name, PriceStatus::NotDetected, category, thresholds::UNPRICED, line),
    }
}

/// Name-based category, falling back to the menu section the dish sits under.
pub fn categorize(name: &str, section: Option<DishCategory>) -> DishCategory {
    match (infer_category(name), section) {
        (DishCategory::Main, Some(section)) => section,
        (category, _) => category,
    }
}
