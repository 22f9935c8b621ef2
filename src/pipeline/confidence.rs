use super::types::{Dish, PriceOrigin};

/// Confidence constants shared by the associator and the generative stage
pub mod thresholds {
    /// Price read on the dish's own line, or on a marked price line.
    pub const EXPLICIT_CEILING: f32 = 0.95;

    /// Price recovered from a bare adjacent number.
    pub const BARE_CEILING: f32 = 0.75;

    /// Fraction of the ceiling lost per line of distance.
    pub const DISTANCE_DECAY: f32 = 0.12;

    /// Dish kept without any reachable price.
    pub const UNPRICED: f32 = 0.40;

    /// Generative dish that did not report its own confidence.
    pub const GENERATIVE_DEFAULT: f32 = 0.70;
}

/// Association confidence for a price found `distance` lines away.
/// Strictly decreasing in distance within the association window.
pub fn association_confidence(origin: PriceOrigin, distance: usize) -> f32 {
    let ceiling = match origin {
        PriceOrigin::Explicit => thresholds::EXPLICIT_CEILING,
        PriceOrigin::Bare => thresholds::BARE_CEILING,
    };
    let decayed = ceiling * (1.0 - thresholds::DISTANCE_DECAY * distance as f32);
    round2(decayed.max(0.0))
}

/// Overall confidence: mean of dish confidences, rounded to two decimals.
/// An empty list yields zero.
pub fn aggregate_confidence(dishes: &[Dish]) -> f32 {
    if dishes.is_empty() {
        return 0.0;
    }
    let sum: f32 = dishes.iter().map(|d| d.confidence).sum();
    round2(sum / dishes.len() as f32)
}

/// Clamp to [0, 1] and round to two decimals.
pub fn round2(value: f32) -> f32 {
    (value.clamp(0.0, 1.0) * 100.0).round() / 100.0
}
