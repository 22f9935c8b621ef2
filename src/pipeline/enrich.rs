//! Optional decoration of accepted dishes with spice and dietary hints.
//!
//! Runs after the pipeline on its final output and never feeds back into
//! extraction, escalation or confidence.

use serde::Serialize;

use super::category::mentions_any;
use super::types::Dish;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DietaryFlag {
    Vegetarian,
    Seafood,
    ContainsPork,
    ContainsBeef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DishProfile {
    /// 0 (none) to 3 (very hot).
    pub spice_level: u8,
    pub dietary: Vec<DietaryFlag>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDish {
    #[serde(flatten)]
    pub dish: Dish,
    pub profile: DishProfile,
}

/// Per-dish analyzer consulted after extraction.
pub trait DishAnalyzer: Send + Sync {
    fn analyze(&self, name: &str) -> DishProfile;
}

/// Analyzer that knows nothing.
pub struct NoopAnalyzer;

impl DishAnalyzer for NoopAnalyzer {
    fn analyze(&self, _name: &str) -> DishProfile {
        DishProfile::default()
    }
}

const MAX_SPICE: u8 = 3;

const SPICY_WORDS: &[&str] = &["spicy", "hot", "chili", "chilli", "jalapeno", "vindaloo", "เผ็ด", "พริก"];
const VERY_SPICY_WORDS: &[&str] = &["extra spicy", "very spicy", "เผ็ดมาก"];
const VEGETARIAN_WORDS: &[&str] = &["vegetarian", "vegan", "veggie", "tofu", "เจ", "มังสวิรัติ", "เต้าหู้"];
const SEAFOOD_WORDS: &[&str] = &[
    "shrimp", "prawn", "prawns", "crab", "squid", "fish", "seafood", "mussel", "mussels", "oyster",
    "salmon", "tuna", "goong", "กุ้ง", "ปู", "ปลา", "หมึก", "ทะเล", "หอย",
];
const PORK_WORDS: &[&str] = &["pork", "bacon", "ham", "moo", "หมู"];
const BEEF_WORDS: &[&str] = &["beef", "steak", "wagyu", "neua", "เนื้อ"];

/// Keyword-based analyzer over English and Thai dish names.
pub struct KeywordAnalyzer;

impl DishAnalyzer for KeywordAnalyzer {
    fn analyze(&self, name: &str) -> DishProfile {
        let chilies = name.matches('🌶').count() as u8;
        let mut spice_level = chilies.min(MAX_SPICE);
        if mentions_any(name, VERY_SPICY_WORDS) {
            spice_level = MAX_SPICE;
        } else if spice_level == 0 && mentions_any(name, SPICY_WORDS) {
            spice_level = 1;
        }

        let mut dietary = Vec::new();
        if mentions_any(name, VEGETARIAN_WORDS) {
            dietary.push(DietaryFlag::Vegetarian);
        }
        if mentions_any(name, SEAFOOD_WORDS) {
            dietary.push(DietaryFlag::Seafood);
        }
        if mentions_any(name, PORK_WORDS) {
            dietary.push(DietaryFlag::ContainsPork);
        }
        if mentions_any(name, BEEF_WORDS) {
            dietary.push(DietaryFlag::ContainsBeef);
        }

        let mut tags = Vec::new();
        if spice_level > 0 {
            tags.push("spicy".to_string());
        }
        if dietary.contains(&DietaryFlag::Vegetarian)
            && !dietary.iter().any(|f| *f != DietaryFlag::Vegetarian)
        {
            tags.push("meat_free".to_string());
        }

        DishProfile {
            spice_level,
            dietary,
            tags,
        }
    }
}

/// Decorate each dish with its analyzer profile. Order and dishes are unchanged.
pub fn enrich_dishes(dishes: &[Dish], analyzer: &dyn DishAnalyzer) -> Vec<EnrichedDish> {
    dishes
        .iter()
        .map(|dish| EnrichedDish {
            profile: analyzer.analyze(&dish.name),
            dish: dish.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::DishCategory;
    use crate::pipeline::types::PriceStatus;

    fn dish(name: &str) -> Dish {
        Dish::unpriced(name.to_string(), PriceStatus::NotDetected, DishCategory::Main, 0.4, None)
    }

    #[test]
    fn noop_returns_empty_profile() {
        assert_eq!(NoopAnalyzer.analyze("Tom Yum Goong"), DishProfile::default());
    }

    #[test]
    fn chili_markers_set_spice_level() {
        assert_eq!(KeywordAnalyzer.analyze("Green Curry 🌶🌶").spice_level, 2);
        assert_eq!(KeywordAnalyzer.analyze("Jungle Curry 🌶🌶🌶🌶").spice_level, 3);
        assert_eq!(KeywordAnalyzer.analyze("Spicy Basil Chicken").spice_level, 1);
        assert_eq!(KeywordAnalyzer.analyze("ผัดกะเพราเผ็ดมาก").spice_level, 3);
        assert_eq!(KeywordAnalyzer.analyze("Mango Sticky Rice").spice_level, 0);
    }

    #[test]
    fn dietary_flags_detected() {
        let profile = KeywordAnalyzer.analyze("Tofu Pad Thai");
        assert_eq!(profile.dietary, vec![DietaryFlag::Vegetarian]);
        assert!(profile.tags.contains(&"meat_free".to_string()));

        let profile = KeywordAnalyzer.analyze("ต้มยำกุ้ง");
        assert_eq!(profile.dietary, vec![DietaryFlag::Seafood]);

        let profile = KeywordAnalyzer.analyze("Pork Fried Rice with Shrimp");
        assert_eq!(profile.dietary, vec![DietaryFlag::Seafood, DietaryFlag::ContainsPork]);
        assert!(profile.tags.is_empty());
    }

    #[test]
    fn whole_words_only_for_latin_keywords() {
        // "hot" inside "Shot"
        let profile = KeywordAnalyzer.analyze("Espresso Shot");
        assert_eq!(profile, DishProfile::default());
    }

    #[test]
    fn enrichment_keeps_dishes_in_order() {
        let dishes = vec![dish("Spicy Beef Salad"), dish("Iced Tea")];
        let enriched = enrich_dishes(&dishes, &KeywordAnalyzer);
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].dish, dishes[0]);
        assert_eq!(enriched[0].profile.dietary, vec![DietaryFlag::ContainsBeef]);
        assert_eq!(enriched[1].profile, DishProfile::default());
    }

    #[test]
    fn enriched_dish_serializes_flat() {
        let enriched = enrich_dishes(&[dish("Tofu Curry")], &KeywordAnalyzer);
        let json = serde_json::to_string(&enriched[0]).unwrap();
        assert!(json.contains(r#""name":"Tofu Curry""#), "got {json}");
        assert!(json.contains(r#""dietary":["vegetarian"]"#), "got {json}");
    }
}
