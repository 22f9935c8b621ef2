//! Near-duplicate dish merging.
//!
//! OCR often reads the same dish twice with small differences ("Fried Rice",
//! "Fried Ricee"). Names are normalized, compared by normalized Levenshtein
//! similarity, and the higher-confidence entry of each duplicate pair is kept.
//! Comparison is all-pairs against the accepted set; menus hold tens of dishes.

use super::category::is_thai;
use super::types::Dish;

/// Outcome of deduplication: surviving dishes plus how many entries were merged.
#[derive(Debug, Clone)]
pub struct DedupResult {
    pub dishes: Vec<Dish>,
    pub merged: usize,
}

/// Merge near-duplicate dishes.
///
/// Two names are the same dish when their normalized forms are identical or
/// their similarity exceeds `threshold`. The higher-confidence entry wins and
/// takes the position of the first-seen one; ties keep the first-seen entry.
pub fn deduplicate_dishes(dishes: Vec<Dish>, threshold: f64) -> DedupResult {
    let mut accepted: Vec<(String, Dish)> = Vec::with_capacity(dishes.len());
    let mut merged = 0usize;

    for dish in dishes {
        let key = normalize_name(&dish.name);
        let existing = accepted
            .iter()
            .position(|(other, _)| {
                *other == key
                    || (!differs_by_variant_token(other, &key) && name_similarity(other, &key) > threshold)
            });

        match existing {
            Some(pos) => {
                merged += 1;
                let (_, kept) = &accepted[pos];
                if dish.confidence > kept.confidence {
                    tracing::debug!(
                        kept = %dish.name,
                        dropped = %kept.name,
                        "Duplicate dish replaced by higher-confidence variant"
                    );
                    accepted[pos] = (key, dish);
                } else {
                    tracing::debug!(
                        kept = %kept.name,
                        dropped = %dish.name,
                        "Duplicate dish dropped"
                    );
                }
            }
            None => accepted.push((key, dish)),
        }
    }

    DedupResult {
        dishes: accepted.into_iter().map(|(_, d)| d).collect(),
        merged,
    }
}

/// Normalize a dish name for comparison: lowercase, punctuation removed,
/// whitespace collapsed. Thai combining marks are kept.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || is_thai(c) {
                c
            } else {
                ' '
            }
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// "Set Menu A" and "Set Menu B" are separate items, not OCR noise: the
/// names differ only in tokens that are a single letter or digit.
fn differs_by_variant_token(a: &str, b: &str) -> bool {
    let a_words: Vec<&str> = a.split(' ').collect();
    let b_words: Vec<&str> = b.split(' ').collect();
    if a_words.len() != b_words.len() {
        return false;
    }
    let mut differs = false;
    for (x, y) in a_words.iter().zip(&b_words) {
        if x == y {
            continue;
        }
        if x.chars().count() != 1 || y.chars().count() != 1 {
            return false;
        }
        differs = true;
    }
    differs
}

/// Similarity in [0, 1]: `1 - distance / max_len` over characters.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - edit_distance(a, b) as f64 / max_len as f64
}

/// Levenshtein edit distance between two strings, over characters.
pub(crate) fn edit_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 { return n; }
    if n == 0 { return m; }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = usize::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1)
                .min(curr[j] + 1)
                .min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::category::DishCategory;
    use crate::pipeline::types::{Currency, PriceToken};

    fn dish(name: &str, confidence: f32) -> Dish {
        Dish::priced(
            name.into(),
            vec![PriceToken {
                amount: 80.0,
                max_amount: None,
                currency: Currency::Baht,
                size: None,
                multi_size: false,
            }],
            DishCategory::Main,
            confidence,
            None,
        )
    }

    #[test]
    fn single_stray_character_collapses_to_higher_confidence() {
        let result = deduplicate_dishes(
            vec![dish("Fried Rice", 0.70), dish("Fried Ricee", 0.90)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 1);
        assert_eq!(result.dishes[0].name, "Fried Ricee");
        assert_eq!(result.merged, 1);
    }

    #[test]
    fn higher_confidence_first_entry_is_kept() {
        let result = deduplicate_dishes(
            vec![dish("Green Curry Chicken", 0.95), dish("Green Curry Chickem", 0.60)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 1);
        assert_eq!(result.dishes[0].name, "Green Curry Chicken");
    }

    #[test]
    fn ties_keep_first_seen() {
        let result = deduplicate_dishes(
            vec![dish("Pad See Ew", 0.80), dish("Pad See Ew.", 0.80)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 1);
        assert_eq!(result.dishes[0].name, "Pad See Ew");
    }

    #[test]
    fn punctuation_and_case_only_differences_are_identical() {
        let result = deduplicate_dishes(
            vec![dish("TOM YUM - KUNG", 0.80), dish("tom yum kung", 0.85)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 1);
        assert_eq!(result.dishes[0].name, "tom yum kung");
    }

    #[test]
    fn dissimilar_names_are_not_merged() {
        let result = deduplicate_dishes(
            vec![dish("Fried Rice", 0.80), dish("Fried Fish", 0.80), dish("Tom Yum", 0.8)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 3);
        assert_eq!(result.merged, 0);
    }

    #[test]
    fn similarity_below_threshold_not_merged() {
        // "tom yum" vs "tom kha": distance 3 of 7 → 0.57
        let sim = name_similarity("tom yum", "tom kha");
        assert!(sim < 0.85, "similarity {sim}");
        let result = deduplicate_dishes(vec![dish("Tom Yum", 0.8), dish("Tom Kha", 0.9)], 0.85);
        assert_eq!(result.dishes.len(), 2);
    }

    #[test]
    fn replacement_keeps_original_position() {
        let result = deduplicate_dishes(
            vec![
                dish("Spring Rolls", 0.6),
                dish("Satay", 0.8),
                dish("Spring Rols", 0.9),
            ],
            0.85,
        );
        let names: Vec<_> = result.dishes.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Spring Rols", "Satay"]);
    }

    #[test]
    fn lettered_items_are_not_duplicates() {
        let result = deduplicate_dishes(
            vec![dish("Combo Set A", 0.8), dish("Combo Set B", 0.9), dish("Combo Set 2", 0.9)],
            0.85,
        );
        assert_eq!(result.dishes.len(), 3);
    }

    #[test]
    fn normalize_keeps_thai_marks() {
        assert_eq!(normalize_name("ต้มยำ-กุ้ง!"), "ต้มยำ กุ้ง");
        assert_eq!(normalize_name("  Pad   Thai. "), "pad thai");
    }

    #[test]
    fn edit_distance_basic() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("abc", "abc"), 0);
        assert_eq!(edit_distance("ต้มยำ", "ต้มยา"), 1);
    }
}
