//! Post-OCR artifact repair for menu lines.
//!
//! Two bounded transformations, applied per whitespace-separated token:
//! - numeric tokens: letters that OCR confuses with digits (`O`, `l`, `I`, `|`)
//!   are mapped back to digits, and a trailing `B` after digits becomes `฿`;
//! - dish words: fuzzy match against a small menu dictionary (edit distance 1,
//!   unique best match only). Words of five letters are corrected only for a
//!   single known OCR confusion; section and category keywords are never
//!   touched.

use super::category::is_category_keyword;
use super::dedup::edit_distance;

/// Shortest word corrected on edit distance alone.
const MIN_FREE_CORRECTION_LEN: usize = 6;

/// Character pairs OCR commonly swaps (read, intended).
const OCR_CONFUSIONS: &[(char, char)] = &[
    ('c', 'e'), ('e', 'c'), ('n', 'm'), ('m', 'n'), ('i', 'l'), ('l', 'i'), ('u', 'v'),
    ('v', 'u'), ('h', 'b'), ('b', 'h'), ('h', 'n'), ('n', 'h'), ('o', 'c'), ('c', 'o'),
    ('f', 't'), ('t', 'f'), ('a', 'o'),
];

/// Menu vocabulary for fuzzy correction.
/// Sorted for binary search. Must be lowercase.
const MENU_TERMS: &[&str] = &[
    "basil", "beef", "cashew", "chicken", "chili", "coconut", "crispy", "curry", "duck",
    "garlic", "ginger", "green", "grilled", "jasmine", "lemongrass", "mango", "mixed",
    "noodle", "noodles", "omelette", "oyster", "papaya", "peanut", "pepper", "pineapple",
    "prawn", "prawns", "salad", "sauce", "seafood", "shrimp", "spicy", "squid", "steamed",
    "sticky", "stir-fried", "sweet", "tamarind", "vegetable", "vegetables",
];

/// Apply OCR artifact repair to one line of menu text.
pub fn correct_ocr_artifacts(line: &str) -> String {
    line.split(' ')
        .map(correct_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn correct_token(token: &str) -> String {
    if let Some(fixed) = repair_numeric_token(token) {
        return fixed;
    }
    try_correct_word(token)
}

/// Map digit look-alikes back to digits when the token is clearly a number.
///
/// The token qualifies when it holds at least one real digit and every
/// character is a digit, a look-alike, or numeric punctuation. A trailing
/// `B`/`b` after digits is read as the baht sign.
fn repair_numeric_token(token: &str) -> Option<String> {
    let (body, baht_suffix) = match token.strip_suffix(['B', 'b']) {
        Some(rest) if rest.chars().last().is_some_and(|c| c.is_ascii_digit()) => (rest, true),
        _ => (token, false),
    };

    let digit_count = body.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count == 0 {
        return None;
    }
    let lookalikes = body
        .chars()
        .filter(|c| matches!(c, 'O' | 'o' | 'l' | 'I' | '|'))
        .count();
    let all_numeric = body
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, 'O' | 'o' | 'l' | 'I' | '|' | '.' | ',' | '/' | '-'));
    if !all_numeric || (lookalikes == 0 && !baht_suffix) {
        return None;
    }
    // "lo" alone is a word, not a number; require digits to dominate.
    if lookalikes > digit_count + 1 {
        return None;
    }

    let mut fixed: String = body
        .chars()
        .map(|c| match c {
            'O' | 'o' => '0',
            'l' | 'I' | '|' => '1',
            other => other,
        })
        .collect();
    if baht_suffix {
        fixed.push('฿');
    }
    Some(fixed)
}

/// Correct a single word against the menu dictionary.
fn try_correct_word(word: &str) -> String {
    if word.chars().count() < 5 || !word.chars().all(|c| c.is_ascii_alphabetic() || c == '-') {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if MENU_TERMS.binary_search(&lower.as_str()).is_ok() || is_category_keyword(&lower) {
        return word.to_string();
    }

    let mut best_term: Option<&str> = None;
    let mut best_distance = 2usize; // Only accept distance <= 1
    let mut ambiguous = false;

    for &term in MENU_TERMS {
        if lower.len().abs_diff(term.len()) > 1 {
            continue;
        }
        let dist = edit_distance(&lower, term);
        if dist < best_distance {
            best_distance = dist;
            best_term = Some(term);
            ambiguous = false;
        } else if dist == best_distance && best_term.is_some() {
            ambiguous = true;
        }
    }

    match best_term {
        Some(term) if !ambiguous && correction_allowed(&lower, term) => preserve_case(word, term),
        _ => word.to_string(),
    }
}

/// Long words take any distance-1 fix; shorter ones only a known confusion.
fn correction_allowed(word: &str, term: &str) -> bool {
    if word.chars().count() >= MIN_FREE_CORRECTION_LEN {
        return true;
    }
    if word.len() != term.len() {
        return false;
    }
    let mut diffs = word.chars().zip(term.chars()).filter(|(a, b)| a != b);
    match (diffs.next(), diffs.next()) {
        (Some(pair), None) => OCR_CONFUSIONS.contains(&pair),
        _ => false,
    }
}

/// Keep the original capitalization pattern when applying a correction.
fn preserve_case(original: &str, correction: &str) -> String {
    if original.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
        return correction.to_uppercase();
    }

    let first_upper = original.chars().next().is_some_and(|c| c.is_uppercase());
    if first_upper {
        let mut chars = correction.chars();
        match chars.next() {
            Some(c) => {
                let mut s = c.to_uppercase().to_string();
                s.extend(chars);
                s
            }
            None => correction.to_string(),
        }
    } else {
        correction.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repairs_digit_lookalikes_in_prices() {
        assert_eq!(correct_ocr_artifacts("Pad Thai l2O"), "Pad Thai 120");
        assert_eq!(correct_ocr_artifacts("Soup 8O/1OO"), "Soup 80/100");
    }

    #[test]
    fn trailing_b_after_digits_becomes_baht_sign() {
        assert_eq!(correct_ocr_artifacts("Fried Rice 70B"), "Fried Rice 70฿");
    }

    #[test]
    fn leaves_clean_numbers_alone() {
        assert_eq!(correct_ocr_artifacts("Tom Yum 95"), "Tom Yum 95");
        assert_eq!(correct_ocr_artifacts("120.50"), "120.50");
    }

    #[test]
    fn leaves_words_made_of_lookalikes() {
        assert_eq!(correct_ocr_artifacts("lo mein"), "lo mein");
        assert_eq!(correct_ocr_artifacts("Oolong Tea"), "Oolong Tea");
    }

    #[test]
    fn corrects_close_dish_words() {
        assert_eq!(correct_ocr_artifacts("Chickcn Curry"), "Chicken Curry");
        assert_eq!(correct_ocr_artifacts("SHRIMF"), "SHRIMP");
    }

    #[test]
    fn does_not_correct_short_or_unrelated_words() {
        assert_eq!(correct_ocr_artifacts("Pho Bo"), "Pho Bo");
        assert_eq!(correct_ocr_artifacts("Massaman"), "Massaman");
    }

    #[test]
    fn correctly_spelled_words_are_kept() {
        assert_eq!(correct_ocr_artifacts("Greek Salad"), "Greek Salad");
        assert_eq!(correct_ocr_artifacts("Spice Market Curry"), "Spice Market Curry");
        assert_eq!(correct_ocr_artifacts("SWEETS"), "SWEETS");
        assert_eq!(correct_ocr_artifacts("Desserts"), "Desserts");
    }

    #[test]
    fn five_letter_words_need_a_known_confusion() {
        assert_eq!(correct_ocr_artifacts("Grecn Curry"), "Green Curry");
        assert_eq!(correct_ocr_artifacts("Basjl"), "Basjl");
    }

    #[test]
    fn leaves_thai_text_untouched() {
        assert_eq!(correct_ocr_artifacts("ข้าวผัดกุ้ง 70"), "ข้าวผัดกุ้ง 70");
    }

    #[test]
    fn menu_terms_sorted() {
        for window in MENU_TERMS.windows(2) {
            assert!(
                window[0] < window[1],
                "MENU_TERMS not sorted: {:?} >= {:?}",
                window[0],
                window[1]
            );
        }
    }
}
