//! Line classifier.
//!
//! Decides, per line, whether it names a dish, carries only a price, is
//! header/noise, or is description text. Checks run in a fixed order:
//! noise heuristics first, then price detectability, then dish-name
//! plausibility on whatever text the price scan left behind.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::category::{is_thai, mentions_any, section_from_header, DishCategory};
use super::language_detect::has_script_letters;
use super::price::{looks_like_date, scan_line, LineScan, PriceBand};
use super::types::{LineClass, LineClassification, RawLine};
use crate::pipeline_config::PipelineConfig;

/// Longest dish name, in words. Longer lines read as descriptions.
const MAX_NAME_WORDS: usize = 8;

const DECORATIVE: &[char] = &[
    '★', '☆', '•', '◆', '◇', '■', '□', '●', '○', '~', '=', '*', '#', '-', '_', '—', '–', '♦',
    '❖', '✦', '✧', '|', '+', '·', '…', '.', '♥', '❤',
];

const BOILERPLATE_LINES: &[&str] = &[
    "menu", "our menu", "food menu", "drink menu", "the menu", "เมนู", "รายการอาหาร",
];

const BOILERPLATE_PHRASES: &[&str] = &[
    "thank you", "welcome", "wifi", "wi fi", "password", "service charge", "vat", "all prices",
    "prices include", "prices are", "ขอบคุณ", "ยินดีต้อนรับ", "ไม่รวม", "บริการ",
];

const BRAND_WORDS: &[&str] = &[
    "restaurant", "cafe", "café", "bistro", "kitchen", "eatery", "diner", "ร้าน", "ภัตตาคาร",
];

const ADDRESS_WORDS: &[&str] = &[
    "road", "street", "avenue", "soi", "district", "province", "floor", "building", "ถนน",
    "ซอย", "แขวง", "ตำบล", "อำเภอ", "จังหวัด",
];

const PHONE_WORDS: &[&str] = &["tel", "phone", "call", "line id", "โทร"];

const HOURS_WORDS: &[&str] = &[
    "open", "opening", "hours", "daily", "closed", "เปิด", "เวลา",
];

const GENERIC_WORDS: &[&str] = &[
    "price", "prices", "total", "size", "sizes", "small", "medium", "large", "regular",
    "special", "specials", "new", "hot", "cold", "iced", "set", "add", "extra", "option",
    "options", "each", "per", "item", "items", "recommended", "ราคา", "พิเศษ", "ธรรมดา",
    "แนะนำ",
];

const PROMO_PHRASES: &[&str] = &[
    "buy 1 get 1", "buy one get one", "discount", "promotion", "promo", "happy hour",
    "limited time", "free flow", "โปรโมชั่น", "ลดราคา", "แถม",
];

const DESCRIPTION_PHRASES: &[&str] = &[
    "served with", "comes with", "choice of", "topped with", "your choice", "includes",
    "เสิร์ฟพร้อม",
];

static PHONE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-().]{7,}\d").unwrap());

static TIME_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,2}:\d{2}\b|\b\d{1,2}(?::\d{2})?\s*(?:am|pm)\b")
        .unwrap()
});

static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[\s\-–]*(?:page|pg\.?|p\.)\s*\d{1,3}(?:\s*(?:/|of)\s*\d{1,3})?[\s\-–]*$|^[\s\-–]*หน้า\s*\d{1,3}[\s\-–]*$")
        .unwrap()
});

static ITEM_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i:no\.?\s*)?\d{1,3}\s*[.):\-]\s*").unwrap());

/// Classifier output for one line, with the price scan it was based on.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedLine {
    pub classification: LineClassification,
    pub text: String,
    pub scan: LineScan,
    /// Cleaned dish name; set for `DishCandidate` lines only.
    pub name: Option<String>,
    /// Menu section the line sits under.
    pub section: Option<DishCategory>,
}

/// Classify every line, tracking the active menu section.
///
/// An unpriced line that starts lowercase (or with `(`) right after a dish
/// line continues that dish's description.
pub fn classify_lines(lines: &[RawLine], config: &PipelineConfig) -> Vec<ClassifiedLine> {
    let mut section: Option<DishCategory> = None;
    let mut follows_dish = false;
    lines
        .iter()
        .map(|line| {
            let mut classified = classify_line(line, config);
            if follows_dish && is_continuation(&classified) {
                classified.classification.class = LineClass::Description;
                classified.classification.reason = "continuation text".to_string();
                classified.name = None;
            }
            follows_dish = classified.classification.class == LineClass::DishCandidate
                || classified.classification.reason == "continuation text";
            if let Some(header_section) = classified.classification.section {
                section = Some(header_section);
            }
            classified.section = section;
            tracing::trace!(
                line = line.index,
                class = ?classified.classification.class,
                reason = %classified.classification.reason,
                "Line classified"
            );
            classified
        })
        .collect()
}

/// Classify a single line.
pub fn classify_line(line: &RawLine, config: &PipelineConfig) -> ClassifiedLine {
    let band = PriceBand::primary(config);
    let bare_band = PriceBand::bare(config);
    let scan = scan_line(&line.text, &band, &bare_band);

    let verdict = |class: LineClass, reason: &str, section: Option<DishCategory>| LineClassification {
        class,
        line_index: line.index,
        reason: reason.to_string(),
        section,
    };

    let (classification, name) = if let Some(reason) = noise_reason(&line.text) {
        (verdict(LineClass::Header, reason, None), None)
    } else if let Some(category) = section_from_header(&line.text) {
        (verdict(LineClass::Header, "section header", Some(category)), None)
    } else if !has_script_letters(&scan.residual) {
        if scan.matched.is_some() {
            (verdict(LineClass::PriceOnly, "price only", None), None)
        } else if has_script_letters(&line.text) {
            (verdict(LineClass::Description, "no script text", None), None)
        } else {
            (verdict(LineClass::Header, "numeric noise", None), None)
        }
    } else {
        let name = clean_dish_name(&scan.residual);
        match implausible_name_reason(&name, config) {
            Some(reason) => (verdict(LineClass::Description, reason, None), None),
            None => (verdict(LineClass::DishCandidate, "dish name", None), Some(name)),
        }
    };

    ClassifiedLine {
        classification,
        text: line.text.clone(),
        scan,
        name,
        section: None,
    }
}

fn is_continuation(classified: &ClassifiedLine) -> bool {
    classified.classification.class == LineClass::DishCandidate
        && classified.scan.matched.is_none()
        && classified
            .name
            .as_deref()
            .is_some_and(|name| name.starts_with(|c: char| c.is_ascii_lowercase() || c == '('))
}

/// Header and noise heuristics, checked before anything else.
fn noise_reason(text: &str) -> Option<&'static str> {
    if text.chars().count() < 3 {
        return Some("too short");
    }
    let has_letters = text.chars().any(|c| c.is_alphabetic() || is_thai(c));
    let has_digits = text.chars().any(|c| c.is_ascii_digit());
    if !has_letters && !has_digits {
        return Some("decorative");
    }
    if section_from_header(text).is_some() {
        return None;
    }
    if is_framed(text) && !has_digits {
        return Some("decorative banner");
    }
    let phone_digits = PHONE_SHAPE
        .find_iter(text)
        .map(|m| m.as_str().bytes().filter(u8::is_ascii_digit).count())
        .max()
        .unwrap_or(0);
    if phone_digits >= 9 || (has_digits && mentions_any(text, PHONE_WORDS)) {
        return Some("phone number");
    }
    if PAGE_NUMBER.is_match(text) {
        return Some("page number");
    }
    if TIME_SHAPE.is_match(text)
        || looks_like_date(text)
        || (!has_digits && mentions_any(text, HOURS_WORDS))
    {
        return Some("opening hours or date");
    }
    if mentions_any(text, ADDRESS_WORDS) {
        return Some("address");
    }
    let normalized = text
        .trim_matches(|c: char| !c.is_alphanumeric() && !is_thai(c))
        .to_lowercase();
    if BOILERPLATE_LINES.contains(&normalized.as_str()) || mentions_any(text, BOILERPLATE_PHRASES)
    {
        return Some("boilerplate");
    }
    if !has_digits && mentions_any(text, BRAND_WORDS) {
        return Some("brand banner");
    }
    None
}

/// "★★ Chef's Picks ★★": decorative glyphs on both ends.
fn is_framed(text: &str) -> bool {
    let lead = text.chars().take_while(|c| DECORATIVE.contains(c)).count();
    let trail = text.chars().rev().take_while(|c| DECORATIVE.contains(c)).count();
    lead >= 2 && trail >= 2
}

/// Strip item numbering ("12.", "No. 3)") and stray punctuation from a name.
pub fn clean_dish_name(residual: &str) -> String {
    let stripped = ITEM_NUMBER.replace(residual.trim(), "");
    stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | ':' | '.' | ',' | '*' | '|'))
        .to_string()
}

fn implausible_name_reason(name: &str, config: &PipelineConfig) -> Option<&'static str> {
    let letters = name.chars().filter(|c| c.is_alphabetic() || is_thai(*c)).count();
    if letters < config.min_name_chars.max(2) {
        return Some("too few letters");
    }
    if !has_script_letters(name) {
        return Some("no script text");
    }
    let lower = name.to_lowercase();
    if GENERIC_WORDS.contains(&lower.as_str()) {
        return Some("generic menu word");
    }
    if mentions_any(name, PROMO_PHRASES) {
        return Some("promotional");
    }
    if mentions_any(name, DESCRIPTION_PHRASES) {
        return Some("description phrase");
    }
    if name.split_whitespace().count() > MAX_NAME_WORDS {
        return Some("too many words");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_of(text: &str) -> LineClass {
        classify_line(&RawLine::new(0, text), &PipelineConfig::default())
            .classification
            .class
    }

    fn reason_of(text: &str) -> String {
        classify_line(&RawLine::new(0, text), &PipelineConfig::default())
            .classification
            .reason
    }

    #[test]
    fn dish_with_price_is_candidate() {
        let c = classify_line(&RawLine::new(4, "Fried Rice 70 baht"), &PipelineConfig::default());
        assert_eq!(c.classification.class, LineClass::DishCandidate);
        assert_eq!(c.classification.line_index, 4);
        assert_eq!(c.name.as_deref(), Some("Fried Rice"));
        assert!(c.scan.matched.is_some());
    }

    #[test]
    fn dish_without_price_is_candidate() {
        assert_eq!(class_of("Green Curry Chicken"), LineClass::DishCandidate);
        assert_eq!(class_of("ต้มยำกุ้ง"), LineClass::DishCandidate);
    }

    #[test]
    fn lone_amounts_are_price_only() {
        assert_eq!(class_of("110"), LineClass::PriceOnly);
        assert_eq!(class_of("฿ 120"), LineClass::PriceOnly);
        assert_eq!(class_of("80/100/120"), LineClass::PriceOnly);
    }

    #[test]
    fn short_lines_are_noise() {
        assert_eq!(class_of("95"), LineClass::Header);
        assert_eq!(reason_of("ab"), "too short");
    }

    #[test]
    fn decorative_and_banners_are_headers() {
        assert_eq!(reason_of("★★★★★"), "decorative");
        assert_eq!(reason_of("~~ Chef Picks ~~"), "decorative banner");
        assert_eq!(reason_of("Baan Thai Restaurant"), "brand banner");
    }

    #[test]
    fn section_headers_carry_category() {
        let c = classify_line(&RawLine::new(0, "DRINKS"), &PipelineConfig::default());
        assert_eq!(c.classification.class, LineClass::Header);
        assert_eq!(c.classification.section, Some(DishCategory::Drink));
    }

    #[test]
    fn contact_and_hours_are_headers() {
        assert_eq!(reason_of("Tel. 02-123-4567"), "phone number");
        assert_eq!(reason_of("081 234 5678"), "phone number");
        assert_eq!(reason_of("Open 10:00 - 22:00"), "opening hours or date");
        assert_eq!(reason_of("Open daily"), "opening hours or date");
        assert_eq!(reason_of("123 Sukhumvit Road"), "address");
    }

    #[test]
    fn boilerplate_is_header() {
        assert_eq!(reason_of("MENU"), "boilerplate");
        assert_eq!(reason_of("Thank you for visiting"), "boilerplate");
        assert_eq!(reason_of("Prices include 7% VAT"), "boilerplate");
    }

    #[test]
    fn implausible_names_are_descriptions() {
        assert_eq!(reason_of("Special 99"), "generic menu word");
        assert_eq!(reason_of("Happy hour beers 2 for 150"), "promotional");
        assert_eq!(reason_of("Served with jasmine rice"), "description phrase");
        assert_eq!(
            reason_of("Our signature dish slow cooked for twelve long days in a big clay pot"),
            "too many words"
        );
    }

    #[test]
    fn item_numbers_are_stripped() {
        let c = classify_line(&RawLine::new(0, "12. Pad Thai 120"), &PipelineConfig::default());
        assert_eq!(c.name.as_deref(), Some("Pad Thai"));
        assert_eq!(clean_dish_name("No. 3) Som Tam"), "Som Tam");
    }

    #[test]
    fn sections_propagate_to_following_lines() {
        let lines = vec![
            RawLine::new(0, "DESSERTS"),
            RawLine::new(1, "Coconut Jelly 45"),
            RawLine::new(2, "DRINKS"),
            RawLine::new(3, "Lychee Cooler 60"),
        ];
        let classified = classify_lines(&lines, &PipelineConfig::default());
        assert_eq!(classified[1].section, Some(DishCategory::Dessert));
        assert_eq!(classified[3].section, Some(DishCategory::Drink));
    }

    fn classes_of(texts: &[&str]) -> Vec<LineClass> {
        let lines: Vec<RawLine> = texts.iter().enumerate().map(|(i, t)| RawLine::new(i, *t)).collect();
        classify_lines(&lines, &PipelineConfig::default())
            .into_iter()
            .map(|c| c.classification.class)
            .collect()
    }

    #[test]
    fn lowercase_line_after_dish_continues_it() {
        let lines = vec![
            RawLine::new(0, "Pad Kra Pao 80"),
            RawLine::new(1, "with minced pork and basil"),
            RawLine::new(2, "(fried egg on top)"),
        ];
        let classified = classify_lines(&lines, &PipelineConfig::default());
        assert_eq!(classified[1].classification.class, LineClass::Description);
        assert_eq!(classified[1].classification.reason, "continuation text");
        assert_eq!(classified[1].name, None);
        assert_eq!(classified[2].classification.reason, "continuation text");
    }

    #[test]
    fn lowercase_priced_lines_are_dishes() {
        assert_eq!(
            classes_of(&["pad thai 120 baht", "green curry 90 baht", "tom yum soup 150 baht"]),
            vec![LineClass::DishCandidate; 3]
        );
        assert_eq!(classes_of(&["MAINS", "khao man gai"]), vec![LineClass::Header, LineClass::DishCandidate]);
    }

    #[test]
    fn tier_lists_that_resemble_dates_are_dishes() {
        assert_eq!(class_of("Iced Coffee 10/12/14"), LineClass::DishCandidate);
        assert_eq!(class_of("Pizza 8/10/12"), LineClass::DishCandidate);
        assert_eq!(reason_of("Updated 12/05/24"), "opening hours or date");
        assert_eq!(reason_of("Menu valid until 10/12/14"), "opening hours or date");
    }

    #[test]
    fn page_numbers_are_noise() {
        assert_eq!(reason_of("Page 12"), "page number");
        assert_eq!(reason_of("- page 2 of 4 -"), "page number");
        assert_eq!(reason_of("หน้า 3"), "page number");
        assert_eq!(class_of("ราดหน้า 60"), LineClass::DishCandidate);
    }

    #[test]
    fn mid_line_bare_number_still_counts_as_dish() {
        let c = classify_line(&RawLine::new(0, "Pad Thai 60 (with egg)"), &PipelineConfig::default());
        assert_eq!(c.classification.class, LineClass::DishCandidate);
        assert_eq!(c.name.as_deref(), Some("Pad Thai (with egg)"));
    }
}
