//! Price recognition for menu lines.
//!
//! Each line is tried against an ordered list of pattern families; the first
//! family that yields at least one amount inside the plausible band wins.
//! Amounts outside the band are discarded here and reported as rejected.
//!
//! Family order (highest priority first):
//! 1. multi-size keywords      `S 80 M 100 L 120`
//! 2. amount lists             `80/100/120 ฿`
//! 3. parenthetical size       `Curry (large) 90`
//! 4. keyword size             `Large 90`
//! 5. range                    `60-80`
//! 6. trailing amount          `Pad Thai 120 baht`, `Latte ฿65`
//! 7. bare number              `Pad Thai 60 (with egg)`; needs script text

use std::collections::HashMap;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::category::mentions_any;
use super::language_detect::has_script_letters;
use super::types::{Currency, PriceGroup, PriceOrigin, PriceToken, SizeLabel};
use crate::pipeline_config::PipelineConfig;

// ──────────────────────────────────────────────
// Patterns
// ──────────────────────────────────────────────

const AMOUNT: &str = r"\d+(?:\.\d{1,2})?";
const LIST_AMOUNT: &str = r"\d{1,5}(?:\.\d{1,2})?";
const RANGE_AMOUNT: &str = r"\d{2,5}(?:\.\d{1,2})?";
const CURRENCY: &str = r"(?:฿|\$|€|¥|₩|円|元|원|บาท|บ\.|(?i:us\$)|(?i:\b(?:baht|thb|usd|eur|euros?|yen|jpy|rmb|cny|yuan|krw|won)\b))";
const SIZE_WORD: &str = r"(?:(?i:\b(?:small|medium|med|regular|large|extra|jumbo)\b)|\b(?:S|M|L|XL)\b|เล็ก|ธรรมดา|กลาง|ใหญ่|พิเศษ)";

fn price_pattern(template: &str) -> Regex {
    let pattern = template
        .replace("<AMOUNT>", AMOUNT)
        .replace("<LIST>", LIST_AMOUNT)
        .replace("<RANGE>", RANGE_AMOUNT)
        .replace("<CUR>", CURRENCY)
        .replace("<SIZE>", SIZE_WORD);
    Regex::new(&pattern).unwrap()
}

static SIZE_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    price_pattern(r"(?P<size><SIZE>)\s*[:.=\-]?\s*(?:(?P<pre><CUR>)\s*)?(?P<amount><AMOUNT>)(?:\s*(?P<post><CUR>))?")
});

static AMOUNT_LIST: LazyLock<Regex> = LazyLock::new(|| {
    price_pattern(r"(?:(?P<pre><CUR>)\s*)?(?P<list><LIST>(?:\s*[/,]\s*<LIST>){1,3})(?:\s*(?P<post><CUR>))?")
});

static PAREN_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    price_pattern(r"\(\s*(?P<size><SIZE>)\s*\)\s*[:\-]?\s*(?:(?P<pre><CUR>)\s*)?(?P<amount><AMOUNT>)(?:\s*(?P<post><CUR>))?")
});

static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    price_pattern(r"(?:(?P<pre><CUR>)\s*)?(?P<low><RANGE>)\s*[-–~]\s*(?P<high><RANGE>)(?:\s*(?P<post><CUR>))?")
});

static TRAILING: LazyLock<Regex> = LazyLock::new(|| {
    price_pattern(r"(?:(?P<pre><CUR>)\s*)?(?P<amount><AMOUNT>)(?:\s*(?P<post><CUR>))?\s*(?:\.?-)?\s*$")
});

static NUMBER_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:[.,/:]\d+)*").unwrap());

static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*[/,]\s*").unwrap());

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b").unwrap());

const DATE_WORDS: &[&str] = &[
    "date", "dated", "updated", "valid", "until", "since", "open", "opening", "hours",
    "closed", "effective", "expires", "วันที่", "ถึง", "ตั้งแต่",
];

/// `1,200` with a single leading digit is a thousands separator.
static THOUSANDS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d),(\d{3})\b").unwrap());

static CURRENCY_SYMBOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[฿$€¥₩]").unwrap());

static DOT_LEADERS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.·…_]{2,}").unwrap());

static EMPTY_PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(\s*\)").unwrap());

// ──────────────────────────────────────────────
// Types
// ──────────────────────────────────────────────

/// Pattern families in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    MultiSize,
    AmountList,
    ParenSize,
    KeywordSize,
    Range,
    Trailing,
    BareNumber,
}

/// Inclusive plausible band for amounts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceBand {
    pub min: f64,
    pub max: f64,
}

impl PriceBand {
    pub fn primary(config: &PipelineConfig) -> Self {
        Self {
            min: config.min_price,
            max: config.max_price,
        }
    }

    pub fn bare(config: &PipelineConfig) -> Self {
        Self {
            min: config.bare_price_min,
            max: config.bare_price_max,
        }
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount > 0.0 && amount >= self.min && amount <= self.max
    }
}

/// An amount as recognized on the line, before currency resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawPrice {
    pub amount: f64,
    pub max_amount: Option<f64>,
    pub size: Option<SizeLabel>,
    pub currency: Option<Currency>,
}

/// Winning family output for one line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceMatch {
    pub family: PatternFamily,
    pub prices: Vec<RawPrice>,
    #[serde(skip)]
    pub spans: Vec<Range<usize>>,
}

impl PriceMatch {
    pub fn has_explicit_currency(&self) -> bool {
        self.prices.iter().any(|p| p.currency.is_some())
    }
}

/// Everything the extractor learned about one line.
#[derive(Debug, Clone, Serialize)]
pub struct LineScan {
    /// Line text after thousands-separator normalization.
    pub text: String,
    pub matched: Option<PriceMatch>,
    /// Amounts recognized but discarded as implausible.
    pub rejected: Vec<f64>,
    /// Line text left after removing the price expression.
    pub residual: String,
}

impl LineScan {
    /// Strength of the price evidence on this line, if any.
    pub fn origin(&self) -> Option<PriceOrigin> {
        let matched = self.matched.as_ref()?;
        let lone_unmarked = matched.family == PatternFamily::Trailing
            && !matched.has_explicit_currency()
            && !has_script_letters(&self.residual);
        if matched.family == PatternFamily::BareNumber || lone_unmarked {
            Some(PriceOrigin::Bare)
        } else {
            Some(PriceOrigin::Explicit)
        }
    }

    pub fn explicit_currencies(&self) -> impl Iterator<Item = Currency> + '_ {
        self.matched
            .iter()
            .flat_map(|m| m.prices.iter())
            .filter_map(|p| p.currency)
    }
}

/// Unfiltered output of one pattern family.
struct FamilyHit {
    prices: Vec<RawPrice>,
    spans: Vec<Range<usize>>,
}

type FamilyFn = fn(&str) -> Option<FamilyHit>;

/// Pattern families in priority order.
const FAMILIES: &[(PatternFamily, FamilyFn)] = &[
    (PatternFamily::MultiSize, match_multi_size),
    (PatternFamily::AmountList, match_amount_list),
    (PatternFamily::ParenSize, match_paren_size),
    (PatternFamily::KeywordSize, match_keyword_size),
    (PatternFamily::Range, match_range),
    (PatternFamily::Trailing, match_trailing),
    (PatternFamily::BareNumber, match_bare_number),
];

// ──────────────────────────────────────────────
// Extraction
// ──────────────────────────────────────────────

/// Scan one line for prices.
pub fn scan_line(line: &str, band: &PriceBand, bare_band: &PriceBand) -> LineScan {
    let text = THOUSANDS.replace_all(line, "$1$2").into_owned();
    let mut rejected = Vec::new();
    let mut rejected_spans: Option<Vec<Range<usize>>> = None;

    for (family, matcher) in FAMILIES {
        let Some(hit) = matcher(&text) else {
            continue;
        };
        let family_band = if *family == PatternFamily::BareNumber {
            bare_band
        } else {
            band
        };

        let (valid, invalid): (Vec<RawPrice>, Vec<RawPrice>) = hit
            .prices
            .into_iter()
            .partition(|p| family_band.contains(p.amount) && p.max_amount.map_or(true, |m| family_band.contains(m)));

        for price in &invalid {
            if !rejected.contains(&price.amount) {
                rejected.push(price.amount);
            }
        }

        if valid.is_empty() {
            if rejected_spans.is_none() && !invalid.is_empty() {
                rejected_spans = Some(hit.spans);
            }
            continue;
        }

        let residual = residual_text(&text, &hit.spans);
        return LineScan {
            text,
            matched: Some(PriceMatch {
                family: *family,
                prices: valid,
                spans: hit.spans,
            }),
            rejected,
            residual,
        };
    }

    let residual = residual_text(&text, rejected_spans.as_deref().unwrap_or(&[]));
    LineScan {
        text,
        matched: None,
        rejected,
        residual,
    }
}

/// Resolve a match into a price group with distinct sizes in canonical order.
pub fn resolve_group(
    matched: &PriceMatch,
    line_index: usize,
    origin: PriceOrigin,
    fallback: Currency,
) -> PriceGroup {
    let line_currency = matched.prices.iter().find_map(|p| p.currency);
    let mut tokens: Vec<PriceToken> = Vec::with_capacity(matched.prices.len());
    for price in &matched.prices {
        if price.size.is_some() && tokens.iter().any(|t| t.size == price.size) {
            continue;
        }
        tokens.push(PriceToken {
            amount: price.amount,
            max_amount: price.max_amount,
            currency: price.currency.or(line_currency).unwrap_or(fallback),
            size: price.size,
            multi_size: false,
        });
    }
    tokens.sort_by_key(|t| t.size);
    let multi = tokens.len() > 1;
    for token in &mut tokens {
        token.multi_size = multi;
    }
    PriceGroup {
        line_index,
        tokens,
        origin,
    }
}

/// Most frequent explicit currency across all scans; ties go to the first seen.
pub fn dominant_currency<'a>(scans: impl IntoIterator<Item = &'a LineScan>) -> Option<Currency> {
    dominant_of(scans.into_iter().flat_map(|s| s.explicit_currencies()))
}

/// Most frequent currency in `markers`; ties go to the first seen.
pub fn dominant_of(markers: impl IntoIterator<Item = Currency>) -> Option<Currency> {
    let mut counts: HashMap<Currency, usize> = HashMap::new();
    let mut order: Vec<Currency> = Vec::new();
    for currency in markers {
        let count = counts.entry(currency).or_insert(0);
        if *count == 0 {
            order.push(currency);
        }
        *count += 1;
    }
    let best = order.iter().map(|c| counts[c]).max()?;
    order.into_iter().find(|c| counts[c] == best)
}

/// Currency for tokens without an explicit marker.
pub fn resolve_currency(
    dominant: Option<Currency>,
    configured: Option<Currency>,
    language: &str,
) -> Currency {
    dominant
        .or(configured)
        .or_else(|| Currency::for_language(language))
        .unwrap_or(Currency::Unknown)
}

/// Extract normalized price tokens from a single line.
pub fn extract_prices(line: &str, config: &PipelineConfig) -> Vec<PriceToken> {
    let scan = scan_line(line, &PriceBand::primary(config), &PriceBand::bare(config));
    let Some(matched) = scan.matched.as_ref() else {
        return Vec::new();
    };
    let origin = scan.origin().unwrap_or(PriceOrigin::Explicit);
    let fallback = config.default_currency.unwrap_or(Currency::Unknown);
    resolve_group(matched, 0, origin, fallback).tokens
}

// ──────────────────────────────────────────────
// Pattern families
// ──────────────────────────────────────────────

fn match_multi_size(text: &str) -> Option<FamilyHit> {
    let mut prices = Vec::new();
    let mut spans = Vec::new();
    for caps in SIZE_AMOUNT.captures_iter(text).take(SizeLabel::CANONICAL.len()) {
        let (Some(size), Some(amount)) = (sized(&caps), amount_of(&caps, "amount")) else {
            continue;
        };
        prices.push(RawPrice {
            amount,
            max_amount: None,
            size: Some(size),
            currency: currency_of(&caps),
        });
        spans.push(caps.get(0)?.range());
    }
    let mut distinct: Vec<SizeLabel> = prices.iter().filter_map(|p| p.size).collect();
    distinct.sort();
    distinct.dedup();
    (distinct.len() >= 2).then_some(FamilyHit { prices, spans })
}

/// A `d/m/y` run reads as a date when it has a four-digit year, sits next to
/// a date word, or is not ascending. `10/12/14` alone is a tier list.
pub(crate) fn looks_like_date(text: &str) -> bool {
    DATE_SHAPE.captures_iter(text).any(|caps| {
        let part = |i: usize| caps.get(i).map_or("", |m| m.as_str());
        let (Ok(a), Ok(b), Ok(c)) = (part(1).parse::<u32>(), part(2).parse::<u32>(), part(3).parse::<u32>()) else {
            return false;
        };
        let calendar = (1..=31).contains(&a) && (1..=31).contains(&b) && (a <= 12 || b <= 12);
        calendar && (part(3).len() == 4 || mentions_any(text, DATE_WORDS) || !(a < b && b < c))
    })
}

fn match_amount_list(text: &str) -> Option<FamilyHit> {
    if looks_like_date(text) {
        return None;
    }
    let caps = AMOUNT_LIST.captures(text)?;
    let whole = caps.get(0)?;
    let list = caps.name("list")?.as_str();
    let currency = currency_of(&caps);
    // `1/2 Chicken` is a fraction; single digits need a currency or the line end.
    let has_single_digit = LIST_SEPARATOR
        .split(list)
        .any(|part| part.trim().split('.').next().is_some_and(|int| int.len() == 1));
    if has_single_digit && currency.is_none() && !text[whole.end()..].trim().is_empty() {
        return None;
    }
    let prices = LIST_SEPARATOR
        .split(list)
        .zip(SizeLabel::CANONICAL)
        .filter_map(|(part, size)| {
            part.trim().parse::<f64>().ok().map(|amount| RawPrice {
                amount,
                max_amount: None,
                size: Some(size),
                currency,
            })
        })
        .collect::<Vec<_>>();
    (prices.len() >= 2).then(|| FamilyHit {
        prices,
        spans: vec![whole.range()],
    })
}

fn match_paren_size(text: &str) -> Option<FamilyHit> {
    let mut prices = Vec::new();
    let mut spans = Vec::new();
    for caps in PAREN_SIZE.captures_iter(text).take(SizeLabel::CANONICAL.len()) {
        let (Some(size), Some(amount)) = (sized(&caps), amount_of(&caps, "amount")) else {
            continue;
        };
        prices.push(RawPrice {
            amount,
            max_amount: None,
            size: Some(size),
            currency: currency_of(&caps),
        });
        spans.push(caps.get(0)?.range());
    }
    (!prices.is_empty()).then_some(FamilyHit { prices, spans })
}

fn match_keyword_size(text: &str) -> Option<FamilyHit> {
    let caps = SIZE_AMOUNT.captures(text)?;
    let size = sized(&caps)?;
    let amount = amount_of(&caps, "amount")?;
    Some(FamilyHit {
        prices: vec![RawPrice {
            amount,
            max_amount: None,
            size: Some(size),
            currency: currency_of(&caps),
        }],
        spans: vec![caps.get(0)?.range()],
    })
}

fn match_range(text: &str) -> Option<FamilyHit> {
    let caps = RANGE.captures(text)?;
    let low = amount_of(&caps, "low")?;
    let high = amount_of(&caps, "high")?;
    if low >= high {
        return None;
    }
    Some(FamilyHit {
        prices: vec![RawPrice {
            amount: low,
            max_amount: Some(high),
            size: None,
            currency: currency_of(&caps),
        }],
        spans: vec![caps.get(0)?.range()],
    })
}

fn match_trailing(text: &str) -> Option<FamilyHit> {
    let caps = TRAILING.captures(text)?;
    let amount = amount_of(&caps, "amount")?;
    Some(FamilyHit {
        prices: vec![RawPrice {
            amount,
            max_amount: None,
            size: None,
            currency: currency_of(&caps),
        }],
        spans: vec![caps.get(0)?.range()],
    })
}

/// Last 2–4 digit number that does not open the line. Only trusted when the
/// line also carries script text, so page numbers and phone fragments on
/// their own are never read as prices.
fn match_bare_number(text: &str) -> Option<FamilyHit> {
    if !has_script_letters(text) {
        return None;
    }
    let found = NUMBER_RUN
        .find_iter(text)
        .filter(|m| m.start() > 0)
        .filter(|m| {
            let s = m.as_str();
            (2..=4).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
        })
        .last()?;
    let amount = found.as_str().parse::<f64>().ok()?;
    Some(FamilyHit {
        prices: vec![RawPrice {
            amount,
            max_amount: None,
            size: None,
            currency: None,
        }],
        spans: vec![found.range()],
    })
}

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

fn sized(caps: &regex::Captures<'_>) -> Option<SizeLabel> {
    caps.name("size")
        .and_then(|m| SizeLabel::from_keyword(m.as_str()))
}

fn amount_of(caps: &regex::Captures<'_>, group: &str) -> Option<f64> {
    caps.name(group)?.as_str().parse::<f64>().ok()
}

fn currency_of(caps: &regex::Captures<'_>) -> Option<Currency> {
    caps.name("post")
        .or_else(|| caps.name("pre"))
        .and_then(|m| Currency::from_marker(m.as_str()))
}

/// Remove the price spans, stray currency symbols and dot leaders, then trim
/// separator punctuation from both ends.
fn residual_text(text: &str, spans: &[Range<usize>]) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut cursor = 0usize;
    let mut sorted: Vec<&Range<usize>> = spans.iter().collect();
    sorted.sort_by_key(|r| r.start);
    for span in sorted {
        if span.start >= cursor && span.end <= text.len() {
            kept.push_str(&text[cursor..span.start]);
            kept.push(' ');
            cursor = span.end;
        }
    }
    kept.push_str(&text[cursor..]);

    let kept = CURRENCY_SYMBOL.replace_all(&kept, " ");
    let kept = DOT_LEADERS.replace_all(&kept, " ");
    let kept = EMPTY_PARENS.replace_all(&kept, " ");
    kept.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '–' | ':' | '.' | '·' | '|' | '/' | ',' | '=' | '*'))
        .to_string()
}
