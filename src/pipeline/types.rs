use serde::{Deserialize, Serialize};

use super::category::DishCategory;

/// One line of sanitized menu text and its zero-based position in the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLine {
    pub index: usize,
    pub text: String,
}

impl RawLine {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// What a single line of menu text most likely is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineClass {
    DishCandidate,
    PriceOnly,
    Header,
    Description,
}

/// Classifier verdict for one line. Lives for one pipeline run only.
#[derive(Debug, Clone, Serialize)]
pub struct LineClassification {
    pub class: LineClass,
    pub line_index: usize,
    pub reason: String,
    /// Set when the line is a section header such as "DRINKS".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<DishCategory>,
}

/// Canonical size labels, declared in canonical order (small → extra).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeLabel {
    Small,
    Medium,
    Large,
    Extra,
}

impl SizeLabel {
    pub const CANONICAL: [SizeLabel; 4] = [
        SizeLabel::Small,
        SizeLabel::Medium,
        SizeLabel::Large,
        SizeLabel::Extra,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeLabel::Small => "small",
            SizeLabel::Medium => "medium",
            SizeLabel::Large => "large",
            SizeLabel::Extra => "extra",
        }
    }

    /// Map a size keyword (English or Thai) to its label.
    pub fn from_keyword(word: &str) -> Option<Self> {
        match word.trim().to_lowercase().as_str() {
            "small" | "sm" | "s" | "เล็ก" | "ธรรมดา" => Some(SizeLabel::Small),
            "medium" | "med" | "m" | "regular" | "กลาง" => Some(SizeLabel::Medium),
            "large" | "lg" | "l" | "ใหญ่" => Some(SizeLabel::Large),
            "extra" | "xl" | "jumbo" | "พิเศษ" => Some(SizeLabel::Extra),
            _ => None,
        }
    }
}

/// Resolved currency of a price token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    Baht,
    Usd,
    Eur,
    Jpy,
    Cny,
    Krw,
    Unknown,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Baht => "baht",
            Currency::Usd => "usd",
            Currency::Eur => "eur",
            Currency::Jpy => "jpy",
            Currency::Cny => "cny",
            Currency::Krw => "krw",
            Currency::Unknown => "unknown",
        }
    }

    /// Map an explicit currency marker (symbol, code or word) to a currency.
    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker.trim().trim_end_matches('.').to_lowercase().as_str() {
            "฿" | "บาท" | "บ" | "baht" | "thb" => Some(Currency::Baht),
            "$" | "usd" | "us$" => Some(Currency::Usd),
            "€" | "eur" | "euro" | "euros" => Some(Currency::Eur),
            "¥" | "円" | "yen" | "jpy" => Some(Currency::Jpy),
            "元" | "rmb" | "cny" | "yuan" => Some(Currency::Cny),
            "₩" | "원" | "krw" | "won" => Some(Currency::Krw),
            _ => None,
        }
    }

    /// Currency usually implied by a menu written in the given language.
    pub fn for_language(language: &str) -> Option<Self> {
        match language {
            "th" => Some(Currency::Baht),
            "ja" => Some(Currency::Jpy),
            "zh" => Some(Currency::Cny),
            "ko" => Some(Currency::Krw),
            _ => None,
        }
    }
}

/// A normalized price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceToken {
    pub amount: f64,
    /// Upper bound when the menu printed a range ("60-80").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    pub currency: Currency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeLabel>,
    /// True when the token belongs to a size-tiered group of two or more prices.
    #[serde(default)]
    pub multi_size: bool,
}

/// How a price group was recognized. Bare groups are weaker evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrigin {
    Explicit,
    Bare,
}

/// Price tokens sharing one source line, in canonical size order with distinct sizes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceGroup {
    pub line_index: usize,
    pub tokens: Vec<PriceToken>,
    pub origin: PriceOrigin,
}

/// A dish name guessed from one line, not yet paired with a price.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DishCandidate {
    pub name: String,
    pub line_index: usize,
    /// Price found on the candidate's own line, if any.
    pub own_prices: Option<PriceGroup>,
    /// The line carried a number that the extractor discarded as implausible.
    pub rejected_price: bool,
    /// Category of the menu section the line sits in.
    pub section: Option<DishCategory>,
}

/// Whether a dish carries prices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceStatus {
    Detected,
    NotDetected,
    /// Only implausible amounts were seen for this dish.
    OutOfBand,
}

/// Terminal dish record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    pub name: String,
    pub prices: Vec<PriceToken>,
    pub price_status: PriceStatus,
    pub category: DishCategory,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<usize>,
}

impl Dish {
    /// Dish with at least one price. Falls back to `NotDetected` for an empty token list.
    pub fn priced(
        name: String,
        prices: Vec<PriceToken>,
        category: DishCategory,
        confidence: f32,
        source_line: Option<usize>,
    ) -> Self {
        let price_status = if prices.is_empty() {
            PriceStatus::NotDetected
        } else {
            PriceStatus::Detected
        };
        Self {
            name,
            prices,
            price_status,
            category,
            confidence,
            source_line,
        }
    }

    /// Dish carrying an explicit "no usable price" marker.
    pub fn unpriced(
        name: String,
        status: PriceStatus,
        category: DishCategory,
        confidence: f32,
        source_line: Option<usize>,
    ) -> Self {
        let price_status = match status {
            PriceStatus::Detected => PriceStatus::NotDetected,
            other => other,
        };
        Self {
            name,
            prices: Vec::new(),
            price_status,
            category,
            confidence,
            source_line,
        }
    }
}

/// Which stage produced a `MenuResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionEngine {
    Heuristic,
    Generative,
    RawText,
}

/// Final output of one menu-processing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuResult {
    pub dishes: Vec<Dish>,
    pub language: String,
    pub confidence: f32,
    pub processing_time_ms: u64,
    pub engine: ExtractionEngine,
    /// Unprocessed recognized text; only present on the raw-text fallback.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

/// Structured dish as emitted by a generative vision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerativeDish {
    pub name: String,
    #[serde(default, deserialize_with = "super::parser::deserialize_price")]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
}
