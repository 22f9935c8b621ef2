//! Dish category inference and cuisine signatures.
//!
//! Categories are inferred from keyword tables (English and Thai, plus a few
//! CJK terms). Cuisine signatures feed the validator's menu-context check.

use serde::{Deserialize, Serialize};

/// Inferred dish category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DishCategory {
    Rice,
    Noodle,
    Soup,
    Curry,
    Salad,
    Appetizer,
    Drink,
    Dessert,
    Main,
}

impl DishCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DishCategory::Rice => "rice",
            DishCategory::Noodle => "noodle",
            DishCategory::Soup => "soup",
            DishCategory::Curry => "curry",
            DishCategory::Salad => "salad",
            DishCategory::Appetizer => "appetizer",
            DishCategory::Drink => "drink",
            DishCategory::Dessert => "dessert",
            DishCategory::Main => "main",
        }
    }

    /// Parse a category label produced by a generative engine.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "rice" => Some(DishCategory::Rice),
            "noodle" | "noodles" => Some(DishCategory::Noodle),
            "soup" | "soups" => Some(DishCategory::Soup),
            "curry" | "curries" => Some(DishCategory::Curry),
            "salad" | "salads" => Some(DishCategory::Salad),
            "appetizer" | "appetizers" | "starter" | "starters" | "snack" => {
                Some(DishCategory::Appetizer)
            }
            "drink" | "drinks" | "beverage" | "beverages" => Some(DishCategory::Drink),
            "dessert" | "desserts" | "sweets" => Some(DishCategory::Dessert),
            "main" | "mains" | "main course" | "entree" => Some(DishCategory::Main),
            _ => None,
        }
    }
}

/// Keyword table per category, checked in this order. Earlier rows win,
/// so "mango sticky rice" is a dessert and "tom yum soup" is never a salad.
const CATEGORY_KEYWORDS: &[(DishCategory, &[&str])] = &[
    (
        DishCategory::Dessert,
        &[
            "dessert", "ice cream", "cake", "mango sticky rice", "pudding", "brownie",
            "tiramisu", "mochi", "pancake", "waffle", "custard", "ของหวาน", "ไอศกรีม",
            "ข้าวเหนียวมะม่วง", "บัวลอย", "ทับทิมกรอบ",
        ],
    ),
    (
        DishCategory::Drink,
        &[
            "tea", "coffee", "latte", "espresso", "cappuccino", "americano", "juice", "soda",
            "water", "beer", "wine", "smoothie", "shake", "milkshake", "cola", "coke",
            "lemonade", "mocha", "ชาเย็น", "ชาไทย", "ชานม", "กาแฟ", "น้ำผลไม้", "น้ำเปล่า",
            "น้ำมะพร้าว", "น้ำส้ม", "โซดา", "เบียร์", "โกโก้",
        ],
    ),
    (
        DishCategory::Soup,
        &[
            "soup", "tom yum", "tom yam", "tom kha", "miso soup", "ต้มยำ", "ต้มข่า", "แกงจืด",
            "ต้มแซ่บ",
        ],
    ),
    (
        DishCategory::Curry,
        &[
            "curry", "massaman", "panang", "korma", "vindaloo", "tikka masala", "แกง", "พะแนง",
            "มัสมั่น", "ฉู่ฉี่",
        ],
    ),
    (
        DishCategory::Noodle,
        &[
            "noodle", "noodles", "pad thai", "pad see ew", "ramen", "udon", "soba", "pho",
            "spaghetti", "pasta", "chow mein", "lo mein", "ก๋วยเตี๋ยว", "ผัดไทย", "บะหมี่",
            "ราดหน้า", "ผัดซีอิ๊ว", "ขนมจีน", "面", "麺", "라면",
        ],
    ),
    (
        DishCategory::Rice,
        &[
            "rice", "fried rice", "biryani", "risotto", "donburi", "bibimbap", "congee",
            "ข้าว", "โจ๊ก", "饭", "飯", "밥",
        ],
    ),
    (
        DishCategory::Salad,
        &[
            "salad", "som tam", "papaya salad", "larb", "laab", "yum", "ส้มตำ", "ลาบ", "ยำ",
            "น้ำตก", "พล่า",
        ],
    ),
    (
        DishCategory::Appetizer,
        &[
            "spring roll", "spring rolls", "satay", "dumpling", "dumplings", "gyoza", "wings",
            "fries", "tempura", "nachos", "samosa", "ปอเปี๊ยะ", "สะเต๊ะ", "เกี๊ยว", "ทอดมัน",
        ],
    ),
];

/// Exact section-header words. Compared after lowercasing and trimming punctuation.
const SECTION_HEADERS: &[(DishCategory, &[&str])] = &[
    (DishCategory::Drink, &["drinks", "drink", "beverages", "beverage", "เครื่องดื่ม"]),
    (DishCategory::Dessert, &["desserts", "dessert", "sweets", "ของหวาน"]),
    (DishCategory::Soup, &["soups", "soup", "ต้ม"]),
    (DishCategory::Curry, &["curries", "curry", "แกง"]),
    (DishCategory::Noodle, &["noodles", "noodle", "เส้น", "ก๋วยเตี๋ยว"]),
    (DishCategory::Rice, &["rice dishes", "rice", "ข้าว", "อาหารจานเดียว"]),
    (DishCategory::Salad, &["salads", "salad", "ยำ"]),
    (
        DishCategory::Appetizer,
        &["appetizers", "appetizer", "starters", "starter", "snacks", "ของทานเล่น"],
    ),
    (DishCategory::Main, &["mains", "main course", "main dishes", "entrees", "กับข้าว"]),
];

/// True when `word` is itself a section-header or category keyword.
pub(crate) fn is_category_keyword(word: &str) -> bool {
    let lower = word.to_lowercase();
    SECTION_HEADERS
        .iter()
        .chain(CATEGORY_KEYWORDS)
        .any(|(_, words)| words.contains(&lower.as_str()))
}

/// Infer a category from a dish name. Falls back to `Main`.
pub fn infer_category(name: &str) -> DishCategory {
    let lower = name.to_lowercase();
    let words = word_sequence(&lower);
    for (category, keywords) in CATEGORY_KEYWORDS {
        if keywords.iter().any(|kw| contains_keyword(&lower, &words, kw)) {
            return *category;
        }
    }
    DishCategory::Main
}

/// Recognize a line that only names a menu section ("DRINKS", "ของหวาน").
pub fn section_from_header(text: &str) -> Option<DishCategory> {
    let cleaned = text
        .trim_matches(|c: char| !c.is_alphanumeric() && !is_thai(c))
        .to_lowercase();
    if cleaned.is_empty() {
        return None;
    }
    SECTION_HEADERS
        .iter()
        .find(|(_, words)| words.contains(&cleaned.as_str()))
        .map(|(category, _)| *category)
}

// ──────────────────────────────────────────────
// Cuisine signatures
// ──────────────────────────────────────────────

/// Well-known cuisines with dishes that anchor a whole menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cuisine {
    Thai,
    Japanese,
    Korean,
    Chinese,
    Italian,
    Mexican,
    Indian,
}

/// Cuisines in different families do not share a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CuisineFamily {
    Asian,
    Western,
    SouthAsian,
}

impl Cuisine {
    pub const ALL: [Cuisine; 7] = [
        Cuisine::Thai,
        Cuisine::Japanese,
        Cuisine::Korean,
        Cuisine::Chinese,
        Cuisine::Italian,
        Cuisine::Mexican,
        Cuisine::Indian,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Cuisine::Thai => "thai",
            Cuisine::Japanese => "japanese",
            Cuisine::Korean => "korean",
            Cuisine::Chinese => "chinese",
            Cuisine::Italian => "italian",
            Cuisine::Mexican => "mexican",
            Cuisine::Indian => "indian",
        }
    }

    pub fn family(&self) -> CuisineFamily {
        match self {
            Cuisine::Thai | Cuisine::Japanese | Cuisine::Korean | Cuisine::Chinese => {
                CuisineFamily::Asian
            }
            Cuisine::Italian | Cuisine::Mexican => CuisineFamily::Western,
            Cuisine::Indian => CuisineFamily::SouthAsian,
        }
    }

    pub fn is_exclusive_with(&self, other: &Cuisine) -> bool {
        self.family() != other.family()
    }

    fn anchors(&self) -> &'static [&'static str] {
        match self {
            Cuisine::Thai => &[
                "tom yum", "tom yam", "pad thai", "som tam", "green curry", "massaman",
                "kra pao", "kaprao", "tom kha", "larb", "khao soi", "pad see ew", "ต้มยำ",
                "ผัดไทย", "ส้มตำ", "กะเพรา", "แกงเขียวหวาน", "มัสมั่น", "ลาบ", "ข้าวซอย",
            ],
            Cuisine::Japanese => &[
                "sushi", "sashimi", "ramen", "udon", "soba", "tempura", "teriyaki", "gyoza",
                "donburi", "miso", "takoyaki", "tonkatsu", "寿司", "ラーメン", "刺身",
            ],
            Cuisine::Korean => &[
                "kimchi", "bibimbap", "bulgogi", "tteokbokki", "japchae", "kimbap", "galbi",
                "김치", "비빔밥", "불고기",
            ],
            Cuisine::Chinese => &[
                "dim sum", "chow mein", "kung pao", "mapo tofu", "peking duck", "xiaolongbao",
                "char siu", "麻婆豆腐", "小笼包", "烤鸭",
            ],
            Cuisine::Italian => &[
                "pizza", "pasta", "spaghetti", "lasagna", "lasagne", "risotto", "carbonara",
                "bolognese", "margherita", "tiramisu", "gnocchi", "ravioli", "bruschetta",
                "penne",
            ],
            Cuisine::Mexican => &[
                "taco", "tacos", "burrito", "burritos", "quesadilla", "nachos", "enchilada",
                "enchiladas", "guacamole", "fajita", "fajitas",
            ],
            Cuisine::Indian => &[
                "biryani", "tikka masala", "masala", "naan", "paneer", "dal", "samosa",
                "vindaloo", "korma", "tandoori",
            ],
        }
    }
}

/// Cuisines whose anchor dishes appear in the given name.
pub fn cuisine_signals(name: &str) -> Vec<Cuisine> {
    let lower = name.to_lowercase();
    let words = word_sequence(&lower);
    Cuisine::ALL
        .into_iter()
        .filter(|c| c.anchors().iter().any(|kw| contains_keyword(&lower, &words, kw)))
        .collect()
}

// ──────────────────────────────────────────────
// Keyword matching
// ──────────────────────────────────────────────

/// True when `text` mentions any of `keywords`.
pub(crate) fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    let words = word_sequence(&lower);
    keywords.iter().any(|kw| contains_keyword(&lower, &words, kw))
}

/// Latin-script keywords match whole words only ("tea" must not match "steak").
/// Thai and CJK keywords match as substrings since those scripts have no spaces.
fn contains_keyword(lower: &str, words: &str, keyword: &str) -> bool {
    if keyword.is_ascii() {
        words.contains(&format!(" {keyword} "))
    } else {
        lower.contains(keyword)
    }
}

/// Space-padded sequence of ASCII words, used for whole-word matching.
fn word_sequence(lower: &str) -> String {
    let mut out = String::from(" ");
    for word in lower
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(word);
        out.push(' ');
    }
    out
}

pub(crate) fn is_thai(c: char) -> bool {
    ('\u{0E00}'..='\u{0E7F}').contains(&c)
}
