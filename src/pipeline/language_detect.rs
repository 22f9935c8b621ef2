//! Lightweight source-language detection for menu text.
//!
//! Counts letters per script. Menus are often bilingual (Thai name, English
//! translation), so any non-Latin script holding a meaningful share of the
//! letters wins over Latin.

/// Share of letters a non-Latin script needs to be chosen over Latin.
const NATIVE_SCRIPT_SHARE: f64 = 0.20;

#[derive(Debug, Default, Clone, Copy)]
struct ScriptCounts {
    thai: usize,
    kana: usize,
    hangul: usize,
    han: usize,
    latin: usize,
}

impl ScriptCounts {
    fn total(&self) -> usize {
        self.thai + self.kana + self.hangul + self.han + self.latin
    }
}

/// Detect the primary language of menu text.
/// Returns a BCP-47 primary tag: `th`, `ja`, `ko`, `zh`, `en`, or `und`.
pub fn detect_language(text: &str) -> String {
    let counts = count_scripts(text);
    let total = counts.total();
    if total == 0 {
        return "und".to_string();
    }

    // Japanese mixes kana with Han; kana is the distinguishing signal.
    let japanese = if counts.kana > 0 { counts.kana + counts.han } else { 0 };
    let chinese = if counts.kana > 0 { 0 } else { counts.han };

    let native = [
        ("th", counts.thai),
        ("ja", japanese),
        ("ko", counts.hangul),
        ("zh", chinese),
    ];

    let best = native
        .iter()
        .copied()
        .filter(|(_, n)| *n > 0)
        .max_by_key(|(_, n)| *n);

    match best {
        Some((tag, n)) if n as f64 / total as f64 >= NATIVE_SCRIPT_SHARE => tag.to_string(),
        _ if counts.latin > 0 => "en".to_string(),
        Some((tag, _)) => tag.to_string(),
        None => "und".to_string(),
    }
}

/// True when the text contains letters of any script we read menus in.
pub fn has_script_letters(text: &str) -> bool {
    count_scripts(text).total() > 0
}

fn count_scripts(text: &str) -> ScriptCounts {
    let mut counts = ScriptCounts::default();
    for ch in text.chars() {
        match ch {
            '\u{0E01}'..='\u{0E2E}' | '\u{0E30}'..='\u{0E3A}' | '\u{0E40}'..='\u{0E4E}' => {
                counts.thai += 1
            }
            '\u{3040}'..='\u{30FF}' => counts.kana += 1,
            '\u{AC00}'..='\u{D7AF}' | '\u{1100}'..='\u{11FF}' => counts.hangul += 1,
            '\u{4E00}'..='\u{9FFF}' => counts.han += 1,
            c if c.is_alphabetic() && (c.is_ascii() || ('\u{00C0}'..='\u{024F}').contains(&c)) => {
                counts.latin += 1
            }
            _ => {}
        }
    }
    counts
}
