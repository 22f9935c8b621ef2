use super::types::RawLine;

/// Sanitize recognized menu text before classification.
/// Strips control and zero-width characters, folds full-width digits,
/// trims each line and drops empty ones. Currency symbols and decorative
/// glyphs are kept: the line classifier relies on them.
pub fn sanitize_menu_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| *c == '\n' || *c == '\t' || !c.is_control())
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' // Zero-width space
                    | '\u{200C}' // Zero-width non-joiner
                    | '\u{200D}' // Zero-width joiner
                    | '\u{FEFF}' // Byte-order mark
                    | '\u{FFFD}' // Replacement character
            )
        })
        .map(fold_full_width)
        .collect::<String>()
        .lines()
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split sanitized text into indexed lines.
pub fn split_raw_lines(raw: &str) -> Vec<RawLine> {
    sanitize_menu_text(raw)
        .lines()
        .enumerate()
        .map(|(index, text)| RawLine::new(index, text))
        .collect()
}

/// Full-width digits and a few full-width separators appear on CJK menus.
fn fold_full_width(c: char) -> char {
    match c {
        '０'..='９' => char::from_u32(c as u32 - '０' as u32 + '0' as u32).unwrap_or(c),
        '／' => '/',
        '，' => ',',
        '．' => '.',
        '（' => '(',
        '）' => ')',
        '\u{3000}' => ' ',
        _ => c,
    }
}
