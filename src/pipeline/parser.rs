use std::sync::LazyLock;

use regex::Regex;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use super::types::{Currency, GenerativeDish};
use super::MenuError;

static PRICE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d,\d{3}(?:\.\d+)?\b|\d+(?:\.\d+)?").unwrap());

/// Parse a generative engine response into structured dishes.
///
/// Accepts a JSON array of dishes or `{"dishes": [...]}`, either bare or in a
/// ```` ```json ```` block. Parsing is strict: a single malformed item fails
/// the whole response. No repair is attempted.
pub fn parse_generative_response(response: &str) -> Result<Vec<GenerativeDish>, MenuError> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Envelope {
        List(Vec<GenerativeDish>),
        Wrapped { dishes: Vec<GenerativeDish> },
    }

    let json_str = extract_json_block(response)?;
    let envelope: Envelope = serde_json::from_str(json_str)
        .map_err(|e| MenuError::GenerativeParse(format!("Invalid dish JSON: {e}")))?;
    let dishes = match envelope {
        Envelope::List(dishes) | Envelope::Wrapped { dishes } => dishes,
    };

    if let Some(pos) = dishes.iter().position(|d| d.name.trim().is_empty()) {
        return Err(MenuError::GenerativeParse(format!("Dish {pos} has an empty name")));
    }
    if let Some(d) = dishes
        .iter()
        .find(|d| d.confidence.is_some_and(|c| !(0.0..=1.0).contains(&c)))
    {
        return Err(MenuError::GenerativeParse(format!(
            "Dish {:?} has confidence outside [0, 1]",
            d.name
        )));
    }

    Ok(dishes)
}

/// Locate the JSON payload: a ```` ```json ```` block, or the whole response
/// when it is bare JSON.
fn extract_json_block(response: &str) -> Result<&str, MenuError> {
    if let Some(start) = response.find("```json") {
        let content_start = start + 7;
        let end = response[content_start..]
            .find("```")
            .ok_or_else(|| MenuError::GenerativeParse("Unclosed JSON block".into()))?;
        return Ok(response[content_start..content_start + end].trim());
    }

    let trimmed = response.trim();
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        Ok(trimmed)
    } else {
        Err(MenuError::GenerativeParse("No JSON block found".into()))
    }
}

/// Price as a JSON number, `null`, or a numeric string such as `"120"`,
/// `"1,200"` or `"฿120"`. Any other string is an error.
pub fn deserialize_price<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PriceField {
        Number(f64),
        Text(String),
    }

    match Option::<PriceField>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PriceField::Number(n)) => Ok(Some(n)),
        Some(PriceField::Text(text)) => parse_price_text(&text).map_err(D::Error::custom),
    }
}

/// One amount, optionally with a known currency marker. `1,200` reads as a
/// thousands separator; any other second number makes the price ambiguous.
fn parse_price_text(text: &str) -> Result<Option<f64>, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let not_numeric = || format!("price is not a single amount: {trimmed:?}");

    let mut numbers = PRICE_NUMBER.find_iter(trimmed);
    let (Some(number), None) = (numbers.next(), numbers.next()) else {
        return Err(not_numeric());
    };
    let amount: f64 = number
        .as_str()
        .replace(',', "")
        .parse()
        .map_err(|_| not_numeric())?;

    let marker = format!("{}{}", &trimmed[..number.start()], &trimmed[number.end()..]);
    let marker = marker.trim().trim_end_matches(".-").trim_end_matches('-').trim();
    if !marker.is_empty() && Currency::from_marker(marker).is_none() {
        return Err(not_numeric());
    }
    Ok(Some(amount))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_array() {
        let response = r#"Here are the dishes:
```json
[
  {"name": "Pad Thai", "price": 120, "category": "noodle", "confidence": 0.9},
  {"name": "Tom Yum Goong", "price": 150}
]
```
"#;
        let dishes = parse_generative_response(response).unwrap();
        assert_eq!(dishes.len(), 2);
        assert_eq!(dishes[0].name, "Pad Thai");
        assert_eq!(dishes[0].price, Some(120.0));
        assert_eq!(dishes[0].category.as_deref(), Some("noodle"));
        assert_eq!(dishes[1].confidence, None);
    }

    #[test]
    fn parses_bare_wrapped_object() {
        let response = r#"{"dishes": [{"name": "Som Tam", "price": "80", "currency": "baht"}]}"#;
        let dishes = parse_generative_response(response).unwrap();
        assert_eq!(dishes[0].price, Some(80.0));
        assert_eq!(dishes[0].currency.as_deref(), Some("baht"));
    }

    #[test]
    fn string_prices_with_markers_parse() {
        let response = r#"[{"name": "Wagyu", "price": "1,200"}, {"name": "Latte", "price": "฿65"}, {"name": "Tea", "price": null}]"#;
        let dishes = parse_generative_response(response).unwrap();
        assert_eq!(dishes[0].price, Some(1200.0));
        assert_eq!(dishes[1].price, Some(65.0));
        assert_eq!(dishes[2].price, None);
    }

    #[test]
    fn non_numeric_price_fails_whole_parse() {
        let response = r#"[{"name": "Pad Thai", "price": 120}, {"name": "Soup", "price": "market price"}]"#;
        assert!(matches!(
            parse_generative_response(response),
            Err(MenuError::GenerativeParse(_))
        ));
    }

    #[test]
    fn multi_amount_strings_are_rejected() {
        for price in ["12.50/15", "120-150", "60 or 80", "12,500"] {
            let response = format!(r#"[{{"name": "Pad Thai", "price": "{price}"}}]"#);
            assert!(
                parse_generative_response(&response).is_err(),
                "{price:?} should not parse as one amount"
            );
        }
    }

    #[test]
    fn any_known_currency_marker_is_accepted() {
        let response = r#"[{"name": "Bibimbap", "price": "8000 won"}, {"name": "Ramen", "price": "¥900"}, {"name": "Som Tam", "price": "60.-"}, {"name": "Gyoza", "price": "US$ 7.50"}]"#;
        let prices: Vec<_> = parse_generative_response(response)
            .unwrap()
            .into_iter()
            .map(|d| d.price)
            .collect();
        assert_eq!(prices, vec![Some(8000.0), Some(900.0), Some(60.0), Some(7.5)]);
    }

    #[test]
    fn missing_json_is_error() {
        let err = parse_generative_response("I could not read this menu.").unwrap_err();
        assert!(err.to_string().contains("No JSON block"), "got: {err}");
    }

    #[test]
    fn unclosed_fence_is_error() {
        let err = parse_generative_response("```json\n[{\"name\": \"Pad Thai\"}]").unwrap_err();
        assert!(err.to_string().contains("Unclosed"), "got: {err}");
    }

    #[test]
    fn truncated_json_is_not_repaired() {
        let response = r#"[{"name": "Pad Thai", "price": 120}, {"name": "Tom"#;
        assert!(parse_generative_response(response).is_err());
    }

    #[test]
    fn empty_name_fails() {
        let response = r#"[{"name": "  ", "price": 50}]"#;
        assert!(parse_generative_response(response).is_err());
    }

    #[test]
    fn confidence_out_of_range_fails() {
        let response = r#"[{"name": "Pad Thai", "price": 50, "confidence": 7}]"#;
        assert!(parse_generative_response(response).is_err());
    }

    #[test]
    fn empty_list_is_valid() {
        assert!(parse_generative_response("[]").unwrap().is_empty());
    }
}
