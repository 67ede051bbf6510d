//! Color words to RGBA

use scenesmith_stage_api::ColorSpec;
use serde_json::Value;

/// Fallback for color values that name no known color
pub const NEUTRAL_GRAY: ColorSpec = ColorSpec::rgba(0.5, 0.5, 0.5, 1.0);

const CANONICAL: &[(&str, ColorSpec)] = &[
    ("red", ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)),
    ("green", ColorSpec::rgba(0.0, 1.0, 0.0, 1.0)),
    ("blue", ColorSpec::rgba(0.0, 0.0, 1.0, 1.0)),
    ("yellow", ColorSpec::rgba(1.0, 1.0, 0.0, 1.0)),
    ("orange", ColorSpec::rgba(1.0, 0.5, 0.0, 1.0)),
    ("purple", ColorSpec::rgba(0.5, 0.0, 1.0, 1.0)),
    ("pink", ColorSpec::rgba(1.0, 0.0, 0.5, 1.0)),
    ("brown", ColorSpec::rgba(0.6, 0.3, 0.1, 1.0)),
    ("black", ColorSpec::rgba(0.0, 0.0, 0.0, 1.0)),
    ("white", ColorSpec::rgba(1.0, 1.0, 1.0, 1.0)),
    ("gray", NEUTRAL_GRAY),
    ("cyan", ColorSpec::rgba(0.0, 1.0, 1.0, 1.0)),
    ("magenta", ColorSpec::rgba(1.0, 0.0, 1.0, 1.0)),
];

/// Synonym -> canonical name
const SYNONYMS: &[(&str, &str)] = &[
    ("grey", "gray"),
    ("crimson", "red"),
    ("scarlet", "red"),
    ("ruby", "red"),
    ("maroon", "red"),
    ("emerald", "green"),
    ("lime", "green"),
    ("olive", "green"),
    ("navy", "blue"),
    ("azure", "blue"),
    ("cobalt", "blue"),
    ("gold", "yellow"),
    ("golden", "yellow"),
    ("amber", "orange"),
    ("violet", "purple"),
    ("lavender", "purple"),
    ("tan", "brown"),
    ("beige", "brown"),
    ("charcoal", "black"),
    ("ebony", "black"),
    ("ivory", "white"),
    ("silver", "gray"),
    ("teal", "cyan"),
    ("turquoise", "cyan"),
    ("fuchsia", "magenta"),
];

/// RGBA for one color word, canonical or synonym
#[must_use]
pub fn color_for_word(word: &str) -> Option<ColorSpec> {
    let word = word.to_lowercase();
    let canonical = SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == word)
        .map_or(word.as_str(), |(_, canonical)| canonical);
    CANONICAL
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, color)| *color)
}

/// First color word in `text`, in reading order
#[must_use]
pub fn extract_color(text: &str) -> Option<ColorSpec> {
    text.split(|c: char| !c.is_ascii_alphabetic())
        .filter(|w| !w.is_empty())
        .find_map(color_for_word)
}

/// Color from a proposal value: a phrase, or 3-4 numeric channels.
///
/// Channels above 1 are read as 0-255. Anything else is neutral gray.
#[must_use]
pub fn color_from_value(value: &Value) -> ColorSpec {
    match value {
        Value::String(text) => extract_color(text).unwrap_or(NEUTRAL_GRAY),
        Value::Array(items) => channels(items).unwrap_or(NEUTRAL_GRAY),
        _ => NEUTRAL_GRAY,
    }
}

fn channels(items: &[Value]) -> Option<ColorSpec> {
    let values: Vec<f64> = items.iter().map(Value::as_f64).collect::<Option<_>>()?;
    if !(3..=4).contains(&values.len()) {
        return None;
    }
    let scale = if values.iter().any(|v| *v > 1.0) { 255.0 } else { 1.0 };
    let channel = |i: usize| (values.get(i).copied().unwrap_or(scale) / scale).clamp(0.0, 1.0);
    Some(ColorSpec::rgba(channel(0), channel(1), channel(2), channel(3)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_canonical_and_synonyms() {
        assert_eq!(color_for_word("Red"), Some(ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)));
        assert_eq!(color_for_word("crimson"), color_for_word("red"));
        assert_eq!(color_for_word("grey"), Some(NEUTRAL_GRAY));
        assert_eq!(color_for_word("plaid"), None);
    }

    #[test]
    fn test_extract_is_word_based() {
        assert_eq!(extract_color("a red cricket ball"), color_for_word("red"));
        // "tan" inside "stand" is not a color
        assert_eq!(extract_color("a lamp stand"), None);
        assert_eq!(extract_color("blue mug on a white table"), color_for_word("blue"));
    }

    #[test]
    fn test_values() {
        assert_eq!(color_from_value(&json!("deep navy")), color_for_word("navy").unwrap());
        assert_eq!(color_from_value(&json!("sparkly")), NEUTRAL_GRAY);
        assert_eq!(
            color_from_value(&json!([1.0, 0.5, 0.0])),
            ColorSpec::rgba(1.0, 0.5, 0.0, 1.0)
        );
        assert_eq!(
            color_from_value(&json!([255, 0, 0, 255])),
            ColorSpec::rgba(1.0, 0.0, 0.0, 1.0)
        );
        assert_eq!(color_from_value(&json!([1, 2])), NEUTRAL_GRAY);
        assert_eq!(color_from_value(&json!(7)), NEUTRAL_GRAY);
    }

    proptest! {
        #[test]
        fn prop_color_extraction_is_deterministic(index in 0..CANONICAL.len(), prefix in "[a-z ]{0,12}") {
            let (word, expected) = CANONICAL[index];
            let text = format!("{prefix} {word}");
            let first = extract_color(&text);
            prop_assert_eq!(first, extract_color(&text));
            // The prefix may itself hold an earlier color word
            if extract_color(&prefix).is_none() {
                prop_assert_eq!(first, Some(expected));
            }
        }
    }
}
