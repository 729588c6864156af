use std::sync::OnceLock;

use regex::Regex;

use crate::settings::CardMarker;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRole {
    DateMarker,
    CardMarker(String),
    Numeric,
    Other,
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{2}/\d{2}/\d{4}").unwrap())
}

/// `DD/MM/YYYY` at the very start of the line. Trailing text is allowed.
pub fn is_date_marker(line: &str) -> bool {
    date_re().is_match(line)
}

pub fn is_numeric_token(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_description(desc: &str) -> bool {
    desc.chars().any(char::is_alphabetic)
}

/// Name of the card whose identifier appears in the line, if any.
pub fn card_for_line<'a>(line: &str, markers: &'a [CardMarker]) -> Option<&'a str> {
    markers
        .iter()
        .find(|m| !m.identifier.is_empty() && line.contains(&m.identifier))
        .map(|m| m.card.as_str())
}

pub fn classify(line: &str, markers: &[CardMarker]) -> LineRole {
    if let Some(card) = card_for_line(line, markers) {
        LineRole::CardMarker(card.to_string())
    } else if is_date_marker(line) {
        LineRole::DateMarker
    } else if is_numeric_token(line) {
        LineRole::Numeric
    } else {
        LineRole::Other
    }
}
