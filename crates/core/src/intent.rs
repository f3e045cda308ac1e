use crate::models::Intent;

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Maps a classifier label onto the closed intent set. Anything that is not
/// one of the five routable labels becomes `Intent::Unknown`.
pub fn parse_intent_label(label: &str) -> Intent {
    let normalized = label.trim().to_lowercase().replace(['-', ' '], "_");

    Intent::ROUTABLE
        .into_iter()
        .find(|intent| intent.as_label() == normalized)
        .unwrap_or(Intent::Unknown)
}

/// True when the user already told us where they are, so a facility search
/// can stay location-specific.
pub fn mentions_location(text: &str) -> bool {
    contains_any(&text.to_lowercase(), &["location", "near"])
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| input.contains(needle))
}
