use once_cell::sync::Lazy;
use regex::Regex;

static CLEANER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^\p{Devanagari}\p{Latin}\p{Nd}\s]+").expect("valid tokenizer regex")
});

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "what", "how", "are", "can", "have", "has", "from", "that",
    "this", "about", "near", "my", "me", "is", "of", "to", "in", "on", "or", "an", "do", "i",
];

pub fn tokenize(input: &str) -> Vec<String> {
    let normalized = CLEANER.replace_all(input, " ").to_lowercase();

    normalized
        .split_whitespace()
        .map(str::trim)
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !STOPWORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}
