//! Text normalization shared by embedding, hashing and word counting.

use regex::Regex;
use std::sync::OnceLock;

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("static regex"))
}

/// Case-folded, whitespace-collapsed form. Two texts that differ only in
/// case, line breaks or spacing normalize to the same string.
pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Embedding input: [`normalize`] plus every number replaced by `<num>`.
pub fn preprocess(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    number_pattern()
        .replace_all(&collapsed, "<num>")
        .to_lowercase()
}

/// Lower-cased runs of alphanumeric characters.
pub fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
}
