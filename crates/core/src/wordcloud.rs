//! Per-category word frequencies for word-cloud rendering.

use crate::text;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Shown for categories with no countable words.
pub const PLACEHOLDER_WORDS: &[&str] = &[
    "document",
    "content",
    "category",
    "analysis",
    "classification",
    "text",
    "words",
    "summary",
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and", "any",
    "are", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "else", "ever", "every", "few", "for", "from", "further", "had", "has", "have", "having", "he",
    "her", "here", "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in",
    "into", "is", "it", "its", "itself", "just", "may", "me", "might", "more", "most", "much",
    "must", "my", "myself", "neither", "no", "nor", "not", "now", "of", "off", "on", "once",
    "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own", "same",
    "shall", "she", "should", "since", "so", "some", "such", "than", "that", "the", "their",
    "theirs", "them", "themselves", "then", "there", "these", "they", "this", "those", "though",
    "through", "thus", "to", "too", "under", "until", "up", "upon", "very", "was", "we", "were",
    "what", "when", "where", "whether", "which", "while", "who", "whom", "whose", "why", "will",
    "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordFrequency {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordCloud {
    pub category: String,
    pub words: Vec<WordFrequency>,
    /// True when `words` is the placeholder vocabulary.
    pub placeholder: bool,
}

/// Alphabetic words of at least `min_len` characters that are not stop words.
pub fn tokens(text: &str, min_len: usize) -> impl Iterator<Item = String> + '_ {
    text::words(text).filter(move |w| {
        w.chars().count() >= min_len
            && w.chars().all(char::is_alphabetic)
            && !stop_words().contains(w.as_str())
    })
}

/// Top `top_n` words by count, ties broken alphabetically.
pub fn top_words<'a>(
    texts: impl IntoIterator<Item = &'a str>,
    top_n: usize,
    min_len: usize,
) -> Vec<WordFrequency> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for t in texts {
        for word in tokens(t, min_len) {
            *counts.entry(word).or_default() += 1;
        }
    }
    let mut words: Vec<WordFrequency> = counts
        .into_iter()
        .map(|(word, count)| WordFrequency { word, count })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(top_n);
    words
}

pub fn build<'a>(
    category: &str,
    texts: impl IntoIterator<Item = &'a str>,
    top_n: usize,
    min_len: usize,
) -> WordCloud {
    let words = top_words(texts, top_n, min_len);
    if words.is_empty() {
        return WordCloud {
            category: category.to_string(),
            words: PLACEHOLDER_WORDS
                .iter()
                .take(top_n.max(1))
                .map(|w| WordFrequency {
                    word: w.to_string(),
                    count: 1,
                })
                .collect(),
            placeholder: true,
        };
    }
    WordCloud {
        category: category.to_string(),
        words,
        placeholder: false,
    }
}
