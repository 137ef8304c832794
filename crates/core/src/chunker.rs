//! Sentence-level chunking.
//!
//! Text is cut into sentence spans, oversized sentences are hard-split at
//! `max_chars`, sentences are packed greedily up to `max_chars`, and any
//! chunk still shorter than `min_chars` is folded into its predecessor (or,
//! for a leading fragment, into its successor).
//!
//! Spans are contiguous and cover the whole input, so the only thing a chunk
//! loses relative to the source is the whitespace trimmed off its edges.
//! A chunk can exceed `max_chars` only by absorbing a sub-minimum fragment
//! and the whitespace in front of it.

use crate::config::ChunkingConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    /// Source slice with surrounding whitespace trimmed.
    pub text: String,
    /// Byte offsets of the untrimmed span in the source text.
    pub start: usize,
    pub end: usize,
}

impl TextChunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    min_chars: usize,
    max_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

impl Chunker {
    pub fn new(cfg: ChunkingConfig) -> Self {
        Self {
            min_chars: cfg.min_chars,
            max_chars: cfg.max_chars.max(1),
        }
    }

    /// Empty or whitespace-only input yields exactly one empty chunk.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        if text.trim().is_empty() {
            return vec![TextChunk {
                text: String::new(),
                start: 0,
                end: text.len(),
            }];
        }

        let mut pieces = Vec::new();
        for (start, end) in sentence_spans(text) {
            self.hard_split(text, start, end, &mut pieces);
        }
        let packed = self.pack(text, &pieces);
        self.merge_short(text, &packed)
            .into_iter()
            .map(|(start, end)| TextChunk {
                text: text[start..end].trim().to_string(),
                start,
                end,
            })
            .collect()
    }

    fn hard_split(&self, text: &str, start: usize, end: usize, out: &mut Vec<(usize, usize)>) {
        let content_end = start + text[start..end].trim_end().len();
        let mut piece_start = start;
        let mut count = 0usize;
        for (offset, _) in text[start..content_end].char_indices() {
            if count == self.max_chars {
                out.push((piece_start, start + offset));
                piece_start = start + offset;
                count = 0;
            }
            count += 1;
        }
        out.push((piece_start, end));
    }

    fn pack(&self, text: &str, pieces: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let mut packed = Vec::new();
        let mut current: Option<(usize, usize)> = None;
        for &(start, end) in pieces {
            current = match current {
                None => Some((start, end)),
                Some((cur_start, cur_end)) => {
                    if trimmed_len(&text[cur_start..end]) > self.max_chars {
                        packed.push((cur_start, cur_end));
                        Some((start, end))
                    } else {
                        Some((cur_start, end))
                    }
                }
            };
        }
        if let Some(span) = current {
            packed.push(span);
        }
        packed
    }

    fn merge_short(&self, text: &str, packed: &[(usize, usize)]) -> Vec<(usize, usize)> {
        let mut out: Vec<(usize, usize)> = Vec::with_capacity(packed.len());
        let mut carry: Option<usize> = None;
        for &(start, end) in packed {
            let start = carry.take().unwrap_or(start);
            if trimmed_len(&text[start..end]) < self.min_chars {
                match out.last_mut() {
                    Some(last) => last.1 = end,
                    None => carry = Some(start),
                }
                continue;
            }
            out.push((start, end));
        }
        if let Some(start) = carry {
            out.push((start, text.len()));
        }
        out
    }
}

/// Normalized character-length weights; all-empty input gets equal weights.
pub fn length_weights<S: AsRef<str>>(texts: &[S]) -> Vec<f64> {
    let lengths: Vec<f64> = texts
        .iter()
        .map(|t| t.as_ref().chars().count() as f64)
        .collect();
    let total: f64 = lengths.iter().sum();
    if total <= 0.0 {
        let n = texts.len().max(1) as f64;
        return vec![1.0 / n; texts.len()];
    }
    lengths.into_iter().map(|l| l / total).collect()
}

fn trimmed_len(s: &str) -> usize {
    s.trim().chars().count()
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '。' | '！' | '？' | '…')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '”' | '’' | '»')
}

/// Contiguous byte spans covering `text`, one per sentence. A sentence ends
/// after terminal punctuation followed by whitespace and a character that is
/// not lowercase (so "e.g. this" stays together), or at a blank line. The
/// trailing whitespace belongs to the sentence it follows.
pub fn sentence_spans(text: &str) -> Vec<(usize, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let len = chars.len();
    let byte_at = |i: usize| if i < len { chars[i].0 } else { text.len() };

    let mut spans = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < len {
        let c = chars[i].1;
        if is_terminator(c) {
            let mut j = i + 1;
            while j < len && (is_terminator(chars[j].1) || is_closer(chars[j].1)) {
                j += 1;
            }
            if j < len && chars[j].1.is_whitespace() {
                let mut k = j;
                while k < len && chars[k].1.is_whitespace() {
                    k += 1;
                }
                if k == len || !chars[k].1.is_lowercase() {
                    let end = byte_at(k);
                    spans.push((start, end));
                    start = end;
                    i = k;
                    continue;
                }
            }
            i = j;
            continue;
        }
        if c == '\n' {
            let mut k = i + 1;
            let mut newlines = 1;
            while k < len && chars[k].1.is_whitespace() {
                if chars[k].1 == '\n' {
                    newlines += 1;
                }
                k += 1;
            }
            if newlines >= 2 && k < len {
                let end = byte_at(k);
                if !text[start..end].trim().is_empty() {
                    spans.push((start, end));
                    start = end;
                }
            }
            i = k;
            continue;
        }
        i += 1;
    }
    if start < text.len() {
        spans.push((start, text.len()));
    }
    spans
}
