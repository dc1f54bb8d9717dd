use std::collections::HashSet;

/// Minimum token length kept by the tokenizer; anything shorter behaves
/// like a stopword.
pub const MIN_TOKEN_LEN: usize = 3;

/// Splits text into the deduplicated set of lowercase `[a-z0-9]+` terms,
/// dropping tokens of length <= 2. Both indexing and querying go through
/// this exact function so their term spaces always match. Total: empty
/// input yields an empty set.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        let lower = ch.to_ascii_lowercase();
        if lower.is_ascii_alphanumeric() {
            current.push(lower);
        } else {
            flush_token(&mut current, &mut seen, &mut out);
        }
    }
    flush_token(&mut current, &mut seen, &mut out);

    out
}

fn flush_token(current: &mut String, seen: &mut HashSet<String>, out: &mut Vec<String>) {
    if current.is_empty() {
        return;
    }
    let token = std::mem::take(current);
    if token.len() < MIN_TOKEN_LEN {
        return;
    }
    if seen.insert(token.clone()) {
        out.push(token);
    }
}
