use crate::store::Jot;

/// Tuning for [`fuzzy_rank`]. Scores are similarities in `0.0..=1.0`;
/// candidates scoring below `threshold` are dropped, so a lower
/// threshold is more permissive. Titles outweigh body text.
#[derive(Clone, Debug)]
pub struct FuzzyOptions {
    pub threshold: f64,
    pub limit: usize,
    pub title_weight: f64,
    pub body_weight: f64,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            limit: 10,
            title_weight: 1.0,
            body_weight: 0.5,
        }
    }
}

/// Approximate matching over a small in-memory working set, for places
/// where the inverted index is unavailable or overkill (typeahead). An
/// empty query returns the `limit` most recently updated jots rather
/// than an arbitrary slice. Ordering is score desc, then most recent
/// update, then id.
pub fn fuzzy_rank(jots: &[Jot], query: &str, options: &FuzzyOptions) -> Vec<Jot> {
    if options.limit == 0 {
        return Vec::new();
    }

    let query = query.trim().to_lowercase();
    if query.is_empty() {
        let mut recent: Vec<Jot> = jots.to_vec();
        recent.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        recent.truncate(options.limit);
        return recent;
    }

    let mut scored: Vec<(f64, Jot)> = jots
        .iter()
        .filter_map(|jot| {
            let title = options.title_weight * field_similarity(&jot.title.to_lowercase(), &query);
            let body =
                options.body_weight * field_similarity(&jot.text_content.to_lowercase(), &query);
            let score = title.max(body);
            if score >= options.threshold {
                Some((score, jot.clone()))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.0.total_cmp(&a.0)
            .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });
    scored.truncate(options.limit);
    scored.into_iter().map(|(_, jot)| jot).collect()
}

/// Similarity of one lowercase field against a lowercase query: the best
/// of whole-field edit distance, per-word edit distance (discounted),
/// prefix/containment boosts and an in-order subsequence floor.
fn field_similarity(field: &str, query: &str) -> f64 {
    if field.is_empty() || query.is_empty() {
        return 0.0;
    }
    if field == query {
        return 1.0;
    }

    let mut best = strsim::normalized_levenshtein(field, query);
    if field.starts_with(query) {
        best = best.max(0.9);
    } else if field.contains(query) {
        best = best.max(0.75);
    }

    for word in field.split_whitespace() {
        if word == query {
            best = best.max(0.95);
        } else {
            best = best.max(0.9 * strsim::normalized_levenshtein(word, query));
        }
    }

    if is_subsequence(field, query) {
        best = best.max(0.5);
    }

    best
}

fn is_subsequence(haystack: &str, needle: &str) -> bool {
    let mut chars = haystack.chars();
    needle
        .chars()
        .all(|needed| chars.by_ref().any(|ch| ch == needed))
}
