use crate::store::{Jot, JotStore};
use crate::tokenize::tokenize;
use std::collections::HashMap;

/// Ranked retrieval over the inverted index.
///
/// The query is tokenized with the same function the index uses. A query
/// whose tokens all get filtered (short tokens, punctuation) returns
/// nothing rather than matching everything. Score is the count of
/// distinct query terms a jot's postings contain; ties are broken by
/// most-recent-update, then id, so results are deterministic. Postings
/// whose jot no longer resolves are dropped, not surfaced as errors.
pub fn search(store: &JotStore, query: &str) -> Vec<Jot> {
    let terms = tokenize(query);
    if terms.is_empty() {
        return Vec::new();
    }

    let postings = store.postings_for(&terms);
    if postings.is_empty() {
        return Vec::new();
    }

    // postings are unique per (word, jot), so counting them per jot
    // counts distinct matched terms
    let mut matched_terms: HashMap<String, usize> = HashMap::new();
    for posting in &postings {
        *matched_terms.entry(posting.jot_id.clone()).or_default() += 1;
    }

    let mut ranked: Vec<(usize, Jot)> = matched_terms
        .into_iter()
        .filter_map(|(jot_id, score)| match store.get(&jot_id) {
            Some(jot) => Some((score, jot)),
            None => {
                log::warn!("dropping posting for missing jot: {jot_id}");
                None
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.0.cmp(&a.0)
            .then_with(|| b.1.updated_at.cmp(&a.1.updated_at))
            .then_with(|| a.1.id.cmp(&b.1.id))
    });

    ranked.into_iter().map(|(_, jot)| jot).collect()
}
