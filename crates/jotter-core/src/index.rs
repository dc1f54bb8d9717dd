use crate::tokenize::tokenize;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// One inverted-index entry: `word` appears in the jot with id `jot_id`.
/// Unique per pair; a word occurring many times in one jot still yields
/// a single posting.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct Posting {
    pub word: String,
    #[serde(rename = "jotId")]
    pub jot_id: String,
}

/// Word -> jot-id postings, kept with a reverse map so a jot's postings
/// can be fully replaced or removed in one pass. Derived state: it is
/// rebuildable from the canonical jots at any time.
#[derive(Clone, Debug, Default)]
pub struct InvertedIndex {
    by_word: HashMap<String, BTreeSet<String>>,
    by_jot: HashMap<String, BTreeSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every posting for `jot_id` and regenerates them from the
    /// union of title and body terms. Full replace, no diffing; calling
    /// twice with the same input yields the same posting set.
    pub fn reindex(&mut self, jot_id: &str, title: &str, text_content: &str) {
        self.remove(jot_id);

        let mut terms: BTreeSet<String> = tokenize(title).into_iter().collect();
        terms.extend(tokenize(text_content));

        for term in &terms {
            self.by_word
                .entry(term.clone())
                .or_default()
                .insert(jot_id.to_string());
        }
        if !terms.is_empty() {
            self.by_jot.insert(jot_id.to_string(), terms);
        }
    }

    /// Removes every posting for `jot_id`. No-op for unknown ids.
    pub fn remove(&mut self, jot_id: &str) {
        let Some(terms) = self.by_jot.remove(jot_id) else {
            return;
        };
        for term in terms {
            if let Some(ids) = self.by_word.get_mut(&term) {
                ids.remove(jot_id);
                if ids.is_empty() {
                    self.by_word.remove(&term);
                }
            }
        }
    }

    /// All postings whose word is in `terms`, in deterministic
    /// (word, jot id) order.
    pub fn postings_for(&self, terms: &[String]) -> Vec<Posting> {
        let mut out = Vec::new();
        for term in terms {
            if let Some(ids) = self.by_word.get(term) {
                for jot_id in ids {
                    out.push(Posting {
                        word: term.clone(),
                        jot_id: jot_id.clone(),
                    });
                }
            }
        }
        out
    }

    /// The indexed term set of one jot, if it has any postings.
    pub fn terms_for(&self, jot_id: &str) -> Option<&BTreeSet<String>> {
        self.by_jot.get(jot_id)
    }

    pub fn posting_count(&self) -> usize {
        self.by_jot.values().map(BTreeSet::len).sum()
    }

    /// Flat sorted posting list for persistence.
    pub fn snapshot(&self) -> Vec<Posting> {
        let mut out = Vec::with_capacity(self.posting_count());
        for (jot_id, terms) in &self.by_jot {
            for term in terms {
                out.push(Posting {
                    word: term.clone(),
                    jot_id: jot_id.clone(),
                });
            }
        }
        out.sort();
        out
    }

    /// Rebuilds the in-memory maps from a persisted posting list.
    pub fn restore(postings: &[Posting]) -> Self {
        let mut index = Self::default();
        for posting in postings {
            index
                .by_word
                .entry(posting.word.clone())
                .or_default()
                .insert(posting.jot_id.clone());
            index
                .by_jot
                .entry(posting.jot_id.clone())
                .or_default()
                .insert(posting.word.clone());
        }
        index
    }
}
