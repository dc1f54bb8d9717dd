//! Core of a local-first jot (note) editor: the document store, the
//! derived inverted index, ranked and fuzzy search, and the typeahead
//! protocol that turns `@mention` keystrokes into durable references
//! between jots.

pub mod content;
pub mod editor;
pub mod fuzzy;
pub mod index;
pub mod search;
pub mod store;
pub mod tokenize;
pub mod typeahead;
