use crate::content::{extract_text, ContentNode};
use crate::index::{InvertedIndex, Posting};
use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DATABASE_SCHEMA_VERSION: u32 = 1;

static JOT_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// One note: title, structured content, the plain text derived from that
/// content, and timestamps. `text_content` is never hand-edited; it is
/// recomputed whenever `content` changes.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Jot {
    pub id: String,
    pub title: String,
    pub content: ContentNode,
    #[serde(rename = "textContent")]
    pub text_content: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Partial update for [`JotStore::update`]. Absent fields are untouched.
#[derive(Clone, Debug, Default)]
pub struct JotPatch {
    pub title: Option<String>,
    pub content: Option<ContentNode>,
}

/// On-disk layout: both tables live in one file so a single rename
/// commits document and index changes together.
#[derive(Serialize, Deserialize)]
struct DatabaseFile {
    #[serde(rename = "schemaVersion")]
    schema_version: u32,
    jots: Vec<Jot>,
    postings: Vec<Posting>,
}

/// Canonical owner of jots plus the derived inverted index.
///
/// Every mutation stages the next `{jots, postings}` state, persists it
/// atomically (temp file + rename), and only then swaps it in and
/// notifies subscribers. A failed write therefore leaves both the file
/// and the in-memory state untouched.
pub struct JotStore {
    path: Option<PathBuf>,
    jots: BTreeMap<String, Jot>,
    index: InvertedIndex,
    watchers: Vec<Sender<Vec<Jot>>>,
}

impl JotStore {
    /// Ephemeral store with no backing file. Used by tests and by
    /// callers that manage persistence themselves.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            jots: BTreeMap::new(),
            index: InvertedIndex::new(),
            watchers: Vec::new(),
        }
    }

    /// Opens (or initializes) the database file at `path`.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut store = Self {
            path: Some(path.clone()),
            jots: BTreeMap::new(),
            index: InvertedIndex::new(),
            watchers: Vec::new(),
        };

        match fs::read_to_string(&path) {
            Ok(raw) => {
                let file: DatabaseFile = serde_json::from_str(&raw)
                    .with_context(|| format!("parse jot database: {}", path.display()))?;
                if file.schema_version != DATABASE_SCHEMA_VERSION {
                    anyhow::bail!("unsupported jot database schema: {}", file.schema_version);
                }
                store.jots = file
                    .jots
                    .into_iter()
                    .map(|jot| (jot.id.clone(), jot))
                    .collect();
                store.index = InvertedIndex::restore(&file.postings);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err).with_context(|| format!("read jot database: {}", path.display()));
            }
        }

        Ok(store)
    }

    /// Creates a jot, deriving its text and indexing it in the same
    /// commit as the document write.
    pub fn create(&mut self, title: &str, content: ContentNode) -> Result<Jot> {
        let now = Utc::now();
        let jot = Jot {
            id: generate_jot_id(),
            title: title.to_string(),
            text_content: extract_text(Some(&content)),
            content,
            created_at: now,
            updated_at: now,
        };

        let mut jots = self.jots.clone();
        let mut index = self.index.clone();
        index.reindex(&jot.id, &jot.title, &jot.text_content);
        jots.insert(jot.id.clone(), jot.clone());

        self.commit(jots, index)?;
        Ok(jot)
    }

    /// Applies a partial update. Unknown or blank ids resolve to `None`,
    /// never an error. `updated_at` is bumped on every successful call;
    /// the index is rewritten only when title or content actually change.
    pub fn update(&mut self, id: &str, patch: JotPatch) -> Result<Option<Jot>> {
        if id.trim().is_empty() {
            log::warn!("update called with blank jot id");
            return Ok(None);
        }
        let Some(existing) = self.jots.get(id) else {
            return Ok(None);
        };

        let mut next = existing.clone();
        let mut needs_reindex = false;

        if let Some(title) = patch.title {
            if title != next.title {
                next.title = title;
                needs_reindex = true;
            }
        }
        if let Some(content) = patch.content {
            let text_content = extract_text(Some(&content));
            if text_content != next.text_content || content != next.content {
                next.content = content;
                next.text_content = text_content;
                needs_reindex = true;
            }
        }
        next.updated_at = Utc::now();

        let mut jots = self.jots.clone();
        let mut index = self.index.clone();
        if needs_reindex {
            index.reindex(&next.id, &next.title, &next.text_content);
        }
        jots.insert(next.id.clone(), next.clone());

        self.commit(jots, index)?;
        Ok(Some(next))
    }

    /// Deletes a jot and all its postings in one commit. Unknown and
    /// blank ids are a no-op.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            log::warn!("delete called with blank jot id");
            return Ok(());
        }
        if !self.jots.contains_key(id) {
            return Ok(());
        }

        let mut jots = self.jots.clone();
        let mut index = self.index.clone();
        jots.remove(id);
        index.remove(id);

        self.commit(jots, index)
    }

    pub fn get(&self, id: &str) -> Option<Jot> {
        if id.trim().is_empty() {
            log::warn!("get called with blank jot id");
            return None;
        }
        self.jots.get(id).cloned()
    }

    /// The most recently updated jot, if any.
    pub fn latest(&self) -> Option<Jot> {
        self.list().into_iter().next()
    }

    /// Snapshot of all jots, most recently updated first; equal
    /// timestamps fall back to id order so the listing is deterministic.
    pub fn list(&self) -> Vec<Jot> {
        let mut out: Vec<Jot> = self.jots.values().cloned().collect();
        out.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        out
    }

    pub fn len(&self) -> usize {
        self.jots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jots.is_empty()
    }

    /// Subscribes to the ordered jot list. The current list is delivered
    /// immediately and again after every committed mutation.
    pub fn subscribe(&mut self) -> Receiver<Vec<Jot>> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.list());
        self.watchers.push(tx);
        rx
    }

    /// Postings matching any of `terms`, for the search layer.
    pub fn postings_for(&self, terms: &[String]) -> Vec<Posting> {
        self.index.postings_for(terms)
    }

    /// The indexed terms of one jot, primarily for tests and diagnostics.
    pub fn indexed_terms(&self, id: &str) -> Vec<String> {
        self.index
            .terms_for(id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Regenerates every posting from the canonical jots. The index is a
    /// cache; this is the recovery path when it is missing or suspect.
    pub fn rebuild_index(&mut self) -> Result<()> {
        let mut index = InvertedIndex::new();
        for jot in self.jots.values() {
            index.reindex(&jot.id, &jot.title, &jot.text_content);
        }
        self.commit(self.jots.clone(), index)
    }

    fn commit(&mut self, jots: BTreeMap<String, Jot>, index: InvertedIndex) -> Result<()> {
        if let Some(path) = &self.path {
            let file = DatabaseFile {
                schema_version: DATABASE_SCHEMA_VERSION,
                jots: jots.values().cloned().collect(),
                postings: index.snapshot(),
            };
            write_atomic(path, &file)?;
            log::debug!(
                "committed jot database: {} jots, {} postings",
                file.jots.len(),
                file.postings.len()
            );
        }

        self.jots = jots;
        self.index = index;
        self.notify_watchers();
        Ok(())
    }

    fn notify_watchers(&mut self) {
        if self.watchers.is_empty() {
            return;
        }
        let listing = self.list();
        self.watchers
            .retain(|watcher| watcher.send(listing.clone()).is_ok());
    }
}

fn write_atomic(path: &Path, file: &DatabaseFile) -> Result<()> {
    let json = serde_json::to_string_pretty(file).context("serialize jot database")?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| "create jot database parent dir")?;
        }
    }

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write jot database: {}", tmp.display()))?;
    fs::rename(&tmp, path)
        .with_context(|| format!("commit jot database: {}", path.display()))?;
    Ok(())
}

/// Creation-time stable id: millis + pid + process-local sequence.
pub fn generate_jot_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or_default();
    let pid = std::process::id() as u64;
    let seq = JOT_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("J{millis:011X}{pid:05X}{seq:04X}")
}
