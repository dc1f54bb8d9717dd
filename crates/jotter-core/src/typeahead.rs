use crate::content::Reference;
use crate::editor::{Anchor, MentionEditor};
use crate::fuzzy::{fuzzy_rank, FuzzyOptions};
use crate::store::{Jot, JotStore};
use std::sync::mpsc::{self, Receiver, Sender};

#[derive(Clone, Debug)]
pub struct TypeaheadConfig {
    /// Upper bound on the visible candidate list.
    pub max_items: usize,
    pub fuzzy: FuzzyOptions,
}

impl Default for TypeaheadConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            fuzzy: FuzzyOptions::default(),
        }
    }
}

/// Lifecycle notifications for the suggestion view. `Closed` fires
/// exactly once per open session, on every exit path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Opened,
    ItemsChanged,
    Closed,
}

/// Tag for one in-flight candidate fetch. Results are only accepted
/// while the tag is still current; a newer keystroke supersedes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

#[derive(Clone, Debug)]
struct OpenState {
    anchor: Anchor,
    query: String,
    items: Vec<Jot>,
    highlight: usize,
}

#[derive(Clone, Debug)]
enum State {
    Idle,
    Open(OpenState),
}

/// The mention session owned by one editor instance.
///
/// `Idle -> Open -> Idle`, with `Open` re-entered on every keystroke.
/// [`TypeaheadSession::observe`] is the synchronous driver: call it
/// after each editor change and it opens on a trigger, recomputes the
/// query, refreshes candidates, and force-closes when the anchor stops
/// being valid. Asynchronous drivers can instead pair
/// [`TypeaheadSession::set_query`] with [`TypeaheadSession::apply_results`];
/// stale generations are discarded, so a late response can never clobber
/// a newer query's items.
pub struct TypeaheadSession {
    config: TypeaheadConfig,
    state: State,
    generation: u64,
    watchers: Vec<Sender<SessionEvent>>,
}

impl TypeaheadSession {
    pub fn new(config: TypeaheadConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            generation: 0,
            watchers: Vec::new(),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    pub fn query(&self) -> Option<&str> {
        match &self.state {
            State::Open(open) => Some(open.query.as_str()),
            State::Idle => None,
        }
    }

    pub fn items(&self) -> &[Jot] {
        match &self.state {
            State::Open(open) => &open.items,
            State::Idle => &[],
        }
    }

    pub fn highlighted(&self) -> Option<&Jot> {
        match &self.state {
            State::Open(open) => open.items.get(open.highlight),
            State::Idle => None,
        }
    }

    /// Subscribes the suggestion view to session lifecycle events.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.watchers.push(tx);
        rx
    }

    /// Synchronous keystroke driver; see the type docs.
    pub fn observe(&mut self, editor: &MentionEditor, store: &JotStore) {
        let open_anchor = match &self.state {
            State::Idle => None,
            State::Open(open) => Some(open.anchor),
        };

        let Some(anchor) = open_anchor else {
            if let Some(anchor) = editor.trigger_anchor() {
                self.open_at(anchor, editor, store);
            }
            return;
        };

        match editor.query_since(anchor) {
            None => self.close(),
            Some(query) => {
                if self.query() == Some(query.as_str()) {
                    return;
                }
                if let Some(ticket) = self.set_query(&query) {
                    let items = self.fetch_candidates(store, &query);
                    self.apply_results(&ticket, items);
                }
            }
        }
    }

    /// Replaces the open query and returns the ticket any fetch for it
    /// must present. Returns `None` when the session is idle.
    pub fn set_query(&mut self, query: &str) -> Option<FetchTicket> {
        let State::Open(open) = &mut self.state else {
            return None;
        };
        open.query = query.to_string();
        self.generation += 1;
        Some(FetchTicket {
            generation: self.generation,
        })
    }

    /// Ranked candidates for `query` over the full corpus; an empty
    /// query yields the most recently updated jots. Capped at
    /// `max_items`.
    pub fn fetch_candidates(&self, store: &JotStore, query: &str) -> Vec<Jot> {
        let options = FuzzyOptions {
            limit: self.config.max_items,
            ..self.config.fuzzy.clone()
        };
        fuzzy_rank(&store.list(), query, &options)
    }

    /// Installs fetched items if the ticket is still current and the
    /// session still open. Returns `false` when the response was
    /// superseded and discarded.
    pub fn apply_results(&mut self, ticket: &FetchTicket, items: Vec<Jot>) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        let State::Open(open) = &mut self.state else {
            return false;
        };
        open.items = items;
        open.highlight = 0;
        self.emit(SessionEvent::ItemsChanged);
        true
    }

    /// Moves the highlight down, wrapping past the last item.
    pub fn navigate_down(&mut self) {
        if let State::Open(open) = &mut self.state {
            if !open.items.is_empty() {
                open.highlight = (open.highlight + 1) % open.items.len();
            }
        }
    }

    /// Moves the highlight up, wrapping past the first item.
    pub fn navigate_up(&mut self) {
        if let State::Open(open) = &mut self.state {
            if !open.items.is_empty() {
                open.highlight = (open.highlight + open.items.len() - 1) % open.items.len();
            }
        }
    }

    /// Escape: back to idle with no document mutation.
    pub fn escape(&mut self) {
        self.close();
    }

    /// Focus loss: treated as an implicit cancel.
    pub fn blur(&mut self) {
        self.close();
    }

    /// Enter/Tab: splices a reference for the highlighted item (label =
    /// the target's title right now) plus a trailing space, then returns
    /// to idle. A stale anchor degrades to a plain close.
    pub fn commit(&mut self, editor: &mut MentionEditor) -> Option<Reference> {
        let State::Open(open) = &self.state else {
            return None;
        };
        let Some(item) = open.items.get(open.highlight) else {
            self.close();
            return None;
        };

        let reference = Reference {
            jot_id: item.id.clone(),
            label: item.title.clone(),
        };
        let anchor = open.anchor;
        let committed = editor.commit_reference(anchor, &reference).is_ok();
        self.close();
        committed.then_some(reference)
    }

    fn open_at(&mut self, anchor: Anchor, editor: &MentionEditor, store: &JotStore) {
        let query = editor.query_since(anchor).unwrap_or_default();
        self.state = State::Open(OpenState {
            anchor,
            query: query.clone(),
            items: Vec::new(),
            highlight: 0,
        });
        self.emit(SessionEvent::Opened);

        self.generation += 1;
        let ticket = FetchTicket {
            generation: self.generation,
        };
        let items = self.fetch_candidates(store, &query);
        self.apply_results(&ticket, items);
    }

    fn close(&mut self) {
        if matches!(self.state, State::Open(_)) {
            self.state = State::Idle;
            self.emit(SessionEvent::Closed);
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.watchers.retain(|watcher| watcher.send(event).is_ok());
    }
}

impl Default for TypeaheadSession {
    fn default() -> Self {
        Self::new(TypeaheadConfig::default())
    }
}
