use crate::content::{ContentNode, Reference};

/// The character that opens a mention session.
pub const MENTION_TRIGGER: char = '@';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditorError {
    OutOfBounds,
    NotTextNode,
    InvalidAnchor,
}

/// Byte offset of a mention trigger inside the active text node.
pub type Anchor = usize;

/// Minimal concrete editor over a structured document: enough surface
/// for the typeahead protocol and its tests. It tracks one active text
/// node (block index, inline index, byte cursor), supports plain typing,
/// trigger detection, and the atomic splice that turns the typed
/// trigger-plus-query range into a reference node with a trailing space.
#[derive(Clone, Debug)]
pub struct MentionEditor {
    doc: ContentNode,
    block: usize,
    node: usize,
    cursor: usize,
}

impl MentionEditor {
    /// Empty document: one paragraph with one empty text node.
    pub fn empty() -> Self {
        let doc = ContentNode::doc(vec![ContentNode::paragraph(vec![ContentNode::text("")])]);
        Self {
            doc,
            block: 0,
            node: 0,
            cursor: 0,
        }
    }

    /// Wraps an existing document, placing the cursor at the end of the
    /// last text node (appending an empty paragraph when there is none).
    pub fn from_document(mut doc: ContentNode) -> Self {
        let position = last_text_position(&doc);
        let (block, node, cursor) = match position {
            Some(found) => found,
            None => {
                doc.content
                    .push(ContentNode::paragraph(vec![ContentNode::text("")]));
                (doc.content.len() - 1, 0, 0)
            }
        };
        Self {
            doc,
            block,
            node,
            cursor,
        }
    }

    pub fn document(&self) -> &ContentNode {
        &self.doc
    }

    pub fn into_document(self) -> ContentNode {
        self.doc
    }

    /// (block, inline node, byte offset) of the cursor.
    pub fn cursor_position(&self) -> (usize, usize, usize) {
        (self.block, self.node, self.cursor)
    }

    /// Moves the cursor to a byte offset inside a specific text node.
    pub fn set_cursor(&mut self, block: usize, node: usize, cursor: usize) -> Result<(), EditorError> {
        let text = text_at(&self.doc, block, node).ok_or(EditorError::NotTextNode)?;
        if cursor > text.len() || !text.is_char_boundary(cursor) {
            return Err(EditorError::OutOfBounds);
        }
        self.block = block;
        self.node = node;
        self.cursor = cursor;
        Ok(())
    }

    /// Inserts plain text at the cursor.
    pub fn insert_text(&mut self, text: &str) {
        let cursor = self.cursor;
        if let Some(active) = self.active_text_mut() {
            active.insert_str(cursor, text);
            self.cursor += text.len();
        }
    }

    /// Deletes one character before the cursor, if any.
    pub fn backspace(&mut self) {
        let cursor = self.cursor;
        if cursor == 0 {
            return;
        }
        if let Some(active) = self.active_text_mut() {
            let start = active[..cursor]
                .char_indices()
                .next_back()
                .map(|(ix, _)| ix)
                .unwrap_or(0);
            active.replace_range(start..cursor, "");
            self.cursor = start;
        }
    }

    /// Finds the mention trigger governing the cursor: the last `@` in
    /// the active text node before the cursor that sits at the start of
    /// the node or right after whitespace.
    pub fn trigger_anchor(&self) -> Option<Anchor> {
        let text = self.active_text()?;
        let before = &text[..self.cursor];
        let anchor = before.rfind(MENTION_TRIGGER)?;
        let preceded_ok = text[..anchor]
            .chars()
            .next_back()
            .map(|ch| ch.is_whitespace())
            .unwrap_or(true);
        preceded_ok.then_some(anchor)
    }

    /// Text typed between the trigger and the cursor, or `None` when the
    /// anchor is no longer valid (trigger deleted, cursor moved before
    /// it, or the active node changed).
    pub fn query_since(&self, anchor: Anchor) -> Option<String> {
        let text = self.active_text()?;
        if anchor >= self.cursor || self.cursor > text.len() {
            return None;
        }
        if !text[anchor..].starts_with(MENTION_TRIGGER) {
            return None;
        }
        Some(text[anchor + MENTION_TRIGGER.len_utf8()..self.cursor].to_string())
    }

    /// Atomically replaces trigger..cursor with a reference node plus a
    /// plain trailing space, leaving the cursor right after that space.
    pub fn commit_reference(
        &mut self,
        anchor: Anchor,
        reference: &Reference,
    ) -> Result<(), EditorError> {
        if self.query_since(anchor).is_none() {
            return Err(EditorError::InvalidAnchor);
        }

        let text = self.active_text().ok_or(EditorError::NotTextNode)?;
        let before = text[..anchor].to_string();
        let after = text[self.cursor..].to_string();

        let block = self
            .doc
            .content
            .get_mut(self.block)
            .ok_or(EditorError::OutOfBounds)?;

        let mut replacement = Vec::new();
        if !before.is_empty() {
            replacement.push(ContentNode::text(before));
        }
        replacement.push(ContentNode::note_link(reference));
        replacement.push(ContentNode::text(format!(" {after}")));

        let trailing_ix = self.node + replacement.len() - 1;
        block.content.splice(self.node..=self.node, replacement);

        self.node = trailing_ix;
        self.cursor = 1; // just past the trailing space
        Ok(())
    }

    fn active_text(&self) -> Option<&str> {
        text_at(&self.doc, self.block, self.node)
    }

    fn active_text_mut(&mut self) -> Option<&mut String> {
        let node = self.doc.content.get_mut(self.block)?.content.get_mut(self.node)?;
        if !node.is_text() {
            return None;
        }
        node.text.as_mut()
    }
}

fn text_at(doc: &ContentNode, block: usize, node: usize) -> Option<&str> {
    let node = doc.content.get(block)?.content.get(node)?;
    if !node.is_text() {
        return None;
    }
    node.text.as_deref()
}

fn last_text_position(doc: &ContentNode) -> Option<(usize, usize, usize)> {
    for (block_ix, block) in doc.content.iter().enumerate().rev() {
        for (node_ix, node) in block.content.iter().enumerate().rev() {
            if let (true, Some(text)) = (node.is_text(), node.text.as_ref()) {
                return Some((block_ix, node_ix, text.len()));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::extract_text;

    #[test]
    fn typing_appends_at_cursor() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("hello world");
        assert_eq!(extract_text(Some(editor.document())), "hello world");

        editor.backspace();
        assert_eq!(extract_text(Some(editor.document())), "hello worl");
    }

    #[test]
    fn trigger_is_detected_at_start_and_after_whitespace() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("@");
        assert_eq!(editor.trigger_anchor(), Some(0));

        let mut editor = MentionEditor::empty();
        editor.insert_text("see @");
        assert_eq!(editor.trigger_anchor(), Some(4));

        // an email-style @ inside a word is not a trigger
        let mut editor = MentionEditor::empty();
        editor.insert_text("user@host");
        assert_eq!(editor.trigger_anchor(), None);
    }

    #[test]
    fn query_since_tracks_text_after_trigger() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("note @gro");
        let anchor = editor.trigger_anchor().expect("anchor");
        assert_eq!(editor.query_since(anchor), Some("gro".to_string()));

        editor.backspace();
        assert_eq!(editor.query_since(anchor), Some("gr".to_string()));
    }

    #[test]
    fn query_since_invalidates_when_cursor_leaves_range() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("note @gro");
        let anchor = editor.trigger_anchor().expect("anchor");

        editor.set_cursor(0, 0, 2).expect("move cursor before anchor");
        assert_eq!(editor.query_since(anchor), None);
    }

    #[test]
    fn query_since_invalidates_when_trigger_is_deleted() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("see @");
        let anchor = editor.trigger_anchor().expect("anchor");
        editor.insert_text("x");
        editor.backspace();
        editor.backspace(); // removes the trigger itself
        assert_eq!(editor.query_since(anchor), None);
    }

    #[test]
    fn commit_splices_reference_and_trailing_space() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("see @groc");
        let anchor = editor.trigger_anchor().expect("anchor");

        let reference = Reference {
            jot_id: "J01".to_string(),
            label: "Groceries".to_string(),
        };
        editor.commit_reference(anchor, &reference).expect("commit");

        let block = &editor.document().content[0];
        assert_eq!(block.content.len(), 3);
        assert_eq!(block.content[0].text.as_deref(), Some("see "));
        assert_eq!(block.content[1].as_reference(), Some(reference));
        assert_eq!(block.content[2].text.as_deref(), Some(" "));

        // typing continues after the trailing space
        editor.insert_text("done");
        assert_eq!(block_text(&editor, 2), " done");
    }

    #[test]
    fn commit_at_node_start_omits_empty_leading_text() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("@q");
        let anchor = editor.trigger_anchor().expect("anchor");
        let reference = Reference {
            jot_id: "J02".to_string(),
            label: "Target".to_string(),
        };
        editor.commit_reference(anchor, &reference).expect("commit");

        let block = &editor.document().content[0];
        assert_eq!(block.content.len(), 2);
        assert_eq!(block.content[0].as_reference(), Some(reference));
        assert_eq!(block.content[1].text.as_deref(), Some(" "));
    }

    #[test]
    fn commit_with_stale_anchor_fails_without_touching_the_doc() {
        let mut editor = MentionEditor::empty();
        editor.insert_text("plain text");
        let before = editor.document().clone();

        let reference = Reference {
            jot_id: "J03".to_string(),
            label: "Nope".to_string(),
        };
        let err = editor
            .commit_reference(99, &reference)
            .expect_err("stale anchor rejected");
        assert_eq!(err, EditorError::InvalidAnchor);
        assert_eq!(editor.document(), &before);
    }

    #[test]
    fn from_document_resumes_at_last_text_node() {
        let doc = ContentNode::doc(vec![
            ContentNode::paragraph(vec![ContentNode::text("first")]),
            ContentNode::paragraph(vec![ContentNode::text("second")]),
        ]);
        let mut editor = MentionEditor::from_document(doc);
        editor.insert_text("!");
        assert_eq!(extract_text(Some(editor.document())), "first second!");
    }

    fn block_text(editor: &MentionEditor, node: usize) -> String {
        editor.document().content[0].content[node]
            .text
            .clone()
            .unwrap_or_default()
    }
}
