use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Node type of an inline, atomic link to another jot.
pub const NOTE_LINK_TYPE: &str = "noteLink";

/// Node type of a literal text leaf.
pub const TEXT_TYPE: &str = "text";

/// A structured-document node as persisted by the editor: a `type`,
/// optional literal text, optional ordered children and free-form attrs.
/// Unknown types and malformed subtrees are carried verbatim and stay
/// inert for extraction.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ContentNode {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<ContentNode>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

/// An inline pointer from one jot's content into another jot.
/// `label` is the target title copied at insertion time; it is not kept
/// in sync with later renames of the target.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reference {
    #[serde(rename = "jotId")]
    pub jot_id: String,
    pub label: String,
}

impl ContentNode {
    pub fn doc(content: Vec<ContentNode>) -> Self {
        Self {
            node_type: "doc".to_string(),
            content,
            ..Self::default()
        }
    }

    pub fn paragraph(content: Vec<ContentNode>) -> Self {
        Self {
            node_type: "paragraph".to_string(),
            content,
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node_type: TEXT_TYPE.to_string(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn note_link(reference: &Reference) -> Self {
        let mut attrs = Map::new();
        attrs.insert("jotId".to_string(), Value::String(reference.jot_id.clone()));
        attrs.insert("label".to_string(), Value::String(reference.label.clone()));
        Self {
            node_type: NOTE_LINK_TYPE.to_string(),
            attrs,
            ..Self::default()
        }
    }

    pub fn is_text(&self) -> bool {
        self.node_type == TEXT_TYPE
    }

    /// Reads this node back as a reference, if it is a well-formed note link.
    pub fn as_reference(&self) -> Option<Reference> {
        if self.node_type != NOTE_LINK_TYPE {
            return None;
        }
        let jot_id = self.attrs.get("jotId")?.as_str()?;
        let label = self.attrs.get("label")?.as_str()?;
        Some(Reference {
            jot_id: jot_id.to_string(),
            label: label.to_string(),
        })
    }
}

/// Flattens a content tree into the plain text used for indexing and
/// search. Total over arbitrary trees: `None` and malformed nodes yield
/// the empty string, never an error. A single space separates consecutive
/// children so words do not run together across block boundaries; the
/// result is single-spaced and trimmed.
pub fn extract_text(node: Option<&ContentNode>) -> String {
    let mut raw = String::new();
    if let Some(node) = node {
        collect_text(node, &mut raw);
    }
    collapse_whitespace(&raw)
}

fn collect_text(node: &ContentNode, out: &mut String) {
    if node.is_text() {
        if let Some(text) = &node.text {
            out.push_str(text);
        }
    }

    for (ix, child) in node.content.iter().enumerate() {
        collect_text(child, out);
        // space between consecutive children only, not after the last
        if ix + 1 < node.content.len() {
            out.push(' ');
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Collects every reference embedded anywhere in the tree, in document
/// order. Malformed note-link nodes are skipped.
pub fn collect_references(node: &ContentNode) -> Vec<Reference> {
    let mut out = Vec::new();
    collect_references_into(node, &mut out);
    out
}

fn collect_references_into(node: &ContentNode, out: &mut Vec<Reference>) {
    if let Some(reference) = node.as_reference() {
        out.push(reference);
    }
    for child in &node.content {
        collect_references_into(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> ContentNode {
        ContentNode::doc(vec![
            ContentNode::paragraph(vec![ContentNode::text("Hello"), ContentNode::text("world")]),
            ContentNode::paragraph(vec![ContentNode::text("  second   block ")]),
        ])
    }

    #[test]
    fn extract_none_is_empty() {
        assert_eq!(extract_text(None), "");
    }

    #[test]
    fn extract_joins_children_with_single_spaces() {
        assert_eq!(extract_text(Some(&sample_doc())), "Hello world second block");
    }

    #[test]
    fn extract_tolerates_malformed_nodes() {
        let weird = ContentNode {
            node_type: "mystery".to_string(),
            text: Some("ignored because not a text node".to_string()),
            content: vec![
                ContentNode::default(),
                ContentNode::text("kept"),
                ContentNode {
                    node_type: "deep".to_string(),
                    content: vec![ContentNode::text("nested")],
                    ..ContentNode::default()
                },
            ],
            attrs: Map::new(),
        };
        assert_eq!(extract_text(Some(&weird)), "kept nested");
    }

    #[test]
    fn extract_collapses_whitespace_runs() {
        let doc = ContentNode::doc(vec![ContentNode::paragraph(vec![ContentNode::text(
            "a\t\tb\n\nc  ",
        )])]);
        assert_eq!(extract_text(Some(&doc)), "a b c");
    }

    #[test]
    fn note_link_roundtrips_through_attrs() {
        let reference = Reference {
            jot_id: "J01".to_string(),
            label: "Apple pie".to_string(),
        };
        let node = ContentNode::note_link(&reference);
        assert_eq!(node.as_reference(), Some(reference));
        // link labels live in attrs, not in the extraction surface
        assert_eq!(extract_text(Some(&node)), "");
    }

    #[test]
    fn collect_references_walks_the_whole_tree() {
        let first = Reference {
            jot_id: "J01".to_string(),
            label: "First".to_string(),
        };
        let second = Reference {
            jot_id: "J02".to_string(),
            label: "Second".to_string(),
        };
        let doc = ContentNode::doc(vec![
            ContentNode::paragraph(vec![
                ContentNode::text("see"),
                ContentNode::note_link(&first),
            ]),
            ContentNode::paragraph(vec![ContentNode::note_link(&second)]),
        ]);
        assert_eq!(collect_references(&doc), vec![first, second]);
    }

    #[test]
    fn content_serializes_with_editor_field_names() {
        let doc = ContentNode::doc(vec![ContentNode::paragraph(vec![ContentNode::text("hi")])]);
        let json = serde_json::to_value(&doc).expect("serialize");
        assert_eq!(json["type"], "doc");
        assert_eq!(json["content"][0]["content"][0]["text"], "hi");

        let parsed: ContentNode = serde_json::from_value(json).expect("parse");
        assert_eq!(parsed, doc);
    }
}
