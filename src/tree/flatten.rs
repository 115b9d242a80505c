use serde::Serialize;

use super::annotation::AnnotationParser;
use super::content::{BilingualContent, Branch, ContentNode, Text};

/// Language of a content tree, as far as section keys are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Tibetan,
}

impl Language {
    pub fn from_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("bo") {
            Self::Tibetan
        } else {
            Self::English
        }
    }

    /// Label that names a section's own text next to its sub-sections.
    pub fn data_marker(self) -> &'static str {
        match self {
            Self::English => "data",
            Self::Tibetan => "གནས་བབས",
        }
    }
}

/// Whether leaf text is cleaned for display or kept with its range tags.
#[derive(Debug, Clone, Copy)]
pub enum LeafMode<'a> {
    Raw,
    Parsed(&'a AnnotationParser),
}

impl LeafMode<'_> {
    fn apply(self, items: &[Text]) -> Vec<Text> {
        match self {
            Self::Raw => items.to_vec(),
            Self::Parsed(parser) => parser.parse_all(items),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlatChapter {
    pub key: String,
    pub text: Vec<Text>,
}

/// Flattens one language's content into addressable sections.
///
/// Sub-sections come before their parent's own text. A leaf-rooted book
/// yields a single entry keyed by `index_key`.
pub fn flatten(
    content: &ContentNode,
    language: Language,
    index_key: &str,
    mode: LeafMode<'_>,
) -> Vec<FlatChapter> {
    let mut out = Vec::new();
    match content {
        ContentNode::Leaf(items) => {
            if !items.is_empty() {
                out.push(FlatChapter {
                    key: index_key.to_string(),
                    text: mode.apply(items),
                });
            }
        }
        ContentNode::Branch(root) => {
            let marker = language.data_marker();
            flatten_branch(root, root, marker, &[], mode, &mut out);
            push_root_data(root, marker, index_key, mode, &mut out);
        }
    }
    out
}

/// Flattens one side of a bilingual book using the English section keys.
pub fn flatten_paired(
    content: &BilingualContent,
    side: Language,
    index_key: &str,
    mode: LeafMode<'_>,
) -> Vec<FlatChapter> {
    let mut out = Vec::new();
    match (content.english(), content.tibetan()) {
        (ContentNode::Branch(en), ContentNode::Branch(bo)) => {
            let text_side = match side {
                Language::English => en,
                Language::Tibetan => bo,
            };
            let marker = Language::English.data_marker();
            flatten_branch(en, text_side, marker, &[], mode, &mut out);
            push_root_data(text_side, marker, index_key, mode, &mut out);
        }
        (en, bo) => {
            let text_side = match side {
                Language::English => en,
                Language::Tibetan => bo,
            };
            out = flatten(text_side, Language::English, index_key, mode);
        }
    }
    out
}

// Own text at the top of the tree belongs to the book itself, so it is
// addressed under the index key rather than a bare marker.
fn push_root_data(
    root: &Branch,
    marker: &str,
    index_key: &str,
    mode: LeafMode<'_>,
    out: &mut Vec<FlatChapter>,
) {
    if let Some(data) = &root.data {
        out.push(FlatChapter {
            key: format!("{index_key}, {marker}"),
            text: mode.apply(data),
        });
    }
}

// `keys` names the sections; `text` supplies the payload. Both trees share a
// shape, so walking them together is a plain zip.
fn flatten_branch(
    keys: &Branch,
    text: &Branch,
    marker: &str,
    path: &[&str],
    mode: LeafMode<'_>,
    out: &mut Vec<FlatChapter>,
) {
    for ((label, key_child), (_, text_child)) in keys.children.iter().zip(&text.children) {
        let mut child_path = path.to_vec();
        child_path.push(label.as_str());

        flatten_branch(key_child, text_child, marker, &child_path, mode, out);

        let Some(data) = &text_child.data else {
            continue;
        };
        let joined = child_path.join(", ");
        let key = if key_child.has_children() {
            format!("{joined}, {marker}")
        } else {
            joined
        };
        out.push(FlatChapter {
            key,
            text: mode.apply(data),
        });
    }
}
