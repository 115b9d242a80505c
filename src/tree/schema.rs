use serde::Serialize;

use super::MAX_DEPTH;
use super::content::{BilingualContent, Branch, ContentNode, DATA_KEY, Text};
use super::depth::leaf_depth;
use super::error::{TreeError, display_path};
use super::flatten::Language;

const SECTION_NAMES: [&str; MAX_DEPTH] = ["Chapters", "Verses", "Paragraphs"];
const ADDRESS_TYPE: &str = "Integer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Title {
    pub lang: String,
    pub text: String,
    pub primary: bool,
}

/// Primary titles in the order the index API expects: Tibetan (`he`) first.
pub fn bilingual_titles(en: &str, bo: &str) -> Vec<Title> {
    vec![
        Title {
            lang: "he".to_string(),
            text: bo.to_string(),
            primary: true,
        },
        Title {
            lang: "en".to_string(),
            text: en.to_string(),
            primary: true,
        },
    ]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SchemaNode {
    Branch {
        nodes: Vec<SchemaNode>,
        titles: Vec<Title>,
        key: String,
    },
    Leaf(JaggedArrayNode),
}

impl SchemaNode {
    pub fn key(&self) -> &str {
        match self {
            Self::Branch { key, .. } => key,
            Self::Leaf(leaf) => &leaf.key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JaggedArrayNode {
    pub node_type: String,
    pub depth: usize,
    pub address_types: Vec<String>,
    pub section_names: Vec<String>,
    pub titles: Vec<Title>,
    pub key: String,
}

/// Builds the bilingual schema for a book.
pub fn generate_schema(
    content: &BilingualContent,
    en_title: &str,
    bo_title: &str,
) -> Result<Vec<SchemaNode>, TreeError> {
    match (content.english(), content.tibetan()) {
        (ContentNode::Branch(en), ContentNode::Branch(bo)) => branch_nodes(en, bo, &[]),
        (ContentNode::Leaf(en), ContentNode::Leaf(bo)) => {
            Ok(vec![data_node(en_title, bo_title, en, bo, &[])?])
        }
        _ => Err(TreeError::StructuralMismatch {
            path: display_path(&[]),
            detail: "English and Tibetan content differ in kind".to_string(),
        }),
    }
}

fn branch_nodes(en: &Branch, bo: &Branch, path: &[&str]) -> Result<Vec<SchemaNode>, TreeError> {
    let mut nodes = Vec::with_capacity(en.children.len() + 1);

    for (position, ((en_label, en_child), (bo_label, bo_child))) in
        en.children.iter().zip(&bo.children).enumerate()
    {
        if position == en.data_index {
            push_own_data(&mut nodes, en, bo, path)?;
        }

        let mut child_path = path.to_vec();
        child_path.push(en_label.as_str());

        if en_child.has_children() {
            nodes.push(SchemaNode::Branch {
                nodes: branch_nodes(en_child, bo_child, &child_path)?,
                titles: bilingual_titles(en_label, bo_label),
                key: en_label.clone(),
            });
        } else {
            let en_data = en_child.data.as_deref().unwrap_or_default();
            let bo_data = bo_child.data.as_deref().unwrap_or_default();
            nodes.push(data_node(en_label, bo_label, en_data, bo_data, &child_path)?);
        }
    }

    // Own text after the last sub-section, or in a branch without any.
    if en.data_index >= en.children.len() {
        push_own_data(&mut nodes, en, bo, path)?;
    }

    Ok(nodes)
}

// The `data` node sits where the `"data"` key sat among its siblings.
fn push_own_data(
    nodes: &mut Vec<SchemaNode>,
    en: &Branch,
    bo: &Branch,
    path: &[&str],
) -> Result<(), TreeError> {
    if let Some(en_data) = &en.data {
        let bo_data = bo.data.as_deref().unwrap_or_default();
        nodes.push(data_node(
            DATA_KEY,
            Language::Tibetan.data_marker(),
            en_data,
            bo_data,
            path,
        )?);
    }
    Ok(())
}

fn data_node(
    en_key: &str,
    bo_key: &str,
    en: &[Text],
    bo: &[Text],
    path: &[&str],
) -> Result<SchemaNode, TreeError> {
    let depth = if !en.is_empty() {
        leaf_depth(en)
    } else if !bo.is_empty() {
        leaf_depth(bo)
    } else {
        1
    };

    if depth > MAX_DEPTH {
        return Err(TreeError::UnsupportedDepth {
            path: display_path(path),
            depth,
            max: MAX_DEPTH,
        });
    }

    Ok(SchemaNode::Leaf(JaggedArrayNode {
        node_type: "JaggedArrayNode".to_string(),
        depth,
        address_types: vec![ADDRESS_TYPE.to_string(); depth],
        section_names: SECTION_NAMES[..depth]
            .iter()
            .map(|name| name.to_string())
            .collect(),
        titles: bilingual_titles(en_key, bo_key),
        key: en_key.to_string(),
    }))
}
