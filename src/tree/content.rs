use serde::Serialize;
use serde_json::{Map, Value};

use super::error::{TreeError, display_path};

/// Reserved key that holds a branch's own text in the JSON input.
pub const DATA_KEY: &str = "data";

/// One line of text or a nested list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Text {
    Line(String),
    List(Vec<Text>),
}

#[cfg(test)]
impl Text {
    pub fn line(value: impl Into<String>) -> Self {
        Self::Line(value.into())
    }

    pub fn lines<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Self::line).collect())
    }
}

/// A section of a book: optional own text plus ordered, labelled sub-sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Branch {
    pub data: Option<Vec<Text>>,
    /// Number of sub-sections that precede `data` in the source object.
    pub data_index: usize,
    pub children: Vec<(String, Branch)>,
}

impl Branch {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    fn is_empty(&self) -> bool {
        self.data.is_none() && self.children.is_empty()
    }
}

/// Book content: either a section tree or a bare leaf payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentNode {
    Branch(Branch),
    Leaf(Vec<Text>),
}

impl ContentNode {
    pub fn from_json(value: &Value) -> Result<Self, TreeError> {
        match value {
            Value::Null => Ok(Self::Leaf(Vec::new())),
            Value::Array(items) => Ok(Self::Leaf(parse_leaf(items, &[])?)),
            Value::Object(map) => Ok(Self::Branch(parse_branch(map, &[])?)),
            other => Err(TreeError::MalformedContent {
                path: display_path(&[]),
                detail: format!("expected an object or a list, found {}", json_kind(other)),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Branch(branch) => branch.is_empty(),
            Self::Leaf(items) => items.is_empty(),
        }
    }
}

fn parse_branch(map: &Map<String, Value>, path: &[&str]) -> Result<Branch, TreeError> {
    let mut branch = Branch::default();

    for (key, value) in map {
        let label = key.trim();
        let mut child_path = path.to_vec();
        child_path.push(label);

        if key == DATA_KEY {
            let data = match value {
                Value::Array(items) => parse_leaf(items, &child_path)?,
                Value::Null => Vec::new(),
                other => {
                    return Err(TreeError::MalformedContent {
                        path: display_path(&child_path),
                        detail: format!("own text must be a list, found {}", json_kind(other)),
                    });
                }
            };
            branch.data = Some(data);
            branch.data_index = branch.children.len();
            continue;
        }

        let child = match value {
            Value::Object(child_map) => parse_branch(child_map, &child_path)?,
            // A bare list under a label is shorthand for `{label: {"data": list}}`.
            Value::Array(items) => Branch {
                data: Some(parse_leaf(items, &child_path)?),
                ..Branch::default()
            },
            other => {
                return Err(TreeError::MalformedContent {
                    path: display_path(&child_path),
                    detail: format!(
                        "section must be an object or a list, found {}",
                        json_kind(other)
                    ),
                });
            }
        };
        if branch.children.iter().any(|(existing, _)| existing == label) {
            return Err(TreeError::MalformedContent {
                path: display_path(&child_path),
                detail: "section label repeats a sibling once trimmed".to_string(),
            });
        }
        branch.children.push((label.to_string(), child));
    }

    Ok(branch)
}

fn parse_leaf(items: &[Value], path: &[&str]) -> Result<Vec<Text>, TreeError> {
    items
        .iter()
        .map(|item| match item {
            Value::String(line) => Ok(Text::Line(line.clone())),
            Value::Number(number) => Ok(Text::Line(number.to_string())),
            Value::Array(nested) => Ok(Text::List(parse_leaf(nested, path)?)),
            other => Err(TreeError::MalformedContent {
                path: display_path(path),
                detail: format!("text lines must be strings, found {}", json_kind(other)),
            }),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

/// English and Tibetan renderings of one book, checked to share one shape.
#[derive(Debug, Clone)]
pub struct BilingualContent {
    en: ContentNode,
    bo: ContentNode,
}

impl BilingualContent {
    /// Zips the two renderings. An empty side mirrors the other one.
    pub fn new(en: ContentNode, bo: ContentNode) -> Result<Self, TreeError> {
        let (en, bo) = match (en.is_empty(), bo.is_empty()) {
            (false, true) => (en.clone(), en),
            (true, false) => (bo.clone(), bo),
            _ => (en, bo),
        };

        ensure_isomorphic(&en, &bo, &[])?;
        Ok(Self { en, bo })
    }

    pub fn english(&self) -> &ContentNode {
        &self.en
    }

    pub fn tibetan(&self) -> &ContentNode {
        &self.bo
    }
}

fn ensure_isomorphic(en: &ContentNode, bo: &ContentNode, path: &[&str]) -> Result<(), TreeError> {
    match (en, bo) {
        (ContentNode::Leaf(_), ContentNode::Leaf(_)) => Ok(()),
        (ContentNode::Branch(en), ContentNode::Branch(bo)) => ensure_branches(en, bo, path),
        (ContentNode::Branch(_), ContentNode::Leaf(_)) => Err(TreeError::StructuralMismatch {
            path: display_path(path),
            detail: "English content has sections, Tibetan content is a flat list".to_string(),
        }),
        (ContentNode::Leaf(_), ContentNode::Branch(_)) => Err(TreeError::StructuralMismatch {
            path: display_path(path),
            detail: "English content is a flat list, Tibetan content has sections".to_string(),
        }),
    }
}

fn ensure_branches(en: &Branch, bo: &Branch, path: &[&str]) -> Result<(), TreeError> {
    if en.data.is_some() != bo.data.is_some() {
        return Err(TreeError::StructuralMismatch {
            path: display_path(path),
            detail: format!(
                "own text present only in the {} content",
                if en.data.is_some() { "English" } else { "Tibetan" }
            ),
        });
    }

    if en.children.len() != bo.children.len() {
        return Err(TreeError::StructuralMismatch {
            path: display_path(path),
            detail: format!(
                "{} English sections but {} Tibetan sections",
                en.children.len(),
                bo.children.len()
            ),
        });
    }

    for ((label, en_child), (_, bo_child)) in en.children.iter().zip(&bo.children) {
        let mut child_path = path.to_vec();
        child_path.push(label.as_str());
        ensure_branches(en_child, bo_child, &child_path)?;
    }

    Ok(())
}
