use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tree::{SchemaNode, Text, Title};

/// One book file: English (`source`) and Tibetan (`target`) renderings.
#[derive(Debug, Clone, Deserialize)]
pub struct BookPayload {
    pub source: LanguageSide,
    pub target: LanguageSide,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LanguageSide {
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub books: Vec<Book>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryRef {
    pub name: String,
    #[serde(rename = "enDesc", default)]
    pub en_desc: String,
    #[serde(rename = "heDesc", default)]
    pub he_desc: String,
    #[serde(rename = "enShortDesc", default)]
    pub en_short_desc: String,
    #[serde(rename = "heShortDesc", default)]
    pub he_short_desc: String,
    #[serde(default)]
    pub base_text_titles: Option<Vec<String>>,
    #[serde(default)]
    pub base_text_mapping: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl CategoryRef {
    pub fn is_commentary(&self) -> bool {
        self.base_text_titles.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Book {
    pub title: String,
    pub language: String,
    #[serde(rename = "versionSource", default)]
    pub version_source: String,
    #[serde(default)]
    pub completestatus: String,
    #[serde(default)]
    pub content: Value,
}

impl BookPayload {
    /// Deepest category that carries commentary metadata, if any.
    pub fn commentary_category(&self) -> Option<&CategoryRef> {
        [&self.source, &self.target]
            .into_iter()
            .filter_map(|side| side.categories.last())
            .find(|category| category.is_commentary())
    }

    /// Index key: the name of the deepest English category.
    pub fn index_key(&self) -> Option<&str> {
        self.source
            .categories
            .last()
            .map(|category| category.name.as_str())
    }

    /// Title used for bookkeeping: the English title unless that book is empty.
    pub fn book_title(&self) -> Option<&str> {
        let source = self.source.books.first();
        let target = self.target.books.first();
        match (source, target) {
            (Some(book), _) if !is_blank(&book.content) => Some(book.title.as_str()),
            (_, Some(book)) => Some(book.title.as_str()),
            (Some(book), None) => Some(book.title.as_str()),
            (None, None) => None,
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::String(text) => text.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TermPayload {
    pub name: String,
    pub titles: Vec<Title>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPayload {
    #[serde(rename = "sharedTitle")]
    pub shared_title: String,
    pub path: Vec<String>,
    #[serde(rename = "enDesc")]
    pub en_desc: String,
    #[serde(rename = "heDesc")]
    pub he_desc: String,
    #[serde(rename = "enShortDesc")]
    pub en_short_desc: String,
    #[serde(rename = "heShortDesc")]
    pub he_short_desc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexPayload {
    pub title: String,
    pub categories: Vec<String>,
    pub schema: SchemaNode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_text_titles: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_text_mapping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collective_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependence: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextVersion {
    #[serde(rename = "versionTitle")]
    pub version_title: String,
    #[serde(rename = "versionSource")]
    pub version_source: String,
    pub language: String,
    #[serde(rename = "actualLanguage")]
    pub actual_language: String,
    pub completestatus: String,
    pub text: Vec<Text>,
}
