use std::collections::HashSet;

use clap::ValueEnum;
use tracing::debug;

use super::mapper::{LinkMapper, LinkRecord};
use crate::model::BookPayload;
use crate::tree::{
    BilingualContent, ContentNode, FlatChapter, Language, LeafMode, TreeError, flatten,
    flatten_paired,
};

/// How the English and Tibetan link sets of one book are combined.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum MergePolicy {
    /// Keep every record, English first.
    Concatenate,
    /// Keep the first occurrence of each record, English first.
    #[default]
    Deduplicate,
    /// Keep only the records of the last language processed.
    LastLanguage,
}

impl MergePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Concatenate => "concatenate",
            Self::Deduplicate => "deduplicate",
            Self::LastLanguage => "last-language",
        }
    }

    pub fn merge(self, per_language: Vec<Vec<LinkRecord>>) -> Vec<LinkRecord> {
        match self {
            Self::Concatenate => per_language.into_iter().flatten().collect(),
            Self::Deduplicate => {
                let mut seen = HashSet::<LinkRecord>::new();
                per_language
                    .into_iter()
                    .flatten()
                    .filter(|record| seen.insert(record.clone()))
                    .collect()
            }
            Self::LastLanguage => per_language.into_iter().last().unwrap_or_default(),
        }
    }
}

/// Derives commentary links for a book; root texts yield nothing.
pub fn create_links(
    book: &BookPayload,
    mapper: &LinkMapper,
    policy: MergePolicy,
) -> Result<Vec<LinkRecord>, TreeError> {
    let Some(category) = book.commentary_category() else {
        return Ok(Vec::new());
    };
    let root_title = category
        .base_text_titles
        .as_ref()
        .and_then(|titles| titles.first())
        .ok_or_else(|| TreeError::MissingBaseText {
            category: category.name.clone(),
        })?;
    let index_key = book.index_key().unwrap_or(category.name.as_str());

    let mut per_language = Vec::with_capacity(2);

    let mut english = Vec::new();
    for en_book in &book.source.books {
        let content = ContentNode::from_json(&en_book.content)?;
        let chapters = flatten(&content, Language::English, index_key, LeafMode::Raw);
        english.extend(map_chapters(mapper, &chapters, root_title)?);
    }
    per_language.push(english);

    let partner = match book.source.books.first() {
        Some(en_book) => Some(ContentNode::from_json(&en_book.content)?),
        None => None,
    };
    let mut tibetan = Vec::new();
    for bo_book in &book.target.books {
        let content = ContentNode::from_json(&bo_book.content)?;
        if content.is_empty() {
            continue;
        }
        let chapters = match &partner {
            Some(en) => {
                let paired = BilingualContent::new(en.clone(), content)?;
                flatten_paired(&paired, Language::Tibetan, index_key, LeafMode::Raw)
            }
            None => flatten(&content, Language::Tibetan, index_key, LeafMode::Raw),
        };
        tibetan.extend(map_chapters(mapper, &chapters, root_title)?);
    }
    per_language.push(tibetan);

    debug!(
        english = per_language[0].len(),
        tibetan = per_language[1].len(),
        policy = policy.as_str(),
        "merging link sets"
    );
    Ok(policy.merge(per_language))
}

fn map_chapters(
    mapper: &LinkMapper,
    chapters: &[FlatChapter],
    root_title: &str,
) -> Result<Vec<LinkRecord>, TreeError> {
    let mut links = Vec::new();
    for chapter in chapters {
        links.extend(mapper.map(&chapter.key, &chapter.text, root_title)?);
    }
    Ok(links)
}
