use serde::{Deserialize, Serialize};

use super::ranges::{RangeExtractor, TaggedRun};
use crate::tree::{MAX_DEPTH, Text, TreeError, leaf_depth};

pub const COMMENTARY_LINK: &str = "commentary";

/// Pair of references joined by the link API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub refs: [String; 2],
    #[serde(rename = "type")]
    pub link_type: String,
}

impl LinkRecord {
    pub fn commentary(root_ref: String, commentary_ref: String) -> Self {
        Self {
            refs: [root_ref, commentary_ref],
            link_type: COMMENTARY_LINK.to_string(),
        }
    }

    pub fn commentary_ref(&self) -> &str {
        &self.refs[1]
    }

    /// Commentary section title: the commentary ref without its trailing
    /// `i:j:n-m` locant.
    pub fn commentary_title(&self) -> &str {
        let reference = self.commentary_ref();
        match reference.rsplit_once(' ') {
            Some((title, locant))
                if !locant.is_empty()
                    && locant.chars().all(|ch| ch.is_ascii_digit() || ch == ':' || ch == '-') =>
            {
                title
            }
            _ => reference,
        }
    }
}

/// Turns tagged commentary sections into links onto root-text verses.
#[derive(Debug)]
pub struct LinkMapper {
    extractor: RangeExtractor,
}

impl LinkMapper {
    pub fn new() -> Result<Self, TreeError> {
        Ok(Self {
            extractor: RangeExtractor::new()?,
        })
    }

    pub fn map(
        &self,
        title: &str,
        contents: &[Text],
        root_title: &str,
    ) -> Result<Vec<LinkRecord>, TreeError> {
        let depth = leaf_depth(contents);
        if depth > MAX_DEPTH {
            return Err(TreeError::UnsupportedDepth {
                path: title.to_string(),
                depth,
                max: MAX_DEPTH,
            });
        }

        let mut links = Vec::new();
        if depth == 1 {
            self.push_links(&mut links, title, "", contents, root_title);
            return Ok(links);
        }

        for (i, entry) in contents.iter().enumerate() {
            let Text::List(section) = entry else {
                continue;
            };

            if leaf_depth(section) == 1 {
                let prefix = format!("{}:", i + 1);
                self.push_links(&mut links, title, &prefix, section, root_title);
                continue;
            }

            for (j, paragraph) in section.iter().enumerate() {
                let Text::List(lines) = paragraph else {
                    continue;
                };
                let prefix = format!("{}:{}:", i + 1, j + 1);
                self.push_links(&mut links, title, &prefix, lines, root_title);
            }
        }

        Ok(links)
    }

    fn push_links(
        &self,
        links: &mut Vec<LinkRecord>,
        title: &str,
        prefix: &str,
        lines: &[Text],
        root_title: &str,
    ) {
        for TaggedRun { tag, run } in self.extractor.extract(lines) {
            links.push(LinkRecord::commentary(
                format!("{root_title} {}:{}", tag.chapter, tag.verse),
                format!("{title} {prefix}{run}"),
            ));
        }
    }
}
