use regex::Regex;

use super::content::Text;
use super::error::TreeError;

const LINE_BREAK: &str = "<br>";
const SUBHEADING_OPEN: &str = "<span class=\"text-subche-style\">";
const CITATION_OPEN: &str = "<span class=\"text-citation-style\">";
const QUOTATION_OPEN: &str = "<span class=\"text-quotation-style\">";
const SPAN_CLOSE: &str = "</span>";

/// Rewrites inline markup into display spans and drops numeric tags.
///
/// Unbalanced markers are replaced as they are found; nothing tries to pair
/// them up.
#[derive(Debug)]
pub struct AnnotationParser {
    numeric_tag: Regex,
}

impl AnnotationParser {
    pub fn new() -> Result<Self, TreeError> {
        Ok(Self {
            numeric_tag: Regex::new(r"<\s*\d+\s*(?:,\s*\d+\s*)?>")?,
        })
    }

    pub fn parse(&self, value: &Text) -> Text {
        match value {
            Text::Line(line) => Text::Line(self.parse_line(line)),
            Text::List(items) => Text::List(self.parse_all(items)),
        }
    }

    pub fn parse_all(&self, items: &[Text]) -> Vec<Text> {
        items.iter().map(|item| self.parse(item)).collect()
    }

    pub fn parse_line(&self, line: &str) -> String {
        let mut out = line.replace('\n', LINE_BREAK);

        if out.contains("<sapche>") {
            out = out
                .replace("<sapche>", SUBHEADING_OPEN)
                .replace("</sapche>", SPAN_CLOSE);
        }
        if out.contains('{') {
            out = out.replace('{', CITATION_OPEN).replace('}', SPAN_CLOSE);
        }
        if out.contains('(') {
            out = out.replace('(', QUOTATION_OPEN).replace(')', SPAN_CLOSE);
        }

        self.numeric_tag
            .replace_all(out.trim(), "")
            .trim()
            .to_string()
    }
}
