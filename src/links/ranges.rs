use std::collections::BTreeMap;
use std::fmt;

use regex::Regex;
use tracing::warn;

use crate::tree::{Text, TreeError};

/// Root-text address carried by a `<chapter,verse>` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RangeTag {
    pub chapter: u32,
    pub verse: u32,
}

impl fmt::Display for RangeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.chapter, self.verse)
    }
}

/// Inclusive, 1-based run of consecutive line numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun {
    pub start: usize,
    pub end: usize,
}

impl fmt::Display for LineRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedRun {
    pub tag: RangeTag,
    pub run: LineRun,
}

#[derive(Debug)]
pub struct RangeExtractor {
    pair_tag: Regex,
}

impl RangeExtractor {
    pub fn new() -> Result<Self, TreeError> {
        Ok(Self {
            pair_tag: Regex::new(r"<\s*(\d+)\s*,\s*(\d+)\s*>")?,
        })
    }

    /// Every tag found in `line`, in order of appearance.
    pub fn scan(&self, line: &str) -> Vec<Result<RangeTag, TreeError>> {
        self.pair_tag
            .captures_iter(line)
            .map(|captures| {
                let chapter = captures[1].parse::<u32>();
                let verse = captures[2].parse::<u32>();
                match (chapter, verse) {
                    (Ok(chapter), Ok(verse)) => Ok(RangeTag { chapter, verse }),
                    _ => Err(TreeError::MalformedTag {
                        tag: captures[0].to_string(),
                    }),
                }
            })
            .collect()
    }

    /// Groups tagged lines into contiguous runs, ordered by tag.
    ///
    /// A tag quoted again further down yields a second run rather than one
    /// widened range. Nested lists and untagged lines still count towards
    /// line numbering.
    pub fn extract(&self, lines: &[Text]) -> Vec<TaggedRun> {
        let mut indices = BTreeMap::<RangeTag, Vec<usize>>::new();

        for (offset, item) in lines.iter().enumerate() {
            let Text::Line(line) = item else {
                continue;
            };
            let line_number = offset + 1;
            let mut seen = Vec::<RangeTag>::new();

            for scanned in self.scan(line) {
                match scanned {
                    Ok(tag) if !seen.contains(&tag) => {
                        seen.push(tag);
                        indices.entry(tag).or_default().push(line_number);
                    }
                    Ok(_) => {}
                    Err(err) => warn!(line = line_number, error = %err, "skipping range tag"),
                }
            }
        }

        let mut out = Vec::new();
        for (tag, line_numbers) in indices {
            for run in collapse_runs(&line_numbers) {
                out.push(TaggedRun { tag, run });
            }
        }
        out
    }
}

fn collapse_runs(line_numbers: &[usize]) -> Vec<LineRun> {
    let mut runs = Vec::<LineRun>::new();

    for &number in line_numbers {
        match runs.last_mut() {
            Some(run) if run.end + 1 == number => run.end = number,
            _ => runs.push(LineRun {
                start: number,
                end: number,
            }),
        }
    }

    runs
}
