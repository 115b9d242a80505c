use thiserror::Error;

/// Failures raised by the content-tree engine.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("structural mismatch at `{path}`: {detail}")]
    StructuralMismatch { path: String, detail: String },

    #[error("nesting depth {depth} at `{path}` exceeds the supported maximum of {max}")]
    UnsupportedDepth {
        path: String,
        depth: usize,
        max: usize,
    },

    #[error("range tag `{tag}` is not a chapter/verse integer pair")]
    MalformedTag { tag: String },

    #[error("malformed content at `{path}`: {detail}")]
    MalformedContent { path: String, detail: String },

    #[error("commentary category `{category}` names no base text title")]
    MissingBaseText { category: String },

    #[error(transparent)]
    Pattern(#[from] regex::Error),
}

pub(crate) fn display_path(path: &[&str]) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.join(" > ")
    }
}
