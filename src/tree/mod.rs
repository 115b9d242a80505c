//! Normalisation of nested book content into section keys and index schemas.

mod annotation;
mod content;
mod depth;
mod error;
mod flatten;
mod schema;

/// Deepest leaf nesting the index API can address.
pub const MAX_DEPTH: usize = 3;

pub use annotation::AnnotationParser;
pub use content::{BilingualContent, ContentNode, Text};
pub use depth::leaf_depth;
pub use error::TreeError;
pub use flatten::{FlatChapter, Language, LeafMode, flatten, flatten_paired};
pub use schema::{SchemaNode, Title, bilingual_titles, generate_schema};
