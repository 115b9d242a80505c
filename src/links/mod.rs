//! Commentary-to-root cross references derived from inline `<chapter,verse>` tags.

mod create;
mod mapper;
mod ranges;
#[cfg(test)]
mod tests;

pub use create::{MergePolicy, create_links};
pub use mapper::{LinkMapper, LinkRecord};
