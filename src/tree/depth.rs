use super::content::Text;

/// Nesting depth of a text value: a bare line is 0, a list is one more than
/// its deepest item, and an empty list counts as 1.
pub fn depth(value: &Text) -> usize {
    match value {
        Text::Line(_) => 0,
        Text::List(items) => leaf_depth(items),
    }
}

/// Depth of a leaf payload, i.e. of the list holding `items`.
pub fn leaf_depth(items: &[Text]) -> usize {
    1 + items.iter().map(depth).max().unwrap_or(0)
}
