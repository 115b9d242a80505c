use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::LinksArgs;
use crate::links::{LinkMapper, LinkRecord, MergePolicy, create_links};
use crate::model::BookPayload;
use crate::util::{file_stem_for_title, read_json, write_json_pretty};

const FILE_STEM_CHARS: usize = 30;

pub fn run(args: LinksArgs) -> Result<()> {
    let mapper = LinkMapper::new().context("failed to build link mapper")?;

    for input in &args.inputs {
        match export_links(input, &args.output_dir, &mapper, args.merge_policy)? {
            Some(path) => info!(input = %input.display(), path = %path.display(), "wrote links"),
            None => warn!(input = %input.display(), "no commentary links in book"),
        }
    }
    Ok(())
}

/// Writes the links a book would upload; `None` when it has none.
pub fn export_links(
    input: &Path,
    output_dir: &Path,
    mapper: &LinkMapper,
    policy: MergePolicy,
) -> Result<Option<PathBuf>> {
    let book: BookPayload = read_json(input)?;
    let links = create_links(&book, mapper, policy)
        .with_context(|| format!("failed to derive links from {}", input.display()))?;

    let Some(first) = links.first() else {
        return Ok(None);
    };

    let stem = file_stem_for_title(first.commentary_title(), FILE_STEM_CHARS);
    let path = output_dir.join(format!("{stem}.json"));
    write_json_pretty(&path, &links)?;
    info!(
        links = links.len(),
        policy = policy.as_str(),
        "derived commentary links"
    );
    Ok(Some(path))
}
