use anyhow::{Result, bail};
use tracing::info;

use crate::api::{HttpPechaApi, PechaApi};
use crate::cli::{RemoveArgs, RemoveKind};
use crate::config::ApiConfig;

pub fn run(args: RemoveArgs) -> Result<()> {
    let config = ApiConfig::new(args.destination, args.base_url, args.api_key, args.max_attempts)?;
    let api = HttpPechaApi::new(config)?;
    remove(&api, args.kind, &args.name)?;
    info!(kind = args.kind.as_str(), name = %args.name, "removed");
    Ok(())
}

pub fn remove<A: PechaApi>(api: &A, kind: RemoveKind, name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        bail!("nothing to remove: empty {} name", kind.as_str());
    }

    match kind {
        RemoveKind::Text => api.remove_text(name),
        RemoveKind::Links => api.remove_links(name),
        RemoveKind::Index => api.remove_index(name),
        RemoveKind::Term => api.remove_term(name),
        RemoveKind::Category => api.remove_category(&category_path(name)),
    }
}

fn category_path(name: &str) -> Vec<String> {
    name.split('/')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_path_splits_on_slashes() {
        assert_eq!(
            category_path("Madhyamaka / Commentaries/"),
            vec!["Madhyamaka".to_string(), "Commentaries".to_string()]
        );
        assert_eq!(category_path("Single"), vec!["Single".to_string()]);
    }
}
