use anyhow::Result;
use tracing::{info, warn};

use crate::checkpoint::{CheckpointStore, EntryKind};
use crate::cli::StatusArgs;
use crate::config::UploadConfig;

pub fn run(args: StatusArgs) -> Result<()> {
    let config = UploadConfig {
        cache_root: args.cache_root.clone(),
        ..UploadConfig::default()
    };
    let checkpoint_path = config.checkpoint_path();

    info!(cache_root = %args.cache_root.display(), "status requested");

    if !checkpoint_path.exists() {
        warn!(path = %checkpoint_path.display(), "checkpoint store missing");
        return Ok(());
    }

    let store = CheckpointStore::open(&checkpoint_path)?;
    info!(
        path = %checkpoint_path.display(),
        texts = store.count_uploaded(EntryKind::Text)?,
        links = store.count_uploaded(EntryKind::Links)?,
        failures = store.count_failures()?,
        "checkpoint status"
    );

    for failure in store.recent_failures(args.failures)? {
        warn!(
            kind = %failure.kind,
            key = %failure.key,
            logged_at = %failure.logged_at,
            message = %failure.message,
            "recorded failure"
        );
    }

    Ok(())
}
