use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, bail};
use clap::ValueEnum;

use crate::links::MergePolicy;

pub const DEFAULT_LINK_BATCH_SIZE: usize = 150;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum Destination {
    Production,
    Staging,
    Local,
}

impl Destination {
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Production => "https://pecha.org/",
            Self::Staging => "https://staging.pecha.org/",
            Self::Local => "http://127.0.0.1:8000/",
        }
    }
}

/// Connection settings for the remote API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl ApiConfig {
    pub fn new(
        destination: Destination,
        base_url: Option<String>,
        api_key: Option<String>,
        max_attempts: u32,
    ) -> Result<Self> {
        let Some(api_key) = api_key.filter(|key| !key.trim().is_empty()) else {
            bail!("PECHA API key is not set; pass --api-key or export PECHA_API_KEY");
        };

        let mut base_url = base_url.unwrap_or_else(|| destination.base_url().to_string());
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            base_url,
            api_key,
            timeout: Duration::from_secs(60),
            max_attempts: max_attempts.max(1),
            retry_backoff: Duration::from_secs(2),
        })
    }
}

/// Everything the upload orchestrator needs besides the API itself.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub cache_root: PathBuf,
    pub overwrite: bool,
    pub link_batch_size: usize,
    pub merge_policy: MergePolicy,
}

impl UploadConfig {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.cache_root.join(crate::checkpoint::CHECKPOINT_FILE)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(".cache/pecha"),
            overwrite: false,
            link_batch_size: DEFAULT_LINK_BATCH_SIZE,
            merge_policy: MergePolicy::default(),
        }
    }
}
