use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::{DEFAULT_LINK_BATCH_SIZE, Destination};
use crate::links::MergePolicy;

#[derive(Parser, Debug)]
#[command(
    name = "pecha-uploader",
    version,
    about = "Bilingual Pecha text normalizer and uploader"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Upload(UploadArgs),
    Links(LinksArgs),
    Inspect(InspectArgs),
    Remove(RemoveArgs),
    Fetch(FetchArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = Destination::Staging)]
    pub destination: Destination,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, env = "PECHA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = false)]
    pub overwrite: bool,

    #[arg(long, default_value_t = DEFAULT_LINK_BATCH_SIZE)]
    pub link_batch_size: usize,

    #[arg(long, value_enum, default_value_t = MergePolicy::Deduplicate)]
    pub merge_policy: MergePolicy,

    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    #[arg(long, default_value = ".cache/pecha")]
    pub cache_root: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct LinksArgs {
    #[arg(long = "input", required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, default_value = "links")]
    pub output_dir: PathBuf,

    #[arg(long, value_enum, default_value_t = MergePolicy::Deduplicate)]
    pub merge_policy: MergePolicy,
}

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub input: PathBuf,

    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Keep range tags and markup as they appear in the source.
    #[arg(long, default_value_t = false)]
    pub raw: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RemoveKind {
    Text,
    Links,
    Index,
    Category,
    Term,
}

impl RemoveKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Links => "links",
            Self::Index => "index",
            Self::Category => "category",
            Self::Term => "term",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RemoveArgs {
    #[arg(long, value_enum)]
    pub kind: RemoveKind,

    /// Entity name; category paths are separated by `/`.
    #[arg(long)]
    pub name: String,

    #[arg(long, value_enum, default_value_t = Destination::Staging)]
    pub destination: Destination,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, env = "PECHA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum FetchKind {
    Text,
    Index,
    Links,
}

impl FetchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Index => "index",
            Self::Links => "links",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[arg(long, value_enum)]
    pub kind: FetchKind,

    /// Text ref, index title or link ref to read back.
    #[arg(long)]
    pub name: String,

    /// Include segment text in link results.
    #[arg(long, default_value_t = false)]
    pub with_text: bool,

    #[arg(long, value_enum, default_value_t = Destination::Staging)]
    pub destination: Destination,

    #[arg(long)]
    pub base_url: Option<String>,

    #[arg(long, env = "PECHA_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = ".cache/pecha")]
    pub cache_root: PathBuf,

    #[arg(long, default_value_t = 10)]
    pub failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults_match_the_documented_flags() {
        let cli = Cli::try_parse_from([
            "pecha-uploader",
            "upload",
            "--input",
            "a.json",
            "--input",
            "b.json",
            "--api-key",
            "secret",
        ])
        .expect("arguments should parse");

        let Commands::Upload(args) = cli.command else {
            panic!("expected the upload command");
        };
        assert_eq!(args.inputs.len(), 2);
        assert_eq!(args.destination, Destination::Staging);
        assert_eq!(args.link_batch_size, 150);
        assert_eq!(args.merge_policy, MergePolicy::Deduplicate);
        assert_eq!(args.max_attempts, 3);
        assert!(!args.overwrite);
    }

    #[test]
    fn merge_policy_and_remove_kind_parse_kebab_case() {
        let cli = Cli::try_parse_from([
            "pecha-uploader",
            "links",
            "--input",
            "a.json",
            "--merge-policy",
            "last-language",
        ])
        .expect("arguments should parse");
        let Commands::Links(args) = cli.command else {
            panic!("expected the links command");
        };
        assert_eq!(args.merge_policy, MergePolicy::LastLanguage);

        let cli = Cli::try_parse_from([
            "pecha-uploader",
            "remove",
            "--kind",
            "category",
            "--name",
            "Madhyamaka/Commentaries",
        ])
        .expect("arguments should parse");
        let Commands::Remove(args) = cli.command else {
            panic!("expected the remove command");
        };
        assert_eq!(args.kind, RemoveKind::Category);
    }

    #[test]
    fn fetch_parses_kind_and_link_text_flag() {
        let cli = Cli::try_parse_from([
            "pecha-uploader",
            "fetch",
            "--kind",
            "links",
            "--name",
            "Commentary, Chapter 1",
            "--with-text",
        ])
        .expect("arguments should parse");
        let Commands::Fetch(args) = cli.command else {
            panic!("expected the fetch command");
        };
        assert_eq!(args.kind, FetchKind::Links);
        assert_eq!(args.name, "Commentary, Chapter 1");
        assert!(args.with_text);
        assert!(args.output.is_none());
    }
}
