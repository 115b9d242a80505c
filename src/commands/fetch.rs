use std::io::{self, Write};

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::api::{HttpPechaApi, PechaApi, version_count};
use crate::cli::{FetchArgs, FetchKind};
use crate::config::ApiConfig;
use crate::util::write_json_pretty;

pub fn run(args: FetchArgs) -> Result<()> {
    let config = ApiConfig::new(args.destination, args.base_url, args.api_key, args.max_attempts)?;
    let api = HttpPechaApi::new(config)?;
    let reply = fetch(&api, args.kind, &args.name, args.with_text)?;

    if args.kind == FetchKind::Text {
        info!(text = %args.name.trim(), versions = version_count(&reply), "fetched text");
    } else {
        info!(kind = args.kind.as_str(), name = %args.name.trim(), "fetched");
    }

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &reply)?;
            info!(path = %path.display(), "wrote fetch reply");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut output, &reply)
                .context("failed to serialize fetch reply")?;
            writeln!(output)?;
            output.flush()?;
        }
    }
    Ok(())
}

/// Reads one uploaded entity back from the remote library.
pub fn fetch<A: PechaApi>(api: &A, kind: FetchKind, name: &str, with_text: bool) -> Result<Value> {
    let name = name.trim();
    if name.is_empty() {
        bail!("nothing to fetch: empty {} name", kind.as_str());
    }

    match kind {
        FetchKind::Text => api.get_text(name),
        FetchKind::Index => api.get_index(name),
        FetchKind::Links => api.get_links(name, with_text),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::api::ApiOutcome;
    use crate::links::LinkRecord;
    use crate::model::{CategoryPayload, IndexPayload, TermPayload, TextVersion};

    #[derive(Default)]
    struct ReadOnlyApi {
        reads: RefCell<Vec<String>>,
    }

    impl PechaApi for ReadOnlyApi {
        fn post_term(&self, _: &TermPayload) -> Result<ApiOutcome> {
            bail!("read-only")
        }
        fn post_category(&self, _: &CategoryPayload) -> Result<ApiOutcome> {
            bail!("read-only")
        }
        fn post_index(&self, _: &IndexPayload) -> Result<ApiOutcome> {
            bail!("read-only")
        }
        fn post_text(&self, _: &str, _: &TextVersion) -> Result<ApiOutcome> {
            bail!("read-only")
        }
        fn post_links(&self, _: &[LinkRecord]) -> Result<ApiOutcome> {
            bail!("read-only")
        }
        fn remove_term(&self, _: &str) -> Result<()> {
            bail!("read-only")
        }
        fn remove_category(&self, _: &[String]) -> Result<()> {
            bail!("read-only")
        }
        fn remove_index(&self, _: &str) -> Result<()> {
            bail!("read-only")
        }
        fn remove_text(&self, _: &str) -> Result<()> {
            bail!("read-only")
        }
        fn remove_links(&self, _: &str) -> Result<()> {
            bail!("read-only")
        }

        fn get_text(&self, text_ref: &str) -> Result<Value> {
            self.reads.borrow_mut().push(format!("text {text_ref}"));
            Ok(json!({"versions": [{"language": "en"}, {"language": "he"}]}))
        }

        fn get_index(&self, title: &str) -> Result<Value> {
            self.reads.borrow_mut().push(format!("index {title}"));
            Ok(json!({"title": title}))
        }

        fn get_links(&self, reference: &str, with_text: bool) -> Result<Value> {
            self.reads
                .borrow_mut()
                .push(format!("links {reference} {with_text}"));
            Ok(json!([]))
        }
    }

    #[test]
    fn fetch_routes_each_kind_to_its_read_call() {
        let api = ReadOnlyApi::default();

        let text = fetch(&api, FetchKind::Text, " Commentary ", false).expect("text fetch");
        assert_eq!(version_count(&text), 2);
        let index = fetch(&api, FetchKind::Index, "Commentary", false).expect("index fetch");
        assert_eq!(index["title"], "Commentary");
        fetch(&api, FetchKind::Links, "Commentary, Chapter 1", true).expect("links fetch");

        assert_eq!(
            *api.reads.borrow(),
            vec![
                "text Commentary".to_string(),
                "index Commentary".to_string(),
                "links Commentary, Chapter 1 true".to_string(),
            ]
        );
    }

    #[test]
    fn fetch_rejects_blank_names_without_calling_the_api() {
        let api = ReadOnlyApi::default();
        let err = fetch(&api, FetchKind::Index, "   ", false).expect_err("blank name");
        assert!(err.to_string().contains("empty index name"));
        assert!(api.reads.borrow().is_empty());
    }
}
