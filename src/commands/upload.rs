use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::{debug, error, info, warn};

use crate::api::{ApiOutcome, HttpPechaApi, PechaApi, version_count};
use crate::checkpoint::{CheckpointStore, EntryKind};
use crate::cli::UploadArgs;
use crate::config::{ApiConfig, UploadConfig};
use crate::links::{LinkMapper, LinkRecord, create_links};
use crate::model::{
    Book, BookPayload, CategoryPayload, CategoryRef, IndexPayload, TermPayload, TextVersion,
};
use crate::tree::{
    AnnotationParser, BilingualContent, ContentNode, Language, LeafMode, SchemaNode,
    bilingual_titles, flatten, generate_schema,
};
use crate::util::{ensure_directory, read_json, sha256_file};

pub fn run(args: UploadArgs) -> Result<()> {
    let api_config = ApiConfig::new(
        args.destination,
        args.base_url.clone(),
        args.api_key.clone(),
        args.max_attempts,
    )?;
    let config = UploadConfig {
        cache_root: args.cache_root.clone(),
        overwrite: args.overwrite,
        link_batch_size: args.link_batch_size,
        merge_policy: args.merge_policy,
    };

    ensure_directory(&config.cache_root)?;
    let store = CheckpointStore::open(&config.checkpoint_path())?;
    let api = HttpPechaApi::new(api_config)?;
    let uploader = Uploader::new(&api, &store, &config)?;

    info!(
        files = args.inputs.len(),
        destination = ?args.destination,
        overwrite = config.overwrite,
        "starting upload"
    );

    let mut failed = 0_usize;
    for path in &args.inputs {
        if let Err(err) = uploader.upload_file(path) {
            failed += 1;
            error!(path = %path.display(), error = %err, "book upload failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} books failed to upload", args.inputs.len());
    }

    info!(files = args.inputs.len(), "upload completed");
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOutcome {
    Skipped,
    Uploaded { texts: usize, links: usize },
}

/// Term and category entries created during one book's upload, so a failed
/// index or text upload can be unwound.
#[derive(Debug, Default)]
struct CreatedMetadata {
    terms: Vec<String>,
    categories: Vec<Vec<String>>,
}

/// Sequences term, category, index, text and link uploads for book files.
pub struct Uploader<'a, A: PechaApi> {
    api: &'a A,
    store: &'a CheckpointStore,
    config: &'a UploadConfig,
    parser: AnnotationParser,
    mapper: LinkMapper,
}

impl<'a, A: PechaApi> Uploader<'a, A> {
    pub fn new(api: &'a A, store: &'a CheckpointStore, config: &'a UploadConfig) -> Result<Self> {
        Ok(Self {
            api,
            store,
            config,
            parser: AnnotationParser::new().context("failed to build annotation parser")?,
            mapper: LinkMapper::new().context("failed to build link mapper")?,
        })
    }

    pub fn upload_file(&self, path: &Path) -> Result<BookOutcome> {
        let book: BookPayload = read_json(path)?;
        let source_sha256 = sha256_file(path)?;
        self.upload_book(&book, Some(&source_sha256))
            .with_context(|| format!("failed to upload {}", path.display()))
    }

    pub fn upload_book(
        &self,
        book: &BookPayload,
        source_sha256: Option<&str>,
    ) -> Result<BookOutcome> {
        let title = book
            .book_title()
            .context("book file has no books on either side")?;

        if !self.config.overwrite {
            if let Some(entry) = self.store.uploaded(EntryKind::Text, title)? {
                if entry.source_sha256.as_deref() != source_sha256 {
                    warn!(
                        title,
                        uploaded_at = %entry.uploaded_at,
                        "source changed since last upload; pass --overwrite to re-upload"
                    );
                }
                info!(title, "already uploaded, skipping");
                return Ok(BookOutcome::Skipped);
            }
        }

        let links = create_links(book, &self.mapper, self.config.merge_policy)
            .with_context(|| format!("failed to derive links for {title}"));
        let links = self.recorded(EntryKind::Text, title, links)?;

        let texts = self.recorded(EntryKind::Text, title, self.upload_texts(book))?;
        self.store
            .mark_uploaded(EntryKind::Text, title, source_sha256)?;
        info!(title, texts, "text uploaded");

        if !links.is_empty() {
            self.recorded(EntryKind::Links, title, self.upload_links(&links))?;
            self.store
                .mark_uploaded(EntryKind::Links, title, source_sha256)?;
            info!(title, links = links.len(), "links uploaded");
        }

        Ok(BookOutcome::Uploaded {
            texts,
            links: links.len(),
        })
    }

    fn recorded<T>(&self, kind: EntryKind, title: &str, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            self.store.record_failure(kind, title, &format!("{err:#}"))?;
        }
        result
    }

    fn upload_texts(&self, book: &BookPayload) -> Result<usize> {
        let index_key = book
            .index_key()
            .context("book file has no English categories")?;

        let mut created = CreatedMetadata::default();
        if let Err(err) = self.upload_categories(book, &mut created) {
            self.rollback(&created);
            return Err(err);
        }

        let index = self.build_index(book, index_key).and_then(|index| {
            self.api
                .post_index(&index)
                .with_context(|| format!("failed to upload index {index_key}"))
        });
        if let Err(err) = index {
            self.rollback(&created);
            return Err(err);
        }
        info!(index = index_key, "index uploaded");

        let versions = book
            .source
            .books
            .iter()
            .map(|version| (version, "en"))
            .chain(book.target.books.iter().map(|version| (version, "he")));

        let mut posted = 0;
        for (version, language) in versions {
            match self.upload_version(version, language, index_key) {
                Ok(count) => posted += count,
                Err(err) => {
                    self.remove_orphan_index(index_key, &created);
                    return Err(err);
                }
            }
        }
        Ok(posted)
    }

    // An index left without any text version after a failed upload is removed
    // together with the metadata this run created for it.
    fn remove_orphan_index(&self, index_key: &str, created: &CreatedMetadata) {
        let versions = match self.api.get_text(index_key) {
            Ok(text) => version_count(&text),
            Err(err) => {
                warn!(index = index_key, error = %err, "could not count remaining versions");
                return;
            }
        };
        if versions > 0 {
            info!(index = index_key, versions, "keeping index with uploaded versions");
            return;
        }

        if let Err(err) = self.api.remove_index(index_key) {
            warn!(index = index_key, error = %err, "failed to remove orphan index");
            return;
        }
        info!(index = index_key, "removed index without versions");
        self.rollback(created);
    }

    fn upload_categories(&self, book: &BookPayload, created: &mut CreatedMetadata) -> Result<()> {
        let en_categories = &book.source.categories;
        let bo_categories = &book.target.categories;
        if en_categories.len() != bo_categories.len() {
            bail!(
                "{} English categories but {} Tibetan categories",
                en_categories.len(),
                bo_categories.len()
            );
        }

        for depth in 1..=en_categories.len() {
            let en_path = &en_categories[..depth];
            let bo_path = &bo_categories[..depth];
            let en_name = en_path[depth - 1].name.as_str();
            let bo_name = bo_path[depth - 1].name.as_str();

            let term = TermPayload {
                name: en_name.to_string(),
                titles: bilingual_titles(en_name, bo_name),
            };
            let outcome = self
                .api
                .post_term(&term)
                .with_context(|| format!("failed to upload term {en_name}"))?;
            if outcome == ApiOutcome::Created {
                created.terms.push(en_name.to_string());
            }

            let category = category_payload(en_path, bo_path);
            let outcome = self
                .api
                .post_category(&category)
                .with_context(|| format!("failed to upload category {en_name}"))?;
            match outcome {
                ApiOutcome::Created => {
                    info!(category = en_name, "category uploaded");
                    created.categories.push(category.path);
                }
                ApiOutcome::AlreadyExists => debug!(category = en_name, "category already exists"),
            }
        }

        Ok(())
    }

    fn build_index(&self, book: &BookPayload, index_key: &str) -> Result<IndexPayload> {
        let en_book = book.source.books.first();
        let bo_book = book.target.books.first();
        let en_content = content_of(en_book)?;
        let bo_content = content_of(bo_book)?;
        let content = BilingualContent::new(en_content, bo_content)
            .with_context(|| format!("English and Tibetan content of {index_key} differ"))?;

        let en_title = en_book.map_or(index_key, |book| book.title.as_str());
        let bo_title = bo_book
            .map(|book| book.title.as_str())
            .or_else(|| book.target.categories.last().map(|c| c.name.as_str()))
            .unwrap_or(en_title);

        let nodes = generate_schema(&content, en_title, bo_title)
            .with_context(|| format!("failed to build schema for {index_key}"))?;
        let schema = single_root(nodes, index_key)?;

        let category = book.source.categories.last();
        let commentary = category.filter(|category| category.is_commentary());
        Ok(IndexPayload {
            title: index_key.to_string(),
            categories: book
                .source
                .categories
                .iter()
                .map(|category| category.name.clone())
                .collect(),
            schema,
            base_text_titles: commentary.and_then(|c| c.base_text_titles.clone()),
            base_text_mapping: commentary.and_then(|c| c.base_text_mapping.clone()),
            collective_title: commentary.map(|_| index_key.to_string()),
            dependence: commentary.and_then(|c| c.link.clone()),
        })
    }

    fn upload_version(&self, book: &Book, language: &str, index_key: &str) -> Result<usize> {
        let content = ContentNode::from_json(&book.content)
            .with_context(|| format!("invalid content in {}", book.title))?;
        if content.is_empty() {
            debug!(title = %book.title, language, "no content to upload");
            return Ok(0);
        }

        let chapters = flatten(
            &content,
            Language::from_code(&book.language),
            index_key,
            LeafMode::Parsed(&self.parser),
        );

        let mut failures = Vec::new();
        for chapter in &chapters {
            let version = TextVersion {
                version_title: book.title.clone(),
                version_source: book.version_source.clone(),
                language: language.to_string(),
                actual_language: book.language.clone(),
                completestatus: book.completestatus.clone(),
                text: chapter.text.clone(),
            };
            match self.api.post_text(&chapter.key, &version) {
                Ok(_) => debug!(text = %chapter.key, language, "text section uploaded"),
                Err(err) => {
                    warn!(text = %chapter.key, error = %err, "text section failed");
                    failures.push(format!("{}: {err:#}", chapter.key));
                }
            }
        }

        if !failures.is_empty() {
            bail!(
                "{} of {} sections of {} failed; first: {}",
                failures.len(),
                chapters.len(),
                book.title,
                failures[0]
            );
        }

        info!(title = %book.title, language, sections = chapters.len(), "version uploaded");
        Ok(chapters.len())
    }

    fn upload_links(&self, links: &[LinkRecord]) -> Result<()> {
        let titles = links
            .iter()
            .map(LinkRecord::commentary_title)
            .collect::<BTreeSet<_>>();
        for title in titles {
            self.api
                .remove_links(title)
                .with_context(|| format!("failed to remove existing links for {title}"))?;
        }

        let batch_size = self.config.link_batch_size.max(1);
        for (batch, chunk) in links.chunks(batch_size).enumerate() {
            self.api
                .post_links(chunk)
                .with_context(|| format!("failed to upload link batch {}", batch + 1))?;
            debug!(batch = batch + 1, size = chunk.len(), "link batch uploaded");
        }
        Ok(())
    }

    fn rollback(&self, created: &CreatedMetadata) {
        for path in created.categories.iter().rev() {
            if let Err(err) = self.api.remove_category(path) {
                warn!(category = %path.join("/"), error = %err, "rollback failed");
            }
        }
        for term in created.terms.iter().rev() {
            if let Err(err) = self.api.remove_term(term) {
                warn!(term = %term, error = %err, "rollback failed");
            }
        }
        if !created.terms.is_empty() || !created.categories.is_empty() {
            info!(
                terms = created.terms.len(),
                categories = created.categories.len(),
                "rolled back metadata"
            );
        }
    }
}

fn content_of(book: Option<&Book>) -> Result<ContentNode> {
    match book {
        Some(book) => ContentNode::from_json(&book.content)
            .with_context(|| format!("invalid content in {}", book.title)),
        None => Ok(ContentNode::Leaf(Vec::new())),
    }
}

// The content's single top-level node is the book itself; its key must be
// the index title for section refs to resolve.
fn single_root(mut nodes: Vec<SchemaNode>, index_key: &str) -> Result<SchemaNode> {
    match nodes.len() {
        0 => bail!("{index_key} has no content to build a schema from"),
        1 => Ok(nodes.remove(0)),
        count => bail!(
            "{index_key} has {count} top-level sections; nest them under one book title"
        ),
    }
}

fn category_payload(en_path: &[CategoryRef], bo_path: &[CategoryRef]) -> CategoryPayload {
    let path = en_path
        .iter()
        .map(|category| category.name.clone())
        .collect::<Vec<_>>();
    let en_last = &en_path[en_path.len() - 1];
    let bo_last = &bo_path[bo_path.len() - 1];
    let shared_title = en_last.name.clone();

    let order = match shared_title.as_str() {
        "Root text" => Some(1),
        "Commentaries" => Some(2),
        _ => None,
    };

    CategoryPayload {
        shared_title,
        path,
        en_desc: en_last.en_desc.clone(),
        he_desc: bo_last.he_desc.clone(),
        en_short_desc: en_last.en_short_desc.clone(),
        he_short_desc: bo_last.he_short_desc.clone(),
        order,
    }
}
