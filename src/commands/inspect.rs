use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::InspectArgs;
use crate::model::{Book, BookPayload};
use crate::tree::{
    AnnotationParser, BilingualContent, ContentNode, FlatChapter, Language, LeafMode, SchemaNode,
    flatten, generate_schema,
};
use crate::util::{read_json, write_json_pretty};

/// What the uploader would send for one book, without contacting the API.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub index_key: String,
    pub english: Vec<FlatChapter>,
    pub tibetan: Vec<FlatChapter>,
    pub schema: Vec<SchemaNode>,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let book: BookPayload = read_json(&args.input)?;
    let report = build_report(&book, args.raw)
        .with_context(|| format!("failed to inspect {}", args.input.display()))?;

    info!(
        index = %report.index_key,
        english = report.english.len(),
        tibetan = report.tibetan.len(),
        "inspected book"
    );

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &report)?;
            info!(path = %path.display(), "wrote inspect report");
        }
        None => {
            let mut output = io::BufWriter::new(io::stdout().lock());
            serde_json::to_writer_pretty(&mut output, &report)
                .context("failed to serialize inspect report")?;
            writeln!(output)?;
            output.flush()?;
        }
    }
    Ok(())
}

pub fn build_report(book: &BookPayload, raw: bool) -> Result<InspectReport> {
    let index_key = book
        .index_key()
        .context("book file has no English categories")?;
    let parser = AnnotationParser::new()?;
    let mode = if raw {
        LeafMode::Raw
    } else {
        LeafMode::Parsed(&parser)
    };

    let en_book = book.source.books.first();
    let bo_book = book.target.books.first();
    let en_content = parse_content(en_book)?;
    let bo_content = parse_content(bo_book)?;

    let english = flatten(&en_content, Language::English, index_key, mode);
    let tibetan = flatten(&bo_content, Language::Tibetan, index_key, mode);

    let content = BilingualContent::new(en_content, bo_content)?;
    let en_title = en_book.map_or(index_key, |book| book.title.as_str());
    let bo_title = bo_book.map_or(en_title, |book| book.title.as_str());
    let schema = generate_schema(&content, en_title, bo_title)?;

    Ok(InspectReport {
        index_key: index_key.to_string(),
        english,
        tibetan,
        schema,
    })
}

fn parse_content(book: Option<&Book>) -> Result<ContentNode> {
    match book {
        Some(book) => ContentNode::from_json(&book.content)
            .with_context(|| format!("invalid content in {}", book.title)),
        None => Ok(ContentNode::Leaf(Vec::new())),
    }
}
