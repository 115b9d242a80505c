use serde_json::json;

use super::ranges::{RangeExtractor, RangeTag, TaggedRun};
use super::*;
use crate::model::BookPayload;
use crate::tree::{Text, TreeError};

fn lines(values: &[&str]) -> Vec<Text> {
    values.iter().map(|value| Text::line(*value)).collect()
}

fn rendered(runs: &[TaggedRun]) -> Vec<(String, String)> {
    runs.iter()
        .map(|tagged| (tagged.tag.to_string(), tagged.run.to_string()))
        .collect()
}

fn link(root: &str, commentary: &str) -> LinkRecord {
    LinkRecord::commentary(root.to_string(), commentary.to_string())
}

fn commentary_book(en_content: serde_json::Value, bo_content: serde_json::Value) -> BookPayload {
    serde_json::from_value(json!({
        "source": {
            "categories": [
                {"name": "Madhyamaka"},
                {
                    "name": "The Way of the Bodhisattva",
                    "base_text_titles": ["Root Text"],
                    "base_text_mapping": "many-to-one",
                    "link": "Commentary"
                }
            ],
            "books": [{"title": "The Way of the Bodhisattva", "language": "en", "content": en_content}]
        },
        "target": {
            "categories": [{"name": "དབུ་མ།"}, {"name": "སྤྱོད་འཇུག"}],
            "books": [{"title": "སྤྱོད་འཇུག", "language": "bo", "content": bo_content}]
        }
    }))
    .expect("book payload should deserialize")
}

#[test]
fn extract_groups_consecutive_lines_per_tag() {
    let extractor = RangeExtractor::new().expect("extractor should build");
    let runs = extractor.extract(&lines(&["a <1,1>", "b <1,1>", "c <1,2>"]));

    assert_eq!(
        rendered(&runs),
        vec![
            ("<1,1>".to_string(), "1-2".to_string()),
            ("<1,2>".to_string(), "3".to_string()),
        ]
    );
    assert_eq!(
        runs[0].tag,
        RangeTag {
            chapter: 1,
            verse: 1
        }
    );
}

#[test]
fn extract_orders_tags_numerically_and_keeps_repeated_runs() {
    let extractor = RangeExtractor::new().expect("extractor should build");
    let runs = extractor.extract(&lines(&[
        "x <2,1>",
        "y",
        "z <2,1>",
        "w <1,10>",
        "v <1,9>",
    ]));

    assert_eq!(
        rendered(&runs),
        vec![
            ("<1,9>".to_string(), "5".to_string()),
            ("<1,10>".to_string(), "4".to_string()),
            ("<2,1>".to_string(), "1".to_string()),
            ("<2,1>".to_string(), "3".to_string()),
        ]
    );
}

#[test]
fn extract_counts_a_line_under_each_of_its_tags() {
    let extractor = RangeExtractor::new().expect("extractor should build");
    let runs = extractor.extract(&lines(&[
        "<1,4> Chapter 1, verse 1",
        "<1,4><1,3> Chapter 1, verse 2",
        "repeat <1,3> <1,3>",
    ]));

    assert_eq!(
        rendered(&runs),
        vec![
            ("<1,3>".to_string(), "2-3".to_string()),
            ("<1,4>".to_string(), "1-2".to_string()),
        ]
    );
}

#[test]
fn extract_skips_malformed_tags_but_keeps_line_numbers() {
    let extractor = RangeExtractor::new().expect("extractor should build");
    let scanned = extractor.scan("bad <99999999999,1>");
    assert!(matches!(scanned[0], Err(TreeError::MalformedTag { .. })));

    let runs = extractor.extract(&lines(&["bad <99999999999,1>", "good <3, 4>", "single <7>"]));
    assert_eq!(rendered(&runs), vec![("<3,4>".to_string(), "2".to_string())]);
}

#[test]
fn map_flat_commentary_uses_bare_line_runs() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let links = mapper
        .map(
            "Commentary",
            &lines(&["line1 <2,3>", "line2 <2,3>", "line3 <2,4>"]),
            "Root",
        )
        .expect("depth 1 maps");

    assert_eq!(
        links,
        vec![
            link("Root 2:3", "Commentary 1-2"),
            link("Root 2:4", "Commentary 3"),
        ]
    );
    assert_eq!(
        serde_json::to_value(&links[0]).expect("link should serialize"),
        json!({"refs": ["Root 2:3", "Commentary 1-2"], "type": "commentary"})
    );
}

#[test]
fn map_two_level_commentary_prefixes_section_index() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let contents = vec![Text::lines(["l1 <1,1>"]), Text::lines(["l2 <1,2>"])];

    let links = mapper.map("Commentary", &contents, "Root").expect("depth 2 maps");
    assert_eq!(
        links,
        vec![
            link("Root 1:1", "Commentary 1:1"),
            link("Root 1:2", "Commentary 2:1"),
        ]
    );
}

#[test]
fn map_three_level_commentary_prefixes_both_indices() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let contents = vec![
        Text::List(vec![Text::lines(["a"]), Text::lines(["b <4,1>", "c <4,1>"])]),
        Text::List(vec![Text::lines(["d <4,2>"])]),
    ];

    let links = mapper.map("Commentary", &contents, "Root").expect("depth 3 maps");
    assert_eq!(
        links,
        vec![
            link("Root 4:1", "Commentary 1:2:1-2"),
            link("Root 4:2", "Commentary 2:1:1"),
        ]
    );
}

#[test]
fn map_rejects_four_levels() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let contents = vec![Text::List(vec![Text::List(vec![Text::lines(["x <1,1>"])])])];

    let err = mapper
        .map("Commentary", &contents, "Root")
        .expect_err("depth 4 is unsupported");
    assert!(matches!(err, TreeError::UnsupportedDepth { depth: 4, .. }));
}

#[test]
fn create_links_deduplicates_matching_languages_by_default() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let book = commentary_book(
        json!(["Chapter 1, verse 1 <1,1>", "Chapter 1, verse 2 <1,2>"]),
        json!(["བརྗོད་པ་ ༡ ཤླཽཀ་ ༡ <1,1>", "བརྗོད་པ་ ༡ ཤླཽཀ་ ༢ <1,2>"]),
    );

    let links = create_links(&book, &mapper, MergePolicy::default()).expect("links build");
    assert_eq!(
        links,
        vec![
            link("Root Text 1:1", "The Way of the Bodhisattva 1"),
            link("Root Text 1:2", "The Way of the Bodhisattva 2"),
        ]
    );
}

#[test]
fn create_links_honours_merge_policy() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let book = commentary_book(json!(["en <1,1>", "en <1,2>"]), json!(["bo <1,1>", "bo"]));

    let all = create_links(&book, &mapper, MergePolicy::Concatenate).expect("links build");
    assert_eq!(all.len(), 3);

    let last = create_links(&book, &mapper, MergePolicy::LastLanguage).expect("links build");
    assert_eq!(last, vec![link("Root Text 1:1", "The Way of the Bodhisattva 1")]);

    let merged = create_links(&book, &mapper, MergePolicy::Deduplicate).expect("links build");
    assert_eq!(merged.len(), 2);
}

#[test]
fn create_links_keys_tibetan_sections_by_english_labels() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let book = commentary_book(
        json!({"Commentary": {"data": ["intro"], "Ch1": {"data": ["a <1,1>"]}}}),
        json!({"འགྲེལ་པ།": {"data": ["ཀ"], "ལེའུ།": {"data": ["ཁ", "ག <2,1>"]}}}),
    );

    let links = create_links(&book, &mapper, MergePolicy::Concatenate).expect("links build");
    assert_eq!(
        links,
        vec![
            link("Root Text 1:1", "Commentary, Ch1 1"),
            link("Root Text 2:1", "Commentary, Ch1 2"),
        ]
    );
}

#[test]
fn create_links_ignores_root_texts() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let mut book = commentary_book(json!(["a <1,1>"]), json!([]));
    book.source.categories[1].base_text_titles = None;

    let links = create_links(&book, &mapper, MergePolicy::default()).expect("links build");
    assert!(links.is_empty());
}

#[test]
fn create_links_requires_a_base_text_title() {
    let mapper = LinkMapper::new().expect("mapper should build");
    let mut book = commentary_book(json!(["a <1,1>"]), json!([]));
    book.source.categories[1].base_text_titles = Some(Vec::new());

    let err = create_links(&book, &mapper, MergePolicy::default()).expect_err("no root title");
    assert!(matches!(err, TreeError::MissingBaseText { .. }));
}

#[test]
fn merge_policy_last_language_of_nothing_is_empty() {
    assert!(MergePolicy::LastLanguage.merge(Vec::new()).is_empty());
}

#[test]
fn commentary_title_drops_the_locant() {
    assert_eq!(link("Root 1:1", "Commentary 1-2").commentary_title(), "Commentary");
    assert_eq!(
        link("Root 1:1", "Book, Ch1 2:3:4").commentary_title(),
        "Book, Ch1"
    );
    assert_eq!(link("Root 1:1", "Untitled").commentary_title(), "Untitled");
}
