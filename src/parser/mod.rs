pub mod detect;
pub mod expand;
pub mod normalize;
pub mod segment;

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::verse_table::VerseTable;
use detect::Convention;
use normalize::VerseRecord;

/// One scraped chapter page, already stripped of markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    pub book_name: String,
    pub chapter: u32,
    pub text: String,
}

/// How to treat a marker that jumps past the expected verse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SequencePolicy {
    /// Only the exact next verse starts a new segment.
    #[default]
    Strict,
    /// Also accept `expected + 1` when no later marker starts at `expected`.
    Resync,
}

#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Segments must be longer than this many chars to be kept.
    pub min_content_chars: usize,
    /// Unmarked text longer than this becomes verse 1 of the chapter.
    pub fallback_min_chars: usize,
    pub sequence: SequencePolicy,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            min_content_chars: 10,
            fallback_min_chars: 100,
            sequence: SequencePolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParsedChapter {
    pub book_name: String,
    pub chapter: u32,
    pub convention: Convention,
    /// Whole text stored as verse 1 because no markers were found.
    pub fallback: bool,
    pub markers_found: usize,
    pub markers_accepted: usize,
    pub records: Vec<VerseRecord>,
    /// Sentinel records standing in for unrecovered verses.
    pub missing: usize,
}

/// Three-step pipeline: detect convention → segment by accepted markers → normalize.
pub fn process_document(
    doc: &RawDocument,
    table: &VerseTable,
    options: &ParseOptions,
) -> ParsedChapter {
    let detection = detect::detect(&doc.text, doc.chapter);
    let markers_found = detection.markers.len();

    let (verses, markers_accepted, fallback) = match detection.convention {
        Convention::None => {
            let verses = whole_chapter(&doc.text, options);
            let fallback = !verses.is_empty();
            (verses, 0, fallback)
        }
        Convention::DecoratedNumeric | Convention::BareLine => {
            let segments = segment::segment(&doc.text, &detection.markers, options);
            if segments.verses.is_empty() {
                // every marker was a citation or too short to keep
                let verses = whole_chapter(&doc.text, options);
                let fallback = !verses.is_empty();
                (verses, segments.accepted, fallback)
            } else {
                (segments.verses, segments.accepted, false)
            }
        }
    };

    let normalized = normalize::normalize(&doc.book_name, doc.chapter, &verses, table);

    debug!(
        book = %doc.book_name,
        chapter = doc.chapter,
        convention = detection.convention.as_str(),
        decorated = detection.decorated_count,
        bare_line = detection.bare_line_count,
        markers_found,
        markers_accepted,
        records = normalized.records.len(),
        missing = normalized.missing,
        "chapter parsed"
    );

    ParsedChapter {
        book_name: doc.book_name.clone(),
        chapter: doc.chapter,
        convention: detection.convention,
        fallback,
        markers_found,
        markers_accepted,
        records: normalized.records,
        missing: normalized.missing,
    }
}

fn whole_chapter(text: &str, options: &ParseOptions) -> BTreeMap<u32, String> {
    let text = text.trim();
    let mut verses = BTreeMap::new();
    if text.chars().count() > options.fallback_min_chars {
        verses.insert(1, text.to_string());
    }
    verses
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BookCatalog;
    use crate::source::page_from_str;
    use normalize::MISSING_VERSE;

    fn doc(book: &str, chapter: u32, text: &str) -> RawDocument {
        RawDocument {
            book_name: book.to_string(),
            chapter,
            text: text.to_string(),
        }
    }

    fn fixture(name: &str) -> RawDocument {
        let raw = std::fs::read_to_string(format!("tests/fixtures/{}.txt", name)).unwrap();
        page_from_str(&raw, &BookCatalog::korean()).unwrap().document
    }

    fn bundled_table() -> VerseTable {
        VerseTable::load(std::path::Path::new("data/bible_verse_counts.json")).unwrap()
    }

    fn assert_strictly_ascending(records: &[VerseRecord]) {
        assert!(records.windows(2).all(|w| w[0].verse < w[1].verse));
    }

    #[test]
    fn end_to_end_decorated() {
        let text = "===1:1\nAlpha commentary.\n===1:2\nBeta commentary.\n===1:3\nGamma, see (1:1) again.";
        let table: VerseTable = [("Test".to_string(), vec![3])].into_iter().collect();
        let parsed = process_document(&doc("Test", 1, text), &table, &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::DecoratedNumeric);
        assert_eq!(parsed.missing, 0);
        let got: Vec<(u32, &str)> = parsed
            .records
            .iter()
            .map(|r| (r.verse, r.content.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                (1, "Alpha commentary."),
                (2, "Beta commentary."),
                (3, "Gamma, see (1:1) again."),
            ]
        );
    }

    #[test]
    fn whole_chapter_fallback() {
        let text = "이 장은 절 구분 없이 하나의 긴 주석으로 이루어져 있다. ".repeat(5);
        let text = text.trim().to_string();
        let parsed = process_document(&doc("미상", 7, &text), &VerseTable::default(), &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::None);
        assert!(parsed.fallback);
        assert_eq!(parsed.missing, 0);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].verse, 1);
        assert_eq!(parsed.records[0].chapter, 7);
        assert_eq!(parsed.records[0].content, text);
    }

    #[test]
    fn short_unmarked_text_yields_nothing() {
        let parsed = process_document(&doc("미상", 2, "too short"), &VerseTable::default(), &ParseOptions::default());
        assert!(!parsed.fallback);
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn rejected_markers_fall_back_to_whole_chapter() {
        let prose = "이 장의 주석은 절 표시 없이 이어지며, 본문 앞에 다른 절을 가리키는 인용 표시 하나만 남아 있다. ".repeat(3);
        let text = format!("===3:5\n{}", prose.trim());
        let parsed = process_document(&doc("미상", 3, &text), &VerseTable::default(), &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::DecoratedNumeric);
        assert_eq!(parsed.markers_found, 1);
        assert_eq!(parsed.markers_accepted, 0);
        assert!(parsed.fallback);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].verse, 1);
        assert_eq!(parsed.records[0].content, text);
    }

    #[test]
    fn rejected_markers_on_short_text_yield_nothing() {
        let parsed = process_document(&doc("미상", 3, "===3:5\nshort note"), &VerseTable::default(), &ParseOptions::default());
        assert!(!parsed.fallback);
        assert!(parsed.records.is_empty());
    }

    #[test]
    fn empty_text_with_table_is_all_sentinels() {
        let table: VerseTable = [("룻기".to_string(), vec![22, 23])].into_iter().collect();
        let parsed = process_document(&doc("룻기", 2, ""), &table, &ParseOptions::default());
        assert_eq!(parsed.records.len(), 23);
        assert_eq!(parsed.missing, 23);
        assert!(parsed.records.iter().all(|r| r.content == MISSING_VERSE));
    }

    #[test]
    fn idempotent() {
        let d = fixture("hochma_2john_01");
        let table = bundled_table();
        let a = process_document(&d, &table, &ParseOptions::default());
        let b = process_document(&d, &table, &ParseOptions::default());
        assert_eq!(a.records, b.records);
        assert_eq!(a.missing, b.missing);
    }

    #[test]
    fn decorated_fixture() {
        let d = fixture("hochma_2john_01");
        assert_eq!(d.book_name, "요한이서");
        let parsed = process_document(&d, &bundled_table(), &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::DecoratedNumeric);
        assert_eq!(parsed.records.len(), 13);
        assert_eq!(parsed.missing, 0, "records: {:?}", parsed.records);
        assert_strictly_ascending(&parsed.records);
        // 1:1-3 and 1:10,11 markers share content across their verses
        assert_eq!(parsed.records[0].content, parsed.records[2].content);
        assert_eq!(parsed.records[9].content, parsed.records[10].content);
        // the in-prose citation stays inside verse 7's commentary
        assert!(parsed.records[6].content.contains("(요일 4:2,3)"));
        // the intro before the first marker belongs to no verse
        assert!(parsed.records.iter().all(|r| !r.content.contains("개요")));
    }

    #[test]
    fn bare_line_fixture_strict() {
        let d = fixture("hochma_ruth_02");
        let parsed = process_document(&d, &bundled_table(), &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::BareLine);
        assert_eq!(parsed.records.len(), 23);
        assert_strictly_ascending(&parsed.records);
        // the source skips the 2:10 marker, so everything after it stalls
        let recovered: Vec<u32> = parsed
            .records
            .iter()
            .filter(|r| !r.missing)
            .map(|r| r.verse)
            .collect();
        assert_eq!(recovered, (1..=9).collect::<Vec<_>>());
        assert_eq!(parsed.missing, 14);
        // the stray "2:20" line inside verse 1 is not a boundary
        assert!(parsed.records[0].content.contains("2:20"));
    }

    #[test]
    fn bare_line_fixture_resync() {
        let d = fixture("hochma_ruth_02");
        let options = ParseOptions {
            sequence: SequencePolicy::Resync,
            ..ParseOptions::default()
        };
        let parsed = process_document(&d, &bundled_table(), &options);

        assert_eq!(parsed.records.len(), 23);
        assert_eq!(parsed.missing, 1);
        let missing: Vec<u32> = parsed.records.iter().filter(|r| r.missing).map(|r| r.verse).collect();
        assert_eq!(missing, vec![10]);
    }

    #[test]
    fn whole_chapter_fixture_with_table() {
        let d = fixture("hochma_obadiah_01");
        let parsed = process_document(&d, &bundled_table(), &ParseOptions::default());

        assert_eq!(parsed.convention, Convention::None);
        assert!(parsed.fallback);
        assert_eq!(parsed.records.len(), 21);
        assert!(!parsed.records[0].missing);
        assert_eq!(parsed.missing, 20);
    }
}
