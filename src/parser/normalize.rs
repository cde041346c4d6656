use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::verse_table::VerseTable;

/// Content stored for a verse the canonical table expects but segmentation never recovered.
pub const MISSING_VERSE: &str = "[누락된 절]";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerseRecord {
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
    pub content: String,
    /// Length of `content` in chars.
    pub content_length: usize,
    pub missing: bool,
}

impl VerseRecord {
    pub fn recovered(book_name: &str, chapter: u32, verse: u32, content: String) -> Self {
        VerseRecord {
            book_name: book_name.to_string(),
            chapter,
            verse,
            content_length: content.chars().count(),
            content,
            missing: false,
        }
    }

    pub fn unrecovered(book_name: &str, chapter: u32, verse: u32) -> Self {
        VerseRecord {
            book_name: book_name.to_string(),
            chapter,
            verse,
            content: MISSING_VERSE.to_string(),
            content_length: MISSING_VERSE.chars().count(),
            missing: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<VerseRecord>,
    /// Number of sentinel records in `records`.
    pub missing: usize,
}

/// Reconcile segmented verses against the canonical verse count.
///
/// With a table entry every expected verse gets a record, gaps filled by the
/// sentinel. Without one the segmented verses pass through in order.
pub fn normalize(
    book_name: &str,
    chapter: u32,
    segments: &BTreeMap<u32, String>,
    table: &VerseTable,
) -> Normalized {
    let Some(expected) = table.expected(book_name, chapter) else {
        let records = segments
            .iter()
            .map(|(&verse, content)| VerseRecord::recovered(book_name, chapter, verse, content.clone()))
            .collect();
        return Normalized { records, missing: 0 };
    };

    let beyond = segments.range(expected.saturating_add(1)..).count();
    if beyond > 0 {
        debug!(book_name, chapter, expected, beyond, "segments past the canonical verse count dropped");
    }

    let mut missing = 0;
    let records = (1..=expected)
        .map(|verse| match segments.get(&verse) {
            Some(content) => VerseRecord::recovered(book_name, chapter, verse, content.clone()),
            None => {
                missing += 1;
                VerseRecord::unrecovered(book_name, chapter, verse)
            }
        })
        .collect();

    Normalized { records, missing }
}
