use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

use super::detect::MarkerCandidate;
use super::expand::expand;
use super::{ParseOptions, SequencePolicy};

static BLANK_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n").unwrap());

#[derive(Debug, Clone, Default)]
pub struct Segments {
    pub verses: BTreeMap<u32, String>,
    /// Markers accepted as real verse boundaries.
    pub accepted: usize,
}

/// Slice `text` at the accepted markers and map each covered verse to its commentary.
///
/// A marker is accepted only when its first verse is the next one expected. Anything
/// ahead of or behind the sequence is a citation that happens to look like a marker.
pub fn segment(text: &str, markers: &[MarkerCandidate], options: &ParseOptions) -> Segments {
    let expanded: Vec<Vec<u32>> = markers.iter().map(|m| expand(&m.raw_reference)).collect();
    let accepted = accept_in_sequence(markers, &expanded, options.sequence);

    let mut verses = BTreeMap::new();
    for (n, &i) in accepted.iter().enumerate() {
        let start = markers[i].end;
        let end = accepted
            .get(n + 1)
            .map_or(text.len(), |&next| markers[next].position);
        let content = clean_content(&text[start..end]);

        if content.chars().count() <= options.min_content_chars {
            debug!(
                reference = %markers[i].raw_reference,
                chars = content.chars().count(),
                "dropping short segment"
            );
            continue;
        }

        for &verse in &expanded[i] {
            verses.entry(verse).or_insert_with(|| content.clone());
        }
    }

    Segments {
        verses,
        accepted: accepted.len(),
    }
}

/// Indices of markers that advance the verse sequence.
fn accept_in_sequence(
    markers: &[MarkerCandidate],
    expanded: &[Vec<u32>],
    policy: SequencePolicy,
) -> Vec<usize> {
    let mut accepted = Vec::new();
    let mut expected = 1u32;

    for (i, verses) in expanded.iter().enumerate() {
        let (Some(&first), Some(&last)) = (verses.first(), verses.last()) else {
            trace!(reference = %markers[i].raw_reference, "unusable reference");
            continue;
        };

        let in_sequence = first == expected
            || (policy == SequencePolicy::Resync
                && first == expected.saturating_add(1)
                && !expanded[i + 1..]
                    .iter()
                    .any(|later| later.first() == Some(&expected)));

        if in_sequence {
            if first != expected {
                debug!(skipped = expected, resumed = first, "resynchronized past missing marker");
            }
            accepted.push(i);
            expected = last.saturating_add(1);
        } else {
            trace!(
                reference = %markers[i].raw_reference,
                convention = markers[i].convention.as_str(),
                expected,
                "out-of-sequence marker ignored"
            );
        }
    }

    accepted
}

/// Collapse runs of blank lines and trim.
pub(crate) fn clean_content(raw: &str) -> String {
    BLANK_RUN_RE.replace_all(raw, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::detect::detect;

    fn run(text: &str, chapter: u32) -> Segments {
        let d = detect(text, chapter);
        segment(text, &d.markers, &ParseOptions::default())
    }

    fn run_with(text: &str, chapter: u32, sequence: SequencePolicy) -> Segments {
        let d = detect(text, chapter);
        let options = ParseOptions {
            sequence,
            ..ParseOptions::default()
        };
        segment(text, &d.markers, &options)
    }

    #[test]
    fn splits_between_markers() {
        let text = "===1:1\nAlpha commentary.\n===1:2\nBeta commentary.\n===1:3\nGamma, see (1:1) again.";
        let s = run(text, 1);
        assert_eq!(s.accepted, 3);
        assert_eq!(s.verses[&1], "Alpha commentary.");
        assert_eq!(s.verses[&2], "Beta commentary.");
        assert_eq!(s.verses[&3], "Gamma, see (1:1) again.");
    }

    #[test]
    fn compound_marker_shares_content() {
        let text = "===2:1-3\nOpening commentary here.\n===2:4,5\nFollowing commentary here.\n===2:6\nClosing commentary here.";
        let s = run(text, 2);
        assert_eq!(s.verses.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(s.verses[&2], s.verses[&3]);
        assert_eq!(s.verses[&5], "Following commentary here.");
    }

    #[test]
    fn citation_ahead_of_sequence_is_ignored() {
        // chapter 7: a standalone "7:7-9" line shows up while we are still on verse 2
        let text = "7:1\nNoah enters the ark with his family.\n7:2\nClean animals by sevens (창 7:7-9).\n7:7-9\nThis line is a citation, not a marker.\n7:3\nBirds of the air by sevens as well.";
        let s = run(text, 7);
        assert_eq!(s.accepted, 3);
        assert_eq!(s.verses.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(!s.verses.contains_key(&7));
        assert!(s.verses[&2].contains("This line is a citation"));
    }

    #[test]
    fn repeated_verse_keeps_first_occurrence() {
        let text = "1:1\nThe first real commentary.\n1:2\nSecond verse commentary.\n1:1\nA later mention of verse one.";
        let s = run(text, 1);
        assert_eq!(s.verses[&1], "The first real commentary.");
        assert!(s.verses[&2].contains("A later mention"));
    }

    #[test]
    fn skipped_marker_stalls_strict_sequence() {
        let text = "===3:1\nVerse one commentary.\n===3:3\nVerse three commentary.\n===3:4\nVerse four commentary.";
        let s = run(text, 3);
        assert_eq!(s.accepted, 1);
        assert_eq!(s.verses.len(), 1);
        assert!(s.verses[&1].contains("Verse four"));
    }

    #[test]
    fn resync_accepts_off_by_one() {
        let text = "===3:1\nVerse one commentary.\n===3:3\nVerse three commentary.\n===3:4\nVerse four commentary.";
        let s = run_with(text, 3, SequencePolicy::Resync);
        assert_eq!(s.accepted, 3);
        assert_eq!(s.verses.keys().copied().collect::<Vec<_>>(), vec![1, 3, 4]);
    }

    #[test]
    fn resync_waits_for_a_later_exact_match() {
        // "3:3" looks like a skip, but 3:2 shows up later, so 3:3 is a citation
        let text = "===3:1\nVerse one, compare 3:3 below.\n===3:3\nStray reference block.\n===3:2\nVerse two commentary.\n===3:3\nVerse three commentary.";
        let s = run_with(text, 3, SequencePolicy::Resync);
        assert_eq!(s.verses.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(s.verses[&3], "Verse three commentary.");
    }

    #[test]
    fn short_segments_are_dropped() {
        let text = "===1:1\n \n===1:2\nA proper commentary body.";
        let s = run(text, 1);
        assert_eq!(s.accepted, 2);
        assert!(!s.verses.contains_key(&1));
        assert!(s.verses.contains_key(&2));
    }

    #[test]
    fn segment_at_the_length_threshold_is_dropped() {
        let text = "===1:1\n0123456789\n===1:2\n01234567890";
        let s = run(text, 1);
        assert_eq!(s.accepted, 2);
        assert_eq!(s.verses.keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn blank_runs_collapse() {
        assert_eq!(clean_content("\n a\n\n\n\nb \n"), "a\n\nb");
    }

    #[test]
    fn unusable_reference_is_skipped() {
        let markers = vec![
            MarkerCandidate {
                position: 0,
                end: 3,
                raw_reference: "x".into(),
                convention: crate::parser::detect::Convention::BareLine,
            },
            MarkerCandidate {
                position: 3,
                end: 6,
                raw_reference: "1".into(),
                convention: crate::parser::detect::Convention::BareLine,
            },
        ];
        let text = "1:x1:1 and then the commentary text";
        let s = segment(text, &markers, &ParseOptions::default());
        assert_eq!(s.accepted, 1);
        assert_eq!(s.verses[&1], "and then the commentary text");
    }
}
