use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Characters whose runs of three or more decorate a verse marker (`===12:5`, `***12:5`).
const DELIMITERS: &[char] = &['=', '-', '*', '#', '~', '_', '+'];

static DECORATED_RE: LazyLock<Regex> = LazyLock::new(|| {
    let runs: Vec<String> = DELIMITERS
        .iter()
        .map(|c| format!("{}{{3,}}", regex::escape(&c.to_string())))
        .collect();
    Regex::new(&format!(r"(?:{})(\d+):(\d+(?:[,-]\d+)*)(?:절)?", runs.join("|"))).unwrap()
});
static BARE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d+(?:[,-]\d+)*)(?:절)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Marker prefixed by a run of repeated delimiters: `===12:5`.
    DecoratedNumeric,
    /// Marker alone on its own line: `12:5`, `12:5,6`, `12:5-7`.
    BareLine,
    /// No reliable marker convention found.
    None,
}

impl Convention {
    pub fn as_str(&self) -> &'static str {
        match self {
            Convention::DecoratedNumeric => "decorated_numeric",
            Convention::BareLine => "bare_line",
            Convention::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerCandidate {
    /// Byte offset where the marker starts.
    pub position: usize,
    /// Byte offset just past the marker; commentary begins here.
    pub end: usize,
    /// Verse token after the colon, e.g. `"33-35"`.
    pub raw_reference: String,
    pub convention: Convention,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub convention: Convention,
    /// Markers of the selected convention in document order.
    pub markers: Vec<MarkerCandidate>,
    pub decorated_count: usize,
    pub bare_line_count: usize,
}

/// Scan `text` for every marker convention and keep the one with the most hits.
/// Ties go to the decorated form.
pub fn detect(text: &str, chapter: u32) -> Detection {
    let decorated = scan_decorated(text, chapter);
    let bare = scan_bare_lines(text, chapter);
    let decorated_count = decorated.len();
    let bare_line_count = bare.len();

    let (convention, markers) = if decorated.is_empty() && bare.is_empty() {
        (Convention::None, Vec::new())
    } else if bare_line_count > decorated_count {
        (Convention::BareLine, bare)
    } else {
        (Convention::DecoratedNumeric, decorated)
    };

    Detection {
        convention,
        markers,
        decorated_count,
        bare_line_count,
    }
}

fn scan_decorated(text: &str, chapter: u32) -> Vec<MarkerCandidate> {
    DECORATED_RE
        .captures_iter(text)
        .filter(|caps| chapter_matches(&caps[1], chapter))
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            Some(MarkerCandidate {
                position: whole.start(),
                end: whole.end(),
                raw_reference: caps[2].to_string(),
                convention: Convention::DecoratedNumeric,
            })
        })
        .collect()
}

fn scan_bare_lines(text: &str, chapter: u32) -> Vec<MarkerCandidate> {
    let mut markers = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if let Some(caps) = BARE_LINE_RE.captures(line.trim()) {
            if chapter_matches(&caps[1], chapter) {
                markers.push(MarkerCandidate {
                    position: offset,
                    end: offset + line.len(),
                    raw_reference: caps[2].to_string(),
                    convention: Convention::BareLine,
                });
            }
        }
        offset += line.len();
    }
    markers
}

fn chapter_matches(raw: &str, chapter: u32) -> bool {
    raw.parse::<u32>().is_ok_and(|c| c == chapter)
}
