/// Widest span a single range may cover. The longest chapter (Psalm 119) has 176 verses.
const MAX_RANGE_SPAN: u32 = 200;

/// Expand a verse token into individual verse numbers.
///
/// `"33-35"` → `[33, 34, 35]`, `"37,38"` → `[37, 38]`, `"1-3,5"` → `[1, 2, 3, 5]`.
/// Unparseable parts contribute nothing; a wholly unusable token yields an empty list.
pub fn expand(raw: &str) -> Vec<u32> {
    let raw = raw.trim();
    if raw.contains(',') {
        raw.split(',').flat_map(expand_part).collect()
    } else if raw.contains('-') {
        parse_range(raw).unwrap_or_default()
    } else {
        parse_verse(raw).into_iter().collect()
    }
}

fn expand_part(part: &str) -> Vec<u32> {
    if part.contains('-') {
        parse_range(part).unwrap_or_default()
    } else {
        parse_verse(part).into_iter().collect()
    }
}

fn parse_range(token: &str) -> Option<Vec<u32>> {
    let (start, end) = token.split_once('-')?;
    let start = parse_verse(start)?;
    let end = parse_verse(end)?;
    if end < start || end - start >= MAX_RANGE_SPAN {
        return None;
    }
    Some((start..=end).collect())
}

fn parse_verse(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}
