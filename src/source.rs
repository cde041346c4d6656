use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::catalog::BookCatalog;
use crate::parser::RawDocument;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No book/chapter title found in {0}")]
    MissingTitle(PathBuf),

    #[error("Failed to list pages in {path}: {source}")]
    ListDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Book and chapter supplied on the command line instead of a title line.
#[derive(Debug, Clone)]
pub struct ChapterOverride {
    pub book_name: String,
    pub chapter: u32,
}

#[derive(Debug, Clone)]
pub struct PageSource {
    pub path: PathBuf,
    pub commentary_name: Option<String>,
    pub document: RawDocument,
}

/// A page body with the metadata its title declared.
#[derive(Debug, Clone)]
pub struct PageText {
    pub commentary_name: Option<String>,
    pub document: RawDocument,
}

/// Read a scraped page file. Without an override the first non-empty line must be
/// a title naming the book and chapter.
pub fn load_page(
    path: &Path,
    catalog: &BookCatalog,
    chapter_override: Option<&ChapterOverride>,
) -> Result<PageSource, SourceError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SourceError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let page = match chapter_override {
        Some(o) => PageText {
            commentary_name: None,
            document: RawDocument {
                book_name: o.book_name.clone(),
                chapter: o.chapter,
                text: normalize_newlines(&raw),
            },
        },
        None => page_from_str(&raw, catalog)
            .ok_or_else(|| SourceError::MissingTitle(path.to_path_buf()))?,
    };

    Ok(PageSource {
        path: path.to_path_buf(),
        commentary_name: page.commentary_name,
        document: page.document,
    })
}

/// Split a page into its title line and body, resolving the title against the catalog.
pub fn page_from_str(raw: &str, catalog: &BookCatalog) -> Option<PageText> {
    let raw = normalize_newlines(raw);
    let body_start = raw.find(|c: char| !c.is_whitespace())?;
    let rest = &raw[body_start..];
    let (title, body) = rest.split_once('\n').unwrap_or((rest, ""));

    let title = catalog.parse_title(title.trim())?;
    Some(PageText {
        commentary_name: title.commentary_name,
        document: RawDocument {
            book_name: title.book_name,
            chapter: title.chapter,
            text: body.to_string(),
        },
    })
}

/// `*.txt` files directly inside `dir`, sorted by name.
pub fn discover_pages(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let list_err = |source| SourceError::ListDir {
        path: dir.to_path_buf(),
        source,
    };
    let mut pages = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(list_err)? {
        let path = entry.map_err(list_err)?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "txt") {
            pages.push(path);
        }
    }
    pages.sort();
    Ok(pages)
}

fn normalize_newlines(raw: &str) -> String {
    raw.replace("\r\n", "\n")
}
