use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum VerseTableError {
    #[error("Failed to read verse table at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse verse table at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Expected verse count per chapter, keyed by book name.
///
/// JSON shape: `{ "창세기": [31, 25, 24, ...], ... }` where index 0 is chapter 1.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct VerseTable {
    books: HashMap<String, Vec<u32>>,
}

impl VerseTable {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, VerseTableError> {
        let json = std::fs::read_to_string(path).map_err(|source| VerseTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::from_json_str(&json).map_err(|source| VerseTableError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), books = table.len(), "verse table loaded");
        Ok(table)
    }

    /// Like [`VerseTable::load`], but a missing file yields an empty table.
    pub fn load_optional(path: &Path) -> Result<Self, VerseTableError> {
        if !path.exists() {
            warn!(
                path = %path.display(),
                "verse table not found, verse count validation disabled"
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Expected verse count for a 1-based chapter, if known.
    pub fn expected(&self, book_name: &str, chapter: u32) -> Option<u32> {
        let index = usize::try_from(chapter).ok()?.checked_sub(1)?;
        self.books.get(book_name)?.get(index).copied()
    }

    pub fn chapters(&self, book_name: &str) -> Option<usize> {
        self.books.get(book_name).map(Vec::len)
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }
}

impl FromIterator<(String, Vec<u32>)> for VerseTable {
    fn from_iter<I: IntoIterator<Item = (String, Vec<u32>)>>(iter: I) -> Self {
        VerseTable {
            books: iter.into_iter().collect(),
        }
    }
}
