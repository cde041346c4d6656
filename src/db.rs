use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::ParsedChapter;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn =
        Connection::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id               INTEGER PRIMARY KEY,
            source           TEXT NOT NULL,
            commentary_name  TEXT NOT NULL,
            book_name        TEXT NOT NULL,
            book_code        INTEGER,
            chapter          INTEGER NOT NULL,
            convention       TEXT NOT NULL CHECK(convention IN ('decorated_numeric','bare_line','none')),
            fallback         BOOLEAN NOT NULL DEFAULT 0,
            markers_found    INTEGER NOT NULL,
            markers_accepted INTEGER NOT NULL,
            verse_count      INTEGER NOT NULL,
            missing_count    INTEGER NOT NULL,
            processed_at     TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(commentary_name, book_name, chapter)
        );
        CREATE INDEX IF NOT EXISTS idx_documents_book ON documents(book_code, chapter);

        CREATE TABLE IF NOT EXISTS commentaries (
            id               INTEGER PRIMARY KEY,
            commentary_name  TEXT NOT NULL,
            book_name        TEXT NOT NULL,
            book_code        INTEGER,
            chapter          INTEGER NOT NULL,
            verse            INTEGER NOT NULL,
            text             TEXT NOT NULL,
            content_length   INTEGER NOT NULL,
            missing          BOOLEAN NOT NULL DEFAULT 0,
            convention       TEXT NOT NULL,
            source           TEXT NOT NULL,
            parsed_at        TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(commentary_name, book_name, chapter, verse)
        );
        CREATE INDEX IF NOT EXISTS idx_commentaries_book ON commentaries(book_code, chapter, verse);
        CREATE INDEX IF NOT EXISTS idx_commentaries_missing ON commentaries(missing);
        ",
    )?;
    Ok(())
}

// ── Parsed chapters ──

pub struct ChapterRow {
    pub source: String,
    pub commentary_name: String,
    pub book_code: Option<u8>,
    pub parsed: ParsedChapter,
}

/// Replace each chapter's rows in one transaction. Returns the verse rows written.
pub fn save_chapters(conn: &Connection, rows: &[ChapterRow]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut clear_stmt = tx.prepare(
            "DELETE FROM commentaries
             WHERE commentary_name = ?1 AND book_name = ?2 AND chapter = ?3",
        )?;
        let mut doc_stmt = tx.prepare(
            "INSERT OR REPLACE INTO documents
             (source, commentary_name, book_name, book_code, chapter, convention, fallback,
              markers_found, markers_accepted, verse_count, missing_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        let mut verse_stmt = tx.prepare(
            "INSERT OR REPLACE INTO commentaries
             (commentary_name, book_name, book_code, chapter, verse, text, content_length,
              missing, convention, source)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )?;

        for row in rows {
            let p = &row.parsed;
            let convention = p.convention.as_str();
            clear_stmt.execute(rusqlite::params![row.commentary_name, p.book_name, p.chapter])?;
            doc_stmt.execute(rusqlite::params![
                row.source, row.commentary_name, p.book_name, row.book_code, p.chapter,
                convention, p.fallback, p.markers_found, p.markers_accepted,
                p.records.len(), p.missing,
            ])?;
            for r in &p.records {
                count += verse_stmt.execute(rusqlite::params![
                    row.commentary_name, r.book_name, row.book_code, r.chapter, r.verse,
                    r.content, r.content_length, r.missing, convention, row.source,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

// ── Gaps ──

pub struct GapRow {
    pub commentary_name: String,
    pub book_name: String,
    pub chapter: u32,
    pub verse: u32,
}

pub fn fetch_gaps(conn: &Connection, book: Option<&str>, limit: usize) -> Result<Vec<GapRow>> {
    let mut conditions = vec!["missing = 1".to_string()];
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(b) = book {
        conditions.push(format!("book_name = ?{}", params.len() + 1));
        params.push(Box::new(b.to_string()));
    }

    let sql = format!(
        "SELECT commentary_name, book_name, chapter, verse
         FROM commentaries
         WHERE {}
         ORDER BY commentary_name, book_code, book_name, chapter, verse
         LIMIT {}",
        conditions.join(" AND "),
        limit
    );

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| p.as_ref()).collect();
    let rows = stmt
        .query_map(param_refs.as_slice(), |row| {
            Ok(GapRow {
                commentary_name: row.get(0)?,
                book_name: row.get(1)?,
                chapter: row.get(2)?,
                verse: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Stats ──

pub struct Stats {
    pub documents: usize,
    pub fallback: usize,
    pub verses: usize,
    pub missing: usize,
    pub by_convention: Vec<(String, usize)>,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let documents: usize = conn.query_row("SELECT COUNT(*) FROM documents", [], |r| r.get(0))?;
    let fallback: usize =
        conn.query_row("SELECT COUNT(*) FROM documents WHERE fallback = 1", [], |r| r.get(0))?;
    let verses: usize = conn.query_row("SELECT COUNT(*) FROM commentaries", [], |r| r.get(0))?;
    let missing: usize =
        conn.query_row("SELECT COUNT(*) FROM commentaries WHERE missing = 1", [], |r| r.get(0))?;

    let mut stmt = conn.prepare(
        "SELECT convention, COUNT(*) FROM documents GROUP BY convention ORDER BY COUNT(*) DESC",
    )?;
    let by_convention = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Stats {
        documents,
        fallback,
        verses,
        missing,
        by_convention,
    })
}
