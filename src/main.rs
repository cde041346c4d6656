mod catalog;
mod db;
mod parser;
mod settings;
mod source;
mod verse_table;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use catalog::BookCatalog;
use parser::{ParseOptions, ParsedChapter};
use settings::Settings;
use source::{ChapterOverride, PageSource};
use verse_table::VerseTable;

#[derive(Parser)]
#[command(
    name = "commentary_verses",
    about = "Split scraped chapter commentary into per-verse records"
)]
struct Cli {
    /// SQLite database path (overrides COMMENTARY_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Canonical verse count table (JSON)
    #[arg(long, global = true)]
    verse_table: Option<PathBuf>,
    /// Accept a marker one past the expected verse when the expected one never appears
    #[arg(long, global = true)]
    resync: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse one page file and print its verse records
    Parse {
        file: PathBuf,
        /// Book name; treats the whole file as body
        #[arg(long, requires = "chapter")]
        book: Option<String>,
        /// Chapter number; treats the whole file as body
        #[arg(long, requires = "book")]
        chapter: Option<u32>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Parse every *.txt page in a directory and save to the database
    Batch {
        dir: PathBuf,
        /// Max pages to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// List the book catalog with codes and chapter counts
    Books,
    /// Show database statistics
    Stats,
    /// List verses the canonical table expects but parsing did not recover
    Gaps {
        /// Filter by book name
        #[arg(short, long)]
        book: Option<String>,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "200")]
        limit: usize,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(table) = cli.verse_table {
        settings.verse_table = table;
    }
    if cli.resync {
        settings.resync = true;
    }
    info!(?settings, "settings loaded");

    let result = match cli.command {
        Commands::Parse {
            file,
            book,
            chapter,
            json,
        } => {
            let catalog = BookCatalog::korean();
            let table = VerseTable::load_optional(&settings.verse_table)?;
            let chapter_override = book
                .zip(chapter)
                .map(|(book_name, chapter)| ChapterOverride { book_name, chapter });
            let page = source::load_page(&file, &catalog, chapter_override.as_ref())?;
            let parsed =
                parser::process_document(&page.document, &table, &settings.parse_options());

            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                print_chapter(&parsed);
            }
            Ok(())
        }
        Commands::Batch { dir, limit } => {
            let catalog = BookCatalog::korean();
            let table = VerseTable::load_optional(&settings.verse_table)?;
            let mut pages = source::discover_pages(&dir)?;
            if let Some(n) = limit {
                pages.truncate(n);
            }
            if pages.is_empty() {
                println!("No *.txt pages found in {}.", dir.display());
                return Ok(());
            }

            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            println!("Processing {} pages...", pages.len());
            let counts = process_pages(&conn, &pages, &catalog, &table, &settings)?;
            counts.print();
            Ok(())
        }
        Commands::Books => {
            let catalog = BookCatalog::korean();
            let table = VerseTable::load_optional(&settings.verse_table)?;
            if table.is_empty() {
                println!("Verse table not loaded; chapter counts unavailable.");
            }
            println!("{:>4} | {:<14} | {:>8}", "Code", "Book", "Chapters");
            println!("{}", "-".repeat(32));
            for (code, name) in catalog.iter() {
                let chapters = table
                    .chapters(name)
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".into());
                println!("{:>4} | {:<14} | {:>8}", code, name, chapters);
            }
            println!("\n{} books", catalog.len());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Documents: {}", s.documents);
            println!("Fallback:  {}", s.fallback);
            println!("Verses:    {}", s.verses);
            println!("Missing:   {}", s.missing);
            for (convention, count) in &s.by_convention {
                println!("  {:<18} {}", convention, count);
            }
            Ok(())
        }
        Commands::Gaps { book, limit } => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let gaps = db::fetch_gaps(&conn, book.as_deref(), limit)?;
            if gaps.is_empty() {
                println!("No unrecovered verses.");
                return Ok(());
            }

            println!("{:<16} | {:<14} | {:>4} | Verses", "Commentary", "Book", "Ch");
            println!("{}", "-".repeat(60));
            for group in gaps.chunk_by(|a, b| {
                a.commentary_name == b.commentary_name
                    && a.book_name == b.book_name
                    && a.chapter == b.chapter
            }) {
                let first = &group[0];
                let verses: Vec<String> = group.iter().map(|g| g.verse.to_string()).collect();
                println!(
                    "{:<16} | {:<14} | {:>4} | {}",
                    truncate(&first.commentary_name, 16),
                    truncate(&first.book_name, 14),
                    first.chapter,
                    verses.join(",")
                );
            }
            println!("\n{} unrecovered verses shown", gaps.len());
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

struct ProcessCounts {
    pages: usize,
    skipped: usize,
    verses: usize,
    missing: usize,
    fallback: usize,
}

impl ProcessCounts {
    fn print(&self) {
        println!(
            "Saved {} pages ({} skipped): {} verse rows, {} unrecovered, {} whole-chapter.",
            self.pages, self.skipped, self.verses, self.missing, self.fallback,
        );
    }
}

fn process_pages(
    conn: &rusqlite::Connection,
    pages: &[PathBuf],
    catalog: &BookCatalog,
    table: &VerseTable,
    settings: &Settings,
) -> Result<ProcessCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(pages.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let options = settings.parse_options();
    let mut counts = ProcessCounts {
        pages: 0,
        skipped: 0,
        verses: 0,
        missing: 0,
        fallback: 0,
    };

    for chunk in pages.chunks(500) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|path| parse_page(path, catalog, table, &options))
            .collect();

        let mut rows = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok((page, parsed)) => {
                    counts.pages += 1;
                    counts.missing += parsed.missing;
                    counts.fallback += usize::from(parsed.fallback);
                    rows.push(db::ChapterRow {
                        source: page.path.display().to_string(),
                        commentary_name: page
                            .commentary_name
                            .unwrap_or_else(|| settings.commentary_name.clone()),
                        book_code: catalog.code(&parsed.book_name),
                        parsed,
                    });
                }
                Err(e) => {
                    counts.skipped += 1;
                    warn!("Skipping page: {}", e);
                }
            }
        }

        counts.verses += db::save_chapters(conn, &rows)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(
        pages = counts.pages,
        skipped = counts.skipped,
        verses = counts.verses,
        missing = counts.missing,
        "batch complete"
    );
    Ok(counts)
}

fn parse_page(
    path: &Path,
    catalog: &BookCatalog,
    table: &VerseTable,
    options: &ParseOptions,
) -> Result<(PageSource, ParsedChapter), source::SourceError> {
    let page = source::load_page(path, catalog, None)?;
    let parsed = parser::process_document(&page.document, table, options);
    Ok((page, parsed))
}

fn print_chapter(parsed: &ParsedChapter) {
    println!(
        "{} {}장 | convention: {} | markers: {} found, {} accepted{}",
        parsed.book_name,
        parsed.chapter,
        parsed.convention.as_str(),
        parsed.markers_found,
        parsed.markers_accepted,
        if parsed.fallback { " | whole-chapter fallback" } else { "" },
    );
    println!("{:>5} | {:>6} | Content", "Verse", "Chars");
    println!("{}", "-".repeat(80));
    for r in &parsed.records {
        let preview = r.content.replace('\n', " ");
        println!(
            "{:>5} | {:>6} | {}",
            r.verse,
            r.content_length,
            truncate(&preview, 60)
        );
    }
    println!(
        "\n{} records, {} unrecovered",
        parsed.records.len(),
        parsed.missing
    );
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
