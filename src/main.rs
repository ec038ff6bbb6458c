//! pagemark: highlight terms in an HTML page, extract its readable content
//! or export both as Markdown.
//!
//! Usage:
//!   pagemark highlight fox page.html --whole-word
//!   pagemark extract --url https://example.com/article
//!   pagemark markdown page.html --term fox --term dog --multi-color

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagemark::managers::highlight_store::{MemoryHighlightStore, PersistenceAdapter};
use pagemark::managers::page_session::{PageSession, ReadyState};
use pagemark::types::preferences::HighlightPreferences;

#[derive(Parser)]
#[command(name = "pagemark")]
#[command(about = "Find-and-mark highlighting and reader extraction for HTML pages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Highlight a term and print the match count and annotated HTML
    Highlight {
        /// Term (or regular expression with --regex) to highlight
        term: String,
        #[command(flatten)]
        source: Source,
        #[command(flatten)]
        matching: Matching,
        /// Print only the counts
        #[arg(long)]
        quiet: bool,
    },
    /// Print the readable title and text of the page
    Extract {
        #[command(flatten)]
        source: Source,
    },
    /// Print a Markdown export of the page and its highlights
    Markdown {
        #[command(flatten)]
        source: Source,
        /// Terms to highlight before exporting (repeatable)
        #[arg(long = "term")]
        terms: Vec<String>,
        #[command(flatten)]
        matching: Matching,
    },
}

#[derive(Args)]
struct Source {
    /// HTML file to read
    #[arg(conflicts_with = "url")]
    file: Option<PathBuf>,
    /// Fetch the page from a URL instead
    #[arg(long)]
    url: Option<String>,
}

#[derive(Args)]
struct Matching {
    #[arg(long)]
    case_sensitive: bool,
    #[arg(long)]
    whole_word: bool,
    /// Treat the term as a regular expression
    #[arg(long)]
    regex: bool,
    /// Give every term its own palette color
    #[arg(long)]
    multi_color: bool,
    /// CSS selector text must sit inside (repeatable)
    #[arg(long)]
    include: Vec<String>,
    /// CSS selector whose text is skipped (repeatable)
    #[arg(long)]
    exclude: Vec<String>,
}

impl Matching {
    fn preferences(&self) -> HighlightPreferences {
        HighlightPreferences {
            case_sensitive: self.case_sensitive,
            whole_word: self.whole_word,
            use_regex: self.regex,
            multi_color_mode: self.multi_color,
            persist_highlights: false,
            include_selectors: self.include.join("\n"),
            exclude_selectors: self.exclude.join("\n"),
            ..HighlightPreferences::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Highlight { term, source, matching, quiet } => {
            let mut page = open_page(&source, matching.preferences()).await?;
            let outcome = page.highlight(&term, true).await;
            println!("{} matches", outcome.count);
            for group in &outcome.groups {
                println!("  {:?}: {} ({})", group.term, group.count, group.color);
            }
            if !quiet {
                println!();
                println!("{}", page.page_html());
            }
        }
        Command::Extract { source } => {
            let page = open_page(&source, HighlightPreferences::default()).await?;
            let article = page.extract_content();
            println!("# {}", article.title);
            println!(
                "{} words, ~{} min read{}",
                article.word_count,
                article.estimated_read_time_minutes,
                if article.used_fallback { " (fallback)" } else { "" }
            );
            println!();
            println!("{}", article.text);
        }
        Command::Markdown { source, terms, matching } => {
            let prefs = matching.preferences();
            let multi_color = prefs.multi_color_mode;
            let mut page = open_page(&source, prefs).await?;
            for (i, term) in terms.iter().enumerate() {
                page.highlight(term, !multi_color && i == 0).await;
            }
            println!("{}", page.export_markdown(Utc::now()));
        }
    }
    Ok(())
}

async fn open_page(
    source: &Source,
    prefs: HighlightPreferences,
) -> Result<PageSession, Box<dyn std::error::Error>> {
    let (url, html) = read_source(source).await?;
    let persistence = PersistenceAdapter::new(Arc::new(MemoryHighlightStore::new()));
    let mut page = PageSession::new(Arc::new(prefs), persistence);
    page.load_page(&url, None, &html, ReadyState::Complete).await;
    info!(url = %url, title = page.title(), "page loaded");
    Ok(page)
}

async fn read_source(source: &Source) -> Result<(String, String), Box<dyn std::error::Error>> {
    if let Some(url) = &source.url {
        return fetch(url).await;
    }
    match &source.file {
        Some(path) => {
            let html = std::fs::read_to_string(path)?;
            let url = match std::fs::canonicalize(path) {
                Ok(abs) => format!("file://{}", abs.display()),
                Err(_) => format!("file://{}", path.display()),
            };
            Ok((url, html))
        }
        None => Err("either a FILE or --url is required".into()),
    }
}

#[cfg(feature = "network")]
async fn fetch(url: &str) -> Result<(String, String), Box<dyn std::error::Error>> {
    let response = reqwest::get(url).await?.error_for_status()?;
    let final_url = response.url().to_string();
    let html = response.text().await?;
    Ok((final_url, html))
}

#[cfg(not(feature = "network"))]
async fn fetch(_url: &str) -> Result<(String, String), Box<dyn std::error::Error>> {
    Err("built without the `network` feature; pass a file instead".into())
}
