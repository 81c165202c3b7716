//! bioknowledge - Space Biology Knowledge Engine
//!
//! A Rust microservice for discovering space-biology research across a
//! journal citation CSV and NASA's OSDR study repository, with a CORS proxy
//! relay in front of the OSDR REST API.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! bioknowledge search "microgravity" --source osdr --snapshot data/osd.json
//! ```
//!
//! ### HTTP Relay Mode
//! ```bash
//! bioknowledge serve --port 5000
//! ```

use anyhow::{Context, Result};
use bioknowledge::config;
use bioknowledge::details;
use bioknowledge::engine::{EngineState, Session};
use bioknowledge::journal;
use bioknowledge::merge;
use bioknowledge::osdr::{self, OsdrClient};
use bioknowledge::record::{NormalizedRecord, SourceFilter};
use bioknowledge::relay;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Space Biology Knowledge Engine - Research Discovery Microservice
#[derive(Parser)]
#[command(name = "bioknowledge")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the merged journal + OSDR collection
    Search {
        /// Free-text query, matched against record titles
        #[arg(default_value = "")]
        query: String,

        /// Source filter
        #[arg(long, default_value = "all", value_parser = ["all", "journal", "osdr"])]
        source: String,

        /// Path to the journal citations CSV
        #[arg(long, default_value = "data/journals.csv")]
        journals: PathBuf,

        /// Path to a local OSDR snapshot JSON file
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// Fetch OSDR records live through the relay instead of a snapshot
        #[arg(long)]
        live: bool,

        /// Relay base URL for live OSDR fetches
        #[arg(long, default_value = config::api::DEFAULT_RELAY_URL)]
        relay_url: String,

        /// Keep only records from this publication year onwards
        #[arg(long)]
        year_start: Option<i32>,

        /// Keep only records up to this publication year
        #[arg(long)]
        year_end: Option<i32>,

        /// Number of result pages to reveal
        #[arg(long, default_value = "1")]
        pages: usize,

        /// Write the revealed results to a CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Keep reading queries and commands from stdin
        #[arg(short, long)]
        interactive: bool,
    },

    /// Run the CORS proxy relay in front of the OSDR API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = config::api::DEFAULT_RELAY_PORT)]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Upstream OSDR API base URL
        #[arg(long, default_value = config::api::OSDR_API_BASE_URL)]
        upstream: String,
    },

    /// Show one OSDR study's metadata and file listing
    Show {
        /// Study accession code (e.g. OSD-48)
        accession: String,

        /// Relay base URL
        #[arg(long, default_value = config::api::DEFAULT_RELAY_URL)]
        relay_url: String,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    match cli.command {
        Commands::Search {
            query,
            source,
            journals,
            snapshot,
            live,
            relay_url,
            year_start,
            year_end,
            pages,
            output,
            interactive,
        } => {
            run_search(SearchArgs {
                query,
                source,
                journals,
                snapshot,
                live,
                relay_url,
                year_start,
                year_end,
                pages,
                output,
                interactive,
            })
            .await
        }
        Commands::Serve {
            port,
            host,
            upstream,
        } => relay::serve(&host, port, &upstream)
            .await
            .context("Relay server error"),
        Commands::Show {
            accession,
            relay_url,
        } => run_show(&accession, &relay_url).await,
    }
}

// ============================================================================
// Search
// ============================================================================

struct SearchArgs {
    query: String,
    source: String,
    journals: PathBuf,
    snapshot: Option<PathBuf>,
    live: bool,
    relay_url: String,
    year_start: Option<i32>,
    year_end: Option<i32>,
    pages: usize,
    output: Option<PathBuf>,
    interactive: bool,
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let source: SourceFilter = args.source.parse()?;

    let client = if args.live {
        Some(OsdrClient::new(&args.relay_url)?)
    } else {
        None
    };

    println!("Loading data from Journals and NASA OSDR...");

    // Both sources load concurrently and independently; a failure on one
    // side contributes zero records without blocking the other.
    let (journal_result, osdr_result) = tokio::join!(
        async { journal::load_file(&args.journals) },
        load_osdr(client.as_ref(), args.snapshot.as_deref()),
    );

    let journal_records = journal_result.unwrap_or_else(|e| {
        error!(error = %e, path = %args.journals.display(), "Failed to load journal CSV");
        Vec::new()
    });
    let osdr_records = osdr_result.unwrap_or_else(|e| {
        error!(error = %e, "Failed to load OSDR data");
        Vec::new()
    });

    let mut state = EngineState::new();
    state.load_batch(merge::merge(vec![journal_records, osdr_records]));
    state.mark_loaded();
    state.apply_inputs(args.query.clone(), source);
    if args.year_start.is_some() || args.year_end.is_some() {
        state.set_year_range(args.year_start, args.year_end);
    }

    let session = Session::new(state);

    print_header(&session);
    let mut shown = print_new_results(&session, 0);

    for _ in 1..args.pages {
        if !session.read(|s| s.show_load_more()) && client.is_none() {
            break;
        }
        session.load_more(client.as_ref()).await?;
        shown = print_new_results(&session, shown);
    }

    if let Some(path) = &args.output {
        let rows: Vec<ExportRow> = session.read(|s| s.visible().iter().map(ExportRow::from).collect());
        save_csv(path, &rows)?;
    }

    if args.interactive {
        run_interactive(session, client).await?;
    }

    Ok(())
}

/// Load OSDR records from the relay (live) or a snapshot file; neither
/// configured means this source contributes nothing.
async fn load_osdr(
    client: Option<&OsdrClient>,
    snapshot: Option<&Path>,
) -> bioknowledge::Result<Vec<NormalizedRecord>> {
    if let Some(client) = client {
        return client.fetch_page(0, config::PAGE_SIZE).await;
    }
    if let Some(path) = snapshot {
        return osdr::load_snapshot(path);
    }
    info!("No OSDR snapshot or relay configured; skipping OSDR source");
    Ok(Vec::new())
}

fn print_header(session: &Session) {
    let (total, query) = session.read(|s| (s.total_results(), s.filters().query.clone()));
    if query.is_empty() {
        println!("\nShowing {} Space Biology records", total);
    } else {
        println!("\nFound {} results for \"{}\"", total, query);
    }
}

/// Print records revealed since the last call; returns the new shown count.
fn print_new_results(session: &Session, shown: usize) -> usize {
    session.read(|s| {
        let visible = s.visible();
        for (idx, record) in visible.iter().enumerate().skip(shown) {
            println!(
                "{:>3}. [{}] {}  {}",
                idx + 1,
                record.source_type,
                if record.publication_date.is_empty() {
                    "----------"
                } else {
                    record.publication_date.as_str()
                },
                record.title,
            );
            println!("     {}", record.document_link);
        }
        if visible.is_empty() && shown == 0 {
            println!("No results found. Try adjusting your filters or search terms.");
        }
        if s.show_load_more() {
            println!("     ... {} more available", s.total_results() - visible.len());
        }
        visible.len()
    })
}

// ============================================================================
// Interactive Mode
// ============================================================================

async fn run_interactive(session: Session, client: Option<OsdrClient>) -> Result<()> {
    println!();
    println!("Interactive mode. Enter a query to search titles, or:");
    println!("  :source all|journal|osdr   switch source filter");
    println!("  :more                      reveal more results");
    println!("  :quit                      exit");

    // Rebuild the session with an observer so debounced recomputes print
    // their results when they land.
    let session = session.into_observed(|state| {
        let total = state.total_results();
        let query = &state.filters().query;
        if query.is_empty() {
            println!("\nShowing {} Space Biology records", total);
        } else {
            println!("\nFound {} results for \"{}\"", total, query);
        }
        for (idx, record) in state.visible().iter().enumerate() {
            println!("{:>3}. [{}] {}", idx + 1, record.source_type, record.title);
        }
        if state.show_load_more() {
            println!("     ... more available, use :more");
        }
    });

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();

        match line {
            ":quit" | ":q" => break,
            ":more" => {
                match session.load_more(client.as_ref()).await {
                    Ok(true) => {
                        let count = session.read(|s| s.visible().len());
                        println!("Now showing {} records", count);
                    }
                    Ok(false) => println!("No more records available."),
                    Err(e) => error!(error = %e, "Load more failed"),
                }
            }
            other if other.starts_with(":source") => {
                match other.trim_start_matches(":source").trim().parse::<SourceFilter>() {
                    Ok(source) => session.set_source(source),
                    Err(e) => println!("{}", e),
                }
            }
            query => session.set_query(query.to_string()),
        }
    }

    Ok(())
}

// ============================================================================
// Show (study details)
// ============================================================================

async fn run_show(accession: &str, relay_url: &str) -> Result<()> {
    let client = OsdrClient::new(relay_url)?;
    let details = details::fetch_details(&client, accession)
        .await
        .with_context(|| format!("Could not load dataset details for {}", accession))?;

    println!("NASA OSDR ID: {}", details.accession);
    println!("{}", details.title);
    if details.authors.is_empty() {
        println!("Authors: N/A");
    } else {
        println!("Authors: {}", details.authors.join(", "));
    }

    println!("\n--- Study Summary ---");
    println!("{}", details.description);

    println!("\n--- Additional Study Parameters ---");
    if details.parameters.is_empty() {
        println!("No additional metadata available.");
    } else {
        for (key, value) in &details.parameters {
            println!("{}: {}", key, value);
        }
    }

    println!("\n--- Associated Files ({}) ---", details.files.len());
    if details.files.is_empty() {
        println!("No files found for this dataset.");
    } else {
        for file in &details.files {
            println!("[{}] {}", file.file_type, file.file_name);
            if !file.url.is_empty() {
                println!("      {}", file.url);
            }
        }
    }

    Ok(())
}

// ============================================================================
// CSV Export
// ============================================================================

/// Flat CSV row; list fields are joined since CSV has no nesting.
#[derive(Debug, Serialize)]
struct ExportRow {
    id: String,
    title: String,
    #[serde(rename = "documentLink")]
    document_link: String,
    #[serde(rename = "publicationDate")]
    publication_date: String,
    #[serde(rename = "sourceType")]
    source_type: String,
    authors: String,
    #[serde(rename = "subjectCategories")]
    subject_categories: String,
    mission: String,
    project_title: String,
}

impl From<&NormalizedRecord> for ExportRow {
    fn from(record: &NormalizedRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            document_link: record.document_link.clone(),
            publication_date: record.publication_date.clone(),
            source_type: record.source_type.to_string(),
            authors: record.authors.join("; "),
            subject_categories: record.subject_categories.join("; "),
            mission: record.mission.clone(),
            project_title: record.project_title.clone(),
        }
    }
}

/// Save rows to a CSV file
fn save_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if rows.is_empty() {
        println!("No data to save to {:?}", path);
        return Ok(());
    }

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(path)
        .context("Failed to create CSV writer")?;

    for row in rows {
        wtr.serialize(row).context("Failed to write CSV record")?;
    }

    wtr.flush().context("Failed to flush CSV")?;
    println!("Saved: {:?}", path);
    Ok(())
}
