use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use search_cli::{build_index, render_json, render_stats, render_text};
use search_core::persist;
use search_core::{query_with, IndexFormat, QueryMode};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "search_engine", version)]
#[command(about = "Index plain-text files and run ranked TF-IDF queries", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index every .txt file under a folder
    Index {
        /// Folder to scan recursively
        folder: PathBuf,
        /// Index file to write
        index_file: PathBuf,
        /// On-disk format
        #[arg(long, value_enum, default_value_t = StoredFormat::Text)]
        format: StoredFormat,
        /// Tokenizer threads (defaults to available parallelism)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Run a ranked query against an index file
    Query {
        /// Index file to read
        index_file: PathBuf,
        /// Query words; uppercase AND / OR combine them
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
        #[arg(long, value_enum, default_value_t = Output::Json)]
        output: Output,
        /// Lowercase-only term splitting without operators
        #[arg(long, default_value_t = false)]
        legacy: bool,
    },
    /// Print document, term, posting and length statistics of an index file
    Stats {
        index_file: PathBuf,
        /// Also list the term count of every document
        #[arg(long, default_value_t = false)]
        docs: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StoredFormat {
    Text,
    Bincode,
}

impl From<StoredFormat> for IndexFormat {
    fn from(f: StoredFormat) -> Self {
        match f {
            StoredFormat::Text => IndexFormat::Text,
            StoredFormat::Bincode => IndexFormat::Bincode,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    Json,
    Text,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    match cli.command {
        Commands::Index { folder, index_file, format, workers } => {
            let workers = workers.unwrap_or_else(default_workers);
            let run = build_index(&folder, workers)?;
            persist::save(&run.index, &index_file, format.into())
                .with_context(|| format!("writing index to {}", index_file.display()))?;
            if run.skipped > 0 {
                eprintln!("Skipped {} unreadable of {} files", run.skipped, run.discovered);
            }
            println!("Indexed {} documents to {}", run.index.doc_count(), index_file.display());
        }
        Commands::Query { index_file, query, output, legacy } => {
            let (index, report) = persist::load(&index_file)?;
            if report.skipped_documents + report.skipped_postings > 0 {
                tracing::warn!(
                    skipped_documents = report.skipped_documents,
                    skipped_postings = report.skipped_postings,
                    "index file contained malformed entries"
                );
            }
            let q = query.join(" ");
            let mode = if legacy { QueryMode::Legacy } else { QueryMode::Standard };
            let outcome = query_with(&index, &q, mode);
            match output {
                Output::Json => println!("{}", render_json(&q, &outcome)?),
                Output::Text => print!("{}", render_text(&outcome)),
            }
        }
        Commands::Stats { index_file, docs } => {
            let (index, report) = persist::load(&index_file)?;
            print!("{}", render_stats(&index, &report, docs));
        }
    }
    Ok(())
}

fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}
