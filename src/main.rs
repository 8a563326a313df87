//! dicomtree - find DICOM images on disk and organize them by patient.
//!
//! Usage:
//!   dicomtree scan <PATHS>...     Stream the DICOM images found under the paths
//!   dicomtree ls <PATHS>...       List one level of folders and files
//!   dicomtree tree <PATHS>...     Show the patient/study/series/instance tree
//!   dicomtree export <PATHS>...   Export the tree as a JSON snapshot
//!   dicomtree serve               Serve the HTTP API
//!   dicomtree --help              Show help

use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tracing_subscriber::EnvFilter;

use dicomtree_core::{DicomRecord, ScanConfig};
use dicomtree_hierarchy::{DisplayNode, Hierarchy, Slot};
use dicomtree_scan::{DicomScanner, DirectoryWalker, ScanProgress};
use dicomtree_server::ServerConfig;

#[derive(Parser)]
#[command(
    name = "dicomtree",
    version,
    about = "Find DICOM images and organize them by patient, study and series",
    long_about = "dicomtree walks directories, keeps the DICOM files that carry \
                  image data and folds them into a patient/study/series tree.\n\n\
                  Set RUST_LOG=debug to see every directory and skipped file."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream every DICOM image found under the paths
    Scan {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Request a deep scan (traversal is always fully recursive)
        #[arg(long)]
        deep: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// List folders and files without recursing
    Ls {
        /// Files or directories to list
        #[arg(default_value = ".")]
        paths: Vec<PathBuf>,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Scan and print the patient/study/series/instance tree
    Tree {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Expand every node (default: patients only)
        #[arg(short, long)]
        expand: bool,
    },

    /// Scan and export the tree as a JSON snapshot
    Export {
        /// Files or directories to scan
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Store every node as expanded
        #[arg(short, long)]
        expand: bool,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(short, long, default_value = "127.0.0.1:3000")]
        addr: SocketAddr,

        /// Records buffered per scan before waiting on the client
        #[arg(long, default_value = "64")]
        capacity: usize,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan {
            paths,
            deep,
            format,
        } => run_scan(&paths, deep, format).await?,
        Command::Ls { paths, format } => run_ls(&paths, format).await?,
        Command::Tree { paths, expand } => run_tree(&paths, expand).await?,
        Command::Export {
            paths,
            output,
            expand,
        } => run_export(&paths, output, expand).await?,
        Command::Serve { addr, capacity } => run_serve(addr, capacity).await?,
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Canonicalize user paths so `.` and relative roots get real base names.
fn canonicalize_all(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    paths
        .iter()
        .map(|path| {
            path.canonicalize()
                .with_context(|| format!("Invalid path: {}", path.display()))
        })
        .collect()
}

fn scan_config(paths: &[PathBuf], deep: bool) -> Result<ScanConfig> {
    ScanConfig::builder()
        .roots(canonicalize_all(paths)?)
        .deep(deep)
        .build()
        .context("Invalid scan configuration")
}

/// Scan and hand each record to `on_record` as soon as it arrives.
async fn stream_records(
    config: ScanConfig,
    mut on_record: impl FnMut(DicomRecord) -> Result<()>,
) -> Result<ScanProgress> {
    let scanner = DicomScanner::new();
    let mut stream = scanner.scan(config).context("Scan failed")?;
    while let Some(record) = stream.recv().await {
        on_record(record)?;
    }
    stream.finish().await.context("Scan failed")
}

fn print_summary(progress: &ScanProgress) {
    eprintln!(
        "{} image(s) in {} file(s), {} skipped, {} unreadable ({:.2}s)",
        progress.records_emitted,
        progress.files_visited,
        progress.files_excluded,
        progress.files_failed,
        progress.elapsed.as_secs_f64()
    );
}

/// Stream records to stdout.
async fn run_scan(paths: &[PathBuf], deep: bool, format: OutputFormat) -> Result<()> {
    let config = scan_config(paths, deep)?;
    let mut stdout = std::io::stdout().lock();

    let progress = stream_records(config, |record| {
        match format {
            OutputFormat::Text => writeln!(
                stdout,
                "{}\t{}\t{}\t{}",
                record.path,
                record.tags.patient_name.as_deref().unwrap_or("-"),
                record.tags.series_instance_uid.as_deref().unwrap_or("-"),
                record
                    .tags
                    .instance_number
                    .map_or_else(|| "-".to_string(), |n| n.to_string()),
            )?,
            // One object per line keeps the output streaming.
            OutputFormat::Json => writeln!(stdout, "{}", serde_json::to_string(&record)?)?,
        }
        Ok(())
    })
    .await?;

    print_summary(&progress);
    Ok(())
}

/// List one level of entries for each path.
async fn run_ls(paths: &[PathBuf], format: OutputFormat) -> Result<()> {
    let paths = canonicalize_all(paths)?;
    let listing = tokio::task::spawn_blocking(move || DirectoryWalker::new().list(&paths))
        .await
        .context("Listing failed")?;

    match format {
        OutputFormat::Text => {
            for folder in &listing.folders {
                println!("{:>10}  {}/", "", folder.path);
            }
            for file in &listing.files {
                println!("{:>10}  {}", format_size(file.size), file.path);
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&listing)?);
        }
    }

    Ok(())
}

async fn build_hierarchy(paths: &[PathBuf]) -> Result<Hierarchy> {
    let config = scan_config(paths, false)?;
    let mut hierarchy = Hierarchy::new();
    let progress = stream_records(config, |record| {
        hierarchy.insert(&record);
        Ok(())
    })
    .await?;
    print_summary(&progress);
    Ok(hierarchy)
}

/// Print the flattened tree.
async fn run_tree(paths: &[PathBuf], expand: bool) -> Result<()> {
    let mut hierarchy = build_hierarchy(paths).await?;
    if expand {
        hierarchy.expand_all();
    }

    for row in hierarchy.flatten() {
        println!("{}", format_row(&row));
    }
    Ok(())
}

/// Export the tree snapshot as JSON.
async fn run_export(paths: &[PathBuf], output: Option<PathBuf>, expand: bool) -> Result<()> {
    let mut hierarchy = build_hierarchy(paths).await?;
    if expand {
        hierarchy.expand_all();
    }
    // Fill in the cached row positions before writing.
    hierarchy.flatten();

    match output {
        Some(output_path) => {
            hierarchy
                .save(&output_path)
                .context("Failed to write snapshot")?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", hierarchy.to_json()?);
        }
    }

    Ok(())
}

async fn run_serve(addr: SocketAddr, capacity: usize) -> Result<()> {
    let config = ServerConfig::builder()
        .addr(addr)
        .channel_capacity(capacity)
        .build()
        .context("Invalid server configuration")?;

    eprintln!("Serving on http://{addr} (Ctrl-C to stop)");
    dicomtree_server::serve(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
    .context("Server failed")
}

/// One tree row: indentation, fold marker, name and instance details.
fn format_row(row: &DisplayNode) -> String {
    let indent = "  ".repeat(usize::from(row.level.saturating_sub(1)));
    let marker = match row.expanded {
        Some(true) => "▼ ",
        Some(false) => "▶ ",
        None => "  ",
    };
    match row.slot {
        Slot::Instance => format!(
            "{indent}{marker}{:<40} {:>6}  {}",
            truncate(&row.name, 40),
            row.number.map_or_else(String::new, |n| format!("#{n}")),
            row.path.as_deref().map(file_dir).unwrap_or_default()
        ),
        _ => format!("{indent}{marker}{}", row.name),
    }
}

fn file_dir(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 1).collect();
        format!("{kept}…")
    }
}
