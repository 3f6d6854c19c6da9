//! epub-model - inspect an EPUB the way a reader would load it

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use epub_model::{Book, LoadOptions, NavNode, NavigationSource, ZipSource};

#[derive(Parser)]
#[command(name = "epub-model")]
#[command(version, about = "Load an EPUB and print its reading model", long_about = None)]
#[command(after_help = "EXAMPLES:
    epub-model book.epub                            Show metadata, spine and contents
    epub-model --json book.epub                     Same, as JSON
    epub-model book.epub -c OEBPS/text/ch1.xhtml    Print one component with resources inlined")]
struct Cli {
    /// Input file (EPUB)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Print one component (archive path) instead of the summary
    #[arg(short, long, value_name = "PATH")]
    component: Option<String>,

    /// Emit the summary as JSON
    #[arg(long)]
    json: bool,

    /// Give up on any single archive read after this many milliseconds
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Log pipeline progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    file: &'a str,
    package: &'a str,
    metadata: Vec<(&'a str, &'a str)>,
    cover: Option<&'a str>,
    navigation: &'static str,
    components: &'a [String],
    contents: Vec<ContentsEntry<'a>>,
    payloads: usize,
}

#[derive(Serialize)]
struct ContentsEntry<'a> {
    title: &'a str,
    path: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<ContentsEntry<'a>>,
}

impl<'a> From<&'a NavNode> for ContentsEntry<'a> {
    fn from(node: &'a NavNode) -> Self {
        Self {
            title: &node.title,
            path: &node.path,
            children: node.children.iter().map(Self::from).collect(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "epub_model=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<(), String> {
    let mut options = LoadOptions::new();
    if let Some(ms) = cli.timeout_ms {
        options = options.with_read_timeout(Duration::from_millis(ms));
    }

    let archive = ZipSource::open(&cli.input).map_err(|e| e.to_string())?;
    let book = Book::from_archive(Arc::new(archive), options)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(path) = &cli.component {
        let text = book.component(path).await.map_err(|e| e.to_string())?;
        println!("{text}");
        return Ok(());
    }

    let summary = summarize(&cli.input, &book);
    if cli.json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| e.to_string())?;
        println!("{json}");
    } else {
        print_summary(&summary);
    }
    Ok(())
}

fn summarize<'a>(file: &'a str, book: &'a Book) -> Summary<'a> {
    let mut metadata: Vec<_> = book.metadata_entries().collect();
    metadata.sort_unstable();

    let navigation = match book.navigation() {
        NavigationSource::Document(_) => "nav",
        NavigationSource::Map(_) => "ncx",
        NavigationSource::None => "none",
    };

    Summary {
        file,
        package: book.package_path(),
        metadata,
        cover: book.cover_image(),
        navigation,
        components: book.components(),
        contents: book.contents().iter().map(ContentsEntry::from).collect(),
        payloads: book.payload_count(),
    }
}

fn print_summary(summary: &Summary<'_>) {
    println!("File: {}", summary.file);
    println!("Package: {}", summary.package);
    for (key, value) in &summary.metadata {
        println!("{key}: {value}");
    }
    if let Some(cover) = summary.cover {
        println!("Cover: {cover}");
    }
    println!("Components: {}", summary.components.len());
    for path in summary.components {
        println!("  {path}");
    }
    println!("Contents ({}):", summary.navigation);
    print_contents(&summary.contents, 1);
    println!("Inlined resources: {}", summary.payloads);
}

fn print_contents(entries: &[ContentsEntry<'_>], depth: usize) {
    for entry in entries {
        println!("{:indent$}{} -> {}", "", entry.title, entry.path, indent = depth * 2);
        print_contents(&entry.children, depth + 1);
    }
}
