//! CLI binary for docs-to-site.
//!
//! A thin shim over the library crate that maps CLI flags to `RunConfig`
//! and prints the run summary.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docs_to_site::{
    formats, run, Category, ConversionProgressCallback, DefaultEngine, Handler, ImageToolMode,
    ProgressCallback, RunConfig, RunReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar plus one log line per finished document. Documents
/// finish out of order when several workers run at once.
struct CliProgressCallback {
    bar: ProgressBar,
    problems: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Looking for documents…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            problems: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {total_documents} documents…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, path: &Path) {
        self.bar.set_message(path.display().to_string());
    }

    fn on_document_complete(&self, _index: usize, _total: usize, path: &Path, markdown_len: usize) {
        self.bar.println(format!(
            "  {} {:<48}  {}",
            green("✓"),
            path.display(),
            dim(&format!("{markdown_len:>7} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_document_skipped(&self, _index: usize, _total: usize, path: &Path, reason: &str) {
        self.problems.fetch_add(1, Ordering::Relaxed);
        self.bar.println(format!(
            "  {} {:<48}  {}",
            yellow("–"),
            path.display(),
            dim(reason)
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, _index: usize, _total: usize, path: &Path, error: &str) {
        self.problems.fetch_add(1, Ordering::Relaxed);
        self.bar
            .println(format!("  {} {:<48}  {}", red("✗"), path.display(), red(error)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_documents: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let mark = if self.problems.load(Ordering::Relaxed) == 0 {
            green("✔")
        } else {
            cyan("⚠")
        };
        eprintln!(
            "{} {}/{} documents converted",
            mark,
            bold(&success_count.to_string()),
            total_documents
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a shared folder into ./site, then preview it
  docs2site convert ~/shared/handbook ./site --title "Team Handbook"
  cd site && mkdocs serve

  # Keep the theme and extensions from an existing mkdocs.yml
  docs2site convert docs-in/ site/ --config mkdocs.base.yml

  # Machine-readable summary
  docs2site convert docs-in/ site/ --json > report.json

  # What can be converted on this machine?
  docs2site formats
  docs2site check

EXTERNAL TOOLS:
  markitdown   Office, PDF, HTML, audio and archive formats
               pip install 'markitdown[all]'
  ImageMagick  WMF/EMF/EPS/PICT images embedded in documents

ENVIRONMENT VARIABLES:
  DOCS2SITE_MARKITDOWN   Path to the markitdown executable
  DOCS2SITE_MAGICK       Path to the ImageMagick executable
  RUST_LOG               Log filter (overrides -v / -q)
"#;

/// Convert a folder of documents into an MkDocs site.
#[derive(Parser, Debug)]
#[command(
    name = "docs2site",
    version,
    about = "Convert a folder of documents into an MkDocs site",
    long_about = "Convert every supported document under a folder (Word, PowerPoint, Excel, PDF, \
images, audio, HTML, CSV/JSON/XML, ZIP) into Markdown pages with extracted images, and write an \
mkdocs.yml whose navigation mirrors the folder structure.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert INPUT into a site at OUTPUT.
    Convert(ConvertArgs),
    /// List recognised file extensions by category.
    Formats,
    /// Report whether markitdown and ImageMagick are available.
    Check,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Folder containing the source documents.
    input: PathBuf,

    /// Folder to write `docs/` and `mkdocs.yml` into.
    output: PathBuf,

    /// Existing mkdocs.yml whose settings are kept (nav is regenerated).
    #[arg(short, long, env = "DOCS2SITE_CONFIG")]
    config: Option<PathBuf>,

    /// Site title (`site_name`).
    #[arg(long, env = "DOCS2SITE_TITLE")]
    title: Option<String>,

    /// Documents converted at once. Defaults to the number of CPUs.
    #[arg(short = 'j', long, env = "DOCS2SITE_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Do not use ImageMagick; legacy images are dropped.
    #[arg(long, env = "DOCS2SITE_NO_IMAGE_TOOL")]
    no_image_tool: bool,

    /// Write engine output without Markdown cleanup.
    #[arg(long, env = "DOCS2SITE_NO_POSTPROCESS")]
    no_postprocess: bool,

    /// Print the run report as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable the progress bar.
    #[arg(long, env = "DOCS2SITE_NO_PROGRESS")]
    no_progress: bool,

    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Errors only.
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Convert(args) => convert(args).await,
        Command::Formats => {
            init_logging("warn");
            print_formats();
            Ok(())
        }
        Command::Check => {
            init_logging("warn");
            print_check();
            Ok(())
        }
    }
}

fn init_logging(filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();
}

async fn convert(args: ConvertArgs) -> Result<()> {
    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; warnings still come through.
    let show_progress = !args.quiet && !args.no_progress && !args.json;
    let filter = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    init_logging(filter);

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let config = build_config(&args, progress)?;

    let report = run(&args.input, &args.output, &config)
        .await
        .with_context(|| {
            format!(
                "Failed to build a site from '{}' into '{}'",
                args.input.display(),
                args.output.display()
            )
        })?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise report")?;
        println!("{json}");
    } else if !args.quiet {
        print_summary(&report);
    }

    Ok(())
}

/// Map CLI args to `RunConfig`.
fn build_config(args: &ConvertArgs, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let mut builder = RunConfig::builder().postprocess(!args.no_postprocess);

    if let Some(n) = args.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(ref title) = args.title {
        builder = builder.site_title(title.clone());
    }
    if let Some(ref path) = args.config {
        builder = builder.site_config(path.clone());
    }
    if args.no_image_tool {
        builder = builder.image_tool(ImageToolMode::Disabled);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_summary(report: &RunReport) {
    eprintln!(
        "Converted {} of {} documents in {}ms  {}",
        bold(&report.succeeded.to_string()),
        report.total(),
        report.duration_ms,
        dim(&format!(
            "({} images, {} repeated, {} dropped)",
            report.assets_written, report.assets_shared, report.assets_dropped
        ))
    );
    if !report.skipped.is_empty() {
        eprintln!("{}", yellow(&format!("Skipped ({}):", report.skipped.len())));
        for issue in &report.skipped {
            eprintln!("  {}  {}", issue.path.display(), dim(&issue.reason));
        }
    }
    if report.has_failures() {
        eprintln!("{}", red(&format!("Failed ({}):", report.failed.len())));
        for issue in &report.failed {
            eprintln!("  {}  {}", issue.path.display(), issue.reason);
        }
    }
    eprintln!(
        "{} {} ({} pages in navigation)",
        cyan("◆"),
        report.site_config.display(),
        report.pages_in_nav
    );
}

fn print_formats() {
    for category in Category::ALL {
        let extensions: Vec<String> = formats::all()
            .iter()
            .filter(|f| f.category == category)
            .map(|f| match f.handler() {
                Handler::External => f.extension.to_string(),
                _ => format!("{}*", f.extension),
            })
            .collect();
        println!("{:<14} {}", bold(category.label()), extensions.join(" "));
    }
    println!();
    println!("{}", dim("* converted in-process; others need markitdown"));
    if !DefaultEngine::detect().has_external() {
        println!(
            "{}",
            yellow("markitdown was not found: formats without * will be skipped")
        );
    }
}

fn print_check() {
    for tool in [&tool_probe::MARKITDOWN, &tool_probe::IMAGEMAGICK] {
        match tool_probe::locate(tool) {
            Ok(location) => {
                let version = location
                    .version()
                    .unwrap_or_else(|e| dim(&format!("version unknown: {e}")));
                let origin = match location.source {
                    tool_probe::Source::Override => format!(" (from {})", tool.env_var),
                    tool_probe::Source::Path => String::new(),
                };
                println!(
                    "{} {:<12} {}{}  {}",
                    green("✓"),
                    tool.name,
                    location.path.display(),
                    origin,
                    dim(&version)
                );
            }
            Err(e) => println!("{} {:<12} {}", red("✗"), tool.name, e),
        }
    }
}
