use clap::{ArgAction, Parser};
use console::style;
use img_webp::{
    collect_jobs, create_output_folder, downloads_dir, error_log_path, ConversionOptions, ErrorLog,
    HttpFetcher, OutcomeAggregator, WebpCodec, WorkerPool,
};
use shared_utils::logging::{init_logging, LogConfig};
use shared_utils::progress::PROGRESS_CHANNEL_CAPACITY;
use shared_utils::{
    create_progress_bar, print_simple_summary, print_summary_report, spawn_progress_reporter,
    OutcomeCounters,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::Level;

const USAGE: &str = r#"
WebP CLI Converter
------------------
Convert PNG/JPEG images to WebP format quickly and efficiently.

Usage:
  img-webp --dir <folder> [options]
  img-webp --urls <url1,url2,...> [options]

Options:
  --dir         Path to folder containing images
  --urls        Comma-separated URLs to images
  --quality     Quality (1-100, default 80)
  --workers     Number of concurrent workers (default 8, capped at 512)
  --lossless    Use lossless compression (good for PNGs)
  --recursive   Scan all subdirectories (when using --dir)
  --output      Parent folder for the webp-<timestamp> output (default: Downloads)
  --verbose     Log to stderr and print a detailed summary
  --help        Show this help message
"#;

#[derive(Parser)]
#[command(name = "img-webp")]
#[command(version, about = "Concurrent PNG/JPEG to WebP batch converter", long_about = None)]
#[command(disable_help_flag = true)]
struct Cli {
    /// Path to local directory containing images
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Comma-separated list of image URLs
    #[arg(long, value_name = "URLS")]
    urls: Option<String>,

    /// Image quality (1-100)
    #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Number of concurrent workers (clamped to 1..=512)
    #[arg(long, default_value_t = 8, allow_negative_numbers = true)]
    workers: i64,

    /// Use lossless compression (better for PNGs)
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value_t = false, default_missing_value = "true")]
    lossless: bool,

    /// Scan all subdirectories when using --dir
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value_t = false, default_missing_value = "true")]
    recursive: bool,

    /// Parent folder for the timestamped output folder
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    /// Show usage
    #[arg(long, action = ArgAction::Set, num_args = 0..=1, require_equals = true,
          default_value_t = false, default_missing_value = "true")]
    help: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let _ = init_logging(
        "img_webp",
        LogConfig::default().with_level(level).with_console(cli.verbose),
    );

    let dir = cli.dir.clone().filter(|d| !d.as_os_str().is_empty());
    let urls = cli.urls.clone().filter(|u| !u.is_empty());

    if cli.help || (dir.is_none() && urls.is_none()) {
        println!("{}", USAGE);
        return Ok(());
    }

    if let Err(e) = run(&cli, dir, urls) {
        tracing::error!(error = %e, "Run aborted");
        eprintln!("{} {:#}", style("❌").red(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn run(cli: &Cli, dir: Option<PathBuf>, urls: Option<String>) -> anyhow::Result<()> {
    let options = ConversionOptions {
        quality: cli.quality,
        lossless: cli.lossless,
    };

    let jobs = collect_jobs(dir.as_deref(), cli.recursive, urls.as_deref())?;
    if jobs.is_empty() {
        println!("No valid images found.");
        return Ok(());
    }

    let parent = cli.output.clone().unwrap_or_else(downloads_dir);
    let output_dir = create_output_folder(&parent)?;
    let aggregator = OutcomeAggregator::new(ErrorLog::create(&error_log_path(&output_dir))?);

    let codec = WebpCodec;
    let fetcher = HttpFetcher::new()?;
    let pool = WorkerPool::new(&codec, &fetcher, &output_dir, options, cli.workers);

    if cli.verbose {
        eprintln!(
            "🔧 {} worker(s), quality {}, lossless {}",
            pool.workers(),
            options.quality,
            if options.lossless { "forced" } else { "PNG only" }
        );
    }

    println!("Found {} image(s). Starting concurrent conversion...", jobs.len());

    let start = Instant::now();
    let bar = create_progress_bar(jobs.len() as u64, "Converting", false);
    let (reporter, progress) = spawn_progress_reporter(bar, PROGRESS_CHANNEL_CAPACITY);

    let summary = pool.run(jobs, &aggregator, progress)?;
    reporter.finish();
    tracing::info!(
        total = summary.total(),
        converted = summary.converted,
        failed = summary.failed,
        "Run finished"
    );

    let counters = OutcomeCounters {
        converted: summary.converted,
        failed: summary.failed,
    };
    if cli.verbose {
        print_summary_report(&counters, start.elapsed(), "WebP Conversion");
    }
    print_simple_summary(&counters, &summary.output_dir, &aggregator.error_log_path());

    Ok(())
}
