// ABOUTME: CLI binary for the tintuc article extractor.
// ABOUTME: Extracts URLs or a saved HTML file and prints JSON or writes numbered record files.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tintuc::output::{record_to_json, records_to_json};
use tintuc::{ArticleRecord, BatchWriter, Extractor, SiteRegistry};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "tintuc")]
#[command(about = "Extract structured article data from Vietnamese news sites")]
struct Args {
    /// Keep only the first N words of the body (overrides --paragraphs and --random)
    #[arg(short = 'w', long = "word-limit", env = "TINTUC_WORD_LIMIT")]
    word_limit: Option<usize>,

    /// Keep N paragraphs of the body
    #[arg(short = 'p', long = "paragraphs", env = "TINTUC_PARAGRAPHS")]
    paragraphs: Option<usize>,

    /// Take the paragraphs as a contiguous window at a random offset
    #[arg(long = "random")]
    random: bool,

    /// Write numbered <SITE>_<n>.json files into this directory instead of printing
    #[arg(short = 'o', long = "out-dir", env = "TINTUC_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// HTML file to extract (requires --url)
    #[arg(long = "html")]
    html: Option<PathBuf>,

    /// URL the HTML file was saved from (required with --html)
    #[arg(long = "url")]
    url: Option<String>,

    /// JSON site table to use instead of the builtin one
    #[arg(long = "sites", env = "TINTUC_SITES")]
    sites: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout: u64,

    /// Pause before retrying a cookie-challenged page, in milliseconds
    #[arg(long = "challenge-delay-ms", default_value_t = 500)]
    challenge_delay_ms: u64,

    /// Seed for the random paragraph window
    #[arg(long = "seed")]
    seed: Option<u64>,

    /// Print compact JSON instead of pretty
    #[arg(long = "compact")]
    compact: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long = "log-level", default_value = "warn")]
    log_level: String,

    /// URLs to extract
    #[arg()]
    urls: Vec<String>,
}

fn init_logging(default_filter: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn build_extractor(args: &Args) -> Result<Extractor, tintuc::ExtractError> {
    let mut builder = Extractor::builder()
        .timeout(Duration::from_secs(args.timeout))
        .challenge_delay(Duration::from_millis(args.challenge_delay_ms))
        .take_random(args.random);

    if let Some(n) = args.word_limit {
        builder = builder.word_limit(n);
    }
    if let Some(n) = args.paragraphs {
        builder = builder.paragraphs(n);
    }
    if let Some(seed) = args.seed {
        builder = builder.seed(seed);
    }
    if let Some(path) = &args.sites {
        builder = builder.registry(SiteRegistry::from_path(path)?);
    }
    builder.build()
}

/// Single record as an object, several as an array.
fn format_output(records: &[ArticleRecord], compact: bool) -> Result<String, serde_json::Error> {
    match (records, compact) {
        ([record], false) => record_to_json(record),
        ([record], true) => serde_json::to_string(record),
        (_, false) => records_to_json(records),
        (_, true) => serde_json::to_string(records),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    if args.html.is_some() && args.url.is_none() {
        eprintln!("error: --url is required when using --html");
        return ExitCode::from(1);
    }

    if args.html.is_none() && args.urls.is_empty() {
        eprintln!("error: at least one URL is required, or use --html with --url");
        return ExitCode::from(1);
    }

    if args.html.is_some() && !args.urls.is_empty() {
        eprintln!("error: cannot use both --html and positional URLs");
        return ExitCode::from(1);
    }

    init_logging(&args.log_level);

    let mut extractor = match build_extractor(&args) {
        Ok(extractor) => extractor,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::from(1);
        }
    };
    tracing::info!(policy = %extractor.policy(), "starting extraction");

    if let (None, Some(dir)) = (&args.html, &args.out_dir) {
        let mut writer = match BatchWriter::new(dir) {
            Ok(writer) => writer,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::from(1);
            }
        };
        let report = writer.run(&mut extractor, &args.urls);
        for path in &report.written {
            println!("{}", path.display());
        }
        for failure in &report.failures {
            eprintln!(
                "error extracting {} ({}): {}",
                failure.url, failure.code, failure.error
            );
        }
        return if report.is_complete() {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(1)
        };
    }

    let mut records: Vec<ArticleRecord> = Vec::new();
    let mut had_error = false;

    match (&args.html, &args.url) {
        (Some(html_path), Some(url)) => match fs::read_to_string(html_path) {
            Ok(html) => match extractor.extract_html(&html, url) {
                Ok(record) => records.push(record),
                Err(e) => {
                    eprintln!("error extracting {}: {}", html_path.display(), e);
                    had_error = true;
                }
            },
            Err(e) => {
                eprintln!("error reading file {}: {}", html_path.display(), e);
                had_error = true;
            }
        },
        _ => {
            extractor.extract_each(&args.urls, |url, outcome| match outcome {
                Ok(record) => records.push(record),
                Err(e) => {
                    eprintln!("error extracting {} ({}): {}", url, e.code, e);
                    had_error = true;
                }
            });
        }
    }

    if !records.is_empty() {
        if let Some(dir) = &args.out_dir {
            // --html with --out-dir: store the single record under the next number
            let written = BatchWriter::new(dir).and_then(|mut w| w.write(&records[0]));
            match written {
                Ok(path) => println!("{}", path.display()),
                Err(e) => {
                    eprintln!("error: {}", e);
                    had_error = true;
                }
            }
        } else {
            match format_output(&records, args.compact) {
                Ok(out) => println!("{}", out),
                Err(e) => {
                    eprintln!("error serializing output: {}", e);
                    had_error = true;
                }
            }
        }
    }

    if had_error {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
