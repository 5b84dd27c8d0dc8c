use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::Parser;
use offprint_core::{
    Assembler, AssetPolicy, DEFAULT_API_BASE, DEFAULT_ASSET_PREFIX, FetchConfig, HtmlRenderer, JsonRenderer,
    MarkdownRenderer, OffprintConfig, Renderer,
};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

mod echo;

use echo::{
    format_size, print_banner, print_document_summary, print_error, print_field, print_info, print_step, print_success,
};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for the rendered article
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Html,
    Json,
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "html" => Ok(Self::Html),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(format!("Invalid format: {}. Valid options: html, json, markdown", s)),
        }
    }
}

/// Save a column article, its images and comments as an offline page
#[derive(Parser, Debug)]
#[command(name = "offprint")]
#[command(author = "Offprint Contributors")]
#[command(version)]
#[command(about = "Save a column article as a self-contained offline page", long_about = None)]
struct Args {
    /// Article metadata API URL
    #[arg(value_name = "URL", value_parser = parse_article_url)]
    url: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format (html, json, markdown)
    #[arg(short, long, default_value = "html", value_name = "FORMAT")]
    format: OutputFormat,

    /// Directory images are downloaded to (default: <output dir>/img, or ./out/img)
    #[arg(long, value_name = "DIR")]
    assets_dir: Option<PathBuf>,

    /// Prefix of image references written into the page
    #[arg(long, default_value = DEFAULT_ASSET_PREFIX, value_name = "PREFIX")]
    asset_prefix: String,

    /// Base URL of the content and comment endpoints
    #[arg(long, default_value = DEFAULT_API_BASE, value_name = "URL")]
    api_base: String,

    /// Number of comments to include
    #[arg(long, default_value = "10", value_name = "NUM")]
    comments: usize,

    /// Avatar size token
    #[arg(long, default_value = "xs", value_name = "SIZE")]
    avatar_size: String,

    /// Maximum simultaneous image downloads
    #[arg(long, default_value = "4", value_name = "NUM")]
    concurrency: usize,

    /// Fail when any image cannot be downloaded
    #[arg(long)]
    strict_assets: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn assets_dir(&self) -> PathBuf {
        if let Some(dir) = &self.assets_dir {
            return dir.clone();
        }

        match self.output.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join("img"),
            None => OffprintConfig::default().asset_dir,
        }
    }

    fn config(&self) -> OffprintConfig {
        let mut fetch = FetchConfig { timeout: self.timeout, ..Default::default() };
        if let Some(user_agent) = &self.user_agent {
            fetch.user_agent = user_agent.clone();
        }

        OffprintConfig::builder()
            .api_base(self.api_base.clone())
            .asset_dir(self.assets_dir())
            .asset_prefix(self.asset_prefix.clone())
            .comment_limit(self.comments)
            .avatar_size(self.avatar_size.clone())
            .max_concurrent_downloads(self.concurrency)
            .asset_policy(if self.strict_assets { AssetPolicy::Strict } else { AssetPolicy::Degrade })
            .fetch(fetch)
            .build()
    }

    fn renderer(&self) -> Box<dyn Renderer> {
        match self.format {
            OutputFormat::Html => Box::new(HtmlRenderer::new()),
            OutputFormat::Json => Box::new(JsonRenderer::new().pretty(self.pretty)),
            OutputFormat::Markdown => Box::new(MarkdownRenderer::new()),
        }
    }
}

fn parse_article_url(value: &str) -> Result<String, String> {
    let parsed = url::Url::parse(value).map_err(|e| format!("{e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(value.to_string()),
        other => Err(format!("unsupported scheme `{other}`, expected http or https")),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "offprint=debug,offprint_core=debug" } else { "offprint=warn,offprint_core=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = args.config();

    if args.verbose {
        print_banner();
        print_info(&format!("Images stored in {}", config.asset_dir.display()));
        eprintln!();
        print_step(1, 3, &format!("Assembling {}", args.url.bright_white().underline()));
    }

    let assembler = Assembler::new(config).context("Failed to set up HTTP client")?;
    let document = assembler
        .assemble(&args.url)
        .await
        .with_context(|| format!("Failed to assemble article from {}", args.url))?;

    if args.verbose {
        print_document_summary(&document);
        print_step(2, 3, "Rendering");
    }

    let renderer = args.renderer();
    let output = renderer.render(&document).context("Failed to render article")?;
    tracing::debug!(bytes = output.len(), extension = renderer.extension(), "rendered");

    if args.verbose {
        print_field("Format", &format!("{:?}", args.format));
        print_field("Size", &format_size(output.len()));
        eprintln!();
        print_step(3, 3, "Writing output");
    }

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            fs::write(path, &output).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => {
            print!("{}", String::from_utf8_lossy(&output));
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args).await {
        print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
