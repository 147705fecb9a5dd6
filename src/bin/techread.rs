//! Techread CLI binary.
//!
//! Submit technical drawings to the techread service from the command line.
//!
//! # Commands
//!
//! - `read` - Read a drawing and print every message as a JSON line
//! - `callback` - Submit a drawing whose results are posted to a callback URL
//! - `config` - Show the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use futures::StreamExt;
use techread::{
    client::{DEFAULT_HOOK_MAX_PAGES, DEFAULT_MAX_PAGES},
    Ask, AskType, CallbackRequest, Config, ReadRequest, TechreadClient, TechreadError, VERSION,
};

#[derive(Parser)]
#[command(name = "techread")]
#[command(version = VERSION)]
#[command(about = "Techread - Technical drawing analysis client", long_about = None)]
struct Cli {
    /// Config file (default: <config_dir>/techread/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a drawing and stream the results
    Read {
        /// Drawing file
        drawing: PathBuf,

        /// Ask to submit (repeatable), e.g. TITLE_BLOCK or page-thumbnail
        #[arg(short, long = "ask", default_value = "TITLE_BLOCK")]
        asks: Vec<String>,

        /// Optional 3D model file
        #[arg(short, long)]
        model: Option<PathBuf>,

        /// Maximum number of pages to process
        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        max_pages: u32,

        /// Drawing filename reported to the service (default: file name)
        #[arg(long)]
        filename: Option<String>,

        /// Print payloads pretty-printed
        #[arg(long)]
        pretty: bool,
    },

    /// Submit a drawing whose results are posted to a callback URL
    Callback {
        /// Drawing file
        drawing: PathBuf,

        /// Callback URL
        #[arg(short, long)]
        url: String,

        /// Ask to submit (repeatable)
        #[arg(short, long = "ask", default_value = "TITLE_BLOCK")]
        asks: Vec<String>,

        /// Maximum number of pages to process
        #[arg(long, default_value_t = DEFAULT_HOOK_MAX_PAGES)]
        max_pages: u32,
    },

    /// Show the effective configuration (token masked)
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config)?;

    let result = match cli.command {
        Commands::Read {
            drawing,
            asks,
            model,
            max_pages,
            filename,
            pretty,
        } => cmd_read(config, &drawing, &asks, model, max_pages, filename, pretty),

        Commands::Callback {
            drawing,
            url,
            asks,
            max_pages,
        } => cmd_callback(config, &drawing, &asks, url, max_pages),

        Commands::Config => cmd_config(&config),
    };

    if let Err(e) = &result {
        if let Some(error) = e.downcast_ref::<TechreadError>() {
            let (header, body) = error.cli_message();
            eprintln!("{header}");
            eprintln!("{body}");
            eprintln!();
            eprintln!("Details: {error}");
            std::process::exit(1);
        }
    }
    result
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?.merge(Config::from_env()),
        None => Config::load()?,
    };
    Ok(config)
}

fn parse_asks(asks: &[String]) -> Vec<Ask> {
    asks.iter()
        .map(|name| Ask::new(AskType::from_user_input(name)))
        .collect()
}

fn drawing_filename(path: &std::path::Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

fn cmd_read(
    config: Config,
    drawing_path: &std::path::Path,
    asks: &[String],
    model: Option<PathBuf>,
    max_pages: u32,
    filename: Option<String>,
    pretty: bool,
) -> anyhow::Result<()> {
    let drawing = std::fs::read(drawing_path)?;
    let mut request = ReadRequest::new(drawing, parse_asks(asks)).with_max_pages(max_pages);
    if let Some(filename) = filename.or_else(|| drawing_filename(drawing_path)) {
        request = request.with_filename(filename);
    }
    if let Some(model) = model {
        request = request.with_model(std::fs::read(model)?);
    }

    let client = TechreadClient::from_config(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut messages = client.read_drawing(request);
        while let Some(message) = messages.next().await {
            let message = message?;
            let line = if pretty {
                serde_json::to_string_pretty(&message)?
            } else {
                serde_json::to_string(&message)?
            };
            println!("{line}");
        }
        tracing::info!("Session ended in state {:?}", messages.state());
        Ok(())
    })
}

fn cmd_callback(
    config: Config,
    drawing_path: &std::path::Path,
    asks: &[String],
    url: String,
    max_pages: u32,
) -> anyhow::Result<()> {
    let drawing = std::fs::read(drawing_path)?;
    let mut request = CallbackRequest::new(drawing.into(), parse_asks(asks), url);
    request.max_pages = max_pages;
    if let Some(filename) = drawing_filename(drawing_path) {
        request.drawing_filename = filename;
    }

    let client = TechreadClient::from_config(config)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let request_id = runtime.block_on(client.read_drawing_with_callback(request))?;
    println!("{request_id}");
    Ok(())
}

fn cmd_config(config: &Config) -> anyhow::Result<()> {
    println!("Techread v{VERSION}");
    println!();
    println!("Control channel: {}", config.server.wss_endpoint());
    println!("Support service: {}", config.server.https_base());
    println!();
    print!("{}", toml::to_string_pretty(&config.redacted())?);
    Ok(())
}
