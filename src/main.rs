use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use eyre::{Result, WrapErr};
use log::{debug, info};

use ytstudy::llm::LlmClient;
use ytstudy::pipeline::{DEFAULT_STRATEGY_TIMEOUT, Orchestrator};
use ytstudy::server::{self, AppState};
use ytstudy::title::OEmbedTitles;
use ytstudy::youtube::{DEFAULT_BASE_URL, YoutubeClient};

mod cli;

use cli::Cli;

const DEFAULT_BIND: &str = "127.0.0.1:3000";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_LANG: &str = "en";
/// Upper bound for any single upstream HTTP call, LLM generation included
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytstudy.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytstudy")
        .join("logs")
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    let cli = Cli::parse();

    // Load config file (non-fatal if missing/invalid)
    let config = ytstudy::config::Config::load().unwrap_or_else(|e| {
        eprintln!("Ignoring config file: {e:#}");
        ytstudy::config::Config::default()
    });

    // CLI flags take priority over the config file
    let bind = cli.bind.or(config.bind).unwrap_or_else(|| DEFAULT_BIND.to_string());
    let model = cli.model.or(config.model).unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let lang = cli.lang.or(config.lang).unwrap_or_else(|| DEFAULT_LANG.to_string());
    let timeout = cli
        .timeout
        .or(config.strategy_timeout_secs)
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_STRATEGY_TIMEOUT);
    let base_url = cli
        .youtube_base_url
        .or(config.youtube_base_url)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    debug!("bind={bind} model={model} lang={lang} timeout={timeout:?} youtube={base_url}");
    if cli.verbose {
        let config_path = ytstudy::config::config_path();
        if config_path.exists() {
            eprintln!("Config: {}", config_path.display());
        }
        eprintln!("Model: {model}\nLanguage: {lang}\nStrategy timeout: {timeout:?}\nYouTube: {base_url}");
    }

    let addr: SocketAddr = bind.parse().wrap_err_with(|| format!("invalid bind address: {bind}"))?;

    let http = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .wrap_err("failed to build HTTP client")?;
    let generator = Arc::new(LlmClient::from_env(http.clone(), &model)?);
    info!("Using model {}", generator.model());
    let youtube = YoutubeClient::new(http, base_url);

    let orchestrator = Orchestrator::for_youtube(youtube.clone(), &lang, generator.clone()).with_strategy_timeout(timeout);

    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        generator,
        titles: Arc::new(OEmbedTitles::new(youtube).with_timeout(timeout)),
    };

    server::serve(addr, state).await
}
