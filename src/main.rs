use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bitbot::app::App;
use bitbot::tui::{self, EventHandler, Tui};
use bitbot::{handler, ui, Config, ConversationController, GeminiGateway, ModelOption};

#[derive(Parser)]
#[command(name = "bitbot")]
#[command(version, about = "Chat with BIT BOT from your terminal")]
struct Cli {
    /// Gemini model to start with (overrides the config file)
    #[arg(short, long, value_parser = parse_model)]
    model: Option<ModelOption>,

    /// Path to the JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write logs
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_model(s: &str) -> Result<ModelOption, String> {
    ModelOption::from_id(s).ok_or_else(|| {
        let known: Vec<&str> = ModelOption::all().iter().map(|m| m.id()).collect();
        format!("unknown model '{}' (expected one of: {})", s, known.join(", "))
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match cli.log_file.clone() {
        Some(path) => path,
        None => default_log_path()?,
    };
    init_logging(&log_path, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let model = cli.model.unwrap_or_else(|| config.model());

    let gateway = GeminiGateway::new(config.base_url(), config.api_key())
        .with_system_prompt(Some(config.system_prompt()));
    let controller = ConversationController::new(Arc::new(gateway)).with_model(model);

    info!(model = %model, log = %log_path.display(), "starting bitbot");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let result = run(&mut terminal, App::new(controller), &config).await;
    tui::restore()?;

    result
}

async fn run(terminal: &mut Tui, mut app: App, config: &Config) -> Result<()> {
    // Timers start with the view and stop when `events` is dropped
    let mut events = EventHandler::new(config.tip_interval());

    loop {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(&mut app, event),
            Some(event) = app.controller.next_gateway_event() => app.on_gateway_event(event),
            else => break,
        }

        if app.should_quit {
            break;
        }
    }

    info!(messages = app.controller.messages().len(), "session ended");
    Ok(())
}

fn default_log_path() -> Result<PathBuf> {
    let data_dir = dirs::data_local_dir()
        .ok_or_else(|| anyhow!("Could not determine data directory"))?;
    Ok(data_dir.join("bitbot").join("bitbot.log"))
}

/// Logs go to a file because the TUI owns the terminal.
fn init_logging(path: &Path, verbose: u8) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = match verbose {
        0 => "warn,bitbot=info",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}
