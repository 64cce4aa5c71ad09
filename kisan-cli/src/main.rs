//! Kisan Mitra command line client

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use kisan_chat::{ChatEngine, SendOutcome};
use kisan_core::config::{Config, ConfigLoader};
use kisan_core::conversation::Role;
use kisan_core::logging::{init_logging, LogTarget};
use kisan_core::render::transform;
use kisan_core::session::{backend_session_id, Session};
use kisan_gateway::{BackendGateway, HttpGateway, TranscriptionService};
use tracing::{info, warn};

mod render;
mod tui;

#[derive(Parser)]
#[command(name = "kisan")]
#[command(about = "Chat with the Kisan Mitra farmer assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration directory
    #[arg(short, long, global = true)]
    config_dir: Option<PathBuf>,

    /// User id to chat as (overrides backend.user_id)
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// Backend base URL (overrides backend.base_url)
    #[arg(long, global = true)]
    backend_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing configuration
        #[arg(short, long)]
        force: bool,
    },
    /// Launch the interactive chat (default)
    Tui,
    /// Send one message and print the reply
    Send {
        /// Message to send
        #[arg(short, long)]
        message: String,
        /// Session title or id; the first listed session when omitted
        #[arg(short, long)]
        session: Option<String>,
    },
    /// List the user's sessions
    Sessions,
    /// Print the history of a session
    History {
        /// Session title or id
        #[arg(short, long)]
        session: String,
        /// Print raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Transcribe an audio file with the voice input service
    Transcribe {
        /// Audio file (wav, mp3, ogg, flac, m4a, webm)
        audio: PathBuf,
    },
    /// Show configuration and backend reachability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_loader = if let Some(dir) = cli.config_dir {
        ConfigLoader::with_dir(dir)
    } else {
        ConfigLoader::new()
    };

    let command = cli.command.unwrap_or(Commands::Tui);
    let mut config = config_loader.load()?;
    if let Some(user) = cli.user {
        config.backend.user_id = user;
    }
    if let Some(url) = cli.backend_url {
        config.backend.base_url = url;
    }
    config.logging.dir = resolve_dir(config_loader.config_dir(), &config.logging.dir)
        .to_string_lossy()
        .to_string();

    let target = match command {
        Commands::Tui => LogTarget::FileOnly,
        _ => LogTarget::Console,
    };
    let _log_guard = init_logging(&config.logging, target);

    match command {
        Commands::Init { force } => run_init(&config_loader, force)?,
        Commands::Tui => {
            info!("Starting TUI as {}", config.backend.user_id);
            let engine = build_engine(&config);
            let stt = Arc::new(TranscriptionService::from_config(&config.voice));
            tui::run_tui(engine, stt).await?;
        }
        Commands::Send { message, session } => {
            info!("Sending one message");
            run_send(config, &message, session).await?;
        }
        Commands::Sessions => run_sessions(&config).await?,
        Commands::History { session, json } => run_history(&config, &session, json).await?,
        Commands::Transcribe { audio } => run_transcribe(&config, &audio).await?,
        Commands::Status => run_status(&config_loader, &config).await?,
    }

    Ok(())
}

/// Resolve a configured directory relative to the config directory
fn resolve_dir(config_dir: &Path, dir: &str) -> PathBuf {
    if let Some(rest) = dir.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    let path = PathBuf::from(dir);
    if path.is_absolute() {
        path
    } else {
        config_dir.join(path)
    }
}

fn build_engine(config: &Config) -> ChatEngine {
    let gateway = Arc::new(HttpGateway::from_config(&config.backend));
    ChatEngine::new(config, gateway)
}

/// Backend id for a session named on the command line
fn session_id_for(user_id: &str, session: &str) -> String {
    if session.starts_with(&format!("{}_", user_id)) {
        session.to_string()
    } else {
        backend_session_id(user_id, session)
    }
}

fn print_message(role: Role, content: &str) {
    match role {
        Role::Human => {
            println!("{} {}", style("you:").cyan().bold(), content);
        }
        Role::Bot => {
            println!("{}", style("kisan mitra:").green().bold());
            println!("{}", transform(content).to_plain_text());
        }
    }
}

fn run_init(loader: &ConfigLoader, force: bool) -> Result<()> {
    let path = loader.config_dir().join("config.json");
    if path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            style("!").yellow(),
            path.display()
        );
        return Ok(());
    }

    loader.save(&Config::default())?;
    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("Set GROQ_API_KEY or voice.api_key to enable voice input.");
    Ok(())
}

async fn run_send(mut config: Config, message: &str, session: Option<String>) -> Result<()> {
    config.reveal.enabled = false;
    let engine = build_engine(&config);
    let sessions = engine.init().await;

    if let Some(wanted) = session {
        let id = session_id_for(engine.user_id(), &wanted);
        if !sessions.iter().any(|s| s.id == id) {
            bail!("Unknown session '{}'; run `kisan sessions` to list them", wanted);
        }
        engine.select(&id).await?;
    }

    let outcome = engine.send(message).await;
    let snapshot = engine.snapshot();
    match outcome {
        SendOutcome::Replied | SendOutcome::FellBack => {
            if let Some(reply) = snapshot.messages.last() {
                print_message(reply.role, &reply.content);
            }
            if outcome == SendOutcome::FellBack {
                warn!("Backend did not answer; showing the fallback reply");
            }
            if let Some(active) = snapshot.active() {
                println!("{}", style(format!("session: {}", active.title)).dim());
            }
            Ok(())
        }
        SendOutcome::Ignored => bail!("Nothing to send"),
        SendOutcome::Busy | SendOutcome::Discarded => {
            bail!("Message was not delivered: {:?}", outcome)
        }
    }
}

async fn run_sessions(config: &Config) -> Result<()> {
    let engine = build_engine(config);
    let sessions = engine.init().await;

    println!(
        "{}",
        style(format!("Sessions of {}", engine.user_id())).bold().cyan()
    );
    for (i, session) in sessions.iter().enumerate() {
        let marker = if session.is_active { "*" } else { " " };
        println!(
            "{} {:>2}. {}  {}",
            marker,
            i + 1,
            session.title,
            style(&session.id).dim()
        );
    }
    Ok(())
}

async fn run_history(config: &Config, session: &str, json: bool) -> Result<()> {
    let user_id = &config.backend.user_id;
    let gateway = HttpGateway::from_config(&config.backend);
    let id = session_id_for(user_id, session);

    let messages = gateway.fetch_history(&id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&messages)?);
        return Ok(());
    }

    let session = Session::from_backend_id(user_id, &id);
    println!("{}", style(&session.title).bold().cyan());
    if messages.is_empty() {
        println!("{}", style("(no messages)").dim());
    }
    for message in &messages {
        print_message(message.role, &message.content);
        println!();
    }
    Ok(())
}

async fn run_transcribe(config: &Config, audio: &Path) -> Result<()> {
    let service = TranscriptionService::from_config(&config.voice);
    if !service.is_configured() {
        bail!(kisan_chat::VOICE_UNSUPPORTED_NOTICE);
    }
    let text = service.transcribe_file(audio).await?;
    println!("{}", text);
    Ok(())
}

/// Show system status
async fn run_status(loader: &ConfigLoader, config: &Config) -> Result<()> {
    println!("{}", style("Kisan Mitra Status").bold().cyan());
    println!("Version: {}\n", env!("CARGO_PKG_VERSION"));

    println!("{}", style("Configuration:").bold());
    println!("  Config directory: {}", loader.config_dir().display());
    println!("  Log directory: {}", config.logging.dir);
    println!("  User: {}", config.backend.user_id);
    let reveal = if config.reveal.enabled {
        format!("{} ms per token", config.reveal.base_delay_ms)
    } else {
        "off".to_string()
    };
    println!("  Typing reveal: {}", reveal);
    println!();

    println!("{}", style("Services:").bold());
    let gateway = HttpGateway::from_config(&config.backend);
    let backend = match gateway.list_sessions(&config.backend.user_id).await {
        Ok(ids) => style(format!("reachable ({} sessions)", ids.len())).green(),
        Err(e) => {
            warn!("Backend check failed: {}", e);
            style("unreachable".to_string()).red()
        }
    };
    println!("  Backend {}: {}", gateway.base_url(), backend);

    let voice = if TranscriptionService::from_config(&config.voice).is_configured() {
        style(format!("configured ({})", config.voice.model)).green()
    } else {
        style("not configured".to_string()).dim()
    };
    println!("  Voice input: {}", voice);

    Ok(())
}
