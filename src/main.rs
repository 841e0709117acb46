//! Breathing Effort Server CLI
//!
//! Streaming respiratory-effort estimation from BVP samples.

use anyhow::Context;
use breathing_effort_server::{
    config::Config,
    core::{ModeRegistry, WarmupRamp},
    recording::SessionStore,
    replay::{replay, BvpRecording},
    server::{self, ServerConfig},
    VERSION,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "effort-server")]
#[command(version = VERSION)]
#[command(about = "Streaming breathing-effort estimation from BVP samples", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the websocket server
    Serve {
        /// Address to bind to
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Calculator assigned to new sessions
        #[arg(long)]
        mode: Option<String>,

        /// Analysis window length in seconds
        #[arg(long)]
        window_seconds: Option<u32>,

        /// BVP sampling rate in Hz
        #[arg(long)]
        sample_rate: Option<u32>,

        /// Directory for session recordings
        #[arg(long)]
        save_path: Option<PathBuf>,

        /// Count whole chunks (not half) towards the window during warm-up
        #[arg(long)]
        full_warmup: bool,
    },

    /// List the available effort calculators
    Modes,

    /// List recorded sessions
    Sessions {
        /// Directory holding session recordings
        #[arg(long)]
        save_path: Option<PathBuf>,
    },

    /// Print a recorded session as JSON
    Show {
        /// Session id (see `sessions`)
        id: String,

        /// Directory holding session recordings
        #[arg(long)]
        save_path: Option<PathBuf>,
    },

    /// Stream a recorded BVP file to a running server
    Replay {
        /// BVP.csv file, or a recording directory containing one
        path: PathBuf,

        /// Server URL
        #[arg(long, default_value = "ws://127.0.0.1:5000")]
        url: String,

        /// Calculator to switch the server to before streaming
        #[arg(long, default_value = "EffortDerivative")]
        mode: String,

        /// Samples per data frame
        #[arg(long, default_value = "32")]
        chunk_size: usize,
    },

    /// Show configuration
    Config {
        /// Persist the effective configuration to the configuration file
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve {
            bind,
            mode,
            window_seconds,
            sample_rate,
            save_path,
            full_warmup,
        } => {
            let mut config = load_config();
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(mode) = mode {
                config.default_mode = mode;
            }
            if let Some(window_seconds) = window_seconds {
                config.window_seconds = window_seconds;
            }
            if let Some(sample_rate) = sample_rate {
                config.sample_rate = sample_rate;
            }
            if let Some(save_path) = save_path {
                config.save_path = save_path;
            }
            if full_warmup {
                config.warmup = WarmupRamp::Full;
            }
            cmd_serve(config).await
        }
        Commands::Modes => {
            cmd_modes();
            Ok(())
        }
        Commands::Sessions { save_path } => cmd_sessions(save_path),
        Commands::Show { id, save_path } => cmd_show(&id, save_path),
        Commands::Replay {
            path,
            url,
            mode,
            chunk_size,
        } => cmd_replay(&path, &url, &mode, chunk_size).await,
        Commands::Config { write } => cmd_config(write),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load_config() -> Config {
    Config::load().unwrap_or_else(|e| {
        eprintln!("Warning: Could not load configuration, using defaults: {e}");
        Config::default()
    })
}

fn store_for(save_path: Option<PathBuf>) -> SessionStore {
    SessionStore::new(save_path.unwrap_or_else(|| load_config().save_path))
}

async fn cmd_serve(config: Config) -> anyhow::Result<()> {
    let registry = ModeRegistry::with_defaults();
    let server_config = ServerConfig::from_config(&config, &registry)?;
    config
        .ensure_directories()
        .context("creating the session directory")?;

    println!("Breathing Effort Server v{VERSION}");
    println!(
        "  Window: {}s at {} Hz ({} samples)",
        config.window_seconds, config.sample_rate, server_config.capacity
    );
    println!("  Default mode: {}", server_config.default_mode);
    println!("  Recordings: {}", config.save_path.display());
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let handle = server::run(server_config, registry).await?;

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .context("installing the Ctrl+C handler")?;

    stop_rx.recv().await;
    println!();
    println!("Shutting down...");
    handle.shutdown().await;
    Ok(())
}

fn cmd_modes() {
    for name in ModeRegistry::with_defaults().names() {
        println!("{name}");
    }
}

fn cmd_sessions(save_path: Option<PathBuf>) -> anyhow::Result<()> {
    let store = store_for(save_path);
    let sessions = store.list()?;
    if sessions.is_empty() {
        println!("No sessions recorded in {}", store.root().display());
    }
    for id in sessions {
        println!("{id}");
    }
    Ok(())
}

fn cmd_show(id: &str, save_path: Option<PathBuf>) -> anyhow::Result<()> {
    let session = store_for(save_path).open(id)?;
    println!("{}", serde_json::to_string(&session)?);
    Ok(())
}

async fn cmd_replay(
    path: &std::path::Path,
    url: &str,
    mode: &str,
    chunk_size: usize,
) -> anyhow::Result<()> {
    // The server only answers a bad mode with an error frame, which a
    // one-way replay never reads.
    if !ModeRegistry::with_defaults().contains(mode) {
        anyhow::bail!("unknown mode: {mode} (see `effort-server modes`)");
    }

    let recording = BvpRecording::load(path)
        .with_context(|| format!("reading recording {}", path.display()))?;
    println!(
        "Replaying {} samples at {} Hz in chunks of {}",
        recording.samples.len(),
        recording.sample_rate,
        chunk_size
    );

    let sent = replay(url, &recording, mode, chunk_size).await?;
    println!("Sent {sent} chunks");
    Ok(())
}

fn cmd_config(write: bool) -> anyhow::Result<()> {
    let config = load_config();
    println!("Configuration file: {}", Config::config_path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);

    if write {
        config.validate(&ModeRegistry::with_defaults())?;
        let path = config.save()?;
        println!();
        println!("Configuration written to {}", path.display());
    }
    Ok(())
}
