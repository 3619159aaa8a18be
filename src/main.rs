//! Binary entrypoint for the meshgate CLI.
//!
//! Commands:
//! - `start [--port <path>]` - run the gateway event loop
//! - `init` - create a starter `config.toml`
//! - `status` - print a brief summary of the persistent tables
//!
//! Platform and radio adapters plug into the library's transport seams; this
//! binary wires in a logging chat transport so the gateway can be exercised
//! without a live platform connection.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{info, warn};

use meshgate::chat::{self, LoggingChatTransport};
use meshgate::config::Config;
use meshgate::gateway::GatewayServer;
use meshgate::storage::Storage;

#[derive(Parser)]
#[command(name = "meshgate")]
#[command(about = "A chat-platform gateway for Meshtastic mesh networks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Start {
        /// Meshtastic device port (e.g., /dev/ttyUSB0); overrides the config
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Initialize a new gateway configuration
    Init,
    /// Show gateway status and table statistics
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Start { port } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting meshgate v{}", env!("CARGO_PKG_VERSION"));

            let configured_port = config.mesh.port.clone();
            let require_device = config.mesh.require_device_at_startup;
            let mut server = GatewayServer::new(config, Box::new(LoggingChatTransport)).await?;

            // CLI port overrides config; the radio driver itself is an
            // external adapter attached via GatewayServer::attach_mesh.
            let chosen_port = port.or_else(|| {
                if configured_port.is_empty() {
                    None
                } else {
                    Some(configured_port)
                }
            });
            match chosen_port {
                Some(port_path) if require_device => {
                    anyhow::bail!(
                        "no radio driver attached for {} and require_device_at_startup is set",
                        port_path
                    );
                }
                Some(port_path) => {
                    warn!(
                        "no radio driver attached for {}; mesh operations will report the radio as unavailable",
                        port_path
                    );
                }
                None => info!("no device port configured; starting without a radio"),
            }

            let (_chat_tx, chat_rx) = chat::event_channel();
            server.attach_chat_events(chat_rx);

            info!("gateway server starting...");
            server.run().await?;
        }
        Commands::Init => {
            info!("Initializing new gateway configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);

            let cfg = Config::default();
            Storage::new(&cfg.storage.data_dir).await?;
            info!("Data directory created at {}", cfg.storage.data_dir);
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let storage = Storage::new(&config.storage.data_dir).await?;
            let nodes = storage.load_nodes().await?;
            let owners = storage.load_owners().await?;
            let alerts = storage.load_alerts().await?;
            let messages = storage.load_messages().await?;
            println!("Gateway: {}", config.gateway.name);
            println!("Registered nodes: {}", nodes.len());
            println!("Claimed nodes:    {}", owners.len());
            println!("Scheduled alerts: {}", alerts.len());
            println!("Logged messages:  {}", messages.len());
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Base level from CLI verbosity overrides config
    let base_level = match verbosity {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    if let Some(file) = config.as_ref().and_then(|cfg| cfg.logging.file.clone()) {
        if let Ok(f) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&file)
        {
            let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
            // If stdout is a TTY, mirror log lines to the console as well
            let is_tty = atty::is(atty::Stream::Stdout);

            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = write_mutex.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
            let _ = builder.try_init();
            return;
        }
    }
    builder.format(|fmt, record| {
        writeln!(
            fmt,
            "{} [{}] {}",
            chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            record.level(),
            record.args()
        )
    });
    let _ = builder.try_init();
}
