use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zurto::server::{self, DEFAULT_BODY, DEFAULT_HOST, DEFAULT_PORT, PassThrough, ServerConfig};

#[derive(Parser)]
#[command(name = "zurto", version, about = "Zurto state utilities")]
struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP glue server
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Interface to bind
        #[arg(long, default_value = DEFAULT_HOST)]
        host: String,
        /// Fixed response body
        #[arg(long, default_value = DEFAULT_BODY)]
        body: String,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Serve { port, host, body } => {
            let config = ServerConfig { host, port, body };
            info!(version = env!("CARGO_PKG_VERSION"), "starting zurto");
            server::serve(&config, PassThrough)
        }
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("zurto={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
