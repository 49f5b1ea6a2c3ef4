use anyhow::{Context, Result};
use clap::Parser;
use rwhois_server::{RwhoisServer, ServerConfig};
use rwhois_store::{loader, Store};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// In-memory RWhois v1.5 directory server
#[derive(Parser)]
#[command(name = "rwhoisd")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Interface address to bind (all interfaces when unset)
    #[arg(short, long)]
    address: Option<String>,

    /// Hostname to advertise in the banner
    #[arg(long)]
    hostname: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Schema file (lines of `attr = N|C|A|R`)
    #[arg(value_name = "SCHEMA_FILE")]
    schema: PathBuf,

    /// Data files (attr:value records separated by `---` lines)
    #[arg(value_name = "DATA_FILE", required = true)]
    data: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(address) = cli.address {
        config.server_address = address;
    }
    if cli.hostname.is_some() {
        config.server_hostname = cli.hostname;
    }
    if cli.verbose {
        config.verbose = true;
    }

    init_logging(config.verbose);

    let mut store = Store::new();
    loader::load_schema(&mut store, &cli.schema)
        .with_context(|| format!("loading schema {}", cli.schema.display()))?;
    for path in &cli.data {
        loader::load_data(&mut store, path)
            .with_context(|| format!("loading data {}", path.display()))?;
    }
    store.index_data();
    tracing::info!(
        "serving {} objects in {} authority areas ({} classes)",
        store.object_count(),
        store.auth_areas().count(),
        store.classes().count()
    );

    let server = RwhoisServer::new(Arc::new(store), config);
    server.run().await?;
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}
