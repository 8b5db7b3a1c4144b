use anyhow::Context;
use clap::Parser;
use listling::{Config, StoreKind};

/// Collaborative list server.
#[derive(Parser, Debug)]
#[command(name = "listling", version)]
struct Args {
    /// Port to listen on, overrides RUST_PORT
    #[arg(long)]
    port: Option<u16>,

    /// Redis URL, overrides REDIS_URL
    #[arg(long)]
    redis_url: Option<String>,

    /// Keep everything in memory instead of Redis
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load().context("loading configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(redis_url) = args.redis_url {
        config.redis_url = redis_url;
    }
    if args.memory {
        config.store = StoreKind::Memory;
    }

    listling::start_server(config)
        .await
        .context("running server")?;
    Ok(())
}
