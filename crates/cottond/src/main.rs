use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use cotton_core::{init_tracing, level_for};
use cottond::{CollectorConfig, StoreKind};

#[derive(Parser)]
#[command(name = "cottond")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Cotton Doctor collector: stores advisory records and serves the history", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "COTTON_BIND", default_value = cottond::config::DEFAULT_BIND)]
    bind: SocketAddr,

    /// History backend
    #[arg(long, env = "COTTON_STORE", value_enum, default_value_t = StoreKind::Memory)]
    store: StoreKind,

    /// Directory for the durable history (surreal backend)
    #[arg(long, env = "COTTON_DATA_DIR", default_value = cottond::config::DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json, level_for(args.verbose));

    tracing::info!(version = cotton_core::VERSION, "cottond starting");

    cottond::run(CollectorConfig {
        bind: args.bind,
        store: args.store,
        data_dir: args.data_dir,
    })
    .await
}
