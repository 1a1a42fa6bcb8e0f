use clap::Parser;
use serde_json::{Map, Value};
use simba_eth_server::Platform;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "simba-eth-mock", about = "Mock SIMBA platform for local workflow deploys")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value_t = 8787)]
    port: u16,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Require this bearer token on API requests.
    #[arg(long, env = "SIMBA_MOCK_TOKEN")]
    token: Option<String>,

    /// Report deployments and transactions as PENDING this many times.
    #[arg(long, default_value_t = 0)]
    pending_polls: u32,

    /// JSON file mapping contract names to `{"abi": [...], "metadata": {...}}`.
    #[arg(long)]
    designs: Option<PathBuf>,
}

fn load_designs(platform: &Platform, path: &PathBuf) -> Result<usize, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let designs: Map<String, Value> = serde_json::from_str(&content)
        .map_err(|e| format!("invalid designs file {}: {e}", path.display()))?;
    for (name, design) in &designs {
        let abi = design
            .get("abi")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let metadata = design
            .get("metadata")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        platform.register_design(name, abi, metadata);
    }
    Ok(designs.len())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut platform = Platform::new().with_pending_polls(cli.pending_polls);
    if let Some(ref token) = cli.token {
        platform = platform.with_token(token);
    }
    if let Some(ref path) = cli.designs {
        match load_designs(&platform, path) {
            Ok(count) => info!("registered {count} design(s) from {}", path.display()),
            Err(e) => {
                error!("{e}");
                return ExitCode::FAILURE;
            }
        }
    }

    let addr = format!("{}:{}", cli.bind, cli.port);
    info!("starting simba-eth-mock on {addr}");
    if let Err(e) = simba_eth_server::run_server(&platform, &addr) {
        error!("server failed on {addr}: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
