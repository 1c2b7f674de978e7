use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "contract-proxy",
    about = "Read-only contract call proxy for the exercise dashboard"
)]
pub struct Config {
    /// Chain preset (base-sepolia, base, ethereum, arbitrum, optimism, polygon)
    #[arg(long, env = "PROXY_CHAIN", default_value = "base-sepolia")]
    pub chain: String,

    /// RPC endpoint URL, overrides the preset's endpoint
    #[arg(short, long, env = "PROXY_RPC_URL")]
    pub rpc_url: Option<String>,

    /// Address the HTTP server binds to
    #[arg(short, long, env = "PROXY_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Upper bound for a single eth_call, in milliseconds
    #[arg(long, env = "PROXY_CALL_TIMEOUT_MS", default_value = "10000")]
    pub call_timeout_ms: u64,

    /// Exercise registry JSON file (defaults to the user config dir, then the built-in set)
    #[arg(long, env = "PROXY_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Maximum accepted request body size in KiB
    #[arg(long, default_value = "256")]
    pub body_limit_kb: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
