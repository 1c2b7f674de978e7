mod config;
mod data;
mod server;
mod utils;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::data::provider::{ContractCaller, EthProvider};
use crate::data::registry::ExerciseRegistry;
use crate::data::ContractCallService;
use crate::server::AppState;

fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);
    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let config = Config::parse();
    init_logging(&config);

    let (preset, rpc_url) =
        data::chains::resolve_endpoint(&config.chain, config.rpc_url.as_deref()).map_err(|e| eyre!(e))?;

    let (registry, source) = ExerciseRegistry::resolve(config.registry.as_deref())?;
    tracing::info!(
        target: "contract-proxy",
        exercises = registry.len(),
        %source,
        "exercise registry loaded"
    );
    if registry.is_empty() {
        tracing::warn!(target: "contract-proxy", "exercise registry is empty");
    }

    tracing::info!(target: "contract-proxy", "connecting to {rpc_url}");
    let provider = EthProvider::connect(&rpc_url).await?;
    let chain_id = provider.chain_id();
    match &preset {
        Some(preset) if preset.chain_id != chain_id => tracing::warn!(
            target: "contract-proxy",
            expected = preset.chain_id,
            actual = chain_id,
            "node chain ID does not match the {} preset",
            preset.name
        ),
        _ => tracing::info!(target: "contract-proxy", chain_id, "connected"),
    }

    let service = ContractCallService::new(
        Arc::new(provider),
        Duration::from_millis(config.call_timeout_ms),
    );
    let state = AppState {
        service: Arc::new(service),
        registry: Arc::new(registry),
    };
    let app = server::router(state, config.body_limit_kb * 1024);

    server::serve(config.listen, app).await
}
