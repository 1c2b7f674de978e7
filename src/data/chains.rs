use crate::data::types::ChainConfig;

/// Get a chain configuration preset by name.
pub fn get_chain_config(name: &str) -> Option<ChainConfig> {
    match name.to_lowercase().as_str() {
        "base-sepolia" | "base_sepolia" | "basesepolia" => Some(ChainConfig {
            name: "Base Sepolia".to_string(),
            chain_id: 84532,
            rpc_url: "https://sepolia.base.org".to_string(),
        }),
        "base" => Some(ChainConfig {
            name: "Base".to_string(),
            chain_id: 8453,
            rpc_url: "https://mainnet.base.org".to_string(),
        }),
        "ethereum" | "eth" | "mainnet" => Some(ChainConfig {
            name: "Ethereum".to_string(),
            chain_id: 1,
            rpc_url: "https://eth.merkle.io".to_string(),
        }),
        "arbitrum" | "arb" => Some(ChainConfig {
            name: "Arbitrum One".to_string(),
            chain_id: 42161,
            rpc_url: "https://arb1.arbitrum.io/rpc".to_string(),
        }),
        "optimism" | "op" => Some(ChainConfig {
            name: "Optimism".to_string(),
            chain_id: 10,
            rpc_url: "https://mainnet.optimism.io".to_string(),
        }),
        "polygon" | "matic" => Some(ChainConfig {
            name: "Polygon".to_string(),
            chain_id: 137,
            rpc_url: "https://polygon-rpc.com".to_string(),
        }),
        _ => None,
    }
}

/// Return a list of all supported chain names.
pub fn supported_chains() -> Vec<&'static str> {
    vec!["base-sepolia", "base", "ethereum", "arbitrum", "optimism", "polygon"]
}

/// Resolve the chain preset and effective RPC URL from the command line.
///
/// An explicit `rpc_url` wins; the preset is still returned so the caller can
/// check the node's chain ID against it. Unknown presets are only an error
/// when no URL was given.
pub fn resolve_endpoint(
    chain: &str,
    rpc_url: Option<&str>,
) -> Result<(Option<ChainConfig>, String), String> {
    let preset = get_chain_config(chain);
    match (rpc_url, &preset) {
        (Some(url), _) => Ok((preset, url.to_string())),
        (None, Some(config)) => {
            let url = config.rpc_url.clone();
            Ok((preset, url))
        }
        (None, None) => Err(format!(
            "unknown chain '{chain}' (supported: {}); pass --rpc-url for custom networks",
            supported_chains().join(", ")
        )),
    }
}
