use alloy::primitives::{Address, Bytes};
use alloy::providers::{Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::transports::TransportError;
use async_trait::async_trait;
use color_eyre::eyre::Result;
use thiserror::Error;

/// How an `eth_call` failed before any ABI decoding happened.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallFailure {
    /// The node executed the call and it reverted; carries the raw revert data.
    #[error("execution reverted")]
    Reverted(Bytes),
    #[error("{0}")]
    Transport(String),
}

/// Read-only access to a chain. Implemented by [`EthProvider`] and by
/// in-memory callers in tests.
#[async_trait]
pub trait ContractCaller: Send + Sync {
    /// Chain ID the caller is bound to.
    fn chain_id(&self) -> u64;

    /// Execute `eth_call` against `to` with the given calldata at the latest block.
    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, CallFailure>;

    /// Latest block number, used for health reporting.
    async fn latest_block_number(&self) -> Result<u64, CallFailure>;
}

/// The concrete provider type returned by `ProviderBuilder::new().on_http(url)`.
/// We use a trait-object-based wrapper to avoid spelling out the full generic type.
pub struct EthProvider {
    provider: Box<dyn Provider + Send + Sync>,
    chain_id: u64,
}

impl EthProvider {
    /// Connect to an Ethereum node via HTTP RPC.
    pub async fn connect(rpc_url: &str) -> Result<Self> {
        let url = rpc_url.parse()?;
        let provider = ProviderBuilder::new().on_http(url);
        let chain_id = provider.get_chain_id().await?;
        Ok(Self {
            provider: Box::new(provider),
            chain_id,
        })
    }
}

#[async_trait]
impl ContractCaller for EthProvider {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, CallFailure> {
        let tx = TransactionRequest::default().to(to).input(input.into());
        self.provider.call(tx).await.map_err(classify_rpc_error)
    }

    async fn latest_block_number(&self) -> Result<u64, CallFailure> {
        self.provider
            .get_block_number()
            .await
            .map_err(classify_rpc_error)
    }
}

/// Separate reverts (the node answered with an error payload carrying revert
/// data) from everything else the transport can fail with.
fn classify_rpc_error(err: TransportError) -> CallFailure {
    if let Some(payload) = err.as_error_resp() {
        if let Some(data) = payload.as_revert_data() {
            return CallFailure::Reverted(data);
        }
        // Some nodes report a bare revert with no data attached.
        if payload.message.contains("execution reverted") {
            return CallFailure::Reverted(Bytes::new());
        }
    }
    CallFailure::Transport(err.to_string())
}
