use std::sync::Arc;

use alloy::json_abi::JsonAbi;
use alloy::primitives::Address;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::data::error::InvocationError;
use crate::utils::parse_address;

#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
}

/// Body of `POST /api/contract-call`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    pub address: String,
    pub abi: Value,
    pub function_name: String,
    pub args: Vec<Value>,
}

impl InvocationRequest {
    /// Validate the address and parse the ABI into a callable description.
    pub fn into_call(self) -> Result<ContractCall, InvocationError> {
        let address = parse_address(&self.address).ok_or_else(|| {
            InvocationError::MalformedRequest(format!(
                "`address` must be a 0x-prefixed 40 hex character string, got {:?}",
                self.address
            ))
        })?;
        let abi: JsonAbi = serde_json::from_value(self.abi).map_err(|e| {
            InvocationError::MalformedRequest(format!("`abi` is not a valid ABI: {e}"))
        })?;
        Ok(ContractCall {
            address,
            abi: Arc::new(abi),
            function_name: self.function_name,
            args: self.args,
        })
    }
}

/// Body of `POST /api/exercises/:id/call`; address and ABI come from the registry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCallRequest {
    pub function_name: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// A validated read-only call, ready for argument coercion.
#[derive(Debug, Clone)]
pub struct ContractCall {
    pub address: Address,
    pub abi: Arc<JsonAbi>,
    pub function_name: String,
    pub args: Vec<Value>,
}

/// Outcome of a single invocation.
///
/// Serializes to `{ "success": true, "result": .. }` or
/// `{ "success": false, "error": .., "kind": .., "details"?: .. }`.
#[derive(Debug)]
pub enum InvocationResult {
    Success(Value),
    Failure(InvocationError),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }
}

impl From<Result<Value, InvocationError>> for InvocationResult {
    fn from(result: Result<Value, InvocationError>) -> Self {
        match result {
            Ok(value) => InvocationResult::Success(value),
            Err(err) => InvocationResult::Failure(err),
        }
    }
}

impl Serialize for InvocationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InvocationResult::Success(value) => {
                let mut state = serializer.serialize_struct("InvocationResult", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("result", value)?;
                state.end()
            }
            InvocationResult::Failure(err) => {
                let details = err.details();
                let len = if details.is_some() { 4 } else { 3 };
                let mut state = serializer.serialize_struct("InvocationResult", len)?;
                state.serialize_field("success", &false)?;
                state.serialize_field("error", &err.to_string())?;
                state.serialize_field("kind", &err.kind())?;
                if let Some(details) = details {
                    state.serialize_field("details", &details)?;
                }
                state.end()
            }
        }
    }
}
