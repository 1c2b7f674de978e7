pub mod chains;
pub mod codec;
pub mod error;
pub mod provider;
pub mod registry;
pub mod revert;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use alloy::dyn_abi::{FunctionExt, JsonAbiExt};
use alloy::json_abi::{Function, JsonAbi, StateMutability};
use serde_json::Value;

use crate::data::error::InvocationError;
use crate::data::provider::{CallFailure, ContractCaller};
use crate::data::registry::ExerciseRegistry;
use crate::data::revert::RevertReason;
use crate::data::types::*;
use crate::utils::truncate_address;

/// Stateless read-only contract invocation over a shared [`ContractCaller`].
pub struct ContractCallService {
    caller: Arc<dyn ContractCaller>,
    call_timeout: Duration,
}

impl ContractCallService {
    pub fn new(caller: Arc<dyn ContractCaller>, call_timeout: Duration) -> Self {
        Self {
            caller,
            call_timeout,
        }
    }

    pub fn chain_id(&self) -> u64 {
        self.caller.chain_id()
    }

    pub async fn latest_block_number(&self) -> Result<u64, CallFailure> {
        self.caller.latest_block_number().await
    }

    /// Handle a raw `(address, abi, functionName, args)` request.
    ///
    /// Never fails: every error is reported inside the returned result.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let result = match request.into_call() {
            Ok(call) => self.execute(&call).await,
            Err(err) => Err(err),
        };
        self.finish(result)
    }

    /// Handle a call against an exercise from the registry.
    pub async fn invoke_exercise(
        &self,
        registry: &ExerciseRegistry,
        id: &str,
        request: ExerciseCallRequest,
    ) -> InvocationResult {
        let result = match registry.get(id) {
            Some(exercise) => {
                let call = ContractCall {
                    address: exercise.address,
                    abi: Arc::clone(&exercise.abi),
                    function_name: request.function_name,
                    args: request.args,
                };
                self.execute(&call).await
            }
            None => Err(InvocationError::UnknownExercise(id.to_string())),
        };
        self.finish(result)
    }

    /// Encode, call, decode. Exactly one `eth_call` is issued per invocation.
    pub async fn execute(&self, call: &ContractCall) -> Result<Value, InvocationError> {
        let function = select_function(&call.abi, &call.function_name, call.args.len())?;
        let values = codec::coerce_args(&function.inputs, &call.args)?;
        let input = function
            .abi_encode_input(&values)
            .map_err(|e| InvocationError::Encoding {
                function: function.name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            target: "contract-proxy",
            address = %truncate_address(&call.address),
            function = %function.signature(),
            "eth_call"
        );

        let output =
            match tokio::time::timeout(self.call_timeout, self.caller.call(call.address, input.into()))
                .await
            {
                Err(_) => return Err(InvocationError::Timeout(self.call_timeout)),
                Ok(Err(CallFailure::Reverted(data))) => {
                    return Err(InvocationError::Reverted(RevertReason::classify(
                        &call.abi, &data,
                    )));
                }
                Ok(Err(CallFailure::Transport(message))) => {
                    return Err(InvocationError::Transport(message));
                }
                Ok(Ok(output)) => output,
            };

        if output.is_empty() && !function.outputs.is_empty() {
            return Err(InvocationError::Decoding {
                function: function.name.clone(),
                reason: format!("empty return data, is there a contract at {}?", call.address),
            });
        }

        let decoded =
            function
                .abi_decode_output(&output, false)
                .map_err(|e| InvocationError::Decoding {
                    function: function.name.clone(),
                    reason: e.to_string(),
                })?;

        Ok(codec::encode_outputs(&function.outputs, &decoded))
    }

    fn finish(&self, result: Result<Value, InvocationError>) -> InvocationResult {
        if let Err(err) = &result {
            tracing::warn!(target: "contract-proxy", kind = %err.kind(), "contract call failed: {err}");
        }
        result.into()
    }
}

/// Pick the read-only overload of `name` whose arity matches the argument count.
///
/// Arity is checked across every overload first, so a call that only fits a
/// state-changing overload is reported as such rather than as a count mismatch.
fn select_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    arity: usize,
) -> Result<&'a Function, InvocationError> {
    let overloads = abi
        .function(name)
        .ok_or_else(|| InvocationError::FunctionNotFound(name.to_string()))?;

    let is_read_only = |f: &Function| {
        matches!(
            f.state_mutability,
            StateMutability::View | StateMutability::Pure
        )
    };

    let Some(first_read_only) = overloads.iter().find(|f| is_read_only(f)) else {
        return Err(InvocationError::NotReadOnly(name.to_string()));
    };

    let mut matching = overloads.iter().filter(|f| f.inputs.len() == arity).peekable();
    if matching.peek().is_none() {
        return Err(InvocationError::ArgumentCount {
            function: name.to_string(),
            expected: first_read_only.inputs.len(),
            actual: arity,
        });
    }

    matching
        .find(|f| is_read_only(f))
        .ok_or_else(|| InvocationError::NotReadOnly(name.to_string()))
}
