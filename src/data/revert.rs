use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::JsonAbi;
use alloy::primitives::{hex, Bytes, U256};
use alloy::sol_types::{Panic, Revert, SolError};
use serde_json::{json, Value};

use crate::data::codec;
use crate::data::error::ErrorKind;
use crate::utils::format_selector;

/// Why a read-only call reverted, decoded from the node's revert data.
#[derive(Debug, Clone, PartialEq)]
pub enum RevertReason {
    /// `require(cond, "reason")` / `revert("reason")`
    Reason(String),
    /// Compiler-inserted `Panic(uint256)`
    Panic(U256),
    /// A custom error declared in the caller's ABI.
    Custom { name: String, args: Vec<Value> },
    /// Empty data, or a selector nothing above recognises.
    Raw(Bytes),
}

impl RevertReason {
    /// Classify revert data against the errors declared in `abi`.
    pub fn classify(abi: &JsonAbi, data: &[u8]) -> Self {
        if data.len() < 4 {
            return RevertReason::Raw(Bytes::copy_from_slice(data));
        }
        let selector: [u8; 4] = [data[0], data[1], data[2], data[3]];

        if selector == Revert::SELECTOR {
            if let Ok(revert) = Revert::abi_decode(data, false) {
                return RevertReason::Reason(revert.reason);
            }
        } else if selector == Panic::SELECTOR {
            if let Ok(panic) = Panic::abi_decode(data, false) {
                return RevertReason::Panic(panic.code);
            }
        } else if let Some(custom) = decode_custom(abi, selector, &data[4..]) {
            return custom;
        }

        RevertReason::Raw(Bytes::copy_from_slice(data))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RevertReason::Reason(_) | RevertReason::Raw(_) => ErrorKind::Revert,
            RevertReason::Panic(_) => ErrorKind::Panic,
            RevertReason::Custom { .. } => ErrorKind::CustomError,
        }
    }

    pub fn details(&self) -> Option<Value> {
        match self {
            RevertReason::Reason(reason) => Some(json!({ "reason": reason })),
            RevertReason::Panic(code) => Some(json!({
                "code": panic_code(*code),
                "description": panic_description(*code),
            })),
            RevertReason::Custom { name, args } => Some(json!({ "name": name, "args": args })),
            RevertReason::Raw(data) if data.is_empty() => None,
            RevertReason::Raw(data) => {
                let selector = data
                    .get(..4)
                    .and_then(|s| <[u8; 4]>::try_from(s).ok())
                    .map(|s| format_selector(&s));
                Some(json!({ "selector": selector, "data": hex::encode_prefixed(data) }))
            }
        }
    }
}

impl std::fmt::Display for RevertReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RevertReason::Reason(reason) => write!(f, "execution reverted: {reason}"),
            RevertReason::Panic(code) => write!(
                f,
                "execution reverted: Panic({}): {}",
                panic_code(*code),
                panic_description(*code)
            ),
            RevertReason::Custom { name, args } => {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|arg| match arg {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect();
                write!(f, "execution reverted: {name}({})", rendered.join(", "))
            }
            RevertReason::Raw(data) if data.is_empty() => write!(f, "execution reverted"),
            RevertReason::Raw(data) => write!(
                f,
                "execution reverted with unrecognised data {}",
                hex::encode_prefixed(data)
            ),
        }
    }
}

fn decode_custom(abi: &JsonAbi, selector: [u8; 4], body: &[u8]) -> Option<RevertReason> {
    let error = abi.errors().find(|e| e.selector() == selector)?;
    let types = error
        .inputs
        .iter()
        .map(|p| p.resolve())
        .collect::<Result<Vec<DynSolType>, _>>()
        .ok()?;
    let values = match DynSolType::Tuple(types).abi_decode_params(body).ok()? {
        DynSolValue::Tuple(values) => values,
        single => vec![single],
    };
    Some(RevertReason::Custom {
        name: error.name.clone(),
        args: codec::encode_params(&error.inputs, &values),
    })
}

fn panic_code(code: U256) -> String {
    match u64::try_from(code) {
        Ok(small) => format!("{small:#04x}"),
        Err(_) => format!("{code:#x}"),
    }
}

/// Solidity panic codes, see the "Panic via assert and Error via require" docs.
fn panic_description(code: U256) -> &'static str {
    match u64::try_from(code).unwrap_or(u64::MAX) {
        0x00 => "generic compiler panic",
        0x01 => "assertion failed",
        0x11 => "arithmetic overflow or underflow",
        0x12 => "division or modulo by zero",
        0x21 => "invalid enum value",
        0x22 => "corrupted storage byte array",
        0x31 => "pop on empty array",
        0x32 => "array index out of bounds",
        0x41 => "out of memory",
        0x51 => "call to zero-initialized function",
        _ => "unknown panic code",
    }
}
