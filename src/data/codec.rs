//! Conversion between JSON values and ABI values.
//!
//! Integers never cross the JSON boundary as numbers wider than 64 bits:
//! arguments may carry them as decimal strings, and results always carry
//! them as decimal strings.

use alloy::dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy::json_abi::Param;
use alloy::primitives::{hex, FixedBytes, Sign, I256, U256};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::utils::parse_address;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid argument `{path}` ({ty}): {reason}")]
pub struct CoerceError {
    pub path: String,
    pub ty: String,
    pub reason: String,
}

/// Returns true if `s` is a non-empty run of ASCII decimal digits.
pub fn is_decimal_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Coerce positional JSON arguments into ABI values for the given inputs.
///
/// Callers check that `args` and `inputs` have the same length; extra
/// entries on either side are ignored.
pub fn coerce_args(inputs: &[Param], args: &[Value]) -> Result<Vec<DynSolValue>, CoerceError> {
    inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            let path = if param.name.is_empty() {
                format!("args[{i}]")
            } else {
                param.name.clone()
            };
            let ty: DynSolType = param.resolve().map_err(|e| CoerceError {
                path: path.clone(),
                ty: param.ty.clone(),
                reason: e.to_string(),
            })?;
            coerce_value(arg, &ty, &param.components, &path)
        })
        .collect()
}

fn coerce_value(
    value: &Value,
    ty: &DynSolType,
    components: &[Param],
    path: &str,
) -> Result<DynSolValue, CoerceError> {
    let fail = |reason: String| CoerceError {
        path: path.to_string(),
        ty: ty.sol_type_name().into_owned(),
        reason,
    };

    match ty {
        DynSolType::Bool => match value {
            Value::Bool(b) => Ok(DynSolValue::Bool(*b)),
            Value::String(s) if s == "true" => Ok(DynSolValue::Bool(true)),
            Value::String(s) if s == "false" => Ok(DynSolValue::Bool(false)),
            other => Err(fail(format!("expected a boolean, got {other}"))),
        },
        DynSolType::Uint(bits) => parse_uint(value, *bits)
            .map(|u| DynSolValue::Uint(u, *bits))
            .map_err(fail),
        DynSolType::Int(bits) => parse_int(value, *bits)
            .map(|i| DynSolValue::Int(i, *bits))
            .map_err(fail),
        DynSolType::Address => match value {
            Value::String(s) => parse_address(s)
                .map(DynSolValue::Address)
                .ok_or_else(|| fail(format!("{s:?} is not a 0x-prefixed 20-byte address"))),
            other => Err(fail(format!("expected an address string, got {other}"))),
        },
        DynSolType::String => match value {
            Value::String(s) => Ok(DynSolValue::String(s.clone())),
            other => Err(fail(format!("expected a string, got {other}"))),
        },
        DynSolType::Bytes => parse_hex(value).map(DynSolValue::Bytes).map_err(fail),
        DynSolType::FixedBytes(size) => {
            let bytes = parse_hex(value).map_err(&fail)?;
            if bytes.len() != *size {
                return Err(fail(format!("expected {size} bytes, got {}", bytes.len())));
            }
            Ok(DynSolValue::FixedBytes(
                FixedBytes::<32>::right_padding_from(&bytes),
                *size,
            ))
        }
        DynSolType::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| fail(format!("expected an array, got {value}")))?;
            coerce_items(items, inner, components, path).map(DynSolValue::Array)
        }
        DynSolType::FixedArray(inner, len) => {
            let items = value
                .as_array()
                .ok_or_else(|| fail(format!("expected an array, got {value}")))?;
            if items.len() != *len {
                return Err(fail(format!("expected {len} elements, got {}", items.len())));
            }
            coerce_items(items, inner, components, path).map(DynSolValue::FixedArray)
        }
        DynSolType::Tuple(types) => coerce_tuple(value, types, components, path).map_err(|e| {
            // Tuple errors from nested members already carry their own path.
            if e.path.is_empty() { fail(e.reason) } else { e }
        }),
        DynSolType::Function => Err(fail("function-typed arguments are not supported".into())),
        #[allow(unreachable_patterns)]
        other => Err(fail(format!("unsupported type {}", other.sol_type_name()))),
    }
}

fn coerce_items(
    items: &[Value],
    inner: &DynSolType,
    components: &[Param],
    path: &str,
) -> Result<Vec<DynSolValue>, CoerceError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| coerce_value(item, inner, components, &format!("{path}[{i}]")))
        .collect()
}

/// Tuples accept either an object keyed by component name or a positional array.
fn coerce_tuple(
    value: &Value,
    types: &[DynSolType],
    components: &[Param],
    path: &str,
) -> Result<DynSolValue, CoerceError> {
    let shape_error = |reason: String| CoerceError {
        path: String::new(),
        ty: String::new(),
        reason,
    };
    let name_of = |i: usize| components.get(i).map(|c| c.name.as_str()).unwrap_or("");

    let fields: Vec<&Value> = match value {
        Value::Array(items) => {
            if items.len() != types.len() {
                return Err(shape_error(format!(
                    "expected {} tuple members, got {}",
                    types.len(),
                    items.len()
                )));
            }
            items.iter().collect()
        }
        Value::Object(map) => (0..types.len())
            .map(|i| {
                let key = match name_of(i) {
                    "" => i.to_string(),
                    name => name.to_string(),
                };
                map.get(&key)
                    .ok_or_else(|| shape_error(format!("missing tuple member `{key}`")))
            })
            .collect::<Result<_, _>>()?,
        other => {
            return Err(shape_error(format!(
                "expected an object or array for a tuple, got {other}"
            )));
        }
    };

    types
        .iter()
        .zip(fields)
        .enumerate()
        .map(|(i, (ty, field))| {
            let child_path = match name_of(i) {
                "" => format!("{path}[{i}]"),
                name => format!("{path}.{name}"),
            };
            let child_components = components
                .get(i)
                .map(|c| c.components.as_slice())
                .unwrap_or(&[]);
            coerce_value(field, ty, child_components, &child_path)
        })
        .collect::<Result<Vec<_>, _>>()
        .map(DynSolValue::Tuple)
}

fn parse_uint(value: &Value, bits: usize) -> Result<U256, String> {
    let parsed = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => U256::from(v),
            None if n.is_i64() => return Err(format!("negative value {n} for unsigned type")),
            None => {
                return Err(format!(
                    "{n} is not an exact integer; send wide integers as decimal strings"
                ));
            }
        },
        Value::String(s) => parse_magnitude(s)?,
        other => return Err(format!("expected an integer or decimal string, got {other}")),
    };

    if parsed.bit_len() > bits {
        return Err(format!("{parsed} does not fit in uint{bits}"));
    }
    Ok(parsed)
}

/// Parse an unsigned decimal or `0x` hex integer. Separators and empty digit runs are rejected.
fn parse_magnitude(s: &str) -> Result<U256, String> {
    if let Some(digits) = s.strip_prefix("0x") {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("{s:?} is not a hex integer"));
        }
        U256::from_str_radix(digits, 16).map_err(|e| format!("invalid hex integer {s:?}: {e}"))
    } else if is_decimal_digits(s) {
        U256::from_str_radix(s, 10).map_err(|e| format!("invalid decimal integer {s:?}: {e}"))
    } else {
        Err(format!("{s:?} is not a decimal integer"))
    }
}

fn parse_int(value: &Value, bits: usize) -> Result<I256, String> {
    let (sign, magnitude) = match value {
        Value::Number(n) => match (n.as_u64(), n.as_i64()) {
            (Some(v), _) => (Sign::Positive, U256::from(v)),
            (None, Some(v)) => (Sign::Negative, U256::from(v.unsigned_abs())),
            (None, None) => {
                return Err(format!(
                    "{n} is not an exact integer; send wide integers as decimal strings"
                ));
            }
        },
        Value::String(s) => match s.strip_prefix('-') {
            Some(rest) => (Sign::Negative, parse_magnitude(rest)?),
            None => (Sign::Positive, parse_magnitude(s)?),
        },
        other => return Err(format!("expected an integer or decimal string, got {other}")),
    };

    // Two's complement range: -2^(bits-1) ..= 2^(bits-1) - 1
    let limit = U256::from(1u8) << (bits - 1);
    let out_of_range = match sign {
        Sign::Negative => magnitude > limit,
        Sign::Positive => magnitude >= limit,
    };
    let render = || match sign {
        Sign::Negative => format!("-{magnitude}"),
        Sign::Positive => magnitude.to_string(),
    };
    if out_of_range {
        return Err(format!("{} does not fit in int{bits}", render()));
    }
    I256::checked_from_sign_and_abs(sign, magnitude)
        .ok_or_else(|| format!("{} does not fit in int{bits}", render()))
}

fn parse_hex(value: &Value) -> Result<Vec<u8>, String> {
    let s = value
        .as_str()
        .ok_or_else(|| format!("expected a 0x-prefixed hex string, got {value}"))?;
    let digits = s
        .strip_prefix("0x")
        .ok_or_else(|| format!("{s:?} is missing the 0x prefix"))?;
    hex::decode(digits).map_err(|e| format!("invalid hex {s:?}: {e}"))
}

/// Encode decoded return values the way a single JSON response carries them:
/// nothing becomes `null`, one value is returned bare, several become an array.
pub fn encode_outputs(outputs: &[Param], values: &[DynSolValue]) -> Value {
    match values {
        [] => Value::Null,
        [single] => encode_value(single, components_of(outputs, 0)),
        many => Value::Array(encode_params(outputs, many)),
    }
}

/// Encode a positional list of values described by `params`.
pub fn encode_params(params: &[Param], values: &[DynSolValue]) -> Vec<Value> {
    values
        .iter()
        .enumerate()
        .map(|(i, value)| encode_value(value, components_of(params, i)))
        .collect()
}

/// Encode one ABI value into JSON without loss of precision.
///
/// `components` names the members when `value` is a tuple, or an array of
/// tuples. A tuple becomes an object only when every member is named.
pub fn encode_value(value: &DynSolValue, components: &[Param]) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::FixedBytes(word, size) => Value::String(hex::encode_prefixed(&word[..*size])),
        DynSolValue::Address(a) => Value::String(a.to_checksum(None)),
        DynSolValue::Function(f) => Value::String(hex::encode_prefixed(f)),
        DynSolValue::Bytes(b) => Value::String(hex::encode_prefixed(b)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => Value::Array(
            items
                .iter()
                .map(|item| encode_value(item, components))
                .collect(),
        ),
        DynSolValue::Tuple(fields) => {
            let named = components.len() == fields.len()
                && components.iter().all(|c| !c.name.is_empty());
            if named && !fields.is_empty() {
                let map: Map<String, Value> = components
                    .iter()
                    .zip(fields)
                    .map(|(c, field)| (c.name.clone(), encode_value(field, &c.components)))
                    .collect();
                Value::Object(map)
            } else {
                Value::Array(encode_params(components, fields))
            }
        }
        #[allow(unreachable_patterns)]
        other => other
            .as_fixed_seq()
            .map(|items| Value::Array(encode_params(components, items)))
            .unwrap_or(Value::Null),
    }
}

fn components_of(params: &[Param], index: usize) -> &[Param] {
    params
        .get(index)
        .map(|p| p.components.as_slice())
        .unwrap_or(&[])
}
