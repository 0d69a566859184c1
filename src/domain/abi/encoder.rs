//! Calldata encoder - the inverse of the decoder, built on alloy-dyn-abi

use alloy_dyn_abi::DynSolValue;
use alloy_primitives::{Address, U256};
use thiserror::Error;

use super::registry::{FunctionSignature, ParamType};
use super::AbiValue;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    #[error("argument {index} is a {got} value, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: ParamType,
        got: ParamType,
    },
    #[error("invalid {kind} argument `{input}`")]
    InvalidArgument { kind: ParamType, input: String },
}

/// Encode selector + ABI parameter tuple for `function`
pub fn encode(function: &FunctionSignature, values: &[AbiValue]) -> Result<Vec<u8>, EncodeError> {
    if values.len() != function.inputs.len() {
        return Err(EncodeError::ArityMismatch {
            expected: function.inputs.len(),
            got: values.len(),
        });
    }

    let mut calldata = function.selector().to_vec();
    if values.is_empty() {
        return Ok(calldata);
    }

    let mut params = Vec::with_capacity(values.len());
    for (index, (spec, value)) in function.inputs.iter().zip(values).enumerate() {
        if spec.kind != value.kind() {
            return Err(EncodeError::TypeMismatch {
                index,
                expected: spec.kind,
                got: value.kind(),
            });
        }
        params.push(to_dyn_value(value));
    }

    calldata.extend_from_slice(&DynSolValue::Tuple(params).abi_encode_params());
    Ok(calldata)
}

fn to_dyn_value(value: &AbiValue) -> DynSolValue {
    match value {
        AbiValue::Address(addr) => DynSolValue::Address(*addr),
        AbiValue::UInt256(n) => DynSolValue::Uint(*n, 256),
        AbiValue::Utf8String(text) => DynSolValue::String(text.clone()),
        AbiValue::AddressArray(items) => {
            DynSolValue::Array(items.iter().copied().map(DynSolValue::Address).collect())
        }
    }
}

/// Parse command-line argument text according to its declared type.
///
/// Integers accept decimal or `0x` hex; address lists are comma separated and
/// may be wrapped in brackets; strings may be wrapped in quotes.
pub fn parse_arg(kind: ParamType, input: &str) -> Result<AbiValue, EncodeError> {
    let invalid = || EncodeError::InvalidArgument {
        kind,
        input: input.to_string(),
    };
    let trimmed = input.trim();

    match kind {
        ParamType::Address => parse_address(trimmed)
            .map(AbiValue::Address)
            .ok_or_else(invalid),
        ParamType::UInt256 => trimmed
            .parse::<U256>()
            .map(AbiValue::UInt256)
            .map_err(|_| invalid()),
        ParamType::Utf8String => {
            let unquoted = if trimmed.len() >= 2
                && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
                    || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
            {
                &trimmed[1..trimmed.len() - 1]
            } else {
                input
            };
            Ok(AbiValue::Utf8String(unquoted.to_string()))
        }
        ParamType::AddressArray => {
            let inner = trimmed
                .strip_prefix('[')
                .and_then(|rest| rest.strip_suffix(']'))
                .unwrap_or(trimmed);
            inner
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| parse_address(item).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()
                .map(AbiValue::AddressArray)
        }
    }
}

fn parse_address(text: &str) -> Option<Address> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let bytes = hex::decode(digits).ok()?;
    Some(Address::from_slice(&bytes))
}
