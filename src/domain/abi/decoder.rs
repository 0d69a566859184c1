//! Calldata decoder for the head/tail ABI layout
//!
//! Every read is bounds-checked against the payload before it happens, so the
//! decoder can be fed arbitrary bytes.

use std::fmt;

use alloy_primitives::{Address, U256};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::registry::{ParamType, Selector, SelectorRegistry};
use super::FunctionSignature;

const WORD: usize = 32;

/// A decoded argument value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiValue {
    Address(Address),
    UInt256(U256),
    Utf8String(String),
    AddressArray(Vec<Address>),
}

impl AbiValue {
    pub fn kind(&self) -> ParamType {
        match self {
            Self::Address(_) => ParamType::Address,
            Self::UInt256(_) => ParamType::UInt256,
            Self::Utf8String(_) => ParamType::Utf8String,
            Self::AddressArray(_) => ParamType::AddressArray,
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(addr) => f.write_str(&addr.to_checksum(None)),
            Self::UInt256(value) => write!(f, "{value}"),
            Self::Utf8String(text) => f.write_str(text),
            Self::AddressArray(items) => {
                let items: Vec<String> = items.iter().map(|a| a.to_checksum(None)).collect();
                write!(f, "[{}]", items.join(","))
            }
        }
    }
}

impl Serialize for AbiValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AbiValue", 2)?;
        state.serialize_field("type", self.kind().canonical())?;
        match self {
            Self::AddressArray(items) => {
                let items: Vec<String> = items.iter().map(|a| a.to_checksum(None)).collect();
                state.serialize_field("value", &items)?;
            }
            other => state.serialize_field("value", &other.to_string())?,
        }
        state.end()
    }
}

/// A decoded function argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedArg {
    /// Parameter name (or "arg{n}" if unnamed)
    pub name: String,
    pub value: AbiValue,
}

/// Result of decoding a function call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedCall {
    #[serde(serialize_with = "serialize_selector")]
    pub selector: Selector,
    pub function_name: String,
    /// Full function signature (e.g., "registerUserAccount(address,string)")
    pub signature: String,
    pub arguments: Vec<DecodedArg>,
}

impl DecodedCall {
    /// Decoded values in declaration order
    pub fn values(&self) -> impl Iterator<Item = &AbiValue> {
        self.arguments.iter().map(|arg| &arg.value)
    }
}

fn serialize_selector<S: Serializer>(selector: &Selector, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&super::registry::selector_hex(*selector))
}

/// Why a payload could not be decoded. Always local to one call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown selector 0x{}", hex::encode(.0))]
    UnknownSelector(Selector),
    #[error("payload truncated: need {needed} bytes, have {available}")]
    TruncatedPayload { needed: usize, available: usize },
    #[error("parameter {index} is not valid UTF-8")]
    InvalidUtf8 { index: usize },
    #[error("parameter {index} holds a malformed {kind} value")]
    MalformedStaticValue { index: usize, kind: ParamType },
    #[error("parameter {index} points outside the tail region (0x{word})")]
    OffsetOutOfBounds { index: usize, word: String },
    #[error("calldata is not valid hex: {0}")]
    InvalidHex(String),
}

/// Decode the payload (calldata without the selector) of a registered function
pub fn decode(
    registry: &SelectorRegistry,
    selector: Selector,
    payload: &[u8],
) -> Result<DecodedCall, DecodeError> {
    let function = registry
        .lookup(selector)
        .ok_or(DecodeError::UnknownSelector(selector))?;
    decode_params(function, payload)
}

/// Decode full calldata: 4-byte selector followed by the payload
pub fn decode_calldata(
    registry: &SelectorRegistry,
    calldata: &[u8],
) -> Result<DecodedCall, DecodeError> {
    let (selector, payload) = split_selector(calldata)?;
    decode(registry, selector, payload)
}

/// Decode calldata given as a hex string, with or without `0x`
pub fn decode_hex(registry: &SelectorRegistry, calldata: &str) -> Result<DecodedCall, DecodeError> {
    let trimmed = calldata.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|err| DecodeError::InvalidHex(err.to_string()))?;
    decode_calldata(registry, &bytes)
}

fn split_selector(calldata: &[u8]) -> Result<(Selector, &[u8]), DecodeError> {
    match calldata {
        [a, b, c, d, payload @ ..] => Ok(([*a, *b, *c, *d], payload)),
        _ => Err(DecodeError::TruncatedPayload {
            needed: 4,
            available: calldata.len(),
        }),
    }
}

/// Decode a payload against a known signature
pub fn decode_params(
    function: &FunctionSignature,
    payload: &[u8],
) -> Result<DecodedCall, DecodeError> {
    let head_len = function.inputs.len() * WORD;
    let mut arguments = Vec::with_capacity(function.inputs.len());

    for (index, param) in function.inputs.iter().enumerate() {
        let head = read_word(payload, index * WORD)?;

        let value = match param.kind {
            ParamType::Address => AbiValue::Address(word_to_address(head, index)?),
            ParamType::UInt256 => AbiValue::UInt256(U256::from_be_bytes(*head)),
            ParamType::Utf8String => {
                let start = tail_offset(head, head_len, index)?;
                let len = read_length(payload, start, index)?;
                let content = read_bytes(payload, start + WORD, len, index)?;
                let text = std::str::from_utf8(content)
                    .map_err(|_| DecodeError::InvalidUtf8 { index })?;
                AbiValue::Utf8String(text.to_owned())
            }
            ParamType::AddressArray => {
                let start = tail_offset(head, head_len, index)?;
                let count = read_length(payload, start, index)?;
                let items_start = start + WORD;
                let span = count
                    .checked_mul(WORD)
                    .ok_or_else(|| out_of_bounds(index, head))?;
                read_bytes(payload, items_start, span, index)?;

                let items = (0..count)
                    .map(|i| word_to_address(read_word(payload, items_start + i * WORD)?, index))
                    .collect::<Result<Vec<_>, _>>()?;
                AbiValue::AddressArray(items)
            }
        };

        let name = if param.name.trim().is_empty() {
            format!("arg{}", index)
        } else {
            param.name.clone()
        };
        arguments.push(DecodedArg { name, value });
    }

    Ok(DecodedCall {
        selector: function.selector(),
        function_name: function.name.clone(),
        signature: function.signature(),
        arguments,
    })
}

fn read_word(payload: &[u8], at: usize) -> Result<&[u8; WORD], DecodeError> {
    let truncated = DecodeError::TruncatedPayload {
        needed: at.saturating_add(WORD),
        available: payload.len(),
    };
    let end = at.checked_add(WORD).ok_or_else(|| truncated.clone())?;
    payload
        .get(at..end)
        .and_then(|slice| <&[u8; WORD]>::try_from(slice).ok())
        .ok_or(truncated)
}

fn read_bytes(payload: &[u8], at: usize, len: usize, index: usize) -> Result<&[u8], DecodeError> {
    let end = at.checked_add(len).ok_or(DecodeError::OffsetOutOfBounds {
        index,
        word: format!("{len:x}"),
    })?;
    payload.get(at..end).ok_or(DecodeError::TruncatedPayload {
        needed: end,
        available: payload.len(),
    })
}

/// Read a length or element-count prefix at `at`
fn read_length(payload: &[u8], at: usize, index: usize) -> Result<usize, DecodeError> {
    let word = read_word(payload, at)?;
    word_to_usize(word).ok_or_else(|| out_of_bounds(index, word))
}

/// Resolve a head word into an absolute tail offset.
///
/// Offsets are relative to the start of the head region and must land on a
/// word boundary at or after the end of the head.
fn tail_offset(head: &[u8; WORD], head_len: usize, index: usize) -> Result<usize, DecodeError> {
    match word_to_usize(head) {
        Some(offset) if offset >= head_len && offset % WORD == 0 => Ok(offset),
        _ => Err(out_of_bounds(index, head)),
    }
}

fn word_to_usize(word: &[u8; WORD]) -> Option<usize> {
    let (high, low) = word.split_at(WORD - 8);
    if high.iter().any(|b| *b != 0) {
        return None;
    }
    let low: [u8; 8] = low.try_into().ok()?;
    usize::try_from(u64::from_be_bytes(low)).ok()
}

/// Addresses are right-aligned; the upper 12 bytes must be zero
fn word_to_address(word: &[u8; WORD], index: usize) -> Result<Address, DecodeError> {
    let (padding, addr) = word.split_at(WORD - 20);
    if padding.iter().any(|b| *b != 0) {
        return Err(DecodeError::MalformedStaticValue {
            index,
            kind: ParamType::Address,
        });
    }
    Ok(Address::from_slice(addr))
}

fn out_of_bounds(index: usize, word: &[u8; WORD]) -> DecodeError {
    let trimmed = hex::encode(word);
    let trimmed = trimmed.trim_start_matches('0');
    DecodeError::OffsetOutOfBounds {
        index,
        word: if trimmed.is_empty() { "0".to_string() } else { trimmed.to_string() },
    }
}
