//! Selector registry - immutable table of function signatures keyed by selector

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use alloy_primitives::keccak256;
use serde::Serialize;
use thiserror::Error;

/// 4-byte function selector
pub type Selector = [u8; 4];

/// Parameter types the decoder understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParamType {
    Address,
    UInt256,
    Utf8String,
    AddressArray,
}

impl ParamType {
    /// Parse a Solidity type name. `uint` is accepted as an alias of `uint256`.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind.trim() {
            "address" => Some(Self::Address),
            "uint256" | "uint" => Some(Self::UInt256),
            "string" => Some(Self::Utf8String),
            "address[]" => Some(Self::AddressArray),
            _ => None,
        }
    }

    /// Canonical type name used in signature text
    pub fn canonical(self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::UInt256 => "uint256",
            Self::Utf8String => "string",
            Self::AddressArray => "address[]",
        }
    }

    /// Dynamic types keep an offset in the head and their data in the tail
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Utf8String | Self::AddressArray)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// A function parameter specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    /// Parameter name (may be empty)
    pub name: String,
    pub kind: ParamType,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A function signature: name plus ordered parameter types
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionSignature {
    pub name: String,
    pub inputs: Vec<ParamSpec>,
}

impl FunctionSignature {
    pub fn new(name: impl Into<String>, inputs: Vec<ParamSpec>) -> Self {
        Self {
            name: name.into(),
            inputs,
        }
    }

    /// Canonical signature text, e.g. `registerUserAccount(address,string)`
    pub fn signature(&self) -> String {
        let types: Vec<&str> = self.inputs.iter().map(|p| p.kind.canonical()).collect();
        format!("{}({})", self.name, types.join(","))
    }

    pub fn selector(&self) -> Selector {
        compute_selector(&self.signature())
    }

    /// Get selector as hex string
    pub fn selector_hex(&self) -> String {
        selector_hex(self.selector())
    }
}

impl fmt::Display for FunctionSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// Errors from parsing signature text or ABI parameter types
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("malformed function signature `{0}`")]
    Malformed(String),
    #[error("unsupported parameter type `{kind}` in `{function}`")]
    UnsupportedType { function: String, kind: String },
}

impl FromStr for FunctionSignature {
    type Err = SignatureError;

    /// Parse `name(type1,type2)`. Parameter names and a trailing
    /// `returns (...)` clause are tolerated and dropped.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let text = strip_returns_clause(text.trim());

        let malformed = || SignatureError::Malformed(text.to_string());
        let open = text.find('(').ok_or_else(malformed)?;
        let close = text.rfind(')').ok_or_else(malformed)?;
        if close < open || close != text.len() - 1 {
            return Err(malformed());
        }

        let name = text[..open].trim();
        let valid_name = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
        if !valid_name {
            return Err(malformed());
        }

        let params = text[open + 1..close].trim();
        let mut inputs = Vec::new();
        if !params.is_empty() {
            for raw in params.split(',') {
                let mut parts = raw.split_whitespace();
                let kind_text = parts.next().ok_or_else(malformed)?;
                let param_name = parts.next().unwrap_or_default();
                let kind = ParamType::parse(kind_text).ok_or_else(|| {
                    SignatureError::UnsupportedType {
                        function: name.to_string(),
                        kind: kind_text.to_string(),
                    }
                })?;
                inputs.push(ParamSpec::new(param_name, kind));
            }
        }

        Ok(Self::new(name, inputs))
    }
}

/// Drop a `returns (...)` clause following the parameter list.
///
/// Only text after the `)` that closes the parameter list is considered, so
/// function names such as `returnsOf` are left alone.
pub fn strip_returns_clause(text: &str) -> &str {
    let Some(open) = text.find('(') else {
        return text;
    };
    let mut depth = 0usize;
    for (pos, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    let end = open + pos + 1;
                    return match text[end..].trim_start().strip_prefix("returns") {
                        Some(_) => &text[..end],
                        None => text,
                    };
                }
            }
            _ => {}
        }
    }
    text
}

/// Compute the 4-byte function selector from a canonical signature
pub fn compute_selector(signature: &str) -> Selector {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn selector_hex(selector: Selector) -> String {
    format!("0x{}", hex::encode(selector))
}

/// Parse a selector hex string (e.g., "0xa9059cbb"); the prefix is optional
pub fn parse_selector_hex(selector_hex: &str) -> Option<Selector> {
    let normalized = selector_hex
        .trim()
        .strip_prefix("0x")
        .or_else(|| selector_hex.trim().strip_prefix("0X"))
        .unwrap_or(selector_hex.trim());

    if normalized.len() != 8 {
        return None;
    }

    let bytes = hex::decode(normalized).ok()?;
    bytes.try_into().ok()
}

/// Two distinct signatures hash to the same selector
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("selector 0x{} is shared by `{existing}` and `{incoming}`", hex::encode(.selector))]
pub struct DuplicateSelectorError {
    pub selector: Selector,
    pub existing: String,
    pub incoming: String,
}

/// Registry of function signatures indexed by selector.
///
/// Built once from the full function set and never mutated afterwards, so a
/// shared reference (or an `Arc`) can be read from any number of threads.
#[derive(Debug, Default, Clone)]
pub struct SelectorRegistry {
    functions: HashMap<Selector, FunctionSignature>,
}

impl SelectorRegistry {
    /// Build the registry, failing on the first selector collision.
    ///
    /// The same canonical signature appearing more than once is not a
    /// collision; the first occurrence is kept.
    pub fn build(
        signatures: impl IntoIterator<Item = FunctionSignature>,
    ) -> Result<Self, DuplicateSelectorError> {
        let mut functions: HashMap<Selector, FunctionSignature> = HashMap::new();

        for function in signatures {
            let selector = function.selector();
            match functions.get(&selector) {
                Some(existing) if existing.signature() == function.signature() => {}
                Some(existing) => {
                    return Err(DuplicateSelectorError {
                        selector,
                        existing: existing.signature(),
                        incoming: function.signature(),
                    });
                }
                None => {
                    functions.insert(selector, function);
                }
            }
        }

        Ok(Self { functions })
    }

    /// Look up a function by selector
    pub fn lookup(&self, selector: Selector) -> Option<&FunctionSignature> {
        self.functions.get(&selector)
    }

    /// Look up a function by selector hex string (e.g., "0x3d8d1601")
    pub fn lookup_hex(&self, selector_hex: &str) -> Option<&FunctionSignature> {
        self.lookup(parse_selector_hex(selector_hex)?)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// All functions, ordered by signature text
    pub fn functions(&self) -> Vec<&FunctionSignature> {
        let mut all: Vec<&FunctionSignature> = self.functions.values().collect();
        all.sort_by_key(|f| f.signature());
        all
    }
}
