//! ABI decode command for function calldata

use anyhow::{bail, Result};

use super::ToolResult;
use crate::domain::abi::{
    decode_hex, decode_params, selector_hex, DecodeError, DecodedCall, FunctionSignature,
    SelectorRegistry,
};

/// Decode calldata through the registry, or against `signature` when given
pub fn decode(
    registry: &SelectorRegistry,
    calldata: &str,
    signature: Option<&str>,
) -> Result<DecodedCall> {
    let Some(signature) = signature else {
        return Ok(decode_hex(registry, calldata)?);
    };

    let function: FunctionSignature = signature.parse()?;
    let digits = calldata.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    let bytes = hex::decode(digits).map_err(|err| DecodeError::InvalidHex(err.to_string()))?;
    if bytes.len() < 4 {
        return Err(DecodeError::TruncatedPayload {
            needed: 4,
            available: bytes.len(),
        }
        .into());
    }

    let (selector, payload) = bytes.split_at(4);
    if selector != function.selector() {
        bail!(
            "calldata selector 0x{} does not match {} ({})",
            hex::encode(selector),
            function.signature(),
            function.selector_hex()
        );
    }
    Ok(decode_params(&function, payload)?)
}

pub fn to_tool_result(call: &DecodedCall) -> ToolResult {
    let mut result = ToolResult::new("ABI Decode")
        .add("function", call.signature.clone())
        .add("selector", selector_hex(call.selector));
    for arg in &call.arguments {
        result = result.add(
            format!("{} ({})", arg.name, arg.value.kind()),
            arg.value.to_string(),
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTER_CALLDATA: &str = "0x3d8d1601000000000000000000000000a75da6945ca2311ac81165fc38706a1d612639af0000000000000000000000000000000000000000000000000000000000000040000000000000000000000000000000000000000000000000000000000000002362756c6b2d73622d312d7465737440627573696e6573732e6578616d706c652e636f6d";

    fn registry() -> SelectorRegistry {
        SelectorRegistry::build([
            "registerUserAccount(address user,string email)"
                .parse::<FunctionSignature>()
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn test_decode_via_registry() {
        let call = decode(&registry(), REGISTER_CALLDATA, None).unwrap();
        let result = to_tool_result(&call);

        assert_eq!(result.get("function"), Some("registerUserAccount(address,string)"));
        assert_eq!(
            result.get("user (address)"),
            Some("0xa75da6945CA2311AC81165FC38706A1d612639af")
        );
        assert_eq!(
            result.get("email (string)"),
            Some("bulk-sb-1-test@business.example.com")
        );
    }

    #[test]
    fn test_decode_with_manual_signature() {
        let empty = SelectorRegistry::default();
        assert!(decode(&empty, REGISTER_CALLDATA, None).is_err());

        let call = decode(
            &empty,
            REGISTER_CALLDATA,
            Some("registerUserAccount(address,string)"),
        )
        .unwrap();
        assert_eq!(call.arguments[0].name, "arg0");

        let err = decode(&empty, REGISTER_CALLDATA, Some("loginUserAccount(address)")).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }
}
