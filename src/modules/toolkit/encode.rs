//! ABI encode command for function calldata

use anyhow::Result;

use super::ToolResult;
use crate::domain::abi::{encode as encode_call, parse_arg, EncodeError, FunctionSignature};

/// Encode calldata from a signature and one text argument per parameter
pub fn encode(signature: &str, args: &[String]) -> Result<ToolResult> {
    let function: FunctionSignature = signature.parse()?;
    if args.len() != function.inputs.len() {
        return Err(EncodeError::ArityMismatch {
            expected: function.inputs.len(),
            got: args.len(),
        }
        .into());
    }

    let values = function
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| parse_arg(param.kind, arg))
        .collect::<Result<Vec<_>, _>>()?;
    let calldata = encode_call(&function, &values)?;

    Ok(ToolResult::new("ABI Encode")
        .add("signature", function.signature())
        .add("selector", function.selector_hex())
        .add("calldata", format!("0x{}", hex::encode(&calldata))))
}
