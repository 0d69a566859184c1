//! Function selector calculation

use anyhow::{bail, Result};

use super::ToolResult;
use crate::domain::abi::{
    compute_selector, selector_hex, strip_returns_clause, FunctionSignature, SignatureError,
};

/// Compute the selector of a function signature.
///
/// Types outside the decoder's vocabulary still get a selector; the
/// signature is canonicalized textually and hashed.
pub fn selector(input: &str) -> Result<ToolResult> {
    let input = input.trim();
    if input.is_empty() {
        bail!("usage: rampwatch selector 'transfer(address,uint256)'");
    }

    let (signature, decodable) = match input.parse::<FunctionSignature>() {
        Ok(function) => (function.signature(), true),
        Err(SignatureError::UnsupportedType { .. }) => (canonical_signature(input)?, false),
        Err(err) => return Err(err.into()),
    };

    Ok(ToolResult::new("Selector")
        .add("signature", signature.clone())
        .add("selector", selector_hex(compute_selector(&signature)))
        .add("decodable", if decodable { "yes" } else { "no" }))
}

/// `name(type,...)` with parameter names, data locations and whitespace
/// dropped, and `uint`/`int` widened to their 256-bit names.
fn canonical_signature(sig: &str) -> Result<String> {
    let sig = strip_returns_clause(sig.trim());
    let (Some(open), Some(close)) = (sig.find('('), sig.rfind(')')) else {
        bail!("malformed function signature `{sig}`");
    };
    if close < open || close != sig.len() - 1 {
        bail!("malformed function signature `{sig}`");
    }

    let name = sig[..open].trim();
    Ok(format!("{}({})", name, canonical_params(&sig[open + 1..close])))
}

fn canonical_params(params: &str) -> String {
    if params.trim().is_empty() {
        return String::new();
    }
    split_top_level(params)
        .into_iter()
        .map(canonical_param)
        .collect::<Vec<_>>()
        .join(",")
}

fn canonical_param(param: &str) -> String {
    let param = param.trim();

    // Tuple: canonicalize the components, keep any array suffix
    if param.starts_with('(') {
        if let Some(close) = matching_paren(param) {
            let suffix = param[close + 1..]
                .split_whitespace()
                .next()
                .filter(|token| token.starts_with('['))
                .unwrap_or_default();
            return format!("({}){}", canonical_params(&param[1..close]), suffix);
        }
    }

    let kind = param.split_whitespace().next().unwrap_or_default();
    let (base, dims) = kind.split_at(kind.find('[').unwrap_or(kind.len()));
    let base = match base {
        "uint" => "uint256",
        "int" => "int256",
        other => other,
    };
    format!("{base}{dims}")
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (pos, c) in params.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&params[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// Index of the `)` closing the `(` at position 0
fn matching_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (pos, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(pos);
                }
            }
            _ => {}
        }
    }
    None
}
