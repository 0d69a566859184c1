//! ABI domain models: selector registry, calldata decoder and encoder
//!
//! Only `address`, `uint256`, `string` and `address[]` parameters are
//! supported.

mod decoder;
mod encoder;
mod registry;

pub use decoder::{
    decode, decode_calldata, decode_hex, decode_params, AbiValue, DecodeError, DecodedArg,
    DecodedCall,
};
pub use encoder::{encode, parse_arg, EncodeError};
pub use registry::{
    compute_selector, parse_selector_hex, selector_hex, strip_returns_clause,
    DuplicateSelectorError, FunctionSignature, ParamSpec, ParamType, Selector, SelectorRegistry,
    SignatureError,
};
