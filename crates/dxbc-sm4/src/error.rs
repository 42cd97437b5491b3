use thiserror::Error;

use crate::fourcc::FourCC;

/// An error produced while decoding a shader program or one of its chunks.
///
/// Token positions are DWORD indices into the shader-code token stream; byte
/// offsets are relative to the start of the chunk being decoded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    #[error("token stream truncated at token {at_token} (wanted {wanted} more)")]
    Truncated { at_token: usize, wanted: usize },

    #[error("chunk truncated: need {wanted} bytes at offset {at_byte}, chunk length is {len}")]
    TruncatedChunk {
        at_byte: usize,
        wanted: usize,
        len: usize,
    },

    #[error("expected {expected} chunk, found {found}")]
    BadMagic { expected: FourCC, found: FourCC },

    #[error("unknown opcode {opcode} at token {at_token}")]
    UnknownOpcode { opcode: u32, at_token: usize },

    #[error("unknown operand type {ty} at token {at_token}")]
    UnknownOperandType { ty: u32, at_token: usize },

    #[error("unknown extended operand token type {ty} at token {at_token}")]
    UnknownExtendedOperand { ty: u32, at_token: usize },

    #[error("unknown operand index representation {repr} at token {at_token}")]
    UnknownIndexRepr { repr: u32, at_token: usize },

    #[error("{context} at token {at_token}")]
    InvariantViolation {
        at_token: usize,
        context: &'static str,
    },

    #[error("constant buffer {name:?} has no resource binding with a matching name")]
    BindPointNotFound { name: String },

    #[error("bad name string at chunk offset {at_byte}: {reason}")]
    InvalidName {
        at_byte: usize,
        reason: &'static str,
    },
}
