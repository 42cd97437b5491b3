//! A safe decoder for DXBC SM4/SM5 tokenized shader programs.
//!
//! The caller locates the chunks of a `DXBC` container (shader code, resource
//! definitions, signatures) and hands them to [`parse_shader`], which decodes
//! the packed token stream into a [`ShaderProgram`]: declarations,
//! instructions with operand trees, constant-buffer reflection, resource
//! bindings, and input/output/patch-constant signatures.
//!
//! Inputs are treated as **untrusted**: every read is bounds-checked and
//! malformed data surfaces as a [`ParseError`], never a panic. Names in the
//! returned program are borrowed from the caller's chunk buffers, so the
//! program must not outlive them.

#![forbid(unsafe_code)]

mod container;
mod decode;
mod error;
mod fourcc;
mod operand;
mod parse;
mod program;
mod rdef;
mod reader;
mod signature;
pub mod test_utils;
pub mod token;

pub use crate::container::{Container, TaggedChunk};
pub use crate::error::ParseError;
pub use crate::fourcc::FourCC;
pub use crate::operand::{ImmediateValues, Operand, OperandIndex, SelectionMode};
pub use crate::parse::parse_shader;
pub use crate::program::{
    variable_type_name, CBufferType, ConstantBuffer, DeclPayload, Declaration, InputPrimitive,
    Instruction, OutputTopology, ResourceBinding, ResourceTarget, ShaderProgram, ShaderType,
    ShaderVariable, ShaderVersion, SignatureParam, TessDomain, TessOutputPrimitive,
    TessPartitioning, VariableBindings, VariableTypeDesc, MAX_OPERANDS,
};
