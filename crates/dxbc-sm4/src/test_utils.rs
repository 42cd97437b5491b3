//! Builders for hand-assembled token streams, used by the test suites.
//!
//! Real shader blobs make poor unit-test fixtures (opaque, compiler-version
//! dependent), so the tests assemble token streams directly. The operand
//! encoder here is the symmetric counterpart of the decoder and exists so
//! tests can assert byte-level round-trips.

use crate::operand::{ImmediateValues, Operand, SelectionMode};
use crate::program::ShaderType;
use crate::token::*;

/// Builds an opcode token with the given length field.
pub fn opcode_token(opcode: u32, length: u32) -> u32 {
    opcode | (length << OPCODE_LENGTH_SHIFT)
}

/// Builds a complete program token stream: version token, length word
/// (patched to cover the whole stream), then `body`.
pub fn program_tokens(major: u8, minor: u8, ty: ShaderType, body: &[u32]) -> Vec<u32> {
    let ty_raw: u16 = match ty {
        ShaderType::Pixel => 0,
        ShaderType::Vertex => 1,
        ShaderType::Geometry => 2,
        ShaderType::Hull => 3,
        ShaderType::Domain => 4,
        ShaderType::Compute => 5,
        ShaderType::Unknown(other) => other,
    };
    let version = (minor as u32 & 0xf) | ((major as u32 & 0xf) << 4) | ((ty_raw as u32) << 16);

    let mut tokens = vec![version, 0];
    tokens.extend_from_slice(body);
    tokens[1] = tokens.len() as u32;
    tokens
}

/// Serializes tokens to the little-endian byte layout of a shader-code chunk.
pub fn shader_bytes(tokens: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(tokens.len() * 4);
    for t in tokens {
        out.extend_from_slice(&t.to_le_bytes());
    }
    out
}

/// Encodes an operand back into tokens.
///
/// Index representations are chosen canonically: a nested operand with a
/// zero displacement encodes as `RELATIVE`, with a displacement as
/// `IMM32_PLUS_RELATIVE`, and plain displacements as `IMM32` (they must fit
/// in 32 bits).
pub fn encode_operand(op: &Operand, out: &mut Vec<u32>) {
    let mut token = match op.comps {
        0 => OPERAND_COMPS_0,
        1 => OPERAND_COMPS_1,
        4 => OPERAND_COMPS_4,
        other => panic!("operand with unsupported component count {other}"),
    };

    if op.comps == 4 {
        let (mode, sel) = match op.mode {
            SelectionMode::Mask => (OPERAND_MODE_MASKED, op.mask as u32),
            SelectionMode::Swizzle => {
                let mut sel = 0u32;
                for (lane, &src) in op.swizzle.iter().enumerate() {
                    sel |= (src as u32) << (lane * 2);
                }
                (OPERAND_MODE_SWIZZLE, sel)
            }
            SelectionMode::Scalar => (OPERAND_MODE_SCALAR, op.swizzle[0] as u32),
        };
        token |= (mode << OPERAND_MODE_SHIFT) | (sel << OPERAND_SEL_SHIFT);
    }

    token |= op.ty << OPERAND_TYPE_SHIFT;
    token |= (op.num_indices as u32) << OPERAND_NUM_INDICES_SHIFT;

    for i in 0..op.num_indices as usize {
        let index = &op.indices[i];
        let repr = match (&index.relative, index.disp) {
            (None, _) => INDEX_REPR_IMM32,
            (Some(_), 0) => INDEX_REPR_RELATIVE,
            (Some(_), _) => INDEX_REPR_IMM32_PLUS_RELATIVE,
        };
        token |= repr << OPERAND_INDEX_REPR_SHIFTS[i];
    }

    let extended = op.neg || op.abs;
    if extended {
        token |= OPERAND_EXTENDED_BIT;
    }
    out.push(token);

    if extended {
        let mut ext = EXT_OPERAND_MODIFIER;
        if op.neg {
            ext |= EXT_OPERAND_NEG_BIT;
        }
        if op.abs {
            ext |= EXT_OPERAND_ABS_BIT;
        }
        out.push(ext);
    }

    for i in 0..op.num_indices as usize {
        let index = &op.indices[i];
        match &index.relative {
            None => {
                let disp = i32::try_from(index.disp).expect("displacement does not fit in 32 bits");
                out.push(disp as u32);
            }
            Some(rel) => {
                if index.disp != 0 {
                    let disp =
                        i32::try_from(index.disp).expect("displacement does not fit in 32 bits");
                    out.push(disp as u32);
                }
                encode_operand(rel, out);
            }
        }
    }

    match op.imm {
        Some(ImmediateValues::Imm32(values)) => {
            out.extend_from_slice(&values[..op.comps as usize]);
        }
        Some(ImmediateValues::Imm64(values)) => {
            for v in &values[..op.comps as usize] {
                out.push(*v as u32);
                out.push((*v >> 32) as u32);
            }
        }
        None => {}
    }
}
