use crate::error::ParseError;
use crate::reader::TokenReader;
use crate::token::*;

/// Relative-operand nesting bound. Well-formed streams nest a level or two
/// (`cb[r0.x]`); anything deeper than this is hostile input and must not be
/// allowed to exhaust the decoder's stack.
const MAX_INDEX_DEPTH: u32 = 32;

/// How a 4-component operand selects its components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    /// 4-bit write mask.
    #[default]
    Mask,
    /// Four 2-bit source lanes.
    Swizzle,
    /// One 2-bit lane replicated to all four.
    Scalar,
}

/// One register index of an operand.
///
/// `disp` is the immediate displacement; `relative` is the nested operand for
/// computed indices (`x0[r1.x + 4]`). Either part may be absent depending on
/// the index representation; both default to zero/`None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperandIndex {
    /// Immediate displacement. 32-bit representations are sign-extended; for
    /// 64-bit representations the raw wire value is reinterpreted as-is.
    pub disp: i64,
    /// Nested operand for relative representations. Owned exclusively by this
    /// index slot; streams cannot produce cycles.
    pub relative: Option<Box<Operand>>,
}

/// Immediate payload of an `IMMEDIATE32`/`IMMEDIATE64` operand, as raw bit
/// patterns. Callers reinterpret lanes as float or integer based on the
/// instruction consuming them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImmediateValues {
    Imm32([u32; 4]),
    Imm64([u64; 4]),
}

/// A decoded instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    /// Operand type (register file / literal kind), one of the
    /// `OPERAND_TYPE_*` values.
    pub ty: u32,
    /// Component count: 0, 1, or 4.
    pub comps: u8,
    /// Selection mode; only meaningful when `comps == 4`.
    pub mode: SelectionMode,
    /// Source component per lane; identity (x,y,z,w) unless swizzled.
    pub swizzle: [u8; 4],
    /// 4-bit write mask; defaults to all components.
    pub mask: u8,
    /// Negate modifier from the extended operand token.
    pub neg: bool,
    /// Absolute-value modifier from the extended operand token.
    pub abs: bool,
    /// Number of register indices (0..=3).
    pub num_indices: u8,
    pub indices: [OperandIndex; 3],
    /// Present only for `IMMEDIATE32`/`IMMEDIATE64` operands.
    pub imm: Option<ImmediateValues>,
}

impl Default for Operand {
    fn default() -> Self {
        Operand {
            ty: OPERAND_TYPE_TEMP,
            comps: 0,
            mode: SelectionMode::Mask,
            swizzle: [0, 1, 2, 3],
            mask: 0xf,
            neg: false,
            abs: false,
            num_indices: 0,
            indices: Default::default(),
            imm: None,
        }
    }
}

pub fn decode_operand(r: &mut TokenReader<'_>) -> Result<Operand, ParseError> {
    decode_operand_at_depth(r, 0)
}

fn decode_operand_at_depth(r: &mut TokenReader<'_>, depth: u32) -> Result<Operand, ParseError> {
    if depth > MAX_INDEX_DEPTH {
        return Err(ParseError::InvariantViolation {
            at_token: r.pos(),
            context: "relative operand indices nested too deeply",
        });
    }

    let at_token = r.pos();
    let token = r.read_u32()?;

    let ty = (token >> OPERAND_TYPE_SHIFT) & OPERAND_TYPE_MASK;
    if ty >= OPERAND_TYPE_COUNT {
        return Err(ParseError::UnknownOperandType { ty, at_token });
    }

    let mut op = Operand {
        ty,
        num_indices: ((token >> OPERAND_NUM_INDICES_SHIFT) & OPERAND_NUM_INDICES_MASK) as u8,
        ..Operand::default()
    };

    let sel = (token >> OPERAND_SEL_SHIFT) & OPERAND_SEL_MASK;
    match token & OPERAND_COMPS_MASK {
        OPERAND_COMPS_0 => op.comps = 0,
        OPERAND_COMPS_1 => {
            op.comps = 1;
            op.swizzle = [0, 0, 0, 0];
        }
        OPERAND_COMPS_4 => {
            op.comps = 4;
            match (token >> OPERAND_MODE_SHIFT) & OPERAND_MODE_MASK {
                OPERAND_MODE_MASKED => {
                    op.mode = SelectionMode::Mask;
                    op.mask = operand_sel_mask(sel);
                }
                OPERAND_MODE_SWIZZLE => {
                    op.mode = SelectionMode::Swizzle;
                    for lane in 0..4 {
                        op.swizzle[lane as usize] = operand_sel_swizzle(sel, lane);
                    }
                }
                OPERAND_MODE_SCALAR => {
                    op.mode = SelectionMode::Scalar;
                    op.swizzle = [operand_sel_scalar(sel); 4];
                }
                _ => {
                    return Err(ParseError::InvariantViolation {
                        at_token,
                        context: "unhandled operand component selection mode",
                    })
                }
            }
        }
        _ => {
            return Err(ParseError::InvariantViolation {
                at_token,
                context: "unhandled operand component count",
            })
        }
    }

    if token & OPERAND_EXTENDED_BIT != 0 {
        let ext_at = r.pos();
        let ext = r.read_u32()?;
        match ext & EXT_OPERAND_TYPE_MASK {
            EXT_OPERAND_EMPTY => {}
            EXT_OPERAND_MODIFIER => {
                op.neg = ext & EXT_OPERAND_NEG_BIT != 0;
                op.abs = ext & EXT_OPERAND_ABS_BIT != 0;
            }
            other => {
                return Err(ParseError::UnknownExtendedOperand {
                    ty: other,
                    at_token: ext_at,
                })
            }
        }
    }

    for i in 0..op.num_indices as usize {
        let repr = (token >> OPERAND_INDEX_REPR_SHIFTS[i]) & OPERAND_INDEX_REPR_MASK;
        match repr {
            INDEX_REPR_IMM32 => {
                op.indices[i].disp = r.read_u32()? as i32 as i64;
            }
            INDEX_REPR_IMM64 => {
                op.indices[i].disp = r.read_u64()? as i64;
            }
            INDEX_REPR_RELATIVE => {
                op.indices[i].relative = Some(Box::new(decode_operand_at_depth(r, depth + 1)?));
            }
            INDEX_REPR_IMM32_PLUS_RELATIVE => {
                op.indices[i].disp = r.read_u32()? as i32 as i64;
                op.indices[i].relative = Some(Box::new(decode_operand_at_depth(r, depth + 1)?));
            }
            INDEX_REPR_IMM64_PLUS_RELATIVE => {
                op.indices[i].disp = r.read_u64()? as i64;
                op.indices[i].relative = Some(Box::new(decode_operand_at_depth(r, depth + 1)?));
            }
            other => {
                return Err(ParseError::UnknownIndexRepr {
                    repr: other,
                    at_token,
                })
            }
        }
    }

    if ty == OPERAND_TYPE_IMMEDIATE32 {
        let mut values = [0u32; 4];
        for v in values.iter_mut().take(op.comps as usize) {
            *v = r.read_u32()?;
        }
        op.imm = Some(ImmediateValues::Imm32(values));
    } else if ty == OPERAND_TYPE_IMMEDIATE64 {
        let mut values = [0u64; 4];
        for v in values.iter_mut().take(op.comps as usize) {
            *v = r.read_u64()?;
        }
        op.imm = Some(ImmediateValues::Imm64(values));
    }

    Ok(op)
}
