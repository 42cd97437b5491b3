//! Decoder for the declaration/instruction token stream.
//!
//! The stream is a sequence of variable-length records. Each starts with an
//! opcode token whose length field covers the whole record; the decoder must
//! consume exactly that many tokens, and anything else is a hard error so a
//! single bad record cannot silently misalign the rest of the stream.

use tracing::warn;

use crate::error::ParseError;
use crate::operand::{decode_operand, Operand};
use crate::program::{
    DeclPayload, Declaration, InputPrimitive, Instruction, OutputTopology, ResourceTarget,
    ShaderProgram, TessDomain, TessOutputPrimitive, TessPartitioning, MAX_OPERANDS,
};
use crate::reader::TokenReader;
use crate::token::*;

/// Decodes the declaration and instruction records of a shader-code token
/// stream into `program`. The reader must be positioned just past the
/// program header (version and length tokens) with its end set from the
/// length word.
pub(crate) fn decode_tokens(
    r: &mut TokenReader<'_>,
    program: &mut ShaderProgram<'_>,
) -> Result<(), ParseError> {
    // `dcl_stream` switches this; topology declarations land in the slot it
    // selects.
    let mut cur_gs_stream = 0usize;

    while !r.at_end() {
        let at_token = r.pos();
        let token = r.read_u32()?;
        let opcode = token & OPCODE_MASK;
        if opcode >= OPCODE_COUNT {
            return Err(ParseError::UnknownOpcode { opcode, at_token });
        }

        // Custom-data blocks replace the opcode-token length with a dedicated
        // length word; the only form the compiler emits into SM4/SM5 programs
        // is the embedded immediate constant buffer.
        if opcode == OPCODE_IMMEDIATE_CONSTANT_BUFFER {
            let custom_len = r.read_u32()?;
            let data_tokens = custom_len.checked_sub(2).ok_or(ParseError::InvariantViolation {
                at_token,
                context: "custom-data length word smaller than its own header",
            })? as usize;
            let words = r.read_slice(data_tokens)?;
            let mut data = Vec::with_capacity(data_tokens * 4);
            for w in words {
                data.extend_from_slice(&w.to_le_bytes());
            }
            program.decls.push(Declaration {
                token,
                opcode,
                op: None,
                payload: DeclPayload::ImmediateConstantBuffer(data),
            });
            continue;
        }

        let length = ((token >> OPCODE_LENGTH_SHIFT) & OPCODE_LENGTH_MASK) as usize;
        if length == 0 {
            return Err(ParseError::InvariantViolation {
                at_token,
                context: "instruction length is zero",
            });
        }
        let insn_end = at_token + length;
        if length > 1 + r.remaining() {
            return Err(ParseError::Truncated {
                at_token,
                wanted: length - 1 - r.remaining(),
            });
        }

        // Hull-shader phase markers interleave with the declarations so a
        // later phase-instance-count declaration can be attributed to the
        // phase it belongs to.
        if matches!(
            opcode,
            OPCODE_HS_DECLS
                | OPCODE_HS_CONTROL_POINT_PHASE
                | OPCODE_HS_FORK_PHASE
                | OPCODE_HS_JOIN_PHASE
        ) {
            program.decls.push(Declaration::marker(opcode, token));
        }

        if is_declaration(opcode) {
            decode_declaration(r, program, token, opcode, at_token, &mut cur_gs_stream)?;
            if r.pos() != insn_end {
                return Err(ParseError::InvariantViolation {
                    at_token,
                    context: "declaration consumed a different number of tokens than its length field declares",
                });
            }
        } else {
            if opcode == OPCODE_HS_DECLS {
                continue;
            }
            let insn = decode_instruction(r, token, opcode, insn_end, at_token)?;
            program.insns.push(insn);
        }
    }

    Ok(())
}

fn decode_instruction(
    r: &mut TokenReader<'_>,
    token: u32,
    opcode: u32,
    insn_end: usize,
    at_token: usize,
) -> Result<Instruction, ParseError> {
    let mut insn = Instruction::new(token);

    let mut extended = token & OPCODE_EXTENDED_BIT != 0;
    while extended {
        let ext = r.read_u32()?;
        extended = ext & OPCODE_EXTENDED_BIT != 0;
        match ext & EXT_OPCODE_TYPE_MASK {
            EXT_OPCODE_EMPTY => {}
            EXT_OPCODE_SAMPLE_CONTROLS => {
                insn.sample_offset = [
                    sign_extend_4bit(ext >> EXT_SAMPLE_OFFSET_U_SHIFT),
                    sign_extend_4bit(ext >> EXT_SAMPLE_OFFSET_V_SHIFT),
                    sign_extend_4bit(ext >> EXT_SAMPLE_OFFSET_W_SHIFT),
                ];
            }
            EXT_OPCODE_RESOURCE_DIM => {
                insn.resource_target = ResourceTarget::from_raw(
                    ((ext >> EXT_RESOURCE_DIM_SHIFT) & EXT_RESOURCE_DIM_MASK) as u8,
                );
            }
            EXT_OPCODE_RESOURCE_RETURN_TYPE => {
                for (i, slot) in insn.resource_return_type.iter_mut().enumerate() {
                    let shift = EXT_RETURN_TYPE_SHIFT + EXT_RETURN_TYPE_COMPONENT_BITS * i as u32;
                    *slot = ((ext >> shift) & EXT_RETURN_TYPE_COMPONENT_MASK) as u8;
                }
            }
            other => {
                // Must be consumed to keep the stream aligned even though
                // nothing here interprets it.
                warn!(ext_type = other, opcode, "skipping uninterpreted extended instruction token");
            }
        }
    }

    if opcode == OPCODE_INTERFACE_CALL {
        insn.interface_call_count = Some(r.read_u32()?);
    }

    while r.pos() != insn_end {
        if r.pos() > insn_end {
            return Err(ParseError::InvariantViolation {
                at_token,
                context: "instruction consumed more tokens than its length field declares",
            });
        }
        if insn.ops.len() >= MAX_OPERANDS {
            return Err(ParseError::InvariantViolation {
                at_token,
                context: "instruction has more operands than the encoding allows",
            });
        }
        insn.ops.push(decode_operand(r)?);
    }

    Ok(insn)
}

fn decode_declaration(
    r: &mut TokenReader<'_>,
    program: &mut ShaderProgram<'_>,
    token: u32,
    opcode: u32,
    at_token: usize,
    cur_gs_stream: &mut usize,
) -> Result<(), ParseError> {
    // Declarations may chain extended tokens too; they carry no payload this
    // decoder models, but skipping them is required to stay aligned.
    let mut extended = token & OPCODE_EXTENDED_BIT != 0;
    while extended {
        let ext = r.read_u32()?;
        extended = ext & OPCODE_EXTENDED_BIT != 0;
    }

    let mut decl = Declaration {
        token,
        opcode,
        op: None,
        payload: DeclPayload::None,
    };

    match opcode {
        OPCODE_DCL_GLOBAL_FLAGS => {}

        OPCODE_DCL_RESOURCE | OPCODE_DCL_UAV_TYPED => {
            decl.op = Some(Box::new(decode_operand(r)?));
            decl.payload = DeclPayload::ResourceReturnType(r.read_u32()?);
        }

        OPCODE_DCL_SAMPLER
        | OPCODE_DCL_INPUT
        | OPCODE_DCL_INPUT_PS
        | OPCODE_DCL_OUTPUT
        | OPCODE_DCL_CONSTANT_BUFFER
        | OPCODE_DCL_UAV_RAW
        | OPCODE_DCL_RESOURCE_RAW => {
            decl.op = Some(Box::new(decode_operand(r)?));
        }

        OPCODE_DCL_INPUT_SIV
        | OPCODE_DCL_INPUT_SGV
        | OPCODE_DCL_INPUT_PS_SIV
        | OPCODE_DCL_INPUT_PS_SGV
        | OPCODE_DCL_OUTPUT_SIV
        | OPCODE_DCL_OUTPUT_SGV => {
            decl.op = Some(Box::new(decode_operand(r)?));
            decl.payload = DeclPayload::SystemValue(r.read_u32()? as u16);
        }

        OPCODE_DCL_INDEX_RANGE => {
            let op = decode_operand(r)?;
            if op.ty != OPERAND_TYPE_INPUT && op.ty != OPERAND_TYPE_OUTPUT {
                return Err(ParseError::InvariantViolation {
                    at_token,
                    context: "dcl_indexrange operand is neither an input nor an output register",
                });
            }
            decl.op = Some(Box::new(op));
            decl.payload = DeclPayload::Count(r.read_u32()?);
        }

        OPCODE_DCL_TEMPS
        | OPCODE_DCL_HS_MAX_TESSFACTOR
        | OPCODE_DCL_HS_FORK_PHASE_INSTANCE_COUNT
        | OPCODE_DCL_HS_JOIN_PHASE_INSTANCE_COUNT
        | OPCODE_DCL_FUNCTION_BODY => {
            decl.payload = DeclPayload::Count(r.read_u32()?);
        }

        OPCODE_DCL_INDEXABLE_TEMP => {
            let mut op = Operand {
                ty: OPERAND_TYPE_INDEXABLE_TEMP,
                num_indices: 1,
                ..Operand::default()
            };
            op.indices[0].disp = r.read_u32()? as i64;
            decl.op = Some(Box::new(op));
            decl.payload = DeclPayload::IndexableTemp {
                count: r.read_u32()?,
                comps: r.read_u32()?,
            };
        }

        OPCODE_DCL_GS_INPUT_PRIMITIVE => {
            program.gs_input_primitive = InputPrimitive::from_raw(decl.decl_field());
        }

        OPCODE_DCL_GS_OUTPUT_PRIMITIVE_TOPOLOGY => {
            // SM4 geometry shaders have no dcl_stream; make sure stream 0
            // exists before writing through it.
            if program.gs_output_topology.len() <= *cur_gs_stream {
                program
                    .gs_output_topology
                    .resize(*cur_gs_stream + 1, OutputTopology::Undefined);
            }
            program.gs_output_topology[*cur_gs_stream] = OutputTopology::from_raw(decl.decl_field());
        }

        OPCODE_DCL_MAX_OUTPUT_VERTEX_COUNT => {
            let count = r.read_u32()?;
            decl.payload = DeclPayload::Count(count);
            program.max_gs_output_vertex = count;
        }

        OPCODE_DCL_GS_INSTANCE_COUNT => {
            let count = r.read_u32()?;
            decl.payload = DeclPayload::Count(count);
            program.gs_instance_count = count;
        }

        OPCODE_DCL_TESS_OUTPUT_PRIMITIVE => {
            program.ds_tessellator_output_primitive = TessOutputPrimitive::from_raw(decl.decl_field());
        }

        OPCODE_DCL_TESS_PARTITIONING => {
            program.ds_tessellator_partitioning = TessPartitioning::from_raw(decl.decl_field());
        }

        OPCODE_DCL_TESS_DOMAIN => {
            program.ds_tessellator_domain = TessDomain::from_raw(decl.decl_field());
        }

        OPCODE_DCL_OUTPUT_CONTROL_POINT_COUNT => {
            program.hs_output_control_point_count = decl.decl_field();
        }

        OPCODE_DCL_INPUT_CONTROL_POINT_COUNT => {
            program.hs_input_control_point_count = decl.decl_field();
        }

        OPCODE_DCL_FUNCTION_TABLE => {
            let count = r.read_u32()? as usize;
            decl.payload = DeclPayload::FunctionTable(r.read_slice(count)?.to_vec());
        }

        OPCODE_DCL_INTERFACE => {
            let id = r.read_u32()?;
            let expected_table_len = r.read_u32()?;
            let packed = r.read_u32()?;
            let table_len = (packed & 0xffff) as u16;
            let array_len = (packed >> 16) as u16;
            decl.payload = DeclPayload::Interface {
                id,
                expected_table_len,
                table_len,
                array_len,
                table: r.read_slice(table_len as usize)?.to_vec(),
            };
        }

        OPCODE_DCL_THREAD_GROUP => {
            let size = [r.read_u32()?, r.read_u32()?, r.read_u32()?];
            decl.payload = DeclPayload::ThreadGroup(size);
            program.cs_thread_group_size = size;
        }

        OPCODE_DCL_UAV_STRUCTURED | OPCODE_DCL_RESOURCE_STRUCTURED => {
            decl.op = Some(Box::new(decode_operand(r)?));
            decl.payload = DeclPayload::Structured {
                stride: r.read_u32()?,
                count: 0,
            };
        }

        OPCODE_DCL_TGSM_RAW => {
            decl.op = Some(Box::new(decode_operand(r)?));
            decl.payload = DeclPayload::Count(r.read_u32()?);
        }

        OPCODE_DCL_TGSM_STRUCTURED => {
            decl.op = Some(Box::new(decode_operand(r)?));
            decl.payload = DeclPayload::Structured {
                stride: r.read_u32()?,
                count: r.read_u32()?,
            };
        }

        OPCODE_DCL_STREAM => {
            let op = decode_operand(r)?;
            let stream = op.indices[0].disp as u32;
            if stream > 3 {
                return Err(ParseError::InvariantViolation {
                    at_token,
                    context: "geometry-shader stream index out of range",
                });
            }
            *cur_gs_stream = stream as usize;
            decl.op = Some(Box::new(op));
            program.gs_output_topology.push(OutputTopology::Undefined);
        }

        _ => {
            return Err(ParseError::UnknownOpcode { opcode, at_token });
        }
    }

    program.decls.push(decl);
    Ok(())
}

fn sign_extend_4bit(v: u32) -> i8 {
    (((v & 0xf) as i8) << 4) >> 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_bit_offsets_sign_extend() {
        assert_eq!(sign_extend_4bit(0x0), 0);
        assert_eq!(sign_extend_4bit(0x7), 7);
        assert_eq!(sign_extend_4bit(0x8), -8);
        assert_eq!(sign_extend_4bit(0xf), -1);
    }
}
