//! Decoder for the resource-definition (`RDEF`) chunk: constant buffers,
//! their variables and type records, and the resource-binding table.
//!
//! All offsets in the chunk are relative to the start of the chunk payload.
//! Names are NUL-terminated strings borrowed directly out of the chunk.

use crate::container::TaggedChunk;
use crate::error::ParseError;
use crate::fourcc::FourCC;
use crate::program::{
    variable_type_name, CBufferType, ConstantBuffer, ResourceBinding, ShaderProgram,
    ShaderVariable, VariableBindings, VariableTypeDesc,
};

const BINDING_RECORD_LEN: usize = 32;
const CBUFFER_RECORD_LEN: usize = 24;
const VARIABLE_RECORD_LEN: usize = 24;
/// Shader model 5 reflection appends texture/sampler slots to each variable.
const VARIABLE_RECORD_LEN_SM5: usize = 40;

/// Parses the resource chunk into `program`.
///
/// The variable record width depends on the shader model of the *parsed
/// program* (the chunk's own shader-model word exists but is not what the
/// compiler keys the layout on).
pub(crate) fn parse_resource_chunk<'a>(
    chunk: TaggedChunk<'a>,
    program: &mut ShaderProgram<'a>,
) -> Result<(), ParseError> {
    if chunk.fourcc != FourCC::RDEF {
        return Err(ParseError::BadMagic {
            expected: FourCC::RDEF,
            found: chunk.fourcc,
        });
    }
    let bytes = chunk.data;

    let num_cb = read_u32_le(bytes, 0)?;
    let cb_offset = read_u32_le(bytes, 4)? as usize;
    let num_bindings = read_u32_le(bytes, 8)?;
    let binding_offset = read_u32_le(bytes, 12)? as usize;
    let _shader_model = read_u32_le(bytes, 16)?;
    let _compile_flags = read_u32_le(bytes, 20)?;

    check_table(bytes, binding_offset, num_bindings as usize, BINDING_RECORD_LEN)?;
    program.resource_bindings = Vec::with_capacity(num_bindings as usize);
    for i in 0..num_bindings as usize {
        let at = binding_offset + i * BINDING_RECORD_LEN;
        program.resource_bindings.push(ResourceBinding {
            name: read_cstring(bytes, read_u32_le(bytes, at)? as usize)?,
            input_type: read_u32_le(bytes, at + 4)?,
            return_type: read_u32_le(bytes, at + 8)?,
            dimension: read_u32_le(bytes, at + 12)?,
            num_samples: read_u32_le(bytes, at + 16)?,
            bind_point: read_u32_le(bytes, at + 20)?,
            bind_count: read_u32_le(bytes, at + 24)?,
            flags: read_u32_le(bytes, at + 28)?,
        });
    }

    let sm5 = program.version.major >= 5;
    check_table(bytes, cb_offset, num_cb as usize, CBUFFER_RECORD_LEN)?;
    program.cbuffers = Vec::with_capacity(num_cb as usize);
    for i in 0..num_cb as usize {
        let at = cb_offset + i * CBUFFER_RECORD_LEN;
        let name = read_cstring(bytes, read_u32_le(bytes, at)? as usize)?;
        let var_count = read_u32_le(bytes, at + 4)? as usize;
        let var_offset = read_u32_le(bytes, at + 8)? as usize;

        let vars = parse_variables(bytes, var_offset, var_count, sm5)?;

        program.cbuffers.push(ConstantBuffer {
            name,
            size: read_u32_le(bytes, at + 12)?,
            flags: read_u32_le(bytes, at + 16)?,
            ty: CBufferType::from_raw(read_u32_le(bytes, at + 20)?),
            vars,
            bind_point: resolve_bind_point(&program.resource_bindings, name)?,
        });
    }

    Ok(())
}

fn parse_variables<'a>(
    bytes: &'a [u8],
    var_offset: usize,
    var_count: usize,
    sm5: bool,
) -> Result<Vec<ShaderVariable<'a>>, ParseError> {
    let record_len = if sm5 {
        VARIABLE_RECORD_LEN_SM5
    } else {
        VARIABLE_RECORD_LEN
    };
    check_table(bytes, var_offset, var_count, record_len)?;

    let mut vars = Vec::with_capacity(var_count);
    for i in 0..var_count {
        let at = var_offset + i * record_len;
        let name = read_cstring(bytes, read_u32_le(bytes, at)? as usize)?;
        let start_offset = read_u32_le(bytes, at + 4)?;
        let size = read_u32_le(bytes, at + 8)?;
        let flags = read_u32_le(bytes, at + 12)?;
        let type_offset = read_u32_le(bytes, at + 16)? as usize;
        let default_value_offset = read_u32_le(bytes, at + 20)? as usize;

        let bindings = if sm5 {
            Some(VariableBindings {
                start_texture: read_u32_le(bytes, at + 24)?,
                texture_size: read_u32_le(bytes, at + 28)?,
                start_sampler: read_u32_le(bytes, at + 32)?,
                sampler_size: read_u32_le(bytes, at + 36)?,
            })
        } else {
            None
        };

        // The default value has no length of its own; the variable's size
        // bounds it.
        let default_value = if default_value_offset != 0 {
            let end = default_value_offset
                .checked_add(size as usize)
                .filter(|&end| end <= bytes.len())
                .ok_or(ParseError::TruncatedChunk {
                    at_byte: default_value_offset,
                    wanted: size as usize,
                    len: bytes.len(),
                })?;
            Some(&bytes[default_value_offset..end])
        } else {
            None
        };

        let type_desc = if type_offset != 0 {
            Some(parse_type_record(bytes, type_offset)?)
        } else {
            None
        };

        vars.push(ShaderVariable {
            name,
            start_offset,
            size,
            flags,
            default_value,
            bindings,
            type_desc,
        });
    }

    Ok(vars)
}

fn parse_type_record(bytes: &[u8], at: usize) -> Result<VariableTypeDesc, ParseError> {
    let class = read_u16_le(bytes, at)?;
    let ty = read_u16_le(bytes, at + 2)?;
    let rows = read_u16_le(bytes, at + 4)?;
    let columns = read_u16_le(bytes, at + 6)?;
    let elements = read_u16_le(bytes, at + 8)?;
    let members = read_u16_le(bytes, at + 10)?;
    // The member offset is split into two 16-bit halves, high half first.
    let member_offset =
        ((read_u16_le(bytes, at + 12)? as u32) << 16) | read_u16_le(bytes, at + 14)? as u32;

    Ok(VariableTypeDesc {
        class,
        ty,
        rows,
        columns,
        elements,
        members,
        member_offset,
        name: variable_type_name(ty),
    })
}

/// Resolves a constant buffer's register by exact name match against the
/// binding table.
fn resolve_bind_point(bindings: &[ResourceBinding<'_>], name: &str) -> Result<u32, ParseError> {
    bindings
        .iter()
        .find(|b| b.name == name)
        .map(|b| b.bind_point)
        .ok_or_else(|| ParseError::BindPointNotFound {
            name: name.to_owned(),
        })
}

pub(crate) fn check_table(
    bytes: &[u8],
    offset: usize,
    count: usize,
    record_len: usize,
) -> Result<(), ParseError> {
    let table_len = count
        .checked_mul(record_len)
        .ok_or(ParseError::TruncatedChunk {
            at_byte: offset,
            wanted: usize::MAX,
            len: bytes.len(),
        })?;
    match offset.checked_add(table_len) {
        Some(end) if end <= bytes.len() => Ok(()),
        _ => Err(ParseError::TruncatedChunk {
            at_byte: offset,
            wanted: table_len,
            len: bytes.len(),
        }),
    }
}

pub(crate) fn read_u32_le(bytes: &[u8], offset: usize) -> Result<u32, ParseError> {
    match offset.checked_add(4).and_then(|end| bytes.get(offset..end)) {
        Some(s) => Ok(u32::from_le_bytes([s[0], s[1], s[2], s[3]])),
        None => Err(ParseError::TruncatedChunk {
            at_byte: offset,
            wanted: 4,
            len: bytes.len(),
        }),
    }
}

fn read_u16_le(bytes: &[u8], offset: usize) -> Result<u16, ParseError> {
    match offset.checked_add(2).and_then(|end| bytes.get(offset..end)) {
        Some(s) => Ok(u16::from_le_bytes([s[0], s[1]])),
        None => Err(ParseError::TruncatedChunk {
            at_byte: offset,
            wanted: 2,
            len: bytes.len(),
        }),
    }
}

/// Borrows the NUL-terminated string at `offset` out of the chunk.
pub(crate) fn read_cstring(bytes: &[u8], offset: usize) -> Result<&str, ParseError> {
    let tail = bytes.get(offset..).ok_or(ParseError::InvalidName {
        at_byte: offset,
        reason: "offset outside chunk",
    })?;
    let nul = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ParseError::InvalidName {
            at_byte: offset,
            reason: "missing NUL terminator",
        })?;
    core::str::from_utf8(&tail[..nul]).map_err(|_| ParseError::InvalidName {
        at_byte: offset,
        reason: "not valid UTF-8",
    })
}
