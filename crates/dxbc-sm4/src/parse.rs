//! Top-level parse pipeline: program header, token stream, resource chunk,
//! signature chunks, post-processing.

use tracing::trace;

use crate::container::Container;
use crate::decode::decode_tokens;
use crate::error::ParseError;
use crate::fourcc::FourCC;
use crate::program::{CBufferType, ShaderProgram, ShaderVersion};
use crate::rdef::parse_resource_chunk;
use crate::reader::{tokens_from_bytes, TokenReader};
use crate::signature::parse_signature_chunk;

/// Parses one shader's chunks into a [`ShaderProgram`].
///
/// On any failure the error is returned and no program is produced; a
/// partially decoded program is never handed back as success. The returned
/// program borrows names from the chunk buffers in `container`.
pub fn parse_shader<'a>(container: &Container<'a>) -> Result<ShaderProgram<'a>, ParseError> {
    let tokens = tokens_from_bytes(container.shader_code)?;
    let mut r = TokenReader::new(&tokens);

    let version = ShaderVersion::from_token(r.read_u32()?);
    let length = r.read_u32()? as usize;
    // The length word counts tokens from the start of the stream, itself and
    // the version token included.
    if length < 2 {
        return Err(ParseError::InvariantViolation {
            at_token: 1,
            context: "program length word does not cover the program header",
        });
    }
    r.set_end(length)?;

    trace!(?version, length, "decoding shader token stream");

    let mut program = ShaderProgram::new(version);
    decode_tokens(&mut r, &mut program)?;

    if let Some(chunk) = container.resources {
        trace!(len = chunk.data.len(), "decoding resource chunk");
        parse_resource_chunk(chunk, &mut program)?;
        for cb in &mut program.cbuffers {
            // Reflection emits tbuffer members in register order already;
            // only cbuffers get re-sorted by byte offset.
            if cb.ty == CBufferType::CBuffer {
                cb.vars.sort_by_key(|v| v.start_offset);
            }
        }
    }

    if let Some(chunk) = container.input_signature {
        expect_tag(chunk.fourcc, &[FourCC::ISGN, FourCC::ISG1])?;
        program.params_in = parse_signature_chunk(chunk, FourCC::ISGN)?;
    }
    if let Some(chunk) = container.output_signature {
        expect_tag(chunk.fourcc, &[FourCC::OSGN, FourCC::OSG5, FourCC::OSG1])?;
        program.params_out = parse_signature_chunk(chunk, FourCC::OSGN)?;
    }
    if let Some(chunk) = container.patch_constant_signature {
        expect_tag(chunk.fourcc, &[FourCC::PCSG])?;
        program.params_patch = parse_signature_chunk(chunk, FourCC::PCSG)?;
    }

    Ok(program)
}

fn expect_tag(found: FourCC, allowed: &[FourCC]) -> Result<(), ParseError> {
    if allowed.contains(&found) {
        Ok(())
    } else {
        Err(ParseError::BadMagic {
            expected: allowed[0],
            found,
        })
    }
}
