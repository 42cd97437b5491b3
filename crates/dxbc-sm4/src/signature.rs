//! Decoders for the signature chunks (`ISGN`/`ISG1`, `OSGN`/`OSG5`/`OSG1`,
//! `PCSG`).
//!
//! Three on-disk record layouts exist, selected by the chunk tag:
//! the classic 24-byte record, the 28-byte record with a leading stream word
//! (`OSG5`), and the 32-byte record with both a leading stream word and a
//! trailing minimum-precision word (`ISG1`/`OSG1`).

use crate::container::TaggedChunk;
use crate::error::ParseError;
use crate::fourcc::FourCC;
use crate::program::SignatureParam;
use crate::rdef::{check_table, read_cstring, read_u32_le};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordLayout {
    /// `ISGN`/`OSGN`/`PCSG`: no stream, no min-precision.
    Classic,
    /// `OSG5`: stream word prepended.
    Stream,
    /// `ISG1`/`OSG1`: stream word prepended, min-precision word appended.
    StreamMinPrecision,
}

impl RecordLayout {
    fn for_fourcc(fourcc: FourCC) -> Option<RecordLayout> {
        match fourcc {
            FourCC::ISGN | FourCC::OSGN | FourCC::PCSG => Some(RecordLayout::Classic),
            FourCC::OSG5 => Some(RecordLayout::Stream),
            FourCC::ISG1 | FourCC::OSG1 => Some(RecordLayout::StreamMinPrecision),
            _ => None,
        }
    }

    fn record_len(self) -> usize {
        match self {
            RecordLayout::Classic => 24,
            RecordLayout::Stream => 28,
            RecordLayout::StreamMinPrecision => 32,
        }
    }
}

/// Parses one signature chunk into its parameter list, selecting the record
/// layout from the chunk tag. `expected` names the tag family the caller
/// wanted, for diagnostics when the chunk carries something else entirely.
pub(crate) fn parse_signature_chunk<'a>(
    chunk: TaggedChunk<'a>,
    expected: FourCC,
) -> Result<Vec<SignatureParam<'a>>, ParseError> {
    let layout = RecordLayout::for_fourcc(chunk.fourcc).ok_or(ParseError::BadMagic {
        expected,
        found: chunk.fourcc,
    })?;
    let bytes = chunk.data;

    let count = read_u32_le(bytes, 0)? as usize;
    let table_offset = read_u32_le(bytes, 4)? as usize;

    let record_len = layout.record_len();
    check_table(bytes, table_offset, count, record_len)?;

    let mut params = Vec::with_capacity(count);
    for i in 0..count {
        let at = table_offset + i * record_len;

        let (stream, at) = match layout {
            RecordLayout::Classic => (0, at),
            RecordLayout::Stream | RecordLayout::StreamMinPrecision => {
                (read_u32_le(bytes, at)?, at + 4)
            }
        };

        let name_offset = read_u32_le(bytes, at)? as usize;
        let semantic_index = read_u32_le(bytes, at + 4)?;
        let system_value_type = read_u32_le(bytes, at + 8)?;
        let component_type = read_u32_le(bytes, at + 12)?;
        let register_index = read_u32_le(bytes, at + 16)?;
        let mask = bytes[at + 20];
        let read_write_mask = bytes[at + 21];
        // Two padding bytes follow the masks in every layout.

        let min_precision = match layout {
            RecordLayout::StreamMinPrecision => read_u32_le(bytes, at + 24)?,
            _ => 0,
        };

        params.push(SignatureParam {
            semantic_name: read_cstring(bytes, name_offset)?,
            semantic_index,
            system_value_type,
            component_type,
            register_index,
            mask,
            read_write_mask,
            stream,
            min_precision,
        });
    }

    Ok(params)
}
