use crate::fourcc::FourCC;

/// A chunk reference: the chunk's tag plus its payload bytes (the data that
/// follows the tag and size fields inside the container).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TaggedChunk<'a> {
    pub fourcc: FourCC,
    pub data: &'a [u8],
}

/// The chunks of one shader handed to the parser.
///
/// Chunk discovery is the caller's job (typically via a DXBC container
/// walker); the parser only consumes payloads. `shader_code` is required and
/// holds the little-endian token stream of an `SHDR`/`SHEX` chunk. The other
/// chunks are optional; when present, signature chunks must carry their tag
/// so the decoder can pick the on-disk record layout.
#[derive(Debug, Copy, Clone, Default)]
pub struct Container<'a> {
    /// Payload of the shader-code chunk (the token stream).
    pub shader_code: &'a [u8],
    /// Resource-definition chunk (`RDEF`), if present.
    pub resources: Option<TaggedChunk<'a>>,
    /// Input signature (`ISGN`/`ISG1`), if present.
    pub input_signature: Option<TaggedChunk<'a>>,
    /// Output signature (`OSGN`/`OSG5`/`OSG1`), if present.
    pub output_signature: Option<TaggedChunk<'a>>,
    /// Patch-constant signature (`PCSG`), if present.
    pub patch_constant_signature: Option<TaggedChunk<'a>>,
}
