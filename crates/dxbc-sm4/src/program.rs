//! The in-memory program representation produced by the parser.
//!
//! Strings are borrowed from the caller's chunk buffers; everything else is
//! owned. The structures mirror what the token stream and reflection chunks
//! actually encode rather than any particular consumer's needs.

use crate::operand::Operand;
use crate::token::{OPCODE_MASK, OPCODE_SATURATE_BIT, OPCODE_TEST_NONZERO_BIT};

/// Upper bound on operands per instruction in SM4/SM5 encodings.
pub const MAX_OPERANDS: usize = 6;

/// Shader stage from the version token's program-type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderType {
    Pixel,
    Vertex,
    Geometry,
    Hull,
    Domain,
    Compute,
    Unknown(u16),
}

impl ShaderType {
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0 => ShaderType::Pixel,
            1 => ShaderType::Vertex,
            2 => ShaderType::Geometry,
            3 => ShaderType::Hull,
            4 => ShaderType::Domain,
            5 => ShaderType::Compute,
            other => ShaderType::Unknown(other),
        }
    }
}

/// Decoded version token: bits 0..=3 minor, 4..=7 major, 16..=31 type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderVersion {
    pub major: u8,
    pub minor: u8,
    pub ty: ShaderType,
}

impl ShaderVersion {
    pub fn from_token(token: u32) -> Self {
        ShaderVersion {
            minor: (token & 0xf) as u8,
            major: ((token >> 4) & 0xf) as u8,
            ty: ShaderType::from_raw((token >> 16) as u16),
        }
    }
}

/// Geometry-shader input primitive (`dcl_inputprimitive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputPrimitive {
    #[default]
    Undefined,
    Point,
    Line,
    Triangle,
    LineAdj,
    TriangleAdj,
    /// Patches carry their control-point count (1..=32).
    Patch(u8),
    Unknown(u32),
}

impl InputPrimitive {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => InputPrimitive::Undefined,
            1 => InputPrimitive::Point,
            2 => InputPrimitive::Line,
            3 => InputPrimitive::Triangle,
            6 => InputPrimitive::LineAdj,
            7 => InputPrimitive::TriangleAdj,
            8..=39 => InputPrimitive::Patch((raw - 7) as u8),
            other => InputPrimitive::Unknown(other),
        }
    }
}

/// Geometry-shader output topology (`dcl_outputtopology`), tracked per
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputTopology {
    #[default]
    Undefined,
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    LineListAdj,
    LineStripAdj,
    TriangleListAdj,
    TriangleStripAdj,
    Unknown(u32),
}

impl OutputTopology {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => OutputTopology::Undefined,
            1 => OutputTopology::PointList,
            2 => OutputTopology::LineList,
            3 => OutputTopology::LineStrip,
            4 => OutputTopology::TriangleList,
            5 => OutputTopology::TriangleStrip,
            10 => OutputTopology::LineListAdj,
            11 => OutputTopology::LineStripAdj,
            12 => OutputTopology::TriangleListAdj,
            13 => OutputTopology::TriangleStripAdj,
            other => OutputTopology::Unknown(other),
        }
    }
}

/// Tessellator domain (`dcl_tessellator_domain`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TessDomain {
    #[default]
    Undefined,
    Isoline,
    Triangle,
    Quad,
}

impl TessDomain {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            1 => TessDomain::Isoline,
            2 => TessDomain::Triangle,
            3 => TessDomain::Quad,
            _ => TessDomain::Undefined,
        }
    }
}

/// Tessellator partitioning (`dcl_tessellator_partitioning`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TessPartitioning {
    #[default]
    Undefined,
    Integer,
    Pow2,
    FractionalOdd,
    FractionalEven,
}

impl TessPartitioning {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            1 => TessPartitioning::Integer,
            2 => TessPartitioning::Pow2,
            3 => TessPartitioning::FractionalOdd,
            4 => TessPartitioning::FractionalEven,
            _ => TessPartitioning::Undefined,
        }
    }
}

/// Tessellator output primitive (`dcl_tessellator_output_primitive`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TessOutputPrimitive {
    #[default]
    Undefined,
    Point,
    Line,
    TriangleCw,
    TriangleCcw,
}

impl TessOutputPrimitive {
    pub fn from_raw(raw: u32) -> Self {
        match raw & 0x7 {
            1 => TessOutputPrimitive::Point,
            2 => TessOutputPrimitive::Line,
            3 => TessOutputPrimitive::TriangleCw,
            4 => TessOutputPrimitive::TriangleCcw,
            _ => TessOutputPrimitive::Undefined,
        }
    }
}

/// Resource dimension carried by a resource-dim extended instruction token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceTarget {
    #[default]
    Unknown,
    Buffer,
    Texture1D,
    Texture2D,
    Texture2DMs,
    Texture3D,
    TextureCube,
    Texture1DArray,
    Texture2DArray,
    Texture2DMsArray,
    TextureCubeArray,
    RawBuffer,
    StructuredBuffer,
    Unhandled(u8),
}

impl ResourceTarget {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => ResourceTarget::Unknown,
            1 => ResourceTarget::Buffer,
            2 => ResourceTarget::Texture1D,
            3 => ResourceTarget::Texture2D,
            4 => ResourceTarget::Texture2DMs,
            5 => ResourceTarget::Texture3D,
            6 => ResourceTarget::TextureCube,
            7 => ResourceTarget::Texture1DArray,
            8 => ResourceTarget::Texture2DArray,
            9 => ResourceTarget::Texture2DMsArray,
            10 => ResourceTarget::TextureCubeArray,
            11 => ResourceTarget::RawBuffer,
            12 => ResourceTarget::StructuredBuffer,
            other => ResourceTarget::Unhandled(other),
        }
    }
}

/// Per-opcode declaration payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclPayload {
    None,
    /// Per-component resource return types of `dcl_resource` / `dcl_uav_typed`
    /// (four 4-bit fields, kept as the raw token).
    ResourceReturnType(u32),
    /// System value attached to `dcl_input_siv`-family declarations; only the
    /// low 16 bits of the word are significant.
    SystemValue(u16),
    /// Bare count: `dcl_temps`, `dcl_indexrange`, `dcl_maxout`, instance
    /// counts, `dcl_hs_max_tessfactor`, `dcl_function_body`, and the raw
    /// thread-group-shared-memory byte count.
    Count(u32),
    /// `dcl_indexableTemp x#[count][comps]`.
    IndexableTemp { count: u32, comps: u32 },
    /// Structured stride (and element count where the declaration has one):
    /// `dcl_uav_structured`, `dcl_tgsm_structured`, `dcl_resource_structured`.
    Structured { stride: u32, count: u32 },
    /// `dcl_function_table` body ids.
    FunctionTable(Vec<u32>),
    /// `dcl_interface` descriptor plus its function-table ids.
    Interface {
        id: u32,
        expected_table_len: u32,
        table_len: u16,
        array_len: u16,
        table: Vec<u32>,
    },
    /// `dcl_thread_group x, y, z`.
    ThreadGroup([u32; 3]),
    /// Embedded immediate constant buffer, verbatim little-endian bytes.
    ImmediateConstantBuffer(Vec<u8>),
}

/// A declaration record from the token stream.
///
/// The raw opcode token is retained because several declarations pack their
/// payload into it (global flags, primitive/topology ids, control-point
/// counts, sampler mode); [`Declaration::decl_field`] exposes those bits.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// Raw opcode token, modifiers included.
    pub token: u32,
    pub opcode: u32,
    pub op: Option<Box<Operand>>,
    pub payload: DeclPayload,
}

impl Declaration {
    pub(crate) fn marker(opcode: u32, token: u32) -> Self {
        Declaration {
            token,
            opcode,
            op: None,
            payload: DeclPayload::None,
        }
    }

    /// Opcode-specific bits of the declaration token (everything above the
    /// opcode field, below the length field).
    pub fn decl_field(&self) -> u32 {
        (self.token >> crate::token::OPCODE_DECL_FIELD_SHIFT) & 0x1fff
    }
}

/// An executable instruction record.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Raw opcode token, modifiers included.
    pub token: u32,
    pub opcode: u32,
    /// Immediate texel offsets from a sample-controls extended token.
    pub sample_offset: [i8; 3],
    /// Resource target from a resource-dimension extended token.
    pub resource_target: ResourceTarget,
    /// Per-component return types from a return-type extended token.
    pub resource_return_type: [u8; 4],
    /// Extra count read by `fcall` (interface call).
    pub interface_call_count: Option<u32>,
    /// Operands, in stream order. At most [`MAX_OPERANDS`].
    pub ops: Vec<Operand>,
}

impl Instruction {
    pub(crate) fn new(token: u32) -> Self {
        Instruction {
            token,
            opcode: token & OPCODE_MASK,
            sample_offset: [0; 3],
            resource_target: ResourceTarget::Unknown,
            resource_return_type: [0; 4],
            interface_call_count: None,
            ops: Vec::new(),
        }
    }

    /// Saturate modifier from the opcode token.
    pub fn saturate(&self) -> bool {
        self.token & OPCODE_SATURATE_BIT != 0
    }

    /// Test-boolean modifier: true = test non-zero, false = test zero.
    pub fn test_nonzero(&self) -> bool {
        self.token & OPCODE_TEST_NONZERO_BIT != 0
    }

    pub fn num_ops(&self) -> usize {
        self.ops.len()
    }
}

/// Constant-buffer kind from the reflection chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CBufferType {
    CBuffer,
    TBuffer,
    InterfacePointers,
    ResourceBindInfo,
    Unknown(u32),
}

impl CBufferType {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => CBufferType::CBuffer,
            1 => CBufferType::TBuffer,
            2 => CBufferType::InterfacePointers,
            3 => CBufferType::ResourceBindInfo,
            other => CBufferType::Unknown(other),
        }
    }
}

/// Texture/sampler slots attached to a variable in SM5 reflection data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableBindings {
    pub start_texture: u32,
    pub texture_size: u32,
    pub start_sampler: u32,
    pub sampler_size: u32,
}

/// Type record referenced by a constant-buffer variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableTypeDesc {
    pub class: u16,
    pub ty: u16,
    pub rows: u16,
    pub columns: u16,
    pub elements: u16,
    pub members: u16,
    /// Offset of the first member for struct types.
    pub member_offset: u32,
    /// Name of the scalar/object type, from a static table.
    pub name: &'static str,
}

/// A variable inside a constant buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderVariable<'a> {
    pub name: &'a str,
    pub start_offset: u32,
    pub size: u32,
    pub flags: u32,
    /// Raw default-value bytes inside the resource chunk, `size` bytes long.
    pub default_value: Option<&'a [u8]>,
    /// Present for shader model 5 and newer reflection data.
    pub bindings: Option<VariableBindings>,
    pub type_desc: Option<VariableTypeDesc>,
}

/// A constant buffer (or tbuffer) from the reflection chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantBuffer<'a> {
    pub name: &'a str,
    pub size: u32,
    pub flags: u32,
    pub ty: CBufferType,
    pub vars: Vec<ShaderVariable<'a>>,
    /// Register resolved by name against the resource-binding table.
    pub bind_point: u32,
}

/// One entry of the resource-binding table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBinding<'a> {
    pub name: &'a str,
    pub input_type: u32,
    pub return_type: u32,
    pub dimension: u32,
    pub num_samples: u32,
    pub bind_point: u32,
    pub bind_count: u32,
    pub flags: u32,
}

/// One element of an input/output/patch-constant signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParam<'a> {
    pub semantic_name: &'a str,
    pub semantic_index: u32,
    pub system_value_type: u32,
    pub component_type: u32,
    pub register_index: u32,
    pub mask: u8,
    pub read_write_mask: u8,
    /// Zero for layouts that do not encode a stream.
    pub stream: u32,
    /// Zero for layouts that do not encode a minimum precision.
    pub min_precision: u32,
}

/// The fully decoded shader program.
///
/// Returned by [`crate::parse_shader`]; borrows names out of the caller's
/// chunk buffers.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProgram<'a> {
    pub version: ShaderVersion,
    pub decls: Vec<Declaration>,
    pub insns: Vec<Instruction>,
    pub params_in: Vec<SignatureParam<'a>>,
    pub params_out: Vec<SignatureParam<'a>>,
    pub params_patch: Vec<SignatureParam<'a>>,
    pub cbuffers: Vec<ConstantBuffer<'a>>,
    pub resource_bindings: Vec<ResourceBinding<'a>>,
    pub gs_input_primitive: InputPrimitive,
    /// Output topology per geometry-shader stream. Streams are appended by
    /// `dcl_stream`; plain SM4 geometry shaders get a single implicit slot.
    pub gs_output_topology: Vec<OutputTopology>,
    pub max_gs_output_vertex: u32,
    pub gs_instance_count: u32,
    pub ds_tessellator_output_primitive: TessOutputPrimitive,
    pub ds_tessellator_partitioning: TessPartitioning,
    pub ds_tessellator_domain: TessDomain,
    pub hs_input_control_point_count: u32,
    pub hs_output_control_point_count: u32,
    pub cs_thread_group_size: [u32; 3],
}

impl<'a> ShaderProgram<'a> {
    pub(crate) fn new(version: ShaderVersion) -> Self {
        ShaderProgram {
            version,
            decls: Vec::new(),
            insns: Vec::new(),
            params_in: Vec::new(),
            params_out: Vec::new(),
            params_patch: Vec::new(),
            cbuffers: Vec::new(),
            resource_bindings: Vec::new(),
            gs_input_primitive: InputPrimitive::Undefined,
            gs_output_topology: Vec::new(),
            max_gs_output_vertex: 0,
            gs_instance_count: 0,
            ds_tessellator_output_primitive: TessOutputPrimitive::Undefined,
            ds_tessellator_partitioning: TessPartitioning::Undefined,
            ds_tessellator_domain: TessDomain::Undefined,
            hs_input_control_point_count: 0,
            hs_output_control_point_count: 0,
            cs_thread_group_size: [0; 3],
        }
    }
}

/// Name of a variable type from the reflection type table.
///
/// Matrices and vectors are named by their scalar type; the row/column counts
/// live in the type record itself.
pub fn variable_type_name(ty: u16) -> &'static str {
    match ty {
        0 => "void",
        1 => "bool",
        2 => "int",
        3 => "float",
        4 => "string",
        5 => "texture",
        6 => "texture1d",
        7 => "texture2d",
        8 => "texture3d",
        9 => "texturecube",
        10 => "sampler",
        19 => "uint",
        20 => "uint8",
        25 => "buffer",
        26 => "cbuffer",
        27 => "tbuffer",
        28 => "texture1darray",
        29 => "texture2darray",
        32 => "texture2dms",
        33 => "texture2dmsarray",
        34 => "texturecubearray",
        37 => "interface_pointer",
        39 => "double",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_token_unpacks_fields() {
        // vs_5_0
        let v = ShaderVersion::from_token(0x0001_0050);
        assert_eq!(v.major, 5);
        assert_eq!(v.minor, 0);
        assert_eq!(v.ty, ShaderType::Vertex);

        let v = ShaderVersion::from_token(0x0005_0041);
        assert_eq!(v.major, 4);
        assert_eq!(v.minor, 1);
        assert_eq!(v.ty, ShaderType::Compute);
    }

    #[test]
    fn input_primitive_patch_range() {
        assert_eq!(InputPrimitive::from_raw(3), InputPrimitive::Triangle);
        assert_eq!(InputPrimitive::from_raw(8), InputPrimitive::Patch(1));
        assert_eq!(InputPrimitive::from_raw(39), InputPrimitive::Patch(32));
        assert_eq!(InputPrimitive::from_raw(5), InputPrimitive::Unknown(5));
        assert_eq!(InputPrimitive::from_raw(40), InputPrimitive::Unknown(40));
    }

    #[test]
    fn saturate_and_test_bits_come_from_the_token() {
        let insn = Instruction::new(crate::token::OPCODE_MOV | OPCODE_SATURATE_BIT);
        assert!(insn.saturate());
        assert!(!insn.test_nonzero());

        let insn = Instruction::new(crate::token::OPCODE_IF | OPCODE_TEST_NONZERO_BIT);
        assert!(insn.test_nonzero());
    }
}
