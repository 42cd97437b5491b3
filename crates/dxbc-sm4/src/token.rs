//! SM4/SM5 token bit layouts and opcode numbering.
//!
//! The shader-code chunk is a stream of 32-bit tokens. Opcodes, operand
//! kinds, and modifier fields are packed into those tokens as numeric IDs;
//! the constants here follow the tokenized program format from the Windows
//! SDK headers `d3d10tokenizedprogramformat.h` / `d3d11tokenizedprogramformat.h`.
//! Decoding goes through explicit shifts and masks rather than bitfield
//! structs, which are not portable across compilers.

// ---- Opcode token (first DWORD of every instruction/declaration) ----

/// Low 11 bits of an opcode token.
pub const OPCODE_MASK: u32 = 0x7ff;

/// Instruction length in DWORDs (including the opcode token), bits 24..=30.
pub const OPCODE_LENGTH_SHIFT: u32 = 24;
pub const OPCODE_LENGTH_MASK: u32 = 0x7f;

/// Saturate modifier for arithmetic instructions.
pub const OPCODE_SATURATE_BIT: u32 = 1 << 13;

/// Test-boolean field for conditional instructions (`if`, `discard`, ...):
/// set = test non-zero, clear = test zero.
pub const OPCODE_TEST_NONZERO_BIT: u32 = 1 << 18;

/// If set, one or more extended opcode tokens follow.
pub const OPCODE_EXTENDED_BIT: u32 = 0x8000_0000;

/// Declaration-specific payload fields start at bit 11.
pub const OPCODE_DECL_FIELD_SHIFT: u32 = 11;

/// Number of opcodes in the tokenized program table (SM5). Anything at or
/// past this value cannot come from a well-formed stream.
pub const OPCODE_COUNT: u32 = 207;

// ---- Extended opcode tokens ----

/// Extended opcode token type, bits 0..=5.
pub const EXT_OPCODE_TYPE_MASK: u32 = 0x3f;

pub const EXT_OPCODE_EMPTY: u32 = 0;
/// Immediate texel-space offsets for sample/load instructions.
pub const EXT_OPCODE_SAMPLE_CONTROLS: u32 = 1;
/// Resource dimension for SM5 instructions that carry one inline.
pub const EXT_OPCODE_RESOURCE_DIM: u32 = 2;
/// Per-component resource return type.
pub const EXT_OPCODE_RESOURCE_RETURN_TYPE: u32 = 3;

/// Sample-control offsets are signed 4-bit fields at bits 9/13/17.
pub const EXT_SAMPLE_OFFSET_U_SHIFT: u32 = 9;
pub const EXT_SAMPLE_OFFSET_V_SHIFT: u32 = 13;
pub const EXT_SAMPLE_OFFSET_W_SHIFT: u32 = 17;

/// Resource dimension, bits 6..=10 of a `RESOURCE_DIM` extended token.
pub const EXT_RESOURCE_DIM_SHIFT: u32 = 6;
pub const EXT_RESOURCE_DIM_MASK: u32 = 0x1f;

/// Return-type components are 4-bit fields starting at bit 6.
pub const EXT_RETURN_TYPE_SHIFT: u32 = 6;
pub const EXT_RETURN_TYPE_COMPONENT_BITS: u32 = 4;
pub const EXT_RETURN_TYPE_COMPONENT_MASK: u32 = 0xf;

// ---- Operand tokens ----

/// Component count enum, bits 0..=1: 0, 1, 4, or N components.
pub const OPERAND_COMPS_MASK: u32 = 0x3;
pub const OPERAND_COMPS_0: u32 = 0;
pub const OPERAND_COMPS_1: u32 = 1;
pub const OPERAND_COMPS_4: u32 = 2;

/// Component selection mode for 4-component operands, bits 2..=3.
pub const OPERAND_MODE_SHIFT: u32 = 2;
pub const OPERAND_MODE_MASK: u32 = 0x3;
pub const OPERAND_MODE_MASKED: u32 = 0;
pub const OPERAND_MODE_SWIZZLE: u32 = 1;
pub const OPERAND_MODE_SCALAR: u32 = 2;

/// Component selection field, bits 4..=11. Interpretation depends on the
/// selection mode: a 4-bit write mask, four 2-bit swizzle lanes, or a single
/// 2-bit scalar index.
pub const OPERAND_SEL_SHIFT: u32 = 4;
pub const OPERAND_SEL_MASK: u32 = 0xff;

/// Operand type, bits 12..=19.
pub const OPERAND_TYPE_SHIFT: u32 = 12;
pub const OPERAND_TYPE_MASK: u32 = 0xff;

/// Number of register indices (0..=3), bits 20..=21.
pub const OPERAND_NUM_INDICES_SHIFT: u32 = 20;
pub const OPERAND_NUM_INDICES_MASK: u32 = 0x3;

/// Index representation fields, 3 bits each at bits 22/25/28.
pub const OPERAND_INDEX_REPR_SHIFTS: [u32; 3] = [22, 25, 28];
pub const OPERAND_INDEX_REPR_MASK: u32 = 0x7;

/// If set, one extended operand token follows.
pub const OPERAND_EXTENDED_BIT: u32 = 0x8000_0000;

pub fn operand_sel_mask(sel: u32) -> u8 {
    (sel & 0xf) as u8
}

pub fn operand_sel_swizzle(sel: u32, lane: u32) -> u8 {
    ((sel >> (lane * 2)) & 0x3) as u8
}

pub fn operand_sel_scalar(sel: u32) -> u8 {
    (sel & 0x3) as u8
}

// ---- Extended operand tokens ----

/// Extended operand token type, bits 0..=5 (0 = empty, 1 = modifier).
pub const EXT_OPERAND_TYPE_MASK: u32 = 0x3f;
pub const EXT_OPERAND_EMPTY: u32 = 0;
pub const EXT_OPERAND_MODIFIER: u32 = 1;

pub const EXT_OPERAND_NEG_BIT: u32 = 1 << 6;
pub const EXT_OPERAND_ABS_BIT: u32 = 1 << 7;

// ---- Index representations ----

pub const INDEX_REPR_IMM32: u32 = 0;
pub const INDEX_REPR_IMM64: u32 = 1;
pub const INDEX_REPR_RELATIVE: u32 = 2;
pub const INDEX_REPR_IMM32_PLUS_RELATIVE: u32 = 3;
pub const INDEX_REPR_IMM64_PLUS_RELATIVE: u32 = 4;

// ---- Operand types ----

pub const OPERAND_TYPE_TEMP: u32 = 0;
pub const OPERAND_TYPE_INPUT: u32 = 1;
pub const OPERAND_TYPE_OUTPUT: u32 = 2;
pub const OPERAND_TYPE_INDEXABLE_TEMP: u32 = 3;
pub const OPERAND_TYPE_IMMEDIATE32: u32 = 4;
pub const OPERAND_TYPE_IMMEDIATE64: u32 = 5;
pub const OPERAND_TYPE_SAMPLER: u32 = 6;
pub const OPERAND_TYPE_RESOURCE: u32 = 7;
pub const OPERAND_TYPE_CONSTANT_BUFFER: u32 = 8;
pub const OPERAND_TYPE_IMMEDIATE_CONSTANT_BUFFER: u32 = 9;
pub const OPERAND_TYPE_LABEL: u32 = 10;
pub const OPERAND_TYPE_INPUT_PRIMITIVEID: u32 = 11;
pub const OPERAND_TYPE_OUTPUT_DEPTH: u32 = 12;
pub const OPERAND_TYPE_NULL: u32 = 13;
pub const OPERAND_TYPE_RASTERIZER: u32 = 14;
pub const OPERAND_TYPE_OUTPUT_COVERAGE_MASK: u32 = 15;
pub const OPERAND_TYPE_STREAM: u32 = 16;
pub const OPERAND_TYPE_FUNCTION_BODY: u32 = 17;
pub const OPERAND_TYPE_FUNCTION_TABLE: u32 = 18;
pub const OPERAND_TYPE_INTERFACE: u32 = 19;
pub const OPERAND_TYPE_FUNCTION_INPUT: u32 = 20;
pub const OPERAND_TYPE_FUNCTION_OUTPUT: u32 = 21;
pub const OPERAND_TYPE_OUTPUT_CONTROL_POINT_ID: u32 = 22;
pub const OPERAND_TYPE_INPUT_FORK_INSTANCE_ID: u32 = 23;
pub const OPERAND_TYPE_INPUT_JOIN_INSTANCE_ID: u32 = 24;
pub const OPERAND_TYPE_INPUT_CONTROL_POINT: u32 = 25;
pub const OPERAND_TYPE_OUTPUT_CONTROL_POINT: u32 = 26;
pub const OPERAND_TYPE_INPUT_PATCH_CONSTANT: u32 = 27;
pub const OPERAND_TYPE_INPUT_DOMAIN_POINT: u32 = 28;
pub const OPERAND_TYPE_THIS_POINTER: u32 = 29;
pub const OPERAND_TYPE_UNORDERED_ACCESS_VIEW: u32 = 30;
pub const OPERAND_TYPE_THREAD_GROUP_SHARED_MEMORY: u32 = 31;
pub const OPERAND_TYPE_INPUT_THREAD_ID: u32 = 32;
pub const OPERAND_TYPE_INPUT_THREAD_GROUP_ID: u32 = 33;
pub const OPERAND_TYPE_INPUT_THREAD_ID_IN_GROUP: u32 = 34;
pub const OPERAND_TYPE_INPUT_COVERAGE_MASK: u32 = 35;
pub const OPERAND_TYPE_INPUT_THREAD_ID_IN_GROUP_FLATTENED: u32 = 36;
pub const OPERAND_TYPE_INPUT_GS_INSTANCE_ID: u32 = 37;
pub const OPERAND_TYPE_OUTPUT_DEPTH_GREATER_EQUAL: u32 = 38;
pub const OPERAND_TYPE_OUTPUT_DEPTH_LESS_EQUAL: u32 = 39;
pub const OPERAND_TYPE_CYCLE_COUNTER: u32 = 40;

/// Number of operand types in the SM5 table.
pub const OPERAND_TYPE_COUNT: u32 = 41;

// ---- Opcodes ----
//
// The instruction opcodes below are the subset the decoder treats specially
// or that shows up in diagnostics; declarations are listed in full because
// classification and payload dispatch key off them.

pub const OPCODE_ADD: u32 = 0;
pub const OPCODE_CUT: u32 = 9;
pub const OPCODE_DISCARD: u32 = 13;
pub const OPCODE_DP3: u32 = 16;
pub const OPCODE_DP4: u32 = 17;
pub const OPCODE_ELSE: u32 = 18;
pub const OPCODE_EMIT: u32 = 19;
pub const OPCODE_ENDIF: u32 = 21;
pub const OPCODE_ENDLOOP: u32 = 22;
pub const OPCODE_IF: u32 = 31;
pub const OPCODE_LD: u32 = 45;
pub const OPCODE_LOOP: u32 = 48;
pub const OPCODE_MAD: u32 = 50;
pub const OPCODE_MIN: u32 = 51;
pub const OPCODE_MAX: u32 = 52;

/// Non-executable custom-data block. The only custom data the decoder models
/// is the embedded immediate constant buffer, which is how the HLSL compiler
/// emits `dcl_immediateConstantBuffer { ... }`.
pub const OPCODE_IMMEDIATE_CONSTANT_BUFFER: u32 = 53;

pub const OPCODE_MOV: u32 = 54;
pub const OPCODE_MOVC: u32 = 55;
pub const OPCODE_MUL: u32 = 56;
pub const OPCODE_NOP: u32 = 58;
pub const OPCODE_RET: u32 = 62;
pub const OPCODE_RSQ: u32 = 68;
pub const OPCODE_SAMPLE: u32 = 69;
pub const OPCODE_SAMPLE_L: u32 = 72;

// Declarations, first range: 88..=106.
pub const OPCODE_DCL_RESOURCE: u32 = 88;
pub const OPCODE_DCL_CONSTANT_BUFFER: u32 = 89;
pub const OPCODE_DCL_SAMPLER: u32 = 90;
pub const OPCODE_DCL_INDEX_RANGE: u32 = 91;
pub const OPCODE_DCL_GS_OUTPUT_PRIMITIVE_TOPOLOGY: u32 = 92;
pub const OPCODE_DCL_GS_INPUT_PRIMITIVE: u32 = 93;
pub const OPCODE_DCL_MAX_OUTPUT_VERTEX_COUNT: u32 = 94;
pub const OPCODE_DCL_INPUT: u32 = 95;
pub const OPCODE_DCL_INPUT_SGV: u32 = 96;
pub const OPCODE_DCL_INPUT_SIV: u32 = 97;
pub const OPCODE_DCL_INPUT_PS: u32 = 98;
pub const OPCODE_DCL_INPUT_PS_SGV: u32 = 99;
pub const OPCODE_DCL_INPUT_PS_SIV: u32 = 100;
pub const OPCODE_DCL_OUTPUT: u32 = 101;
pub const OPCODE_DCL_OUTPUT_SGV: u32 = 102;
pub const OPCODE_DCL_OUTPUT_SIV: u32 = 103;
pub const OPCODE_DCL_TEMPS: u32 = 104;
pub const OPCODE_DCL_INDEXABLE_TEMP: u32 = 105;
pub const OPCODE_DCL_GLOBAL_FLAGS: u32 = 106;

// Hull-shader phase markers.
pub const OPCODE_HS_DECLS: u32 = 113;
pub const OPCODE_HS_CONTROL_POINT_PHASE: u32 = 114;
pub const OPCODE_HS_FORK_PHASE: u32 = 115;
pub const OPCODE_HS_JOIN_PHASE: u32 = 116;

/// `fcall` through an interface function pointer; carries an extra count.
pub const OPCODE_INTERFACE_CALL: u32 = 120;

// Declarations, second range: 143..=162.
pub const OPCODE_DCL_STREAM: u32 = 143;
pub const OPCODE_DCL_FUNCTION_BODY: u32 = 144;
pub const OPCODE_DCL_FUNCTION_TABLE: u32 = 145;
pub const OPCODE_DCL_INTERFACE: u32 = 146;
pub const OPCODE_DCL_INPUT_CONTROL_POINT_COUNT: u32 = 147;
pub const OPCODE_DCL_OUTPUT_CONTROL_POINT_COUNT: u32 = 148;
pub const OPCODE_DCL_TESS_DOMAIN: u32 = 149;
pub const OPCODE_DCL_TESS_PARTITIONING: u32 = 150;
pub const OPCODE_DCL_TESS_OUTPUT_PRIMITIVE: u32 = 151;
pub const OPCODE_DCL_HS_MAX_TESSFACTOR: u32 = 152;
pub const OPCODE_DCL_HS_FORK_PHASE_INSTANCE_COUNT: u32 = 153;
pub const OPCODE_DCL_HS_JOIN_PHASE_INSTANCE_COUNT: u32 = 154;
pub const OPCODE_DCL_THREAD_GROUP: u32 = 155;
pub const OPCODE_DCL_UAV_TYPED: u32 = 156;
pub const OPCODE_DCL_UAV_RAW: u32 = 157;
pub const OPCODE_DCL_UAV_STRUCTURED: u32 = 158;
pub const OPCODE_DCL_TGSM_RAW: u32 = 159;
pub const OPCODE_DCL_TGSM_STRUCTURED: u32 = 160;
pub const OPCODE_DCL_RESOURCE_RAW: u32 = 161;
pub const OPCODE_DCL_RESOURCE_STRUCTURED: u32 = 162;

/// Geometry-shader instance count (SM5); a declaration outside both ranges.
pub const OPCODE_DCL_GS_INSTANCE_COUNT: u32 = 206;

/// Returns true for opcodes that are declarations rather than instructions.
///
/// Hull-shader phase markers and `customdata` blocks are handled before this
/// classification and are deliberately not part of it.
pub fn is_declaration(opcode: u32) -> bool {
    (OPCODE_DCL_RESOURCE..=OPCODE_DCL_GLOBAL_FLAGS).contains(&opcode)
        || (OPCODE_DCL_STREAM..=OPCODE_DCL_RESOURCE_STRUCTURED).contains(&opcode)
        || opcode == OPCODE_DCL_GS_INSTANCE_COUNT
}

/// Human-friendly mnemonic for diagnostics ("unknown opcode 95" is much less
/// useful than "dcl_input"). Instructions the decoder has no special handling
/// for are mostly absent; the table grows as needed.
pub fn opcode_name(opcode: u32) -> Option<&'static str> {
    Some(match opcode {
        OPCODE_ADD => "add",
        OPCODE_CUT => "cut",
        OPCODE_DISCARD => "discard",
        OPCODE_DP3 => "dp3",
        OPCODE_DP4 => "dp4",
        OPCODE_ELSE => "else",
        OPCODE_EMIT => "emit",
        OPCODE_ENDIF => "endif",
        OPCODE_ENDLOOP => "endloop",
        OPCODE_IF => "if",
        OPCODE_LD => "ld",
        OPCODE_LOOP => "loop",
        OPCODE_MAD => "mad",
        OPCODE_MIN => "min",
        OPCODE_MAX => "max",
        OPCODE_IMMEDIATE_CONSTANT_BUFFER => "customdata",
        OPCODE_MOV => "mov",
        OPCODE_MOVC => "movc",
        OPCODE_MUL => "mul",
        OPCODE_NOP => "nop",
        OPCODE_RET => "ret",
        OPCODE_RSQ => "rsq",
        OPCODE_SAMPLE => "sample",
        OPCODE_SAMPLE_L => "sample_l",
        OPCODE_DCL_RESOURCE => "dcl_resource",
        OPCODE_DCL_CONSTANT_BUFFER => "dcl_constantbuffer",
        OPCODE_DCL_SAMPLER => "dcl_sampler",
        OPCODE_DCL_INDEX_RANGE => "dcl_indexrange",
        OPCODE_DCL_GS_OUTPUT_PRIMITIVE_TOPOLOGY => "dcl_outputtopology",
        OPCODE_DCL_GS_INPUT_PRIMITIVE => "dcl_inputprimitive",
        OPCODE_DCL_MAX_OUTPUT_VERTEX_COUNT => "dcl_maxout",
        OPCODE_DCL_INPUT => "dcl_input",
        OPCODE_DCL_INPUT_SGV => "dcl_input_sgv",
        OPCODE_DCL_INPUT_SIV => "dcl_input_siv",
        OPCODE_DCL_INPUT_PS => "dcl_input_ps",
        OPCODE_DCL_INPUT_PS_SGV => "dcl_input_ps_sgv",
        OPCODE_DCL_INPUT_PS_SIV => "dcl_input_ps_siv",
        OPCODE_DCL_OUTPUT => "dcl_output",
        OPCODE_DCL_OUTPUT_SGV => "dcl_output_sgv",
        OPCODE_DCL_OUTPUT_SIV => "dcl_output_siv",
        OPCODE_DCL_TEMPS => "dcl_temps",
        OPCODE_DCL_INDEXABLE_TEMP => "dcl_indexableTemp",
        OPCODE_DCL_GLOBAL_FLAGS => "dcl_globalFlags",
        OPCODE_HS_DECLS => "hs_decls",
        OPCODE_HS_CONTROL_POINT_PHASE => "hs_control_point_phase",
        OPCODE_HS_FORK_PHASE => "hs_fork_phase",
        OPCODE_HS_JOIN_PHASE => "hs_join_phase",
        OPCODE_INTERFACE_CALL => "fcall",
        OPCODE_DCL_STREAM => "dcl_stream",
        OPCODE_DCL_FUNCTION_BODY => "dcl_function_body",
        OPCODE_DCL_FUNCTION_TABLE => "dcl_function_table",
        OPCODE_DCL_INTERFACE => "dcl_interface",
        OPCODE_DCL_INPUT_CONTROL_POINT_COUNT => "dcl_input_control_point_count",
        OPCODE_DCL_OUTPUT_CONTROL_POINT_COUNT => "dcl_output_control_point_count",
        OPCODE_DCL_TESS_DOMAIN => "dcl_tessellator_domain",
        OPCODE_DCL_TESS_PARTITIONING => "dcl_tessellator_partitioning",
        OPCODE_DCL_TESS_OUTPUT_PRIMITIVE => "dcl_tessellator_output_primitive",
        OPCODE_DCL_HS_MAX_TESSFACTOR => "dcl_hs_max_tessfactor",
        OPCODE_DCL_HS_FORK_PHASE_INSTANCE_COUNT => "dcl_hs_fork_phase_instance_count",
        OPCODE_DCL_HS_JOIN_PHASE_INSTANCE_COUNT => "dcl_hs_join_phase_instance_count",
        OPCODE_DCL_THREAD_GROUP => "dcl_thread_group",
        OPCODE_DCL_UAV_TYPED => "dcl_uav_typed",
        OPCODE_DCL_UAV_RAW => "dcl_uav_raw",
        OPCODE_DCL_UAV_STRUCTURED => "dcl_uav_structured",
        OPCODE_DCL_TGSM_RAW => "dcl_tgsm_raw",
        OPCODE_DCL_TGSM_STRUCTURED => "dcl_tgsm_structured",
        OPCODE_DCL_RESOURCE_RAW => "dcl_resource_raw",
        OPCODE_DCL_RESOURCE_STRUCTURED => "dcl_resource_structured",
        OPCODE_DCL_GS_INSTANCE_COUNT => "dcl_gs_instance_count",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declaration_classification_covers_both_ranges() {
        assert!(is_declaration(OPCODE_DCL_RESOURCE));
        assert!(is_declaration(OPCODE_DCL_GLOBAL_FLAGS));
        assert!(is_declaration(OPCODE_DCL_STREAM));
        assert!(is_declaration(OPCODE_DCL_RESOURCE_STRUCTURED));
        assert!(is_declaration(OPCODE_DCL_GS_INSTANCE_COUNT));

        assert!(!is_declaration(OPCODE_MOV));
        assert!(!is_declaration(OPCODE_RET));
        assert!(!is_declaration(OPCODE_HS_DECLS));
        assert!(!is_declaration(OPCODE_HS_FORK_PHASE));
        assert!(!is_declaration(OPCODE_IMMEDIATE_CONSTANT_BUFFER));
        assert!(!is_declaration(OPCODE_INTERFACE_CALL));
    }

    #[test]
    fn opcode_name_covers_all_declarations() {
        for opcode in 0..OPCODE_COUNT {
            if is_declaration(opcode) {
                assert!(
                    opcode_name(opcode).is_some(),
                    "declaration opcode {opcode} has no mnemonic"
                );
            }
        }
    }

    #[test]
    fn selection_helpers_extract_expected_lanes() {
        // .yzwx swizzle: lanes 1,2,3,0 -> 0b00_11_10_01.
        let sel = 0b0011_1001u32;
        assert_eq!(operand_sel_swizzle(sel, 0), 1);
        assert_eq!(operand_sel_swizzle(sel, 1), 2);
        assert_eq!(operand_sel_swizzle(sel, 2), 3);
        assert_eq!(operand_sel_swizzle(sel, 3), 0);
        assert_eq!(operand_sel_mask(0b1010), 0b1010);
        assert_eq!(operand_sel_scalar(0b10), 2);
    }
}
