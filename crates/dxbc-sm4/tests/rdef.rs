//! Resource-definition chunk tests with hand-assembled RDEF payloads.

use pretty_assertions::assert_eq;

use dxbc_sm4::test_utils::{opcode_token, program_tokens, shader_bytes};
use dxbc_sm4::token::OPCODE_RET;
use dxbc_sm4::{parse_shader, CBufferType, Container, FourCC, ParseError, ShaderType, TaggedChunk};

fn push_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_le_bytes());
}

/// Minimal `ret`-only shader so the RDEF decoder sees the wanted version.
fn shader_code(major: u8) -> Vec<u8> {
    shader_bytes(&program_tokens(
        major,
        0,
        ShaderType::Pixel,
        &[opcode_token(OPCODE_RET, 1)],
    ))
}

fn rdef_header(out: &mut Vec<u8>, num_cb: u32, cb_offset: u32, num_bindings: u32, binding_offset: u32) {
    push_u32(out, num_cb);
    push_u32(out, cb_offset);
    push_u32(out, num_bindings);
    push_u32(out, binding_offset);
    push_u32(out, 0x0400); // shader model word (read but not trusted)
    push_u32(out, 0); // compile flags
}

fn binding_record(out: &mut Vec<u8>, name_offset: u32, input_type: u32, bind_point: u32) {
    push_u32(out, name_offset);
    push_u32(out, input_type);
    push_u32(out, 0); // return type
    push_u32(out, 0); // dimension
    push_u32(out, 0); // num samples
    push_u32(out, bind_point);
    push_u32(out, 1); // bind count
    push_u32(out, 0); // flags
}

/// Classic (pre-SM5) 24-byte variable record.
fn var_record(out: &mut Vec<u8>, name_offset: u32, start_offset: u32, size: u32) {
    push_u32(out, name_offset);
    push_u32(out, start_offset);
    push_u32(out, size);
    push_u32(out, 0); // flags
    push_u32(out, 0); // type offset
    push_u32(out, 0); // default value offset
}

/// Chunk used by the ordering tests: one cbuffer "Params" with variables
/// A/B/C declared out of offset order, bound at b2.
fn out_of_order_chunk(cb_type: u32) -> Vec<u8> {
    let mut chunk = Vec::new();
    rdef_header(&mut chunk, 1, 24, 1, 48);
    // cbuffer record at 24
    push_u32(&mut chunk, 152); // name "Params"
    push_u32(&mut chunk, 3); // var count
    push_u32(&mut chunk, 80); // var table offset
    push_u32(&mut chunk, 48); // size
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, cb_type);
    // binding table at 48
    binding_record(&mut chunk, 152, 0, 2);
    // variable table at 80
    var_record(&mut chunk, 159, 32, 16); // A
    var_record(&mut chunk, 161, 0, 16); // B
    var_record(&mut chunk, 163, 16, 16); // C
    // strings at 152
    chunk.extend_from_slice(b"Params\0");
    chunk.extend_from_slice(b"A\0");
    chunk.extend_from_slice(b"B\0");
    chunk.extend_from_slice(b"C\0");
    chunk
}

#[test]
fn cbuffer_variables_are_sorted_by_start_offset() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(0);
    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let program = parse_shader(&container).unwrap();
    assert_eq!(program.resource_bindings.len(), 1);
    assert_eq!(program.resource_bindings[0].name, "Params");

    let cb = &program.cbuffers[0];
    assert_eq!(cb.name, "Params");
    assert_eq!(cb.ty, CBufferType::CBuffer);
    assert_eq!(cb.size, 48);
    assert_eq!(cb.bind_point, 2);

    let names: Vec<&str> = cb.vars.iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["B", "C", "A"]);
    let offsets: Vec<u32> = cb.vars.iter().map(|v| v.start_offset).collect();
    assert_eq!(offsets, vec![0, 16, 32]);
}

#[test]
fn tbuffer_variables_keep_declaration_order() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(1);
    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let program = parse_shader(&container).unwrap();
    let cb = &program.cbuffers[0];
    assert_eq!(cb.ty, CBufferType::TBuffer);
    let names: Vec<&str> = cb.vars.iter().map(|v| v.name).collect();
    assert_eq!(names, vec!["A", "B", "C"]);
}

#[test]
fn sm5_variable_records_carry_bindings_types_and_defaults() {
    let code = shader_code(5);

    let mut chunk = Vec::new();
    rdef_header(&mut chunk, 1, 24, 1, 88);
    // cbuffer record at 24
    push_u32(&mut chunk, 120); // name "cbLights"
    push_u32(&mut chunk, 1); // var count
    push_u32(&mut chunk, 48); // var table offset
    push_u32(&mut chunk, 16); // size
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // cbuffer
    // variable record at 48 (40 bytes: SM5 layout)
    push_u32(&mut chunk, 129); // name "gColor"
    push_u32(&mut chunk, 0); // start offset
    push_u32(&mut chunk, 16); // size
    push_u32(&mut chunk, 2); // flags (used)
    push_u32(&mut chunk, 136); // type offset
    push_u32(&mut chunk, 152); // default value offset
    push_u32(&mut chunk, 1); // start texture
    push_u32(&mut chunk, 2); // texture size
    push_u32(&mut chunk, 3); // start sampler
    push_u32(&mut chunk, 4); // sampler size
    // binding table at 88
    binding_record(&mut chunk, 120, 0, 7);
    // strings at 120
    chunk.extend_from_slice(b"cbLights\0"); // 120..129
    chunk.extend_from_slice(b"gColor\0"); // 129..136
    // type record at 136: vector float1x4, member offset split high/low
    push_u16(&mut chunk, 1); // class: vector
    push_u16(&mut chunk, 3); // type: float
    push_u16(&mut chunk, 1); // rows
    push_u16(&mut chunk, 4); // columns
    push_u16(&mut chunk, 0); // elements
    push_u16(&mut chunk, 0); // members
    push_u16(&mut chunk, 0x0001); // member offset, high half first
    push_u16(&mut chunk, 0x0002);
    // default value at 152
    for v in [1.0f32, 0.5, 0.25, 1.0] {
        chunk.extend_from_slice(&v.to_bits().to_le_bytes());
    }

    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let program = parse_shader(&container).unwrap();
    let cb = &program.cbuffers[0];
    assert_eq!(cb.name, "cbLights");
    assert_eq!(cb.bind_point, 7);

    let var = &cb.vars[0];
    assert_eq!(var.name, "gColor");
    assert_eq!(var.size, 16);

    let bindings = var.bindings.unwrap();
    assert_eq!(bindings.start_texture, 1);
    assert_eq!(bindings.texture_size, 2);
    assert_eq!(bindings.start_sampler, 3);
    assert_eq!(bindings.sampler_size, 4);

    let ty = var.type_desc.unwrap();
    assert_eq!(ty.class, 1);
    assert_eq!(ty.ty, 3);
    assert_eq!(ty.rows, 1);
    assert_eq!(ty.columns, 4);
    assert_eq!(ty.name, "float");
    assert_eq!(ty.member_offset, 0x0001_0002);

    let default = var.default_value.unwrap();
    assert_eq!(default.len(), 16);
    assert_eq!(&default[..4], &1.0f32.to_bits().to_le_bytes());
}

#[test]
fn sm4_variable_records_have_no_slot_bindings() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(0);
    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let program = parse_shader(&container).unwrap();
    for var in &program.cbuffers[0].vars {
        assert_eq!(var.bindings, None);
        assert_eq!(var.type_desc, None);
        assert_eq!(var.default_value, None);
    }
}

#[test]
fn missing_bind_point_is_an_error() {
    let code = shader_code(4);

    let mut chunk = Vec::new();
    rdef_header(&mut chunk, 1, 24, 1, 48);
    // cbuffer "Globals" with no variables
    push_u32(&mut chunk, 80); // name "Globals"
    push_u32(&mut chunk, 0); // var count
    push_u32(&mut chunk, 0); // var offset
    push_u32(&mut chunk, 0); // size
    push_u32(&mut chunk, 0); // flags
    push_u32(&mut chunk, 0); // type
    // binding table names something else
    binding_record(&mut chunk, 88, 2, 0);
    chunk.extend_from_slice(b"Globals\0"); // 80..88
    chunk.extend_from_slice(b"tDiffuse\0"); // 88..

    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let err = parse_shader(&container).unwrap_err();
    assert_eq!(
        err,
        ParseError::BindPointNotFound {
            name: "Globals".to_owned()
        }
    );
}

#[test]
fn wrong_chunk_tag_is_rejected() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(0);
    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC(*b"RDEX"),
            data: &chunk,
        }),
        ..Container::default()
    };

    let err = parse_shader(&container).unwrap_err();
    assert_eq!(
        err,
        ParseError::BadMagic {
            expected: FourCC::RDEF,
            found: FourCC(*b"RDEX"),
        }
    );
}

#[test]
fn truncated_chunk_is_rejected() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(0);

    for cut in [0, 8, 23, 30, 60, 100] {
        let container = Container {
            shader_code: &code,
            resources: Some(TaggedChunk {
                fourcc: FourCC::RDEF,
                data: &chunk[..cut],
            }),
            ..Container::default()
        };
        assert!(
            parse_shader(&container).is_err(),
            "prefix of {cut} bytes parsed successfully"
        );
    }
}

#[test]
fn names_are_borrowed_from_the_chunk() {
    let code = shader_code(4);
    let chunk = out_of_order_chunk(0);
    let container = Container {
        shader_code: &code,
        resources: Some(TaggedChunk {
            fourcc: FourCC::RDEF,
            data: &chunk,
        }),
        ..Container::default()
    };

    let program = parse_shader(&container).unwrap();
    let range = chunk.as_ptr() as usize..chunk.as_ptr() as usize + chunk.len();
    for name in [program.cbuffers[0].name, program.resource_bindings[0].name] {
        assert!(
            range.contains(&(name.as_ptr() as usize)),
            "name {name:?} is not borrowed from the chunk"
        );
    }
}
