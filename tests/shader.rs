mod common;

use common::headless;
use nalgebra::{Matrix4, Vector3};
use serial_test::serial;
use staplegl::backend::UniformValue;
use staplegl::error::ShaderError;
use staplegl::{
    DrawHint, IndexBuffer, InstanceBuffer, PrimitiveMode, ShaderDataType, ShaderProgram,
    ShaderSource, ShaderStage, VertexArray, VertexAttribute, VertexBuffer, VertexBufferLayout,
    draw_arrays, draw_elements, draw_elements_instanced,
};

const SOURCE: &str = r"
#type vertex
#version 410 core
layout(location = 0) in vec3 a_position;
uniform mat4 u_model;
void main() { gl_Position = u_model * vec4(a_position, 1.0); }

#type fragment
#version 410 core
uniform vec4 u_color;
uniform float u_time;
uniform int u_texture;
out vec4 color;
void main() { color = u_color; }
";

#[test]
fn builds_program_from_combined_source() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();

    assert_eq!(shader.name(), "flat");
    assert_eq!(shader.stages().len(), 2);
    assert_eq!(shader[0].stage, ShaderStage::Vertex);
    assert!(shader[1].source.starts_with("#version 410 core"));

    // stage objects don't outlive linking
    assert_eq!(backend.live_shaders(), 0);
    assert_eq!(backend.live_programs(), 1);
}

#[test]
fn uniforms_reach_the_bound_program() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    shader.bind();
    assert_eq!(backend.current_program(), Some(shader.id()));

    let model = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
    shader.upload_uniform_mat4("u_model", &model);
    shader.upload_uniform4f("u_color", 1.0, 0.5, 0.25, 1.0);
    shader.upload_uniform1f("u_time", 2.5);
    shader.upload_uniform1i("u_texture", 4);

    let Some(UniformValue::Mat4 { transpose, value }) = backend.uniform_value(shader.id(), "u_model")
    else {
        panic!("u_model was not uploaded");
    };
    assert!(!transpose);
    // column-major, so the translation is the last column
    assert_eq!(value[12..15], [1.0, 2.0, 3.0]);

    assert_eq!(
        backend.uniform_value(shader.id(), "u_color"),
        Some(UniformValue::Vec4([1.0, 0.5, 0.25, 1.0]))
    );
    assert_eq!(
        backend.uniform_value(shader.id(), "u_time"),
        Some(UniformValue::Float(2.5))
    );
    assert_eq!(
        backend.uniform_value(shader.id(), "u_texture"),
        Some(UniformValue::Int(4))
    );
    assert_eq!(backend.pending_errors(), 0);
}

#[test]
fn missing_uniform_is_skipped() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    shader.bind();

    assert_eq!(shader.uniform_location("u_missing"), None);
    shader.upload_uniform3f("u_missing", 1.0, 1.0, 1.0);
    shader.upload_uniform2f("u_missing", 1.0, 1.0);

    assert_eq!(backend.pending_errors(), 0);
    assert!(shader.uniform_location("u_time").is_some());
}

#[test]
fn compile_failure_cleans_up() {
    let (ctx, backend) = headless();
    let source = "#type vertex\nvoid main() {}\n#type fragment\n// nothing here\n";
    let result = ShaderProgram::from_source(&ctx, "broken", source);

    assert!(matches!(
        result,
        Err(ShaderError::Compile {
            stage: ShaderStage::Fragment,
            ..
        })
    ));
    assert_eq!(backend.live_shaders(), 0);
    assert_eq!(backend.live_programs(), 0);
}

#[test]
fn program_needs_a_stage() {
    let (ctx, backend) = headless();

    let result = ShaderProgram::from_source(&ctx, "empty", "void main() {}");
    assert!(matches!(result, Err(ShaderError::NoStages { name }) if name == "empty"));

    let result = ShaderProgram::from_stages(&ctx, "empty", Vec::new());
    assert!(matches!(result, Err(ShaderError::NoStages { .. })));
    assert_eq!(backend.live_programs(), 0);
}

#[test]
fn explicit_stages_are_compiled_in_order() {
    let (ctx, _backend) = headless();
    let stages = vec![
        ShaderSource {
            stage: ShaderStage::Vertex,
            source: "void main() {}".into(),
        },
        ShaderSource {
            stage: ShaderStage::Geometry,
            source: "void main() {}".into(),
        },
        ShaderSource {
            stage: ShaderStage::Fragment,
            source: "void main() {}".into(),
        },
    ];

    let shader = ShaderProgram::from_stages(&ctx, "geometry", stages).unwrap();
    assert_eq!(shader[1].stage, ShaderStage::Geometry);
}

#[test]
#[serial]
fn file_programs_are_named_after_the_file() {
    let (ctx, _backend) = headless();
    let dir = std::env::temp_dir().join(format!("staplegl-shaders-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();

    let combined = dir.join("batched_shader.glsl");
    std::fs::write(&combined, SOURCE).unwrap();
    let vertex = dir.join("basic.vert");
    std::fs::write(&vertex, "void main() {}").unwrap();
    let fragment = dir.join("basic.frag");
    std::fs::write(&fragment, "out vec4 c; void main() {}").unwrap();

    let from_file = ShaderProgram::from_file(&ctx, &combined);
    let from_stages = ShaderProgram::from_stage_files(
        &ctx,
        "basic",
        &[(ShaderStage::Vertex, &vertex), (ShaderStage::Fragment, &fragment)],
    );
    std::fs::remove_dir_all(&dir).unwrap();

    assert_eq!(from_file.unwrap().name(), "batched_shader");
    assert_eq!(from_stages.unwrap().stages().len(), 2);
}

#[test]
fn missing_file_is_a_read_error() {
    let (ctx, _backend) = headless();
    let result = ShaderProgram::from_file(&ctx, "no/such/shader.glsl");

    assert!(matches!(result, Err(ShaderError::ReadSource { .. })));
}

#[test]
fn dropping_the_program_deletes_it() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    shader.bind();
    drop(shader);

    assert_eq!(backend.live_programs(), 0);
    assert_eq!(backend.current_program(), None);
}

fn quad(ctx: &staplegl::Context) -> VertexArray {
    let layout = VertexBufferLayout::new([VertexAttribute::new(ShaderDataType::Vec3, "a_position")]);
    let mut vao = VertexArray::new(ctx).unwrap();
    vao.add_vertex_buffer(
        VertexBuffer::with_layout(ctx, &[0.0f32; 12], layout, DrawHint::Static).unwrap(),
    );
    vao.set_index_buffer(IndexBuffer::new(ctx, &[0, 1, 2, 2, 3, 0], DrawHint::Static).unwrap());
    vao
}

#[test]
fn indexed_draws_use_the_index_count() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    let vao = quad(&ctx);
    vao.unbind();

    shader.bind();
    draw_elements(&vao, PrimitiveMode::Triangles);

    let calls = backend.draw_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].mode, gl::TRIANGLES);
    assert_eq!(calls[0].count, 6);
    assert!(calls[0].indexed);
    assert_eq!(calls[0].vertex_array, Some(vao.id()));
    assert_eq!(calls[0].program, Some(shader.id()));
    assert_eq!(backend.pending_errors(), 0);
}

#[test]
fn instanced_draws_use_the_instance_count() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    let mut vao = quad(&ctx);
    let layout = VertexBufferLayout::new([VertexAttribute::new(ShaderDataType::Vec2, "a_offset")]);
    vao.set_instance_buffer(
        InstanceBuffer::new(&ctx, &[] as &[f32], layout, DrawHint::Dynamic).unwrap(),
    );

    shader.bind();
    // nothing to draw yet
    draw_elements_instanced(&vao, PrimitiveMode::Triangles);
    assert!(backend.draw_calls().is_empty());

    let instances = vao.instance_buffer_mut().unwrap();
    instances.add_instance(&[0.0f32, 0.0]).unwrap();
    instances.add_instance(&[1.0f32, 0.0]).unwrap();
    instances.add_instance(&[2.0f32, 0.0]).unwrap();
    draw_elements_instanced(&vao, PrimitiveMode::Triangles);

    let calls = backend.draw_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].count, calls[0].instances), (6, 3));
}

#[test]
fn elements_without_index_buffer_are_skipped() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    let vao = VertexArray::new(&ctx).unwrap();

    shader.bind();
    draw_elements(&vao, PrimitiveMode::Lines);
    draw_elements_instanced(&vao, PrimitiveMode::Lines);
    assert!(backend.draw_calls().is_empty());

    vao.bind();
    draw_arrays(&ctx, PrimitiveMode::TriangleStrip, 0, 4);
    let calls = backend.draw_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!((calls[0].mode, calls[0].count), (gl::TRIANGLE_STRIP, 4));
    assert!(!calls[0].indexed);
}

#[test]
fn oversized_array_draws_are_skipped() {
    let (ctx, backend) = headless();
    let shader = ShaderProgram::from_source(&ctx, "flat", SOURCE).unwrap();
    let vao = quad(&ctx);

    shader.bind();
    vao.bind();
    draw_arrays(&ctx, PrimitiveMode::Triangles, 0, usize::MAX);
    draw_arrays(&ctx, PrimitiveMode::Triangles, i32::MAX as usize + 1, 3);

    assert!(backend.draw_calls().is_empty());
    assert_eq!(backend.pending_errors(), 0);
}
