//! Draw call helpers.
//!
//! The indexed variants bind the vertex array and take their counts from the buffers it owns.
//! The caller is responsible for binding a program first.

use crate::context::Context;
use crate::vertex_array::VertexArray;
use log::{trace, warn};

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PrimitiveMode {
    Points,
    Lines,
    LineStrip,
    LineLoop,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl PrimitiveMode {
    pub const fn gl_mode(self) -> u32 {
        match self {
            PrimitiveMode::Points => gl::POINTS,
            PrimitiveMode::Lines => gl::LINES,
            PrimitiveMode::LineStrip => gl::LINE_STRIP,
            PrimitiveMode::LineLoop => gl::LINE_LOOP,
            PrimitiveMode::Triangles => gl::TRIANGLES,
            PrimitiveMode::TriangleStrip => gl::TRIANGLE_STRIP,
            PrimitiveMode::TriangleFan => gl::TRIANGLE_FAN,
        }
    }
}

/// Converts a count to the `GLint`/`GLsizei` the driver takes, warning when it doesn't fit.
fn gl_count(what: &str, value: usize) -> Option<i32> {
    let converted = i32::try_from(value).ok();
    if converted.is_none() {
        warn!("Skipping draw: {what} {value} exceeds what OpenGL can address");
    }
    converted
}

/// Draws `count` vertices of the bound vertex array, starting at `first`.
pub fn draw_arrays(ctx: &Context, mode: PrimitiveMode, first: usize, count: usize) {
    let (Some(first), Some(count)) = (
        gl_count("first vertex", first),
        gl_count("vertex count", count),
    ) else {
        return;
    };

    ctx.gl().draw_arrays(mode.gl_mode(), first, count);
}

/// Draws every index of `vao`'s index buffer.
pub fn draw_elements(vao: &VertexArray, mode: PrimitiveMode) {
    let Some(indices) = vao.index_buffer() else {
        warn!("Vertex array #{} has no index buffer to draw", vao.id().get());
        return;
    };
    let Some(count) = gl_count("index count", indices.count()) else {
        return;
    };

    vao.bind();
    vao.context()
        .gl()
        .draw_elements(mode.gl_mode(), count, indices.index_type(), 0);
}

/// Draws every index of `vao`'s index buffer once per instance in its instance buffer.
pub fn draw_elements_instanced(vao: &VertexArray, mode: PrimitiveMode) {
    let Some(indices) = vao.index_buffer() else {
        warn!("Vertex array #{} has no index buffer to draw", vao.id().get());
        return;
    };

    let instances = vao.instance_buffer().map_or(0, |b| b.instance_count());
    if instances == 0 {
        trace!("Skipping instanced draw of vertex array #{} without instances", vao.id().get());
        return;
    }

    let (Some(count), Some(instances)) = (
        gl_count("index count", indices.count()),
        gl_count("instance count", instances),
    ) else {
        return;
    };

    vao.bind();
    vao.context().gl().draw_elements_instanced(
        mode.gl_mode(),
        count,
        indices.index_type(),
        0,
        instances,
    );
}
