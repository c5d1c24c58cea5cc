use super::{DrawHint, GpuBuffer, RawBuffer};
use crate::backend::BufferData;
use crate::context::Context;
use crate::error::{DataSizeErr, Result};
use crate::layout::VertexBufferLayout;
use crate::utils::sizes::FLOAT_SIZE;
use bytemuck::Pod;
use log::debug;
use snafu::ensure;

/// A uniform block bound to a fixed binding point.
///
/// Members are described with a [`VertexBufferLayout`], whose offsets must match the block's
/// layout in the shader.
#[derive(Debug)]
pub struct UniformBuffer {
    raw: RawBuffer,
    layout: VertexBufferLayout,
    binding_point: u32,
    size: usize,
}

impl UniformBuffer {
    pub fn new<T: Pod>(
        ctx: &Context,
        contents: &[T],
        layout: VertexBufferLayout,
        binding_point: u32,
    ) -> Result<Self> {
        Self::create(ctx, BufferData::Bytes(bytemuck::cast_slice(contents)), layout, binding_point)
    }

    /// Allocates one zeroed block of `layout.stride()` bytes.
    pub fn zeroed(ctx: &Context, layout: VertexBufferLayout, binding_point: u32) -> Result<Self> {
        let size = layout.stride();
        Self::create(ctx, BufferData::Size(size), layout, binding_point)
    }

    fn create(
        ctx: &Context,
        data: BufferData<'_>,
        layout: VertexBufferLayout,
        binding_point: u32,
    ) -> Result<Self> {
        let raw = RawBuffer::new(ctx)?;
        raw.allocate(data, DrawHint::Dynamic);

        let gl = ctx.gl();
        gl.bind_buffer_base(gl::UNIFORM_BUFFER, binding_point, Some(raw.id()));
        gl.bind_buffer(gl::UNIFORM_BUFFER, None);

        debug!(
            "Created uniform buffer #{} at binding point {binding_point}",
            raw.id().get()
        );

        Ok(Self {
            raw,
            layout,
            binding_point,
            size: data.len(),
        })
    }

    pub fn bind(&self) {
        self.raw.bind(gl::UNIFORM_BUFFER);
    }

    pub fn unbind(&self) {
        self.raw.context().gl().bind_buffer(gl::UNIFORM_BUFFER, None);
    }

    /// Writes `data` at the start of the member called `name`.
    pub fn set_attribute_data(&mut self, data: &[f32], name: &str) -> Result<()> {
        self.set_attribute_data_at(data, name, 0)
    }

    /// Writes `data` `float_offset` floats past the start of the member called `name`.
    pub fn set_attribute_data_at(
        &mut self,
        data: &[f32],
        name: &str,
        float_offset: usize,
    ) -> Result<()> {
        let start = self.layout.get(name)?.offset + float_offset * FLOAT_SIZE;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let available = self.size.saturating_sub(start);

        ensure!(
            bytes.len() <= available,
            DataSizeErr {
                what: "uniform member",
                expected: available,
                actual: bytes.len(),
            }
        );

        self.raw.write(start, bytes);
        Ok(())
    }

    #[inline]
    pub fn layout(&self) -> &VertexBufferLayout {
        &self.layout
    }

    #[inline]
    pub fn binding_point(&self) -> u32 {
        self.binding_point
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }
}

impl GpuBuffer for UniformBuffer {
    fn raw(&self) -> &RawBuffer {
        &self.raw
    }
}
