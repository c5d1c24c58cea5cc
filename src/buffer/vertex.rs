use super::{DrawHint, GpuBuffer, RawBuffer};
use crate::backend::BufferData;
use crate::context::Context;
use crate::error::Result;
use crate::layout::VertexBufferLayout;
use crate::utils::sizes::FLOAT_SIZE;
use bytemuck::Pod;
use log::debug;
use staplegl_utils::VertexSource;

/// Per-vertex data for a [`VertexArray`](crate::VertexArray).
#[derive(Debug)]
pub struct VertexBuffer {
    raw: RawBuffer,
    layout: VertexBufferLayout,
    hint: DrawHint,
    size: usize,
}

impl VertexBuffer {
    /// Uploads `data` without a layout. Set one with [`set_layout`](Self::set_layout) before
    /// adding the buffer to a vertex array.
    pub fn new<T: Pod>(ctx: &Context, data: &[T], hint: DrawHint) -> Result<Self> {
        Self::with_layout(ctx, data, VertexBufferLayout::default(), hint)
    }

    pub fn with_layout<T: Pod>(
        ctx: &Context,
        data: &[T],
        layout: VertexBufferLayout,
        hint: DrawHint,
    ) -> Result<Self> {
        let raw = RawBuffer::new(ctx)?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        raw.allocate(BufferData::Bytes(bytes), hint);

        debug!(
            "Created vertex buffer #{} ({} bytes, {} attributes)",
            raw.id().get(),
            bytes.len(),
            layout.len()
        );

        Ok(Self {
            raw,
            layout,
            hint,
            size: bytes.len(),
        })
    }

    /// Uploads vertices of a `#[derive(Vertex)]` type, taking the layout from the type.
    pub fn from_vertices<V: VertexSource + Pod>(
        ctx: &Context,
        vertices: &[V],
        hint: DrawHint,
    ) -> Result<Self> {
        Self::with_layout(ctx, vertices, VertexBufferLayout::of::<V>(), hint)
    }

    pub fn bind(&self) {
        self.raw.bind(gl::ARRAY_BUFFER);
    }

    pub fn unbind(&self) {
        self.raw.context().gl().bind_buffer(gl::ARRAY_BUFFER, None);
    }

    pub fn set_layout(&mut self, layout: VertexBufferLayout) {
        self.layout = layout;
    }

    #[inline]
    pub fn layout(&self) -> &VertexBufferLayout {
        &self.layout
    }

    /// Replaces the contents, reallocating the storage to fit.
    pub fn set_data<T: Pod>(&mut self, data: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        self.raw.allocate(BufferData::Bytes(bytes), self.hint);
        self.size = bytes.len();
    }

    /// Reads the contents back, lets `f` edit them as floats, and writes them back.
    pub fn apply<F>(&mut self, f: F)
    where
        F: FnOnce(&mut [f32], &VertexBufferLayout),
    {
        let mut floats = vec![0.0f32; self.size / FLOAT_SIZE];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut floats);
        self.raw.read(0, bytes);

        f(&mut floats, &self.layout);

        self.raw.write(0, bytemuck::cast_slice(&floats));
    }

    /// Size of the contents in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of whole vertices, or `0` without a layout.
    pub fn vertex_count(&self) -> usize {
        self.size.checked_div(self.layout.stride()).unwrap_or(0)
    }

    #[inline]
    pub fn hint(&self) -> DrawHint {
        self.hint
    }
}

impl GpuBuffer for VertexBuffer {
    fn raw(&self) -> &RawBuffer {
        &self.raw
    }
}
