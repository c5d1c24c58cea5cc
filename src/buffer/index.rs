use super::{DrawHint, GpuBuffer, RawBuffer};
use crate::backend::BufferData;
use crate::context::Context;
use crate::error::Result;
use crate::utils::sizes::INDEX_SIZE;
use log::debug;

/// `u32` element indices.
#[derive(Debug)]
pub struct IndexBuffer {
    raw: RawBuffer,
    count: usize,
}

impl IndexBuffer {
    pub fn new(ctx: &Context, indices: &[u32], hint: DrawHint) -> Result<Self> {
        let raw = RawBuffer::new(ctx)?;
        raw.allocate(BufferData::Bytes(bytemuck::cast_slice(indices)), hint);

        debug!("Created index buffer #{} ({} indices)", raw.id().get(), indices.len());

        Ok(Self {
            raw,
            count: indices.len(),
        })
    }

    /// Binds to `ELEMENT_ARRAY_BUFFER`, which also records the buffer in the bound vertex array.
    pub fn bind(&self) {
        self.raw.bind(gl::ELEMENT_ARRAY_BUFFER);
    }

    pub fn unbind(&self) {
        self.raw
            .context()
            .gl()
            .bind_buffer(gl::ELEMENT_ARRAY_BUFFER, None);
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size of the indices in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.count * INDEX_SIZE
    }

    /// The GL type of a single index.
    #[inline]
    pub const fn index_type(&self) -> u32 {
        gl::UNSIGNED_INT
    }
}

impl GpuBuffer for IndexBuffer {
    fn raw(&self) -> &RawBuffer {
        &self.raw
    }
}
