//! Owned GPU buffers.
//!
//! Every buffer type wraps a [`RawBuffer`], which holds the name and deletes it on drop. Uploads
//! and readbacks go through the `COPY_WRITE_BUFFER` / `COPY_READ_BUFFER` targets so they never
//! disturb the element buffer of whichever vertex array happens to be bound.

mod index;
mod instance;
mod uniform;
mod vertex;

pub use index::*;
pub use instance::*;
pub use uniform::*;
pub use vertex::*;

use crate::backend::{BufferData, BufferId};
use crate::context::Context;
use crate::error::{AllocationErr, DataSizeErr, Result};
use log::{debug, trace};
use snafu::{OptionExt, ensure};

/// Usage hint passed to the driver on allocation.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrawHint {
    Static,
    #[default]
    Dynamic,
    Stream,
}

impl DrawHint {
    pub const fn gl_usage(self) -> u32 {
        match self {
            DrawHint::Static => gl::STATIC_DRAW,
            DrawHint::Dynamic => gl::DYNAMIC_DRAW,
            DrawHint::Stream => gl::STREAM_DRAW,
        }
    }
}

/// A buffer name tied to the context that created it.
#[derive(Debug)]
pub struct RawBuffer {
    ctx: Context,
    id: BufferId,
}

impl RawBuffer {
    pub(crate) fn new(ctx: &Context) -> Result<Self> {
        let id = ctx
            .gl()
            .create_buffer()
            .context(AllocationErr { kind: "buffer" })?;

        Ok(Self {
            ctx: ctx.clone(),
            id,
        })
    }

    #[inline]
    pub fn id(&self) -> BufferId {
        self.id
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub(crate) fn bind(&self, target: u32) {
        self.ctx.gl().bind_buffer(target, Some(self.id));
    }

    /// Replaces the storage of the buffer.
    pub(crate) fn allocate(&self, data: BufferData<'_>, hint: DrawHint) {
        trace!("Allocating {} bytes for buffer #{}", data.len(), self.id.get());

        let gl = self.ctx.gl();
        gl.bind_buffer(gl::COPY_WRITE_BUFFER, Some(self.id));
        gl.buffer_data(gl::COPY_WRITE_BUFFER, data, hint.gl_usage());
        self.ctx.debug_check("buffer allocation");
    }

    pub(crate) fn write(&self, offset: usize, data: &[u8]) {
        let gl = self.ctx.gl();
        gl.bind_buffer(gl::COPY_WRITE_BUFFER, Some(self.id));
        gl.buffer_sub_data(gl::COPY_WRITE_BUFFER, offset, data);
        self.ctx.debug_check("buffer write");
    }

    pub(crate) fn read(&self, offset: usize, data: &mut [u8]) {
        let gl = self.ctx.gl();
        gl.bind_buffer(gl::COPY_READ_BUFFER, Some(self.id));
        gl.get_buffer_sub_data(gl::COPY_READ_BUFFER, offset, data);
    }

    /// Size of the storage as reported by the driver.
    pub(crate) fn size(&self) -> usize {
        let gl = self.ctx.gl();
        gl.bind_buffer(gl::COPY_READ_BUFFER, Some(self.id));
        gl.buffer_size(gl::COPY_READ_BUFFER)
    }

    /// Copies `size` bytes inside this buffer. The two ranges must not overlap.
    pub(crate) fn copy_within(&self, read_offset: usize, write_offset: usize, size: usize) {
        let gl = self.ctx.gl();
        gl.bind_buffer(gl::COPY_READ_BUFFER, Some(self.id));
        gl.bind_buffer(gl::COPY_WRITE_BUFFER, Some(self.id));
        gl.copy_buffer_sub_data(
            gl::COPY_READ_BUFFER,
            gl::COPY_WRITE_BUFFER,
            read_offset,
            write_offset,
            size,
        );
        self.ctx.debug_check("buffer copy");
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        debug!("Deleting buffer #{}", self.id.get());
        self.ctx.gl().delete_buffer(self.id);
    }
}

/// Anything backed by a single buffer object.
pub trait GpuBuffer {
    fn raw(&self) -> &RawBuffer;

    #[inline]
    fn id(&self) -> BufferId {
        self.raw().id()
    }
}

/// Copies the whole contents of `from` to the start of `to`.
///
/// Fails when `to` is smaller than `from`.
pub fn copy_buffer(from: &impl GpuBuffer, to: &impl GpuBuffer) -> Result<()> {
    let (from, to) = (from.raw(), to.raw());
    let size = from.size();
    let available = to.size();

    ensure!(
        available >= size,
        DataSizeErr {
            what: "copy destination",
            expected: size,
            actual: available,
        }
    );

    copy_prefix(from, to, size);
    Ok(())
}

/// Copies the first `size` bytes of `from` to the start of `to`.
pub(crate) fn copy_prefix(from: &RawBuffer, to: &RawBuffer, size: usize) {
    let gl = from.ctx.gl();
    gl.bind_buffer(gl::COPY_READ_BUFFER, Some(from.id));
    gl.bind_buffer(gl::COPY_WRITE_BUFFER, Some(to.id));
    gl.copy_buffer_sub_data(gl::COPY_READ_BUFFER, gl::COPY_WRITE_BUFFER, 0, 0, size);
    from.ctx.debug_check("buffer copy");
}
