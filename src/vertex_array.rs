use crate::backend::{Backend, VertexArrayId};
use crate::buffer::{IndexBuffer, InstanceBuffer, VertexBuffer};
use crate::context::Context;
use crate::error::{AllocationErr, Result};
use crate::layout::VertexBufferLayout;
use log::{debug, trace};
use snafu::OptionExt;

/// A vertex array object together with the buffers it reads from.
///
/// Attribute indices are handed out in order across every buffer added, starting at 0. A vertex
/// buffer with three attributes followed by an instance buffer with two yields locations 0..3 for
/// the vertices and 3..5 for the instances. A matrix takes one location per column, an array one
/// per element.
#[derive(Debug)]
pub struct VertexArray {
    ctx: Context,
    id: VertexArrayId,
    buffers: Vec<VertexBuffer>,
    instance_buffer: Option<InstanceBuffer>,
    index_buffer: Option<IndexBuffer>,
    next_attribute: u32,
}

impl VertexArray {
    pub fn new(ctx: &Context) -> Result<Self> {
        let id = ctx
            .gl()
            .create_vertex_array()
            .context(AllocationErr {
                kind: "vertex array",
            })?;

        debug!("Created vertex array #{}", id.get());

        Ok(Self {
            ctx: ctx.clone(),
            id,
            buffers: Vec::new(),
            instance_buffer: None,
            index_buffer: None,
            next_attribute: 0,
        })
    }

    pub fn bind(&self) {
        self.ctx.gl().bind_vertex_array(Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_vertex_array(None);
    }

    /// Takes ownership of `buffer` and points the next attribute locations at it.
    ///
    /// Returns the position of the buffer in [`buffers`](Self::buffers).
    pub fn add_vertex_buffer(&mut self, buffer: VertexBuffer) -> usize {
        self.bind();
        buffer.bind();
        self.next_attribute = register_attributes(
            self.ctx.gl(),
            buffer.layout(),
            self.next_attribute,
            None,
        );

        self.buffers.push(buffer);
        self.buffers.len() - 1
    }

    /// Takes ownership of `buffer`, registering its attributes with a divisor of 1.
    ///
    /// Replaces any previous instance buffer.
    pub fn set_instance_buffer(&mut self, buffer: InstanceBuffer) {
        self.bind();
        buffer.bind();
        self.next_attribute = register_attributes(
            self.ctx.gl(),
            buffer.layout(),
            self.next_attribute,
            Some(1),
        );

        self.instance_buffer = Some(buffer);
    }

    /// Drops the instance buffer. The attribute locations it used are not handed out again.
    pub fn clear_instance_buffer(&mut self) -> Option<InstanceBuffer> {
        self.instance_buffer.take()
    }

    pub fn set_index_buffer(&mut self, buffer: IndexBuffer) {
        self.bind();
        buffer.bind();
        self.index_buffer = Some(buffer);
    }

    #[inline]
    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    #[inline]
    pub fn context(&self) -> &Context {
        &self.ctx
    }

    #[inline]
    pub fn buffers(&self) -> &[VertexBuffer] {
        &self.buffers
    }

    #[inline]
    pub fn buffers_mut(&mut self) -> &mut [VertexBuffer] {
        &mut self.buffers
    }

    #[inline]
    pub fn instance_buffer(&self) -> Option<&InstanceBuffer> {
        self.instance_buffer.as_ref()
    }

    #[inline]
    pub fn instance_buffer_mut(&mut self) -> Option<&mut InstanceBuffer> {
        self.instance_buffer.as_mut()
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<&IndexBuffer> {
        self.index_buffer.as_ref()
    }

    /// The attribute location the next added buffer will start at.
    #[inline]
    pub fn next_attribute(&self) -> u32 {
        self.next_attribute
    }
}

impl Drop for VertexArray {
    fn drop(&mut self) {
        debug!("Deleting vertex array #{}", self.id.get());
        self.ctx.gl().delete_vertex_array(self.id);
    }
}

/// Enables the locations of every layout entry starting at `first`, reading from the bound array
/// buffer. Matrices and arrays take one location per column or element. Returns the next free
/// location.
fn register_attributes(
    gl: &dyn Backend,
    layout: &VertexBufferLayout,
    first: u32,
    divisor: Option<u32>,
) -> u32 {
    let mut index = first;

    for attribute in layout {
        trace!(
            "Attributes {index}..{} = {:?} {:?} at offset {}",
            index + attribute.locations(),
            attribute.data_type,
            attribute.name,
            attribute.offset
        );

        for (components, offset) in attribute.location_slices() {
            gl.enable_vertex_attrib_array(index);
            gl.vertex_attrib_pointer(
                index,
                components,
                attribute.data_type.gl_underlying_type(),
                false,
                layout.stride(),
                offset,
            );
            if let Some(divisor) = divisor {
                gl.vertex_attrib_divisor(index, divisor);
            }

            index += 1;
        }
    }

    index
}
