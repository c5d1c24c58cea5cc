use super::{DrawHint, GpuBuffer, RawBuffer, copy_prefix};
use crate::backend::BufferData;
use crate::context::Context;
use crate::error::{DataSizeErr, InstanceOutOfRangeErr, MissingLayoutErr, Result};
use crate::layout::VertexBufferLayout;
use bytemuck::Pod;
use log::{debug, trace};
use snafu::ensure;
use staplegl_utils::VertexSource;

const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;

/// Instances a buffer grows to when it outgrows its first one.
const FIRST_GROWTH_INSTANCES: usize = 32;

/// The capacity that follows `capacity` for instances of `stride` bytes.
///
/// An empty buffer makes room for one instance, a buffer holding exactly one jumps to 32, and
/// anything larger grows by the golden ratio.
pub const fn next_capacity(capacity: usize, stride: usize) -> usize {
    if capacity == 0 {
        stride
    } else if capacity == stride {
        stride * FIRST_GROWTH_INSTANCES
    } else {
        (capacity as f64 * GOLDEN_RATIO) as usize
    }
}

/// A vertex buffer of per-instance attributes that grows as instances are added.
///
/// Instances are densely packed: slots `0..instance_count()` are live, the rest of the capacity
/// is spare. Growing reallocates the same buffer name, so vertex arrays pointing at it stay valid.
/// Deleting moves the last instance into the hole, which means instance indices aren't stable
/// across deletions.
///
/// ```ignore
/// let mut instances = InstanceBuffer::new(&ctx, &[] as &[f32], layout, DrawHint::Dynamic)?;
/// let first = instances.add_instance(&[0.0f32, 1.0, 0.0])?;
/// let second = instances.add_instance(&[1.0f32, 0.0, 0.0])?;
///
/// // the second instance now lives at `first`
/// assert_eq!(instances.delete_instance(first)?, Some(second));
/// ```
#[derive(Debug)]
pub struct InstanceBuffer {
    raw: RawBuffer,
    layout: VertexBufferLayout,
    hint: DrawHint,
    count: usize,
    capacity: usize,
}

impl InstanceBuffer {
    /// Uploads `data` as the initial instances. The capacity starts out at exactly its size.
    pub fn new<T: Pod>(
        ctx: &Context,
        data: &[T],
        layout: VertexBufferLayout,
        hint: DrawHint,
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let stride = layout.stride();

        let count = match stride {
            0 => 0,
            stride => {
                ensure!(
                    bytes.len() % stride == 0,
                    DataSizeErr {
                        what: "initial instance",
                        expected: bytes.len().next_multiple_of(stride),
                        actual: bytes.len(),
                    }
                );
                bytes.len() / stride
            }
        };

        let raw = RawBuffer::new(ctx)?;
        raw.allocate(BufferData::Bytes(bytes), hint);

        debug!(
            "Created instance buffer #{} ({count} instances of {stride} bytes)",
            raw.id().get()
        );

        Ok(Self {
            raw,
            layout,
            hint,
            count,
            capacity: bytes.len(),
        })
    }

    /// Uploads instances of a `#[derive(Vertex)]` type, taking the layout from the type.
    pub fn from_instances<V: VertexSource + Pod>(
        ctx: &Context,
        instances: &[V],
        hint: DrawHint,
    ) -> Result<Self> {
        Self::new(ctx, instances, VertexBufferLayout::of::<V>(), hint)
    }

    pub fn bind(&self) {
        self.raw.bind(gl::ARRAY_BUFFER);
    }

    pub fn unbind(&self) {
        self.raw.context().gl().bind_buffer(gl::ARRAY_BUFFER, None);
    }

    #[inline]
    pub fn layout(&self) -> &VertexBufferLayout {
        &self.layout
    }

    #[inline]
    pub fn instance_count(&self) -> usize {
        self.count
    }

    /// Size of one instance in bytes.
    #[inline]
    pub fn instance_size(&self) -> usize {
        self.layout.stride()
    }

    /// Allocated size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends an instance and returns its index, growing the buffer when it is full.
    pub fn add_instance<T: Pod>(&mut self, data: &[T]) -> Result<usize> {
        let bytes = self.check_instance(data)?;
        let stride = self.instance_size();

        let required = (self.count + 1) * stride;
        if required > self.capacity {
            let mut capacity = self.capacity;
            while required > capacity {
                capacity = next_capacity(capacity, stride);
            }
            self.resize(capacity)?;
        }

        let index = self.count;
        self.raw.write(index * stride, bytes);
        self.count += 1;

        trace!("Added instance #{index} to buffer #{}", self.raw.id().get());
        Ok(index)
    }

    /// Overwrites the instance at `index`.
    pub fn update_instance<T: Pod>(&mut self, index: usize, data: &[T]) -> Result<()> {
        let bytes = self.check_instance(data)?;
        self.check_index(index)?;

        self.raw.write(index * self.instance_size(), bytes);
        Ok(())
    }

    /// Removes the instance at `index` by moving the last instance into its slot.
    ///
    /// Returns the index the moved instance had before, so callers tracking instances by index
    /// can update theirs. Returns `None` when the removed instance was the last one and nothing
    /// moved.
    pub fn delete_instance(&mut self, index: usize) -> Result<Option<usize>> {
        self.check_index(index)?;

        let last = self.count - 1;
        self.count = last;

        if index == last {
            return Ok(None);
        }

        let stride = self.instance_size();
        self.raw.copy_within(last * stride, index * stride, stride);

        trace!(
            "Moved instance #{last} to #{index} in buffer #{}",
            self.raw.id().get()
        );
        Ok(Some(last))
    }

    /// Forgets every instance. The storage is kept for reuse.
    pub fn clear_instances(&mut self) {
        self.count = 0;
    }

    fn check_instance<'a, T: Pod>(&self, data: &'a [T]) -> Result<&'a [u8]> {
        let stride = self.instance_size();
        ensure!(stride > 0, MissingLayoutErr);

        let bytes: &[u8] = bytemuck::cast_slice(data);
        ensure!(
            bytes.len() == stride,
            DataSizeErr {
                what: "instance",
                expected: stride,
                actual: bytes.len(),
            }
        );

        Ok(bytes)
    }

    fn check_index(&self, index: usize) -> Result<()> {
        ensure!(
            index < self.count,
            InstanceOutOfRangeErr {
                index,
                count: self.count,
            }
        );
        Ok(())
    }

    /// Reallocates the storage to `capacity` bytes, keeping the live instances.
    fn resize(&mut self, capacity: usize) -> Result<()> {
        let live = self.count * self.instance_size();

        debug!(
            "Growing instance buffer #{} from {} to {capacity} bytes",
            self.raw.id().get(),
            self.capacity
        );

        if live == 0 {
            self.raw.allocate(BufferData::Size(capacity), self.hint);
        } else {
            let scratch = RawBuffer::new(self.raw.context())?;
            scratch.allocate(BufferData::Size(live), self.hint);
            copy_prefix(&self.raw, &scratch, live);

            self.raw.allocate(BufferData::Size(capacity), self.hint);
            copy_prefix(&scratch, &self.raw, live);
        }

        self.capacity = capacity;
        Ok(())
    }
}

impl GpuBuffer for InstanceBuffer {
    fn raw(&self) -> &RawBuffer {
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_policy() {
        assert_eq!(next_capacity(0, 12), 12);
        assert_eq!(next_capacity(12, 12), 12 * 32);
        assert_eq!(next_capacity(384, 12), 621);
        assert_eq!(next_capacity(24, 12), 38);
    }

    #[test]
    fn capacity_always_grows() {
        let mut capacity = 0;
        for _ in 0..20 {
            let next = next_capacity(capacity, 4);
            assert!(next > capacity);
            capacity = next;
        }
    }
}
