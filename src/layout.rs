use crate::error::{Result, UnknownAttributeErr};
use crate::utils::sizes::FLOAT_SIZE;
use smallvec::SmallVec;
use snafu::OptionExt;
use staplegl_utils::{ShaderArrayType, ShaderDataType, VertexSource};

/// One attribute inside a vertex buffer layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexAttribute {
    pub data_type: ShaderDataType,
    pub name: String,
    /// Byte offset from the start of the vertex, assigned by [`VertexBufferLayout::new`].
    pub offset: usize,
    pub element_count: usize,
}

impl VertexAttribute {
    pub fn new(data_type: ShaderDataType, name: impl Into<String>) -> Self {
        Self {
            data_type,
            name: name.into(),
            offset: 0,
            element_count: 1,
        }
    }

    pub fn new_array(
        data_type: ShaderArrayType,
        name: impl Into<String>,
        element_count: usize,
    ) -> Self {
        Self {
            data_type: data_type.into(),
            name: name.into(),
            offset: 0,
            element_count,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.data_type.size() * self.element_count
    }

    /// Float components across every location of the attribute.
    #[inline]
    pub fn components(&self) -> i32 {
        self.data_type.component_count() * self.element_count as i32
    }

    /// Consecutive attribute locations this attribute takes: one per array element, times one
    /// per matrix column.
    #[inline]
    pub fn locations(&self) -> u32 {
        self.data_type.locations() * self.element_count as u32
    }

    /// `(components, byte offset)` of each location, in order.
    pub fn location_slices(&self) -> impl Iterator<Item = (i32, usize)> + '_ {
        let components = self.data_type.components_per_location();
        let step = self.data_type.size() / self.data_type.locations() as usize;
        (0..self.locations() as usize).map(move |i| (components, self.offset + i * step))
    }
}

/// Describes how the attributes of a single vertex are packed in a buffer.
///
/// Attributes keep the order they were declared in, and each one starts right after the previous
/// one. There is no padding between them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexBufferLayout {
    attributes: SmallVec<[VertexAttribute; 4]>,
    stride: usize,
}

impl VertexBufferLayout {
    pub fn new(attributes: impl IntoIterator<Item = VertexAttribute>) -> Self {
        let mut attributes: SmallVec<[VertexAttribute; 4]> = attributes.into_iter().collect();

        let mut offset = 0;
        for attribute in &mut attributes {
            attribute.offset = offset;
            offset += attribute.size();
        }

        Self {
            attributes,
            stride: offset,
        }
    }

    /// The layout of a `#[derive(Vertex)]` type.
    pub fn of<T: VertexSource>() -> Self {
        Self::new(T::ATTRIBUTES.iter().map(|desc| VertexAttribute {
            data_type: desc.data_type,
            name: desc.name.to_string(),
            offset: 0,
            element_count: desc.element_count,
        }))
    }

    /// Size of one vertex in bytes.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Size of one vertex in floats.
    #[inline]
    pub fn stride_elements(&self) -> usize {
        self.stride / FLOAT_SIZE
    }

    pub fn get(&self, name: &str) -> Result<&VertexAttribute> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .context(UnknownAttributeErr { name })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VertexAttribute> {
        self.attributes.iter()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl<'a> IntoIterator for &'a VertexBufferLayout {
    type Item = &'a VertexAttribute;
    type IntoIter = std::slice::Iter<'a, VertexAttribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<VertexAttribute> for VertexBufferLayout {
    fn from_iter<I: IntoIterator<Item = VertexAttribute>>(iter: I) -> Self {
        Self::new(iter)
    }
}
