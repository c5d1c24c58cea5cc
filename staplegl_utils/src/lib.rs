use nalgebra::{Matrix4, Vector2, Vector3, Vector4};

const FLOAT_SIZE: usize = size_of::<f32>();

/// The scalar, vector and matrix types a vertex attribute or uniform block member can have.
///
/// Every type is made of 32-bit floats. `Mat3` is stored as three `vec4` columns, the way
/// std140 lays it out.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderDataType {
    Float32,
    Vec2,
    Vec3,
    Vec4,
    Mat3,
    Mat4,
}

/// Array counterparts of [`ShaderDataType`], used when an attribute holds several elements.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderArrayType {
    Float32Array,
    Vec2Array,
    Vec3Array,
    Vec4Array,
    Mat3Array,
    Mat4Array,
}

impl ShaderDataType {
    /// Size in bytes of one element of this type.
    pub const fn size(self) -> usize {
        match self {
            ShaderDataType::Float32 => FLOAT_SIZE,
            ShaderDataType::Vec2 => FLOAT_SIZE * 2,
            ShaderDataType::Vec3 => FLOAT_SIZE * 3,
            ShaderDataType::Vec4 => FLOAT_SIZE * 4,
            // padded to three vec4
            ShaderDataType::Mat3 => ShaderDataType::Vec4.size() * 3,
            ShaderDataType::Mat4 => ShaderDataType::Vec4.size() * 4,
        }
    }

    /// Number of float components, padding included.
    pub const fn component_count(self) -> i32 {
        match self {
            ShaderDataType::Float32 => 1,
            ShaderDataType::Vec2 => 2,
            ShaderDataType::Vec3 => 3,
            ShaderDataType::Vec4 => 4,
            ShaderDataType::Mat3 => 12,
            ShaderDataType::Mat4 => 16,
        }
    }

    /// Attribute locations one value takes. Matrices use one per column.
    pub const fn locations(self) -> u32 {
        match self {
            ShaderDataType::Mat3 => 3,
            ShaderDataType::Mat4 => 4,
            _ => 1,
        }
    }

    /// Float components read from each of the [`locations`](Self::locations).
    pub const fn components_per_location(self) -> i32 {
        self.component_count() / self.locations() as i32
    }

    /// The GL enum naming this type, as reported by program introspection.
    pub const fn gl_type(self) -> u32 {
        match self {
            ShaderDataType::Float32 => gl::FLOAT,
            ShaderDataType::Vec2 => gl::FLOAT_VEC2,
            ShaderDataType::Vec3 => gl::FLOAT_VEC3,
            ShaderDataType::Vec4 => gl::FLOAT_VEC4,
            ShaderDataType::Mat3 => gl::FLOAT_MAT3,
            ShaderDataType::Mat4 => gl::FLOAT_MAT4,
        }
    }

    /// The component type handed to `glVertexAttribPointer`.
    pub const fn gl_underlying_type(self) -> u32 {
        gl::FLOAT
    }
}

impl From<ShaderArrayType> for ShaderDataType {
    fn from(value: ShaderArrayType) -> Self {
        match value {
            ShaderArrayType::Float32Array => ShaderDataType::Float32,
            ShaderArrayType::Vec2Array => ShaderDataType::Vec2,
            ShaderArrayType::Vec3Array => ShaderDataType::Vec3,
            ShaderArrayType::Vec4Array => ShaderDataType::Vec4,
            ShaderArrayType::Mat3Array => ShaderDataType::Mat3,
            ShaderArrayType::Mat4Array => ShaderDataType::Mat4,
        }
    }
}

/// A Rust type that can be uploaded as a vertex attribute.
pub trait ShaderField {
    const DATA_TYPE: ShaderDataType;
    const ELEMENTS: usize = 1;
}

macro_rules! shader_field {
    ($($ty:ty => $data_type:ident),* $(,)?) => {
        $(
            impl ShaderField for $ty {
                const DATA_TYPE: ShaderDataType = ShaderDataType::$data_type;
            }
        )*
    };
}

shader_field! {
    f32 => Float32,
    [f32; 2] => Vec2,
    [f32; 3] => Vec3,
    [f32; 4] => Vec4,
    [[f32; 4]; 3] => Mat3,
    [[f32; 4]; 4] => Mat4,
    Vector2<f32> => Vec2,
    Vector3<f32> => Vec3,
    Vector4<f32> => Vec4,
    Matrix4<f32> => Mat4,
}

/// One attribute of a vertex type, as emitted by `#[derive(Vertex)]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeDesc {
    pub name: &'static str,
    pub data_type: ShaderDataType,
    pub element_count: usize,
}

impl AttributeDesc {
    pub const fn of<F: ShaderField>(name: &'static str) -> Self {
        Self {
            name,
            data_type: F::DATA_TYPE,
            element_count: F::ELEMENTS,
        }
    }

    pub const fn size(&self) -> usize {
        self.data_type.size() * self.element_count
    }
}

/// A `#[repr(C)]` vertex type whose fields map one-to-one onto vertex attributes.
pub trait VertexSource: Sized {
    const ATTRIBUTES: &'static [AttributeDesc];

    /// Sum of all attribute sizes. Equal to `size_of::<Self>()` for derived types.
    fn stride() -> usize {
        Self::ATTRIBUTES.iter().map(AttributeDesc::size).sum()
    }
}

/// Adds up attribute sizes in a const context.
pub const fn attributes_size(attributes: &[AttributeDesc]) -> usize {
    let mut sum = 0;
    let mut i = 0;

    while i < attributes.len() {
        sum += attributes[i].size();
        i += 1;
    }

    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mat3_is_padded_to_vec4_columns() {
        assert_eq!(ShaderDataType::Mat3.size(), 48);
        assert_eq!(ShaderDataType::Mat3.component_count(), 12);
        assert_eq!(ShaderDataType::Mat4.size(), 64);
    }

    #[test]
    fn array_types_map_to_element_types() {
        assert_eq!(ShaderDataType::from(ShaderArrayType::Vec3Array), ShaderDataType::Vec3);
        assert_eq!(ShaderDataType::from(ShaderArrayType::Mat4Array), ShaderDataType::Mat4);
    }

    #[test]
    fn nalgebra_types_match_their_array_forms() {
        assert_eq!(<Vector3<f32> as ShaderField>::DATA_TYPE, <[f32; 3] as ShaderField>::DATA_TYPE);
        assert_eq!(size_of::<Matrix4<f32>>(), ShaderDataType::Mat4.size());
    }

    #[test]
    fn attributes_size_sums_in_const_context() {
        const ATTRS: &[AttributeDesc] = &[
            AttributeDesc::of::<[f32; 3]>("position"),
            AttributeDesc::of::<[f32; 2]>("uv"),
        ];
        const SIZE: usize = attributes_size(ATTRS);
        assert_eq!(SIZE, 20);
    }
}
