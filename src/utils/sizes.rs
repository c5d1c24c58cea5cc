use nalgebra::{Matrix4, Vector2, Vector3, Vector4};
use static_assertions::const_assert_eq;
use staplegl_utils::ShaderDataType;

pub const FLOAT_SIZE: usize = size_of::<f32>();
pub const INDEX_SIZE: usize = size_of::<u32>();

pub const VEC2_SIZE: usize = size_of::<Vector2<f32>>();
pub const VEC3_SIZE: usize = size_of::<Vector3<f32>>();
pub const VEC4_SIZE: usize = size_of::<Vector4<f32>>();
pub const MAT4_SIZE: usize = size_of::<Matrix4<f32>>();

const_assert_eq!(VEC2_SIZE, ShaderDataType::Vec2.size());
const_assert_eq!(VEC3_SIZE, ShaderDataType::Vec3.size());
const_assert_eq!(VEC4_SIZE, ShaderDataType::Vec4.size());
const_assert_eq!(MAT4_SIZE, ShaderDataType::Mat4.size());
