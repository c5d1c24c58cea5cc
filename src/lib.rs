//! RAII wrappers around OpenGL objects.
//!
//! Every resource is created through a [`Context`] and deletes its GL object when dropped.
//! Besides the usual buffers, textures, framebuffers and shader programs, the crate provides
//! [`InstanceBuffer`], a per-instance attribute buffer that grows in place and removes instances
//! in constant time.
//!
//! ```ignore
//! let ctx = unsafe { Context::native(|name| window.get_proc_address(name)) };
//!
//! let mut vao = VertexArray::new(&ctx)?;
//! vao.add_vertex_buffer(VertexBuffer::from_vertices(&ctx, &QUAD, DrawHint::Static)?);
//! vao.set_index_buffer(IndexBuffer::new(&ctx, &[0, 1, 2, 2, 3, 0], DrawHint::Static)?);
//! vao.set_instance_buffer(InstanceBuffer::from_instances(&ctx, &particles, DrawHint::Dynamic)?);
//!
//! shader.bind();
//! draw_elements_instanced(&vao, PrimitiveMode::Triangles);
//! ```

#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

extern crate self as staplegl;

pub mod backend;
pub mod buffer;
pub mod context;
pub mod cubemap;
pub mod draw;
pub mod error;
pub mod framebuffer;
pub mod layout;
pub mod renderbuffer;
pub mod shader;
pub mod texture;
pub mod utils;
pub mod vertex_array;

pub use buffer::*;
pub use context::*;
pub use cubemap::*;
pub use draw::*;
pub use framebuffer::*;
pub use layout::*;
pub use renderbuffer::*;
pub use shader::*;
pub use texture::*;
pub use utils::Resolution;
pub use vertex_array::*;

pub use staplegl_utils::{ShaderArrayType, ShaderDataType, ShaderField, VertexSource};

pub use ::log;
pub use ::nalgebra;
pub use ::staplegl_utils;

#[cfg(feature = "derive")]
pub use ::staplegl_macros::Vertex;
