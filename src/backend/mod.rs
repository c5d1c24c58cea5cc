//! The driver seam.
//!
//! Every wrapper in this crate talks to OpenGL through the [`Backend`] trait. [`NativeBackend`]
//! forwards each call to the driver through function pointers loaded with the `gl` crate.
//! [`HeadlessBackend`] keeps the same object model in memory, which lets resource code run
//! without a window or a GPU.
//!
//! Enum-valued parameters (targets, formats, usages) are plain GL enums, exactly as the driver
//! expects them. Object names are wrapped in typed, non-zero handles so a buffer can't be bound
//! as a texture by accident.

mod headless;
mod native;

pub use headless::*;
pub use native::*;

use std::num::NonZeroU32;

macro_rules! gl_handle {
    ($($(#[$meta:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
            pub struct $name(NonZeroU32);

            impl $name {
                /// Wraps a raw object name. Returns `None` for `0`, which GL reserves.
                #[inline]
                pub fn new(raw: u32) -> Option<Self> {
                    NonZeroU32::new(raw).map(Self)
                }

                #[inline]
                pub fn get(self) -> u32 {
                    self.0.get()
                }
            }
        )*
    };
}

gl_handle! {
    /// Name of a buffer object.
    BufferId,
    /// Name of a vertex array object.
    VertexArrayId,
    /// Name of a texture object.
    TextureId,
    /// Name of a renderbuffer object.
    RenderbufferId,
    /// Name of a framebuffer object.
    FramebufferId,
    /// Name of a shader stage object.
    ShaderId,
    /// Name of a program object.
    ProgramId,
}

/// Initial contents for `glBufferData`.
#[derive(Debug, Copy, Clone)]
pub enum BufferData<'a> {
    /// Allocate this many bytes, leaving the contents undefined.
    Size(usize),
    /// Allocate and fill with these bytes.
    Bytes(&'a [u8]),
}

impl BufferData<'_> {
    pub fn len(&self) -> usize {
        match self {
            BufferData::Size(size) => *size,
            BufferData::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row alignment `glTexImage2D` reads client pixels with. The crate never changes
/// `GL_UNPACK_ALIGNMENT` from its default.
pub const UNPACK_ALIGNMENT: usize = 4;

/// Bytes of one texel of client data in `format` / `data_type`, `None` for combinations this
/// crate doesn't know.
pub const fn texel_size(format: u32, data_type: u32) -> Option<usize> {
    let channels = match format {
        gl::RED | gl::GREEN | gl::BLUE | gl::DEPTH_COMPONENT | gl::STENCIL_INDEX => 1,
        gl::RED_INTEGER | gl::DEPTH_STENCIL => 1,
        gl::RG | gl::RG_INTEGER => 2,
        gl::RGB | gl::BGR | gl::RGB_INTEGER => 3,
        gl::RGBA | gl::BGRA | gl::RGBA_INTEGER => 4,
        _ => return None,
    };

    Some(match data_type {
        gl::UNSIGNED_BYTE | gl::BYTE => channels,
        gl::UNSIGNED_SHORT | gl::SHORT | gl::HALF_FLOAT => channels * 2,
        gl::UNSIGNED_INT | gl::INT | gl::FLOAT => channels * 4,
        // packed types hold a whole texel
        gl::UNSIGNED_SHORT_5_6_5 | gl::UNSIGNED_SHORT_4_4_4_4 | gl::UNSIGNED_SHORT_5_5_5_1 => 2,
        gl::UNSIGNED_INT_8_8_8_8
        | gl::UNSIGNED_INT_8_8_8_8_REV
        | gl::UNSIGNED_INT_2_10_10_10_REV
        | gl::UNSIGNED_INT_10F_11F_11F_REV
        | gl::UNSIGNED_INT_24_8 => 4,
        _ => return None,
    })
}

/// Bytes `glTexImage2D` reads for a `width` × `height` image, rows padded to
/// [`UNPACK_ALIGNMENT`] except for the last one.
pub const fn unpacked_image_size(
    width: u32,
    height: u32,
    format: u32,
    data_type: u32,
) -> Option<usize> {
    let Some(texel) = texel_size(format, data_type) else {
        return None;
    };

    let row = width as usize * texel;
    if height == 0 || row == 0 {
        return Some(0);
    }

    let padded_row = row.next_multiple_of(UNPACK_ALIGNMENT);
    Some(padded_row * (height as usize - 1) + row)
}

/// The subset of OpenGL entry points the wrappers need.
///
/// Implementations assume a context is current on the calling thread. Creation functions return
/// `None` when the driver hands out the reserved name `0`.
pub trait Backend {
    fn create_buffer(&self) -> Option<BufferId>;
    fn delete_buffer(&self, buffer: BufferId);
    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>);
    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<BufferId>);
    fn buffer_data(&self, target: u32, data: BufferData<'_>, usage: u32);
    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]);
    fn get_buffer_sub_data(&self, target: u32, offset: usize, data: &mut [u8]);
    fn buffer_size(&self, target: u32) -> usize;
    fn copy_buffer_sub_data(
        &self,
        read_target: u32,
        write_target: u32,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    );

    fn create_vertex_array(&self) -> Option<VertexArrayId>;
    fn delete_vertex_array(&self, vertex_array: VertexArrayId);
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>);
    fn enable_vertex_attrib_array(&self, index: u32);
    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: usize,
        offset: usize,
    );
    fn vertex_attrib_divisor(&self, index: u32, divisor: u32);

    fn create_texture(&self) -> Option<TextureId>;
    fn delete_texture(&self, texture: TextureId);
    fn active_texture(&self, unit: u32);
    fn bind_texture(&self, target: u32, texture: Option<TextureId>);
    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32);
    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: u32,
        height: u32,
        format: u32,
        data_type: u32,
        pixels: Option<&[u8]>,
    );
    fn tex_image_2d_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: u32,
        height: u32,
        fixed_sample_locations: bool,
    );
    fn generate_mipmap(&self, target: u32);

    fn create_renderbuffer(&self) -> Option<RenderbufferId>;
    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId);
    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferId>);
    fn renderbuffer_storage(&self, internal_format: u32, width: u32, height: u32);

    fn create_framebuffer(&self) -> Option<FramebufferId>;
    fn delete_framebuffer(&self, framebuffer: FramebufferId);
    fn bind_framebuffer(&self, target: u32, framebuffer: Option<FramebufferId>);
    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<RenderbufferId>,
    );
    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<TextureId>,
        level: i32,
    );
    fn check_framebuffer_status(&self, target: u32) -> u32;
    fn viewport(&self, x: i32, y: i32, width: u32, height: u32);

    fn create_shader(&self, shader_type: u32) -> Option<ShaderId>;
    fn delete_shader(&self, shader: ShaderId);
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compile_status(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;

    fn create_program(&self) -> Option<ProgramId>;
    fn delete_program(&self, program: ProgramId);
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_link_status(&self, program: ProgramId) -> bool;
    fn validate_program(&self, program: ProgramId);
    fn program_validate_status(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn use_program(&self, program: Option<ProgramId>);
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32>;
    fn uniform_1_i32(&self, location: i32, x: i32);
    fn uniform_1_f32(&self, location: i32, x: f32);
    fn uniform_2_f32(&self, location: i32, x: f32, y: f32);
    fn uniform_3_f32(&self, location: i32, x: f32, y: f32, z: f32);
    fn uniform_4_f32(&self, location: i32, x: f32, y: f32, z: f32, w: f32);
    fn uniform_matrix_4_f32(&self, location: i32, transpose: bool, value: &[f32; 16]);

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32);
    fn clear(&self, mask: u32);
    fn draw_arrays(&self, mode: u32, first: i32, count: i32);
    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: usize);
    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: usize,
        instances: i32,
    );

    /// Pops the oldest pending error flag, `gl::NO_ERROR` when there is none.
    fn get_error(&self) -> u32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn texel_sizes() {
        assert_eq!(texel_size(gl::RGBA, gl::FLOAT), Some(16));
        assert_eq!(texel_size(gl::RGB, gl::UNSIGNED_BYTE), Some(3));
        assert_eq!(texel_size(gl::RGBA, gl::UNSIGNED_INT_8_8_8_8), Some(4));
        assert_eq!(texel_size(gl::RGBA, gl::FLOAT_VEC4), None);
    }

    #[test]
    fn image_rows_are_padded_except_the_last() {
        // 3 byte rows are read 4 bytes apart
        assert_eq!(unpacked_image_size(3, 2, gl::RED, gl::UNSIGNED_BYTE), Some(7));
        assert_eq!(unpacked_image_size(64, 64, gl::RGBA, gl::FLOAT), Some(65536));
        assert_eq!(unpacked_image_size(0, 8, gl::RGBA, gl::FLOAT), Some(0));
    }
}
