use super::*;
use gl::types::{GLboolean, GLchar, GLint, GLsizei, GLsizeiptr, GLintptr};
use log::{debug, error, warn};
use std::ffi::{CString, c_void};
use std::ptr;

/// Forwards every call to the OpenGL driver of the current context.
///
/// Holds no state; the function pointers live in the `gl` crate's global table.
#[derive(Debug)]
pub struct NativeBackend {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl NativeBackend {
    /// Loads the GL function pointers through `loader`, usually the windowing library's
    /// `get_proc_address`.
    ///
    /// # Safety
    ///
    /// A context must be current on this thread, and stay current for as long as the backend
    /// or any resource created through it is alive.
    pub unsafe fn load_with<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        gl::load_with(loader);
        debug!("Loaded OpenGL function pointers");

        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

#[inline]
fn gl_bool(value: bool) -> GLboolean {
    if value { gl::TRUE } else { gl::FALSE }
}

#[inline]
fn raw<T>(handle: Option<T>, get: impl FnOnce(T) -> u32) -> u32 {
    handle.map(get).unwrap_or(0)
}

fn info_log(length: GLint, fetch: impl FnOnce(GLsizei, *mut GLsizei, *mut GLchar)) -> String {
    let capacity = length.max(1);
    let mut buffer = vec![0u8; capacity as usize];
    let mut written: GLsizei = 0;

    fetch(
        capacity,
        &mut written as *mut GLsizei,
        buffer.as_mut_ptr() as *mut GLchar,
    );

    buffer.truncate(written.max(0) as usize);
    String::from_utf8_lossy(&buffer).into_owned()
}

// SAFETY (every block below): `load_with` requires a current context for the lifetime of the
// backend, and all pointers handed to the driver come from live slices of the stated length.
// Image uploads check the slice against the size the driver will read before passing it on.
impl Backend for NativeBackend {
    fn create_buffer(&self) -> Option<BufferId> {
        let mut id = 0;
        unsafe { gl::GenBuffers(1, &mut id) };
        BufferId::new(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let id = buffer.get();
        unsafe { gl::DeleteBuffers(1, &id) };
    }

    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>) {
        unsafe { gl::BindBuffer(target, raw(buffer, BufferId::get)) };
    }

    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<BufferId>) {
        unsafe { gl::BindBufferBase(target, index, raw(buffer, BufferId::get)) };
    }

    fn buffer_data(&self, target: u32, data: BufferData<'_>, usage: u32) {
        let (size, pointer) = match data {
            BufferData::Size(size) => (size, ptr::null()),
            BufferData::Bytes(bytes) => (bytes.len(), bytes.as_ptr() as *const c_void),
        };
        unsafe { gl::BufferData(target, size as GLsizeiptr, pointer, usage) };
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        unsafe {
            gl::BufferSubData(
                target,
                offset as GLintptr,
                data.len() as GLsizeiptr,
                data.as_ptr() as *const c_void,
            )
        };
    }

    fn get_buffer_sub_data(&self, target: u32, offset: usize, data: &mut [u8]) {
        unsafe {
            gl::GetBufferSubData(
                target,
                offset as GLintptr,
                data.len() as GLsizeiptr,
                data.as_mut_ptr() as *mut c_void,
            )
        };
    }

    fn buffer_size(&self, target: u32) -> usize {
        let mut size: GLint = 0;
        unsafe { gl::GetBufferParameteriv(target, gl::BUFFER_SIZE, &mut size) };
        size.max(0) as usize
    }

    fn copy_buffer_sub_data(
        &self,
        read_target: u32,
        write_target: u32,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) {
        unsafe {
            gl::CopyBufferSubData(
                read_target,
                write_target,
                read_offset as GLintptr,
                write_offset as GLintptr,
                size as GLsizeiptr,
            )
        };
    }

    fn create_vertex_array(&self) -> Option<VertexArrayId> {
        let mut id = 0;
        unsafe { gl::GenVertexArrays(1, &mut id) };
        VertexArrayId::new(id)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let id = vertex_array.get();
        unsafe { gl::DeleteVertexArrays(1, &id) };
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        unsafe { gl::BindVertexArray(raw(vertex_array, VertexArrayId::get)) };
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        unsafe { gl::EnableVertexAttribArray(index) };
    }

    fn vertex_attrib_pointer(
        &self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: usize,
        offset: usize,
    ) {
        unsafe {
            gl::VertexAttribPointer(
                index,
                size,
                data_type,
                gl_bool(normalized),
                stride as GLsizei,
                offset as *const c_void,
            )
        };
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        unsafe { gl::VertexAttribDivisor(index, divisor) };
    }

    fn create_texture(&self) -> Option<TextureId> {
        let mut id = 0;
        unsafe { gl::GenTextures(1, &mut id) };
        TextureId::new(id)
    }

    fn delete_texture(&self, texture: TextureId) {
        let id = texture.get();
        unsafe { gl::DeleteTextures(1, &id) };
    }

    fn active_texture(&self, unit: u32) {
        unsafe { gl::ActiveTexture(gl::TEXTURE0 + unit) };
    }

    fn bind_texture(&self, target: u32, texture: Option<TextureId>) {
        unsafe { gl::BindTexture(target, raw(texture, TextureId::get)) };
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        unsafe { gl::TexParameteri(target, parameter, value) };
    }

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
    ) {
        if let Some(pixels) = pixels {
            let needed = unpacked_image_size(width, height, format, data_type);
            if needed.is_none_or(|needed| pixels.len() < needed) {
                error!(
                    "Refusing to upload {width}x{height} image from {} bytes (needs {needed:?})",
                    pixels.len()
                );
                return;
            }
        }

        let pointer = pixels.map_or(ptr::null(), |p| p.as_ptr() as *const c_void);
        unsafe {
            gl::TexImage2D(
                target,
                level,
                internal_format,
                width as GLsizei,
                height as GLsizei,
                0,
                format,
                data_type,
                pointer,
            )
        };
    }

    fn tex_image_2d_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: u32,
        height: u32,
        fixed_sample_locations: bool,
    ) {
        unsafe {
            gl::TexImage2DMultisample(
                target,
                samples,
                internal_format,
                width as GLsizei,
                height as GLsizei,
                gl_bool(fixed_sample_locations),
            )
        };
    }

    fn generate_mipmap(&self, target: u32) {
        unsafe { gl::GenerateMipmap(target) };
    }

    fn create_renderbuffer(&self) -> Option<RenderbufferId> {
        let mut id = 0;
        unsafe { gl::GenRenderbuffers(1, &mut id) };
        RenderbufferId::new(id)
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        let id = renderbuffer.get();
        unsafe { gl::DeleteRenderbuffers(1, &id) };
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferId>) {
        unsafe { gl::BindRenderbuffer(gl::RENDERBUFFER, raw(renderbuffer, RenderbufferId::get)) };
    }

    fn renderbuffer_storage(&self, internal_format: u32, width: u32, height: u32) {
        unsafe {
            gl::RenderbufferStorage(
                gl::RENDERBUFFER,
                internal_format,
                width as GLsizei,
                height as GLsizei,
            )
        };
    }

    fn create_framebuffer(&self) -> Option<FramebufferId> {
        let mut id = 0;
        unsafe { gl::GenFramebuffers(1, &mut id) };
        FramebufferId::new(id)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let id = framebuffer.get();
        unsafe { gl::DeleteFramebuffers(1, &id) };
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<FramebufferId>) {
        unsafe { gl::BindFramebuffer(target, raw(framebuffer, FramebufferId::get)) };
    }

    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<RenderbufferId>,
    ) {
        unsafe {
            gl::FramebufferRenderbuffer(
                target,
                attachment,
                gl::RENDERBUFFER,
                raw(renderbuffer, RenderbufferId::get),
            )
        };
    }

    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<TextureId>,
        level: i32,
    ) {
        unsafe {
            gl::FramebufferTexture2D(
                target,
                attachment,
                texture_target,
                raw(texture, TextureId::get),
                level,
            )
        };
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        unsafe { gl::CheckFramebufferStatus(target) }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { gl::Viewport(x, y, width as GLsizei, height as GLsizei) };
    }

    fn create_shader(&self, shader_type: u32) -> Option<ShaderId> {
        ShaderId::new(unsafe { gl::CreateShader(shader_type) })
    }

    fn delete_shader(&self, shader: ShaderId) {
        unsafe { gl::DeleteShader(shader.get()) };
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let pointer = source.as_ptr() as *const GLchar;
        let length = source.len() as GLint;
        unsafe { gl::ShaderSource(shader.get(), 1, &pointer, &length) };
    }

    fn compile_shader(&self, shader: ShaderId) {
        unsafe { gl::CompileShader(shader.get()) };
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        let mut status: GLint = 0;
        unsafe { gl::GetShaderiv(shader.get(), gl::COMPILE_STATUS, &mut status) };
        status != gl::FALSE as GLint
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        let mut length: GLint = 0;
        unsafe { gl::GetShaderiv(shader.get(), gl::INFO_LOG_LENGTH, &mut length) };
        info_log(length, |capacity, written, buffer| unsafe {
            gl::GetShaderInfoLog(shader.get(), capacity, written, buffer)
        })
    }

    fn create_program(&self) -> Option<ProgramId> {
        ProgramId::new(unsafe { gl::CreateProgram() })
    }

    fn delete_program(&self, program: ProgramId) {
        unsafe { gl::DeleteProgram(program.get()) };
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::AttachShader(program.get(), shader.get()) };
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        unsafe { gl::DetachShader(program.get(), shader.get()) };
    }

    fn link_program(&self, program: ProgramId) {
        unsafe { gl::LinkProgram(program.get()) };
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        let mut status: GLint = 0;
        unsafe { gl::GetProgramiv(program.get(), gl::LINK_STATUS, &mut status) };
        status != gl::FALSE as GLint
    }

    fn validate_program(&self, program: ProgramId) {
        unsafe { gl::ValidateProgram(program.get()) };
    }

    fn program_validate_status(&self, program: ProgramId) -> bool {
        let mut status: GLint = 0;
        unsafe { gl::GetProgramiv(program.get(), gl::VALIDATE_STATUS, &mut status) };
        status != gl::FALSE as GLint
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        let mut length: GLint = 0;
        unsafe { gl::GetProgramiv(program.get(), gl::INFO_LOG_LENGTH, &mut length) };
        info_log(length, |capacity, written, buffer| unsafe {
            gl::GetProgramInfoLog(program.get(), capacity, written, buffer)
        })
    }

    fn use_program(&self, program: Option<ProgramId>) {
        unsafe { gl::UseProgram(raw(program, ProgramId::get)) };
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32> {
        let Ok(name) = CString::new(name) else {
            warn!("Uniform name {name:?} contains a NUL byte");
            return None;
        };

        let location = unsafe { gl::GetUniformLocation(program.get(), name.as_ptr()) };
        (location >= 0).then_some(location)
    }

    fn uniform_1_i32(&self, location: i32, x: i32) {
        unsafe { gl::Uniform1i(location, x) };
    }

    fn uniform_1_f32(&self, location: i32, x: f32) {
        unsafe { gl::Uniform1f(location, x) };
    }

    fn uniform_2_f32(&self, location: i32, x: f32, y: f32) {
        unsafe { gl::Uniform2f(location, x, y) };
    }

    fn uniform_3_f32(&self, location: i32, x: f32, y: f32, z: f32) {
        unsafe { gl::Uniform3f(location, x, y, z) };
    }

    fn uniform_4_f32(&self, location: i32, x: f32, y: f32, z: f32, w: f32) {
        unsafe { gl::Uniform4f(location, x, y, z, w) };
    }

    fn uniform_matrix_4_f32(&self, location: i32, transpose: bool, value: &[f32; 16]) {
        unsafe { gl::UniformMatrix4fv(location, 1, gl_bool(transpose), value.as_ptr()) };
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { gl::ClearColor(r, g, b, a) };
    }

    fn clear(&self, mask: u32) {
        unsafe { gl::Clear(mask) };
    }

    fn draw_arrays(&self, mode: u32, first: i32, count: i32) {
        unsafe { gl::DrawArrays(mode, first, count) };
    }

    fn draw_elements(&self, mode: u32, count: i32, index_type: u32, offset: usize) {
        unsafe { gl::DrawElements(mode, count, index_type, offset as *const c_void) };
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        index_type: u32,
        offset: usize,
        instances: i32,
    ) {
        unsafe {
            gl::DrawElementsInstanced(mode, count, index_type, offset as *const c_void, instances)
        };
    }

    fn get_error(&self) -> u32 {
        unsafe { gl::GetError() }
    }
}
