use super::*;
use log::trace;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Vertex attribute state recorded by `glVertexAttribPointer` and friends.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct VertexAttribState {
    pub enabled: bool,
    pub components: i32,
    pub data_type: u32,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
    pub divisor: u32,
    /// The array buffer that was bound when the pointer was specified.
    pub buffer: Option<BufferId>,
}

#[derive(Debug, Clone, Default)]
struct VertexArrayState {
    attributes: HashMap<u32, VertexAttribState>,
    element_buffer: Option<BufferId>,
}

/// One level-0 image of a texture, or one face of a cube map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    pub internal_format: i32,
    pub width: u32,
    pub height: u32,
    pub format: u32,
    pub data_type: u32,
    pub pixels: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct TextureState {
    /// The target the texture was first bound to, which fixes its type.
    pub target: Option<u32>,
    pub parameters: HashMap<u32, i32>,
    /// Images keyed by image target (`TEXTURE_2D`, or one of the six cube faces).
    pub images: HashMap<u32, TextureImage>,
    pub samples: Option<i32>,
    pub mipmaps_generated: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderbufferStorage {
    pub internal_format: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Attachment {
    Texture {
        texture: TextureId,
        target: u32,
        level: i32,
    },
    Renderbuffer(RenderbufferId),
}

#[derive(Debug, Clone, Default)]
struct ShaderState {
    shader_type: u32,
    source: String,
    compiled: bool,
    log: String,
}

#[derive(Debug, Clone, Default)]
struct ProgramState {
    attached: Vec<ShaderId>,
    linked: bool,
    validated: bool,
    log: String,
    uniforms: HashMap<String, i32>,
    values: HashMap<i32, UniformValue>,
}

/// A value written through one of the `glUniform*` calls.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Mat4 { transpose: bool, value: [f32; 16] },
}

/// A recorded draw call, with the state it was issued under.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: u32,
    pub count: i32,
    pub instances: i32,
    pub indexed: bool,
    pub vertex_array: Option<VertexArrayId>,
    pub program: Option<ProgramId>,
    pub framebuffer: Option<FramebufferId>,
}

#[derive(Debug, Default)]
struct State {
    last_name: u32,
    errors: VecDeque<u32>,

    buffers: HashMap<BufferId, Vec<u8>>,
    buffer_bindings: HashMap<u32, BufferId>,
    indexed_bindings: HashMap<(u32, u32), BufferId>,

    vertex_arrays: HashMap<VertexArrayId, VertexArrayState>,
    bound_vertex_array: Option<VertexArrayId>,

    textures: HashMap<TextureId, TextureState>,
    texture_bindings: HashMap<(u32, u32), TextureId>,
    active_unit: u32,

    renderbuffers: HashMap<RenderbufferId, Option<RenderbufferStorage>>,
    bound_renderbuffer: Option<RenderbufferId>,

    framebuffers: HashMap<FramebufferId, HashMap<u32, Attachment>>,
    draw_framebuffer: Option<FramebufferId>,
    read_framebuffer: Option<FramebufferId>,
    viewport: (i32, i32, u32, u32),

    shaders: HashMap<ShaderId, ShaderState>,
    programs: HashMap<ProgramId, ProgramState>,
    current_program: Option<ProgramId>,

    clear_color: [f32; 4],
    draw_calls: Vec<DrawCall>,
}

impl State {
    fn next_name(&mut self) -> u32 {
        self.last_name += 1;
        self.last_name
    }

    fn error(&mut self, code: u32) {
        trace!("Headless GL error 0x{code:04X}");
        self.errors.push_back(code);
    }

    fn bound_buffer_mut(&mut self, target: u32) -> Option<&mut Vec<u8>> {
        let id = self.buffer_bindings.get(&target).copied()?;
        self.buffers.get_mut(&id)
    }

    fn texture_binding_target(image_target: u32) -> u32 {
        if (gl::TEXTURE_CUBE_MAP_POSITIVE_X..=gl::TEXTURE_CUBE_MAP_NEGATIVE_Z).contains(&image_target) {
            gl::TEXTURE_CUBE_MAP
        } else {
            image_target
        }
    }

    fn bound_texture_mut(&mut self, image_target: u32) -> Option<&mut TextureState> {
        let target = Self::texture_binding_target(image_target);
        let id = self
            .texture_bindings
            .get(&(self.active_unit, target))
            .copied()?;
        self.textures.get_mut(&id)
    }

    fn bound_framebuffer(&self, target: u32) -> Option<FramebufferId> {
        match target {
            gl::READ_FRAMEBUFFER => self.read_framebuffer,
            _ => self.draw_framebuffer,
        }
    }

    fn current_program_mut(&mut self) -> Option<&mut ProgramState> {
        let id = self.current_program?;
        self.programs.get_mut(&id)
    }

    fn set_uniform(&mut self, location: i32, value: UniformValue) {
        let known = self.current_program_mut().is_some_and(|program| {
            let known = program.uniforms.values().any(|l| *l == location);
            if known {
                program.values.insert(location, value);
            }
            known
        });

        if !known {
            self.error(gl::INVALID_OPERATION);
        }
    }

    fn record_draw(&mut self, mode: u32, count: i32, instances: i32, indexed: bool) {
        if self.bound_vertex_array.is_none() || self.current_program.is_none() {
            self.error(gl::INVALID_OPERATION);
            return;
        }

        self.draw_calls.push(DrawCall {
            mode,
            count,
            instances,
            indexed,
            vertex_array: self.bound_vertex_array,
            program: self.current_program,
            framebuffer: self.draw_framebuffer,
        });
    }
}

/// Finds the names declared with `uniform <type> <name>;` in GLSL source.
fn declared_uniforms(source: &str) -> impl Iterator<Item = &str> {
    source.lines().filter_map(|line| {
        let mut tokens = line.split_whitespace();
        tokens.find(|t| *t == "uniform")?;
        let _type = tokens.next()?;
        let name = tokens.next()?;
        let name = name.trim_end_matches(';');
        let name = name.split('[').next().unwrap_or(name);
        name.starts_with(|c: char| c.is_alphabetic() || c == '_')
            .then_some(name)
    })
}

/// An OpenGL stand-in that keeps all object state in memory.
///
/// Buffer contents, vertex attribute setup, texture images, framebuffer attachments, shader
/// status and uniform values behave like a conforming driver would store them, so they can be
/// inspected after running resource code. Misuse the driver would flag (writing past the end of
/// a buffer, drawing without a program, ...) queues the matching error for [`Backend::get_error`].
///
/// Shaders compile when their source is non-empty and defines `main`.
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    state: RefCell<State>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(&buffer).cloned()
    }

    pub fn bound_buffer(&self, target: u32) -> Option<BufferId> {
        self.state.borrow().buffer_bindings.get(&target).copied()
    }

    pub fn indexed_buffer_binding(&self, target: u32, index: u32) -> Option<BufferId> {
        self.state
            .borrow()
            .indexed_bindings
            .get(&(target, index))
            .copied()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    pub fn live_renderbuffers(&self) -> usize {
        self.state.borrow().renderbuffers.len()
    }

    pub fn live_framebuffers(&self) -> usize {
        self.state.borrow().framebuffers.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn vertex_attribute(
        &self,
        vertex_array: VertexArrayId,
        index: u32,
    ) -> Option<VertexAttribState> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)?
            .attributes
            .get(&index)
            .copied()
    }

    pub fn element_buffer(&self, vertex_array: VertexArrayId) -> Option<BufferId> {
        self.state
            .borrow()
            .vertex_arrays
            .get(&vertex_array)?
            .element_buffer
    }

    pub fn texture(&self, texture: TextureId) -> Option<TextureState> {
        self.state.borrow().textures.get(&texture).cloned()
    }

    pub fn bound_texture(&self, unit: u32, target: u32) -> Option<TextureId> {
        self.state
            .borrow()
            .texture_bindings
            .get(&(unit, target))
            .copied()
    }

    pub fn active_texture_unit(&self) -> u32 {
        self.state.borrow().active_unit
    }

    pub fn renderbuffer_storage(&self, renderbuffer: RenderbufferId) -> Option<RenderbufferStorage> {
        self.state
            .borrow()
            .renderbuffers
            .get(&renderbuffer)
            .copied()
            .flatten()
    }

    pub fn framebuffer_attachment(
        &self,
        framebuffer: FramebufferId,
        attachment: u32,
    ) -> Option<Attachment> {
        self.state
            .borrow()
            .framebuffers
            .get(&framebuffer)?
            .get(&attachment)
            .copied()
    }

    pub fn bound_framebuffer(&self) -> Option<FramebufferId> {
        self.state.borrow().draw_framebuffer
    }

    pub fn viewport_rect(&self) -> (i32, i32, u32, u32) {
        self.state.borrow().viewport
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current_program
    }

    pub fn uniform_value(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        let state = self.state.borrow();
        let program = state.programs.get(&program)?;
        let location = program.uniforms.get(name)?;
        program.values.get(location).copied()
    }

    pub fn clear_color_value(&self) -> [f32; 4] {
        self.state.borrow().clear_color
    }

    pub fn draw_calls(&self) -> Vec<DrawCall> {
        self.state.borrow().draw_calls.clone()
    }

    pub fn pending_errors(&self) -> usize {
        self.state.borrow().errors.len()
    }
}

impl Backend for HeadlessBackend {
    fn create_buffer(&self) -> Option<BufferId> {
        let mut state = self.state.borrow_mut();
        let id = BufferId::new(state.next_name())?;
        state.buffers.insert(id, Vec::new());
        Some(id)
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer);
        state.buffer_bindings.retain(|_, bound| *bound != buffer);
        state.indexed_bindings.retain(|_, bound| *bound != buffer);
        for vao in state.vertex_arrays.values_mut() {
            if vao.element_buffer == Some(buffer) {
                vao.element_buffer = None;
            }
        }
    }

    fn bind_buffer(&self, target: u32, buffer: Option<BufferId>) {
        let mut state = self.state.borrow_mut();

        match buffer {
            Some(id) if !state.buffers.contains_key(&id) => {
                state.error(gl::INVALID_OPERATION);
                return;
            }
            Some(id) => {
                state.buffer_bindings.insert(target, id);
            }
            None => {
                state.buffer_bindings.remove(&target);
            }
        }

        if target == gl::ELEMENT_ARRAY_BUFFER
            && let Some(vao) = state.bound_vertex_array
            && let Some(vao) = state.vertex_arrays.get_mut(&vao)
        {
            vao.element_buffer = buffer;
        }
    }

    fn bind_buffer_base(&self, target: u32, index: u32, buffer: Option<BufferId>) {
        let mut state = self.state.borrow_mut();
        match buffer {
            Some(id) if !state.buffers.contains_key(&id) => state.error(gl::INVALID_OPERATION),
            Some(id) => {
                state.indexed_bindings.insert((target, index), id);
                state.buffer_bindings.insert(target, id);
            }
            None => {
                state.indexed_bindings.remove(&(target, index));
            }
        }
    }

    fn buffer_data(&self, target: u32, data: BufferData<'_>, _usage: u32) {
        let mut state = self.state.borrow_mut();
        let Some(storage) = state.bound_buffer_mut(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        *storage = match data {
            BufferData::Size(size) => vec![0; size],
            BufferData::Bytes(bytes) => bytes.to_vec(),
        };
    }

    fn buffer_sub_data(&self, target: u32, offset: usize, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(storage) = state.bound_buffer_mut(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        match storage.get_mut(offset..offset + data.len()) {
            Some(range) => range.copy_from_slice(data),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn get_buffer_sub_data(&self, target: u32, offset: usize, data: &mut [u8]) {
        let mut state = self.state.borrow_mut();
        let Some(storage) = state.bound_buffer_mut(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        match storage.get(offset..offset + data.len()) {
            Some(range) => data.copy_from_slice(range),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn buffer_size(&self, target: u32) -> usize {
        let mut state = self.state.borrow_mut();
        match state.bound_buffer_mut(target) {
            Some(storage) => storage.len(),
            None => {
                state.error(gl::INVALID_OPERATION);
                0
            }
        }
    }

    fn copy_buffer_sub_data(
        &self,
        read_target: u32,
        write_target: u32,
        read_offset: usize,
        write_offset: usize,
        size: usize,
    ) {
        let mut state = self.state.borrow_mut();
        let (Some(read), Some(write)) = (
            state.buffer_bindings.get(&read_target).copied(),
            state.buffer_bindings.get(&write_target).copied(),
        ) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        let overlapping = read == write
            && read_offset < write_offset + size
            && write_offset < read_offset + size;
        if overlapping {
            state.error(gl::INVALID_VALUE);
            return;
        }

        let Some(source) = state
            .buffers
            .get(&read)
            .and_then(|b| b.get(read_offset..read_offset + size))
            .map(<[u8]>::to_vec)
        else {
            state.error(gl::INVALID_VALUE);
            return;
        };

        match state
            .buffers
            .get_mut(&write)
            .and_then(|b| b.get_mut(write_offset..write_offset + size))
        {
            Some(destination) => destination.copy_from_slice(&source),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn create_vertex_array(&self) -> Option<VertexArrayId> {
        let mut state = self.state.borrow_mut();
        let id = VertexArrayId::new(state.next_name())?;
        state.vertex_arrays.insert(id, VertexArrayState::default());
        Some(id)
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&vertex_array);
        if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
            state.buffer_bindings.remove(&gl::ELEMENT_ARRAY_BUFFER);
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        let mut state = self.state.borrow_mut();

        let element_buffer = match vertex_array {
            Some(id) => match state.vertex_arrays.get(&id) {
                Some(vao) => vao.element_buffer,
                None => {
                    state.error(gl::INVALID_OPERATION);
                    return;
                }
            },
            None => None,
        };

        state.bound_vertex_array = vertex_array;
        match element_buffer {
            Some(buffer) => state.buffer_bindings.insert(gl::ELEMENT_ARRAY_BUFFER, buffer),
            None => state.buffer_bindings.remove(&gl::ELEMENT_ARRAY_BUFFER),
        };
    }

    fn enable_vertex_attrib_array(&self, index: u32) {
        let mut state = self.state.borrow_mut();
        let Some(vao) = state.bound_vertex_array else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            vao.attributes.entry(index).or_default().enabled = true;
        }
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
        let mut state = self.state.borrow_mut();
        if !(1..=4).contains(&size) {
            state.error(gl::INVALID_VALUE);
            return;
        }

        let buffer = state.buffer_bindings.get(&gl::ARRAY_BUFFER).copied();
        let Some(vao) = state.bound_vertex_array else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            let attribute = vao.attributes.entry(index).or_default();
            attribute.components = size;
            attribute.data_type = data_type;
            attribute.normalized = normalized;
            attribute.stride = stride;
            attribute.offset = offset;
            attribute.buffer = buffer;
        }
    }

    fn vertex_attrib_divisor(&self, index: u32, divisor: u32) {
        let mut state = self.state.borrow_mut();
        let Some(vao) = state.bound_vertex_array else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        if let Some(vao) = state.vertex_arrays.get_mut(&vao) {
            vao.attributes.entry(index).or_default().divisor = divisor;
        }
    }

    fn create_texture(&self) -> Option<TextureId> {
        let mut state = self.state.borrow_mut();
        let id = TextureId::new(state.next_name())?;
        state.textures.insert(id, TextureState::default());
        Some(id)
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture);
        state.texture_bindings.retain(|_, bound| *bound != texture);
    }

    fn active_texture(&self, unit: u32) {
        self.state.borrow_mut().active_unit = unit;
    }

    fn bind_texture(&self, target: u32, texture: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        let unit = state.active_unit;

        let Some(id) = texture else {
            state.texture_bindings.remove(&(unit, target));
            return;
        };

        let Some(texture) = state.textures.get_mut(&id) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        match texture.target {
            Some(existing) if existing != target => {
                state.error(gl::INVALID_OPERATION);
                return;
            }
            Some(_) => {}
            None => texture.target = Some(target),
        }

        state.texture_bindings.insert((unit, target), id);
    }

    fn tex_parameter_i32(&self, target: u32, parameter: u32, value: i32) {
        let mut state = self.state.borrow_mut();
        match state.bound_texture_mut(target) {
            Some(texture) => {
                texture.parameters.insert(parameter, value);
            }
            None => state.error(gl::INVALID_OPERATION),
        }
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
        let mut state = self.state.borrow_mut();

        // a driver reading client memory would run past the end of the slice
        if let Some(pixels) = pixels
            && unpacked_image_size(width, height, format, data_type)
                .is_none_or(|needed| pixels.len() < needed)
        {
            state.error(gl::INVALID_OPERATION);
            return;
        }

        let Some(texture) = state.bound_texture_mut(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        // only the base level is tracked
        if level != 0 {
            return;
        }

        texture.images.insert(
            target,
            TextureImage {
                internal_format,
                width,
                height,
                format,
                data_type,
                pixels: pixels.map(<[u8]>::to_vec),
            },
        );
    }

    fn tex_image_2d_multisample(
        &self,
        target: u32,
        samples: i32,
        internal_format: u32,
        width: u32,
        height: u32,
        _fixed_sample_locations: bool,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(texture) = state.bound_texture_mut(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        texture.samples = Some(samples);
        texture.images.insert(
            target,
            TextureImage {
                internal_format: internal_format as i32,
                width,
                height,
                format: 0,
                data_type: 0,
                pixels: None,
            },
        );
    }

    fn generate_mipmap(&self, target: u32) {
        let mut state = self.state.borrow_mut();
        let multisampled = target == gl::TEXTURE_2D_MULTISAMPLE;
        let generated = state.bound_texture_mut(target).is_some_and(|texture| {
            let ok = !multisampled && !texture.images.is_empty();
            texture.mipmaps_generated |= ok;
            ok
        });

        if !generated {
            state.error(gl::INVALID_OPERATION);
        }
    }

    fn create_renderbuffer(&self) -> Option<RenderbufferId> {
        let mut state = self.state.borrow_mut();
        let id = RenderbufferId::new(state.next_name())?;
        state.renderbuffers.insert(id, None);
        Some(id)
    }

    fn delete_renderbuffer(&self, renderbuffer: RenderbufferId) {
        let mut state = self.state.borrow_mut();
        state.renderbuffers.remove(&renderbuffer);
        if state.bound_renderbuffer == Some(renderbuffer) {
            state.bound_renderbuffer = None;
        }
        for attachments in state.framebuffers.values_mut() {
            attachments.retain(|_, a| *a != Attachment::Renderbuffer(renderbuffer));
        }
    }

    fn bind_renderbuffer(&self, renderbuffer: Option<RenderbufferId>) {
        let mut state = self.state.borrow_mut();
        match renderbuffer {
            Some(id) if !state.renderbuffers.contains_key(&id) => {
                state.error(gl::INVALID_OPERATION)
            }
            _ => state.bound_renderbuffer = renderbuffer,
        }
    }

    fn renderbuffer_storage(&self, internal_format: u32, width: u32, height: u32) {
        let mut state = self.state.borrow_mut();
        let Some(id) = state.bound_renderbuffer else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        state.renderbuffers.insert(
            id,
            Some(RenderbufferStorage {
                internal_format,
                width,
                height,
            }),
        );
    }

    fn create_framebuffer(&self) -> Option<FramebufferId> {
        let mut state = self.state.borrow_mut();
        let id = FramebufferId::new(state.next_name())?;
        state.framebuffers.insert(id, HashMap::new());
        Some(id)
    }

    fn delete_framebuffer(&self, framebuffer: FramebufferId) {
        let mut state = self.state.borrow_mut();
        state.framebuffers.remove(&framebuffer);
        if state.draw_framebuffer == Some(framebuffer) {
            state.draw_framebuffer = None;
        }
        if state.read_framebuffer == Some(framebuffer) {
            state.read_framebuffer = None;
        }
    }

    fn bind_framebuffer(&self, target: u32, framebuffer: Option<FramebufferId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = framebuffer
            && !state.framebuffers.contains_key(&id)
        {
            state.error(gl::INVALID_OPERATION);
            return;
        }

        match target {
            gl::DRAW_FRAMEBUFFER => state.draw_framebuffer = framebuffer,
            gl::READ_FRAMEBUFFER => state.read_framebuffer = framebuffer,
            _ => {
                state.draw_framebuffer = framebuffer;
                state.read_framebuffer = framebuffer;
            }
        }
    }

    fn framebuffer_renderbuffer(
        &self,
        target: u32,
        attachment: u32,
        renderbuffer: Option<RenderbufferId>,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(id) = state.bound_framebuffer(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        if let Some(attachments) = state.framebuffers.get_mut(&id) {
            match renderbuffer {
                Some(rb) => attachments.insert(attachment, Attachment::Renderbuffer(rb)),
                None => attachments.remove(&attachment),
            };
        }
    }

    fn framebuffer_texture_2d(
        &self,
        target: u32,
        attachment: u32,
        texture_target: u32,
        texture: Option<TextureId>,
        level: i32,
    ) {
        let mut state = self.state.borrow_mut();
        let Some(id) = state.bound_framebuffer(target) else {
            state.error(gl::INVALID_OPERATION);
            return;
        };

        if let Some(attachments) = state.framebuffers.get_mut(&id) {
            match texture {
                Some(texture) => attachments.insert(
                    attachment,
                    Attachment::Texture {
                        texture,
                        target: texture_target,
                        level,
                    },
                ),
                None => attachments.remove(&attachment),
            };
        }
    }

    fn check_framebuffer_status(&self, target: u32) -> u32 {
        let state = self.state.borrow();
        let Some(id) = state.bound_framebuffer(target) else {
            return gl::FRAMEBUFFER_COMPLETE;
        };

        let Some(attachments) = state.framebuffers.get(&id) else {
            return gl::FRAMEBUFFER_UNDEFINED;
        };

        if attachments.is_empty() {
            return gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        }

        let all_backed = attachments.values().all(|attachment| match attachment {
            Attachment::Renderbuffer(rb) => matches!(state.renderbuffers.get(rb), Some(Some(_))),
            Attachment::Texture { texture, target, .. } => state
                .textures
                .get(texture)
                .is_some_and(|t| t.images.contains_key(target)),
        });

        if all_backed {
            gl::FRAMEBUFFER_COMPLETE
        } else {
            gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT
        }
    }

    fn viewport(&self, x: i32, y: i32, width: u32, height: u32) {
        self.state.borrow_mut().viewport = (x, y, width, height);
    }

    fn create_shader(&self, shader_type: u32) -> Option<ShaderId> {
        let mut state = self.state.borrow_mut();
        let id = ShaderId::new(state.next_name())?;
        state.shaders.insert(
            id,
            ShaderState {
                shader_type,
                ..Default::default()
            },
        );
        Some(id)
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        let attached = state
            .programs
            .values()
            .any(|p| p.attached.contains(&shader));

        // attached shaders are only flagged for deletion by a real driver
        if !attached {
            state.shaders.remove(&shader);
        }
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let mut state = self.state.borrow_mut();
        match state.shaders.get_mut(&shader) {
            Some(s) => s.source = source.to_string(),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        let Some(s) = state.shaders.get_mut(&shader) else {
            state.error(gl::INVALID_VALUE);
            return;
        };

        s.compiled = !s.source.trim().is_empty() && s.source.contains("main");
        s.log = if s.compiled {
            String::new()
        } else {
            format!("0:1(1): error: shader 0x{:04X} has no main function", s.shader_type)
        };
    }

    fn shader_compile_status(&self, shader: ShaderId) -> bool {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .is_some_and(|s| s.compiled)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        self.state
            .borrow()
            .shaders
            .get(&shader)
            .map(|s| s.log.clone())
            .unwrap_or_default()
    }

    fn create_program(&self) -> Option<ProgramId> {
        let mut state = self.state.borrow_mut();
        let id = ProgramId::new(state.next_name())?;
        state.programs.insert(id, ProgramState::default());
        Some(id)
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program);
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        if !state.shaders.contains_key(&shader) {
            state.error(gl::INVALID_VALUE);
            return;
        }

        match state.programs.get_mut(&program) {
            Some(p) => p.attached.push(shader),
            None => state.error(gl::INVALID_VALUE),
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        if let Some(p) = state.programs.get_mut(&program) {
            p.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        let Some(attached) = state.programs.get(&program).map(|p| p.attached.clone()) else {
            state.error(gl::INVALID_VALUE);
            return;
        };

        let shaders: Vec<&ShaderState> = attached
            .iter()
            .filter_map(|id| state.shaders.get(id))
            .collect();

        let linked = !shaders.is_empty() && shaders.iter().all(|s| s.compiled);
        let log = if shaders.is_empty() {
            "error: no shaders attached to the program".to_string()
        } else if !linked {
            "error: linking with uncompiled shader".to_string()
        } else {
            String::new()
        };

        let mut uniforms = HashMap::new();
        if linked {
            for name in shaders.iter().flat_map(|s| declared_uniforms(&s.source)) {
                let next = uniforms.len() as i32;
                uniforms.entry(name.to_string()).or_insert(next);
            }
        }

        if let Some(p) = state.programs.get_mut(&program) {
            p.linked = linked;
            p.log = log;
            p.uniforms = uniforms;
            p.values.clear();
        }
    }

    fn program_link_status(&self, program: ProgramId) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.linked)
    }

    fn validate_program(&self, program: ProgramId) {
        if let Some(p) = self.state.borrow_mut().programs.get_mut(&program) {
            p.validated = p.linked;
        }
    }

    fn program_validate_status(&self, program: ProgramId) -> bool {
        self.state
            .borrow()
            .programs
            .get(&program)
            .is_some_and(|p| p.validated)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        self.state
            .borrow()
            .programs
            .get(&program)
            .map(|p| p.log.clone())
            .unwrap_or_default()
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();
        match program {
            Some(id) if !state.programs.get(&id).is_some_and(|p| p.linked) => {
                state.error(gl::INVALID_OPERATION)
            }
            _ => state.current_program = program,
        }
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<i32> {
        self.state
            .borrow()
            .programs
            .get(&program)?
            .uniforms
            .get(name)
            .copied()
    }

    fn uniform_1_i32(&self, location: i32, x: i32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Int(x));
    }

    fn uniform_1_f32(&self, location: i32, x: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Float(x));
    }

    fn uniform_2_f32(&self, location: i32, x: f32, y: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec2([x, y]));
    }

    fn uniform_3_f32(&self, location: i32, x: f32, y: f32, z: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec3([x, y, z]));
    }

    fn uniform_4_f32(&self, location: i32, x: f32, y: f32, z: f32, w: f32) {
        self.state
            .borrow_mut()
            .set_uniform(location, UniformValue::Vec4([x, y, z, w]));
    }

    fn uniform_matrix_4_f32(&self, location: i32, transpose: bool, value: &[f32; 16]) {
        self.state.borrow_mut().set_uniform(
            location,
            UniformValue::Mat4 {
                transpose,
                value: *value,
            },
        );
    }

    fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.state.borrow_mut().clear_color = [r, g, b, a];
    }

    fn clear(&self, _mask: u32) {}

    fn draw_arrays(&self, mode: u32, _first: i32, count: i32) {
        self.state.borrow_mut().record_draw(mode, count, 1, false);
    }

    fn draw_elements(&self, mode: u32, count: i32, _index_type: u32, _offset: usize) {
        let mut state = self.state.borrow_mut();
        if !state.buffer_bindings.contains_key(&gl::ELEMENT_ARRAY_BUFFER) {
            state.error(gl::INVALID_OPERATION);
            return;
        }
        state.record_draw(mode, count, 1, true);
    }

    fn draw_elements_instanced(
        &self,
        mode: u32,
        count: i32,
        _index_type: u32,
        _offset: usize,
        instances: i32,
    ) {
        let mut state = self.state.borrow_mut();
        if !state.buffer_bindings.contains_key(&gl::ELEMENT_ARRAY_BUFFER) {
            state.error(gl::INVALID_OPERATION);
            return;
        }
        state.record_draw(mode, count, instances, true);
    }

    fn get_error(&self) -> u32 {
        self.state
            .borrow_mut()
            .errors
            .pop_front()
            .unwrap_or(gl::NO_ERROR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_uniforms_reads_names() {
        let src = "uniform mat4 u_proj;\nuniform vec3 u_lights[4];\nin vec3 pos;\n";
        let names: Vec<_> = declared_uniforms(src).collect();
        assert_eq!(names, ["u_proj", "u_lights"]);
    }

    #[test]
    fn element_binding_follows_vertex_array() {
        let backend = HeadlessBackend::new();
        let vao = backend.create_vertex_array().unwrap();
        let ibo = backend.create_buffer().unwrap();

        backend.bind_vertex_array(Some(vao));
        backend.bind_buffer(gl::ELEMENT_ARRAY_BUFFER, Some(ibo));
        backend.bind_vertex_array(None);
        assert_eq!(backend.bound_buffer(gl::ELEMENT_ARRAY_BUFFER), None);

        backend.bind_vertex_array(Some(vao));
        assert_eq!(backend.bound_buffer(gl::ELEMENT_ARRAY_BUFFER), Some(ibo));
        assert_eq!(backend.element_buffer(vao), Some(ibo));
    }

    #[test]
    fn overlapping_copy_is_rejected() {
        let backend = HeadlessBackend::new();
        let buffer = backend.create_buffer().unwrap();
        backend.bind_buffer(gl::COPY_READ_BUFFER, Some(buffer));
        backend.bind_buffer(gl::COPY_WRITE_BUFFER, Some(buffer));
        backend.buffer_data(gl::COPY_READ_BUFFER, BufferData::Size(16), gl::DYNAMIC_DRAW);

        backend.copy_buffer_sub_data(gl::COPY_READ_BUFFER, gl::COPY_WRITE_BUFFER, 0, 4, 8);
        assert_eq!(backend.get_error(), gl::INVALID_VALUE);

        backend.copy_buffer_sub_data(gl::COPY_READ_BUFFER, gl::COPY_WRITE_BUFFER, 0, 8, 8);
        assert_eq!(backend.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn attribute_pointer_takes_one_to_four_components() {
        let backend = HeadlessBackend::new();
        let vao = backend.create_vertex_array().unwrap();
        backend.bind_vertex_array(Some(vao));

        backend.vertex_attrib_pointer(0, 16, gl::FLOAT, false, 64, 0);
        assert_eq!(backend.get_error(), gl::INVALID_VALUE);
        assert!(backend.vertex_attribute(vao, 0).is_none());

        backend.vertex_attrib_pointer(0, 4, gl::FLOAT, false, 64, 0);
        assert_eq!(backend.get_error(), gl::NO_ERROR);
    }

    #[test]
    fn short_image_upload_is_rejected() {
        let backend = HeadlessBackend::new();
        let texture = backend.create_texture().unwrap();
        backend.bind_texture(gl::TEXTURE_2D, Some(texture));

        let texel = [0u8; 16];
        let upload = |size| {
            backend.tex_image_2d(
                gl::TEXTURE_2D,
                0,
                gl::RGBA as i32,
                size,
                size,
                gl::RGBA,
                gl::FLOAT,
                Some(&texel),
            );
        };

        upload(64);
        assert_eq!(backend.get_error(), gl::INVALID_OPERATION);

        upload(1);
        assert_eq!(backend.get_error(), gl::NO_ERROR);
    }
}
