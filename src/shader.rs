use crate::backend::{Backend, ProgramId, ShaderId};
use crate::context::Context;
use crate::error::{
    AllocationErr, CompileErr, LinkErr, NoStagesErr, ReadSourceErr, ShaderError, UnknownStageErr,
    ValidateErr,
};
use crate::utils::file_stem;
use itertools::Itertools;
use log::{debug, error, warn};
use nalgebra::Matrix4;
use smallvec::SmallVec;
use snafu::{OptionExt, ResultExt, ensure};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::ops::Index;
use std::path::Path;

/// Marks the start of a stage in a combined source: `#type vertex`.
const TYPE_TOKEN: &str = "#type";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    TessControl,
    TessEval,
    Geometry,
}

impl ShaderStage {
    /// Parses the tag following `#type`.
    pub fn from_tag(tag: &str) -> Result<Self, ShaderError> {
        Ok(match tag {
            "vertex" => ShaderStage::Vertex,
            "fragment" => ShaderStage::Fragment,
            "tess_control" => ShaderStage::TessControl,
            "tess_eval" => ShaderStage::TessEval,
            "geometry" => ShaderStage::Geometry,
            _ => return UnknownStageErr { tag }.fail(),
        })
    }

    pub const fn gl_type(self) -> u32 {
        match self {
            ShaderStage::Vertex => gl::VERTEX_SHADER,
            ShaderStage::Fragment => gl::FRAGMENT_SHADER,
            ShaderStage::TessControl => gl::TESS_CONTROL_SHADER,
            ShaderStage::TessEval => gl::TESS_EVALUATION_SHADER,
            ShaderStage::Geometry => gl::GEOMETRY_SHADER,
        }
    }
}

/// The GLSL source of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub source: String,
}

/// Splits a combined source into stages. Each stage starts at a `#type <stage>` line and runs
/// until the next one. Text before the first tag is ignored.
pub fn parse_stages(source: &str) -> Result<Vec<ShaderSource>, ShaderError> {
    source
        .split(TYPE_TOKEN)
        .skip(1)
        .map(|section| {
            let (tag, body) = section.split_once('\n').unwrap_or((section, ""));
            Ok(ShaderSource {
                stage: ShaderStage::from_tag(tag.trim())?,
                source: body.trim_start_matches(['\r', '\n']).to_string(),
            })
        })
        .collect()
}

/// A linked shader program.
///
/// Uniforms are written to whichever program is current, so [`bind`](Self::bind) the program
/// before uploading. Locations are looked up once per name and cached.
#[derive(Debug)]
pub struct ShaderProgram {
    ctx: Context,
    id: ProgramId,
    name: String,
    stages: Vec<ShaderSource>,
    uniform_cache: RefCell<HashMap<String, Option<i32>>>,
}

impl ShaderProgram {
    /// Builds a program from a source holding several `#type`-tagged stages.
    pub fn from_source(
        ctx: &Context,
        name: impl Into<String>,
        source: &str,
    ) -> Result<Self, ShaderError> {
        Self::from_stages(ctx, name, parse_stages(source)?)
    }

    /// Builds a program from a combined source file, named after the file.
    pub fn from_file(ctx: &Context, path: impl AsRef<Path>) -> Result<Self, ShaderError> {
        let path = path.as_ref();
        Self::from_named_file(ctx, file_stem(path), path)
    }

    pub fn from_named_file(
        ctx: &Context,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Self, ShaderError> {
        let source = read_source(path.as_ref())?;
        Self::from_source(ctx, name, &source)
    }

    /// Builds a program from one file per stage.
    pub fn from_stage_files<P: AsRef<Path>>(
        ctx: &Context,
        name: impl Into<String>,
        files: &[(ShaderStage, P)],
    ) -> Result<Self, ShaderError> {
        let stages = files
            .iter()
            .map(|(stage, path)| {
                Ok(ShaderSource {
                    stage: *stage,
                    source: read_source(path.as_ref())?,
                })
            })
            .collect::<Result<Vec<_>, ShaderError>>()?;

        Self::from_stages(ctx, name, stages)
    }

    /// Compiles, links and validates `stages`. Stage objects are deleted once linked.
    pub fn from_stages(
        ctx: &Context,
        name: impl Into<String>,
        stages: Vec<ShaderSource>,
    ) -> Result<Self, ShaderError> {
        let name = name.into();
        ensure!(!stages.is_empty(), NoStagesErr { name });

        let gl = ctx.gl();
        let id = gl
            .create_program()
            .context(AllocationErr { kind: "program" })?;

        let mut shaders: SmallVec<[ShaderId; 5]> = SmallVec::new();
        let built = build_program(gl, id, &name, &stages, &mut shaders);

        for &shader in &shaders {
            gl.detach_shader(id, shader);
            gl.delete_shader(shader);
        }

        if let Err(e) = built {
            error!("{e}");
            gl.delete_program(id);
            return Err(e);
        }

        debug!(
            "Linked shader program {name:?} #{} ({})",
            id.get(),
            stages.iter().map(|s| format!("{:?}", s.stage)).join(", ")
        );

        Ok(Self {
            ctx: ctx.clone(),
            id,
            name,
            stages,
            uniform_cache: RefCell::new(HashMap::new()),
        })
    }

    pub fn bind(&self) {
        self.ctx.gl().use_program(Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().use_program(None);
    }

    pub fn upload_uniform1i(&self, name: &str, value: i32) {
        if let Some(location) = self.uniform_location(name) {
            self.ctx.gl().uniform_1_i32(location, value);
        }
    }

    pub fn upload_uniform1f(&self, name: &str, value: f32) {
        if let Some(location) = self.uniform_location(name) {
            self.ctx.gl().uniform_1_f32(location, value);
        }
    }

    pub fn upload_uniform2f(&self, name: &str, x: f32, y: f32) {
        if let Some(location) = self.uniform_location(name) {
            self.ctx.gl().uniform_2_f32(location, x, y);
        }
    }

    pub fn upload_uniform3f(&self, name: &str, x: f32, y: f32, z: f32) {
        if let Some(location) = self.uniform_location(name) {
            self.ctx.gl().uniform_3_f32(location, x, y, z);
        }
    }

    pub fn upload_uniform4f(&self, name: &str, x: f32, y: f32, z: f32, w: f32) {
        if let Some(location) = self.uniform_location(name) {
            self.ctx.gl().uniform_4_f32(location, x, y, z, w);
        }
    }

    /// Uploads a column-major matrix.
    pub fn upload_uniform_mat4(&self, name: &str, matrix: &Matrix4<f32>) {
        if let Some(location) = self.uniform_location(name) {
            let columns: &[f32; 16] = bytemuck::cast_ref(matrix);
            self.ctx.gl().uniform_matrix_4_f32(location, false, columns);
        }
    }

    /// The location of an active uniform, `None` when the program has no such uniform.
    pub fn uniform_location(&self, name: &str) -> Option<i32> {
        if let Some(location) = self.uniform_cache.borrow().get(name) {
            return *location;
        }

        let location = self.ctx.gl().uniform_location(self.id, name);
        if location.is_none() {
            warn!("Shader program {:?} has no active uniform {name:?}", self.name);
        }

        self.uniform_cache
            .borrow_mut()
            .insert(name.to_string(), location);
        location
    }

    #[inline]
    pub fn id(&self) -> ProgramId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn stages(&self) -> &[ShaderSource] {
        &self.stages
    }
}

impl Index<usize> for ShaderProgram {
    type Output = ShaderSource;

    fn index(&self, index: usize) -> &Self::Output {
        &self.stages[index]
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        debug!("Deleting shader program {:?} #{}", self.name, self.id.get());
        self.ctx.gl().delete_program(self.id);
    }
}

fn read_source(path: &Path) -> Result<String, ShaderError> {
    fs::read_to_string(path).context(ReadSourceErr { path })
}

/// Every stage object created is pushed to `shaders`, attached, even when building fails.
fn build_program(
    gl: &dyn Backend,
    program: ProgramId,
    name: &str,
    stages: &[ShaderSource],
    shaders: &mut SmallVec<[ShaderId; 5]>,
) -> Result<(), ShaderError> {
    for ShaderSource { stage, source } in stages {
        let shader = gl
            .create_shader(stage.gl_type())
            .context(AllocationErr { kind: "shader" })?;
        shaders.push(shader);
        gl.attach_shader(program, shader);

        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.shader_compile_status(shader) {
            return CompileErr {
                name,
                stage: *stage,
                log: gl.shader_info_log(shader),
            }
            .fail();
        }
    }

    gl.link_program(program);
    if !gl.program_link_status(program) {
        return LinkErr {
            name,
            log: gl.program_info_log(program),
        }
        .fail();
    }

    gl.validate_program(program);
    if !gl.program_validate_status(program) {
        return ValidateErr {
            name,
            log: gl.program_info_log(program),
        }
        .fail();
    }

    Ok(())
}
