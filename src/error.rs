use crate::shader::ShaderStage;
use crate::texture::{ColorFormat, ColorSpace};
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum GlError {
    #[snafu(display("The driver failed to create a {kind} object"))]
    Allocation { kind: &'static str },

    #[snafu(display("Expected {expected} bytes of {what} data, got {actual}"))]
    DataSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[snafu(display("The layout has no attribute named {name:?}"))]
    UnknownAttribute { name: String },

    #[snafu(display("Instance #{index} doesn't exist, the buffer holds {count} instances"))]
    InstanceOutOfRange { index: usize, count: usize },

    #[snafu(display("The instance buffer has no layout, so instances have no size"))]
    MissingLayout,

    #[snafu(display("Pixel format 0x{format:04X} with type 0x{datatype:04X} has an unknown texel size"))]
    UnknownPixelFormat { format: u32, datatype: u32 },

    #[snafu(display("Cube map faces must be square, got {width}x{height}"))]
    NonSquareCubemap { width: u32, height: u32 },

    #[snafu(display("The framebuffer is incomplete: {status}"))]
    IncompleteFramebuffer { status: &'static str },

    #[snafu(display("{format:?} has no OpenGL equivalent in {space:?} color space"))]
    InvalidColor {
        format: ColorFormat,
        space: ColorSpace,
    },
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum ShaderError {
    #[snafu(display("Failed to read shader source {}: {source}", path.display()))]
    ReadSource {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Unknown shader type `#type {tag}`"))]
    UnknownStage { tag: String },

    #[snafu(display("Shader program {name:?} has no stages"))]
    NoStages { name: String },

    #[snafu(display("Failed to compile {stage:?} shader of {name:?}: {log}"))]
    Compile {
        name: String,
        stage: ShaderStage,
        log: String,
    },

    #[snafu(display("Failed to link shader program {name:?}: {log}"))]
    Link { name: String, log: String },

    #[snafu(display("Failed to validate shader program {name:?}: {log}"))]
    Validate { name: String, log: String },

    #[snafu(context(false), display("{source}"))]
    ShaderGl { source: GlError },
}

#[derive(Debug, Snafu)]
#[snafu(context(suffix(Err)), visibility(pub(crate)))]
pub enum TextureError {
    #[snafu(display("Failed to load image {}: {source}", path.display()))]
    LoadImage {
        path: PathBuf,
        source: image::ImageError,
    },

    #[snafu(context(false), display("{source}"))]
    TextureGl { source: GlError },
}

pub type Result<T, E = GlError> = std::result::Result<T, E>;
