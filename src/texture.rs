use crate::backend::{TextureId, unpacked_image_size};
use crate::context::Context;
use crate::error::{
    AllocationErr, DataSizeErr, InvalidColorErr, LoadImageErr, Result, TextureError,
    UnknownPixelFormatErr,
};
use crate::utils::Resolution;
use bon::Builder;
use bytemuck::Pod;
use log::debug;
use snafu::{OptionExt, ResultExt, ensure};
use std::path::Path;

/// Channel layout of texture data.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    Rgb = 0b001,
    Rgba = 0b010,
    Grayscale = 0b011,
}

/// Whether color values are stored linearly or sRGB encoded.
#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorSpace {
    #[default]
    Linear = 0b000,
    Srgb = 0b100,
}

/// Indexed by `format | space`. Zero marks combinations GL has no format for.
const COLOR_TABLE: [u32; 8] = [
    0,
    gl::RGB,
    gl::RGBA,
    gl::RED,
    0,
    gl::SRGB,
    gl::SRGB_ALPHA,
    gl::RED,
];

/// The GL internal format for `format` stored in `space`.
pub const fn opengl_color(format: ColorFormat, space: ColorSpace) -> Option<u32> {
    match COLOR_TABLE[(format as u8 | space as u8) as usize] {
        0 => None,
        color => Some(color),
    }
}

/// How texel data is stored on the GPU (`internal_format`) and laid out in client memory
/// (`format`, `datatype`).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureColor {
    pub internal_format: u32,
    pub format: u32,
    pub datatype: u32,
}

impl Default for TextureColor {
    fn default() -> Self {
        Self {
            internal_format: gl::RGBA,
            format: gl::RGBA,
            datatype: gl::FLOAT,
        }
    }
}

impl TextureColor {
    /// Picks the internal format from `format` and `space`. Client data is always read in the
    /// linear variant of `format`.
    pub fn new(format: ColorFormat, space: ColorSpace, datatype: u32) -> Result<Self> {
        let internal_format = opengl_color(format, space).context(InvalidColorErr { format, space })?;
        let pixel_format = opengl_color(format, ColorSpace::Linear)
            .context(InvalidColorErr { format, space })?;

        Ok(Self {
            internal_format,
            format: pixel_format,
            datatype,
        })
    }

    /// Bytes of client data an image of `resolution` in this color takes, row padding included.
    pub fn image_size(&self, resolution: Resolution) -> Result<usize> {
        unpacked_image_size(resolution.width, resolution.height, self.format, self.datatype)
            .context(UnknownPixelFormatErr {
                format: self.format,
                datatype: self.datatype,
            })
    }

    /// Checks that `pixels` covers a whole image of `resolution`. Empty data always passes, since
    /// it leaves the image uninitialized.
    pub(crate) fn check_pixels(&self, pixels: &[u8], resolution: Resolution) -> Result<()> {
        if pixels.is_empty() {
            return Ok(());
        }

        let expected = self.image_size(resolution)?;
        ensure!(
            pixels.len() >= expected,
            DataSizeErr {
                what: "texture image",
                expected,
                actual: pixels.len(),
            }
        );
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TextureFilter {
    pub min_filter: u32,
    pub mag_filter: u32,
    /// Wrap mode applied to every axis.
    pub clamping: u32,
}

impl Default for TextureFilter {
    fn default() -> Self {
        Self {
            min_filter: gl::LINEAR,
            mag_filter: gl::LINEAR,
            clamping: gl::CLAMP_TO_EDGE,
        }
    }
}

impl TextureFilter {
    pub const NEAREST: Self = Self {
        min_filter: gl::NEAREST,
        mag_filter: gl::NEAREST,
        clamping: gl::CLAMP_TO_EDGE,
    };

    /// The min filter to use when the texture has mipmaps.
    pub const fn mipmapped_min_filter(&self) -> u32 {
        to_mipmap(self.min_filter)
    }
}

/// The mipmap variant of a min filter. Filters that already sample mipmaps are returned as-is.
pub const fn to_mipmap(filter: u32) -> u32 {
    match filter {
        gl::NEAREST => gl::NEAREST_MIPMAP_NEAREST,
        gl::LINEAR => gl::LINEAR_MIPMAP_LINEAR,
        other => other,
    }
}

/// MSAA sample count.
#[repr(i32)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextureSamples {
    #[default]
    X1 = 1,
    X2 = 2,
    X4 = 4,
    X8 = 8,
    X16 = 16,
    X32 = 32,
}

impl TextureSamples {
    #[inline]
    pub const fn count(self) -> i32 {
        self as i32
    }

    #[inline]
    pub const fn is_multisampled(self) -> bool {
        self.count() > 1
    }
}

/// Everything a [`Texture2d`] needs besides its pixels.
///
/// ```ignore
/// let options = TextureOptions::builder()
///     .resolution((1280, 720))
///     .samples(TextureSamples::X4)
///     .build();
/// ```
#[derive(Debug, Clone, Builder)]
pub struct TextureOptions {
    #[builder(into)]
    pub resolution: Resolution,
    #[builder(default)]
    pub color: TextureColor,
    #[builder(default)]
    pub filter: TextureFilter,
    #[builder(default)]
    pub samples: TextureSamples,
    #[builder(default)]
    pub generate_mipmaps: bool,
}

/// A 2D texture, multisampled when created with more than one sample.
#[derive(Debug)]
pub struct Texture2d {
    ctx: Context,
    id: TextureId,
    unit: u32,
    color: TextureColor,
    filter: TextureFilter,
    samples: TextureSamples,
    resolution: Resolution,
}

impl Texture2d {
    /// Creates the texture and uploads `pixels`, which may be empty to leave it uninitialized.
    ///
    /// Multisampled textures never take pixels or mipmaps.
    ///
    /// Fails when `pixels` is non-empty but shorter than a full image in `options.color`.
    pub fn new<T: Pod>(ctx: &Context, pixels: &[T], options: &TextureOptions) -> Result<Self> {
        let pixels: &[u8] = bytemuck::cast_slice(pixels);
        if !options.samples.is_multisampled() {
            options.color.check_pixels(pixels, options.resolution)?;
        }

        let id = ctx
            .gl()
            .create_texture()
            .context(AllocationErr { kind: "texture" })?;

        let texture = Self {
            ctx: ctx.clone(),
            id,
            unit: 0,
            color: options.color,
            filter: options.filter,
            samples: options.samples,
            resolution: options.resolution,
        };

        let target = texture.target();
        let mipmaps = options.generate_mipmaps && !texture.is_multisampled();
        let min_filter = if mipmaps {
            options.filter.mipmapped_min_filter()
        } else {
            options.filter.min_filter
        };

        let gl = ctx.gl();
        texture.bind();
        // multisampled textures have no sampler state
        if !texture.is_multisampled() {
            gl.tex_parameter_i32(target, gl::TEXTURE_MIN_FILTER, min_filter as i32);
            gl.tex_parameter_i32(target, gl::TEXTURE_MAG_FILTER, options.filter.mag_filter as i32);
            gl.tex_parameter_i32(target, gl::TEXTURE_WRAP_S, options.filter.clamping as i32);
            gl.tex_parameter_i32(target, gl::TEXTURE_WRAP_T, options.filter.clamping as i32);
        }

        texture.upload(pixels, mipmaps);
        texture.unbind();

        debug!(
            "Created texture #{} ({}x{}, {:?})",
            id.get(),
            options.resolution.width,
            options.resolution.height,
            options.samples
        );

        Ok(texture)
    }

    /// Decodes an image file into an RGBA8 texture.
    ///
    /// Rows are flipped so the first row of the file ends up at the top of the texture in GL's
    /// bottom-left origin.
    pub fn from_image(
        ctx: &Context,
        path: impl AsRef<Path>,
        space: ColorSpace,
        filter: TextureFilter,
        generate_mipmaps: bool,
    ) -> Result<Self, TextureError> {
        let path = path.as_ref();
        let image = image::open(path)
            .context(LoadImageErr { path })?
            .flipv()
            .into_rgba8();

        let options = TextureOptions::builder()
            .resolution(image.dimensions())
            .color(TextureColor::new(ColorFormat::Rgba, space, gl::UNSIGNED_BYTE)?)
            .filter(filter)
            .generate_mipmaps(generate_mipmaps)
            .build();

        Ok(Self::new(ctx, image.as_raw().as_slice(), &options)?)
    }

    /// Binds the texture to texture unit `unit` and remembers it.
    pub fn set_unit(&mut self, unit: u32) {
        self.unit = unit;
        self.ctx.gl().active_texture(unit);
        self.bind();
    }

    #[inline]
    pub fn unit(&self) -> u32 {
        self.unit
    }

    /// Replaces the image, possibly with a new size and color. The texture is left untouched when
    /// `pixels` is too short for it.
    pub fn set_data<T: Pod>(
        &mut self,
        pixels: &[T],
        resolution: Resolution,
        color: TextureColor,
        generate_mipmaps: bool,
    ) -> Result<()> {
        let pixels: &[u8] = bytemuck::cast_slice(pixels);
        if !self.is_multisampled() {
            color.check_pixels(pixels, resolution)?;
        }

        self.color = color;
        self.resolution = resolution;

        self.bind();
        self.upload(pixels, generate_mipmaps && !self.is_multisampled());
        Ok(())
    }

    fn upload(&self, pixels: &[u8], generate_mipmaps: bool) {
        let gl = self.ctx.gl();
        let target = self.target();
        let Resolution { width, height } = self.resolution;

        if self.is_multisampled() {
            gl.tex_image_2d_multisample(
                target,
                self.samples.count(),
                self.color.internal_format,
                width,
                height,
                true,
            );
        } else {
            gl.tex_image_2d(
                target,
                0,
                self.color.internal_format as i32,
                width,
                height,
                self.color.format,
                self.color.datatype,
                (!pixels.is_empty()).then_some(pixels),
            );
        }

        if generate_mipmaps {
            gl.generate_mipmap(target);
        }
        self.ctx.debug_check("texture upload");
    }

    pub fn bind(&self) {
        self.ctx.gl().bind_texture(self.target(), Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_texture(self.target(), None);
    }

    /// `TEXTURE_2D`, or `TEXTURE_2D_MULTISAMPLE` for multisampled textures.
    #[inline]
    pub fn target(&self) -> u32 {
        if self.is_multisampled() {
            gl::TEXTURE_2D_MULTISAMPLE
        } else {
            gl::TEXTURE_2D
        }
    }

    #[inline]
    pub fn is_multisampled(&self) -> bool {
        self.samples.is_multisampled()
    }

    #[inline]
    pub fn color(&self) -> TextureColor {
        self.color
    }

    #[inline]
    pub fn filter(&self) -> TextureFilter {
        self.filter
    }

    #[inline]
    pub fn samples(&self) -> TextureSamples {
        self.samples
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
    }
}

impl Drop for Texture2d {
    fn drop(&mut self) {
        debug!("Deleting texture #{}", self.id.get());
        self.ctx.gl().delete_texture(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_table_matches_combinations() {
        assert_eq!(opengl_color(ColorFormat::Rgb, ColorSpace::Linear), Some(gl::RGB));
        assert_eq!(opengl_color(ColorFormat::Rgba, ColorSpace::Srgb), Some(gl::SRGB_ALPHA));
        assert_eq!(opengl_color(ColorFormat::Grayscale, ColorSpace::Srgb), Some(gl::RED));
    }

    #[test]
    fn srgb_color_reads_linear_pixels() {
        let color = TextureColor::new(ColorFormat::Rgb, ColorSpace::Srgb, gl::UNSIGNED_BYTE);
        let color = color.ok();
        assert_eq!(color.map(|c| c.internal_format), Some(gl::SRGB));
        assert_eq!(color.map(|c| c.format), Some(gl::RGB));
    }

    #[test]
    fn mipmap_filters() {
        assert_eq!(to_mipmap(gl::NEAREST), gl::NEAREST_MIPMAP_NEAREST);
        assert_eq!(to_mipmap(gl::LINEAR), gl::LINEAR_MIPMAP_LINEAR);
        assert_eq!(to_mipmap(gl::LINEAR_MIPMAP_NEAREST), gl::LINEAR_MIPMAP_NEAREST);
    }

    #[test]
    fn samples_above_one_are_multisampled() {
        assert!(!TextureSamples::X1.is_multisampled());
        assert!(TextureSamples::X4.is_multisampled());
        assert_eq!(TextureSamples::X16.count(), 16);
    }
}
