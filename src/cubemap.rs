use crate::backend::TextureId;
use crate::context::Context;
use crate::error::{AllocationErr, LoadImageErr, NonSquareCubemapErr, Result, TextureError};
use crate::texture::{ColorFormat, ColorSpace, TextureColor, TextureFilter};
use crate::utils::Resolution;
use bon::Builder;
use bytemuck::Pod;
use image::imageops::FilterType;
use log::{debug, trace};
use snafu::{OptionExt, ResultExt, ensure};
use std::path::Path;

/// Face order of [`Cubemap::new`] and [`Cubemap::from_files`]: +X, -X, +Y, -Y, +Z, -Z.
pub const CUBEMAP_FACES: usize = 6;

#[derive(Debug, Clone, Builder)]
pub struct CubemapOptions {
    /// Size of each face.
    #[builder(into)]
    pub resolution: Resolution,
    #[builder(default)]
    pub color: TextureColor,
    #[builder(default)]
    pub filter: TextureFilter,
    #[builder(default)]
    pub generate_mipmaps: bool,
}

/// A cube map texture, for skyboxes and environment maps.
#[derive(Debug)]
pub struct Cubemap {
    ctx: Context,
    id: TextureId,
    color: TextureColor,
    filter: TextureFilter,
    resolution: Resolution,
}

impl Cubemap {
    /// Creates the cube map from six faces, in [`CUBEMAP_FACES`] order. Each face may be empty to
    /// leave it uninitialized.
    ///
    /// Fails when the faces are not square or a non-empty face is shorter than a full image.
    pub fn new<T: Pod>(
        ctx: &Context,
        faces: [&[T]; CUBEMAP_FACES],
        options: &CubemapOptions,
    ) -> Result<Self> {
        let Resolution { width, height } = options.resolution;
        ensure!(width == height, NonSquareCubemapErr { width, height });

        let faces: [&[u8]; CUBEMAP_FACES] = faces.map(bytemuck::cast_slice);
        for pixels in faces {
            options.color.check_pixels(pixels, options.resolution)?;
        }

        let id = ctx
            .gl()
            .create_texture()
            .context(AllocationErr { kind: "cube map" })?;

        let cubemap = Self {
            ctx: ctx.clone(),
            id,
            color: options.color,
            filter: options.filter,
            resolution: options.resolution,
        };

        let filter = options.filter;
        let min_filter = if options.generate_mipmaps {
            filter.mipmapped_min_filter()
        } else {
            filter.min_filter
        };

        let gl = ctx.gl();
        cubemap.bind();
        gl.tex_parameter_i32(gl::TEXTURE_CUBE_MAP, gl::TEXTURE_WRAP_S, filter.clamping as i32);
        gl.tex_parameter_i32(gl::TEXTURE_CUBE_MAP, gl::TEXTURE_WRAP_T, filter.clamping as i32);
        gl.tex_parameter_i32(gl::TEXTURE_CUBE_MAP, gl::TEXTURE_WRAP_R, filter.clamping as i32);
        gl.tex_parameter_i32(gl::TEXTURE_CUBE_MAP, gl::TEXTURE_MIN_FILTER, min_filter as i32);
        gl.tex_parameter_i32(gl::TEXTURE_CUBE_MAP, gl::TEXTURE_MAG_FILTER, filter.mag_filter as i32);

        for (face, pixels) in (0u32..).zip(faces) {
            trace!("Uploading cube map face {face} ({} bytes)", pixels.len());

            gl.tex_image_2d(
                gl::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                0,
                options.color.internal_format as i32,
                width,
                height,
                options.color.format,
                options.color.datatype,
                (!pixels.is_empty()).then_some(pixels),
            );
        }

        if options.generate_mipmaps {
            gl.generate_mipmap(gl::TEXTURE_CUBE_MAP);
        }
        ctx.debug_check("cube map upload");
        cubemap.unbind();

        debug!("Created cube map #{} ({width}x{height} faces)", id.get());

        Ok(cubemap)
    }

    /// Decodes six image files into an RGBA8 cube map. Faces are resized to a square as wide as
    /// the larger side of the first one.
    pub fn from_files<P: AsRef<Path>>(
        ctx: &Context,
        paths: [P; CUBEMAP_FACES],
        space: ColorSpace,
        filter: TextureFilter,
        generate_mipmaps: bool,
    ) -> Result<Self, TextureError> {
        let mut faces = Vec::with_capacity(CUBEMAP_FACES);
        let mut side: Option<u32> = None;

        for path in &paths {
            let path = path.as_ref();
            let mut image = image::open(path).context(LoadImageErr { path })?;

            let side = *side.get_or_insert(image.width().max(image.height()));
            if (image.width(), image.height()) != (side, side) {
                debug!("Resizing cube map face {} to {side}x{side}", path.display());
                image = image.resize_exact(side, side, FilterType::Triangle);
            }

            faces.push(image.into_rgba8());
        }

        let side = side.unwrap_or_default();
        let options = CubemapOptions::builder()
            .resolution((side, side))
            .color(TextureColor::new(ColorFormat::Rgba, space, gl::UNSIGNED_BYTE)?)
            .filter(filter)
            .generate_mipmaps(generate_mipmaps)
            .build();

        let faces: [&[u8]; CUBEMAP_FACES] = std::array::from_fn(|i| faces[i].as_raw().as_slice());
        Ok(Self::new(ctx, faces, &options)?)
    }

    pub fn bind(&self) {
        self.ctx.gl().bind_texture(gl::TEXTURE_CUBE_MAP, Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_texture(gl::TEXTURE_CUBE_MAP, None);
    }

    /// Binds the cube map to texture unit `unit`.
    pub fn set_unit(&self, unit: u32) {
        self.ctx.gl().active_texture(unit);
        self.bind();
    }

    #[inline]
    pub fn id(&self) -> TextureId {
        self.id
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
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }
}

impl Drop for Cubemap {
    fn drop(&mut self) {
        debug!("Deleting cube map #{}", self.id.get());
        self.ctx.gl().delete_texture(self.id);
    }
}
