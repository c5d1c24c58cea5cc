use crate::backend::RenderbufferId;
use crate::context::Context;
use crate::error::{AllocationErr, Result};
use crate::utils::Resolution;
use log::debug;
use snafu::OptionExt;

/// What a renderbuffer stores, which also fixes where it attaches to a framebuffer.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttachmentType {
    Depth,
    Stencil,
    #[default]
    DepthStencil,
}

impl AttachmentType {
    /// The framebuffer attachment point.
    pub const fn attachment_point(self) -> u32 {
        match self {
            AttachmentType::Depth => gl::DEPTH_ATTACHMENT,
            AttachmentType::Stencil => gl::STENCIL_ATTACHMENT,
            AttachmentType::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
        }
    }

    pub const fn internal_format(self) -> u32 {
        match self {
            AttachmentType::Depth => gl::DEPTH_COMPONENT24,
            AttachmentType::Stencil => gl::STENCIL_INDEX8,
            AttachmentType::DepthStencil => gl::DEPTH24_STENCIL8,
        }
    }
}

#[derive(Debug)]
pub struct Renderbuffer {
    ctx: Context,
    id: RenderbufferId,
    resolution: Resolution,
    attachment_type: AttachmentType,
}

impl Renderbuffer {
    pub fn new(ctx: &Context, resolution: Resolution, attachment_type: AttachmentType) -> Result<Self> {
        let gl = ctx.gl();
        let id = gl
            .create_renderbuffer()
            .context(AllocationErr { kind: "renderbuffer" })?;

        gl.bind_renderbuffer(Some(id));
        gl.renderbuffer_storage(
            attachment_type.internal_format(),
            resolution.width,
            resolution.height,
        );
        gl.bind_renderbuffer(None);

        debug!(
            "Created {attachment_type:?} renderbuffer #{} ({}x{})",
            id.get(),
            resolution.width,
            resolution.height
        );

        Ok(Self {
            ctx: ctx.clone(),
            id,
            resolution,
            attachment_type,
        })
    }

    pub fn bind(&self) {
        self.ctx.gl().bind_renderbuffer(Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_renderbuffer(None);
    }

    #[inline]
    pub fn id(&self) -> RenderbufferId {
        self.id
    }

    #[inline]
    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[inline]
    pub fn attachment_type(&self) -> AttachmentType {
        self.attachment_type
    }
}

impl Drop for Renderbuffer {
    fn drop(&mut self) {
        debug!("Deleting renderbuffer #{}", self.id.get());
        self.ctx.gl().delete_renderbuffer(self.id);
    }
}
