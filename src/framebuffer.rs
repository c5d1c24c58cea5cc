use crate::backend::FramebufferId;
use crate::context::Context;
use crate::error::{AllocationErr, IncompleteFramebufferErr, Result};
use crate::renderbuffer::{AttachmentType, Renderbuffer};
use crate::texture::Texture2d;
use crate::utils::Resolution;
use bitflags::bitflags;
use log::{debug, warn};
use snafu::{OptionExt, ensure};

bitflags! {
    /// Which renderbuffer a framebuffer should own next to its color textures.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct FboAttachment: u8 {
        const DEPTH = 0b01;
        const STENCIL = 0b10;
    }
}

impl FboAttachment {
    pub const DEPTH_STENCIL: Self = Self::DEPTH.union(Self::STENCIL);

    /// The renderbuffer type these flags ask for, `None` when empty.
    pub fn attachment_type(self) -> Option<AttachmentType> {
        match (self.contains(Self::DEPTH), self.contains(Self::STENCIL)) {
            (true, true) => Some(AttachmentType::DepthStencil),
            (true, false) => Some(AttachmentType::Depth),
            (false, true) => Some(AttachmentType::Stencil),
            (false, false) => None,
        }
    }
}

/// An offscreen render target.
#[derive(Debug)]
pub struct Framebuffer {
    ctx: Context,
    id: FramebufferId,
    renderbuffer: Option<Renderbuffer>,
}

impl Framebuffer {
    pub fn new(ctx: &Context) -> Result<Self> {
        let id = ctx
            .gl()
            .create_framebuffer()
            .context(AllocationErr { kind: "framebuffer" })?;

        debug!("Created framebuffer #{}", id.get());

        Ok(Self {
            ctx: ctx.clone(),
            id,
            renderbuffer: None,
        })
    }

    pub fn bind(&self) {
        self.ctx.gl().bind_framebuffer(gl::FRAMEBUFFER, Some(self.id));
    }

    pub fn unbind(&self) {
        self.ctx.gl().bind_framebuffer(gl::FRAMEBUFFER, None);
    }

    /// Binds the window's framebuffer.
    pub fn bind_default(ctx: &Context) {
        ctx.gl().bind_framebuffer(gl::FRAMEBUFFER, None);
    }

    pub fn set_viewport(ctx: &Context, resolution: Resolution) {
        ctx.set_viewport(resolution);
    }

    /// Creates and attaches a depth and/or stencil renderbuffer of size `resolution`.
    ///
    /// Any renderbuffer attached before is detached and deleted, so passing an empty set of flags
    /// just removes it. Leaves the framebuffer bound.
    pub fn set_renderbuffer(&mut self, resolution: Resolution, attachment: FboAttachment) -> Result<()> {
        let gl = self.ctx.gl();
        self.bind();

        if let Some(previous) = self.renderbuffer.take() {
            let point = previous.attachment_type().attachment_point();
            gl.framebuffer_renderbuffer(gl::FRAMEBUFFER, point, None);
        }

        let Some(attachment_type) = attachment.attachment_type() else {
            return Ok(());
        };

        let renderbuffer = Renderbuffer::new(&self.ctx, resolution, attachment_type)?;
        gl.framebuffer_renderbuffer(
            gl::FRAMEBUFFER,
            attachment_type.attachment_point(),
            Some(renderbuffer.id()),
        );
        self.renderbuffer = Some(renderbuffer);

        Ok(())
    }

    /// Attaches `texture` as color attachment `index`. Leaves the framebuffer bound.
    pub fn set_texture(&self, texture: &Texture2d, index: u32) {
        self.bind();
        self.ctx.gl().framebuffer_texture_2d(
            gl::FRAMEBUFFER,
            gl::COLOR_ATTACHMENT0 + index,
            texture.target(),
            Some(texture.id()),
            0,
        );
    }

    /// Binds the framebuffer and fails with the driver's status if it can't be rendered to.
    pub fn check_complete(&self) -> Result<()> {
        self.bind();
        let status = self.ctx.gl().check_framebuffer_status(gl::FRAMEBUFFER);

        if status != gl::FRAMEBUFFER_COMPLETE {
            warn!(
                "Framebuffer #{} is incomplete: {}",
                self.id.get(),
                framebuffer_status_name(status)
            );
        }

        ensure!(
            status == gl::FRAMEBUFFER_COMPLETE,
            IncompleteFramebufferErr {
                status: framebuffer_status_name(status),
            }
        );
        Ok(())
    }

    #[inline]
    pub fn renderbuffer(&self) -> Option<&Renderbuffer> {
        self.renderbuffer.as_ref()
    }

    #[inline]
    pub fn id(&self) -> FramebufferId {
        self.id
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        debug!("Deleting framebuffer #{}", self.id.get());
        self.ctx.gl().delete_framebuffer(self.id);
    }
}

pub fn framebuffer_status_name(status: u32) -> &'static str {
    match status {
        gl::FRAMEBUFFER_COMPLETE => "GL_FRAMEBUFFER_COMPLETE",
        gl::FRAMEBUFFER_UNDEFINED => "GL_FRAMEBUFFER_UNDEFINED",
        gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT => "GL_FRAMEBUFFER_INCOMPLETE_ATTACHMENT",
        gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT => {
            "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
        }
        gl::FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_DRAW_BUFFER",
        gl::FRAMEBUFFER_INCOMPLETE_READ_BUFFER => "GL_FRAMEBUFFER_INCOMPLETE_READ_BUFFER",
        gl::FRAMEBUFFER_UNSUPPORTED => "GL_FRAMEBUFFER_UNSUPPORTED",
        gl::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE => "GL_FRAMEBUFFER_INCOMPLETE_MULTISAMPLE",
        gl::FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS => "GL_FRAMEBUFFER_INCOMPLETE_LAYER_TARGETS",
        _ => "unknown framebuffer status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_pick_renderbuffer_type() {
        assert_eq!(FboAttachment::DEPTH_STENCIL.bits(), 3);
        assert_eq!(
            FboAttachment::DEPTH_STENCIL.attachment_type(),
            Some(AttachmentType::DepthStencil)
        );
        assert_eq!(FboAttachment::STENCIL.attachment_type(), Some(AttachmentType::Stencil));
        assert_eq!(FboAttachment::empty().attachment_type(), None);
    }
}
