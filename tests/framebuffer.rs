mod common;

use common::headless;
use staplegl::backend::Attachment;
use staplegl::error::GlError;
use staplegl::{
    AttachmentType, FboAttachment, Framebuffer, Resolution, Texture2d, TextureOptions,
    TextureSamples,
};

const SIZE: Resolution = Resolution::new(320, 240);

#[test]
fn empty_framebuffer_is_incomplete() {
    let (ctx, _backend) = headless();
    let framebuffer = Framebuffer::new(&ctx).unwrap();

    let err = framebuffer.check_complete().unwrap_err();
    assert!(matches!(
        err,
        GlError::IncompleteFramebuffer {
            status: "GL_FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT"
        }
    ));
}

#[test]
fn color_texture_with_depth_stencil_is_complete() {
    let (ctx, backend) = headless();
    let mut framebuffer = Framebuffer::new(&ctx).unwrap();
    let color = Texture2d::new(
        &ctx,
        &[] as &[f32],
        &TextureOptions::builder().resolution(SIZE).build(),
    )
    .unwrap();

    framebuffer.set_texture(&color, 0);
    framebuffer
        .set_renderbuffer(SIZE, FboAttachment::DEPTH_STENCIL)
        .unwrap();
    framebuffer.check_complete().unwrap();

    assert_eq!(backend.bound_framebuffer(), Some(framebuffer.id()));
    assert_eq!(
        backend.framebuffer_attachment(framebuffer.id(), gl::COLOR_ATTACHMENT0),
        Some(Attachment::Texture {
            texture: color.id(),
            target: gl::TEXTURE_2D,
            level: 0,
        })
    );

    let renderbuffer = framebuffer.renderbuffer().unwrap();
    assert_eq!(renderbuffer.attachment_type(), AttachmentType::DepthStencil);
    assert_eq!(renderbuffer.resolution(), SIZE);

    let storage = backend.renderbuffer_storage(renderbuffer.id()).unwrap();
    assert_eq!(storage.internal_format, gl::DEPTH24_STENCIL8);
    assert_eq!((storage.width, storage.height), (320, 240));
}

#[test]
fn multisampled_color_attaches_to_its_target() {
    let (ctx, backend) = headless();
    let framebuffer = Framebuffer::new(&ctx).unwrap();
    let options = TextureOptions::builder()
        .resolution(SIZE)
        .samples(TextureSamples::X8)
        .build();
    let color = Texture2d::new(&ctx, &[] as &[u8], &options).unwrap();

    framebuffer.set_texture(&color, 2);
    framebuffer.check_complete().unwrap();

    assert!(matches!(
        backend.framebuffer_attachment(framebuffer.id(), gl::COLOR_ATTACHMENT2),
        Some(Attachment::Texture {
            target: gl::TEXTURE_2D_MULTISAMPLE,
            ..
        })
    ));
}

#[test]
fn switching_renderbuffer_type_detaches_the_old_one() {
    let (ctx, backend) = headless();
    let mut framebuffer = Framebuffer::new(&ctx).unwrap();

    framebuffer
        .set_renderbuffer(SIZE, FboAttachment::DEPTH_STENCIL)
        .unwrap();
    framebuffer
        .set_renderbuffer(SIZE, FboAttachment::STENCIL)
        .unwrap();

    let id = framebuffer.id();
    assert_eq!(backend.framebuffer_attachment(id, gl::DEPTH_STENCIL_ATTACHMENT), None);

    let stencil = framebuffer.renderbuffer().unwrap();
    assert_eq!(
        backend.framebuffer_attachment(id, gl::STENCIL_ATTACHMENT),
        Some(Attachment::Renderbuffer(stencil.id()))
    );
    assert_eq!(
        backend.renderbuffer_storage(stencil.id()).map(|s| s.internal_format),
        Some(gl::STENCIL_INDEX8)
    );
    assert_eq!(backend.live_renderbuffers(), 1);
}

#[test]
fn empty_flags_remove_the_renderbuffer() {
    let (ctx, backend) = headless();
    let mut framebuffer = Framebuffer::new(&ctx).unwrap();

    framebuffer.set_renderbuffer(SIZE, FboAttachment::DEPTH).unwrap();
    framebuffer
        .set_renderbuffer(SIZE, FboAttachment::empty())
        .unwrap();

    assert!(framebuffer.renderbuffer().is_none());
    assert_eq!(backend.live_renderbuffers(), 0);
    assert_eq!(
        backend.framebuffer_attachment(framebuffer.id(), gl::DEPTH_ATTACHMENT),
        None
    );
}

#[test]
fn default_framebuffer_and_viewport() {
    let (ctx, backend) = headless();
    let framebuffer = Framebuffer::new(&ctx).unwrap();

    framebuffer.bind();
    Framebuffer::set_viewport(&ctx, Resolution::new(64, 32));
    assert_eq!(backend.bound_framebuffer(), Some(framebuffer.id()));
    assert_eq!(backend.viewport_rect(), (0, 0, 64, 32));

    Framebuffer::bind_default(&ctx);
    assert_eq!(backend.bound_framebuffer(), None);
}

#[test]
fn dropping_a_framebuffer_frees_its_renderbuffer() {
    let (ctx, backend) = headless();
    {
        let mut framebuffer = Framebuffer::new(&ctx).unwrap();
        framebuffer.set_renderbuffer(SIZE, FboAttachment::DEPTH).unwrap();
        assert_eq!(backend.live_framebuffers(), 1);
    }

    assert_eq!(backend.live_framebuffers(), 0);
    assert_eq!(backend.live_renderbuffers(), 0);
    assert_eq!(backend.bound_framebuffer(), None);
}
