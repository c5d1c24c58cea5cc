use crate::backend::{Backend, HeadlessBackend, NativeBackend};
use crate::utils::Resolution;
use bitflags::bitflags;
use log::warn;
use std::ffi::c_void;
use std::fmt;
use std::rc::Rc;

bitflags! {
    /// Buffers cleared by [`Context::clear`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
    pub struct ClearMask: u32 {
        const COLOR = gl::COLOR_BUFFER_BIT;
        const DEPTH = gl::DEPTH_BUFFER_BIT;
        const STENCIL = gl::STENCIL_BUFFER_BIT;
    }
}

/// Shared handle to the driver every resource is created through.
///
/// Cloning is cheap. Each resource keeps a clone so it can delete its object when dropped, which
/// also ties the resource to the thread the context lives on: `Context` is neither `Send` nor
/// `Sync`.
#[derive(Clone)]
pub struct Context {
    backend: Rc<dyn Backend>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}

impl Context {
    /// Loads the driver's function pointers and wraps them in a context.
    ///
    /// # Safety
    ///
    /// An OpenGL 4.x context must be current on this thread, and stay current for as long as this
    /// context or anything created through it is alive.
    pub unsafe fn native<F>(loader: F) -> Self
    where
        F: FnMut(&'static str) -> *const c_void,
    {
        let backend = unsafe { NativeBackend::load_with(loader) };
        Self::from_backend(Rc::new(backend))
    }

    /// A context backed by an in-memory [`HeadlessBackend`], returned alongside it for inspection.
    pub fn headless() -> (Self, Rc<HeadlessBackend>) {
        let backend = Rc::new(HeadlessBackend::new());
        (Self::from_backend(backend.clone()), backend)
    }

    pub fn from_backend<B: Backend + 'static>(backend: Rc<B>) -> Self {
        Self { backend }
    }

    /// Direct access to the driver, for calls this crate doesn't wrap.
    #[inline]
    pub fn gl(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn set_viewport(&self, res: Resolution) {
        self.backend.viewport(0, 0, res.width, res.height);
    }

    pub fn clear_color(&self, r: f32, g: f32, b: f32, a: f32) {
        self.backend.clear_color(r, g, b, a);
    }

    pub fn clear(&self, mask: ClearMask) {
        self.backend.clear(mask.bits());
    }

    /// Pops every pending error flag, logging each one.
    pub fn drain_errors(&self) -> Vec<u32> {
        let mut errors = Vec::new();

        loop {
            let code = self.backend.get_error();
            if code == gl::NO_ERROR {
                break;
            }

            warn!("OpenGL error: {} (0x{code:04X})", error_name(code));
            errors.push(code);
        }

        errors
    }

    /// Drains and logs pending errors after `operation` when `debug-checks` is enabled.
    #[inline]
    pub(crate) fn debug_check(&self, operation: &str) {
        if cfg!(feature = "debug-checks") {
            let errors = self.drain_errors();
            if !errors.is_empty() {
                warn!("{} OpenGL error(s) raised by {operation}", errors.len());
            }
        }
    }
}

pub fn error_name(code: u32) -> &'static str {
    match code {
        gl::NO_ERROR => "GL_NO_ERROR",
        gl::INVALID_ENUM => "GL_INVALID_ENUM",
        gl::INVALID_VALUE => "GL_INVALID_VALUE",
        gl::INVALID_OPERATION => "GL_INVALID_OPERATION",
        gl::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        gl::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        gl::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        gl::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown error",
    }
}
