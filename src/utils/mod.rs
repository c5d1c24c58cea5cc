pub mod sizes;

use std::path::Path;

/// Width and height of a texture, renderbuffer or viewport, in pixels.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub const fn pixels(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

/// The file name without directories and without its last extension.
///
/// `shaders/batched.glsl` becomes `batched`, `.hidden` stays `.hidden`.
pub fn file_stem(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_stem_strips_directories_and_extension() {
        assert_eq!(file_stem("shaders/batched_shader.glsl"), "batched_shader");
        assert_eq!(file_stem("C:/assets/teapot.frag.glsl"), "teapot.frag");
        assert_eq!(file_stem("plain"), "plain");
        assert_eq!(file_stem(""), "");
    }

    #[test]
    fn resolution_pixel_count() {
        assert_eq!(Resolution::new(800, 600).pixels(), 480_000);
        assert_eq!(Resolution::from((4, 2)), Resolution::new(4, 2));
    }
}
