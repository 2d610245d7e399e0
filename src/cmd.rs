use crate::{math::Vec2f, raster::Rgba};

/// A command issued by a view to the shared canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cmd {
    /// Reallocates a blank raster and forgets the stroke anchor.
    Clear,

    SetColor {
        color: Rgba,
    },

    /// Records where the next line segment starts.
    SetStrokeOrigin {
        /// Position in canvas pixels.
        position: Vec2f,
    },

    /// Draws from the anchor to `position`, which becomes the new anchor.
    DrawTo {
        /// Position in canvas pixels.
        position: Vec2f,
    },
}
