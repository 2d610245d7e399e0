use std::rc::{Rc, Weak};

use crate::{
    cmd::Cmd,
    error::CanvasError,
    math::Vec2f,
    raster::{Raster, Rgba, StrokeSegment},
};

/// Brush radius of a new canvas, in pixels (a 2 px wide stroke).
pub const DEFAULT_BRUSH_RADIUS: f32 = 1.0;
pub const DEFAULT_BRUSH_COLOR: Rgba = Rgba::BLACK;

/// Receives the full raster every time the canvas changes.
pub trait CanvasListener {
    /// Called synchronously after every draw and clear.
    ///
    /// `None` is a contract violation and must be rejected with
    /// [`CanvasError::InvalidArgument`] without touching the displayed image.
    fn raster_updated(&self, raster: Option<&Raster>) -> Result<(), CanvasError>;
}

/// The shared drawing surface.
///
/// Owns the raster and the brush state, and broadcasts the raster to every registered listener
/// in registration order whenever pixels change.
pub struct Canvas {
    raster: Raster,
    brush_color: Rgba,
    brush_radius: f32,
    /// Start of the next line segment. Unset until the first stroke and after a clear.
    anchor: Option<Vec2f>,
    listeners: Vec<Weak<dyn CanvasListener>>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_brush(width, height, DEFAULT_BRUSH_RADIUS)
    }

    pub fn with_brush(width: u32, height: u32, brush_radius: f32) -> Self {
        Self {
            raster: Raster::blank(width, height),
            brush_color: DEFAULT_BRUSH_COLOR,
            brush_radius,
            anchor: None,
            listeners: Vec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.raster.width()
    }

    pub fn height(&self) -> u32 {
        self.raster.height()
    }

    #[cfg(test)]
    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn brush_color(&self) -> Rgba {
        self.brush_color
    }

    #[cfg(test)]
    pub fn brush_radius(&self) -> f32 {
        self.brush_radius
    }

    #[cfg(test)]
    pub fn anchor(&self) -> Option<Vec2f> {
        self.anchor
    }

    /// Number of registered listeners that are still alive.
    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    /// Registers `listener` for all subsequent broadcasts.
    ///
    /// The canvas only keeps a weak reference; once the listener is dropped it stops receiving
    /// updates. Registering the same listener twice makes it receive every broadcast twice.
    pub fn register_listener<L: CanvasListener + 'static>(&mut self, listener: &Rc<L>) {
        let listener: Weak<L> = Rc::downgrade(listener);
        self.listeners.push(listener);
    }

    pub fn set_color(&mut self, color: Rgba) {
        self.brush_color = color;
    }

    pub fn set_stroke_origin(&mut self, position: Vec2f) {
        self.anchor = Some(position);
    }

    /// Draws a line from the anchor to `position`, moves the anchor there and broadcasts.
    pub fn draw_to(&mut self, position: Vec2f) -> Result<(), CanvasError> {
        let Some(start) = self.anchor else {
            return Err(CanvasError::InvalidState(
                "draw requested before a stroke origin was set",
            ));
        };

        self.raster.stroke_segment(
            StrokeSegment {
                start,
                end: position,
            },
            self.brush_radius,
            self.brush_color,
        );
        self.anchor = Some(position);
        self.broadcast()
    }

    pub fn clear(&mut self) -> Result<(), CanvasError> {
        log::info!("clearing canvas");
        self.raster = Raster::blank(self.raster.width(), self.raster.height());
        self.anchor = None;
        self.broadcast()
    }

    pub fn apply(&mut self, cmd: Cmd) -> Result<(), CanvasError> {
        log::trace!("{cmd:?}");
        match cmd {
            Cmd::Clear => self.clear(),
            Cmd::SetColor { color } => {
                self.set_color(color);
                Ok(())
            }
            Cmd::SetStrokeOrigin { position } => {
                self.set_stroke_origin(position);
                Ok(())
            }
            Cmd::DrawTo { position } => self.draw_to(position),
        }
    }

    fn broadcast(&mut self) -> Result<(), CanvasError> {
        // Listeners of closed windows are gone for good.
        self.listeners.retain(|l| l.strong_count() > 0);

        for listener in &self.listeners {
            if let Some(listener) = listener.upgrade() {
                listener.raster_updated(Some(&self.raster))?;
            }
        }
        Ok(())
    }
}
