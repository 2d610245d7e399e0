use std::{fmt, str::FromStr};

use bytemuck::NoUninit;

use crate::math::{vec2, Vec2f};

/// Straight (non-premultiplied) 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, NoUninit)]
#[repr(C)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Self = Self::opaque(0, 0, 0);
    pub const WHITE: Self = Self::opaque(0xff, 0xff, 0xff);
    #[cfg(test)]
    pub const RED: Self = Self::opaque(0xff, 0, 0);
    #[cfg(test)]
    pub const BLUE: Self = Self::opaque(0, 0, 0xff);
    pub const DARK_GRAY: Self = Self::opaque(0x40, 0x40, 0x40);
    pub const LIGHT_GRAY: Self = Self::opaque(0xc0, 0xc0, 0xc0);

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 0xff {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("expected a `#rrggbb` or `#rrggbbaa` color, got '{0}'")]
pub struct ParseRgbaError(String);

impl FromStr for Rgba {
    type Err = ParseRgbaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRgbaError(s.to_string());
        let hex = s.strip_prefix('#').ok_or_else(err)?;
        if !matches!(hex.len(), 6 | 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a: if hex.len() == 8 { channel(6)? } else { 0xff },
        })
    }
}

/// Appearance of a freshly allocated canvas.
pub const BLANK: Rgba = Rgba::WHITE;

/// A straight line between two points, consumed by [`Raster::stroke_segment`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrokeSegment {
    pub start: Vec2f,
    pub end: Vec2f,
}

/// Fixed-size, row-major RGBA pixel buffer.
///
/// Pixel `(x, y)` is sampled at the integer coordinate `(x, y)`, so a stroke through `(10, 10)` is
/// centered on that pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Rgba>,
}

impl Raster {
    pub fn new(width: u32, height: u32, fill: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![fill; width as usize * height as usize],
        }
    }

    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(width, height, BLANK)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[cfg(test)]
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    #[cfg(test)]
    pub fn get(&self, x: u32, y: u32) -> Option<Rgba> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    #[cfg(test)]
    pub fn is_blank(&self) -> bool {
        self.pixels.iter().all(|&px| px == BLANK)
    }

    /// Overwrites this raster's contents with `other`'s. Both must have the same dimensions.
    pub fn copy_from(&mut self, other: &Raster) {
        assert_eq!(
            (self.width, self.height),
            (other.width, other.height),
            "raster dimension mismatch"
        );
        self.pixels.copy_from_slice(&other.pixels);
    }

    /// Fills the given rectangle, clipped to the raster bounds.
    pub fn fill_rect(&mut self, x: u32, y: u32, width: u32, height: u32, color: Rgba) {
        let x_end = x.saturating_add(width).min(self.width);
        let y_end = y.saturating_add(height).min(self.height);
        for row in y..y_end {
            for col in x..x_end {
                if let Some(i) = self.index(col, row) {
                    self.pixels[i] = color;
                }
            }
        }
    }

    /// Blends `color` over the pixel at `(x, y)`, scaled by `coverage` (0-1).
    pub fn blend(&mut self, x: u32, y: u32, color: Rgba, coverage: f32) {
        let Some(i) = self.index(x, y) else { return };
        let dst = self.pixels[i];

        let src_a = coverage.clamp(0.0, 1.0) * f32::from(color.a) / 255.0;
        let dst_a = f32::from(dst.a) / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            self.pixels[i] = Rgba { r: 0, g: 0, b: 0, a: 0 };
            return;
        }

        let mix = |s: u8, d: u8| {
            let c = (f32::from(s) * src_a + f32::from(d) * dst_a * (1.0 - src_a)) / out_a;
            c.round().clamp(0.0, 255.0) as u8
        };
        self.pixels[i] = Rgba {
            r: mix(color.r, dst.r),
            g: mix(color.g, dst.g),
            b: mix(color.b, dst.b),
            a: (out_a * 255.0).round() as u8,
        };
    }

    /// Draws `segment` as a round-capped line of the given `radius`, anti-aliased over one pixel.
    ///
    /// Parts outside the raster are clipped. A zero-length segment draws a dot.
    pub fn stroke_segment(&mut self, segment: StrokeSegment, radius: f32, color: Rgba) {
        let StrokeSegment { start, end } = segment;
        let reach = radius + 1.0;

        let lo_x = (start.x().min(end.x()) - reach).floor().max(0.0);
        let lo_y = (start.y().min(end.y()) - reach).floor().max(0.0);
        let hi_x = (start.x().max(end.x()) + reach)
            .ceil()
            .min(self.width as f32 - 1.0);
        let hi_y = (start.y().max(end.y()) + reach)
            .ceil()
            .min(self.height as f32 - 1.0);
        if lo_x > hi_x || lo_y > hi_y {
            return;
        }

        for y in lo_y as u32..=hi_y as u32 {
            for x in lo_x as u32..=hi_x as u32 {
                let dist = vec2(x as f32, y as f32).dist_to_segment(start, end);
                let coverage = (radius + 0.5 - dist).clamp(0.0, 1.0);
                if coverage > 0.0 {
                    self.blend(x, y, color, coverage);
                }
            }
        }
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }
}
