use anyhow::bail;
use serde::{de::Visitor, Deserialize};

use crate::raster::Rgba;

/// Configuration baked into the binary. The program reads no files at runtime.
const BUILTIN: &str = include_str!("../paint.toml");

/// Narrowest toolbar button that is still clickable, in pixels.
pub const MIN_BUTTON_WIDTH: u32 = 8;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Number of view windows sharing the canvas.
    pub windows: usize,
    pub canvas: CanvasConfig,
    pub toolbar: ToolbarConfig,
    #[serde(rename = "button", default)]
    pub buttons: Vec<Button>,
}

impl Config {
    pub fn builtin() -> anyhow::Result<Self> {
        Self::parse(BUILTIN)
    }

    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(contents)?;

        if config.windows == 0 {
            bail!("`windows` must be at least 1");
        }
        if config.canvas.width == 0 || config.canvas.height == 0 {
            bail!(
                "canvas must not be empty (got {}x{})",
                config.canvas.width,
                config.canvas.height
            );
        }
        if let Some(radius) = config.canvas.brush_radius {
            if !(radius > 0.0) {
                bail!("`brush_radius` must be positive (got {radius})");
            }
        }
        let min_width = config.buttons.len() as u32 * MIN_BUTTON_WIDTH;
        if min_width > config.canvas.width {
            bail!(
                "{} toolbar buttons do not fit into a canvas {} pixels wide",
                config.buttons.len(),
                config.canvas.width
            );
        }
        for button in &config.buttons {
            if matches!(button.verb, CommandVerb::Color) && button.color.is_none() {
                bail!("[[button]] '{}' is a COLOR button without a `color`", button.label);
            }
        }

        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    /// Half the stroke width. Defaults to [`crate::canvas::DEFAULT_BRUSH_RADIUS`].
    pub brush_radius: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct ToolbarConfig {
    pub height: u32,
    pub background: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub(crate) Rgba);

impl<'a> Deserialize<'a> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'a>,
    {
        struct FromStrVisitor;

        impl<'de> Visitor<'de> for FromStrVisitor {
            type Value = Color;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("hex color like \"#ff0000\"")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(Color(v.parse().map_err(E::custom)?))
            }
        }

        deserializer.deserialize_str(FromStrVisitor)
    }
}

#[derive(Debug, Deserialize)]
pub struct Button {
    pub label: String,
    pub verb: CommandVerb,
    pub color: Option<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CommandVerb {
    #[serde(rename = "COLOR")]
    Color,
    #[serde(rename = "CLEAR")]
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_builtin_config() {
        let config = Config::builtin().unwrap();
        assert_eq!(config.windows, 2);
        assert_eq!((config.canvas.width, config.canvas.height), (640, 480));
        assert_eq!(config.canvas.brush_radius, None);
        assert_eq!(config.toolbar.height, 45);

        let labels: Vec<_> = config.buttons.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, ["black", "red", "blue", "eraser", "new canvas"]);
        assert_eq!(config.buttons[1].color, Some(Color(Rgba::RED)));
        assert_eq!(config.buttons[3].color, Some(Color(Rgba::WHITE)));
        assert_eq!(config.buttons[4].verb, CommandVerb::Clear);
    }

    const MINIMAL: &str = r##"
        windows = 1
        [canvas]
        width = 10
        height = 10
        brush_radius = 2.0
        [toolbar]
        height = 20
        background = "#000000"
    "##;

    #[test]
    fn buttons_are_optional() {
        let config = Config::parse(MINIMAL).unwrap();
        assert!(config.buttons.is_empty());
        assert_eq!(config.canvas.brush_radius, Some(2.0));
        assert_eq!(config.toolbar.background, Color(Rgba::BLACK));
    }

    #[test]
    fn rejects_invalid_configs() {
        let err = Config::parse(&MINIMAL.replace("windows = 1", "windows = 0")).unwrap_err();
        assert!(err.to_string().contains("windows"), "{err}");

        let err = Config::parse(&MINIMAL.replace("width = 10", "width = 0")).unwrap_err();
        assert!(err.to_string().contains("empty"), "{err}");

        let err = Config::parse(&MINIMAL.replace("2.0", "0.0")).unwrap_err();
        assert!(err.to_string().contains("brush_radius"), "{err}");

        let colorless = format!("button = [{{ label = \"x\", verb = \"COLOR\" }}]\n{MINIMAL}");
        let err = Config::parse(&colorless).unwrap_err();
        assert!(err.to_string().contains("without a `color`"), "{err}");

        let crowded = format!(
            "button = [{{ label = \"a\", verb = \"CLEAR\" }}, {{ label = \"b\", verb = \"CLEAR\" }}]\n{MINIMAL}"
        );
        let err = Config::parse(&crowded).unwrap_err();
        assert!(err.to_string().contains("do not fit"), "{err}");

        let bad_color = MINIMAL.replace("#000000", "black");
        assert!(Config::parse(&bad_color).is_err());
    }
}
