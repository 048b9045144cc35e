// Per-entity data for the particle field
// Only `position` and `velocity` change after spawn; everything else is fixed

use glam::{Quat, Vec3};

use super::config::{ConfigError, ShapeVariant};

/// sRGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0 };

    /// Parse `#rrggbb` (the leading `#` is optional).
    pub fn from_hex(text: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidColor(text.to_string());
        let hex = text.strip_prefix('#').unwrap_or(text);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map(|v| v as f32 / 255.0)
                .map_err(|_| invalid())
        };
        Ok(Self { r: channel(0)?, g: channel(2)?, b: channel(4)? })
    }

    /// Linear-light RGBA for the GPU (the surface format is sRGB).
    pub fn to_linear(self, alpha: f32) -> [f32; 4] {
        fn decode(c: f32) -> f32 {
            if c <= 0.04045 { c / 12.92 } else { ((c + 0.055) / 1.055).powf(2.4) }
        }
        [decode(self.r), decode(self.g), decode(self.b), alpha]
    }

    pub fn to_rgba8(self, alpha: f32) -> [u8; 4] {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        [q(self.r), q(self.g), q(self.b), q(alpha)]
    }
}

/// Renderer-only attributes, fixed at spawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualParams {
    /// Dot radius in pixels (canvas) or a scale multiplier (scene).
    pub size: f32,
    pub opacity: f32,
    /// Index into the palette, derived from the home's vertical band.
    pub color_index: usize,
    pub shape: ShapeVariant,
    /// Orientation at spawn and tumble rate in radians per second (scene only).
    pub rotation: Quat,
    pub spin: Vec3,
}

/// One simulated particle or floating shape.
///
/// `home` is private so it cannot move after spawn; read it through `home()`.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    home: Vec3,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Oscillator offset in [0, 2π).
    pub phase: f32,
    /// Oscillator rate in radians per second.
    pub frequency: f32,
    /// Ring radius jitter in [-1, 1).
    pub radius_offset: f32,
    /// Orbit angle used when the pointer sits exactly on the reference point.
    pub ring_angle: f32,
    pub visual: VisualParams,
}

impl Entity {
    /// Spawn at rest on `home`.
    pub fn at_home(
        home: Vec3,
        phase: f32,
        frequency: f32,
        radius_offset: f32,
        ring_angle: f32,
        visual: VisualParams,
    ) -> Self {
        Self {
            home,
            position: home,
            velocity: Vec3::ZERO,
            phase,
            frequency,
            radius_offset,
            ring_angle,
            visual,
        }
    }

    pub fn home(&self) -> Vec3 {
        self.home
    }

    /// Per-entity oscillator clock at simulation time `time`.
    pub fn clock(&self, time: f32) -> f32 {
        self.phase + self.frequency * time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors_parse() {
        let c = Color::from_hex("#ff8000").unwrap();
        assert_eq!(c.to_rgba8(1.0), [255, 128, 0, 255]);
        assert!(Color::from_hex("00ff00").is_ok());
        assert!(Color::from_hex("#ff80").is_err());
        assert!(Color::from_hex("#gg0000").is_err());
    }

    #[test]
    fn linear_conversion_keeps_endpoints() {
        let [r, g, b, a] = Color::WHITE.to_linear(0.5);
        assert!((r - 1.0).abs() < 1e-6 && (g - 1.0).abs() < 1e-6 && (b - 1.0).abs() < 1e-6);
        assert_eq!(a, 0.5);
        let black = Color::from_hex("#000000").unwrap().to_linear(1.0);
        assert_eq!(black[0], 0.0);
    }
}
