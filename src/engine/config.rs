// Simulation configuration and the built-in presets.
//
// A config is an immutable snapshot: the driver validates it once at mount
// and every field generated from it keeps using the same values. Changing a
// value means mounting a new driver.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::components::Color;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid color {0:?}: expected #rrggbb")]
    InvalidColor(String),

    #[error("palette must contain at least one color")]
    EmptyPalette,

    #[error("{name} must be in {range}, got {value}")]
    OutOfRange {
        name: &'static str,
        range: &'static str,
        value: f32,
    },

    #[error("{0} range is inverted")]
    InvertedRange(&'static str),

    #[error("unknown preset {0:?} (expected antigravity, floating or particles)")]
    UnknownPreset(String),
}

// ============================================================================
// ENUMS
// ============================================================================

/// Force rule applied to every entity of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldBehavior {
    /// Entities near the pointer orbit it on a breathing ring.
    Ring,
    /// Entities near the pointer are pushed out of the way, then settle home.
    Repel,
    /// Free-floating entities get velocity impulses and bounce off the bounds.
    Drift,
}

/// Which point the pointer distance is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    Home,
    Position,
}

/// Geometry used by the scene renderer. The canvas renderer always draws dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeVariant {
    Capsule,
    Sphere,
    Box,
    Tetrahedron,
    Octahedron,
    Icosahedron,
    Dodecahedron,
    Torus,
    /// Each entity picks one of the `FLOATING` shapes at spawn.
    Mixed,
}

impl ShapeVariant {
    /// Every shape that maps to a mesh, in mesh-atlas order.
    pub const CONCRETE: [ShapeVariant; 8] = [
        ShapeVariant::Capsule,
        ShapeVariant::Sphere,
        ShapeVariant::Box,
        ShapeVariant::Tetrahedron,
        ShapeVariant::Octahedron,
        ShapeVariant::Icosahedron,
        ShapeVariant::Dodecahedron,
        ShapeVariant::Torus,
    ];

    /// The drifting-geometry set `Mixed` draws from.
    pub const FLOATING: [ShapeVariant; 6] = [
        ShapeVariant::Icosahedron,
        ShapeVariant::Octahedron,
        ShapeVariant::Tetrahedron,
        ShapeVariant::Box,
        ShapeVariant::Dodecahedron,
        ShapeVariant::Torus,
    ];

    /// Index into `CONCRETE`. `Mixed` has no mesh of its own.
    pub fn mesh_index(self) -> Option<usize> {
        Self::CONCRETE.iter().position(|s| *s == self)
    }
}

/// Which renderer a preset is meant to be shown with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RendererKind {
    Canvas,
    Scene,
}

// ============================================================================
// SIMULATION CONFIG
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub behavior: FieldBehavior,
    pub reference: ReferencePoint,
    pub renderer: RendererKind,

    /// Number of entities per generated field.
    pub count: usize,
    /// Distance within which the pointer affects an entity.
    pub influence_radius: f32,
    /// Orbit radius around the pointer (ring behavior).
    pub ring_radius: f32,
    pub wave_speed: f32,
    pub wave_amplitude: f32,
    /// Higher values tighten the ring by shrinking the per-entity deviation.
    pub field_strength: f32,
    /// Global swirl of the ring in radians per second.
    pub rotation_speed: f32,
    pub depth_factor: f32,
    /// How far a repelled entity is pushed at full force (repel behavior).
    pub push_distance: f32,
    /// Velocity impulse per tick at full force (drift behavior).
    pub impulse_strength: f32,
    /// Amplitude of the resting float around home.
    pub idle_bob: f32,
    /// Slow upward creep of home, units per second (drift behavior).
    pub drift_speed: f32,

    pub damping: f32,
    pub responsiveness: f32,
    /// Per-tick velocity clamp.
    pub max_speed: f32,

    pub auto_animate: bool,
    pub idle_timeout_ms: u64,

    /// Ordered `#rrggbb` palette, banded top to bottom across the field.
    pub colors: Vec<String>,
    pub shape_variant: ShapeVariant,
    pub particle_size: f32,
    pub particle_variance: f32,
    pub pulse_speed: f32,
    /// Draw a soft radial glow under every dot (canvas renderer).
    pub glow: bool,
    pub background: String,

    pub size_range: [f32; 2],
    pub opacity_range: [f32; 2],
    pub frequency_range: [f32; 2],
    /// Z extent of homes in the scene renderer. Ignored by the canvas.
    pub depth_range: [f32; 2],

    /// Fixed seed for reproducible fields. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::antigravity()
    }
}

impl SimulationConfig {
    /// Cursor ring of capsules in a perspective scene.
    pub fn antigravity() -> Self {
        Self {
            behavior: FieldBehavior::Ring,
            reference: ReferencePoint::Home,
            renderer: RendererKind::Scene,
            count: 300,
            influence_radius: 10.0,
            ring_radius: 10.0,
            wave_speed: 0.4,
            wave_amplitude: 1.0,
            field_strength: 10.0,
            rotation_speed: 0.0,
            depth_factor: 1.0,
            push_distance: 0.0,
            impulse_strength: 0.0,
            idle_bob: 0.0,
            drift_speed: 0.0,
            damping: 0.6,
            responsiveness: 0.15,
            max_speed: 4.0,
            auto_animate: true,
            idle_timeout_ms: 2000,
            colors: vec!["#bcb3df".to_string()],
            shape_variant: ShapeVariant::Capsule,
            particle_size: 2.0,
            particle_variance: 1.0,
            pulse_speed: 3.0,
            glow: false,
            background: "#0a0a12".to_string(),
            size_range: [1.0, 1.0],
            opacity_range: [1.0, 1.0],
            frequency_range: [0.3, 0.45],
            depth_range: [-10.0, 10.0],
            seed: None,
        }
    }

    /// Sparse wireframe-like shapes floating in front of the camera.
    pub fn floating() -> Self {
        Self {
            behavior: FieldBehavior::Drift,
            reference: ReferencePoint::Position,
            renderer: RendererKind::Scene,
            count: 60,
            influence_radius: 3.0,
            ring_radius: 0.0,
            wave_speed: 0.0,
            wave_amplitude: 0.0,
            impulse_strength: 0.15,
            idle_bob: 0.3,
            drift_speed: 0.0005,
            damping: 0.95,
            responsiveness: 0.02,
            max_speed: 1.0,
            auto_animate: false,
            colors: vec!["#c9a227".to_string()],
            shape_variant: ShapeVariant::Mixed,
            particle_size: 1.0,
            particle_variance: 0.0,
            pulse_speed: 0.0,
            size_range: [0.8, 1.2],
            opacity_range: [0.15, 0.4],
            frequency_range: [0.3, 0.8],
            depth_range: [-5.0, 1.0],
            ..Self::antigravity()
        }
    }

    /// Dense field of small dots drawn on a 2D canvas, pushed aside by the cursor.
    pub fn particles() -> Self {
        Self {
            behavior: FieldBehavior::Repel,
            reference: ReferencePoint::Home,
            renderer: RendererKind::Canvas,
            count: 1500,
            influence_radius: 80.0,
            ring_radius: 0.0,
            wave_speed: 0.0,
            wave_amplitude: 0.0,
            push_distance: 40.0,
            damping: 0.0,
            responsiveness: 0.08,
            max_speed: 60.0,
            auto_animate: false,
            colors: vec!["#ffffff".to_string()],
            shape_variant: ShapeVariant::Sphere,
            particle_size: 1.0,
            particle_variance: 0.0,
            pulse_speed: 0.0,
            glow: false,
            background: "#000000".to_string(),
            size_range: [1.0, 2.5],
            opacity_range: [0.2, 0.5],
            frequency_range: [0.3, 0.45],
            depth_range: [0.0, 0.0],
            ..Self::antigravity()
        }
    }

    pub fn preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "antigravity" => Ok(Self::antigravity()),
            "floating" => Ok(Self::floating()),
            "particles" => Ok(Self::particles()),
            other => Err(ConfigError::UnknownPreset(other.to_string())),
        }
    }

    /// Parse a TOML document. Missing keys fall back to the antigravity preset.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.damping) {
            return Err(ConfigError::OutOfRange {
                name: "damping",
                range: "[0, 1)",
                value: self.damping,
            });
        }
        if !(self.responsiveness > 0.0 && self.responsiveness <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: "responsiveness",
                range: "(0, 1]",
                value: self.responsiveness,
            });
        }
        for (name, value) in [
            ("influence_radius", self.influence_radius),
            ("ring_radius", self.ring_radius),
            ("max_speed", self.max_speed),
        ] {
            if !(value >= 0.0) {
                return Err(ConfigError::OutOfRange { name, range: "[0, inf)", value });
            }
        }
        if !(self.field_strength >= 0.0) {
            return Err(ConfigError::OutOfRange {
                name: "field_strength",
                range: "[0, inf)",
                value: self.field_strength,
            });
        }
        for (name, value) in [
            ("depth_factor", self.depth_factor),
            ("wave_speed", self.wave_speed),
            ("wave_amplitude", self.wave_amplitude),
            ("rotation_speed", self.rotation_speed),
            ("push_distance", self.push_distance),
            ("impulse_strength", self.impulse_strength),
            ("idle_bob", self.idle_bob),
            ("drift_speed", self.drift_speed),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange { name, range: "finite", value });
            }
        }
        for (name, [lo, hi]) in [
            ("size", self.size_range),
            ("opacity", self.opacity_range),
            ("frequency", self.frequency_range),
            ("depth", self.depth_range),
        ] {
            if lo > hi {
                return Err(ConfigError::InvertedRange(name));
            }
        }
        self.palette()?;
        Color::from_hex(&self.background)?;
        Ok(())
    }

    /// Parsed palette, in config order.
    pub fn palette(&self) -> Result<Vec<Color>, ConfigError> {
        if self.colors.is_empty() {
            return Err(ConfigError::EmptyPalette);
        }
        self.colors.iter().map(|c| Color::from_hex(c)).collect()
    }

    pub fn idle_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.idle_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for name in ["antigravity", "floating", "particles"] {
            let config = SimulationConfig::preset(name).unwrap();
            config.validate().unwrap();
        }
    }

    #[test]
    fn unknown_preset_is_rejected() {
        assert!(matches!(
            SimulationConfig::preset("sparkles"),
            Err(ConfigError::UnknownPreset(_))
        ));
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = SimulationConfig::from_toml(
            r##"
            behavior = "repel"
            count = 12
            colors = ["#ff0000", "#0000ff"]
            shape_variant = "tetrahedron"
            "##,
        )
        .unwrap();
        assert_eq!(config.behavior, FieldBehavior::Repel);
        assert_eq!(config.count, 12);
        assert_eq!(config.shape_variant, ShapeVariant::Tetrahedron);
        // untouched keys keep the antigravity values
        assert_eq!(config.ring_radius, 10.0);
        assert_eq!(config.palette().unwrap().len(), 2);
    }

    #[test]
    fn damping_of_one_is_rejected() {
        let config = SimulationConfig { damping: 1.0, ..SimulationConfig::antigravity() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "damping", .. })
        ));
    }

    #[test]
    fn bad_palette_is_rejected() {
        let config = SimulationConfig {
            colors: vec!["teal".to_string()],
            ..SimulationConfig::antigravity()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidColor(_))));

        let config = SimulationConfig { colors: Vec::new(), ..SimulationConfig::antigravity() };
        assert!(matches!(config.validate(), Err(ConfigError::EmptyPalette)));
    }

    #[test]
    fn field_strength_that_would_divide_by_zero_is_rejected() {
        for value in [-0.1, -5.0, f32::NAN] {
            let config = SimulationConfig { field_strength: value, ..SimulationConfig::antigravity() };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::OutOfRange { name: "field_strength", .. })
            ));
        }
        let config = SimulationConfig { field_strength: 0.0, ..SimulationConfig::antigravity() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn non_finite_wave_terms_are_rejected() {
        let config = SimulationConfig { wave_amplitude: f32::INFINITY, ..SimulationConfig::antigravity() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "wave_amplitude", .. })
        ));
        let config = SimulationConfig { depth_factor: f32::NAN, ..SimulationConfig::antigravity() };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "depth_factor", .. })
        ));
        let config = SimulationConfig::from_toml("wave_speed = inf").unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange { name: "wave_speed", .. })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let config = SimulationConfig { size_range: [2.0, 1.0], ..SimulationConfig::particles() };
        assert!(matches!(config.validate(), Err(ConfigError::InvertedRange("size"))));
    }
}
