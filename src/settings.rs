//! Simulation settings and tuning
//!
//! Loaded from JSON on native builds; every field has a default so partial
//! files only override what they name.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Result, SimError};

/// Coherent-noise parameters for the toughness field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    /// Grid-to-noise coordinate scale
    pub scale: f32,
    /// fBm octave count
    pub octaves: u32,
    /// Amplitude multiplier per octave
    pub persistence: f32,
    /// Frequency multiplier per octave
    pub lacunarity: f32,
    /// Toughness spread around `base`
    pub amplitude: f32,
    /// Toughness at noise value 0
    pub base: f32,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            scale: 0.2,
            octaves: 1,
            persistence: 0.1,
            lacunarity: 3.0,
            amplitude: 25.0,
            base: 45.0,
        }
    }
}

/// Grid geometry and classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSettings {
    /// Side length of the square lattice
    pub size: usize,
    /// Disc radius as a fraction of `size`
    pub disc_radius_ratio: f32,
    /// Outline band half-width on the inside of the silhouette
    pub outline_thickness: f32,
    /// Fixed toughness of outline cells
    pub outline_toughness: i32,
    /// Upper bound of the cosmetic jitter
    pub jitter_max: f32,
    pub noise: NoiseSettings,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            size: GRID_SIZE,
            disc_radius_ratio: DISC_RADIUS_RATIO,
            outline_thickness: OUTLINE_THICKNESS,
            outline_toughness: OUTLINE_TOUGHNESS,
            jitter_max: JITTER_MAX,
            noise: NoiseSettings::default(),
        }
    }
}

impl GridSettings {
    /// Grid centre (lattice units)
    pub fn center(&self) -> f32 {
        (self.size / 2) as f32
    }

    /// Disc radius, floored to whole cells
    pub fn disc_radius(&self) -> f32 {
        (self.size as f32 * self.disc_radius_ratio).floor()
    }

    /// Silhouette scale relative to the authoring grid
    pub fn shape_scale(&self) -> f32 {
        self.size as f32 / SHAPE_UNIT_GRID
    }
}

/// Crack propagation tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrackSettings {
    // === Direct hit ===
    /// Damage to the impact cell; also the wave's starting force
    pub base_damage: i32,

    // === Impact halo ===
    pub halo_radius: i32,
    /// Hit chance at the centre for outline cells
    pub halo_outline_prob: f32,
    /// Hit chance at the centre for all other cells
    pub halo_other_prob: f32,
    pub halo_damage: i32,

    // === Wave ===
    pub max_depth: u16,
    /// Nodes weaker than this are dropped
    pub min_force: f32,
    /// Damage multiplier for diagonal neighbours
    pub diagonal_factor: f32,
    /// Decay along an unbroken outline chain
    pub decay_outline: f32,
    pub decay_tough: f32,
    pub decay_medium: f32,
    pub decay_weak: f32,
    /// Source toughness at or above this uses `decay_tough`
    pub tier_tough: i32,
    /// Source toughness at or above this uses `decay_medium`
    pub tier_medium: i32,
    /// Chance an unbroken weak cell keeps the wave going
    pub continue_chance: f32,

    // === Directional branching ===
    /// Unbroken cells at or below this toughness may tunnel
    pub branch_threshold: i32,
    /// Scales cosine similarity into an acceptance probability
    pub branch_bias: f32,
    pub tunnel_chance: f32,
    /// Damage multiplier applied to tunnelled cells
    pub tunnel_multiplier: f32,
}

impl Default for CrackSettings {
    fn default() -> Self {
        Self {
            base_damage: BASE_DAMAGE,

            halo_radius: HALO_RADIUS,
            halo_outline_prob: 0.85,
            halo_other_prob: 0.80,
            halo_damage: 20,

            max_depth: CRACK_MAX_DEPTH,
            min_force: 1.0,
            diagonal_factor: 0.8,
            decay_outline: 0.97,
            decay_tough: 0.80,
            decay_medium: 0.86,
            decay_weak: 0.90,
            tier_tough: 50,
            tier_medium: 35,
            continue_chance: 0.35,

            branch_threshold: 6,
            branch_bias: 0.5,
            tunnel_chance: 0.7,
            tunnel_multiplier: 2.0,
        }
    }
}

impl CrackSettings {
    /// Decay multiplier for a source cell with the given remaining toughness
    pub fn tier_decay(&self, toughness: i32) -> f32 {
        if toughness >= self.tier_tough {
            self.decay_tough
        } else if toughness >= self.tier_medium {
            self.decay_medium
        } else {
            self.decay_weak
        }
    }
}

/// Win/lose thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSettings {
    pub win_outline_ratio: f32,
    pub lose_inside_ratio: f32,
    /// Round length, enforced by the timer layer through `Session::time_up`
    pub time_limit_secs: u32,
}

impl Default for RuleSettings {
    fn default() -> Self {
        Self {
            win_outline_ratio: WIN_OUTLINE_RATIO,
            lose_inside_ratio: LOSE_INSIDE_RATIO,
            time_limit_secs: TIME_LIMIT_SECS,
        }
    }
}

/// Complete simulation settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub grid: GridSettings,
    pub crack: CrackSettings,
    pub rules: RuleSettings,
}

impl Settings {
    /// Parse and validate settings from JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&json)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!(
                    "Using default settings ({}: {})",
                    path.as_ref().display(),
                    e
                );
                Self::default()
            }
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check that every field is in a usable range
    pub fn validate(&self) -> Result<()> {
        let g = &self.grid;
        let c = &self.crack;
        let r = &self.rules;

        if g.size < 16 {
            return invalid(format!("grid.size must be at least 16, got {}", g.size));
        }
        if !(g.disc_radius_ratio > 0.0 && g.disc_radius_ratio <= 0.5) {
            return invalid(format!(
                "grid.disc_radius_ratio must be in (0, 0.5], got {}",
                g.disc_radius_ratio
            ));
        }
        if !(g.outline_thickness > 0.0) {
            return invalid("grid.outline_thickness must be positive".into());
        }
        if g.outline_toughness < 1 {
            return invalid("grid.outline_toughness must be at least 1".into());
        }
        if !(g.jitter_max >= 0.0) {
            return invalid("grid.jitter_max must not be negative".into());
        }
        if g.noise.octaves == 0 {
            return invalid("grid.noise.octaves must be at least 1".into());
        }
        if !(g.noise.scale > 0.0 && g.noise.lacunarity > 0.0 && g.noise.persistence > 0.0) {
            return invalid("grid.noise scale, lacunarity and persistence must be positive".into());
        }
        if g.noise.base - g.noise.amplitude.abs() < 1.0 {
            return invalid("grid.noise.base - amplitude must leave toughness of at least 1".into());
        }

        if c.base_damage < 1 || c.halo_damage < 0 {
            return invalid("crack damage values must be positive".into());
        }
        if c.halo_radius < 0 {
            return invalid("crack.halo_radius must not be negative".into());
        }
        for (name, p) in [
            ("halo_outline_prob", c.halo_outline_prob),
            ("halo_other_prob", c.halo_other_prob),
            ("continue_chance", c.continue_chance),
            ("branch_bias", c.branch_bias),
            ("tunnel_chance", c.tunnel_chance),
            ("diagonal_factor", c.diagonal_factor),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return invalid(format!("crack.{name} must be in [0, 1], got {p}"));
            }
        }
        for (name, d) in [
            ("decay_outline", c.decay_outline),
            ("decay_tough", c.decay_tough),
            ("decay_medium", c.decay_medium),
            ("decay_weak", c.decay_weak),
        ] {
            if !(d > 0.0 && d <= 1.0) {
                return invalid(format!("crack.{name} must be in (0, 1], got {d}"));
            }
        }
        if c.tier_tough < c.tier_medium {
            return invalid("crack.tier_tough must not be below crack.tier_medium".into());
        }
        if !(c.min_force > 0.0) || !(c.tunnel_multiplier >= 0.0) {
            return invalid("crack.min_force must be positive and tunnel_multiplier non-negative".into());
        }

        for (name, ratio) in [
            ("win_outline_ratio", r.win_outline_ratio),
            ("lose_inside_ratio", r.lose_inside_ratio),
        ] {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return invalid(format!("rules.{name} must be in (0, 1], got {ratio}"));
            }
        }

        Ok(())
    }
}

fn invalid(msg: String) -> Result<()> {
    Err(SimError::InvalidSettings(msg))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        Settings::default().validate().unwrap();
    }

    #[test]
    fn test_default_geometry() {
        let g = GridSettings::default();
        assert_eq!(g.center(), 300.0);
        assert_eq!(g.disc_radius(), 270.0);
        assert!((g.shape_scale() - 600.0 / 84.0).abs() < 1e-6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings = Settings::from_json_str(r#"{ "grid": { "size": 120 } }"#).unwrap();
        assert_eq!(settings.grid.size, 120);
        assert_eq!(settings.grid.outline_thickness, OUTLINE_THICKNESS);
        assert_eq!(settings.crack, CrackSettings::default());
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings::default();
        let json = settings.to_json_pretty().unwrap();
        assert_eq!(Settings::from_json_str(&json).unwrap(), settings);
    }

    #[test]
    fn test_rejects_bad_probability() {
        let err = Settings::from_json_str(r#"{ "crack": { "tunnel_chance": 1.5 } }"#).unwrap_err();
        assert!(matches!(err, SimError::InvalidSettings(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = Settings::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::SettingsParse(_)));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let settings = Settings::load_or_default("/nonexistent/dalgona-settings.json");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_tier_decay() {
        let c = CrackSettings::default();
        assert_eq!(c.tier_decay(70), c.decay_tough);
        assert_eq!(c.tier_decay(50), c.decay_tough);
        assert_eq!(c.tier_decay(40), c.decay_medium);
        assert_eq!(c.tier_decay(0), c.decay_weak);
    }
}
