//! Silhouette catalogue
//!
//! Built-in shapes are authored on an 84-cell grid and scaled to the active
//! grid size. Rigid shapes are hand-placed vertices; organic ones are sampled
//! from a parametric curve.

use std::f32::consts::{PI, TAU};
use std::str::FromStr;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::sdf::ShapeMask;
use crate::error::{Result, SimError};
use crate::polar_offset;
use crate::settings::GridSettings;

/// Heart curve sample count
const HEART_SAMPLES: usize = 80;
/// Umbrella dome arc sample count
const DOME_SAMPLES: usize = 40;
/// Umbrella hook arc sample count
const HOOK_SAMPLES: usize = 16;

/// The shape the player must cut out
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Silhouette {
    #[default]
    Star,
    Heart,
    Circle,
    Umbrella,
    Triangle,
    /// Caller-supplied closed polygon in grid coordinates
    Custom { name: String, vertices: Vec<Vec2> },
}

impl Silhouette {
    /// All built-in silhouettes, in menu order
    pub fn builtins() -> [Silhouette; 5] {
        [
            Silhouette::Star,
            Silhouette::Heart,
            Silhouette::Circle,
            Silhouette::Umbrella,
            Silhouette::Triangle,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Silhouette::Star => "star",
            Silhouette::Heart => "heart",
            Silhouette::Circle => "circle",
            Silhouette::Umbrella => "umbrella",
            Silhouette::Triangle => "triangle",
            Silhouette::Custom { name, .. } => name,
        }
    }

    /// Menu label
    pub fn label(&self) -> &str {
        match self {
            Silhouette::Star => "⭐ Star",
            Silhouette::Heart => "❤️ Heart",
            Silhouette::Circle => "⭕ Circle",
            Silhouette::Umbrella => "☂️ Umbrella",
            Silhouette::Triangle => "🔺 Triangle",
            Silhouette::Custom { name, .. } => name,
        }
    }

    /// Compute the distance mask for this silhouette on the given grid
    pub fn build_mask(&self, grid: &GridSettings) -> Result<ShapeMask> {
        let c = grid.center();
        let s = grid.shape_scale();
        let center = Vec2::new(c, c);
        let name = self.as_str();

        match self {
            Silhouette::Star => ShapeMask::polygon(name, star_vertices(center, 24.0 * s, 10.0 * s)),
            Silhouette::Heart => ShapeMask::polygon(
                name,
                heart_vertices(center + Vec2::new(0.0, 2.0 * s), 1.15 * s),
            ),
            Silhouette::Circle => ShapeMask::circle(name, center, 20.0 * s),
            Silhouette::Umbrella => ShapeMask::polygon(name, umbrella_vertices(center, s)),
            Silhouette::Triangle => ShapeMask::polygon(
                name,
                triangle_vertices(center + Vec2::new(0.0, 2.0 * s), 22.0 * s),
            ),
            Silhouette::Custom { vertices, .. } => ShapeMask::polygon(name, vertices.clone()),
        }
    }
}

impl FromStr for Silhouette {
    type Err = SimError;

    /// Built-in silhouette by key, case-insensitive
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "star" => Ok(Silhouette::Star),
            "heart" => Ok(Silhouette::Heart),
            "circle" => Ok(Silhouette::Circle),
            "umbrella" => Ok(Silhouette::Umbrella),
            "triangle" => Ok(Silhouette::Triangle),
            _ => Err(SimError::UnknownSilhouette(s.to_string())),
        }
    }
}

/// Five-pointed star, alternating outer and inner radius, first tip pointing up
pub fn star_vertices(center: Vec2, outer_r: f32, inner_r: f32) -> Vec<Vec2> {
    (0..10)
        .map(|i| {
            let angle = i as f32 * PI / 5.0 - PI / 2.0;
            let r = if i % 2 == 0 { outer_r } else { inner_r };
            center + polar_offset(r, angle)
        })
        .collect()
}

/// Classic parametric heart, flipped so the point faces +y (down)
///
/// x(t) = 16 sin³t, y(t) = 13 cos t − 5 cos 2t − 2 cos 3t − cos 4t
pub fn heart_vertices(center: Vec2, scale: f32) -> Vec<Vec2> {
    (0..HEART_SAMPLES)
        .map(|i| {
            let t = i as f32 / HEART_SAMPLES as f32 * TAU;
            let hx = 16.0 * t.sin().powi(3);
            let hy = -(13.0 * t.cos() - 5.0 * (2.0 * t).cos() - 2.0 * (3.0 * t).cos()
                - (4.0 * t).cos());
            center + Vec2::new(hx, hy) * scale
        })
        .collect()
}

/// Umbrella: upper dome, straight handle, J-hook curling right
pub fn umbrella_vertices(center: Vec2, s: f32) -> Vec<Vec2> {
    let dome_r = 22.0 * s;
    let dome_y = center.y - 4.0 * s;
    let handle_w = 2.5 * s;
    let handle_bot = center.y + 22.0 * s;
    let hook_r = 5.0 * s;

    let mut v = Vec::with_capacity(DOME_SAMPLES + 2 * HOOK_SAMPLES + 8);

    // Dome, left to right across the top
    let dome_center = Vec2::new(center.x, dome_y);
    for i in 0..=DOME_SAMPLES {
        let a = PI + i as f32 / DOME_SAMPLES as f32 * PI;
        v.push(dome_center + polar_offset(dome_r, a));
    }

    // Right side of the handle
    v.push(Vec2::new(center.x + handle_w, dome_y));
    v.push(Vec2::new(center.x + handle_w, handle_bot));

    // Hook: outer arc forward, inner arc back
    let hook_center = Vec2::new(center.x + hook_r, handle_bot);
    let outer = hook_r + handle_w;
    let inner = (hook_r - handle_w).max(0.0);
    for i in 0..=HOOK_SAMPLES {
        let a = -PI / 2.0 + i as f32 / HOOK_SAMPLES as f32 * PI;
        v.push(hook_center + polar_offset(outer, a));
    }
    for i in (0..=HOOK_SAMPLES).rev() {
        let a = -PI / 2.0 + i as f32 / HOOK_SAMPLES as f32 * PI;
        v.push(hook_center + polar_offset(inner, a));
    }

    // Left side of the handle, back up to the dome
    v.push(Vec2::new(center.x - handle_w, handle_bot));
    v.push(Vec2::new(center.x - handle_w, dome_y));

    v
}

/// Equilateral triangle with one vertex pointing up
pub fn triangle_vertices(center: Vec2, r: f32) -> Vec<Vec2> {
    (0..3)
        .map(|i| {
            let a = i as f32 * TAU / 3.0 - PI / 2.0;
            center + polar_offset(r, a)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builtin_keys() {
        for s in Silhouette::builtins() {
            assert_eq!(s.as_str().parse::<Silhouette>().unwrap(), s);
        }
        assert_eq!("HEART".parse::<Silhouette>().unwrap(), Silhouette::Heart);
        let err = "hexagon".parse::<Silhouette>().unwrap_err();
        assert!(matches!(err, SimError::UnknownSilhouette(ref name) if name == "hexagon"));
    }

    #[test]
    fn test_builtin_masks_contain_grid_center() {
        let grid = GridSettings::default();
        let c = Vec2::splat(grid.center());
        for s in Silhouette::builtins() {
            let mask = s.build_mask(&grid).unwrap();
            // Umbrella handle is narrow but runs through the centre column
            assert!(mask.contains(c), "{} should contain the centre", s.as_str());
        }
    }

    #[test]
    fn test_builtins_fit_inside_disc() {
        let grid = GridSettings::default();
        let c = Vec2::splat(grid.center());
        let disc = grid.disc_radius();
        let s = grid.shape_scale();
        let all = [
            star_vertices(c, 24.0 * s, 10.0 * s),
            heart_vertices(c, 1.15 * s),
            umbrella_vertices(c, s),
            triangle_vertices(c, 22.0 * s),
        ];
        for verts in all {
            assert!(verts.iter().all(|v| (*v - c).length() < disc));
        }
    }

    #[test]
    fn test_star_tip_points_up() {
        let verts = star_vertices(Vec2::ZERO, 10.0, 4.0);
        assert_eq!(verts.len(), 10);
        assert!((verts[0] - Vec2::new(0.0, -10.0)).length() < 1e-4);
        assert!((verts[1].length() - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_heart_point_faces_down() {
        let verts = heart_vertices(Vec2::ZERO, 1.0);
        assert_eq!(verts.len(), HEART_SAMPLES);
        let lowest = verts.iter().map(|v| v.y).fold(f32::MIN, f32::max);
        let highest = verts.iter().map(|v| v.y).fold(f32::MAX, f32::min);
        // Tip at t = π sits at y = +17, lobes top out near y = -12
        assert!((lowest - 17.0).abs() < 0.5);
        assert!(highest > -13.0 && highest < -10.0);
    }

    #[test]
    fn test_custom_silhouette_validates() {
        let grid = GridSettings::default();
        let bad = Silhouette::Custom {
            name: "sliver".into(),
            vertices: vec![Vec2::ZERO, Vec2::X],
        };
        assert!(bad.build_mask(&grid).is_err());
        assert_eq!(bad.as_str(), "sliver");
    }
}
