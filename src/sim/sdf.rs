//! Signed distance fields for silhouettes
//!
//! Negative inside the silhouette, positive outside, magnitude equal to the
//! distance to the nearest boundary edge.

use glam::Vec2;

use super::shapes::Silhouette;
use crate::error::{Result, SimError};
use crate::settings::GridSettings;

/// Signed distance to a circle
#[inline]
pub fn sd_circle(p: Vec2, center: Vec2, radius: f32) -> f32 {
    (p - center).length() - radius
}

/// Signed distance to a closed polygon
///
/// Inside/outside comes from ray-crossing parity along +x; the magnitude is
/// the minimum distance to any edge. Zero-length edges clamp to their start
/// point.
pub fn sd_polygon(p: Vec2, vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    if n == 0 {
        return f32::MAX;
    }

    let mut min_dist2 = f32::MAX;
    let mut crossings = 0u32;

    let mut j = n - 1;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[j];

        let edge = b - a;
        let len2 = edge.length_squared();
        let t = if len2 > 0.0 {
            ((p - a).dot(edge) / len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let d2 = (p - (a + edge * t)).length_squared();
        min_dist2 = min_dist2.min(d2);

        if (a.y > p.y) != (b.y > p.y) {
            let x_int = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_int {
                crossings += 1;
            }
        }

        j = i;
    }

    let dist = min_dist2.sqrt();
    if crossings & 1 == 1 { -dist } else { dist }
}

/// Twice the signed area (shoelace); zero for collinear outlines
pub fn polygon_area2(vertices: &[Vec2]) -> f32 {
    let n = vertices.len();
    (0..n)
        .map(|i| {
            let a = vertices[i];
            let b = vertices[(i + 1) % n];
            a.perp_dot(b)
        })
        .sum()
}

/// A silhouette ready for distance queries
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeMask {
    Polygon { vertices: Vec<Vec2> },
    Circle { center: Vec2, radius: f32 },
}

impl ShapeMask {
    /// Build a polygon mask, rejecting outlines that cannot enclose anything
    pub fn polygon(name: &str, vertices: Vec<Vec2>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(SimError::degenerate(
                name,
                format!("polygon needs at least 3 vertices, got {}", vertices.len()),
            ));
        }
        if vertices.iter().any(|v| !v.is_finite()) {
            return Err(SimError::degenerate(name, "non-finite vertex coordinate"));
        }
        if polygon_area2(&vertices).abs() < f32::EPSILON {
            return Err(SimError::degenerate(name, "polygon has zero area"));
        }
        Ok(ShapeMask::Polygon { vertices })
    }

    pub fn circle(name: &str, center: Vec2, radius: f32) -> Result<Self> {
        if !center.is_finite() || !(radius > 0.0) {
            return Err(SimError::degenerate(
                name,
                format!("circle radius must be positive, got {radius}"),
            ));
        }
        Ok(ShapeMask::Circle { center, radius })
    }

    /// Signed distance from `p` to the silhouette boundary
    #[inline]
    pub fn distance(&self, p: Vec2) -> f32 {
        match self {
            ShapeMask::Polygon { vertices } => sd_polygon(p, vertices),
            ShapeMask::Circle { center, radius } => sd_circle(p, *center, *radius),
        }
    }

    /// True when `p` lies strictly inside the silhouette
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        self.distance(p) < 0.0
    }
}

/// Lazily built mask for the active silhouette
///
/// The vertex list is computed on first use and reused until the silhouette
/// or the grid size changes.
#[derive(Debug, Clone)]
pub struct ShapeCache {
    silhouette: Silhouette,
    mask: Option<(usize, ShapeMask)>,
}

impl ShapeCache {
    pub fn new(silhouette: Silhouette) -> Self {
        Self {
            silhouette,
            mask: None,
        }
    }

    pub fn silhouette(&self) -> &Silhouette {
        &self.silhouette
    }

    /// Switch silhouettes; drops any cached mask
    pub fn set_silhouette(&mut self, silhouette: Silhouette) {
        self.silhouette = silhouette;
        self.invalidate();
    }

    pub fn invalidate(&mut self) {
        self.mask = None;
    }

    pub fn is_cached(&self) -> bool {
        self.mask.is_some()
    }

    /// Mask for the active silhouette at the given grid geometry
    pub fn mask(&mut self, grid: &GridSettings) -> Result<&ShapeMask> {
        let mask = match self.mask.take() {
            Some((size, mask)) if size == grid.size => mask,
            _ => self.silhouette.build_mask(grid)?,
        };
        let entry = self.mask.insert((grid.size, mask));
        Ok(&entry.1)
    }
}
