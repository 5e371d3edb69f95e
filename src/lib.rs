//! Dalgona - crack simulation for a brittle candy disc
//!
//! Core modules:
//! - `sim`: Simulation core (shape masks, toughness noise, grid state, crack propagation)
//! - `settings`: Data-driven tuning, loadable from JSON
//! - `error`: Error taxonomy shared by all layers

pub mod error;
pub mod settings;
pub mod sim;

pub use error::{RejectReason, Result, SimError};
pub use settings::{CrackSettings, GridSettings, NoiseSettings, RuleSettings, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Grid side length in cells
    pub const GRID_SIZE: usize = 600;
    /// Silhouette coordinates are authored on an 84-cell grid and scaled up
    pub const SHAPE_UNIT_GRID: f32 = 84.0;
    /// Disc radius as a fraction of the grid side
    pub const DISC_RADIUS_RATIO: f32 = 0.45;
    /// Half-width of the outline band (inside side; outside side is half of this)
    pub const OUTLINE_THICKNESS: f32 = 5.5;
    /// Fixed toughness of outline cells
    pub const OUTLINE_TOUGHNESS: i32 = 8;
    /// Upper bound of the cosmetic per-cell jitter
    pub const JITTER_MAX: f32 = 0.15;

    /// Damage dealt to the impact cell and initial wave force
    pub const BASE_DAMAGE: i32 = 60;
    /// Radius (cells) of the direct impact halo
    pub const HALO_RADIUS: i32 = 5;
    /// Maximum wave generations from the origin
    pub const CRACK_MAX_DEPTH: u16 = 30;

    /// Fraction of outline cells that must break to win
    pub const WIN_OUTLINE_RATIO: f32 = 0.91;
    /// Fraction of inside cells that may break before the candy is lost
    pub const LOSE_INSIDE_RATIO: f32 = 0.08;
    /// Round length in seconds (enforced by the timer layer)
    pub const TIME_LIMIT_SECS: u32 = 60;
}

/// 8-connected neighbour offsets
pub const NEIGHBORS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Linear index of `(x, y)` on a square grid of side `size`, or `None` when out of bounds
#[inline]
pub fn index_of(size: usize, x: i32, y: i32) -> Option<usize> {
    if x < 0 || y < 0 {
        return None;
    }
    let (x, y) = (x as usize, y as usize);
    if x >= size || y >= size {
        return None;
    }
    Some(y * size + x)
}

/// Inverse of [`index_of`]
#[inline]
pub fn coords_of(size: usize, idx: usize) -> (i32, i32) {
    ((idx % size) as i32, (idx / size) as i32)
}

/// Offset of length `r` at angle `theta` (radians, y down)
#[inline]
pub fn polar_offset(r: f32, theta: f32) -> Vec2 {
    Vec2::new(r * theta.cos(), r * theta.sin())
}

/// Lattice point of a cell in grid space
#[inline]
pub fn cell_point(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32, y as f32)
}
