//! Grid state - struct of arrays over the candy lattice
//!
//! One entry per linear index `y * N + x`. Region and disc membership are
//! written once by [`GridState::classify`]; toughness, cracks and breakage
//! change only through the damage primitives used by the crack engine.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::noise::ToughnessField;
use super::sdf::ShapeMask;
use crate::error::{Result, SimError};
use crate::settings::GridSettings;
use crate::{cell_point, coords_of, index_of};

/// Structural region of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Region {
    #[default]
    Outside = 0,
    Outline = 1,
    Inside = 2,
}

/// Aggregate breakage counters, kept in step with per-cell state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Stats {
    pub total_outline: u32,
    pub broken_outline: u32,
    pub total_inside: u32,
    pub broken_inside: u32,
}

impl Stats {
    /// Fraction of the outline cleared (0 when there is no outline)
    pub fn outline_progress(&self) -> f32 {
        if self.total_outline == 0 {
            0.0
        } else {
            self.broken_outline as f32 / self.total_outline as f32
        }
    }

    /// Fraction of the interior still intact (1 when there is no interior)
    pub fn integrity(&self) -> f32 {
        if self.total_inside == 0 {
            1.0
        } else {
            (1.0 - self.broken_inside as f32 / self.total_inside as f32).max(0.0)
        }
    }
}

/// Read-only view of one cell for renderers
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CellView {
    pub x: i32,
    pub y: i32,
    pub region: Region,
    pub in_disc: bool,
    pub toughness: i32,
    pub toughness_max: i32,
    pub crack: u16,
    pub broken: bool,
    pub jitter: f32,
}

/// Cells mutated since the consumer last cleared the set
///
/// Insertion order is kept; a per-cell flag makes `mark` O(1) and duplicate-free.
#[derive(Debug, Clone, Default)]
pub struct DirtySet {
    flags: Vec<bool>,
    cells: Vec<usize>,
}

impl DirtySet {
    pub fn new(cell_count: usize) -> Self {
        Self {
            flags: vec![false; cell_count],
            cells: Vec::new(),
        }
    }

    #[inline]
    pub fn mark(&mut self, idx: usize) {
        if !self.flags[idx] {
            self.flags[idx] = true;
            self.cells.push(idx);
        }
    }

    #[inline]
    pub fn contains(&self, idx: usize) -> bool {
        self.flags[idx]
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Linear indices in first-marked order
    pub fn indices(&self) -> &[usize] {
        &self.cells
    }

    pub fn clear(&mut self) {
        for &idx in &self.cells {
            self.flags[idx] = false;
        }
        self.cells.clear();
    }
}

/// Result of applying damage to one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Damage {
    /// Nothing changed (inert, already broken, or zero damage)
    Ignored,
    /// Toughness reduced, cell still standing
    Cracked,
    /// Cell crossed the broken threshold in this call
    Broke(Region),
}

/// Authoritative per-cell simulation state
#[derive(Debug, Clone)]
pub struct GridState {
    size: usize,
    center: Vec2,
    disc_radius: f32,

    region: Vec<Region>,
    in_disc: Vec<bool>,
    toughness_max: Vec<i32>,
    toughness: Vec<i32>,
    crack: Vec<u16>,
    broken: Vec<bool>,
    jitter: Vec<f32>,

    stats: Stats,
    dirty: DirtySet,
}

impl GridState {
    /// Classify every lattice point against the disc and the silhouette
    ///
    /// Runs once per session in O(N²). Fails if the silhouette leaves no
    /// outline cells inside the disc.
    pub fn classify<R: Rng + ?Sized>(
        settings: &GridSettings,
        mask: &ShapeMask,
        field: &ToughnessField,
        rng: &mut R,
    ) -> Result<Self> {
        let n = settings.size;
        let total = n * n;
        let c = settings.center();
        let center = Vec2::new(c, c);
        let disc_radius = settings.disc_radius();
        let radius2 = disc_radius * disc_radius;
        let thickness = settings.outline_thickness;

        let mut grid = Self {
            size: n,
            center,
            disc_radius,
            region: vec![Region::Outside; total],
            in_disc: vec![false; total],
            toughness_max: vec![0; total],
            toughness: vec![0; total],
            crack: vec![0; total],
            broken: vec![false; total],
            jitter: vec![0.0; total],
            stats: Stats::default(),
            dirty: DirtySet::new(total),
        };

        for y in 0..n as i32 {
            for x in 0..n as i32 {
                let i = y as usize * n + x as usize;
                let p = cell_point(x, y);

                grid.jitter[i] = rng.random::<f32>() * settings.jitter_max;

                if (p - center).length_squared() > radius2 {
                    continue;
                }
                grid.in_disc[i] = true;

                let d = mask.distance(p);
                let (region, hp) = if d < -thickness {
                    grid.stats.total_inside += 1;
                    (Region::Inside, field.toughness_at(x, y))
                } else if d <= thickness * 0.5 {
                    grid.stats.total_outline += 1;
                    (Region::Outline, settings.outline_toughness)
                } else {
                    (Region::Outside, field.toughness_at(x, y))
                };

                grid.region[i] = region;
                grid.toughness_max[i] = hp;
                grid.toughness[i] = hp;
            }
        }

        if grid.stats.total_outline == 0 {
            return Err(SimError::degenerate(
                "classified grid",
                "no outline cells fall inside the disc",
            ));
        }

        log::info!(
            "Classified {}x{} grid: outline={}, inside={}",
            n,
            n,
            grid.stats.total_outline,
            grid.stats.total_inside
        );

        Ok(grid)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cell_count(&self) -> usize {
        self.size * self.size
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    pub fn disc_radius(&self) -> f32 {
        self.disc_radius
    }

    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        index_of(self.size, x, y)
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (i32, i32) {
        coords_of(self.size, idx)
    }

    #[inline]
    pub fn region(&self, idx: usize) -> Region {
        self.region[idx]
    }

    #[inline]
    pub fn in_disc(&self, idx: usize) -> bool {
        self.in_disc[idx]
    }

    #[inline]
    pub fn toughness(&self, idx: usize) -> i32 {
        self.toughness[idx]
    }

    #[inline]
    pub fn toughness_max(&self, idx: usize) -> i32 {
        self.toughness_max[idx]
    }

    #[inline]
    pub fn crack(&self, idx: usize) -> u16 {
        self.crack[idx]
    }

    #[inline]
    pub fn is_broken(&self, idx: usize) -> bool {
        self.broken[idx]
    }

    #[inline]
    pub fn jitter(&self, idx: usize) -> f32 {
        self.jitter[idx]
    }

    /// O(1) aggregate counters
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn dirty(&self) -> &DirtySet {
        &self.dirty
    }

    /// Called by the renderer once it has redrawn the dirty cells
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Snapshot of one cell, `None` when out of bounds
    pub fn cell(&self, x: i32, y: i32) -> Option<CellView> {
        let i = self.index(x, y)?;
        Some(self.view(i))
    }

    pub fn view(&self, idx: usize) -> CellView {
        let (x, y) = self.coords(idx);
        CellView {
            x,
            y,
            region: self.region[idx],
            in_disc: self.in_disc[idx],
            toughness: self.toughness[idx],
            toughness_max: self.toughness_max[idx],
            crack: self.crack[idx],
            broken: self.broken[idx],
            jitter: self.jitter[idx],
        }
    }

    /// Full-grid snapshot for the initial draw
    pub fn cells(&self) -> impl Iterator<Item = CellView> + '_ {
        (0..self.cell_count()).map(move |i| self.view(i))
    }

    /// True if the cell can still take damage
    #[inline]
    pub fn is_live(&self, idx: usize) -> bool {
        self.in_disc[idx] && !self.broken[idx]
    }

    /// Reduce a cell's toughness, breaking it at zero
    ///
    /// Every effective call bumps the crack counter and marks the cell dirty.
    /// The region counter moves exactly once, on the false→true transition.
    pub fn apply_damage(&mut self, idx: usize, amount: i32) -> Damage {
        if amount <= 0 || !self.is_live(idx) {
            return Damage::Ignored;
        }

        self.toughness[idx] -= amount;
        self.crack[idx] = self.crack[idx].saturating_add(1);
        self.dirty.mark(idx);

        if self.toughness[idx] > 0 {
            return Damage::Cracked;
        }

        self.toughness[idx] = 0;
        self.broken[idx] = true;
        let region = self.region[idx];
        match region {
            Region::Outline => self.stats.broken_outline += 1,
            Region::Inside => self.stats.broken_inside += 1,
            Region::Outside => {}
        }
        Damage::Broke(region)
    }

    /// Full recount of the aggregate counters (verification only)
    pub fn recount(&self) -> Stats {
        let mut s = Stats::default();
        for i in 0..self.cell_count() {
            if !self.in_disc[i] {
                continue;
            }
            match self.region[i] {
                Region::Outline => {
                    s.total_outline += 1;
                    s.broken_outline += self.broken[i] as u32;
                }
                Region::Inside => {
                    s.total_inside += 1;
                    s.broken_inside += self.broken[i] as u32;
                }
                Region::Outside => {}
            }
        }
        s
    }
}
