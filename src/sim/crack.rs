//! Crack propagation
//!
//! An impact runs three passes over the grid:
//! 1. Direct hit on the impact cell.
//! 2. A halo of probabilistic hits within `halo_radius`, fading with distance.
//! 3. A bounded breadth-first damage wave. Force decays per generation by a
//!    factor picked from the source cell's remaining toughness tier, or a
//!    slower outline factor while the wave runs along an unbroken outline.
//!    Weak, cracked cells may tunnel two cells ahead in a direction biased
//!    away from the impact, which is what draws long thin crack lines.
//!
//! Runs to completion synchronously; the caller serializes impacts.

use glam::Vec2;
use rand::Rng;
use serde::Serialize;

use super::grid::{Damage, GridState, Region};
use super::queue::RingQueue;
use crate::error::{RejectReason, Result, SimError};
use crate::settings::CrackSettings;
use crate::{NEIGHBORS, cell_point};

/// Queue growth past this many entries is logged
const QUEUE_WARN_CAPACITY: usize = 1 << 20;

/// One pending wave step
#[derive(Debug, Clone, Copy, PartialEq)]
struct WaveNode {
    idx: usize,
    force: f32,
    generation: u16,
}

/// Summary of a single applied impact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImpactReport {
    pub x: i32,
    pub y: i32,
    /// Damage applications that changed a cell (a cell may count more than once)
    pub cells_damaged: u32,
    pub cells_broken: u32,
    pub outline_broken: u32,
    pub inside_broken: u32,
    /// Furthest wave generation that touched a cell
    pub deepest_generation: u16,
    pub tunnels: u32,
    pub queue_high_water: usize,
}

impl ImpactReport {
    fn record(&mut self, outcome: Damage, generation: u16) {
        match outcome {
            Damage::Ignored => return,
            Damage::Cracked => {}
            Damage::Broke(region) => {
                self.cells_broken += 1;
                match region {
                    Region::Outline => self.outline_broken += 1,
                    Region::Inside => self.inside_broken += 1,
                    Region::Outside => {}
                }
            }
        }
        self.cells_damaged += 1;
        self.deepest_generation = self.deepest_generation.max(generation);
    }
}

#[inline]
fn force_to_damage(force: f32) -> i32 {
    force.round() as i32
}

/// Owns the per-wave scratch state; the grid is borrowed per impact
#[derive(Debug, Clone)]
pub struct CrackEngine {
    settings: CrackSettings,
    /// Generation + 1 of each cell touched by the current wave, 0 = unvisited
    visited: Vec<u16>,
    touched: Vec<usize>,
    queue: RingQueue<WaveNode>,
    #[cfg(test)]
    tunnel_trace: Vec<TunnelTrace>,
}

/// Record of one accepted tunnel
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
struct TunnelTrace {
    origin: Vec2,
    from: (i32, i32),
    dir: (i32, i32),
    generation: u16,
}

impl CrackEngine {
    pub fn new(settings: CrackSettings, cell_count: usize) -> Self {
        Self {
            settings,
            visited: vec![0; cell_count],
            touched: Vec::new(),
            queue: RingQueue::default(),
            #[cfg(test)]
            tunnel_trace: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CrackSettings {
        &self.settings
    }

    /// Validate impact coordinates without touching any state
    pub fn check_impact(grid: &GridState, x: i32, y: i32) -> Result<usize> {
        let reject = |reason| SimError::ImpactRejected { x, y, reason };
        let idx = grid.index(x, y).ok_or(reject(RejectReason::OutOfBounds))?;
        if !grid.in_disc(idx) {
            return Err(reject(RejectReason::OutsideDisc));
        }
        if grid.is_broken(idx) {
            return Err(reject(RejectReason::AlreadyBroken));
        }
        Ok(idx)
    }

    /// Apply an impact at `(x, y)`
    ///
    /// Rejected impacts leave the grid and its dirty set untouched. Mutated
    /// cells accumulate in the grid's dirty set until the consumer clears it.
    pub fn apply_impact<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridState,
        x: i32,
        y: i32,
        rng: &mut R,
    ) -> Result<ImpactReport> {
        let origin = Self::check_impact(grid, x, y)?;

        if self.visited.len() != grid.cell_count() {
            self.visited = vec![0; grid.cell_count()];
        }

        let mut report = ImpactReport {
            x,
            y,
            ..ImpactReport::default()
        };

        let outcome = grid.apply_damage(origin, self.settings.base_damage);
        report.record(outcome, 0);

        self.impact_halo(grid, x, y, &mut report, rng);

        self.queue.reset_high_water();
        let wave = self.run_wave(grid, origin, &mut report, rng);
        self.reset_visited();
        self.queue.clear();
        wave?;

        report.queue_high_water = self.queue.high_water();
        log::debug!(
            "Impact ({}, {}): damaged={}, broken={} (outline={}, inside={}), depth={}, tunnels={}, queue={}",
            x,
            y,
            report.cells_damaged,
            report.cells_broken,
            report.outline_broken,
            report.inside_broken,
            report.deepest_generation,
            report.tunnels,
            report.queue_high_water
        );
        Ok(report)
    }

    /// Direct hits on cells around the impact, likelier near the centre
    fn impact_halo<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridState,
        x: i32,
        y: i32,
        report: &mut ImpactReport,
        rng: &mut R,
    ) {
        let s = &self.settings;
        let r = s.halo_radius;
        let falloff = (r + 1) as f32;

        for dy in -r..=r {
            for dx in -r..=r {
                if dx == 0 && dy == 0 {
                    continue;
                }
                let dist = ((dx * dx + dy * dy) as f32).sqrt();
                if dist > r as f32 {
                    continue;
                }
                let Some(i) = grid.index(x + dx, y + dy) else {
                    continue;
                };
                if !grid.is_live(i) {
                    continue;
                }

                let base = if grid.region(i) == Region::Outline {
                    s.halo_outline_prob
                } else {
                    s.halo_other_prob
                };
                if rng.random::<f32>() < base * (1.0 - dist / falloff) {
                    let outcome = grid.apply_damage(i, s.halo_damage);
                    report.record(outcome, 0);
                }
            }
        }
    }

    fn run_wave<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridState,
        origin: usize,
        report: &mut ImpactReport,
        rng: &mut R,
    ) -> Result<()> {
        let s = self.settings.clone();
        let (ox, oy) = grid.coords(origin);
        let origin_pt = cell_point(ox, oy);

        self.visit(origin, 0);
        self.push(WaveNode {
            idx: origin,
            force: s.base_damage as f32,
            generation: 0,
        })?;

        while let Some(node) = self.queue.pop() {
            if node.generation >= s.max_depth || node.force < s.min_force {
                continue;
            }

            let (cx, cy) = grid.coords(node.idx);
            let outline_chain =
                grid.region(node.idx) == Region::Outline && !grid.is_broken(node.idx);
            let decay = if outline_chain {
                s.decay_outline
            } else {
                s.tier_decay(grid.toughness(node.idx))
            };
            let next_gen = node.generation + 1;
            let carry = node.force * decay;

            for (dx, dy) in NEIGHBORS {
                let Some(n) = grid.index(cx + dx, cy + dy) else {
                    continue;
                };
                // Broken cells carry the wave; only the disc edge stops it
                if self.visited[n] != 0 || !grid.in_disc(n) {
                    continue;
                }
                // Chains along an intact outline stay on the outline
                if outline_chain && grid.region(n) != Region::Outline {
                    continue;
                }
                self.visit(n, next_gen);

                let diag = if dx != 0 && dy != 0 {
                    s.diagonal_factor
                } else {
                    1.0
                };
                let weak_before = grid.toughness(n) < s.tier_medium;
                let outcome = grid.apply_damage(n, force_to_damage(node.force * diag));
                report.record(outcome, next_gen);

                if grid.is_broken(n) {
                    self.push(WaveNode {
                        idx: n,
                        force: carry,
                        generation: next_gen,
                    })?;
                    continue;
                }

                if weak_before && rng.random::<f32>() < s.continue_chance {
                    self.push(WaveNode {
                        idx: n,
                        force: carry,
                        generation: next_gen,
                    })?;
                }

                if outcome == Damage::Cracked && grid.toughness(n) <= s.branch_threshold {
                    self.try_tunnel(grid, &s, origin_pt, n, carry, next_gen, report, rng)?;
                }
            }
        }

        Ok(())
    }

    /// Jump two cells past a weak spot, favouring directions away from the impact
    #[allow(clippy::too_many_arguments)]
    fn try_tunnel<R: Rng + ?Sized>(
        &mut self,
        grid: &mut GridState,
        s: &CrackSettings,
        origin: Vec2,
        from: usize,
        force: f32,
        generation: u16,
        report: &mut ImpactReport,
        rng: &mut R,
    ) -> Result<()> {
        let tunnel_gen = generation + 1;
        if tunnel_gen > s.max_depth {
            return Ok(());
        }

        let (fx, fy) = grid.coords(from);
        let away = cell_point(fx, fy) - origin;
        let away_len = away.length();
        if away_len == 0.0 {
            return Ok(());
        }

        let mut favorite = None;
        for (dx, dy) in NEIGHBORS {
            let Some(n) = grid.index(fx + dx, fy + dy) else {
                continue;
            };
            if self.visited[n] != 0 || !grid.is_live(n) {
                continue;
            }
            let dir = Vec2::new(dx as f32, dy as f32);
            let cos = dir.dot(away) / (dir.length() * away_len);
            if cos * s.branch_bias > rng.random::<f32>() {
                favorite = Some((dx, dy));
            }
        }

        let Some((dx, dy)) = favorite else {
            return Ok(());
        };
        if rng.random::<f32>() >= s.tunnel_chance {
            return Ok(());
        }

        let damage = force_to_damage(force * s.tunnel_multiplier);
        let mut last = None;
        for step in 1..=2 {
            let Some(n) = grid.index(fx + dx * step, fy + dy * step) else {
                break;
            };
            if self.visited[n] != 0 || !grid.in_disc(n) {
                break;
            }
            self.visit(n, tunnel_gen);
            let outcome = grid.apply_damage(n, damage);
            report.record(outcome, tunnel_gen);
            last = Some(n);
        }

        if let Some(n) = last {
            report.tunnels += 1;
            #[cfg(test)]
            self.tunnel_trace.push(TunnelTrace {
                origin,
                from: (fx, fy),
                dir: (dx, dy),
                generation: tunnel_gen,
            });
            self.push(WaveNode {
                idx: n,
                force,
                generation: tunnel_gen,
            })?;
        }
        Ok(())
    }

    #[inline]
    fn visit(&mut self, idx: usize, generation: u16) {
        self.visited[idx] = generation + 1;
        self.touched.push(idx);
    }

    fn push(&mut self, node: WaveNode) -> Result<()> {
        let before = self.queue.capacity();
        self.queue.push(node).map_err(|source| SimError::QueueGrowth {
            capacity: before,
            source,
        })?;
        let after = self.queue.capacity();
        if after != before {
            if after >= QUEUE_WARN_CAPACITY {
                log::warn!("Crack queue grew to {} entries", after);
            } else {
                log::debug!("Crack queue grew to {} entries", after);
            }
        }
        Ok(())
    }

    /// Zero only the entries this wave touched
    fn reset_visited(&mut self) {
        for &idx in &self.touched {
            self.visited[idx] = 0;
        }
        self.touched.clear();
    }

    #[cfg(test)]
    fn scratch_is_clean(&self) -> bool {
        self.touched.is_empty() && self.visited.iter().all(|&v| v == 0) && self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{GridSettings, NoiseSettings};
    use crate::sim::grid::tests::{build, small_settings};
    use crate::sim::shapes::Silhouette;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn snapshot(grid: &GridState) -> Vec<(i32, u16, bool)> {
        (0..grid.cell_count())
            .map(|i| (grid.toughness(i), grid.crack(i), grid.is_broken(i)))
            .collect()
    }

    fn assert_invariants(grid: &GridState, initial: &GridState) {
        for i in 0..grid.cell_count() {
            if grid.is_broken(i) {
                assert_eq!(grid.toughness(i), 0);
            }
            assert!(grid.toughness(i) <= grid.toughness_max(i));
            assert!(grid.crack(i) >= initial.crack(i));
            if initial.is_broken(i) {
                assert!(grid.is_broken(i));
            }
            if !grid.in_disc(i) {
                assert_eq!(grid.toughness(i), initial.toughness(i));
                assert_eq!(grid.crack(i), initial.crack(i));
                assert!(!grid.is_broken(i));
                assert!(!grid.dirty().contains(i));
            }
        }
        let stats = grid.stats();
        assert_eq!(stats, grid.recount());
        assert!(stats.broken_outline <= stats.total_outline);
        assert!(stats.broken_inside <= stats.total_inside);
    }

    #[test]
    fn test_rejected_impacts_change_nothing() {
        let settings = small_settings();
        let mut grid = build(&settings, Silhouette::Star, 21);
        let mut engine = CrackEngine::new(CrackSettings::default(), grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(21);

        // Break a cell first so there is something in the dirty set
        let report = engine.apply_impact(&mut grid, 60, 60, &mut rng).unwrap();
        assert!(report.cells_damaged > 0);
        let broken = (0..grid.cell_count()).find(|&i| grid.is_broken(i)).unwrap();
        let (bx, by) = grid.coords(broken);

        let before = snapshot(&grid);
        let dirty_before = grid.dirty().indices().to_vec();
        let stats_before = grid.stats();

        for (x, y, reason) in [
            (-1, 5, RejectReason::OutOfBounds),
            (5, 120, RejectReason::OutOfBounds),
            (0, 0, RejectReason::OutsideDisc),
            (bx, by, RejectReason::AlreadyBroken),
        ] {
            let err = engine.apply_impact(&mut grid, x, y, &mut rng).unwrap_err();
            assert_eq!(err.reject_reason(), Some(reason));
        }

        assert_eq!(snapshot(&grid), before);
        assert_eq!(grid.dirty().indices(), &dirty_before[..]);
        assert_eq!(grid.stats(), stats_before);
    }

    #[test]
    fn test_same_seed_same_dirty_set() {
        let settings = GridSettings {
            noise: NoiseSettings {
                amplitude: 0.0,
                base: 50.0,
                ..NoiseSettings::default()
            },
            ..GridSettings::default()
        };
        let run = || {
            let mut grid = build(&settings, Silhouette::Circle, 77);
            let origin = grid.index(300, 300).unwrap();
            assert_eq!(grid.region(origin), Region::Inside);
            assert_eq!(grid.toughness_max(origin), 50);
            let mut engine = CrackEngine::new(CrackSettings::default(), grid.cell_count());
            let mut rng = Pcg32::seed_from_u64(1234);
            let report = engine.apply_impact(&mut grid, 300, 300, &mut rng).unwrap();
            (grid.dirty().indices().to_vec(), grid.stats(), report)
        };
        let (dirty_a, stats_a, report_a) = run();
        let (dirty_b, stats_b, report_b) = run();
        assert!(!dirty_a.is_empty());
        assert_eq!(dirty_a, dirty_b);
        assert_eq!(stats_a, stats_b);
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn test_direct_hit_damages_impact_cell() {
        let settings = small_settings();
        let mut grid = build(&settings, Silhouette::Circle, 8);
        let mut engine = CrackEngine::new(CrackSettings::default(), grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(8);

        let i = grid.index(60, 60).unwrap();
        let t0 = grid.toughness(i);
        engine.apply_impact(&mut grid, 60, 60, &mut rng).unwrap();
        let base = engine.settings().base_damage;
        assert!(grid.is_broken(i) || grid.toughness(i) <= t0 - base);
        assert!(grid.dirty().contains(i));
    }

    #[test]
    fn test_wave_respects_depth_and_scratch_is_reset() {
        let settings = small_settings();
        let crack = CrackSettings {
            max_depth: 4,
            halo_radius: 2,
            ..CrackSettings::default()
        };
        let mut grid = build(&settings, Silhouette::Heart, 13);
        let mut engine = CrackEngine::new(crack.clone(), grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(13);

        let report = engine.apply_impact(&mut grid, 60, 64, &mut rng).unwrap();
        assert!(report.deepest_generation <= crack.max_depth);
        assert!(engine.scratch_is_clean());

        let reach = (2 * crack.max_depth as i32).max(crack.halo_radius);
        for &i in grid.dirty().indices() {
            let (x, y) = grid.coords(i);
            assert!((x - 60).abs() <= reach && (y - 64).abs() <= reach, "({x}, {y})");
        }
    }

    #[test]
    fn test_outline_chain_stays_on_outline() {
        let settings = small_settings();
        let crack = CrackSettings {
            base_damage: 3,
            halo_radius: 0,
            continue_chance: 1.0,
            branch_threshold: 0,
            ..CrackSettings::default()
        };
        let mut grid = build(&settings, Silhouette::Circle, 4);
        let start = grid.index(60, 31).unwrap();
        assert_eq!(grid.region(start), Region::Outline);

        let mut engine = CrackEngine::new(crack, grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(4);
        let report = engine.apply_impact(&mut grid, 60, 31, &mut rng).unwrap();

        assert_eq!(report.cells_broken, 0);
        assert!(grid.dirty().len() > 5);
        for &i in grid.dirty().indices() {
            assert_eq!(grid.region(i), Region::Outline);
        }
    }

    #[test]
    fn test_weak_cracks_tunnel() {
        let settings = small_settings();
        let crack = CrackSettings {
            base_damage: 10,
            halo_radius: 0,
            branch_threshold: 1000,
            branch_bias: 1.0,
            tunnel_chance: 1.0,
            ..CrackSettings::default()
        };
        let mut grid = build(&settings, Silhouette::Circle, 6);
        let mut engine = CrackEngine::new(crack, grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(6);
        let report = engine.apply_impact(&mut grid, 60, 60, &mut rng).unwrap();
        assert!(report.tunnels > 0);
        assert_eq!(engine.tunnel_trace.len(), report.tunnels as usize);
        assert!(engine.scratch_is_clean());
    }

    #[test]
    fn test_tunnels_point_away_from_impact() {
        let settings = small_settings();
        let crack = CrackSettings {
            base_damage: 10,
            halo_radius: 0,
            max_depth: 12,
            branch_threshold: 1000,
            branch_bias: 1.0,
            tunnel_chance: 1.0,
            ..CrackSettings::default()
        };
        let mut engine = CrackEngine::new(crack.clone(), settings.size * settings.size);

        for seed in 0..8 {
            let mut grid = build(&settings, Silhouette::Circle, seed);
            let mut rng = Pcg32::seed_from_u64(seed);
            for (x, y) in [(60, 60), (45, 70), (72, 52)] {
                if let Err(e) = engine.apply_impact(&mut grid, x, y, &mut rng) {
                    assert!(e.is_rejection());
                }
            }
        }

        assert!(!engine.tunnel_trace.is_empty());
        for t in &engine.tunnel_trace {
            let away = Vec2::new(t.from.0 as f32, t.from.1 as f32) - t.origin;
            let dir = Vec2::new(t.dir.0 as f32, t.dir.1 as f32);
            assert!(dir.dot(away) > 0.0, "{t:?} tunnels toward the impact");
            assert!(t.generation <= crack.max_depth, "{t:?}");
        }
    }

    #[test]
    fn test_wave_crosses_broken_ring() {
        let settings = small_settings();
        let crack = CrackSettings {
            halo_radius: 0,
            ..CrackSettings::default()
        };

        for seed in 0..10 {
            let mut grid = build(&settings, Silhouette::Circle, seed);
            for (dx, dy) in NEIGHBORS {
                let i = grid.index(60 + dx, 60 + dy).unwrap();
                grid.apply_damage(i, 10_000);
                assert!(grid.is_broken(i));
            }
            grid.clear_dirty();

            let mut engine = CrackEngine::new(crack.clone(), grid.cell_count());
            let mut rng = Pcg32::seed_from_u64(seed);
            let report = engine.apply_impact(&mut grid, 60, 60, &mut rng).unwrap();

            let beyond = grid
                .dirty()
                .indices()
                .iter()
                .filter(|&&i| {
                    let (x, y) = grid.coords(i);
                    (x - 60).abs().max((y - 60).abs()) >= 2
                })
                .count();
            assert!(beyond > 0, "seed {seed}: {report:?}");
            assert!(report.deepest_generation >= 2);
        }
    }

    #[test]
    fn test_repeated_impacts_hold_invariants() {
        let settings = small_settings();
        let initial = build(&settings, Silhouette::Star, 99);
        let mut grid = initial.clone();
        let mut engine = CrackEngine::new(CrackSettings::default(), grid.cell_count());
        let mut rng = Pcg32::seed_from_u64(99);

        let mut applied = 0;
        for y in (10..110).step_by(9) {
            for x in (10..110).step_by(7) {
                match engine.apply_impact(&mut grid, x, y, &mut rng) {
                    Ok(_) => applied += 1,
                    Err(e) => assert!(e.is_rejection()),
                }
            }
        }
        assert!(applied > 10);
        assert!(engine.scratch_is_clean());
        assert_invariants(&grid, &initial);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn prop_random_impacts_keep_invariants(
            seed in any::<u64>(),
            hits in proptest::collection::vec((-10i32..130, -10i32..130), 1..12),
        ) {
            let settings = small_settings();
            let initial = build(&settings, Silhouette::Umbrella, seed);
            let mut grid = initial.clone();
            let mut engine = CrackEngine::new(CrackSettings::default(), grid.cell_count());
            let mut rng = Pcg32::seed_from_u64(seed);

            for (x, y) in hits {
                let before = grid.stats();
                match engine.apply_impact(&mut grid, x, y, &mut rng) {
                    Ok(report) => {
                        let after = grid.stats();
                        prop_assert_eq!(after.broken_outline - before.broken_outline, report.outline_broken);
                        prop_assert_eq!(after.broken_inside - before.broken_inside, report.inside_broken);
                        prop_assert!(report.deepest_generation <= engine.settings().max_depth);
                    }
                    Err(e) => {
                        prop_assert!(e.is_rejection());
                        prop_assert_eq!(grid.stats(), before);
                    }
                }
            }
            assert_invariants(&grid, &initial);
        }
    }
}
