//! Session ownership and win/lose rules
//!
//! A [`Session`] owns everything one game needs: settings, the silhouette
//! cache, the toughness field, the grid, the crack engine and the RNG. No
//! simulation state lives outside it.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::crack::{CrackEngine, ImpactReport};
use super::grid::{GridState, Stats};
use super::noise::{FieldSpec, ToughnessField};
use super::sdf::ShapeCache;
use super::shapes::Silhouette;
use crate::error::{RejectReason, Result, SimError};
use crate::settings::{RuleSettings, Settings};

/// Why a round was lost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoseReason {
    /// Too much of the interior broke
    Shattered,
    /// The timer layer ran out the clock
    TimeUp,
}

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Menu preview; silhouette may still change
    Preview,
    /// Accepting impacts
    Playing,
    Won,
    Lost(LoseReason),
}

impl SessionPhase {
    pub fn is_over(&self) -> bool {
        matches!(self, SessionPhase::Won | SessionPhase::Lost(_))
    }
}

/// Play/win/lose state machine driven by aggregate statistics
#[derive(Debug, Clone)]
pub struct SessionController {
    rules: RuleSettings,
    phase: SessionPhase,
}

impl SessionController {
    pub fn new(rules: RuleSettings) -> Self {
        Self {
            rules,
            phase: SessionPhase::Preview,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn rules(&self) -> &RuleSettings {
        &self.rules
    }

    pub fn preview(&mut self) {
        self.phase = SessionPhase::Preview;
    }

    pub fn start(&mut self) {
        self.phase = SessionPhase::Playing;
    }

    /// End a running round on timeout
    pub fn time_up(&mut self) -> SessionPhase {
        if self.phase == SessionPhase::Playing {
            self.phase = SessionPhase::Lost(LoseReason::TimeUp);
            log::info!("Time up");
        }
        self.phase
    }

    /// Check end conditions after an impact; losing takes precedence
    pub fn evaluate(&mut self, stats: &Stats) -> SessionPhase {
        if self.phase != SessionPhase::Playing {
            return self.phase;
        }

        let lose_limit = stats.total_inside as f64 * self.rules.lose_inside_ratio as f64;
        let win_target = stats.total_outline as f64 * self.rules.win_outline_ratio as f64;

        if stats.broken_inside as f64 > lose_limit {
            self.phase = SessionPhase::Lost(LoseReason::Shattered);
            log::info!(
                "Candy shattered: {}/{} inside cells broken",
                stats.broken_inside,
                stats.total_inside
            );
        } else if stats.total_outline > 0 && stats.broken_outline as f64 >= win_target {
            self.phase = SessionPhase::Won;
            log::info!(
                "Shape cleared: {}/{} outline cells broken",
                stats.broken_outline,
                stats.total_outline
            );
        }
        self.phase
    }
}

/// One game session
#[derive(Debug, Clone)]
pub struct Session {
    settings: Settings,
    shape: ShapeCache,
    field: ToughnessField,
    grid: GridState,
    engine: CrackEngine,
    controller: SessionController,
    rng: Pcg32,
    seed: u64,
    impacts: u32,
}

impl Session {
    /// Build a session in the preview phase with a classified grid
    pub fn new(settings: Settings, silhouette: Silhouette, seed: u64) -> Result<Self> {
        settings.validate()?;

        let mut rng = Pcg32::seed_from_u64(seed);
        let mut shape = ShapeCache::new(silhouette);
        let (field, grid) = classify(&settings, &mut shape, &mut rng)?;
        let engine = CrackEngine::new(settings.crack.clone(), grid.cell_count());
        let controller = SessionController::new(settings.rules.clone());

        log::info!(
            "Session created: shape={}, seed={}, grid={}",
            shape.silhouette().as_str(),
            seed,
            settings.grid.size
        );

        Ok(Self {
            settings,
            shape,
            field,
            grid,
            engine,
            controller,
            rng,
            seed,
            impacts: 0,
        })
    }

    /// Session seeded from OS entropy; not reproducible
    pub fn from_entropy(settings: Settings, silhouette: Silhouette) -> Result<Self> {
        Self::new(settings, silhouette, rand::random())
    }

    /// Switch silhouettes; discards the grid and returns to preview
    ///
    /// On error the session keeps its previous silhouette and grid.
    pub fn set_silhouette(&mut self, silhouette: Silhouette) -> Result<()> {
        let mut shape = ShapeCache::new(silhouette);
        let mut rng = self.rng.clone();
        let (field, grid) = classify(&self.settings, &mut shape, &mut rng)?;

        self.shape = shape;
        self.rng = rng;
        self.install(field, grid);
        self.controller.preview();
        Ok(())
    }

    /// Start (or restart) a round on a freshly classified grid
    pub fn start(&mut self) -> Result<()> {
        let (field, grid) = classify(&self.settings, &mut self.shape, &mut self.rng)?;
        self.install(field, grid);
        self.controller.start();
        log::info!("Round started: shape={}", self.shape.silhouette().as_str());
        Ok(())
    }

    /// Play again after a win or loss
    pub fn restart(&mut self) -> Result<()> {
        log::info!("Restarting after {:?}", self.phase());
        self.start()
    }

    /// Apply an impact and re-evaluate win/lose
    pub fn impact(&mut self, x: i32, y: i32) -> Result<ImpactReport> {
        if self.controller.phase() != SessionPhase::Playing {
            return Err(SimError::ImpactRejected {
                x,
                y,
                reason: RejectReason::NotPlaying,
            });
        }

        let report = self
            .engine
            .apply_impact(&mut self.grid, x, y, &mut self.rng)?;
        self.impacts += 1;
        self.controller.evaluate(&self.grid.stats());
        Ok(report)
    }

    /// Timer expiry from the (external) timer layer
    pub fn time_up(&mut self) -> SessionPhase {
        self.controller.time_up()
    }

    pub fn phase(&self) -> SessionPhase {
        self.controller.phase()
    }

    pub fn grid(&self) -> &GridState {
        &self.grid
    }

    pub fn stats(&self) -> Stats {
        self.grid.stats()
    }

    /// Renderer acknowledgement that dirty cells were redrawn
    pub fn clear_dirty(&mut self) {
        self.grid.clear_dirty();
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn silhouette(&self) -> &Silhouette {
        self.shape.silhouette()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Seed and parameters of the current toughness field
    pub fn field_spec(&self) -> FieldSpec {
        self.field.spec()
    }

    /// Impacts accepted since the session was created
    pub fn impacts(&self) -> u32 {
        self.impacts
    }

    /// Random in-disc, unbroken cell; used by demo drivers
    pub fn random_live_cell(&mut self) -> Option<(i32, i32)> {
        let center = self.grid.center();
        let radius = self.grid.disc_radius();
        for _ in 0..64 {
            let x = (center.x + self.rng.random_range(-radius..=radius)).round() as i32;
            let y = (center.y + self.rng.random_range(-radius..=radius)).round() as i32;
            if let Some(i) = self.grid.index(x, y) {
                if self.grid.is_live(i) {
                    return Some((x, y));
                }
            }
        }
        None
    }

    fn install(&mut self, field: ToughnessField, grid: GridState) {
        self.engine = CrackEngine::new(self.settings.crack.clone(), grid.cell_count());
        self.field = field;
        self.grid = grid;
    }
}

/// Draw a fresh field seed and classify the grid for the active silhouette
fn classify<R: Rng + ?Sized>(
    settings: &Settings,
    shape: &mut ShapeCache,
    rng: &mut R,
) -> Result<(ToughnessField, GridState)> {
    let field = ToughnessField::new(rng.random(), settings.grid.noise.clone());
    let mask = shape.mask(&settings.grid)?;
    let grid = GridState::classify(&settings.grid, mask, &field, rng)?;
    Ok((field, grid))
}
