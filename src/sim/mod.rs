//! Deterministic simulation module
//!
//! All candy-cracking logic lives here. This module must be pure and
//! deterministic:
//! - Seeded RNG only
//! - Stable iteration order (row-major cells, FIFO waves)
//! - No rendering, input or timer dependencies

pub mod crack;
pub mod grid;
pub mod noise;
pub mod queue;
pub mod sdf;
pub mod session;
pub mod shapes;

pub use crack::{CrackEngine, ImpactReport};
pub use grid::{CellView, Damage, DirtySet, GridState, Region, Stats};
pub use noise::{FieldSpec, ToughnessField};
pub use queue::RingQueue;
pub use sdf::{ShapeCache, ShapeMask, sd_circle, sd_polygon};
pub use session::{LoseReason, Session, SessionController, SessionPhase};
pub use shapes::Silhouette;
