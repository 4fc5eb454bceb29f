//! Simulation building blocks
//!
//! Pools, broad-phase grid, collision primitives, tweens, the state store and
//! particles. Nothing here reads the wall clock:
//! - Time only advances through `update(dt_ms)` calls
//! - Randomness only comes from seeded RNGs
//! - Iteration follows insertion/acquisition order

pub mod collision;
pub mod grid;
pub mod particles;
pub mod pool;
pub mod store;
pub mod tween;

pub use collision::{Aabb, OrientedBox};
pub use grid::SpatialGrid;
pub use particles::{EffectPreset, Particle, ParticleKind, ParticleStats, ParticleSystem};
pub use pool::{Pool, PoolHandle, PoolStats, Poolable};
pub use store::{ListenerId, StateStore};
pub use tween::{Easing, TweenId, TweenSystem};
