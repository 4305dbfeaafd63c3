pub mod arena;
pub mod collision;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod forces;
pub mod integrator;
pub mod particle;
pub mod phase;
pub mod scenario;
pub mod spatial;
pub mod thermal;
pub mod tuning;
pub mod walls;
pub mod world;

pub use config::TrialConfig;
pub use engine::{EscapedParticle, HistorySample, SimulationEngine};
pub use error::{PhysicsError, Result};
pub use events::{StateChange, TrialObserver, TrialSummary};
pub use forces::{ForceModel, ForceProvider};
pub use integrator::Integrator;
pub use particle::{Particle, ParticleId, ParticleSnapshot, PhaseState};
pub use scenario::{Material, ScenarioParameters};
pub use world::Container;
