use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Fixed particle radius in pixels.
pub const PARTICLE_RADIUS: f64 = 4.0;
/// Every particle has unit mass.
pub const PARTICLE_MASS: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseState {
    Liquid,
    Gas,
}

/// Generation-checked handle into a [`crate::arena::ParticleArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticleId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl ParticleId {
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Particle {
    pub id: ParticleId,
    pub position: Vector2<f64>,
    pub velocity: Vector2<f64>,
    /// Accumulator, rebuilt every sub-step.
    pub acceleration: Vector2<f64>,
    pub radius: f64,
    pub mass: f64,
    pub state: PhaseState,
    /// Always within [0, 1].
    pub thermal_energy: f64,
    pub last_state_change_ms: f64,
    /// Minimum dwell granted at the last transition.
    pub dwell_ms: f64,
    /// Advisory only, never enforced.
    pub gas_until_ms: f64,
    pub local_neighbor_count: u32,
    /// Set once the one-off heating boost fired; re-armed when the particle cools.
    pub heat_boosted: bool,
}

impl Particle {
    pub fn new(id: ParticleId, position: Vector2<f64>, velocity: Vector2<f64>) -> Self {
        Particle {
            id,
            position,
            velocity,
            acceleration: Vector2::zeros(),
            radius: PARTICLE_RADIUS,
            mass: PARTICLE_MASS,
            state: PhaseState::Liquid,
            thermal_energy: 0.0,
            last_state_change_ms: 0.0,
            dwell_ms: 0.0,
            gas_until_ms: 0.0,
            local_neighbor_count: 0,
            heat_boosted: false,
        }
    }

    #[inline]
    pub fn inv_mass(&self) -> f64 {
        1.0 / self.mass
    }

    #[inline]
    pub fn speed_squared(&self) -> f64 {
        self.velocity.norm_squared()
    }

    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.mass * self.velocity.norm_squared()
    }

    /// Upward is -y.
    #[inline]
    pub fn upward_speed(&self) -> f64 {
        -self.velocity.y
    }

    pub fn add_thermal_energy(&mut self, delta: f64) {
        self.thermal_energy = (self.thermal_energy + delta).clamp(0.0, 1.0);
    }

    pub fn is_gas(&self) -> bool {
        self.state == PhaseState::Gas
    }

    pub fn snapshot(&self) -> ParticleSnapshot {
        ParticleSnapshot {
            id: self.id,
            position: [self.position.x, self.position.y],
            velocity: [self.velocity.x, self.velocity.y],
            state: self.state,
            thermal_energy: self.thermal_energy,
            radius: self.radius,
        }
    }
}

/// Read-only view handed to renderers and debug tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleSnapshot {
    pub id: ParticleId,
    pub position: [f64; 2],
    pub velocity: [f64; 2],
    pub state: PhaseState,
    pub thermal_energy: f64,
    pub radius: f64,
}
