//! Liquid/Gas transitions with hysteresis.
//!
//! Evaporation and condensation use different criteria, and every particle
//! keeps its state for at least the dwell window granted at its last
//! transition.

use crate::particle::{Particle, PhaseState};
use crate::scenario::ScenarioParameters;
use crate::tuning::{
    piecewise_affine, BULK_THERMAL_THRESHOLD, ESCAPE_MULTIPLIER, SURFACE_MULTIPLIER,
    SURFACE_THERMAL_THRESHOLD,
};
use crate::world::Container;
use rand::Rng;

/// Reference gas speed (px/s); every kinetic criterion is a multiple of its square.
pub const V_GAS: f64 = 60.0;
pub const MIN_DWELL_MS: f64 = 300.0;
/// Particles hotter than this at a transition get half the dwell.
pub const HOT_DWELL_TE: f64 = 0.7;
/// Fewer neighbours than this marks a surface particle.
pub const SURFACE_NEIGHBOR_LIMIT: u32 = 3;
pub const MAX_THERMAL_BONUS: f64 = 0.5;
pub const HOT_THERMAL_BONUS: f64 = 0.2;
pub const EVAPORATION_BOOST: f64 = 90.0;
pub const EVAPORATION_BOOST_DAMPING: f64 = 0.5;
/// The boost is skipped for particles already rising faster than this.
pub const EVAPORATION_BOOST_MAX_RISE: f64 = 50.0;
pub const GAS_HOLD_MS: f64 = 1500.0;
pub const GAS_HOLD_JITTER_MS: f64 = 500.0;
pub const RISING_SPEED: f64 = 5.0;
pub const DENSE_NEIGHBOR_COUNT: u32 = 4;

/// Viscosity-dependent evaporation thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseThresholds {
    pub surface_multiplier: f64,
    pub surface_thermal: f64,
    pub escape_multiplier: f64,
    pub bulk_thermal: f64,
}

impl PhaseThresholds {
    pub fn for_viscosity(viscosity: f64) -> Self {
        PhaseThresholds {
            surface_multiplier: piecewise_affine(SURFACE_MULTIPLIER, viscosity),
            surface_thermal: piecewise_affine(SURFACE_THERMAL_THRESHOLD, viscosity),
            escape_multiplier: piecewise_affine(ESCAPE_MULTIPLIER, viscosity),
            bulk_thermal: piecewise_affine(BULK_THERMAL_THRESHOLD, viscosity),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub from: PhaseState,
    pub to: PhaseState,
    /// Dwell window granted from this transition on.
    pub dwell_ms: f64,
}

#[derive(Debug, Clone)]
pub struct PhaseStateMachine {
    pub thresholds: PhaseThresholds,
    imf_strength: f64,
    height: f64,
}

/// Fraction of the kinetic requirement waived for hot bulk particles.
pub fn thermal_bonus(te: f64) -> f64 {
    let mut bonus = (MAX_THERMAL_BONUS * te).min(MAX_THERMAL_BONUS);
    if te > HOT_DWELL_TE {
        bonus += HOT_THERMAL_BONUS;
    }
    bonus
}

pub fn dwell_for(te: f64) -> f64 {
    if te > HOT_DWELL_TE {
        0.5 * MIN_DWELL_MS
    } else {
        MIN_DWELL_MS
    }
}

impl PhaseStateMachine {
    pub fn new(container: &Container, params: &ScenarioParameters) -> Self {
        PhaseStateMachine {
            thresholds: PhaseThresholds::for_viscosity(params.viscosity),
            imf_strength: params.imf_strength(),
            height: container.height,
        }
    }

    pub fn should_evaporate(&self, p: &Particle) -> bool {
        let v2 = p.speed_squared();
        let te = p.thermal_energy;
        let t = &self.thresholds;
        if p.local_neighbor_count < SURFACE_NEIGHBOR_LIMIT {
            v2 > V_GAS * V_GAS * t.surface_multiplier && te > t.surface_thermal
        } else {
            v2 > V_GAS * V_GAS * t.escape_multiplier * (1.0 - thermal_bonus(te)) && te > t.bulk_thermal
        }
    }

    pub fn should_condense(&self, p: &Particle) -> bool {
        let v2 = p.speed_squared();
        let te = p.thermal_energy;
        let rising = p.upward_speed() > RISING_SPEED;
        let vg2 = V_GAS * V_GAS;

        let slow_and_cool = v2 < 0.25 * vg2 && te < 0.15 && !rising;
        let cooled_near_top = p.position.y < 0.15 * self.height && te < 0.1 && v2 < 0.6 * vg2;
        let crowded = p.local_neighbor_count >= DENSE_NEIGHBOR_COUNT && !rising && te < 0.3;
        slow_and_cool || cooled_near_top || crowded
    }

    /// Evaluate one particle at simulated time `now_ms`, mutating it in place
    /// when it changes state.
    pub fn update<R: Rng + ?Sized>(
        &self,
        p: &mut Particle,
        now_ms: f64,
        rng: &mut R,
    ) -> Option<Transition> {
        if now_ms - p.last_state_change_ms < p.dwell_ms {
            return None;
        }

        let from = p.state;
        match from {
            PhaseState::Liquid if self.should_evaporate(p) => {
                p.state = PhaseState::Gas;
                p.gas_until_ms = now_ms + GAS_HOLD_MS + rng.gen_range(0.0..GAS_HOLD_JITTER_MS);
                if p.upward_speed() < EVAPORATION_BOOST_MAX_RISE {
                    p.velocity.y -=
                        EVAPORATION_BOOST * (1.0 - EVAPORATION_BOOST_DAMPING * self.imf_strength);
                }
            }
            PhaseState::Gas if self.should_condense(p) => {
                p.state = PhaseState::Liquid;
                if p.position.y >= 0.1 * self.height {
                    p.thermal_energy *= 0.5;
                }
            }
            _ => return None,
        }

        let dwell_ms = dwell_for(p.thermal_energy);
        p.last_state_change_ms = now_ms;
        p.dwell_ms = dwell_ms;
        Some(Transition { from, to: p.state, dwell_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particle::ParticleId;
    use crate::scenario::Material;
    use approx::assert_relative_eq;
    use nalgebra::Vector2;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn machine(m: Material) -> PhaseStateMachine {
        PhaseStateMachine::new(&Container::default(), &m.parameters())
    }

    fn particle(y: f64, vx: f64, vy: f64, te: f64, neighbors: u32) -> Particle {
        let id = ParticleId { slot: 0, generation: 0 };
        let mut p = Particle::new(id, Vector2::new(100.0, y), Vector2::new(vx, vy));
        p.thermal_energy = te;
        p.local_neighbor_count = neighbors;
        p
    }

    #[test]
    fn test_thresholds_follow_tables() {
        let t = PhaseThresholds::for_viscosity(0.3);
        assert_relative_eq!(t.surface_multiplier, 0.35);
        assert_relative_eq!(t.bulk_thermal, 0.30);
        let t = PhaseThresholds::for_viscosity(2.0);
        assert_relative_eq!(t.escape_multiplier, 4.0);
        assert_relative_eq!(t.surface_thermal, 0.75);
    }

    #[test]
    fn test_thermal_bonus() {
        assert_relative_eq!(thermal_bonus(0.0), 0.0);
        assert_relative_eq!(thermal_bonus(0.6), 0.3);
        assert_relative_eq!(thermal_bonus(0.8), 0.6);
        assert_relative_eq!(thermal_bonus(1.0), 0.7);
    }

    #[test]
    fn test_surface_particle_evaporates_more_easily_for_hexane() {
        // 40 px/s, warm, sparse
        let p = particle(200.0, 40.0, 0.0, 0.5, 1);
        assert!(machine(Material::Hexane).should_evaporate(&p));
        assert!(!machine(Material::Honey).should_evaporate(&p));
    }

    #[test]
    fn test_bulk_particle_needs_heat() {
        let m = machine(Material::Hexane);
        let cold = particle(200.0, 60.0, 0.0, 0.1, 6);
        assert!(!m.should_evaporate(&cold));
        let hot = particle(200.0, 60.0, 0.0, 0.8, 6);
        assert!(m.should_evaporate(&hot));
    }

    #[test]
    fn test_evaporation_sets_timers_and_boost() {
        let m = machine(Material::Hexane);
        let mut rng = StdRng::seed_from_u64(1);
        let mut p = particle(200.0, 40.0, 0.0, 0.5, 1);
        let t = m.update(&mut p, 1000.0, &mut rng).unwrap();

        assert_eq!(t.from, PhaseState::Liquid);
        assert_eq!(t.to, PhaseState::Gas);
        assert_eq!(t.dwell_ms, MIN_DWELL_MS);
        assert_eq!(p.last_state_change_ms, 1000.0);
        assert!(p.gas_until_ms >= 2500.0 && p.gas_until_ms < 3000.0);
        // hexane sits at imf strength 0, so the full boost applies
        assert_relative_eq!(p.velocity.y, -90.0);
    }

    #[test]
    fn test_dwell_window_blocks_transitions() {
        let m = machine(Material::Hexane);
        let mut rng = StdRng::seed_from_u64(2);
        let mut p = particle(200.0, 40.0, 0.0, 0.5, 1);
        m.update(&mut p, 0.0, &mut rng).unwrap();

        // now cold, slow and crowded: condensation is due but the dwell holds
        p.velocity = Vector2::zeros();
        p.thermal_energy = 0.05;
        p.local_neighbor_count = 5;
        assert!(m.update(&mut p, 299.0, &mut rng).is_none());
        let t = m.update(&mut p, 300.0, &mut rng).unwrap();
        assert_eq!(t.to, PhaseState::Liquid);
    }

    #[test]
    fn test_hot_transition_halves_dwell() {
        let m = machine(Material::Hexane);
        let mut rng = StdRng::seed_from_u64(3);
        let mut p = particle(200.0, 40.0, 0.0, 0.9, 1);
        let t = m.update(&mut p, 0.0, &mut rng).unwrap();
        assert_eq!(t.dwell_ms, 150.0);
        assert_eq!(p.dwell_ms, 150.0);
    }

    #[test]
    fn test_condensation_halves_energy_below_top_band() {
        let m = machine(Material::Water);
        let mut rng = StdRng::seed_from_u64(4);

        let mut p = particle(200.0, 0.0, 0.0, 0.2, 5);
        p.state = PhaseState::Gas;
        assert!(m.update(&mut p, 0.0, &mut rng).is_some());
        assert_relative_eq!(p.thermal_energy, 0.1);

        // within the top 10% the energy is kept
        let mut p = particle(20.0, 0.0, 0.0, 0.05, 0);
        p.state = PhaseState::Gas;
        assert!(m.update(&mut p, 0.0, &mut rng).is_some());
        assert_relative_eq!(p.thermal_energy, 0.05);
    }

    #[test]
    fn test_rising_gas_stays_gas() {
        let m = machine(Material::Water);
        let mut p = particle(200.0, 0.0, -20.0, 0.1, 5);
        p.state = PhaseState::Gas;
        assert!(!m.should_condense(&p));
    }
}
