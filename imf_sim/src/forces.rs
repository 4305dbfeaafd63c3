use crate::particle::{Particle, PhaseState};
use crate::scenario::ScenarioParameters;
use crate::spatial::SpatialIndex;
use nalgebra::Vector2;

/// Hard limit on every pair force magnitude.
pub const FORCE_LIMIT: f64 = 60.0;
/// Added to distances before dividing.
pub const DISTANCE_EPSILON: f64 = 1e-9;

pub const LJ_CUTOFF_SIGMA: f64 = 2.5;
pub const LJ_WEAK_CUTOFF_SIGMA: f64 = 2.0;
/// Below this ε the shorter dispersion cutoff applies.
pub const LJ_WEAK_EPSILON: f64 = 0.1;
pub const HB_CUTOFF_SIGMA: f64 = 2.8;
pub const HB_EXPONENT: f64 = 0.7;
pub const DIPOLE_CUTOFF_SIGMA: f64 = 2.2;
pub const DENSITY_CUTOFF_SIGMA: f64 = 2.4;

pub const GAS_PAIR_SCALE: f64 = 0.2;
pub const LIQUID_PAIR_BOOST: f64 = 1.3;

/// A central pair law. Positive magnitudes push the pair apart.
pub trait PairForce {
    fn cutoff(&self) -> f64;

    fn magnitude(&self, r: f64) -> f64;
}

/// Something able to turn the current particle set into per-particle
/// accelerations.
pub trait ForceProvider {
    fn compute_forces(&self, particles: &[Particle], index: &SpatialIndex) -> ForcePass;
}

/// Output of one neighbour pass.
#[derive(Debug, Clone, Default)]
pub struct ForcePass {
    pub accelerations: Vec<Vector2<f64>>,
    pub neighbor_counts: Vec<u32>,
}

#[derive(Debug, Clone, Copy)]
pub struct LennardJones {
    pub epsilon: f64,
    pub sigma: f64,
}

impl LennardJones {
    pub fn new(epsilon: f64, sigma: f64) -> Self {
        LennardJones { epsilon, sigma }
    }
}

impl PairForce for LennardJones {
    fn cutoff(&self) -> f64 {
        if self.epsilon < LJ_WEAK_EPSILON {
            LJ_WEAK_CUTOFF_SIGMA * self.sigma
        } else {
            LJ_CUTOFF_SIGMA * self.sigma
        }
    }

    fn magnitude(&self, r: f64) -> f64 {
        if r >= self.cutoff() {
            return 0.0;
        }
        let r = r + DISTANCE_EPSILON;
        let sr = self.sigma / r;
        let sr6 = sr.powi(6);
        let f = 24.0 * self.epsilon * (2.0 * sr6 * sr6 - sr6) / r;
        f.clamp(-FORCE_LIMIT, FORCE_LIMIT)
    }
}

/// Longer-range attraction standing in for hydrogen bonding.
#[derive(Debug, Clone, Copy)]
pub struct HydrogenBond {
    pub strength: f64,
    pub sigma: f64,
}

impl PairForce for HydrogenBond {
    fn cutoff(&self) -> f64 {
        HB_CUTOFF_SIGMA * self.sigma
    }

    fn magnitude(&self, r: f64) -> f64 {
        let r_cut = self.cutoff();
        if self.strength <= 0.0 || r >= r_cut {
            return 0.0;
        }
        -self.strength * (1.0 - r / r_cut).powf(HB_EXPONENT)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DipoleDipole {
    pub strength: f64,
    pub sigma: f64,
}

impl PairForce for DipoleDipole {
    fn cutoff(&self) -> f64 {
        DIPOLE_CUTOFF_SIGMA * self.sigma
    }

    fn magnitude(&self, r: f64) -> f64 {
        let r_cut = self.cutoff();
        if self.strength <= 0.0 || r >= r_cut {
            return 0.0;
        }
        let r = r + DISTANCE_EPSILON;
        -self.strength / (r * r) * (1.0 - r / r_cut).max(0.1)
    }
}

/// Weighted sum of the three pair laws plus the density estimate.
#[derive(Debug, Clone)]
pub struct ForceModel {
    pub dispersion: LennardJones,
    pub hydrogen_bond: HydrogenBond,
    pub dipole: DipoleDipole,
    /// Cohesion weights for (dispersion, hydrogen bond, dipole)
    pub cohesion: [f64; 3],
    pub density_cutoff: f64,
}

impl ForceModel {
    pub fn from_scenario(params: &ScenarioParameters) -> Self {
        ForceModel {
            dispersion: LennardJones::new(params.epsilon, params.sigma),
            hydrogen_bond: HydrogenBond { strength: params.hb_strength, sigma: params.sigma },
            dipole: DipoleDipole { strength: params.dipole_strength, sigma: params.sigma },
            cohesion: [params.coh_lj, params.coh_hb, params.coh_dp],
            density_cutoff: DENSITY_CUTOFF_SIGMA * params.sigma,
        }
    }

    /// Radius a neighbour query must cover to see every interacting pair.
    pub fn query_radius(&self) -> f64 {
        self.dispersion
            .cutoff()
            .max(self.hydrogen_bond.cutoff())
            .max(self.dipole.cutoff())
            .max(self.density_cutoff)
    }

    /// Combined scalar for a pair at distance `r`, along the axis from the
    /// neighbour to the particle. Always finite and within ±[`FORCE_LIMIT`].
    pub fn pair_scalar(&self, r: f64, a: PhaseState, b: PhaseState) -> f64 {
        let [w_lj, w_hb, w_dp] = self.cohesion;
        let mut f = w_lj * self.dispersion.magnitude(r)
            + w_hb * self.hydrogen_bond.magnitude(r)
            + w_dp * self.dipole.magnitude(r);

        if a == PhaseState::Gas || b == PhaseState::Gas {
            f *= GAS_PAIR_SCALE;
        } else {
            f *= LIQUID_PAIR_BOOST;
        }
        if f.is_finite() {
            f.clamp(-FORCE_LIMIT, FORCE_LIMIT)
        } else {
            0.0
        }
    }
}

impl ForceProvider for ForceModel {
    fn compute_forces(&self, particles: &[Particle], index: &SpatialIndex) -> ForcePass {
        let n = particles.len();
        let mut accelerations = vec![Vector2::zeros(); n];
        let mut neighbor_counts = vec![0u32; n];
        let query = self.query_radius();

        for (i, p) in particles.iter().enumerate() {
            let mut acc = Vector2::zeros();
            let mut count = 0;
            index.for_each_neighbor(p.position.x, p.position.y, query, |j| {
                if j == i {
                    return;
                }
                let q = &particles[j];
                let d = p.position - q.position;
                let r = d.norm();
                if r < self.density_cutoff {
                    count += 1;
                }
                if r >= query {
                    return;
                }
                let f = self.pair_scalar(r, p.state, q.state);
                if f != 0.0 {
                    acc += d * (f / ((r + DISTANCE_EPSILON) * p.mass));
                }
            });
            accelerations[i] = acc;
            neighbor_counts[i] = count;
        }

        ForcePass { accelerations, neighbor_counts }
    }
}
