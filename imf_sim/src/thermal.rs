//! Thermostat and stovetop heating.
//!
//! The [`Thermostat`] couples every particle to a Langevin bath (drag plus
//! Gaussian kicks balanced by fluctuation-dissipation) and periodically
//! rescales the sparse and gaseous particles toward a target kinetic energy.
//! The heating side drives each particle's scalar thermal energy from a strip
//! along the floor and turns it into buoyancy, boosts and vibration.

use crate::particle::Particle;
use crate::scenario::ScenarioParameters;
use crate::tuning::{piecewise_affine, HEATING_RATE_FACTOR};
use crate::world::Container;
use nalgebra::Vector2;
use rand::Rng;
use rand_distr::StandardNormal;
use std::f64::consts::TAU;

pub const DRAG_GAMMA: f64 = 0.3;
pub const RESCALE_INTERVAL_S: f64 = 0.5;
pub const RESCALE_MIN: f64 = 0.9;
pub const RESCALE_MAX: f64 = 1.1;
pub const RESCALE_DEADBAND: f64 = 0.02;
/// Particles with fewer neighbours count as sparse and are thermostatted.
pub const SPARSE_NEIGHBOR_LIMIT: u32 = 3;

/// (x as a fraction of width, relative strength)
pub const HOTSPOTS: [(f64, f64); 3] = [(0.25, 1.0), (0.5, 0.85), (0.75, 0.7)];
/// Gaussian spread of a hotspot as a fraction of width.
pub const HOTSPOT_SPREAD: f64 = 0.12;
pub const HOTSPOT_FLOOR: f64 = 0.3;
pub const STRIP_TOP_INTENSITY: f64 = 0.2;

pub const HEATING_RATE: f64 = 0.6;
pub const COOLING_RATE: f64 = 0.15;
pub const BUOYANCY_DAMPING: f64 = 0.7;
pub const HEAT_BOOST_SPEED: f64 = 40.0;
pub const HEAT_BOOST_DAMPING: f64 = 0.6;
pub const HEAT_BOOST_THRESHOLD: f64 = 0.2;
pub const HEAT_BOOST_REARM: f64 = 0.1;
pub const FORWARD_PUSH: f64 = 0.35;
pub const VIBRATION_VELOCITY: f64 = 25.0;
pub const VIBRATION_DAMPING: f64 = 0.6;
pub const VIBRATION_POSITION: f64 = 0.2;
pub const VIBRATION_MIN_ENERGY: f64 = 0.1;
pub const GAS_LIFT: f64 = 1.25;
pub const GAS_LIFT_DAMPING: f64 = 0.2;

#[derive(Debug, Clone)]
pub struct Thermostat {
    pub gamma: f64,
    pub kt: f64,
    since_rescale: f64,
}

impl Thermostat {
    pub fn new(kt: f64) -> Self {
        Thermostat { gamma: DRAG_GAMMA, kt, since_rescale: 0.0 }
    }

    pub fn target_kinetic_energy(&self) -> f64 {
        40.0 * (self.kt + 0.05)
    }

    /// Add drag and the stochastic kick, expressed as accelerations so the
    /// integrator sees a velocity kick of standard deviation sqrt(2 γ kT dt).
    pub fn apply_langevin<R: Rng + ?Sized>(&self, particles: &mut [Particle], dt: f64, rng: &mut R) {
        if dt <= 0.0 {
            return;
        }
        let inv_sqrt_dt = 1.0 / dt.sqrt();
        for p in particles.iter_mut() {
            let noise_scale = (2.0 * self.gamma * self.kt * p.inv_mass()).sqrt();
            let gx: f64 = rng.sample(StandardNormal);
            let gy: f64 = rng.sample(StandardNormal);
            p.acceleration -= p.velocity * self.gamma;
            p.acceleration += Vector2::new(gx, gy) * (noise_scale * inv_sqrt_dt);
        }
    }

    /// Advance the rescale timer; true when a rescale is due.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.since_rescale += dt;
        if self.since_rescale >= RESCALE_INTERVAL_S {
            self.since_rescale = 0.0;
            true
        } else {
            false
        }
    }

    pub fn reset_clock(&mut self) {
        self.since_rescale = 0.0;
    }

    fn eligible(p: &Particle) -> bool {
        p.is_gas() || p.local_neighbor_count < SPARSE_NEIGHBOR_LIMIT
    }

    /// Rescale gas and sparse particles toward the target energy, leaving
    /// dense liquid alone. Returns the applied factor.
    pub fn rescale(&self, particles: &mut [Particle]) -> Option<f64> {
        let (total, count) = particles
            .iter()
            .filter(|p| Self::eligible(p))
            .fold((0.0, 0usize), |(e, n), p| (e + p.kinetic_energy(), n + 1));
        if count == 0 {
            return None;
        }
        let mean = total / count as f64;
        if mean <= 1e-12 {
            return None;
        }

        let needed = (self.target_kinetic_energy() / mean).sqrt();
        if (needed - 1.0).abs() <= RESCALE_DEADBAND {
            return None;
        }
        let factor = needed.clamp(RESCALE_MIN, RESCALE_MAX);
        for p in particles.iter_mut().filter(|p| Self::eligible(p)) {
            p.velocity *= factor;
        }
        Some(factor)
    }
}

#[derive(Debug, Clone)]
pub struct ThermalModel {
    pub thermostat: Thermostat,
    width: f64,
    height: f64,
    strip_top: f64,
    imf_strength: f64,
    material_rate: f64,
    heat_accel: f64,
    heat_intensity: f64,
}

impl ThermalModel {
    pub fn new(container: &Container, params: &ScenarioParameters) -> Self {
        ThermalModel {
            thermostat: Thermostat::new(params.kt),
            width: container.width,
            height: container.height,
            strip_top: container.heat_strip_top(),
            imf_strength: params.imf_strength(),
            material_rate: HEATING_RATE * piecewise_affine(HEATING_RATE_FACTOR, params.viscosity),
            heat_accel: params.heat_accel,
            heat_intensity: params.heat_intensity,
        }
    }

    pub fn set_heat_intensity(&mut self, intensity: f64) {
        self.heat_intensity = intensity;
    }

    pub fn heat_intensity(&self) -> f64 {
        self.heat_intensity
    }

    /// Thermal energy gained per second at full local intensity.
    pub fn heating_rate(&self) -> f64 {
        self.material_rate * self.heat_intensity
    }

    fn damping(&self, strength: f64) -> f64 {
        1.0 - strength * self.imf_strength
    }

    /// Local heat intensity in [0, 1]; zero outside the strip.
    pub fn intensity_at(&self, x: f64, y: f64) -> f64 {
        if y < self.strip_top {
            return 0.0;
        }
        let depth = ((y - self.strip_top) / (self.height - self.strip_top)).clamp(0.0, 1.0);
        let vertical = STRIP_TOP_INTENSITY + (1.0 - STRIP_TOP_INTENSITY) * depth;

        let u = x / self.width;
        let two_s2 = 2.0 * HOTSPOT_SPREAD * HOTSPOT_SPREAD;
        let blended: f64 = HOTSPOTS
            .iter()
            .map(|&(c, s)| s * (-(u - c) * (u - c) / two_s2).exp())
            .sum();
        let horizontal = HOTSPOT_FLOOR + (1.0 - HOTSPOT_FLOOR) * blended.min(1.0);

        vertical * horizontal
    }

    /// Update thermal energy and add the heating accelerations for one sub-step.
    pub fn apply_heating<R: Rng + ?Sized>(
        &self,
        particles: &mut [Particle],
        dt: f64,
        heating_on: bool,
        rng: &mut R,
    ) {
        let buoyancy_damp = self.damping(BUOYANCY_DAMPING);
        let boost = HEAT_BOOST_SPEED * self.damping(HEAT_BOOST_DAMPING);
        let rate = self.heating_rate();

        for p in particles.iter_mut() {
            let intensity = if heating_on {
                self.intensity_at(p.position.x, p.position.y)
            } else {
                0.0
            };
            if intensity > 0.0 {
                p.add_thermal_energy(rate * intensity * dt);
            } else {
                p.add_thermal_energy(-COOLING_RATE * dt);
            }

            let te = p.thermal_energy;
            if te > 0.0 {
                p.acceleration.y -= self.heat_accel * te * buoyancy_damp;
            }

            if !p.heat_boosted && te > HEAT_BOOST_THRESHOLD {
                p.velocity.y -= boost;
                p.heat_boosted = true;
            } else if p.heat_boosted && te < HEAT_BOOST_REARM {
                p.heat_boosted = false;
            }

            if intensity > 0.0 {
                let push = FORWARD_PUSH * self.heat_accel * intensity * buoyancy_damp;
                let speed = p.velocity.norm();
                let dir = if speed > 1.0 {
                    p.velocity / speed
                } else {
                    let angle = rng.gen_range(0.0..TAU);
                    Vector2::new(angle.cos(), angle.sin())
                };
                p.acceleration += dir * push;
            }
        }
    }

    /// Upward acceleration carried by gas particles while gravity acts.
    pub fn gas_lift(&self, gravity: f64) -> f64 {
        gravity * (GAS_LIFT - GAS_LIFT_DAMPING * self.imf_strength)
    }

    /// Velocity and position jitter for hot particles.
    pub fn vibrate<R: Rng + ?Sized>(&self, p: &mut Particle, dt: f64, rng: &mut R) {
        let te = p.thermal_energy;
        if te <= VIBRATION_MIN_ENERGY {
            return;
        }
        let amp = VIBRATION_VELOCITY * te * self.damping(VIBRATION_DAMPING) * dt.sqrt();
        p.velocity += Vector2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)) * amp;
        let shake = VIBRATION_POSITION * te;
        p.position += Vector2::new(rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0)) * shake;
    }
}
