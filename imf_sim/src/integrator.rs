use crate::particle::Particle;
use crate::thermal::ThermalModel;
use rand::Rng;

pub const MIN_SUBSTEPS: usize = 2;
pub const MAX_SUBSTEPS: usize = 12;
/// Lower bound on the displacement allowed per sub-step (px).
pub const MIN_STEP_DISPLACEMENT: f64 = 2.0;

pub trait Integrator {
    /// Advance the system by dt
    fn step(&mut self, dt: f64);

    /// Compute the instantaneous temperature
    fn temperature(&self) -> f64;
}

/// Number of sub-steps for one external step. Without gravity the system is
/// gentle enough for a single pass.
pub fn substep_count(max_speed: f64, dt: f64, radius: f64, gravity_on: bool) -> usize {
    if !gravity_on {
        return 1;
    }
    let displacement = MIN_STEP_DISPLACEMENT.max(0.5 * radius);
    let raw = (max_speed * dt / displacement).ceil();
    if !raw.is_finite() || raw <= MIN_SUBSTEPS as f64 {
        return MIN_SUBSTEPS;
    }
    (raw as usize).min(MAX_SUBSTEPS)
}

pub fn max_speed(particles: &[Particle]) -> f64 {
    particles
        .iter()
        .map(|p| p.speed_squared())
        .fold(0.0, f64::max)
        .sqrt()
}

/// Semi-implicit Euler: velocity first, then position with the new velocity.
/// Hot particles get their vibration jitter between the two updates.
pub fn integrate<R: Rng + ?Sized>(
    particles: &mut [Particle],
    dt: f64,
    thermal: &ThermalModel,
    rng: &mut R,
) {
    for p in particles.iter_mut() {
        let a = p.acceleration;
        p.velocity += a * dt;
        thermal.vibrate(p, dt, rng);
        let v = p.velocity;
        p.position += v * dt;
    }
}
