//! The simulation facade.
//!
//! [`SimulationEngine`] owns the particle arena and every physics component,
//! and sequences them once per sub-step. External readers only see slices
//! and snapshots taken between calls to [`SimulationEngine::step`].

use crate::arena::ParticleArena;
use crate::collision::CollisionResolver;
use crate::error::{invalid, Result};
use crate::events::{StateChange, TrialObserver, TrialSummary};
use crate::forces::{ForceModel, ForceProvider, HB_CUTOFF_SIGMA};
use crate::integrator::{integrate, max_speed, substep_count, Integrator};
use crate::particle::{Particle, ParticleId, ParticleSnapshot, PhaseState, PARTICLE_RADIUS};
use crate::phase::PhaseStateMachine;
use crate::scenario::{ScenarioParameters, MAX_PARTICLES, MIN_PARTICLES};
use crate::spatial::SpatialIndex;
use crate::thermal::ThermalModel;
use crate::walls::WallHandler;
use crate::world::Container;
use itertools::izip;
use nalgebra::Vector2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const TRIAL_DURATION_S: f64 = 30.0;
pub const HISTORY_CAPACITY: usize = 10_000;
/// Boltzmann constant in simulation units; `kT` is quoted in energy directly.
pub const BOLTZMANN: f64 = 1.0;
/// Three particle diameters.
pub const GRID_CELL_SIZE: f64 = 6.0 * PARTICLE_RADIUS;
/// Lattice pitch of the initial layout, in radii.
pub const SPAWN_SPACING: f64 = 2.2;
pub const SPAWN_JITTER: f64 = 0.5;

/// Largest σ whose longest cutoff still fits inside one grid cell.
pub fn max_sigma() -> f64 {
    GRID_CELL_SIZE / HB_CUTOFF_SIGMA
}

/// Record of a particle absorbed by the top boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscapedParticle {
    pub id: ParticleId,
    pub position: [f64; 2],
    pub radius: f64,
    pub state: PhaseState,
    pub thermal_energy: f64,
    pub scenario: String,
    pub time_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub t: f64,
    pub gas_count: usize,
    pub escaped_count: usize,
    pub scenario: String,
}

pub struct SimulationEngine {
    container: Container,
    params: ScenarioParameters,
    arena: ParticleArena,
    index: SpatialIndex,
    forces: ForceModel,
    thermal: ThermalModel,
    walls: WallHandler,
    collisions: CollisionResolver,
    phase: PhaseStateMachine,
    elapsed: f64,
    gas_count: usize,
    escaped: Vec<EscapedParticle>,
    history: VecDeque<HistorySample>,
    finished: bool,
    seed: u64,
    rng: StdRng,
    observers: Vec<Box<dyn TrialObserver>>,
}

impl SimulationEngine {
    pub fn new(container: Container, params: ScenarioParameters, seed: u64) -> Result<Self> {
        container.validate()?;
        params.validate(max_sigma())?;

        let mut engine = SimulationEngine {
            index: SpatialIndex::new(container.width, container.height, GRID_CELL_SIZE),
            forces: ForceModel::from_scenario(&params),
            thermal: ThermalModel::new(&container, &params),
            walls: WallHandler::new(&container),
            collisions: CollisionResolver::new(&container),
            phase: PhaseStateMachine::new(&container, &params),
            arena: ParticleArena::with_capacity(MAX_PARTICLES),
            elapsed: 0.0,
            gas_count: 0,
            escaped: Vec::new(),
            history: VecDeque::new(),
            finished: false,
            seed,
            rng: StdRng::seed_from_u64(seed),
            observers: Vec::new(),
            container,
            params,
        };
        engine.respawn();
        Ok(engine)
    }

    /// Advance the simulation by `dt` seconds. Does nothing once the trial
    /// has ended or for a non-positive `dt`.
    pub fn step(&mut self, dt: f64) {
        if self.finished || !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let substeps = substep_count(
            max_speed(self.arena.as_slice()),
            dt,
            PARTICLE_RADIUS,
            self.container.gravity_on,
        );
        let h = dt / substeps as f64;
        for _ in 0..substeps {
            self.substep(h);
        }

        self.record_history();
        if self.elapsed >= TRIAL_DURATION_S - 1e-9 {
            self.finish();
        }
    }

    fn substep(&mut self, h: f64) {
        let gravity = self.container.gravity();

        self.index.rebuild(self.arena.as_slice());
        let pass = self.forces.compute_forces(self.arena.as_slice(), &self.index);
        for (p, a, n) in izip!(self.arena.iter_mut(), pass.accelerations, pass.neighbor_counts) {
            p.acceleration = a;
            p.local_neighbor_count = n;
        }
        self.thermal
            .thermostat
            .apply_langevin(self.arena.as_mut_slice(), h, &mut self.rng);
        if self.thermal.thermostat.tick(h) {
            if let Some(factor) = self.thermal.thermostat.rescale(self.arena.as_mut_slice()) {
                tracing::trace!("thermostat rescale by {:.4}", factor);
            }
        }

        let lift = self.thermal.gas_lift(gravity);
        for p in self.arena.iter_mut() {
            p.acceleration.y += gravity;
            if p.is_gas() {
                p.acceleration.y -= lift;
            }
        }
        self.thermal.apply_heating(
            self.arena.as_mut_slice(),
            h,
            self.container.heating_on,
            &mut self.rng,
        );

        integrate(self.arena.as_mut_slice(), h, &self.thermal, &mut self.rng);
        self.elapsed += h;
        self.apply_walls();

        // indices shifted if anything escaped
        self.index.rebuild(self.arena.as_slice());
        self.collisions
            .resolve(self.arena.as_mut_slice(), &mut self.index, h);
        self.apply_walls();

        self.update_phases();
    }

    fn apply_walls(&mut self) {
        for p in self.walls.apply(&mut self.arena) {
            tracing::trace!("particle {:?} escaped at t = {:.3} s", p.id, self.elapsed);
            self.escaped.push(EscapedParticle {
                id: p.id,
                position: [p.position.x, p.position.y],
                radius: p.radius,
                state: p.state,
                thermal_energy: p.thermal_energy,
                scenario: self.params.name.clone(),
                time_s: self.elapsed,
            });
        }
    }

    fn update_phases(&mut self) {
        let now_ms = self.elapsed * 1000.0;
        let mut changes = Vec::new();
        for p in self.arena.iter_mut() {
            if let Some(t) = self.phase.update(p, now_ms, &mut self.rng) {
                changes.push(StateChange {
                    id: p.id,
                    from: t.from,
                    to: t.to,
                    time_ms: now_ms,
                    dwell_ms: t.dwell_ms,
                });
            }
        }
        self.gas_count = self.arena.iter().filter(|p| p.is_gas()).count();

        for change in &changes {
            tracing::trace!(
                "particle {:?}: {:?} -> {:?} at {:.1} ms",
                change.id,
                change.from,
                change.to,
                change.time_ms
            );
            for observer in self.observers.iter_mut() {
                observer.on_state_change(change);
            }
        }
    }

    fn record_history(&mut self) {
        self.history.push_back(HistorySample {
            t: self.elapsed,
            gas_count: self.gas_count,
            escaped_count: self.escaped.len(),
            scenario: self.params.name.clone(),
        });
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        let summary = self.summary();
        tracing::info!(
            "Trial '{}' ended after {:.2} s: {} of {} particles escaped ({:.1}%), {} in gas",
            summary.scenario,
            summary.elapsed_s,
            summary.escaped_count,
            summary.total_seen,
            100.0 * summary.escaped_fraction(),
            summary.gas_count
        );
        for observer in self.observers.iter_mut() {
            observer.on_trial_end(&summary);
        }
    }

    /// Replace the scenario wholesale and restart the trial.
    pub fn change_scenario(&mut self, params: ScenarioParameters) -> Result<()> {
        params.validate(max_sigma())?;
        tracing::debug!("Changing scenario to '{}'", params.name);
        self.forces = ForceModel::from_scenario(&params);
        self.thermal = ThermalModel::new(&self.container, &params);
        self.phase = PhaseStateMachine::new(&self.container, &params);
        self.params = params;
        self.reset();
        Ok(())
    }

    /// Respawn the particle set and clear the trial counters. The random
    /// stream restarts from the engine seed.
    pub fn reset(&mut self) {
        self.rng = StdRng::seed_from_u64(self.seed);
        self.thermal.thermostat.reset_clock();
        self.escaped.clear();
        self.history.clear();
        self.elapsed = 0.0;
        self.finished = false;
        self.respawn();
    }

    /// Grow or shrink the active set in place; returns the resulting count.
    pub fn adjust_particle_count(&mut self, n: usize) -> usize {
        let n = n.clamp(MIN_PARTICLES, MAX_PARTICLES);
        let current = self.arena.len();
        if n < current {
            self.arena.truncate(n);
        } else {
            for _ in current..n {
                let position = self.random_position();
                self.spawn_at(position);
            }
        }
        tracing::debug!("Adjusted particle count {} -> {}", current, n);
        self.params.particle_count = n;
        self.gas_count = self.arena.iter().filter(|p| p.is_gas()).count();
        n
    }

    pub fn set_heating(&mut self, on: bool) {
        self.container.heating_on = on;
    }

    pub fn set_gravity(&mut self, on: bool) {
        self.container.gravity_on = on;
    }

    pub fn set_heat_intensity(&mut self, intensity: f64) -> Result<()> {
        if !intensity.is_finite() || !(0.0..=5.0).contains(&intensity) {
            return invalid(format!("heat intensity must be within [0, 5], got {}", intensity));
        }
        self.params.heat_intensity = intensity;
        self.thermal.set_heat_intensity(intensity);
        Ok(())
    }

    pub fn subscribe(&mut self, observer: Box<dyn TrialObserver>) {
        self.observers.push(observer);
    }

    fn respawn(&mut self) {
        self.arena.clear();
        self.gas_count = 0;

        let r = PARTICLE_RADIUS;
        let pitch = SPAWN_SPACING * r;
        let cols = (((self.container.width - 2.0 * r) / pitch).floor() as usize).max(1);
        let rows = (((self.container.height - 2.0 * r) / pitch).floor() as usize).max(1);
        let n = self.params.particle_count;

        for k in 0..n {
            let position = if k < cols * rows {
                let (col, row) = (k % cols, k / cols);
                let jitter = Vector2::new(
                    self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                    self.rng.gen_range(-SPAWN_JITTER..=SPAWN_JITTER),
                );
                Vector2::new(
                    r + 0.5 * pitch + col as f64 * pitch,
                    self.container.height - r - 0.5 * pitch - row as f64 * pitch,
                ) + jitter
            } else {
                self.random_position()
            };
            self.spawn_at(position);
        }
        tracing::debug!(
            "Spawned {} particles for '{}' (seed {})",
            n,
            self.params.name,
            self.seed
        );
    }

    /// Uniform position in the lower half of the container.
    fn random_position(&mut self) -> Vector2<f64> {
        let r = PARTICLE_RADIUS;
        let (w, h) = (self.container.width, self.container.height);
        Vector2::new(
            self.rng.gen_range(r..w - r),
            self.rng.gen_range(0.5 * h..h - r),
        )
    }

    fn spawn_at(&mut self, position: Vector2<f64>) -> ParticleId {
        let sd = self.params.kt.sqrt();
        let vx: f64 = self.rng.sample(StandardNormal);
        let vy: f64 = self.rng.sample(StandardNormal);
        let velocity = Vector2::new(vx, vy) * sd;
        self.arena
            .insert_with(|id| Particle::new(id, position, velocity))
    }

    pub fn particles(&self) -> &[Particle] {
        self.arena.as_slice()
    }

    pub fn particle(&self, id: ParticleId) -> Option<&Particle> {
        self.arena.get(id)
    }

    pub fn snapshot(&self) -> Vec<ParticleSnapshot> {
        self.arena.iter().map(Particle::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn gas_count(&self) -> usize {
        self.gas_count
    }

    pub fn escaped_count(&self) -> usize {
        self.escaped.len()
    }

    pub fn escaped_particles(&self) -> &[EscapedParticle] {
        &self.escaped
    }

    pub fn history(&self) -> &VecDeque<HistorySample> {
        &self.history
    }

    pub fn params(&self) -> &ScenarioParameters {
        &self.params
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulated seconds since the trial started.
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn mean_kinetic_energy(&self) -> f64 {
        if self.arena.is_empty() {
            return 0.0;
        }
        self.arena.iter().map(|p| p.kinetic_energy()).sum::<f64>() / self.arena.len() as f64
    }

    pub fn summary(&self) -> TrialSummary {
        TrialSummary {
            scenario: self.params.name.clone(),
            escaped_count: self.escaped.len(),
            total_seen: self.escaped.len() + self.arena.len(),
            gas_count: self.gas_count,
            elapsed_s: self.elapsed,
        }
    }
}

impl Integrator for SimulationEngine {
    fn step(&mut self, dt: f64) {
        SimulationEngine::step(self, dt);
    }

    /// Equipartition temperature over two translational degrees of freedom
    /// per particle, in units where k_B = 1.
    fn temperature(&self) -> f64 {
        let dof = 2 * self.arena.len();
        if dof == 0 {
            return 0.0;
        }
        let kinetic: f64 = self.arena.iter().map(|p| p.kinetic_energy()).sum();
        2.0 * kinetic / (dof as f64 * BOLTZMANN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Material;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine(m: Material, n: usize) -> SimulationEngine {
        SimulationEngine::new(Container::default(), m.parameters().with_particle_count(n), 7).unwrap()
    }

    #[test]
    fn test_initial_layout_sits_on_the_floor() {
        let e = engine(Material::Water, 300);
        assert_eq!(e.len(), 300);
        let lowest = e.particles().iter().map(|p| p.position.y).fold(0.0, f64::max);
        assert!(lowest > 300.0);
        assert!(e.particles().iter().all(|p| p.state == PhaseState::Liquid));
    }

    #[test]
    fn test_rejects_bad_parameters() {
        let mut params = Material::Water.parameters();
        params.sigma = 20.0;
        assert!(SimulationEngine::new(Container::default(), params, 0).is_err());

        let mut e = engine(Material::Water, 20);
        assert!(e.set_heat_intensity(f64::NAN).is_err());
        assert!(e.set_heat_intensity(6.0).is_err());
        assert!(e.set_heat_intensity(2.0).is_ok());
        assert_eq!(e.params().heat_intensity, 2.0);
    }

    #[test]
    fn test_step_advances_clock_and_history() {
        let mut e = engine(Material::Water, 50);
        for _ in 0..10 {
            e.step(1.0 / 30.0);
        }
        assert_relative_eq!(e.elapsed(), 10.0 / 30.0, epsilon = 1e-9);
        assert_eq!(e.history().len(), 10);
        assert!(!e.is_finished());

        e.step(0.0);
        e.step(f64::NAN);
        assert_eq!(e.history().len(), 10);
    }

    struct EndCounter(Rc<RefCell<Vec<TrialSummary>>>);

    impl TrialObserver for EndCounter {
        fn on_trial_end(&mut self, summary: &TrialSummary) {
            self.0.borrow_mut().push(summary.clone());
        }
    }

    #[test]
    fn test_trial_freezes_after_duration() {
        let mut e = engine(Material::Honey, 10);
        let ends = Rc::new(RefCell::new(Vec::new()));
        e.subscribe(Box::new(EndCounter(ends.clone())));

        // 0.03 s steps reach 30 s after 1000 calls
        for _ in 0..1100 {
            e.step(0.03);
        }
        assert!(e.is_finished());
        assert!(e.elapsed() < TRIAL_DURATION_S + 0.05);
        assert_eq!(ends.borrow().len(), 1);
        assert_eq!(ends.borrow()[0].total_seen, 10);

        let frozen: Vec<_> = e.snapshot();
        e.step(0.03);
        assert_eq!(e.snapshot(), frozen);

        e.reset();
        assert!(!e.is_finished());
        assert_eq!(e.elapsed(), 0.0);
        assert_eq!(e.escaped_count(), 0);
    }

    #[test]
    fn test_change_scenario_resets_counts() {
        let mut e = engine(Material::Hexane, 100);
        for _ in 0..30 {
            e.step(1.0 / 30.0);
        }
        e.change_scenario(Material::Honey.parameters().with_particle_count(40))
            .unwrap();
        assert_eq!(e.len(), 40);
        assert_eq!(e.escaped_count(), 0);
        assert_eq!(e.gas_count(), 0);
        assert!(e.history().is_empty());
        assert_eq!(e.params().name, "honey");
    }

    #[test]
    fn test_temperature_follows_equipartition() {
        let mut e = engine(Material::Water, 30);
        // 2 dof per particle: T equals the mean kinetic energy per particle
        assert_relative_eq!(e.temperature(), e.mean_kinetic_energy(), epsilon = 1e-12);
        for p in e.arena.iter_mut() {
            p.velocity = Vector2::new(3.0, 4.0);
        }
        assert_relative_eq!(e.temperature(), 12.5, epsilon = 1e-12);
    }
}
