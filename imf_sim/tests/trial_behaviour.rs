//! End-to-end trials through the public engine API.

use approx::assert_relative_eq;
use imf_sim::{
    Container, Material, ParticleId, ScenarioParameters, SimulationEngine, StateChange,
    TrialObserver,
};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

const DT: f64 = 1.0 / 30.0;

fn engine(material: Material, n: usize, seed: u64) -> SimulationEngine {
    let params = material.parameters().with_particle_count(n);
    SimulationEngine::new(Container::default(), params, seed).unwrap()
}

fn run_for(engine: &mut SimulationEngine, steps: usize) {
    for _ in 0..steps {
        engine.step(DT);
    }
}

struct Recorder(Rc<RefCell<Vec<StateChange>>>);

impl TrialObserver for Recorder {
    fn on_state_change(&mut self, change: &StateChange) {
        self.0.borrow_mut().push(*change);
    }
}

#[test]
fn test_adjust_particle_count_is_exact() {
    let mut e = engine(Material::Water, 300, 1);
    run_for(&mut e, 15);

    for n in [1, 37, 500, 250, 499] {
        assert_eq!(e.adjust_particle_count(n), n);
        assert_eq!(e.len(), n);
        let ids: HashSet<ParticleId> = e.particles().iter().map(|p| p.id).collect();
        assert_eq!(ids.len(), n);
        e.step(DT);
    }

    assert_eq!(e.adjust_particle_count(0), 1);
    assert_eq!(e.adjust_particle_count(900), 500);
    assert_eq!(e.len(), 500);
}

#[test]
fn test_particles_stay_inside_container() {
    let mut e = engine(Material::Ethanol, 300, 2);
    let c = e.container().clone();
    for _ in 0..240 {
        e.step(DT);
        for p in e.particles() {
            assert!(p.position.x >= 0.0 && p.position.x <= c.width, "x = {}", p.position.x);
            assert!(p.position.y >= p.radius && p.position.y <= c.height, "y = {}", p.position.y);
            assert!((0.0..=1.0).contains(&p.thermal_energy));
        }
    }
}

fn closest_contact_ratio(e: &SimulationEngine) -> f64 {
    let ps = e.particles();
    let mut worst = f64::INFINITY;
    for (i, a) in ps.iter().enumerate() {
        for b in &ps[i + 1..] {
            worst = worst.min((b.position - a.position).norm() / (a.radius + b.radius));
        }
    }
    worst
}

#[test]
fn test_packed_liquid_never_interpenetrates() {
    let mut e = engine(Material::Honey, 300, 3);
    for step in 0..300 {
        e.step(DT);
        let ratio = closest_contact_ratio(&e);
        assert!(ratio >= 0.99, "step {}: closest pair at {:.4}", step, ratio);
    }
}

#[test]
fn test_escapes_are_counted_once_and_reset() {
    let mut e = engine(Material::Hexane, 300, 3);
    let mut last = 0;
    for _ in 0..450 {
        e.step(DT);
        let now = e.escaped_count();
        assert!(now >= last);
        last = now;
        assert_eq!(e.len() + now, 300);
    }

    let escaped: HashSet<ParticleId> = e.escaped_particles().iter().map(|p| p.id).collect();
    assert_eq!(escaped.len(), e.escaped_count());
    assert!(e.particles().iter().all(|p| !escaped.contains(&p.id)));
    assert!(escaped.iter().all(|id| e.particle(*id).is_none()));

    let history = e.history();
    assert_eq!(history.len(), 450);
    assert!(history.iter().zip(history.iter().skip(1)).all(|(a, b)| a.escaped_count <= b.escaped_count));

    e.reset();
    assert_eq!(e.escaped_count(), 0);
    assert!(e.escaped_particles().is_empty());
    assert_eq!(e.len(), 300);
}

#[test]
fn test_seeded_runs_are_identical() {
    let steps = [DT, 0.016, 0.033, 0.02, DT, 0.01];
    let mut a = engine(Material::Water, 200, 99);
    let mut b = engine(Material::Water, 200, 99);
    assert_eq!(a.snapshot(), b.snapshot());

    for k in 0..120 {
        let dt = steps[k % steps.len()];
        a.step(dt);
        b.step(dt);
    }
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.escaped_particles(), b.escaped_particles());
    assert_eq!(a.gas_count(), b.gas_count());

    let mut c = engine(Material::Water, 200, 100);
    run_for(&mut c, 1);
    a.reset();
    run_for(&mut a, 1);
    assert_ne!(a.snapshot(), c.snapshot());
}

#[test]
fn test_no_transition_inside_dwell_window() {
    let mut e = engine(Material::Hexane, 300, 4);
    let changes = Rc::new(RefCell::new(Vec::new()));
    e.subscribe(Box::new(Recorder(changes.clone())));
    run_for(&mut e, 300);

    let changes = changes.borrow();
    assert!(!changes.is_empty());
    let mut by_particle: HashMap<ParticleId, Vec<StateChange>> = HashMap::new();
    for change in changes.iter() {
        by_particle.entry(change.id).or_default().push(*change);
    }
    for history in by_particle.values() {
        for pair in history.windows(2) {
            assert_ne!(pair[0].to, pair[1].to);
            assert!(pair[1].time_ms - pair[0].time_ms >= pair[0].dwell_ms - 1e-9);
        }
    }
}

#[test]
fn test_playground_endpoints_match_presets() {
    let weak = ScenarioParameters::from_imf_strength(0.0);
    let hexane = Material::Hexane.parameters();
    assert_eq!(weak.viscosity, hexane.viscosity);
    assert_eq!(weak.heat_accel, hexane.heat_accel);

    let mut e = engine(Material::Water, 100, 5);
    e.change_scenario(ScenarioParameters::from_imf_strength(1.0)).unwrap();
    assert_relative_eq!(e.params().viscosity, Material::Honey.parameters().viscosity, epsilon = 1e-12);
    assert_eq!(e.len(), 300);
}

#[test]
fn test_strong_imf_evaporates_less_than_weak_imf() {
    let fraction = |material: Material| {
        let mut e = engine(material, 300, 2024);
        while !e.is_finished() {
            e.step(DT);
        }
        e.summary()
    };

    let hexane = fraction(Material::Hexane);
    let honey = fraction(Material::Honey);
    assert!(hexane.escaped_count > 0);
    assert!(
        honey.escaped_fraction() < hexane.escaped_fraction(),
        "honey {:.3} vs hexane {:.3}",
        honey.escaped_fraction(),
        hexane.escaped_fraction()
    );
}
