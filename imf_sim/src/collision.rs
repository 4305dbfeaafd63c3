//! Narrow-phase contact resolution.
//!
//! The first sweep handles each overlapping pair once: positional correction,
//! a normal impulse, Coulomb friction, then a small exchange of kinetic
//! energy standing in for heat conduction through the contact. Packed liquid
//! rarely separates in one sweep, so later sweeps only move positions until
//! no pair penetrates more than [`PENETRATION_TOLERANCE`].

use crate::forces::DISTANCE_EPSILON;
use crate::particle::Particle;
use crate::spatial::SpatialIndex;
use crate::world::Container;
use nalgebra::Vector2;

pub const COLLISION_RESTITUTION: f64 = 0.2;
pub const FRICTION_COEFFICIENT: f64 = 0.3;
/// Corrections overshoot by 5% so the pair ends strictly separated.
pub const OVERLAP_OVERSHOOT: f64 = 1.05;
pub const CONDUCTION_FRACTION: f64 = 0.15;
pub const CONDUCTION_MIN_GAP: f64 = 0.5;
pub const CONDUCTION_MIN_TOTAL: f64 = 1.0;
/// Distance above the floor still counted as resting on it.
pub const FLOOR_TOLERANCE: f64 = 0.5;
/// Upper bound on sweeps per `resolve` call, the first one included.
pub const MAX_RELAXATION_SWEEPS: usize = 48;
/// Deepest overlap, as a fraction of the contact distance, that ends relaxation.
pub const PENETRATION_TOLERANCE: f64 = 0.002;

#[derive(Debug, Clone, Copy)]
pub struct CollisionResolver {
    pub width: f64,
    pub height: f64,
    pub restitution: f64,
    pub friction: f64,
}

/// Geometry of one overlapping pair, normal pointing from `a` to `b`.
#[derive(Debug, Clone, Copy)]
struct Contact {
    normal: Vector2<f64>,
    overlap: f64,
    min_dist: f64,
}

impl Contact {
    fn between(a: &Particle, b: &Particle) -> Option<Contact> {
        let d = b.position - a.position;
        let dist = d.norm();
        let min_dist = a.radius + b.radius;
        if dist >= min_dist {
            return None;
        }
        let normal = if dist > DISTANCE_EPSILON {
            d / dist
        } else {
            Vector2::new(1.0, 0.0)
        };
        Some(Contact {
            normal,
            overlap: min_dist - dist,
            min_dist,
        })
    }

    fn depth(&self) -> f64 {
        self.overlap / self.min_dist
    }
}

fn pair_mut(particles: &mut [Particle], i: usize, j: usize) -> (&mut Particle, &mut Particle) {
    debug_assert!(i < j);
    let (left, right) = particles.split_at_mut(j);
    (&mut left[i], &mut right[0])
}

impl CollisionResolver {
    pub fn new(container: &Container) -> Self {
        CollisionResolver {
            width: container.width,
            height: container.height,
            restitution: COLLISION_RESTITUTION,
            friction: FRICTION_COEFFICIENT,
        }
    }

    fn on_floor(&self, p: &Particle) -> bool {
        p.position.y >= self.height - p.radius - FLOOR_TOLERANCE
    }

    /// Resolve every overlap; returns the number of contacts in the first
    /// sweep. Pairs are visited with `i < j` only, so no pair is handled
    /// twice within a sweep.
    ///
    /// `index` is rebuilt between sweeps. When relaxation moved anything, the
    /// displacement it caused over the sub-step `h` is folded into velocity
    /// so the next sub-step does not drive the pack back together.
    pub fn resolve(&self, particles: &mut [Particle], index: &mut SpatialIndex, h: f64) -> usize {
        let reach = 2.0 * particles.iter().map(|p| p.radius).fold(0.0, f64::max);
        let mut contacts = 0;
        let mut candidates = Vec::new();
        let mut settled = Vec::new();
        let mut sweeps = 0;
        let mut worst = 0.0_f64;

        while sweeps < MAX_RELAXATION_SWEEPS {
            if sweeps > 0 {
                index.rebuild(particles);
            }
            worst = 0.0;
            for i in 0..particles.len() {
                candidates.clear();
                let pos = particles[i].position;
                index.for_each_neighbor(pos.x, pos.y, reach, |j| {
                    if j > i {
                        candidates.push(j);
                    }
                });
                for &j in &candidates {
                    let (a, b) = pair_mut(particles, i, j);
                    if let Some(c) = Contact::between(a, b) {
                        worst = worst.max(c.depth());
                        if sweeps == 0 {
                            self.apply_contact(a, b, &c);
                            contacts += 1;
                        } else {
                            self.relax_pair(a, b, &c);
                        }
                    }
                }
            }
            self.confine(particles);
            if sweeps == 0 {
                settled.extend(particles.iter().map(|p| p.position));
            }
            sweeps += 1;
            if worst <= PENETRATION_TOLERANCE {
                break;
            }
        }

        if sweeps == MAX_RELAXATION_SWEEPS {
            tracing::trace!("collision relaxation capped, last penetration {:.4}", worst);
        }
        if sweeps > 1 && h > 0.0 {
            for (p, x0) in particles.iter_mut().zip(&settled) {
                p.velocity += (p.position - x0) / h;
            }
        }
        contacts
    }

    /// Resolve a single pair. Returns false when the pair does not overlap.
    pub fn resolve_pair(&self, a: &mut Particle, b: &mut Particle) -> bool {
        match Contact::between(a, b) {
            Some(c) => {
                self.apply_contact(a, b, &c);
                true
            }
            None => false,
        }
    }

    fn apply_contact(&self, a: &mut Particle, b: &mut Particle, c: &Contact) {
        let n = c.normal;
        let (ima, imb) = (a.inv_mass(), b.inv_mass());
        let total = ima + imb;
        let overlap = c.overlap * OVERLAP_OVERSHOOT;
        let (mut wa, mut wb) = (ima / total, imb / total);
        // a resting particle is never pushed into the floor
        if self.on_floor(a) && -n.y > 0.0 {
            wa = 0.0;
            wb = 1.0;
        } else if self.on_floor(b) && n.y > 0.0 {
            wa = 1.0;
            wb = 0.0;
        }
        a.position -= n * (overlap * wa);
        b.position += n * (overlap * wb);

        let vn = (b.velocity - a.velocity).dot(&n);
        if vn < 0.0 {
            let j = -(1.0 + self.restitution) * vn / total;
            a.velocity -= n * (j * ima);
            b.velocity += n * (j * imb);

            let rel = b.velocity - a.velocity;
            let tangential = rel - n * rel.dot(&n);
            let vt = tangential.norm();
            if vt > DISTANCE_EPSILON {
                let t = tangential / vt;
                let jt = (vt / total).min(self.friction * j);
                a.velocity += t * (jt * ima);
                b.velocity -= t * (jt * imb);
            }
        }

        Self::conduct(a, b);
    }

    /// Position-only correction used by the relaxation sweeps.
    fn relax_pair(&self, a: &mut Particle, b: &mut Particle, c: &Contact) {
        let (ima, imb) = (a.inv_mass(), b.inv_mass());
        let total = ima + imb;
        let push = c.normal * (c.overlap * OVERLAP_OVERSHOOT);
        let mut da = -push * (ima / total);
        let mut db = push * (imb / total);
        self.hand_off_blocked(a, &mut da, &mut db);
        self.hand_off_blocked(b, &mut db, &mut da);
        a.position += da;
        b.position += db;
    }

    /// Trim the part of `own` that would carry `p` through the floor or a side
    /// wall and add it to the partner's move `other` instead.
    fn hand_off_blocked(&self, p: &Particle, own: &mut Vector2<f64>, other: &mut Vector2<f64>) {
        let floor = self.height - p.radius;
        let y = p.position.y + own.y;
        if own.y > 0.0 && y > floor {
            let excess = y - floor;
            own.y -= excess;
            other.y -= excess;
        }

        let (left, right) = (p.radius, self.width - p.radius);
        let x = p.position.x + own.x;
        let excess = if own.x < 0.0 && x < left {
            x - left
        } else if own.x > 0.0 && x > right {
            x - right
        } else {
            0.0
        };
        own.x -= excess;
        other.x -= excess;
    }

    fn confine(&self, particles: &mut [Particle]) {
        for p in particles.iter_mut() {
            p.position.x = p.position.x.max(p.radius).min(self.width - p.radius);
            p.position.y = p.position.y.min(self.height - p.radius);
        }
    }

    /// Move a fraction of the kinetic energy gap from the hotter to the cooler
    /// particle, keeping both directions.
    fn conduct(a: &mut Particle, b: &mut Particle) {
        let ka = a.kinetic_energy();
        let kb = b.kinetic_energy();
        let gap = ka - kb;
        if gap.abs() <= CONDUCTION_MIN_GAP || ka + kb <= CONDUCTION_MIN_TOTAL {
            return;
        }
        if ka <= DISTANCE_EPSILON || kb <= DISTANCE_EPSILON {
            return;
        }
        let transfer = CONDUCTION_FRACTION * gap;
        a.velocity *= ((ka - transfer) / ka).sqrt();
        b.velocity *= ((kb + transfer) / kb).sqrt();
    }
}
