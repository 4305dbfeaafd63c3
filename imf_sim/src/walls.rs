use crate::arena::ParticleArena;
use crate::particle::Particle;
use crate::world::Container;

pub const WALL_RESTITUTION: f64 = 0.2;
pub const FLOOR_FRICTION: f64 = 0.98;

/// Reflecting side walls and floor, absorbing top.
#[derive(Debug, Clone, Copy)]
pub struct WallHandler {
    pub width: f64,
    pub height: f64,
    pub restitution: f64,
    pub floor_friction: f64,
}

impl WallHandler {
    pub fn new(container: &Container) -> Self {
        WallHandler {
            width: container.width,
            height: container.height,
            restitution: WALL_RESTITUTION,
            floor_friction: FLOOR_FRICTION,
        }
    }

    /// True when the particle has crossed the absorbing top boundary.
    pub fn escapes(&self, p: &Particle) -> bool {
        p.position.y < p.radius
    }

    /// Reflect and clamp against the side walls and floor.
    pub fn reflect(&self, p: &mut Particle) {
        let r = p.radius;
        if p.position.x < r {
            p.position.x = r;
            if p.velocity.x < 0.0 {
                p.velocity.x = -p.velocity.x * self.restitution;
            }
        } else if p.position.x > self.width - r {
            p.position.x = self.width - r;
            if p.velocity.x > 0.0 {
                p.velocity.x = -p.velocity.x * self.restitution;
            }
        }

        if p.position.y > self.height - r {
            p.position.y = self.height - r;
            if p.velocity.y > 0.0 {
                p.velocity.y = -p.velocity.y * self.restitution;
            }
            p.velocity.x *= self.floor_friction;
        }
    }

    /// Apply every boundary and pull escaped particles out of the arena.
    /// The returned particles are gone from the active set.
    pub fn apply(&self, arena: &mut ParticleArena) -> Vec<Particle> {
        let mut escaped = Vec::new();
        for (i, p) in arena.iter_mut().enumerate() {
            if self.escapes(p) {
                escaped.push(i);
            } else {
                self.reflect(p);
            }
        }
        if escaped.is_empty() {
            return Vec::new();
        }
        arena.remove_many(escaped)
    }
}
