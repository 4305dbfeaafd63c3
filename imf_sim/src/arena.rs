//! Dense particle storage with generation-checked handles.
//!
//! Particles are kept contiguous so every pass can iterate a plain slice.
//! Removal swaps the last particle into the hole and patches its slot, so a
//! [`ParticleId`] held by an external reader either resolves to the same
//! particle or to `None`, never to a different one.

use crate::particle::{Particle, ParticleId};

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    dense: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ParticleArena {
    particles: Vec<Particle>,
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl ParticleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ParticleArena {
            particles: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Allocate a handle and store the particle built from it.
    pub fn insert_with<F>(&mut self, build: F) -> ParticleId
    where
        F: FnOnce(ParticleId) -> Particle,
    {
        let dense = self.particles.len();
        let id = match self.free.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot as usize];
                entry.dense = Some(dense);
                ParticleId { slot, generation: entry.generation }
            }
            None => {
                let slot = self.slots.len() as u32;
                self.slots.push(Slot { generation: 0, dense: Some(dense) });
                ParticleId { slot, generation: 0 }
            }
        };
        let mut particle = build(id);
        particle.id = id;
        self.particles.push(particle);
        id
    }

    fn dense_index(&self, id: ParticleId) -> Option<usize> {
        let slot = self.slots.get(id.slot as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.dense
    }

    pub fn contains(&self, id: ParticleId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.dense_index(id).map(|i| &self.particles[i])
    }

    /// Remove by dense position. Panics if `index` is out of bounds, like `Vec::swap_remove`.
    pub fn remove_at(&mut self, index: usize) -> Particle {
        let removed = self.particles.swap_remove(index);
        let slot = &mut self.slots[removed.id.slot as usize];
        slot.dense = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(removed.id.slot);

        if let Some(moved) = self.particles.get(index) {
            self.slots[moved.id.slot as usize].dense = Some(index);
        }
        removed
    }

    pub fn remove(&mut self, id: ParticleId) -> Option<Particle> {
        self.dense_index(id).map(|i| self.remove_at(i))
    }

    /// Remove every listed dense index. Indices are processed from the back so
    /// the swap never moves a particle that is still waiting to be removed.
    pub fn remove_many(&mut self, mut indices: Vec<usize>) -> Vec<Particle> {
        indices.sort_unstable();
        indices.dedup();
        let mut removed = Vec::with_capacity(indices.len());
        for &i in indices.iter().rev() {
            removed.push(self.remove_at(i));
        }
        removed.reverse();
        removed
    }

    pub fn truncate(&mut self, len: usize) {
        while self.particles.len() > len {
            let last = self.particles.len() - 1;
            self.remove_at(last);
        }
    }

    pub fn clear(&mut self) {
        self.truncate(0);
    }

    pub fn as_slice(&self) -> &[Particle] {
        &self.particles
    }

    pub fn as_mut_slice(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Particle> {
        self.particles.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Particle> {
        self.particles.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    fn spawn(arena: &mut ParticleArena, x: f64) -> ParticleId {
        arena.insert_with(|id| Particle::new(id, Vector2::new(x, 0.0), Vector2::zeros()))
    }

    #[test]
    fn test_swap_remove_keeps_handles_valid() {
        let mut arena = ParticleArena::new();
        let a = spawn(&mut arena, 1.0);
        let b = spawn(&mut arena, 2.0);
        let c = spawn(&mut arena, 3.0);

        let removed = arena.remove(a).unwrap();
        assert_eq!(removed.position.x, 1.0);
        assert_eq!(arena.len(), 2);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().position.x, 2.0);
        assert_eq!(arena.get(c).unwrap().position.x, 3.0);
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut arena = ParticleArena::new();
        let a = spawn(&mut arena, 1.0);
        arena.remove(a);
        let b = spawn(&mut arena, 5.0);

        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.generation(), b.generation());
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().position.x, 5.0);
    }

    #[test]
    fn test_remove_many_removes_each_once() {
        let mut arena = ParticleArena::new();
        let ids: Vec<_> = (0..6).map(|i| spawn(&mut arena, i as f64)).collect();

        let removed = arena.remove_many(vec![4, 1, 5, 1]);
        let xs: Vec<f64> = removed.iter().map(|p| p.position.x).collect();
        assert_eq!(xs, vec![1.0, 4.0, 5.0]);
        assert_eq!(arena.len(), 3);
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(arena.contains(*id), ![1, 4, 5].contains(&i));
        }
    }

    #[test]
    fn test_truncate() {
        let mut arena = ParticleArena::new();
        for i in 0..10 {
            spawn(&mut arena, i as f64);
        }
        arena.truncate(4);
        assert_eq!(arena.len(), 4);
        arena.clear();
        assert!(arena.is_empty());
    }
}
