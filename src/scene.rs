//! In-memory scene
//!
//! A minimal stand-in for an engine scene: boats made of box parts, a slot
//! table that may be sparse or contain duplicate references, and ray queries
//! against part colliders. Used by the demo runner and the scenario tests.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::sim::services::{EntityId, EntityPool, RayCaster};

/// Layer parts start on before `prepare` moves colliders into the query layer
pub const DEFAULT_LAYER: u32 = 0;

/// One box-shaped piece of a boat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Offset from the boat root
    pub offset: Vec3,
    /// Collider half extents; `None` for render-only parts
    pub collider: Option<Vec3>,
    /// Trigger volumes never block rays
    pub trigger: bool,
    pub layer: u32,
}

impl Part {
    pub fn solid(offset: Vec3, half_extents: Vec3) -> Self {
        Self {
            offset,
            collider: Some(half_extents),
            trigger: false,
            layer: DEFAULT_LAYER,
        }
    }

    pub fn visual(offset: Vec3) -> Self {
        Self {
            offset,
            collider: None,
            trigger: false,
            layer: DEFAULT_LAYER,
        }
    }

    pub fn trigger(offset: Vec3, half_extents: Vec3) -> Self {
        Self {
            trigger: true,
            ..Self::solid(offset, half_extents)
        }
    }

    fn is_queryable(&self) -> bool {
        self.collider.is_some() && !self.trigger
    }
}

/// A boat: a root transform plus its parts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Boat {
    pub id: EntityId,
    pub position: Vec3,
    pub active: bool,
    pub parts: Vec<Part>,
}

/// Boats plus the pool slot table that references them
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scene {
    pub boats: Vec<Boat>,
    /// Slot -> boat index; `None` is an empty slot
    pub slots: Vec<Option<usize>>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// `n` inactive boats, one per slot, each a solid hull plus a visual mast
    pub fn with_boats(n: usize, hull_half_extents: Vec3) -> Self {
        let mut scene = Self::new();
        for _ in 0..n {
            let boat = scene.add_boat(vec![
                Part::solid(Vec3::ZERO, hull_half_extents),
                Part::visual(Vec3::new(0.0, hull_half_extents.y * 2.0, 0.0)),
            ]);
            scene.slots.push(Some(boat));
        }
        scene
    }

    /// Add an inactive boat at the origin; returns its boat index
    pub fn add_boat(&mut self, parts: Vec<Part>) -> usize {
        let index = self.boats.len();
        self.boats.push(Boat {
            id: EntityId(index as u32 + 1),
            position: Vec3::ZERO,
            active: false,
            parts,
        });
        index
    }

    pub fn push_slot(&mut self, boat: Option<usize>) {
        self.slots.push(boat);
    }

    pub fn boat(&self, slot: usize) -> Option<&Boat> {
        let index = (*self.slots.get(slot)?)?;
        self.boats.get(index)
    }

    fn boat_mut(&mut self, slot: usize) -> Option<&mut Boat> {
        let index = (*self.slots.get(slot)?)?;
        self.boats.get_mut(index)
    }

    /// Drop the boat referenced by `slot`, as if its object was destroyed
    pub fn destroy(&mut self, slot: usize) {
        if let Some(entry) = self.slots.get_mut(slot) {
            *entry = None;
        }
    }
}

impl EntityPool for Scene {
    fn len(&self) -> usize {
        self.slots.len()
    }

    fn entity(&self, slot: usize) -> Option<EntityId> {
        self.boat(slot).map(|b| b.id)
    }

    fn position(&self, slot: usize) -> Option<Vec3> {
        self.boat(slot).map(|b| b.position)
    }

    fn set_position(&mut self, slot: usize, position: Vec3) {
        if let Some(boat) = self.boat_mut(slot) {
            boat.position = position;
        }
    }

    fn is_active(&self, slot: usize) -> bool {
        self.boat(slot).is_some_and(|b| b.active)
    }

    fn set_active(&mut self, slot: usize, active: bool) {
        if let Some(boat) = self.boat_mut(slot) {
            boat.active = active;
        }
    }

    fn has_collider(&self, slot: usize) -> bool {
        self.boat(slot)
            .is_some_and(|b| b.parts.iter().any(Part::is_queryable))
    }

    /// Only parts with a collider change layer; visual parts keep theirs
    fn prepare(&mut self, slot: usize, layer: u32) {
        if let Some(boat) = self.boat_mut(slot) {
            for part in boat.parts.iter_mut().filter(|p| p.collider.is_some()) {
                part.layer = layer;
            }
        }
    }
}

impl RayCaster for Scene {
    fn cast(&self, origin: Vec3, direction: Vec3, max_distance: f32, layer: u32) -> Option<EntityId> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }

        let mut closest: Option<(f32, EntityId)> = None;
        for boat in self.boats.iter().filter(|b| b.active) {
            for part in boat.parts.iter().filter(|p| p.is_queryable() && p.layer == layer) {
                let Some(half) = part.collider else {
                    continue;
                };
                let center = boat.position + part.offset;
                if let Some(t) = ray_aabb(origin, dir, center - half, center + half, max_distance)
                    && closest.is_none_or(|(best, _)| t < best)
                {
                    closest = Some((t, boat.id));
                }
            }
        }
        closest.map(|(_, id)| id)
    }
}

/// Ray/AABB intersection (slab method). `dir` must be normalized.
///
/// Returns the entry distance, or the exit distance when the origin is inside.
pub fn ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3, max_dist: f32) -> Option<f32> {
    let inv = |d: f32| if d.abs() > 1e-6 { 1.0 / d } else { f32::MAX };
    let inv_dir = Vec3::new(inv(dir.x), inv(dir.y), inv(dir.z));

    let t1 = (min - origin) * inv_dir;
    let t2 = (max - origin) * inv_dir;
    let tmin = t1.min(t2).max_element();
    let tmax = t1.max(t2).min_element();

    if tmax < 0.0 || tmin > tmax {
        return None;
    }
    let t = if tmin >= 0.0 { tmin } else { tmax };
    (t <= max_dist).then_some(t)
}
