use std::collections::BTreeMap;

use bulwark_core::{
    Bounds, DamageOutcome, Damageable, GateId, Health, SpatialQuery, SurfacePoint, Vec3, WallId,
};
use tracing::{debug, warn};

use crate::config::{GateConfig, WallConfig};

/// Destructible wall segment enemies march toward.
#[derive(Clone, Debug)]
pub struct BorderWall {
    id: WallId,
    bounds: Bounds,
    health: Health,
    disabled: bool,
}

impl BorderWall {
    pub(crate) fn new(config: &WallConfig) -> Self {
        Self {
            id: config.id,
            bounds: Bounds::new(config.min, config.max),
            health: Health::new(config.health),
            disabled: false,
        }
    }

    /// Identifier of the wall.
    #[must_use]
    pub const fn id(&self) -> WallId {
        self.id
    }

    /// Collision box of the wall.
    #[must_use]
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Reports whether the wall was destroyed.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }
}

impl Damageable for BorderWall {
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.disabled {
            return DamageOutcome::Absorbed;
        }
        let outcome = self.health.take_damage(amount);
        if outcome.is_fatal() {
            self.disabled = true;
            warn!(wall = self.id.get(), "wall_disabled");
        }
        outcome
    }

    fn health(&self) -> &Health {
        &self.health
    }
}

/// Every border wall, answering closest-point queries for standing walls only.
#[derive(Debug, Default)]
pub(crate) struct WallSet {
    walls: BTreeMap<WallId, BorderWall>,
}

impl WallSet {
    pub(crate) fn new(configs: &[WallConfig]) -> Self {
        Self {
            walls: configs
                .iter()
                .map(|config| (config.id, BorderWall::new(config)))
                .collect(),
        }
    }

    pub(crate) fn get(&self, wall: WallId) -> Option<&BorderWall> {
        self.walls.get(&wall)
    }

    pub(crate) fn get_mut(&mut self, wall: WallId) -> Option<&mut BorderWall> {
        self.walls.get_mut(&wall)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &BorderWall> + '_ {
        self.walls.values()
    }

    /// Walls still standing, in identifier order.
    pub(crate) fn standing(&self) -> Vec<WallId> {
        self.walls
            .values()
            .filter(|wall| !wall.disabled)
            .map(|wall| wall.id)
            .collect()
    }
}

impl SpatialQuery for WallSet {
    fn closest_point_on_surface(&self, wall: WallId, from: Vec3) -> Option<SurfacePoint> {
        let wall = self.walls.get(&wall)?;
        if wall.disabled {
            return None;
        }
        Some(wall.bounds.closest_point(from))
    }
}

/// Interactable barrier that locks while a nearby spawner is active.
#[derive(Clone, Debug)]
pub struct Gate {
    id: GateId,
    position: Vec3,
    locked: bool,
}

impl Gate {
    pub(crate) fn new(config: &GateConfig) -> Self {
        Self {
            id: config.id,
            position: config.position,
            locked: false,
        }
    }

    /// Identifier of the gate.
    #[must_use]
    pub const fn id(&self) -> GateId {
        self.id
    }

    /// World position of the gate.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Reports whether the gate is locked.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Locks the gate, returning `false` when it was already locked.
    pub(crate) fn lock(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        debug!(gate = self.id.get(), "gate_locked");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(id: u32, x: f32) -> WallConfig {
        WallConfig {
            id: WallId::new(id),
            min: Vec3::new(x, -100.0, 0.0),
            max: Vec3::new(x + 20.0, 100.0, 100.0),
            health: 20.0,
        }
    }

    #[test]
    fn destroyed_walls_stop_answering_queries() {
        let mut walls = WallSet::new(&[wall(1, 0.0), wall(2, 500.0)]);
        let from = Vec3::new(-50.0, 0.0, 0.0);
        assert!(walls.closest_point_on_surface(WallId::new(1), from).is_some());

        let wall = walls.get_mut(WallId::new(1)).expect("wall 1");
        assert_eq!(wall.apply_damage(10.0), DamageOutcome::Damaged { remaining: 10.0 });
        assert_eq!(wall.apply_damage(10.0), DamageOutcome::Died);
        assert_eq!(wall.apply_damage(10.0), DamageOutcome::Absorbed);

        assert!(walls.closest_point_on_surface(WallId::new(1), from).is_none());
        assert_eq!(walls.standing(), vec![WallId::new(2)]);
    }

    #[test]
    fn gates_lock_once() {
        let mut gate = Gate::new(&GateConfig {
            id: GateId::new(3),
            position: Vec3::ZERO,
        });
        assert!(gate.lock());
        assert!(!gate.lock());
        assert!(gate.is_locked());
    }
}
