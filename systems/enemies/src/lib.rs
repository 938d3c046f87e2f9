#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Enemy agents that seek the nearest wall and attack it on a fixed cadence.

mod registry;

use std::time::Duration;

use bulwark_core::{
    DamageOutcome, Damageable, EnemyArchetype, EnemyId, Health, SpatialQuery,
    SpawnerNumber, TimerAction, TimerHandle, TimerService, Vec3, WallId, ENEMY_ATTACK_DAMAGE,
};
use tracing::{debug, trace};

pub use registry::{EnemyRegistry, EnemyStats};

/// Behavioural state of an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnemyState {
    /// Closing in on the target wall.
    Seeking,
    /// In range with a repeating attack timer armed.
    Attacking,
}

/// Damage dealt by an attack that passed its range check.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AttackOutcome {
    /// Wall that was hit.
    pub wall: WallId,
    /// Damage to apply to the wall.
    pub damage: f32,
}

/// Per-enemy seek and attack state machine.
#[derive(Clone, Debug)]
pub struct EnemyAgent {
    id: EnemyId,
    position: Vec3,
    move_speed: f32,
    attack_range: f32,
    damage_interval: Duration,
    state: EnemyState,
    target_wall: Option<WallId>,
    target_point: Vec3,
    health: Health,
    attack_timer: Option<TimerHandle>,
    parent: Option<SpawnerNumber>,
}

impl EnemyAgent {
    /// Creates an agent at `position` using the statistics of `archetype`.
    #[must_use]
    pub fn new(id: EnemyId, position: Vec3, archetype: &EnemyArchetype) -> Self {
        Self {
            id,
            position,
            move_speed: archetype.move_speed.max(0.0),
            attack_range: archetype.attack_range.max(0.0),
            damage_interval: archetype.damage_interval(),
            state: EnemyState::Seeking,
            target_wall: None,
            target_point: position,
            health: Health::new(archetype.max_health),
            attack_timer: None,
            parent: None,
        }
    }

    /// Identifier of the agent.
    #[must_use]
    pub const fn id(&self) -> EnemyId {
        self.id
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec3 {
        self.position
    }

    /// Current behavioural state.
    #[must_use]
    pub const fn state(&self) -> EnemyState {
        self.state
    }

    /// Reports whether the agent is attacking.
    #[must_use]
    pub fn is_attacking(&self) -> bool {
        self.state == EnemyState::Attacking
    }

    /// Wall the agent is heading for.
    #[must_use]
    pub const fn target_wall(&self) -> Option<WallId> {
        self.target_wall
    }

    /// Point on the target wall recorded by the latest distance query.
    #[must_use]
    pub const fn target_point(&self) -> Vec3 {
        self.target_point
    }

    /// Handle of the repeating attack timer, while armed.
    #[must_use]
    pub const fn attack_timer(&self) -> Option<TimerHandle> {
        self.attack_timer
    }

    /// Spawner that emitted the agent.
    #[must_use]
    pub const fn parent_spawner(&self) -> Option<SpawnerNumber> {
        self.parent
    }

    /// Records the spawner that emitted the agent.
    pub fn link_parent(&mut self, spawner: SpawnerNumber) {
        self.parent = Some(spawner);
    }

    /// Mutable access to the health ledger for bulk stat adjustments.
    pub fn health_mut(&mut self) -> &mut Health {
        &mut self.health
    }

    /// Advances the agent by `dt`.
    ///
    /// Out of range the agent walks straight at the closest point of its wall
    /// and drops any armed attack. In range it arms a repeating attack timer
    /// once. A wall that no longer answers spatial queries is forgotten; the
    /// owner re-acquires a target on a later tick.
    pub fn tick<Q, S>(&mut self, dt: Duration, spatial: &Q, timers: &mut S)
    where
        Q: SpatialQuery + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
    {
        let Some(wall) = self.target_wall else {
            return;
        };
        let Some(surface) = spatial.closest_point_on_surface(wall, self.position) else {
            trace!(enemy = self.id.get(), wall = wall.get(), "enemy_target_vanished");
            self.clear_target(timers);
            return;
        };
        self.target_point = surface.point;

        if surface.distance <= 0.0 {
            return;
        }

        if surface.distance > self.attack_range {
            if self.attack_timer.is_some() || self.is_attacking() {
                trace!(enemy = self.id.get(), "enemy_resumed_chase");
            }
            self.cancel_timers(timers);
            self.state = EnemyState::Seeking;

            let step = self.move_speed * dt.as_secs_f32();
            let direction = (surface.point - self.position).normalize_or_zero();
            self.position += direction * step.min(surface.distance);
            return;
        }

        if self.is_attacking() || self.damage_interval.is_zero() {
            return;
        }
        let handle = timers.schedule(
            self.damage_interval,
            true,
            TimerAction::EnemyAttack { enemy: self.id },
        );
        self.attack_timer = Some(handle);
        self.state = EnemyState::Attacking;
        debug!(enemy = self.id.get(), wall = wall.get(), "enemy_attack_armed");
    }

    /// Resolves one attack expiry.
    ///
    /// The range is checked again against the recorded target point, so an
    /// expiry that outlived a movement or target change deals no damage.
    #[must_use]
    pub fn attack(&self) -> Option<AttackOutcome> {
        let wall = self.target_wall?;
        if self.position.distance(self.target_point) > self.attack_range {
            return None;
        }
        Some(AttackOutcome {
            wall,
            damage: ENEMY_ATTACK_DAMAGE,
        })
    }

    /// Targets the closest wall among `candidates`, first found winning ties.
    pub fn acquire_nearest_wall<Q, I>(&mut self, candidates: I, spatial: &Q) -> Option<WallId>
    where
        Q: SpatialQuery + ?Sized,
        I: IntoIterator<Item = WallId>,
    {
        let mut best: Option<(WallId, Vec3, f32)> = None;
        for wall in candidates {
            let Some(surface) = spatial.closest_point_on_surface(wall, self.position) else {
                continue;
            };
            let distance_squared = surface.point.distance_squared(self.position);
            let closer = best.map_or(true, |(_, _, current)| distance_squared < current);
            if closer {
                best = Some((wall, surface.point, distance_squared));
            }
        }

        let (wall, point, _) = best?;
        self.target_wall = Some(wall);
        self.target_point = point;
        debug!(enemy = self.id.get(), wall = wall.get(), "enemy_target_acquired");
        Some(wall)
    }

    /// Drops the current target, resets to seeking and re-acquires the nearest remaining wall.
    pub fn lose_target<Q, S, I>(&mut self, candidates: I, spatial: &Q, timers: &mut S) -> Option<WallId>
    where
        Q: SpatialQuery + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
        I: IntoIterator<Item = WallId>,
    {
        self.clear_target(timers);
        self.acquire_nearest_wall(candidates, spatial)
    }

    /// Cancels the attack timer, if armed.
    pub fn cancel_timers<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        if let Some(handle) = self.attack_timer.take() {
            timers.cancel(handle);
        }
    }

    fn clear_target<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        self.cancel_timers(timers);
        self.state = EnemyState::Seeking;
        self.target_wall = None;
    }
}

impl Damageable for EnemyAgent {
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        self.health.take_damage(amount)
    }

    fn health(&self) -> &Health {
        &self.health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulwark_core::SurfacePoint;

    struct Plane {
        x: f32,
    }

    impl SpatialQuery for Plane {
        fn closest_point_on_surface(&self, _wall: WallId, from: Vec3) -> Option<SurfacePoint> {
            let point = Vec3::new(self.x, from.y, from.z);
            Some(SurfacePoint {
                point,
                distance: point.distance(from),
            })
        }
    }

    #[test]
    fn attack_requires_recorded_point_in_range() {
        let mut agent = EnemyAgent::new(EnemyId::new(1), Vec3::ZERO, &EnemyArchetype::default());
        assert_eq!(agent.attack(), None, "no target");

        let _ = agent.acquire_nearest_wall([WallId::new(4)], &Plane { x: 500.0 });
        assert_eq!(agent.attack(), None, "out of range");

        let _ = agent.acquire_nearest_wall([WallId::new(4)], &Plane { x: 30.0 });
        assert_eq!(
            agent.attack(),
            Some(AttackOutcome {
                wall: WallId::new(4),
                damage: ENEMY_ATTACK_DAMAGE,
            })
        );
    }

    #[test]
    fn movement_never_overshoots_the_surface() {
        let archetype = EnemyArchetype {
            move_speed: 1_000.0,
            attack_range: 0.0,
            ..EnemyArchetype::default()
        };
        let mut agent = EnemyAgent::new(EnemyId::new(1), Vec3::ZERO, &archetype);
        let _ = agent.acquire_nearest_wall([WallId::new(1)], &Plane { x: 50.0 });

        struct NoTimers;
        impl TimerService<TimerAction> for NoTimers {
            fn schedule(&mut self, _: Duration, _: bool, _: TimerAction) -> TimerHandle {
                TimerHandle::new(0)
            }
            fn cancel(&mut self, _: TimerHandle) {}
            fn pause(&mut self, _: TimerHandle) {}
            fn resume(&mut self, _: TimerHandle) {}
            fn is_active(&self, _: TimerHandle) -> bool {
                false
            }
            fn is_paused(&self, _: TimerHandle) -> bool {
                false
            }
        }

        agent.tick(Duration::from_secs(1), &Plane { x: 50.0 }, &mut NoTimers);
        assert_eq!(agent.position(), Vec3::new(50.0, 0.0, 0.0));
    }
}
