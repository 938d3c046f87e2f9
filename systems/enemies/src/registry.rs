//! Set of active enemies with bulk stat operations.

use bulwark_core::{EnemyId, Health};
use tracing::debug;

/// Lookup of enemy health ledgers used by bulk stat operations.
pub trait EnemyStats {
    /// Health ledger of `enemy`, or `None` once the enemy is gone.
    fn health_mut(&mut self, enemy: EnemyId) -> Option<&mut Health>;
}

/// Unordered set of active enemy references.
///
/// The registry never owns enemies. Registration appends without a duplicate
/// check and removal swaps the last entry into the vacated slot.
#[derive(Clone, Debug, Default)]
pub struct EnemyRegistry {
    active: Vec<EnemyId>,
}

impl EnemyRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `enemy` to the active set.
    pub fn register(&mut self, enemy: EnemyId) {
        self.active.push(enemy);
    }

    /// Removes one occurrence of `enemy`, reporting whether it was present.
    pub fn unregister(&mut self, enemy: EnemyId) -> bool {
        match self.active.iter().position(|candidate| *candidate == enemy) {
            Some(index) => {
                let _ = self.active.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Reports whether `enemy` is registered.
    #[must_use]
    pub fn contains(&self, enemy: EnemyId) -> bool {
        self.active.contains(&enemy)
    }

    /// Active enemies in storage order.
    pub fn iter(&self) -> impl Iterator<Item = EnemyId> + '_ {
        self.active.iter().copied()
    }

    /// Number of registrations, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Reports whether no enemy is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Forgets every registration.
    pub fn teardown(&mut self) {
        self.active.clear();
    }

    /// Permanently adjusts the maximum health of every active enemy.
    ///
    /// Returns how many ledgers were updated.
    pub fn adjust_max_health_for_all<E>(&self, stats: &mut E, value: f32, is_adding: bool) -> usize
    where
        E: EnemyStats + ?Sized,
    {
        let affected = self.for_each_member(stats, |health| {
            health.adjust_max_health(value, is_adding);
        });
        debug!(value, is_adding, affected, "enemy_max_health_adjusted");
        affected
    }

    /// Temporarily adjusts the maximum health of every active enemy.
    pub fn temp_adjust_max_health_for_all<E>(
        &self,
        stats: &mut E,
        value: f32,
        is_adding: bool,
    ) -> usize
    where
        E: EnemyStats + ?Sized,
    {
        let affected = self.for_each_member(stats, |health| {
            health.temp_adjust_max_health(value, is_adding);
        });
        debug!(value, is_adding, affected, "enemy_temp_max_health_adjusted");
        affected
    }

    /// Drops every temporary maximum health adjustment.
    pub fn reset_temp_max_health_for_all<E>(&self, stats: &mut E) -> usize
    where
        E: EnemyStats + ?Sized,
    {
        self.for_each_member(stats, Health::reset_temp_max_health)
    }

    // Iterates a snapshot so members may leave the set while it is walked.
    fn for_each_member<E, F>(&self, stats: &mut E, mut apply: F) -> usize
    where
        E: EnemyStats + ?Sized,
        F: FnMut(&mut Health),
    {
        let snapshot = self.active.clone();
        let mut affected = 0;
        for enemy in snapshot {
            if let Some(health) = stats.health_mut(enemy) {
                apply(health);
                affected += 1;
            }
        }
        affected
    }
}
