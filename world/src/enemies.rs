use std::collections::BTreeMap;

use bulwark_core::{
    ActorSpawner, EnemyArchetype, EnemyId, EnemyKind, Health, SpawnerNumber, Vec3,
};
use bulwark_system_enemies::{EnemyAgent, EnemyStats};
use tracing::trace;

/// Owns every enemy actor and creates new ones from authored archetypes.
#[derive(Debug)]
pub(crate) struct EnemyStore {
    agents: BTreeMap<EnemyId, EnemyAgent>,
    archetypes: BTreeMap<EnemyKind, EnemyArchetype>,
    next_id: u32,
}

impl EnemyStore {
    pub(crate) fn new(archetypes: BTreeMap<EnemyKind, EnemyArchetype>) -> Self {
        Self {
            agents: BTreeMap::new(),
            archetypes,
            next_id: 0,
        }
    }

    pub(crate) fn get(&self, enemy: EnemyId) -> Option<&EnemyAgent> {
        self.agents.get(&enemy)
    }

    pub(crate) fn get_mut(&mut self, enemy: EnemyId) -> Option<&mut EnemyAgent> {
        self.agents.get_mut(&enemy)
    }

    pub(crate) fn remove(&mut self, enemy: EnemyId) -> Option<EnemyAgent> {
        self.agents.remove(&enemy)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &EnemyAgent> + '_ {
        self.agents.values()
    }
}

impl ActorSpawner for EnemyStore {
    fn spawn(&mut self, kind: &EnemyKind, location: Vec3) -> Option<EnemyId> {
        let archetype = self.archetypes.get(kind)?;
        let id = EnemyId::new(self.next_id);
        self.next_id = self.next_id.checked_add(1)?;
        let _ = self
            .agents
            .insert(id, EnemyAgent::new(id, location, archetype));
        trace!(enemy = id.get(), kind = kind.as_str(), "enemy_created");
        Some(id)
    }

    fn link_parent(&mut self, enemy: EnemyId, spawner: SpawnerNumber) {
        if let Some(agent) = self.agents.get_mut(&enemy) {
            agent.link_parent(spawner);
        }
    }
}

impl EnemyStats for EnemyStore {
    fn health_mut(&mut self, enemy: EnemyId) -> Option<&mut Health> {
        self.agents.get_mut(&enemy).map(EnemyAgent::health_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kinds_are_refused() {
        let mut archetypes = BTreeMap::new();
        let _ = archetypes.insert(EnemyKind::new("grunt"), EnemyArchetype::default());
        let mut store = EnemyStore::new(archetypes);

        assert_eq!(store.spawn(&EnemyKind::new("brute"), Vec3::ZERO), None);
        let first = store.spawn(&EnemyKind::new("grunt"), Vec3::ZERO);
        let second = store.spawn(&EnemyKind::new("grunt"), Vec3::ONE);
        assert_eq!(first, Some(EnemyId::new(0)));
        assert_eq!(second, Some(EnemyId::new(1)));

        store.link_parent(EnemyId::new(1), SpawnerNumber::new(4));
        assert_eq!(
            store.get(EnemyId::new(1)).and_then(EnemyAgent::parent_spawner),
            Some(SpawnerNumber::new(4))
        );
    }
}
