use std::collections::BTreeMap;

use bulwark_core::{
    BehaviorController, BehaviorToken, BlackboardValue, Crew, NodeId, NpcId,
};
use rand::seq::IteratorRandom;
use rand_chacha::ChaCha8Rng;
use tracing::trace;

const IDLE_BEHAVIOR: &str = "follow_player";

/// Headless stand-in for a follower's behaviour-tree runner.
#[derive(Clone, Debug)]
pub struct NpcBrain {
    running: Option<BehaviorToken>,
    following: bool,
    assigned: Option<NodeId>,
    last_stop_reason: Option<String>,
    blackboard: BTreeMap<String, BlackboardValue>,
}

impl NpcBrain {
    fn follower() -> Self {
        Self {
            running: Some(BehaviorToken::new(IDLE_BEHAVIOR)),
            following: true,
            assigned: None,
            last_stop_reason: None,
            blackboard: BTreeMap::new(),
        }
    }

    /// Behaviour currently running.
    #[must_use]
    pub fn running(&self) -> Option<&BehaviorToken> {
        self.running.as_ref()
    }

    /// Reports whether the NPC follows the player.
    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.following
    }

    /// Node the NPC works at.
    #[must_use]
    pub const fn assigned_node(&self) -> Option<NodeId> {
        self.assigned
    }

    /// Reason given the last time the running behaviour was stopped.
    #[must_use]
    pub fn last_stop_reason(&self) -> Option<&str> {
        self.last_stop_reason.as_deref()
    }

    /// Blackboard entry stored under `key`.
    #[must_use]
    pub fn blackboard_value(&self, key: &str) -> Option<&BlackboardValue> {
        self.blackboard.get(key)
    }
}

impl BehaviorController for NpcBrain {
    fn run_behavior(&mut self, token: &BehaviorToken) {
        self.running = Some(token.clone());
    }

    fn stop_behavior(&mut self, reason: &str) {
        self.running = None;
        self.last_stop_reason = Some(reason.to_owned());
    }

    fn current_behavior(&self) -> Option<BehaviorToken> {
        self.running.clone()
    }

    fn set_blackboard_value(&mut self, key: &str, value: BlackboardValue) {
        let _ = self.blackboard.insert(key.to_owned(), value);
    }

    fn follow_player(&mut self, follow: bool) {
        self.following = follow;
    }
}

/// The player's followers, recruited at random for node work.
#[derive(Debug)]
pub(crate) struct NpcRoster {
    npcs: BTreeMap<NpcId, NpcBrain>,
    rng: ChaCha8Rng,
}

impl NpcRoster {
    pub(crate) fn new(followers: u32, rng: ChaCha8Rng) -> Self {
        Self {
            npcs: (1..=followers)
                .map(|id| (NpcId::new(id), NpcBrain::follower()))
                .collect(),
            rng,
        }
    }

    pub(crate) fn get(&self, npc: NpcId) -> Option<&NpcBrain> {
        self.npcs.get(&npc)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (NpcId, &NpcBrain)> + '_ {
        self.npcs.iter().map(|(id, brain)| (*id, brain))
    }
}

impl Crew for NpcRoster {
    fn recruit_follower(&mut self) -> Option<NpcId> {
        let npc = self
            .npcs
            .iter()
            .filter(|(_, brain)| brain.assigned.is_none())
            .map(|(id, _)| *id)
            .choose(&mut self.rng)?;
        trace!(npc = npc.get(), "follower_recruited");
        Some(npc)
    }

    fn controller(&mut self, npc: NpcId) -> Option<&mut dyn BehaviorController> {
        self.npcs
            .get_mut(&npc)
            .map(|brain| brain as &mut dyn BehaviorController)
    }

    fn assign(&mut self, npc: NpcId, node: Option<NodeId>) {
        if let Some(brain) = self.npcs.get_mut(&npc) {
            brain.assigned = node;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn assigned_followers_are_not_recruited_again() {
        let mut roster = NpcRoster::new(3, ChaCha8Rng::seed_from_u64(5));
        let mut recruited = Vec::new();
        while let Some(npc) = roster.recruit_follower() {
            roster.assign(npc, Some(NodeId::new(npc.get())));
            recruited.push(npc);
        }
        recruited.sort();
        assert_eq!(recruited, vec![NpcId::new(1), NpcId::new(2), NpcId::new(3)]);

        roster.assign(NpcId::new(2), None);
        assert_eq!(roster.recruit_follower(), Some(NpcId::new(2)));
    }

    #[test]
    fn followers_start_idle_and_following() {
        let roster = NpcRoster::new(1, ChaCha8Rng::seed_from_u64(0));
        let brain = roster.get(NpcId::new(1)).expect("follower");
        assert!(brain.is_following());
        assert_eq!(brain.running(), Some(&BehaviorToken::new(IDLE_BEHAVIOR)));
        assert_eq!(roster.iter().count(), 1);
    }
}
