//! Node slots: worker stations that host a hazard policy and a health ledger.

use std::time::Duration;

use bulwark_core::{
    BehaviorToken, BlackboardValue, Crew, DamageOutcome, Damageable, HazardSpec, Health,
    Interactable, NodeId, NpcId, ResourceTag, TimerAction, TimerService, Vec3, ASSIGNED_NODE_KEY,
};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::{Delivery, HazardPolicy};

const NEEDS_RESOURCES: &str = "needs resources";
const UNASSIGNED: &str = "unassigned";
const DISABLED: &str = "disabled";

/// Configuration parameters required to construct a node slot.
#[derive(Clone, Debug)]
pub struct Config {
    id: NodeId,
    location: Vec3,
    max_health: f32,
    hazard: HazardSpec,
    work_behavior: BehaviorToken,
}

impl Config {
    /// Creates a configuration for a node at `location`.
    #[must_use]
    pub fn new(
        id: NodeId,
        location: Vec3,
        max_health: f32,
        hazard: HazardSpec,
        work_behavior: BehaviorToken,
    ) -> Self {
        Self {
            id,
            location,
            max_health,
            hazard,
            work_behavior,
        }
    }
}

/// Outcome of the player interacting with a node slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeInteraction {
    /// The node is disabled and ignored the interaction.
    Ignored,
    /// A follower was assigned to the node.
    Assigned {
        /// NPC now working the node.
        npc: NpcId,
    },
    /// The node's worker was released.
    Vacated {
        /// NPC released from the node.
        npc: NpcId,
    },
    /// The node is free but no follower could be recruited.
    NoFollowerAvailable,
}

/// Worker station subject to randomised hazards.
#[derive(Clone, Debug)]
pub struct NodeSlot {
    id: NodeId,
    location: Vec3,
    occupant: Option<NpcId>,
    disabled: bool,
    health: Health,
    hazard: HazardPolicy,
    previous_behavior: Option<BehaviorToken>,
    work_behavior: BehaviorToken,
}

impl NodeSlot {
    /// Creates an unoccupied node at full health.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            id: config.id,
            location: config.location,
            occupant: None,
            disabled: false,
            health: Health::new(config.max_health),
            hazard: HazardPolicy::new(config.hazard),
            previous_behavior: None,
            work_behavior: config.work_behavior,
        }
    }

    /// Identifier of the node.
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// World location of the node.
    #[must_use]
    pub const fn location(&self) -> Vec3 {
        self.location
    }

    /// NPC working the node.
    #[must_use]
    pub const fn occupant(&self) -> Option<NpcId> {
        self.occupant
    }

    /// Reports whether an NPC works the node.
    #[must_use]
    pub const fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    /// Reports whether the node is disabled.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Hazard policy state.
    #[must_use]
    pub const fn hazard(&self) -> &HazardPolicy {
        &self.hazard
    }

    /// Behaviour the occupant ran before being assigned.
    #[must_use]
    pub fn previous_behavior(&self) -> Option<&BehaviorToken> {
        self.previous_behavior.as_ref()
    }

    /// Occupied, enabled and with neither an active nor a scheduled hazard.
    #[must_use]
    pub fn is_eligible_for_hazard(&self) -> bool {
        self.is_occupied()
            && !self.disabled
            && !self.hazard.is_active()
            && !self.hazard.is_scheduled()
    }

    /// Counts towards the occupied-node cap on hazards per attack.
    #[must_use]
    pub fn is_working(&self) -> bool {
        self.is_occupied() && !self.disabled
    }

    /// Arms the hazard trigger timer.
    pub fn start_hazard_timer<R, S>(&mut self, rng: &mut R, timers: &mut S) -> Option<Duration>
    where
        R: Rng + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
    {
        self.hazard.schedule_next(self.id, rng, timers)
    }

    /// Cancels a pending hazard timer; an outstanding need is kept.
    pub fn cancel_hazard_timer<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        self.hazard.cancel(timers);
    }

    /// Handles the hazard timer firing, redirecting the occupant to the hazard behaviour.
    pub fn trigger_hazard<R>(&mut self, rng: &mut R, crew: &mut dyn Crew) -> Option<u32>
    where
        R: Rng + ?Sized,
    {
        if self.disabled {
            return None;
        }
        let quantity = self.hazard.trigger(rng)?;
        info!(node = self.id.get(), quantity, "hazard_triggered");

        if let Some(npc) = self.occupant {
            if let Some(controller) = crew.controller(npc) {
                controller.stop_behavior(NEEDS_RESOURCES);
                if let Some(token) = &self.hazard.spec().hazard_behavior {
                    controller.run_behavior(token);
                }
            }
        }
        Some(quantity)
    }

    /// Delivers resources towards the outstanding need.
    ///
    /// Resolving the hazard puts the occupant back on the work behaviour.
    pub fn deliver(&mut self, tag: &ResourceTag, quantity: u32, crew: &mut dyn Crew) -> Delivery {
        if self.disabled {
            return Delivery::Ignored;
        }
        let delivery = self.hazard.deliver(tag, quantity);
        match delivery {
            Delivery::Ignored => {}
            Delivery::Outstanding(remaining) => {
                debug!(node = self.id.get(), remaining, "resources_outstanding");
            }
            Delivery::Resolved => {
                info!(node = self.id.get(), "hazard_resolved");
                if let Some(npc) = self.occupant {
                    if let Some(controller) = crew.controller(npc) {
                        controller.run_behavior(&self.work_behavior);
                    }
                }
            }
        }
        delivery
    }

    /// Consumes healing resources while the node is damaged and calm.
    ///
    /// Each unit restores the authored amount; units that would heal past the
    /// maximum are left with the player. Returns the units consumed.
    pub fn accept_healing(&mut self, tag: &ResourceTag, available: u32) -> u32 {
        let per_unit = self.hazard.spec().health_per_resource;
        if self.hazard.is_active()
            || self.health.is_full()
            || per_unit <= 0.0
            || !self.hazard.spec().healing_resource_tag.matches_exact(tag)
        {
            return 0;
        }

        let mut consumed = 0;
        while consumed < available && !self.health.is_full() {
            self.health.restore(per_unit);
            consumed += 1;
        }
        if consumed > 0 {
            self.disabled = false;
            debug!(
                node = self.id.get(),
                consumed,
                health = self.health.current(),
                "node_healed"
            );
        }
        consumed
    }

    /// Disables the node after its health ran out.
    ///
    /// The hazard is cleared, its timer cancelled and the occupant released.
    pub fn disable<S>(&mut self, crew: &mut dyn Crew, timers: &mut S) -> Option<NpcId>
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        self.disabled = true;
        self.hazard.reset(timers);
        warn!(node = self.id.get(), "node_disabled");
        self.release(crew, DISABLED)
    }

    fn release(&mut self, crew: &mut dyn Crew, reason: &str) -> Option<NpcId> {
        let npc = self.occupant.take()?;
        let previous = self.previous_behavior.take();
        if let Some(controller) = crew.controller(npc) {
            controller.stop_behavior(reason);
            if let Some(token) = &previous {
                controller.run_behavior(token);
            }
            controller.follow_player(true);
        }
        crew.assign(npc, None);
        Some(npc)
    }
}

impl Damageable for NodeSlot {
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome {
        self.health.take_damage(amount)
    }

    fn health(&self) -> &Health {
        &self.health
    }
}

impl Interactable for NodeSlot {
    type Outcome = NodeInteraction;

    fn interact<S>(&mut self, crew: &mut dyn Crew, timers: &mut S) -> NodeInteraction
    where
        S: TimerService<TimerAction>,
    {
        if self.disabled {
            return NodeInteraction::Ignored;
        }

        if self.occupant.is_some() {
            self.hazard.cancel(timers);
            return match self.release(crew, UNASSIGNED) {
                Some(npc) => {
                    debug!(node = self.id.get(), npc = npc.get(), "node_vacated");
                    NodeInteraction::Vacated { npc }
                }
                None => NodeInteraction::Ignored,
            };
        }

        let Some(npc) = crew.recruit_follower() else {
            warn!(node = self.id.get(), "no_follower_available");
            return NodeInteraction::NoFollowerAvailable;
        };
        if let Some(controller) = crew.controller(npc) {
            self.previous_behavior = controller.current_behavior();
            controller.follow_player(false);
            controller.run_behavior(&self.work_behavior);
            controller.set_blackboard_value(ASSIGNED_NODE_KEY, BlackboardValue::Node(self.id));
        }
        crew.assign(npc, Some(self.id));
        self.occupant = Some(npc);
        debug!(node = self.id.get(), npc = npc.get(), "node_occupied");
        NodeInteraction::Assigned { npc }
    }
}
