use std::{collections::BTreeMap, time::Duration};

use bulwark_core::{
    BehaviorController, BehaviorToken, BlackboardValue, Crew, Damageable, HazardSpec,
    Interactable, NodeId, NpcId, ResourceTag, TimerAction, TimerService, Vec3, ASSIGNED_NODE_KEY,
};
use bulwark_system_hazard::{Config, Delivery, HazardPolicy, NodeInteraction, NodeSlot};
use bulwark_system_scheduler::Scheduler;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Debug, Default)]
struct Npc {
    running: Option<BehaviorToken>,
    following: bool,
    stops: Vec<String>,
    blackboard: Vec<(String, BlackboardValue)>,
    assigned: Option<NodeId>,
}

impl BehaviorController for Npc {
    fn run_behavior(&mut self, token: &BehaviorToken) {
        self.running = Some(token.clone());
    }

    fn stop_behavior(&mut self, reason: &str) {
        self.running = None;
        self.stops.push(reason.to_owned());
    }

    fn current_behavior(&self) -> Option<BehaviorToken> {
        self.running.clone()
    }

    fn set_blackboard_value(&mut self, key: &str, value: BlackboardValue) {
        self.blackboard.push((key.to_owned(), value));
    }

    fn follow_player(&mut self, follow: bool) {
        self.following = follow;
    }
}

#[derive(Default)]
struct Roster {
    npcs: BTreeMap<NpcId, Npc>,
}

impl Roster {
    fn with_followers(count: u32) -> Self {
        let mut roster = Self::default();
        for id in 1..=count {
            let _ = roster.npcs.insert(
                NpcId::new(id),
                Npc {
                    running: Some(BehaviorToken::new("wander")),
                    following: true,
                    ..Npc::default()
                },
            );
        }
        roster
    }
}

impl Crew for Roster {
    fn recruit_follower(&mut self) -> Option<NpcId> {
        self.npcs
            .iter()
            .find(|(_, npc)| npc.assigned.is_none())
            .map(|(id, _)| *id)
    }

    fn controller(&mut self, npc: NpcId) -> Option<&mut dyn BehaviorController> {
        self.npcs
            .get_mut(&npc)
            .map(|npc| npc as &mut dyn BehaviorController)
    }

    fn assign(&mut self, npc: NpcId, node: Option<NodeId>) {
        if let Some(npc) = self.npcs.get_mut(&npc) {
            npc.assigned = node;
        }
    }
}

fn spec() -> HazardSpec {
    HazardSpec {
        min_quantity: 1,
        max_quantity: 10,
        min_frequency: 5.0,
        max_frequency: 15.0,
        resource_tag: ResourceTag::new("scrap"),
        healing_resource_tag: ResourceTag::new("medkit"),
        health_per_resource: 50.0,
        hazard_behavior: Some(BehaviorToken::new("fetch_scrap")),
    }
}

fn node() -> NodeSlot {
    NodeSlot::new(Config::new(
        NodeId::new(1),
        Vec3::ZERO,
        200.0,
        spec(),
        BehaviorToken::new("operate_turbine"),
    ))
}

#[test]
fn triggered_need_stays_in_range_and_resolves_exactly() {
    for seed in 0..64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut policy = HazardPolicy::new(spec());

        let needed = policy.trigger(&mut rng).expect("need rolled");
        assert!((1..=10).contains(&needed));
        assert!(policy.is_active());

        assert_eq!(policy.deliver(&ResourceTag::new("scrap"), needed), Delivery::Resolved);
        assert_eq!(policy.current_needed(), 0);
        assert!(!policy.is_active());
    }
}

#[test]
fn need_is_never_rearmed_while_outstanding() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let mut timers = Scheduler::new();
    let mut policy = HazardPolicy::new(spec());

    let needed = policy.trigger(&mut rng).expect("need rolled");
    assert_eq!(policy.trigger(&mut rng), None);
    assert_eq!(policy.current_needed(), needed);
    assert_eq!(policy.schedule_next(NodeId::new(1), &mut rng, &mut timers), None);
    assert_eq!(timers.active_count(), 0);
}

#[test]
fn surplus_delivery_clamps_to_zero() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let mut policy = HazardPolicy::new(HazardSpec {
        min_quantity: 4,
        max_quantity: 4,
        ..spec()
    });
    let _ = policy.trigger(&mut rng);

    assert_eq!(
        policy.deliver(&ResourceTag::new("scrap"), 1),
        Delivery::Outstanding(3)
    );
    assert_eq!(policy.deliver(&ResourceTag::new("scrap"), u32::MAX), Delivery::Resolved);
    assert_eq!(policy.current_needed(), 0);
    assert_eq!(
        policy.deliver(&ResourceTag::new("scrap"), 2),
        Delivery::Ignored,
        "no credit carries over"
    );
}

#[test]
fn scheduled_delay_is_within_the_frequency_range() {
    for seed in 0..32 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut timers = Scheduler::new();
        let mut policy = HazardPolicy::new(spec());

        let delay = policy
            .schedule_next(NodeId::new(3), &mut rng, &mut timers)
            .expect("scheduled");
        assert!(delay >= Duration::from_secs(5) && delay <= Duration::from_secs(15));
        assert!(policy.is_scheduled());

        let fired = timers.advance(Duration::from_secs(16));
        assert_eq!(fired.len(), 1);
        assert_eq!(
            fired[0].payload,
            TimerAction::TriggerHazard {
                node: NodeId::new(3)
            }
        );
    }
}

#[test]
fn interaction_assigns_and_releases_a_follower() {
    let mut roster = Roster::with_followers(1);
    let mut timers = Scheduler::new();
    let mut slot = node();

    let outcome = slot.interact(&mut roster, &mut timers);
    assert_eq!(outcome, NodeInteraction::Assigned { npc: NpcId::new(1) });
    let npc = &roster.npcs[&NpcId::new(1)];
    assert_eq!(npc.running, Some(BehaviorToken::new("operate_turbine")));
    assert!(!npc.following);
    assert_eq!(npc.assigned, Some(NodeId::new(1)));
    assert_eq!(
        npc.blackboard,
        vec![(
            ASSIGNED_NODE_KEY.to_owned(),
            BlackboardValue::Node(NodeId::new(1))
        )]
    );
    assert_eq!(slot.previous_behavior(), Some(&BehaviorToken::new("wander")));

    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let _ = slot.start_hazard_timer(&mut rng, &mut timers);
    let pending = slot.hazard().timer().expect("timer armed");

    let outcome = slot.interact(&mut roster, &mut timers);
    assert_eq!(outcome, NodeInteraction::Vacated { npc: NpcId::new(1) });
    let npc = &roster.npcs[&NpcId::new(1)];
    assert_eq!(npc.running, Some(BehaviorToken::new("wander")));
    assert!(npc.following);
    assert_eq!(npc.assigned, None);
    assert!(!timers.is_active(pending));
    assert!(!slot.hazard().is_scheduled());
}

#[test]
fn interaction_without_followers_reports_it() {
    let mut roster = Roster::default();
    let mut timers = Scheduler::new();
    let mut slot = node();

    assert_eq!(
        slot.interact(&mut roster, &mut timers),
        NodeInteraction::NoFollowerAvailable
    );
    assert!(!slot.is_occupied());
}

#[test]
fn hazard_redirects_the_occupant_until_resolved() {
    let mut roster = Roster::with_followers(1);
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let mut slot = node();
    let _ = slot.interact(&mut roster, &mut timers);

    let needed = slot
        .trigger_hazard(&mut rng, &mut roster)
        .expect("need rolled");
    let npc = &roster.npcs[&NpcId::new(1)];
    assert_eq!(npc.stops, vec!["needs resources".to_owned()]);
    assert_eq!(npc.running, Some(BehaviorToken::new("fetch_scrap")));
    assert!(!slot.is_eligible_for_hazard());

    assert_eq!(
        slot.deliver(&ResourceTag::new("scrap"), needed, &mut roster),
        Delivery::Resolved
    );
    assert_eq!(
        roster.npcs[&NpcId::new(1)].running,
        Some(BehaviorToken::new("operate_turbine"))
    );
    assert!(slot.is_eligible_for_hazard());
}

#[test]
fn death_clears_the_hazard_and_releases_the_worker() {
    let mut roster = Roster::with_followers(1);
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut slot = node();
    let _ = slot.interact(&mut roster, &mut timers);
    let _ = slot.start_hazard_timer(&mut rng, &mut timers);
    let pending = slot.hazard().timer().expect("armed");

    assert!(slot.apply_damage(500.0).is_fatal());
    let released = slot.disable(&mut roster, &mut timers);

    assert_eq!(released, Some(NpcId::new(1)));
    assert!(slot.is_disabled());
    assert!(!timers.is_active(pending));
    assert_eq!(slot.hazard().current_needed(), 0);
    assert!(!slot.hazard().is_active() && !slot.hazard().is_scheduled());
    assert!(roster.npcs[&NpcId::new(1)].following);
    assert_eq!(
        slot.interact(&mut roster, &mut timers),
        NodeInteraction::Ignored
    );
}

#[test]
fn healing_reenables_and_leaves_surplus_units() {
    let mut roster = Roster::with_followers(1);
    let mut timers = Scheduler::new();
    let mut slot = node();
    let _ = slot.apply_damage(500.0);
    let _ = slot.disable(&mut roster, &mut timers);

    assert_eq!(slot.accept_healing(&ResourceTag::new("scrap"), 5), 0);
    assert_eq!(slot.accept_healing(&ResourceTag::new("medkit"), 10), 4);
    assert_eq!(slot.health().current(), 200.0);
    assert!(!slot.is_disabled());
    assert_eq!(slot.accept_healing(&ResourceTag::new("medkit"), 10), 0);
}

#[test]
fn healing_waits_for_the_hazard_to_clear() {
    let mut roster = Roster::with_followers(1);
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let mut slot = node();
    let _ = slot.interact(&mut roster, &mut timers);
    let _ = slot.apply_damage(75.0);
    let needed = slot.trigger_hazard(&mut rng, &mut roster).expect("need");

    assert_eq!(slot.accept_healing(&ResourceTag::new("medkit"), 3), 0);
    let _ = slot.deliver(&ResourceTag::new("scrap"), needed, &mut roster);
    assert_eq!(slot.accept_healing(&ResourceTag::new("medkit"), 3), 2);
    assert!(slot.health().is_full());
}
