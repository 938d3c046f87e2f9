#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Bulwark wave and hazard simulation.
//!
//! The world owns every timer, actor and collaborator of a scenario. Adapters
//! mutate it only through [`apply`] and observe it through [`query`] and the
//! events `apply` emits.

mod config;
mod enemies;
mod roster;
mod walls;

use std::{collections::BTreeMap, time::Duration};

use bulwark_core::{
    Command, Damageable, EnemyId, Event, EventBus, GateId, Interactable, NodeId, ResourceTag,
    SpawnerNumber, SubscriberId, TimerAction, TimerService, Topic, Vec3, WallId,
};
use bulwark_system_enemies::EnemyRegistry;
use bulwark_system_hazard::{Config as NodeConfigParams, Delivery, NodeInteraction, NodeSlot};
use bulwark_system_orchestration::{Config as OrchestratorConfig, WaveOrchestrator};
use bulwark_system_scheduler::{Expiry, Scheduler};
use bulwark_system_spawning::{Config as SpawnerParams, WaveSpawner};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, trace};

pub use config::{
    ConfigError, GateConfig, HazardEscalationSettings, NodeConfig, ScenarioConfig, SpawnerConfig,
    WallConfig,
};
pub use roster::NpcBrain;
pub use walls::{BorderWall, Gate};

use enemies::EnemyStore;
use roster::NpcRoster;
use walls::WallSet;

const ROSTER_STREAM: u64 = 1;

/// Represents the authoritative simulation state.
#[derive(Debug)]
pub struct World {
    timers: Scheduler<TimerAction>,
    bus: EventBus,
    attack_listener: SubscriberId,
    difficulty_listener: SubscriberId,
    orchestrator: WaveOrchestrator,
    spawners: BTreeMap<SpawnerNumber, WaveSpawner>,
    enemies: EnemyStore,
    registry: EnemyRegistry,
    walls: WallSet,
    nodes: BTreeMap<NodeId, NodeSlot>,
    gates: BTreeMap<GateId, Gate>,
    roster: NpcRoster,
    rng: ChaCha8Rng,
    player: Option<Vec3>,
    ui_open: bool,
}

impl World {
    /// Builds a world from a validated scenario.
    pub fn from_config(config: &ScenarioConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut orchestrator = WaveOrchestrator::new(
            OrchestratorConfig::new(config.wave.clone(), config.spawners_active_per_wave.clone())
                .with_lock_radius(config.lock_radius)
                .with_escalation(config.hazards.into()),
        );
        let mut spawners = BTreeMap::new();
        for spawner in &config.spawners {
            let mut params = SpawnerParams::new(spawner.number, spawner.location);
            if let Some(settings) = &spawner.settings {
                params = params.with_override(settings.clone());
            }
            let _ = orchestrator.register_spawner(spawner.number, spawner.location);
            let _ = spawners.insert(spawner.number, WaveSpawner::new(params));
        }

        let nodes = config
            .nodes
            .iter()
            .map(|node| {
                let params = NodeConfigParams::new(
                    node.id,
                    node.location,
                    node.max_health,
                    node.hazard.clone(),
                    node.work_behavior.clone(),
                );
                (node.id, NodeSlot::new(params))
            })
            .collect();
        let gates = config
            .gates
            .iter()
            .map(|gate| (gate.id, Gate::new(gate)))
            .collect();

        let mut roster_rng = ChaCha8Rng::seed_from_u64(config.seed);
        roster_rng.set_stream(ROSTER_STREAM);

        let mut bus = EventBus::new();
        let attack_listener = bus.subscribe(Topic::EnemyAttacked);
        let difficulty_listener = bus.subscribe(Topic::DifficultyIncreasing);

        info!(
            seed = config.seed,
            spawners = config.spawners.len(),
            walls = config.walls.len(),
            nodes = config.nodes.len(),
            followers = config.followers,
            "world_created"
        );
        Ok(Self {
            timers: Scheduler::new(),
            bus,
            attack_listener,
            difficulty_listener,
            orchestrator,
            spawners,
            enemies: EnemyStore::new(config.archetypes.clone()),
            registry: EnemyRegistry::new(),
            walls: WallSet::new(&config.walls),
            nodes,
            gates,
            roster: NpcRoster::new(config.followers, roster_rng),
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            player: config.player,
            ui_open: false,
        })
    }

    fn advance(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        out_events.push(Event::TimeAdvanced { dt });
        if self.ui_open {
            self.timers.pause_all();
            return;
        }

        self.steer_enemies(dt);

        let until = self.timers.now().saturating_add(dt);
        while let Some(expiry) = self.timers.pop_due(until) {
            self.dispatch(expiry, out_events);
            self.route_bus(out_events);
        }
        self.timers.settle(until);
    }

    fn steer_enemies(&mut self, dt: Duration) {
        let standing = self.walls.standing();
        let active: Vec<EnemyId> = self.registry.iter().collect();
        for enemy in active {
            let Some(agent) = self.enemies.get_mut(enemy) else {
                continue;
            };
            if agent.target_wall().is_none() {
                let _ = agent.acquire_nearest_wall(standing.iter().copied(), &self.walls);
            }
            agent.tick(dt, &self.walls, &mut self.timers);
        }
    }

    fn dispatch(&mut self, expiry: Expiry<TimerAction>, out_events: &mut Vec<Event>) {
        trace!(action = ?expiry.payload, fire_at = ?expiry.fire_at, "timer_fired");
        match expiry.payload {
            TimerAction::StartNextWave => self.start_next_wave(out_events),
            TimerAction::ShowWaveWarning => {
                if let Some(lead_time) = self.orchestrator.show_warning(expiry.handle) {
                    out_events.push(Event::WaveWarning { lead_time });
                }
            }
            TimerAction::SpawnEnemy { spawner } => {
                let Some(source) = self.spawners.get_mut(&spawner) else {
                    self.timers.cancel(expiry.handle);
                    return;
                };
                let mut emitted = Vec::new();
                let spawned = source.spawn_enemy(
                    &mut self.rng,
                    &mut self.timers,
                    &mut self.enemies,
                    &mut self.registry,
                    &mut emitted,
                );
                if let Some(enemy) = spawned {
                    let standing = self.walls.standing();
                    if let Some(agent) = self.enemies.get_mut(enemy) {
                        let _ = agent.acquire_nearest_wall(standing, &self.walls);
                    }
                }
                self.emit(emitted, out_events);
            }
            TimerAction::EnemyAttack { enemy } => self.resolve_attack(enemy, expiry, out_events),
            TimerAction::TriggerHazard { node } => {
                let Some(slot) = self.nodes.get_mut(&node) else {
                    return;
                };
                if let Some(quantity) = slot.trigger_hazard(&mut self.rng, &mut self.roster) {
                    out_events.push(Event::HazardTriggered { node, quantity });
                }
            }
        }
    }

    fn start_next_wave(&mut self, out_events: &mut Vec<Event>) {
        let gates: Vec<(GateId, Vec3)> = self
            .gates
            .values()
            .map(|gate| (gate.id(), gate.position()))
            .collect();
        let Some(plan) =
            self.orchestrator
                .start_next_wave(self.player, &gates, &mut self.rng, &mut self.timers)
        else {
            return;
        };

        out_events.push(Event::WaveStarted {
            wave: plan.wave,
            excluded_zone: plan.excluded_zone,
            zones: plan.zones.clone(),
        });
        out_events.extend(
            plan.skipped
                .iter()
                .map(|zone| Event::SpawnerSkipped { zone: *zone }),
        );

        let base = self.orchestrator.settings().clone();
        for activation in plan.activations {
            let mut emitted = Vec::new();
            if let Some(spawner) = self.spawners.get_mut(&activation.spawner) {
                spawner.spawn_wave(plan.wave, &base, &mut self.timers, &mut emitted);
            }
            for gate in activation.gates_to_lock {
                if self.gates.get_mut(&gate).is_some_and(Gate::lock) {
                    emitted.push(Event::GateLocked { gate });
                }
            }
            self.emit(emitted, out_events);
        }
    }

    fn resolve_attack(
        &mut self,
        enemy: EnemyId,
        expiry: Expiry<TimerAction>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(agent) = self.enemies.get(enemy) else {
            self.timers.cancel(expiry.handle);
            return;
        };
        let Some(hit) = agent.attack() else {
            return;
        };
        let outcome = match self.walls.get_mut(hit.wall) {
            Some(wall) if !wall.is_disabled() => wall.apply_damage(hit.damage),
            _ => return,
        };

        self.emit(
            vec![Event::EnemyAttacked {
                enemy,
                wall: hit.wall,
                damage: hit.damage,
            }],
            out_events,
        );
        if outcome.is_fatal() {
            out_events.push(Event::WallDisabled { wall: hit.wall });
            self.retarget_attackers(hit.wall);
        }
    }

    fn retarget_attackers(&mut self, wall: WallId) {
        let standing = self.walls.standing();
        let active: Vec<EnemyId> = self.registry.iter().collect();
        for enemy in active {
            let Some(agent) = self.enemies.get_mut(enemy) else {
                continue;
            };
            if agent.target_wall() != Some(wall) {
                continue;
            }
            let next = agent.lose_target(standing.iter().copied(), &self.walls, &mut self.timers);
            debug!(
                enemy = enemy.get(),
                lost = wall.get(),
                next = ?next.map(|wall| wall.get()),
                "enemy_retargeted"
            );
        }
    }

    /// Appends `events` to the output, publishing topic events on the bus.
    fn emit(&mut self, events: Vec<Event>, out_events: &mut Vec<Event>) {
        for event in events {
            if event.topic().is_some() {
                self.bus.publish(event.clone());
            }
            out_events.push(event);
        }
    }

    fn route_bus(&mut self, out_events: &mut Vec<Event>) {
        while self.bus.has_pending() {
            for delivery in self.bus.drain() {
                if delivery.subscriber == self.attack_listener {
                    self.arm_hazards(out_events);
                } else if delivery.subscriber == self.difficulty_listener {
                    self.escalate_hazards(out_events);
                }
            }
        }
    }

    fn arm_hazards(&mut self, out_events: &mut Vec<Event>) {
        let candidates: Vec<(NodeId, bool)> = self
            .nodes
            .values()
            .map(|slot| (slot.id(), slot.is_eligible_for_hazard()))
            .collect();
        for node in self
            .orchestrator
            .on_enemy_attack_received(&mut self.rng, &candidates)
        {
            let Some(slot) = self.nodes.get_mut(&node) else {
                continue;
            };
            if let Some(delay) = slot.start_hazard_timer(&mut self.rng, &mut self.timers) {
                out_events.push(Event::HazardScheduled { node, delay });
            }
        }
    }

    fn escalate_hazards(&mut self, out_events: &mut Vec<Event>) {
        let working = self.nodes.values().filter(|slot| slot.is_working()).count();
        if let Some(escalation) = self.orchestrator.on_difficulty_increasing(working) {
            out_events.push(Event::HazardEscalated {
                trigger_chance: escalation.trigger_chance,
                max_hazards_per_attack: escalation.max_hazards_per_attack,
            });
        }
    }

    fn set_ui_open(&mut self, open: bool) {
        if self.ui_open == open {
            return;
        }
        self.ui_open = open;
        if open {
            self.timers.pause_all();
        } else {
            self.timers.resume_all();
        }
        debug!(open, "ui_toggled");
    }

    fn interact_with_node(&mut self, node: NodeId, out_events: &mut Vec<Event>) {
        let Some(slot) = self.nodes.get_mut(&node) else {
            return;
        };
        match slot.interact(&mut self.roster, &mut self.timers) {
            NodeInteraction::Ignored => {}
            NodeInteraction::Assigned { npc } => {
                out_events.push(Event::NodeOccupied { node, npc });
            }
            NodeInteraction::Vacated { npc } => {
                out_events.push(Event::NodeVacated { node, npc });
            }
            NodeInteraction::NoFollowerAvailable => {
                out_events.push(Event::NoFollowerAvailable { node });
            }
        }
    }

    fn deliver_resources(
        &mut self,
        node: NodeId,
        tag: &ResourceTag,
        quantity: u32,
        out_events: &mut Vec<Event>,
    ) {
        let Some(slot) = self.nodes.get_mut(&node) else {
            return;
        };
        match slot.deliver(tag, quantity, &mut self.roster) {
            Delivery::Ignored => {}
            Delivery::Outstanding(remaining) => {
                out_events.push(Event::ResourcesOutstanding { node, remaining });
            }
            Delivery::Resolved => out_events.push(Event::HazardResolved { node }),
        }
    }

    fn damage_node(&mut self, node: NodeId, amount: f32, out_events: &mut Vec<Event>) {
        let Some(slot) = self.nodes.get_mut(&node) else {
            return;
        };
        if slot.is_disabled() || !slot.apply_damage(amount).is_fatal() {
            return;
        }
        if let Some(npc) = slot.disable(&mut self.roster, &mut self.timers) {
            out_events.push(Event::NodeVacated { node, npc });
        }
        out_events.push(Event::NodeDisabled { node });
    }

    fn damage_enemy(&mut self, enemy: EnemyId, amount: f32, out_events: &mut Vec<Event>) {
        let Some(agent) = self.enemies.get_mut(enemy) else {
            return;
        };
        if !agent.apply_damage(amount).is_fatal() {
            return;
        }
        agent.cancel_timers(&mut self.timers);
        let _ = self.enemies.remove(enemy);
        let _ = self.registry.unregister(enemy);
        info!(enemy = enemy.get(), "enemy_died");
        out_events.push(Event::EnemyDied { enemy });
    }

    fn teardown(&mut self, out_events: &mut Vec<Event>) {
        self.orchestrator.teardown(&mut self.timers);
        for spawner in self.spawners.values_mut() {
            spawner.teardown(&mut self.timers);
        }
        let active: Vec<EnemyId> = self.registry.iter().collect();
        for enemy in active {
            if let Some(agent) = self.enemies.get_mut(enemy) {
                agent.cancel_timers(&mut self.timers);
            }
        }
        for slot in self.nodes.values_mut() {
            slot.cancel_hazard_timer(&mut self.timers);
        }
        self.registry.teardown();
        info!(remaining_timers = self.timers.active_count(), "world_torn_down");
        out_events.push(Event::TornDown);
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::StartWaves => {
            if world.orchestrator.begin(&mut world.timers) {
                out_events.push(Event::WavesStarted);
            }
        }
        Command::Teardown => world.teardown(out_events),
        Command::Tick { dt } => world.advance(dt, out_events),
        Command::SetUiOpen { open } => world.set_ui_open(open),
        Command::SetPlayerPosition { position } => world.player = position,
        Command::InteractWithNode { node } => world.interact_with_node(node, out_events),
        Command::DeliverResources {
            node,
            tag,
            quantity,
        } => world.deliver_resources(node, &tag, quantity, out_events),
        Command::OfferHealingResources {
            node,
            tag,
            quantity,
        } => {
            let Some(slot) = world.nodes.get_mut(&node) else {
                return;
            };
            if slot.accept_healing(&tag, quantity) > 0 {
                out_events.push(Event::NodeHealed {
                    node,
                    health: slot.health().current(),
                });
            }
        }
        Command::DamageNode { node, amount } => world.damage_node(node, amount, out_events),
        Command::DamageEnemy { enemy, amount } => world.damage_enemy(enemy, amount, out_events),
        Command::AdjustEnemyMaxHealth { value, is_adding } => {
            let affected = world
                .registry
                .adjust_max_health_for_all(&mut world.enemies, value, is_adding);
            out_events.push(Event::EnemyStatsAdjusted { affected });
        }
        Command::TempAdjustEnemyMaxHealth { value, is_adding } => {
            let affected = world
                .registry
                .temp_adjust_max_health_for_all(&mut world.enemies, value, is_adding);
            out_events.push(Event::EnemyStatsAdjusted { affected });
        }
        Command::ResetEnemyTempMaxHealth => {
            let affected = world
                .registry
                .reset_temp_max_health_for_all(&mut world.enemies);
            out_events.push(Event::EnemyStatsAdjusted { affected });
        }
    }
}

/// Read-only views over the world.
pub mod query {
    use std::time::Duration;

    use bulwark_core::{EnemyId, GateId, NodeId, NpcId, SpawnerNumber, Vec3, WallId};
    use bulwark_system_enemies::EnemyAgent;
    use bulwark_system_hazard::NodeSlot;
    use bulwark_system_orchestration::{HazardEscalation, WavePhase};
    use bulwark_system_spawning::WaveSpawner;

    use super::{BorderWall, Gate, NpcBrain, World};

    /// Simulation clock.
    #[must_use]
    pub fn clock(world: &World) -> Duration {
        world.timers.now()
    }

    /// Number of armed, unpaused timers.
    #[must_use]
    pub fn active_timers(world: &World) -> usize {
        world.timers.active_count()
    }

    /// Number of waves started so far.
    #[must_use]
    pub fn wave_count(world: &World) -> u32 {
        world.orchestrator.wave_count()
    }

    /// Lifecycle phase of the wave cycle.
    #[must_use]
    pub fn wave_phase(world: &World) -> WavePhase {
        world.orchestrator.phase()
    }

    /// Current hazard trigger chance and per-attack cap.
    #[must_use]
    pub fn hazard_escalation(world: &World) -> HazardEscalation {
        world.orchestrator.escalation()
    }

    /// Reports whether the modal UI is open.
    #[must_use]
    pub fn is_ui_open(world: &World) -> bool {
        world.ui_open
    }

    /// Last reported player position.
    #[must_use]
    pub fn player_position(world: &World) -> Option<Vec3> {
        world.player
    }

    /// Enemies currently tracked by the registry, in registry order.
    #[must_use]
    pub fn active_enemies(world: &World) -> Vec<EnemyId> {
        world.registry.iter().collect()
    }

    /// Enemy actor with the provided identifier.
    #[must_use]
    pub fn enemy(world: &World, enemy: EnemyId) -> Option<&EnemyAgent> {
        world.enemies.get(enemy)
    }

    /// Every enemy actor still present in the world, tracked or not.
    pub fn enemies(world: &World) -> impl Iterator<Item = &EnemyAgent> + '_ {
        world.enemies.iter()
    }

    /// Wave spawner with the provided number.
    #[must_use]
    pub fn spawner(world: &World, number: SpawnerNumber) -> Option<&WaveSpawner> {
        world.spawners.get(&number)
    }

    /// Border wall with the provided identifier.
    #[must_use]
    pub fn wall(world: &World, wall: WallId) -> Option<&BorderWall> {
        world.walls.get(wall)
    }

    /// Every border wall, in identifier order.
    pub fn walls(world: &World) -> impl Iterator<Item = &BorderWall> + '_ {
        world.walls.iter()
    }

    /// Node slot with the provided identifier.
    #[must_use]
    pub fn node(world: &World, node: NodeId) -> Option<&NodeSlot> {
        world.nodes.get(&node)
    }

    /// Every node slot, in identifier order.
    pub fn nodes(world: &World) -> impl Iterator<Item = &NodeSlot> + '_ {
        world.nodes.values()
    }

    /// Gate with the provided identifier.
    #[must_use]
    pub fn gate(world: &World, gate: GateId) -> Option<&Gate> {
        world.gates.get(&gate)
    }

    /// Follower NPC with the provided identifier.
    #[must_use]
    pub fn npc(world: &World, npc: NpcId) -> Option<&NpcBrain> {
        world.roster.get(npc)
    }

    /// Every follower NPC, in identifier order.
    pub fn npcs(world: &World) -> impl Iterator<Item = (NpcId, &NpcBrain)> + '_ {
        world.roster.iter()
    }
}
