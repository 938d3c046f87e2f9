#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Bulwark simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and the per-actor systems. Adapters submit [`Command`]
//! values describing desired mutations, the world executes those commands via
//! its `apply` entry point, and then broadcasts [`Event`] values describing what
//! happened. Systems never reach into ambient global state: every collaborator
//! they need (timers, spatial queries, actor spawning, NPC behaviour) is passed
//! in through one of the capability traits declared here.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod bus;
mod health;
mod settings;

pub use bus::{Delivery, EventBus, SubscriberId, Topic};
pub use glam::{Vec2, Vec3};
pub use health::{DamageOutcome, Health};
pub use settings::{EnemyArchetype, HazardSpec, SettingsError, WaveSettings};

/// Damage dealt to a wall by a single successful enemy attack.
pub const ENEMY_ATTACK_DAMAGE: f32 = 10.0;

/// Blackboard key under which an assigned node is exposed to its occupant.
pub const ASSIGNED_NODE_KEY: &str = "AssignedNode";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Arms the repeating wave timer and the first warning timer.
    StartWaves,
    /// Cancels every timer owned by the simulation and clears the enemy registry.
    Teardown,
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports whether a modal UI is open; gameplay freezes while it is.
    SetUiOpen {
        /// `true` while the UI is visible.
        open: bool,
    },
    /// Updates the player's position, or clears it when the player is absent.
    SetPlayerPosition {
        /// New player position in world units.
        position: Option<Vec3>,
    },
    /// The player interacts with a node slot to assign or release a worker.
    InteractWithNode {
        /// Node the player interacted with.
        node: NodeId,
    },
    /// The player delivers resources toward a node's outstanding hazard.
    DeliverResources {
        /// Node receiving the resources.
        node: NodeId,
        /// Kind of resource delivered.
        tag: ResourceTag,
        /// Number of resource units delivered.
        quantity: u32,
    },
    /// The player offers healing resources to a damaged node.
    OfferHealingResources {
        /// Node receiving the resources.
        node: NodeId,
        /// Kind of resource offered.
        tag: ResourceTag,
        /// Number of resource units available to the node.
        quantity: u32,
    },
    /// Applies damage to a node slot.
    DamageNode {
        /// Node receiving the damage.
        node: NodeId,
        /// Amount of damage to apply.
        amount: f32,
    },
    /// Applies damage to an enemy.
    DamageEnemy {
        /// Enemy receiving the damage.
        enemy: EnemyId,
        /// Amount of damage to apply.
        amount: f32,
    },
    /// Permanently adjusts the maximum health of every active enemy.
    AdjustEnemyMaxHealth {
        /// Magnitude of the adjustment.
        value: f32,
        /// Whether the value is added (`true`) or subtracted (`false`).
        is_adding: bool,
    },
    /// Temporarily adjusts the maximum health of every active enemy.
    TempAdjustEnemyMaxHealth {
        /// Magnitude of the adjustment.
        value: f32,
        /// Whether the value is added (`true`) or subtracted (`false`).
        is_adding: bool,
    },
    /// Removes every temporary maximum health adjustment from active enemies.
    ResetEnemyTempMaxHealth,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// The wave cycle timers were armed.
    WavesStarted,
    /// Every simulation timer was cancelled.
    TornDown,
    /// The next wave will start after the provided lead time.
    WaveWarning {
        /// Time remaining until the wave spawns.
        lead_time: Duration,
    },
    /// A wave started and the listed spawners were selected.
    WaveStarted {
        /// Index of the wave that started.
        wave: u32,
        /// Zone excluded because the player stands in it.
        excluded_zone: Option<Zone>,
        /// Zones drawn for the wave, in selection order.
        zones: Vec<Zone>,
    },
    /// A selected zone had no registered spawner and was skipped.
    SpawnerSkipped {
        /// Zone that had no spawner.
        zone: Zone,
    },
    /// A spawner started emitting enemies for a wave.
    SpawnerActivated {
        /// Spawner that was activated.
        spawner: SpawnerNumber,
        /// Index of the wave being spawned.
        wave: u32,
        /// Number of enemies the spawner will emit.
        enemies_to_spawn: u32,
    },
    /// A spawner reached a difficulty milestone.
    DifficultyIncreasing {
        /// Spawner reporting the milestone.
        spawner: SpawnerNumber,
    },
    /// Every spawner reported a milestone and hazard pressure increased.
    HazardEscalated {
        /// New chance, in percent, that an enemy attack triggers hazards.
        trigger_chance: f32,
        /// New maximum number of hazards armed per attack.
        max_hazards_per_attack: u32,
    },
    /// An enemy was spawned by a wave spawner.
    EnemySpawned {
        /// Identifier assigned to the enemy.
        enemy: EnemyId,
        /// Spawner that emitted the enemy.
        spawner: SpawnerNumber,
        /// Location the enemy spawned at.
        position: Vec3,
    },
    /// An enemy attack landed on a wall.
    EnemyAttacked {
        /// Attacking enemy.
        enemy: EnemyId,
        /// Wall that was hit.
        wall: WallId,
        /// Damage applied to the wall.
        damage: f32,
    },
    /// An enemy died and left the simulation.
    EnemyDied {
        /// Enemy that died.
        enemy: EnemyId,
    },
    /// Bulk stat adjustment reached the listed number of enemies.
    EnemyStatsAdjusted {
        /// Number of enemies whose health ledger was updated.
        affected: usize,
    },
    /// A wall was destroyed.
    WallDisabled {
        /// Wall that was destroyed.
        wall: WallId,
    },
    /// A gate near an activated spawner was locked.
    GateLocked {
        /// Gate that was locked.
        gate: GateId,
    },
    /// A follower NPC was assigned to a node.
    NodeOccupied {
        /// Node that gained a worker.
        node: NodeId,
        /// NPC assigned to the node.
        npc: NpcId,
    },
    /// A node released its worker.
    NodeVacated {
        /// Node that lost its worker.
        node: NodeId,
        /// NPC released from the node.
        npc: NpcId,
    },
    /// The player interacted with a free node but no follower was available.
    NoFollowerAvailable {
        /// Node the player interacted with.
        node: NodeId,
    },
    /// A node's health reached zero and it was disabled.
    NodeDisabled {
        /// Node that was disabled.
        node: NodeId,
    },
    /// A node accepted healing resources.
    NodeHealed {
        /// Node that was healed.
        node: NodeId,
        /// Health after healing.
        health: f32,
    },
    /// A hazard timer was armed on a node.
    HazardScheduled {
        /// Node whose hazard was scheduled.
        node: NodeId,
        /// Delay until the hazard triggers.
        delay: Duration,
    },
    /// A hazard became active on a node.
    HazardTriggered {
        /// Node whose hazard triggered.
        node: NodeId,
        /// Number of resources required to resolve the hazard.
        quantity: u32,
    },
    /// A delivery reduced, but did not clear, a node's outstanding need.
    ResourcesOutstanding {
        /// Node still waiting for resources.
        node: NodeId,
        /// Remaining quantity required.
        remaining: u32,
    },
    /// A node's hazard was resolved.
    HazardResolved {
        /// Node whose hazard was resolved.
        node: NodeId,
    },
}

impl Event {
    /// Returns the event bus topic this event is published under, if any.
    #[must_use]
    pub const fn topic(&self) -> Option<Topic> {
        match self {
            Self::EnemyAttacked { .. } => Some(Topic::EnemyAttacked),
            Self::DifficultyIncreasing { .. } => Some(Topic::DifficultyIncreasing),
            _ => None,
        }
    }
}

/// Work scheduled on the timer service and dispatched by the world when due.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerAction {
    /// Repeating wave cadence driving the orchestrator.
    StartNextWave,
    /// One-shot warning fired ahead of the next wave.
    ShowWaveWarning,
    /// Per-enemy cadence of a wave spawner.
    SpawnEnemy {
        /// Spawner whose cadence fired.
        spawner: SpawnerNumber,
    },
    /// Repeating attack cadence of an enemy in range of its wall.
    EnemyAttack {
        /// Enemy whose attack fired.
        enemy: EnemyId,
    },
    /// One-shot hazard timer of a node slot.
    TriggerHazard {
        /// Node whose hazard timer fired.
        node: NodeId,
    },
}

/// Unique identifier assigned to an enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnemyId(u32);

impl EnemyId {
    /// Creates a new enemy identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a border wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WallId(u32);

impl WallId {
    /// Creates a new wall identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a node slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Creates a new node identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GateId(u32);

impl GateId {
    /// Creates a new gate identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a recruited NPC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NpcId(u32);

impl NpcId {
    /// Creates a new NPC identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Stable, designer-authored number of a wave spawner.
///
/// Spawner numbers order the orchestrator's registry; they are not array
/// indices and may contain gaps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpawnerNumber(u32);

impl SpawnerNumber {
    /// Creates a new spawner number.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the spawner number.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Handle to a timer armed on a [`TimerService`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Creates a timer handle from its raw value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Retrieves the raw value of the handle.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Angular bucket of the play area, numbered 0 through 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Zone(u8);

impl Zone {
    /// Number of zones the play area is divided into.
    pub const COUNT: u8 = 8;

    /// Creates a zone, returning `None` when the index is out of range.
    #[must_use]
    pub const fn new(index: u8) -> Option<Self> {
        if index < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Zero-based index of the zone.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0 as usize
    }

    /// Iterates every zone in ascending order.
    pub fn all() -> impl Iterator<Item = Zone> {
        (0..Self::COUNT).map(Zone)
    }
}

/// Enemy archetype name used to look up spawn statistics.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnemyKind(String);

impl EnemyKind {
    /// Creates an enemy kind from its archetype name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Archetype name of the kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Tag identifying a kind of carried resource.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceTag(String);

impl ResourceTag {
    /// Creates a resource tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Textual form of the tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reports whether the tag is empty and therefore matches nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Exact tag comparison; an empty tag never matches.
    #[must_use]
    pub fn matches_exact(&self, other: &ResourceTag) -> bool {
        !self.is_empty() && self.0 == other.0
    }
}

/// Opaque reference to an NPC behaviour asset run by a [`BehaviorController`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BehaviorToken(String);

impl BehaviorToken {
    /// Creates a behaviour token.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name of the behaviour asset.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Value written to an NPC blackboard.
#[derive(Clone, Debug, PartialEq)]
pub enum BlackboardValue {
    /// Reference to a node slot.
    Node(NodeId),
    /// Boolean flag.
    Flag(bool),
    /// Scalar value.
    Scalar(f32),
}

/// Axis-aligned box in world space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl Bounds {
    /// Creates a box from two corners, ordering each axis.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Closest point on or inside the box to `from`; zero distance when inside.
    #[must_use]
    pub fn closest_point(&self, from: Vec3) -> SurfacePoint {
        let point = from.clamp(self.min, self.max);
        SurfacePoint {
            point,
            distance: point.distance(from),
        }
    }
}

/// Result of a closest-point query against collision geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePoint {
    /// Closest point on the surface.
    pub point: Vec3,
    /// Distance from the query point to `point`.
    pub distance: f32,
}

/// Scheduling service that invokes payloads after a delay.
///
/// Arming a timer never blocks: control returns immediately and the payload
/// is handed back to the owner of the service once the delay elapses.
pub trait TimerService<T> {
    /// Arms a timer firing after `delay`, repeating every `delay` when requested.
    ///
    /// A zero delay arms nothing and yields a handle that is never active.
    fn schedule(&mut self, delay: Duration, repeating: bool, payload: T) -> TimerHandle;

    /// Cancels the timer. Unknown handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);

    /// Freezes the timer's remaining time. Unknown handles are ignored.
    fn pause(&mut self, handle: TimerHandle);

    /// Resumes a paused timer from its remaining time. Unknown handles are ignored.
    fn resume(&mut self, handle: TimerHandle);

    /// Reports whether the timer is armed and not paused.
    fn is_active(&self, handle: TimerHandle) -> bool;

    /// Reports whether the timer is armed but paused.
    fn is_paused(&self, handle: TimerHandle) -> bool;
}

/// Closest-point queries against wall collision geometry.
pub trait SpatialQuery {
    /// Returns the closest point on the wall's surface, or `None` when the wall is gone.
    fn closest_point_on_surface(&self, wall: WallId, from: Vec3) -> Option<SurfacePoint>;
}

/// Creates enemy actors in the world.
pub trait ActorSpawner {
    /// Spawns an enemy of `kind` at `location`; `None` when the kind cannot be spawned.
    fn spawn(&mut self, kind: &EnemyKind, location: Vec3) -> Option<EnemyId>;

    /// Records the spawner that emitted `enemy`.
    fn link_parent(&mut self, enemy: EnemyId, spawner: SpawnerNumber);
}

/// Narrow interface onto an NPC's behaviour-tree runner.
pub trait BehaviorController {
    /// Starts running the provided behaviour.
    fn run_behavior(&mut self, token: &BehaviorToken);

    /// Stops the running behaviour for the provided reason.
    fn stop_behavior(&mut self, reason: &str);

    /// Behaviour currently running, if any.
    fn current_behavior(&self) -> Option<BehaviorToken>;

    /// Writes a value to the NPC's blackboard.
    fn set_blackboard_value(&mut self, key: &str, value: BlackboardValue);

    /// Toggles whether the NPC follows the player around.
    fn follow_player(&mut self, follow: bool);
}

/// Source of worker NPCs available to node slots.
pub trait Crew {
    /// Picks a follower that is not assigned to any node, if one exists.
    fn recruit_follower(&mut self) -> Option<NpcId>;

    /// Behaviour controller of the NPC, if the NPC exists.
    fn controller(&mut self, npc: NpcId) -> Option<&mut dyn BehaviorController>;

    /// Records which node, if any, the NPC works at.
    fn assign(&mut self, npc: NpcId, node: Option<NodeId>);
}

/// Entities that keep a health ledger and can be damaged.
pub trait Damageable {
    /// Applies `amount` damage and reports the outcome.
    fn apply_damage(&mut self, amount: f32) -> DamageOutcome;

    /// Read-only access to the health ledger.
    fn health(&self) -> &Health;
}

/// Entities the player can interact with.
pub trait Interactable {
    /// Result of an interaction.
    type Outcome;

    /// Performs an interaction, drawing workers from `crew`.
    fn interact<S>(&mut self, crew: &mut dyn Crew, timers: &mut S) -> Self::Outcome
    where
        S: TimerService<TimerAction>;
}

/// Fire-and-forget presentation callbacks; the core never consumes a result.
pub trait PresentationHooks {
    /// Shows the wave warning for the provided lead time.
    fn show_wave_warning(&mut self, lead_time: Duration);

    /// Reacts to a node being disabled.
    fn on_node_disabled(&mut self, node: NodeId);

    /// Reacts to a wall being destroyed.
    fn on_wall_disabled(&mut self, wall: WallId);
}

/// Forwards the presentation-relevant subset of `events` to `hooks`.
pub fn forward_to_presentation<H>(events: &[Event], hooks: &mut H)
where
    H: PresentationHooks + ?Sized,
{
    for event in events {
        match event {
            Event::WaveWarning { lead_time } => hooks.show_wave_warning(*lead_time),
            Event::NodeDisabled { node } => hooks.on_node_disabled(*node),
            Event::WallDisabled { wall } => hooks.on_wall_disabled(*wall),
            _ => {}
        }
    }
}

/// Converts authored seconds into a duration, mapping negative or non-finite values to zero.
///
/// Values too large for a [`Duration`] saturate to [`Duration::MAX`].
#[must_use]
pub fn seconds(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
