#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave orchestration: wave cadence, spawner selection and hazard escalation.
//!
//! The orchestrator is a pure decision maker. It arms and inspects its own
//! timers through the [`TimerService`] it is handed, but it never touches
//! spawners, gates or nodes directly; every decision is returned as a plan
//! that the world carries out.

mod zone;

use std::time::Duration;

use bulwark_core::{
    GateId, NodeId, SpawnerNumber, TimerAction, TimerHandle, TimerService, Vec2, Vec3,
    WaveSettings, Zone,
};
use rand::{seq::SliceRandom, Rng};
use tracing::{debug, info};

pub use zone::{player_zone, DEAD_ZONE_RADIUS};

/// Gates within this planar distance of an activated spawner are locked by default.
pub const DEFAULT_LOCK_RADIUS: f32 = 100.0;

/// Hazard pressure applied when enemies land attacks.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HazardEscalation {
    /// Chance, in percent, that an attack arms hazards.
    pub trigger_chance: f32,
    /// Largest number of hazards armed by a single attack.
    pub max_hazards_per_attack: u32,
    /// Percentage points added to the chance at each difficulty step.
    pub chance_step: f32,
    /// Hazards added to the per-attack cap at each difficulty step.
    pub count_step: u32,
}

impl Default for HazardEscalation {
    fn default() -> Self {
        Self {
            trigger_chance: 5.0,
            max_hazards_per_attack: 1,
            chance_step: 5.0,
            count_step: 1,
        }
    }
}

/// Configuration parameters required to construct the orchestrator.
#[derive(Clone, Debug)]
pub struct Config {
    settings: WaveSettings,
    active_per_wave: Vec<u32>,
    lock_radius: f32,
    escalation: HazardEscalation,
}

impl Config {
    /// Creates a configuration from the default wave settings and the per-wave spawner table.
    #[must_use]
    pub fn new(settings: WaveSettings, active_per_wave: Vec<u32>) -> Self {
        Self {
            settings,
            active_per_wave,
            lock_radius: DEFAULT_LOCK_RADIUS,
            escalation: HazardEscalation::default(),
        }
    }

    /// Overrides the gate lock radius.
    #[must_use]
    pub fn with_lock_radius(mut self, lock_radius: f32) -> Self {
        self.lock_radius = lock_radius;
        self
    }

    /// Overrides the initial hazard escalation parameters.
    #[must_use]
    pub fn with_escalation(mut self, escalation: HazardEscalation) -> Self {
        self.escalation = escalation;
        self
    }
}

/// Coarse lifecycle of the wave cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WavePhase {
    /// No wave timer is armed.
    Idle,
    /// The repeating wave timer is armed.
    WaveInProgress,
}

/// Spawner told to start a wave.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnerActivation {
    /// Zone the spawner was drawn for.
    pub zone: Zone,
    /// Number of the registered spawner.
    pub spawner: SpawnerNumber,
    /// Gates within the lock radius of the spawner.
    pub gates_to_lock: Vec<GateId>,
}

/// Decisions taken when a wave starts.
#[derive(Clone, Debug, PartialEq)]
pub struct WavePlan {
    /// Index of the wave.
    pub wave: u32,
    /// Zone excluded because the player stands in it.
    pub excluded_zone: Option<Zone>,
    /// Zones drawn, in selection order.
    pub zones: Vec<Zone>,
    /// Spawners to activate, in selection order.
    pub activations: Vec<SpawnerActivation>,
    /// Drawn zones without a registered spawner.
    pub skipped: Vec<Zone>,
}

/// Drives the wave cadence and escalates hazard pressure.
#[derive(Debug)]
pub struct WaveOrchestrator {
    settings: WaveSettings,
    active_per_wave: Vec<u32>,
    lock_radius: f32,
    escalation: HazardEscalation,
    spawners: Vec<(SpawnerNumber, Vec3)>,
    difficulty_reports: usize,
    wave_count: u32,
    wave_timer: Option<TimerHandle>,
    warning_timer: Option<TimerHandle>,
    phase: WavePhase,
}

impl WaveOrchestrator {
    /// Creates an idle orchestrator without registered spawners.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let mut escalation = config.escalation;
        escalation.trigger_chance = clamp_chance(escalation.trigger_chance);
        Self {
            settings: config.settings,
            active_per_wave: config.active_per_wave,
            lock_radius: config.lock_radius.max(0.0),
            escalation,
            spawners: Vec::new(),
            difficulty_reports: 0,
            wave_count: 0,
            wave_timer: None,
            warning_timer: None,
            phase: WavePhase::Idle,
        }
    }

    /// Default wave settings handed to spawners without an override.
    #[must_use]
    pub const fn settings(&self) -> &WaveSettings {
        &self.settings
    }

    /// Index of the next wave; increases by one per started wave.
    #[must_use]
    pub const fn wave_count(&self) -> u32 {
        self.wave_count
    }

    /// Current hazard escalation values.
    #[must_use]
    pub const fn escalation(&self) -> HazardEscalation {
        self.escalation
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> WavePhase {
        self.phase
    }

    /// Handle of the repeating wave timer.
    #[must_use]
    pub const fn wave_timer(&self) -> Option<TimerHandle> {
        self.wave_timer
    }

    /// Handle of the pending warning timer.
    #[must_use]
    pub const fn warning_timer(&self) -> Option<TimerHandle> {
        self.warning_timer
    }

    /// Registered spawners ordered by number; a zone index selects into this list.
    #[must_use]
    pub fn spawners(&self) -> &[(SpawnerNumber, Vec3)] {
        &self.spawners
    }

    /// Difficulty reports collected towards the next escalation step.
    #[must_use]
    pub const fn difficulty_reports(&self) -> usize {
        self.difficulty_reports
    }

    /// Adds a spawner, keeping the registry ordered by number.
    ///
    /// Returns `false` and leaves the registry untouched when the number is taken.
    pub fn register_spawner(&mut self, number: SpawnerNumber, location: Vec3) -> bool {
        match self
            .spawners
            .binary_search_by_key(&number, |(existing, _)| *existing)
        {
            Ok(_) => false,
            Err(index) => {
                self.spawners.insert(index, (number, location));
                true
            }
        }
    }

    /// Removes a spawner, reporting whether it was registered.
    pub fn unregister_spawner(&mut self, number: SpawnerNumber) -> bool {
        let before = self.spawners.len();
        self.spawners.retain(|(existing, _)| *existing != number);
        before != self.spawners.len()
    }

    /// Number of spawners requested for `wave`.
    ///
    /// Waves past the end of the table reuse its last entry; an empty table
    /// requests a single spawner.
    #[must_use]
    pub fn active_spawner_count(&self, wave: u32) -> u32 {
        let index = usize::try_from(wave).unwrap_or(usize::MAX);
        self.active_per_wave
            .get(index)
            .or_else(|| self.active_per_wave.last())
            .copied()
            .unwrap_or(1)
    }

    /// Arms the repeating wave timer and the first warning.
    ///
    /// Returns `false` when the cycle is already running.
    pub fn begin<S>(&mut self, timers: &mut S) -> bool
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        if self.wave_timer.is_some_and(|handle| is_live(timers, handle)) {
            return false;
        }
        self.wave_timer = Some(timers.schedule(
            self.settings.spawn_delay(),
            true,
            TimerAction::StartNextWave,
        ));
        self.arm_warning(timers);
        self.phase = WavePhase::WaveInProgress;
        info!(
            spawn_delay = ?self.settings.spawn_delay(),
            spawners = self.spawners.len(),
            "waves_started"
        );
        true
    }

    /// Starts the next wave when the wave timer fires.
    ///
    /// Nothing happens once the wave timer is gone. Otherwise zones are drawn
    /// without replacement from every zone but the player's, each drawn zone
    /// selects the spawner at that index of the ordered registry, and the next
    /// warning is armed.
    pub fn start_next_wave<R, S>(
        &mut self,
        player: Option<Vec3>,
        gates: &[(GateId, Vec3)],
        rng: &mut R,
        timers: &mut S,
    ) -> Option<WavePlan>
    where
        R: Rng + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
    {
        let wave_timer = self.wave_timer?;
        if !timers.is_active(wave_timer) {
            return None;
        }

        let wave = self.wave_count;
        let wanted = self.active_spawner_count(wave) as usize;
        let excluded_zone = player_zone(player);

        let mut candidates: Vec<Zone> = Zone::all()
            .filter(|zone| Some(*zone) != excluded_zone)
            .collect();
        let mut zones = Vec::with_capacity(wanted.min(candidates.len()));
        while zones.len() < wanted && !candidates.is_empty() {
            let index = rng.gen_range(0..candidates.len());
            zones.push(candidates.swap_remove(index));
        }

        let mut activations = Vec::new();
        let mut skipped = Vec::new();
        for zone in &zones {
            let Some((spawner, location)) = self.spawners.get(zone.index()).copied() else {
                debug!(zone = zone.index(), registered = self.spawners.len(), "spawner_skipped");
                skipped.push(*zone);
                continue;
            };
            let gates_to_lock = gates
                .iter()
                .filter(|(_, gate)| planar_distance(*gate, location) <= self.lock_radius)
                .map(|(id, _)| *id)
                .collect();
            activations.push(SpawnerActivation {
                zone: *zone,
                spawner,
                gates_to_lock,
            });
        }

        self.wave_count = self.wave_count.saturating_add(1);
        self.arm_warning(timers);

        info!(
            wave,
            excluded = ?excluded_zone.map(|zone| zone.index()),
            zones = ?zones.iter().map(Zone::index).collect::<Vec<_>>(),
            "wave_started"
        );
        Some(WavePlan {
            wave,
            excluded_zone,
            zones,
            activations,
            skipped,
        })
    }

    /// Handles the warning timer firing; returns the lead time to present.
    ///
    /// Expiries of any other timer than the pending warning are ignored.
    pub fn show_warning(&mut self, fired: TimerHandle) -> Option<Duration> {
        if self.warning_timer != Some(fired) {
            return None;
        }
        self.warning_timer = None;
        let lead_time = self.settings.warning_lead_time();
        info!(?lead_time, "wave_warning");
        Some(lead_time)
    }

    /// Decides which nodes get a hazard after an enemy attack landed.
    ///
    /// `nodes` pairs every node with its eligibility. A single roll against
    /// the trigger chance gates the whole attack; on success the nodes are
    /// shuffled and eligible ones are picked up to the per-attack cap.
    pub fn on_enemy_attack_received<R>(&self, rng: &mut R, nodes: &[(NodeId, bool)]) -> Vec<NodeId>
    where
        R: Rng + ?Sized,
    {
        let roll: f32 = rng.gen_range(0.0..=100.0);
        if roll > self.escalation.trigger_chance {
            return Vec::new();
        }

        let mut shuffled = nodes.to_vec();
        shuffled.shuffle(rng);
        let cap = self.escalation.max_hazards_per_attack as usize;
        let picked: Vec<NodeId> = shuffled
            .into_iter()
            .filter(|(_, eligible)| *eligible)
            .map(|(node, _)| node)
            .take(cap)
            .collect();
        debug!(roll, picked = picked.len(), "hazards_rolled");
        picked
    }

    /// Records a spawner's difficulty report.
    ///
    /// Once as many reports as registered spawners have arrived, the trigger
    /// chance and the per-attack cap advance by their steps. The chance is
    /// clamped to `[0, 100]` and the cap to `working_nodes`.
    pub fn on_difficulty_increasing(&mut self, working_nodes: usize) -> Option<HazardEscalation> {
        self.difficulty_reports = self.difficulty_reports.saturating_add(1);
        if self.difficulty_reports < self.spawners.len() {
            return None;
        }
        self.difficulty_reports = 0;

        let escalation = &mut self.escalation;
        escalation.trigger_chance = clamp_chance(escalation.trigger_chance + escalation.chance_step);
        let cap = u32::try_from(working_nodes).unwrap_or(u32::MAX);
        escalation.max_hazards_per_attack = escalation
            .max_hazards_per_attack
            .saturating_add(escalation.count_step)
            .min(cap);

        info!(
            trigger_chance = escalation.trigger_chance,
            max_hazards_per_attack = escalation.max_hazards_per_attack,
            "hazard_escalated"
        );
        Some(*escalation)
    }

    /// Cancels the wave and warning timers and returns to idle.
    pub fn teardown<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        for handle in [self.wave_timer.take(), self.warning_timer.take()]
            .into_iter()
            .flatten()
        {
            timers.cancel(handle);
        }
        self.phase = WavePhase::Idle;
        self.difficulty_reports = 0;
    }

    fn arm_warning<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        if let Some(previous) = self.warning_timer.take() {
            timers.cancel(previous);
        }
        let delay = self.settings.warning_delay();
        if delay.is_zero() {
            return;
        }
        self.warning_timer = Some(timers.schedule(delay, false, TimerAction::ShowWaveWarning));
    }
}

fn is_live<S>(timers: &S, handle: TimerHandle) -> bool
where
    S: TimerService<TimerAction> + ?Sized,
{
    timers.is_active(handle) || timers.is_paused(handle)
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec2::new(a.x, a.y).distance(Vec2::new(b.x, b.y))
}

fn clamp_chance(chance: f32) -> f32 {
    if chance.is_nan() {
        0.0
    } else {
        chance.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_count_clamps_to_the_last_table_entry() {
        let orchestrator = WaveOrchestrator::new(Config::new(WaveSettings::default(), vec![2, 1]));
        assert_eq!(orchestrator.active_spawner_count(0), 2);
        assert_eq!(orchestrator.active_spawner_count(1), 1);
        assert_eq!(orchestrator.active_spawner_count(2), 1);
        assert_eq!(orchestrator.active_spawner_count(40), 1);
    }

    #[test]
    fn empty_table_requests_one_spawner() {
        let orchestrator = WaveOrchestrator::new(Config::new(WaveSettings::default(), Vec::new()));
        assert_eq!(orchestrator.active_spawner_count(3), 1);
    }

    #[test]
    fn spawner_registry_is_ordered_and_unique() {
        let mut orchestrator = WaveOrchestrator::new(Config::new(WaveSettings::default(), vec![1]));
        assert!(orchestrator.register_spawner(SpawnerNumber::new(5), Vec3::X));
        assert!(orchestrator.register_spawner(SpawnerNumber::new(1), Vec3::Y));
        assert!(!orchestrator.register_spawner(SpawnerNumber::new(5), Vec3::Z));

        let numbers: Vec<_> = orchestrator.spawners().iter().map(|(n, _)| n.get()).collect();
        assert_eq!(numbers, vec![1, 5]);
        assert!(orchestrator.unregister_spawner(SpawnerNumber::new(1)));
        assert!(!orchestrator.unregister_spawner(SpawnerNumber::new(1)));
    }

    #[test]
    fn planar_distance_ignores_height() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 4.0, 900.0);
        assert_eq!(planar_distance(a, b), 5.0);
    }
}
