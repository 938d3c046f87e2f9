use std::{collections::BTreeMap, time::Duration};

use bulwark_core::{
    ActorSpawner, EnemyId, EnemyKind, Event, SpawnerNumber, TimerAction, TimerService, Vec3,
    WaveSettings,
};
use bulwark_system_enemies::EnemyRegistry;
use bulwark_system_scheduler::Scheduler;
use bulwark_system_spawning::{Config, WaveSpawner};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

#[derive(Default)]
struct Actors {
    next: u32,
    spawned: Vec<(EnemyId, Vec3)>,
    parents: BTreeMap<EnemyId, SpawnerNumber>,
    refuse: bool,
}

impl ActorSpawner for Actors {
    fn spawn(&mut self, _kind: &EnemyKind, location: Vec3) -> Option<EnemyId> {
        if self.refuse {
            return None;
        }
        self.next += 1;
        let enemy = EnemyId::new(self.next);
        self.spawned.push((enemy, location));
        Some(enemy)
    }

    fn link_parent(&mut self, enemy: EnemyId, spawner: SpawnerNumber) {
        let _ = self.parents.insert(enemy, spawner);
    }
}

fn settings() -> WaveSettings {
    WaveSettings {
        base_enemy_count: 5,
        spawn_radius: 300.0,
        time_between_enemies: 1.0,
        difficulty_step_waves: 3,
        difficulty_step_enemy_delta: 2,
        ..WaveSettings::default()
    }
}

fn run_wave(spawner: &mut WaveSpawner, wave: u32, seconds: u64) -> (Actors, EnemyRegistry, Vec<Event>) {
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut actors = Actors::default();
    let mut registry = EnemyRegistry::new();
    let mut events = Vec::new();

    spawner.spawn_wave(wave, &settings(), &mut timers, &mut events);
    for expiry in timers.advance(Duration::from_secs(seconds)) {
        assert_eq!(
            expiry.payload,
            TimerAction::SpawnEnemy {
                spawner: spawner.number()
            }
        );
        let _ = spawner.spawn_enemy(&mut rng, &mut timers, &mut actors, &mut registry, &mut events);
    }
    (actors, registry, events)
}

#[test]
fn milestone_wave_spawns_base_plus_delta() {
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(2), Vec3::ZERO));
    let (actors, registry, events) = run_wave(&mut spawner, 3, 20);

    assert_eq!(spawner.enemies_to_spawn(), 7);
    assert_eq!(actors.spawned.len(), 7);
    assert_eq!(registry.len(), 7);
    assert_eq!(
        events[0],
        Event::DifficultyIncreasing {
            spawner: SpawnerNumber::new(2)
        }
    );
    assert!(actors
        .parents
        .values()
        .all(|parent| *parent == SpawnerNumber::new(2)));
}

#[test]
fn regular_wave_spawns_base_count_without_difficulty_report() {
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(0), Vec3::ZERO));
    let (actors, _, events) = run_wave(&mut spawner, 1, 20);

    assert_eq!(actors.spawned.len(), 5);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::DifficultyIncreasing { .. })));
}

#[test]
fn cadence_stops_on_the_tick_after_the_target() {
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut actors = Actors::default();
    let mut registry = EnemyRegistry::new();
    let mut events = Vec::new();
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(0), Vec3::ZERO));

    spawner.spawn_wave(1, &settings(), &mut timers, &mut events);
    let handle = spawner.timer().expect("cadence armed");

    let fired = timers.advance(Duration::from_secs(5));
    for _ in &fired {
        let _ = spawner.spawn_enemy(&mut rng, &mut timers, &mut actors, &mut registry, &mut events);
    }
    assert_eq!(spawner.enemies_spawned(), 5);
    assert!(timers.is_active(handle), "still armed until the next expiry");

    let _ = timers.advance(Duration::from_secs(1));
    assert_eq!(
        spawner.spawn_enemy(&mut rng, &mut timers, &mut actors, &mut registry, &mut events),
        None
    );
    assert!(!timers.is_active(handle));
    assert!(spawner.timer().is_none());
    assert_eq!(actors.spawned.len(), 5);
}

#[test]
fn spawn_points_stay_within_the_radius() {
    let location = Vec3::new(-2_500.0, 400.0, 90.0);
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(1), location));
    let (actors, _, _) = run_wave(&mut spawner, 4, 10);

    assert_eq!(actors.spawned.len(), 5);
    for (_, position) in &actors.spawned {
        assert!(position.distance(location) <= 300.0 + 1e-3);
        assert_eq!(position.z, location.z);
    }
}

#[test]
fn override_settings_replace_the_orchestrator_settings() {
    let custom = WaveSettings {
        base_enemy_count: 2,
        difficulty_step_waves: 0,
        ..settings()
    };
    let mut spawner =
        WaveSpawner::new(Config::new(SpawnerNumber::new(4), Vec3::ZERO).with_override(custom.clone()));
    let (actors, _, events) = run_wave(&mut spawner, 3, 10);

    assert_eq!(spawner.effective_settings(), Some(&custom));
    assert_eq!(actors.spawned.len(), 2);
    assert!(!events
        .iter()
        .any(|event| matches!(event, Event::DifficultyIncreasing { .. })));
}

#[test]
fn refused_spawns_still_advance_the_counter() {
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let mut actors = Actors {
        refuse: true,
        ..Actors::default()
    };
    let mut registry = EnemyRegistry::new();
    let mut events = Vec::new();
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(0), Vec3::ZERO));

    spawner.spawn_wave(1, &settings(), &mut timers, &mut events);
    let _ = spawner.spawn_enemy(&mut rng, &mut timers, &mut actors, &mut registry, &mut events);

    assert_eq!(spawner.enemies_spawned(), 1);
    assert!(registry.is_empty());
}

#[test]
fn respawning_resets_counters_and_rearms_the_cadence() {
    let mut timers = Scheduler::new();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let mut actors = Actors::default();
    let mut registry = EnemyRegistry::new();
    let mut events = Vec::new();
    let mut spawner = WaveSpawner::new(Config::new(SpawnerNumber::new(0), Vec3::ZERO));

    spawner.spawn_wave(1, &settings(), &mut timers, &mut events);
    let first = spawner.timer().expect("armed");
    let _ = spawner.spawn_enemy(&mut rng, &mut timers, &mut actors, &mut registry, &mut events);

    spawner.spawn_wave(2, &settings(), &mut timers, &mut events);
    let second = spawner.timer().expect("re-armed");

    assert_ne!(first, second);
    assert!(!timers.is_active(first));
    assert!(timers.is_active(second));
    assert_eq!(spawner.enemies_spawned(), 0);
    assert_eq!(timers.active_count(), 1);
}
