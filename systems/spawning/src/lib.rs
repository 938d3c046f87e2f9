#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawners that emit enemies around a fixed location on a steady cadence.

use bulwark_core::{
    ActorSpawner, EnemyId, Event, SpawnerNumber, TimerAction, TimerHandle, TimerService, Vec3,
    WaveSettings,
};
use bulwark_system_enemies::EnemyRegistry;
use rand::Rng;
use rand_distr::{Distribution, UnitDisc};
use tracing::{debug, trace};

/// Configuration parameters required to construct a wave spawner.
#[derive(Clone, Debug)]
pub struct Config {
    number: SpawnerNumber,
    location: Vec3,
    override_settings: Option<WaveSettings>,
}

impl Config {
    /// Creates a configuration for a spawner placed at `location`.
    #[must_use]
    pub const fn new(number: SpawnerNumber, location: Vec3) -> Self {
        Self {
            number,
            location,
            override_settings: None,
        }
    }

    /// Uses `settings` instead of the orchestrator's settings for every wave.
    #[must_use]
    pub fn with_override(mut self, settings: WaveSettings) -> Self {
        self.override_settings = Some(settings);
        self
    }
}

/// Location-bound source of enemies with its own spawn cadence.
#[derive(Clone, Debug)]
pub struct WaveSpawner {
    number: SpawnerNumber,
    location: Vec3,
    override_settings: Option<WaveSettings>,
    effective: Option<WaveSettings>,
    enemies_to_spawn: u32,
    enemies_spawned: u32,
    timer: Option<TimerHandle>,
}

impl WaveSpawner {
    /// Creates an idle spawner.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            number: config.number,
            location: config.location,
            override_settings: config.override_settings,
            effective: None,
            enemies_to_spawn: 0,
            enemies_spawned: 0,
            timer: None,
        }
    }

    /// Designer-authored number of the spawner.
    #[must_use]
    pub const fn number(&self) -> SpawnerNumber {
        self.number
    }

    /// Location enemies are scattered around.
    #[must_use]
    pub const fn location(&self) -> Vec3 {
        self.location
    }

    /// Settings captured by the latest wave, if any wave started.
    #[must_use]
    pub fn effective_settings(&self) -> Option<&WaveSettings> {
        self.effective.as_ref()
    }

    /// Target enemy count of the current wave.
    #[must_use]
    pub const fn enemies_to_spawn(&self) -> u32 {
        self.enemies_to_spawn
    }

    /// Enemies emitted so far in the current wave.
    #[must_use]
    pub const fn enemies_spawned(&self) -> u32 {
        self.enemies_spawned
    }

    /// Handle of the spawn cadence timer, while armed.
    #[must_use]
    pub const fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Starts spawning `wave` using `base` unless the spawner carries an override.
    ///
    /// Counters reset and the cadence timer is re-armed. Milestone waves add
    /// the step delta and publish a difficulty report.
    pub fn spawn_wave<S>(&mut self, wave: u32, base: &WaveSettings, timers: &mut S, out: &mut Vec<Event>)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        self.teardown(timers);

        let settings = self
            .override_settings
            .clone()
            .unwrap_or_else(|| base.clone());

        if settings.is_milestone(wave) {
            out.push(Event::DifficultyIncreasing {
                spawner: self.number,
            });
        }
        self.enemies_to_spawn = settings.enemies_for_wave(wave);
        self.enemies_spawned = 0;
        self.timer = Some(timers.schedule(
            settings.time_between_enemies(),
            true,
            TimerAction::SpawnEnemy {
                spawner: self.number,
            },
        ));

        debug!(
            spawner = self.number.get(),
            wave,
            enemies = self.enemies_to_spawn,
            "spawner_activated"
        );
        out.push(Event::SpawnerActivated {
            spawner: self.number,
            wave,
            enemies_to_spawn: self.enemies_to_spawn,
        });
        self.effective = Some(settings);
    }

    /// Handles one cadence expiry.
    ///
    /// Once the target is reached the cadence timer is cancelled and nothing
    /// spawns. Otherwise one enemy is placed uniformly within the spawn radius,
    /// registered and linked back to this spawner. The counter advances even
    /// when the actor spawner refuses the kind.
    pub fn spawn_enemy<R, S, A>(
        &mut self,
        rng: &mut R,
        timers: &mut S,
        actors: &mut A,
        registry: &mut EnemyRegistry,
        out: &mut Vec<Event>,
    ) -> Option<EnemyId>
    where
        R: Rng + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
        A: ActorSpawner + ?Sized,
    {
        if self.enemies_spawned >= self.enemies_to_spawn {
            if self.timer.is_some() {
                trace!(spawner = self.number.get(), "spawner_exhausted");
            }
            self.teardown(timers);
            return None;
        }
        let settings = self.effective.as_ref()?;

        let [x, y]: [f32; 2] = UnitDisc.sample(rng);
        let radius = settings.spawn_radius.max(0.0);
        let position = self.location + Vec3::new(x * radius, y * radius, 0.0);
        let spawned = actors.spawn(&settings.enemy_kind, position);
        self.enemies_spawned = self.enemies_spawned.saturating_add(1);

        let Some(enemy) = spawned else {
            debug!(
                spawner = self.number.get(),
                kind = settings.enemy_kind.as_str(),
                "enemy_spawn_refused"
            );
            return None;
        };
        registry.register(enemy);
        actors.link_parent(enemy, self.number);
        out.push(Event::EnemySpawned {
            enemy,
            spawner: self.number,
            position,
        });
        Some(enemy)
    }

    /// Cancels the cadence timer.
    pub fn teardown<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_settings_take_precedence() {
        let custom = WaveSettings {
            base_enemy_count: 11,
            ..WaveSettings::default()
        };
        let spawner = WaveSpawner::new(
            Config::new(SpawnerNumber::new(0), Vec3::ZERO).with_override(custom.clone()),
        );
        assert_eq!(spawner.override_settings, Some(custom));
        assert!(spawner.effective_settings().is_none());
    }
}
