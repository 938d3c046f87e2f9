//! Designer-authored value structs: wave parameters, hazard policies and enemy archetypes.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{seconds, BehaviorToken, EnemyKind, ResourceTag};

/// Reasons authored settings are rejected.
#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    /// A time value was negative, NaN or infinite.
    #[error("`{field}` must be a finite, non-negative number of seconds (got {value})")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Authored value.
        value: f32,
    },
    /// A distance or scalar was negative, NaN or infinite.
    #[error("`{field}` must be finite and non-negative (got {value})")]
    InvalidScalar {
        /// Name of the offending field.
        field: &'static str,
        /// Authored value.
        value: f32,
    },
    /// The lower bound of a range exceeded its upper bound.
    #[error("`{field}` range is inverted: minimum {min} exceeds maximum {max}")]
    InvertedRange {
        /// Name of the offending range.
        field: &'static str,
        /// Authored minimum.
        min: f32,
        /// Authored maximum.
        max: f32,
    },
    /// A hazard could be armed with no outstanding need.
    #[error("hazard `min_quantity` must be at least 1")]
    ZeroHazardQuantity,
}

/// Parameters of a wave, captured by value into each spawner's effective settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WaveSettings {
    /// Archetype of enemy emitted by the spawner.
    pub enemy_kind: EnemyKind,
    /// Starting number of enemies in each wave.
    pub base_enemy_count: u32,
    /// Radius around the spawner that enemies are scattered within.
    pub spawn_radius: f32,
    /// Seconds before a wave that the warning is shown.
    pub warning_lead_time: f32,
    /// Seconds between wave starts.
    pub spawn_delay: f32,
    /// Seconds between individual enemy spawns.
    pub time_between_enemies: f32,
    /// Waves between difficulty milestones; zero disables milestones.
    pub difficulty_step_waves: u32,
    /// Extra enemies added on a milestone wave.
    pub difficulty_step_enemy_delta: u32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            enemy_kind: EnemyKind::new("grunt"),
            base_enemy_count: 5,
            spawn_radius: 300.0,
            warning_lead_time: 3.0,
            spawn_delay: 5.0,
            time_between_enemies: 1.0,
            difficulty_step_waves: 3,
            difficulty_step_enemy_delta: 2,
        }
    }
}

impl WaveSettings {
    /// Interval of the repeating wave timer.
    #[must_use]
    pub fn spawn_delay(&self) -> Duration {
        seconds(self.spawn_delay)
    }

    /// Lead time shown by the wave warning.
    #[must_use]
    pub fn warning_lead_time(&self) -> Duration {
        seconds(self.warning_lead_time)
    }

    /// Delay from a wave start until the next warning; zero when the lead time covers the whole cycle.
    #[must_use]
    pub fn warning_delay(&self) -> Duration {
        self.spawn_delay()
            .saturating_sub(self.warning_lead_time())
    }

    /// Interval of a spawner's per-enemy cadence.
    #[must_use]
    pub fn time_between_enemies(&self) -> Duration {
        seconds(self.time_between_enemies)
    }

    /// Reports whether `wave` is a difficulty milestone.
    #[must_use]
    pub fn is_milestone(&self, wave: u32) -> bool {
        self.difficulty_step_waves != 0 && wave % self.difficulty_step_waves == 0
    }

    /// Number of enemies a spawner emits for `wave`.
    #[must_use]
    pub fn enemies_for_wave(&self, wave: u32) -> u32 {
        if self.is_milestone(wave) {
            self.base_enemy_count
                .saturating_add(self.difficulty_step_enemy_delta)
        } else {
            self.base_enemy_count
        }
    }

    /// Checks every authored value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_scalar("spawn_radius", self.spawn_radius)?;
        check_duration("warning_lead_time", self.warning_lead_time)?;
        check_duration("spawn_delay", self.spawn_delay)?;
        check_duration("time_between_enemies", self.time_between_enemies)?;
        Ok(())
    }
}

/// Authored hazard policy of a node slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HazardSpec {
    /// Smallest resource need a hazard can roll.
    pub min_quantity: u32,
    /// Largest resource need a hazard can roll.
    pub max_quantity: u32,
    /// Shortest delay, in seconds, between scheduling and triggering.
    pub min_frequency: f32,
    /// Longest delay, in seconds, between scheduling and triggering.
    pub max_frequency: f32,
    /// Resource that resolves the hazard.
    pub resource_tag: ResourceTag,
    /// Resource that heals the node.
    pub healing_resource_tag: ResourceTag,
    /// Health restored per healing resource.
    pub health_per_resource: f32,
    /// Behaviour the occupant runs while the hazard is active.
    pub hazard_behavior: Option<BehaviorToken>,
}

impl Default for HazardSpec {
    fn default() -> Self {
        Self {
            min_quantity: 1,
            max_quantity: 10,
            min_frequency: 5.0,
            max_frequency: 15.0,
            resource_tag: ResourceTag::new("scrap"),
            healing_resource_tag: ResourceTag::new("medkit"),
            health_per_resource: 50.0,
            hazard_behavior: None,
        }
    }
}

impl HazardSpec {
    /// Checks every authored value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.min_quantity == 0 {
            return Err(SettingsError::ZeroHazardQuantity);
        }
        if self.min_quantity > self.max_quantity {
            return Err(SettingsError::InvertedRange {
                field: "quantity",
                min: self.min_quantity as f32,
                max: self.max_quantity as f32,
            });
        }
        check_duration("min_frequency", self.min_frequency)?;
        check_duration("max_frequency", self.max_frequency)?;
        if self.min_frequency > self.max_frequency {
            return Err(SettingsError::InvertedRange {
                field: "frequency",
                min: self.min_frequency,
                max: self.max_frequency,
            });
        }
        check_scalar("health_per_resource", self.health_per_resource)
    }
}

/// Movement, combat and durability statistics of an enemy kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnemyArchetype {
    /// Units travelled per second while seeking.
    pub move_speed: f32,
    /// Distance within which the enemy attacks its wall.
    pub attack_range: f32,
    /// Seconds between attacks; zero disables attacking.
    pub damage_interval: f32,
    /// Starting maximum health.
    pub max_health: f32,
}

impl Default for EnemyArchetype {
    fn default() -> Self {
        Self {
            move_speed: 200.0,
            attack_range: 60.0,
            damage_interval: 3.0,
            max_health: 100.0,
        }
    }
}

impl EnemyArchetype {
    /// Interval of the repeating attack timer.
    #[must_use]
    pub fn damage_interval(&self) -> Duration {
        seconds(self.damage_interval)
    }

    /// Checks every authored value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        check_scalar("move_speed", self.move_speed)?;
        check_scalar("attack_range", self.attack_range)?;
        check_duration("damage_interval", self.damage_interval)?;
        check_scalar("max_health", self.max_health)
    }
}

fn check_duration(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::InvalidDuration { field, value })
    }
}

fn check_scalar(field: &'static str, value: f32) -> Result<(), SettingsError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SettingsError::InvalidScalar { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_waves_add_the_step_delta() {
        let settings = WaveSettings {
            base_enemy_count: 5,
            difficulty_step_waves: 3,
            difficulty_step_enemy_delta: 2,
            ..WaveSettings::default()
        };
        assert_eq!(settings.enemies_for_wave(3), 7);
        assert_eq!(settings.enemies_for_wave(1), 5);
        assert_eq!(settings.enemies_for_wave(0), 7);
    }

    #[test]
    fn zero_step_disables_milestones() {
        let settings = WaveSettings {
            difficulty_step_waves: 0,
            ..WaveSettings::default()
        };
        assert!(!settings.is_milestone(0));
        assert_eq!(settings.enemies_for_wave(6), settings.base_enemy_count);
    }

    #[test]
    fn warning_delay_saturates_when_lead_exceeds_cycle() {
        let settings = WaveSettings {
            spawn_delay: 2.0,
            warning_lead_time: 3.0,
            ..WaveSettings::default()
        };
        assert_eq!(settings.warning_delay(), Duration::ZERO);
    }

    #[test]
    fn hazard_validation_rejects_zero_and_inverted_quantities() {
        let zero = HazardSpec {
            min_quantity: 0,
            ..HazardSpec::default()
        };
        assert_eq!(zero.validate(), Err(SettingsError::ZeroHazardQuantity));

        let inverted = HazardSpec {
            min_quantity: 4,
            max_quantity: 2,
            ..HazardSpec::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(SettingsError::InvertedRange { field: "quantity", .. })
        ));
        assert_eq!(HazardSpec::default().validate(), Ok(()));
    }

    #[test]
    fn negative_durations_are_rejected() {
        let settings = WaveSettings {
            spawn_delay: -1.0,
            ..WaveSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidDuration {
                field: "spawn_delay",
                ..
            })
        ));
    }

    #[test]
    fn wave_settings_parse_from_partial_toml() {
        let settings: WaveSettings = toml::from_str(
            r#"
            enemy_kind = "brute"
            base_enemy_count = 8
            spawn_delay = 12.5
            "#,
        )
        .expect("parse wave settings");
        assert_eq!(settings.enemy_kind, EnemyKind::new("brute"));
        assert_eq!(settings.base_enemy_count, 8);
        assert_eq!(settings.spawn_delay(), Duration::from_millis(12_500));
        assert_eq!(settings.time_between_enemies, 1.0);
    }
}
