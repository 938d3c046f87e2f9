//! Scenario files: authored layout, wave tables and hazard tuning in TOML.

use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    io,
    path::{Path, PathBuf},
};

use bulwark_core::{
    BehaviorToken, EnemyArchetype, EnemyKind, GateId, HazardSpec, NodeId, SettingsError,
    SpawnerNumber, Vec3, WallId, WaveSettings,
};
use bulwark_system_orchestration::{HazardEscalation, DEFAULT_LOCK_RADIUS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a scenario is rejected.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The scenario file could not be read.
    #[error("failed to read scenario `{path}`")]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scenario is not valid TOML or does not match the schema.
    #[error("failed to parse scenario")]
    Parse(#[from] toml::de::Error),
    /// An authored value failed validation.
    #[error("invalid {context}")]
    Settings {
        /// Section holding the value.
        context: String,
        /// Validation failure.
        #[source]
        source: SettingsError,
    },
    /// A wave references an enemy kind without an archetype.
    #[error("{context} spawns unknown enemy kind `{kind}`")]
    UnknownArchetype {
        /// Section referencing the kind.
        context: String,
        /// Kind without an archetype.
        kind: String,
    },
    /// Two entries share an identifier.
    #[error("duplicate {section} id {id}")]
    DuplicateId {
        /// Section containing the duplicate.
        section: &'static str,
        /// Repeated identifier.
        id: u32,
    },
    /// No enemy archetypes were authored.
    #[error("scenario defines no enemy archetypes")]
    NoArchetypes,
}

/// Serialized form of the initial hazard escalation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HazardEscalationSettings {
    /// Starting chance, in percent, that an attack arms hazards.
    pub trigger_chance: f32,
    /// Starting cap on hazards armed per attack.
    pub max_hazards_per_attack: u32,
    /// Percentage points added per difficulty step.
    pub chance_step: f32,
    /// Cap increase per difficulty step.
    pub count_step: u32,
}

impl Default for HazardEscalationSettings {
    fn default() -> Self {
        let defaults = HazardEscalation::default();
        Self {
            trigger_chance: defaults.trigger_chance,
            max_hazards_per_attack: defaults.max_hazards_per_attack,
            chance_step: defaults.chance_step,
            count_step: defaults.count_step,
        }
    }
}

impl From<HazardEscalationSettings> for HazardEscalation {
    fn from(settings: HazardEscalationSettings) -> Self {
        Self {
            trigger_chance: settings.trigger_chance,
            max_hazards_per_attack: settings.max_hazards_per_attack,
            chance_step: settings.chance_step,
            count_step: settings.count_step,
        }
    }
}

/// Authored wave spawner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpawnerConfig {
    /// Number ordering the spawner in the orchestrator's registry.
    pub number: SpawnerNumber,
    /// Centre of the spawn disk.
    pub location: Vec3,
    /// Settings replacing the scenario's wave settings for this spawner.
    #[serde(default)]
    pub settings: Option<WaveSettings>,
}

/// Authored border wall, modelled as an axis-aligned box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WallConfig {
    /// Identifier of the wall.
    pub id: WallId,
    /// One corner of the box.
    pub min: Vec3,
    /// The opposite corner of the box.
    pub max: Vec3,
    /// Starting health.
    #[serde(default = "default_wall_health")]
    pub health: f32,
}

/// Authored node slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    /// Identifier of the node.
    pub id: NodeId,
    /// World location of the node.
    pub location: Vec3,
    /// Starting and maximum health.
    #[serde(default = "default_node_health")]
    pub max_health: f32,
    /// Hazard policy.
    #[serde(default)]
    pub hazard: HazardSpec,
    /// Behaviour an assigned worker runs.
    #[serde(default = "default_work_behavior")]
    pub work_behavior: BehaviorToken,
}

/// Authored gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GateConfig {
    /// Identifier of the gate.
    pub id: GateId,
    /// World position of the gate.
    pub position: Vec3,
}

/// Complete description of a simulation scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Seed of every random draw in the simulation.
    #[serde(default)]
    pub seed: u64,
    /// Default wave settings.
    #[serde(default)]
    pub wave: WaveSettings,
    /// Spawners activated per wave; the last entry repeats.
    #[serde(default = "default_active_per_wave")]
    pub spawners_active_per_wave: Vec<u32>,
    /// Planar radius within which gates near an activated spawner lock.
    #[serde(default = "default_lock_radius")]
    pub lock_radius: f32,
    /// Initial hazard escalation.
    #[serde(default)]
    pub hazards: HazardEscalationSettings,
    /// Enemy statistics keyed by kind.
    #[serde(default)]
    pub archetypes: BTreeMap<EnemyKind, EnemyArchetype>,
    /// Wave spawners.
    #[serde(default)]
    pub spawners: Vec<SpawnerConfig>,
    /// Border walls.
    #[serde(default)]
    pub walls: Vec<WallConfig>,
    /// Node slots.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Gates.
    #[serde(default)]
    pub gates: Vec<GateConfig>,
    /// Number of follower NPCs available for node work.
    #[serde(default)]
    pub followers: u32,
    /// Initial player position; omitted when no player is present.
    #[serde(default)]
    pub player: Option<Vec3>,
}

impl ScenarioConfig {
    /// Parses and validates a scenario from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a scenario file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every authored value and cross reference.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.archetypes.is_empty() {
            return Err(ConfigError::NoArchetypes);
        }
        for (kind, archetype) in &self.archetypes {
            archetype
                .validate()
                .map_err(settings_error(format!("archetype `{}`", kind.as_str())))?;
        }

        self.check_wave("wave settings", &self.wave)?;
        if !(self.lock_radius.is_finite() && self.lock_radius >= 0.0) {
            return Err(ConfigError::Settings {
                context: "lock radius".to_owned(),
                source: SettingsError::InvalidScalar {
                    field: "lock_radius",
                    value: self.lock_radius,
                },
            });
        }
        for (field, value) in [
            ("trigger_chance", self.hazards.trigger_chance),
            ("chance_step", self.hazards.chance_step),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::Settings {
                    context: "hazard escalation".to_owned(),
                    source: SettingsError::InvalidScalar { field, value },
                });
            }
        }

        let mut seen = BTreeSet::new();
        for spawner in &self.spawners {
            if !seen.insert(spawner.number) {
                return Err(ConfigError::DuplicateId {
                    section: "spawner",
                    id: spawner.number.get(),
                });
            }
            if let Some(settings) = &spawner.settings {
                self.check_wave(&format!("spawner {} settings", spawner.number.get()), settings)?;
            }
        }

        check_unique("wall", self.walls.iter().map(|wall| wall.id.get()))?;
        check_unique("node", self.nodes.iter().map(|node| node.id.get()))?;
        check_unique("gate", self.gates.iter().map(|gate| gate.id.get()))?;

        for wall in &self.walls {
            if !(wall.health.is_finite() && wall.health >= 0.0) {
                return Err(ConfigError::Settings {
                    context: format!("wall {}", wall.id.get()),
                    source: SettingsError::InvalidScalar {
                        field: "health",
                        value: wall.health,
                    },
                });
            }
        }
        for node in &self.nodes {
            let context = format!("node {}", node.id.get());
            node.hazard
                .validate()
                .map_err(settings_error(context.clone()))?;
            if !(node.max_health.is_finite() && node.max_health >= 0.0) {
                return Err(ConfigError::Settings {
                    context,
                    source: SettingsError::InvalidScalar {
                        field: "max_health",
                        value: node.max_health,
                    },
                });
            }
        }
        Ok(())
    }

    fn check_wave(&self, context: &str, settings: &WaveSettings) -> Result<(), ConfigError> {
        settings
            .validate()
            .map_err(settings_error(context.to_owned()))?;
        if !self.archetypes.contains_key(&settings.enemy_kind) {
            return Err(ConfigError::UnknownArchetype {
                context: context.to_owned(),
                kind: settings.enemy_kind.as_str().to_owned(),
            });
        }
        Ok(())
    }
}

fn settings_error(context: String) -> impl FnOnce(SettingsError) -> ConfigError {
    move |source| ConfigError::Settings { context, source }
}

fn check_unique(section: &'static str, ids: impl Iterator<Item = u32>) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ConfigError::DuplicateId { section, id });
        }
    }
    Ok(())
}

fn default_active_per_wave() -> Vec<u32> {
    vec![1]
}

fn default_lock_radius() -> f32 {
    DEFAULT_LOCK_RADIUS
}

fn default_wall_health() -> f32 {
    500.0
}

fn default_node_health() -> f32 {
    100.0
}

fn default_work_behavior() -> BehaviorToken {
    BehaviorToken::new("work_node")
}
