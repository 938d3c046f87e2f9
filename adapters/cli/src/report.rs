use std::{fmt, time::Duration};

use bulwark_core::{Event, NodeId, PresentationHooks, WallId};
use bulwark_world::{query, World};
use tracing::{info, warn};

/// Presentation hooks that only log.
#[derive(Debug, Default)]
pub(crate) struct LoggingHooks;

impl PresentationHooks for LoggingHooks {
    fn show_wave_warning(&mut self, lead_time: Duration) {
        info!(?lead_time, "incoming_wave");
    }

    fn on_node_disabled(&mut self, node: NodeId) {
        warn!(node = node.get(), "node_lost");
    }

    fn on_wall_disabled(&mut self, wall: WallId) {
        warn!(wall = wall.get(), "wall_lost");
    }
}

/// Tally of a headless run.
#[derive(Debug, Default)]
pub(crate) struct Summary {
    waves: u32,
    spawned: u32,
    attacks: u32,
    hazards_triggered: u32,
    hazards_resolved: u32,
    walls_disabled: u32,
    nodes_disabled: u32,
    enemies_alive: usize,
    clock: Duration,
    trigger_chance: f32,
    max_hazards_per_attack: u32,
}

impl Summary {
    pub(crate) fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::WaveStarted { .. } => self.waves += 1,
                Event::EnemySpawned { .. } => self.spawned += 1,
                Event::EnemyAttacked { .. } => self.attacks += 1,
                Event::HazardTriggered { .. } => self.hazards_triggered += 1,
                Event::HazardResolved { .. } => self.hazards_resolved += 1,
                Event::WallDisabled { .. } => self.walls_disabled += 1,
                Event::NodeDisabled { .. } => self.nodes_disabled += 1,
                _ => {}
            }
        }
    }

    pub(crate) fn finish(&mut self, world: &World) {
        let escalation = query::hazard_escalation(world);
        self.trigger_chance = escalation.trigger_chance;
        self.max_hazards_per_attack = escalation.max_hazards_per_attack;
        self.enemies_alive = query::enemies(world).count();
        self.clock = query::clock(world);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "gameplay time:      {:.1}s", self.clock.as_secs_f32())?;
        writeln!(f, "waves started:      {}", self.waves)?;
        writeln!(f, "enemies spawned:    {}", self.spawned)?;
        writeln!(f, "enemies remaining:  {}", self.enemies_alive)?;
        writeln!(f, "wall hits:          {}", self.attacks)?;
        writeln!(f, "walls destroyed:    {}", self.walls_disabled)?;
        writeln!(
            f,
            "hazards:            {} triggered, {} resolved",
            self.hazards_triggered, self.hazards_resolved
        )?;
        writeln!(f, "nodes disabled:     {}", self.nodes_disabled)?;
        write!(
            f,
            "hazard escalation:  {:.0}% chance, up to {} per attack",
            self.trigger_chance, self.max_hazards_per_attack
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_gameplay_events() {
        let mut summary = Summary::default();
        summary.record(&[
            Event::WaveStarted {
                wave: 0,
                excluded_zone: None,
                zones: Vec::new(),
            },
            Event::HazardTriggered {
                node: NodeId::new(1),
                quantity: 2,
            },
            Event::HazardResolved {
                node: NodeId::new(1),
            },
            Event::WallDisabled {
                wall: WallId::new(3),
            },
            Event::WavesStarted,
        ]);

        assert_eq!(summary.waves, 1);
        assert_eq!(summary.hazards_triggered, 1);
        assert_eq!(summary.hazards_resolved, 1);
        assert_eq!(summary.walls_disabled, 1);
        assert_eq!(summary.spawned, 0);
    }
}
