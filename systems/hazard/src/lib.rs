#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Randomised resource hazards and the node slots that host them.

mod node;

use std::time::Duration;

use bulwark_core::{
    seconds, HazardSpec, NodeId, ResourceTag, TimerAction, TimerHandle, TimerService,
};
use rand::Rng;
use tracing::debug;

pub use node::{Config, NodeInteraction, NodeSlot};

/// Result of delivering resources to a hazard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delivery {
    /// Wrong tag or nothing outstanding; the need is unchanged.
    Ignored,
    /// The need shrank but is not yet met.
    Outstanding(u32),
    /// The need reached zero and the hazard deactivated.
    Resolved,
}

/// Runtime state of a node's hazard policy.
///
/// `current_needed` is zero exactly when the hazard is inactive, and a new
/// need is never rolled while one is outstanding.
#[derive(Clone, Debug)]
pub struct HazardPolicy {
    spec: HazardSpec,
    current_needed: u32,
    scheduled: bool,
    active: bool,
    timer: Option<TimerHandle>,
}

impl HazardPolicy {
    /// Creates an idle policy.
    #[must_use]
    pub fn new(spec: HazardSpec) -> Self {
        Self {
            spec,
            current_needed: 0,
            scheduled: false,
            active: false,
            timer: None,
        }
    }

    /// Authored parameters.
    #[must_use]
    pub const fn spec(&self) -> &HazardSpec {
        &self.spec
    }

    /// Resources still required; zero while inactive.
    #[must_use]
    pub const fn current_needed(&self) -> u32 {
        self.current_needed
    }

    /// Reports whether a trigger timer is armed.
    #[must_use]
    pub const fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Reports whether a need is outstanding.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Handle of the trigger timer, while armed.
    #[must_use]
    pub const fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// Arms a one-shot trigger after a delay drawn uniformly from the frequency range.
    ///
    /// Returns the delay, or `None` when a need is already outstanding.
    pub fn schedule_next<R, S>(&mut self, node: NodeId, rng: &mut R, timers: &mut S) -> Option<Duration>
    where
        R: Rng + ?Sized,
        S: TimerService<TimerAction> + ?Sized,
    {
        if self.current_needed > 0 {
            return None;
        }
        self.cancel(timers);

        let delay = sample_delay(rng, self.spec.min_frequency, self.spec.max_frequency);
        self.timer = Some(timers.schedule(delay, false, TimerAction::TriggerHazard { node }));
        self.scheduled = true;
        debug!(node = node.get(), ?delay, "hazard_scheduled");
        Some(delay)
    }

    /// Rolls a new need when the trigger timer fires.
    ///
    /// Re-entrant triggers while a need is outstanding change nothing.
    pub fn trigger<R>(&mut self, rng: &mut R) -> Option<u32>
    where
        R: Rng + ?Sized,
    {
        self.scheduled = false;
        self.timer = None;
        if self.current_needed > 0 {
            return None;
        }

        let low = self.spec.min_quantity.min(self.spec.max_quantity).max(1);
        let high = self.spec.max_quantity.max(low);
        self.current_needed = rng.gen_range(low..=high);
        self.active = true;
        Some(self.current_needed)
    }

    /// Applies a delivery of `quantity` units tagged `tag`.
    ///
    /// Surplus units are discarded; the need never drops below zero.
    pub fn deliver(&mut self, tag: &ResourceTag, quantity: u32) -> Delivery {
        if self.current_needed == 0 || !self.spec.resource_tag.matches_exact(tag) {
            return Delivery::Ignored;
        }

        self.current_needed = self.current_needed.saturating_sub(quantity);
        if self.current_needed == 0 {
            self.active = false;
            Delivery::Resolved
        } else {
            Delivery::Outstanding(self.current_needed)
        }
    }

    /// Cancels a pending trigger timer; an outstanding need is kept.
    pub fn cancel<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        if let Some(handle) = self.timer.take() {
            timers.cancel(handle);
        }
        self.scheduled = false;
    }

    /// Cancels the timer and clears any outstanding need.
    pub fn reset<S>(&mut self, timers: &mut S)
    where
        S: TimerService<TimerAction> + ?Sized,
    {
        self.cancel(timers);
        self.current_needed = 0;
        self.active = false;
    }
}

fn sample_delay<R>(rng: &mut R, min: f32, max: f32) -> Duration
where
    R: Rng + ?Sized,
{
    let min = if min.is_finite() { min.max(0.0) } else { 0.0 };
    let max = if max.is_finite() { max.max(min) } else { min };
    if max <= min {
        return seconds(min);
    }
    seconds(rng.gen_range(min..=max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn degenerate_frequency_ranges_do_not_panic() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(sample_delay(&mut rng, 4.0, 4.0), Duration::from_secs(4));
        assert_eq!(sample_delay(&mut rng, 6.0, 2.0), Duration::from_secs(6));
        assert_eq!(sample_delay(&mut rng, f32::NAN, f32::INFINITY), Duration::ZERO);
    }

    #[test]
    fn wrong_tags_are_ignored() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut policy = HazardPolicy::new(HazardSpec::default());
        let needed = policy.trigger(&mut rng).expect("first trigger rolls a need");

        assert_eq!(policy.deliver(&ResourceTag::new("medkit"), 100), Delivery::Ignored);
        assert_eq!(policy.current_needed(), needed);
    }
}
