//! Health ledger shared by walls, node slots and enemies.

/// Outcome of applying damage to a [`Health`] ledger.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DamageOutcome {
    /// No health was removed (non-positive damage or already dead).
    Absorbed,
    /// Health was removed and the owner is still alive.
    Damaged {
        /// Health left after the hit.
        remaining: f32,
    },
    /// This hit brought health to zero.
    Died,
}

impl DamageOutcome {
    /// Reports whether the hit was fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Died)
    }
}

/// Current and maximum health, with a removable temporary maximum bonus.
#[derive(Clone, Debug, PartialEq)]
pub struct Health {
    current: f32,
    base_max: f32,
    temp_bonus: f32,
}

impl Health {
    /// Creates a ledger at full health. Negative maxima are treated as zero.
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = sanitize(max);
        Self {
            current: max,
            base_max: max,
            temp_bonus: 0.0,
        }
    }

    /// Health remaining.
    #[must_use]
    pub const fn current(&self) -> f32 {
        self.current
    }

    /// Effective maximum, including any temporary bonus.
    #[must_use]
    pub fn max(&self) -> f32 {
        (self.base_max + self.temp_bonus).max(0.0)
    }

    /// Reports whether health has reached zero.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Reports whether health is at its maximum.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.current >= self.max()
    }

    /// Removes `amount` health, clamping at zero.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let amount = sanitize(amount);
        if amount == 0.0 || self.is_dead() {
            return DamageOutcome::Absorbed;
        }

        self.current = (self.current - amount).max(0.0);
        if self.is_dead() {
            DamageOutcome::Died
        } else {
            DamageOutcome::Damaged {
                remaining: self.current,
            }
        }
    }

    /// Adds `amount` health, clamped to the maximum. Works from zero health.
    pub fn restore(&mut self, amount: f32) {
        self.current = (self.current + sanitize(amount)).clamp(0.0, self.max());
    }

    /// Permanently raises or lowers the maximum.
    ///
    /// Raising the maximum also raises current health by the same amount.
    pub fn adjust_max_health(&mut self, value: f32, is_adding: bool) {
        let value = sanitize(value);
        if is_adding {
            self.base_max += value;
            self.current += value;
        } else {
            self.base_max = (self.base_max - value).max(0.0);
        }
        self.clamp_current();
    }

    /// Temporarily raises or lowers the maximum until [`Health::reset_temp_max_health`].
    pub fn temp_adjust_max_health(&mut self, value: f32, is_adding: bool) {
        let value = sanitize(value);
        if is_adding {
            self.temp_bonus += value;
            self.current += value;
        } else {
            self.temp_bonus -= value;
        }
        self.clamp_current();
    }

    /// Drops every temporary adjustment.
    pub fn reset_temp_max_health(&mut self) {
        self.temp_bonus = 0.0;
        self.clamp_current();
    }

    fn clamp_current(&mut self) {
        self.current = self.current.clamp(0.0, self.max());
    }
}

fn sanitize(value: f32) -> f32 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_clamps_and_signals_death_once() {
        let mut health = Health::new(25.0);
        assert_eq!(
            health.take_damage(10.0),
            DamageOutcome::Damaged { remaining: 15.0 }
        );
        assert_eq!(health.take_damage(40.0), DamageOutcome::Died);
        assert_eq!(health.current(), 0.0);
        assert_eq!(health.take_damage(5.0), DamageOutcome::Absorbed);
    }

    #[test]
    fn negative_damage_is_absorbed() {
        let mut health = Health::new(10.0);
        assert_eq!(health.take_damage(-3.0), DamageOutcome::Absorbed);
        assert_eq!(health.current(), 10.0);
    }

    #[test]
    fn restore_works_from_zero_and_caps_at_max() {
        let mut health = Health::new(100.0);
        let _ = health.take_damage(100.0);
        assert!(health.is_dead());

        health.restore(50.0);
        assert_eq!(health.current(), 50.0);
        health.restore(80.0);
        assert_eq!(health.current(), 100.0);
        assert!(health.is_full());
    }

    #[test]
    fn temporary_bonus_is_removable() {
        let mut health = Health::new(100.0);
        health.temp_adjust_max_health(20.0, true);
        assert_eq!(health.max(), 120.0);
        assert_eq!(health.current(), 120.0);

        health.reset_temp_max_health();
        assert_eq!(health.max(), 100.0);
        assert_eq!(health.current(), 100.0);
    }

    #[test]
    fn permanent_reduction_clamps_current() {
        let mut health = Health::new(100.0);
        health.adjust_max_health(30.0, false);
        assert_eq!(health.max(), 70.0);
        assert_eq!(health.current(), 70.0);

        health.adjust_max_health(500.0, false);
        assert_eq!(health.max(), 0.0);
        assert_eq!(health.current(), 0.0);
    }
}
