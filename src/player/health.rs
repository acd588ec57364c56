//! Player hit points

/// Result of applying damage
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    /// Already dead, nothing changed
    Ignored,
    /// Damage taken, still alive
    Hurt { remaining: f32 },
    /// This hit was fatal
    Died,
}

/// Player health pool. Death is final: further damage and healing are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerHealth {
    max: f32,
    current: f32,
}

impl PlayerHealth {
    #[must_use]
    pub fn new(max: f32) -> Self {
        let max = max.max(1.0);
        Self { max, current: max }
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[must_use]
    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    /// Subtract `amount`, clamping at zero.
    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        if self.is_dead() {
            return DamageOutcome::Ignored;
        }
        self.current -= amount.max(0.0);
        if self.current <= 0.0 {
            self.current = 0.0;
            DamageOutcome::Died
        } else {
            DamageOutcome::Hurt {
                remaining: self.current,
            }
        }
    }

    /// Restore up to `max`. Returns the new value.
    pub fn heal(&mut self, amount: f32) -> f32 {
        if !self.is_dead() {
            self.current = (self.current + amount.max(0.0)).min(self.max);
        }
        self.current
    }
}

impl Default for PlayerHealth {
    fn default() -> Self {
        Self::new(100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damage_until_death() {
        let mut health = PlayerHealth::new(30.0);
        assert_eq!(health.take_damage(10.0), DamageOutcome::Hurt { remaining: 20.0 });
        assert_eq!(health.take_damage(25.0), DamageOutcome::Died);
        assert_eq!(health.current(), 0.0);
        assert_eq!(health.take_damage(5.0), DamageOutcome::Ignored);
    }

    #[test]
    fn test_heal_is_capped_and_dead_stay_dead() {
        let mut health = PlayerHealth::new(50.0);
        health.take_damage(20.0);
        assert_eq!(health.heal(100.0), 50.0);

        health.take_damage(60.0);
        assert_eq!(health.heal(10.0), 0.0);
        assert!(health.is_dead());
    }
}
