//! Combo and dash bookkeeping
//!
//! Both trackers live on the player agent rather than inside a state, because
//! their timers keep running after the owning state exits: the combo window
//! still accepts a chained press, and the dash cooldown gates the next dash.

use glam::Vec3;

/// Combo progression shared between attack swings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComboTracker {
    index: usize,
    window: f32,
    /// A press arrived while the window was open
    pub requested: bool,
    /// The next hit gets the parry counter bonus
    pub counter_ready: bool,
}

impl ComboTracker {
    /// 0-based step of the current or last swing
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn window_open(&self) -> bool {
        self.window > 0.0
    }

    #[must_use]
    pub fn window_remaining(&self) -> f32 {
        self.window.max(0.0)
    }

    /// Start a swing. Chains to the next step if the window is open and
    /// `max_combo` allows it, otherwise restarts at step 0.
    ///
    /// Returns the step index of the new swing.
    pub fn begin_swing(&mut self, max_combo: usize) -> usize {
        self.index = if self.window_open() && self.index + 1 < max_combo {
            self.index + 1
        } else {
            0
        };
        self.window = 0.0;
        self.requested = false;
        self.index
    }

    /// Whether another step can follow the current one
    #[must_use]
    pub fn can_chain(&self, max_combo: usize) -> bool {
        self.index + 1 < max_combo
    }

    pub fn open_window(&mut self, duration: f32) {
        self.window = duration;
    }

    /// Advance the window. An elapsed window resets the combo.
    pub fn tick(&mut self, dt: f32) {
        if self.window <= 0.0 {
            return;
        }
        self.window -= dt;
        if self.window <= 0.0 {
            self.window = 0.0;
            self.index = 0;
            self.requested = false;
        }
    }

    /// Use up the parry counter bonus, if any
    pub fn take_counter(&mut self) -> bool {
        std::mem::take(&mut self.counter_ready)
    }
}

/// Dash progress and cooldown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashTracker {
    active: bool,
    remaining: f32,
    cooldown: f32,
    /// Locked-in (or steered) dash direction
    pub direction: Vec3,
}

impl DashTracker {
    #[must_use]
    pub fn is_dashing(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn cooldown_remaining(&self) -> f32 {
        self.cooldown.max(0.0)
    }

    /// A dash may start when none is running and the cooldown has elapsed
    #[must_use]
    pub fn can_start(&self) -> bool {
        !self.active && self.cooldown <= 0.0
    }

    pub fn start(&mut self, direction: Vec3, duration: f32) {
        self.active = true;
        self.remaining = duration;
        self.direction = direction;
    }

    /// Advance timers. Returns `true` on the tick the dash ends, at which
    /// point the cooldown starts.
    pub fn tick(&mut self, dt: f32, cooldown: f32) -> bool {
        if self.cooldown > 0.0 {
            self.cooldown -= dt;
        }
        if !self.active {
            return false;
        }
        self.remaining -= dt;
        if self.remaining > 0.0 {
            return false;
        }
        self.active = false;
        self.remaining = 0.0;
        self.cooldown = cooldown;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combo_chains_only_inside_window() {
        let mut combo = ComboTracker::default();
        assert_eq!(combo.begin_swing(3), 0);
        assert_eq!(combo.begin_swing(3), 0);

        combo.open_window(0.8);
        assert_eq!(combo.begin_swing(3), 1);
        combo.open_window(0.8);
        assert_eq!(combo.begin_swing(3), 2);
        combo.open_window(0.8);
        assert!(!combo.can_chain(3));
        assert_eq!(combo.begin_swing(3), 0);
    }

    #[test]
    fn test_elapsed_window_resets_combo() {
        let mut combo = ComboTracker::default();
        combo.open_window(0.5);
        combo.begin_swing(3);
        combo.open_window(0.5);
        combo.requested = true;

        combo.tick(0.3);
        assert_eq!(combo.index(), 1);
        combo.tick(0.3);
        assert_eq!(combo.index(), 0);
        assert!(!combo.window_open());
        assert!(!combo.requested);
    }

    #[test]
    fn test_counter_is_consumed_once() {
        let mut combo = ComboTracker {
            counter_ready: true,
            ..ComboTracker::default()
        };
        assert!(combo.take_counter());
        assert!(!combo.take_counter());
    }

    #[test]
    fn test_dash_cooldown() {
        let mut dash = DashTracker::default();
        assert!(dash.can_start());

        dash.start(Vec3::Z, 0.2);
        assert!(!dash.can_start());
        assert!(!dash.tick(0.15, 1.5));
        assert!(dash.tick(0.1, 1.5));
        assert!(!dash.is_dashing());

        assert!(!dash.can_start());
        dash.tick(1.0, 1.5);
        assert!(!dash.can_start());
        dash.tick(0.6, 1.5);
        assert!(dash.can_start());
    }
}
