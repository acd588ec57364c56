//! Enemy memory: current target, last sighting, heard sounds and learned
//! player habits.

use glam::Vec3;
use hecs::Entity;

use super::settings::EnemySettings;

/// A sound the enemy heard
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeardSound {
    pub position: Vec3,
    /// Elapsed time at which it was heard
    pub time: f32,
    pub intensity: f32,
}

/// What an enemy knows about its surroundings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Perception {
    pub target: Option<Entity>,
    /// Last position the target was seen at (or reported at by an ally)
    pub last_known: Option<Vec3>,
    /// Elapsed time of the last confirmed sighting
    pub last_seen: f32,
    pub heard: Option<HeardSound>,
    /// Set once this life's help call has gone out
    pub called_for_help: bool,
    /// Tracking a target it was told about (by an ally or by being hit)
    /// but has not seen itself yet
    pub responding: bool,
}

impl Perception {
    /// Lock on to `target`, seen at `position` at time `now`.
    pub fn acquire(&mut self, target: Entity, position: Vec3, now: f32) {
        self.target = Some(target);
        self.last_known = Some(position);
        self.last_seen = now;
    }

    /// Forget the current target but keep where it was last seen.
    pub fn lose_target(&mut self) {
        if let Some(target) = self.target.take() {
            log::trace!("Lost sight of {target:?}");
        }
        self.responding = false;
    }

    /// Position of a sound heard within the last `window` seconds
    #[must_use]
    pub fn heard_within(&self, now: f32, window: f32) -> Option<Vec3> {
        self.heard
            .filter(|sound| now - sound.time <= window)
            .map(|sound| sound.position)
    }

    /// Store a sound if it lies within `hearing_range` of `listener`.
    ///
    /// Returns `true` if the sound is loud or close enough to investigate.
    pub fn hear(
        &mut self,
        listener: Vec3,
        position: Vec3,
        intensity: f32,
        hearing_range: f32,
        now: f32,
    ) -> bool {
        if hearing_range <= 0.0 {
            return false;
        }
        let distance = listener.distance(position);
        if distance > hearing_range {
            return false;
        }
        self.heard = Some(HeardSound {
            position,
            time: now,
            intensity,
        });
        intensity > 0.7 || distance < hearing_range * 0.5
    }
}

/// Counters of observed player behavior.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adaptation {
    pub dash_count: f32,
    pub attack_count: f32,
    /// Blocking stance; incoming damage is reduced while set
    pub defending: bool,
}

impl Adaptation {
    /// Learn from one hit taken. `dashing` tells whether the attacker was mid-dash.
    pub fn record_hit(&mut self, settings: &EnemySettings, dashing: bool) {
        if !settings.can_learn_player_patterns {
            return;
        }
        self.attack_count += settings.learning_rate;
        if dashing {
            self.dash_count += settings.learning_rate;
        }
    }

    #[must_use]
    pub fn counters_dash(&self, settings: &EnemySettings) -> bool {
        settings.can_counter_player_dash && self.dash_count > 3.0
    }

    #[must_use]
    pub fn adapts_to_attacks(&self, settings: &EnemySettings) -> bool {
        settings.can_adapt_to_player_attacks && self.attack_count > 5.0
    }

    /// Raise the guard near the target; each frame it may drop with a 10% roll.
    pub fn update_guard(&mut self, settings: &EnemySettings, target_distance: Option<f32>, roll: f32) {
        if !self.adapts_to_attacks(settings) {
            self.defending = false;
            return;
        }
        match target_distance {
            Some(distance) if distance < settings.attack_range * 1.2 => {
                self.defending = roll >= 0.1;
            }
            _ => self.defending = false,
        }
    }

    /// Damage after the guard reduction
    #[must_use]
    pub fn mitigate(&self, settings: &EnemySettings, amount: f32) -> f32 {
        if self.defending {
            amount * (1.0 - settings.defend_damage_reduction).clamp(0.0, 1.0)
        } else {
            amount
        }
    }
}
