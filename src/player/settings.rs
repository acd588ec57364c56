//! Player tuning records
//!
//! Loaded once per session (see [`crate::config::GameConfig`]) and shared by
//! `Rc` between the controller and its states. Every field has a default so a
//! partial RON/JSON file is enough.

use serde::{Deserialize, Serialize};

use crate::core::RandomSource;
use crate::physics::LayerMask;

// ============================================================================
// Movement
// ============================================================================

/// Locomotion tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    /// Walking speed (units/s)
    pub walk_speed: f32,
    /// Sprinting speed (units/s)
    pub run_speed: f32,
    /// Crouched speed (units/s)
    pub crouch_speed: f32,
    /// Jump apex height
    pub jump_height: f32,
    /// Scale applied to world gravity while airborne
    pub gravity_multiplier: f32,
    /// Optional terminal downward speed
    pub max_fall_speed: Option<f32>,
    /// How fast the character turns toward its movement direction
    pub rotation_speed: f32,
    /// Capsule height scale while crouched
    pub crouch_height_ratio: f32,
    /// Dash speed (units/s)
    pub dash_speed: f32,
    /// Dash length in seconds
    pub dash_duration: f32,
    /// Delay after a dash ends before the next one
    pub dash_cooldown: f32,
    /// Whether the dash follows movement input after it starts
    pub can_change_direction_while_dashing: bool,
    /// Fraction of incoming damage ignored while dashing
    pub dash_damage_reduction: f32,
}

impl Default for MovementSettings {
    fn default() -> Self {
        Self {
            walk_speed: 5.0,
            run_speed: 8.0,
            crouch_speed: 2.0,
            jump_height: 1.5,
            gravity_multiplier: 2.5,
            max_fall_speed: None,
            rotation_speed: 10.0,
            crouch_height_ratio: 0.6,
            dash_speed: 15.0,
            dash_duration: 0.2,
            dash_cooldown: 1.5,
            can_change_direction_while_dashing: false,
            dash_damage_reduction: 0.5,
        }
    }
}

// ============================================================================
// Combat
// ============================================================================

/// Unarmed combat tuning plus the parry timings and player health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    pub max_health: f32,
    pub base_damage: f32,
    pub attack_range: f32,
    /// Full cone angle in degrees
    pub attack_angle: f32,
    /// Length of one swing
    pub attack_duration: f32,
    /// Time from swing start to the hit
    pub attack_delay: f32,
    /// Lockout after a combo sequence ends
    pub attack_cooldown: f32,
    pub max_combo_count: usize,
    /// How long after a hit the next press still chains
    pub combo_time_window: f32,
    pub combo_damage_multipliers: Vec<f32>,
    /// Movement speed scale while attacking
    pub movement_speed_multiplier: f32,
    pub parry_active_window: f32,
    pub parry_recovery_time: f32,
    pub parry_range: f32,
    pub parry_cooldown: f32,
    /// Damage scale of the first hit after a successful parry
    pub parry_counter_damage_multiplier: f32,
    /// Attackers that can be parried per window, `None` for no limit
    pub parry_max_targets: Option<u32>,
    pub target_layers: LayerMask,
    pub attack_sounds: Vec<String>,
    pub hit_sounds: Vec<String>,
    pub parry_sound: Option<String>,
    pub parry_success_sound: Option<String>,
    pub hurt_sound: Option<String>,
    pub death_sound: Option<String>,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            max_health: 100.0,
            base_damage: 10.0,
            attack_range: 2.0,
            attack_angle: 60.0,
            attack_duration: 0.5,
            attack_delay: 0.2,
            attack_cooldown: 0.1,
            max_combo_count: 3,
            combo_time_window: 0.8,
            combo_damage_multipliers: vec![1.0, 1.2, 1.5],
            movement_speed_multiplier: 0.7,
            parry_active_window: 0.2,
            parry_recovery_time: 0.5,
            parry_range: 1.5,
            parry_cooldown: 1.0,
            parry_counter_damage_multiplier: 1.5,
            parry_max_targets: None,
            target_layers: LayerMask::ENEMY | LayerMask::DESTRUCTIBLE,
            attack_sounds: Vec::new(),
            hit_sounds: Vec::new(),
            parry_sound: None,
            parry_success_sound: None,
            hurt_sound: None,
            death_sound: None,
        }
    }
}

/// Multiplier for `combo_index`, clamped into the table. An empty table is 1.0.
#[must_use]
pub fn combo_multiplier(multipliers: &[f32], combo_index: usize) -> f32 {
    match multipliers.len() {
        0 => 1.0,
        len => multipliers[combo_index.min(len - 1)],
    }
}

impl CombatSettings {
    /// Unarmed damage of the given combo step.
    #[must_use]
    pub fn calculate_damage(&self, combo_index: usize) -> f32 {
        self.base_damage * combo_multiplier(&self.combo_damage_multipliers, combo_index)
    }
}

// ============================================================================
// Weapons
// ============================================================================

/// Weapon family, used for presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WeaponKind {
    Fist,
    #[default]
    Sword,
    Axe,
    Hammer,
    Spear,
    Dagger,
    Staff,
    Bow,
    Wand,
    Custom,
}

/// Elemental bonus carried by a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Element {
    #[default]
    None,
    Fire,
    Ice,
    Electric,
    Poison,
}

/// Equippable weapon. Overrides the unarmed [`CombatSettings`] values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponData {
    pub name: String,
    pub kind: WeaponKind,
    pub base_damage: f32,
    /// Swing speed scale: 2.0 halves delay and duration
    pub attack_speed_multiplier: f32,
    pub attack_range: f32,
    pub attack_angle: f32,
    pub max_combo_count: usize,
    pub combo_damage_multipliers: Vec<f32>,
    /// Empty mask means "use the combat settings' layers"
    pub target_layers: LayerMask,
    pub element: Element,
    pub elemental_damage: f32,
    pub critical_chance: f32,
    pub critical_damage_multiplier: f32,
    pub attack_sounds: Vec<String>,
    pub hit_sounds: Vec<String>,
}

impl Default for WeaponData {
    fn default() -> Self {
        Self {
            name: String::from("Basic Sword"),
            kind: WeaponKind::Sword,
            base_damage: 10.0,
            attack_speed_multiplier: 1.0,
            attack_range: 2.0,
            attack_angle: 60.0,
            max_combo_count: 3,
            combo_damage_multipliers: vec![1.0, 1.2, 1.5],
            target_layers: LayerMask::NONE,
            element: Element::None,
            elemental_damage: 0.0,
            critical_chance: 0.05,
            critical_damage_multiplier: 2.0,
            attack_sounds: Vec::new(),
            hit_sounds: Vec::new(),
        }
    }
}

impl WeaponData {
    /// Damage of the given combo step, rolling for a critical hit.
    ///
    /// Returns the damage and whether it was a critical.
    pub fn calculate_damage(&self, combo_index: usize, rng: &mut dyn RandomSource) -> (f32, bool) {
        let damage = self.base_damage * combo_multiplier(&self.combo_damage_multipliers, combo_index);
        if rng.value() < self.critical_chance {
            (damage * self.critical_damage_multiplier, true)
        } else {
            (damage, false)
        }
    }

    /// Bonus damage added to every hit
    #[must_use]
    pub fn elemental_bonus(&self) -> f32 {
        match self.element {
            Element::None => 0.0,
            _ => self.elemental_damage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRandom;

    #[test]
    fn test_combo_damage_uses_clamped_multiplier() {
        let combat = CombatSettings::default();
        assert_eq!(combat.calculate_damage(0), 10.0);
        assert_eq!(combat.calculate_damage(1), 12.0);
        assert_eq!(combat.calculate_damage(2), 15.0);
        assert_eq!(combat.calculate_damage(9), 15.0);
    }

    #[test]
    fn test_empty_multipliers_default_to_one() {
        assert_eq!(combo_multiplier(&[], 4), 1.0);
    }

    #[test]
    fn test_weapon_critical_roll() {
        let weapon = WeaponData {
            base_damage: 20.0,
            ..WeaponData::default()
        };
        let mut rng = ScriptedRandom::new([0.01, 0.5]);
        assert_eq!(weapon.calculate_damage(1, &mut rng), (48.0, true));
        assert_eq!(weapon.calculate_damage(1, &mut rng), (24.0, false));
    }

    #[test]
    fn test_elemental_bonus_requires_element() {
        let mut weapon = WeaponData {
            elemental_damage: 4.0,
            ..WeaponData::default()
        };
        assert_eq!(weapon.elemental_bonus(), 0.0);
        weapon.element = Element::Fire;
        assert_eq!(weapon.elemental_bonus(), 4.0);
    }

    #[test]
    fn test_partial_settings_fill_defaults() {
        let movement: MovementSettings = ron::from_str("(walk_speed: 3.0)").unwrap();
        assert_eq!(movement.walk_speed, 3.0);
        assert_eq!(movement.run_speed, 8.0);
    }
}
