//! Enemy tuning record

use serde::{Deserialize, Serialize};

use crate::physics::LayerMask;

use super::abilities::EnemyClass;

/// Shared enemy archetype. One instance usually parameterizes a whole group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySettings {
    // Movement
    pub move_speed: f32,
    pub chase_speed: f32,
    pub patrol_speed: f32,
    /// Turn rate used when facing a target
    pub rotation_speed: f32,
    /// Navigation stopping distance
    pub stopping_distance: f32,
    /// Radius used to sample random patrol / investigate points
    pub wander_radius: f32,

    // Perception
    pub detection_range: f32,
    /// Full vision cone angle in degrees
    pub detection_angle: f32,
    /// Zero disables hearing
    pub hearing_range: f32,
    pub target_layers: LayerMask,
    pub obstacle_layers: LayerMask,
    pub ally_layers: LayerMask,

    // Melee
    pub attack_range: f32,
    pub attack_power: f32,
    /// Seconds per attack cycle
    pub attack_rate: f32,
    /// Grace period before a lost target is given up
    pub target_lost_time: f32,

    // Health and fleeing
    pub max_health: f32,
    pub can_flee: bool,
    pub flee_health_percentage: f32,
    pub max_flee_time: f32,

    // Ranged
    pub can_use_ranged_attack: bool,
    pub ranged_attack_distance: f32,
    pub ranged_attack_rate: f32,
    pub ranged_attack_power: f32,
    /// Shots per ranged cycle
    pub ranged_volley_count: u32,
    pub ranged_volley_interval: f32,
    /// Launch speed of projectiles (units/s)
    pub projectile_speed: f32,
    /// Seconds a projectile flies before it is discarded
    pub projectile_lifetime: f32,

    // Class ability
    /// `None` disables special abilities
    pub enemy_class: Option<EnemyClass>,
    /// Seconds between ability uses; also the wait after spawning
    pub special_ability_cooldown: f32,
    /// Below this health fraction a ready ability is always used
    pub ability_health_threshold: f32,
    /// Per-frame chance of using a ready ability otherwise
    pub ability_chance: f32,

    // Group behavior
    pub can_call_for_help: bool,
    pub help_call_range: f32,
    pub can_coordinate_attacks: bool,

    // Adaptation
    pub can_learn_player_patterns: bool,
    pub learning_rate: f32,
    pub can_counter_player_dash: bool,
    pub can_adapt_to_player_attacks: bool,
    /// Fraction of damage ignored while defending
    pub defend_damage_reduction: f32,
}

impl Default for EnemySettings {
    fn default() -> Self {
        Self {
            move_speed: 3.5,
            chase_speed: 5.0,
            patrol_speed: 2.0,
            rotation_speed: 5.0,
            stopping_distance: 0.5,
            wander_radius: 10.0,
            detection_range: 10.0,
            detection_angle: 60.0,
            hearing_range: 15.0,
            target_layers: LayerMask::PLAYER,
            obstacle_layers: LayerMask::OBSTACLE,
            ally_layers: LayerMask::ENEMY,
            attack_range: 2.0,
            attack_power: 10.0,
            attack_rate: 1.5,
            target_lost_time: 5.0,
            max_health: 100.0,
            can_flee: true,
            flee_health_percentage: 0.3,
            max_flee_time: 10.0,
            can_use_ranged_attack: false,
            ranged_attack_distance: 10.0,
            ranged_attack_rate: 2.0,
            ranged_attack_power: 8.0,
            ranged_volley_count: 1,
            ranged_volley_interval: 0.2,
            projectile_speed: 20.0,
            projectile_lifetime: 5.0,
            enemy_class: None,
            special_ability_cooldown: 15.0,
            ability_health_threshold: 0.5,
            ability_chance: 0.2,
            can_call_for_help: true,
            help_call_range: 15.0,
            can_coordinate_attacks: true,
            can_learn_player_patterns: true,
            learning_rate: 1.0,
            can_counter_player_dash: true,
            can_adapt_to_player_attacks: true,
            defend_damage_reduction: 0.5,
        }
    }
}

impl EnemySettings {
    /// Whether `distance` lies in the band served by ranged attacks.
    #[must_use]
    pub fn in_ranged_band(&self, distance: f32) -> bool {
        self.can_use_ranged_attack
            && distance > self.attack_range * 1.5
            && distance <= self.ranged_attack_distance
    }
}
