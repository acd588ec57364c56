//! Game Configuration
//!
//! All tuning records bundled into one file. RON is the primary format,
//! JSON is accepted as well; missing fields fall back to their defaults.
//!
//! ```ron
//! (
//!     movement: (walk_speed: 4.5),
//!     combat: (max_combo_count: 4, combo_damage_multipliers: [1.0, 1.1, 1.3, 1.8]),
//!     enemy: (can_use_ranged_attack: true),
//!     weapons: [(name: "Axe", base_damage: 18.0)],
//! )
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ai::enemy::EnemySettings;
use crate::player::{CombatSettings, MovementSettings, WeaponData};

/// Every settings record of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub movement: MovementSettings,
    pub combat: CombatSettings,
    pub enemy: EnemySettings,
    /// Weapons available to the player, in cycling order
    pub weapons: Vec<WeaponData>,
}

impl GameConfig {
    /// Parse and validate a RON document
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: GameConfig =
            ron::from_str(source).map_err(|e| ConfigError::Ron(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        let config: GameConfig =
            serde_json::from_str(source).map_err(|e| ConfigError::Json(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a RON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_ron(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_ron_str(&content)
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&content)
    }

    /// Load a configuration, picking the format from the file extension.
    ///
    /// `.json` is read as JSON, anything else as RON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::load_json(path)
        } else {
            Self::load_ron(path)
        }
    }

    /// Load a configuration, falling back to defaults if anything goes wrong.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded game config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Using default game config ({}): {e}", path.display());
                Self::default()
            }
        }
    }

    /// Serialize to pretty RON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Ron(e.to_string()))
    }

    /// Check the values the state machines rely on.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field
    pub fn validate(&self) -> Result<(), ConfigError> {
        let combat = &self.combat;
        if combat.combo_damage_multipliers.is_empty() {
            return Err(invalid("combat.combo_damage_multipliers is empty"));
        }
        if combat.max_combo_count == 0 {
            return Err(invalid("combat.max_combo_count must be at least 1"));
        }
        if combat.attack_delay > combat.attack_duration {
            return Err(invalid("combat.attack_delay exceeds combat.attack_duration"));
        }

        let timings = [
            ("combat.attack_duration", combat.attack_duration),
            ("combat.combo_time_window", combat.combo_time_window),
            ("combat.parry_active_window", combat.parry_active_window),
            ("combat.parry_recovery_time", combat.parry_recovery_time),
            ("movement.dash_duration", self.movement.dash_duration),
            ("enemy.attack_rate", self.enemy.attack_rate),
            ("enemy.ranged_attack_rate", self.enemy.ranged_attack_rate),
            ("enemy.projectile_speed", self.enemy.projectile_speed),
            ("enemy.projectile_lifetime", self.enemy.projectile_lifetime),
            ("enemy.max_health", self.enemy.max_health),
        ];
        if let Some((name, _)) = timings.iter().find(|(_, value)| *value <= 0.0) {
            return Err(invalid(&format!("{name} must be positive")));
        }

        for weapon in &self.weapons {
            if weapon.combo_damage_multipliers.is_empty() || weapon.max_combo_count == 0 {
                return Err(invalid(&format!("weapon '{}' has no combo steps", weapon.name)));
            }
            if weapon.attack_speed_multiplier <= 0.0 {
                return Err(invalid(&format!(
                    "weapon '{}' attack_speed_multiplier must be positive",
                    weapon.name
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid(reason.to_string())
}

/// Errors that can occur while loading a configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// IO error
    Io(String),
    /// RON parse or serialization error
    Ron(String),
    /// JSON parse error
    Json(String),
    /// Parsed values are unusable
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Ron(e) => write!(f, "RON error: {e}"),
            Self::Json(e) => write!(f, "JSON error: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
