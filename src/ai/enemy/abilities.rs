//! Class special abilities
//!
//! Every [`EnemyClass`] owns one [`SpecialAbility`]. An ability winds up,
//! takes effect once, and may then keep a buff running for a while. The
//! controller keeps the running ability in an [`ActiveAbility`] slot and
//! decides when to start one (see `EnemyAgent::update_ability`).

use serde::{Deserialize, Serialize};

use crate::ai::effects::{Countdown, TimedEffect, Volley};

/// Combat class of an enemy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnemyClass {
    Warrior,
    Archer,
    Mage,
    Rogue,
    Guard,
    Hunter,
    Marauder,
    Beast,
}

impl EnemyClass {
    /// Every class, in table order
    pub const ALL: [EnemyClass; 8] = [
        EnemyClass::Warrior,
        EnemyClass::Archer,
        EnemyClass::Mage,
        EnemyClass::Rogue,
        EnemyClass::Guard,
        EnemyClass::Hunter,
        EnemyClass::Marauder,
        EnemyClass::Beast,
    ];

    /// The class's special ability
    #[must_use]
    pub fn ability(self) -> SpecialAbility {
        match self {
            Self::Warrior => SpecialAbility::PowerStrike,
            Self::Archer => SpecialAbility::RapidShot,
            Self::Mage => SpecialAbility::MagicBurst,
            Self::Rogue => SpecialAbility::Stealth,
            Self::Guard => SpecialAbility::DefensiveStance,
            Self::Hunter => SpecialAbility::PlaceTrap,
            Self::Marauder => SpecialAbility::Berserk,
            Self::Beast => SpecialAbility::WildRoar,
        }
    }
}

/// What a class does when its ability fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialAbility {
    /// One heavy melee hit with extended reach
    PowerStrike,
    /// A quick burst of weaker, faster projectiles
    RapidShot,
    /// Area damage around the caster
    MagicBurst,
    /// Slips around faster for a while
    Stealth,
    /// Takes reduced damage for a while
    DefensiveStance,
    /// Drops a trap where it stands
    PlaceTrap,
    /// Faster movement and attacks for a while
    Berserk,
    /// Rallies every ally in help range
    WildRoar,
}

impl SpecialAbility {
    /// Damage scale of the power strike
    pub const POWER_STRIKE_DAMAGE: f32 = 2.5;
    /// Reach of the power strike as a multiple of the attack range
    pub const POWER_STRIKE_REACH: f32 = 1.5;
    /// Shots in a rapid-shot burst
    pub const RAPID_SHOT_COUNT: u32 = 3;
    /// Seconds between rapid shots
    pub const RAPID_SHOT_INTERVAL: f32 = 0.4;
    /// Damage scale of each rapid shot
    pub const RAPID_SHOT_DAMAGE: f32 = 0.7;
    /// Speed scale of each rapid shot
    pub const RAPID_SHOT_SPEED: f32 = 1.5;
    /// Radius of the magic burst
    pub const MAGIC_BURST_RADIUS: f32 = 5.0;
    /// Damage scale of the magic burst
    pub const MAGIC_BURST_DAMAGE: f32 = 1.8;
    /// Fraction of incoming damage ignored in the defensive stance
    pub const DEFENSIVE_REDUCTION: f32 = 0.5;

    /// Display name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::PowerStrike => "Power Strike",
            Self::RapidShot => "Rapid Shot",
            Self::MagicBurst => "Magic Burst",
            Self::Stealth => "Stealth",
            Self::DefensiveStance => "Defensive Stance",
            Self::PlaceTrap => "Place Trap",
            Self::Berserk => "Berserk",
            Self::WildRoar => "Wild Roar",
        }
    }

    /// Seconds between activation and the effect
    #[must_use]
    pub fn windup(self) -> f32 {
        match self {
            Self::PowerStrike => 0.7,
            Self::RapidShot => 0.2,
            Self::MagicBurst => 0.8,
            Self::PlaceTrap | Self::WildRoar => 0.5,
            Self::Stealth | Self::DefensiveStance | Self::Berserk => 0.0,
        }
    }

    /// Seconds the effect lasts once it lands; zero for one-shot effects
    #[must_use]
    pub fn duration(self) -> f32 {
        match self {
            Self::Stealth | Self::Berserk => 5.0,
            Self::DefensiveStance => 6.0,
            _ => 0.0,
        }
    }

    /// Movement speed scale while the effect lasts
    #[must_use]
    pub fn speed_multiplier(self) -> f32 {
        match self {
            Self::Stealth => 1.5,
            Self::Berserk => 1.8,
            _ => 1.0,
        }
    }

    /// Attack cycle scale while the effect lasts
    #[must_use]
    pub fn attack_rate_multiplier(self) -> f32 {
        match self {
            Self::Berserk => 0.5,
            _ => 1.0,
        }
    }

    /// Incoming damage scale while the effect lasts
    #[must_use]
    pub fn damage_taken_multiplier(self) -> f32 {
        match self {
            Self::DefensiveStance => 1.0 - Self::DEFENSIVE_REDUCTION,
            _ => 1.0,
        }
    }
}

/// An ability in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveAbility {
    ability: SpecialAbility,
    windup: Countdown,
    effect: Countdown,
    triggered: bool,
    volley: Option<Volley>,
}

impl ActiveAbility {
    #[must_use]
    pub fn new(ability: SpecialAbility) -> Self {
        let volley = (ability == SpecialAbility::RapidShot).then(|| {
            Volley::new(
                SpecialAbility::RAPID_SHOT_COUNT,
                SpecialAbility::RAPID_SHOT_INTERVAL,
            )
        });
        Self {
            ability,
            windup: Countdown::new(ability.windup()),
            effect: Countdown::new(ability.duration()),
            triggered: false,
            volley,
        }
    }

    #[must_use]
    pub fn ability(&self) -> SpecialAbility {
        self.ability
    }

    /// Advance by `dt`. Returns `true` on the tick the windup completes.
    pub fn step(&mut self, dt: f32) -> bool {
        if self.triggered {
            self.effect.step(dt);
            return false;
        }
        self.windup.step(dt);
        self.triggered = self.windup.is_finished();
        self.triggered
    }

    /// Shots due this tick. Only rapid shot fires, and only after its windup.
    pub fn shots_due(&mut self, dt: f32) -> u32 {
        match self.volley.as_mut() {
            Some(volley) if self.triggered => volley.step(dt),
            _ => 0,
        }
    }

    /// The effect has landed and its buff is still running
    #[must_use]
    pub fn is_buffing(&self) -> bool {
        self.triggered && !self.effect.is_finished()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.triggered
            && self.effect.is_finished()
            && self.volley.as_ref().is_none_or(Volley::is_finished)
    }

    /// Speed scale currently in force
    #[must_use]
    pub fn speed_multiplier(&self) -> f32 {
        if self.is_buffing() {
            self.ability.speed_multiplier()
        } else {
            1.0
        }
    }

    /// Attack cycle scale currently in force
    #[must_use]
    pub fn attack_rate_multiplier(&self) -> f32 {
        if self.is_buffing() {
            self.ability.attack_rate_multiplier()
        } else {
            1.0
        }
    }

    /// Incoming damage scale currently in force
    #[must_use]
    pub fn damage_taken_multiplier(&self) -> f32 {
        if self.is_buffing() {
            self.ability.damage_taken_multiplier()
        } else {
            1.0
        }
    }
}
