//! Simulation configuration.
//!
//! Every tunable constant of the tick engine lives here. The defaults
//! reproduce the reference balance; hosts may load overrides from JSON.

use crate::fixed::Fixed;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be positive")]
    NonPositive(&'static str),

    #[error("{0} must not be negative")]
    Negative(&'static str),

    #[error("roll range is empty: [{low}, {high}]")]
    InvalidRollRange { low: Fixed, high: Fixed },

    #[error("invalid config JSON: {0}")]
    Parse(String),
}

/// Simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Game hours that pass per real second at 1x speed.
    pub hours_per_real_second: Fixed,
    /// Compute a checksum for observer snapshots every N ticks (0 = disabled).
    pub checksum_frequency: u32,
    pub economy: EconomyConfig,
    pub military: MilitaryConfig,
    pub combat: CombatConfig,
    pub ai: AiConfig,
    pub diplomacy: DiplomacyConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hours_per_real_second: Fixed::ONE,
            checksum_frequency: 0,
            economy: EconomyConfig::default(),
            military: MilitaryConfig::default(),
            combat: CombatConfig::default(),
            ai: AiConfig::default(),
            diplomacy: DiplomacyConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Game hours between income passes (daily)
    pub interval_hours: Fixed,
    /// Income per development level before terrain scaling
    pub income_per_development: Fixed,
    /// Flat income bonus for coastal provinces
    pub coastal_bonus: Fixed,
    /// Divisor applied to population for daily manpower growth (1%)
    pub manpower_population_divisor: u32,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            interval_hours: Fixed::from_int(24),
            income_per_development: Fixed::from_int(10),
            coastal_bonus: Fixed::from_int(5),
            manpower_population_divisor: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilitaryConfig {
    /// Game hours between organization recovery passes
    pub interval_hours: Fixed,
    /// Organization regained per pass by units outside a battle
    pub org_recovery_per_pass: Fixed,
}

impl Default for MilitaryConfig {
    fn default() -> Self {
        Self {
            interval_hours: Fixed::ONE,
            org_recovery_per_pass: Fixed::from_int(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Game hours between combat rounds
    pub interval_hours: Fixed,
    /// Inclusive range the per-side random multiplier is drawn from
    pub roll_low: Fixed,
    pub roll_high: Fixed,
    /// Margin multiplier when the attacker wins
    pub attacker_win_coefficient: Fixed,
    /// Margin multiplier when the defender wins
    pub defender_win_coefficient: Fixed,
    /// Share of a unit's damage taken as hit points; the rest hits organization
    pub hp_damage_share: Fixed,
    /// Experience each participant gains per round fought
    pub experience_per_round: Fixed,
    /// War score for taking control of a province
    pub capture_war_score: Fixed,
    /// War score for holding a province against an attack
    pub defense_war_score: Fixed,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            interval_hours: Fixed::ONE,
            roll_low: Fixed::HALF,
            roll_high: Fixed::from_ratio(3, 2),
            attacker_win_coefficient: Fixed::HALF,
            defender_win_coefficient: Fixed::from_ratio(3, 10),
            hp_damage_share: Fixed::HALF,
            experience_per_round: Fixed::from_ratio(1, 10),
            capture_war_score: Fixed::from_int(5),
            defense_war_score: Fixed::from_int(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Game hours between AI decision passes (weekly)
    pub interval_hours: Fixed,
    /// Money above which the AI considers recruiting
    pub recruit_money_threshold: Fixed,
    /// Manpower above which the AI considers recruiting
    pub recruit_manpower_threshold: u64,
    /// The AI stops recruiting land units at this count
    pub max_land_units: usize,
    pub recruit_template: String,
    /// Own strength must exceed target strength by this factor to declare war
    pub war_strength_ratio: Fixed,
    /// War score at which the AI demands peace
    pub peace_demand_war_score: Fixed,
    /// War score at which the demanded side is asked to accept immediately
    pub peace_force_war_score: Fixed,
    pub max_annexations_per_treaty: usize,
    /// Whether AI countries may declare war on the player
    pub may_target_player: bool,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            interval_hours: Fixed::from_int(168),
            recruit_money_threshold: Fixed::from_int(500),
            recruit_manpower_threshold: 5000,
            max_land_units: 5,
            recruit_template: "infantry".to_string(),
            war_strength_ratio: Fixed::from_ratio(3, 2),
            peace_demand_war_score: Fixed::from_int(50),
            peace_force_war_score: Fixed::from_int(75),
            max_annexations_per_treaty: 3,
            may_target_player: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiplomacyConfig {
    /// War score at which a war ends with total annexation (None = never)
    pub auto_peace_war_score: Option<Fixed>,
    pub max_war_score: Fixed,
}

impl Default for DiplomacyConfig {
    fn default() -> Self {
        Self {
            auto_peace_war_score: Some(Fixed::HUNDRED),
            max_war_score: Fixed::HUNDRED,
        }
    }
}

impl SimConfig {
    /// Parses a (possibly partial) JSON config and validates it.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("hours_per_real_second", self.hours_per_real_second),
            ("economy.interval_hours", self.economy.interval_hours),
            ("military.interval_hours", self.military.interval_hours),
            ("combat.interval_hours", self.combat.interval_hours),
            ("ai.interval_hours", self.ai.interval_hours),
            ("diplomacy.max_war_score", self.diplomacy.max_war_score),
        ];
        for (name, value) in positive {
            if !value.is_positive() {
                return Err(ConfigError::NonPositive(name));
            }
        }

        let non_negative = [
            ("economy.income_per_development", self.economy.income_per_development),
            ("economy.coastal_bonus", self.economy.coastal_bonus),
            ("military.org_recovery_per_pass", self.military.org_recovery_per_pass),
            ("combat.attacker_win_coefficient", self.combat.attacker_win_coefficient),
            ("combat.defender_win_coefficient", self.combat.defender_win_coefficient),
            ("combat.experience_per_round", self.combat.experience_per_round),
            ("combat.capture_war_score", self.combat.capture_war_score),
            ("combat.defense_war_score", self.combat.defense_war_score),
        ];
        for (name, value) in non_negative {
            if value < Fixed::ZERO {
                return Err(ConfigError::Negative(name));
            }
        }

        if self.combat.roll_low < Fixed::ZERO || self.combat.roll_low > self.combat.roll_high {
            return Err(ConfigError::InvalidRollRange {
                low: self.combat.roll_low,
                high: self.combat.roll_high,
            });
        }
        if self.combat.hp_damage_share < Fixed::ZERO || self.combat.hp_damage_share > Fixed::ONE {
            return Err(ConfigError::Negative("combat.hp_damage_share"));
        }
        if self.economy.manpower_population_divisor == 0 {
            return Err(ConfigError::NonPositive("economy.manpower_population_divisor"));
        }
        Ok(())
    }
}
