/// Balance constants — every number the engine formulas read.
///
/// `Tuning::default()` carries the canonical values. A RON file may override
/// any subset; omitted fields keep their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid tuning value: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    // Player action costs
    pub attack_cost: u32,
    pub parry_cost: u32,
    pub dodge_cost: u32,
    pub block_regen: u32,

    // Damage and chance formulas
    pub attack_scaling_factor: f64,
    /// Exclusive upper bound of the uniform attack roll.
    pub attack_roll_max: f64,
    pub parry_base_chance: f64,
    pub dodge_base_chance: f64,
    /// Chance added per point of dexterity, for both parry and dodge.
    pub dexterity_chance_step: f64,
    pub parry_stamina_break: u32,
    pub dodge_stamina_break: u32,
    pub failed_parry_multiplier: f64,

    // Estus
    pub estus_base_heal: u32,
    pub estus_vitality_factor: u32,

    // Limit gauge
    pub limit_gain_attack: u32,
    pub limit_gain_parry: u32,
    pub limit_gain_dodge: u32,
    pub limit_gain_enemy_turn: u32,

    // Bankai
    pub bankai_base_damage: u32,
    pub bankai_strength_factor: u32,
    /// Used when an instant Bankai carries a non-positive multiplier.
    pub bankai_fallback_multiplier: f64,

    // Enemy turn
    pub enemy_attack_cost: u32,
    pub enemy_rest_threshold: u32,
    pub enemy_rest_recovery: u32,
    pub block_damage_factor: f64,
    pub buffed_block_factor: f64,
    pub block_stamina_cost: u32,
    pub player_turn_regen: u32,

    // Timing, in milliseconds
    pub settle_delay_ms: u64,
    pub failed_parry_delay_ms: u64,
    pub bankai_strike_delay_ms: u64,
    pub victory_delay_ms: u64,
    pub defeat_delay_ms: u64,

    // Progression
    pub level_threshold_growth: f64,
    pub vitality_hp_step: u32,
    pub endurance_stamina_step: u32,

    // Story
    /// Healing applied on every transition once the regen marker is unlocked.
    pub passive_regen: u32,
    pub image_description_cap: usize,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            attack_cost: 20,
            parry_cost: 25,
            dodge_cost: 15,
            block_regen: 10,
            attack_scaling_factor: 0.5,
            attack_roll_max: 5.0,
            parry_base_chance: 0.30,
            dodge_base_chance: 0.50,
            dexterity_chance_step: 0.01,
            parry_stamina_break: 50,
            dodge_stamina_break: 15,
            failed_parry_multiplier: 1.5,
            estus_base_heal: 50,
            estus_vitality_factor: 2,
            limit_gain_attack: 5,
            limit_gain_parry: 30,
            limit_gain_dodge: 10,
            limit_gain_enemy_turn: 2,
            bankai_base_damage: 50,
            bankai_strength_factor: 2,
            bankai_fallback_multiplier: 3.0,
            enemy_attack_cost: 20,
            enemy_rest_threshold: 20,
            enemy_rest_recovery: 40,
            block_damage_factor: 0.2,
            buffed_block_factor: 0.5,
            block_stamina_cost: 30,
            player_turn_regen: 25,
            settle_delay_ms: 1000,
            failed_parry_delay_ms: 500,
            bankai_strike_delay_ms: 2000,
            victory_delay_ms: 4500,
            defeat_delay_ms: 1500,
            level_threshold_growth: 1.2,
            vitality_hp_step: 10,
            endurance_stamina_step: 5,
            passive_regen: 5,
            image_description_cap: 150,
        }
    }
}

impl Tuning {
    /// Load tuning overrides from a RON file.
    pub fn load_from_ron(path: &Path) -> Result<Tuning, TuningError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Parse tuning overrides from a RON string and validate them.
    pub fn parse_ron(input: &str) -> Result<Tuning, TuningError> {
        let tuning: Tuning = ron::from_str(input)?;
        tuning.validate()?;
        Ok(tuning)
    }

    pub fn validate(&self) -> Result<(), TuningError> {
        if self.level_threshold_growth.is_nan() || self.level_threshold_growth < 1.0 {
            return Err(TuningError::Invalid(format!(
                "level_threshold_growth must be >= 1.0, got {}",
                self.level_threshold_growth
            )));
        }
        if self.attack_roll_max.is_nan() || self.attack_roll_max <= 0.0 {
            return Err(TuningError::Invalid(
                "attack_roll_max must be positive".to_string(),
            ));
        }
        for (name, factor) in [
            ("block_damage_factor", self.block_damage_factor),
            ("buffed_block_factor", self.buffed_block_factor),
        ] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(TuningError::Invalid(format!(
                    "{} must be within 0..=1, got {}",
                    name, factor
                )));
            }
        }
        Ok(())
    }

    /// Parry success probability for the given dexterity and weapon bonus.
    pub fn parry_chance(&self, dexterity: u32, parry_bonus: f64) -> f64 {
        self.parry_base_chance + self.dexterity_chance_step * dexterity as f64 + parry_bonus
    }

    pub fn dodge_chance(&self, dexterity: u32) -> f64 {
        self.dodge_base_chance + self.dexterity_chance_step * dexterity as f64
    }

    pub fn estus_heal(&self, vitality: u32) -> u32 {
        self.estus_base_heal + self.estus_vitality_factor * vitality
    }
}
