/// Progression — leveling, attribute spending, weapon equip, the limit
/// gauge, and the once-per-run Bankai roll.
///
/// Every operation takes the current `PlayerState` by value and returns the
/// next one.

use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::core::tuning::Tuning;
use crate::schema::bankai::{Bankai, BankaiKind};
use crate::schema::player::{PlayerState, Stat};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressionError {
    #[error("no attribute points to spend")]
    NoAttributePoints,
    #[error("'{0}' is not in the inventory")]
    NotOwned(String),
    #[error("'{0}' is not a weapon")]
    NotAWeapon(String),
}

/// Result of awarding experience.
#[derive(Debug, Clone, PartialEq)]
pub struct XpAward {
    pub player: PlayerState,
    pub levels_gained: u32,
}

/// Add experience and run the leveling loop: while xp meets the threshold,
/// subtract it, gain a level and an attribute point, and grow the threshold.
pub fn award_xp(mut player: PlayerState, xp: u32, tuning: &Tuning) -> XpAward {
    player.xp = player.xp.saturating_add(xp);
    let mut levels_gained = 0;

    while player.xp_to_next_level > 0 && player.xp >= player.xp_to_next_level {
        player.xp -= player.xp_to_next_level;
        player.level += 1;
        player.attribute_points += 1;
        player.xp_to_next_level =
            (player.xp_to_next_level as f64 * tuning.level_threshold_growth).floor() as u32;
        levels_gained += 1;
    }

    if levels_gained > 0 {
        info!(
            level = player.level,
            levels_gained,
            xp = player.xp,
            xp_to_next_level = player.xp_to_next_level,
            "level_up"
        );
    }
    XpAward {
        player,
        levels_gained,
    }
}

/// Commit one attribute point to `stat`.
///
/// Vitality raises max hp and current hp by the same step; endurance raises
/// max stamina only.
pub fn spend_attribute_point(
    mut player: PlayerState,
    stat: Stat,
    tuning: &Tuning,
) -> Result<PlayerState, ProgressionError> {
    if player.attribute_points == 0 {
        return Err(ProgressionError::NoAttributePoints);
    }
    player.attribute_points -= 1;
    *player.stats.get_mut(stat) += 1;

    match stat {
        Stat::Vitality => {
            player.max_hp += tuning.vitality_hp_step;
            player.hp += tuning.vitality_hp_step;
        }
        Stat::Endurance => {
            player.max_stamina += tuning.endurance_stamina_step;
        }
        Stat::Strength | Stat::Dexterity => {}
    }

    debug!(
        stat = stat.name(),
        value = player.stats.get(stat),
        remaining_points = player.attribute_points,
        "attribute_point_spent"
    );
    Ok(player)
}

/// Equip an owned weapon by its display name.
pub fn equip_weapon(mut player: PlayerState, name: &str) -> Result<PlayerState, ProgressionError> {
    let item = player
        .inventory
        .iter()
        .find(|item| item.name == name)
        .ok_or_else(|| ProgressionError::NotOwned(name.to_string()))?;
    if !item.is_weapon() {
        return Err(ProgressionError::NotAWeapon(name.to_string()));
    }
    player.equipped_weapon = name.to_string();
    debug!(weapon = name, "weapon_equipped");
    Ok(player)
}

/// Charge the limit gauge, capped at its maximum.
pub fn gain_limit(mut player: PlayerState, amount: u32) -> PlayerState {
    player.limit_gauge = player
        .limit_gauge
        .saturating_add(amount)
        .min(player.max_limit_gauge);
    player
}

const BANKAI_PREFIXES: &[&str] = &[
    "Crimson", "Black", "Celestial", "Infernal", "Spirit", "Thunder", "Endless", "Void",
    "Bloodied", "Ancient",
];
const BANKAI_NOUNS: &[&str] = &[
    "Dragon", "Moon", "Blade", "Lotus", "Demon", "Storm", "Shadow", "King", "Serpent",
    "Phoenix",
];
const BANKAI_SUFFIXES: &[&str] = &[
    "Reaver", "Devourer", "Dance", "Wrath", "Sovereign", "Fang", "Flame", "Scream", "Seal",
    "Lament",
];
const RELEASE_COMMANDS: &[&str] = &[
    "Awaken", "Shatter", "Roar", "Annihilate", "Ascend", "Darken", "Illuminate", "Devour",
    "Dance", "Reign",
];
const VISUAL_COLORS: &[&str] = &[
    "#ef4444", "#a855f7", "#3b82f6", "#eab308", "#22c55e", "#ec4899",
];

const INSTANT_DESCRIPTION: &str =
    "Condenses spirit energy into a single devastating blow. Deals massive damage.";
const BUFF_DESCRIPTION: &str =
    "Breaks the warrior's limits. Damage and defense rise for the rest of the fight.";

fn pick<R: Rng>(rng: &mut R, words: &[&'static str]) -> &'static str {
    words.choose(rng).copied().unwrap_or_default()
}

/// Roll the run's Bankai. Called once at new-game time.
pub fn generate_bankai<R: Rng>(rng: &mut R) -> Bankai {
    let name = format!(
        "{} {} {}",
        pick(rng, BANKAI_PREFIXES),
        pick(rng, BANKAI_NOUNS),
        pick(rng, BANKAI_SUFFIXES)
    );
    let release_command = pick(rng, RELEASE_COMMANDS).to_string();
    let instant = rng.gen_bool(0.5);
    let visual_color = pick(rng, VISUAL_COLORS).to_string();

    let (description, kind) = if instant {
        (
            INSTANT_DESCRIPTION,
            BankaiKind::Instant {
                damage_multiplier: 5.0,
            },
        )
    } else {
        (
            BUFF_DESCRIPTION,
            BankaiKind::Buff {
                strength: 20,
                endurance: 20,
            },
        )
    };

    let bankai = Bankai {
        name,
        release_command,
        description: description.to_string(),
        visual_color,
        kind,
    };
    info!(name = %bankai.name, buff = bankai.is_buff(), "bankai_rolled");
    bankai
}
