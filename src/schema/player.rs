use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::bankai::Bankai;
use super::item::{unarmed, Item, WeaponStats, UNARMED_NAME};

/// The four spendable attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stat {
    Vitality,
    Endurance,
    Strength,
    Dexterity,
}

impl Stat {
    pub const ALL: [Stat; 4] = [
        Stat::Vitality,
        Stat::Endurance,
        Stat::Strength,
        Stat::Dexterity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Vitality => "vitality",
            Self::Endurance => "endurance",
            Self::Strength => "strength",
            Self::Dexterity => "dexterity",
        }
    }

    /// Parse a stat from its name or three-letter abbreviation.
    pub fn parse(s: &str) -> Option<Stat> {
        match s.to_lowercase().as_str() {
            "vitality" | "vit" => Some(Self::Vitality),
            "endurance" | "end" => Some(Self::Endurance),
            "strength" | "str" => Some(Self::Strength),
            "dexterity" | "dex" => Some(Self::Dexterity),
            _ => None,
        }
    }
}

/// Attribute block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub vitality: u32,
    pub endurance: u32,
    pub strength: u32,
    pub dexterity: u32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            vitality: 10,
            endurance: 10,
            strength: 10,
            dexterity: 10,
        }
    }
}

impl PlayerStats {
    pub fn get(&self, stat: Stat) -> u32 {
        match stat {
            Stat::Vitality => self.vitality,
            Stat::Endurance => self.endurance,
            Stat::Strength => self.strength,
            Stat::Dexterity => self.dexterity,
        }
    }

    pub fn get_mut(&mut self, stat: Stat) -> &mut u32 {
        match stat {
            Stat::Vitality => &mut self.vitality,
            Stat::Endurance => &mut self.endurance,
            Stat::Strength => &mut self.strength,
            Stat::Dexterity => &mut self.dexterity,
        }
    }
}

/// Everything that describes the player during a run.
///
/// Owned by the orchestrator and threaded through the engine by value:
/// every subsystem takes the current state and hands back the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub stamina: u32,
    pub max_stamina: u32,
    pub estus: u32,
    pub inventory: Vec<Item>,
    /// Name of the equipped item, as shown in the inventory.
    pub equipped_weapon: String,
    /// Insertion-ordered and duplicate free.
    pub unlocked_codex_entries: Vec<String>,
    pub codex_images: HashMap<String, String>,
    pub stats: PlayerStats,
    pub level: u32,
    pub xp: u32,
    pub xp_to_next_level: u32,
    pub attribute_points: u32,
    pub limit_gauge: u32,
    pub max_limit_gauge: u32,
    pub bankai: Bankai,
}

impl PlayerState {
    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    pub fn has_codex(&self, id: &str) -> bool {
        self.unlocked_codex_entries.iter().any(|e| e == id)
    }

    pub fn has_item(&self, id: &str) -> bool {
        self.inventory.iter().any(|item| item.id.0 == id)
    }

    pub fn limit_full(&self) -> bool {
        self.limit_gauge >= self.max_limit_gauge
    }

    /// The equipped weapon's display name and stats, or the unarmed
    /// fallback when the name does not resolve to an owned weapon.
    pub fn weapon(&self) -> (&str, WeaponStats) {
        self.inventory
            .iter()
            .find(|item| item.name == self.equipped_weapon && item.is_weapon())
            .and_then(|item| {
                item.weapon_stats
                    .clone()
                    .map(|stats| (item.name.as_str(), stats))
            })
            .unwrap_or_else(|| (UNARMED_NAME, unarmed()))
    }

    pub fn healed(mut self, amount: u32) -> Self {
        self.hp = self.hp.saturating_add(amount).min(self.max_hp);
        self
    }

    pub fn damaged(mut self, amount: u32) -> Self {
        self.hp = self.hp.saturating_sub(amount);
        self
    }

    pub fn rested(mut self, amount: u32) -> Self {
        self.stamina = self.stamina.saturating_add(amount).min(self.max_stamina);
        self
    }

    pub fn exerted(mut self, amount: u32) -> Self {
        self.stamina = self.stamina.saturating_sub(amount);
        self
    }
}

/// Starting values for a new run, as written in the story manifest.
/// Item references are ids resolved against the item table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerTemplate {
    pub name: String,
    pub hp: u32,
    pub stamina: u32,
    pub estus: u32,
    pub inventory: Vec<String>,
    pub equipped_weapon: String,
    #[serde(default)]
    pub stats: PlayerStats,
    #[serde(default = "default_xp_to_next")]
    pub xp_to_next_level: u32,
    #[serde(default = "default_max_limit")]
    pub max_limit_gauge: u32,
}

fn default_xp_to_next() -> u32 {
    100
}

fn default_max_limit() -> u32 {
    100
}
