use serde::{Deserialize, Serialize};

/// Newtype wrapper for item IDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

/// What an item is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon,
    Consumable,
    Key,
}

/// Which player attribute feeds a weapon's damage formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scaling {
    Str,
    Dex,
    None,
}

impl Scaling {
    /// Short label used in inventory listings: "STR", "DEX", "NONE".
    pub fn label(&self) -> &'static str {
        match self {
            Self::Str => "STR",
            Self::Dex => "DEX",
            Self::None => "NONE",
        }
    }
}

/// Combat numbers for weapon-kind items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub damage: u32,
    pub scaling: Scaling,
    /// Added to the parry success probability (0.25 = +25%).
    pub parry_bonus: f64,
    #[serde(default)]
    pub description: String,
}

/// An immutable item definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub kind: ItemKind,
    #[serde(default)]
    pub weapon_stats: Option<WeaponStats>,
}

/// Name shown in the combat log when nothing usable is equipped.
pub const UNARMED_NAME: &str = "Fists";

/// Stats used when the equipped weapon does not resolve to an owned weapon.
pub fn unarmed() -> WeaponStats {
    WeaponStats {
        damage: 5,
        scaling: Scaling::None,
        parry_bonus: 0.0,
        description: String::new(),
    }
}

impl Item {
    pub fn is_weapon(&self) -> bool {
        self.kind == ItemKind::Weapon && self.weapon_stats.is_some()
    }
}
