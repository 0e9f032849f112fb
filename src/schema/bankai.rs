use serde::{Deserialize, Serialize};

/// How a Bankai pays off once released.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BankaiKind {
    /// A single delayed burst scaled by strength.
    Instant { damage_multiplier: f64 },
    /// Bonuses that last for the rest of the encounter.
    Buff { strength: u32, endurance: u32 },
}

/// The player's special ability. Rolled once per run and never changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bankai {
    pub name: String,
    /// Spoken before the name on release, e.g. "Shatter".
    pub release_command: String,
    pub description: String,
    /// CSS-style hex color the front-end uses for the release banner.
    pub visual_color: String,
    pub kind: BankaiKind,
}

impl Bankai {
    pub fn is_buff(&self) -> bool {
        matches!(self.kind, BankaiKind::Buff { .. })
    }

    /// Strength added to attack scaling while the buff is active.
    pub fn buff_strength(&self) -> u32 {
        match self.kind {
            BankaiKind::Buff { strength, .. } => strength,
            BankaiKind::Instant { .. } => 0,
        }
    }

    /// The line logged when the ability is released.
    pub fn release_line(&self) -> String {
        format!(
            "BANKAI: {}, {}!",
            self.release_command,
            self.name.to_uppercase()
        )
    }
}
