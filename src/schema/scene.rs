use serde::{Deserialize, Serialize};

/// Predicate over the player that decides whether a choice is offered.
///
/// Guards are plain data so scene tables stay serializable; the scene
/// graph evaluates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Guard {
    HasCodex(String),
    HasItem(String),
    MinLevel(u32),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

/// State change applied when a choice is taken, before the transition lands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transform {
    UnlockCodex(String),
    GrantItem {
        item: String,
        #[serde(default)]
        equip: bool,
    },
    Heal(u32),
    RestoreEstus(u32),
    /// Replace the player with the run's initial state.
    ResetRun,
    All(Vec<Transform>),
}

/// An edge in the scene graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    pub text: String,
    pub next_scene: String,
    #[serde(default)]
    pub guard: Option<Guard>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

/// A narrative node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub id: String,
    pub text: Vec<String>,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub choices: Vec<Choice>,
    /// Enemy id; entering the scene starts combat.
    #[serde(default)]
    pub encounter: Option<String>,
    /// Where the story continues after this scene's encounter is won.
    #[serde(default)]
    pub victory_scene: Option<String>,
}

impl Scene {
    pub fn has_encounter(&self) -> bool {
        self.encounter.is_some()
    }

    /// Every scene id this node can lead to, including the victory exit.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.choices
            .iter()
            .map(|c| c.next_scene.as_str())
            .chain(self.victory_scene.as_deref())
    }
}
