/// Static content tables — loading, lookup, and load-time integrity checks.
///
/// A content pack is six RON files: `story.ron` (manifest), `scenes.ron`,
/// `items.ron`, `enemies.ron`, `codex.ron` and `tooltips.ron`. The built-in
/// pack is compiled into the library; other packs load from a directory.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::schema::bankai::Bankai;
use crate::schema::codex::CodexEntry;
use crate::schema::enemy::Enemy;
use crate::schema::item::Item;
use crate::schema::player::{PlayerState, PlayerTemplate};
use crate::schema::scene::{Guard, Scene, Transform};

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: ron::error::SpannedError,
    },
    #[error("duplicate {kind} id '{id}'")]
    DuplicateId { kind: &'static str, id: String },
    #[error("start scene '{0}' does not exist")]
    MissingStart(String),
    #[error("scene '{scene}' leads to unknown scene '{target}'")]
    DanglingTarget { scene: String, target: String },
    #[error("scene '{scene}' references unknown enemy '{enemy}'")]
    UnknownEnemy { scene: String, enemy: String },
    #[error("{context} references unknown item '{item}'")]
    UnknownItem { context: String, item: String },
    #[error("{context} references unknown codex entry '{entry}'")]
    UnknownCodexEntry { context: String, entry: String },
    #[error("starting weapon '{0}' is not a weapon in the starting inventory")]
    BadStartingWeapon(String),
}

/// The story manifest: entry point, starting player, and story-wide hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryManifest {
    pub title: String,
    pub start_scene: String,
    /// Codex id that switches on passive healing between scenes.
    #[serde(default)]
    pub regen_marker: Option<String>,
    /// Speaker label to codex id, for speaker tooltips.
    #[serde(default)]
    pub speakers: HashMap<String, String>,
    pub player: PlayerTemplate,
}

/// Raw RON text for each table of a content pack.
pub struct ContentSources<'a> {
    pub story: &'a str,
    pub scenes: &'a str,
    pub items: &'a str,
    pub enemies: &'a str,
    pub codex: &'a str,
    pub tooltips: &'a str,
}

mod builtin {
    pub const STORY: &str = include_str!("../../content/ashen_kiln/story.ron");
    pub const SCENES: &str = include_str!("../../content/ashen_kiln/scenes.ron");
    pub const ITEMS: &str = include_str!("../../content/ashen_kiln/items.ron");
    pub const ENEMIES: &str = include_str!("../../content/ashen_kiln/enemies.ron");
    pub const CODEX: &str = include_str!("../../content/ashen_kiln/codex.ron");
    pub const TOOLTIPS: &str = include_str!("../../content/ashen_kiln/tooltips.ron");
}

/// Every static table of a story, validated and read-only.
#[derive(Debug, Clone)]
pub struct ContentSet {
    pub story: StoryManifest,
    scenes: HashMap<String, Scene>,
    items: HashMap<String, Item>,
    enemies: HashMap<String, Enemy>,
    codex: HashMap<String, CodexEntry>,
    tooltips: BTreeMap<String, String>,
}

impl ContentSet {
    /// The pack shipped with the crate.
    pub fn builtin() -> Result<ContentSet, ContentError> {
        Self::from_sources(&ContentSources {
            story: builtin::STORY,
            scenes: builtin::SCENES,
            items: builtin::ITEMS,
            enemies: builtin::ENEMIES,
            codex: builtin::CODEX,
            tooltips: builtin::TOOLTIPS,
        })
    }

    /// Load a pack from a directory holding the six table files.
    pub fn load_from_dir(dir: &Path) -> Result<ContentSet, ContentError> {
        let read = |name: &str| std::fs::read_to_string(dir.join(name));
        let story = read("story.ron")?;
        let scenes = read("scenes.ron")?;
        let items = read("items.ron")?;
        let enemies = read("enemies.ron")?;
        let codex = read("codex.ron")?;
        let tooltips = read("tooltips.ron")?;
        let set = Self::from_sources(&ContentSources {
            story: &story,
            scenes: &scenes,
            items: &items,
            enemies: &enemies,
            codex: &codex,
            tooltips: &tooltips,
        })?;
        info!(dir = %dir.display(), "content_loaded_from_dir");
        Ok(set)
    }

    /// Parse and validate a pack from RON strings.
    pub fn from_sources(sources: &ContentSources<'_>) -> Result<ContentSet, ContentError> {
        let story: StoryManifest = parse("story.ron", sources.story)?;
        let scenes: Vec<Scene> = parse("scenes.ron", sources.scenes)?;
        let items: Vec<Item> = parse("items.ron", sources.items)?;
        let enemies: Vec<Enemy> = parse("enemies.ron", sources.enemies)?;
        let codex: Vec<CodexEntry> = parse("codex.ron", sources.codex)?;
        let tooltips: BTreeMap<String, String> = parse("tooltips.ron", sources.tooltips)?;

        let set = ContentSet {
            story,
            scenes: index_by_id("scene", scenes, |s| &s.id)?,
            items: index_by_id("item", items, |i| &i.id.0)?,
            enemies: index_by_id("enemy", enemies, |e| &e.id)?,
            codex: index_by_id("codex", codex, |c| &c.id)?,
            tooltips,
        };
        set.validate()?;

        info!(
            title = %set.story.title,
            scenes = set.scenes.len(),
            items = set.items.len(),
            enemies = set.enemies.len(),
            codex_entries = set.codex.len(),
            tooltips = set.tooltips.len(),
            "content_validated"
        );
        Ok(set)
    }

    pub fn scene(&self, id: &str) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.get(id)
    }

    pub fn enemy(&self, id: &str) -> Option<&Enemy> {
        self.enemies.get(id)
    }

    pub fn codex_entry(&self, id: &str) -> Option<&CodexEntry> {
        self.codex.get(id)
    }

    /// Codex entries sorted by id.
    pub fn codex_entries(&self) -> Vec<&CodexEntry> {
        let mut entries: Vec<&CodexEntry> = self.codex.values().collect();
        entries.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        entries
    }

    pub fn tooltips(&self) -> &BTreeMap<String, String> {
        &self.tooltips
    }

    pub fn start_scene(&self) -> &str {
        &self.story.start_scene
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Scene ids in sorted order.
    pub fn scene_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Build the starting player for a run around the given Bankai.
    pub fn initial_player(&self, bankai: Bankai) -> PlayerState {
        let template = &self.story.player;
        let inventory: Vec<Item> = template
            .inventory
            .iter()
            .filter_map(|id| self.items.get(id).cloned())
            .collect();
        let equipped_weapon = self
            .items
            .get(&template.equipped_weapon)
            .map(|item| item.name.clone())
            .unwrap_or_default();

        PlayerState {
            name: template.name.clone(),
            hp: template.hp,
            max_hp: template.hp,
            stamina: template.stamina,
            max_stamina: template.stamina,
            estus: template.estus,
            inventory,
            equipped_weapon,
            unlocked_codex_entries: Vec::new(),
            codex_images: HashMap::new(),
            stats: template.stats,
            level: 1,
            xp: 0,
            xp_to_next_level: template.xp_to_next_level,
            attribute_points: 0,
            limit_gauge: 0,
            max_limit_gauge: template.max_limit_gauge,
            bankai,
        }
    }

    /// Scenes that cannot be reached from the start scene. Not an error,
    /// but usually a content mistake.
    pub fn unreachable_scenes(&self) -> Vec<&str> {
        let mut seen: FxHashSet<&str> = FxHashSet::default();
        let mut queue = VecDeque::from([self.story.start_scene.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(scene) = self.scenes.get(id) {
                queue.extend(scene.targets());
            }
        }

        let mut unreachable: Vec<&str> = self
            .scenes
            .keys()
            .map(String::as_str)
            .filter(|id| !seen.contains(id))
            .collect();
        unreachable.sort_unstable();
        unreachable
    }

    fn validate(&self) -> Result<(), ContentError> {
        if !self.scenes.contains_key(&self.story.start_scene) {
            return Err(ContentError::MissingStart(self.story.start_scene.clone()));
        }

        for id in self.scene_ids() {
            let scene = &self.scenes[id];
            for target in scene.targets() {
                if !self.scenes.contains_key(target) {
                    return Err(ContentError::DanglingTarget {
                        scene: scene.id.clone(),
                        target: target.to_string(),
                    });
                }
            }
            if let Some(enemy) = &scene.encounter {
                if !self.enemies.contains_key(enemy) {
                    return Err(ContentError::UnknownEnemy {
                        scene: scene.id.clone(),
                        enemy: enemy.clone(),
                    });
                }
            }
            for (index, choice) in scene.choices.iter().enumerate() {
                let context = format!("scene '{}' choice {}", scene.id, index);
                if let Some(guard) = &choice.guard {
                    self.check_guard(guard, &context)?;
                }
                if let Some(transform) = &choice.transform {
                    self.check_transform(transform, &context)?;
                }
            }
        }

        let template = &self.story.player;
        for item in &template.inventory {
            self.check_item(item, "starting inventory")?;
        }
        let starts_armed = template.inventory.contains(&template.equipped_weapon)
            && self
                .items
                .get(&template.equipped_weapon)
                .is_some_and(Item::is_weapon);
        if !starts_armed {
            return Err(ContentError::BadStartingWeapon(
                template.equipped_weapon.clone(),
            ));
        }

        if let Some(marker) = &self.story.regen_marker {
            self.check_codex(marker, "regen marker")?;
        }
        for (speaker, entry) in &self.story.speakers {
            self.check_codex(entry, &format!("speaker '{}'", speaker))?;
        }

        Ok(())
    }

    fn check_guard(&self, guard: &Guard, context: &str) -> Result<(), ContentError> {
        match guard {
            Guard::HasCodex(id) => self.check_codex(id, context),
            Guard::HasItem(id) => self.check_item(id, context),
            Guard::MinLevel(_) => Ok(()),
            Guard::Not(inner) => self.check_guard(inner, context),
            Guard::All(guards) | Guard::Any(guards) => guards
                .iter()
                .try_for_each(|g| self.check_guard(g, context)),
        }
    }

    fn check_transform(&self, transform: &Transform, context: &str) -> Result<(), ContentError> {
        match transform {
            Transform::UnlockCodex(id) => self.check_codex(id, context),
            Transform::GrantItem { item, .. } => self.check_item(item, context),
            Transform::Heal(_) | Transform::RestoreEstus(_) | Transform::ResetRun => Ok(()),
            Transform::All(transforms) => transforms
                .iter()
                .try_for_each(|t| self.check_transform(t, context)),
        }
    }

    fn check_item(&self, id: &str, context: &str) -> Result<(), ContentError> {
        if self.items.contains_key(id) {
            Ok(())
        } else {
            Err(ContentError::UnknownItem {
                context: context.to_string(),
                item: id.to_string(),
            })
        }
    }

    fn check_codex(&self, id: &str, context: &str) -> Result<(), ContentError> {
        if self.codex.contains_key(id) {
            Ok(())
        } else {
            Err(ContentError::UnknownCodexEntry {
                context: context.to_string(),
                entry: id.to_string(),
            })
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(file: &str, input: &str) -> Result<T, ContentError> {
    ron::from_str(input).map_err(|source| ContentError::Parse {
        file: file.to_string(),
        source,
    })
}

fn index_by_id<T, F>(
    kind: &'static str,
    values: Vec<T>,
    id_of: F,
) -> Result<HashMap<String, T>, ContentError>
where
    F: Fn(&T) -> &String,
{
    let mut map = HashMap::with_capacity(values.len());
    for value in values {
        let id = id_of(&value).clone();
        if map.contains_key(&id) {
            return Err(ContentError::DuplicateId { kind, id });
        }
        map.insert(id, value);
    }
    Ok(map)
}
