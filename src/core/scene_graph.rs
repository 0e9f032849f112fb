/// Scene graph traversal — guard evaluation, choice resolution, transforms.
///
/// `choose` never mutates its input: it computes the next player state on a
/// copy and returns it with the resolved target, or an error and nothing.

use thiserror::Error;
use tracing::{error, info};

use crate::core::codex;
use crate::core::content::ContentSet;
use crate::core::tuning::Tuning;
use crate::schema::player::PlayerState;
use crate::schema::scene::{Choice, Guard, Scene, Transform};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("choice {index} of scene '{scene}' is not available")]
    ChoiceUnavailable { scene: String, index: usize },
    #[error("scene '{0}' does not exist")]
    UnknownScene(String),
    #[error("item '{0}' does not exist")]
    UnknownItem(String),
}

/// Read-only inputs a transition needs besides the player.
#[derive(Debug, Clone, Copy)]
pub struct TransitionContext<'a> {
    pub content: &'a ContentSet,
    pub tuning: &'a Tuning,
    /// Snapshot a `ResetRun` transform restores.
    pub initial_player: &'a PlayerState,
}

/// Outcome of a successful choice.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub player: PlayerState,
    pub target: String,
    /// The target scene starts combat on entry.
    pub starts_encounter: bool,
}

pub fn guard_holds(guard: &Guard, player: &PlayerState) -> bool {
    match guard {
        Guard::HasCodex(id) => player.has_codex(id),
        Guard::HasItem(id) => player.has_item(id),
        Guard::MinLevel(level) => player.level >= *level,
        Guard::Not(inner) => !guard_holds(inner, player),
        Guard::All(guards) => guards.iter().all(|g| guard_holds(g, player)),
        Guard::Any(guards) => guards.iter().any(|g| guard_holds(g, player)),
    }
}

pub fn is_available(choice: &Choice, player: &PlayerState) -> bool {
    choice
        .guard
        .as_ref()
        .map_or(true, |guard| guard_holds(guard, player))
}

/// Choices the player may take, paired with their index in the scene.
pub fn available_choices<'a>(scene: &'a Scene, player: &PlayerState) -> Vec<(usize, &'a Choice)> {
    scene
        .choices
        .iter()
        .enumerate()
        .filter(|(_, choice)| is_available(choice, player))
        .collect()
}

/// Apply a transform to a player and return the result.
pub fn apply_transform(
    transform: &Transform,
    player: PlayerState,
    ctx: &TransitionContext<'_>,
) -> Result<PlayerState, TransitionError> {
    match transform {
        Transform::UnlockCodex(id) => Ok(codex::unlock(player, id)),
        Transform::GrantItem { item, equip } => {
            let definition = ctx
                .content
                .item(item)
                .ok_or_else(|| TransitionError::UnknownItem(item.clone()))?;
            let mut player = player;
            if !player.has_item(item) {
                player.inventory.push(definition.clone());
            }
            if *equip && definition.is_weapon() {
                player.equipped_weapon = definition.name.clone();
            }
            Ok(player)
        }
        Transform::Heal(amount) => Ok(player.healed(*amount)),
        Transform::RestoreEstus(charges) => {
            let mut player = player;
            player.estus = player.estus.max(*charges);
            Ok(player)
        }
        Transform::ResetRun => Ok(ctx.initial_player.clone()),
        Transform::All(transforms) => transforms
            .iter()
            .try_fold(player, |player, t| apply_transform(t, player, ctx)),
    }
}

/// Take choice `index` of `scene`.
pub fn choose(
    scene: &Scene,
    index: usize,
    player: &PlayerState,
    ctx: &TransitionContext<'_>,
) -> Result<Transition, TransitionError> {
    let choice = scene
        .choices
        .get(index)
        .filter(|choice| is_available(choice, player))
        .ok_or_else(|| TransitionError::ChoiceUnavailable {
            scene: scene.id.clone(),
            index,
        })?;

    let mut next = player.clone();
    if let Some(transform) = &choice.transform {
        next = apply_transform(transform, next, ctx)?;
    }

    if let Some(marker) = &ctx.content.story.regen_marker {
        if next.has_codex(marker) {
            next = next.healed(ctx.tuning.passive_regen);
        }
    }

    let target = ctx.content.scene(&choice.next_scene).ok_or_else(|| {
        error!(scene = %scene.id, target = %choice.next_scene, "scene_target_missing");
        TransitionError::UnknownScene(choice.next_scene.clone())
    })?;

    info!(from = %scene.id, to = %target.id, choice = index, "scene_transition");
    Ok(Transition {
        player: next,
        target: target.id.clone(),
        starts_encounter: target.has_encounter(),
    })
}

/// Where the story continues after winning `scene`'s encounter: its
/// `victory_scene`, else its first choice's target, else the start scene.
pub fn victory_target<'a>(scene: &'a Scene, content: &'a ContentSet) -> &'a str {
    scene
        .victory_scene
        .as_deref()
        .or_else(|| scene.choices.first().map(|c| c.next_scene.as_str()))
        .filter(|id| content.scene(id).is_some())
        .unwrap_or_else(|| content.start_scene())
}
