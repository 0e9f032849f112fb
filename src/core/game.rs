/// The game orchestrator: owns the player, the current scene, the active
/// encounter, and the timeline of pending combat events.
///
/// Built via `Game::builder()`. Front-ends call `choose` / `act`, move the
/// virtual clock with `advance` or `run_until_idle`, and read what happened
/// from `drain_events`.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::core::combat::{
    CombatEffect, CombatError, CombatEvent, CombatSignal, Encounter, EncounterId, PlayerAction,
    Step, TurnState,
};
use crate::core::content::{ContentError, ContentSet};
use crate::core::imagery::{self, ImageError, ImageGenerator, ImageRef, ImageRequest, ImageTarget};
use crate::core::progression::{self, ProgressionError};
use crate::core::scene_graph::{self, TransitionContext, TransitionError};
use crate::core::schedule::Timeline;
use crate::core::tuning::{Tuning, TuningError};
use crate::schema::player::{PlayerState, Stat};
use crate::schema::scene::{Choice, Scene};

#[derive(Debug, Error)]
pub enum GameError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("tuning error: {0}")]
    Tuning(#[from] TuningError),
    #[error("transition error: {0}")]
    Transition(#[from] TransitionError),
    #[error("combat error: {0}")]
    Combat(#[from] CombatError),
    #[error("progression error: {0}")]
    Progression(#[from] ProgressionError),
    #[error("image error: {0}")]
    Image(#[from] ImageError),
    #[error("not allowed during {actual:?} (needs {expected:?})")]
    WrongPhase { expected: Phase, actual: Phase },
    #[error("cannot change weapons while the enemy is acting")]
    EquipWhileResolving,
    #[error("current scene '{0}' is missing from the content")]
    MissingScene(String),
}

/// Which top-level view is active. Also the audio cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Story,
    Combat,
    GameOver,
}

/// Something the front-end should show or play.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PhaseChanged(Phase),
    SceneEntered(String),
    EncounterStarted { enemy: String },
    Combat(CombatEffect),
    Victory { xp_awarded: u32, levels_gained: u32 },
    Defeat,
    ImageStored(ImageTarget),
    Notice(String),
}

pub struct Game {
    content: ContentSet,
    tuning: Tuning,
    rng: StdRng,
    initial_player: PlayerState,
    player: PlayerState,
    scene_id: String,
    phase: Phase,
    encounter: Option<Encounter>,
    next_encounter_id: u64,
    timeline: Timeline<(EncounterId, CombatEvent)>,
    events: Vec<GameEvent>,
}

/// Builder for constructing a `Game`.
pub struct GameBuilder {
    content: Option<ContentSet>,
    content_dir: Option<PathBuf>,
    tuning: Option<Tuning>,
    tuning_path: Option<PathBuf>,
    seed: Option<u64>,
}

impl Game {
    pub fn builder() -> GameBuilder {
        GameBuilder {
            content: None,
            content_dir: None,
            tuning: None,
            tuning_path: None,
            seed: None,
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    /// The player a new run starts with, Bankai included.
    pub fn initial_player(&self) -> &PlayerState {
        &self.initial_player
    }

    pub fn content(&self) -> &ContentSet {
        &self.content
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.content.scene(&self.scene_id)
    }

    pub fn encounter(&self) -> Option<&Encounter> {
        self.encounter.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.timeline.now_ms()
    }

    /// Pending timeline entries.
    pub fn pending_events(&self) -> usize {
        self.timeline.len()
    }

    /// Choices of the current scene that pass their guards.
    pub fn available_choices(&self) -> Vec<(usize, &Choice)> {
        match self.scene() {
            Some(scene) => scene_graph::available_choices(scene, &self.player),
            None => Vec::new(),
        }
    }

    /// Take the events produced since the last call.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take choice `index` of the current scene.
    pub fn choose(&mut self, index: usize) -> Result<(), GameError> {
        self.require_phase(Phase::Story)?;
        let scene = self
            .content
            .scene(&self.scene_id)
            .ok_or_else(|| GameError::MissingScene(self.scene_id.clone()))?;
        let ctx = TransitionContext {
            content: &self.content,
            tuning: &self.tuning,
            initial_player: &self.initial_player,
        };
        let transition = scene_graph::choose(scene, index, &self.player, &ctx)?;
        self.player = transition.player;
        self.enter_scene(transition.target, transition.starts_encounter);
        Ok(())
    }

    /// Submit a combat action.
    pub fn act(&mut self, action: PlayerAction) -> Result<(), GameError> {
        self.require_phase(Phase::Combat)?;
        let Some(encounter) = self.encounter.as_mut() else {
            return Err(GameError::WrongPhase {
                expected: Phase::Combat,
                actual: self.phase,
            });
        };
        let step = encounter.act(action, self.player.clone(), &self.tuning, &mut self.rng)?;
        self.apply_step(step);
        Ok(())
    }

    /// Move the virtual clock forward by `ms`, firing everything that falls
    /// due. Returns how many events fired.
    pub fn advance(&mut self, ms: u64) -> usize {
        let until = self.timeline.now_ms().saturating_add(ms);
        let mut fired = 0;
        while let Some((id, event)) = self.timeline.pop_due(until) {
            fired += 1;
            self.fire(id, event);
        }
        fired
    }

    /// Fire pending events until the timeline is empty.
    pub fn run_until_idle(&mut self) -> usize {
        let mut fired = 0;
        while let Some(due) = self.timeline.next_due_ms() {
            fired += self.advance(due.saturating_sub(self.timeline.now_ms()));
        }
        fired
    }

    pub fn spend_attribute_point(&mut self, stat: Stat) -> Result<(), GameError> {
        self.player = progression::spend_attribute_point(self.player.clone(), stat, &self.tuning)?;
        Ok(())
    }

    /// Equip a weapon by display name. Refused while the enemy is acting.
    pub fn equip(&mut self, name: &str) -> Result<(), GameError> {
        if self
            .encounter
            .as_ref()
            .is_some_and(|e| e.state() == TurnState::Resolving)
        {
            return Err(GameError::EquipWhileResolving);
        }
        self.player = progression::equip_weapon(self.player.clone(), name)?;
        Ok(())
    }

    /// Start over from the initial player at the start scene.
    pub fn restart(&mut self) {
        self.player = self.initial_player.clone();
        self.encounter = None;
        self.timeline.clear();
        info!(bankai = %self.player.bankai.name, "game_restarted");
        self.set_phase(Phase::Story);
        self.enter_start_scene();
    }

    /// Build the generation request for a codex entry or enemy. Changes
    /// nothing.
    pub fn image_request(&self, target: &ImageTarget) -> Result<ImageRequest, GameError> {
        let request = match target {
            ImageTarget::Codex(id) => {
                let entry = self
                    .content
                    .codex_entry(id)
                    .ok_or_else(|| ImageError::UnknownTarget(id.clone()))?;
                if !self.player.has_codex(id) {
                    return Err(ImageError::Locked(id.clone()).into());
                }
                imagery::codex_request(entry, self.tuning.image_description_cap)
            }
            ImageTarget::Enemy(id) => {
                let enemy = self
                    .content
                    .enemy(id)
                    .ok_or_else(|| ImageError::UnknownTarget(id.clone()))?;
                imagery::enemy_request(enemy)
            }
        };
        Ok(request)
    }

    /// Hand back a generation outcome. Success stores the image; failure
    /// leaves the player untouched and queues a notice.
    pub fn complete_image(&mut self, target: &ImageTarget, result: Result<ImageRef, ImageError>) {
        let (player, failure) = imagery::store(self.player.clone(), target, result);
        self.player = player;
        match failure {
            None => self.events.push(GameEvent::ImageStored(target.clone())),
            Some(err) => self.events.push(GameEvent::Notice(err.notice())),
        }
    }

    /// Request, generate and store in one go with a blocking generator.
    pub fn generate_image<G: ImageGenerator>(
        &mut self,
        target: &ImageTarget,
        generator: &mut G,
    ) -> Result<(), GameError> {
        let request = self.image_request(target)?;
        let result = generator.generate(&request);
        self.complete_image(target, result);
        Ok(())
    }

    fn require_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            info!(from = ?self.phase, to = ?phase, "phase_changed");
        }
        self.phase = phase;
        self.events.push(GameEvent::PhaseChanged(phase));
    }

    fn enter_start_scene(&mut self) {
        let id = self.content.start_scene().to_string();
        let starts_encounter = self.scene_has_encounter(&id);
        self.enter_scene(id, starts_encounter);
    }

    fn scene_has_encounter(&self, id: &str) -> bool {
        self.content.scene(id).is_some_and(Scene::has_encounter)
    }

    fn enter_scene(&mut self, id: String, starts_encounter: bool) {
        self.scene_id = id;
        self.events.push(GameEvent::SceneEntered(self.scene_id.clone()));
        if !starts_encounter {
            return;
        }

        let enemy = self
            .content
            .scene(&self.scene_id)
            .and_then(|scene| scene.encounter.as_deref())
            .and_then(|enemy_id| self.content.enemy(enemy_id))
            .cloned();
        match enemy {
            Some(enemy) => self.start_encounter(enemy),
            None => error!(scene = %self.scene_id, "encounter_enemy_missing"),
        }
    }

    fn start_encounter(&mut self, enemy: crate::schema::enemy::Enemy) {
        self.next_encounter_id += 1;
        let id = EncounterId(self.next_encounter_id);
        self.events.push(GameEvent::EncounterStarted {
            enemy: enemy.id.clone(),
        });
        self.encounter = Some(Encounter::new(id, enemy));
        self.set_phase(Phase::Combat);
    }

    fn fire(&mut self, id: EncounterId, event: CombatEvent) {
        let Some(encounter) = self.encounter.as_mut().filter(|e| e.id() == id) else {
            debug!(encounter = id.0, event = ?event, "stale_event_dropped");
            return;
        };
        let step = encounter.fire(event, self.player.clone(), &self.tuning, &mut self.rng);
        self.apply_step(step);
    }

    fn apply_step(&mut self, step: Step) {
        self.player = step.player;
        let Some(encounter) = self.encounter.as_mut() else {
            return;
        };
        let id = encounter.id();
        self.events
            .extend(encounter.drain_effects().into_iter().map(GameEvent::Combat));

        if let Some(follow_up) = step.follow_up {
            self.timeline.schedule(follow_up.delay_ms, (id, follow_up.event));
        }
        match step.signal {
            Some(CombatSignal::Victory {
                xp_awarded,
                levels_gained,
            }) => self.finish_victory(id, xp_awarded, levels_gained),
            Some(CombatSignal::Defeat) => self.finish_defeat(id),
            None => {}
        }
    }

    fn finish_victory(&mut self, id: EncounterId, xp_awarded: u32, levels_gained: u32) {
        self.timeline.retain(|(pending, _)| *pending != id);
        self.encounter = None;
        let target = match self.content.scene(&self.scene_id) {
            Some(scene) => scene_graph::victory_target(scene, &self.content).to_string(),
            None => {
                error!(scene = %self.scene_id, "scene_missing_after_victory");
                self.content.start_scene().to_string()
            }
        };
        self.events.push(GameEvent::Victory {
            xp_awarded,
            levels_gained,
        });
        self.set_phase(Phase::Story);
        let starts_encounter = self.scene_has_encounter(&target);
        self.enter_scene(target, starts_encounter);
    }

    fn finish_defeat(&mut self, id: EncounterId) {
        self.timeline.retain(|(pending, _)| *pending != id);
        self.events.push(GameEvent::Defeat);
        self.set_phase(Phase::GameOver);
    }
}

impl GameBuilder {
    /// Use an already loaded content set.
    pub fn content(mut self, content: ContentSet) -> Self {
        self.content = Some(content);
        self
    }

    /// Load content from a pack directory at build time.
    pub fn content_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_dir = Some(path.into());
        self
    }

    pub fn tuning(mut self, tuning: Tuning) -> Self {
        self.tuning = Some(tuning);
        self
    }

    /// Load tuning overrides from a RON file at build time.
    pub fn tuning_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tuning_path = Some(path.into());
        self
    }

    /// Fix the RNG seed. Without one the RNG is seeded from entropy.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> Result<Game, GameError> {
        let content = match (self.content, self.content_dir) {
            (Some(content), _) => content,
            (None, Some(dir)) => ContentSet::load_from_dir(&dir)?,
            (None, None) => ContentSet::builtin()?,
        };
        let tuning = match (self.tuning, self.tuning_path) {
            (Some(tuning), _) => tuning,
            (None, Some(path)) => Tuning::load_from_ron(&path)?,
            (None, None) => Tuning::default(),
        };
        tuning.validate()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let bankai = progression::generate_bankai(&mut rng);
        let initial_player = content.initial_player(bankai);
        info!(
            title = %content.story.title,
            seed = ?self.seed,
            bankai = %initial_player.bankai.name,
            "game_built"
        );

        let mut game = Game {
            player: initial_player.clone(),
            initial_player,
            scene_id: String::new(),
            phase: Phase::Story,
            encounter: None,
            next_encounter_id: 0,
            timeline: Timeline::new(),
            events: Vec::new(),
            content,
            tuning,
            rng,
        };
        game.events.push(GameEvent::PhaseChanged(Phase::Story));
        game.enter_start_scene();
        Ok(game)
    }
}
