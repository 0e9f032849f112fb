//! WASM bindings for kiln-saga — drives the browser front-end.
//!
//! Every call exchanges JSON strings. The page owns the real-time clock: it
//! calls `advance` from a timer and renders whatever `drain_events` returns.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use kiln_saga::core::codex::{self, TextSpan};
use kiln_saga::core::combat::{PlayerAction, TurnState};
use kiln_saga::core::game::{Game, Phase};
use kiln_saga::core::imagery::{ImageError, ImageRef, ImageTarget};
use kiln_saga::schema::player::{PlayerState, Stat};

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct SpanInfo<'a> {
    text: &'a str,
    tooltip: Option<&'a str>,
}

#[derive(Serialize)]
struct ChoiceInfo<'a> {
    index: usize,
    text: &'a str,
}

#[derive(Serialize)]
struct SceneInfo<'a> {
    id: &'a str,
    speaker: Option<&'a str>,
    speaker_summary: Option<&'a str>,
    image: Option<&'a str>,
    paragraphs: Vec<Vec<SpanInfo<'a>>>,
    choices: Vec<ChoiceInfo<'a>>,
}

#[derive(Serialize)]
struct EncounterInfo<'a> {
    enemy_id: &'a str,
    enemy_name: &'a str,
    enemy_hp: u32,
    enemy_max_hp: u32,
    enemy_stamina: u32,
    enemy_max_stamina: u32,
    state: TurnState,
    blocking: bool,
    bankai_active: bool,
    log: &'a [String],
}

#[derive(Serialize)]
struct View<'a> {
    phase: Phase,
    scene: Option<SceneInfo<'a>>,
    encounter: Option<EncounterInfo<'a>>,
    player: &'a PlayerState,
    now_ms: u64,
    pending_events: usize,
}

#[derive(Serialize)]
struct CodexInfo<'a> {
    id: &'a str,
    title: &'a str,
    category: &'static str,
    content: &'a [String],
    image: Option<&'a str>,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn to_json<T: Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn parse_target(kind: &str, id: &str) -> Result<ImageTarget, JsError> {
    match kind.to_lowercase().as_str() {
        "codex" => Ok(ImageTarget::Codex(id.to_string())),
        "enemy" => Ok(ImageTarget::Enemy(id.to_string())),
        _ => Err(JsError::new(&format!("Unknown image target kind: {kind}"))),
    }
}

fn parse_failure(reason: &str) -> ImageError {
    match reason.to_lowercase().as_str() {
        "refused" | "safety" | "blocked" => ImageError::Refused,
        "empty" | "no_data" => ImageError::NoImageData,
        other => ImageError::Unavailable(other.to_string()),
    }
}

fn spans<'a>(game: &'a Game, paragraph: &'a str) -> Vec<SpanInfo<'a>> {
    codex::annotate(paragraph, game.content().tooltips())
        .into_iter()
        .map(|span| match span {
            TextSpan::Plain(text) => SpanInfo {
                text,
                tooltip: None,
            },
            TextSpan::Keyword { text, tooltip, .. } => SpanInfo {
                text,
                tooltip: Some(tooltip),
            },
        })
        .collect()
}

// ---------------------------------------------------------------------------
// WebGame — the main exported struct
// ---------------------------------------------------------------------------

#[wasm_bindgen]
pub struct WebGame {
    game: Game,
}

#[wasm_bindgen]
impl WebGame {
    /// Start a run of the built-in story.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> Result<WebGame, JsError> {
        let game = Game::builder()
            .seed(seed)
            .build()
            .map_err(|e| JsError::new(&format!("Game build error: {e}")))?;
        Ok(WebGame { game })
    }

    pub fn title(&self) -> String {
        self.game.content().story.title.clone()
    }

    /// Everything the page needs to render the current phase.
    pub fn view(&self) -> Result<String, JsError> {
        let game = &self.game;
        let scene = match game.phase() {
            Phase::Story => game.scene().map(|scene| SceneInfo {
                id: &scene.id,
                speaker: scene.speaker.as_deref(),
                speaker_summary: scene.speaker.as_deref().and_then(|speaker| {
                    codex::speaker_summary(game.content(), game.player(), speaker)
                }),
                image: scene.image.as_deref(),
                paragraphs: scene.text.iter().map(|p| spans(game, p)).collect(),
                choices: game
                    .available_choices()
                    .into_iter()
                    .map(|(index, choice)| ChoiceInfo {
                        index,
                        text: &choice.text,
                    })
                    .collect(),
            }),
            _ => None,
        };
        let encounter = game.encounter().map(|e| EncounterInfo {
            enemy_id: &e.enemy().id,
            enemy_name: &e.enemy().name,
            enemy_hp: e.enemy_hp(),
            enemy_max_hp: e.enemy().max_hp,
            enemy_stamina: e.enemy_stamina(),
            enemy_max_stamina: e.enemy().max_stamina,
            state: e.state(),
            blocking: e.is_blocking(),
            bankai_active: e.bankai_active(),
            log: e.log(),
        });
        to_json(&View {
            phase: game.phase(),
            scene,
            encounter,
            player: game.player(),
            now_ms: game.now_ms(),
            pending_events: game.pending_events(),
        })
    }

    /// Events since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        to_json(&self.game.drain_events())
    }

    pub fn choose(&mut self, index: usize) -> Result<(), JsError> {
        self.game
            .choose(index)
            .map_err(|e| JsError::new(&format!("{e}")))
    }

    /// Submit a combat action by name ("attack", "block", "parry", "dodge",
    /// "estus", "bankai").
    pub fn act(&mut self, action: &str) -> Result<(), JsError> {
        let action = PlayerAction::parse(action)
            .ok_or_else(|| JsError::new(&format!("Unknown action: {action}")))?;
        self.game
            .act(action)
            .map_err(|e| JsError::new(&format!("{e}")))
    }

    /// Move the clock forward. Returns how many scheduled events fired.
    pub fn advance(&mut self, ms: u32) -> usize {
        self.game.advance(u64::from(ms))
    }

    pub fn spend(&mut self, stat: &str) -> Result<(), JsError> {
        let stat =
            Stat::parse(stat).ok_or_else(|| JsError::new(&format!("Unknown stat: {stat}")))?;
        self.game
            .spend_attribute_point(stat)
            .map_err(|e| JsError::new(&format!("{e}")))
    }

    pub fn equip(&mut self, weapon_name: &str) -> Result<(), JsError> {
        self.game
            .equip(weapon_name)
            .map_err(|e| JsError::new(&format!("{e}")))
    }

    pub fn restart(&mut self) {
        self.game.restart();
    }

    /// Unlocked codex entries in unlock order, as a JSON array.
    pub fn codex(&self) -> Result<String, JsError> {
        let player = self.game.player();
        let entries: Vec<CodexInfo> = codex::visible_entries(self.game.content(), player, None)
            .into_iter()
            .map(|entry| CodexInfo {
                id: &entry.id,
                title: &entry.title,
                category: entry.category.label(),
                content: &entry.content,
                image: player
                    .codex_images
                    .get(&entry.id)
                    .map(String::as_str)
                    .or(entry.image.as_deref()),
            })
            .collect();
        to_json(&entries)
    }

    /// The image request for a codex entry or enemy, as JSON. The page sends
    /// the prompt to its image service and reports back with
    /// `complete_image` or `fail_image`.
    pub fn image_request(&self, kind: &str, id: &str) -> Result<String, JsError> {
        let target = parse_target(kind, id)?;
        let request = self
            .game
            .image_request(&target)
            .map_err(|e| JsError::new(&format!("{e}")))?;
        to_json(&request)
    }

    pub fn complete_image(
        &mut self,
        kind: &str,
        id: &str,
        mime_type: Option<String>,
        base64: &str,
    ) -> Result<(), JsError> {
        let target = parse_target(kind, id)?;
        let image = ImageRef::data_url(mime_type.as_deref(), base64);
        self.game.complete_image(&target, Ok(image));
        Ok(())
    }

    pub fn fail_image(&mut self, kind: &str, id: &str, reason: &str) -> Result<(), JsError> {
        let target = parse_target(kind, id)?;
        self.game.complete_image(&target, Err(parse_failure(reason)));
        Ok(())
    }

    /// Names of the combat actions, in button order.
    pub fn actions() -> String {
        let names: Vec<&str> = PlayerAction::ALL.iter().map(|a| a.name()).collect();
        serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string())
    }
}
