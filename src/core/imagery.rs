/// Image generation seam — request building, prompt sanitizing, and storing
/// results against the player.
///
/// The engine never talks to an image service itself. A front-end or tool
/// implements [`ImageGenerator`]; the orchestrator builds the request and
/// later hands the outcome back.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::schema::codex::CodexEntry;
use crate::schema::enemy::Enemy;
use crate::schema::player::PlayerState;

#[derive(Debug, Clone, Error, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    #[error("the service returned no image data")]
    NoImageData,
    #[error("the request was refused by a content filter")]
    Refused,
    #[error("the image service is unavailable: {0}")]
    Unavailable(String),
    #[error("no image target named '{0}'")]
    UnknownTarget(String),
    #[error("codex entry '{0}' is still locked")]
    Locked(String),
}

impl ImageError {
    /// Line shown to the player when generation fails.
    pub fn notice(&self) -> String {
        match self {
            Self::Refused => {
                "The vision could not be formed. It may be too dark even for this place."
                    .to_string()
            }
            Self::Unavailable(_) | Self::NoImageData => {
                "The vision could not be formed. Try again later.".to_string()
            }
            other => format!("The vision could not be formed: {}", other),
        }
    }
}

/// What an image is generated for. Images are stored under the target's id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageTarget {
    Codex(String),
    Enemy(String),
}

impl ImageTarget {
    pub fn id(&self) -> &str {
        match self {
            Self::Codex(id) | Self::Enemy(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRequest {
    pub target: ImageTarget,
    pub subject: String,
    /// Sanitized description folded into the prompt.
    pub context: String,
    pub prompt: String,
    pub aspect_ratio: String,
}

/// An opaque image reference, typically a data URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

impl ImageRef {
    /// Build a data URL from base64 payload. A missing mime type means PNG.
    pub fn data_url(mime_type: Option<&str>, base64: &str) -> ImageRef {
        let mime = mime_type.filter(|m| !m.is_empty()).unwrap_or("image/png");
        ImageRef(format!("data:{};base64,{}", mime, base64))
    }
}

pub trait ImageGenerator {
    /// Produce an image for a request. May block; the orchestrator only
    /// calls this through the front-end, never while resolving combat.
    fn generate(&mut self, request: &ImageRequest) -> Result<ImageRef, ImageError>;
}

const CODEX_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("blood", "crimson liquid"),
    ("gore", "shadows"),
    ("kill", "defeat"),
    ("death", "eternal rest"),
];

const PORTRAIT_SUBSTITUTIONS: &[(&str, &str)] = &[
    ("blood", "crimson liquid"),
    ("gore", "dark atmosphere"),
    ("kill", "fight"),
];

/// Replace every ASCII-case-insensitive occurrence of `needle`.
fn replace_ignore_case(text: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        let matched = rest
            .get(..needle.len())
            .is_some_and(|candidate| candidate.eq_ignore_ascii_case(needle));
        if matched {
            out.push_str(replacement);
            pos += needle.len();
        } else if let Some(c) = rest.chars().next() {
            out.push(c);
            pos += c.len_utf8();
        }
    }
    out
}

fn apply_substitutions(text: &str, table: &[(&str, &str)]) -> String {
    table
        .iter()
        .fold(text.to_string(), |acc, (needle, replacement)| {
            replace_ignore_case(&acc, needle, replacement)
        })
}

/// Soften words that image filters tend to reject.
pub fn sanitize(text: &str) -> String {
    apply_substitutions(text, CODEX_SUBSTITUTIONS)
}

/// First `max_chars` characters of `text`.
pub fn cap_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Concept-art request for a codex entry: its first paragraph, capped and
/// sanitized.
pub fn codex_request(entry: &CodexEntry, description_cap: usize) -> ImageRequest {
    let summary = entry.summary().unwrap_or_default();
    let context = sanitize(cap_chars(summary, description_cap));
    let prompt = format!(
        "Dark fantasy concept art, oil painting style, cinematic lighting, atmospheric, \
         mysterious, highly detailed. Subject: {}. Context: {}. No text, no ui.",
        entry.title, context
    );
    ImageRequest {
        target: ImageTarget::Codex(entry.id.clone()),
        subject: entry.title.clone(),
        context,
        prompt,
        aspect_ratio: "1:1".to_string(),
    }
}

/// Boss-portrait request for an enemy.
pub fn enemy_request(enemy: &Enemy) -> ImageRequest {
    let context = apply_substitutions(&enemy.description, PORTRAIT_SUBSTITUTIONS);
    let prompt = format!(
        "Dark fantasy boss portrait, oil painting style, menacing, highly detailed, \
         dramatic lighting. Character: {}. Description: {}. No text.",
        enemy.name, context
    );
    ImageRequest {
        target: ImageTarget::Enemy(enemy.id.clone()),
        subject: enemy.name.clone(),
        context,
        prompt,
        aspect_ratio: "1:1".to_string(),
    }
}

/// Fold a generation outcome into the player. Success stores the image under
/// the target id; failure returns the player unchanged with the error.
pub fn store(
    mut player: PlayerState,
    target: &ImageTarget,
    result: Result<ImageRef, ImageError>,
) -> (PlayerState, Option<ImageError>) {
    match result {
        Ok(image) => {
            info!(target = target.id(), "image_stored");
            player.codex_images.insert(target.id().to_string(), image.0);
            (player, None)
        }
        Err(err) => {
            warn!(target = target.id(), error = %err, "image_generation_failed");
            (player, Some(err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::codex::CodexCategory;

    fn entry(first: &str) -> CodexEntry {
        CodexEntry {
            id: "celebi".to_string(),
            title: "Mehmet Celebi".to_string(),
            category: CodexCategory::Person,
            content: vec![first.to_string(), "Second paragraph.".to_string()],
            image: None,
        }
    }

    #[test]
    fn sanitize_replaces_case_insensitively() {
        assert_eq!(
            sanitize("BLOOD and Gore, a kill, then Death."),
            "crimson liquid and shadows, a defeat, then eternal rest."
        );
        assert_eq!(sanitize("Bloodborne"), "crimson liquidborne");
        assert_eq!(sanitize("Çelebi"), "Çelebi");
    }

    #[test]
    fn cap_respects_char_boundaries() {
        assert_eq!(cap_chars("çççç", 2), "çç");
        assert_eq!(cap_chars("short", 150), "short");
    }

    #[test]
    fn codex_prompt_is_capped_then_sanitized() {
        let long = format!("{}blood", "a".repeat(148));
        let request = codex_request(&entry(&long), 150);
        // the cap cuts "blood" to "bl" before sanitizing
        assert_eq!(request.context, format!("{}bl", "a".repeat(148)));
        assert!(request.prompt.contains("Subject: Mehmet Celebi."));
        assert!(!request.prompt.contains("Second paragraph"));
        assert_eq!(request.target, ImageTarget::Codex("celebi".to_string()));
    }

    #[test]
    fn enemy_prompt_uses_portrait_wording() {
        let enemy = Enemy {
            id: "celebi".to_string(),
            name: "Mehmet Celebi".to_string(),
            hp: 200,
            max_hp: 200,
            damage: 25,
            stamina: 100,
            max_stamina: 100,
            xp_reward: 500,
            description: "Thirsts for blood, lives to kill.".to_string(),
            image: None,
        };
        let request = enemy_request(&enemy);
        assert_eq!(request.context, "Thirsts for crimson liquid, lives to fight.");
        assert!(request.prompt.starts_with("Dark fantasy boss portrait"));
    }

    #[test]
    fn data_url_defaults_to_png() {
        assert_eq!(ImageRef::data_url(None, "AAAA").0, "data:image/png;base64,AAAA");
        assert_eq!(
            ImageRef::data_url(Some("image/jpeg"), "BB").0,
            "data:image/jpeg;base64,BB"
        );
    }

    #[test]
    fn notices_are_player_facing() {
        assert!(ImageError::Refused.notice().contains("too dark"));
        assert!(ImageError::Locked("onur".to_string()).notice().contains("onur"));
    }
}
