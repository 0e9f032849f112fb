/// Codex tracker — unlock bookkeeping, visibility queries, and the lore
/// annotations shown over story text.

use std::collections::BTreeMap;
use tracing::debug;

use crate::core::content::ContentSet;
use crate::schema::codex::{CodexCategory, CodexEntry};
use crate::schema::player::PlayerState;

/// Add `id` to the unlocked list. Unlocking an id twice keeps one copy.
pub fn unlock(mut player: PlayerState, id: &str) -> PlayerState {
    if !player.has_codex(id) {
        player.unlocked_codex_entries.push(id.to_string());
        debug!(entry = id, unlocked = player.unlocked_codex_entries.len(), "codex_unlocked");
    }
    player
}

pub fn is_visible(player: &PlayerState, id: &str) -> bool {
    player.has_codex(id)
}

/// Unlocked entries in unlock order, optionally filtered to one category.
/// Unlocked ids with no content entry are skipped.
pub fn visible_entries<'a>(
    content: &'a ContentSet,
    player: &PlayerState,
    category: Option<CodexCategory>,
) -> Vec<&'a CodexEntry> {
    player
        .unlocked_codex_entries
        .iter()
        .filter_map(|id| content.codex_entry(id))
        .filter(|entry| category.map_or(true, |c| entry.category == c))
        .collect()
}

/// First paragraph of the codex entry behind a speaker label, if the player
/// has unlocked it.
pub fn speaker_summary<'a>(
    content: &'a ContentSet,
    player: &PlayerState,
    speaker: &str,
) -> Option<&'a str> {
    let id = content.story.speakers.get(speaker)?;
    if !is_visible(player, id) {
        return None;
    }
    content.codex_entry(id)?.summary()
}

/// A run of story text, either plain or a lore keyword with its tooltip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan<'a> {
    Plain(&'a str),
    Keyword {
        /// The text as written in the paragraph.
        text: &'a str,
        /// The dictionary key it matched.
        key: &'a str,
        tooltip: &'a str,
    },
}

/// Split `text` into plain and keyword spans.
///
/// Matching ignores ASCII case and does not require word boundaries. When
/// two keywords match at the same position the longer one wins.
pub fn annotate<'a>(text: &'a str, tooltips: &'a BTreeMap<String, String>) -> Vec<TextSpan<'a>> {
    let mut keywords: Vec<(&str, &str)> = tooltips
        .iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    keywords.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

    let mut spans = Vec::new();
    let mut plain_start = 0;
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let hit = keywords.iter().find(|(key, _)| {
            rest.get(..key.len())
                .is_some_and(|candidate| candidate.eq_ignore_ascii_case(key))
        });

        match hit {
            Some(&(key, tooltip)) => {
                if plain_start < pos {
                    spans.push(TextSpan::Plain(&text[plain_start..pos]));
                }
                spans.push(TextSpan::Keyword {
                    text: &text[pos..pos + key.len()],
                    key,
                    tooltip,
                });
                pos += key.len();
                plain_start = pos;
            }
            None => {
                pos += rest.chars().next().map_or(1, char::len_utf8);
            }
        }
    }

    if plain_start < text.len() {
        spans.push(TextSpan::Plain(&text[plain_start..]));
    }
    spans
}
