//! Kiln Saga — the core of a narrative role-playing game.
//!
//! A scripted scene graph whose edges can start turn-based combat encounters,
//! a progression system with a once-per-run special ability, and a lore codex
//! unlocked by narrative progress. Rendering, audio and image generation live
//! outside this crate and talk to it through [`core::game::Game`].

pub mod core;
pub mod schema;
