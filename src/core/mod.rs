//! Engine modules: content loading, traversal, combat, progression and the
//! orchestrator that threads player state between them.

pub mod codex;
pub mod combat;
pub mod content;
pub mod game;
pub mod imagery;
pub mod progression;
pub mod scene_graph;
pub mod schedule;
pub mod tuning;
