//! Static and per-run data types shared by every engine module.

pub mod bankai;
pub mod codex;
pub mod enemy;
pub mod item;
pub mod player;
pub mod scene;
