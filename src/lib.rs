//! Character-consistent story image generation.
//!
//! Users upload up to four reference characters, write up to ten prompts and
//! generate one image per prompt in a single batch. Results can be previewed,
//! regenerated, edited and exported as a ZIP archive.

pub mod api;
pub mod archive;
pub mod config;
pub mod gemini;
pub mod models;
pub mod orchestrator;
pub mod state;
