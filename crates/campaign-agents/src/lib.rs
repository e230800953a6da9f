//! Campaign stages built on the `orchestration` pipeline.
//!
//! A product photo goes through four JSON-producing stages (director,
//! planner, analyst, strategist) plus image generation. Each stage builds
//! its prompt here and leaves retries, normalization, validation, caching
//! and error classification to `orchestration`.

pub mod config;
pub mod input;
pub mod language;
pub mod prompts;
pub mod report;
pub mod stages;

pub use config::{ConfigError, StudioConfig, API_KEY_STORE_KEY};
pub use stages::{CampaignStudio, ImageAspect, Stage};
