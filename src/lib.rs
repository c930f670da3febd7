//! Subtranslate - subtitle translation with a local LLM
//!
//! Parses SRT files, translates every entry through an ollama endpoint,
//! cleans the model output and writes the translated file next to the source.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod translate;
pub mod subtitle;
pub mod paths;
pub mod progress;
pub mod error;
