//! Command handlers.
//!
//! Handlers are thin: they assemble the engine from parsed arguments, run it
//! and format the outcome for the terminal. Mirroring logic lives in
//! `cloudmirror-engine`.

pub mod mirror;
