//! ReAgent - tick-scoped rule engine for game overlays
//!
//! A host process exposes live game state through [`world::WorldReader`].
//! Every tick the [`engine::RuleEngine`] freezes that state into a
//! [`state::StateSnapshot`], evaluates rule groups against it and returns the
//! display, key and cursor requests the rules produced. Cursor requests are
//! executed by [`cursor::HumanizedCursor`].

pub mod core;
pub mod cursor;
pub mod effects;
pub mod engine;
pub mod state;
pub mod world;
