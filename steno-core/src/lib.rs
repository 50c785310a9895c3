//! Steno translation core.
//!
//! This crate holds the machine-independent half of the daemon: the chord
//! model, the dictionary (a chord trie whose values are parsed formatting
//! atoms), the translator that turns a live stream of chords into text to
//! type and text to take back, and the seams the daemon plugs machines and
//! sinks into.

pub mod chord;
pub mod dict;
pub mod engine;
pub mod input;
pub mod output;

pub use chord::Chord;
pub use engine::Engine;

#[cfg(test)]
mod testlog;
