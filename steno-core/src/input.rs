//! Chord input sources.
//!
//! A source is anything that can block until the stenographer presses a
//! chord: a serial protocol client, a keyboard shim, a replay file in tests.

use std::fmt;
use std::io;

use crate::chord::Chord;

/// Errors surfaced by a source.
#[derive(Debug)]
pub enum SourceError {
    /// The source has shut down and will produce no more chords.
    Closed,
    /// The underlying device failed.
    Io(io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Closed => write!(f, "chord source closed"),
            SourceError::Io(e) => write!(f, "chord source failed: {}", e),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> SourceError {
        SourceError::Io(e)
    }
}

/// Something chords can be read from.  `read` blocks until a chord arrives.
pub trait ChordSource {
    fn read(&mut self) -> Result<Chord, SourceError>;
}
