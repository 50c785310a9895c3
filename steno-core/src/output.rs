//! Key output sinks.
//!
//! The engine talks to the host system through a plain byte writer.  Bytes
//! are keystrokes to type, except [`DELETE`], which removes one character.

use std::io;

/// Delete one previously typed character.
pub const DELETE: u8 = 0x16;

/// Something keystrokes can be sent to.
pub trait KeySink {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
}

/// An in-memory sink that honours [`DELETE`], for tests and dry runs.
#[derive(Debug, Default)]
pub struct WriteBuffer {
    text: String,
    underflows: usize,
}

impl WriteBuffer {
    pub fn new() -> WriteBuffer {
        WriteBuffer::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// How many deletes arrived with nothing left to delete.
    pub fn underflows(&self) -> usize {
        self.underflows
    }
}

impl KeySink for WriteBuffer {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut at = 0;
        while at < bytes.len() {
            if bytes[at] == DELETE {
                if self.text.pop().is_none() {
                    self.underflows += 1;
                }
                at += 1;
                continue;
            }

            let end = bytes[at..]
                .iter()
                .position(|&b| b == DELETE)
                .map(|p| at + p)
                .unwrap_or(bytes.len());
            let run = std::str::from_utf8(&bytes[at..end])
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.text.push_str(run);
            at = end;
        }
        Ok(())
    }
}
