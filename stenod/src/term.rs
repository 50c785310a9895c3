//! Terminal output.
//!
//! A sink that types into the controlling terminal, mostly useful for
//! trying a dictionary without wiring up a real injection backend.
//! Deletes render as backspace, space, backspace, so the character really
//! disappears from the line.

use std::io::{self, Write};

use steno_core::output::{KeySink, DELETE};

pub struct TermSink {
    out: io::Stdout,
}

impl TermSink {
    pub fn new() -> TermSink {
        TermSink { out: io::stdout() }
    }
}

impl KeySink for TermSink {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = self.out.lock();
        for &byte in bytes {
            if byte == DELETE {
                out.write_all(b"\x08 \x08")?;
            } else {
                out.write_all(&[byte])?;
            }
        }
        out.flush()
    }
}
