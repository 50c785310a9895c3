//! The Stenura wire protocol.
//!
//! Stentura-family machines speak a framed request/reply protocol over a
//! serial line: every packet starts with SOH and a sequence number, carries
//! an action code and parameters, and ends in a CRC-16.  Newly pressed
//! strokes show up as the contents of the machine's REALTIME.000 file, which
//! the client reads from in a polling loop and turns into chords.
//!
//! The client runs three workers over the shared port: a reader matching
//! replies to requests by sequence number, a retrier re-sending what the
//! machine has not answered, and the realtime poller feeding the chord
//! queue.

use std::fmt;
use std::io;

pub mod client;
pub mod crc;
pub mod decode;
pub mod packet;
pub mod queue;

pub use client::StenuraMachine;

/// Everything that can go wrong talking to the machine.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Serial(serialport::Error),
    /// A packet whose checksum does not match its contents.
    BadCrc,
    /// A packet announcing a length shorter than its own header.
    BadLength(u16),
    /// The machine never answered, through all retries.
    Timeout,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "i/o error: {}", e),
            Error::Serial(e) => write!(f, "serial port error: {}", e),
            Error::BadCrc => write!(f, "packet failed its checksum"),
            Error::BadLength(len) => write!(f, "packet with impossible length {}", len),
            Error::Timeout => write!(f, "request timed out"),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<serialport::Error> for Error {
    fn from(e: serialport::Error) -> Error {
        Error::Serial(e)
    }
}
