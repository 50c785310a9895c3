//! Stroke decoding.
//!
//! The realtime file carries one 4-byte frame per stroke.  Every byte has
//! its top two bits set as a framing marker; the remaining six bits per
//! byte carry the keys, in steno order across the four bytes.  The very
//! first payload bit is the steno mark, a bookkeeping flag on the machine
//! with no key of its own, which we drop.

use std::fmt;

use steno_core::chord::Chord;

/// Bytes per stroke frame.
pub const STROKE_LEN: usize = 4;

/// The framing bits every frame byte must carry.
pub const FRAME_MARKER: u8 = 0xc0;

/// Key index within `#STKPWHRAO*EUFRPBLGTSDZ` for each payload bit, most
/// significant bit first.  -1 is the steno mark.
#[rustfmt::skip]
const CHART: [[i8; 6]; 4] = [
    [-1,  0,  1,  2,  3,  4], // ^  #  S  T  K  P
    [ 5,  6,  7,  8,  9, 10], // W  H  R  A  O  *
    [11, 12, 13, 14, 15, 16], // E  U  F  R  P  B
    [17, 18, 19, 20, 21, 22], // L  G  T  S  D  Z
];

/// Frames that are not valid strokes.
#[derive(Debug, PartialEq, Eq)]
pub enum FrameError {
    /// A byte without the framing marker.
    BadFraming(u8),
    /// Not exactly four bytes.
    WrongLength(usize),
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::BadFraming(byte) => {
                write!(f, "stroke byte {:#04x} lacks the framing marker", byte)
            }
            FrameError::WrongLength(len) => write!(f, "stroke frame of {} bytes", len),
        }
    }
}

impl std::error::Error for FrameError {}

/// Decode one stroke frame into a chord.
pub fn decode_stroke(frame: &[u8]) -> Result<Chord, FrameError> {
    if frame.len() != STROKE_LEN {
        return Err(FrameError::WrongLength(frame.len()));
    }

    let mut bits = 0u32;
    for (&byte, chart) in frame.iter().zip(CHART.iter()) {
        if byte & FRAME_MARKER != FRAME_MARKER {
            return Err(FrameError::BadFraming(byte));
        }
        for (at, &key) in chart.iter().enumerate() {
            if key >= 0 && byte & (1 << (5 - at)) != 0 {
                bits |= 1 << (22 - key as u32);
            }
        }
    }
    Ok(Chord::from_raw(bits))
}
