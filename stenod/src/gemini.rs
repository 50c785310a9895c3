//! Gemini PR input.
//!
//! A much simpler serial protocol than Stenura: the machine just streams
//! one six-byte frame per stroke, no handshake and no checksum.  Byte 0
//! carries its high bit set as the frame header; the other five must have
//! it clear, which is also how we resync after line noise.  Seven payload
//! bits per byte map onto the keys, with a few positions we have no use
//! for (function key, reserved bits, the power bit).

use std::io::{self, Read};
use std::time::Duration;

use steno_core::chord::Chord;
use steno_core::input::{ChordSource, SourceError};

pub const BAUD_RATE: u32 = 9600;

const FRAME_LEN: usize = 6;
const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Key index within `#STKPWHRAO*EUFRPBLGTSDZ` for each payload bit, most
/// significant bit first.  -1 has no key; the number bits and the doubled
/// S and * keys all collapse onto their shared position.
#[rustfmt::skip]
const CHART: [[i8; 7]; 6] = [
    [-1,  0,  0,  0,  0,  0,  0], // Fn #1 #2 #3 #4 #5 #6
    [ 1,  1,  2,  3,  4,  5,  6], // S1 S2 T- K- P- W- H-
    [ 7,  8,  9, 10, 10, -1, -1], // R- A- O- *1 *2 res res
    [-1, 10, 10, 11, 12, 13, 14], // pwr *3 *4 E  U  -F -R
    [15, 16, 17, 18, 19, 20, 21], // -P -B -L -G -T -S -D
    [22,  0,  0,  0,  0,  0,  0], // -Z #7 #8 #9 #A #B #C
];

/// A Gemini PR machine, or in tests anything that can stream its bytes.
pub struct GeminiMachine<R: Read> {
    port: R,
}

impl GeminiMachine<Box<dyn serialport::SerialPort>> {
    pub fn open(path: &str, baud: u32) -> Result<Self, serialport::Error> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        Ok(GeminiMachine { port })
    }
}

impl<R: Read> GeminiMachine<R> {
    pub fn from_reader(port: R) -> Self {
        GeminiMachine { port }
    }

    fn read_byte(&mut self) -> Result<u8, SourceError> {
        let mut byte = [0u8; 1];
        loop {
            match self.port.read_exact(&mut byte) {
                Ok(()) => return Ok(byte[0]),
                Err(ref e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(ref e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(SourceError::Closed)
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> ChordSource for GeminiMachine<R> {
    fn read(&mut self) -> Result<Chord, SourceError> {
        let mut first = self.read_byte()?;
        'frame: loop {
            if first & 0x80 == 0 {
                log::debug!("gemini: skipping stray byte {:#04x}", first);
                first = self.read_byte()?;
                continue;
            }

            let mut frame = [first, 0, 0, 0, 0, 0];
            for at in 1..FRAME_LEN {
                let byte = self.read_byte()?;
                if byte & 0x80 != 0 {
                    log::warn!("gemini: header byte mid-frame, resyncing");
                    first = byte;
                    continue 'frame;
                }
                frame[at] = byte;
            }

            let mut bits = 0u32;
            for (&byte, chart) in frame.iter().zip(CHART.iter()) {
                for (at, &key) in chart.iter().enumerate() {
                    if key >= 0 && byte & (1 << (6 - at)) != 0 {
                        bits |= 1 << (22 - key as u32);
                    }
                }
            }

            let chord = Chord::from_raw(bits);
            if chord.is_empty() {
                first = self.read_byte()?;
                continue;
            }
            return Ok(chord);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn chord(text: &str) -> Chord {
        Chord::parse(text).unwrap()
    }

    fn read_all(bytes: &[u8]) -> Vec<Chord> {
        let mut machine = GeminiMachine::from_reader(Cursor::new(bytes.to_vec()));
        let mut out = Vec::new();
        loop {
            match machine.read() {
                Ok(c) => out.push(c),
                Err(SourceError::Closed) => return out,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn single_stroke() {
        // S1 pressed: byte 1, bit 6.
        assert_eq!(read_all(&[0x80, 0x40, 0, 0, 0, 0]), vec![chord("S")]);
        // -Z: byte 5, bit 6.
        assert_eq!(read_all(&[0x80, 0, 0, 0, 0, 0x40]), vec![chord("-Z")]);
        // Star, from any of its four switches.
        assert_eq!(read_all(&[0x80, 0, 0x08, 0, 0, 0]), vec![chord("*")]);
        assert_eq!(read_all(&[0x80, 0, 0, 0x20, 0, 0]), vec![chord("*")]);
    }

    #[test]
    fn number_bits_set_the_bar() {
        assert_eq!(read_all(&[0xa0, 0x40, 0, 0, 0, 0]), vec![chord("#S")]);
    }

    #[test]
    fn resync_on_noise() {
        // A stray low byte, then a partial frame cut off by a new header.
        let mut bytes = vec![0x13, 0x80, 0x00, 0x01];
        bytes.extend_from_slice(&[0x80, 0x40, 0, 0, 0, 0]);
        assert_eq!(read_all(&bytes), vec![chord("S")]);
    }

    #[test]
    fn empty_frames_are_dropped() {
        let mut bytes = vec![0x80, 0, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0x80, 0x40, 0, 0, 0, 0]);
        assert_eq!(read_all(&bytes), vec![chord("S")]);
    }
}
