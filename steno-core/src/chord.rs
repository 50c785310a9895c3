//! Chord encoding.
//!
//! A (US) steno chord consists of the following keys: #STKPWHRAO*EUFRPBLGTSDZ
//! which can be pressed in nearly any combination (subject to the limits of
//! the human hand).  We represent them by binary.  The textual form is mostly
//! just the characters present, when that bit is set.  However, if the right
//! section is present, and the middle section is not, there will be a single
//! '-' before the right characters (otherwise the chord would be ambiguous).
//!
//! The number bar can be textually represented by the '#' if needed to
//! disambiguate.  If there are any number row characters present, the '#' is
//! not needed: the digits 0-9 stand in for specific keys and imply the bar.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

use arrayvec::ArrayString;

/// Chord text that doesn't parse.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    /// A key that is unknown, or out of steno order.
    InvalidKey(char),
    /// A '-' at or after the right bank.
    MisplacedDash,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidKey(ch) => write!(f, "invalid key {:?} in chord", ch),
            Error::MisplacedDash => write!(f, "misplaced '-' in chord"),
        }
    }
}

impl std::error::Error for Error {}

/// The chord itself is just a 32 bit number, one bit per key.  It represents
/// a single stroke on the machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Chord(u32);

//                    2         1         0
//                    1098765432109876543210
static NORMAL: &str = "STKPWHRAO*EUFRPBLGTSDZ";
static NUMS: &str = "12K3W4R50*EU6R7B8G9SDZ";

// Various masks.
pub const NUM: Chord = Chord(0x400000);
pub const LEFT: Chord = Chord(0x3f8000);
pub const MID: Chord = Chord(0x007c00);
pub const RIGHT: Chord = Chord(0x0003ff);
pub const STAR: Chord = Chord(0x001000);
pub const DIGITS: Chord = Chord(0x3562a8);

impl Chord {
    // The empty chord is useful for machines that build up chords key by key.
    pub const fn empty() -> Chord {
        Chord(0)
    }

    /// Parse the textual representation.  The scan keeps a cursor into steno
    /// order; every key must be found at or after the cursor, and a literal
    /// '-' jumps the cursor to just past the '*'.
    pub fn parse(text: &str) -> Result<Chord, Error> {
        let mut result = 0u32;
        let mut bit = NUM.0;

        let mut norms = NORMAL.chars();
        let mut nums = NUMS.chars();

        for ch in text.chars() {
            if ch == '#' {
                result |= NUM.0;
                continue;
            }

            if ch == '-' {
                if bit < STAR.0 {
                    return Err(Error::MisplacedDash);
                }

                while bit > STAR.0 {
                    bit >>= 1;
                    norms.next();
                    nums.next();
                }

                continue;
            }

            loop {
                // Get the next normal and numeric character, and the bit to
                // go with them.
                bit >>= 1;
                let norm = match norms.next() {
                    Some(n) => n,
                    None => return Err(Error::InvalidKey(ch)),
                };
                let num = match nums.next() {
                    Some(n) => n,
                    None => return Err(Error::InvalidKey(ch)),
                };

                if ch == norm {
                    result |= bit;
                    break;
                } else if ch == num {
                    // Digits are synonyms for their key with the bar added.
                    result |= bit | NUM.0;
                    break;
                }

                // The character didn't match, go on to the next one.
            }
        }

        Ok(Chord(result))
    }

    pub const fn from_raw(raw: u32) -> Chord {
        Chord(raw)
    }

    pub const fn into_raw(self) -> u32 {
        self.0
    }

    /// Determine if this chord has any of the keys pressed in 'other'.
    pub fn has_any(self, other: Chord) -> bool {
        (self.0 & other.0) != 0
    }

    /// Merge the two chords.
    pub const fn merge(self, other: Chord) -> Chord {
        Chord(self.0 | other.0)
    }

    /// Eliminate the keys in 'other' from self.
    pub fn mask(self, other: Chord) -> Chord {
        Chord(self.0 & !other.0)
    }

    /// Is this an empty chord (with no keys pressed)?
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The short form used when a chord has no translation and its raw steno
    /// is typed instead.  Left-only chords carry a trailing '-' so they read
    /// unambiguously next to ordinary text.
    pub fn raw_steno(self) -> String {
        let mut text = self.to_string();
        if self.has_any(LEFT) && !self.has_any(MID) && !self.has_any(RIGHT) {
            text.push('-');
        }
        text
    }

    /// The fixed-width rendering, with one column per key.  Unpressed keys
    /// render as '_', which keeps columns aligned in paper-tape style logs.
    pub fn paper(self) -> ArrayString<23> {
        let mut buf = ArrayString::new();
        buf.push(if self.has_any(NUM) { '#' } else { '_' });
        let chars = if self.has_any(NUM) { NUMS } else { NORMAL };
        let mut bit = NUM.0 >> 1;
        for ch in chars.chars() {
            buf.push(if self.has_any(Chord(bit)) { ch } else { '_' });
            bit >>= 1;
        }
        buf
    }
}

impl BitAnd<Self> for Chord {
    type Output = Chord;

    fn bitand(self, rhs: Self) -> Self::Output {
        Chord(self.0 & rhs.0)
    }
}

impl BitAndAssign<Self> for Chord {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr<Self> for Chord {
    type Output = Chord;

    fn bitor(self, rhs: Self) -> Self::Output {
        Chord(self.0 | rhs.0)
    }
}

impl BitOrAssign<Self> for Chord {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for Chord {
    type Output = Chord;

    fn not(self) -> Self::Output {
        Chord(!self.0)
    }
}

// The short form is the tape render with the padding squeezed out, plus the
// two things the tape doesn't need: the bar column only earns its '#' when
// no digit implies it, and a '-' stands in for the middle keys when right
// keys would otherwise be ambiguous.
impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.has_any(NUM) && !self.has_any(DIGITS) {
            write!(f, "#")?;
        }
        let need_dash = self.has_any(RIGHT) && !self.has_any(MID);
        for (column, key) in self.paper().chars().enumerate().skip(1) {
            // The E column is the first one past the middle bank.
            if need_dash && column == 11 {
                write!(f, "-")?;
            }
            if key != '_' {
                write!(f, "{}", key)?;
            }
        }
        Ok(())
    }
}

/// A dictionary path is a group of chords that are represented separated by
/// slashes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChordPath(pub Vec<Chord>);

impl ChordPath {
    pub fn parse(text: &str) -> Result<ChordPath, Error> {
        let chords: Result<Vec<_>, Error> = text.split('/').map(Chord::parse).collect();
        Ok(ChordPath(chords?))
    }
}

// Display is the same as was parsed, chords separated by slashes.
impl fmt::Display for ChordPath {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut sep = false;
        for chord in &self.0 {
            if sep {
                write!(f, "/")?;
            }
            sep = true;

            write!(f, "{}", chord)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chord_roundtrip() {
        crate::testlog::setup();

        for raw in 1u32..0x800000 {
            let text = format!("{}", Chord(raw));
            let orig = Chord::parse(&text).unwrap();
            if raw != orig.0 {
                println!("Mismatch: 0x{:x} -> {} -> 0x{:x}", raw, text, orig.0);
            }
            assert_eq!(raw, orig.0);
        }
    }

    #[test]
    fn parse_basics() {
        assert_eq!(Chord::parse("STKPWHRAO*EUFRPBLGTSDZ"), Ok(Chord(0x3fffff)));
        assert_eq!(
            Chord::parse("STKPWHR-FRPBLGTSDZ"),
            Ok(Chord(LEFT.0 | RIGHT.0))
        );
        assert_eq!(Chord::parse("-R"), Ok(Chord(0x100)));
        assert_eq!(Chord::parse("KAT"), Ok(Chord(0x80000 | 0x4000 | 0x8)));
        assert_eq!(Chord::parse("#"), Ok(NUM));
    }

    #[test]
    fn parse_digits() {
        // '1' is S with the number bar.
        assert_eq!(Chord::parse("1"), Ok(Chord(0x200000 | NUM.0)));
        // '0' is O, '9' is right T.
        assert_eq!(Chord::parse("09"), Ok(Chord(0x2000 | 0x8 | NUM.0)));
        // Digits and letters mix.
        assert_eq!(Chord::parse("1K"), Ok(Chord(0x200000 | 0x80000 | NUM.0)));
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Chord::parse("Q"), Err(Error::InvalidKey('Q')));
        // Keys out of steno order.
        assert_eq!(Chord::parse("TS-"), Err(Error::MisplacedDash));
        assert_eq!(Chord::parse("-FE"), Err(Error::InvalidKey('E')));
        // Dash after a right-bank key was consumed.
        assert_eq!(Chord::parse("E-U"), Err(Error::MisplacedDash));
    }

    #[test]
    fn short_form() {
        assert_eq!(Chord::parse("S").unwrap().to_string(), "S");
        assert_eq!(Chord::parse("S").unwrap().raw_steno(), "S-");
        assert_eq!(Chord::parse("-R").unwrap().raw_steno(), "-R");
        assert_eq!(Chord::parse("KAT").unwrap().raw_steno(), "KAT");
    }

    #[test]
    fn paper_render() {
        assert_eq!(
            Chord::parse("KAT").unwrap().paper().as_str(),
            "___K____A__________T___"
        );
    }

    #[test]
    fn path_roundtrip() {
        let path = ChordPath::parse("STKPWHR/-T/KAT").unwrap();
        assert_eq!(path.0.len(), 3);
        assert_eq!(path.to_string(), "STKPWHR/-T/KAT");
    }
}
