//! JSON dictionary loading.
//!
//! Dictionary files are JSON objects mapping chord paths to definitions,
//! e.g. `{ "STKPWHR/-T": "hello", "-G": "{^ing}" }`.  Anything that is not
//! a string-to-string object fails the whole file; individual entries that
//! do not parse are logged and skipped so one bad entry cannot take the
//! daemon down.

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use super::Dictionary;

/// Errors loading a dictionary file.
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    /// The file is not a JSON object of strings.
    InvalidJson(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "reading dictionary: {}", e),
            LoadError::InvalidJson(e) => write!(f, "invalid dictionary json: {}", e),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> LoadError {
        LoadError::Io(e)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> LoadError {
        LoadError::InvalidJson(e)
    }
}

/// Load entries from a reader into the dictionary.  Returns how many entries
/// were inserted.
pub fn load_reader(dict: &mut Dictionary, reader: impl Read) -> Result<usize, LoadError> {
    let data: BTreeMap<String, String> = serde_json::from_reader(reader)?;
    let mut count = 0;
    for (path, definition) in &data {
        match dict.insert(path, definition) {
            Ok(()) => count += 1,
            Err(e) => log::warn!("skipping entry {:?}: {}", path, e),
        }
    }
    Ok(count)
}

/// Load a dictionary file.  Later loads into the same dictionary win on
/// duplicate paths.
pub fn load_file(dict: &mut Dictionary, path: impl AsRef<Path>) -> Result<usize, LoadError> {
    let file = File::open(path)?;
    load_reader(dict, BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::Chord;

    #[test]
    fn load_and_skip() {
        crate::testlog::setup();
        let mut dict = Dictionary::new();
        let json = r#"{ "KAT": "cat", "QQ": "broken", "-G": "{^ing}" }"#;
        let count = load_reader(&mut dict, json.as_bytes()).unwrap();
        // The unparsable chord path is skipped, the rest load.
        assert_eq!(count, 2);
        let kat = dict
            .child(Dictionary::ROOT, Chord::parse("KAT").unwrap())
            .unwrap();
        assert_eq!(dict.value(kat).unwrap().raw(), "cat");
    }

    #[test]
    fn not_an_object() {
        let mut dict = Dictionary::new();
        assert!(matches!(
            load_reader(&mut dict, br#"["KAT"]"#.as_slice()),
            Err(LoadError::InvalidJson(_))
        ));
        assert!(matches!(
            load_reader(&mut dict, br#"{ "KAT": 3 }"#.as_slice()),
            Err(LoadError::InvalidJson(_))
        ));
    }
}
