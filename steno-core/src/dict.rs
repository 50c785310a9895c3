//! Dictionary operations.
//!
//! A steno dictionary maps sequences of chords to definitions.  The
//! definitions are strings that mix literal text with control sequences
//! (written in braces) that say how the text combines with what is around
//! it; they are parsed once, at load, into [`DictionaryValue`]s.
//!
//! The dictionary itself is a trie whose edges are chords.  Nodes live in an
//! arena and are addressed by index, with a parent link per node, which lets
//! the translator walk both down (as chords come in) and back up (when a
//! longer entry supersedes text that was already typed).

use std::collections::BTreeMap;
use std::fmt;

use crate::chord::{self, Chord, ChordPath};

pub use self::translate::{Emit, Translation, Translator, UndoFrame};
pub use self::typer::{FormatState, SpaceOverride, TypeAction, Typer};
pub use self::value::{Atom, DictionaryValue, Error as ValueError, Span};

pub mod json;
mod translate;
mod typer;
mod value;

/// Errors from building a dictionary.
#[derive(Debug)]
pub enum Error {
    /// The chord path did not parse.
    Chord(chord::Error),
    /// The definition did not parse.
    Value(ValueError),
    /// The chord path was empty.
    EmptyPath,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Chord(e) => write!(f, "bad chord path: {}", e),
            Error::Value(e) => write!(f, "bad definition: {}", e),
            Error::EmptyPath => write!(f, "empty chord path"),
        }
    }
}

impl std::error::Error for Error {}

impl From<chord::Error> for Error {
    fn from(e: chord::Error) -> Error {
        Error::Chord(e)
    }
}

impl From<ValueError> for Error {
    fn from(e: ValueError) -> Error {
        Error::Value(e)
    }
}

/// An index into the dictionary's node arena.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct NodeId(u32);

/// A single trie node.
struct Node {
    value: Option<DictionaryValue>,
    children: BTreeMap<Chord, NodeId>,
    parent: Option<NodeId>,
    depth: u16,
}

/// The chord trie.
pub struct Dictionary {
    nodes: Vec<Node>,
}

impl Dictionary {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Dictionary {
        Dictionary {
            nodes: vec![Node {
                value: None,
                children: BTreeMap::new(),
                parent: None,
                depth: 0,
            }],
        }
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Insert a definition under a slash-separated chord path.
    pub fn insert(&mut self, path: &str, definition: &str) -> Result<(), Error> {
        let path = ChordPath::parse(path)?;
        let value = DictionaryValue::parse(definition)?;
        self.insert_value(&path.0, value)
    }

    /// Insert an already-parsed definition.
    pub fn insert_value(&mut self, chords: &[Chord], value: DictionaryValue) -> Result<(), Error> {
        if chords.is_empty() {
            return Err(Error::EmptyPath);
        }

        let mut at = Self::ROOT;
        for &chord in chords {
            at = match self.node(at).children.get(&chord).copied() {
                Some(child) => child,
                None => {
                    let id = NodeId(self.nodes.len() as u32);
                    let depth = self.node(at).depth + 1;
                    self.nodes.push(Node {
                        value: None,
                        children: BTreeMap::new(),
                        parent: Some(at),
                        depth,
                    });
                    self.nodes[at.0 as usize].children.insert(chord, id);
                    id
                }
            };
        }

        // Re-inserting a path replaces the previous definition outright.
        let slot = &mut self.nodes[at.0 as usize].value;
        if let Some(old) = slot.take() {
            log::warn!("duplicate entry {:?} replaces {:?}", value.raw(), old.raw());
        }
        *slot = Some(value);
        Ok(())
    }

    /// The child of `node` along `chord`, if there is one.
    pub fn child(&self, node: NodeId, chord: Chord) -> Option<NodeId> {
        self.node(node).children.get(&chord).copied()
    }

    /// The parent of `node`.  Only the root has none.
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).parent
    }

    /// The definition at `node`, if this node ends an entry.
    pub fn value(&self, node: NodeId) -> Option<&DictionaryValue> {
        self.node(node).value.as_ref()
    }

    /// Distance from the root.
    pub fn depth(&self, node: NodeId) -> usize {
        self.node(node).depth as usize
    }

    /// Walk `steps` parent links up from `node`.
    pub fn ancestor(&self, node: NodeId, steps: usize) -> NodeId {
        let mut at = node;
        for _ in 0..steps {
            at = self.parent(at).expect("ancestor walk ran past the root");
        }
        at
    }

    /// Number of nodes, counting the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for Dictionary {
    fn default() -> Dictionary {
        Dictionary::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trie_structure() {
        let mut dict = Dictionary::new();
        dict.insert("ST/OP", "stop").unwrap();
        dict.insert("ST", "st").unwrap();

        let st = dict
            .child(Dictionary::ROOT, Chord::parse("ST").unwrap())
            .unwrap();
        assert_eq!(dict.depth(st), 1);
        assert_eq!(dict.parent(st), Some(Dictionary::ROOT));
        assert_eq!(dict.value(st).unwrap().raw(), "st");

        let op = dict.child(st, Chord::parse("OP").unwrap()).unwrap();
        assert_eq!(dict.depth(op), 2);
        assert_eq!(dict.parent(op), Some(st));
        assert_eq!(dict.ancestor(op, 2), Dictionary::ROOT);
        assert_eq!(dict.value(op).unwrap().raw(), "stop");
    }

    #[test]
    fn replace_entry() {
        let mut dict = Dictionary::new();
        dict.insert("ST", "one").unwrap();
        dict.insert("ST", "two").unwrap();
        let st = dict
            .child(Dictionary::ROOT, Chord::parse("ST").unwrap())
            .unwrap();
        assert_eq!(dict.value(st).unwrap().raw(), "two");
    }

    #[test]
    fn bad_entries() {
        let mut dict = Dictionary::new();
        assert!(matches!(dict.insert("Q", "x"), Err(Error::Chord(_))));
        assert!(matches!(dict.insert("ST", "{oops"), Err(Error::Value(_))));
        assert!(matches!(
            dict.insert_value(&[], DictionaryValue::parse("x").unwrap()),
            Err(Error::EmptyPath)
        ));
    }
}
