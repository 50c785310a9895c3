//! Typing tracker.
//!
//! Keeps the record of what has been typed, so that later strokes can take
//! earlier output back exactly, and so that undo can retype what a stroke
//! had removed.
//!
//! Every stroke becomes one [`Word`] on a stack: the text it typed, the text
//! it removed from the screen, and the formatter state as it stood before
//! the stroke.  Replacing walks back over the newest visible words without
//! popping them; undo pops one word, deletes its text, and retypes what it
//! had removed.  Because only characters that were actually typed are ever
//! deleted, the sink can never underflow.

use std::collections::VecDeque;

/// One-shot spacing override between two strokes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpaceOverride {
    Force,
    Suppress,
}

/// Formatter state carried from one stroke to the next.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatState {
    /// Pending case change for the next word: capitalize or lowercase.
    pub cap: Option<bool>,
    /// Uppercase the whole next word.
    pub upper_word: bool,
    /// Caps lock mode is on.
    pub caps_lock: bool,
    /// The next output joins the previous one without a space.
    pub attach: bool,
    /// The previous output was glue.
    pub glue: bool,
    /// Spacing override from the space macros.
    pub space: Option<SpaceOverride>,
}

/// A single thing that has been typed.
#[derive(Debug)]
struct Word {
    /// Characters this stroke removed from the screen, in screen order.
    removed: String,
    /// The text typed by this stroke, leading space included.
    typed: String,
    /// The formatter state before this stroke.
    prior: FormatState,
}

/// The action that results from text being typed.
#[derive(Debug, Eq, PartialEq)]
pub struct TypeAction {
    /// How many characters to remove before typing this text.
    pub remove: usize,
    /// The text to type.
    pub text: String,
}

/// The typing tracker.
pub struct Typer {
    words: Vec<Word>,
    state: FormatState,

    /// Things to be typed.
    to_type: VecDeque<TypeAction>,
}

impl Typer {
    pub fn new() -> Typer {
        Typer {
            words: Vec::new(),
            state: FormatState::default(),
            to_type: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &FormatState {
        &self.state
    }

    pub fn set_space_override(&mut self, space: SpaceOverride) {
        self.state.space = Some(space);
    }

    /// The formatter state as it stood before the `retract` newest visible
    /// words were typed.  With zero that is just the current state.
    pub fn state_before(&self, retract: usize) -> FormatState {
        if retract == 0 {
            return self.state.clone();
        }
        let mut need = retract;
        for word in self.words.iter().rev() {
            if word.typed.is_empty() {
                continue;
            }
            need -= 1;
            if need == 0 {
                return word.prior.clone();
            }
        }
        FormatState::default()
    }

    /// The newest visible word, after skipping `skip` of them.  The text
    /// includes its leading space, if it had one.
    pub fn visible_word(&self, skip: usize) -> Option<&str> {
        let mut skip = skip;
        for word in self.words.iter().rev() {
            if word.typed.is_empty() {
                continue;
            }
            if skip == 0 {
                return Some(&word.typed);
            }
            skip -= 1;
        }
        None
    }

    /// Delete the `retract` newest visible words and type `text` in their
    /// place, recording the stroke.  The walked words stay on the stack;
    /// what they had typed moves into the new word's removed-text so a later
    /// undo can bring it back.
    pub fn replace(&mut self, retract: usize, text: String, next: FormatState) {
        let mut removed = String::new();
        let mut need = retract;
        for word in self.words.iter().rev() {
            if need == 0 {
                break;
            }
            if word.typed.is_empty() {
                continue;
            }
            self.to_type.push_back(TypeAction {
                remove: word.typed.chars().count(),
                text: String::new(),
            });
            removed.insert_str(0, &word.typed);
            need -= 1;
        }

        if !text.is_empty() {
            self.to_type.push_back(TypeAction {
                remove: 0,
                text: text.clone(),
            });
        }

        self.words.push(Word {
            removed,
            typed: text,
            prior: std::mem::replace(&mut self.state, next),
        });
    }

    /// Record a stroke that put nothing on screen.
    pub fn record_silent(&mut self) {
        let prior = self.state.clone();
        self.words.push(Word {
            removed: String::new(),
            typed: String::new(),
            prior,
        });
    }

    /// Take back the latest stroke: delete what it typed and retype what it
    /// had removed.
    pub fn undo(&mut self) {
        if let Some(word) = self.words.pop() {
            if !word.typed.is_empty() || !word.removed.is_empty() {
                self.to_type.push_back(TypeAction {
                    remove: word.typed.chars().count(),
                    text: word.removed,
                });
            }
            self.state = word.prior;
        }
    }

    /// Retrieve the actions that have resulted from translation.
    pub fn next_action(&mut self) -> Option<TypeAction> {
        self.to_type.pop_front()
    }
}

impl Default for Typer {
    fn default() -> Typer {
        Typer::new()
    }
}
