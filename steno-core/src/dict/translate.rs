//! Live translation.
//!
//! The translator tracks, chord by chord, every dictionary entry the input
//! could still be in the middle of.  Each tracked position ("branch") is a
//! trie node; the list is kept sorted by depth, longest first, so the first
//! branch that lands on a definition wins and everything typed for shorter
//! entries after it gets taken back.
//!
//! Every call mutates the branch list and pushes an undo frame recording
//! exactly what changed, so any stroke can be reversed later, however many
//! strokes have happened since.

use crate::chord::Chord;

use super::{Dictionary, NodeId};

/// What a stroke asks the typer to put on screen.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Emit {
    /// Nothing visible this stroke (a longer entry may still be coming).
    Nothing,
    /// The definition at this node.
    Value(NodeId),
    /// No entry matched anywhere; the raw steno is typed instead.
    Untranslated(Chord),
}

/// The outcome of one stroke: what to type, and which previously typed
/// definitions to take back first, newest first.
#[derive(Clone, Debug)]
pub struct Translation {
    pub emit: Emit,
    pub retract: Vec<NodeId>,
}

/// Everything needed to reverse one stroke.
#[derive(Debug)]
pub struct UndoFrame {
    /// The chord that caused it.
    pub chord: Chord,
    /// What the stroke produced.
    pub translation: Translation,
    /// Branches that had no continuation and were dropped, with the index
    /// they were dropped from.
    trimmed: Vec<(NodeId, usize)>,
    /// Branches popped from the tail because a longer entry superseded
    /// their output, in pop order.
    replaced: Vec<NodeId>,
}

/// The translation state machine.
pub struct Translator {
    dict: Dictionary,
    branches: Vec<NodeId>,
    undo_stack: Vec<UndoFrame>,
}

impl Translator {
    pub fn new(dict: Dictionary) -> Translator {
        Translator {
            dict,
            branches: Vec::new(),
            undo_stack: Vec::new(),
        }
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// Feed one chord through the machine.  Updates the branch list, records
    /// an undo frame, and says what to type and what to take back.
    pub fn translate(&mut self, chord: Chord) -> Translation {
        // The most recently visible output belongs to the last branch; keep
        // its pre-advance node so retraction can name it.
        let prev_last = self.branches.last().copied();

        let mut trimmed = Vec::new();
        let mut output = None;

        // Walk the branches, longest first.  A branch either advances along
        // the chord or is dropped.  The first advance that lands on a
        // definition wins; branches after it are left alone for retraction.
        let mut i = 0;
        while i < self.branches.len() {
            match self.dict.child(self.branches[i], chord) {
                Some(next) => {
                    self.branches[i] = next;
                    if self.dict.value(next).is_some() {
                        output = Some(i);
                        break;
                    }
                    i += 1;
                }
                None => {
                    let dead = self.branches.remove(i);
                    trimmed.push((dead, i));
                }
            }
        }

        let mut retract = Vec::new();
        let mut replaced = Vec::new();

        let emit = if let Some(at) = output {
            let winner = self.branches[at];

            // Whatever the last branch had typed is on screen now and gets
            // taken back first.
            if let Some(last) = prev_last {
                if self.dict.value(last).is_some() {
                    retract.push(last);
                }
            }

            // Branches after the winner are superseded.  Pop them one at a
            // time; each pop uncovers the output that was visible before the
            // popped branch typed, which sits on an ancestor of the new last
            // branch, as far up as the two depths differ.
            while self.branches.len() - 1 > at {
                let popped = self.branches.pop().expect("tail pop past the winner");
                let last = *self.branches.last().expect("winner left the list");
                let steps = self.dict.depth(last) - self.dict.depth(popped);
                let uncovered = self.dict.ancestor(last, steps);
                if self.dict.value(uncovered).is_some() {
                    retract.push(uncovered);
                }
                replaced.push(popped);
            }

            Emit::Value(winner)
        } else if let Some(fresh) = self.dict.child(Dictionary::ROOT, chord) {
            // No branch produced output, but this chord starts a new entry.
            // At depth one it is the shortest branch, so it goes last.
            self.branches.push(fresh);
            if self.dict.value(fresh).is_some() {
                Emit::Value(fresh)
            } else {
                Emit::Nothing
            }
        } else {
            Emit::Untranslated(chord)
        };

        let translation = Translation { emit, retract };
        self.undo_stack.push(UndoFrame {
            chord,
            translation: translation.clone(),
            trimmed,
            replaced,
        });
        translation
    }

    /// Take the most recent undo frame off the stack.
    pub fn pop_frame(&mut self) -> Option<UndoFrame> {
        self.undo_stack.pop()
    }

    /// The chord of the most recent stroke still on the stack.
    pub fn last_chord(&self) -> Option<Chord> {
        self.undo_stack.last().map(|f| f.chord)
    }

    /// Reverse the branch-list mutations of one stroke.
    ///
    /// Every surviving branch advanced by one chord, so walking each back to
    /// its parent rewinds them.  Superseded branches go back on the tail and
    /// trimmed hypotheses back to their recorded slots; if the stroke had
    /// sprouted a fresh root child, its parent walk leaves the root itself
    /// at the tail, which does not belong in the list.
    pub fn undo_state(&mut self, frame: &UndoFrame) {
        for branch in self.branches.iter_mut() {
            *branch = self
                .dict
                .parent(*branch)
                .expect("branch above the root");
        }

        for &node in frame.replaced.iter().rev() {
            self.branches.push(node);
        }

        for &(node, index) in frame.trimmed.iter().rev() {
            self.branches.insert(index, node);
        }

        if let Some(&last) = self.branches.last() {
            if self.dict.parent(last).is_none() {
                self.branches.pop();
            }
        }
    }

    /// True once nothing is tracked and nothing is left to undo.
    pub fn is_quiescent(&self) -> bool {
        self.branches.is_empty() && self.undo_stack.is_empty()
    }

    /// Depths of the tracked branches, in list order.
    pub fn branch_depths(&self) -> Vec<usize> {
        self.branches.iter().map(|&b| self.dict.depth(b)).collect()
    }

    /// Strokes still on the undo stack.
    pub fn history_len(&self) -> usize {
        self.undo_stack.len()
    }

    /// Log the current state.
    pub fn show(&self) {
        log::debug!(
            "translator: {} branches (depths {:?}), {} frames",
            self.branches.len(),
            self.branch_depths(),
            self.undo_stack.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(text: &str) -> Chord {
        Chord::parse(text).unwrap()
    }

    fn sample() -> Translator {
        let mut dict = Dictionary::new();
        dict.insert("S", "Batata").unwrap();
        dict.insert("T", "Tomate").unwrap();
        dict.insert("S/T/K", "Cebola").unwrap();
        dict.insert("*", "=undo").unwrap();
        Translator::new(dict)
    }

    fn raw_of(t: &Translator, node: NodeId) -> String {
        t.dict().value(node).unwrap().raw().to_string()
    }

    #[test]
    fn longest_match_supersedes() {
        crate::testlog::setup();
        let mut t = sample();

        let one = t.translate(chord("S"));
        assert!(matches!(one.emit, Emit::Value(n) if raw_of(&t, n) == "Batata"));
        assert!(one.retract.is_empty());

        let two = t.translate(chord("T"));
        assert!(matches!(two.emit, Emit::Value(n) if raw_of(&t, n) == "Tomate"));
        assert!(two.retract.is_empty());
        assert_eq!(t.branch_depths(), vec![2, 1]);

        let three = t.translate(chord("K"));
        assert!(matches!(three.emit, Emit::Value(n) if raw_of(&t, n) == "Cebola"));
        let names: Vec<_> = three.retract.iter().map(|&n| raw_of(&t, n)).collect();
        assert_eq!(names, vec!["Tomate", "Batata"]);
        assert_eq!(t.branch_depths(), vec![3]);
    }

    #[test]
    fn untranslated_chord() {
        crate::testlog::setup();
        let mut t = sample();
        let out = t.translate(chord("-R"));
        assert_eq!(out.emit, Emit::Untranslated(chord("-R")));
        assert!(out.retract.is_empty());
        assert!(t.branch_depths().is_empty());
    }

    #[test]
    fn undo_restores_branches() {
        crate::testlog::setup();
        let mut t = sample();
        t.translate(chord("S"));
        t.translate(chord("T"));
        let before = t.branch_depths();

        t.translate(chord("K"));
        let frame = t.pop_frame().unwrap();
        t.undo_state(&frame);
        assert_eq!(t.branch_depths(), before);

        // The restored state must behave as if K never happened: stroking K
        // again supersedes both shorter entries again.
        let again = t.translate(chord("K"));
        let names: Vec<_> = again.retract.iter().map(|&n| raw_of(&t, n)).collect();
        assert_eq!(names, vec!["Tomate", "Batata"]);
    }

    #[test]
    fn full_undo_empties_state() {
        crate::testlog::setup();
        let mut t = sample();
        for text in ["S", "T", "K", "T", "-R", "S"] {
            t.translate(chord(text));
        }
        while let Some(frame) = t.pop_frame() {
            t.undo_state(&frame);
        }
        assert!(t.is_quiescent());
    }

    #[test]
    fn depths_stay_descending() {
        crate::testlog::setup();
        let mut dict = Dictionary::new();
        dict.insert("S/T/K/P", "deep").unwrap();
        dict.insert("T/K", "mid").unwrap();
        dict.insert("K", "shallow").unwrap();
        dict.insert("P", "p").unwrap();
        let mut t = Translator::new(dict);

        for text in ["S", "T", "K", "P", "K", "P", "S", "T"] {
            t.translate(chord(text));
            let depths = t.branch_depths();
            for pair in depths.windows(2) {
                assert!(pair[0] > pair[1], "not descending: {:?}", depths);
            }
        }
    }

    #[test]
    fn intermediate_silent_branch() {
        crate::testlog::setup();
        // "T" alone types nothing, but is the start of a longer entry.
        let mut dict = Dictionary::new();
        dict.insert("H", "Cebola").unwrap();
        dict.insert("K", "Chocolate").unwrap();
        dict.insert("P", "Pimenta").unwrap();
        dict.insert("*", "=undo").unwrap();
        dict.insert("T/P/H", "Tomate").unwrap();
        let mut t = Translator::new(dict);

        let one = t.translate(chord("T"));
        assert_eq!(one.emit, Emit::Nothing);

        let two = t.translate(chord("P"));
        assert!(matches!(two.emit, Emit::Value(n) if raw_of(&t, n) == "Pimenta"));

        let three = t.translate(chord("H"));
        assert!(matches!(three.emit, Emit::Value(n) if raw_of(&t, n) == "Tomate"));
        let names: Vec<_> = three.retract.iter().map(|&n| raw_of(&t, n)).collect();
        assert_eq!(names, vec!["Pimenta"]);
    }
}
