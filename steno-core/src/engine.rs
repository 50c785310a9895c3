//! The translation engine.
//!
//! Glues the translator to the typer: runs each chord through the state
//! machine, renders the winning definition's atoms into text under the
//! current formatter state, and intercepts the definitions that act on the
//! engine itself (undo and the stroke macros) before anything is typed.

use std::io;

use regex::Regex;

use crate::chord::{self, Chord};
use crate::dict::{
    Atom, Dictionary, DictionaryValue, Emit, FormatState, SpaceOverride, Translation, Translator,
    TypeAction, Typer,
};
use crate::output::{KeySink, DELETE};

/// Definitions the engine handles itself instead of typing.
#[derive(Copy, Clone, Debug)]
enum Special {
    Undo,
    Repeat,
    Toggle,
    InsertSpace,
    RemoveSpace,
}

fn special_of(value: &DictionaryValue) -> Option<Special> {
    match value.as_single()? {
        Atom::Undo => Some(Special::Undo),
        Atom::RepeatLastStroke => Some(Special::Repeat),
        Atom::ToggleAsterisk => Some(Special::Toggle),
        Atom::InsertSpaceBetweenLastStrokes => Some(Special::InsertSpace),
        Atom::RemoveSpaceBetweenLastStrokes => Some(Special::RemoveSpace),
        _ => None,
    }
}

pub struct Engine {
    translator: Translator,
    typer: Typer,
}

impl Engine {
    pub fn new(dict: Dictionary) -> Engine {
        Engine {
            translator: Translator::new(dict),
            typer: Typer::new(),
        }
    }

    pub fn translator(&self) -> &Translator {
        &self.translator
    }

    /// Feed one chord through the engine.
    pub fn stroke(&mut self, chord: Chord) {
        let t = self.translator.translate(chord);

        let special = if let Emit::Value(node) = t.emit {
            let value = self
                .translator
                .dict()
                .value(node)
                .expect("winning node lost its value");
            special_of(value)
        } else {
            None
        };

        match special {
            None => self.apply(t),
            Some(Special::Undo) => {
                // Two frames come off: the undo stroke itself, which typed
                // nothing, and then the stroke being undone.
                self.rewind_own();
                if let Some(frame) = self.translator.pop_frame() {
                    self.translator.undo_state(&frame);
                    self.typer.undo();
                }
            }
            Some(Special::Repeat) => {
                self.rewind_own();
                if let Some(prev) = self.translator.last_chord() {
                    self.stroke(prev);
                }
            }
            Some(Special::Toggle) => {
                self.rewind_own();
                if let Some(frame) = self.translator.pop_frame() {
                    self.translator.undo_state(&frame);
                    self.typer.undo();
                    let toggled = if frame.chord.has_any(chord::STAR) {
                        frame.chord.mask(chord::STAR)
                    } else {
                        frame.chord.merge(chord::STAR)
                    };
                    self.stroke(toggled);
                }
            }
            Some(Special::InsertSpace) => self.respace(SpaceOverride::Force),
            Some(Special::RemoveSpace) => self.respace(SpaceOverride::Suppress),
        }
    }

    /// Undo the state effects of the stroke just translated (which is being
    /// intercepted, so it never reaches the typer).
    fn rewind_own(&mut self) {
        if let Some(own) = self.translator.pop_frame() {
            self.translator.undo_state(&own);
        }
    }

    /// Take back the previous stroke and redo it with a spacing override.
    fn respace(&mut self, how: SpaceOverride) {
        self.rewind_own();
        if let Some(frame) = self.translator.pop_frame() {
            self.translator.undo_state(&frame);
            self.typer.undo();
            self.typer.set_space_override(how);
            self.stroke(frame.chord);
        }
    }

    fn apply(&mut self, t: Translation) {
        let retract = t.retract.len();
        match t.emit {
            Emit::Nothing => {
                self.typer.record_silent();
            }
            Emit::Untranslated(chord) => {
                // Raw steno goes out verbatim, without the leading space a
                // dictionary word would get.
                let mut next = self.typer.state().clone();
                next.attach = false;
                next.glue = false;
                next.space = None;
                self.typer.replace(retract, chord.raw_steno(), next);
            }
            Emit::Value(node) => {
                let prior = self.typer.state_before(retract);
                let prev = self.typer.visible_word(retract).map(|s| s.to_string());
                let value = self
                    .translator
                    .dict()
                    .value(node)
                    .expect("winning node lost its value");
                let r = render(value, &prior, prev.as_deref());
                let retract = if r.replace_prev { retract + 1 } else { retract };
                self.typer.replace(retract, r.text, r.next);
            }
        }
    }

    /// Retrieve the next pending typing action.
    pub fn next_action(&mut self) -> Option<TypeAction> {
        self.typer.next_action()
    }

    /// Drain pending actions into a sink as keystroke bytes.
    pub fn flush(&mut self, sink: &mut dyn KeySink) -> io::Result<()> {
        while let Some(action) = self.typer.next_action() {
            if action.remove > 0 {
                sink.send(&vec![DELETE; action.remove])?;
            }
            if !action.text.is_empty() {
                sink.send(action.text.as_bytes())?;
            }
        }
        Ok(())
    }
}

struct Rendered {
    text: String,
    next: FormatState,
    /// The text stands in for the previous word rather than following it.
    replace_prev: bool,
}

/// Render a definition's atoms into text under the given formatter state.
/// `prev_word` is the newest visible word, for the atoms that reformat it.
fn render(value: &DictionaryValue, prior: &FormatState, prev_word: Option<&str>) -> Rendered {
    let mut st = prior.clone();
    let mut out = String::new();
    let mut replace_prev = false;
    let mut glue_value = false;

    for atom in value.atoms() {
        // Textual atoms reduce to a piece of text plus joining flags:
        // (text, attach before, attach after, carry capitalization).
        let piece = match atom {
            Atom::Raw(span) => Some((value.text(span).to_string(), false, false, false)),
            Atom::AttachPrefix(span) => Some((value.text(span).to_string(), true, false, false)),
            Atom::AttachSuffix(span) => Some((value.text(span).to_string(), false, true, false)),
            Atom::AttachInfix(span) => Some((value.text(span).to_string(), true, true, false)),
            Atom::Glue(span) => {
                glue_value = true;
                Some((value.text(span).to_string(), st.glue, false, false))
            }
            Atom::CarryCapitalization(span) => {
                let mut text = value.text(span);
                let mut before = false;
                let mut after = false;
                if let Some(rest) = text.strip_prefix("^~|") {
                    text = rest;
                    before = true;
                } else if let Some(rest) = text.strip_prefix("~|") {
                    text = rest;
                }
                if let Some(rest) = text.strip_suffix('^') {
                    text = rest;
                    after = true;
                }
                Some((text.to_string(), before, after, true))
            }

            Atom::CapitalizeNext => {
                st.cap = Some(true);
                None
            }
            Atom::UncapitalizeNext => {
                st.cap = Some(false);
                None
            }
            Atom::UppercaseNextWord => {
                st.upper_word = true;
                None
            }
            Atom::CapsLockMode => {
                st.caps_lock = !st.caps_lock;
                None
            }

            Atom::CapitalizePrev | Atom::UncapitalizePrev | Atom::UppercasePrevWord => {
                if let Some(prev) = prev_word {
                    out = match atom {
                        Atom::CapitalizePrev => recase_first(prev, true),
                        Atom::UncapitalizePrev => recase_first(prev, false),
                        _ => prev.to_uppercase(),
                    };
                    replace_prev = true;
                }
                None
            }
            Atom::Currency { prefix, suffix } => {
                if let Some(prev) = prev_word {
                    let amount = prev.trim_start();
                    let lead = &prev[..prev.len() - amount.len()];
                    out = format!(
                        "{}{}{}{}",
                        lead,
                        value.text(prefix),
                        amount,
                        value.text(suffix)
                    );
                    replace_prev = true;
                }
                None
            }
            Atom::Conditional {
                regex,
                if_true,
                if_false,
            } => {
                if let Some(prev) = prev_word {
                    let subject = prev.trim_start();
                    let lead = &prev[..prev.len() - subject.len()];
                    match Regex::new(value.text(regex)) {
                        Ok(re) => {
                            let chosen = if let Some(caps) = re.captures(subject) {
                                let mut dst = String::new();
                                caps.expand(&to_dollar_template(value.text(if_true)), &mut dst);
                                dst
                            } else {
                                strip_backrefs(value.text(if_false))
                            };
                            out = format!("{}{}", lead, chosen);
                            replace_prev = true;
                        }
                        Err(e) => {
                            log::warn!("bad conditional regex {:?}: {}", value.text(regex), e)
                        }
                    }
                }
                None
            }

            Atom::Command(span) => {
                log::debug!("ignoring command {:?}", value.text(span));
                None
            }
            Atom::DoNothing => None,
            Atom::Undo
            | Atom::RepeatLastStroke
            | Atom::ToggleAsterisk
            | Atom::InsertSpaceBetweenLastStrokes
            | Atom::RemoveSpaceBetweenLastStrokes => {
                log::debug!("engine atom inside a longer definition, ignoring");
                None
            }
        };

        if let Some((text, before, after, carry)) = piece {
            if text.is_empty() {
                // A bare attach carries its joining through to the next
                // word instead of spending it on nothing.
                st.attach = st.attach || before || after;
                continue;
            }

            let attach = st.attach || before;
            let mut space = !attach;
            if let Some(over) = st.space.take() {
                space = matches!(over, SpaceOverride::Force);
            }
            if space {
                out.push(' ');
            }
            let cased = apply_case(&text, &mut st, carry);
            out.push_str(&cased);
            st.attach = after;
        }
    }

    st.glue = glue_value;

    Rendered {
        text: out,
        next: st,
        replace_prev,
    }
}

fn apply_case(text: &str, st: &mut FormatState, carry: bool) -> String {
    let mut out = if st.caps_lock {
        text.to_uppercase()
    } else {
        text.to_string()
    };
    if carry {
        return out;
    }
    if st.upper_word {
        st.upper_word = false;
        out = out.to_uppercase();
    }
    if let Some(upper) = st.cap.take() {
        out = recase_first(&out, upper);
    }
    out
}

/// Change the case of the first alphabetic character.
fn recase_first(text: &str, upper: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut done = false;
    for ch in text.chars() {
        if !done && ch.is_alphabetic() {
            done = true;
            if upper {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Conditional arms write back-references as `\1`; the regex crate expands
/// `$1`.  Translate, escaping any literal dollar signs.
fn to_dollar_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '$' => out.push_str("$$"),
            '\\' if chars.peek().map_or(false, |c| c.is_ascii_digit()) => {
                out.push_str("${");
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    out.push(d);
                    chars.next();
                }
                out.push('}');
            }
            ch => out.push(ch),
        }
    }
    out
}

/// Drop `\N` back-references from an arm that has no match to draw on.
fn strip_backrefs(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek().map_or(false, |c| c.is_ascii_digit()) {
            while chars.peek().map_or(false, |c| c.is_ascii_digit()) {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::WriteBuffer;

    fn chord(text: &str) -> Chord {
        Chord::parse(text).unwrap()
    }

    fn engine(entries: &[(&str, &str)]) -> Engine {
        crate::testlog::setup();
        let mut dict = Dictionary::new();
        for (path, def) in entries {
            dict.insert(path, def).unwrap();
        }
        Engine::new(dict)
    }

    fn run(e: &mut Engine, buf: &mut WriteBuffer, text: &str) -> String {
        e.stroke(chord(text));
        e.flush(buf).unwrap();
        buf.as_str().to_string()
    }

    #[test]
    fn attach_suffix_joins() {
        let mut e = engine(&[("KAT", "cat"), ("-G", "{^ing}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        assert_eq!(run(&mut e, &mut buf, "-G"), " cating");
    }

    #[test]
    fn attach_prefix_joins_forward() {
        let mut e = engine(&[("RE", "{re^}"), ("KAT", "cat")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "RE");
        assert_eq!(run(&mut e, &mut buf, "KAT"), " recat");
    }

    #[test]
    fn capitalize_next() {
        let mut e = engine(&[("KPA", "{-|}"), ("KAT", "cat")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KPA");
        assert_eq!(run(&mut e, &mut buf, "KAT"), " Cat");
    }

    #[test]
    fn capitalize_prev() {
        let mut e = engine(&[("KAT", "cat"), ("-RB", "{*-|}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        assert_eq!(run(&mut e, &mut buf, "-RB"), " Cat");
        // And it can be undone like any stroke.
    }

    #[test]
    fn uppercase_next_word() {
        let mut e = engine(&[("UP", "{<}"), ("KAT", "cat")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "UP");
        assert_eq!(run(&mut e, &mut buf, "KAT"), " CAT");
    }

    #[test]
    fn glue_coheres() {
        let mut e = engine(&[("P", "{&P}"), ("H", "{&H}"), ("KAT", "cat")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "P");
        assert_eq!(run(&mut e, &mut buf, "H"), " PH");
        // A plain word breaks the glue run.
        assert_eq!(run(&mut e, &mut buf, "KAT"), " PH cat");
        assert_eq!(run(&mut e, &mut buf, "P"), " PH cat P");
    }

    #[test]
    fn currency_reformats_previous() {
        let mut e = engine(&[("5", "5"), ("-RBGS", "{*(€c.00)}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "5");
        assert_eq!(run(&mut e, &mut buf, "-RBGS"), " €5.00");
    }

    #[test]
    fn conditional_rewrites_previous() {
        let mut e = engine(&[("KAT", "cat"), ("-D", r"{=^c(.*)/C\1!/???}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        assert_eq!(run(&mut e, &mut buf, "-D"), " Cat!");
    }

    #[test]
    fn repeat_macro() {
        let mut e = engine(&[("KAT", "cat"), ("-RPT", "{*+}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        assert_eq!(run(&mut e, &mut buf, "-RPT"), " cat cat");
    }

    #[test]
    fn toggle_asterisk_macro() {
        let mut e = engine(&[("KAT", "cat"), ("KA*T", "CAT"), ("-G", "{*}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        assert_eq!(run(&mut e, &mut buf, "-G"), " CAT");
    }

    #[test]
    fn remove_space_macro() {
        let mut e = engine(&[("KAT", "cat"), ("TKOG", "dog"), ("-PS", "{*!}")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAT");
        run(&mut e, &mut buf, "TKOG");
        assert_eq!(run(&mut e, &mut buf, "-PS"), " catdog");
    }

    #[test]
    fn caps_lock_mode() {
        let mut e = engine(&[("KAPS", "{#Caps_Lock}"), ("KAT", "cat")]);
        let mut buf = WriteBuffer::new();
        run(&mut e, &mut buf, "KAPS");
        assert_eq!(run(&mut e, &mut buf, "KAT"), " CAT");
        run(&mut e, &mut buf, "KAPS");
        assert_eq!(run(&mut e, &mut buf, "KAT"), " CAT cat");
    }
}
