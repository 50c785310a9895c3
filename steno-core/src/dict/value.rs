//! Definition parsing.
//!
//! A definition string mixes literal text with control sequences written in
//! braces: `so{^on}` types "soon", `{-|}` capitalizes the next word, and so
//! on.  Parsing breaks the string into a sequence of atoms.  Atoms that
//! carry text do so as byte ranges into the raw string, which stays owned by
//! the value, so no atom ever allocates and logs can always report the
//! definition verbatim.
//!
//! Braces do not nest.  The one special case outside braces is the whole
//! definition `=undo`, which is the undo stroke.

use std::fmt;

/// A byte range into the owning definition's raw string.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Span {
    start: u32,
    len: u32,
}

impl Span {
    fn new(start: usize, len: usize) -> Span {
        Span {
            start: start as u32,
            len: len as u32,
        }
    }

    /// The text this span covers within `raw`.
    pub fn of<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.start as usize..(self.start as usize + self.len as usize)]
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One parsed piece of a definition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Atom {
    /// Literal text outside of braces.
    Raw(Span),
    /// `{^text}`: joins onto the previous output, no space before.
    AttachPrefix(Span),
    /// `{text^}`: the next output joins onto this, no space after.
    AttachSuffix(Span),
    /// `{^text^}`: joins on both sides.
    AttachInfix(Span),
    /// `{&X}`: joins onto the previous output only if that was also glue.
    /// Used for fingerspelling.
    Glue(Span),
    /// `{-|}`
    CapitalizeNext,
    /// `{*-|}`
    CapitalizePrev,
    /// `{>}`
    UncapitalizeNext,
    /// `{*>}`
    UncapitalizePrev,
    /// `{<}`
    UppercaseNextWord,
    /// `{*<}`
    UppercasePrevWord,
    /// `{~|text}` or `{^~|text^}`: types its text but lets a pending
    /// capitalization pass through to the word after it.  The span covers
    /// the whole brace interior; the renderer strips the markers.
    CarryCapitalization(Span),
    /// `{#Caps_Lock}`
    CapsLockMode,
    /// `{*(prefix c suffix)}`: reformats the previous word as an amount,
    /// with `c` standing for the amount itself.
    Currency { prefix: Span, suffix: Span },
    /// `{=regex/ifTrue/ifFalse}`: matches the previous word against the
    /// regex and replaces it with the arm that applies.
    Conditional {
        regex: Span,
        if_true: Span,
        if_false: Span,
    },
    /// The whole definition was `=undo`.
    Undo,
    /// `{*+}`
    RepeatLastStroke,
    /// `{*}`
    ToggleAsterisk,
    /// `{*?}`
    InsertSpaceBetweenLastStrokes,
    /// `{*!}`
    RemoveSpaceBetweenLastStrokes,
    /// `{#keys}`: a named keyboard shortcut.  Parsed but not dispatched.
    Command(Span),
    /// `{}`
    DoNothing,
}

/// Definition text that doesn't parse.
#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    CannotNestType,
    MissingOpenBracket,
    MissingCloseBracket,
    CurrencyMissingC,
    ConditionalMissingRegex,
    ConditionalMissingIfTrue,
    ConditionalMissingIfFalse,
    Unknown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Error::CannotNestType => "braces cannot nest",
            Error::MissingOpenBracket => "'}' without an opening '{'",
            Error::MissingCloseBracket => "'{' without a closing '}'",
            Error::CurrencyMissingC => "currency template without a 'c'",
            Error::ConditionalMissingRegex => "conditional without a regex",
            Error::ConditionalMissingIfTrue => "conditional without a true arm",
            Error::ConditionalMissingIfFalse => "conditional without a false arm",
            Error::Unknown => "unrecognized control sequence",
        };
        f.write_str(text)
    }
}

impl std::error::Error for Error {}

/// A parsed definition: the raw string plus the atoms pointing into it.
#[derive(Debug, PartialEq)]
pub struct DictionaryValue {
    raw: String,
    atoms: Vec<Atom>,
}

impl DictionaryValue {
    pub fn parse(raw: &str) -> Result<DictionaryValue, Error> {
        if raw == "=undo" {
            return Ok(DictionaryValue {
                raw: raw.to_string(),
                atoms: vec![Atom::Undo],
            });
        }

        let mut atoms = Vec::new();
        let mut plain = 0;
        let mut open = None;

        for (i, ch) in raw.char_indices() {
            match ch {
                '{' => {
                    if open.is_some() {
                        return Err(Error::CannotNestType);
                    }
                    if i > plain {
                        atoms.push(Atom::Raw(Span::new(plain, i - plain)));
                    }
                    open = Some(i + 1);
                }
                '}' => {
                    let start = open.take().ok_or(Error::MissingOpenBracket)?;
                    atoms.push(parse_braced(raw, start, i)?);
                    plain = i + 1;
                }
                _ => (),
            }
        }

        if open.is_some() {
            return Err(Error::MissingCloseBracket);
        }
        if raw.len() > plain {
            atoms.push(Atom::Raw(Span::new(plain, raw.len() - plain)));
        }

        Ok(DictionaryValue {
            raw: raw.to_string(),
            atoms,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    /// Resolve a span against this value's raw string.
    pub fn text(&self, span: &Span) -> &str {
        span.of(&self.raw)
    }

    /// The single atom of a one-atom definition.
    pub fn as_single(&self) -> Option<&Atom> {
        match self.atoms.as_slice() {
            [atom] => Some(atom),
            _ => None,
        }
    }

    /// Is this the undo stroke?
    pub fn is_undo(&self) -> bool {
        matches!(self.as_single(), Some(Atom::Undo))
    }
}

/// Work out which atom the material between braces is.  `start..end` are
/// byte offsets of the interior within `raw`.
fn parse_braced(raw: &str, start: usize, end: usize) -> Result<Atom, Error> {
    let s = &raw[start..end];
    let len = end - start;

    if s.is_empty() {
        return Ok(Atom::DoNothing);
    }

    // Carry forms keep the markers in the span; see the variant docs.
    if s.starts_with("~|") || s.starts_with("^~|") {
        return Ok(Atom::CarryCapitalization(Span::new(start, len)));
    }

    match s {
        "-|" => return Ok(Atom::CapitalizeNext),
        "*-|" => return Ok(Atom::CapitalizePrev),
        ">" => return Ok(Atom::UncapitalizeNext),
        "*>" => return Ok(Atom::UncapitalizePrev),
        "<" => return Ok(Atom::UppercaseNextWord),
        "*<" => return Ok(Atom::UppercasePrevWord),
        "*+" => return Ok(Atom::RepeatLastStroke),
        "*" => return Ok(Atom::ToggleAsterisk),
        "*?" => return Ok(Atom::InsertSpaceBetweenLastStrokes),
        "*!" => return Ok(Atom::RemoveSpaceBetweenLastStrokes),
        _ => (),
    }

    if let Some(tail) = s.strip_prefix('#') {
        if tail.eq_ignore_ascii_case("caps_lock") {
            return Ok(Atom::CapsLockMode);
        }
        return Ok(Atom::Command(Span::new(start + 1, len - 1)));
    }

    if let Some(inner) = s.strip_prefix("*(") {
        let inner = inner.strip_suffix(')').ok_or(Error::Unknown)?;
        let c = inner.find('c').ok_or(Error::CurrencyMissingC)?;
        return Ok(Atom::Currency {
            prefix: Span::new(start + 2, c),
            suffix: Span::new(start + 2 + c + 1, inner.len() - c - 1),
        });
    }

    if let Some(body) = s.strip_prefix('=') {
        if body.is_empty() {
            return Err(Error::ConditionalMissingRegex);
        }
        let slash1 = match body.find('/') {
            Some(0) => return Err(Error::ConditionalMissingRegex),
            None => return Err(Error::ConditionalMissingIfTrue),
            Some(n) => n,
        };
        let rest = &body[slash1 + 1..];
        let slash2 = rest.find('/').ok_or(Error::ConditionalMissingIfFalse)?;
        // Offsets of the three fields, relative to the start of the body.
        let body_at = start + 1;
        return Ok(Atom::Conditional {
            regex: Span::new(body_at, slash1),
            if_true: Span::new(body_at + slash1 + 1, slash2),
            if_false: Span::new(
                body_at + slash1 + 1 + slash2 + 1,
                rest.len() - slash2 - 1,
            ),
        });
    }

    if let Some(body) = s.strip_prefix('&') {
        return Ok(Atom::Glue(Span::new(start + 1, body.len())));
    }

    if len >= 2 && s.starts_with('^') && s.ends_with('^') {
        return Ok(Atom::AttachInfix(Span::new(start + 1, len - 2)));
    }
    if let Some(body) = s.strip_prefix('^') {
        return Ok(Atom::AttachPrefix(Span::new(start + 1, body.len())));
    }
    if let Some(body) = s.strip_suffix('^') {
        return Ok(Atom::AttachSuffix(Span::new(start, body.len())));
    }

    Err(Error::Unknown)
}
