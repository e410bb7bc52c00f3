//! Page shortcut types and parsing
//!
//! Shortcuts are written in vim-style notation (`C-b`, `M-S-x`, `` ` ``) and
//! matched against browser keyboard events by either the produced key or the
//! physical key code, so that layouts where Alt rewrites the character (macOS
//! Option) still match.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::site::Site;

/// Modifier state of a key event or chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn alt_shift() -> Self {
        Self {
            alt: true,
            shift: true,
            ..Self::NONE
        }
    }

    /// Whether an event's modifiers satisfy a chord's. Shift is free on
    /// control chords, so Ctrl+Shift+B still reads as Ctrl+B.
    pub fn satisfied_by(&self, event: Modifiers) -> bool {
        if self.ctrl && !self.shift {
            return event.ctrl && !event.alt && !event.meta;
        }
        event == *self
    }
}

/// What the key-down event was dispatched to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EventTarget {
    #[default]
    Body,
    Input,
    TextArea,
    Select,
    ContentEditable,
    Other(String),
}

impl EventTarget {
    /// Typing into these must never trigger a page shortcut
    pub fn is_editable(&self) -> bool {
        matches!(
            self,
            EventTarget::Input
                | EventTarget::TextArea
                | EventTarget::Select
                | EventTarget::ContentEditable
        )
    }
}

/// Snapshot of a browser `keydown` event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// Produced character (`KeyboardEvent.key`)
    pub key: String,
    /// Physical key (`KeyboardEvent.code`)
    pub code: String,
    pub modifiers: Modifiers,
    pub target: EventTarget,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>, code: impl Into<String>, modifiers: Modifiers) -> Self {
        Self {
            key: key.into(),
            code: code.into(),
            modifiers,
            target: EventTarget::Body,
        }
    }

    /// Event for a character key, deriving the physical code from it
    pub fn from_char(c: char, modifiers: Modifiers) -> Self {
        Self::new(c.to_string(), code_for_char(c).unwrap_or_default(), modifiers)
    }

    pub fn with_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }
}

/// A key plus its modifier set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyChord {
    pub key: char,
    pub modifiers: Modifiers,
}

impl KeyChord {
    pub fn new(key: char, modifiers: Modifiers) -> Self {
        Self {
            key: key.to_ascii_lowercase(),
            modifiers,
        }
    }

    pub fn matches(&self, event: &KeyEvent) -> bool {
        if !self.modifiers.satisfied_by(event.modifiers) {
            return false;
        }
        let by_key = event.key.to_lowercase() == self.key.to_string();
        let by_code = code_for_char(self.key).is_some_and(|code| code == event.code);
        by_key || by_code
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if self.modifiers.ctrl {
            parts.push("C".to_string());
        }
        if self.modifiers.alt {
            parts.push("M".to_string());
        }
        if self.modifiers.shift {
            parts.push("S".to_string());
        }
        if self.modifiers.meta {
            parts.push("D".to_string());
        }
        parts.push(match self.key {
            ' ' => "<Space>".to_string(),
            c => c.to_string(),
        });
        write!(f, "{}", parts.join("-"))
    }
}

/// `KeyboardEvent.code` for a printable key
fn code_for_char(c: char) -> Option<String> {
    match c {
        'a'..='z' => Some(format!("Key{}", c.to_ascii_uppercase())),
        'A'..='Z' => Some(format!("Key{}", c)),
        '0'..='9' => Some(format!("Digit{}", c)),
        '`' => Some("Backquote".to_string()),
        ' ' => Some("Space".to_string()),
        '-' => Some("Minus".to_string()),
        '=' => Some("Equal".to_string()),
        '[' => Some("BracketLeft".to_string()),
        ']' => Some("BracketRight".to_string()),
        '\\' => Some("Backslash".to_string()),
        ';' => Some("Semicolon".to_string()),
        '\'' => Some("Quote".to_string()),
        ',' => Some("Comma".to_string()),
        '.' => Some("Period".to_string()),
        '/' => Some("Slash".to_string()),
        _ => None,
    }
}

/// Parse a vim-style key notation string into a KeyChord
///
/// Supported notation:
/// - `C-x` for Ctrl+x
/// - `M-x` for Alt/Option+x
/// - `S-x` for Shift+x
/// - `D-x` for Meta/Cmd+x
/// - `M-S-x` for combinations
/// - `<Space>` for space
pub fn parse_key_notation(s: &str) -> Result<KeyChord, KeyParseError> {
    let s = s.trim();

    if s.is_empty() {
        return Err(KeyParseError::Empty);
    }
    // A bare "-" is the minus key, not a separator
    if s == "-" {
        return Ok(KeyChord::new('-', Modifiers::NONE));
    }

    let parts: Vec<&str> = s.split('-').collect();
    let (key_str, modifier_parts) = match parts.split_last() {
        Some((key, mods)) => (*key, mods),
        None => return Err(KeyParseError::Empty),
    };

    let mut modifiers = Modifiers::NONE;
    for part in modifier_parts {
        match *part {
            "C" => modifiers.ctrl = true,
            "M" => modifiers.alt = true,
            "S" => modifiers.shift = true,
            "D" => modifiers.meta = true,
            other => return Err(KeyParseError::InvalidModifier(other.to_string())),
        }
    }

    let key = parse_key(key_str)?;
    // "G" means shift+g, as in the config file convention
    if key.is_ascii_uppercase() {
        modifiers.shift = true;
    }

    Ok(KeyChord::new(key, modifiers))
}

fn parse_key(s: &str) -> Result<char, KeyParseError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(KeyParseError::NoKey),
        (Some(c), None) => Ok(c),
        _ => match s.to_uppercase().as_str() {
            "<SPACE>" | "SPACE" => Ok(' '),
            "<BACKQUOTE>" | "BACKQUOTE" => Ok('`'),
            "<MINUS>" | "MINUS" => Ok('-'),
            _ => Err(KeyParseError::InvalidKey(s.to_string())),
        },
    }
}

/// Error type for key parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyParseError {
    Empty,
    NoKey,
    InvalidKey(String),
    InvalidModifier(String),
}

impl fmt::Display for KeyParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyParseError::Empty => write!(f, "empty key notation"),
            KeyParseError::NoKey => write!(f, "no key specified"),
            KeyParseError::InvalidKey(s) => write!(f, "invalid key: {}", s),
            KeyParseError::InvalidModifier(s) => write!(f, "invalid modifier: {}", s),
        }
    }
}

impl std::error::Error for KeyParseError {}

impl FromStr for KeyChord {
    type Err = KeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_key_notation(s)
    }
}

/// Page shortcut chords per site
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutConfig {
    bindings: HashMap<Site, Vec<KeyChord>>,
}

impl ShortcutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, site: Site, chord: KeyChord) {
        let chords = self.bindings.entry(site).or_default();
        if !chords.contains(&chord) {
            chords.push(chord);
        }
    }

    pub fn chords_for(&self, site: Site) -> &[KeyChord] {
        self.bindings.get(&site).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether an event is one of the site's toggle chords
    pub fn matches(&self, site: Site, event: &KeyEvent) -> bool {
        self.chords_for(site).iter().any(|chord| chord.matches(event))
    }

    /// Replace a site's chords wholesale (user config wins over defaults)
    pub fn replace(&mut self, site: Site, chords: Vec<KeyChord>) {
        self.bindings.insert(site, chords);
    }
}
