pub mod default_keys;
pub mod keys;
mod settings;

pub use default_keys::default_shortcuts;
pub use keys::{
    parse_key_notation, EventTarget, KeyChord, KeyEvent, KeyParseError, Modifiers, ShortcutConfig,
};
pub use settings::{Config, StylesheetConfig, TheaterTiming, EXAMPLE_CONFIG};
