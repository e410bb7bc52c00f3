//! In-page keyboard shortcut matching

use crate::config::{KeyEvent, ShortcutConfig};
use crate::site::Site;

/// What the capturing key-down listener does with the event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Not ours; the page and browser see it untouched
    PassThrough,
    /// Matched: `preventDefault` + `stopPropagation`, whatever happens next
    Consumed,
}

impl KeyDisposition {
    pub fn prevents_default(&self) -> bool {
        matches!(self, KeyDisposition::Consumed)
    }
}

/// Classify a key-down for `site`. Typing into editable fields never
/// triggers a shortcut.
pub fn classify_key(shortcuts: &ShortcutConfig, site: Site, event: &KeyEvent) -> KeyDisposition {
    if event.target.is_editable() || !shortcuts.matches(site, event) {
        return KeyDisposition::PassThrough;
    }
    KeyDisposition::Consumed
}
