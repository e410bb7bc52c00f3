//! Default page shortcuts
//!
//! Used when no user configuration is present.

use super::keys::ShortcutConfig;
use crate::site::Site;

/// Helper to insert a binding
fn bind(config: &mut ShortcutConfig, site: Site, key: &str) {
    if let Ok(chord) = key.parse() {
        config.bind(site, chord);
    }
}

/// Create the default shortcut configuration
pub fn default_shortcuts() -> ShortcutConfig {
    let mut config = ShortcutConfig::new();

    bind(&mut config, Site::YouTube, "`");

    bind(&mut config, Site::Twitter, "C-b");
    // Option+Shift+X on macOS, where Ctrl+B is taken by the system
    bind(&mut config, Site::Twitter, "M-S-x");

    config
}
