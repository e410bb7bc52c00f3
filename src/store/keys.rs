//! Persisted storage keys

use std::fmt;

use crate::site::Site;

/// Every key the extension persists. The string forms are stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StorageKey {
    YoutubePersistenceMode,
    TwitterPersistenceMode,
    YoutubeState,
    TwitterState,
    YoutubeSessions,
    TwitterWidth,
    TwitterFontSize,
    TwitterUseDefaultFont,
    TwitterFocusControls,
}

impl StorageKey {
    pub const ALL: [StorageKey; 9] = [
        StorageKey::YoutubePersistenceMode,
        StorageKey::TwitterPersistenceMode,
        StorageKey::YoutubeState,
        StorageKey::TwitterState,
        StorageKey::YoutubeSessions,
        StorageKey::TwitterWidth,
        StorageKey::TwitterFontSize,
        StorageKey::TwitterUseDefaultFont,
        StorageKey::TwitterFocusControls,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::YoutubePersistenceMode => "youtube_persistence_mode",
            StorageKey::TwitterPersistenceMode => "twitter_persistence_mode",
            StorageKey::YoutubeState => "youtube_state",
            StorageKey::TwitterState => "twitter_state",
            StorageKey::YoutubeSessions => "youtube_sessions",
            StorageKey::TwitterWidth => "twitter_width",
            StorageKey::TwitterFontSize => "twitter_font_size",
            StorageKey::TwitterUseDefaultFont => "twitter_use_default_font",
            StorageKey::TwitterFocusControls => "twitter_focus_controls",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == s)
    }

    /// The site a key belongs to
    pub fn site(&self) -> Site {
        match self {
            StorageKey::YoutubePersistenceMode
            | StorageKey::YoutubeState
            | StorageKey::YoutubeSessions => Site::YouTube,
            _ => Site::Twitter,
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_every_key() {
        for key in StorageKey::ALL {
            assert_eq!(StorageKey::parse(key.as_str()), Some(key));
        }
        assert_eq!(StorageKey::parse("persistence_mode"), None);
    }

    #[test]
    fn test_site_keys() {
        assert_eq!(Site::YouTube.state_key().site(), Site::YouTube);
        assert_eq!(Site::Twitter.mode_key().site(), Site::Twitter);
        assert_eq!(StorageKey::YoutubeSessions.site(), Site::YouTube);
    }
}
