//! Site classification for supported hosts
//!
//! Everything here is pure: no I/O, no panics, malformed input classifies
//! as "no site".

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::messaging::{AgentAction, Command};
use crate::store::StorageKey;

const YOUTUBE_HOSTS: &[&str] = &["www.youtube.com", "m.youtube.com", "youtu.be"];
const SHORT_LINK_HOST: &str = "youtu.be";
const TWITTER_HOSTS: &[&str] = &["twitter.com", "www.twitter.com", "x.com", "www.x.com"];

/// A supported site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    YouTube,
    Twitter,
}

impl Site {
    pub const ALL: [Site; 2] = [Site::YouTube, Site::Twitter];

    pub fn as_str(&self) -> &'static str {
        match self {
            Site::YouTube => "youtube",
            Site::Twitter => "twitter",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "youtube" => Some(Site::YouTube),
            "twitter" | "x" => Some(Site::Twitter),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Site::YouTube => "YouTube",
            Site::Twitter => "Twitter/X",
        }
    }

    /// Name of the cross-tab broadcast channel for this site
    pub fn channel_name(&self) -> &'static str {
        match self {
            Site::YouTube => "dissatisfied-youtube",
            Site::Twitter => "dissatisfied-twitter",
        }
    }

    /// Element id of the injected stylesheet link
    pub fn stylesheet_id(&self) -> &'static str {
        match self {
            Site::YouTube => "dissatisfied-youtube-styles",
            Site::Twitter => "dissatisfied-twitter-styles",
        }
    }

    /// Element id of the injected toggle control
    pub fn control_id(&self) -> &'static str {
        match self {
            Site::YouTube => "dissatisfied-youtube-toggle",
            Site::Twitter => "dissatisfied-twitter-toggle",
        }
    }

    /// Class carried by the root element while the site's styles are active
    pub fn active_class(&self) -> &'static str {
        match self {
            Site::YouTube => "dissatisfied-youtube-active",
            Site::Twitter => "dissatisfied-twitter-active",
        }
    }

    pub fn toggle_command(&self) -> Command {
        match self {
            Site::YouTube => Command::ToggleYoutubeStyle,
            Site::Twitter => Command::ToggleTwitterStyle,
        }
    }

    /// Message asking this site's page agent to apply or remove styles
    pub fn style_action(&self, enabled: bool) -> AgentAction {
        match (self, enabled) {
            (Site::YouTube, true) => AgentAction::ApplyYoutubeStyles,
            (Site::YouTube, false) => AgentAction::RemoveYoutubeStyles,
            (Site::Twitter, true) => AgentAction::ApplyTwitterStyles,
            (Site::Twitter, false) => AgentAction::RemoveTwitterStyles,
        }
    }

    pub fn state_key(&self) -> StorageKey {
        match self {
            Site::YouTube => StorageKey::YoutubeState,
            Site::Twitter => StorageKey::TwitterState,
        }
    }

    pub fn mode_key(&self) -> StorageKey {
        match self {
            Site::YouTube => StorageKey::YoutubePersistenceMode,
            Site::Twitter => StorageKey::TwitterPersistenceMode,
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

pub fn is_youtube_host(host: &str) -> bool {
    YOUTUBE_HOSTS.contains(&host)
}

pub fn is_twitter_host(host: &str) -> bool {
    TWITTER_HOSTS.contains(&host)
}

/// Host-only classification.
///
/// Page agents run on every page of a supported host, so they use this
/// rather than [`classify_site`], which also demands a video page on YouTube.
pub fn site_for_host(host: &str) -> Option<Site> {
    if is_youtube_host(host) {
        Some(Site::YouTube)
    } else if is_twitter_host(host) {
        Some(Site::Twitter)
    } else {
        None
    }
}

/// Classify a URL as a supported site page.
///
/// YouTube only matches actual video pages (`/watch?v=`, `/embed/<id>`,
/// `youtu.be/<id>`); the home feed and shorts are `None`. Twitter/X matches
/// on host alone.
pub fn classify_site(url: &str) -> Option<Site> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;

    if is_twitter_host(host) {
        return Some(Site::Twitter);
    }
    if is_youtube_host(host) && is_youtube_video(&parsed, host) {
        return Some(Site::YouTube);
    }
    None
}

/// Convenience wrapper over [`classify_site`] for a single site
pub fn is_youtube_video_url(url: &str) -> bool {
    classify_site(url) == Some(Site::YouTube)
}

fn is_youtube_video(url: &Url, host: &str) -> bool {
    let mut segments = match url.path_segments() {
        Some(segments) => segments.filter(|s| !s.is_empty()),
        None => return false,
    };

    if host == SHORT_LINK_HOST {
        return matches!(segments.next(), Some(id) if id != "shorts");
    }

    match segments.next() {
        Some("watch") => url.query_pairs().any(|(k, v)| k == "v" && !v.is_empty()),
        Some("embed") => segments.next().is_some(),
        _ => false,
    }
}

/// Extract the host of a URL, if it has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
}
