//! Typed setting values and their validation
//!
//! Raw storage holds arbitrary JSON. Everything crossing into the typed
//! world goes through [`SettingValue::decode`], which replaces any value that
//! fails a type or range check with its documented default.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::keys::StorageKey;
use super::RawChange;
use crate::site::Site;

pub const TWITTER_WIDTH_MIN: u8 = 30;
pub const TWITTER_WIDTH_MAX: u8 = 100;
pub const TWITTER_WIDTH_DEFAULT: u8 = 80;
pub const TWITTER_FONT_SIZE_MIN: u8 = 13;
pub const TWITTER_FONT_SIZE_MAX: u8 = 22;
pub const TWITTER_FONT_SIZE_DEFAULT: u8 = 15;
pub const TWITTER_USE_DEFAULT_FONT_DEFAULT: bool = true;

/// Opaque browser tab identifier. The browser reuses ids after a tab closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(pub i64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TabId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(TabId)
    }
}

/// Scope of a site's enabled/disabled state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceMode {
    /// Each tab toggles independently; state is transient
    #[default]
    Tab,
    /// One persisted state governs every tab of the site
    Global,
}

impl PersistenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistenceMode::Tab => "tab",
            PersistenceMode::Global => "global",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "tab" => Some(PersistenceMode::Tab),
            "global" => Some(PersistenceMode::Global),
            _ => None,
        }
    }
}

impl fmt::Display for PersistenceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToggleState {
    pub enabled: bool,
}

impl ToggleState {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

/// Twitter/X focus feature flags.
///
/// `hide_header` is stored separately for compatibility but always follows
/// `center_timeline`; call [`TwitterFocusControls::normalized`] before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TwitterFocusControls {
    pub hide_sidebar_column: bool,
    pub hide_chat_drawer: bool,
    pub hide_grok_drawer: bool,
    pub hide_header: bool,
    pub center_timeline: bool,
}

impl Default for TwitterFocusControls {
    fn default() -> Self {
        Self {
            hide_sidebar_column: true,
            hide_chat_drawer: true,
            hide_grok_drawer: true,
            hide_header: true,
            center_timeline: true,
        }
    }
}

impl TwitterFocusControls {
    pub fn normalized(mut self) -> Self {
        self.hide_header = self.center_timeline;
        self
    }
}

/// Everything the Twitter/X agent needs to lay out the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwitterSettings {
    pub width: u8,
    pub font_size: u8,
    pub use_default_font: bool,
    pub controls: TwitterFocusControls,
}

impl Default for TwitterSettings {
    fn default() -> Self {
        Self {
            width: TWITTER_WIDTH_DEFAULT,
            font_size: TWITTER_FONT_SIZE_DEFAULT,
            use_default_font: TWITTER_USE_DEFAULT_FONT_DEFAULT,
            controls: TwitterFocusControls::default(),
        }
    }
}

impl TwitterSettings {
    /// Icon scale relative to the platform's default 15px font
    pub fn icon_scale(&self) -> f32 {
        f32::from(self.font_size) / f32::from(TWITTER_FONT_SIZE_DEFAULT)
    }
}

pub fn clamp_twitter_width(value: i64) -> u8 {
    value.clamp(i64::from(TWITTER_WIDTH_MIN), i64::from(TWITTER_WIDTH_MAX)) as u8
}

pub fn clamp_twitter_font_size(value: i64) -> u8 {
    value.clamp(
        i64::from(TWITTER_FONT_SIZE_MIN),
        i64::from(TWITTER_FONT_SIZE_MAX),
    ) as u8
}

/// Tabs where the extension, not the user, turned theater mode on.
///
/// Only tabs that need reverting are present; there is no "false" entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TheaterSessions {
    tabs: BTreeSet<TabId>,
}

impl TheaterSessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the extension engaged theater mode. Returns false if
    /// the tab was already recorded.
    pub fn record(&mut self, tab: TabId) -> bool {
        self.tabs.insert(tab)
    }

    pub fn remove(&mut self, tab: TabId) -> bool {
        self.tabs.remove(&tab)
    }

    pub fn contains(&self, tab: TabId) -> bool {
        self.tabs.contains(&tab)
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TabId> + '_ {
        self.tabs.iter().copied()
    }

    fn to_json(&self) -> Value {
        let map: BTreeMap<String, bool> = self.tabs.iter().map(|t| (t.to_string(), true)).collect();
        json!(map)
    }

    /// Lenient decode: entries with a non-numeric key or a non-`true` value
    /// are dropped rather than failing the whole map.
    fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let tabs = object
            .iter()
            .filter(|(_, v)| v.as_bool() == Some(true))
            .filter_map(|(k, _)| k.parse::<TabId>().ok())
            .collect();
        Some(Self { tabs })
    }
}

impl FromIterator<TabId> for TheaterSessions {
    fn from_iter<I: IntoIterator<Item = TabId>>(iter: I) -> Self {
        Self {
            tabs: iter.into_iter().collect(),
        }
    }
}

/// A validated value for one storage key
#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    PersistenceMode(Site, PersistenceMode),
    Toggle(Site, ToggleState),
    TheaterSessions(TheaterSessions),
    TwitterWidth(u8),
    TwitterFontSize(u8),
    TwitterUseDefaultFont(bool),
    TwitterFocusControls(TwitterFocusControls),
}

impl SettingValue {
    pub fn key(&self) -> StorageKey {
        match self {
            SettingValue::PersistenceMode(site, _) => site.mode_key(),
            SettingValue::Toggle(site, _) => site.state_key(),
            SettingValue::TheaterSessions(_) => StorageKey::YoutubeSessions,
            SettingValue::TwitterWidth(_) => StorageKey::TwitterWidth,
            SettingValue::TwitterFontSize(_) => StorageKey::TwitterFontSize,
            SettingValue::TwitterUseDefaultFont(_) => StorageKey::TwitterUseDefaultFont,
            SettingValue::TwitterFocusControls(_) => StorageKey::TwitterFocusControls,
        }
    }

    pub fn default_for(key: StorageKey) -> Self {
        match key {
            StorageKey::YoutubePersistenceMode => {
                SettingValue::PersistenceMode(Site::YouTube, PersistenceMode::default())
            }
            StorageKey::TwitterPersistenceMode => {
                SettingValue::PersistenceMode(Site::Twitter, PersistenceMode::default())
            }
            StorageKey::YoutubeState => SettingValue::Toggle(Site::YouTube, ToggleState::default()),
            StorageKey::TwitterState => SettingValue::Toggle(Site::Twitter, ToggleState::default()),
            StorageKey::YoutubeSessions => SettingValue::TheaterSessions(TheaterSessions::new()),
            StorageKey::TwitterWidth => SettingValue::TwitterWidth(TWITTER_WIDTH_DEFAULT),
            StorageKey::TwitterFontSize => SettingValue::TwitterFontSize(TWITTER_FONT_SIZE_DEFAULT),
            StorageKey::TwitterUseDefaultFont => {
                SettingValue::TwitterUseDefaultFont(TWITTER_USE_DEFAULT_FONT_DEFAULT)
            }
            StorageKey::TwitterFocusControls => {
                SettingValue::TwitterFocusControls(TwitterFocusControls::default())
            }
        }
    }

    /// Decode a raw stored value. Missing or malformed values become the
    /// key's default; out-of-range numbers are clamped.
    pub fn decode(key: StorageKey, raw: Option<&Value>) -> Self {
        let Some(raw) = raw else {
            return Self::default_for(key);
        };

        Self::try_decode(key, raw).unwrap_or_else(|| {
            tracing::debug!(key = %key, value = %raw, "Malformed stored value, using default");
            Self::default_for(key)
        })
    }

    /// Strict variant of [`SettingValue::decode`]: `None` when `raw` has the
    /// wrong shape. Range clamping still applies.
    pub fn try_decode(key: StorageKey, raw: &Value) -> Option<Self> {
        match key {
            StorageKey::YoutubePersistenceMode | StorageKey::TwitterPersistenceMode => {
                serde_json::from_value::<PersistenceMode>(raw.clone())
                    .ok()
                    .map(|mode| SettingValue::PersistenceMode(key.site(), mode))
            }
            StorageKey::YoutubeState | StorageKey::TwitterState => {
                serde_json::from_value::<ToggleState>(raw.clone())
                    .ok()
                    .map(|state| SettingValue::Toggle(key.site(), state))
            }
            StorageKey::YoutubeSessions => {
                TheaterSessions::from_json(raw).map(SettingValue::TheaterSessions)
            }
            StorageKey::TwitterWidth => {
                json_integer(raw).map(|v| SettingValue::TwitterWidth(clamp_twitter_width(v)))
            }
            StorageKey::TwitterFontSize => {
                json_integer(raw).map(|v| SettingValue::TwitterFontSize(clamp_twitter_font_size(v)))
            }
            StorageKey::TwitterUseDefaultFont => {
                raw.as_bool().map(SettingValue::TwitterUseDefaultFont)
            }
            StorageKey::TwitterFocusControls => {
                serde_json::from_value::<TwitterFocusControls>(raw.clone())
                    .ok()
                    .map(|controls| SettingValue::TwitterFocusControls(controls.normalized()))
            }
        }
    }

    /// Apply range clamping and derived-flag rules before persisting
    pub fn normalized(&self) -> Self {
        match self {
            SettingValue::TwitterWidth(w) => SettingValue::TwitterWidth(clamp_twitter_width(i64::from(*w))),
            SettingValue::TwitterFontSize(px) => {
                SettingValue::TwitterFontSize(clamp_twitter_font_size(i64::from(*px)))
            }
            SettingValue::TwitterFocusControls(c) => SettingValue::TwitterFocusControls(c.normalized()),
            other => other.clone(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            SettingValue::PersistenceMode(_, mode) => json!(mode.as_str()),
            SettingValue::Toggle(_, state) => json!({ "enabled": state.enabled }),
            SettingValue::TheaterSessions(sessions) => sessions.to_json(),
            SettingValue::TwitterWidth(w) => json!(w),
            SettingValue::TwitterFontSize(px) => json!(px),
            SettingValue::TwitterUseDefaultFont(b) => json!(b),
            SettingValue::TwitterFocusControls(c) => json!({
                "hideSidebarColumn": c.hide_sidebar_column,
                "hideChatDrawer": c.hide_chat_drawer,
                "hideGrokDrawer": c.hide_grok_drawer,
                "hideHeader": c.hide_header,
                "centerTimeline": c.center_timeline,
            }),
        }
    }
}

fn json_integer(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite())
        .map(|f| f.round().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

/// A committed change to one key, decoded on both sides
#[derive(Debug, Clone, PartialEq)]
pub struct SettingChange {
    pub old_value: SettingValue,
    pub new_value: SettingValue,
}

impl SettingChange {
    pub fn key(&self) -> StorageKey {
        self.new_value.key()
    }

    /// Decode a raw change; `None` for keys this crate does not own
    pub fn from_raw(raw: &RawChange) -> Option<Self> {
        let key = StorageKey::parse(&raw.key)?;
        Some(Self {
            old_value: SettingValue::decode(key, raw.old_value.as_ref()),
            new_value: SettingValue::decode(key, raw.new_value.as_ref()),
        })
    }
}
