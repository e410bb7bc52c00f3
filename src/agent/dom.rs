//! Page DOM seam
//!
//! Page agents and coordinator-injected scripts only touch the host page
//! through [`Document`]. The functions here are the page-side effects
//! shared by both paths: engaging/reverting YouTube theater mode and
//! applying/clearing the Twitter/X layout.

use thiserror::Error;

use crate::store::TwitterSettings;

/// YouTube watch page container (either layout)
pub const PLAYER_SELECTOR: &str = "ytd-watch-flexy, ytd-watch-grid";
/// Attribute present on the player container while in theater mode
pub const THEATER_ATTRIBUTE: &str = "theater";
/// Player button that switches between default and theater size
pub const SIZE_BUTTON_SELECTOR: &str = ".ytp-size-button";
/// Where the YouTube toggle control is mounted
pub const YOUTUBE_CONTROL_ANCHOR: &str = ".ytp-right-controls";
/// Where the Twitter/X toggle control is mounted
pub const TWITTER_CONTROL_ANCHOR: &str = "[aria-label=\"Primary\"]";

pub const TWITTER_WIDTH_PROPERTY: &str = "--twitter-width";
pub const TWITTER_FONT_SIZE_PROPERTY: &str = "--twitter-font-size";
pub const TWITTER_ICON_SCALE_PROPERTY: &str = "--twitter-icon-scale";

pub const HIDE_SIDEBAR_CLASS: &str = "dissatisfied-hide-sidebar";
pub const HIDE_CHAT_CLASS: &str = "dissatisfied-hide-chat";
pub const HIDE_GROK_CLASS: &str = "dissatisfied-hide-grok";
pub const HIDE_HEADER_CLASS: &str = "dissatisfied-hide-header";
pub const CENTER_TIMELINE_CLASS: &str = "dissatisfied-center-timeline";
pub const CUSTOM_FONT_CLASS: &str = "dissatisfied-custom-font";

/// Every class [`apply_twitter_layout`] may add. [`clear_twitter_layout`]
/// removes exactly this set.
pub const TWITTER_LAYOUT_CLASSES: [&str; 6] = [
    HIDE_SIDEBAR_CLASS,
    HIDE_CHAT_CLASS,
    HIDE_GROK_CLASS,
    HIDE_HEADER_CLASS,
    CENTER_TIMELINE_CLASS,
    CUSTOM_FONT_CLASS,
];

/// Every custom property [`apply_twitter_layout`] sets
pub const TWITTER_LAYOUT_PROPERTIES: [&str; 3] = [
    TWITTER_WIDTH_PROPERTY,
    TWITTER_FONT_SIZE_PROPERTY,
    TWITTER_ICON_SCALE_PROPERTY,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Expected host-page anchor is absent. Skippable; retried on the next
    /// mutation or poll.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// The page went away (tab closed, navigated cross-origin)
    #[error("Document unavailable: {0}")]
    Unavailable(String),
}

impl DomError {
    pub fn is_target_not_found(&self) -> bool {
        matches!(self, DomError::TargetNotFound(_))
    }
}

/// The host page as seen from a page script.
///
/// Selectors are the literal strings the host page is queried with; element
/// ids identify nodes this crate inserted.
pub trait Document: Send + Sync {
    fn location(&self) -> String;

    fn has_element(&self, id: &str) -> bool;

    /// Append a `<link rel="stylesheet">` to the head. Returns false if an
    /// element with that id already exists.
    fn insert_stylesheet(&self, id: &str, href: &str) -> bool;

    /// Mount the toggle control inside `anchor`. Returns false if it is
    /// already mounted.
    fn insert_control(&self, id: &str, anchor: &str) -> Result<bool, DomError>;

    fn remove_element(&self, id: &str) -> bool;

    fn has_root_class(&self, class: &str) -> bool;

    fn add_root_class(&self, class: &str);

    fn remove_root_class(&self, class: &str);

    fn root_property(&self, name: &str) -> Option<String>;

    fn set_root_property(&self, name: &str, value: &str);

    fn remove_root_property(&self, name: &str);

    fn query_exists(&self, selector: &str) -> bool;

    /// `None` if nothing matches `selector`
    fn has_attribute(&self, selector: &str, attribute: &str) -> Option<bool>;

    fn click(&self, selector: &str) -> Result<(), DomError>;
}

/// Result of a page-side effect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptOutcome {
    /// Whether the script clicked the page's own control
    pub performed_toggle: bool,
}

impl ScriptOutcome {
    pub fn toggled() -> Self {
        Self {
            performed_toggle: true,
        }
    }

    pub fn unchanged() -> Self {
        Self::default()
    }
}

/// Turn theater mode on unless the page is already in it.
///
/// Only a toggle performed here makes the extension responsible for
/// reverting it later.
pub fn engage_theater(doc: &dyn Document) -> Result<ScriptOutcome, DomError> {
    match doc.has_attribute(PLAYER_SELECTOR, THEATER_ATTRIBUTE) {
        None => Err(DomError::TargetNotFound(PLAYER_SELECTOR.to_string())),
        Some(true) => Ok(ScriptOutcome::unchanged()),
        Some(false) => {
            doc.click(SIZE_BUTTON_SELECTOR)?;
            Ok(ScriptOutcome::toggled())
        }
    }
}

/// Turn theater mode off if it is still on
pub fn revert_theater(doc: &dyn Document) -> Result<ScriptOutcome, DomError> {
    match doc.has_attribute(PLAYER_SELECTOR, THEATER_ATTRIBUTE) {
        None => Err(DomError::TargetNotFound(PLAYER_SELECTOR.to_string())),
        Some(false) => Ok(ScriptOutcome::unchanged()),
        Some(true) => {
            doc.click(SIZE_BUTTON_SELECTOR)?;
            Ok(ScriptOutcome::toggled())
        }
    }
}

fn set_class(doc: &dyn Document, class: &str, on: bool) {
    if on {
        doc.add_root_class(class);
    } else {
        doc.remove_root_class(class);
    }
}

/// Apply width, font and focus flags to the root element.
///
/// Safe to call repeatedly; flags that turned off since the last call are
/// removed.
pub fn apply_twitter_layout(doc: &dyn Document, settings: &TwitterSettings) {
    let controls = settings.controls.normalized();

    doc.set_root_property(TWITTER_WIDTH_PROPERTY, &format!("{}%", settings.width));
    doc.set_root_property(
        TWITTER_FONT_SIZE_PROPERTY,
        &format!("{}px", settings.font_size),
    );
    doc.set_root_property(
        TWITTER_ICON_SCALE_PROPERTY,
        &format!("{:.3}", settings.icon_scale()),
    );

    set_class(doc, HIDE_SIDEBAR_CLASS, controls.hide_sidebar_column);
    set_class(doc, HIDE_CHAT_CLASS, controls.hide_chat_drawer);
    set_class(doc, HIDE_GROK_CLASS, controls.hide_grok_drawer);
    set_class(doc, HIDE_HEADER_CLASS, controls.hide_header);
    set_class(doc, CENTER_TIMELINE_CLASS, controls.center_timeline);
    set_class(doc, CUSTOM_FONT_CLASS, !settings.use_default_font);
}

pub fn clear_twitter_layout(doc: &dyn Document) {
    for class in TWITTER_LAYOUT_CLASSES {
        doc.remove_root_class(class);
    }
    for property in TWITTER_LAYOUT_PROPERTIES {
        doc.remove_root_property(property);
    }
}

/// A self-contained script the coordinator can run in a tab that has no
/// page agent listening.
#[derive(Debug, Clone, PartialEq)]
pub enum PageScript {
    EngageTheater,
    RevertTheater,
    ApplyTwitterLayout(TwitterSettings),
    ClearTwitterLayout,
}

impl PageScript {
    pub fn run(&self, doc: &dyn Document) -> Result<ScriptOutcome, DomError> {
        match self {
            PageScript::EngageTheater => engage_theater(doc),
            PageScript::RevertTheater => revert_theater(doc),
            PageScript::ApplyTwitterLayout(settings) => {
                apply_twitter_layout(doc, settings);
                Ok(ScriptOutcome::unchanged())
            }
            PageScript::ClearTwitterLayout => {
                clear_twitter_layout(doc);
                Ok(ScriptOutcome::unchanged())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MemoryDocument;
    use crate::store::TwitterFocusControls;

    #[test]
    fn test_engage_theater_clicks_once() {
        let doc = MemoryDocument::youtube_watch("https://www.youtube.com/watch?v=abc");
        let outcome = engage_theater(&doc).unwrap();
        assert!(outcome.performed_toggle);
        assert_eq!(doc.player_theater(), Some(true));

        let again = engage_theater(&doc).unwrap();
        assert!(!again.performed_toggle);
        assert_eq!(doc.click_count(), 1);
    }

    #[test]
    fn test_engage_theater_respects_user_theater() {
        let doc = MemoryDocument::youtube_watch("https://www.youtube.com/watch?v=abc")
            .with_theater(true);
        let outcome = engage_theater(&doc).unwrap();
        assert_eq!(outcome, ScriptOutcome::unchanged());
        assert_eq!(doc.click_count(), 0);
    }

    #[test]
    fn test_theater_without_player() {
        let doc = MemoryDocument::new("https://www.youtube.com/");
        assert_eq!(
            engage_theater(&doc),
            Err(DomError::TargetNotFound(PLAYER_SELECTOR.to_string()))
        );
        assert!(revert_theater(&doc).unwrap_err().is_target_not_found());
    }

    #[test]
    fn test_revert_theater_only_when_on() {
        let doc = MemoryDocument::youtube_watch("https://www.youtube.com/watch?v=abc");
        assert!(!revert_theater(&doc).unwrap().performed_toggle);

        engage_theater(&doc).unwrap();
        assert!(revert_theater(&doc).unwrap().performed_toggle);
        assert_eq!(doc.player_theater(), Some(false));
    }

    #[test]
    fn test_center_timeline_forces_hide_header() {
        let doc = MemoryDocument::twitter("https://x.com/home");
        let settings = TwitterSettings {
            controls: TwitterFocusControls {
                hide_header: false,
                center_timeline: true,
                ..TwitterFocusControls::default()
            },
            ..TwitterSettings::default()
        };
        apply_twitter_layout(&doc, &settings);
        assert!(doc.has_root_class(HIDE_HEADER_CLASS));

        let settings = TwitterSettings {
            controls: TwitterFocusControls {
                hide_header: true,
                center_timeline: false,
                ..TwitterFocusControls::default()
            },
            ..TwitterSettings::default()
        };
        apply_twitter_layout(&doc, &settings);
        assert!(!doc.has_root_class(HIDE_HEADER_CLASS));
        assert!(!doc.has_root_class(CENTER_TIMELINE_CLASS));
    }

    #[test]
    fn test_twitter_layout_properties() {
        let doc = MemoryDocument::twitter("https://x.com/home");
        let settings = TwitterSettings {
            width: 60,
            font_size: 18,
            use_default_font: false,
            ..TwitterSettings::default()
        };
        apply_twitter_layout(&doc, &settings);
        assert_eq!(doc.root_property(TWITTER_WIDTH_PROPERTY).as_deref(), Some("60%"));
        assert_eq!(
            doc.root_property(TWITTER_FONT_SIZE_PROPERTY).as_deref(),
            Some("18px")
        );
        assert_eq!(
            doc.root_property(TWITTER_ICON_SCALE_PROPERTY).as_deref(),
            Some("1.200")
        );
        assert!(doc.has_root_class(CUSTOM_FONT_CLASS));
    }

    #[test]
    fn test_clear_is_exact_inverse_of_apply() {
        let doc = MemoryDocument::twitter("https://x.com/home");
        doc.add_root_class("host-owned");
        let before = doc.root_snapshot();

        apply_twitter_layout(
            &doc,
            &TwitterSettings {
                use_default_font: false,
                ..TwitterSettings::default()
            },
        );
        clear_twitter_layout(&doc);

        assert_eq!(doc.root_snapshot(), before);
        assert!(doc.has_root_class("host-owned"));
    }

    #[test]
    fn test_page_script_dispatch() {
        let doc = MemoryDocument::youtube_watch("https://www.youtube.com/watch?v=abc");
        assert!(PageScript::EngageTheater.run(&doc).unwrap().performed_toggle);
        assert!(PageScript::RevertTheater.run(&doc).unwrap().performed_toggle);
        assert_eq!(doc.click_count(), 2);
    }
}
