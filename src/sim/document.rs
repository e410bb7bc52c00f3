//! In-memory host page

use std::collections::{BTreeMap, BTreeSet};

use parking_lot::Mutex;

use crate::agent::dom::{
    DomError, Document, PLAYER_SELECTOR, SIZE_BUTTON_SELECTOR, THEATER_ATTRIBUTE,
    TWITTER_CONTROL_ANCHOR, YOUTUBE_CONTROL_ANCHOR,
};
use crate::site::{classify_site, host_of, site_for_host, Site};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKind {
    Stylesheet { href: String },
    Control { anchor: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub id: String,
    pub kind: ElementKind,
}

/// Root element classes and inline custom properties
pub type RootSnapshot = (BTreeSet<String>, BTreeMap<String, String>);

#[derive(Debug, Default)]
struct PageState {
    location: String,
    elements: Vec<Element>,
    root_classes: BTreeSet<String>,
    root_properties: BTreeMap<String, String>,
    /// Host-page selectors that currently match something
    anchors: BTreeSet<String>,
    /// `Some(theater)` while the player container is rendered
    player: Option<bool>,
    /// Stylesheets injected by the coordinator (not DOM elements)
    injected_css: BTreeSet<String>,
    clicks: usize,
}

/// A scriptable stand-in for a YouTube or Twitter/X page.
///
/// Clicking the size button flips the player's theater attribute, like the
/// real player does.
#[derive(Debug, Default)]
pub struct MemoryDocument {
    state: Mutex<PageState>,
}

impl MemoryDocument {
    /// A page with nothing but a location
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            state: Mutex::new(PageState {
                location: url,
                ..PageState::default()
            }),
        }
    }

    /// A YouTube watch page with a rendered player in default size
    pub fn youtube_watch(url: impl Into<String>) -> Self {
        let doc = Self::new(url);
        {
            let mut state = doc.state.lock();
            state.player = Some(false);
            state.anchors.insert(YOUTUBE_CONTROL_ANCHOR.to_string());
        }
        doc
    }

    /// A Twitter/X page with its primary navigation rendered
    pub fn twitter(url: impl Into<String>) -> Self {
        let doc = Self::new(url);
        doc.state
            .lock()
            .anchors
            .insert(TWITTER_CONTROL_ANCHOR.to_string());
        doc
    }

    /// Build the page a real browser would show for `url`
    pub fn for_url(url: &str) -> Self {
        match classify_site(url) {
            Some(Site::YouTube) => Self::youtube_watch(url),
            Some(Site::Twitter) => Self::twitter(url),
            None => match host_of(url).as_deref().and_then(site_for_host) {
                Some(Site::Twitter) => Self::twitter(url),
                _ => Self::new(url),
            },
        }
    }

    pub fn with_theater(self, theater: bool) -> Self {
        self.set_player(Some(theater));
        self
    }

    /// Render (`Some`) or tear down (`None`) the player container
    pub fn set_player(&self, theater: Option<bool>) {
        let mut state = self.state.lock();
        state.player = theater;
        if theater.is_some() {
            state.anchors.insert(YOUTUBE_CONTROL_ANCHOR.to_string());
        } else {
            state.anchors.remove(YOUTUBE_CONTROL_ANCHOR);
        }
    }

    pub fn player_theater(&self) -> Option<bool> {
        self.state.lock().player
    }

    /// User clicks the size button themselves
    pub fn user_toggle_theater(&self) {
        let mut state = self.state.lock();
        if let Some(theater) = state.player {
            state.player = Some(!theater);
        }
    }

    /// Clicks performed through [`Document::click`]
    pub fn click_count(&self) -> usize {
        self.state.lock().clicks
    }

    /// SPA route change: the location moves, the DOM stays
    pub fn navigate(&self, url: impl Into<String>) {
        self.state.lock().location = url.into();
    }

    /// Host page re-render drops one of our nodes
    pub fn strip_element(&self, id: &str) {
        self.state.lock().elements.retain(|el| el.id != id);
    }

    pub fn add_anchor(&self, selector: &str) {
        self.state.lock().anchors.insert(selector.to_string());
    }

    pub fn count_elements(&self, id: &str) -> usize {
        self.state
            .lock()
            .elements
            .iter()
            .filter(|el| el.id == id)
            .count()
    }

    pub fn elements(&self) -> Vec<Element> {
        self.state.lock().elements.clone()
    }

    pub fn root_snapshot(&self) -> RootSnapshot {
        let state = self.state.lock();
        (state.root_classes.clone(), state.root_properties.clone())
    }

    pub fn inject_css(&self, path: &str) {
        self.state.lock().injected_css.insert(path.to_string());
    }

    pub fn remove_css(&self, path: &str) {
        self.state.lock().injected_css.remove(path);
    }

    pub fn has_injected_css(&self, path: &str) -> bool {
        self.state.lock().injected_css.contains(path)
    }

    /// Whether the site's stylesheet is in effect by either path
    pub fn has_site_styles(&self, site: Site, css_path: &str) -> bool {
        self.has_element(site.stylesheet_id()) || self.has_injected_css(css_path)
    }
}

impl Document for MemoryDocument {
    fn location(&self) -> String {
        self.state.lock().location.clone()
    }

    fn has_element(&self, id: &str) -> bool {
        self.state.lock().elements.iter().any(|el| el.id == id)
    }

    fn insert_stylesheet(&self, id: &str, href: &str) -> bool {
        let mut state = self.state.lock();
        if state.elements.iter().any(|el| el.id == id) {
            return false;
        }
        state.elements.push(Element {
            id: id.to_string(),
            kind: ElementKind::Stylesheet {
                href: href.to_string(),
            },
        });
        true
    }

    fn insert_control(&self, id: &str, anchor: &str) -> Result<bool, DomError> {
        let mut state = self.state.lock();
        if !state.anchors.contains(anchor) {
            return Err(DomError::TargetNotFound(anchor.to_string()));
        }
        if state.elements.iter().any(|el| el.id == id) {
            return Ok(false);
        }
        state.elements.push(Element {
            id: id.to_string(),
            kind: ElementKind::Control {
                anchor: anchor.to_string(),
            },
        });
        Ok(true)
    }

    fn remove_element(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.elements.len();
        state.elements.retain(|el| el.id != id);
        state.elements.len() != before
    }

    fn has_root_class(&self, class: &str) -> bool {
        self.state.lock().root_classes.contains(class)
    }

    fn add_root_class(&self, class: &str) {
        self.state.lock().root_classes.insert(class.to_string());
    }

    fn remove_root_class(&self, class: &str) {
        self.state.lock().root_classes.remove(class);
    }

    fn root_property(&self, name: &str) -> Option<String> {
        self.state.lock().root_properties.get(name).cloned()
    }

    fn set_root_property(&self, name: &str, value: &str) {
        self.state
            .lock()
            .root_properties
            .insert(name.to_string(), value.to_string());
    }

    fn remove_root_property(&self, name: &str) {
        self.state.lock().root_properties.remove(name);
    }

    fn query_exists(&self, selector: &str) -> bool {
        let state = self.state.lock();
        match selector {
            PLAYER_SELECTOR | SIZE_BUTTON_SELECTOR => state.player.is_some(),
            other => state.anchors.contains(other),
        }
    }

    fn has_attribute(&self, selector: &str, attribute: &str) -> Option<bool> {
        let state = self.state.lock();
        match (selector, attribute) {
            (PLAYER_SELECTOR, THEATER_ATTRIBUTE) => state.player,
            (PLAYER_SELECTOR, _) => state.player.map(|_| false),
            _ => None,
        }
    }

    fn click(&self, selector: &str) -> Result<(), DomError> {
        let mut state = self.state.lock();
        match (selector, state.player) {
            (SIZE_BUTTON_SELECTOR, Some(theater)) => {
                state.player = Some(!theater);
                state.clicks += 1;
                Ok(())
            }
            _ => Err(DomError::TargetNotFound(selector.to_string())),
        }
    }
}
