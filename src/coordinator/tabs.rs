//! Transient per-tab enable state (tab persistence mode only)

use std::collections::HashMap;

use crate::site::Site;
use crate::store::TabId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TabState {
    pub youtube: bool,
    pub twitter: bool,
}

impl TabState {
    pub fn get(&self, site: Site) -> bool {
        match site {
            Site::YouTube => self.youtube,
            Site::Twitter => self.twitter,
        }
    }

    pub fn set(&mut self, site: Site, enabled: bool) {
        match site {
            Site::YouTube => self.youtube = enabled,
            Site::Twitter => self.twitter = enabled,
        }
    }

    fn is_empty(&self) -> bool {
        !self.youtube && !self.twitter
    }
}

/// Lost on tab close and coordinator restart
#[derive(Debug, Default)]
pub struct TabStates {
    tabs: HashMap<TabId, TabState>,
}

impl TabStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tab: TabId) -> TabState {
        self.tabs.get(&tab).copied().unwrap_or_default()
    }

    pub fn enabled(&self, tab: TabId, site: Site) -> bool {
        self.get(tab).get(site)
    }

    /// Created on first reference
    pub fn set(&mut self, tab: TabId, site: Site, enabled: bool) {
        self.tabs.entry(tab).or_default().set(site, enabled);
    }

    pub fn remove(&mut self, tab: TabId) -> Option<TabState> {
        self.tabs.remove(&tab)
    }

    /// Forget `site` in every tab, when it leaves tab mode
    pub fn clear_site(&mut self, site: Site) {
        for state in self.tabs.values_mut() {
            state.set(site, false);
        }
        self.tabs.retain(|_, state| !state.is_empty());
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }
}
