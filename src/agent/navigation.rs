//! SPA navigation detection
//!
//! Neither site reloads the page when routing, and there is no dedicated
//! navigation event to rely on. The host's DOM mutation notifications are
//! used as a clock: on each one the current location is compared with the
//! last one seen.

/// A route change observed between two mutation notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct NavigationWatcher {
    last_location: String,
}

impl NavigationWatcher {
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            last_location: location.into(),
        }
    }

    /// Feed the location at a mutation notification
    pub fn observe(&mut self, location: &str) -> Option<Navigation> {
        if location == self.last_location {
            return None;
        }
        let from = std::mem::replace(&mut self.last_location, location.to_string());
        Some(Navigation {
            from,
            to: location.to_string(),
        })
    }

    pub fn last_location(&self) -> &str {
        &self.last_location
    }
}
