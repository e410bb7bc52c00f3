//! Page agents
//!
//! One agent per supported site runs inside each matching page. It owns
//! the page-side effects of focus mode and exposes a small contract the
//! [`PageContext`] drives from storage changes, broadcasts, coordinator
//! messages, navigation and keyboard shortcuts.

pub mod dom;
pub mod navigation;
pub mod runtime;
pub mod shortcut;
pub mod twitter;
pub mod youtube;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::site::Site;
use crate::store::{SettingChange, SettingsStore, StoreError, TabId};

pub use dom::{DomError, Document, PageScript, ScriptOutcome};
pub use navigation::{Navigation, NavigationWatcher};
pub use runtime::{CoordinatorLink, PageContext};
pub use shortcut::KeyDisposition;
pub use twitter::TwitterAgent;
pub use youtube::YouTubeAgent;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl AgentError {
    pub fn is_context_invalidated(&self) -> bool {
        match self {
            AgentError::Store(e) => e.is_context_invalidated(),
        }
    }
}

/// Site-specific focus-mode effects on one page.
///
/// `is_active` reads the root marker class, so it reflects the page as it
/// is rather than what the store last said. Callers re-check it at the
/// point of use.
#[async_trait]
pub trait PageAgent: Send + Sync {
    fn site(&self) -> Site;

    /// Apply styles and side effects. Idempotent.
    async fn activate(&self) -> Result<(), AgentError>;

    /// Remove exactly what `activate` added
    async fn deactivate(&self);

    async fn toggle(&self) -> Result<(), AgentError> {
        if self.is_active() {
            self.deactivate().await;
            Ok(())
        } else {
            self.activate().await
        }
    }

    fn is_active(&self) -> bool;

    /// Mount the toggle control unless it is already there. Returns
    /// whether a node was inserted.
    fn ensure_control(&self) -> Result<bool, DomError>;

    /// React to a non-toggle setting change (layout, widths)
    async fn on_setting_changed(&self, _change: &SettingChange) -> Result<(), AgentError> {
        Ok(())
    }

    /// Wait for delayed work started by `activate`
    async fn settle(&self) {}
}

/// Build the agent for `site` on one page
pub fn agent_for_site(
    site: Site,
    tab: TabId,
    document: Arc<dyn Document>,
    store: SettingsStore,
    config: &Config,
) -> Arc<dyn PageAgent> {
    let href = config.styles.href_for(site);
    match site {
        Site::YouTube => Arc::new(YouTubeAgent::new(
            tab,
            document,
            store,
            href,
            config.theater,
        )),
        Site::Twitter => Arc::new(TwitterAgent::new(document, store, href)),
    }
}
