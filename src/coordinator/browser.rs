//! Browser host seam used by the coordinator

use async_trait::async_trait;
use thiserror::Error;

use crate::agent::dom::{DomError, PageScript, ScriptOutcome};
use crate::messaging::{AgentMessage, AgentResponse, MessageError};
use crate::store::TabId;

pub const BADGE_ON: &str = "ON";
pub const BADGE_OFF: &str = "OFF";
/// Shown on pages the extension does not act on
pub const BADGE_NONE: &str = "";

pub fn badge_text(enabled: bool) -> &'static str {
    if enabled {
        BADGE_ON
    } else {
        BADGE_OFF
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Install,
    Update,
    BrowserUpdate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabStatus {
    Loading,
    Complete,
}

#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Tab {0} not found")]
    TabNotFound(TabId),

    #[error("Script failed: {0}")]
    Script(#[from] DomError),

    #[error("Injection failed: {0}")]
    Injection(String),
}

/// Tabs, badge, messaging and injection as exposed to the extension's
/// background context
#[async_trait]
pub trait Browser: Send + Sync {
    /// Active tab of the focused window
    async fn active_tab(&self) -> Option<TabInfo>;

    async fn tab(&self, id: TabId) -> Option<TabInfo>;

    async fn tabs(&self) -> Vec<TabInfo>;

    /// `None` sets the default text for every tab
    async fn set_badge_text(&self, tab: Option<TabId>, text: &str) -> Result<(), BrowserError>;

    async fn open_options_page(&self) -> Result<(), BrowserError>;

    /// Deliver to the tab's page agent. [`MessageError::NoListener`] when
    /// no agent is loaded there.
    async fn send_message(
        &self,
        tab: TabId,
        message: AgentMessage,
    ) -> Result<AgentResponse, MessageError>;

    async fn insert_css(&self, tab: TabId, path: &str) -> Result<(), BrowserError>;

    async fn remove_css(&self, tab: TabId, path: &str) -> Result<(), BrowserError>;

    async fn execute_script(
        &self,
        tab: TabId,
        script: PageScript,
    ) -> Result<ScriptOutcome, BrowserError>;
}
