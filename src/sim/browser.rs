//! In-memory browser host

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::agent::dom::{Document, PageScript, ScriptOutcome};
use crate::agent::PageContext;
use crate::coordinator::{Browser, BrowserError, TabInfo};
use crate::messaging::{AgentMessage, AgentResponse, MessageError};
use crate::store::TabId;

use super::document::MemoryDocument;

struct SimTab {
    document: Arc<MemoryDocument>,
    page: Option<Arc<PageContext>>,
    badge: Option<String>,
    /// Refuse CSS and script injection, like a restricted page
    fail_injection: bool,
}

#[derive(Default)]
struct BrowserState {
    tabs: BTreeMap<TabId, SimTab>,
    active: Option<TabId>,
    next_id: i64,
    default_badge: String,
    options_opened: usize,
}

/// Tabs, badges and injection for a single simulated window
#[derive(Default)]
pub struct SimBrowser {
    state: Mutex<BrowserState>,
}

impl SimBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a tab showing `document` and focus it
    pub fn add_tab(&self, document: Arc<MemoryDocument>) -> TabId {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = TabId(state.next_id);
        state.tabs.insert(
            id,
            SimTab {
                document,
                page: None,
                badge: None,
                fail_injection: false,
            },
        );
        state.active = Some(id);
        id
    }

    /// Full page load: a fresh document and no page agent
    pub fn replace_document(&self, tab: TabId, document: Arc<MemoryDocument>) -> bool {
        match self.state.lock().tabs.get_mut(&tab) {
            Some(t) => {
                t.document = document;
                t.page = None;
                true
            }
            None => false,
        }
    }

    pub fn close_tab(&self, tab: TabId) -> Option<Arc<MemoryDocument>> {
        let mut state = self.state.lock();
        if state.active == Some(tab) {
            state.active = None;
        }
        state.tabs.remove(&tab).map(|t| t.document)
    }

    pub fn activate(&self, tab: TabId) -> bool {
        let mut state = self.state.lock();
        if state.tabs.contains_key(&tab) {
            state.active = Some(tab);
            true
        } else {
            false
        }
    }

    pub fn attach_page(&self, tab: TabId, page: Arc<PageContext>) {
        if let Some(t) = self.state.lock().tabs.get_mut(&tab) {
            t.page = Some(page);
        }
    }

    /// Drop the page agent, as if it never loaded
    pub fn detach_page(&self, tab: TabId) -> Option<Arc<PageContext>> {
        self.state
            .lock()
            .tabs
            .get_mut(&tab)
            .and_then(|t| t.page.take())
    }

    pub fn page(&self, tab: TabId) -> Option<Arc<PageContext>> {
        self.state
            .lock()
            .tabs
            .get(&tab)
            .and_then(|t| t.page.clone())
    }

    pub fn pages(&self) -> Vec<Arc<PageContext>> {
        self.state
            .lock()
            .tabs
            .values()
            .filter_map(|t| t.page.clone())
            .collect()
    }

    pub fn document(&self, tab: TabId) -> Option<Arc<MemoryDocument>> {
        self.state
            .lock()
            .tabs
            .get(&tab)
            .map(|t| Arc::clone(&t.document))
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.state.lock().tabs.keys().copied().collect()
    }

    pub fn fail_injection(&self, tab: TabId, fail: bool) {
        if let Some(t) = self.state.lock().tabs.get_mut(&tab) {
            t.fail_injection = fail;
        }
    }

    /// Badge text shown on `tab`, falling back to the default text
    pub fn badge(&self, tab: TabId) -> String {
        let state = self.state.lock();
        state
            .tabs
            .get(&tab)
            .and_then(|t| t.badge.clone())
            .unwrap_or_else(|| state.default_badge.clone())
    }

    pub fn default_badge(&self) -> String {
        self.state.lock().default_badge.clone()
    }

    pub fn options_opened(&self) -> usize {
        self.state.lock().options_opened
    }

    fn info(id: TabId, tab: &SimTab, active: Option<TabId>) -> TabInfo {
        TabInfo {
            id,
            url: tab.document.location(),
            active: active == Some(id),
        }
    }

    fn injectable(&self, tab: TabId) -> Result<Arc<MemoryDocument>, BrowserError> {
        let state = self.state.lock();
        let t = state.tabs.get(&tab).ok_or(BrowserError::TabNotFound(tab))?;
        if t.fail_injection {
            return Err(BrowserError::Injection(format!(
                "Cannot access contents of tab {}",
                tab
            )));
        }
        Ok(Arc::clone(&t.document))
    }
}

#[async_trait]
impl Browser for SimBrowser {
    async fn active_tab(&self) -> Option<TabInfo> {
        let state = self.state.lock();
        let id = state.active?;
        state
            .tabs
            .get(&id)
            .map(|t| Self::info(id, t, state.active))
    }

    async fn tab(&self, id: TabId) -> Option<TabInfo> {
        let state = self.state.lock();
        state
            .tabs
            .get(&id)
            .map(|t| Self::info(id, t, state.active))
    }

    async fn tabs(&self) -> Vec<TabInfo> {
        let state = self.state.lock();
        state
            .tabs
            .iter()
            .map(|(id, t)| Self::info(*id, t, state.active))
            .collect()
    }

    async fn set_badge_text(&self, tab: Option<TabId>, text: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        match tab {
            Some(id) => {
                let t = state.tabs.get_mut(&id).ok_or(BrowserError::TabNotFound(id))?;
                t.badge = Some(text.to_string());
            }
            None => state.default_badge = text.to_string(),
        }
        Ok(())
    }

    async fn open_options_page(&self) -> Result<(), BrowserError> {
        self.state.lock().options_opened += 1;
        Ok(())
    }

    async fn send_message(
        &self,
        tab: TabId,
        message: AgentMessage,
    ) -> Result<AgentResponse, MessageError> {
        let page = self.page(tab).ok_or(MessageError::NoListener)?;
        page.on_message(message).await
    }

    async fn insert_css(&self, tab: TabId, path: &str) -> Result<(), BrowserError> {
        self.injectable(tab)?.inject_css(path);
        Ok(())
    }

    async fn remove_css(&self, tab: TabId, path: &str) -> Result<(), BrowserError> {
        self.injectable(tab)?.remove_css(path);
        Ok(())
    }

    async fn execute_script(
        &self,
        tab: TabId,
        script: PageScript,
    ) -> Result<ScriptOutcome, BrowserError> {
        let document = self.injectable(tab)?;
        Ok(script.run(document.as_ref())?)
    }
}
