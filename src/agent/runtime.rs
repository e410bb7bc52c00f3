//! Page context runtime
//!
//! [`PageContext`] hosts one [`PageAgent`] inside one page and turns every
//! inbound signal into agent calls: storage changes, sibling-tab
//! broadcasts, coordinator messages, DOM mutation notifications and
//! key-downs. Each handler re-reads `is_active()` when it runs instead of
//! trusting state captured earlier, since nothing orders two independently
//! triggered handlers.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::broadcast::{BroadcastChannel, BroadcastHub, BroadcastPoster};
use crate::config::{Config, KeyEvent, ShortcutConfig};
use crate::context::ExtensionContext;
use crate::messaging::{
    AgentMessage, AgentResponse, BroadcastAction, BroadcastMessage, CoordinatorRequest,
    MessageError,
};
use crate::site::{host_of, site_for_host, Site};
use crate::store::{
    PersistenceMode, SettingChange, SettingValue, SettingsStore, SettingsSubscription, TabId,
    ToggleState,
};

use super::dom::Document;
use super::navigation::NavigationWatcher;
use super::shortcut::{classify_key, KeyDisposition};
use super::{agent_for_site, AgentError, PageAgent};

/// Page → coordinator request path
#[async_trait]
pub trait CoordinatorLink: Send + Sync {
    async fn request_toggle(
        &self,
        tab: TabId,
        request: CoordinatorRequest,
    ) -> Result<(), MessageError>;
}

enum Inbound {
    Setting(SettingChange),
    Broadcast(BroadcastMessage),
}

struct Inbox {
    settings: SettingsSubscription,
    broadcasts: BroadcastChannel,
}

pub struct PageContext {
    tab: TabId,
    site: Site,
    agent: Arc<dyn PageAgent>,
    document: Arc<dyn Document>,
    store: SettingsStore,
    shortcuts: ShortcutConfig,
    link: Arc<dyn CoordinatorLink>,
    broadcast: BroadcastPoster,
    navigation: Mutex<NavigationWatcher>,
    inbox: tokio::sync::Mutex<Inbox>,
}

fn log_agent_error(tab: TabId, site: Site, what: &str, error: &AgentError) {
    if error.is_context_invalidated() {
        tracing::debug!(tab = %tab, site = %site, "{}: context invalidated", what);
    } else {
        tracing::warn!(tab = %tab, site = %site, error = %error, "{} failed", what);
    }
}

impl PageContext {
    /// Attach to a page. `None` when the page's host is not a supported
    /// site, matching where the page script would be injected.
    pub fn new(
        tab: TabId,
        document: Arc<dyn Document>,
        store: SettingsStore,
        hub: &BroadcastHub,
        link: Arc<dyn CoordinatorLink>,
        config: &Config,
    ) -> Option<Self> {
        let location = document.location();
        let site = host_of(&location).as_deref().and_then(site_for_host)?;

        let agent = agent_for_site(site, tab, Arc::clone(&document), store.clone(), config);
        let broadcasts = hub.open(site, store.context().id());
        let broadcast = broadcasts.poster();
        let navigation = NavigationWatcher::new(location);
        let inbox = Inbox {
            settings: store.subscribe(),
            broadcasts,
        };

        Some(Self {
            tab,
            site,
            agent,
            document,
            store,
            shortcuts: config.shortcuts.clone(),
            link,
            broadcast,
            navigation: Mutex::new(navigation),
            inbox: tokio::sync::Mutex::new(inbox),
        })
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn site(&self) -> Site {
        self.site
    }

    pub fn agent(&self) -> &Arc<dyn PageAgent> {
        &self.agent
    }

    pub fn context(&self) -> &ExtensionContext {
        self.store.context()
    }

    /// Whether the page is (still) on this context's site
    fn on_site(&self) -> bool {
        host_of(&self.document.location())
            .as_deref()
            .and_then(site_for_host)
            == Some(self.site)
    }

    /// Page load: apply the persisted state
    pub async fn initialize(&self) {
        if let Err(e) = self.check_initial_state().await {
            log_agent_error(self.tab, self.site, "Initial state check", &e);
        }
    }

    /// Converge to the stored toggle state in global mode. In tab mode the
    /// coordinator decides and reapplies on navigation.
    pub async fn check_initial_state(&self) -> Result<(), AgentError> {
        if !self.on_site() {
            return Ok(());
        }
        if self.store.persistence_mode(self.site).await? == PersistenceMode::Global {
            let state = self.store.toggle_state(self.site).await?;
            self.converge(state.enabled).await?;
        }
        Ok(())
    }

    async fn converge(&self, enabled: bool) -> Result<(), AgentError> {
        match (enabled, self.agent.is_active()) {
            (true, false) => self.agent.activate().await,
            (false, true) => {
                self.agent.deactivate().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    pub async fn on_setting_changed(&self, change: &SettingChange) {
        if let Err(e) = self.apply_setting_change(change).await {
            log_agent_error(self.tab, self.site, "Settings change", &e);
        }
    }

    async fn apply_setting_change(&self, change: &SettingChange) -> Result<(), AgentError> {
        if !self.on_site() {
            return Ok(());
        }
        match &change.new_value {
            SettingValue::Toggle(site, state) if *site == self.site => {
                if self.store.persistence_mode(self.site).await? == PersistenceMode::Global {
                    self.converge(state.enabled).await?;
                }
            }
            SettingValue::PersistenceMode(site, PersistenceMode::Global) if *site == self.site => {
                self.check_initial_state().await?;
            }
            SettingValue::Toggle(..) | SettingValue::PersistenceMode(..) => {}
            _ => self.agent.on_setting_changed(change).await?,
        }
        Ok(())
    }

    pub async fn on_broadcast(&self, message: BroadcastMessage) {
        if !self.context().is_valid() || !self.on_site() {
            return;
        }
        let enabled = message.action == BroadcastAction::Enable;
        if let Err(e) = self.converge(enabled).await {
            log_agent_error(self.tab, self.site, "Broadcast", &e);
        }
    }

    /// Coordinator message handler
    pub async fn on_message(&self, message: AgentMessage) -> Result<AgentResponse, MessageError> {
        if !self.context().is_valid() {
            return Err(MessageError::ContextInvalidated);
        }
        if message.action.site() != self.site || !self.on_site() {
            return Err(MessageError::NoListener);
        }

        if !message.action.enables() {
            self.agent.deactivate().await;
            return Ok(AgentResponse::ok());
        }
        match self.agent.activate().await {
            Ok(()) => Ok(AgentResponse::ok()),
            Err(e) if e.is_context_invalidated() => Err(MessageError::ContextInvalidated),
            Err(e) => {
                tracing::warn!(tab = %self.tab, site = %self.site, error = %e, "Activation failed");
                Ok(AgentResponse::failed())
            }
        }
    }

    /// DOM mutation notification: detect SPA navigation and restore the
    /// toggle control if the host re-render dropped it.
    pub async fn on_mutation(&self) {
        if !self.context().is_valid() {
            return;
        }

        let navigation = {
            let mut watcher = self.navigation.lock();
            watcher.observe(&self.document.location())
        };
        if let Some(nav) = navigation {
            tracing::debug!(tab = %self.tab, from = %nav.from, to = %nav.to, "Page navigated");
            self.initialize().await;
        }

        if self.agent.is_active() {
            match self.agent.ensure_control() {
                Ok(true) => tracing::debug!(tab = %self.tab, "Re-inserted toggle control"),
                Ok(false) => {}
                Err(e) => tracing::debug!(tab = %self.tab, error = %e, "Toggle control anchor missing"),
            }
        }
    }

    /// Capturing key-down listener. A matched chord is consumed even if the
    /// toggle that follows fails.
    pub async fn on_key_down(&self, event: &KeyEvent) -> KeyDisposition {
        let disposition = classify_key(&self.shortcuts, self.site, event);
        if disposition.prevents_default() {
            self.request_toggle().await;
        }
        disposition
    }

    /// The injected toggle control was clicked
    pub async fn on_control_clicked(&self) {
        self.request_toggle().await;
    }

    /// Ask the coordinator to toggle this tab, toggling locally if it
    /// cannot be reached.
    async fn request_toggle(&self) {
        let request = CoordinatorRequest {
            action: self.site.toggle_command(),
        };
        let result = if self.context().is_valid() {
            self.link.request_toggle(self.tab, request).await
        } else {
            Err(MessageError::ContextInvalidated)
        };
        if let Err(e) = result {
            tracing::debug!(tab = %self.tab, error = %e, "Coordinator unavailable, toggling locally");
            self.toggle_locally().await;
        }
    }

    pub async fn toggle_locally(&self) {
        if let Err(e) = self.try_toggle_locally().await {
            log_agent_error(self.tab, self.site, "Local toggle", &e);
        }
    }

    async fn try_toggle_locally(&self) -> Result<(), AgentError> {
        let mode = self.store.persistence_mode(self.site).await?;
        let enable = !self.agent.is_active();
        if mode == PersistenceMode::Global {
            self.store
                .set_toggle_state(self.site, ToggleState::new(enable))
                .await?;
            self.converge(enable).await?;
            self.broadcast.post(BroadcastAction::from_enabled(enable));
        } else {
            self.converge(enable).await?;
        }
        Ok(())
    }

    async fn dispatch(&self, inbound: Inbound) {
        match inbound {
            Inbound::Setting(change) => self.on_setting_changed(&change).await,
            Inbound::Broadcast(message) => self.on_broadcast(message).await,
        }
    }

    /// Handle everything already queued without waiting. Returns the
    /// number of events handled.
    pub async fn drain(&self) -> usize {
        let pending = {
            let mut inbox = self.inbox.lock().await;
            let mut pending = Vec::new();
            while let Some(change) = inbox.settings.try_recv() {
                pending.push(Inbound::Setting(change));
            }
            while let Some(message) = inbox.broadcasts.try_recv() {
                pending.push(Inbound::Broadcast(message));
            }
            pending
        };

        let handled = pending.len();
        for inbound in pending {
            self.dispatch(inbound).await;
        }
        handled
    }

    /// Event loop: initial check, then storage changes and broadcasts until
    /// the context is invalidated or the sources close.
    pub async fn run(self: Arc<Self>) {
        self.initialize().await;
        loop {
            let inbound = {
                let mut guard = self.inbox.lock().await;
                let inbox = &mut *guard;
                tokio::select! {
                    change = inbox.settings.recv() => change.map(Inbound::Setting),
                    message = inbox.broadcasts.recv() => message.map(Inbound::Broadcast),
                }
            };
            match inbound {
                Some(inbound) => self.dispatch(inbound).await,
                None => break,
            }
        }
        tracing::debug!(tab = %self.tab, site = %self.site, "Page context stopped");
    }

    /// Wait for the agent's delayed work
    pub async fn settle(&self) {
        self.agent.settle().await;
    }
}
