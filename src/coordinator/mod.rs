//! Coordinator
//!
//! Runs once per browser session, independent of any page. It owns the
//! transient per-tab state and a cache of the theater sessions, relays
//! toggles to page agents (injecting directly when none is listening) and
//! keeps the badge in line with what was actually applied.

mod browser;
mod tabs;

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;

use crate::agent::dom::{DomError, PageScript};
use crate::agent::youtube::{record_theater_session, retry_while_player_missing};
use crate::config::Config;
use crate::messaging::{AgentMessage, Command, CoordinatorRequest, MessageError};
use crate::site::{classify_site, Site};
use crate::store::{
    PersistenceMode, SettingChange, SettingValue, SettingsStore, SettingsSubscription,
    StoreError, TabId, TheaterSessions, ToggleState,
};

pub use browser::{
    badge_text, Browser, BrowserError, InstallReason, TabInfo, TabStatus, BADGE_NONE, BADGE_OFF,
    BADGE_ON,
};
pub use tabs::{TabState, TabStates};

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

pub struct Coordinator {
    browser: Arc<dyn Browser>,
    store: SettingsStore,
    config: Config,
    tab_states: Mutex<TabStates>,
    /// Tabs whose last style application for a site failed, so their DOM
    /// may not match the stored state
    out_of_sync: Mutex<HashSet<(TabId, Site)>>,
    theater: Mutex<TheaterSessions>,
    changes: tokio::sync::Mutex<SettingsSubscription>,
}

impl Coordinator {
    /// Start up, resuming the persisted theater sessions
    pub async fn start(
        browser: Arc<dyn Browser>,
        store: SettingsStore,
        config: Config,
    ) -> Result<Self, CoordinatorError> {
        let changes = store.subscribe();
        let theater = store.theater_sessions().await?;
        tracing::info!(sessions = theater.len(), "Coordinator started");

        Ok(Self {
            browser,
            store,
            config,
            tab_states: Mutex::new(TabStates::new()),
            out_of_sync: Mutex::new(HashSet::new()),
            theater: Mutex::new(theater),
            changes: tokio::sync::Mutex::new(changes),
        })
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn tab_state(&self, tab: TabId) -> TabState {
        self.tab_states.lock().get(tab)
    }

    /// Cached view of the persisted theater sessions
    pub fn theater_sessions(&self) -> TheaterSessions {
        self.theater.lock().clone()
    }

    pub async fn on_installed(&self, reason: InstallReason) -> Result<(), CoordinatorError> {
        if reason != InstallReason::Install {
            return Ok(());
        }
        self.browser.open_options_page().await?;
        self.browser.set_badge_text(None, BADGE_OFF).await?;
        Ok(())
    }

    /// The toolbar icon opens options; it never toggles
    pub async fn on_action_clicked(&self) -> Result<(), CoordinatorError> {
        self.browser.open_options_page().await?;
        Ok(())
    }

    /// Platform keyboard command, applied to the active tab
    pub async fn on_command(&self, name: &str) -> Result<(), CoordinatorError> {
        let Some(command) = Command::parse(name) else {
            tracing::debug!(command = name, "Ignoring unknown command");
            return Ok(());
        };
        let Some(tab) = self.browser.active_tab().await else {
            return Ok(());
        };
        let site = command.site();
        if classify_site(&tab.url) != Some(site) {
            tracing::debug!(tab = %tab.id, command = %command, "Active tab does not match command");
            return Ok(());
        }
        self.toggle(tab.id, site).await?;
        Ok(())
    }

    /// Shortcut forwarded by a page agent for its own tab. `false` means
    /// the toggle could not be carried out and the page should fall back.
    pub async fn on_request(
        &self,
        tab: TabId,
        request: CoordinatorRequest,
    ) -> Result<bool, CoordinatorError> {
        let site = request.action.site();
        let Some(info) = self.browser.tab(tab).await else {
            return Ok(false);
        };
        if classify_site(&info.url) != Some(site) {
            // Nothing to apply on this page, and the page must not fall back
            tracing::debug!(tab = %tab, url = %info.url, "Shortcut on unsupported page");
            return Ok(true);
        }
        self.toggle(tab, site).await
    }

    /// Options-page edit of the global state
    pub async fn set_global_enabled(
        &self,
        site: Site,
        enabled: bool,
    ) -> Result<(), CoordinatorError> {
        self.store
            .set_toggle_state(site, ToggleState::new(enabled))
            .await?;
        if self.store.persistence_mode(site).await? == PersistenceMode::Global {
            self.apply_to_matching_tabs(site, enabled).await?;
        }
        Ok(())
    }

    /// Current enable state of `site` for `tab` under the active mode
    pub async fn is_enabled(&self, tab: TabId, site: Site) -> Result<bool, CoordinatorError> {
        let enabled = match self.store.persistence_mode(site).await? {
            PersistenceMode::Global => self.store.toggle_state(site).await?.enabled,
            PersistenceMode::Tab => self.tab_states.lock().enabled(tab, site),
        };
        Ok(enabled)
    }

    async fn toggle(&self, tab: TabId, site: Site) -> Result<bool, CoordinatorError> {
        let enabled = !self.is_enabled(tab, site).await?;
        tracing::debug!(tab = %tab, site = %site, enabled, "Toggling");

        match self.store.persistence_mode(site).await? {
            PersistenceMode::Global => {
                self.store
                    .set_toggle_state(site, ToggleState::new(enabled))
                    .await?;
                let applied = self.apply_to_matching_tabs(site, enabled).await?;
                Ok(applied.contains(&tab))
            }
            PersistenceMode::Tab => {
                if !self.apply_to_tab(tab, site, enabled).await {
                    return Ok(false);
                }
                self.tab_states.lock().set(tab, site, enabled);
                self.browser
                    .set_badge_text(Some(tab), badge_text(enabled))
                    .await?;
                Ok(true)
            }
        }
    }

    /// Command every open tab of `site`. Returns the tabs where it took.
    async fn apply_to_matching_tabs(
        &self,
        site: Site,
        enabled: bool,
    ) -> Result<Vec<TabId>, CoordinatorError> {
        let mut applied = Vec::new();
        for tab in self.browser.tabs().await {
            if classify_site(&tab.url) != Some(site) {
                continue;
            }
            if self.apply_to_tab(tab.id, site, enabled).await {
                self.browser
                    .set_badge_text(Some(tab.id), badge_text(enabled))
                    .await?;
                applied.push(tab.id);
            }
        }
        Ok(applied)
    }

    /// Relay to the page agent, injecting directly if none is listening.
    /// Returns whether the styles are now in the requested state.
    async fn apply_to_tab(&self, tab: TabId, site: Site, enabled: bool) -> bool {
        let applied = self.relay_or_inject(tab, site, enabled).await;
        let mut out_of_sync = self.out_of_sync.lock();
        if applied {
            out_of_sync.remove(&(tab, site));
        } else {
            out_of_sync.insert((tab, site));
        }
        applied
    }

    async fn relay_or_inject(&self, tab: TabId, site: Site, enabled: bool) -> bool {
        let message = AgentMessage::new(site.style_action(enabled));
        match self.browser.send_message(tab, message).await {
            Ok(response) if response.success => true,
            Ok(_) => {
                tracing::debug!(tab = %tab, site = %site, "Page agent could not apply styles");
                false
            }
            Err(MessageError::NoListener) => {
                match self.apply_directly(tab, site, enabled).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(tab = %tab, site = %site, error = %e, "Direct injection failed");
                        false
                    }
                }
            }
            Err(MessageError::ContextInvalidated) => {
                tracing::debug!(tab = %tab, "Page agent context invalidated");
                false
            }
        }
    }

    async fn apply_directly(
        &self,
        tab: TabId,
        site: Site,
        enabled: bool,
    ) -> Result<(), CoordinatorError> {
        let css = self.config.styles.path_for(site);
        if enabled {
            self.browser.insert_css(tab, css).await?;
            match site {
                Site::YouTube => self.engage_theater_directly(tab).await?,
                Site::Twitter => {
                    let settings = self.store.twitter_settings().await?;
                    self.browser
                        .execute_script(tab, PageScript::ApplyTwitterLayout(settings))
                        .await?;
                }
            }
        } else {
            self.browser.remove_css(tab, css).await?;
            match site {
                Site::YouTube => self.revert_theater_directly(tab).await?,
                Site::Twitter => {
                    self.browser
                        .execute_script(tab, PageScript::ClearTwitterLayout)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn engage_theater_directly(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let browser = Arc::clone(&self.browser);
        let result = retry_while_player_missing(self.config.theater, move || {
            let browser = Arc::clone(&browser);
            async move {
                match browser.execute_script(tab, PageScript::EngageTheater).await {
                    Ok(outcome) => Ok(outcome),
                    Err(BrowserError::Script(e)) => Err(e),
                    Err(e) => Err(DomError::Unavailable(e.to_string())),
                }
            }
        })
        .await;

        match result {
            Ok(outcome) if outcome.performed_toggle => {
                record_theater_session(&self.store, tab).await?;
                self.theater.lock().record(tab);
            }
            Ok(_) => {}
            // Styles are in; theater mode is best effort
            Err(e) => tracing::debug!(tab = %tab, error = %e, "Theater mode not engaged"),
        }
        Ok(())
    }

    async fn revert_theater_directly(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let mut sessions = self.store.theater_sessions().await?;
        if sessions.remove(tab) {
            if let Err(e) = self
                .browser
                .execute_script(tab, PageScript::RevertTheater)
                .await
            {
                tracing::debug!(tab = %tab, error = %e, "Could not revert theater mode");
            }
            self.store.set_theater_sessions(&sessions).await?;
        }
        self.theater.lock().remove(tab);
        Ok(())
    }

    pub async fn on_tab_removed(&self, tab: TabId) -> Result<(), CoordinatorError> {
        self.tab_states.lock().remove(tab);
        self.out_of_sync.lock().retain(|(id, _)| *id != tab);
        self.theater.lock().remove(tab);

        let mut sessions = self.store.theater_sessions().await?;
        if sessions.remove(tab) {
            self.store.set_theater_sessions(&sessions).await?;
        }
        Ok(())
    }

    /// Focus change: recompute the badge, touch nothing else
    pub async fn on_tab_activated(&self, tab: TabId) -> Result<(), CoordinatorError> {
        let Some(info) = self.browser.tab(tab).await else {
            return Ok(());
        };
        self.refresh_badge(&info).await
    }

    /// Navigation complete: a fresh page has no styles yet, reapply the
    /// state the active mode says it should have.
    pub async fn on_tab_updated(
        &self,
        tab: TabId,
        status: TabStatus,
    ) -> Result<(), CoordinatorError> {
        if status != TabStatus::Complete {
            return Ok(());
        }
        let Some(info) = self.browser.tab(tab).await else {
            return Ok(());
        };
        let Some(site) = classify_site(&info.url) else {
            self.out_of_sync.lock().retain(|(id, _)| *id != tab);
            self.browser.set_badge_text(Some(tab), BADGE_NONE).await?;
            return Ok(());
        };

        // A fresh page starts unstyled, which is in sync until an apply fails
        self.out_of_sync.lock().remove(&(tab, site));
        let applied = self.is_enabled(tab, site).await? && self.apply_to_tab(tab, site, true).await;
        self.browser
            .set_badge_text(Some(tab), badge_text(applied))
            .await?;
        Ok(())
    }

    pub async fn on_storage_change(&self, change: &SettingChange) -> Result<(), CoordinatorError> {
        match &change.new_value {
            SettingValue::TheaterSessions(sessions) => {
                *self.theater.lock() = sessions.clone();
            }
            SettingValue::PersistenceMode(site, mode) => {
                match mode {
                    PersistenceMode::Tab => {
                        let was_global = matches!(
                            change.old_value,
                            SettingValue::PersistenceMode(_, PersistenceMode::Global)
                        );
                        if was_global {
                            self.seed_tab_states(*site).await?;
                        }
                    }
                    PersistenceMode::Global => self.tab_states.lock().clear_site(*site),
                }
                self.refresh_active_badge().await?;
            }
            SettingValue::Toggle(..) => self.refresh_active_badge().await?,
            _ => {}
        }
        Ok(())
    }

    /// Leaving global mode: pages keep whatever styles they have, so each
    /// open tab of `site` starts tab mode in the state it is showing.
    async fn seed_tab_states(&self, site: Site) -> Result<(), CoordinatorError> {
        let enabled = self.store.toggle_state(site).await?.enabled;
        for tab in self.browser.tabs().await {
            if classify_site(&tab.url) != Some(site) {
                continue;
            }
            // A failed apply left the previous state in place
            let showing = if self.out_of_sync.lock().remove(&(tab.id, site)) {
                !enabled
            } else {
                enabled
            };
            self.tab_states.lock().set(tab.id, site, showing);
        }
        Ok(())
    }

    /// Recompute a badge from the active mode's state. Tabs whose last
    /// apply failed keep the badge they have.
    async fn refresh_badge(&self, tab: &TabInfo) -> Result<(), CoordinatorError> {
        let text = match classify_site(&tab.url) {
            Some(site) => {
                let stale = self.out_of_sync.lock().contains(&(tab.id, site));
                if stale {
                    tracing::debug!(tab = %tab.id, site = %site, "Badge left as is, styles not applied");
                    return Ok(());
                }
                badge_text(self.is_enabled(tab.id, site).await?)
            }
            None => BADGE_NONE,
        };
        self.browser.set_badge_text(Some(tab.id), text).await?;
        Ok(())
    }

    async fn refresh_active_badge(&self) -> Result<(), CoordinatorError> {
        match self.browser.active_tab().await {
            Some(tab) => self.refresh_badge(&tab).await,
            None => Ok(()),
        }
    }

    async fn handle_change(&self, change: &SettingChange) {
        if let Err(e) = self.on_storage_change(change).await {
            tracing::warn!(key = %change.key(), error = %e, "Failed to handle storage change");
        }
    }

    /// Handle every queued storage change without waiting
    pub async fn drain_storage_changes(&self) -> usize {
        let pending: Vec<SettingChange> = {
            let mut changes = self.changes.lock().await;
            std::iter::from_fn(|| changes.try_recv()).collect()
        };
        for change in &pending {
            self.handle_change(change).await;
        }
        pending.len()
    }

    /// Storage change loop; ends when the store closes
    pub async fn run(self: Arc<Self>) {
        loop {
            let change = self.changes.lock().await.recv().await;
            match change {
                Some(change) => self.handle_change(&change).await,
                None => break,
            }
        }
        tracing::info!("Coordinator stopped");
    }
}
