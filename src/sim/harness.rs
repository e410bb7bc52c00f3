//! Whole-extension simulation
//!
//! Wires one coordinator, one storage area and any number of tabs with
//! their page contexts together in-process. Nothing runs in the
//! background: [`Simulation::settle`] pumps every queue until the system
//! is quiet, which keeps scenarios deterministic under a paused clock.

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;

use crate::agent::{CoordinatorLink, Document, KeyDisposition, PageContext};
use crate::broadcast::BroadcastHub;
use crate::config::{Config, KeyEvent};
use crate::context::ExtensionContext;
use crate::coordinator::{Browser, Coordinator, CoordinatorError, TabStatus};
use crate::messaging::{CoordinatorRequest, MessageError};
use crate::site::Site;
use crate::store::{MemoryStorageArea, PersistenceMode, SettingsStore, StorageArea, TabId};

use super::browser::SimBrowser;
use super::document::MemoryDocument;

/// Upper bound on pump rounds in [`Simulation::settle`]
const MAX_SETTLE_ROUNDS: usize = 64;

/// Page → coordinator messaging through a direct call
pub struct LocalCoordinatorLink {
    coordinator: Weak<Coordinator>,
}

impl LocalCoordinatorLink {
    pub fn new(coordinator: &Arc<Coordinator>) -> Self {
        Self {
            coordinator: Arc::downgrade(coordinator),
        }
    }
}

#[async_trait]
impl CoordinatorLink for LocalCoordinatorLink {
    async fn request_toggle(
        &self,
        tab: TabId,
        request: CoordinatorRequest,
    ) -> Result<(), MessageError> {
        let coordinator = self.coordinator.upgrade().ok_or(MessageError::NoListener)?;
        match coordinator.on_request(tab, request).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(MessageError::NoListener),
            Err(e) => {
                tracing::warn!(tab = %tab, error = %e, "Coordinator request failed");
                Err(MessageError::NoListener)
            }
        }
    }
}

pub struct Simulation {
    area: Arc<dyn StorageArea>,
    hub: BroadcastHub,
    config: Config,
    browser: Arc<SimBrowser>,
    coordinator: Arc<Coordinator>,
}

impl Simulation {
    /// A fresh profile backed by an in-memory area
    pub async fn new(config: Config) -> Result<Self, CoordinatorError> {
        Self::with_area(Arc::new(MemoryStorageArea::new()), config).await
    }

    pub async fn with_area(
        area: Arc<dyn StorageArea>,
        config: Config,
    ) -> Result<Self, CoordinatorError> {
        let browser = Arc::new(SimBrowser::new());
        let store = SettingsStore::new(Arc::clone(&area), ExtensionContext::new());
        let handle: Arc<dyn Browser> = browser.clone();
        let coordinator = Arc::new(Coordinator::start(handle, store, config.clone()).await?);

        Ok(Self {
            area,
            hub: BroadcastHub::new(),
            config,
            browser,
            coordinator,
        })
    }

    pub fn browser(&self) -> &Arc<SimBrowser> {
        &self.browser
    }

    pub fn browser_handle(&self) -> Arc<dyn Browser> {
        self.browser.clone()
    }

    pub fn coordinator(&self) -> &Arc<Coordinator> {
        &self.coordinator
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Store view of a fresh context, such as the options page
    pub fn store(&self) -> SettingsStore {
        SettingsStore::new(Arc::clone(&self.area), ExtensionContext::new())
    }

    pub fn page(&self, tab: TabId) -> Option<Arc<PageContext>> {
        self.browser.page(tab)
    }

    /// Open `url` in a new focused tab with a page agent loaded
    pub async fn open_tab(&self, url: &str) -> TabId {
        let tab = self.browser.add_tab(Arc::new(MemoryDocument::for_url(url)));
        self.load_agent(tab).await;
        self.page_loaded(tab).await;
        tab
    }

    /// Open `url` where the page agent has not loaded (yet)
    pub async fn open_tab_without_agent(&self, url: &str) -> TabId {
        let tab = self.browser.add_tab(Arc::new(MemoryDocument::for_url(url)));
        self.page_loaded(tab).await;
        tab
    }

    /// Inject a page context into `tab`, as the browser does for matching
    /// hosts. Returns whether one was attached.
    pub async fn load_agent(&self, tab: TabId) -> bool {
        let Some(document) = self.browser.document(tab) else {
            return false;
        };
        let link = Arc::new(LocalCoordinatorLink::new(&self.coordinator));
        let Some(page) = PageContext::new(
            tab,
            document,
            self.store(),
            &self.hub,
            link,
            &self.config,
        ) else {
            return false;
        };

        let page = Arc::new(page);
        page.initialize().await;
        self.browser.attach_page(tab, page);
        true
    }

    /// Hard reload of `tab`: the DOM and page agent start over, then the
    /// coordinator sees the load complete
    pub async fn reload(&self, tab: TabId) {
        let Some(document) = self.browser.document(tab) else {
            return;
        };
        let fresh = Arc::new(MemoryDocument::for_url(&document.location()));
        if self.browser.replace_document(tab, fresh) {
            self.load_agent(tab).await;
            self.page_loaded(tab).await;
        }
    }

    pub fn detach_agent(&self, tab: TabId) {
        self.browser.detach_page(tab);
    }

    async fn page_loaded(&self, tab: TabId) {
        if let Err(e) = self.coordinator.on_tab_updated(tab, TabStatus::Complete).await {
            tracing::warn!(tab = %tab, error = %e, "Tab update handling failed");
        }
    }

    pub async fn close_tab(&self, tab: TabId) {
        self.browser.close_tab(tab);
        if let Err(e) = self.coordinator.on_tab_removed(tab).await {
            tracing::warn!(tab = %tab, error = %e, "Tab removal handling failed");
        }
    }

    pub async fn activate_tab(&self, tab: TabId) {
        if self.browser.activate(tab) {
            if let Err(e) = self.coordinator.on_tab_activated(tab).await {
                tracing::warn!(tab = %tab, error = %e, "Tab activation handling failed");
            }
        }
    }

    /// SPA navigation inside the tab, followed by the page-load
    /// notification
    pub async fn navigate(&self, tab: TabId, url: &str) {
        let Some(document) = self.browser.document(tab) else {
            return;
        };
        document.navigate(url);
        if let Some(page) = self.page(tab) {
            page.on_mutation().await;
        }
        self.page_loaded(tab).await;
    }

    pub async fn key_down(&self, tab: TabId, event: &KeyEvent) -> KeyDisposition {
        match self.page(tab) {
            Some(page) => page.on_key_down(event).await,
            None => KeyDisposition::PassThrough,
        }
    }

    pub async fn click_control(&self, tab: TabId) {
        if let Some(page) = self.page(tab) {
            page.on_control_clicked().await;
        }
    }

    /// Orphan the page context in `tab`, as an extension reload does
    pub fn invalidate(&self, tab: TabId) {
        if let Some(page) = self.page(tab) {
            page.context().invalidate();
        }
    }

    /// Whether `site`'s stylesheet is in effect in `tab`, by either path
    pub fn has_styles(&self, tab: TabId, site: Site) -> bool {
        self.browser
            .document(tab)
            .is_some_and(|doc| doc.has_site_styles(site, self.config.styles.path_for(site)))
    }

    /// Pump agent timers, page queues and coordinator storage changes until
    /// nothing is left to handle
    pub async fn settle(&self) {
        for _ in 0..MAX_SETTLE_ROUNDS {
            let pages = self.browser.pages();
            join_all(pages.iter().map(|page| page.settle())).await;

            let mut handled = 0;
            for page in &pages {
                handled += page.drain().await;
            }
            handled += self.coordinator.drain_storage_changes().await;
            if handled == 0 {
                return;
            }
        }
        tracing::warn!("Simulation did not settle");
    }
}

/// Final state of one tab after a scenario
#[derive(Debug, Clone, Serialize)]
pub struct TabReport {
    pub tab: TabId,
    pub url: String,
    pub active: bool,
    pub styled: bool,
    pub badge: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub site: Site,
    pub mode: String,
    pub tabs: Vec<TabReport>,
}

fn sample_url(site: Site, n: usize) -> String {
    match site {
        Site::YouTube => format!("https://www.youtube.com/watch?v=sample{}", n),
        Site::Twitter => format!("https://x.com/home?tab={}", n),
    }
}

/// Two tabs of `site`, the shortcut pressed in the first one
pub async fn run_scenario(
    site: Site,
    mode: PersistenceMode,
    config: Config,
) -> Result<ScenarioReport, CoordinatorError> {
    let sim = Simulation::new(config).await?;
    sim.store().set_persistence_mode(site, mode).await?;

    let first = sim.open_tab(&sample_url(site, 1)).await;
    let second = sim.open_tab(&sample_url(site, 2)).await;
    sim.settle().await;

    sim.activate_tab(first).await;
    match sim.config().shortcuts.chords_for(site).first() {
        Some(chord) => {
            let event = KeyEvent::from_char(chord.key, chord.modifiers);
            sim.key_down(first, &event).await;
        }
        None => sim.click_control(first).await,
    }
    sim.settle().await;

    let tabs = [first, second]
        .into_iter()
        .map(|tab| TabReport {
            tab,
            url: sim
                .browser()
                .document(tab)
                .map(|doc| doc.location())
                .unwrap_or_default(),
            active: sim.page(tab).is_some_and(|p| p.agent().is_active()),
            styled: sim.has_styles(tab, site),
            badge: sim.browser().badge(tab),
        })
        .collect();

    Ok(ScenarioReport {
        site,
        mode: mode.to_string(),
        tabs,
    })
}
