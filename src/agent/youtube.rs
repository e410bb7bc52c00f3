//! YouTube page agent
//!
//! Besides the stylesheet, activation switches the player to theater mode
//! once it has rendered. The player mounts asynchronously, so engagement
//! waits `initial_delay` and then polls for it a bounded number of times.
//! A tab is recorded in the theater sessions only when this agent performed
//! the click; deactivation reverts nothing it did not do.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::config::TheaterTiming;
use crate::site::Site;
use crate::store::{SettingsStore, StoreError, TabId, TheaterSessions};

use super::dom::{
    engage_theater, revert_theater, DomError, Document, ScriptOutcome, YOUTUBE_CONTROL_ANCHOR,
};
use super::{AgentError, PageAgent};

/// Run `attempt` after the initial delay, retrying while the player is
/// missing. Any other outcome is returned as-is.
pub async fn retry_while_player_missing<F, Fut>(
    timing: TheaterTiming,
    mut attempt: F,
) -> Result<ScriptOutcome, DomError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<ScriptOutcome, DomError>>,
{
    tokio::time::sleep(timing.initial_delay).await;
    let mut retries = 0;
    loop {
        match attempt().await {
            Err(e) if e.is_target_not_found() && retries < timing.max_retries => {
                retries += 1;
                tokio::time::sleep(timing.retry_interval).await;
            }
            other => return other,
        }
    }
}

/// Add `tab` to the persisted theater sessions
pub(crate) async fn record_theater_session(
    store: &SettingsStore,
    tab: TabId,
) -> Result<(), StoreError> {
    let mut sessions = store.theater_sessions().await?;
    if sessions.record(tab) {
        store.set_theater_sessions(&sessions).await?;
    }
    Ok(())
}

struct Inner {
    tab: TabId,
    document: Arc<dyn Document>,
    store: SettingsStore,
    stylesheet_href: String,
    timing: TheaterTiming,
    /// This page turned theater mode on and has not reverted it yet
    engaged: AtomicBool,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Inner {
    fn is_active(&self) -> bool {
        self.document.has_root_class(Site::YouTube.active_class())
    }
}

#[derive(Clone)]
pub struct YouTubeAgent {
    inner: Arc<Inner>,
}

impl YouTubeAgent {
    pub fn new(
        tab: TabId,
        document: Arc<dyn Document>,
        store: SettingsStore,
        stylesheet_href: String,
        timing: TheaterTiming,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                tab,
                document,
                store,
                stylesheet_href,
                timing,
                engaged: AtomicBool::new(false),
                pending: Mutex::new(None),
            }),
        }
    }

    /// Whether this page currently owns a theater-mode toggle
    pub fn engaged_theater(&self) -> bool {
        self.inner.engaged.load(Ordering::Acquire)
    }

    fn schedule_theater(&self) {
        if self.engaged_theater() {
            return;
        }
        let mut pending = self.inner.pending.lock();
        if pending.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *pending = Some(tokio::spawn(engage_when_ready(inner)));
    }
}

async fn engage_when_ready(inner: Arc<Inner>) {
    let probe = Arc::clone(&inner);
    let result = retry_while_player_missing(inner.timing, move || {
        let probe = Arc::clone(&probe);
        async move {
            // Deactivated while waiting
            if !probe.is_active() {
                return Ok(ScriptOutcome::unchanged());
            }
            engage_theater(probe.document.as_ref())
        }
    })
    .await;

    match result {
        Ok(outcome) if outcome.performed_toggle => {
            inner.engaged.store(true, Ordering::Release);
            tracing::debug!(tab = %inner.tab, "Engaged theater mode");
            if let Err(e) = record_theater_session(&inner.store, inner.tab).await {
                tracing::debug!(tab = %inner.tab, error = %e, "Could not record theater session");
            }
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(tab = %inner.tab, error = %e, "Player never appeared, theater mode skipped");
        }
    }
}

#[async_trait]
impl PageAgent for YouTubeAgent {
    fn site(&self) -> Site {
        Site::YouTube
    }

    async fn activate(&self) -> Result<(), AgentError> {
        let inner = &self.inner;
        // A record left by an earlier page instance in this tab is still ours
        let sessions = inner.store.theater_sessions().await?;
        if sessions.contains(inner.tab) {
            inner.engaged.store(true, Ordering::Release);
        }

        let doc = inner.document.as_ref();
        if doc.insert_stylesheet(Site::YouTube.stylesheet_id(), &inner.stylesheet_href) {
            tracing::debug!(tab = %inner.tab, "Inserted YouTube stylesheet");
        }
        doc.add_root_class(Site::YouTube.active_class());
        if let Err(e) = self.ensure_control() {
            tracing::debug!(tab = %inner.tab, error = %e, "Toggle control not mounted yet");
        }

        self.schedule_theater();
        Ok(())
    }

    async fn deactivate(&self) {
        let inner = &self.inner;
        let mut sessions = match inner.store.theater_sessions().await {
            Ok(sessions) => sessions,
            Err(e) if e.is_context_invalidated() => {
                tracing::debug!(tab = %inner.tab, "Context invalidated, leaving page untouched");
                return;
            }
            Err(e) => {
                tracing::warn!(tab = %inner.tab, error = %e, "Failed to read theater sessions");
                TheaterSessions::default()
            }
        };

        let doc = inner.document.as_ref();
        doc.remove_element(Site::YouTube.stylesheet_id());
        doc.remove_root_class(Site::YouTube.active_class());
        doc.remove_element(Site::YouTube.control_id());

        let engaged = inner.engaged.swap(false, Ordering::AcqRel);
        if engaged || sessions.contains(inner.tab) {
            match revert_theater(doc) {
                Ok(outcome) => {
                    tracing::debug!(tab = %inner.tab, reverted = outcome.performed_toggle, "Theater mode restored");
                }
                Err(e) => tracing::debug!(tab = %inner.tab, error = %e, "Could not revert theater mode"),
            }
        }

        if sessions.remove(inner.tab) {
            if let Err(e) = inner.store.set_theater_sessions(&sessions).await {
                tracing::debug!(tab = %inner.tab, error = %e, "Could not clear theater session");
            }
        }
    }

    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn ensure_control(&self) -> Result<bool, DomError> {
        self.inner
            .document
            .insert_control(Site::YouTube.control_id(), YOUTUBE_CONTROL_ANCHOR)
    }

    async fn settle(&self) {
        let handle = self.inner.pending.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "Theater task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::context::ExtensionContext;
    use crate::sim::MemoryDocument;
    use crate::store::MemoryStorageArea;

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=abc";

    fn setup(doc: MemoryDocument) -> (YouTubeAgent, Arc<MemoryDocument>, SettingsStore) {
        let doc = Arc::new(doc);
        let store = SettingsStore::new(
            Arc::new(MemoryStorageArea::new()),
            ExtensionContext::new(),
        );
        let agent = YouTubeAgent::new(
            TabId(7),
            doc.clone(),
            store.clone(),
            "chrome-extension://dissatisfied/styles/youtube.css".to_string(),
            TheaterTiming::default(),
        );
        (agent, doc, store)
    }

    #[tokio::test(start_paused = true)]
    async fn test_activate_is_idempotent() {
        let (agent, doc, _store) = setup(MemoryDocument::youtube_watch(WATCH_URL));

        agent.activate().await.unwrap();
        agent.activate().await.unwrap();
        agent.settle().await;

        assert_eq!(doc.count_elements(Site::YouTube.stylesheet_id()), 1);
        assert_eq!(doc.count_elements(Site::YouTube.control_id()), 1);
        assert_eq!(doc.click_count(), 1);
        assert!(agent.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_engages_and_records_session() {
        let (agent, doc, store) = setup(MemoryDocument::youtube_watch(WATCH_URL));

        agent.activate().await.unwrap();
        // Nothing happens before the initial delay
        assert_eq!(doc.player_theater(), Some(false));

        agent.settle().await;
        assert_eq!(doc.player_theater(), Some(true));
        assert!(agent.engaged_theater());
        assert!(store.theater_sessions().await.unwrap().contains(TabId(7)));

        agent.deactivate().await;
        assert_eq!(doc.player_theater(), Some(false));
        assert!(store.theater_sessions().await.unwrap().is_empty());
        assert!(!agent.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_theater_is_left_alone() {
        let (agent, doc, store) =
            setup(MemoryDocument::youtube_watch(WATCH_URL).with_theater(true));

        agent.activate().await.unwrap();
        agent.settle().await;
        assert!(store.theater_sessions().await.unwrap().is_empty());

        agent.deactivate().await;
        assert_eq!(doc.player_theater(), Some(true));
        assert_eq!(doc.click_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_until_player_renders() {
        let (agent, doc, _store) = setup(MemoryDocument::new(WATCH_URL));

        agent.activate().await.unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;
        doc.set_player(Some(false));

        agent.settle().await;
        assert_eq!(doc.player_theater(), Some(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let (agent, doc, store) = setup(MemoryDocument::new(WATCH_URL));

        agent.activate().await.unwrap();
        agent.settle().await;

        // Too late: the poll already stopped
        doc.set_player(Some(false));
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(doc.player_theater(), Some(false));
        assert!(store.theater_sessions().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deactivate_before_delay_skips_click() {
        let (agent, doc, _store) = setup(MemoryDocument::youtube_watch(WATCH_URL));

        agent.activate().await.unwrap();
        agent.deactivate().await;
        agent.settle().await;

        assert_eq!(doc.click_count(), 0);
        assert_eq!(doc.player_theater(), Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidated_context_touches_nothing() {
        let (agent, doc, store) = setup(MemoryDocument::youtube_watch(WATCH_URL));
        store.context().invalidate();

        let err = agent.activate().await.unwrap_err();
        assert!(err.is_context_invalidated());
        assert!(doc.elements().is_empty());
        assert!(!agent.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_helper_returns_other_errors() {
        let timing = TheaterTiming {
            initial_delay: Duration::from_millis(10),
            retry_interval: Duration::from_millis(10),
            max_retries: 3,
        };
        let mut calls = 0;
        let result = retry_while_player_missing(timing, || {
            calls += 1;
            async { Err(DomError::Unavailable("closed".into())) }
        })
        .await;
        assert_eq!(result, Err(DomError::Unavailable("closed".into())));
        assert_eq!(calls, 1);

        let mut calls = 0;
        let result = retry_while_player_missing(timing, || {
            calls += 1;
            async { Err(DomError::TargetNotFound("player".into())) }
        })
        .await;
        assert!(result.unwrap_err().is_target_not_found());
        assert_eq!(calls, 4);
    }
}
