//! Settings store
//!
//! [`StorageArea`] is the host-provided persisted key/value area (JSON
//! values, change notifications to every context). [`SettingsStore`] is the
//! typed view each context uses: it checks the context is still valid,
//! validates values at the boundary and decodes change events into
//! [`SettingChange`]s.

mod keys;
mod memory;
mod values;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::context::ExtensionContext;
use crate::data::DatabaseError;
use crate::site::Site;

pub use keys::StorageKey;
pub use memory::MemoryStorageArea;
pub use values::{
    clamp_twitter_font_size, clamp_twitter_width, PersistenceMode, SettingChange, SettingValue,
    TabId, TheaterSessions, ToggleState, TwitterFocusControls, TwitterSettings,
    TWITTER_FONT_SIZE_DEFAULT, TWITTER_FONT_SIZE_MAX, TWITTER_FONT_SIZE_MIN,
    TWITTER_WIDTH_DEFAULT, TWITTER_WIDTH_MAX, TWITTER_WIDTH_MIN,
};

/// Capacity of the per-area change channel
pub(crate) const CHANGE_CHANNEL_CAPACITY: usize = 256;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The extension was reloaded or updated under this context. Expected;
    /// callers abandon the operation silently.
    #[error("Extension context invalidated")]
    ContextInvalidated,

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn is_context_invalidated(&self) -> bool {
        matches!(self, StoreError::ContextInvalidated)
    }
}

/// A committed raw change, as emitted by a [`StorageArea`]
#[derive(Debug, Clone, PartialEq)]
pub struct RawChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Host persisted key/value area shared by every context.
///
/// Implementations notify all subscribers of every commit that changes a
/// value, whichever context made it. Writes that store an identical value
/// emit nothing.
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    fn subscribe(&self) -> broadcast::Receiver<RawChange>;
}

/// Typed, context-aware view over a [`StorageArea`]
#[derive(Clone)]
pub struct SettingsStore {
    area: Arc<dyn StorageArea>,
    context: ExtensionContext,
}

impl SettingsStore {
    pub fn new(area: Arc<dyn StorageArea>, context: ExtensionContext) -> Self {
        Self { area, context }
    }

    pub fn context(&self) -> &ExtensionContext {
        &self.context
    }

    /// The same area seen from another execution context
    pub fn for_context(&self, context: ExtensionContext) -> Self {
        Self {
            area: Arc::clone(&self.area),
            context,
        }
    }

    fn check_context(&self) -> Result<(), StoreError> {
        if self.context.is_valid() {
            Ok(())
        } else {
            Err(StoreError::ContextInvalidated)
        }
    }

    /// Read a key, falling back to its default when missing or malformed
    pub async fn get_value(&self, key: StorageKey) -> Result<SettingValue, StoreError> {
        self.check_context()?;
        let raw = self.area.get(key.as_str()).await?;
        Ok(SettingValue::decode(key, raw.as_ref()))
    }

    /// Persist a value after clamping/normalising it
    pub async fn set_value(&self, value: &SettingValue) -> Result<(), StoreError> {
        self.check_context()?;
        let value = value.normalized();
        self.area.set(value.key().as_str(), value.to_json()).await
    }

    /// Every setting, decoded, in key order
    pub async fn snapshot(&self) -> Result<Vec<SettingValue>, StoreError> {
        let mut values = Vec::with_capacity(StorageKey::ALL.len());
        for key in StorageKey::ALL {
            values.push(self.get_value(key).await?);
        }
        Ok(values)
    }

    pub async fn persistence_mode(&self, site: Site) -> Result<PersistenceMode, StoreError> {
        match self.get_value(site.mode_key()).await? {
            SettingValue::PersistenceMode(_, mode) => Ok(mode),
            _ => Ok(PersistenceMode::default()),
        }
    }

    pub async fn set_persistence_mode(
        &self,
        site: Site,
        mode: PersistenceMode,
    ) -> Result<(), StoreError> {
        self.set_value(&SettingValue::PersistenceMode(site, mode))
            .await
    }

    pub async fn toggle_state(&self, site: Site) -> Result<ToggleState, StoreError> {
        match self.get_value(site.state_key()).await? {
            SettingValue::Toggle(_, state) => Ok(state),
            _ => Ok(ToggleState::default()),
        }
    }

    pub async fn set_toggle_state(&self, site: Site, state: ToggleState) -> Result<(), StoreError> {
        self.set_value(&SettingValue::Toggle(site, state)).await
    }

    pub async fn theater_sessions(&self) -> Result<TheaterSessions, StoreError> {
        match self.get_value(StorageKey::YoutubeSessions).await? {
            SettingValue::TheaterSessions(sessions) => Ok(sessions),
            _ => Ok(TheaterSessions::default()),
        }
    }

    pub async fn set_theater_sessions(&self, sessions: &TheaterSessions) -> Result<(), StoreError> {
        self.set_value(&SettingValue::TheaterSessions(sessions.clone()))
            .await
    }

    pub async fn twitter_focus_controls(&self) -> Result<TwitterFocusControls, StoreError> {
        match self.get_value(StorageKey::TwitterFocusControls).await? {
            SettingValue::TwitterFocusControls(controls) => Ok(controls),
            _ => Ok(TwitterFocusControls::default()),
        }
    }

    pub async fn set_twitter_focus_controls(
        &self,
        controls: TwitterFocusControls,
    ) -> Result<(), StoreError> {
        self.set_value(&SettingValue::TwitterFocusControls(controls))
            .await
    }

    /// Width is clamped to the supported range before it is stored
    pub async fn set_twitter_width(&self, width: i64) -> Result<(), StoreError> {
        self.set_value(&SettingValue::TwitterWidth(clamp_twitter_width(width)))
            .await
    }

    pub async fn set_twitter_font_size(&self, font_size: i64) -> Result<(), StoreError> {
        self.set_value(&SettingValue::TwitterFontSize(clamp_twitter_font_size(
            font_size,
        )))
        .await
    }

    pub async fn set_twitter_use_default_font(&self, use_default: bool) -> Result<(), StoreError> {
        self.set_value(&SettingValue::TwitterUseDefaultFont(use_default))
            .await
    }

    /// All Twitter/X layout settings in one read
    pub async fn twitter_settings(&self) -> Result<TwitterSettings, StoreError> {
        let mut settings = TwitterSettings::default();
        if let SettingValue::TwitterWidth(w) = self.get_value(StorageKey::TwitterWidth).await? {
            settings.width = w;
        }
        if let SettingValue::TwitterFontSize(px) =
            self.get_value(StorageKey::TwitterFontSize).await?
        {
            settings.font_size = px;
        }
        if let SettingValue::TwitterUseDefaultFont(b) =
            self.get_value(StorageKey::TwitterUseDefaultFont).await?
        {
            settings.use_default_font = b;
        }
        settings.controls = self.twitter_focus_controls().await?;
        Ok(settings)
    }

    pub fn subscribe(&self) -> SettingsSubscription {
        SettingsSubscription {
            rx: self.area.subscribe(),
            context: self.context.clone(),
        }
    }
}

/// Stream of decoded setting changes for one context
pub struct SettingsSubscription {
    rx: broadcast::Receiver<RawChange>,
    context: ExtensionContext,
}

impl SettingsSubscription {
    /// Next change, or `None` once the area is gone or the context has been
    /// invalidated.
    pub async fn recv(&mut self) -> Option<SettingChange> {
        loop {
            if !self.context.is_valid() {
                return None;
            }
            match self.rx.recv().await {
                Ok(raw) => {
                    if let Some(change) = SettingChange::from_raw(&raw) {
                        return Some(change);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Settings subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`SettingsSubscription::recv`]
    pub fn try_recv(&mut self) -> Option<SettingChange> {
        loop {
            if !self.context.is_valid() {
                return None;
            }
            match self.rx.try_recv() {
                Ok(raw) => {
                    if let Some(change) = SettingChange::from_raw(&raw) {
                        return Some(change);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Settings subscriber lagged behind");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
