//! Twitter/X page agent

use std::sync::Arc;

use async_trait::async_trait;

use crate::site::Site;
use crate::store::{SettingChange, SettingsStore, StorageKey};

use super::dom::{
    apply_twitter_layout, clear_twitter_layout, DomError, Document, TWITTER_CONTROL_ANCHOR,
};
use super::{AgentError, PageAgent};

/// Keys whose changes re-lay out an active page
fn is_layout_key(key: StorageKey) -> bool {
    matches!(
        key,
        StorageKey::TwitterWidth
            | StorageKey::TwitterFontSize
            | StorageKey::TwitterUseDefaultFont
            | StorageKey::TwitterFocusControls
    )
}

pub struct TwitterAgent {
    document: Arc<dyn Document>,
    store: SettingsStore,
    stylesheet_href: String,
}

impl TwitterAgent {
    pub fn new(document: Arc<dyn Document>, store: SettingsStore, stylesheet_href: String) -> Self {
        Self {
            document,
            store,
            stylesheet_href,
        }
    }
}

#[async_trait]
impl PageAgent for TwitterAgent {
    fn site(&self) -> Site {
        Site::Twitter
    }

    async fn activate(&self) -> Result<(), AgentError> {
        let settings = self.store.twitter_settings().await?;

        let doc = self.document.as_ref();
        // Layout first so the stylesheet never renders with stale variables
        apply_twitter_layout(doc, &settings);
        doc.insert_stylesheet(Site::Twitter.stylesheet_id(), &self.stylesheet_href);
        doc.add_root_class(Site::Twitter.active_class());
        if let Err(e) = self.ensure_control() {
            tracing::debug!(error = %e, "Toggle control not mounted yet");
        }
        Ok(())
    }

    async fn deactivate(&self) {
        if !self.store.context().is_valid() {
            tracing::debug!("Context invalidated, leaving page untouched");
            return;
        }
        let doc = self.document.as_ref();
        doc.remove_element(Site::Twitter.stylesheet_id());
        doc.remove_root_class(Site::Twitter.active_class());
        doc.remove_element(Site::Twitter.control_id());
        clear_twitter_layout(doc);
    }

    fn is_active(&self) -> bool {
        self.document.has_root_class(Site::Twitter.active_class())
    }

    fn ensure_control(&self) -> Result<bool, DomError> {
        self.document
            .insert_control(Site::Twitter.control_id(), TWITTER_CONTROL_ANCHOR)
    }

    async fn on_setting_changed(&self, change: &SettingChange) -> Result<(), AgentError> {
        if !is_layout_key(change.key()) || !self.is_active() {
            return Ok(());
        }
        let settings = self.store.twitter_settings().await?;
        // May have been switched off while reading
        if self.is_active() {
            apply_twitter_layout(self.document.as_ref(), &settings);
        }
        Ok(())
    }
}
