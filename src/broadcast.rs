//! Cross-tab broadcast
//!
//! One named channel per site. Posting is fire-and-forget: no
//! acknowledgement, no delivery guarantee, and a sender never receives its
//! own messages. Page contexts use it to converge faster than the store
//! round-trip; the store change listener stays authoritative.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use uuid::Uuid;

use crate::messaging::{BroadcastAction, BroadcastMessage};
use crate::site::Site;

const BROADCAST_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Envelope {
    origin: Uuid,
    message: BroadcastMessage,
}

/// Every per-site channel of one browser profile
#[derive(Clone)]
pub struct BroadcastHub {
    channels: Arc<HashMap<Site, broadcast::Sender<Envelope>>>,
}

impl BroadcastHub {
    pub fn new() -> Self {
        let channels = Site::ALL
            .into_iter()
            .map(|site| (site, broadcast::channel(BROADCAST_CAPACITY).0))
            .collect();
        Self {
            channels: Arc::new(channels),
        }
    }

    /// Join `site`'s channel as `origin`
    pub fn open(&self, site: Site, origin: Uuid) -> BroadcastChannel {
        let sender = self.sender(site);
        BroadcastChannel {
            site,
            origin,
            receiver: sender.subscribe(),
            sender,
        }
    }

    fn sender(&self, site: Site) -> broadcast::Sender<Envelope> {
        match self.channels.get(&site) {
            Some(sender) => sender.clone(),
            // Every site gets a channel in `new`
            None => broadcast::channel(BROADCAST_CAPACITY).0,
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

/// One context's handle on a site channel
pub struct BroadcastChannel {
    site: Site,
    origin: Uuid,
    sender: broadcast::Sender<Envelope>,
    receiver: broadcast::Receiver<Envelope>,
}

impl BroadcastChannel {
    pub fn name(&self) -> &'static str {
        self.site.channel_name()
    }

    /// Post to every other member. Having no other members is not an error.
    pub fn post(&self, action: BroadcastAction) {
        let envelope = Envelope {
            origin: self.origin,
            message: BroadcastMessage { action },
        };
        if self.sender.send(envelope).is_err() {
            tracing::trace!(channel = self.name(), "Broadcast with no receivers");
        }
    }

    /// A detached sender for posting from outside the receive loop
    pub fn poster(&self) -> BroadcastPoster {
        BroadcastPoster {
            site: self.site,
            origin: self.origin,
            sender: self.sender.clone(),
        }
    }

    /// Next message from another member; `None` once the channel is gone
    pub async fn recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(channel = self.name(), skipped, "Broadcast receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<BroadcastMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(envelope) if envelope.origin == self.origin => continue,
                Ok(envelope) => return Some(envelope.message),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(channel = self.name(), skipped, "Broadcast receiver lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}

/// Send-only half of a [`BroadcastChannel`]
#[derive(Clone)]
pub struct BroadcastPoster {
    site: Site,
    origin: Uuid,
    sender: broadcast::Sender<Envelope>,
}

impl BroadcastPoster {
    pub fn post(&self, action: BroadcastAction) {
        let envelope = Envelope {
            origin: self.origin,
            message: BroadcastMessage { action },
        };
        if self.sender.send(envelope).is_err() {
            tracing::trace!(channel = self.site.channel_name(), "Broadcast with no receivers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_skips_own_messages() {
        let hub = BroadcastHub::new();
        let mut a = hub.open(Site::YouTube, Uuid::new_v4());
        let mut b = hub.open(Site::YouTube, Uuid::new_v4());

        a.post(BroadcastAction::Enable);
        assert_eq!(a.try_recv(), None);
        assert_eq!(
            b.try_recv(),
            Some(BroadcastMessage {
                action: BroadcastAction::Enable
            })
        );
        assert_eq!(b.try_recv(), None);
    }

    #[test]
    fn test_channels_are_per_site() {
        let hub = BroadcastHub::new();
        let youtube = hub.open(Site::YouTube, Uuid::new_v4());
        let mut twitter = hub.open(Site::Twitter, Uuid::new_v4());

        youtube.post(BroadcastAction::Disable);
        assert_eq!(twitter.try_recv(), None);
        assert_eq!(youtube.name(), "dissatisfied-youtube");
        assert_eq!(twitter.name(), "dissatisfied-twitter");
    }

    #[test]
    fn test_post_without_members() {
        let hub = BroadcastHub::new();
        let poster = hub.open(Site::Twitter, Uuid::new_v4()).poster();
        poster.post(BroadcastAction::Enable);
    }

    #[tokio::test]
    async fn test_recv_from_poster() {
        let hub = BroadcastHub::new();
        let mut a = hub.open(Site::Twitter, Uuid::new_v4());
        let b = hub.open(Site::Twitter, Uuid::new_v4());
        b.poster().post(BroadcastAction::Disable);
        assert_eq!(
            a.recv().await.map(|m| m.action),
            Some(BroadcastAction::Disable)
        );
    }
}
