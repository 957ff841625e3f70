//! Stream relay - a publish/subscribe hub for live response fragments.
//!
//! Channels are keyed by session/room or listener id. Publishers are
//! concurrent provider units that never coordinate beyond tagging their
//! fragments; subscribers demultiplex by the tag. Within one publisher
//! fragments arrive in publish order; across publishers no order is
//! guaranteed.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const CHANNEL_CAPACITY: usize = 256;

/// One relayed piece of streamed output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub content: String,
    /// Set on fan-out traffic so subscribers can demultiplex; absent when a
    /// single provider owns the channel.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Broadcast hub with per-channel senders, created lazily.
pub struct StreamRelay {
    channels: DashMap<String, broadcast::Sender<Fragment>>,
}

impl Default for StreamRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamRelay {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<Fragment> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publish a fragment to every current subscriber of the channel.
    ///
    /// Returns the number of subscribers that received it; publishing into
    /// an unobserved channel is not an error.
    pub fn publish(&self, channel: &str, fragment: Fragment) -> usize {
        self.sender(channel).send(fragment).unwrap_or(0)
    }

    /// Subscribe to a channel. Fragments published after this call are
    /// delivered in publish order; slow subscribers may observe a gap.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Fragment> {
        self.sender(channel).subscribe()
    }

    /// Drop a channel's sender once its stream is over and nobody listens.
    pub fn release_if_idle(&self, channel: &str) {
        self.channels
            .remove_if(channel, |_, sender| sender.receiver_count() == 0);
    }

    /// Spawn a paced publisher for one stream of fragments.
    ///
    /// The returned handle accepts fragments without blocking; a background
    /// task relays them with the pacing delay between publishes. This keeps
    /// the throttle from ever stalling response accumulation on the caller's
    /// side.
    pub fn paced_publisher(
        self: &Arc<Self>,
        channel: &str,
        provider: Option<String>,
        pacing: Duration,
    ) -> PacedPublisher {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let relay = self.clone();
        let channel = channel.to_string();

        let handle = tokio::spawn(async move {
            while let Some(content) = rx.recv().await {
                relay.publish(
                    &channel,
                    Fragment {
                        content,
                        provider: provider.clone(),
                    },
                );
                tokio::time::sleep(pacing).await;
            }
            relay.release_if_idle(&channel);
        });

        PacedPublisher { tx, handle }
    }
}

/// Handle feeding a paced relay task; dropping the handle (or calling
/// [`PacedPublisher::finish`]) flushes the remaining fragments.
pub struct PacedPublisher {
    tx: mpsc::UnboundedSender<String>,
    handle: JoinHandle<()>,
}

impl PacedPublisher {
    /// Queue a fragment for relay. Never blocks.
    pub fn send(&self, content: impl Into<String>) {
        let _ = self.tx.send(content.into());
    }

    /// Close the stream and wait until every queued fragment was published.
    pub async fn finish(self) {
        drop(self.tx);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_subscribe_in_order() {
        let relay = StreamRelay::new();
        let mut rx = relay.subscribe("room-1");

        relay.publish(
            "room-1",
            Fragment {
                content: "a".to_string(),
                provider: None,
            },
        );
        relay.publish(
            "room-1",
            Fragment {
                content: "b".to_string(),
                provider: Some("claude".to_string()),
            },
        );

        assert_eq!(rx.recv().await.unwrap().content, "a");
        let second = rx.recv().await.unwrap();
        assert_eq!(second.content, "b");
        assert_eq!(second.provider.as_deref(), Some("claude"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let relay = StreamRelay::new();
        let delivered = relay.publish(
            "empty-room",
            Fragment {
                content: "x".to_string(),
                provider: None,
            },
        );
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_channels_are_isolated() {
        let relay = StreamRelay::new();
        let mut rx_a = relay.subscribe("a");
        let mut rx_b = relay.subscribe("b");

        relay.publish(
            "a",
            Fragment {
                content: "only-a".to_string(),
                provider: None,
            },
        );

        assert_eq!(rx_a.recv().await.unwrap().content, "only-a");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_paced_publisher_flushes_on_finish() {
        let relay = Arc::new(StreamRelay::new());
        let mut rx = relay.subscribe("room-1");

        let publisher = relay.paced_publisher("room-1", Some("claude".to_string()), Duration::from_millis(1));
        publisher.send("one");
        publisher.send("two");
        publisher.finish().await;

        assert_eq!(rx.recv().await.unwrap().content, "one");
        assert_eq!(rx.recv().await.unwrap().content, "two");
    }
}
