//! In-process change notifier on top of a tokio broadcast channel.
//!
//! Each subscriber sees only the events addressed to its user. A subscriber
//! that falls too far behind skips the missed events instead of blocking
//! publishers; clients recover by re-reading conversation state.

use crate::core::models::ChangeEvent;
use crate::core::traits::ChangeNotifier;
use di::{inject, injectable};
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use log::{debug, warn};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

const EVENT_BUFFER: usize = 1024;

pub struct BroadcastChangeNotifier {
    sender: broadcast::Sender<ChangeEvent>,
}

#[injectable(ChangeNotifier)]
impl BroadcastChangeNotifier {
    #[inject]
    pub fn create() -> BroadcastChangeNotifier {
        BroadcastChangeNotifier::with_capacity(EVENT_BUFFER)
    }
}

impl BroadcastChangeNotifier {
    pub fn with_capacity(capacity: usize) -> BroadcastChangeNotifier {
        let (sender, _) = broadcast::channel(capacity);
        BroadcastChangeNotifier { sender }
    }
}

impl ChangeNotifier for BroadcastChangeNotifier {
    fn publish(&self, event: ChangeEvent) {
        debug!(
            "Publishing {} to {}",
            event.change.name(),
            event.target_user_id
        );
        // No receivers just means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    fn subscribe(&self, user_id: Uuid) -> BoxStream<'static, ChangeEvent> {
        let mut receiver = self.sender.subscribe();

        async_stream::stream! {
            loop {
                match receiver.recv().await {
                    Ok(event) if event.target_user_id == user_id => yield event,
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Subscriber {user_id} lagged, skipped {skipped} events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
        .boxed()
    }
}
