use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::socket::Subscription;
use super::{LiveEvent, MatchList};
use crate::api::LiveFeed;

const LOAD_FAILED: &str = "Failed to load live matches";

/// Liveness flag shared between a view and its in-flight work. Once closed,
/// late results must be dropped instead of applied.
#[derive(Debug, Clone)]
pub struct ViewGuard {
    alive: Arc<watch::Sender<bool>>,
}

impl Default for ViewGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewGuard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(true);
        ViewGuard { alive: Arc::new(tx) }
    }

    pub fn is_alive(&self) -> bool {
        *self.alive.borrow()
    }

    pub fn close(&self) {
        self.alive.send_replace(false);
    }

    /// Resolves once `close` has been called on any clone.
    pub async fn closed(&self) {
        let mut rx = self.alive.subscribe();
        let _ = rx.wait_for(|alive| !*alive).await;
    }
}

async fn next_event(events: &mut Option<Subscription>) -> Option<LiveEvent> {
    match events {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}

/// Drive the live match view until `guard` is closed.
///
/// The list is loaded immediately and re-polled every `refresh_every`; push
/// events patch it in between. `render` gets the current list and, after a
/// failed load, the message to show next to the (unchanged) previous list.
pub async fn watch_live<F, R>(
    feed: &F,
    mut events: Option<Subscription>,
    refresh_every: Duration,
    guard: ViewGuard,
    mut render: R,
) -> MatchList
where
    F: LiveFeed + ?Sized,
    R: FnMut(&MatchList, Option<&str>),
{
    let mut list = MatchList::default();
    let mut ticker = tokio::time::interval(refresh_every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    info!(
        "Watching live matches (refresh every {}s, push {})",
        refresh_every.as_secs(),
        if events.is_some() { "on" } else { "off" }
    );

    loop {
        let mut channel_closed = false;

        tokio::select! {
            _ = guard.closed() => break,
            _ = ticker.tick() => {
                let result = tokio::select! {
                    biased;
                    _ = guard.closed() => {
                        debug!("Live view closed, abandoning refresh");
                        break;
                    }
                    result = feed.fetch_live() => result,
                };
                if !guard.is_alive() {
                    debug!("Live view closed during refresh, dropping result");
                    break;
                }
                match result {
                    Ok(matches) => {
                        debug!("Live refresh: {} match(es)", matches.len());
                        list.replace_all(matches);
                        render(&list, None);
                    }
                    Err(e) => {
                        warn!("Live refresh failed: {}", e);
                        render(&list, Some(&e.user_message(LOAD_FAILED)));
                    }
                }
            }
            event = next_event(&mut events) => match event {
                Some(event) => {
                    if list.apply(&event) {
                        debug!("Applied {}", event.topic());
                        render(&list, None);
                    }
                }
                None => channel_closed = true,
            },
        }

        if channel_closed {
            warn!("Real-time channel closed, continuing with polling only");
            events = None;
        }
    }

    list
}
