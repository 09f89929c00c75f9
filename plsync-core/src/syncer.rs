//! `/sync` event feed driving the sync engine

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    client::{MatrixClient, SyncResponse},
    config::SyncConfig,
    models::RoomEvent,
    service::{Command, SyncEngine},
    Error,
};

pub struct Syncer {
    client: Arc<MatrixClient>,
    engine: Arc<SyncEngine>,
    timeout_ms: u64,
    retry_delay: Duration,
}

impl Syncer {
    pub fn new(client: Arc<MatrixClient>, engine: Arc<SyncEngine>, config: &SyncConfig) -> Self {
        Self {
            client,
            engine,
            timeout_ms: config.timeout_ms,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
        }
    }

    /// Long-poll `/sync` until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// The first response only establishes the stream position: events from
    /// before startup are not replayed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut since: Option<String> = None;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let timeout_ms = if since.is_some() { self.timeout_ms } else { 0 };
            let result = tokio::select! {
                result = self.client.sync(since.as_deref(), timeout_ms) => result,
                _ = shutdown.changed() => break,
            };

            match result {
                Ok(response) => {
                    let next_batch = response.next_batch.clone();
                    if since.is_some() {
                        self.process_batch(response).await;
                    } else {
                        info!(next_batch = %next_batch, "Initial sync complete");
                    }
                    since = Some(next_batch);
                }
                Err(e) => {
                    warn!(error = %e, retry_in = ?self.retry_delay, "Sync failed");
                    tokio::select! {
                        () = tokio::time::sleep(self.retry_delay) => {}
                        _ = shutdown.changed() => break,
                    }
                }
            }
        }

        info!("Sync loop stopped");
    }

    /// Dispatch every event of one sync batch in order. Returns the number of events seen.
    pub async fn process_batch(&self, response: SyncResponse) -> usize {
        let events = response.into_room_events();
        let count = events.len();
        for event in events {
            self.dispatch(event).await;
        }
        count
    }

    /// Route a single event to the engine. Failures are logged, never fatal.
    pub async fn dispatch(&self, event: RoomEvent) {
        let result = match event {
            RoomEvent::PowerLevels(event) => {
                let outcome = self.engine.on_power_levels(&event).await;
                debug!(room_id = %event.room_id, outcome = ?outcome, "Power levels observed");
                Ok(())
            }
            RoomEvent::Membership(event) => self
                .engine
                .on_membership(&event)
                .await
                .map(|outcome| debug!(room_id = %event.room_id, outcome = ?outcome, "Membership handled")),
            RoomEvent::Message(event) => {
                if &event.sender == self.engine.self_identity() {
                    return;
                }
                let prefix = &self.engine.settings().command_prefix;
                let outcome = match Command::from_message(prefix, &event.body) {
                    None => return,
                    Some(Ok(command)) => self.engine.handle_command(&event, &command).await,
                    Some(Err(e)) => self.engine.reject_command(&event, &e).await,
                };
                outcome.map(|outcome| {
                    info!(room_id = %event.room_id, outcome = ?outcome, "Command handled");
                })
            }
        };

        if let Err(e) = result {
            log_failure(&e);
        }
    }
}

fn log_failure(err: &Error) {
    if err.is_remote() {
        warn!(error = %err, "Homeserver request failed while handling event");
    } else {
        error!(error = %err, "Failed to handle event");
    }
}
