//! Best-effort outbound sync
//!
//! A depth-one, latest-value-wins slot drained on a fixed interval. Each drained patch goes
//! out on its own task; failures are logged and forgotten because the next one supersedes it.

use std::time::Duration;

use log::debug;
use proto::RoomPatch;
use room_store::SharedStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Publisher {
    slot: watch::Sender<Option<RoomPatch>>,
    task: JoinHandle<()>,
}

impl Publisher {
    /// Start draining writes for `key` every `every`. Must be called inside a tokio runtime.
    pub fn spawn<S: SharedStore>(store: S, key: String, every: Duration) -> Self {
        let (slot, mut rx) = watch::channel(None::<RoomPatch>);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match rx.has_changed() {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(_) => break,
                }
                let Some(patch) = rx.borrow_and_update().clone() else {
                    continue;
                };

                let store = store.clone();
                let key = key.clone();
                tokio::spawn(async move {
                    if let Err(e) = store.update_best_effort(&key, patch).await {
                        debug!("Sync write to {key} failed: {e}");
                    }
                });
            }
        });

        Self { slot, task }
    }

    /// Replace whatever is waiting with `patch`
    pub fn offer(&self, patch: RoomPatch) {
        self.slot.send_replace(Some(patch));
    }
}

impl Drop for Publisher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
