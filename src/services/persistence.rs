//! Debounced leaderboard persistence worker.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    dao::{leaderboard_store::LeaderboardStore, models::PersistedLeaderboard},
    state::SharedState,
};

/// Watch the dirty generation and flush the leaderboard after a quiet period.
///
/// Mutations only bump a counter; this worker absorbs bursts so several games
/// finishing together produce a single write.
pub async fn run(state: SharedState, store: Arc<dyn LeaderboardStore>) {
    let debounce = Duration::from_millis(state.config.persist_debounce_ms);
    let mut watcher = state.dirty_watcher();
    // The generation counter starts at zero and only ever grows.
    let mut flushed_generation = 0u64;

    loop {
        // A mutation can land before this task is first polled; the fresh
        // subscription counts it as already seen, so compare the generation
        // against the last flush instead of trusting `changed()` alone.
        if *watcher.borrow_and_update() == flushed_generation
            && watcher.changed().await.is_err()
        {
            break;
        }
        // Keep extending the quiet period while more mutations arrive.
        loop {
            let quiet = tokio::select! {
                changed = watcher.changed() => changed.is_err(),
                _ = sleep(debounce) => true,
            };
            if quiet {
                break;
            }
        }
        flushed_generation = *watcher.borrow_and_update();
        flush(&state, store.as_ref()).await;
    }
    debug!("persistence worker stopped");
}

/// Flush immediately, bypassing the debounce. Used at shutdown.
pub async fn force_save(state: &SharedState, store: &dyn LeaderboardStore) {
    flush(state, store).await;
}

async fn flush(state: &SharedState, store: &dyn LeaderboardStore) {
    let snapshot = {
        let board = state.leaderboard.lock().await;
        PersistedLeaderboard::snapshot(&board)
    };
    if let Err(err) = store.save(snapshot).await {
        warn!(error = %err, "failed to persist leaderboard");
    }
}
