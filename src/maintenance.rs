//! Background reconciliation of orphaned chapters
//!
//! Store writes are transactional, so new orphans should not appear. The
//! sweep exists for data written before the cascade was transactional and
//! for databases edited by hand.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::database::Store;

/// Runs [`Store::sweep_orphans`] every `every` until the task is aborted
pub fn spawn_orphan_sweep(store: Store, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match store.sweep_orphans() {
                Ok(report) if report.orphan_chapters + report.dangling_index_entries > 0 => {
                    tracing::warn!(
                        orphan_chapters = report.orphan_chapters,
                        dangling_index_entries = report.dangling_index_entries,
                        "orphan sweep removed stale records"
                    );
                }
                Ok(_) => tracing::debug!("orphan sweep found nothing"),
                Err(err) => tracing::error!(error = %err, "orphan sweep failed"),
            }
        }
    })
}
