use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use droidscope_adb::{BridgeError, DeviceBridge};

/// Why a pid table refresh was rejected
#[derive(Debug, thiserror::Error)]
pub enum PidTableError {
    #[error("process listing failed: {0}")]
    Query(#[from] BridgeError),

    #[error("process listing is empty")]
    Empty,

    #[error("unexpected process listing header: {header:?}")]
    HeaderMismatch { header: String },
}

/// Latest pid → process name mapping for the connected device.
///
/// The map is only ever replaced whole, so lookups see either the previous
/// or the next table and never a mix of the two.
pub struct PidTable {
    snapshot: ArcSwap<HashMap<String, String>>,
}

impl PidTable {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwap::from_pointee(HashMap::new()),
        }
    }

    /// Process name for a pid, if the last refresh saw it
    pub fn name_for(&self, pid: &str) -> Option<String> {
        self.snapshot.load().get(pid).cloned()
    }

    /// Swap in a new table
    pub fn replace(&self, table: HashMap<String, String>) {
        self.snapshot.store(Arc::new(table));
    }

    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a process listing and swap it in; on error the old table stays
    pub fn refresh_from(&self, listing: &str) -> Result<usize, PidTableError> {
        let table = parse_process_listing(listing)?;
        let count = table.len();
        self.replace(table);
        Ok(count)
    }

    /// Query the bridge once and refresh from its output
    pub async fn refresh<B: DeviceBridge>(&self, bridge: &B) -> Result<usize, PidTableError> {
        let listing = bridge.list_processes().await?;
        self.refresh_from(&listing)
    }
}

impl Default for PidTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PidTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PidTable").field("len", &self.len()).finish()
    }
}

/// Parse `ps` output into a pid → name map.
///
/// The header's second column must be `PID` and its last column `NAME`.
/// Rows take the pid from the second column and the name from the last.
pub fn parse_process_listing(listing: &str) -> Result<HashMap<String, String>, PidTableError> {
    let mut lines = listing.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or(PidTableError::Empty)?;
    let columns: Vec<&str> = header.split_whitespace().collect();
    if columns.get(1) != Some(&"PID") || columns.last() != Some(&"NAME") {
        return Err(PidTableError::HeaderMismatch {
            header: header.trim().to_string(),
        });
    }

    let mut table = HashMap::new();
    for line in lines {
        let cols: Vec<&str> = line.split_whitespace().collect();
        // A row needs a user, a pid and a name
        if cols.len() < 3 {
            continue;
        }
        table.insert(cols[1].to_string(), cols[cols.len() - 1].to_string());
    }

    Ok(table)
}

/// Spawn the periodic refresh loop.
///
/// The first refresh runs immediately. Failures are logged and the previous
/// table is kept until the next tick. The loop ends only when `cancel` fires.
pub fn spawn_pid_refresher<B: DeviceBridge>(
    bridge: Arc<B>,
    table: Arc<PidTable>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = table.refresh(bridge.as_ref()) => match result {
                    Ok(count) => tracing::trace!(pid_count = count, "pid table refreshed"),
                    Err(e) => tracing::warn!(error = %e, "pid table refresh failed, keeping previous table"),
                },
            }
        }

        tracing::debug!("pid refresher stopped");
    })
}
