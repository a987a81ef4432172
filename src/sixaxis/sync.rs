use chrono::Local;
use statum::{machine, state};
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::sixaxis::event::{read_record, RawEventRecord};
use crate::sixaxis::state::ControllerState;

/// Byte stream the synchronizer pulls records from. In the real deployment
/// this is the kernel input device file; tests feed in-memory buffers.
pub type RecordStream = Box<dyn AsyncRead + Unpin + Send>;

// Synchronizer errors
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Failed to read input record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to broadcast controller state: {0}")]
    StateBroadcast(String),

    #[error("Failed to initialize synchronizer: {0}")]
    Initialization(String),
}

// Define synchronizer states using statum's state macro
#[state]
#[derive(Debug, Clone)]
pub enum SyncState {
    Initializing,
    Syncing,
}

#[machine]
pub struct StateSynchronizer<S: SyncState> {
    // Raw record source
    stream: RecordStream,

    // Live snapshot, mutated in place one field per record
    state: ControllerState,

    // Watch channel broadcasting point-in-time snapshot copies
    state_sender: watch::Sender<ControllerState>,
}

// Implementation of methods available in all states
impl<S: SyncState> StateSynchronizer<S> {
    // Get a receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state_sender.subscribe()
    }
}

// Implementation for Initializing state
impl StateSynchronizer<Initializing> {
    pub fn create(stream: RecordStream) -> Result<Self, SyncError> {
        debug!("Creating state synchronizer");

        let state = ControllerState::default();
        let (state_sender, _) = watch::channel(state.clone());
        debug!("Created watch channel for controller snapshots");

        Ok(Self::new(stream, state, state_sender))
    }

    // Transition into the syncing state
    pub fn initialize(self) -> Result<StateSynchronizer<Syncing>, SyncError> {
        info!("State synchronizer initialized, transitioning to Syncing state");
        Ok(self.transition())
    }
}

// Implementation for Syncing state
impl StateSynchronizer<Syncing> {
    /// Merges one decoded record into the snapshot and publishes a copy.
    fn apply(&mut self, record: &RawEventRecord) -> Result<(), SyncError> {
        self.state.apply(record);

        self.state_sender
            .send(self.state.clone())
            .map_err(|e| SyncError::StateBroadcast(e.to_string()))
    }

    /// Decode/apply loop. Runs until cancelled or until the stream dies;
    /// stream death is returned to the caller instead of swallowed so the
    /// host can tell a dead device from a quiet one.
    pub async fn run_sync_loop(&mut self, cancel: CancellationToken) -> Result<(), SyncError> {
        info!("Starting record sync loop");

        // Throughput stats
        let mut record_count: u64 = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(30);

        loop {
            let record = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Sync loop cancelled after {} records", record_count);
                    return Ok(());
                }
                result = read_record(&mut self.stream) => {
                    match result {
                        Ok(record) => record,
                        Err(e) => {
                            error!("Record stream failed: {}", e);
                            return Err(SyncError::Io(e));
                        }
                    }
                }
            };

            debug!(event = %record, at = ?record.timestamp(), "decoded record");
            self.apply(&record)?;
            record_count += 1;

            let now = Local::now();
            if now - last_log_time > log_interval {
                info!(
                    "Sync stats: {} records in last {} seconds, state: {}",
                    record_count,
                    (now - last_log_time).num_seconds(),
                    self.state
                );
                record_count = 0;
                last_log_time = now;
            }
        }
    }
}

/// Handle for the synchronizer task.
///
/// Spawns the decode/apply loop on its own tokio task and hands out watch
/// receivers so any number of readers can sample the snapshot at their own
/// cadence without touching the writer.
pub struct SyncHandle {
    state_receiver: watch::Receiver<ControllerState>,
    cancel: CancellationToken,
    task: JoinHandle<Result<(), SyncError>>,
}

impl SyncHandle {
    // Create a new synchronizer and spawn it as a tokio task
    pub fn spawn(stream: RecordStream) -> Result<Self, SyncError> {
        info!("Spawning state synchronizer");

        let synchronizer = StateSynchronizer::create(stream)?;
        let state_receiver = synchronizer.subscribe();

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            let mut syncing = synchronizer.initialize()?;
            let result = syncing.run_sync_loop(task_cancel).await;
            if let Err(e) = &result {
                error!("Synchronizer task terminated: {}", e);
            }
            result
        });

        info!("State synchronizer successfully started");
        Ok(Self {
            state_receiver,
            cancel,
            task,
        })
    }

    // Get a receiver for snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state_receiver.clone()
    }

    /// Whether the sync task has terminated, normally or otherwise. Lets a
    /// polling host notice stream death instead of sampling a stale snapshot
    /// forever.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    // Ask the sync loop to stop at the next decode boundary
    pub fn shutdown(&self) {
        debug!("Requesting synchronizer shutdown");
        self.cancel.cancel();
    }

    /// Waits for the task to finish and surfaces its terminal result.
    pub async fn wait(self) -> Result<(), SyncError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Synchronizer task panicked or was aborted: {}", e);
                Err(SyncError::Initialization(e.to_string()))
            }
        }
    }
}
