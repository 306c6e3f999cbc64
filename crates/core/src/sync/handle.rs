use tokio::sync::{broadcast, mpsc, oneshot};

use super::controller::{SyncCommand, SyncMessage};
use super::{SyncError, SyncEvent, SyncStatus};
use crate::pokemon::PokemonRecord;

/// Handle for driving the sync controller
///
/// This is cheaply cloneable and can be shared across tasks.
/// Fire-and-forget commands are queued on the controller channel; failures
/// are reported through [`SyncEvent`]s and the log rather than to the caller.
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncMessage>,
    events: broadcast::Sender<SyncEvent>,
}

impl SyncHandle {
    pub(crate) fn new(tx: mpsc::Sender<SyncMessage>, events: broadcast::Sender<SyncEvent>) -> Self {
        Self { tx, events }
    }

    /// Fetch every catalog page not yet merged, resuming where the last run stopped.
    ///
    /// Does nothing once all pages are downloaded, or while the next page is
    /// already in flight.
    pub async fn sync_all_catalog(&self) {
        self.send(SyncCommand::SyncAllCatalog).await;
    }

    /// Fetch whatever `record` is missing next: details first, then the image.
    pub async fn start_next_download(&self, record: &PokemonRecord) {
        self.send(SyncCommand::StartNextDownload {
            name: record.name.clone(),
        })
        .await;
    }

    /// Fetch the image for `record` from its known image URL.
    pub async fn load_image(&self, record: &PokemonRecord) {
        self.send(SyncCommand::LoadImage {
            name: record.name.clone(),
        })
        .await;
    }

    /// Delete every record and forget pagination progress.
    ///
    /// Results of requests issued before the reset are discarded when they arrive.
    pub async fn reset_all(&self) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.request(SyncCommand::ResetAll { reply }).await?;
        rx.await.map_err(|_| SyncError::ControllerStopped)?
    }

    /// Current resume state and in-flight request counts.
    pub async fn status(&self) -> Result<SyncStatus, SyncError> {
        let (reply, rx) = oneshot::channel();
        self.request(SyncCommand::Status { reply }).await?;
        rx.await.map_err(|_| SyncError::ControllerStopped)?
    }

    /// Resolve once no request is in flight.
    pub async fn wait_idle(&self) -> Result<(), SyncError> {
        let (reply, rx) = oneshot::channel();
        self.request(SyncCommand::WhenIdle { reply }).await?;
        rx.await.map_err(|_| SyncError::ControllerStopped)
    }

    /// Subscribe to sync events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    async fn send(&self, command: SyncCommand) {
        if self.request(command).await.is_err() {
            tracing::error!("Failed to send sync command: controller is not running");
        }
    }

    async fn request(&self, command: SyncCommand) -> Result<(), SyncError> {
        self.tx
            .send(SyncMessage::Command(command))
            .await
            .map_err(|_| SyncError::ControllerStopped)
    }
}
