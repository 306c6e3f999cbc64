use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Url;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::merge::{apply_details, merge_catalog_page};
use super::{PendingRequests, SyncError, SyncEvent, SyncOperation, SyncOptions, SyncStatus};
use crate::metrics::{
    DUPLICATE_REQUESTS_SUPPRESSED, FETCH_DURATION, FETCH_REQUESTS, RECORDS_CREATED,
    RECORDS_HYDRATED,
};
use crate::pokeapi::{decode_details, decode_page, FetchError, Fetcher};
use crate::pokemon::{NextDownload, PokemonRecord};
use crate::store::{RecordStore, ResumeState};

/// Messages processed by the controller loop.
pub(crate) enum SyncMessage {
    Command(SyncCommand),
    Completed(FetchCompletion),
}

pub(crate) enum SyncCommand {
    SyncAllCatalog,
    StartNextDownload {
        name: String,
    },
    LoadImage {
        name: String,
    },
    ResetAll {
        reply: oneshot::Sender<Result<(), SyncError>>,
    },
    Status {
        reply: oneshot::Sender<Result<SyncStatus, SyncError>>,
    },
    WhenIdle {
        reply: oneshot::Sender<()>,
    },
}

/// What a finished fetch was for.
#[derive(Debug, Clone)]
enum FetchTarget {
    CatalogPage,
    Details { name: String },
    Image { name: String },
}

impl FetchTarget {
    fn operation(&self) -> SyncOperation {
        match self {
            FetchTarget::CatalogPage => SyncOperation::CatalogPage,
            FetchTarget::Details { .. } => SyncOperation::Details,
            FetchTarget::Image { .. } => SyncOperation::Image,
        }
    }
}

pub(crate) struct FetchCompletion {
    url: String,
    target: FetchTarget,
    generation: u64,
    elapsed: Duration,
    result: Result<Vec<u8>, FetchError>,
}

/// Single owner of the sync state.
///
/// Commands and fetch completions arrive on one channel and are handled one
/// at a time, so the pending set, the resume state and every record merge
/// are only ever touched from this loop. Fetches themselves run in spawned
/// tasks and report back through the same channel.
pub struct SyncController {
    options: SyncOptions,
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn Fetcher>,
    rx: mpsc::Receiver<SyncMessage>,
    tx: mpsc::WeakSender<SyncMessage>,
    events: broadcast::Sender<SyncEvent>,
    pending: PendingRequests,
    /// Bumped on reset; completions tagged with an older value are discarded.
    generation: u64,
    /// Set by a catalog sync request, cleared by reset.
    catalog_requested: bool,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl SyncController {
    pub(crate) fn new(
        options: SyncOptions,
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn Fetcher>,
        rx: mpsc::Receiver<SyncMessage>,
        tx: mpsc::WeakSender<SyncMessage>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        Self {
            options,
            store,
            fetcher,
            rx,
            tx,
            events,
            pending: PendingRequests::new(),
            generation: 0,
            catalog_requested: false,
            idle_waiters: Vec::new(),
        }
    }

    /// Run the controller until every handle is dropped and no fetch is outstanding.
    ///
    /// This should be spawned as a background task.
    pub async fn run(mut self) {
        info!("Sync controller started");

        while let Some(message) = self.rx.recv().await {
            match message {
                SyncMessage::Command(command) => self.handle_command(command),
                SyncMessage::Completed(completion) => self.handle_completion(completion),
            }

            if self.pending.is_empty() {
                for waiter in self.idle_waiters.drain(..) {
                    let _ = waiter.send(());
                }
            }
        }

        info!("Sync controller shutting down");
    }

    fn handle_command(&mut self, command: SyncCommand) {
        match command {
            SyncCommand::SyncAllCatalog => {
                self.catalog_requested = true;
                self.sync_all_catalog();
            }
            SyncCommand::StartNextDownload { name } => self.start_next_download(&name),
            SyncCommand::LoadImage { name } => self.load_image(&name),
            SyncCommand::ResetAll { reply } => {
                let _ = reply.send(self.reset_all());
            }
            SyncCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            SyncCommand::WhenIdle { reply } => self.idle_waiters.push(reply),
        }
    }

    // =========================================================================
    // Request issuing
    // =========================================================================

    fn sync_all_catalog(&mut self) {
        let state = match self.store.resume().load() {
            Ok(state) => state,
            Err(e) => {
                error!("Cannot read resume state: {}", e);
                return;
            }
        };

        if state.all_pages_downloaded {
            debug!("All catalog pages already downloaded");
            return;
        }

        let url = match state.next_page_url {
            Some(next) => match Url::parse(&next) {
                Ok(url) => url,
                Err(e) => {
                    error!(url = %next, "Cannot parse stored catalog page URL: {}", e);
                    return;
                }
            },
            None => self.options.first_page_url.clone(),
        };

        self.begin_fetch(url, FetchTarget::CatalogPage);
    }

    fn start_next_download(&mut self, name: &str) {
        let Some(record) = self.lookup(name) else {
            return;
        };

        match record.next_download() {
            NextDownload::None => debug!(name, "Record is complete, nothing to download"),
            NextDownload::Details => self.fetch_details(&record),
            NextDownload::Image => self.fetch_image(&record),
        }
    }

    fn load_image(&mut self, name: &str) {
        if let Some(record) = self.lookup(name) {
            self.fetch_image(&record);
        }
    }

    fn lookup(&self, name: &str) -> Option<PokemonRecord> {
        match self.store.find_by_name(name) {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                debug!(name, "No cached record with this name");
                None
            }
            Err(e) => {
                error!(name, "Cannot read record: {}", e);
                None
            }
        }
    }

    fn fetch_details(&mut self, record: &PokemonRecord) {
        match Url::parse(&record.detail_url) {
            Ok(url) => self.begin_fetch(
                url,
                FetchTarget::Details {
                    name: record.name.clone(),
                },
            ),
            Err(_) => self.report_failure(
                &record.detail_url,
                SyncOperation::Details,
                &SyncError::InvalidUrl(record.detail_url.clone()),
            ),
        }
    }

    fn fetch_image(&mut self, record: &PokemonRecord) {
        let Some(ref image_url) = record.image_url else {
            debug!(name = %record.name, "No image URL known yet");
            return;
        };

        match Url::parse(image_url) {
            Ok(url) => self.begin_fetch(
                url,
                FetchTarget::Image {
                    name: record.name.clone(),
                },
            ),
            Err(_) => self.report_failure(
                image_url,
                SyncOperation::Image,
                &SyncError::InvalidUrl(image_url.clone()),
            ),
        }
    }

    /// Register `url` as in flight and fetch it in a background task.
    fn begin_fetch(&mut self, url: Url, target: FetchTarget) {
        let operation = target.operation();

        if !self.pending.try_begin(url.as_str(), operation) {
            debug!(%url, %operation, "Request already in flight");
            DUPLICATE_REQUESTS_SUPPRESSED
                .with_label_values(&[operation.as_str()])
                .inc();
            return;
        }

        // Upgrade fails only while the loop is draining after the last handle dropped.
        let Some(tx) = self.tx.upgrade() else {
            debug!(%url, "Controller is shutting down, not starting request");
            self.pending.finish(url.as_str());
            return;
        };

        info!(%url, %operation, "Starting download");
        let fetcher = Arc::clone(&self.fetcher);
        let generation = self.generation;

        tokio::spawn(async move {
            let started = Instant::now();
            let result = fetcher.fetch(&url).await;
            let completion = FetchCompletion {
                url: url.to_string(),
                target,
                generation,
                elapsed: started.elapsed(),
                result,
            };
            if tx.send(SyncMessage::Completed(completion)).await.is_err() {
                debug!("Sync controller gone, dropping fetch result");
            }
        });
    }

    // =========================================================================
    // Completions
    // =========================================================================

    fn handle_completion(&mut self, completion: FetchCompletion) {
        let FetchCompletion {
            url,
            target,
            generation,
            elapsed,
            result,
        } = completion;
        let operation = target.operation();

        self.pending.finish(&url);

        let status = if result.is_ok() { "success" } else { "error" };
        FETCH_REQUESTS
            .with_label_values(&[operation.as_str(), status])
            .inc();
        FETCH_DURATION
            .with_label_values(&[operation.as_str()])
            .observe(elapsed.as_secs_f64());

        if generation != self.generation {
            debug!(%url, %operation, "Discarding result of a request issued before reset");
            if matches!(target, FetchTarget::CatalogPage) && self.catalog_requested {
                self.sync_all_catalog();
            }
            return;
        }

        let outcome = match target {
            FetchTarget::CatalogPage => self.complete_page(&url, result),
            FetchTarget::Details { name } => self.complete_details(&name, &url, result),
            FetchTarget::Image { name } => self.complete_image(&name, &url, result),
        };

        if let Err(e) = outcome {
            self.report_failure(&url, operation, &e);
        }
    }

    fn complete_page(
        &mut self,
        url: &str,
        result: Result<Vec<u8>, FetchError>,
    ) -> Result<(), SyncError> {
        let body = result?;
        let page = decode_page(url, &body)?;

        let summary = merge_catalog_page(self.store.as_ref(), &page.entries)?;
        RECORDS_CREATED.inc_by(summary.created as u64);
        info!(
            url,
            created = summary.created,
            existing = summary.existing,
            skipped = summary.skipped,
            "Merged catalog page"
        );

        let state = match page.next_url {
            Some(ref next) => ResumeState::at_page(next.clone()),
            None => ResumeState::complete(),
        };
        self.store.resume().save(&state).map_err(SyncError::store_write)?;

        self.emit(SyncEvent::PageSaved {
            url: url.to_string(),
            created: summary.created,
            next_url: page.next_url,
        });

        if state.all_pages_downloaded {
            info!("Downloaded all catalog pages");
            self.emit(SyncEvent::CatalogComplete);
        } else {
            self.sync_all_catalog();
        }

        Ok(())
    }

    fn complete_details(
        &mut self,
        name: &str,
        url: &str,
        result: Result<Vec<u8>, FetchError>,
    ) -> Result<(), SyncError> {
        let body = result?;
        let details = decode_details(url, &body)?;

        let Some(mut record) = self.store.find_by_name(name).map_err(SyncError::store_read)?
        else {
            debug!(name, "Record no longer cached, dropping details");
            return Ok(());
        };

        apply_details(&mut record, &details);
        self.store.insert(record).map_err(SyncError::store_write)?;
        self.store.save_all().map_err(SyncError::store_write)?;

        RECORDS_HYDRATED.with_label_values(&["details"]).inc();
        info!(name, "Saved details");
        self.emit(SyncEvent::DetailsSaved {
            name: name.to_string(),
        });

        Ok(())
    }

    fn complete_image(
        &mut self,
        name: &str,
        url: &str,
        result: Result<Vec<u8>, FetchError>,
    ) -> Result<(), SyncError> {
        let bytes = result?;
        if bytes.is_empty() {
            return Err(SyncError::NoData(url.to_string()));
        }

        let Some(mut record) = self.store.find_by_name(name).map_err(SyncError::store_read)?
        else {
            debug!(name, "Record no longer cached, dropping image");
            return Ok(());
        };

        record.image_bytes = Some(bytes);
        self.store.insert(record).map_err(SyncError::store_write)?;
        self.store.save_all().map_err(SyncError::store_write)?;

        RECORDS_HYDRATED.with_label_values(&["image"]).inc();
        info!(name, "Saved image");
        self.emit(SyncEvent::ImageSaved {
            name: name.to_string(),
        });

        Ok(())
    }

    // =========================================================================
    // Reset and status
    // =========================================================================

    fn reset_all(&mut self) -> Result<(), SyncError> {
        self.generation += 1;
        self.catalog_requested = false;

        match self.store.reset_all().map_err(SyncError::store_write) {
            Ok(()) => {
                info!("Deleted all records and cleared resume state");
                self.emit(SyncEvent::Reset);
                Ok(())
            }
            Err(e) => {
                error!("Reset failed: {}", e);
                Err(e)
            }
        }
    }

    fn status(&self) -> Result<SyncStatus, SyncError> {
        let resume = self.store.resume().load().map_err(SyncError::store_read)?;
        Ok(SyncStatus {
            resume,
            pending_requests: self.pending.len(),
            pending_catalog_pages: self.pending.count(SyncOperation::CatalogPage),
            pending_details: self.pending.count(SyncOperation::Details),
            pending_images: self.pending.count(SyncOperation::Image),
        })
    }

    fn report_failure(&self, url: &str, operation: SyncOperation, err: &SyncError) {
        if err.is_store_error() {
            error!(url, %operation, "Request failed: {}", err);
        } else {
            warn!(url, %operation, "Request failed: {}", err);
        }
        self.emit(SyncEvent::RequestFailed {
            url: url.to_string(),
            operation,
            error: err.to_string(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
