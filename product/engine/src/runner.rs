use crate::backend::MediaBackend;
use crate::catalog::QualityCatalog;
use crate::events::{emit, EventSender, UiEvent};
use crate::format::FormatChoice;
use crate::history::{HistoryStore, JobOutcome};
use crate::progress::{ProgressSnapshot, ProgressTranslator};
use crate::request::{DownloadSettings, MediaRequest};
use crate::resolver::{resolve, BackendOptions};
use crate::{EngineError, Result};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Idle,
    Running {
        batch_id: String,
        total: usize,
        current: usize,
    },
    Failed {
        batch_id: String,
        failed: usize,
        total: usize,
    },
}

impl BatchState {
    pub fn is_running(&self) -> bool {
        matches!(self, BatchState::Running { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Batch {
    pub urls: Vec<String>,
    pub options: BackendOptions,
    pub destination_dir: PathBuf,
    pub format: FormatChoice,
    pub quality: String,
}

impl Batch {
    pub fn from_request(request: &MediaRequest, options: BackendOptions) -> Self {
        Self {
            urls: request.urls().to_vec(),
            options,
            destination_dir: request.destination_dir.clone(),
            format: request.format,
            quality: request.quality.clone(),
        }
    }
}

pub struct BatchHandle {
    pub batch_id: String,
    handle: JoinHandle<Vec<JobOutcome>>,
}

impl BatchHandle {
    pub fn join(self) -> Vec<JobOutcome> {
        self.handle.join().unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct BatchController {
    backend: Arc<dyn MediaBackend>,
    history: HistoryStore,
    events: EventSender,
    state: Arc<Mutex<BatchState>>,
}

impl BatchController {
    pub fn new(backend: Arc<dyn MediaBackend>, history: HistoryStore, events: EventSender) -> Self {
        Self {
            backend,
            history,
            events,
            state: Arc::new(Mutex::new(BatchState::Idle)),
        }
    }

    pub fn state(&self) -> BatchState {
        self.state.lock().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().is_running()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn start(&self, request: &MediaRequest, catalog: &QualityCatalog) -> Result<BatchHandle> {
        if self.is_busy() {
            return Err(EngineError::BatchInProgress);
        }
        let options = resolve(request, catalog)?;
        self.start_batch(Batch::from_request(request, options))
    }

    pub fn replay(
        &self,
        outcome: &JobOutcome,
        settings: &DownloadSettings,
        catalog: &QualityCatalog,
    ) -> Result<BatchHandle> {
        let request = settings.request(vec![outcome.url.clone()])?;
        self.start(&request, catalog)
    }

    pub fn start_batch(&self, batch: Batch) -> Result<BatchHandle> {
        if batch.urls.is_empty() {
            return Err(EngineError::EmptyUrlList);
        }
        let batch_id = Uuid::new_v4().to_string();
        {
            let mut state = self.state.lock();
            if state.is_running() {
                return Err(EngineError::BatchInProgress);
            }
            *state = BatchState::Running {
                batch_id: batch_id.clone(),
                total: batch.urls.len(),
                current: 0,
            };
        }

        tracing::info!(%batch_id, urls = batch.urls.len(), format = %batch.format, quality = %batch.quality, "batch started");
        emit(
            &self.events,
            UiEvent::BatchStarted {
                batch_id: batch_id.clone(),
                total: batch.urls.len(),
            },
        );

        let worker = self.clone();
        let worker_batch_id = batch_id.clone();
        let handle = thread::spawn(move || {
            let mut guard = RunningGuard {
                state: worker.state.clone(),
                events: worker.events.clone(),
                batch_id: worker_batch_id.clone(),
                total: batch.urls.len(),
                done: false,
            };
            let outcomes = run_batch(
                worker.backend.as_ref(),
                &worker.history,
                &batch,
                &worker_batch_id,
                &worker.events,
                |index| worker.set_current(&worker_batch_id, index),
            );
            let failed = outcomes.iter().filter(|o| !o.is_success()).count();
            guard.finish(failed);
            tracing::info!(batch_id = %worker_batch_id, succeeded = outcomes.len() - failed, failed, "batch finished");
            emit(
                &worker.events,
                UiEvent::BatchFinished {
                    batch_id: worker_batch_id,
                    succeeded: outcomes.len() - failed,
                    failed,
                },
            );
            outcomes
        });

        Ok(BatchHandle { batch_id, handle })
    }

    fn set_current(&self, batch_id: &str, index: usize) {
        let mut state = self.state.lock();
        if let BatchState::Running {
            batch_id: running,
            current,
            ..
        } = &mut *state
        {
            if running == batch_id {
                *current = index;
            }
        }
    }
}

/// Leaves the controller out of `Running` even if the worker unwinds.
struct RunningGuard {
    state: Arc<Mutex<BatchState>>,
    events: EventSender,
    batch_id: String,
    total: usize,
    done: bool,
}

impl RunningGuard {
    fn finish(&mut self, failed: usize) {
        let mut state = self.state.lock();
        *state = if failed == 0 {
            BatchState::Idle
        } else {
            BatchState::Failed {
                batch_id: self.batch_id.clone(),
                failed,
                total: self.total,
            }
        };
        self.done = true;
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if !self.done {
            tracing::error!(batch_id = %self.batch_id, "batch worker stopped early");
            *self.state.lock() = BatchState::Failed {
                batch_id: self.batch_id.clone(),
                failed: self.total,
                total: self.total,
            };
            emit(
                &self.events,
                UiEvent::BatchFinished {
                    batch_id: self.batch_id.clone(),
                    succeeded: 0,
                    failed: self.total,
                },
            );
        }
    }
}

pub fn run_batch(
    backend: &dyn MediaBackend,
    history: &HistoryStore,
    batch: &Batch,
    batch_id: &str,
    events: &EventSender,
    mut on_item: impl FnMut(usize),
) -> Vec<JobOutcome> {
    let mut outcomes = Vec::with_capacity(batch.urls.len());

    for (index, url) in batch.urls.iter().enumerate() {
        on_item(index);
        emit(
            events,
            UiEvent::ItemStarted {
                batch_id: batch_id.to_string(),
                index,
                url: url.clone(),
            },
        );
        emit(events, UiEvent::Progress(ProgressSnapshot::started()));

        let options = batch.options.for_destination(&batch.destination_dir);
        let mut translator = ProgressTranslator::new();
        let result = backend.download(url, &options, &mut |raw| {
            if let Some(snapshot) = translator.translate(&raw) {
                emit(events, UiEvent::Progress(snapshot));
            }
        });

        let outcome = match result {
            Ok(()) => {
                tracing::info!(%url, "download finished");
                emit(events, UiEvent::Progress(ProgressSnapshot::finished()));
                JobOutcome::success(url, &batch.destination_dir, batch.format, &batch.quality)
            }
            Err(e) => {
                tracing::warn!(%url, "download failed: {e}");
                JobOutcome::failed(
                    url,
                    &batch.destination_dir,
                    batch.format,
                    &batch.quality,
                    backend_error_text(&e),
                )
            }
        };

        if let Err(e) = history.append(outcome.clone()) {
            tracing::warn!(path = %history.path().display(), "history write skipped: {e}");
        }
        emit(events, UiEvent::ItemFinished(outcome.clone()));
        outcomes.push(outcome);
    }

    outcomes
}

fn backend_error_text(err: &EngineError) -> String {
    match err {
        EngineError::ExternalToolFailed { stderr, .. } => stderr.clone(),
        other => other.to_string(),
    }
}
