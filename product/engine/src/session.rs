use crate::backend::MediaBackend;
use crate::catalog::QualityCatalog;
use crate::events::{self, emit, EventReceiver, EventSender, UiEvent};
use crate::format::{FormatChoice, MediaKind, BEST_LABEL};
use crate::history::{HistoryStore, JobOutcome};
use crate::probe::{spawn_probe, DETECTING_STATUS, READY_STATUS};
use crate::request::{DownloadSettings, MediaRequest, SubtitleRequest};
use crate::runner::{BatchController, BatchHandle, BatchState};
use crate::update::{self, UpdateCheck, LOCAL_VERSION};
use crate::{EngineError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

pub const STARTING_STATUS: &str = "Starting download...";
pub const COMPLETED_STATUS: &str = "Download completed successfully!";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
}

pub struct Session {
    settings: DownloadSettings,
    url_input: String,
    catalog: QualityCatalog,
    status: String,
    progress: f32,
    notices: Vec<Notice>,
    active_batch: Option<String>,
    backend: Arc<dyn MediaBackend>,
    controller: BatchController,
    sender: EventSender,
    receiver: EventReceiver,
    update_endpoint: String,
}

impl Session {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        history: HistoryStore,
        mut settings: DownloadSettings,
        update_endpoint: Option<String>,
    ) -> Self {
        let (sender, receiver) = events::channel();
        let catalog = QualityCatalog::default_for(settings.format);
        if !catalog.contains(&settings.quality) {
            tracing::warn!(quality = %settings.quality, format = %settings.format, "saved quality not offered, using Best");
            settings.quality = BEST_LABEL.to_string();
        }
        let controller = BatchController::new(backend.clone(), history, sender.clone());
        Self {
            settings,
            url_input: String::new(),
            catalog,
            status: READY_STATUS.to_string(),
            progress: 0.0,
            notices: Vec::new(),
            active_batch: None,
            backend,
            controller,
            sender,
            receiver,
            update_endpoint: update_endpoint
                .unwrap_or_else(|| update::DEFAULT_RELEASE_ENDPOINT.to_string()),
        }
    }

    pub fn settings(&self) -> &DownloadSettings {
        &self.settings
    }

    pub fn url_input(&self) -> &str {
        &self.url_input
    }

    pub fn catalog(&self) -> &QualityCatalog {
        &self.catalog
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn batch_state(&self) -> BatchState {
        self.controller.state()
    }

    pub fn is_busy(&self) -> bool {
        self.controller.is_busy()
    }

    pub fn awaiting_batch(&self) -> bool {
        self.active_batch.is_some()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn set_url_input(&mut self, text: impl Into<String>) {
        self.url_input = text.into();
    }

    pub fn url_focus_lost(&mut self) -> bool {
        let Some(target) = MediaRequest::probe_target(&self.url_input) else {
            return false;
        };
        self.status = DETECTING_STATUS.to_string();
        spawn_probe(self.backend.clone(), target, self.sender.clone());
        true
    }

    pub fn select_format(&mut self, format: FormatChoice) {
        self.settings.format = format;
        self.catalog = QualityCatalog::default_for(format);
        self.settings.quality = BEST_LABEL.to_string();
    }

    pub fn select_quality(&mut self, label: &str) -> Result<()> {
        if !self.catalog.contains(label) {
            return Err(EngineError::UnknownQualityLabel {
                format: self.settings.format,
                label: label.to_string(),
            });
        }
        self.settings.quality = label.to_string();
        Ok(())
    }

    pub fn set_destination(&mut self, dir: PathBuf) {
        self.settings.destination_dir = dir;
    }

    pub fn set_subtitles(&mut self, enabled: bool, language: Option<&str>) {
        let language = language
            .map(str::to_string)
            .unwrap_or_else(|| self.settings.subtitles.language.clone());
        self.settings.subtitles = SubtitleRequest { enabled, language };
    }

    pub fn set_thumbnail(&mut self, thumbnail: bool) {
        self.settings.thumbnail = thumbnail;
    }

    pub fn start_download(&mut self) -> Result<BatchHandle> {
        let request = self
            .settings
            .request(MediaRequest::split_urls(&self.url_input))?;
        let handle = self.controller.start(&request, &self.catalog)?;
        self.begin_batch_view(&handle);
        Ok(handle)
    }

    pub fn replay(&mut self, outcome: &JobOutcome) -> Result<BatchHandle> {
        let handle = self
            .controller
            .replay(outcome, &self.settings, &self.catalog)?;
        self.begin_batch_view(&handle);
        Ok(handle)
    }

    fn begin_batch_view(&mut self, handle: &BatchHandle) {
        self.active_batch = Some(handle.batch_id.clone());
        self.progress = 0.0;
        self.status = STARTING_STATUS.to_string();
    }

    pub fn history(&self) -> Vec<JobOutcome> {
        self.controller.history().list()
    }

    pub fn clear_history(&self) -> Result<()> {
        self.controller.history().clear()
    }

    pub fn check_for_updates(&self, requested: bool) {
        let endpoint = self.update_endpoint.clone();
        let sender = self.sender.clone();
        thread::spawn(move || {
            let outcome = update::try_check_for_update(&endpoint).map_err(|e| {
                tracing::warn!(%endpoint, "update check failed: {e}");
                e.to_string()
            });
            emit(&sender, UiEvent::UpdateChecked { requested, outcome });
        });
    }

    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.apply(event);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::ProbeStarted { .. } => {
                self.status = DETECTING_STATUS.to_string();
            }
            UiEvent::ProbeFinished { status, catalog } => {
                self.status = status;
                if let Some(catalog) = catalog {
                    if self.settings.format.kind() == MediaKind::Video {
                        self.catalog = catalog;
                        self.settings.quality = BEST_LABEL.to_string();
                    }
                }
            }
            UiEvent::BatchStarted { .. } => {
                self.progress = 0.0;
            }
            UiEvent::ItemStarted { index, url, .. } => {
                tracing::debug!(index, %url, "item started");
                self.progress = 0.0;
            }
            UiEvent::Progress(snapshot) => {
                self.progress = snapshot.fraction;
                self.status = snapshot.status_text();
            }
            UiEvent::ItemFinished(outcome) => match outcome.error {
                None => {
                    self.progress = 1.0;
                    self.status = COMPLETED_STATUS.to_string();
                    self.notices
                        .push(Notice::Info(format!("{COMPLETED_STATUS} ({})", outcome.url)));
                }
                Some(error) => {
                    self.status = format!("Error: {error}");
                    self.notices.push(Notice::Error(format!(
                        "Download failed: {}\n{error}",
                        outcome.url
                    )));
                }
            },
            UiEvent::BatchFinished {
                batch_id,
                succeeded,
                failed,
            } => {
                if self.active_batch.as_deref() == Some(batch_id.as_str()) {
                    self.active_batch = None;
                }
                if succeeded + failed > 1 {
                    self.notices.push(Notice::Info(format!(
                        "Batch finished: {succeeded} succeeded, {failed} failed"
                    )));
                }
            }
            UiEvent::UpdateChecked { requested, outcome } => {
                self.apply_update_check(requested, outcome);
            }
        }
    }

    fn apply_update_check(&mut self, requested: bool, outcome: std::result::Result<UpdateCheck, String>) {
        match outcome {
            Ok(UpdateCheck {
                is_newer: true,
                remote_version: Some(remote),
            }) => self.notices.push(Notice::Info(format!(
                "A new version is available: {remote} (installed: {LOCAL_VERSION})"
            ))),
            Ok(_) if requested => self.notices.push(Notice::Info(format!(
                "You are running the latest version ({LOCAL_VERSION})"
            ))),
            Ok(_) => {}
            Err(e) if requested => self
                .notices
                .push(Notice::Error(format!("Could not check for updates: {e}"))),
            Err(_) => {}
        }
    }
}
