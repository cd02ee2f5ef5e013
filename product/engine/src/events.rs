use crate::catalog::QualityCatalog;
use crate::history::JobOutcome;
use crate::progress::ProgressSnapshot;
use crate::update::UpdateCheck;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Messages from worker threads to the thread that owns UI state.
#[derive(Debug, Clone)]
pub enum UiEvent {
    ProbeStarted {
        url: String,
    },
    ProbeFinished {
        status: String,
        catalog: Option<QualityCatalog>,
    },
    BatchStarted {
        batch_id: String,
        total: usize,
    },
    ItemStarted {
        batch_id: String,
        index: usize,
        url: String,
    },
    Progress(ProgressSnapshot),
    ItemFinished(JobOutcome),
    BatchFinished {
        batch_id: String,
        succeeded: usize,
        failed: usize,
    },
    UpdateChecked {
        requested: bool,
        outcome: Result<UpdateCheck, String>,
    },
}

pub type EventSender = Sender<UiEvent>;
pub type EventReceiver = Receiver<UiEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    unbounded()
}

pub(crate) fn emit(sender: &EventSender, event: UiEvent) {
    if sender.send(event).is_err() {
        tracing::debug!("event receiver dropped");
    }
}
