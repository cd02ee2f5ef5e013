use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use mediafetch_engine::backend::{MediaBackend, RawProgressEvent, StreamVariant};
use mediafetch_engine::catalog::QualityCatalog;
use mediafetch_engine::events::{self, UiEvent};
use mediafetch_engine::format::FormatChoice;
use mediafetch_engine::history::{HistoryStore, JobOutcome, OutcomeStatus};
use mediafetch_engine::request::{DownloadSettings, MediaRequest};
use mediafetch_engine::resolver::BackendOptions;
use mediafetch_engine::runner::{BatchController, BatchState};
use mediafetch_engine::session::{Notice, Session};
use mediafetch_engine::{logging, EngineError, Result};
use parking_lot::Mutex;

/// Scripted backend: URLs listed in `failures` fail with that text, every
/// other URL succeeds after a couple of progress events.
#[derive(Default)]
struct FakeBackend {
    failures: HashMap<String, String>,
    variants: Vec<StreamVariant>,
    gate: Option<Receiver<()>>,
    calls: Mutex<Vec<(String, BackendOptions)>>,
}

impl FakeBackend {
    fn failing(urls: &[(&str, &str)]) -> Self {
        Self {
            failures: urls
                .iter()
                .map(|(u, e)| (u.to_string(), e.to_string()))
                .collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<(String, BackendOptions)> {
        self.calls.lock().clone()
    }
}

impl MediaBackend for FakeBackend {
    fn probe(&self, _url: &str) -> Result<Vec<StreamVariant>> {
        if self.variants.is_empty() {
            return Err(EngineError::Probe("no formats".to_string()));
        }
        Ok(self.variants.clone())
    }

    fn download(
        &self,
        url: &str,
        options: &BackendOptions,
        on_progress: &mut dyn FnMut(RawProgressEvent),
    ) -> Result<()> {
        self.calls.lock().push((url.to_string(), options.clone()));
        if let Some(gate) = &self.gate {
            let _ = gate.recv_timeout(Duration::from_secs(5));
        }
        on_progress(RawProgressEvent {
            status: "downloading".to_string(),
            percent: Some(" 50.0%".to_string()),
            speed: Some("2.00MiB/s".to_string()),
            eta: Some("00:03".to_string()),
        });
        if let Some(error) = self.failures.get(url) {
            return Err(EngineError::ExternalToolFailed {
                tool: "yt-dlp".to_string(),
                code: Some(1),
                stderr: error.clone(),
            });
        }
        on_progress(RawProgressEvent::with_status("finished"));
        Ok(())
    }
}

fn video_request(urls: &[&str], dest: &Path) -> MediaRequest {
    MediaRequest::new(
        urls.iter().map(|u| u.to_string()).collect(),
        FormatChoice::Mp4Video,
        "1080p",
        dest.to_path_buf(),
    )
    .expect("request")
}

fn drain(rx: &events::EventReceiver) -> Vec<UiEvent> {
    rx.try_iter().collect()
}

#[test]
fn failed_item_does_not_abort_batch() {
    logging::init_test_tracing();
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(FakeBackend::failing(&[(
        "https://b.example/2",
        "Video unavailable",
    )]));
    let history = HistoryStore::new(dir.path().join("history.json"));
    let (tx, rx) = events::channel();
    let controller = BatchController::new(backend.clone(), history.clone(), tx);

    let urls = ["https://a.example/1", "https://b.example/2", "https://c.example/3"];
    let outcomes = controller
        .start(
            &video_request(&urls, dir.path()),
            &QualityCatalog::default_video(),
        )
        .expect("start")
        .join();

    let attempted: Vec<String> = backend.calls().into_iter().map(|(u, _)| u).collect();
    assert_eq!(attempted, urls);

    let statuses: Vec<OutcomeStatus> = outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![OutcomeStatus::Success, OutcomeStatus::Failed, OutcomeStatus::Success]
    );
    assert_eq!(outcomes[1].error.as_deref(), Some("Video unavailable"));

    let stored: Vec<String> = history.list().into_iter().map(|o| o.url).collect();
    assert_eq!(
        stored,
        vec!["https://c.example/3", "https://b.example/2", "https://a.example/1"]
    );

    assert!(!controller.is_busy());
    assert!(matches!(
        controller.state(),
        BatchState::Failed { failed: 1, total: 3, .. }
    ));

    let events = drain(&rx);
    assert!(matches!(events.first(), Some(UiEvent::BatchStarted { total: 3, .. })));
    assert!(matches!(
        events.last(),
        Some(UiEvent::BatchFinished { succeeded: 2, failed: 1, .. })
    ));
    let finished = events
        .iter()
        .filter(|e| matches!(e, UiEvent::ItemFinished(_)))
        .count();
    assert_eq!(finished, 3);
}

#[test]
fn unwritable_history_does_not_stop_batch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history_path = dir.path().join("history.json");
    std::fs::create_dir_all(history_path.join("occupied")).expect("mkdir");
    let (tx, rx) = events::channel();
    let controller = BatchController::new(
        Arc::new(FakeBackend::default()),
        HistoryStore::new(history_path.clone()),
        tx,
    );
    let request = MediaRequest::new(
        vec!["https://a.example/1".to_string(), "https://b.example/2".to_string()],
        FormatChoice::Mp3Audio,
        "192 kbps",
        dir.path().to_path_buf(),
    )
    .expect("request");

    let outcomes = controller
        .start(&request, &QualityCatalog::default_audio())
        .expect("start")
        .join();

    assert_eq!(outcomes.len(), 2);
    assert!(outcomes.iter().all(JobOutcome::is_success));
    assert!(!controller.is_busy());
    assert_eq!(controller.state(), BatchState::Idle);
    assert!(history_path.is_dir());

    let finished = drain(&rx)
        .into_iter()
        .filter(|e| matches!(e, UiEvent::ItemFinished(_)))
        .count();
    assert_eq!(finished, 2);
}

#[test]
fn every_job_gets_options_pinned_to_destination() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(FakeBackend::default());
    let (tx, _rx) = events::channel();
    let controller = BatchController::new(
        backend.clone(),
        HistoryStore::new(dir.path().join("history.json")),
        tx,
    );

    controller
        .start(
            &video_request(&["https://a.example/1", "https://b.example/2"], dir.path()),
            &QualityCatalog::default_video(),
        )
        .expect("start")
        .join();

    let expected_template = dir
        .path()
        .join("%(title)s.%(ext)s")
        .to_string_lossy()
        .to_string();
    for (_, options) in backend.calls() {
        assert_eq!(options.output_template, expected_template);
        assert_eq!(
            options.stream_selector,
            "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080]"
        );
        assert_eq!(options.container_merge_format.as_deref(), Some("mp4"));
    }
    assert_eq!(controller.state(), BatchState::Idle);
}

#[test]
fn second_batch_is_rejected_while_one_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (release, gate): (Sender<()>, Receiver<()>) = crossbeam_channel::unbounded();
    let backend = Arc::new(FakeBackend {
        gate: Some(gate),
        ..FakeBackend::default()
    });
    let (tx, _rx) = events::channel();
    let controller = BatchController::new(
        backend,
        HistoryStore::new(dir.path().join("history.json")),
        tx,
    );
    let request = video_request(&["https://a.example/1"], dir.path());
    let catalog = QualityCatalog::default_video();

    let running = controller.start(&request, &catalog).expect("first");
    assert!(controller.is_busy());
    assert!(matches!(
        controller.start(&request, &catalog),
        Err(EngineError::BatchInProgress)
    ));

    release.send(()).expect("release");
    running.join();
    assert!(!controller.is_busy());

    release.send(()).expect("release");
    controller
        .start(&request, &catalog)
        .expect("after finish")
        .join();
}

#[test]
fn replay_uses_current_settings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(FakeBackend::default());
    let history = HistoryStore::new(dir.path().join("history.json"));
    let (tx, _rx) = events::channel();
    let controller = BatchController::new(backend.clone(), history.clone(), tx);

    let earlier = JobOutcome::failed(
        "https://a.example/1",
        Path::new("/old"),
        FormatChoice::Mp3Audio,
        "128 kbps",
        "HTTP Error 403",
    );
    history.append(earlier.clone()).expect("seed");

    let mut settings = DownloadSettings::new(dir.path().join("new"));
    settings.format = FormatChoice::FlacAudio;
    let outcomes = controller
        .replay(&earlier, &settings, &QualityCatalog::default_audio())
        .expect("replay")
        .join();

    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].format, FormatChoice::FlacAudio);
    assert_eq!(outcomes[0].quality, "Best");

    let calls = backend.calls();
    let options = &calls[0].1;
    let post = options.post_processing.as_ref().expect("post processing");
    assert_eq!(post.codec, "flac");
    assert!(options.output_template.starts_with(&*dir.path().join("new").to_string_lossy()));

    let stored = history.list();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].is_success());
    assert_eq!(stored[1], earlier);
}

fn pump_until(session: &mut Session, done: impl Fn(&Session) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        session.pump();
        if done(session) {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out; status = {:?}", session.status());
}

#[test]
fn session_reflects_batch_through_events() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(FakeBackend::failing(&[("https://b.example/2", "Private video")]));
    let mut session = Session::new(
        backend,
        HistoryStore::new(dir.path().join("history.json")),
        DownloadSettings::new(dir.path().to_path_buf()),
        None,
    );

    session.set_url_input("https://a.example/1\n\nhttps://b.example/2\n");
    session.start_download().expect("start").join();
    assert_eq!(session.status(), "Starting download...");

    pump_until(&mut session, |s| !s.awaiting_batch());
    assert_eq!(session.status(), "Error: Private video");
    assert!(!session.is_busy());

    let notices = session.take_notices();
    assert!(notices.contains(&Notice::Info(
        "Download completed successfully! (https://a.example/1)".to_string()
    )));
    assert!(notices
        .iter()
        .any(|n| matches!(n, Notice::Error(text) if text.contains("Private video"))));
    assert_eq!(session.history().len(), 2);

    session.clear_history().expect("clear");
    assert!(session.history().is_empty());
}

#[test]
fn probe_narrows_video_menu() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = Arc::new(FakeBackend {
        variants: vec![
            StreamVariant {
                height: Some(1080),
                fps: Some(60.0),
                ..StreamVariant::default()
            },
            StreamVariant {
                height: Some(360),
                fps: Some(30.0),
                ..StreamVariant::default()
            },
        ],
        ..FakeBackend::default()
    });
    let mut session = Session::new(
        backend,
        HistoryStore::new(dir.path().join("history.json")),
        DownloadSettings::new(dir.path().to_path_buf()),
        None,
    );

    session.set_url_input("https://a.example/watch?v=1\nhttps://b.example/2");
    assert!(session.url_focus_lost());
    assert_eq!(session.status(), "Detecting available formats...");

    pump_until(&mut session, |s| s.status().starts_with("Ready"));
    assert_eq!(session.status(), "Ready to download (Max: 1080p)");
    assert_eq!(
        session.catalog().labels(),
        vec!["Best", "1080p 60fps", "1080p", "360p"]
    );
    assert!(matches!(
        session.select_quality("720p"),
        Err(EngineError::UnknownQualityLabel { .. })
    ));
}

#[test]
fn failed_probe_keeps_default_menu() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut session = Session::new(
        Arc::new(FakeBackend::default()),
        HistoryStore::new(dir.path().join("history.json")),
        DownloadSettings::new(dir.path().to_path_buf()),
        None,
    );

    session.set_url_input("https://a.example/1");
    assert!(session.url_focus_lost());
    pump_until(&mut session, |s| s.status().starts_with("Ready"));
    assert_eq!(session.status(), "Ready to download");
    assert_eq!(session.catalog(), &QualityCatalog::default_video());
}
