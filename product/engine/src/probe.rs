use crate::backend::{MediaBackend, StreamVariant};
use crate::catalog::QualityCatalog;
use crate::events::{emit, EventSender, UiEvent};
use crate::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

pub const READY_STATUS: &str = "Ready to download";
pub const DETECTING_STATUS: &str = "Detecting available formats...";

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub heights: BTreeSet<u32>,
    pub frame_rates: Vec<f64>,
    pub catalog: QualityCatalog,
}

impl ProbeResult {
    pub fn from_variants(variants: &[StreamVariant]) -> Self {
        let heights: BTreeSet<u32> = variants
            .iter()
            .filter_map(|v| v.height)
            .filter(|h| *h > 0)
            .collect();
        let mut frame_rates: Vec<f64> = variants
            .iter()
            .filter_map(|v| v.fps)
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .collect();
        frame_rates.sort_by(|a, b| a.total_cmp(b));
        frame_rates.dedup();

        let catalog = QualityCatalog::from_probe(&heights, &frame_rates);
        Self {
            heights,
            frame_rates,
            catalog,
        }
    }

    pub fn max_height(&self) -> Option<u32> {
        self.heights.iter().next_back().copied()
    }

    pub fn status_text(&self) -> String {
        match self.max_height() {
            Some(height) => format!("{READY_STATUS} (Max: {height}p)"),
            None => READY_STATUS.to_string(),
        }
    }
}

pub fn probe(backend: &dyn MediaBackend, url: &str) -> Result<ProbeResult> {
    let variants = backend.probe(url)?;
    Ok(ProbeResult::from_variants(&variants))
}

/// Probes on a detached worker and reports back over `events`.
pub fn spawn_probe(backend: Arc<dyn MediaBackend>, url: String, events: EventSender) {
    thread::spawn(move || {
        emit(&events, UiEvent::ProbeStarted { url: url.clone() });
        let finished = match probe(backend.as_ref(), &url) {
            Ok(result) => {
                tracing::info!(%url, max_height = ?result.max_height(), "probe finished");
                UiEvent::ProbeFinished {
                    status: result.status_text(),
                    catalog: Some(result.catalog),
                }
            }
            Err(e) => {
                tracing::warn!(%url, "probe failed, keeping current catalog: {e}");
                UiEvent::ProbeFinished {
                    status: READY_STATUS.to_string(),
                    catalog: None,
                }
            }
        };
        emit(&events, finished);
    });
}
