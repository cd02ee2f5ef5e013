use crate::backend::RawProgressEvent;
use serde::Serialize;

const UNKNOWN_LABEL: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Downloading,
    Postprocessing,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub fraction: f32,
    pub rate_label: String,
    pub eta_label: String,
    pub phase: Phase,
}

impl ProgressSnapshot {
    pub fn started() -> Self {
        Self {
            fraction: 0.0,
            rate_label: UNKNOWN_LABEL.to_string(),
            eta_label: UNKNOWN_LABEL.to_string(),
            phase: Phase::Downloading,
        }
    }

    pub fn finished() -> Self {
        Self {
            fraction: 1.0,
            rate_label: UNKNOWN_LABEL.to_string(),
            eta_label: UNKNOWN_LABEL.to_string(),
            phase: Phase::Finished,
        }
    }

    pub fn status_text(&self) -> String {
        match self.phase {
            Phase::Downloading => format!(
                "Downloading... Speed: {} | ETA: {}",
                self.rate_label, self.eta_label
            ),
            Phase::Postprocessing => "Processing... Almost done!".to_string(),
            Phase::Finished => "Download completed successfully!".to_string(),
        }
    }
}

/// Normalizes backend progress events for one job.
///
/// Never fails: events it cannot read are dropped and the last good snapshot
/// stays current.
#[derive(Debug, Default)]
pub struct ProgressTranslator {
    last: Option<ProgressSnapshot>,
}

impl ProgressTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ProgressSnapshot> {
        self.last.as_ref()
    }

    pub fn translate(&mut self, event: &RawProgressEvent) -> Option<ProgressSnapshot> {
        let snapshot = match event.status.trim() {
            "downloading" => {
                let Some(percent) = event.percent.as_deref().and_then(parse_percent) else {
                    tracing::debug!(percent = ?event.percent, "dropping unreadable progress event");
                    return None;
                };
                ProgressSnapshot {
                    fraction: (percent / 100.0).clamp(0.0, 1.0),
                    rate_label: label_or_unknown(event.speed.as_deref()),
                    eta_label: label_or_unknown(event.eta.as_deref()),
                    phase: Phase::Downloading,
                }
            }
            "finished" => {
                let previous = self.last.as_ref();
                ProgressSnapshot {
                    fraction: 1.0,
                    rate_label: previous
                        .map(|p| p.rate_label.clone())
                        .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                    eta_label: previous
                        .map(|p| p.eta_label.clone())
                        .unwrap_or_else(|| UNKNOWN_LABEL.to_string()),
                    phase: Phase::Postprocessing,
                }
            }
            _ => return None,
        };
        self.last = Some(snapshot.clone());
        Some(snapshot)
    }
}

pub fn parse_percent(raw: &str) -> Option<f32> {
    let cleaned = strip_ansi(raw);
    let value: f32 = cleaned.trim().trim_end_matches('%').trim().parse().ok()?;
    value.is_finite().then_some(value)
}

fn label_or_unknown(raw: Option<&str>) -> String {
    raw.map(strip_ansi)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "NA")
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

fn strip_ansi(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\u{1b}' {
            // CSI sequence: ESC '[' params final-byte
            for next in chars.by_ref() {
                if next.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        out.push(ch);
    }
    out
}
