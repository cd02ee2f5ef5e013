use crate::format::{AudioQuality, FormatChoice, MediaKind, QualitySpec, Resolution, VideoQuality};
use std::collections::BTreeSet;

const DEFAULT_AUDIO_BITRATES_KBPS: [u32; 5] = [320, 256, 192, 128, 96];

#[derive(Debug, Clone, PartialEq)]
pub struct QualityOption {
    pub label: String,
    pub spec: QualitySpec,
}

impl QualityOption {
    fn audio(quality: AudioQuality) -> Self {
        Self {
            label: quality.label(),
            spec: QualitySpec::Audio(quality),
        }
    }

    fn video(quality: VideoQuality) -> Self {
        Self {
            label: quality.label(),
            spec: QualitySpec::Video(quality),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualityCatalog {
    kind: MediaKind,
    options: Vec<QualityOption>,
}

impl QualityCatalog {
    pub fn default_for(format: FormatChoice) -> Self {
        match format.kind() {
            MediaKind::Audio => Self::default_audio(),
            MediaKind::Video => Self::default_video(),
        }
    }

    pub fn default_audio() -> Self {
        let mut options = vec![QualityOption::audio(AudioQuality::default())];
        options.extend(DEFAULT_AUDIO_BITRATES_KBPS.iter().map(|kbps| {
            QualityOption::audio(AudioQuality {
                bitrate_kbps: Some(*kbps),
            })
        }));
        Self {
            kind: MediaKind::Audio,
            options,
        }
    }

    pub fn default_video() -> Self {
        let mut options = vec![QualityOption::video(VideoQuality::best())];
        for res in Resolution::DESCENDING {
            if res.offers_high_frame_rate() {
                options.push(QualityOption::video(VideoQuality::high_frame_rate(res)));
            }
            options.push(QualityOption::video(VideoQuality::capped(res)));
        }
        Self {
            kind: MediaKind::Video,
            options,
        }
    }

    /// Video catalog restricted to what a probed source actually carries.
    ///
    /// A 240p-only source still gets the 360p entry since "at or below 360"
    /// selects it.
    pub fn from_probe(heights: &BTreeSet<u32>, frame_rates: &[f64]) -> Self {
        let has_high_frame_rate = frame_rates
            .iter()
            .any(|fps| *fps >= f64::from(crate::format::HIGH_FRAME_RATE));

        let mut options = vec![QualityOption::video(VideoQuality::best())];
        for res in Resolution::DESCENDING {
            let present = match res {
                Resolution::P360 => heights.contains(&360) || heights.contains(&240),
                other => heights.contains(&other.height()),
            };
            if !present {
                continue;
            }
            if has_high_frame_rate && res.offers_high_frame_rate() {
                options.push(QualityOption::video(VideoQuality::high_frame_rate(res)));
            }
            options.push(QualityOption::video(VideoQuality::capped(res)));
        }
        Self {
            kind: MediaKind::Video,
            options,
        }
    }

    pub fn from_labels<I, S>(kind: MediaKind, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let options = labels
            .into_iter()
            .filter_map(|label| {
                let label = label.as_ref().trim();
                QualitySpec::parse(kind, label).map(|spec| QualityOption {
                    label: label.to_string(),
                    spec,
                })
            })
            .collect();
        Self { kind, options }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn options(&self) -> &[QualityOption] {
        &self.options
    }

    pub fn labels(&self) -> Vec<String> {
        self.options.iter().map(|o| o.label.clone()).collect()
    }

    pub fn lookup(&self, label: &str) -> Option<QualitySpec> {
        let label = label.trim();
        self.options
            .iter()
            .find(|o| o.label == label)
            .map(|o| o.spec)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.lookup(label).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heights(values: &[u32]) -> BTreeSet<u32> {
        values.iter().copied().collect()
    }

    #[test]
    fn default_catalogs_match_menu_text() {
        assert_eq!(
            QualityCatalog::default_audio().labels(),
            vec!["Best", "320 kbps", "256 kbps", "192 kbps", "128 kbps", "96 kbps"]
        );
        assert_eq!(
            QualityCatalog::default_video().labels(),
            vec![
                "Best",
                "4K 60fps",
                "4K (2160p)",
                "1440p 60fps",
                "1440p",
                "1080p 60fps",
                "1080p",
                "720p 60fps",
                "720p",
                "480p",
                "360p"
            ]
        );
    }

    #[test]
    fn probe_catalog_lists_only_present_heights() {
        let catalog = QualityCatalog::from_probe(&heights(&[1080, 720, 144]), &[30.0, 25.0]);
        assert_eq!(catalog.labels(), vec!["Best", "1080p", "720p"]);
    }

    #[test]
    fn probe_catalog_adds_60fps_variants_above_sd() {
        let catalog = QualityCatalog::from_probe(&heights(&[1080, 480, 240]), &[30.0, 60.0]);
        assert_eq!(
            catalog.labels(),
            vec!["Best", "1080p 60fps", "1080p", "480p", "360p"]
        );
    }

    #[test]
    fn probe_catalog_without_heights_is_best_only() {
        let catalog = QualityCatalog::from_probe(&BTreeSet::new(), &[]);
        assert_eq!(catalog.labels(), vec!["Best"]);
    }

    #[test]
    fn lookup_returns_structured_spec() {
        let catalog = QualityCatalog::default_video();
        assert_eq!(
            catalog.lookup("720p 60fps"),
            Some(QualitySpec::Video(VideoQuality::high_frame_rate(
                Resolution::P720
            )))
        );
        assert!(catalog.lookup("144p").is_none());
    }

    #[test]
    fn from_labels_skips_foreign_labels() {
        let catalog = QualityCatalog::from_labels(MediaKind::Audio, ["Best", "64 kbps", "1080p"]);
        assert_eq!(catalog.labels(), vec!["Best", "64 kbps"]);
    }
}
