use crate::EngineError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

pub const BEST_LABEL: &str = "Best";
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 320;
pub const HIGH_FRAME_RATE: u32 = 60;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatChoice {
    #[default]
    Mp4Video,
    MkvVideo,
    Mp3Audio,
    FlacAudio,
    WavAudio,
    M4aAudio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Audio,
    Video,
}

impl FormatChoice {
    pub const ALL: [FormatChoice; 6] = [
        FormatChoice::Mp4Video,
        FormatChoice::MkvVideo,
        FormatChoice::Mp3Audio,
        FormatChoice::FlacAudio,
        FormatChoice::WavAudio,
        FormatChoice::M4aAudio,
    ];

    pub fn kind(self) -> MediaKind {
        match self {
            FormatChoice::Mp4Video | FormatChoice::MkvVideo => MediaKind::Video,
            _ => MediaKind::Audio,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FormatChoice::Mp4Video => "Video (MP4)",
            FormatChoice::MkvVideo => "Video (MKV)",
            FormatChoice::Mp3Audio => "Audio (MP3)",
            FormatChoice::FlacAudio => "Audio (FLAC)",
            FormatChoice::WavAudio => "Audio (WAV)",
            FormatChoice::M4aAudio => "Audio (M4A)",
        }
    }

    pub fn audio_codec(self) -> Option<&'static str> {
        match self {
            FormatChoice::Mp3Audio => Some("mp3"),
            FormatChoice::FlacAudio => Some("flac"),
            FormatChoice::WavAudio => Some("wav"),
            FormatChoice::M4aAudio => Some("m4a"),
            FormatChoice::Mp4Video | FormatChoice::MkvVideo => None,
        }
    }

    pub fn uses_bitrate(self) -> bool {
        matches!(self, FormatChoice::Mp3Audio | FormatChoice::M4aAudio)
    }

    fn short_name(self) -> &'static str {
        match self {
            FormatChoice::Mp4Video => "mp4",
            FormatChoice::MkvVideo => "mkv",
            FormatChoice::Mp3Audio => "mp3",
            FormatChoice::FlacAudio => "flac",
            FormatChoice::WavAudio => "wav",
            FormatChoice::M4aAudio => "m4a",
        }
    }
}

/// Accepts the menu label ("Audio (MP3)") or the short name ("mp3").
impl FromStr for FormatChoice {
    type Err = EngineError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|f| {
                f.label().eq_ignore_ascii_case(value)
                    || f.short_name().eq_ignore_ascii_case(value)
            })
            .ok_or_else(|| EngineError::UnknownFormat(value.to_string()))
    }
}

impl fmt::Display for FormatChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Resolution {
    P360,
    P480,
    P720,
    P1080,
    P1440,
    P2160,
}

impl Resolution {
    pub const DESCENDING: [Resolution; 6] = [
        Resolution::P2160,
        Resolution::P1440,
        Resolution::P1080,
        Resolution::P720,
        Resolution::P480,
        Resolution::P360,
    ];

    pub fn height(self) -> u32 {
        match self {
            Resolution::P360 => 360,
            Resolution::P480 => 480,
            Resolution::P720 => 720,
            Resolution::P1080 => 1080,
            Resolution::P1440 => 1440,
            Resolution::P2160 => 2160,
        }
    }

    pub fn from_height(height: u32) -> Option<Self> {
        Self::DESCENDING.into_iter().find(|r| r.height() == height)
    }

    pub fn offers_high_frame_rate(self) -> bool {
        self >= Resolution::P720
    }

    fn label_stem(self) -> String {
        match self {
            Resolution::P2160 => "4K".to_string(),
            other => format!("{}p", other.height()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VideoQuality {
    pub ceiling: Option<Resolution>,
    pub min_frame_rate: Option<u32>,
}

impl VideoQuality {
    pub fn best() -> Self {
        Self::default()
    }

    pub fn capped(ceiling: Resolution) -> Self {
        Self {
            ceiling: Some(ceiling),
            min_frame_rate: None,
        }
    }

    pub fn high_frame_rate(ceiling: Resolution) -> Self {
        Self {
            ceiling: Some(ceiling),
            min_frame_rate: Some(HIGH_FRAME_RATE),
        }
    }

    pub fn label(&self) -> String {
        match (self.ceiling, self.min_frame_rate) {
            (None, _) => BEST_LABEL.to_string(),
            (Some(res), Some(_)) => format!("{} 60fps", res.label_stem()),
            (Some(Resolution::P2160), None) => "4K (2160p)".to_string(),
            (Some(res), None) => res.label_stem(),
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label == BEST_LABEL {
            return Some(Self::best());
        }
        let caps = video_label_re().captures(label)?;
        let ceiling = if caps.name("uhd").is_some() {
            Resolution::P2160
        } else {
            let height: u32 = caps.name("height")?.as_str().parse().ok()?;
            Resolution::from_height(height)?
        };
        let min_frame_rate = match caps.name("fps") {
            Some(fps) => Some(fps.as_str().parse().ok()?),
            None => None,
        };
        Some(Self {
            ceiling: Some(ceiling),
            min_frame_rate,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioQuality {
    pub bitrate_kbps: Option<u32>,
}

impl AudioQuality {
    pub fn effective_bitrate_kbps(&self) -> u32 {
        self.bitrate_kbps.unwrap_or(DEFAULT_AUDIO_BITRATE_KBPS)
    }

    pub fn label(&self) -> String {
        match self.bitrate_kbps {
            Some(kbps) => format!("{kbps} kbps"),
            None => BEST_LABEL.to_string(),
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label == BEST_LABEL {
            return Some(Self::default());
        }
        parse_kbps(label).map(|kbps| Self {
            bitrate_kbps: Some(kbps),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualitySpec {
    Audio(AudioQuality),
    Video(VideoQuality),
}

impl QualitySpec {
    pub fn kind(&self) -> MediaKind {
        match self {
            QualitySpec::Audio(_) => MediaKind::Audio,
            QualitySpec::Video(_) => MediaKind::Video,
        }
    }

    pub fn parse(kind: MediaKind, label: &str) -> Option<Self> {
        match kind {
            MediaKind::Audio => AudioQuality::parse(label).map(QualitySpec::Audio),
            MediaKind::Video => VideoQuality::parse(label).map(QualitySpec::Video),
        }
    }
}

pub fn audio_bitrate_kbps(label: &str) -> u32 {
    parse_kbps(label.trim()).unwrap_or(DEFAULT_AUDIO_BITRATE_KBPS)
}

fn parse_kbps(label: &str) -> Option<u32> {
    let caps = kbps_label_re().captures(label)?;
    caps.get(1)?.as_str().parse().ok().filter(|kbps| *kbps > 0)
}

fn video_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?:(?P<uhd>4K)(?: \(2160p\))?|(?P<height>\d{3,4})p)(?: (?P<fps>\d{2,3})fps)?$")
            .expect("static regex")
    })
}

fn kbps_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,4})\s*kbps$").expect("static regex"))
}
