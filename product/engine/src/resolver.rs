use crate::catalog::QualityCatalog;
use crate::format::{FormatChoice, QualitySpec, VideoQuality};
use crate::request::{MediaRequest, DEFAULT_SUBTITLE_LANGUAGE};
use crate::{EngineError, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const AUDIO_SELECTOR: &str = "bestaudio/best";
pub const BEST_VIDEO_SELECTOR: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";
pub const OUTPUT_FILE_TEMPLATE: &str = "%(title)s.%(ext)s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostProcessing {
    pub codec: String,
    pub target_bitrate_kbps: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleSpec {
    pub languages: Vec<String>,
    pub auto_generated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendOptions {
    pub stream_selector: String,
    pub container_merge_format: Option<String>,
    pub post_processing: Option<PostProcessing>,
    pub subtitles: Option<SubtitleSpec>,
    pub thumbnail: Option<bool>,
    pub output_template: String,
}

impl BackendOptions {
    pub fn for_destination(&self, destination_dir: &Path) -> BackendOptions {
        BackendOptions {
            output_template: output_template(destination_dir),
            ..self.clone()
        }
    }
}

pub fn resolve_with_defaults(request: &MediaRequest) -> Result<BackendOptions> {
    resolve(request, &QualityCatalog::default_for(request.format))
}

/// A catalog of the other media kind (e.g. a probed video catalog while an
/// audio format is selected) is ignored in favour of the default one.
pub fn resolve(request: &MediaRequest, catalog: &QualityCatalog) -> Result<BackendOptions> {
    let fallback;
    let catalog = if catalog.kind() == request.format.kind() {
        catalog
    } else {
        fallback = QualityCatalog::default_for(request.format);
        &fallback
    };

    let (stream_selector, container_merge_format, post_processing) = catalog
        .lookup(&request.quality)
        .and_then(|spec| resolve_streams(request.format, spec))
        .ok_or_else(|| EngineError::UnknownQualityLabel {
            format: request.format,
            label: request.quality.clone(),
        })?;

    Ok(BackendOptions {
        stream_selector,
        container_merge_format,
        post_processing,
        subtitles: request.subtitles.enabled.then(|| SubtitleSpec {
            languages: subtitle_languages(&request.subtitles.language),
            auto_generated: true,
        }),
        thumbnail: request.thumbnail.then_some(true),
        output_template: output_template(&request.destination_dir),
    })
}

fn resolve_streams(
    format: FormatChoice,
    spec: QualitySpec,
) -> Option<(String, Option<String>, Option<PostProcessing>)> {
    match (spec, format.audio_codec()) {
        (QualitySpec::Audio(quality), Some(codec)) => {
            let target_bitrate_kbps = format
                .uses_bitrate()
                .then(|| quality.effective_bitrate_kbps());
            Some((
                AUDIO_SELECTOR.to_string(),
                None,
                Some(PostProcessing {
                    codec: codec.to_string(),
                    target_bitrate_kbps,
                }),
            ))
        }
        (QualitySpec::Video(quality), None) => {
            let merge = match format {
                FormatChoice::MkvVideo => "mkv",
                _ => "mp4",
            };
            Some((video_selector(&quality), Some(merge.to_string()), None))
        }
        _ => None,
    }
}

pub fn video_selector(quality: &VideoQuality) -> String {
    let Some(ceiling) = quality.ceiling else {
        return BEST_VIDEO_SELECTOR.to_string();
    };
    let height = ceiling.height();
    match quality.min_frame_rate {
        Some(fps) => format!(
            "bestvideo[height<={height}][fps>={fps}][ext=mp4]+bestaudio[ext=m4a]/bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]"
        ),
        None => format!(
            "bestvideo[height<={height}][ext=mp4]+bestaudio[ext=m4a]/best[height<={height}]"
        ),
    }
}

pub fn output_template(destination_dir: &Path) -> String {
    let path: PathBuf = destination_dir.join(OUTPUT_FILE_TEMPLATE);
    path.to_string_lossy().to_string()
}

fn subtitle_languages(tag: &str) -> Vec<String> {
    let languages: Vec<String> = tag
        .split(',')
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();
    if languages.is_empty() {
        vec![DEFAULT_SUBTITLE_LANGUAGE.to_string()]
    } else {
        languages
    }
}
