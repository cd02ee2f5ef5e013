use crate::format::FormatChoice;
use crate::{EngineError, Result};
use std::path::PathBuf;

pub const DEFAULT_SUBTITLE_LANGUAGE: &str = "en";

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleRequest {
    pub enabled: bool,
    pub language: String,
}

impl Default for SubtitleRequest {
    fn default() -> Self {
        Self {
            enabled: false,
            language: DEFAULT_SUBTITLE_LANGUAGE.to_string(),
        }
    }
}

/// The selections a request is built from, minus the URLs. Replays use the
/// current settings, not the ones recorded with the outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadSettings {
    pub format: FormatChoice,
    pub quality: String,
    pub destination_dir: PathBuf,
    pub subtitles: SubtitleRequest,
    pub thumbnail: bool,
}

impl DownloadSettings {
    pub fn new(destination_dir: PathBuf) -> Self {
        Self {
            format: FormatChoice::default(),
            quality: crate::format::BEST_LABEL.to_string(),
            destination_dir,
            subtitles: SubtitleRequest::default(),
            thumbnail: false,
        }
    }

    pub fn request(&self, urls: Vec<String>) -> Result<MediaRequest> {
        let mut request = MediaRequest::new(
            urls,
            self.format,
            self.quality.clone(),
            self.destination_dir.clone(),
        )?;
        request.subtitles = self.subtitles.clone();
        request.thumbnail = self.thumbnail;
        Ok(request)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    urls: Vec<String>,
    pub format: FormatChoice,
    pub quality: String,
    pub destination_dir: PathBuf,
    pub subtitles: SubtitleRequest,
    pub thumbnail: bool,
}

impl MediaRequest {
    pub fn new(
        urls: Vec<String>,
        format: FormatChoice,
        quality: impl Into<String>,
        destination_dir: PathBuf,
    ) -> Result<Self> {
        let urls: Vec<String> = urls
            .into_iter()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .collect();
        if urls.is_empty() {
            return Err(EngineError::EmptyUrlList);
        }
        Ok(Self {
            urls,
            format,
            quality: quality.into(),
            destination_dir,
            subtitles: SubtitleRequest::default(),
            thumbnail: false,
        })
    }

    pub fn with_subtitles(mut self, language: impl Into<String>) -> Self {
        self.subtitles = SubtitleRequest {
            enabled: true,
            language: language.into(),
        };
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: bool) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn split_urls(input: &str) -> Vec<String> {
        input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn probe_target(input: &str) -> Option<String> {
        let first = input.lines().map(str::trim).find(|l| !l.is_empty())?;
        normalize_http_url(first).ok()
    }
}

pub fn normalize_http_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let parsed =
        url::Url::parse(trimmed).map_err(|e| EngineError::InvalidUrl(format!("{raw}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(EngineError::InvalidUrl(format!(
            "{raw}: unsupported scheme {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        let err = MediaRequest::new(
            vec!["  ".to_string(), String::new()],
            FormatChoice::Mp4Video,
            "Best",
            PathBuf::from("/tmp"),
        )
        .expect_err("empty");
        assert!(matches!(err, EngineError::EmptyUrlList));
        assert!(err.is_user_input());
    }

    #[test]
    fn settings_build_requests() {
        let mut settings = DownloadSettings::new(PathBuf::from("/dl"));
        settings.format = FormatChoice::FlacAudio;
        settings.thumbnail = true;
        let request = settings
            .request(vec![" https://a.example ".to_string()])
            .expect("request");
        assert_eq!(request.urls(), ["https://a.example".to_string()]);
        assert_eq!(request.format, FormatChoice::FlacAudio);
        assert_eq!(request.quality, "Best");
        assert!(request.thumbnail);
        assert!(!request.subtitles.enabled);
    }

    #[test]
    fn split_urls_keeps_order_and_drops_blanks() {
        let urls = MediaRequest::split_urls("https://a.example/1\n\n  https://b.example/2  \n");
        assert_eq!(urls, vec!["https://a.example/1", "https://b.example/2"]);
    }

    #[test]
    fn probe_target_is_first_http_line() {
        assert_eq!(
            MediaRequest::probe_target("\n https://a.example/watch?v=1\nhttps://b.example"),
            Some("https://a.example/watch?v=1".to_string())
        );
        assert_eq!(MediaRequest::probe_target("ftp://a.example/file"), None);
        assert_eq!(MediaRequest::probe_target("not a url\nhttps://b.example"), None);
        assert_eq!(MediaRequest::probe_target(""), None);
    }
}
