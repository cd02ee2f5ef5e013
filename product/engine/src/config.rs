use crate::format::{FormatChoice, BEST_LABEL};
use crate::paths::AppPaths;
use crate::persist::{read_json_document, write_json_document};
use crate::request::{DownloadSettings, SubtitleRequest, DEFAULT_SUBTITLE_LANGUAGE};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_THEME: &str = "dark";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub theme: String,
    pub download_dir: Option<PathBuf>,
    pub format: FormatChoice,
    pub quality: String,
    pub subtitles: bool,
    pub subtitle_language: String,
    pub thumbnail: bool,
    pub update_endpoint: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            download_dir: None,
            format: FormatChoice::default(),
            quality: BEST_LABEL.to_string(),
            subtitles: false,
            subtitle_language: DEFAULT_SUBTITLE_LANGUAGE.to_string(),
            thumbnail: false,
            update_endpoint: None,
        }
    }
}

impl AppConfig {
    pub fn download_settings(&self, paths: &AppPaths) -> DownloadSettings {
        let destination_dir = self
            .download_dir
            .clone()
            .unwrap_or_else(|| paths.default_download_dir());
        DownloadSettings {
            format: self.format,
            quality: self.quality.clone(),
            destination_dir,
            subtitles: SubtitleRequest {
                enabled: self.subtitles,
                language: self.subtitle_language.clone(),
            },
            thumbnail: self.thumbnail,
        }
    }

    pub fn remember(&mut self, settings: &DownloadSettings) {
        self.download_dir = Some(settings.destination_dir.clone());
        self.format = settings.format;
        self.quality = settings.quality.clone();
        self.subtitles = settings.subtitles.enabled;
        self.subtitle_language = settings.subtitles.language.clone();
        self.thumbnail = settings.thumbnail;
    }
}

pub fn load_config(paths: &AppPaths) -> AppConfig {
    read_json_document(&paths.config_path()).unwrap_or_default()
}

pub fn save_config(paths: &AppPaths, config: &AppConfig) -> Result<()> {
    write_json_document(&paths.config_path(), config)
}
