use std::path::PathBuf;

const BASE_DIR_ENV_VAR: &str = "MEDIAFETCH_BASE_DIR";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub base_dir: PathBuf,
}

impl AppPaths {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_base_dir() -> Option<PathBuf> {
        if let Ok(v) = std::env::var(BASE_DIR_ENV_VAR) {
            let t = v.trim();
            if !t.is_empty() {
                return Some(PathBuf::from(t));
            }
        }
        directories::ProjectDirs::from("com", "mediafetch", "MediaFetch")
            .map(|dirs| dirs.data_dir().to_path_buf())
    }

    pub fn config_dir(&self) -> PathBuf {
        self.base_dir.join("config")
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir().join("config.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.base_dir.join("history.json")
    }

    pub fn tools_dir(&self) -> PathBuf {
        self.base_dir.join("tools")
    }

    pub fn bundled_ytdlp_path(&self) -> PathBuf {
        let mut path = self.tools_dir().join("yt-dlp").join("yt-dlp");
        if cfg!(windows) {
            path.set_extension("exe");
        }
        path
    }

    pub fn default_download_dir(&self) -> PathBuf {
        if let Some(user) = directories::UserDirs::new() {
            if let Some(dir) = user.download_dir() {
                return dir.to_path_buf();
            }
            return user.home_dir().join("Downloads");
        }
        self.base_dir.join("downloads")
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.config_dir())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_live_under_base_dir() {
        let paths = AppPaths::new(PathBuf::from("/tmp/mf"));
        assert_eq!(paths.history_path(), PathBuf::from("/tmp/mf/history.json"));
        assert_eq!(
            paths.config_path(),
            PathBuf::from("/tmp/mf/config/config.json")
        );
        assert!(paths.bundled_ytdlp_path().starts_with("/tmp/mf/tools/yt-dlp"));
    }
}
