use crate::paths::AppPaths;
use serde::Serialize;
use std::ffi::OsStr;
use std::path::PathBuf;
use std::process::Command;

#[derive(Debug, Clone, Serialize)]
pub struct YtDlpToolsStatus {
    pub available: bool,
    pub bundled_installed: bool,
    pub bundled_path: String,
    pub ytdlp_program: String,
    pub ytdlp_version: Option<String>,
}

pub fn ytdlp_candidates(paths: &AppPaths) -> Vec<(String, Vec<String>)> {
    let mut candidates: Vec<(String, Vec<String>)> = Vec::new();
    let bundled = paths.bundled_ytdlp_path();
    if bundled.exists() {
        candidates.push((bundled.to_string_lossy().to_string(), Vec::new()));
    }
    candidates.push(("yt-dlp".to_string(), Vec::new()));
    for python in ["python", "python3"] {
        candidates.push((
            python.to_string(),
            vec!["-m".to_string(), "yt_dlp".to_string()],
        ));
    }
    candidates
}

pub fn ytdlp_tools_status(paths: &AppPaths) -> YtDlpToolsStatus {
    let bundled: PathBuf = paths.bundled_ytdlp_path();

    let mut status = YtDlpToolsStatus {
        available: false,
        bundled_installed: bundled.exists(),
        bundled_path: bundled.to_string_lossy().to_string(),
        ytdlp_program: String::new(),
        ytdlp_version: None,
    };

    for (program, prefix) in ytdlp_candidates(paths) {
        if let Some(version) = tool_version_first_line(&program, &prefix) {
            status.available = true;
            status.ytdlp_program = if prefix.is_empty() {
                program
            } else {
                format!("{program} {}", prefix.join(" "))
            };
            status.ytdlp_version = Some(version);
            break;
        }
    }
    status
}

/// A command that does not open a console window on Windows.
pub fn background_command(program: impl AsRef<OsStr>) -> Command {
    let mut cmd = Command::new(program);
    hide_console(&mut cmd);
    cmd
}

#[cfg(windows)]
fn hide_console(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(windows))]
fn hide_console(_cmd: &mut Command) {}

fn tool_version_first_line(program: &str, prefix: &[String]) -> Option<String> {
    let output = background_command(program)
        .args(prefix)
        .arg("--version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout);
    let first = text.lines().next()?.trim();
    if first.is_empty() {
        return None;
    }
    Some(first.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_prefer_bundled_binary() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = AppPaths::new(dir.path().to_path_buf());

        let without = ytdlp_candidates(&paths);
        assert_eq!(without[0].0, "yt-dlp");
        assert_eq!(without.len(), 3);

        let bundled = paths.bundled_ytdlp_path();
        std::fs::create_dir_all(bundled.parent().expect("parent")).expect("mkdir");
        std::fs::write(&bundled, b"").expect("write");

        let with = ytdlp_candidates(&paths);
        assert_eq!(with.len(), 4);
        assert_eq!(with[0].0, bundled.to_string_lossy());
        assert_eq!(with[3].1, vec!["-m".to_string(), "yt_dlp".to_string()]);
    }
}
