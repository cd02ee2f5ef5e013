use crate::paths::AppPaths;
use crate::resolver::BackendOptions;
use crate::{tools, EngineError, Result};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Stdio};
use std::thread;

const YT_DLP: &str = "yt-dlp";
const PROGRESS_MARKER: &str = "[mediafetch]";
const PROGRESS_TEMPLATE: &str = "download:[mediafetch] %(progress.status)s|%(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s";
const PROBE_SOCKET_TIMEOUT_SECS: u32 = 30;
const POSTPROCESSOR_PREFIXES: [&str; 7] = [
    "[Merger]",
    "[ExtractAudio]",
    "[VideoConvertor]",
    "[VideoRemuxer]",
    "[FixupM3u8]",
    "[EmbedThumbnail]",
    "[EmbedSubtitle]",
];
const STDERR_TAIL_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawProgressEvent {
    pub status: String,
    pub percent: Option<String>,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

impl RawProgressEvent {
    pub fn with_status(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct StreamVariant {
    #[serde(default)]
    pub format_id: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub fps: Option<f64>,
}

pub trait MediaBackend: Send + Sync {
    fn probe(&self, url: &str) -> Result<Vec<StreamVariant>>;

    fn download(
        &self,
        url: &str,
        options: &BackendOptions,
        on_progress: &mut dyn FnMut(RawProgressEvent),
    ) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct YtDlpBackend {
    paths: AppPaths,
}

#[derive(Debug, Deserialize)]
struct ProbeDocument {
    #[serde(default)]
    formats: Vec<StreamVariant>,
}

impl YtDlpBackend {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    fn spawn(&self, args: &[String]) -> Result<Child> {
        for (program, prefix) in tools::ytdlp_candidates(&self.paths) {
            let mut command = tools::background_command(&program);
            command
                .args(&prefix)
                .args(args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            match command.spawn() {
                Ok(child) => {
                    tracing::debug!(%program, ?args, "spawned yt-dlp");
                    return Ok(child);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(EngineError::ExternalToolMissing {
            tool: YT_DLP.to_string(),
        })
    }
}

impl MediaBackend for YtDlpBackend {
    fn probe(&self, url: &str) -> Result<Vec<StreamVariant>> {
        let child = self.spawn(&probe_args(url))?;
        let output = child.wait_with_output()?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Probe(failure_text(
                &stderr,
                output.status.code(),
            )));
        }
        let doc: ProbeDocument = serde_json::from_slice(&output.stdout)?;
        Ok(doc.formats)
    }

    fn download(
        &self,
        url: &str,
        options: &BackendOptions,
        on_progress: &mut dyn FnMut(RawProgressEvent),
    ) -> Result<()> {
        let mut child = self.spawn(&download_args(options, url))?;

        let stderr_handle = child.stderr.take().map(|mut stderr| {
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = stderr.read_to_end(&mut buf);
                String::from_utf8_lossy(&buf).to_string()
            })
        });

        if let Some(stdout) = child.stdout.take() {
            let reader = BufReader::new(stdout);
            for line in reader.lines().map_while(std::io::Result::ok) {
                if let Some(event) = parse_progress_line(&line) {
                    on_progress(event);
                }
            }
        }

        let status = child.wait()?;
        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(EngineError::ExternalToolFailed {
                tool: YT_DLP.to_string(),
                code: status.code(),
                stderr: failure_text(&stderr, status.code()),
            });
        }
        Ok(())
    }
}

pub fn probe_args(url: &str) -> Vec<String> {
    vec![
        "--dump-single-json".to_string(),
        "--skip-download".to_string(),
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--socket-timeout".to_string(),
        PROBE_SOCKET_TIMEOUT_SECS.to_string(),
        "--".to_string(),
        url.to_string(),
    ]
}

pub fn download_args(options: &BackendOptions, url: &str) -> Vec<String> {
    let mut args = vec![
        "--newline".to_string(),
        "--no-color".to_string(),
        "--progress-template".to_string(),
        PROGRESS_TEMPLATE.to_string(),
        "-f".to_string(),
        options.stream_selector.clone(),
        "-o".to_string(),
        options.output_template.clone(),
    ];

    if let Some(merge) = &options.container_merge_format {
        args.push("--merge-output-format".to_string());
        args.push(merge.clone());
    }

    if let Some(post) = &options.post_processing {
        args.push("--extract-audio".to_string());
        args.push("--audio-format".to_string());
        args.push(post.codec.clone());
        if let Some(kbps) = post.target_bitrate_kbps {
            args.push("--audio-quality".to_string());
            args.push(format!("{kbps}K"));
        }
    }

    if let Some(subs) = &options.subtitles {
        args.push("--write-subs".to_string());
        if subs.auto_generated {
            args.push("--write-auto-subs".to_string());
        }
        args.push("--sub-langs".to_string());
        args.push(subs.languages.join(","));
    }

    if options.thumbnail == Some(true) {
        args.push("--write-thumbnail".to_string());
    }

    args.push("--".to_string());
    args.push(url.to_string());
    args
}

pub fn parse_progress_line(line: &str) -> Option<RawProgressEvent> {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix(PROGRESS_MARKER) {
        let mut fields = rest.trim().splitn(4, '|');
        let status = fields.next()?.trim();
        if status.is_empty() {
            return None;
        }
        let mut next_field = || {
            fields
                .next()
                .map(str::trim)
                .filter(|f| !f.is_empty())
                .map(str::to_string)
        };
        return Some(RawProgressEvent {
            status: status.to_string(),
            percent: next_field(),
            speed: next_field(),
            eta: next_field(),
        });
    }
    if POSTPROCESSOR_PREFIXES.iter().any(|p| line.starts_with(p)) {
        return Some(RawProgressEvent::with_status("finished"));
    }
    None
}

pub fn failure_text(stderr: &str, code: Option<i32>) -> String {
    if let Some(line) = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
    {
        return line.trim_start_matches("ERROR:").trim().to_string();
    }
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        let tail: String = trimmed
            .chars()
            .rev()
            .take(STDERR_TAIL_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return tail;
    }
    match code {
        Some(code) => format!("yt-dlp exited with code {code}"),
        None => "yt-dlp was terminated".to_string(),
    }
}
