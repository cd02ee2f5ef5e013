use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use mediafetch_engine::backend::YtDlpBackend;
use mediafetch_engine::config::{load_config, save_config};
use mediafetch_engine::format::FormatChoice;
use mediafetch_engine::history::HistoryStore;
use mediafetch_engine::paths::AppPaths;
use mediafetch_engine::session::{Notice, Session};
use mediafetch_engine::{about_text, logging, tools, update, EngineError, APP_NAME};

const POLL_INTERVAL: Duration = Duration::from_millis(200);

fn main() -> Result<(), String> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return Ok(());
    }
    if let Some(other) = args.get(1) {
        return Err(format!("unknown arg: {other} (try --help)"));
    }

    logging::init_tracing("warn");

    let base_dir = AppPaths::default_base_dir()
        .ok_or_else(|| "could not determine base dir; set MEDIAFETCH_BASE_DIR".to_string())?;
    let paths = AppPaths::new(base_dir);
    paths.ensure_dirs().map_err(|e| e.to_string())?;

    let mut config = load_config(&paths);
    let backend = Arc::new(YtDlpBackend::new(paths.clone()));
    let mut session = Session::new(
        backend,
        HistoryStore::for_paths(&paths),
        config.download_settings(&paths),
        config.update_endpoint.clone(),
    );
    session.check_for_updates(false);

    println!("{APP_NAME} {}", update::LOCAL_VERSION);
    println!("Type `help` for commands.");

    let lines = spawn_stdin_reader();
    let mut last_status = session.status().to_string();
    let mut input_closed = false;

    loop {
        match lines.recv_timeout(POLL_INTERVAL) {
            Ok(line) => {
                if !handle_command(&mut session, &paths, line.trim()) {
                    break;
                }
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => input_closed = true,
        }

        session.pump();
        for notice in session.take_notices() {
            match notice {
                Notice::Info(text) => println!("{text}"),
                Notice::Error(text) => eprintln!("{text}"),
            }
        }
        if session.status() != last_status {
            last_status = session.status().to_string();
            println!("[{:>5.1}%] {last_status}", session.progress() * 100.0);
        }

        // Scripted input: let a running batch finish before leaving.
        if input_closed && !session.awaiting_batch() {
            break;
        }
    }

    config.remember(session.settings());
    if let Err(e) = save_config(&paths, &config) {
        tracing::warn!("config not saved: {e}");
    }
    Ok(())
}

fn spawn_stdin_reader() -> crossbeam_channel::Receiver<String> {
    let (tx, rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Returns false when the user asked to quit.
fn handle_command(session: &mut Session, paths: &AppPaths, line: &str) -> bool {
    let (command, rest) = line
        .split_once(char::is_whitespace)
        .map(|(c, r)| (c, r.trim()))
        .unwrap_or((line, ""));

    match command {
        "" => {}
        "help" => print_commands(),
        "quit" | "exit" => return false,
        "about" => println!("{}", about_text()),
        "url" => {
            if rest.is_empty() {
                println!("{}", session.url_input());
            } else {
                let first = session.url_input().trim().is_empty();
                let input = if first {
                    rest.to_string()
                } else {
                    format!("{}\n{rest}", session.url_input())
                };
                session.set_url_input(input);
                if first {
                    session.url_focus_lost();
                }
            }
        }
        "reset" => session.set_url_input(""),
        "format" => match rest.parse::<FormatChoice>() {
            Ok(format) => session.select_format(format),
            Err(e) => {
                if !rest.is_empty() {
                    report(&e);
                }
                for format in FormatChoice::ALL {
                    let marker = if format == session.settings().format { "*" } else { " " };
                    println!("{marker} {format}");
                }
            }
        },
        "quality" => {
            if rest.is_empty() {
                for label in session.catalog().labels() {
                    let marker = if label == session.settings().quality { "*" } else { " " };
                    println!("{marker} {label}");
                }
            } else if let Err(e) = session.select_quality(rest) {
                report(&e);
            }
        }
        "dest" => {
            if rest.is_empty() {
                println!("{}", session.settings().destination_dir.display());
            } else {
                session.set_destination(PathBuf::from(rest));
            }
        }
        "subs" => {
            let mut parts = rest.split_whitespace();
            let enabled = parts.next() == Some("on");
            session.set_subtitles(enabled, parts.next());
        }
        "thumb" => session.set_thumbnail(rest == "on"),
        "start" => match session.start_download() {
            Ok(handle) => println!("Batch {} started", handle.batch_id),
            Err(e) => report(&e),
        },
        "status" => {
            println!("{} ({:.1}%)", session.status(), session.progress() * 100.0);
            println!("{:?}", session.batch_state());
        }
        "history" => {
            for (index, outcome) in session.history().iter().enumerate() {
                let result = outcome.error.as_deref().unwrap_or("ok");
                println!(
                    "{index:>3} {} [{} / {}] {result}",
                    outcome.url, outcome.format, outcome.quality
                );
            }
        }
        "replay" => {
            let entry = rest
                .parse::<usize>()
                .ok()
                .and_then(|i| session.history().into_iter().nth(i));
            match entry {
                Some(outcome) => match session.replay(&outcome) {
                    Ok(handle) => println!("Batch {} started", handle.batch_id),
                    Err(e) => report(&e),
                },
                None => eprintln!("no history entry {rest:?}"),
            }
        }
        "clear-history" => {
            if let Err(e) = session.clear_history() {
                report(&e);
            }
        }
        "update" => session.check_for_updates(true),
        "tools" => {
            let status = tools::ytdlp_tools_status(paths);
            match status.ytdlp_version {
                Some(version) => println!("yt-dlp {version} ({})", status.ytdlp_program),
                None => println!("yt-dlp not found (bundled path: {})", status.bundled_path),
            }
        }
        other => eprintln!("unknown command: {other} (try help)"),
    }
    true
}

fn report(err: &EngineError) {
    if err.is_user_input() {
        eprintln!("Warning: {err}");
    } else {
        eprintln!("Error: {err}");
    }
}

fn print_help() {
    println!(
        "mediafetch\n\nDownloads media with yt-dlp from an interactive prompt.\n\nUSAGE:\n  mediafetch [--help]\n\nENV:\n  MEDIAFETCH_BASE_DIR  overrides the data directory\n  RUST_LOG             log filter (default: warn)\n"
    );
    print_commands();
}

fn print_commands() {
    println!(
        "COMMANDS:\n  url [URL]            add a URL (one per line; the first is probed)\n  reset                clear the URL list\n  format [NAME]        select or list output formats\n  quality [LABEL]      select or list qualities\n  dest [DIR]           set or show the download folder\n  subs on|off [LANGS]  subtitles, e.g. `subs on en,de`\n  thumb on|off         write thumbnails\n  start                download every URL\n  status               show status and batch state\n  history              list past downloads, newest first\n  replay N             download history entry N again\n  clear-history        delete the history\n  update               check for a newer release\n  tools                show the yt-dlp in use\n  about                version info\n  quit                 save settings and exit"
    );
}
