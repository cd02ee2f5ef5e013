pub mod backend;
pub mod catalog;
pub mod config;
mod error;
pub mod events;
pub mod format;
pub mod history;
pub mod logging;
pub mod paths;
pub mod persist;
pub mod probe;
pub mod progress;
pub mod request;
pub mod resolver;
pub mod runner;
pub mod session;
pub mod tools;
pub mod update;

pub use error::{EngineError, Result};

pub const APP_NAME: &str = "MediaFetch";

pub fn about_text() -> String {
    format!(
        "{APP_NAME}\nVersion: {}\n\nA simple media downloader powered by yt-dlp.",
        update::LOCAL_VERSION
    )
}

#[cfg(test)]
mod tests {
    #[test]
    fn about_text_names_version() {
        assert_eq!(
            super::about_text(),
            format!(
                "MediaFetch\nVersion: {}\n\nA simple media downloader powered by yt-dlp.",
                env!("CARGO_PKG_VERSION")
            )
        );
    }
}
