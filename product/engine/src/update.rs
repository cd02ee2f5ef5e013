use crate::{EngineError, Result};
use serde::Deserialize;
use std::time::Duration;

pub const LOCAL_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DEFAULT_RELEASE_ENDPOINT: &str =
    "https://api.github.com/repos/mediafetch/mediafetch/releases/latest";
const UPDATE_TIMEOUT: Duration = Duration::from_secs(5);
const USER_AGENT: &str = concat!("mediafetch/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateCheck {
    pub is_newer: bool,
    pub remote_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDescriptor {
    #[serde(default)]
    tag_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

/// Never fails: any network or parse problem reads as "no update".
pub fn check_for_update(endpoint: &str) -> UpdateCheck {
    try_check_for_update(endpoint).unwrap_or_else(|e| {
        tracing::warn!(%endpoint, "update check failed: {e}");
        UpdateCheck::default()
    })
}

pub fn try_check_for_update(endpoint: &str) -> Result<UpdateCheck> {
    check_for_update_with(LOCAL_VERSION, || fetch_release_descriptor(endpoint))
}

pub fn check_for_update_with(
    local_version: &str,
    fetch: impl FnOnce() -> Result<String>,
) -> Result<UpdateCheck> {
    let body = fetch()?;
    let remote = remote_version_label(&body)?;
    Ok(UpdateCheck {
        // Plain string comparison: any difference counts as newer.
        is_newer: remote != local_version,
        remote_version: Some(remote),
    })
}

fn fetch_release_descriptor(endpoint: &str) -> Result<String> {
    let mut config = ureq::Agent::config_builder();
    config = config
        .timeout_global(Some(UPDATE_TIMEOUT))
        .user_agent(USER_AGENT);
    let agent: ureq::Agent = config.build().into();

    let mut response = agent
        .get(endpoint)
        .header("Accept", "application/json")
        .call()
        .map_err(|e| EngineError::Http(format!("{endpoint}: {e}")))?;
    response
        .body_mut()
        .read_to_string()
        .map_err(|e| EngineError::Http(format!("{endpoint}: {e}")))
}

/// `tag_name`, else `name`, with one leading `v` removed.
pub fn remote_version_label(body: &str) -> Result<String> {
    let descriptor: ReleaseDescriptor = serde_json::from_str(body)?;
    let raw = [descriptor.tag_name, descriptor.name]
        .into_iter()
        .flatten()
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
        .ok_or_else(|| EngineError::Http("release descriptor has no version".to_string()))?;
    Ok(raw.strip_prefix('v').unwrap_or(&raw).to_string())
}
