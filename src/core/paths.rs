use crate::error::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Base rollout config directory (~/.config/rollout/ on all unix platforms)
pub fn rollout() -> Result<PathBuf> {
    #[cfg(windows)]
    {
        let appdata = env::var("APPDATA").map_err(|_| {
            Error::internal_unexpected("APPDATA environment variable not set on Windows")
        })?;
        Ok(PathBuf::from(appdata).join("rollout"))
    }

    #[cfg(not(windows))]
    {
        let home = env::var("HOME").map_err(|_| {
            Error::internal_unexpected("HOME environment variable not set on Unix-like system")
        })?;
        Ok(PathBuf::from(home).join(".config").join("rollout"))
    }
}

/// Deploy targets directory
pub fn targets() -> Result<PathBuf> {
    Ok(rollout()?.join("targets"))
}

/// Candidate config files for a target id, in lookup order.
pub fn target_candidates(id: &str) -> Result<Vec<PathBuf>> {
    let dir = targets()?;
    Ok(vec![
        dir.join(format!("{}.json", id)),
        dir.join(format!("{}.toml", id)),
    ])
}
