use std::{env, path::PathBuf};

pub const PROGRAM_NAME: &str = "sluice";
pub const PROGRAM_LOG_LEVEL: &str = "SLUICE_LOG_LEVEL";
pub const PROGRAM_LOG_FILE: &str = "SLUICE_LOG_FILE";
pub const SPOOL_FILE_NAME: &str = "failover.spool";

pub fn xdg_or_home(xdg_var: &str, home_suffix: &str) -> PathBuf {
    if let Some(dir) = env::var_os(xdg_var)
        && !dir.is_empty()
    {
        PathBuf::from(dir)
    } else {
        env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(home_suffix)
    }
}

/// Directory for state that must survive restarts (the failover spool).
///
/// Honours `XDG_STATE_HOME` first, then falls back to the platform state or
/// local data directory.
pub fn state_dir() -> PathBuf {
    if let Some(dir) = env::var_os("XDG_STATE_HOME")
        && !dir.is_empty()
    {
        return PathBuf::from(dir).join(PROGRAM_NAME);
    }

    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join(PROGRAM_NAME))
        .unwrap_or_else(|| xdg_or_home("XDG_STATE_HOME", ".local/state").join(PROGRAM_NAME))
}

/// Default location of the on-disk failover spool
pub fn default_spool_path() -> PathBuf {
    state_dir().join(SPOOL_FILE_NAME)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
