mod config;
pub mod logging;

pub use config::{
    PROGRAM_LOG_FILE, PROGRAM_LOG_LEVEL, PROGRAM_NAME, SPOOL_FILE_NAME, default_spool_path,
    state_dir, xdg_or_home,
};

pub use logging::init;
