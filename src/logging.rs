use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// `warn` everywhere, `info` for this crate. Targets are module paths, which
/// start with the crate name of the `grievance` binary.
fn default_directives() -> String {
    format!("warn,{}=info", env!("CARGO_CRATE_NAME"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives()))
}

/// Log to stderr. Used by the one-shot commands.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter())
        .init();
}

/// Log to `<config_dir>/grievance-chat/grievance.log`, since the TUI owns the
/// terminal. Returns the path written to.
pub fn init_file() -> Result<PathBuf> {
    let path = Config::config_dir()?.join("grievance.log");
    init_file_at(&path)?;
    Ok(path)
}

fn init_file_at(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(env_filter())
        .init();
    Ok(())
}
