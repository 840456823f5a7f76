//! Preflight checks and process hand-off.
//!
//! The launcher's responsibility ends here: after the options are
//! resolved and exported it verifies the hand-off target exists, emits
//! device diagnostics, and then gets out of the way. On Unix the
//! process replaces itself with the child so signals and the exit code
//! flow straight to the supervisor; elsewhere it waits and forwards the
//! child's exit code unchanged.

use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while preparing or performing the hand-off.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The configured entry point does not exist
    #[error("Entry point not found: {0}")]
    MissingEntrypoint(PathBuf),

    /// The child process failed to start
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for launcher operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Verify the hand-off target exists before attempting to start it.
///
/// A missing entry point is fatal: the caller must exit non-zero
/// without spawning anything.
pub fn ensure_entrypoint(entrypoint: &Path) -> LaunchResult<()> {
    if entrypoint.exists() {
        debug!("Entry point present: {}", entrypoint.display());
        Ok(())
    } else {
        Err(LaunchError::MissingEntrypoint(entrypoint.to_path_buf()))
    }
}

/// Enumerate device nodes for diagnostics.
///
/// A missing or unreadable device directory is a warning, not a fatal
/// condition; the scan engine tolerates an empty device set.
pub fn inspect_device_dir(device_dir: &Path) {
    let entries = match std::fs::read_dir(device_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("Device directory {} unavailable: {err}", device_dir.display());
            return;
        }
    };

    let mut nodes: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tty"))
        .collect();
    nodes.sort();

    info!(
        "Device directory {}: {} tty node(s)",
        device_dir.display(),
        nodes.len()
    );
    for node in nodes {
        debug!("  {}", node);
    }
}

/// Build the hand-off command for an entry point.
///
/// Script entry points run under `interpreter`; pass an empty
/// interpreter to execute the entry point directly. `PYTHONUNBUFFERED`
/// keeps the child's output real-time under supervisor log capture.
pub fn build_command(interpreter: &str, entrypoint: &Path) -> Command {
    let mut cmd = if interpreter.is_empty() {
        Command::new(entrypoint)
    } else {
        let mut cmd = Command::new(interpreter);
        cmd.arg(entrypoint);
        cmd
    };
    cmd.env("PYTHONUNBUFFERED", "1");
    cmd
}

/// Hand control to the child process.
///
/// On Unix this replaces the current process and only returns on
/// failure. On other platforms it spawns the child, waits, and returns
/// the child's exit code for the caller to forward.
pub fn hand_off(mut command: Command) -> LaunchResult<i32> {
    let program = PathBuf::from(command.get_program());
    info!("Handing off to {}", program.display());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let source = command.exec();
        Err(LaunchError::Spawn { program, source })
    }

    #[cfg(not(unix))]
    {
        let status = command
            .status()
            .map_err(|source| LaunchError::Spawn { program, source })?;
        Ok(status.code().unwrap_or(1))
    }
}
