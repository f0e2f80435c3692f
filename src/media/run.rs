use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::filtergraph::command::ConcatCommand;
use crate::foundation::error::{SpliceError, SpliceResult};

/// Full path of `tool` on `PATH`.
pub fn locate(tool: &str) -> SpliceResult<PathBuf> {
    which::which(tool).map_err(|e| {
        SpliceError::external(
            tool,
            "locate",
            Path::new(tool),
            format!("not found on PATH ({e})"),
        )
    })
}

/// Whether `tool` can be found on `PATH`.
pub fn is_tool_on_path(tool: &str) -> bool {
    which::which(tool).is_ok()
}

/// Run `tool` to completion and return its stdout.
///
/// A non-zero exit becomes [`SpliceError::ExternalTool`] carrying the trimmed stderr.
pub(crate) fn capture<I, S>(
    tool: &str,
    operation: &str,
    subject: &Path,
    args: I,
) -> SpliceResult<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let exe = locate(tool)?;
    let mut cmd = Command::new(exe);
    cmd.args(args).stdin(Stdio::null());
    tracing::debug!(tool, operation, command = ?cmd, "running");

    let out = cmd.output().map_err(|e| {
        SpliceError::external(tool, operation, subject, format!("failed to start: {e}"))
    })?;
    if !out.status.success() {
        return Err(SpliceError::external(
            tool,
            operation,
            subject,
            format!(
                "{}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ));
    }
    Ok(out.stdout)
}

/// Create the directory `path` will be written into.
pub(crate) fn ensure_parent_dir(path: &Path) -> SpliceResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Execute the final render. ffmpeg's own progress output goes to our stderr.
#[tracing::instrument(level = "debug", skip_all, fields(output = %command.output().display()))]
pub fn run_command(command: &ConcatCommand) -> SpliceResult<()> {
    let exe = locate("ffmpeg")?;
    tracing::debug!(command = %command.display_string(), "rendering");
    let status = Command::new(exe)
        .args(command.args())
        .stdin(Stdio::null())
        .status()
        .map_err(|e| {
            SpliceError::external(
                "ffmpeg",
                "render",
                command.output(),
                format!("failed to start: {e}"),
            )
        })?;
    if !status.success() {
        return Err(SpliceError::external(
            "ffmpeg",
            "render",
            command.output(),
            status.to_string(),
        ));
    }
    Ok(())
}
