use std::ffi::OsStr;
use std::path::Path;

use log::debug;
use tokio::process::Command;

use crate::error::{Result, XrefError};

/// Copy `source` to `dest`, overwriting it and creating its parent
/// directories.
pub async fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| XrefError::io(parent, e))?;
    }

    tokio::fs::copy(source, dest)
        .await
        .map_err(|e| XrefError::io(source, e))?;
    Ok(())
}

/// Remove a directory tree if it exists.
pub async fn remove_dir_if_exists(path: &Path) -> Result<()> {
    if tokio::fs::try_exists(path)
        .await
        .map_err(|e| XrefError::io(path, e))?
    {
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| XrefError::io(path, e))?;
    }
    Ok(())
}

/// Run `program` with `args` in `cwd` and return its standard output.
///
/// # Errors
///
/// Returns [`XrefError::Command`] when the program cannot be started or exits
/// with a non-zero status; the error carries the program's standard error.
pub async fn run_command<I, S>(program: &str, args: I, cwd: &Path) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let args: Vec<S> = args.into_iter().collect();
    let command_line = std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| arg.as_ref().to_string_lossy().into_owned()))
        .collect::<Vec<_>>()
        .join(" ");
    debug!("Running `{}` in {}", command_line, cwd.display());

    let output = Command::new(program)
        .args(&args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| XrefError::command(&command_line, e.to_string()))?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(XrefError::command(
            &command_line,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(stdout)
}
