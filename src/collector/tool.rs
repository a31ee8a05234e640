//! Subprocess invocation shared by the device and user queries.

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}")]
    NonZero {
        tool: String,
        status: std::process::ExitStatus,
    },
}

/// Run a command to completion and return its stdout. Any failure mode
/// (missing binary, I/O error, non-zero exit) surfaces as a `ToolError`;
/// callers decide how to degrade.
pub async fn run_tool(tool: &str, args: &[&str]) -> Result<String, ToolError> {
    let output = Command::new(tool)
        .args(args)
        .output()
        .await
        .map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    if !output.status.success() {
        return Err(ToolError::NonZero {
            tool: tool.to_string(),
            status: output.status,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
