use std::process::Command;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("cannot run report command: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("report command exited with {status}: {stderr}")]
    Failed { status: std::process::ExitStatus, stderr: String },

    #[error("report command printed no location")]
    NoLocation,

    #[error("report worker was cancelled")]
    Cancelled,
}

/// Produces a traffic report and answers with where it can be viewed.
pub trait ReportProvider: Send + Sync {
    fn traffic_report(&self) -> Result<String, ReportError>;
}

/// Runs an operator-supplied shell command; its trimmed stdout is the report location.
pub struct CommandReportProvider {
    pub command: String,
}

impl ReportProvider for CommandReportProvider {
    fn traffic_report(&self) -> Result<String, ReportError> {
        tracing::info!("Generating traffic report: {}", self.command);
        let out = Command::new("sh").arg("-c").arg(&self.command).output()?;

        if !out.status.success() {
            return Err(ReportError::Failed {
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }

        let location = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if location.is_empty() {
            return Err(ReportError::NoLocation);
        }
        Ok(location)
    }
}
