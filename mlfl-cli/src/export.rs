//! Writing transcripts to disk

use anyhow::{Context, Result};
use chrono::Utc;
use mlfl_core::config::ExportConfig;
use mlfl_core::transcript::default_file_name;
use mlfl_core::utils::{ensure_dir, expand_tilde};
use mlfl_core::{SessionManager, TranscriptFormat};
use std::path::{Path, PathBuf};
use tracing::info;

/// Export the session and write it to `path`, or to a timestamped file in
/// the configured export directory.
pub fn write_transcript(
    session: &SessionManager,
    format: Option<TranscriptFormat>,
    path: Option<&Path>,
    config: &ExportConfig,
) -> Result<PathBuf> {
    let format = match format {
        Some(format) => format,
        None => config.default_format.parse()?,
    };
    let document = session.export_transcript(format)?;

    let target = match path {
        Some(path) => path.to_path_buf(),
        None => ensure_dir(expand_tilde(&config.dir))?.join(default_file_name(format, Utc::now())),
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }

    std::fs::write(&target, document)
        .with_context(|| format!("failed to write {}", target.display()))?;
    info!("Transcript exported to {} ({})", target.display(), format);
    Ok(target)
}
