//! Uniquely named temporary audio files that delete themselves when dropped.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Which generation of a voice file a scratch file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// As downloaded from the chat transport (OGG/Opus for Telegram voice notes)
    Raw,
    /// Mono MP3 produced by ffmpeg for the recognition service
    Transcoded,
}

impl AudioFormat {
    fn prefix(self) -> &'static str {
        match self {
            AudioFormat::Raw => "downloaded_",
            AudioFormat::Transcoded => "converted_",
        }
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioFormat::Raw => write!(f, "downloaded"),
            AudioFormat::Transcoded => write!(f, "converted"),
        }
    }
}

/// A temporary audio file owned by a single pipeline run.
///
/// The file is removed when the guard is dropped, on every exit path. Removal
/// failures are logged and never propagated.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,       // Absolute path of the file
    format: AudioFormat, // Raw or transcoded
}

impl ScratchFile {
    /// Create a new, empty file with a fresh unique name in `dir`.
    ///
    /// # Arguments
    /// * `dir` - Scratch directory
    /// * `format` - Generation tag, used for the file name prefix and log messages
    ///
    /// # Returns
    /// The guard together with an open handle for writing.
    ///
    /// # Errors
    /// Returns `Error::Io` if the directory is not writable or the file cannot be created.
    pub async fn create(dir: &Path, format: AudioFormat) -> Result<(Self, File)> {
        let path = dir.join(format!("{}{}", format.prefix(), Uuid::new_v4().simple()));

        // create_new guarantees we never reuse a path owned by another run
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Error::io(format!("failed to create {} file in {}", format, dir.display()), e))?;

        debug!("Created {} file: {}", format, path.display());
        Ok((Self { path, format }, file))
    }

    /// Guard a path that another process is expected to create.
    ///
    /// Nothing is touched on disk; the path is only deleted on drop if it exists.
    pub fn reserve(path: PathBuf, format: AudioFormat) -> Self {
        Self { path, format }
    }

    /// Path of the guarded file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        delete_file(&self.path, self.format);
    }
}

/// Copy everything from `source` into `file` and flush it.
///
/// A partially written file is left in place; its guard removes it.
///
/// # Returns
/// The number of bytes written.
///
/// # Errors
/// Returns the underlying I/O error from either the reader or the file.
pub async fn write_stream<R>(file: &mut File, source: &mut R) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let written = tokio::io::copy(source, file).await?;
    file.flush().await?;
    Ok(written)
}

/// Best-effort removal of a scratch file.
///
/// # Returns
/// `true` if the file is gone afterwards.
pub fn delete_file(path: &Path, format: AudioFormat) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Deleted {} file: {}", format, path.display());
            true
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No {} file to delete at {}", format, path.display());
            true
        }
        Err(e) => {
            warn!("⚠️ Failed to delete {} file {}: {}", format, path.display(), e);
            false
        }
    }
}
