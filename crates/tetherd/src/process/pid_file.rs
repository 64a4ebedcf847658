//! Durable record of the tracked worker's process id.
//!
//! The store performs no locking and never consults the process table; both
//! concerns belong to the controller.

use std::fs::{self, OpenOptions, Permissions};
use std::io::{self, Write};
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;
use tracing::{debug, info};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use super::PROCESS_TARGET;
use super::errors::PidFileError;

const MARKER_MODE: u32 = 0o644;

/// Reads and writes the PID marker at a fixed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PidFileStore {
    path: Utf8PathBuf,
}

impl PidFileStore {
    /// Builds a store for the marker at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker location.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Persists `pid`, replacing any previous content.
    ///
    /// The content lands through a rename so concurrent readers see either the
    /// old pid or the new one, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Directory`] when the parent directory cannot be
    /// created and [`PidFileError::Write`] when the content cannot be persisted.
    pub fn write(&self, pid: u32) -> Result<(), PidFileError> {
        let directory = self.ensure_parent()?;
        atomic_write(directory, &self.path, pid.to_string().as_bytes()).map_err(|source| {
            PidFileError::Write {
                path: self.path.clone(),
                source,
            }
        })?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path,
            "pid file written"
        );
        Ok(())
    }

    /// Persists `pid` only when no marker exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::AlreadyExists`] when a marker is present, or
    /// the same IO errors as [`PidFileStore::write`].
    pub fn create_exclusive(&self, pid: u32) -> Result<(), PidFileError> {
        self.ensure_parent()?;
        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(MARKER_MODE);
        let mut file = match options.open(&self.path) {
            Ok(file) => file,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {
                return Err(PidFileError::AlreadyExists {
                    path: self.path.clone(),
                });
            }
            Err(source) => return Err(self.write_error(source)),
        };
        file.write_all(pid.to_string().as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|source| self.write_error(source))?;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.path,
            "pid file created exclusively"
        );
        Ok(())
    }

    /// Reads the recorded pid.
    ///
    /// Surrounding whitespace is ignored. A pid of zero, or one beyond the
    /// platform's signed range, is reported as corrupt because signalling it
    /// would address a process group rather than a single process.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::NotFound`] when the marker is absent,
    /// [`PidFileError::Corrupt`] when the content is not a usable pid, and
    /// [`PidFileError::Read`] for other IO failures.
    pub fn read(&self) -> Result<u32, PidFileError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Err(PidFileError::NotFound {
                    path: self.path.clone(),
                });
            }
            Err(source) => {
                return Err(PidFileError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let trimmed = content.trim();
        match trimmed.parse::<u32>() {
            Ok(pid) if pid != 0 && i32::try_from(pid).is_ok() => Ok(pid),
            _ => Err(PidFileError::Corrupt {
                path: self.path.clone(),
                content: trimmed.to_owned(),
            }),
        }
    }

    /// Removes the marker. Absence counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Remove`] when an existing marker cannot be
    /// deleted.
    pub fn remove(&self) -> Result<(), PidFileError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(target: PROCESS_TARGET, file = %self.path, "pid file removed");
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PidFileError::Remove {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Removes the marker only while it still records `pid`.
    ///
    /// Returns whether a marker was deleted. A missing or corrupt marker is
    /// left alone and reported as `false`.
    ///
    /// # Errors
    ///
    /// Propagates read failures other than absence or corruption, and removal
    /// failures.
    pub fn remove_if_owned(&self, pid: u32) -> Result<bool, PidFileError> {
        match self.read() {
            Ok(recorded) if recorded == pid => self.remove().map(|()| true),
            Ok(_) | Err(PidFileError::NotFound { .. } | PidFileError::Corrupt { .. }) => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// Moves the marker to a sidecar path tagged with `tag`.
    ///
    /// The rename is atomic, so at most one caller takes any given marker
    /// aside. Returns `None` when there was no marker to move.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Write`] when the rename fails for a reason
    /// other than absence.
    pub fn set_aside(&self, tag: u32) -> Result<Option<Self>, PidFileError> {
        let aside = Self::new(format!("{}.stale-{tag}", self.path));
        match fs::rename(&self.path, &aside.path) {
            Ok(()) => {
                debug!(
                    target: PROCESS_TARGET,
                    file = %self.path,
                    aside = %aside.path,
                    "pid file set aside"
                );
                Ok(Some(aside))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.write_error(source)),
        }
    }

    /// Puts a marker previously set aside back in place and drops the sidecar.
    ///
    /// The marker is relinked without replacing anything, so a marker created
    /// in the meantime wins. Returns whether the original was restored.
    ///
    /// # Errors
    ///
    /// Returns [`PidFileError::Write`] when relinking fails for a reason
    /// other than an existing marker, and [`PidFileError::Remove`] when the
    /// sidecar cannot be deleted.
    pub fn restore(&self, aside: &Self) -> Result<bool, PidFileError> {
        let restored = match fs::hard_link(&aside.path, &self.path) {
            Ok(()) => true,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => false,
            Err(source) => return Err(self.write_error(source)),
        };
        aside.remove()?;
        Ok(restored)
    }

    fn ensure_parent(&self) -> Result<&Path, PidFileError> {
        let directory = parent_directory(&self.path);
        fs::create_dir_all(directory).map_err(|source| PidFileError::Directory {
            path: Utf8PathBuf::from(directory.to_string_lossy().into_owned()),
            source,
        })?;
        Ok(directory)
    }

    fn write_error(&self, source: io::Error) -> PidFileError {
        PidFileError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

/// Parent directory of `path`, treating a bare file name as the working
/// directory.
pub(super) fn parent_directory(path: &Utf8Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.as_std_path(),
        _ => Path::new("."),
    }
}

/// Writes the provided bytes to the path using an atomic persist step.
///
/// Data is flushed and fsync'd before the temporary file is renamed into
/// place so readers never observe a partially written payload.
fn atomic_write(directory: &Path, path: &Utf8Path, contents: &[u8]) -> io::Result<()> {
    let mut builder = Builder::new();
    builder.prefix(path.file_name().unwrap_or("tether"));
    builder.suffix(".tmp");
    #[cfg(unix)]
    builder.permissions(Permissions::from_mode(MARKER_MODE));

    let mut file = builder.tempfile_in(directory)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}
