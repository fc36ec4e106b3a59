use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use tempfile::Builder;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cannot use {path:?} as output directory: {reason}")]
    OutputDir { path: PathBuf, reason: String },
    #[error("path {0:?} escapes the output directory")]
    OutsideRoot(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Creates `dir` (and its parents) unless it already is a directory.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    let refuse = |reason: String| PersistError::OutputDir {
        path: dir.to_path_buf(),
        reason,
    };
    match fs::metadata(dir) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(refuse("a file is in the way".to_string())),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(dir).map_err(|err| refuse(err.to_string()))
        }
        Err(err) => Err(refuse(err.to_string())),
    }
}

/// Library storage rooted at one directory.
///
/// Writes go to a hidden temp file next to the target and are renamed into
/// place, so readers never observe a half-written chapter or manifest.
#[derive(Debug, Clone)]
pub struct AtomicFileWriter {
    root: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves `relative` below the root. Absolute paths and `..` are refused.
    pub fn path_for(&self, relative: impl AsRef<Path>) -> Result<PathBuf, PersistError> {
        let relative = relative.as_ref();
        let inside = relative
            .components()
            .all(|part| matches!(part, Component::Normal(_) | Component::CurDir));
        if inside {
            Ok(self.root.join(relative))
        } else {
            Err(PersistError::OutsideRoot(relative.to_path_buf()))
        }
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.path_for(relative).is_ok_and(|path| path.is_file())
    }

    /// Contents of `relative`, `None` when the file does not exist.
    pub fn read(&self, relative: impl AsRef<Path>) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(self.path_for(relative)?) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    /// Replaces `relative` with `content`, creating parent directories.
    pub fn write(&self, relative: impl AsRef<Path>, content: &str) -> Result<PathBuf, PersistError> {
        let target = self.path_for(relative)?;
        let dir = target.parent().unwrap_or(&self.root);
        ensure_output_dir(dir)?;

        let mut partial = Builder::new().prefix(".partial-").tempfile_in(dir)?;
        partial.write_all(content.as_bytes())?;
        partial.as_file().sync_all()?;
        partial.persist(&target).map_err(|err| err.error)?;
        Ok(target)
    }
}
