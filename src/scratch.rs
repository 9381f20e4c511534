//! Scratch files for the byte-payload operations.

use crate::defaults::SCRATCH_PREFIX;
use crate::error::Result;
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Which side of an operation a scratch file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchRole {
    Input,
    Output,
}

impl ScratchRole {
    fn tag(self) -> &'static str {
        match self {
            ScratchRole::Input => "in",
            ScratchRole::Output => "out",
        }
    }
}

/// A uniquely named file that is removed when dropped.
///
/// Names are `pcmforge_{in|out}_{uuid}.{ext}` and the file is created with
/// `create_new`, so two operations can never share one.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Creates an empty scratch file in `dir`.
    pub fn create(dir: &Path, role: ScratchRole, extension: &str) -> Result<(Self, File)> {
        let extension = sanitize_extension(extension);
        let name = format!(
            "{}_{}_{}.{}",
            SCRATCH_PREFIX,
            role.tag(),
            Uuid::new_v4(),
            extension
        );
        let path = dir.join(name);
        let file = OpenOptions::new().write(true).create_new(true).open(&path)?;
        debug!("Created scratch file {}", path.display());
        Ok((Self { path }, file))
    }

    /// Creates a scratch input file holding `data`.
    pub fn with_contents(dir: &Path, role: ScratchRole, extension: &str, data: &[u8]) -> Result<Self> {
        use std::io::Write;

        let (scratch, mut file) = Self::create(dir, role, extension)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(scratch)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole file back.
    pub fn read(&self) -> Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed scratch file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                "Failed to remove scratch file {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}

/// Keeps `[A-Za-z0-9]` from a format hint; falls back to `bin`.
fn sanitize_extension(hint: &str) -> String {
    let cleaned: String = hint
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() {
        "bin".to_string()
    } else {
        cleaned
    }
}
