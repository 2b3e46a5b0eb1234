//! The signed-in session token, kept as a file in the data directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("session"),
        }
    }

    /// The stored token, if any.
    pub fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(s) => {
                let token = s.trim();
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn store(&self, token: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, token)
    }

    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
