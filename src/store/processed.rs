use crate::error::Result;
use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Append-only ledger of issue URLs that already have a pull request.
///
/// Stored as one URL per line. The file is the source of truth; callers reload
/// it in full rather than trusting an old snapshot.
#[derive(Clone, Debug)]
pub struct ProcessedSet {
    path: PathBuf,
}

impl ProcessedSet {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every recorded URL, creating an empty file if none exists yet.
    pub fn load(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::File::create(&self.path)?;
            return Ok(HashSet::new());
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn append(&self, url: &str) -> Result<()> {
        // A hand-edited file may lack the final newline.
        let unterminated = match fs::read(&self.path) {
            Ok(bytes) => !bytes.is_empty() && !bytes.ends_with(b"\n"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if unterminated {
            writeln!(file)?;
        }
        writeln!(file, "{url}")?;
        file.sync_data()?;
        Ok(())
    }
}
