use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

pub const DEFAULT_HISTORY_FILE: &str = "mpd_history.log";

/// Append only log of accepted manifest urls, one per line.
#[derive(Clone, Debug)]
pub struct History {
    path: PathBuf,
}

impl History {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Entries in file order. A missing file has no entries.
    pub fn load(&self) -> io::Result<Vec<String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(x) => x,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(text
            .lines()
            .map(|x| x.trim())
            .filter(|x| !x.is_empty())
            .map(|x| x.to_owned())
            .collect())
    }

    /// Unique entries, most recent first.
    pub fn recent(&self) -> io::Result<Vec<String>> {
        let mut entries = Vec::<String>::new();

        for entry in self.load()?.into_iter().rev() {
            if !entries.contains(&entry) {
                entries.push(entry);
            }
        }

        Ok(entries)
    }

    pub fn append(&self, entry: &str) -> io::Result<()> {
        let entry = entry.trim();

        if entry.is_empty() {
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", entry)
    }

    pub fn clear(&self) -> io::Result<()> {
        if self.path.exists() {
            fs::write(&self.path, b"")?;
        }

        Ok(())
    }
}
