use log::debug;
use std::path::{Path, PathBuf};

/// A device identity (`.wvd`) file a CDM can be loaded for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Profile {
    /// File stem, also the device name used by remote CDMs.
    pub name: String,
    pub path: PathBuf,
}

impl Profile {
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let name = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self { name, path })
    }
}

/// Directory holding `.wvd` device files.
#[derive(Clone, Debug)]
pub struct ProfileStore {
    directory: PathBuf,
}

impl ProfileStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// All profiles in file name order.
    pub fn profiles(&self) -> Vec<Profile> {
        let pattern = format!(
            "{}/*.wvd",
            glob::Pattern::escape(&self.directory.to_string_lossy())
        );

        let Ok(paths) = glob::glob(&pattern) else {
            return vec![];
        };

        let mut profiles = paths
            .flatten()
            .filter(|x| x.is_file())
            .filter_map(Profile::from_path)
            .collect::<Vec<_>>();
        profiles.sort_by(|a, b| a.path.cmp(&b.path));
        profiles
    }

    /// Any available profile. When several are installed the first in file name
    /// order is used.
    pub fn select(&self) -> Option<Profile> {
        let profiles = self.profiles();

        if profiles.len() > 1 {
            debug!(
                "{} cdm profiles found in {}, using {}",
                profiles.len(),
                self.directory.display(),
                profiles[0].path.display()
            );
        }

        profiles.into_iter().next()
    }
}
